//! `calculate` tool: evaluates arithmetic expressions.
//!
//! Operators: `+ - * / %` and right-associative `^`, with parentheses and
//! unary minus. Evaluation is precedence climbing over a token list.

use async_trait::async_trait;
use turnpike_core::context::AgentContext;
use turnpike_core::error::ToolError;
use turnpike_core::tool::Tool;

pub struct CalculatorTool;

#[async_trait]
impl Tool for CalculatorTool {
    fn name(&self) -> &str {
        "calculate"
    }

    fn description(&self) -> &str {
        "Evaluate an arithmetic expression. Supports + - * / % ^, parentheses and decimals."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "expr": {
                    "type": "string",
                    "description": "The expression to evaluate, e.g. '(2 + 3) * 4'"
                }
            },
            "required": ["expr"]
        })
    }

    async fn invoke(
        &self,
        arguments: serde_json::Value,
        _context: &mut AgentContext,
    ) -> Result<String, ToolError> {
        let expr = arguments["expr"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'expr' argument".into()))?;

        let value = evaluate(expr).map_err(|reason| ToolError::ExecutionFailed {
            tool_name: self.name().into(),
            reason,
        })?;

        Ok(format_number(value))
    }
}

/// Render integral results without a trailing `.0`.
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// Evaluate an arithmetic expression.
pub fn evaluate(expr: &str) -> Result<f64, String> {
    let tokens = lex(expr)?;
    if tokens.is_empty() {
        return Err("Empty expression".into());
    }
    let mut eval = Evaluator {
        tokens: &tokens,
        pos: 0,
        depth: 0,
    };
    let value = eval.expression(0)?;
    if let Some(tok) = eval.tokens.get(eval.pos) {
        return Err(format!("Unexpected {tok:?} at token {}", eval.pos));
    }
    if !value.is_finite() {
        return Err("Result is not a finite number".into());
    }
    Ok(value)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Tok {
    Num(f64),
    Op(char),
    Open,
    Close,
}

fn lex(input: &str) -> Result<Vec<Tok>, String> {
    let mut out = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some((start, c)) = chars.next() {
        match c {
            c if c.is_whitespace() => {}
            '+' | '-' | '*' | '/' | '%' | '^' => out.push(Tok::Op(c)),
            '(' => out.push(Tok::Open),
            ')' => out.push(Tok::Close),
            c if c.is_ascii_digit() || c == '.' => {
                let mut end = start + c.len_utf8();
                while let Some(&(i, d)) = chars.peek() {
                    if !(d.is_ascii_digit() || d == '.') {
                        break;
                    }
                    end = i + d.len_utf8();
                    chars.next();
                }
                let literal = &input[start..end];
                let n = literal
                    .parse()
                    .map_err(|_| format!("Invalid number: {literal}"))?;
                out.push(Tok::Num(n));
            }
            other => return Err(format!("Unexpected character: '{other}'")),
        }
    }

    Ok(out)
}

/// Binding power and right-associativity of a binary operator.
fn binding(op: char) -> Option<(u8, bool)> {
    match op {
        '+' | '-' => Some((1, false)),
        '*' | '/' | '%' => Some((2, false)),
        '^' => Some((3, true)),
        _ => None,
    }
}

/// Deepest nesting of parentheses, unary minus and `^` chains accepted.
const MAX_DEPTH: usize = 256;

struct Evaluator<'a> {
    tokens: &'a [Tok],
    pos: usize,
    depth: usize,
}

impl Evaluator<'_> {
    fn next(&mut self) -> Option<Tok> {
        let tok = self.tokens.get(self.pos).copied();
        self.pos += usize::from(tok.is_some());
        tok
    }

    fn expression(&mut self, min_power: u8) -> Result<f64, String> {
        if self.depth >= MAX_DEPTH {
            return Err("Expression nested too deeply".into());
        }
        self.depth += 1;
        let value = self.binary(min_power);
        self.depth -= 1;
        value
    }

    fn binary(&mut self, min_power: u8) -> Result<f64, String> {
        let mut lhs = self.operand()?;

        while let Some(Tok::Op(op)) = self.tokens.get(self.pos).copied() {
            let Some((power, right_assoc)) = binding(op) else {
                break;
            };
            if power < min_power {
                break;
            }
            self.pos += 1;
            let rhs = self.expression(if right_assoc { power } else { power + 1 })?;
            lhs = apply(op, lhs, rhs)?;
        }

        Ok(lhs)
    }

    fn operand(&mut self) -> Result<f64, String> {
        match self.next() {
            Some(Tok::Num(n)) => Ok(n),
            // Unary minus binds tighter than * but looser than ^: -2^2 == -4.
            Some(Tok::Op('-')) => Ok(-self.expression(3)?),
            Some(Tok::Open) => {
                let value = self.expression(0)?;
                match self.next() {
                    Some(Tok::Close) => Ok(value),
                    _ => Err("Expected closing parenthesis".into()),
                }
            }
            Some(tok) => Err(format!("Unexpected {tok:?}")),
            None => Err("Unexpected end of expression".into()),
        }
    }
}

fn apply(op: char, lhs: f64, rhs: f64) -> Result<f64, String> {
    match op {
        '+' => Ok(lhs + rhs),
        '-' => Ok(lhs - rhs),
        '*' => Ok(lhs * rhs),
        '/' | '%' if rhs == 0.0 => Err("Division by zero".into()),
        '/' => Ok(lhs / rhs),
        '%' => Ok(lhs % rhs),
        '^' => Ok(lhs.powf(rhs)),
        other => Err(format!("Unknown operator '{other}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precedence_and_parentheses() {
        assert_eq!(evaluate("2 + 3 * 4").unwrap(), 14.0);
        assert_eq!(evaluate("(2 + 3) * 4").unwrap(), 20.0);
        assert_eq!(evaluate("((1 + 2) * (3 + 4))").unwrap(), 21.0);
    }

    #[test]
    fn left_associative_subtraction() {
        assert_eq!(evaluate("10 - 4 - 3").unwrap(), 3.0);
        assert_eq!(evaluate("100 / 10 / 5").unwrap(), 2.0);
    }

    #[test]
    fn power_is_right_associative() {
        assert_eq!(evaluate("2 ^ 3 ^ 2").unwrap(), 512.0);
        assert_eq!(evaluate("-2 ^ 2").unwrap(), -4.0);
    }

    #[test]
    fn modulo_and_unary() {
        assert_eq!(evaluate("17 % 5").unwrap(), 2.0);
        assert_eq!(evaluate("-5 + 3").unwrap(), -2.0);
        assert_eq!(evaluate("2 * -3").unwrap(), -6.0);
    }

    #[test]
    fn errors() {
        assert!(evaluate("1 / 0").is_err());
        assert!(evaluate("2 +").is_err());
        assert!(evaluate("").is_err());
        assert!(evaluate("(1 + 2").is_err());
        assert!(evaluate("2 $ 3").is_err());
        assert!(evaluate("1 2").is_err());
    }

    #[test]
    fn deep_nesting_is_an_error() {
        let minus = format!("{}1", "-".repeat(200_000));
        assert_eq!(evaluate(&minus).unwrap_err(), "Expression nested too deeply");

        let parens = format!("{}1{}", "(".repeat(100_000), ")".repeat(100_000));
        assert_eq!(evaluate(&parens).unwrap_err(), "Expression nested too deeply");

        let powers = format!("2{}", "^1".repeat(100_000));
        assert!(evaluate(&powers).is_err());

        // Reasonable nesting still works, and long flat sums do not nest.
        let nested = format!("{}7{}", "(".repeat(100), ")".repeat(100));
        assert_eq!(evaluate(&nested).unwrap(), 7.0);
        let flat = vec!["1"; 10_000].join("+");
        assert_eq!(evaluate(&flat).unwrap(), 10_000.0);
    }

    #[tokio::test]
    async fn deep_expression_comes_back_as_tool_error() {
        let mut ctx = AgentContext::new();
        let expr = format!("{}1", "-".repeat(200_000));
        let err = CalculatorTool
            .invoke(serde_json::json!({ "expr": expr }), &mut ctx)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("nested too deeply"));
    }

    #[tokio::test]
    async fn invoke_formats_results() {
        let mut ctx = AgentContext::new();
        let tool = CalculatorTool;

        let out = tool
            .invoke(serde_json::json!({"expr": "2+2"}), &mut ctx)
            .await
            .unwrap();
        assert_eq!(out, "4");

        let out = tool
            .invoke(serde_json::json!({"expr": "10 / 4"}), &mut ctx)
            .await
            .unwrap();
        assert_eq!(out, "2.5");
    }

    #[tokio::test]
    async fn invoke_reports_bad_expression() {
        let mut ctx = AgentContext::new();
        let err = CalculatorTool
            .invoke(serde_json::json!({"expr": "1 / 0"}), &mut ctx)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Division by zero"));
    }
}
