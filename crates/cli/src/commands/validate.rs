//! `turnpike validate`: Check a chat request body against the engine limits.

use std::path::Path;

use tokio::io::AsyncReadExt;
use turnpike_agent::ChatRequest;
use turnpike_config::EngineLimits;

pub async fn run(config_path: Option<&Path>, input: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path)?;

    let body = if input == "-" {
        let mut body = String::new();
        tokio::io::stdin().read_to_string(&mut body).await?;
        body
    } else {
        tokio::fs::read_to_string(input)
            .await
            .map_err(|e| format!("Failed to read {input}: {e}"))?
    };

    match check(&body, &config.engine.limits()) {
        Ok(summary) => {
            println!("✅ {summary}");
            Ok(())
        }
        Err(e) => {
            println!("❌ {e}");
            Err(e)
        }
    }
}

/// Parse and validate a request body, returning a short summary.
pub fn check(body: &str, limits: &EngineLimits) -> Result<String, Box<dyn std::error::Error>> {
    let request: ChatRequest =
        serde_json::from_str(body).map_err(|e| format!("Malformed request body: {e}"))?;
    let validated = request.validate(limits)?;

    Ok(format!(
        "{} message(s), {} context variable(s), max_turns {}",
        validated.messages.len(),
        validated.context.variables.len(),
        validated.max_turns
    ))
}
