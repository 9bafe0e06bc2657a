//! Memory tools: store, recall, forget and list facts through a
//! [`MemoryStore`].
//!
//! [`InMemoryStore`] is the process-local store used by default. Anything
//! persistent plugs in behind the same trait.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use turnpike_core::context::AgentContext;
use turnpike_core::error::{MemoryError, ToolError};
use turnpike_core::memory::{MemoryRecord, MemoryStore};
use turnpike_core::tool::Tool;

/// Keyed memories held in a map; recall ranks by keyword overlap.
#[derive(Default)]
pub struct InMemoryStore {
    records: RwLock<BTreeMap<String, MemoryRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn terms(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Fraction of query terms found in the record's key, content or tags.
fn score(record: &MemoryRecord, query_terms: &[String]) -> f32 {
    if query_terms.is_empty() {
        return 0.0;
    }
    let mut haystack = terms(&record.content);
    haystack.extend(terms(&record.key));
    haystack.extend(record.tags.iter().flat_map(|t| terms(t)));

    let hits = query_terms.iter().filter(|q| haystack.contains(q)).count();
    hits as f32 / query_terms.len() as f32
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    async fn store(&self, record: MemoryRecord) -> Result<(), MemoryError> {
        if record.key.trim().is_empty() {
            return Err(MemoryError::Storage("memory key must not be empty".into()));
        }
        self.records.write().await.insert(record.key.clone(), record);
        Ok(())
    }

    async fn recall(&self, query: &str, limit: usize) -> Result<Vec<MemoryRecord>, MemoryError> {
        let query_terms = terms(query);
        let records = self.records.read().await;

        let mut ranked: Vec<MemoryRecord> = records
            .values()
            .filter_map(|record| {
                let s = score(record, &query_terms);
                (s > 0.0).then(|| MemoryRecord {
                    score: s,
                    ..record.clone()
                })
            })
            .collect();

        // Best score first, newest first among ties.
        ranked.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        ranked.truncate(limit);
        Ok(ranked)
    }

    async fn forget(&self, key: &str) -> Result<bool, MemoryError> {
        Ok(self.records.write().await.remove(key).is_some())
    }

    async fn list(&self) -> Result<Vec<MemoryRecord>, MemoryError> {
        Ok(self.records.read().await.values().cloned().collect())
    }
}

fn store_failed(tool: &str, e: MemoryError) -> ToolError {
    ToolError::ExecutionFailed {
        tool_name: tool.into(),
        reason: e.to_string(),
    }
}

fn required_str<'a>(args: &'a serde_json::Value, key: &str) -> Result<&'a str, ToolError> {
    args[key]
        .as_str()
        .ok_or_else(|| ToolError::InvalidArguments(format!("Missing '{key}' argument")))
}

/// `memory_store`: remember a fact under a key.
pub struct MemoryStoreTool {
    store: Arc<dyn MemoryStore>,
}

impl MemoryStoreTool {
    pub fn new(store: Arc<dyn MemoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for MemoryStoreTool {
    fn name(&self) -> &str {
        "memory_store"
    }

    fn description(&self) -> &str {
        "Remember a fact for later. Storing under an existing key replaces it."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "key": { "type": "string", "description": "Short unique key" },
                "content": { "type": "string", "description": "The fact to remember" },
                "tags": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Optional tags"
                }
            },
            "required": ["key", "content"]
        })
    }

    async fn invoke(
        &self,
        arguments: serde_json::Value,
        _context: &mut AgentContext,
    ) -> Result<String, ToolError> {
        let key = required_str(&arguments, "key")?;
        let content = required_str(&arguments, "content")?;
        let tags = arguments["tags"]
            .as_array()
            .map(|tags| {
                tags.iter()
                    .filter_map(|t| t.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default();

        self.store
            .store(MemoryRecord {
                key: key.into(),
                content: content.into(),
                tags,
                created_at: Utc::now(),
                score: 0.0,
            })
            .await
            .map_err(|e| store_failed(self.name(), e))?;

        Ok(format!("Stored memory '{key}'"))
    }
}

/// `memory_recall`: ranked search over stored facts.
pub struct MemoryRecallTool {
    store: Arc<dyn MemoryStore>,
}

impl MemoryRecallTool {
    pub fn new(store: Arc<dyn MemoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for MemoryRecallTool {
    fn name(&self) -> &str {
        "memory_recall"
    }

    fn description(&self) -> &str {
        "Search remembered facts by keywords. Returns the best matches first."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "Keywords to search for" },
                "limit": {
                    "type": "integer",
                    "description": "Maximum number of memories to return (default 5)"
                }
            },
            "required": ["query"]
        })
    }

    async fn invoke(
        &self,
        arguments: serde_json::Value,
        _context: &mut AgentContext,
    ) -> Result<String, ToolError> {
        let query = required_str(&arguments, "query")?;
        let limit = arguments["limit"].as_u64().unwrap_or(5).clamp(1, 50) as usize;

        let found = self
            .store
            .recall(query, limit)
            .await
            .map_err(|e| store_failed(self.name(), e))?;

        if found.is_empty() {
            return Ok(format!("No memories match '{query}'"));
        }

        Ok(found
            .iter()
            .map(|r| format!("[{:.2}] {}: {}", r.score, r.key, r.content))
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

/// `memory_forget`: drop a fact by key.
pub struct MemoryForgetTool {
    store: Arc<dyn MemoryStore>,
}

impl MemoryForgetTool {
    pub fn new(store: Arc<dyn MemoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for MemoryForgetTool {
    fn name(&self) -> &str {
        "memory_forget"
    }

    fn description(&self) -> &str {
        "Forget the memory stored under a key."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "key": { "type": "string", "description": "Key of the memory to remove" }
            },
            "required": ["key"]
        })
    }

    async fn invoke(
        &self,
        arguments: serde_json::Value,
        _context: &mut AgentContext,
    ) -> Result<String, ToolError> {
        let key = required_str(&arguments, "key")?;
        let existed = self
            .store
            .forget(key)
            .await
            .map_err(|e| store_failed(self.name(), e))?;

        if existed {
            Ok(format!("Forgot memory '{key}'"))
        } else {
            Err(ToolError::ExecutionFailed {
                tool_name: self.name().into(),
                reason: MemoryError::NotFound(key.into()).to_string(),
            })
        }
    }
}

/// `memory_list`: every stored key with its content.
pub struct MemoryListTool {
    store: Arc<dyn MemoryStore>,
}

impl MemoryListTool {
    pub fn new(store: Arc<dyn MemoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for MemoryListTool {
    fn name(&self) -> &str {
        "memory_list"
    }

    fn description(&self) -> &str {
        "List all remembered facts."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({ "type": "object", "properties": {} })
    }

    async fn invoke(
        &self,
        _arguments: serde_json::Value,
        _context: &mut AgentContext,
    ) -> Result<String, ToolError> {
        let all = self
            .store
            .list()
            .await
            .map_err(|e| store_failed(self.name(), e))?;

        if all.is_empty() {
            return Ok("No memories stored".into());
        }
        Ok(all
            .iter()
            .map(|r| format!("{}: {}", r.key, r.content))
            .collect::<Vec<_>>()
            .join("\n"))
    }
}
