//! Provider router: resolves a model spec to a live provider handle.
//!
//! Pairs a [`RoutingTable`] with one `Arc<dyn Provider>` per configured id.
//! Immutable after construction, so it is shared freely between runs.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;
use turnpike_config::AppConfig;
use turnpike_core::error::{Error, Result};
use turnpike_core::provider::{Provider, ProviderKind};

use crate::table::{RouteEntry, RoutingTable};

/// A provider handle plus the model name to send it. Consumed by one call.
#[derive(Clone)]
pub struct ResolvedModel {
    pub provider: Arc<dyn Provider>,
    pub model: String,
    pub provider_id: String,
}

impl std::fmt::Debug for ResolvedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedModel")
            .field("provider", &self.provider.name())
            .field("model", &self.model)
            .field("provider_id", &self.provider_id)
            .finish()
    }
}

/// Routes LLM requests to the correct provider.
pub struct ProviderRouter {
    table: RoutingTable,
    providers: HashMap<String, Arc<dyn Provider>>,
}

impl ProviderRouter {
    /// Create a router. Every table entry must have a handle.
    pub fn new(table: RoutingTable, providers: HashMap<String, Arc<dyn Provider>>) -> Result<Self> {
        if let Some(missing) = table.entries().find(|e| !providers.contains_key(&e.id)) {
            return Err(Error::config(format!(
                "Provider '{}' is configured but has no implementation",
                missing.id
            )));
        }
        Ok(Self { table, providers })
    }

    pub fn builder() -> ProviderRouterBuilder {
        ProviderRouterBuilder::default()
    }

    /// Build from the `[providers]` config section plus caller-supplied handles.
    pub fn from_config(
        config: &AppConfig,
        providers: HashMap<String, Arc<dyn Provider>>,
    ) -> Result<Self> {
        Self::new(RoutingTable::from_config(config)?, providers)
    }

    /// Resolve a model spec to a provider handle and model name.
    pub fn resolve(&self, spec: &str) -> Result<ResolvedModel> {
        let route = self.table.resolve(spec);
        let provider = self.providers.get(&route.provider_id).cloned().ok_or_else(|| {
            Error::Internal(format!("No handle for provider '{}'", route.provider_id))
        })?;

        debug!(spec = %spec, provider = %route.provider_id, model = %route.model, "Resolved model");

        Ok(ResolvedModel {
            provider,
            model: route.model,
            provider_id: route.provider_id,
        })
    }

    /// Get a specific provider by id.
    pub fn get(&self, id: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(id).cloned()
    }

    /// List all configured provider ids, sorted.
    pub fn list(&self) -> Vec<&str> {
        self.table.entries().map(|e| e.id.as_str()).collect()
    }

    pub fn table(&self) -> &RoutingTable {
        &self.table
    }
}

/// Collects providers one at a time, then builds the routing table.
#[derive(Default)]
pub struct ProviderRouterBuilder {
    entries: Vec<RouteEntry>,
    providers: HashMap<String, Arc<dyn Provider>>,
    default_provider: Option<String>,
}

impl ProviderRouterBuilder {
    pub fn provider(
        mut self,
        id: impl Into<String>,
        kind: ProviderKind,
        provider: Arc<dyn Provider>,
    ) -> Self {
        let id = id.into();
        self.entries.push(RouteEntry::new(id.clone(), kind));
        self.providers.insert(id, provider);
        self
    }

    /// Default model for the most recently added provider.
    pub fn default_model(mut self, model: impl Into<String>) -> Self {
        if let Some(last) = self.entries.pop() {
            self.entries.push(last.with_default_model(model));
        }
        self
    }

    pub fn default_provider(mut self, id: impl Into<String>) -> Self {
        self.default_provider = Some(id.into());
        self
    }

    pub fn build(self) -> Result<ProviderRouter> {
        let table = RoutingTable::new(self.entries, self.default_provider.as_deref())?;
        ProviderRouter::new(table, self.providers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use turnpike_core::error::ProviderError;
    use turnpike_core::message::ChatMessage;
    use turnpike_core::provider::{ProviderRequest, ProviderResponse};

    struct Named(&'static str);

    #[async_trait]
    impl Provider for Named {
        fn name(&self) -> &str {
            self.0
        }

        async fn generate(
            &self,
            request: ProviderRequest,
        ) -> std::result::Result<ProviderResponse, ProviderError> {
            Ok(ProviderResponse {
                message: ChatMessage::assistant(self.0),
                usage: None,
                model: request.model,
            })
        }
    }

    #[test]
    fn router_requires_a_provider() {
        let err = ProviderRouter::builder().build().err().unwrap();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn router_requires_a_handle_per_entry() {
        let config = AppConfig::from_toml("[providers.openai]\nkind = \"openai\"\n").unwrap();
        let err = ProviderRouter::from_config(&config, HashMap::new()).err().unwrap();
        assert!(err.to_string().contains("openai"));
    }

    #[test]
    fn router_register_and_lookup() {
        let router = ProviderRouter::builder()
            .provider("openai", ProviderKind::OpenAi, Arc::new(Named("openai")))
            .provider("ollama", ProviderKind::Local, Arc::new(Named("ollama")))
            .default_model("qwen2.5")
            .build()
            .unwrap();

        assert!(router.get("ollama").is_some());
        assert!(router.get("nonexistent").is_none());
        assert_eq!(router.list(), vec!["ollama", "openai"]);
        assert_eq!(
            router.table().entry("ollama").unwrap().fallback_model(),
            "qwen2.5"
        );
    }

    #[tokio::test]
    async fn resolved_handle_is_the_routed_provider() {
        let router = ProviderRouter::builder()
            .provider("openai", ProviderKind::OpenAi, Arc::new(Named("openai")))
            .provider("claude", ProviderKind::Anthropic, Arc::new(Named("claude")))
            .build()
            .unwrap();

        let resolved = router.resolve("claude-opus-4").unwrap();
        assert_eq!(resolved.provider_id, "claude");
        assert_eq!(resolved.provider.name(), "claude");

        let response = resolved
            .provider
            .generate(ProviderRequest {
                model: resolved.model.clone(),
                messages: vec![ChatMessage::user("hi")],
                tools: vec![],
                stream: false,
            })
            .await
            .unwrap();
        assert_eq!(response.model, "claude-opus-4");
    }

    #[test]
    fn single_provider_router_serves_blank_spec() {
        let router = ProviderRouter::builder()
            .provider("local", ProviderKind::Local, Arc::new(Named("local")))
            .build()
            .unwrap();
        let resolved = router.resolve("").unwrap();
        assert_eq!(resolved.provider_id, "local");
        assert_eq!(resolved.model, "llama3.1");
        assert_eq!(router.resolve("gpt-4o").unwrap().provider_id, "local");
    }
}
