//! Routing table: the pure half of provider routing.
//!
//! Maps a model spec such as `"gpt-4o"`, `"claude-sonnet-4"` or
//! `"ollama:llama3.1"` to a configured provider id and a model name. Holds no
//! provider handles, so it can be built straight from configuration.

use std::collections::BTreeMap;

use turnpike_config::AppConfig;
use turnpike_core::error::{Error, Result};
use turnpike_core::provider::ProviderKind;

/// Model-name prefixes served by OpenAI-class providers.
const OPENAI_PREFIXES: &[&str] = &["gpt", "chatgpt", "o1", "o3", "o4"];

/// Model-name prefixes served by Anthropic-class providers.
const ANTHROPIC_PREFIXES: &[&str] = &["claude"];

/// Open-weight model families, served by local inference servers.
const LOCAL_PREFIXES: &[&str] = &["llama", "mistral", "gemma", "qwen", "deepseek", "phi"];

/// Classify a model name by its family prefix. Case-insensitive.
pub fn classify(model: &str) -> Option<ProviderKind> {
    let lower = model.trim().to_ascii_lowercase();
    let starts = |prefixes: &[&str]| prefixes.iter().any(|p| lower.starts_with(p));

    if starts(OPENAI_PREFIXES) {
        Some(ProviderKind::OpenAi)
    } else if starts(ANTHROPIC_PREFIXES) {
        Some(ProviderKind::Anthropic)
    } else if starts(LOCAL_PREFIXES) {
        Some(ProviderKind::Local)
    } else {
        None
    }
}

/// A configured provider as the routing table sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEntry {
    pub id: String,
    pub kind: ProviderKind,
    pub default_model: Option<String>,
}

impl RouteEntry {
    pub fn new(id: impl Into<String>, kind: ProviderKind) -> Self {
        Self {
            id: id.into(),
            kind,
            default_model: None,
        }
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = Some(model.into());
        self
    }

    /// Model used when a request names none.
    pub fn fallback_model(&self) -> &str {
        self.default_model
            .as_deref()
            .unwrap_or_else(|| self.kind.default_model())
    }
}

/// The outcome of routing a model spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub provider_id: String,
    pub model: String,
}

/// Immutable spec → provider table. Never empty.
#[derive(Debug, Clone)]
pub struct RoutingTable {
    entries: BTreeMap<String, RouteEntry>,
    default_id: String,
}

impl RoutingTable {
    /// Build a table. Fails if no provider is given, or if the explicit
    /// default names a provider that is not in the table.
    pub fn new(
        entries: impl IntoIterator<Item = RouteEntry>,
        explicit_default: Option<&str>,
    ) -> Result<Self> {
        let entries: BTreeMap<String, RouteEntry> = entries
            .into_iter()
            .map(|entry| (entry.id.clone(), entry))
            .collect();

        let default_id = match explicit_default {
            Some(id) if entries.contains_key(id) => id.to_string(),
            Some(id) => {
                return Err(Error::config(format!(
                    "Default provider '{id}' is not configured"
                )));
            }
            // BTreeMap order makes ties deterministic: lowest id wins.
            None => entries
                .values()
                .min_by_key(|entry| entry.kind.priority())
                .map(|entry| entry.id.clone())
                .ok_or_else(|| Error::config("At least one provider must be configured"))?,
        };

        Ok(Self {
            entries,
            default_id,
        })
    }

    /// Build a table from the `[providers]` section of the config.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let entries = config.providers.iter().map(|(id, provider)| RouteEntry {
            id: id.clone(),
            kind: provider.kind,
            default_model: provider.default_model.clone(),
        });
        Self::new(entries, config.default_provider.as_deref())
    }

    /// Id of the provider used when nothing else matches.
    pub fn default_id(&self) -> &str {
        &self.default_id
    }

    pub fn entry(&self, id: &str) -> Option<&RouteEntry> {
        self.entries.get(id)
    }

    pub fn entries(&self) -> impl Iterator<Item = &RouteEntry> {
        self.entries.values()
    }

    /// Resolve a model spec. Total: every spec maps to some configured provider.
    pub fn resolve(&self, spec: &str) -> Route {
        let spec = spec.trim();

        if spec.is_empty() {
            return self.default_route();
        }

        if let Some((prefix, model)) = spec.split_once(':')
            && let Some(entry) = self.entries.get(prefix)
        {
            let model = model.trim();
            return Route {
                provider_id: entry.id.clone(),
                model: if model.is_empty() {
                    entry.fallback_model().to_string()
                } else {
                    model.to_string()
                },
            };
        }

        let provider_id = classify(spec)
            .and_then(|kind| self.first_of_kind(kind))
            .unwrap_or(&self.default_id);

        Route {
            provider_id: provider_id.clone(),
            model: spec.to_string(),
        }
    }

    fn default_route(&self) -> Route {
        let model = self
            .entries
            .get(&self.default_id)
            .map(|entry| entry.fallback_model().to_string())
            .unwrap_or_default();
        Route {
            provider_id: self.default_id.clone(),
            model,
        }
    }

    /// The default provider if it is of this kind, else the first such by id.
    fn first_of_kind(&self, kind: ProviderKind) -> Option<&String> {
        if self
            .entries
            .get(&self.default_id)
            .is_some_and(|entry| entry.kind == kind)
        {
            return Some(&self.default_id);
        }
        self.entries
            .values()
            .find(|entry| entry.kind == kind)
            .map(|entry| &entry.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_table() -> RoutingTable {
        RoutingTable::new(
            [
                RouteEntry::new("openai", ProviderKind::OpenAi),
                RouteEntry::new("anthropic", ProviderKind::Anthropic),
                RouteEntry::new("ollama", ProviderKind::Local).with_default_model("llama3.2"),
            ],
            None,
        )
        .unwrap()
    }

    #[test]
    fn classify_by_prefix() {
        assert_eq!(classify("gpt-4o"), Some(ProviderKind::OpenAi));
        assert_eq!(classify("o3-mini"), Some(ProviderKind::OpenAi));
        assert_eq!(classify("Claude-Opus-4"), Some(ProviderKind::Anthropic));
        assert_eq!(classify("mistral-large"), Some(ProviderKind::Local));
        assert_eq!(classify("phi3"), Some(ProviderKind::Local));
        assert_eq!(classify("command-r"), None);
    }

    #[test]
    fn empty_table_is_a_configuration_error() {
        let err = RoutingTable::new([], None).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn unknown_explicit_default_rejected() {
        let err = RoutingTable::new([RouteEntry::new("openai", ProviderKind::OpenAi)], Some("nope"))
            .unwrap_err();
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn explicit_provider_prefix_wins() {
        let route = full_table().resolve("ollama:gpt-oss");
        assert_eq!(route.provider_id, "ollama");
        assert_eq!(route.model, "gpt-oss");
    }

    #[test]
    fn explicit_prefix_with_blank_model_uses_provider_default() {
        let route = full_table().resolve("ollama:");
        assert_eq!(route.provider_id, "ollama");
        assert_eq!(route.model, "llama3.2");
    }

    #[test]
    fn unconfigured_prefix_is_classified_on_the_whole_spec() {
        let route = full_table().resolve("llama3:8b");
        assert_eq!(route.provider_id, "ollama");
        assert_eq!(route.model, "llama3:8b");
    }

    #[test]
    fn classified_specs_route_by_family() {
        let table = full_table();
        assert_eq!(table.resolve("gpt-4o").provider_id, "openai");
        assert_eq!(table.resolve("claude-sonnet-4").provider_id, "anthropic");
        assert_eq!(table.resolve("qwen2.5-coder").provider_id, "ollama");
    }

    #[test]
    fn unclassified_spec_falls_back_to_default() {
        let route = full_table().resolve("command-r");
        assert_eq!(route.provider_id, "openai");
        assert_eq!(route.model, "command-r");
    }

    #[test]
    fn classified_but_unconfigured_falls_back_to_default() {
        let table = RoutingTable::new(
            [
                RouteEntry::new("claude", ProviderKind::Anthropic),
                RouteEntry::new("ollama", ProviderKind::Local),
            ],
            None,
        )
        .unwrap();
        assert_eq!(table.default_id(), "claude");
        assert_eq!(table.resolve("gpt-4o").provider_id, "claude");
    }

    #[test]
    fn hosted_provider_preferred_as_default() {
        let table = RoutingTable::new(
            [
                RouteEntry::new("a-local", ProviderKind::Local),
                RouteEntry::new("z-hosted", ProviderKind::Other),
            ],
            None,
        )
        .unwrap();
        assert_eq!(table.default_id(), "z-hosted");
    }

    #[test]
    fn explicit_default_overrides_priority() {
        let table = RoutingTable::new(
            [
                RouteEntry::new("openai", ProviderKind::OpenAi),
                RouteEntry::new("ollama", ProviderKind::Local),
            ],
            Some("ollama"),
        )
        .unwrap();
        let route = table.resolve("  ");
        assert_eq!(route.provider_id, "ollama");
        assert_eq!(route.model, "llama3.1");
    }

    #[test]
    fn blank_spec_uses_default_model() {
        let route = full_table().resolve("");
        assert_eq!(route.provider_id, "openai");
        assert_eq!(route.model, "gpt-4o-mini");
    }

    #[test]
    fn single_provider_serves_every_spec() {
        let table =
            RoutingTable::new([RouteEntry::new("only", ProviderKind::Local)], None).unwrap();
        for spec in [
            "",
            "gpt-4o",
            "claude-3-haiku",
            "llama3",
            "unknown-model",
            "other:thing",
            "only:custom",
        ] {
            assert_eq!(table.resolve(spec).provider_id, "only", "spec {spec:?}");
        }
    }

    #[test]
    fn from_config_reads_providers_section() {
        let config = AppConfig::from_toml(
            "default_provider = \"local\"\n[providers.local]\nkind = \"local\"\n[providers.gpt]\nkind = \"openai\"\n",
        )
        .unwrap();
        let table = RoutingTable::from_config(&config).unwrap();
        assert_eq!(table.default_id(), "local");
        assert_eq!(table.resolve("gpt-4.1").provider_id, "gpt");
    }
}
