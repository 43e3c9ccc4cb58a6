//! AI backends: the provider contract, the registry of configured
//! backends, and rule-based provider selection.

pub mod chatgpt;
pub mod deepseek;
pub mod gemini;

pub use chatgpt::ChatGptProvider;
pub use deepseek::DeepSeekProvider;
pub use gemini::GeminiProvider;

use async_trait::async_trait;
use porter_common::config::AiConfig;
use porter_common::RouterError;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Provider picked when no rule matches and no usable default is
/// configured. Gemini handles general queries well.
pub const FALLBACK_PROVIDER: &str = "gemini";

/// One turn of prior conversation passed along with a query.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
}

/// Optional context attached to an AI query.
#[derive(Debug, Clone, Default)]
pub struct QueryContext {
    /// Free-text response-style instruction (e.g. "answer in bullets").
    pub response_style: Option<String>,
    /// Prior turns, oldest first.
    pub history: Vec<ChatTurn>,
}

impl QueryContext {
    pub fn with_style(style: impl Into<String>) -> Self {
        Self {
            response_style: Some(style.into()),
            history: Vec::new(),
        }
    }
}

/// Contract every AI backend implements.
#[async_trait]
pub trait AiProvider: Send + Sync {
    /// Short registry name ("gemini", "chatgpt", ...).
    fn name(&self) -> &str;

    /// Whether the provider has credentials. Missing configuration is
    /// distinguishable from a transient failure: it is checked here,
    /// never reported as a query error.
    fn is_configured(&self) -> bool;

    /// Send a prompt and return the response text.
    async fn query(&self, prompt: &str, context: Option<&QueryContext>)
        -> Result<String, RouterError>;
}

/// Registered AI backends, keyed by name.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn AiProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, provider: Arc<dyn AiProvider>) {
        self.providers.insert(provider.name().to_string(), provider);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn AiProvider>> {
        self.providers.get(name).cloned()
    }

    /// Registered and credentialed - the bar a routing rule's provider
    /// must clear to be selected.
    pub fn is_available(&self, name: &str) -> bool {
        self.providers
            .get(name)
            .map(|p| p.is_configured())
            .unwrap_or(false)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.providers.keys().cloned().collect();
        names.sort();
        names
    }
}

struct CompiledRule {
    regex: Regex,
    provider: String,
    /// Carried from configuration but not a sort key; matching is
    /// strictly first-in-list. See DESIGN.md.
    #[allow(dead_code)]
    priority: i32,
}

/// Picks an AI backend for a query using ordered routing rules.
pub struct ProviderSelector {
    rules: Vec<CompiledRule>,
    default_provider: String,
}

impl ProviderSelector {
    /// Compile the configured routing rules. A malformed pattern is a
    /// load-time configuration error.
    pub fn new(config: &AiConfig) -> Result<Self, RouterError> {
        let mut rules = Vec::with_capacity(config.routing_rules.len());
        for rule in &config.routing_rules {
            let regex = Regex::new(&rule.pattern).map_err(|e| {
                RouterError::Config(format!("bad routing pattern '{}': {e}", rule.pattern))
            })?;
            rules.push(CompiledRule {
                regex,
                provider: rule.provider.clone(),
                priority: rule.priority,
            });
        }
        Ok(Self {
            rules,
            default_provider: config.default_provider.clone(),
        })
    }

    /// First matching rule whose provider is available wins; falls back
    /// to the configured default, then to [`FALLBACK_PROVIDER`]. An
    /// unavailable provider named by a rule or default is skipped
    /// silently - non-configuration surfaces at invocation time, not
    /// here.
    pub fn select(&self, text: &str, registry: &ProviderRegistry) -> String {
        let lower = text.to_lowercase();

        for rule in &self.rules {
            if rule.regex.is_match(&lower) && registry.is_available(&rule.provider) {
                info!(
                    "Routing to {} based on pattern: {}",
                    rule.provider,
                    rule.regex.as_str()
                );
                return rule.provider.clone();
            }
        }

        if self.default_provider != "auto" && registry.is_available(&self.default_provider) {
            return self.default_provider.clone();
        }

        FALLBACK_PROVIDER.to_string()
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use porter_common::intent::RoutingRule;

    /// Canned provider for selector and router tests.
    pub struct StubProvider {
        name: String,
        configured: bool,
    }

    impl StubProvider {
        pub fn new(name: &str, configured: bool) -> Self {
            Self {
                name: name.to_string(),
                configured,
            }
        }
    }

    #[async_trait]
    impl AiProvider for StubProvider {
        fn name(&self) -> &str {
            &self.name
        }

        fn is_configured(&self) -> bool {
            self.configured
        }

        async fn query(
            &self,
            prompt: &str,
            context: Option<&QueryContext>,
        ) -> Result<String, RouterError> {
            let style = context
                .and_then(|c| c.response_style.as_deref())
                .unwrap_or("none");
            Ok(format!("[{}|style={style}] {prompt}", self.name))
        }
    }

    /// Registry with the given providers, all configured.
    pub fn registry_with_configured(names: &[&str]) -> ProviderRegistry {
        let mut registry = ProviderRegistry::new();
        for name in names {
            registry.register(Arc::new(StubProvider::new(name, true)));
        }
        registry
    }

    fn config_with_rules(rules: Vec<RoutingRule>, default_provider: &str) -> AiConfig {
        AiConfig {
            default_provider: default_provider.to_string(),
            routing_rules: rules,
            ..AiConfig::default()
        }
    }

    fn rule(pattern: &str, provider: &str, priority: i32) -> RoutingRule {
        RoutingRule {
            pattern: pattern.to_string(),
            provider: provider.to_string(),
            priority,
        }
    }

    #[test]
    fn first_matching_rule_wins_over_higher_priority() {
        // Both rules match; the later one carries a higher priority and
        // must still lose.
        let config = config_with_rules(
            vec![rule("code", "deepseek", 1), rule("code", "chatgpt", 100)],
            "auto",
        );
        let selector = ProviderSelector::new(&config).unwrap();
        let registry = registry_with_configured(&["deepseek", "chatgpt"]);

        assert_eq!(selector.select("debug this code", &registry), "deepseek");
    }

    #[test]
    fn unavailable_provider_is_skipped_silently() {
        let config = config_with_rules(
            vec![rule("code", "deepseek", 10), rule("code", "chatgpt", 10)],
            "auto",
        );
        let selector = ProviderSelector::new(&config).unwrap();

        // deepseek registered but not configured.
        let mut registry = registry_with_configured(&["chatgpt"]);
        registry.register(Arc::new(StubProvider::new("deepseek", false)));

        assert_eq!(selector.select("review my code", &registry), "chatgpt");
    }

    #[test]
    fn default_provider_used_when_no_rule_matches() {
        let config = config_with_rules(vec![rule("code", "deepseek", 10)], "chatgpt");
        let selector = ProviderSelector::new(&config).unwrap();
        let registry = registry_with_configured(&["chatgpt", "deepseek"]);

        assert_eq!(
            selector.select("what is the capital of France", &registry),
            "chatgpt"
        );
    }

    #[test]
    fn fixed_fallback_when_default_unavailable() {
        let config = config_with_rules(vec![], "chatgpt");
        let selector = ProviderSelector::new(&config).unwrap();
        let registry = registry_with_configured(&["gemini"]);

        assert_eq!(
            selector.select("what is the capital of France", &registry),
            FALLBACK_PROVIDER
        );
    }

    #[test]
    fn auto_default_goes_straight_to_fallback() {
        let config = config_with_rules(vec![], "auto");
        let selector = ProviderSelector::new(&config).unwrap();
        let registry = registry_with_configured(&["gemini", "chatgpt"]);

        assert_eq!(selector.select("hello there", &registry), "gemini");
    }

    #[test]
    fn selection_is_case_insensitive() {
        let config = config_with_rules(vec![rule("research", "gemini", 10)], "auto");
        let selector = ProviderSelector::new(&config).unwrap();
        let registry = registry_with_configured(&["gemini"]);

        assert_eq!(selector.select("RESEARCH quantum computing", &registry), "gemini");
    }

    #[test]
    fn malformed_rule_pattern_is_a_config_error() {
        let config = config_with_rules(vec![rule("(unclosed", "gemini", 0)], "auto");
        assert!(matches!(
            ProviderSelector::new(&config),
            Err(RouterError::Config(_))
        ));
    }

    #[test]
    fn registry_availability_requires_configuration() {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(StubProvider::new("gemini", false)));

        assert!(!registry.is_available("gemini"));
        assert!(!registry.is_available("unregistered"));
        assert!(registry.get("gemini").is_some());
    }
}
