//! Configuration for the Porter daemon.
//!
//! Loads settings from /etc/porter/config.toml or uses defaults.

use crate::intent::RoutingRule;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

/// Config file path
pub const CONFIG_PATH: &str = "/etc/porter/config.toml";

/// Default config file path for fallback
pub const FALLBACK_CONFIG_PATH: &str = "/var/lib/porter/config.toml";

/// AI routing and backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    /// Provider used when no routing rule matches ("auto" = built-in fallback)
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_ai_timeout")]
    pub timeout_secs: u64,

    /// Maximum retries for transient backend failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Ordered routing rules; first matching pattern wins
    #[serde(default = "default_routing_rules")]
    pub routing_rules: Vec<RoutingRule>,
}

fn default_provider() -> String {
    "auto".to_string()
}

fn default_routing_rules() -> Vec<RoutingRule> {
    vec![
        RoutingRule {
            pattern: "research|latest|news|current".to_string(),
            provider: "gemini".to_string(),
            priority: 10,
        },
        RoutingRule {
            pattern: "code|script|program|debug|function".to_string(),
            provider: "deepseek".to_string(),
            priority: 10,
        },
        RoutingRule {
            pattern: "decide|compare|analyze|recommend|choose".to_string(),
            provider: "chatgpt".to_string(),
            priority: 10,
        },
    ]
}

fn default_ai_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            default_provider: default_provider(),
            routing_rules: default_routing_rules(),
            timeout_secs: default_ai_timeout(),
            max_retries: default_max_retries(),
        }
    }
}

/// Sudo credential cache and privileged execution configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SudoConfig {
    /// Default credential cache lifetime in seconds
    #[serde(default = "default_cache_timeout")]
    pub cache_timeout_secs: u64,

    /// Background expiry sweep interval in seconds
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,

    /// Refuse dangerous commands outright; with this off they proceed
    /// unblocked (observed legacy behavior, see DESIGN.md)
    #[serde(default = "default_require_confirmation")]
    pub require_confirmation: bool,

    /// Privileged command execution timeout in seconds
    #[serde(default = "default_exec_timeout")]
    pub exec_timeout_secs: u64,

    /// Credential validation probe timeout in seconds
    #[serde(default = "default_validate_timeout")]
    pub validate_timeout_secs: u64,

    /// Deny-list substrings matched case-insensitively
    #[serde(default = "default_dangerous_commands")]
    pub dangerous_commands: Vec<String>,
}

fn default_cache_timeout() -> u64 {
    300
}

fn default_sweep_interval() -> u64 {
    60
}

fn default_require_confirmation() -> bool {
    true
}

fn default_exec_timeout() -> u64 {
    30
}

fn default_validate_timeout() -> u64 {
    5
}

fn default_dangerous_commands() -> Vec<String> {
    vec![
        "rm -rf /".to_string(),
        "mkfs".to_string(),
        "dd if=/dev/zero".to_string(),
        // Fork bomb
        ":(){:|:&};:".to_string(),
    ]
}

impl Default for SudoConfig {
    fn default() -> Self {
        Self {
            cache_timeout_secs: default_cache_timeout(),
            sweep_interval_secs: default_sweep_interval(),
            require_confirmation: default_require_confirmation(),
            exec_timeout_secs: default_exec_timeout(),
            validate_timeout_secs: default_validate_timeout(),
            dangerous_commands: default_dangerous_commands(),
        }
    }
}

/// Response style configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseConfig {
    /// Style applied when the user names none
    #[serde(default = "default_style")]
    pub default_style: String,

    /// Named style instructions passed to the AI backend
    #[serde(default = "default_styles")]
    pub styles: HashMap<String, String>,
}

fn default_style() -> String {
    "short".to_string()
}

fn default_styles() -> HashMap<String, String> {
    let mut styles = HashMap::new();
    styles.insert(
        "short".to_string(),
        "Provide a concise, direct answer. 2-3 sentences max.".to_string(),
    );
    styles.insert(
        "detailed".to_string(),
        "Provide a comprehensive, well-explained answer with examples.".to_string(),
    );
    styles.insert(
        "bullets".to_string(),
        "Provide answer as clear bullet points.".to_string(),
    );
    styles.insert(
        "technical".to_string(),
        "Provide detailed technical explanation with proper terminology.".to_string(),
    );
    styles
}

impl Default for ResponseConfig {
    fn default() -> Self {
        Self {
            default_style: default_style(),
            styles: default_styles(),
        }
    }
}

impl ResponseConfig {
    /// Resolve a named style, falling back to the default style's
    /// instruction when the name is unknown.
    pub fn style_instruction(&self, name: &str) -> Option<&str> {
        self.styles
            .get(&name.to_lowercase())
            .or_else(|| self.styles.get(&self.default_style))
            .map(String::as_str)
    }

    /// Instruction for the configured default style.
    pub fn default_instruction(&self) -> &str {
        self.styles
            .get(&self.default_style)
            .map(String::as_str)
            .unwrap_or("Provide a clear, helpful response.")
    }
}

/// Paths for at-rest secret material
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Symmetric key file (owner read/write only)
    #[serde(default = "default_key_file")]
    pub key_file: PathBuf,

    /// Encrypted credential store blob
    #[serde(default = "default_store_file")]
    pub store_file: PathBuf,
}

fn default_key_file() -> PathBuf {
    PathBuf::from("/etc/porter/.key")
}

fn default_store_file() -> PathBuf {
    PathBuf::from("/etc/porter/api_keys.enc")
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            key_file: default_key_file(),
            store_file: default_store_file(),
        }
    }
}

/// Full daemon configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub ai: AiConfig,

    #[serde(default)]
    pub sudo: SudoConfig,

    #[serde(default)]
    pub response: ResponseConfig,

    #[serde(default)]
    pub security: SecurityConfig,
}

impl Config {
    /// Load config from the standard locations, or return defaults.
    pub fn load() -> Self {
        Self::load_from_path(CONFIG_PATH)
            .or_else(|_| Self::load_from_path(FALLBACK_CONFIG_PATH))
            .unwrap_or_else(|e| {
                warn!("Config not found, using defaults: {}", e);
                Config::default()
            })
    }

    /// Load config from a specific path.
    pub fn load_from_path(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!("Loaded config from {}", path);
        Ok(config)
    }

    /// Save default config to a path (for init).
    pub fn save_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)?;
        if let Some(parent) = std::path::Path::new(path).parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        info!("Saved default config to {}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.ai.default_provider, "auto");
        assert_eq!(config.ai.routing_rules.len(), 3);
        assert_eq!(config.sudo.cache_timeout_secs, 300);
        assert!(config.sudo.require_confirmation);
        assert!(config
            .sudo
            .dangerous_commands
            .contains(&"rm -rf /".to_string()));
    }

    #[test]
    fn test_parse_toml() {
        let toml_str = r#"
[ai]
default_provider = "deepseek"
timeout_secs = 10

[sudo]
cache_timeout_secs = 120
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.ai.default_provider, "deepseek");
        assert_eq!(config.ai.timeout_secs, 10);
        assert_eq!(config.sudo.cache_timeout_secs, 120);
        // Defaults for missing fields
        assert_eq!(config.sudo.sweep_interval_secs, 60);
        assert_eq!(config.response.default_style, "short");
    }

    #[test]
    fn test_routing_rules_keep_declaration_order() {
        let toml_str = r#"
[[ai.routing_rules]]
pattern = "alpha"
provider = "chatgpt"
priority = 1

[[ai.routing_rules]]
pattern = "alpha"
provider = "gemini"
priority = 99
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        // Order in the file is order in the list, regardless of priority.
        assert_eq!(config.ai.routing_rules[0].provider, "chatgpt");
        assert_eq!(config.ai.routing_rules[1].provider, "gemini");
    }

    #[test]
    fn test_style_lookup_falls_back_to_default() {
        let response = ResponseConfig::default();
        let known = response.style_instruction("bullets").unwrap();
        assert!(known.contains("bullet"));
        let unknown = response.style_instruction("sonnet").unwrap();
        assert_eq!(unknown, response.default_instruction());
    }

    #[test]
    fn test_save_and_reload_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let path_str = path.to_str().unwrap();

        Config::save_default(path_str).unwrap();
        let loaded = Config::load_from_path(path_str).unwrap();
        assert_eq!(loaded.ai.default_provider, "auto");
        assert_eq!(loaded.sudo.dangerous_commands.len(), 4);
    }
}
