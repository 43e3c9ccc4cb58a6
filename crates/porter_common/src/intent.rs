//! Intent model - the classified meaning of a raw command.
//!
//! An intent is either a system action with its captured arguments or
//! an AI query with the provider that should answer it. Intents are
//! constructed fresh per input and never persisted.

use serde::{Deserialize, Serialize};

/// System action subtypes recognized by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemActionKind {
    PackageInstall,
    PackageUninstall,
    PackageUpdate,
    FileCreate,
    FileMove,
    FileDelete,
    FileFind,
    FileList,
    ProcessKill,
    ProcessList,
    AppLaunch,
}

impl SystemActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SystemActionKind::PackageInstall => "package_install",
            SystemActionKind::PackageUninstall => "package_uninstall",
            SystemActionKind::PackageUpdate => "package_update",
            SystemActionKind::FileCreate => "file_create",
            SystemActionKind::FileMove => "file_move",
            SystemActionKind::FileDelete => "file_delete",
            SystemActionKind::FileFind => "file_find",
            SystemActionKind::FileList => "file_list",
            SystemActionKind::ProcessKill => "process_kill",
            SystemActionKind::ProcessList => "process_list",
            SystemActionKind::AppLaunch => "app_launch",
        }
    }
}

impl std::fmt::Display for SystemActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classified meaning of one raw command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// A system action with the regex capture groups the downstream
    /// handler needs (package names, source/destination paths, ...).
    SystemAction {
        kind: SystemActionKind,
        captures: Vec<Option<String>>,
    },
    /// Everything else is a question for an AI backend.
    AiQuery { provider: String },
}

/// A pattern-to-provider mapping used to pick an AI backend.
///
/// Rules are kept in insertion order and matched first-match-wins.
/// `priority` is carried from configuration but is not a sort key; see
/// DESIGN.md for the open question around it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingRule {
    pub pattern: String,
    pub provider: String,
    #[serde(default)]
    pub priority: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_kind_round_trips_through_serde() {
        let json = serde_json::to_string(&SystemActionKind::PackageInstall).unwrap();
        assert_eq!(json, "\"package_install\"");
        let back: SystemActionKind = serde_json::from_str(&json).unwrap();
        assert_eq!(back, SystemActionKind::PackageInstall);
    }

    #[test]
    fn routing_rule_priority_defaults_to_zero() {
        let rule: RoutingRule =
            toml::from_str("pattern = \"code\"\nprovider = \"deepseek\"").unwrap();
        assert_eq!(rule.priority, 0);
        assert_eq!(rule.provider, "deepseek");
    }
}
