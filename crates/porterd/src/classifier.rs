//! Intent classification - free text to a routing decision.
//!
//! An ordered list of system-action patterns is tested against the
//! lower-cased input; the first match wins, so declaration order is
//! load-bearing (e.g. "list downloads" and "list processes" both hit
//! the earlier file-listing pattern). Anything that matches nothing is
//! an AI query.

use crate::providers::{ProviderRegistry, ProviderSelector};
use porter_common::{Intent, RouterError, SystemActionKind};
use regex::Regex;

/// Ordered system-action patterns. Capture groups carry the arguments
/// the downstream handler needs (package names, paths, ...).
const SYSTEM_PATTERNS: &[(SystemActionKind, &str)] = &[
    (
        SystemActionKind::PackageInstall,
        r"\b(install|setup)\s+([a-zA-Z0-9\-_\s]+)",
    ),
    (
        SystemActionKind::PackageUninstall,
        r"\b(uninstall|remove)\s+([a-zA-Z0-9\-_\s]+)",
    ),
    (
        SystemActionKind::PackageUpdate,
        r"\b(update|upgrade)\s+(system|packages?)",
    ),
    (
        SystemActionKind::FileCreate,
        r"\bcreate\s+(file|folder|directory)\s+(.+)",
    ),
    (SystemActionKind::FileMove, r"\bmove\s+(.+?)\s+to\s+(.+)"),
    (
        SystemActionKind::FileDelete,
        r"\bdelete\s+(file|folder)?\s*(.+)",
    ),
    (SystemActionKind::FileFind, r"\bfind\s+(.+?)\s+in\s+(.+)"),
    (SystemActionKind::FileList, r"\blist\s+(.+)"),
    (SystemActionKind::ProcessKill, r"\bkill\s+(.+)"),
    (
        SystemActionKind::ProcessList,
        r"\blist\s+(all\s+)?processes?\s*(.+)?",
    ),
    (
        SystemActionKind::AppLaunch,
        r"\b(launch|open|start)\s+(.+)",
    ),
];

/// Maps free-text input to a structured intent.
pub struct IntentClassifier {
    patterns: Vec<(SystemActionKind, Regex)>,
}

impl IntentClassifier {
    /// Compile the pattern table. A malformed pattern is a load-time
    /// configuration error, never a classification-time failure.
    pub fn new() -> Result<Self, RouterError> {
        let mut patterns = Vec::with_capacity(SYSTEM_PATTERNS.len());
        for (kind, pattern) in SYSTEM_PATTERNS {
            let regex = Regex::new(pattern)
                .map_err(|e| RouterError::Config(format!("bad intent pattern '{pattern}': {e}")))?;
            patterns.push((*kind, regex));
        }
        Ok(Self { patterns })
    }

    /// Classify one command. System patterns are tried in declaration
    /// order; no match means the text is an AI query for whichever
    /// provider the selector picks.
    pub fn classify(
        &self,
        text: &str,
        selector: &ProviderSelector,
        registry: &ProviderRegistry,
    ) -> Intent {
        let lower = text.to_lowercase();

        for (kind, regex) in &self.patterns {
            if let Some(caps) = regex.captures(&lower) {
                let captures = caps
                    .iter()
                    .skip(1) // group 0 is the whole match
                    .map(|m| m.map(|m| m.as_str().to_string()))
                    .collect();
                return Intent::SystemAction {
                    kind: *kind,
                    captures,
                };
            }
        }

        Intent::AiQuery {
            provider: selector.select(&lower, registry),
        }
    }
}
