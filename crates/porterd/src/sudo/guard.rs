//! Dangerous command detection.
//!
//! Pure policy check - this module never executes anything. A command
//! is flagged when it contains a configured deny substring, or when it
//! combines a recursive delete with a protected top-level directory.

/// Top-level directories a recursive delete must never be rooted at.
const PROTECTED_PATHS: &[&str] = &["/", "/usr", "/etc", "/var", "/bin", "/sbin", "/lib"];

/// Policy check for commands headed to privileged execution.
pub struct DangerousCommandGuard {
    deny_patterns: Vec<String>,
}

impl DangerousCommandGuard {
    /// Build a guard from configured deny substrings.
    pub fn new(deny_patterns: &[String]) -> Self {
        Self {
            deny_patterns: deny_patterns.iter().map(|p| p.to_lowercase()).collect(),
        }
    }

    /// True if the command matches the deny list or the recursive
    /// delete heuristic. Case-insensitive, side-effect-free.
    pub fn is_dangerous(&self, command: &str) -> bool {
        let command_lower = command.to_lowercase();
        let command_lower = command_lower.trim();

        for pattern in &self.deny_patterns {
            if command_lower.contains(pattern.as_str()) {
                return true;
            }
        }

        // Recursive delete touching a protected system path, with or
        // without a leading separator.
        if command_lower.contains("rm") && command_lower.contains("-rf") && command_lower.contains('/') {
            for path in PROTECTED_PATHS {
                if command_lower.contains(&format!(" {path}"))
                    || command_lower.contains(&format!("/{path}"))
                {
                    return true;
                }
            }
        }

        false
    }
}
