//! Error taxonomy for command routing and privileged execution.
//!
//! Every variant here is recovered into a user-facing string at the
//! router boundary; nothing propagates past `route_command`.

/// Errors produced by the routing core.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RouterError {
    /// Named provider is not registered or not configured. Selection
    /// falls back past this; it only surfaces when every fallback is
    /// exhausted.
    #[error("AI provider '{0}' not available")]
    ProviderUnavailable(String),

    /// Secret failed the privilege mechanism's validation probe.
    #[error("Invalid sudo password")]
    InvalidCredential,

    /// Privileged execution attempted with nothing cached or an
    /// expired entry.
    #[error("No sudo password available. Use 'sudo code:<password>' first.")]
    NoCredentialCached,

    /// Policy veto. Never retried, never silently downgraded.
    #[error("Dangerous command blocked: {0}\nThis command requires explicit user confirmation.")]
    DangerousCommandBlocked(String),

    /// Subprocess exceeded its bound and was killed.
    #[error("Command execution timeout after {0}s")]
    ExecutionTimeout(u64),

    /// Key unreadable/unwritable or ciphertext unauthenticatable.
    #[error("Cipher failure: {0}")]
    Cipher(String),

    /// AI backend failure, surfaced as a user-visible message.
    #[error("{provider} backend error: {message}")]
    Backend { provider: String, message: String },

    /// Malformed pattern or other load-time configuration problem.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl RouterError {
    /// Backend error constructor, mirroring the shape providers report.
    pub fn backend(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Backend {
            provider: provider.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_caller_guidance() {
        let err = RouterError::NoCredentialCached;
        assert!(err.to_string().contains("sudo code:"));
    }

    #[test]
    fn dangerous_command_names_the_command() {
        let err = RouterError::DangerousCommandBlocked("rm -rf /".to_string());
        assert!(err.to_string().contains("rm -rf /"));
    }
}
