//! Sudo credential cache and privileged command execution.
//!
//! Holds at most one elevated-privilege secret with an expiry instant.
//! The secret lives only in memory, is validated against the privilege
//! mechanism before caching, and is handed to child processes through
//! stdin - never argv or the environment.

use crate::sudo::DangerousCommandGuard;
use async_trait::async_trait;
use porter_common::config::SudoConfig;
use porter_common::RouterError;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, error, info};

/// One cached secret with its expiry instant.
struct CachedCredential {
    secret: String,
    expires_at: Instant,
}

impl CachedCredential {
    fn is_valid(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// Result of a privileged command run.
#[derive(Debug, Clone)]
pub struct PrivilegedOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Validates an elevated-privilege secret against the underlying
/// privilege mechanism. The mechanism is the source of truth; secrets
/// are never compared to a stored hash.
#[async_trait]
pub trait CredentialValidator: Send + Sync {
    async fn validate(&self, secret: &str) -> bool;
}

/// Real validator: runs `sudo -S -v` (a no-op credential probe) with
/// the secret on stdin and checks the exit status.
pub struct SudoValidator {
    probe_timeout: Duration,
}

impl SudoValidator {
    pub fn new(probe_timeout: Duration) -> Self {
        Self { probe_timeout }
    }
}

#[async_trait]
impl CredentialValidator for SudoValidator {
    async fn validate(&self, secret: &str) -> bool {
        let child = Command::new("sudo")
            .arg("-S")
            .arg("-v")
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn();

        let mut child = match child {
            Ok(child) => child,
            Err(e) => {
                error!("Password validation failed: {}", e);
                return false;
            }
        };

        if let Some(mut stdin) = child.stdin.take() {
            let _ = stdin.write_all(format!("{secret}\n").as_bytes()).await;
            // Close stdin so sudo stops waiting for more input.
        }

        match timeout(self.probe_timeout, child.wait()).await {
            Ok(Ok(status)) => status.success(),
            Ok(Err(e)) => {
                error!("Password validation failed: {}", e);
                false
            }
            Err(_) => {
                error!("Password validation timed out");
                false
            }
        }
    }
}

/// Manages sudo authentication and credential caching.
pub struct SudoCache {
    cache: Mutex<Option<CachedCredential>>,
    guard: DangerousCommandGuard,
    validator: Arc<dyn CredentialValidator>,
    config: SudoConfig,
}

impl SudoCache {
    pub fn new(config: SudoConfig, validator: Arc<dyn CredentialValidator>) -> Self {
        Self {
            cache: Mutex::new(None),
            guard: DangerousCommandGuard::new(&config.dangerous_commands),
            validator,
            config,
        }
    }

    /// Validate and cache a secret, replacing any prior value.
    ///
    /// `ttl` defaults to the configured cache timeout. A secret that
    /// fails validation is never cached and leaves existing state
    /// untouched.
    pub async fn set_password(
        &self,
        secret: &str,
        ttl: Option<Duration>,
    ) -> Result<(), RouterError> {
        if !self.validator.validate(secret).await {
            return Err(RouterError::InvalidCredential);
        }

        let ttl = ttl.unwrap_or(Duration::from_secs(self.config.cache_timeout_secs));
        let mut slot = self.cache.lock().unwrap();
        *slot = Some(CachedCredential {
            secret: secret.to_string(),
            expires_at: Instant::now() + ttl,
        });
        info!("Sudo password cached for {} seconds", ttl.as_secs());
        Ok(())
    }

    /// The cached secret, if one exists and has not expired. Expiry is
    /// re-checked here; the background sweep is hygiene only.
    pub fn get_password(&self) -> Option<String> {
        let slot = self.cache.lock().unwrap();
        match slot.as_ref() {
            Some(cached) if cached.is_valid() => Some(cached.secret.clone()),
            _ => None,
        }
    }

    /// Whether a live credential is cached.
    pub fn is_cached(&self) -> bool {
        self.get_password().is_some()
    }

    /// Drop any cached credential immediately.
    pub fn clear(&self) {
        let mut slot = self.cache.lock().unwrap();
        if slot.is_some() {
            info!("Sudo cache cleared");
        }
        *slot = None;
    }

    /// Clear the slot if the entry has expired. Shortens the secret's
    /// memory lifetime; `get_password` does not depend on it.
    fn sweep(&self) {
        let mut slot = self.cache.lock().unwrap();
        if let Some(cached) = slot.as_ref() {
            if !cached.is_valid() {
                debug!("Sudo cache expired, clearing");
                *slot = None;
            }
        }
    }

    /// Spawn the periodic expiry sweep. The returned handle is aborted
    /// on shutdown.
    pub fn spawn_sweeper(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        let interval = Duration::from_secs(self.config.sweep_interval_secs);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await; // first tick completes immediately
            loop {
                ticker.tick().await;
                self.sweep();
            }
        })
    }

    /// Run a command with sudo privileges.
    ///
    /// The dangerous-command check runs first and cannot be bypassed
    /// from here: a flagged command fails before any child process is
    /// spawned, whether or not a credential is cached.
    pub async fn run_privileged(&self, command: &str) -> Result<PrivilegedOutput, RouterError> {
        if self.config.require_confirmation && self.guard.is_dangerous(command) {
            return Err(RouterError::DangerousCommandBlocked(command.to_string()));
        }

        let secret = self.get_password().ok_or(RouterError::NoCredentialCached)?;

        // sudo -S reads the password from stdin.
        let full_command = format!("sudo -S {command}");
        let child = Command::new("sh")
            .arg("-c")
            .arg(&full_command)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let mut child = match child {
            Ok(child) => child,
            Err(e) => {
                error!("Sudo command failed: {}", e);
                return Ok(PrivilegedOutput {
                    exit_code: -1,
                    stdout: String::new(),
                    stderr: e.to_string(),
                });
            }
        };

        if let Some(mut stdin) = child.stdin.take() {
            let _ = stdin.write_all(format!("{secret}\n").as_bytes()).await;
        }

        let exec_timeout = Duration::from_secs(self.config.exec_timeout_secs);
        let output = match timeout(exec_timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                error!("Sudo command failed: {}", e);
                return Ok(PrivilegedOutput {
                    exit_code: -1,
                    stdout: String::new(),
                    stderr: e.to_string(),
                });
            }
            // Dropping the wait future kills the child (kill_on_drop).
            Err(_) => {
                error!("Sudo command timeout: {}", command);
                return Err(RouterError::ExecutionTimeout(self.config.exec_timeout_secs));
            }
        };

        let exit_code = output.status.code().unwrap_or(-1);
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = scrub_prompt_lines(&String::from_utf8_lossy(&output.stderr));

        let preview: String = command.chars().take(50).collect();
        info!("Sudo command executed: {}... (rc={})", preview, exit_code);

        Ok(PrivilegedOutput {
            exit_code,
            stdout,
            stderr,
        })
    }

    #[cfg(test)]
    fn has_entry(&self) -> bool {
        self.cache.lock().unwrap().is_some()
    }
}

/// Drop sudo's interactive password-prompt boilerplate from captured
/// stderr before handing it back to callers.
fn scrub_prompt_lines(stderr: &str) -> String {
    stderr
        .lines()
        .filter(|line| !line.starts_with("[sudo]") && !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
