//! Process listing, termination, and application launching.

use crate::sudo::SudoCache;
use crate::system::{OpOutcome, ProcessInfo, ProcessOperations};
use async_trait::async_trait;
use std::process::{Command, Stdio};
use std::sync::{Arc, Mutex};
use sysinfo::System;
use tracing::{error, info};

/// Process manager backed by sysinfo, with a sudo fallback for
/// processes the operator cannot signal directly.
pub struct ProcessManager {
    system: Mutex<System>,
    sudo: Arc<SudoCache>,
}

impl ProcessManager {
    pub fn new(sudo: Arc<SudoCache>) -> Self {
        Self {
            system: Mutex::new(System::new_all()),
            sudo,
        }
    }
}

#[async_trait]
impl ProcessOperations for ProcessManager {
    fn list(&self, filter: Option<&str>) -> Vec<ProcessInfo> {
        let mut system = self.system.lock().unwrap();
        system.refresh_processes();

        let filter_lower = filter.map(|f| f.to_lowercase());
        let total_memory = system.total_memory().max(1);

        let mut processes: Vec<ProcessInfo> = system
            .processes()
            .iter()
            .filter_map(|(pid, proc)| {
                let name = proc.name().to_string();
                if let Some(f) = &filter_lower {
                    if !name.to_lowercase().contains(f.as_str()) {
                        return None;
                    }
                }
                let mem_percent = proc.memory() as f64 / total_memory as f64 * 100.0;
                Some(ProcessInfo {
                    pid: pid.as_u32(),
                    name,
                    cpu: format!("{:.1}%", proc.cpu_usage()),
                    memory: format!("{mem_percent:.1}%"),
                })
            })
            .collect();

        processes.sort_by_key(|p| p.pid);
        processes
    }

    async fn kill_by_name(&self, name: &str) -> OpOutcome {
        let killed = {
            let mut system = self.system.lock().unwrap();
            system.refresh_processes();

            let needle = name.to_lowercase();
            let mut killed = 0u32;
            for proc in system.processes().values() {
                if proc.name().to_lowercase().contains(&needle) && proc.kill() {
                    killed += 1;
                }
            }
            killed
        };

        if killed > 0 {
            info!("Killed {} process(es) matching '{}'", killed, name);
            return OpOutcome::ok(format!("Killed {killed} process(es) matching '{name}'"));
        }

        // Direct signal failed or nothing matched as this user; retry
        // with privileges when a credential is cached.
        if self.sudo.is_cached() {
            return match self.sudo.run_privileged(&format!("pkill -f {name}")).await {
                Ok(output) if output.exit_code == 0 => {
                    OpOutcome::ok(format!("Killed processes matching '{name}'"))
                }
                Ok(_) => OpOutcome::fail(format!("No matching processes found for '{name}'")),
                Err(e) => {
                    error!("Privileged kill failed: {}", e);
                    OpOutcome::fail(e.to_string())
                }
            };
        }

        OpOutcome::fail(format!("No matching processes found for '{name}'"))
    }

    fn launch(&self, app: &str) -> OpOutcome {
        // Detached spawn; the application outlives the daemon request.
        match Command::new(app)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(_) => OpOutcome::ok(format!("Launched: {app}")),
            Err(e) => {
                error!("Failed to launch {}: {}", app, e);
                OpOutcome::fail(format!("Failed to launch {app}: {e}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sudo::CredentialValidator;
    use porter_common::config::SudoConfig;

    struct AlwaysValid;

    #[async_trait]
    impl CredentialValidator for AlwaysValid {
        async fn validate(&self, _secret: &str) -> bool {
            true
        }
    }

    fn manager() -> ProcessManager {
        ProcessManager::new(Arc::new(SudoCache::new(
            SudoConfig::default(),
            Arc::new(AlwaysValid),
        )))
    }

    #[test]
    fn list_returns_running_processes() {
        let mgr = manager();
        let processes = mgr.list(None);
        // At minimum, this test process exists.
        assert!(!processes.is_empty());
    }

    #[test]
    fn list_filter_narrows_results() {
        let mgr = manager();
        let all = mgr.list(None);
        let none = mgr.list(Some("no-process-is-named-like-this-xyz"));
        assert!(none.len() < all.len());
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn kill_unknown_name_without_credential_fails_cleanly() {
        let mgr = manager();
        let outcome = mgr.kill_by_name("no-process-is-named-like-this-xyz").await;
        assert!(!outcome.success);
        assert!(outcome.message.contains("No matching processes"));
    }

    #[test]
    fn launch_missing_binary_fails_cleanly() {
        let mgr = manager();
        let outcome = mgr.launch("definitely-not-an-installed-app-xyz");
        assert!(!outcome.success);
        assert!(outcome.message.contains("Failed to launch"));
    }
}
