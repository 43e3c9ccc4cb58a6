//! Multi-distribution package management.
//!
//! Detects the system package manager once at startup and routes
//! install/remove/update through the sudo credential cache.

use crate::sudo::SudoCache;
use crate::system::{OpOutcome, PackageOperations};
use async_trait::async_trait;
use porter_common::RouterError;
use std::fs;
use std::sync::Arc;
use tracing::{error, info};

/// Supported package managers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManagerKind {
    /// Debian, Ubuntu
    Apt,
    /// Fedora, RHEL 8+
    Dnf,
    /// RHEL 7, CentOS 7
    Yum,
    /// Arch, Manjaro
    Pacman,
    /// openSUSE
    Zypper,
    Unknown,
}

impl PackageManagerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PackageManagerKind::Apt => "apt",
            PackageManagerKind::Dnf => "dnf",
            PackageManagerKind::Yum => "yum",
            PackageManagerKind::Pacman => "pacman",
            PackageManagerKind::Zypper => "zypper",
            PackageManagerKind::Unknown => "unknown",
        }
    }

    fn install_command(&self, packages: &str) -> Option<String> {
        match self {
            PackageManagerKind::Apt => Some(format!("apt install -y {packages}")),
            PackageManagerKind::Dnf => Some(format!("dnf install -y {packages}")),
            PackageManagerKind::Yum => Some(format!("yum install -y {packages}")),
            PackageManagerKind::Pacman => Some(format!("pacman -S --noconfirm {packages}")),
            PackageManagerKind::Zypper => Some(format!("zypper install -y {packages}")),
            PackageManagerKind::Unknown => None,
        }
    }

    fn uninstall_command(&self, packages: &str) -> Option<String> {
        match self {
            PackageManagerKind::Apt => Some(format!("apt remove -y {packages}")),
            PackageManagerKind::Dnf => Some(format!("dnf remove -y {packages}")),
            PackageManagerKind::Yum => Some(format!("yum remove -y {packages}")),
            PackageManagerKind::Pacman => Some(format!("pacman -R --noconfirm {packages}")),
            PackageManagerKind::Zypper => Some(format!("zypper remove -y {packages}")),
            PackageManagerKind::Unknown => None,
        }
    }

    fn update_command(&self) -> Option<String> {
        match self {
            PackageManagerKind::Apt => Some("apt update && apt upgrade -y".to_string()),
            PackageManagerKind::Dnf => Some("dnf upgrade -y".to_string()),
            PackageManagerKind::Yum => Some("yum update -y".to_string()),
            PackageManagerKind::Pacman => Some("pacman -Syu --noconfirm".to_string()),
            PackageManagerKind::Zypper => Some("zypper update -y".to_string()),
            PackageManagerKind::Unknown => None,
        }
    }
}

/// Package manager working through the sudo credential cache.
pub struct SystemPackageManager {
    kind: PackageManagerKind,
    sudo: Arc<SudoCache>,
}

impl SystemPackageManager {
    pub fn new(sudo: Arc<SudoCache>) -> Self {
        let kind = detect_package_manager();
        info!("Detected package manager: {}", kind.as_str());
        Self { kind, sudo }
    }

    #[cfg(test)]
    pub fn with_kind(kind: PackageManagerKind, sudo: Arc<SudoCache>) -> Self {
        Self { kind, sudo }
    }

    pub fn kind(&self) -> PackageManagerKind {
        self.kind
    }

    async fn run(&self, command: String, success_msg: String, failure_prefix: &str) -> OpOutcome {
        match self.sudo.run_privileged(&command).await {
            Ok(output) if output.exit_code == 0 => OpOutcome::ok(success_msg),
            Ok(output) => {
                let detail = if output.stderr.is_empty() {
                    output.stdout
                } else {
                    output.stderr
                };
                OpOutcome::fail(format!("{failure_prefix}: {detail}"))
            }
            Err(e @ RouterError::DangerousCommandBlocked(_))
            | Err(e @ RouterError::NoCredentialCached)
            | Err(e @ RouterError::ExecutionTimeout(_)) => OpOutcome::fail(e.to_string()),
            Err(e) => {
                error!("Package command error: {}", e);
                OpOutcome::fail(e.to_string())
            }
        }
    }
}

#[async_trait]
impl PackageOperations for SystemPackageManager {
    async fn install(&self, packages: &[String]) -> OpOutcome {
        if packages.is_empty() {
            return OpOutcome::fail("No packages specified");
        }
        let package_str = packages.join(" ");
        let Some(command) = self.kind.install_command(&package_str) else {
            return OpOutcome::fail(format!(
                "Unsupported package manager: {}",
                self.kind.as_str()
            ));
        };
        self.run(
            command,
            format!("Successfully installed: {package_str}"),
            "Installation failed",
        )
        .await
    }

    async fn uninstall(&self, packages: &[String]) -> OpOutcome {
        if packages.is_empty() {
            return OpOutcome::fail("No packages specified");
        }
        let package_str = packages.join(" ");
        let Some(command) = self.kind.uninstall_command(&package_str) else {
            return OpOutcome::fail(format!(
                "Unsupported package manager: {}",
                self.kind.as_str()
            ));
        };
        self.run(
            command,
            format!("Successfully uninstalled: {package_str}"),
            "Uninstallation failed",
        )
        .await
    }

    async fn update(&self) -> OpOutcome {
        let Some(command) = self.kind.update_command() else {
            return OpOutcome::fail(format!(
                "Unsupported package manager: {}",
                self.kind.as_str()
            ));
        };
        self.run(
            command,
            "System updated successfully".to_string(),
            "Update failed",
        )
        .await
    }
}

/// Probe for known manager binaries, then fall back to /etc/os-release.
fn detect_package_manager() -> PackageManagerKind {
    let candidates = [
        (PackageManagerKind::Apt, "apt"),
        (PackageManagerKind::Dnf, "dnf"),
        (PackageManagerKind::Yum, "yum"),
        (PackageManagerKind::Pacman, "pacman"),
        (PackageManagerKind::Zypper, "zypper"),
    ];
    for (kind, binary) in candidates {
        if which::which(binary).is_ok() {
            return kind;
        }
    }

    match fs::read_to_string("/etc/os-release") {
        Ok(content) => kind_from_os_release(&content),
        Err(e) => {
            error!("Failed to detect package manager from os-release: {}", e);
            PackageManagerKind::Unknown
        }
    }
}

fn kind_from_os_release(content: &str) -> PackageManagerKind {
    let content = content.to_lowercase();
    if content.contains("ubuntu") || content.contains("debian") {
        PackageManagerKind::Apt
    } else if content.contains("fedora") {
        PackageManagerKind::Dnf
    } else if content.contains("rhel") || content.contains("centos") {
        if which::which("dnf").is_ok() {
            PackageManagerKind::Dnf
        } else {
            PackageManagerKind::Yum
        }
    } else if content.contains("arch") || content.contains("manjaro") {
        PackageManagerKind::Pacman
    } else if content.contains("suse") {
        PackageManagerKind::Zypper
    } else {
        PackageManagerKind::Unknown
    }
}
