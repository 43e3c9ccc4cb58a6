//! System action collaborators: packages, files, processes.
//!
//! Each action resolves to a success flag plus a human-readable
//! message; the router surfaces the message without interpreting it.

pub mod files;
pub mod packages;
pub mod processes;

pub use files::FileManager;
pub use packages::SystemPackageManager;
pub use processes::ProcessManager;

use async_trait::async_trait;

/// Uniform result of one system action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpOutcome {
    pub success: bool,
    pub message: String,
}

impl OpOutcome {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Package management actions.
#[async_trait]
pub trait PackageOperations: Send + Sync {
    async fn install(&self, packages: &[String]) -> OpOutcome;
    async fn uninstall(&self, packages: &[String]) -> OpOutcome;
    async fn update(&self) -> OpOutcome;
}

/// File and directory actions.
pub trait FileOperations: Send + Sync {
    fn create_directory(&self, path: &str) -> OpOutcome;
    fn create_file(&self, path: &str) -> OpOutcome;
    fn move_path(&self, source: &str, dest: &str) -> OpOutcome;
    /// Deletes a file, or a directory recursively.
    fn delete_path(&self, path: &str) -> OpOutcome;
    fn find(&self, pattern: &str, directory: &str) -> OpOutcome;
    fn list_directory(&self, path: &str) -> OpOutcome;
}

/// A process as reported to the user.
#[derive(Debug, Clone)]
pub struct ProcessInfo {
    pub pid: u32,
    pub name: String,
    pub cpu: String,
    pub memory: String,
}

/// Process listing and control.
#[async_trait]
pub trait ProcessOperations: Send + Sync {
    fn list(&self, filter: Option<&str>) -> Vec<ProcessInfo>;
    async fn kill_by_name(&self, name: &str) -> OpOutcome;
    fn launch(&self, app: &str) -> OpOutcome;
}
