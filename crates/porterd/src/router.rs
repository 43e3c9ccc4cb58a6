//! Command routing - the single entry point for free-text commands.
//!
//! Recognizes the control-syntax forms (credential caching, elevated
//! debug session, styled responses), classifies everything else, and
//! dispatches to the system-operation collaborators or an AI backend.
//! Every failure is recovered here into a user-facing string; nothing
//! propagates past `route_command`.

use crate::classifier::IntentClassifier;
use crate::providers::{ProviderRegistry, ProviderSelector, QueryContext};
use crate::sudo::SudoCache;
use crate::system::{FileOperations, PackageOperations, ProcessOperations};
use porter_common::{Config, Intent, RouterError, SystemActionKind};
use regex::Regex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// Sentinel returned when an elevated debug session starts; the
/// embedding surface reacts by opening the configuration UI.
pub const DEBUG_MODE_ACTIVATED: &str = "DEBUG_MODE_ACTIVATED";

/// Debug sessions stay elevated for an hour.
const DEBUG_MODE_TTL: Duration = Duration::from_secs(3600);

/// Routes commands to system handlers and AI providers.
pub struct CommandRouter {
    config: Arc<Config>,
    classifier: IntentClassifier,
    selector: ProviderSelector,
    registry: ProviderRegistry,
    sudo: Arc<SudoCache>,
    packages: Arc<dyn PackageOperations>,
    files: Arc<dyn FileOperations>,
    processes: Arc<dyn ProcessOperations>,
    styled_re: Regex,
}

impl CommandRouter {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Arc<Config>,
        registry: ProviderRegistry,
        sudo: Arc<SudoCache>,
        packages: Arc<dyn PackageOperations>,
        files: Arc<dyn FileOperations>,
        processes: Arc<dyn ProcessOperations>,
    ) -> Result<Self, RouterError> {
        let classifier = IntentClassifier::new()?;
        let selector = ProviderSelector::new(&config.ai)?;
        let styled_re = Regex::new(r"(?i)^respond\s+(\w+):\s*(.+)")
            .map_err(|e| RouterError::Config(format!("bad styled-response pattern: {e}")))?;

        info!("Loaded AI providers: {:?}", registry.names());

        Ok(Self {
            config,
            classifier,
            selector,
            registry,
            sudo,
            packages,
            files,
            processes,
            styled_re,
        })
    }

    /// Route one command and return the response text.
    pub async fn route_command(&self, command: &str) -> String {
        let trimmed = command.trim();
        if trimmed.is_empty() {
            // Deliberate: blank input never reaches an AI backend.
            return "Type a command (e.g. 'install vim') or ask a question.".to_string();
        }

        // Control syntax first.
        if trimmed.starts_with("sudo code:") {
            return self.handle_sudo_code(trimmed).await;
        }
        if trimmed.starts_with("enter debug mode") {
            return self.handle_debug_mode(trimmed).await;
        }
        if trimmed.starts_with("respond ") {
            return self.handle_styled_response(trimmed).await;
        }

        match self
            .classifier
            .classify(trimmed, &self.selector, &self.registry)
        {
            Intent::SystemAction { kind, captures } => {
                self.handle_system_command(kind, &captures).await
            }
            Intent::AiQuery { provider } => {
                let style = self.config.response.default_instruction().to_string();
                self.handle_ai_query(trimmed, &provider, QueryContext::with_style(style))
                    .await
            }
        }
    }

    /// `sudo code:<password> [-t <minutes>]`
    async fn handle_sudo_code(&self, command: &str) -> String {
        let parts: Vec<&str> = command.split_whitespace().collect();

        let Some(password) = parts.get(1).and_then(|p| p.strip_prefix("code:")) else {
            return "Invalid syntax. Use: sudo code:<password> [-t <minutes>]".to_string();
        };
        if password.is_empty() {
            return "Invalid syntax. Use: sudo code:<password> [-t <minutes>]".to_string();
        }

        let mut ttl = None;
        if parts.get(2) == Some(&"-t") {
            match parts.get(3).map(|m| m.parse::<u64>()) {
                Some(Ok(minutes)) => ttl = Some(Duration::from_secs(minutes * 60)),
                _ => return "Invalid timeout value".to_string(),
            }
        }

        match self.sudo.set_password(password, ttl).await {
            Ok(()) => match ttl {
                Some(ttl) => format!(
                    "✓ Sudo credentials cached for {} minutes",
                    ttl.as_secs() / 60
                ),
                None => "✓ Sudo credentials cached".to_string(),
            },
            Err(RouterError::InvalidCredential) => "✗ Invalid sudo password".to_string(),
            Err(e) => {
                error!("Sudo code handling failed: {}", e);
                format!("✗ Failed to cache credentials: {e}")
            }
        }
    }

    /// `enter debug mode <password>` - caches the credential with an
    /// extended timeout and signals the caller to surface the
    /// configuration UI.
    async fn handle_debug_mode(&self, command: &str) -> String {
        let password = command["enter debug mode".len()..].trim();
        if password.is_empty() {
            return "Usage: enter debug mode <password>".to_string();
        }

        match self.sudo.set_password(password, Some(DEBUG_MODE_TTL)).await {
            Ok(()) => DEBUG_MODE_ACTIVATED.to_string(),
            Err(RouterError::InvalidCredential) => "✗ Invalid password".to_string(),
            Err(e) => {
                error!("Debug mode activation failed: {}", e);
                format!("✗ Failed to enter debug mode: {e}")
            }
        }
    }

    /// `respond <style>: <query>`
    async fn handle_styled_response(&self, command: &str) -> String {
        let Some(caps) = self.styled_re.captures(command) else {
            return "Invalid syntax. Use: respond <style>: <query>".to_string();
        };
        let style = &caps[1];
        let query = &caps[2];

        let instruction = self
            .config
            .response
            .style_instruction(style)
            .unwrap_or("Provide a clear, helpful response.")
            .to_string();

        match self
            .classifier
            .classify(query, &self.selector, &self.registry)
        {
            Intent::AiQuery { provider } => {
                self.handle_ai_query(query, &provider, QueryContext::with_style(instruction))
                    .await
            }
            Intent::SystemAction { .. } => {
                "Style commands only work with AI queries".to_string()
            }
        }
    }

    async fn handle_system_command(
        &self,
        kind: SystemActionKind,
        captures: &[Option<String>],
    ) -> String {
        let capture = |i: usize| {
            captures
                .get(i)
                .and_then(|c| c.as_deref())
                .unwrap_or_default()
        };

        let outcome = match kind {
            SystemActionKind::PackageInstall => {
                let packages: Vec<String> =
                    capture(1).split_whitespace().map(str::to_string).collect();
                self.packages.install(&packages).await
            }
            SystemActionKind::PackageUninstall => {
                let packages: Vec<String> =
                    capture(1).split_whitespace().map(str::to_string).collect();
                self.packages.uninstall(&packages).await
            }
            SystemActionKind::PackageUpdate => self.packages.update().await,
            SystemActionKind::FileCreate => {
                let file_type = capture(0);
                let path = capture(1).trim();
                if file_type.contains("folder") || file_type.contains("directory") {
                    self.files.create_directory(path)
                } else {
                    self.files.create_file(path)
                }
            }
            SystemActionKind::FileMove => {
                self.files.move_path(capture(0).trim(), capture(1).trim())
            }
            SystemActionKind::FileDelete => self.files.delete_path(capture(1).trim()),
            SystemActionKind::FileFind => {
                self.files.find(capture(0).trim(), capture(1).trim())
            }
            SystemActionKind::FileList => {
                return self.render_listing(capture(0).trim());
            }
            SystemActionKind::ProcessKill => self.processes.kill_by_name(capture(0).trim()).await,
            SystemActionKind::ProcessList => {
                let filter = captures.get(1).and_then(|c| c.as_deref());
                return self.render_processes(filter);
            }
            SystemActionKind::AppLaunch => self.processes.launch(capture(1).trim()),
        };

        format!("{} {}", if outcome.success { "✓" } else { "✗" }, outcome.message)
    }

    /// `list <target>` doubles as a process listing when the target
    /// names processes; anything else lists a directory.
    fn render_listing(&self, target: &str) -> String {
        if let Some(prefix) = target.strip_suffix("processes") {
            let prefix = prefix.trim();
            let filter = match prefix {
                "" | "all" => None,
                f => Some(f),
            };
            return self.render_processes(filter);
        }

        let outcome = self.files.list_directory(target);
        format!("{} {}", if outcome.success { "✓" } else { "✗" }, outcome.message)
    }

    fn render_processes(&self, filter: Option<&str>) -> String {
        let processes = self.processes.list(filter.map(str::trim).filter(|f| !f.is_empty()));
        if processes.is_empty() {
            return "No matching processes found".to_string();
        }
        let listing = processes
            .iter()
            .take(10)
            .map(|p| {
                format!(
                    "PID {}: {} - CPU: {}, Mem: {}",
                    p.pid, p.name, p.cpu, p.memory
                )
            })
            .collect::<Vec<_>>()
            .join("\n");
        format!("Processes:\n{listing}")
    }

    async fn handle_ai_query(
        &self,
        prompt: &str,
        provider_name: &str,
        context: QueryContext,
    ) -> String {
        let Some(provider) = self.registry.get(provider_name) else {
            return format!("AI provider '{provider_name}' not available");
        };
        if !provider.is_configured() {
            return format!(
                "AI provider '{provider_name}' not configured. Add API key in debug mode."
            );
        }

        match provider.query(prompt, Some(&context)).await {
            Ok(response) => response,
            Err(e) => {
                error!("AI query failed: {}", e);
                format!("✗ AI query failed: {e}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::tests::StubProvider;
    use crate::sudo::CredentialValidator;
    use crate::system::{OpOutcome, ProcessInfo};
    use async_trait::async_trait;
    use porter_common::config::SudoConfig;
    use std::sync::Mutex;

    struct AlwaysValid;

    #[async_trait]
    impl CredentialValidator for AlwaysValid {
        async fn validate(&self, _secret: &str) -> bool {
            true
        }
    }

    struct NeverValid;

    #[async_trait]
    impl CredentialValidator for NeverValid {
        async fn validate(&self, _secret: &str) -> bool {
            false
        }
    }

    /// Records calls and answers with canned outcomes.
    #[derive(Default)]
    struct StubPackageOps {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl PackageOperations for StubPackageOps {
        async fn install(&self, packages: &[String]) -> OpOutcome {
            self.calls
                .lock()
                .unwrap()
                .push(format!("install {}", packages.join(" ")));
            OpOutcome::ok(format!("Successfully installed: {}", packages.join(" ")))
        }

        async fn uninstall(&self, packages: &[String]) -> OpOutcome {
            OpOutcome::ok(format!("Successfully uninstalled: {}", packages.join(" ")))
        }

        async fn update(&self) -> OpOutcome {
            OpOutcome::ok("System updated successfully")
        }
    }

    struct StubFileOps;

    impl FileOperations for StubFileOps {
        fn create_directory(&self, path: &str) -> OpOutcome {
            OpOutcome::ok(format!("Directory created: {path}"))
        }
        fn create_file(&self, path: &str) -> OpOutcome {
            OpOutcome::ok(format!("File created: {path}"))
        }
        fn move_path(&self, source: &str, dest: &str) -> OpOutcome {
            OpOutcome::ok(format!("Moved {source} to {dest}"))
        }
        fn delete_path(&self, path: &str) -> OpOutcome {
            OpOutcome::ok(format!("File deleted: {path}"))
        }
        fn find(&self, pattern: &str, directory: &str) -> OpOutcome {
            OpOutcome::ok(format!("Found '{pattern}' in {directory}"))
        }
        fn list_directory(&self, path: &str) -> OpOutcome {
            OpOutcome::ok(format!("contents of {path}"))
        }
    }

    struct StubProcessOps;

    #[async_trait]
    impl ProcessOperations for StubProcessOps {
        fn list(&self, filter: Option<&str>) -> Vec<ProcessInfo> {
            if filter == Some("ghost") {
                return Vec::new();
            }
            vec![ProcessInfo {
                pid: 4242,
                name: "porterd".to_string(),
                cpu: "1.0%".to_string(),
                memory: "0.5%".to_string(),
            }]
        }

        async fn kill_by_name(&self, name: &str) -> OpOutcome {
            OpOutcome::ok(format!("Killed 1 process(es) matching '{name}'"))
        }

        fn launch(&self, app: &str) -> OpOutcome {
            OpOutcome::ok(format!("Launched: {app}"))
        }
    }

    fn build_router(validator: Arc<dyn CredentialValidator>) -> CommandRouter {
        let config = Arc::new(Config::default());
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(StubProvider::new("gemini", true)));
        registry.register(Arc::new(StubProvider::new("chatgpt", true)));
        registry.register(Arc::new(StubProvider::new("deepseek", false)));

        let sudo = Arc::new(SudoCache::new(SudoConfig::default(), validator));
        CommandRouter::new(
            config,
            registry,
            sudo,
            Arc::new(StubPackageOps::default()),
            Arc::new(StubFileOps),
            Arc::new(StubProcessOps),
        )
        .unwrap()
    }

    fn router() -> CommandRouter {
        build_router(Arc::new(AlwaysValid))
    }

    #[tokio::test]
    async fn install_command_reaches_package_ops() {
        let response = router().route_command("install vim").await;
        assert_eq!(response, "✓ Successfully installed: vim");
    }

    #[tokio::test]
    async fn install_multiple_packages() {
        let response = router().route_command("install vim git curl").await;
        assert_eq!(response, "✓ Successfully installed: vim git curl");
    }

    #[tokio::test]
    async fn unmatched_question_goes_to_default_provider() {
        // No routing rule matches; default is "auto", so the fixed
        // fallback answers.
        let response = router()
            .route_command("what is the capital of France")
            .await;
        assert!(response.starts_with("[gemini|"));
        // The prompt keeps the user's original casing.
        assert!(response.contains("what is the capital of France"));
    }

    #[tokio::test]
    async fn routing_rule_skips_unconfigured_provider() {
        // "code" routes to deepseek, which is unconfigured here; the
        // selector skips it silently and falls back.
        let response = router().route_command("debug this code for me").await;
        assert!(response.starts_with("[gemini|"));
    }

    #[tokio::test]
    async fn styled_response_carries_instruction_and_query() {
        let response = router().route_command("respond bullets: explain TCP").await;
        assert!(response.contains("style=Provide answer as clear bullet points."));
        assert!(response.contains("explain TCP"));
    }

    #[tokio::test]
    async fn styled_response_rejects_system_actions() {
        let response = router().route_command("respond short: install vim").await;
        assert_eq!(response, "Style commands only work with AI queries");
    }

    #[tokio::test]
    async fn unknown_style_falls_back_to_default() {
        let response = router().route_command("respond sonnet: explain TCP").await;
        assert!(response.contains("style=Provide a concise, direct answer. 2-3 sentences max."));
    }

    #[tokio::test]
    async fn sudo_code_caches_credential() {
        let router = router();
        let response = router.route_command("sudo code:hunter2").await;
        assert_eq!(response, "✓ Sudo credentials cached");
        assert_eq!(router.sudo.get_password().unwrap(), "hunter2");
    }

    #[tokio::test]
    async fn sudo_code_with_timeout_flag() {
        let router = router();
        let response = router.route_command("sudo code:hunter2 -t 10").await;
        assert_eq!(response, "✓ Sudo credentials cached for 10 minutes");
    }

    #[tokio::test]
    async fn sudo_code_bad_timeout_is_rejected() {
        let response = router().route_command("sudo code:hunter2 -t soon").await;
        assert_eq!(response, "Invalid timeout value");
    }

    #[tokio::test]
    async fn sudo_code_invalid_password() {
        let router = build_router(Arc::new(NeverValid));
        let response = router.route_command("sudo code:wrong").await;
        assert_eq!(response, "✗ Invalid sudo password");
        assert!(router.sudo.get_password().is_none());
    }

    #[tokio::test]
    async fn debug_mode_returns_sentinel_and_caches() {
        let router = router();
        let response = router.route_command("enter debug mode hunter2").await;
        assert_eq!(response, DEBUG_MODE_ACTIVATED);
        assert!(router.sudo.is_cached());
    }

    #[tokio::test]
    async fn debug_mode_without_password_shows_usage() {
        let response = router().route_command("enter debug mode").await;
        assert_eq!(response, "Usage: enter debug mode <password>");
    }

    #[tokio::test]
    async fn debug_mode_invalid_password() {
        let router = build_router(Arc::new(NeverValid));
        let response = router.route_command("enter debug mode nope").await;
        assert_eq!(response, "✗ Invalid password");
    }

    #[tokio::test]
    async fn empty_input_returns_usage_not_ai_call() {
        let response = router().route_command("   ").await;
        assert!(response.contains("Type a command"));
    }

    #[tokio::test]
    async fn file_commands_dispatch() {
        let router = router();
        assert_eq!(
            router.route_command("create folder ~/projects").await,
            "✓ Directory created: ~/projects"
        );
        assert_eq!(
            router.route_command("move a.txt to b.txt").await,
            "✓ Moved a.txt to b.txt"
        );
        assert_eq!(
            router.route_command("delete file old.log").await,
            "✓ File deleted: old.log"
        );
        assert_eq!(
            router.route_command("find report in ~/documents").await,
            "✓ Found 'report' in ~/documents"
        );
    }

    #[tokio::test]
    async fn list_directory_and_list_processes_disambiguate() {
        let router = router();
        let dir = router.route_command("list ~/downloads").await;
        assert_eq!(dir, "✓ contents of ~/downloads");

        let procs = router.route_command("list all processes").await;
        assert!(procs.starts_with("Processes:"));
        assert!(procs.contains("PID 4242: porterd"));
    }

    #[tokio::test]
    async fn kill_and_launch_dispatch() {
        let router = router();
        assert_eq!(
            router.route_command("kill firefox").await,
            "✓ Killed 1 process(es) matching 'firefox'"
        );
        assert_eq!(
            router.route_command("launch firefox").await,
            "✓ Launched: firefox"
        );
    }
}
