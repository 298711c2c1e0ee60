//! Configuration System
//!
//! Layered configuration for the deployment orchestrator: built-in defaults, a user-level file,
//! workspace files and `PAGEWRIGHT__*` environment variables, merged with the `config` crate.

use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

mod facade;
mod merge_policy;
mod sources;

pub use facade::ConfigLoader;
pub use sources::global_file::global_config_path;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PagewrightConfig {
    /// How the deployment CLI is invoked
    #[serde(default)]
    pub cli: CliConfig,

    /// How the project is built before deploying
    #[serde(default)]
    pub build: BuildConfig,

    /// Per-operation process timeouts
    #[serde(default)]
    pub timeouts: TimeoutConfig,

    /// Background polling
    #[serde(default)]
    pub poll: PollConfig,

    /// Link record and scratch file locations
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Deployment CLI invocation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    /// Launcher program (`npx` resolves a global or project-local install)
    #[serde(default = "default_cli_program")]
    pub program: String,

    /// Arguments placed before every CLI subcommand
    #[serde(default = "default_cli_args")]
    pub args: Vec<String>,

    /// Package name used for installation
    #[serde(default = "default_cli_package")]
    pub package: String,

    /// Environment variable that scopes a command to an account
    #[serde(default = "default_account_env")]
    pub account_env: String,

    /// Production branch passed when creating a project
    #[serde(default = "default_production_branch")]
    pub production_branch: String,
}

fn default_cli_program() -> String {
    "npx".to_string()
}

fn default_cli_args() -> Vec<String> {
    vec!["--yes".to_string(), "wrangler".to_string()]
}

fn default_cli_package() -> String {
    "wrangler".to_string()
}

fn default_account_env() -> String {
    "CLOUDFLARE_ACCOUNT_ID".to_string()
}

fn default_production_branch() -> String {
    "main".to_string()
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            program: default_cli_program(),
            args: default_cli_args(),
            package: default_cli_package(),
            account_env: default_account_env(),
            production_branch: default_production_branch(),
        }
    }
}

/// Project build settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    #[serde(default = "default_build_program")]
    pub program: String,

    #[serde(default = "default_build_args")]
    pub args: Vec<String>,

    /// Package manager used to install the CLI
    #[serde(default = "default_build_program")]
    pub package_manager: String,
}

fn default_build_program() -> String {
    "npm".to_string()
}

fn default_build_args() -> Vec<String> {
    vec!["run".to_string(), "build".to_string()]
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            program: default_build_program(),
            args: default_build_args(),
            package_manager: default_build_program(),
        }
    }
}

/// Process timeouts, in seconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    #[serde(default = "default_probe_secs")]
    pub probe: u64,
    #[serde(default = "default_interactive_secs")]
    pub login: u64,
    #[serde(default = "default_probe_secs")]
    pub logout: u64,
    #[serde(default = "default_interactive_secs")]
    pub install: u64,
    #[serde(default = "default_project_secs")]
    pub project: u64,
    #[serde(default = "default_bundle_secs")]
    pub build: u64,
    #[serde(default = "default_bundle_secs")]
    pub deploy: u64,
    #[serde(default = "default_check_secs")]
    pub check: u64,
}

fn default_probe_secs() -> u64 {
    30
}

fn default_interactive_secs() -> u64 {
    120
}

fn default_project_secs() -> u64 {
    60
}

fn default_bundle_secs() -> u64 {
    300
}

fn default_check_secs() -> u64 {
    15
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            probe: default_probe_secs(),
            login: default_interactive_secs(),
            logout: default_probe_secs(),
            install: default_interactive_secs(),
            project: default_project_secs(),
            build: default_bundle_secs(),
            deploy: default_bundle_secs(),
            check: default_check_secs(),
        }
    }
}

impl TimeoutConfig {
    pub fn probe(&self) -> Duration {
        Duration::from_secs(self.probe)
    }

    pub fn login(&self) -> Duration {
        Duration::from_secs(self.login)
    }

    pub fn logout(&self) -> Duration {
        Duration::from_secs(self.logout)
    }

    pub fn install(&self) -> Duration {
        Duration::from_secs(self.install)
    }

    pub fn project(&self) -> Duration {
        Duration::from_secs(self.project)
    }

    pub fn build(&self) -> Duration {
        Duration::from_secs(self.build)
    }

    pub fn deploy(&self) -> Duration {
        Duration::from_secs(self.deploy)
    }

    pub fn check(&self) -> Duration {
        Duration::from_secs(self.check)
    }

    fn entries(&self) -> [(&'static str, u64); 8] {
        [
            ("probe", self.probe),
            ("login", self.login),
            ("logout", self.logout),
            ("install", self.install),
            ("project", self.project),
            ("build", self.build),
            ("deploy", self.deploy),
            ("check", self.check),
        ]
    }
}

/// Background polling settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    #[serde(default = "default_git_remote_interval_ms")]
    pub git_remote_interval_ms: u64,
}

fn default_git_remote_interval_ms() -> u64 {
    5000
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            git_remote_interval_ms: default_git_remote_interval_ms(),
        }
    }
}

impl PollConfig {
    pub fn git_remote_interval(&self) -> Duration {
        Duration::from_millis(self.git_remote_interval_ms)
    }
}

/// Storage locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Link record file, relative to the workspace root unless absolute
    #[serde(default = "default_link_file")]
    pub link_file: PathBuf,

    /// Directory for the auth probe scratch file (defaults to the OS temp dir)
    #[serde(default)]
    pub scratch_dir: Option<PathBuf>,
}

fn default_link_file() -> PathBuf {
    PathBuf::from(".pagewright/link.json")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            link_file: default_link_file(),
            scratch_dir: None,
        }
    }
}

impl StorageConfig {
    /// Resolve the link file against a workspace root.
    pub fn resolve_link_file(&self, workspace_root: &Path) -> PathBuf {
        if self.link_file.is_absolute() {
            self.link_file.clone()
        } else {
            workspace_root.join(&self.link_file)
        }
    }

    pub fn resolve_scratch_dir(&self) -> PathBuf {
        self.scratch_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

/// Configuration validation errors
#[derive(Debug, Clone)]
pub enum ValidationError {
    Cli(String),
    Build(String),
    Timeout(String),
    Poll(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Cli(msg) => write!(f, "cli: {}", msg),
            ValidationError::Build(msg) => write!(f, "build: {}", msg),
            ValidationError::Timeout(msg) => write!(f, "timeouts: {}", msg),
            ValidationError::Poll(msg) => write!(f, "poll: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl PagewrightConfig {
    /// Validate the entire configuration, collecting every problem.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.cli.program.trim().is_empty() {
            errors.push(ValidationError::Cli("program cannot be empty".to_string()));
        }
        if self.cli.account_env.trim().is_empty() {
            errors.push(ValidationError::Cli("account_env cannot be empty".to_string()));
        }
        if self.cli.production_branch.trim().is_empty() {
            errors.push(ValidationError::Cli(
                "production_branch cannot be empty".to_string(),
            ));
        }
        if self.build.program.trim().is_empty() {
            errors.push(ValidationError::Build("program cannot be empty".to_string()));
        }
        for (name, secs) in self.timeouts.entries() {
            if secs == 0 {
                errors.push(ValidationError::Timeout(format!(
                    "{} must be greater than zero",
                    name
                )));
            }
        }
        if self.poll.git_remote_interval_ms == 0 {
            errors.push(ValidationError::Poll(
                "git_remote_interval_ms must be greater than zero".to_string(),
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
