//! CLI route: single route table and run context. Dispatches to the deployment machine and
//! presentation.

use crate::cli::help::{command_name, is_mutation};
use crate::cli::parse::{Commands, OpenTarget};
use crate::cli::presentation::{
    format_accounts_table, format_create_outcome, format_deploy_outcome, format_linked_project,
    format_projects_table, format_status_json, format_status_text,
};
use crate::config::{ConfigLoader, PagewrightConfig};
use crate::error::DeployError;
use crate::host::{ConsoleHost, HostActions};
use crate::machine::DeploymentMachine;
use crate::process::{ProcessInvoker, TokioProcessInvoker};
use crate::status::{Account, DeploymentState, MenuAction};
use crate::store::{JsonFileLinkStore, LinkStore};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Runtime context for CLI execution: workspace, configuration and the deployment machine.
pub struct RunContext {
    machine: DeploymentMachine,
    config: PagewrightConfig,
    workspace_root: PathBuf,
    interactive: bool,
}

impl RunContext {
    /// Create run context from workspace root and optional config path. Uses ConfigLoader only.
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, DeployError> {
        let config = match config_path {
            Some(ref path) => ConfigLoader::load_from_file(path)?,
            None => ConfigLoader::load(&workspace_root)?,
        };
        config.validate().map_err(|errors| {
            DeployError::Config(
                errors
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; "),
            )
        })?;

        let invoker: Arc<dyn ProcessInvoker> = Arc::new(TokioProcessInvoker::in_dir(&workspace_root));
        let store: Arc<dyn LinkStore> = Arc::new(JsonFileLinkStore::new(
            config.storage.resolve_link_file(&workspace_root),
        ));
        let host: Arc<dyn HostActions> = Arc::new(
            ConsoleHost::new(Arc::clone(&invoker))
                .with_color(std::io::stderr().is_terminal())
                .with_error_notices(false),
        );

        let mut context = Self::with_parts(config, workspace_root, invoker, store, host);
        context.interactive = std::io::stdin().is_terminal();
        Ok(context)
    }

    /// Context over explicit collaborators. Never prompts.
    pub fn with_parts(
        config: PagewrightConfig,
        workspace_root: PathBuf,
        invoker: Arc<dyn ProcessInvoker>,
        store: Arc<dyn LinkStore>,
        host: Arc<dyn HostActions>,
    ) -> Self {
        let machine = DeploymentMachine::new(&config, invoker, store, host);
        Self {
            machine,
            config,
            workspace_root,
            interactive: false,
        }
    }

    pub fn machine(&self) -> &DeploymentMachine {
        &self.machine
    }

    /// Execute a CLI command via the single route table.
    pub async fn execute(&self, command: &Commands) -> Result<String, DeployError> {
        let started = Instant::now();
        let name = command_name(command);
        debug!(command = name, workspace = %self.workspace_root.display(), "Command started");
        let result = self.execute_inner(command).await;
        info!(
            command = name,
            mutation = is_mutation(command),
            ok = result.is_ok(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Command finished"
        );
        result
    }

    async fn execute_inner(&self, command: &Commands) -> Result<String, DeployError> {
        match command {
            Commands::Status { format } => {
                self.machine.probe_cli_status().await?;
                self.machine.poll_git_remote_once().await?;
                let snapshot = self.machine.snapshot();
                if format == "json" {
                    format_status_json(&snapshot)
                } else {
                    Ok(format_status_text(&snapshot))
                }
            }
            Commands::Install => {
                self.machine.install_cli().await?;
                Ok("Wrangler is installed. Run 'pagewright login' next.".to_string())
            }
            Commands::Login => {
                self.machine.login().await?;
                Ok(format_accounts_table(&self.machine.accounts()))
            }
            Commands::Logout => {
                self.machine.sign_out().await?;
                Ok("Signed out of Cloudflare.".to_string())
            }
            Commands::Accounts => {
                self.require_signed_in().await?;
                Ok(format_accounts_table(&self.machine.accounts()))
            }
            Commands::Projects { account } => {
                self.require_signed_in().await?;
                let account = self.resolve_account(account.as_deref())?;
                let projects = self.machine.list_remote_projects(&account.id).await?;
                Ok(format_projects_table(&projects))
            }
            Commands::Create {
                name,
                account,
                output_dir,
            } => {
                self.require_signed_in().await?;
                let account = self.resolve_account(account.as_deref())?;
                let output_dir = self.output_dir(output_dir.as_deref()).await?;
                let outcome = self
                    .machine
                    .create_and_deploy(name, &account.id, &output_dir)
                    .await?;
                Ok(format_create_outcome(&outcome))
            }
            Commands::Link {
                project,
                account,
                output_dir,
            } => {
                self.require_signed_in().await?;
                let account = self.resolve_account(account.as_deref())?;
                let projects = self.machine.list_remote_projects(&account.id).await?;
                if !projects.is_empty() && !projects.iter().any(|p| &p.name == project) {
                    return Err(DeployError::Validation(format!(
                        "No project named '{}' in account {}. Run 'pagewright projects' to list them.",
                        project, account.name
                    )));
                }
                let output_dir = self.output_dir(output_dir.as_deref()).await?;
                let linked = self
                    .machine
                    .link_existing(project, &account.id, &output_dir)
                    .await?;
                Ok(format_linked_project(&linked))
            }
            Commands::Deploy => {
                self.require_action(MenuAction::DeployNow).await?;
                let outcome = self.machine.deploy_now().await?;
                Ok(format_deploy_outcome(&outcome))
            }
            Commands::Unlink => {
                self.machine.unlink().await?;
                Ok("Disconnected from Cloudflare Pages.".to_string())
            }
            Commands::DetectOutput => self.machine.detect_output_directory().await,
            Commands::WaitRemote { timeout_secs } => {
                let handle = self
                    .machine
                    .start_remote_poll(self.config.poll.git_remote_interval());
                let limit = Duration::from_secs(*timeout_secs);
                let _ = tokio::time::timeout(limit, handle.wait()).await;
                if self.machine.has_git_remote() {
                    Ok("Git remote found.".to_string())
                } else {
                    Err(DeployError::Validation(format!(
                        "No git remote found within {} seconds.",
                        timeout_secs
                    )))
                }
            }
            Commands::Open { target } => {
                let url = match target {
                    OpenTarget::Production => {
                        self.require_action(MenuAction::OpenProduction).await?;
                        self.machine.open_production().await?
                    }
                    OpenTarget::Dashboard => {
                        self.require_action(MenuAction::OpenDashboard).await?;
                        self.machine.open_dashboard().await?
                    }
                    OpenTarget::AutoDeploy => {
                        self.require_action(MenuAction::EnableAutoDeploy).await?;
                        self.machine.enable_auto_deploy().await?
                    }
                };
                Ok(url)
            }
            Commands::Config => toml::to_string_pretty(&self.config)
                .map_err(|e| DeployError::Config(e.to_string())),
        }
    }

    /// Probe and fail with guidance unless the session is signed in.
    async fn require_signed_in(&self) -> Result<(), DeployError> {
        self.machine.probe_cli_status().await?;
        match self.machine.state() {
            DeploymentState::NotInstalled => Err(DeployError::Validation(
                "Wrangler is not installed. Run 'pagewright install' first.".to_string(),
            )),
            DeploymentState::NotAuthenticated | DeploymentState::Checking => {
                Err(DeployError::Validation(
                    "Not signed in to Cloudflare. Run 'pagewright login' first.".to_string(),
                ))
            }
            _ => Ok(()),
        }
    }

    /// Probe and fail unless `action` is offered in the current state.
    async fn require_action(&self, action: MenuAction) -> Result<(), DeployError> {
        self.require_signed_in().await?;
        let state = self.machine.state();
        if state.menu_actions().contains(&action) {
            return Ok(());
        }
        match state {
            DeploymentState::NotLinked => Err(DeployError::NotLinked),
            DeploymentState::WrongAccount => Err(DeployError::Validation(
                "The linked project belongs to an account this session cannot access. Sign in with that account or run 'pagewright unlink'.".to_string(),
            )),
            other => Err(DeployError::Validation(format!(
                "'{}' is not available while {}.",
                action.label(),
                other
            ))),
        }
    }

    fn resolve_account(&self, requested: Option<&str>) -> Result<Account, DeployError> {
        let accounts = self.machine.accounts();
        if let Some(requested) = requested {
            return accounts
                .into_iter()
                .find(|a| a.id == requested || a.name == requested)
                .ok_or_else(|| {
                    DeployError::Validation(format!("No account matches '{}'.", requested))
                });
        }
        match accounts.len() {
            0 => Err(DeployError::Validation("Please select an account.".to_string())),
            1 => Ok(accounts[0].clone()),
            _ if self.interactive => {
                use dialoguer::Select;

                let names: Vec<String> = accounts
                    .iter()
                    .map(|a| format!("{} ({})", a.name, a.id))
                    .collect();
                let selection = Select::new()
                    .with_prompt("Cloudflare account")
                    .items(&names)
                    .default(0)
                    .interact()
                    .map_err(|e| {
                        DeployError::Validation(format!("Failed to get user input: {}", e))
                    })?;
                Ok(accounts[selection].clone())
            }
            _ => Err(DeployError::Validation(
                "Several accounts are available; pass --account.".to_string(),
            )),
        }
    }

    async fn output_dir(&self, requested: Option<&str>) -> Result<String, DeployError> {
        match requested {
            Some(dir) => Ok(dir.to_string()),
            None => self.machine.detect_output_directory().await,
        }
    }
}
