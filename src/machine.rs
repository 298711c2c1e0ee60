//! Deployment Status Machine
//!
//! Owns the raw status signals (CLI status, accounts, linked project, in-flight flags) and the
//! transition operations that drive the Pages CLI. The user-facing state is derived on demand by
//! [`crate::status::derive_state`]; nothing here stores it.
//!
//! Every operation reports failures twice: as a `DeployError` to the caller and as an error notice
//! to the host. After [`DeploymentMachine::dispose`] in-flight processes are abandoned and late
//! results never mutate state.

mod poller;

pub use poller::{RemotePollHandle, RemotePoller};

use crate::config::{PagewrightConfig, TimeoutConfig};
use crate::detect::{self, DEFAULT_OUTPUT_DIR};
use crate::error::{DeployError, ProcessError};
use crate::host::{HostActions, Notice};
use crate::parse::{
    extract_production_url, is_already_exists, is_binary_missing, parse_account_list,
    parse_project_list, sanitize_project_name,
};
use crate::process::{ExecOptions, ExecOutput, Invocation, ProcessInvoker};
use crate::status::{derive_state, Account, CliAuthStatus, DeploymentState, RemoteProject, StatusSnapshot};
use crate::store::{LinkRecord, LinkStore, LinkedProject};
use crate::wrangler::{auto_deploy_setup_url, WranglerCommands};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempPath;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Exit code `sh` reports when the command itself does not exist.
const SHELL_COMMAND_NOT_FOUND: i32 = 127;

/// Result of a build + deploy run that did not fail outright.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DeployOutcome {
    Deployed {
        production_url: String,
        finished_at: DateTime<Utc>,
    },
    /// A step failed at the process level (timeout, spawn failure); the deploy may or may not
    /// have gone through.
    Ambiguous { reason: String },
}

/// Result of [`DeploymentMachine::create_and_deploy`]: the project is linked either way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateOutcome {
    pub linked: LinkedProject,
    pub deploy: DeployOutcome,
}

/// How one external command ended.
enum RunOutcome {
    Succeeded(ExecOutput),
    Failed(ExecOutput),
    Crashed(ProcessError),
}

enum PipelineResult {
    Deployed { scraped_url: Option<String> },
    Ambiguous { reason: String },
}

#[derive(Debug, Default)]
struct MachineState {
    cli_status: Option<CliAuthStatus>,
    accounts: Vec<Account>,
    linked: Option<LinkedProject>,
    deploying: usize,
    installing: usize,
    has_git_remote: bool,
    remote_projects: HashMap<String, Vec<RemoteProject>>,
}

fn deploying_counter(state: &mut MachineState) -> &mut usize {
    &mut state.deploying
}

fn installing_counter(state: &mut MachineState) -> &mut usize {
    &mut state.installing
}

struct Inner {
    invoker: Arc<dyn ProcessInvoker>,
    store: Arc<dyn LinkStore>,
    host: Arc<dyn HostActions>,
    commands: WranglerCommands,
    timeouts: TimeoutConfig,
    scratch_dir: PathBuf,
    state: RwLock<MachineState>,
    cancel: CancellationToken,
}

/// Holds an in-flight counter up for its lifetime.
struct ActivityGuard {
    inner: Arc<Inner>,
    counter: fn(&mut MachineState) -> &mut usize,
}

impl ActivityGuard {
    fn enter(inner: &Arc<Inner>, counter: fn(&mut MachineState) -> &mut usize) -> Self {
        {
            let mut state = inner.state.write();
            *counter(&mut *state) += 1;
        }
        Self {
            inner: Arc::clone(inner),
            counter,
        }
    }
}

impl Drop for ActivityGuard {
    fn drop(&mut self) {
        let mut state = self.inner.state.write();
        let value = (self.counter)(&mut *state);
        *value = value.saturating_sub(1);
    }
}

/// The deployment state machine. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct DeploymentMachine {
    inner: Arc<Inner>,
}

impl DeploymentMachine {
    pub fn new(
        config: &PagewrightConfig,
        invoker: Arc<dyn ProcessInvoker>,
        store: Arc<dyn LinkStore>,
        host: Arc<dyn HostActions>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                invoker,
                store,
                host,
                commands: WranglerCommands::new(config.cli.clone(), config.build.clone()),
                timeouts: config.timeouts.clone(),
                scratch_dir: config.storage.resolve_scratch_dir(),
                state: RwLock::new(MachineState::default()),
                cancel: CancellationToken::new(),
            }),
        }
    }

    pub fn state(&self) -> DeploymentState {
        let state = self.inner.state.read();
        derive_state(
            state.cli_status,
            &state.accounts,
            state.linked.as_ref(),
            state.deploying > 0,
        )
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        let state = self.inner.state.read();
        StatusSnapshot {
            state: derive_state(
                state.cli_status,
                &state.accounts,
                state.linked.as_ref(),
                state.deploying > 0,
            ),
            cli_status: state.cli_status,
            accounts: state.accounts.clone(),
            linked: state.linked.clone(),
            has_git_remote: state.has_git_remote,
            installing: state.installing > 0,
        }
    }

    pub fn cli_status(&self) -> Option<CliAuthStatus> {
        self.inner.state.read().cli_status
    }

    pub fn accounts(&self) -> Vec<Account> {
        self.inner.state.read().accounts.clone()
    }

    pub fn linked_project(&self) -> Option<LinkedProject> {
        self.inner.state.read().linked.clone()
    }

    pub fn has_git_remote(&self) -> bool {
        self.inner.state.read().has_git_remote
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    /// Tear down: abandon in-flight processes, stop pollers, ignore late results.
    pub fn dispose(&self) {
        if !self.inner.cancel.is_cancelled() {
            info!("Deployment machine disposed");
        }
        self.inner.cancel.cancel();
    }

    /// Start polling for a git remote. See [`RemotePoller`].
    pub fn start_remote_poll(&self, interval: Duration) -> RemotePollHandle {
        RemotePoller::new(self.clone(), interval).spawn()
    }

    /// Combined install + auth probe.
    ///
    /// Runs `whoami --json` into a scratch file, reads it back, then removes it. When accounts
    /// come back, loads the persisted link and backfills its production URL if missing.
    pub async fn probe_cli_status(&self) -> Result<CliAuthStatus, DeployError> {
        let result = self.probe_inner().await;
        self.report("probe", result).await
    }

    /// Global install with local fallback, verified by a version check.
    pub async fn install_cli(&self) -> Result<(), DeployError> {
        let result = self.install_inner().await;
        self.report("install", result).await
    }

    /// Interactive login followed by a fresh probe.
    pub async fn login(&self) -> Result<CliAuthStatus, DeployError> {
        let result = self.login_inner().await;
        self.report("login", result).await
    }

    /// Create the remote project, link it, then build and deploy.
    ///
    /// The link is persisted as soon as the project exists, so a failed build still leaves the
    /// workspace linked. An "already exists" response from the create step is not a failure.
    pub async fn create_and_deploy(
        &self,
        project_name: &str,
        account_id: &str,
        output_dir: &str,
    ) -> Result<CreateOutcome, DeployError> {
        let result = self
            .create_and_deploy_inner(project_name, account_id, output_dir)
            .await;
        self.report("create", result).await
    }

    /// Link a project that already exists remotely. No create, build or deploy.
    pub async fn link_existing(
        &self,
        project_name: &str,
        account_id: &str,
        output_dir: &str,
    ) -> Result<LinkedProject, DeployError> {
        let result = self
            .link_existing_inner(project_name, account_id, output_dir)
            .await;
        self.report("link", result).await
    }

    /// Build and deploy the linked project.
    pub async fn deploy_now(&self) -> Result<DeployOutcome, DeployError> {
        let result = self.deploy_now_inner().await;
        self.report("deploy", result).await
    }

    /// Forget the linked project. Authentication is untouched.
    pub async fn unlink(&self) -> Result<(), DeployError> {
        let result = self.unlink_inner().await;
        self.report("unlink", result).await
    }

    /// Log out of the CLI and forget the link and accounts.
    pub async fn sign_out(&self) -> Result<(), DeployError> {
        let result = self.sign_out_inner().await;
        self.report("sign-out", result).await
    }

    /// Projects in `account_id`. The result is cached for [`Self::link_existing`].
    ///
    /// A listing that fails or cannot be parsed yields an empty list.
    pub async fn list_remote_projects(
        &self,
        account_id: &str,
    ) -> Result<Vec<RemoteProject>, DeployError> {
        let result = self.list_remote_projects_inner(account_id).await;
        self.report("list-projects", result).await
    }

    /// One git remote check. Returns whether a remote is known.
    pub async fn poll_git_remote_once(&self) -> Result<bool, DeployError> {
        if self.has_git_remote() {
            return Ok(true);
        }
        let invocation = self.inner.commands.git_remotes();
        let found = match self.run(&invocation, self.inner.timeouts.check()).await? {
            RunOutcome::Succeeded(output) => !output.stdout.trim().is_empty(),
            RunOutcome::Failed(_) | RunOutcome::Crashed(_) => false,
        };
        if found {
            self.ensure_live()?;
            self.inner.state.write().has_git_remote = true;
            info!("Git remote detected");
        }
        Ok(found)
    }

    pub async fn detect_output_directory(&self) -> Result<String, DeployError> {
        self.ensure_live()?;
        Ok(detect::detect_output_directory(
            self.inner.invoker.as_ref(),
            &self.inner.commands,
            self.inner.timeouts.check(),
        )
        .await)
    }

    pub async fn open_production(&self) -> Result<String, DeployError> {
        let result = self.require_linked().map(|linked| linked.production_url());
        self.open(result).await
    }

    pub async fn open_dashboard(&self) -> Result<String, DeployError> {
        let result = self.require_linked().map(|linked| linked.dashboard_url());
        self.open(result).await
    }

    /// Open the dashboard flow that sets up a Git-connected project for the linked account.
    pub async fn enable_auto_deploy(&self) -> Result<String, DeployError> {
        let result = self
            .require_linked()
            .map(|linked| auto_deploy_setup_url(&linked.account_id));
        self.open(result).await
    }

    async fn probe_inner(&self) -> Result<CliAuthStatus, DeployError> {
        let scratch = self.scratch_file()?;
        let whoami = self.inner.commands.whoami_to_file(&scratch);
        let outcome = self.run(&whoami, self.inner.timeouts.probe()).await?;

        let status = match outcome {
            RunOutcome::Crashed(ProcessError::NotFound { .. }) => CliAuthStatus::NOT_INSTALLED,
            RunOutcome::Crashed(e) => {
                debug!(error = %e, "Probe did not complete");
                CliAuthStatus::SIGNED_OUT
            }
            RunOutcome::Failed(output) => {
                let text = format!("{}{}", output.stderr, output.stdout);
                if output.exit_code == SHELL_COMMAND_NOT_FOUND || is_binary_missing(&text) {
                    CliAuthStatus::NOT_INSTALLED
                } else {
                    CliAuthStatus::SIGNED_OUT
                }
            }
            RunOutcome::Succeeded(_) => {
                let read = self.inner.commands.read_file(&scratch);
                match self.run(&read, self.inner.timeouts.check()).await? {
                    RunOutcome::Succeeded(output) if !output.stdout.trim().is_empty() => {
                        self.remove_scratch(&scratch).await;
                        return self.apply_whoami(&output.stdout).await;
                    }
                    _ => CliAuthStatus::SIGNED_OUT,
                }
            }
        };

        self.remove_scratch(&scratch).await;
        self.ensure_live()?;
        {
            let mut state = self.inner.state.write();
            state.cli_status = Some(status);
            state.accounts.clear();
        }
        info!(?status, "CLI probe finished");
        Ok(status)
    }

    async fn apply_whoami(&self, text: &str) -> Result<CliAuthStatus, DeployError> {
        let accounts = parse_account_list(text);
        if accounts.is_empty() {
            self.ensure_live()?;
            {
                let mut state = self.inner.state.write();
                state.cli_status = Some(CliAuthStatus::SIGNED_OUT);
                state.accounts.clear();
            }
            info!("Probe returned no usable accounts");
            return Ok(CliAuthStatus::SIGNED_OUT);
        }

        self.ensure_live()?;
        {
            let mut state = self.inner.state.write();
            state.cli_status = Some(CliAuthStatus::SIGNED_IN);
            state.accounts = accounts.clone();
        }
        info!(accounts = accounts.len(), "CLI authenticated");

        let linked = self.load_linked().await?;
        self.ensure_live()?;
        self.inner.state.write().linked = linked;
        Ok(CliAuthStatus::SIGNED_IN)
    }

    /// Persisted link, with the production URL backfilled when possible.
    async fn load_linked(&self) -> Result<Option<LinkedProject>, DeployError> {
        let record = match self.inner.store.read().await {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, "Link store unreadable; treating as not linked");
                return Ok(None);
            }
        };
        let Some(mut linked) = LinkedProject::from_record(&record) else {
            return Ok(None);
        };

        if linked.prod_url.is_none() {
            let list = self.inner.commands.project_list(&linked.account_id);
            match self.run(&list, self.inner.timeouts.project()).await? {
                RunOutcome::Succeeded(output) => {
                    let found = parse_project_list(&output.stdout)
                        .into_iter()
                        .find(|p| p.name == linked.project_name);
                    if let Some(project) = found {
                        linked.prod_url = Some(project.production_url());
                        self.ensure_live()?;
                        if let Err(e) = self.inner.store.write(linked.to_record()).await {
                            warn!(error = %e, "Could not persist backfilled production URL");
                        }
                    }
                }
                RunOutcome::Failed(output) => {
                    warn!(detail = %output.failure_detail(), "Production URL backfill failed")
                }
                RunOutcome::Crashed(e) => warn!(error = %e, "Production URL backfill failed"),
            }
        }
        Ok(Some(linked))
    }

    async fn install_inner(&self) -> Result<(), DeployError> {
        self.ensure_live()?;
        let _installing = ActivityGuard::enter(&self.inner, installing_counter);
        let timeout = self.inner.timeouts.install();
        self.notify(Notice::info("Installing wrangler globally...")).await;

        let global = self.inner.commands.install_global();
        let installed = match self.run(&global, timeout).await? {
            RunOutcome::Succeeded(_) => Ok(()),
            RunOutcome::Failed(output) => Err(output.failure_detail()),
            RunOutcome::Crashed(e) => Err(e.to_string()),
        };
        if let Err(detail) = installed {
            debug!(%detail, "Global install failed");
            self.notify(Notice::info("Global install failed, trying local install..."))
                .await;
            let local = self.inner.commands.install_local();
            match self.run(&local, timeout).await? {
                RunOutcome::Succeeded(_) => {}
                RunOutcome::Failed(output) => {
                    return Err(DeployError::InstallFailed(output.failure_detail()))
                }
                RunOutcome::Crashed(e) => return Err(DeployError::InstallFailed(e.to_string())),
            }
        }

        let version = self.inner.commands.version();
        match self.run(&version, self.inner.timeouts.check()).await? {
            RunOutcome::Succeeded(_) => {}
            _ => {
                return Err(DeployError::InstallFailed(
                    "Install seemed to succeed but wrangler not found. Try restarting your terminal."
                        .to_string(),
                ))
            }
        }

        self.ensure_live()?;
        self.inner.state.write().cli_status = Some(CliAuthStatus::SIGNED_OUT);
        info!("Wrangler installed");
        self.notify(Notice::success("Wrangler installed!")).await;
        Ok(())
    }

    async fn login_inner(&self) -> Result<CliAuthStatus, DeployError> {
        self.ensure_live()?;
        self.notify(Notice::info("Opening Cloudflare login...")).await;

        let login = self.inner.commands.login();
        match self.run(&login, self.inner.timeouts.login()).await? {
            RunOutcome::Succeeded(_) => {}
            RunOutcome::Failed(_) => {
                return Err(DeployError::LoginFailed(
                    "Login failed or was cancelled.".to_string(),
                ))
            }
            RunOutcome::Crashed(e) => {
                return Err(DeployError::LoginFailed(format!("Login timed out or failed: {}", e)))
            }
        }

        let status = self.probe_inner().await?;
        if !status.authenticated {
            return Err(DeployError::LoginFailed(
                "Authentication failed. Please try again.".to_string(),
            ));
        }
        self.notify(Notice::success("Connected to Cloudflare!")).await;
        Ok(status)
    }

    async fn create_and_deploy_inner(
        &self,
        project_name: &str,
        account_id: &str,
        output_dir: &str,
    ) -> Result<CreateOutcome, DeployError> {
        let sanitized = sanitize_project_name(project_name);
        if sanitized.is_empty() {
            return Err(DeployError::Validation(
                "Please enter a valid project name.".to_string(),
            ));
        }
        let account_id = account_id.trim();
        if account_id.is_empty() {
            return Err(DeployError::Validation("Please select an account.".to_string()));
        }
        self.ensure_live()?;

        let create = self.inner.commands.project_create(account_id, &sanitized);
        match self.run(&create, self.inner.timeouts.project()).await? {
            RunOutcome::Succeeded(_) => info!(project = %sanitized, "Project created"),
            RunOutcome::Failed(output) if is_already_exists(&output.combined()) => {
                info!(project = %sanitized, "Project already exists; linking")
            }
            RunOutcome::Failed(output) => {
                return Err(DeployError::CreateFailed(output.failure_detail()))
            }
            RunOutcome::Crashed(e) => return Err(DeployError::CreateFailed(e.to_string())),
        }

        // Re-creating the linked project keeps its known URL unless the deploy reports a new one.
        let prod_url = self
            .linked_project()
            .filter(|current| current.project_name == sanitized && current.account_id == account_id)
            .and_then(|current| current.prod_url);
        let mut linked = LinkedProject {
            project_name: sanitized,
            account_id: account_id.to_string(),
            account_name: self.account_name(account_id),
            output_dir: normalize_output_dir(output_dir),
            prod_url,
        };
        self.persist_link(&linked).await?;

        let _deploying = ActivityGuard::enter(&self.inner, deploying_counter);
        let deploy = match self.build_and_deploy(&linked).await? {
            PipelineResult::Deployed { scraped_url } => {
                if let Some(url) = scraped_url {
                    linked.prod_url = Some(url);
                    self.persist_link(&linked).await?;
                }
                self.notify(Notice::success("Deployed! Setting up auto-deploy..."))
                    .await;
                self.inner.host.refresh_vcs_status().await;
                DeployOutcome::Deployed {
                    production_url: linked.production_url(),
                    finished_at: Utc::now(),
                }
            }
            PipelineResult::Ambiguous { reason } => self.ambiguous(reason).await,
        };

        Ok(CreateOutcome { linked, deploy })
    }

    async fn link_existing_inner(
        &self,
        project_name: &str,
        account_id: &str,
        output_dir: &str,
    ) -> Result<LinkedProject, DeployError> {
        let project_name = project_name.trim();
        if project_name.is_empty() {
            return Err(DeployError::Validation("Please select a project.".to_string()));
        }
        let account_id = account_id.trim();
        if account_id.is_empty() {
            return Err(DeployError::Validation("Please select an account.".to_string()));
        }
        self.ensure_live()?;

        let prod_url = self
            .inner
            .state
            .read()
            .remote_projects
            .get(account_id)
            .and_then(|projects| projects.iter().find(|p| p.name == project_name))
            .map(RemoteProject::production_url);

        let linked = LinkedProject {
            project_name: project_name.to_string(),
            account_id: account_id.to_string(),
            account_name: self.account_name(account_id),
            output_dir: normalize_output_dir(output_dir),
            prod_url,
        };
        self.persist_link(&linked).await?;
        self.notify(Notice::success(format!("Linked to {}", linked.project_name)))
            .await;
        Ok(linked)
    }

    async fn deploy_now_inner(&self) -> Result<DeployOutcome, DeployError> {
        let linked = self.require_linked()?;
        let _deploying = ActivityGuard::enter(&self.inner, deploying_counter);

        match self.build_and_deploy(&linked).await? {
            PipelineResult::Deployed { scraped_url } => {
                let mut current = linked;
                if current.prod_url.is_none() {
                    if let Some(url) = scraped_url {
                        current.prod_url = Some(url);
                        self.persist_link(&current).await?;
                    }
                }
                self.notify(Notice::success("Deployed to Cloudflare Pages!"))
                    .await;
                self.inner.host.refresh_vcs_status().await;
                Ok(DeployOutcome::Deployed {
                    production_url: current.production_url(),
                    finished_at: Utc::now(),
                })
            }
            PipelineResult::Ambiguous { reason } => Ok(self.ambiguous(reason).await),
        }
    }

    /// Build, verify the output folder, deploy. Never touches the store.
    async fn build_and_deploy(&self, linked: &LinkedProject) -> Result<PipelineResult, DeployError> {
        self.notify(Notice::info("Building project...")).await;
        let build = self.inner.commands.build();
        match self.run(&build, self.inner.timeouts.build()).await? {
            RunOutcome::Succeeded(_) => {}
            RunOutcome::Failed(output) => {
                self.inner.host.focus_terminal().await;
                return Err(DeployError::BuildFailed(output.failure_detail()));
            }
            RunOutcome::Crashed(e) => {
                return Ok(PipelineResult::Ambiguous {
                    reason: format!("build did not finish: {}", e),
                })
            }
        }

        let check = self.inner.commands.dir_exists(&linked.output_dir);
        match self.run(&check, self.inner.timeouts.check()).await? {
            RunOutcome::Succeeded(_) => {}
            RunOutcome::Failed(_) => {
                return Err(DeployError::OutputDirMissing {
                    dir: linked.output_dir.clone(),
                    hint: detect::output_dir_hint(&linked.output_dir),
                })
            }
            RunOutcome::Crashed(e) => {
                return Ok(PipelineResult::Ambiguous {
                    reason: format!("could not verify output folder: {}", e),
                })
            }
        }

        let deploy = self.inner.commands.pages_deploy(
            &linked.account_id,
            &linked.output_dir,
            &linked.project_name,
        );
        match self.run(&deploy, self.inner.timeouts.deploy()).await? {
            RunOutcome::Succeeded(output) => {
                let scraped_url = extract_production_url(&output.combined());
                info!(project = %linked.project_name, url = ?scraped_url, "Deploy finished");
                Ok(PipelineResult::Deployed { scraped_url })
            }
            RunOutcome::Failed(output) => Err(DeployError::DeployFailed(output.failure_detail())),
            RunOutcome::Crashed(e) => Ok(PipelineResult::Ambiguous {
                reason: format!("deploy did not finish: {}", e),
            }),
        }
    }

    async fn ambiguous(&self, reason: String) -> DeployOutcome {
        warn!(%reason, "Deploy outcome unknown");
        self.notify(Notice::warning("Connected! Deploy may still be running."))
            .await;
        DeployOutcome::Ambiguous { reason }
    }

    async fn unlink_inner(&self) -> Result<(), DeployError> {
        self.ensure_live()?;
        self.inner.store.write(LinkRecord::new()).await?;
        self.ensure_live()?;
        self.inner.state.write().linked = None;
        info!("Project unlinked");
        self.notify(Notice::success("Disconnected from Cloudflare Pages."))
            .await;
        Ok(())
    }

    async fn sign_out_inner(&self) -> Result<(), DeployError> {
        self.ensure_live()?;
        let logout = self.inner.commands.logout();
        match self.run(&logout, self.inner.timeouts.logout()).await? {
            RunOutcome::Succeeded(_) => {}
            RunOutcome::Failed(output) => {
                debug!(detail = %output.failure_detail(), "Logout exited non-zero")
            }
            RunOutcome::Crashed(e) => return Err(e.into()),
        }

        self.inner.store.write(LinkRecord::new()).await?;
        self.ensure_live()?;
        {
            let mut state = self.inner.state.write();
            state.linked = None;
            state.accounts.clear();
            state.remote_projects.clear();
            state.cli_status = Some(CliAuthStatus::SIGNED_OUT);
        }
        info!("Signed out");
        self.notify(Notice::success("Signed out of Cloudflare.")).await;
        Ok(())
    }

    async fn list_remote_projects_inner(
        &self,
        account_id: &str,
    ) -> Result<Vec<RemoteProject>, DeployError> {
        if account_id.trim().is_empty() {
            return Err(DeployError::Validation("Please select an account.".to_string()));
        }
        let list = self.inner.commands.project_list(account_id);
        let projects = match self.run(&list, self.inner.timeouts.project()).await? {
            RunOutcome::Succeeded(output) => parse_project_list(&output.stdout),
            RunOutcome::Failed(output) => {
                warn!(detail = %output.failure_detail(), "Project listing failed");
                Vec::new()
            }
            RunOutcome::Crashed(e) => {
                warn!(error = %e, "Project listing failed");
                Vec::new()
            }
        };
        self.ensure_live()?;
        self.inner
            .state
            .write()
            .remote_projects
            .insert(account_id.to_string(), projects.clone());
        Ok(projects)
    }

    async fn open(&self, url: Result<String, DeployError>) -> Result<String, DeployError> {
        let url = self.report("open", url).await?;
        self.inner.host.open_url(&url).await;
        Ok(url)
    }

    fn require_linked(&self) -> Result<LinkedProject, DeployError> {
        self.ensure_live()?;
        self.linked_project().ok_or(DeployError::NotLinked)
    }

    fn account_name(&self, account_id: &str) -> String {
        self.inner
            .state
            .read()
            .accounts
            .iter()
            .find(|a| a.id == account_id)
            .map(|a| a.name.clone())
            .unwrap_or_default()
    }

    async fn persist_link(&self, linked: &LinkedProject) -> Result<(), DeployError> {
        self.ensure_live()?;
        self.inner.store.write(linked.to_record()).await?;
        self.ensure_live()?;
        self.inner.state.write().linked = Some(linked.clone());
        debug!(project = %linked.project_name, "Link persisted");
        Ok(())
    }

    fn ensure_live(&self) -> Result<(), DeployError> {
        if self.inner.cancel.is_cancelled() {
            Err(DeployError::Disposed)
        } else {
            Ok(())
        }
    }

    /// Run one command, abandoning it if the machine is disposed meanwhile.
    async fn run(&self, invocation: &Invocation, timeout: Duration) -> Result<RunOutcome, DeployError> {
        self.ensure_live()?;
        debug!(command = %invocation.display(), ?timeout, "Running");
        let options = ExecOptions::with_timeout(timeout);
        let result = tokio::select! {
            _ = self.inner.cancel.cancelled() => return Err(DeployError::Disposed),
            result = invocation.run(self.inner.invoker.as_ref(), &options) => result,
        };
        Ok(match result {
            Ok(output) if output.success() => RunOutcome::Succeeded(output),
            Ok(output) => RunOutcome::Failed(output),
            Err(e) => RunOutcome::Crashed(e),
        })
    }

    /// Create the probe's scratch file with an unguessable name, owner-only and exclusive, so the
    /// shell redirect writes into a file this process owns. Removed on drop if `rm` never ran.
    fn scratch_file(&self) -> Result<TempPath, DeployError> {
        let dir = &self.inner.scratch_dir;
        tempfile::Builder::new()
            .prefix("pagewright-whoami-")
            .suffix(".json")
            .tempfile_in(dir)
            .map(|file| file.into_temp_path())
            .map_err(|e| {
                DeployError::Config(format!(
                    "Cannot create scratch file in {}: {}",
                    dir.display(),
                    e
                ))
            })
    }

    async fn remove_scratch(&self, path: &std::path::Path) {
        let remove = self.inner.commands.remove_file(path);
        let options = ExecOptions::with_timeout(self.inner.timeouts.check());
        match remove.run(self.inner.invoker.as_ref(), &options).await {
            Ok(output) if output.success() => {}
            Ok(output) => warn!(detail = %output.failure_detail(), "Scratch cleanup failed"),
            Err(e) => warn!(error = %e, "Scratch cleanup failed"),
        }
    }

    async fn notify(&self, notice: Notice) {
        if !self.is_disposed() {
            self.inner.host.show_notice(notice).await;
        }
    }

    async fn report<T>(
        &self,
        operation: &str,
        result: Result<T, DeployError>,
    ) -> Result<T, DeployError> {
        match &result {
            Err(DeployError::Disposed) => debug!(operation, "Result ignored after dispose"),
            Err(e) => {
                warn!(operation, error = %e, "Operation failed");
                self.notify(Notice::error(e.to_string())).await;
            }
            Ok(_) => {}
        }
        result
    }
}

fn normalize_output_dir(output_dir: &str) -> String {
    let trimmed = output_dir.trim();
    if trimmed.is_empty() {
        DEFAULT_OUTPUT_DIR.to_string()
    } else {
        trimmed.to_string()
    }
}
