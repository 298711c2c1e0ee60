//! Shared test utilities for integration tests
//!
//! Provides a scripted process invoker, a recording host, a harness that wires them into a
//! deployment machine, and isolated XDG directories for configuration tests.

use async_trait::async_trait;
use pagewright::config::PagewrightConfig;
use pagewright::error::ProcessError;
use pagewright::host::{HostActions, Notice, Severity};
use pagewright::machine::DeploymentMachine;
use pagewright::process::{ExecOptions, ExecOutput, ProcessInvoker};
use pagewright::store::{LinkRecord, LinkedProject, MemoryLinkStore};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

/// One account, as `whoami --json` prints it.
pub const ONE_ACCOUNT: &str = r#"{"loggedIn":true,"accounts":[{"id":"a1","name":"Personal"}]}"#;

/// Box-drawn `pages project list` output.
pub const PROJECT_TABLE: &str = "\
┌──────────────┬──────────────────────────┬───────────────┐
│ Project Name │ Project Domains          │ Git Provider  │
├──────────────┼──────────────────────────┼───────────────┤
│ demo-site    │ demo-site-3kd.pages.dev  │ No            │
├──────────────┼──────────────────────────┼───────────────┤
│ blog         │ blog-7x2.pages.dev       │ Yes           │
└──────────────┴──────────────────────────┴───────────────┘
";

/// Deploy output carrying a per-deploy hash label.
pub const DEPLOY_OUTPUT: &str =
    "Uploading... (12/12)\n✨ Deployment complete! Take a peek over at https://abcd1234.demo-site.pages.dev\n";

/// How a scripted command answers.
#[derive(Debug, Clone)]
pub enum Response {
    Output(ExecOutput),
    Timeout,
    NotFound,
    /// Never completes.
    Hang,
}

pub fn ok(stdout: &str) -> Response {
    Response::Output(ExecOutput {
        stdout: stdout.to_string(),
        stderr: String::new(),
        exit_code: 0,
    })
}

pub fn fail(exit_code: i32, stderr: &str) -> Response {
    Response::Output(ExecOutput {
        stdout: String::new(),
        stderr: stderr.to_string(),
        exit_code,
    })
}

struct Rule {
    program: String,
    needle: String,
    response: Response,
}

/// Process invoker answering from a script.
///
/// A rule matches when the program is equal and the joined argument list contains the needle.
/// The most recently added matching rule wins; unmatched commands exit 1.
#[derive(Default)]
pub struct ScriptedInvoker {
    rules: Mutex<Vec<Rule>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&self, program: &str, needle: &str, response: Response) -> &Self {
        self.rules.lock().unwrap().push(Rule {
            program: program.to_string(),
            needle: needle.to_string(),
            response,
        });
        self
    }

    /// Recorded command lines, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_matching(&self, needle: &str) -> usize {
        self.calls().iter().filter(|c| c.contains(needle)).count()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// CLI installed and signed in with `whoami_json`, git remote present.
    pub fn signed_in(whoami_json: &str) -> Self {
        let invoker = Self::new();
        invoker
            .on("sh", "whoami --json", ok(""))
            .on("cat", "pagewright-whoami", ok(whoami_json))
            .on("rm", "-f", ok(""))
            .on("git", "remote -v", ok("origin\tgit@github.com:me/site.git (fetch)\n"));
        invoker
    }

    /// Build, output check and deploy all succeed.
    pub fn with_successful_pipeline(self) -> Self {
        self.on("npm", "run build", ok("built"))
            .on("test", "-d", ok(""))
            .on("sh", "pages deploy", ok(DEPLOY_OUTPUT));
        self
    }
}

#[async_trait]
impl ProcessInvoker for ScriptedInvoker {
    async fn execute(
        &self,
        program: &str,
        args: &[String],
        _options: &ExecOptions,
    ) -> Result<ExecOutput, ProcessError> {
        let joined = args.join(" ");
        self.calls
            .lock()
            .unwrap()
            .push(format!("{} {}", program, joined));

        let response = self
            .rules
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|rule| rule.program == program && joined.contains(&rule.needle))
            .map(|rule| rule.response.clone());

        match response {
            Some(Response::Output(output)) => Ok(output),
            Some(Response::Timeout) => Err(ProcessError::Timeout {
                program: program.to_string(),
                timeout: Duration::from_secs(1),
            }),
            Some(Response::NotFound) => Err(ProcessError::NotFound {
                program: program.to_string(),
            }),
            Some(Response::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(ProcessError::Timeout {
                    program: program.to_string(),
                    timeout: Duration::from_secs(3600),
                })
            }
            None => Ok(ExecOutput {
                stdout: String::new(),
                stderr: format!("unscripted command: {} {}", program, joined),
                exit_code: 1,
            }),
        }
    }
}

/// Host that records every request.
#[derive(Default)]
pub struct RecordingHost {
    pub notices: Mutex<Vec<Notice>>,
    pub opened: Mutex<Vec<String>>,
    pub vcs_refreshes: Mutex<usize>,
    pub terminal_focuses: Mutex<usize>,
}

impl RecordingHost {
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }

    pub fn notices_with(&self, severity: Severity) -> Vec<String> {
        self.notices()
            .into_iter()
            .filter(|n| n.severity == severity)
            .map(|n| n.message)
            .collect()
    }

    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }

    pub fn vcs_refreshes(&self) -> usize {
        *self.vcs_refreshes.lock().unwrap()
    }

    pub fn terminal_focuses(&self) -> usize {
        *self.terminal_focuses.lock().unwrap()
    }
}

#[async_trait]
impl HostActions for RecordingHost {
    async fn show_notice(&self, notice: Notice) {
        self.notices.lock().unwrap().push(notice);
    }

    async fn open_url(&self, url: &str) {
        self.opened.lock().unwrap().push(url.to_string());
    }

    async fn refresh_vcs_status(&self) {
        *self.vcs_refreshes.lock().unwrap() += 1;
    }

    async fn focus_terminal(&self) {
        *self.terminal_focuses.lock().unwrap() += 1;
    }
}

/// A machine over scripted collaborators.
pub struct Harness {
    pub machine: DeploymentMachine,
    pub invoker: Arc<ScriptedInvoker>,
    pub store: Arc<MemoryLinkStore>,
    pub host: Arc<RecordingHost>,
    pub config: PagewrightConfig,
    _scratch: TempDir,
}

impl Harness {
    pub fn new(invoker: ScriptedInvoker, store: MemoryLinkStore) -> Self {
        let scratch = TempDir::new().unwrap();
        let mut config = PagewrightConfig::default();
        config.storage.scratch_dir = Some(scratch.path().to_path_buf());

        let invoker = Arc::new(invoker);
        let store = Arc::new(store);
        let host = Arc::new(RecordingHost::default());
        let machine = DeploymentMachine::new(
            &config,
            invoker.clone(),
            store.clone(),
            host.clone(),
        );
        Self {
            machine,
            invoker,
            store,
            host,
            config,
            _scratch: scratch,
        }
    }

    /// Persisted link, if the store holds a complete one.
    pub fn stored_link(&self) -> Option<LinkedProject> {
        LinkedProject::from_record(&self.store.snapshot())
    }
}

/// Store already holding `linked`.
pub fn store_with(linked: &LinkedProject) -> MemoryLinkStore {
    MemoryLinkStore::with_record(linked.to_record())
}

pub fn linked_demo(prod_url: Option<&str>) -> LinkedProject {
    LinkedProject {
        project_name: "demo-site".to_string(),
        account_id: "a1".to_string(),
        account_name: "Personal".to_string(),
        output_dir: "dist".to_string(),
        prod_url: prod_url.map(str::to_string),
    }
}

pub fn empty_record() -> LinkRecord {
    LinkRecord::new()
}

/// Global mutex to serialize XDG environment variable access across all tests
/// This prevents race conditions when tests run in parallel
static XDG_ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Environment variable state to restore after test
struct EnvState {
    home: Option<String>,
    xdg_config_home: Option<String>,
    pagewright_env: Option<String>,
}

impl EnvState {
    fn capture() -> Self {
        Self {
            home: std::env::var("HOME").ok(),
            xdg_config_home: std::env::var("XDG_CONFIG_HOME").ok(),
            pagewright_env: std::env::var("PAGEWRIGHT_ENV").ok(),
        }
    }

    fn restore(self) {
        restore_var("HOME", self.home);
        restore_var("XDG_CONFIG_HOME", self.xdg_config_home);
        restore_var("PAGEWRIGHT_ENV", self.pagewright_env);
    }
}

fn restore_var(key: &str, value: Option<String>) {
    match value {
        Some(orig) => std::env::set_var(key, orig),
        None => std::env::remove_var(key),
    }
}

/// Run `f` with HOME and XDG_CONFIG_HOME pointing into `test_dir`.
///
/// Environment changes made inside `f` are serialized with other callers and the captured
/// variables are restored afterwards.
pub fn with_xdg_env<F, R>(test_dir: &TempDir, f: F) -> R
where
    F: FnOnce() -> R,
{
    let _guard = XDG_ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let env_state = EnvState::capture();

    let test_config_home = test_dir.path().join("config");
    let test_home = test_dir.path().join("home");
    std::fs::create_dir_all(&test_config_home).unwrap();
    std::fs::create_dir_all(&test_home).unwrap();

    std::env::set_var("HOME", test_home.to_str().unwrap());
    std::env::set_var("XDG_CONFIG_HOME", test_config_home.to_str().unwrap());
    std::env::remove_var("PAGEWRIGHT_ENV");

    let result = f();

    env_state.restore();

    result
}
