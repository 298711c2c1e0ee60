//! Command surface of the Pages CLI and its helpers.
//!
//! Every external command the deployment machine runs is built here so the argument shapes stay
//! in one place. Commands that act on an account are wrapped in `sh -c` with the account
//! environment variable as a prefix.

use crate::config::{BuildConfig, CliConfig};
use crate::process::{Invocation, ShellCommand};
use std::path::Path;

/// Manifest inspected when guessing the build output directory.
pub const MANIFEST_FILE: &str = "package.json";

/// Builds invocations for the Pages CLI, the package manager, and the shell helpers.
#[derive(Debug, Clone)]
pub struct WranglerCommands {
    cli: CliConfig,
    build: BuildConfig,
}

impl WranglerCommands {
    pub fn new(cli: CliConfig, build: BuildConfig) -> Self {
        Self { cli, build }
    }

    fn cli_shell(&self, account_id: Option<&str>) -> ShellCommand {
        let mut cmd = ShellCommand::new(&self.cli.program).args(self.cli.args.iter().cloned());
        if let Some(account_id) = account_id {
            cmd = cmd.env(&self.cli.account_env, account_id);
        }
        cmd
    }

    fn cli_direct<I, S>(&self, tail: I) -> Invocation
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Invocation::new(
            &self.cli.program,
            self.cli
                .args
                .iter()
                .cloned()
                .chain(tail.into_iter().map(Into::into)),
        )
    }

    /// `whoami --json`, stdout redirected into `scratch`, stderr discarded.
    pub fn whoami_to_file(&self, scratch: &Path) -> Invocation {
        self.cli_shell(None)
            .args(["whoami", "--json"])
            .redirect_to(scratch)
            .into_invocation()
    }

    pub fn read_file(&self, path: &Path) -> Invocation {
        Invocation::new("cat", [path.to_string_lossy().into_owned()])
    }

    pub fn remove_file(&self, path: &Path) -> Invocation {
        Invocation::new("rm", ["-f".to_string(), path.to_string_lossy().into_owned()])
    }

    pub fn project_list(&self, account_id: &str) -> Invocation {
        self.cli_shell(Some(account_id))
            .args(["pages", "project", "list"])
            .into_invocation()
    }

    pub fn project_create(&self, account_id: &str, project_name: &str) -> Invocation {
        self.cli_shell(Some(account_id))
            .args(["pages", "project", "create", project_name])
            .args(["--production-branch", self.cli.production_branch.as_str()])
            .into_invocation()
    }

    pub fn pages_deploy(&self, account_id: &str, output_dir: &str, project_name: &str) -> Invocation {
        self.cli_shell(Some(account_id))
            .args(["pages", "deploy", output_dir, "--project-name", project_name])
            .into_invocation()
    }

    pub fn login(&self) -> Invocation {
        self.cli_direct(["login"])
    }

    pub fn logout(&self) -> Invocation {
        self.cli_direct(["logout"])
    }

    pub fn version(&self) -> Invocation {
        self.cli_direct(["--version"])
    }

    pub fn install_global(&self) -> Invocation {
        Invocation::new(
            &self.build.package_manager,
            ["install", "-g", self.cli.package.as_str()],
        )
    }

    pub fn install_local(&self) -> Invocation {
        Invocation::new(
            &self.build.package_manager,
            ["install", "--save-dev", self.cli.package.as_str()],
        )
    }

    pub fn build(&self) -> Invocation {
        Invocation::new(&self.build.program, self.build.args.iter().cloned())
    }

    pub fn dir_exists(&self, dir: &str) -> Invocation {
        Invocation::new("test", ["-d", dir])
    }

    pub fn read_manifest(&self) -> Invocation {
        Invocation::new("cat", [MANIFEST_FILE])
    }

    pub fn git_remotes(&self) -> Invocation {
        Invocation::new("git", ["remote", "-v"])
    }
}

impl Default for WranglerCommands {
    fn default() -> Self {
        Self::new(CliConfig::default(), BuildConfig::default())
    }
}

/// Dashboard page of a project.
pub fn dashboard_url(account_id: &str, project_name: &str) -> String {
    format!(
        "https://dash.cloudflare.com/{}/pages/view/{}",
        account_id, project_name
    )
}

/// Dashboard flow that creates a Git-connected project, which deploys on every push.
pub fn auto_deploy_setup_url(account_id: &str) -> String {
    format!(
        "https://dash.cloudflare.com/{}/pages/new/provider/gh",
        account_id
    )
}
