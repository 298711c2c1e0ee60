//! CLI parse: clap types for Pagewright. No behavior; definitions only.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Pagewright CLI - Cloudflare Pages deployments driven through wrangler
#[derive(Parser)]
#[command(name = "pagewright")]
#[command(about = "Link, build and deploy a workspace to Cloudflare Pages using the wrangler CLI")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (default: off)
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output is "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show CLI, account and link status
    Status {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Install the wrangler CLI (global, falling back to a local dev dependency)
    Install,
    /// Sign in to Cloudflare through wrangler
    Login,
    /// Sign out of Cloudflare and forget the linked project
    Logout,
    /// List accounts available to the signed-in session
    Accounts,
    /// List Pages projects in an account
    Projects {
        /// Account ID or name (prompted when several are available)
        #[arg(long)]
        account: Option<String>,
    },
    /// Create a Pages project, link it, then build and deploy
    Create {
        /// Project name (sanitized to a DNS-safe label)
        name: String,
        /// Account ID or name (prompted when several are available)
        #[arg(long)]
        account: Option<String>,
        /// Build output directory (detected when omitted)
        #[arg(long)]
        output_dir: Option<String>,
    },
    /// Link an existing Pages project without deploying
    Link {
        /// Existing project name
        project: String,
        /// Account ID or name (prompted when several are available)
        #[arg(long)]
        account: Option<String>,
        /// Build output directory (detected when omitted)
        #[arg(long)]
        output_dir: Option<String>,
    },
    /// Build and deploy the linked project
    Deploy,
    /// Forget the linked project (keeps the Cloudflare session)
    Unlink,
    /// Print the detected build output directory
    DetectOutput,
    /// Wait until the workspace has a git remote
    WaitRemote {
        /// Give up after this many seconds
        #[arg(long, default_value = "300")]
        timeout_secs: u64,
    },
    /// Open a Cloudflare page in the browser
    Open {
        #[arg(value_enum)]
        target: OpenTarget,
    },
    /// Print the effective configuration as TOML
    Config,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OpenTarget {
    /// The production site
    Production,
    /// The project's dashboard page
    Dashboard,
    /// Dashboard flow for Git-connected auto-deploys
    AutoDeploy,
}
