//! CLI command-name contract for logging.

use crate::cli::parse::{Commands, OpenTarget};

/// Command name string for log events (e.g. "status", "open.dashboard").
pub fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Status { .. } => "status",
        Commands::Install => "install",
        Commands::Login => "login",
        Commands::Logout => "logout",
        Commands::Accounts => "accounts",
        Commands::Projects { .. } => "projects",
        Commands::Create { .. } => "create",
        Commands::Link { .. } => "link",
        Commands::Deploy => "deploy",
        Commands::Unlink => "unlink",
        Commands::DetectOutput => "detect_output",
        Commands::WaitRemote { .. } => "wait_remote",
        Commands::Open { target } => match target {
            OpenTarget::Production => "open.production",
            OpenTarget::Dashboard => "open.dashboard",
            OpenTarget::AutoDeploy => "open.auto_deploy",
        },
        Commands::Config => "config",
    }
}

/// Whether the command changes local or remote state.
pub fn is_mutation(command: &Commands) -> bool {
    matches!(
        command,
        Commands::Install
            | Commands::Login
            | Commands::Logout
            | Commands::Create { .. }
            | Commands::Link { .. }
            | Commands::Deploy
            | Commands::Unlink
    )
}
