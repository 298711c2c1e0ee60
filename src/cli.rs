//! CLI domain: parse, route, help, output, and presentation only.
//! No domain orchestration; single route table dispatches to the deployment machine.

mod help;
mod output;
mod parse;
mod presentation;
mod route;

pub use help::{command_name, is_mutation};
pub use output::{exit_code, map_error};
pub use parse::{Cli, Commands, OpenTarget};
pub use presentation::{
    format_accounts_table, format_create_outcome, format_deploy_outcome, format_linked_project,
    format_projects_table, format_status_json, format_status_text,
};
pub use route::RunContext;
