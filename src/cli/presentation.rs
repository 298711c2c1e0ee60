//! CLI presentation: text and json formatters per command family.

mod deploy;
mod projects;
mod status;

pub use deploy::{format_create_outcome, format_deploy_outcome, format_linked_project};
pub use projects::{format_accounts_table, format_projects_table};
pub use status::{format_status_json, format_status_text};

use owo_colors::OwoColorize;

pub(crate) fn format_section_heading(title: &str) -> String {
    format!("{}", title.bold().underline())
}
