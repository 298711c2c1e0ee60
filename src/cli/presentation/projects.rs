//! Account and project list presentation.

use crate::status::{Account, RemoteProject};
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;

pub fn format_accounts_table(accounts: &[Account]) -> String {
    if accounts.is_empty() {
        return "No accounts found.\n\nUse 'pagewright login' to sign in.".to_string();
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Account", "ID"]);
    for account in accounts {
        table.add_row(vec![account.name.clone(), account.id.clone()]);
    }
    format!("{}\n\nTotal: {} account(s)", table, accounts.len())
}

pub fn format_projects_table(projects: &[RemoteProject]) -> String {
    if projects.is_empty() {
        return "No projects found.\n\nUse 'pagewright create <name>' to create one.".to_string();
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Project", "Production URL"]);
    for project in projects {
        table.add_row(vec![project.name.clone(), project.production_url()]);
    }
    format!("{}\n\nTotal: {} project(s)", table, projects.len())
}
