//! Status presentation: the toolbar caption, signals and available actions.

use super::format_section_heading;
use crate::error::DeployError;
use crate::status::{DeploymentState, StatusSnapshot};
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use owo_colors::OwoColorize;
use serde_json::json;

fn colored_caption(state: DeploymentState) -> String {
    let label = state.label();
    match state {
        DeploymentState::Connected => format!("{}", label.green().bold()),
        DeploymentState::WrongAccount | DeploymentState::NotInstalled => {
            format!("{}", label.red().bold())
        }
        DeploymentState::Checking | DeploymentState::Deploying => {
            format!("{}", label.yellow().bold())
        }
        DeploymentState::NotAuthenticated | DeploymentState::NotLinked => {
            format!("{}", label.bold())
        }
    }
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

pub fn format_status_text(snapshot: &StatusSnapshot) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n\n", format_section_heading("Cloudflare Pages")));

    match snapshot.visible_state() {
        Some(state) => out.push_str(&format!("  State: {} ({})\n", colored_caption(state), state)),
        None => out.push_str("  State: waiting for a git remote before linking\n"),
    }

    if let Some(cli_status) = snapshot.cli_status {
        out.push_str(&format!("  Wrangler installed: {}\n", yes_no(cli_status.installed)));
        out.push_str(&format!("  Signed in: {}\n", yes_no(cli_status.authenticated)));
    }
    out.push_str(&format!("  Git remote: {}\n", yes_no(snapshot.has_git_remote)));

    if let Some(linked) = &snapshot.linked {
        out.push_str(&format!("\n{}\n\n", format_section_heading("Linked project")));
        let mut table = Table::new();
        table.load_preset(UTF8_BORDERS_ONLY);
        table.set_header(vec!["Project", "Account", "Output", "Production"]);
        let account = if linked.account_name.is_empty() {
            linked.account_id.clone()
        } else {
            format!("{} ({})", linked.account_name, linked.account_id)
        };
        table.add_row(vec![
            linked.project_name.clone(),
            account,
            linked.output_dir.clone(),
            linked.production_label(),
        ]);
        out.push_str(&format!("{}\n", table));
    }

    if let Some(state) = snapshot.visible_state() {
        let actions = state.menu_actions();
        if !actions.is_empty() {
            let labels: Vec<&str> = actions.iter().map(|a| a.label()).collect();
            out.push_str(&format!("\n  Actions: {}\n", labels.join(", ")));
        }
    }
    out
}

pub fn format_status_json(snapshot: &StatusSnapshot) -> Result<String, DeployError> {
    let out = json!({
        "state": snapshot.state,
        "visible_state": snapshot.visible_state(),
        "label": snapshot.state.label(),
        "cli_status": snapshot.cli_status,
        "accounts": snapshot.accounts,
        "linked": snapshot.linked,
        "production_url": snapshot.linked.as_ref().map(|l| l.production_url()),
        "has_git_remote": snapshot.has_git_remote,
        "installing": snapshot.installing,
        "actions": snapshot.state.menu_actions(),
    });
    serde_json::to_string_pretty(&out).map_err(|e| DeployError::Config(e.to_string()))
}
