//! Create, link and deploy result presentation.

use crate::machine::{CreateOutcome, DeployOutcome};
use crate::store::LinkedProject;

pub fn format_linked_project(linked: &LinkedProject) -> String {
    format!(
        "Linked {} (account {}, output {})\nProduction: {}",
        linked.project_name,
        if linked.account_name.is_empty() {
            &linked.account_id
        } else {
            &linked.account_name
        },
        linked.output_dir,
        linked.production_url()
    )
}

pub fn format_deploy_outcome(outcome: &DeployOutcome) -> String {
    match outcome {
        DeployOutcome::Deployed {
            production_url,
            finished_at,
        } => format!(
            "Deployed at {}\nProduction: {}",
            finished_at.format("%Y-%m-%d %H:%M:%S UTC"),
            production_url
        ),
        DeployOutcome::Ambiguous { reason } => format!(
            "Deploy outcome unknown ({}). It may still be running; check the dashboard.",
            reason
        ),
    }
}

pub fn format_create_outcome(outcome: &CreateOutcome) -> String {
    format!(
        "{}\n{}",
        format_linked_project(&outcome.linked),
        format_deploy_outcome(&outcome.deploy)
    )
}
