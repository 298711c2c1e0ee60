//! CLI route table over scripted collaborators.

use crate::integration::test_utils::*;
use pagewright::cli::{exit_code, Commands, OpenTarget, RunContext};
use pagewright::config::PagewrightConfig;
use pagewright::error::DeployError;
use pagewright::store::{LinkedProject, MemoryLinkStore};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

struct Cli {
    context: RunContext,
    invoker: Arc<ScriptedInvoker>,
    store: Arc<MemoryLinkStore>,
    host: Arc<RecordingHost>,
    _scratch: TempDir,
}

fn cli(invoker: ScriptedInvoker, linked: Option<LinkedProject>) -> Cli {
    let scratch = TempDir::new().unwrap();
    let mut config = PagewrightConfig::default();
    config.storage.scratch_dir = Some(scratch.path().to_path_buf());

    let invoker = Arc::new(invoker);
    let store = Arc::new(match linked {
        Some(linked) => store_with(&linked),
        None => MemoryLinkStore::new(),
    });
    let host = Arc::new(RecordingHost::default());
    let context = RunContext::with_parts(
        config,
        PathBuf::from("."),
        invoker.clone(),
        store.clone(),
        host.clone(),
    );
    Cli {
        context,
        invoker,
        store,
        host,
        _scratch: scratch,
    }
}

#[tokio::test]
async fn test_status_json_reports_connected_project() {
    let cli = cli(
        ScriptedInvoker::signed_in(ONE_ACCOUNT),
        Some(linked_demo(Some("https://demo-site.pages.dev"))),
    );

    let output = cli
        .context
        .execute(&Commands::Status {
            format: "json".to_string(),
        })
        .await
        .unwrap();

    let value: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(value["state"], "CONNECTED");
    assert_eq!(value["visible_state"], "CONNECTED");
    assert_eq!(value["production_url"], "https://demo-site.pages.dev");
    assert_eq!(value["has_git_remote"], true);
    assert!(value["actions"]
        .as_array()
        .unwrap()
        .iter()
        .any(|a| a == "deploy_now"));
}

#[tokio::test]
async fn test_status_text_when_not_installed() {
    let invoker = ScriptedInvoker::new();
    invoker
        .on("sh", "whoami --json", fail(127, "sh: 1: npx: not found"))
        .on("rm", "-f", ok(""));
    let cli = cli(invoker, None);

    let output = cli
        .context
        .execute(&Commands::Status {
            format: "text".to_string(),
        })
        .await
        .unwrap();

    assert!(output.contains("Install Wrangler"));
}

#[tokio::test]
async fn test_deploy_requires_a_link() {
    let invoker = ScriptedInvoker::signed_in(ONE_ACCOUNT).with_successful_pipeline();
    let cli = cli(invoker, None);

    let err = cli.context.execute(&Commands::Deploy).await.unwrap_err();

    assert!(matches!(err, DeployError::NotLinked));
    assert_eq!(exit_code(&err), 1);
    assert_eq!(cli.invoker.calls_matching("run build"), 0);
}

#[tokio::test]
async fn test_deploy_refused_for_wrong_account() {
    let foreign = LinkedProject {
        account_id: "someone-else".to_string(),
        ..linked_demo(Some("https://demo-site.pages.dev"))
    };
    let invoker = ScriptedInvoker::signed_in(ONE_ACCOUNT).with_successful_pipeline();
    let cli = cli(invoker, Some(foreign));

    let err = cli.context.execute(&Commands::Deploy).await.unwrap_err();

    assert!(matches!(err, DeployError::Validation(ref msg) if msg.contains("pagewright unlink")));
    assert_eq!(exit_code(&err), 2);
    assert_eq!(cli.invoker.calls_matching("run build"), 0);
}

#[tokio::test]
async fn test_create_uses_single_account_and_detected_output() {
    let invoker = ScriptedInvoker::signed_in(ONE_ACCOUNT).with_successful_pipeline();
    invoker
        .on("sh", "pages project create", ok(""))
        .on("cat", "package.json", ok(r#"{"devDependencies":{"react-scripts":"5.0.1"}}"#));
    let cli = cli(invoker, None);

    let output = cli
        .context
        .execute(&Commands::Create {
            name: "My Site".to_string(),
            account: None,
            output_dir: None,
        })
        .await
        .unwrap();

    assert!(output.contains("Linked my-site"));
    assert!(output.contains("Production: https://demo-site.pages.dev"));
    let stored = LinkedProject::from_record(&cli.store.snapshot()).unwrap();
    assert_eq!(stored.output_dir, "build");
    assert_eq!(cli.invoker.calls_matching("pages deploy build --project-name my-site"), 1);
}

#[tokio::test]
async fn test_link_rejects_unknown_project() {
    let invoker = ScriptedInvoker::signed_in(ONE_ACCOUNT);
    invoker.on("sh", "pages project list", ok(PROJECT_TABLE));
    let cli = cli(invoker, None);

    let err = cli
        .context
        .execute(&Commands::Link {
            project: "missing".to_string(),
            account: Some("Personal".to_string()),
            output_dir: Some("dist".to_string()),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, DeployError::Validation(_)));
    assert_eq!(cli.store.write_count(), 0);
}

#[tokio::test]
async fn test_open_dashboard_routes_to_host() {
    let cli = cli(
        ScriptedInvoker::signed_in(ONE_ACCOUNT),
        Some(linked_demo(Some("https://demo-site.pages.dev"))),
    );

    let url = cli
        .context
        .execute(&Commands::Open {
            target: OpenTarget::Dashboard,
        })
        .await
        .unwrap();

    assert_eq!(url, "https://dash.cloudflare.com/a1/pages/view/demo-site");
    assert_eq!(cli.host.opened(), vec![url]);
}

#[tokio::test]
async fn test_accounts_requires_sign_in() {
    let invoker = ScriptedInvoker::new();
    invoker
        .on("sh", "whoami --json", fail(1, ""))
        .on("rm", "-f", ok(""));
    let cli = cli(invoker, None);

    let err = cli.context.execute(&Commands::Accounts).await.unwrap_err();

    assert!(err.to_string().contains("pagewright login"));
}

#[tokio::test]
async fn test_config_prints_toml() {
    let cli = cli(ScriptedInvoker::new(), None);

    let output = cli.context.execute(&Commands::Config).await.unwrap();

    let parsed: toml::Value = toml::from_str(&output).unwrap();
    assert_eq!(parsed["cli"]["program"].as_str(), Some("npx"));
    assert!(cli.invoker.calls().is_empty());
}
