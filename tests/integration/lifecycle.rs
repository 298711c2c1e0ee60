//! End-to-end onboarding: install, sign in, create and deploy.

use crate::integration::test_utils::*;
use pagewright::error::DeployError;
use pagewright::host::Severity;
use pagewright::machine::DeployOutcome;
use pagewright::status::{CliAuthStatus, DeploymentState};
use pagewright::store::MemoryLinkStore;

#[tokio::test]
async fn test_fresh_workspace_to_connected() {
    let invoker = ScriptedInvoker::new();
    invoker
        .on("sh", "whoami --json", fail(127, "sh: 1: npx: not found"))
        .on("rm", "-f", ok(""));
    let harness = Harness::new(invoker, MemoryLinkStore::new());
    let machine = &harness.machine;

    assert_eq!(machine.state(), DeploymentState::Checking);

    let status = machine.probe_cli_status().await.unwrap();
    assert_eq!(status, CliAuthStatus::NOT_INSTALLED);
    assert_eq!(machine.state(), DeploymentState::NotInstalled);

    harness
        .invoker
        .on("npm", "install -g wrangler", ok("added 1 package"))
        .on("npx", "--version", ok("3.78.0"));
    machine.install_cli().await.unwrap();
    assert_eq!(machine.state(), DeploymentState::NotAuthenticated);

    harness
        .invoker
        .on("npx", "login", ok("Successfully logged in."))
        .on("sh", "whoami --json", ok(""))
        .on("cat", "pagewright-whoami", ok(ONE_ACCOUNT));
    let status = machine.login().await.unwrap();
    assert_eq!(status, CliAuthStatus::SIGNED_IN);
    assert_eq!(machine.state(), DeploymentState::NotLinked);
    assert_eq!(machine.snapshot().visible_state(), None);

    assert!(!machine.poll_git_remote_once().await.unwrap());
    harness
        .invoker
        .on("git", "remote -v", ok("origin\tgit@github.com:me/site.git (fetch)\n"));
    assert!(machine.poll_git_remote_once().await.unwrap());
    assert_eq!(
        machine.snapshot().visible_state(),
        Some(DeploymentState::NotLinked)
    );

    harness
        .invoker
        .on("sh", "pages project create demo-site", ok("Successfully created"))
        .on("npm", "run build", ok("built"))
        .on("test", "-d dist", ok(""))
        .on("sh", "pages deploy dist", ok(DEPLOY_OUTPUT));
    let outcome = machine
        .create_and_deploy("Demo Site", "a1", "dist")
        .await
        .unwrap();

    assert_eq!(outcome.linked.project_name, "demo-site");
    assert_eq!(outcome.linked.account_name, "Personal");
    match outcome.deploy {
        DeployOutcome::Deployed { production_url, .. } => {
            assert_eq!(production_url, "https://demo-site.pages.dev")
        }
        other => panic!("expected a finished deploy, got {:?}", other),
    }
    assert_eq!(machine.state(), DeploymentState::Connected);

    let stored = harness.stored_link().unwrap();
    assert_eq!(stored.prod_url.as_deref(), Some("https://demo-site.pages.dev"));
    assert_eq!(stored.output_dir, "dist");
    assert_eq!(harness.host.vcs_refreshes(), 1);
    assert!(harness
        .host
        .notices_with(Severity::Success)
        .contains(&"Deployed! Setting up auto-deploy...".to_string()));
    assert!(harness.host.notices_with(Severity::Error).is_empty());
}

#[tokio::test]
async fn test_install_falls_back_to_local() {
    let invoker = ScriptedInvoker::new();
    invoker
        .on("npm", "install -g", fail(243, "EACCES: permission denied"))
        .on("npm", "install --save-dev wrangler", ok(""))
        .on("npx", "--version", ok("3.78.0"));
    let harness = Harness::new(invoker, MemoryLinkStore::new());

    harness.machine.install_cli().await.unwrap();

    let infos = harness.host.notices_with(Severity::Info);
    assert!(infos.contains(&"Global install failed, trying local install...".to_string()));
    assert!(!harness.machine.snapshot().installing);
}

#[tokio::test]
async fn test_install_unverified_fails() {
    let invoker = ScriptedInvoker::new();
    invoker
        .on("npm", "install -g", ok(""))
        .on("npx", "--version", fail(127, "not found"));
    let harness = Harness::new(invoker, MemoryLinkStore::new());

    let err = harness.machine.install_cli().await.unwrap_err();
    assert!(matches!(err, DeployError::InstallFailed(_)));
    assert!(err.to_string().contains("restarting your terminal"));
    assert_eq!(harness.machine.state(), DeploymentState::Checking);
}

#[tokio::test]
async fn test_login_without_accounts_fails() {
    let invoker = ScriptedInvoker::new();
    invoker
        .on("npx", "login", ok(""))
        .on("sh", "whoami --json", ok(""))
        .on("cat", "pagewright-whoami", ok(r#"{"loggedIn":false}"#))
        .on("rm", "-f", ok(""));
    let harness = Harness::new(invoker, MemoryLinkStore::new());

    let err = harness.machine.login().await.unwrap_err();
    assert_eq!(err.to_string(), "Login failed: Authentication failed. Please try again.");
    assert_eq!(harness.machine.state(), DeploymentState::NotAuthenticated);
    assert_eq!(
        harness.host.notices_with(Severity::Error),
        vec![err.to_string()]
    );
}

#[tokio::test]
async fn test_create_treats_existing_project_as_success() {
    let invoker = ScriptedInvoker::signed_in(ONE_ACCOUNT).with_successful_pipeline();
    invoker.on(
        "sh",
        "pages project create",
        fail(1, "✘ [ERROR] A project with this name already exists."),
    );
    let harness = Harness::new(invoker, MemoryLinkStore::new());
    harness.machine.probe_cli_status().await.unwrap();

    let outcome = harness
        .machine
        .create_and_deploy("demo-site", "a1", "dist")
        .await
        .unwrap();

    assert_eq!(outcome.linked.project_name, "demo-site");
    assert_eq!(harness.invoker.calls_matching("pages deploy"), 1);
    assert_eq!(harness.machine.state(), DeploymentState::Connected);
}

#[tokio::test]
async fn test_create_twice_stays_connected() {
    let invoker = ScriptedInvoker::signed_in(ONE_ACCOUNT).with_successful_pipeline();
    invoker.on("sh", "pages project create", ok("✨ Successfully created the 'demo-site' project."));
    let harness = Harness::new(invoker, MemoryLinkStore::new());
    harness.machine.probe_cli_status().await.unwrap();

    harness
        .machine
        .create_and_deploy("demo-site", "a1", "dist")
        .await
        .unwrap();
    assert_eq!(harness.machine.state(), DeploymentState::Connected);

    harness.invoker.on(
        "sh",
        "pages project create",
        fail(1, "✘ [ERROR] A project with this name already exists."),
    );
    let outcome = harness
        .machine
        .create_and_deploy("demo-site", "a1", "dist")
        .await
        .unwrap();

    assert_eq!(outcome.linked.project_name, "demo-site");
    assert_eq!(harness.machine.state(), DeploymentState::Connected);
    assert_eq!(harness.stored_link().unwrap().project_name, "demo-site");
    assert_eq!(harness.invoker.calls_matching("pages project create"), 2);
    assert_eq!(harness.invoker.calls_matching("pages deploy"), 2);
    assert!(harness.host.notices_with(Severity::Error).is_empty());
}

#[tokio::test]
async fn test_create_failure_leaves_workspace_unlinked() {
    let invoker = ScriptedInvoker::signed_in(ONE_ACCOUNT).with_successful_pipeline();
    invoker.on(
        "sh",
        "pages project create",
        fail(1, "Authentication error [code: 10000]"),
    );
    let harness = Harness::new(invoker, MemoryLinkStore::new());
    harness.machine.probe_cli_status().await.unwrap();

    let err = harness
        .machine
        .create_and_deploy("demo-site", "a1", "dist")
        .await
        .unwrap_err();

    assert!(matches!(err, DeployError::CreateFailed(_)));
    assert_eq!(harness.store.write_count(), 0);
    assert_eq!(harness.invoker.calls_matching("run build"), 0);
    assert_eq!(harness.machine.state(), DeploymentState::NotLinked);
}

#[tokio::test]
async fn test_create_validation_runs_nothing() {
    let harness = Harness::new(ScriptedInvoker::new(), MemoryLinkStore::new());

    let err = harness
        .machine
        .create_and_deploy("!!!", "a1", "dist")
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Please enter a valid project name.");

    let err = harness
        .machine
        .create_and_deploy("demo", "  ", "dist")
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Please select an account.");

    let err = harness
        .machine
        .link_existing("", "a1", "dist")
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Please select a project.");

    assert!(harness.invoker.calls().is_empty());
    assert_eq!(harness.store.write_count(), 0);
    assert_eq!(harness.host.notices_with(Severity::Error).len(), 3);
}

#[tokio::test]
async fn test_link_existing_uses_listed_subdomain() {
    let invoker = ScriptedInvoker::signed_in(ONE_ACCOUNT);
    invoker.on("sh", "pages project list", ok(PROJECT_TABLE));
    let harness = Harness::new(invoker, MemoryLinkStore::new());
    harness.machine.probe_cli_status().await.unwrap();

    let projects = harness.machine.list_remote_projects("a1").await.unwrap();
    assert_eq!(projects.len(), 2);

    harness.invoker.clear_calls();
    let linked = harness
        .machine
        .link_existing("blog", "a1", "")
        .await
        .unwrap();

    assert_eq!(linked.prod_url.as_deref(), Some("https://blog-7x2.pages.dev"));
    assert_eq!(linked.output_dir, "dist");
    assert!(harness.invoker.calls().is_empty());
    assert_eq!(harness.stored_link(), Some(linked));
    assert_eq!(harness.machine.state(), DeploymentState::Connected);
    assert!(harness
        .host
        .notices_with(Severity::Success)
        .contains(&"Linked to blog".to_string()));
}

#[tokio::test]
async fn test_failed_listing_degrades_to_empty() {
    let invoker = ScriptedInvoker::signed_in(ONE_ACCOUNT);
    invoker.on("sh", "pages project list", Response::Timeout);
    let harness = Harness::new(invoker, MemoryLinkStore::new());

    let projects = harness.machine.list_remote_projects("a1").await.unwrap();
    assert!(projects.is_empty());
    assert!(harness.host.notices().is_empty());
}
