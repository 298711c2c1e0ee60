//! Deployment status model and the pure state derivation.
//!
//! The toolbar state is never stored. It is recomputed from four raw signals on every read, so
//! there is exactly one place that decides what the user sees.

use crate::store::LinkedProject;
use serde::{Deserialize, Serialize};

/// Result of the combined install/auth probe. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliAuthStatus {
    pub installed: bool,
    pub authenticated: bool,
}

impl CliAuthStatus {
    pub const NOT_INSTALLED: Self = Self {
        installed: false,
        authenticated: false,
    };
    pub const SIGNED_OUT: Self = Self {
        installed: true,
        authenticated: false,
    };
    pub const SIGNED_IN: Self = Self {
        installed: true,
        authenticated: true,
    };
}

/// An account the authenticated session can act on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub name: String,
}

/// A project that already exists in the account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteProject {
    pub name: String,
    /// Default `*.pages.dev` hostname, without scheme.
    pub subdomain: String,
}

impl RemoteProject {
    pub fn production_url(&self) -> String {
        format!("https://{}", self.subdomain)
    }
}

/// The single authoritative UI state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeploymentState {
    Checking,
    NotInstalled,
    NotAuthenticated,
    WrongAccount,
    NotLinked,
    Deploying,
    Connected,
}

/// Derive the state from raw signals. Pure and total.
pub fn derive_state(
    cli_status: Option<CliAuthStatus>,
    accounts: &[Account],
    linked: Option<&LinkedProject>,
    is_deploying: bool,
) -> DeploymentState {
    let Some(cli_status) = cli_status else {
        return DeploymentState::Checking;
    };
    if !cli_status.installed {
        return DeploymentState::NotInstalled;
    }
    if !cli_status.authenticated {
        return DeploymentState::NotAuthenticated;
    }
    if let Some(linked) = linked {
        if !accounts.is_empty() && !accounts.iter().any(|a| a.id == linked.account_id) {
            return DeploymentState::WrongAccount;
        }
    }
    if is_deploying {
        return DeploymentState::Deploying;
    }
    if linked.is_some() {
        DeploymentState::Connected
    } else {
        DeploymentState::NotLinked
    }
}

/// Something a presentation can offer the user in a given state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MenuAction {
    Install,
    Connect,
    SignIn,
    LinkProject,
    OpenProduction,
    OpenDashboard,
    DeployNow,
    EnableAutoDeploy,
    Disconnect,
    SignOut,
}

impl MenuAction {
    pub fn label(self) -> &'static str {
        match self {
            MenuAction::Install => "Install Wrangler",
            MenuAction::Connect => "Connect Cloudflare",
            MenuAction::SignIn => "Sign In",
            MenuAction::LinkProject => "Link Project",
            MenuAction::OpenProduction => "Open Production",
            MenuAction::OpenDashboard => "Dashboard",
            MenuAction::DeployNow => "Deploy Now",
            MenuAction::EnableAutoDeploy => "Enable Auto-Deploy",
            MenuAction::Disconnect => "Disconnect Project",
            MenuAction::SignOut => "Sign Out",
        }
    }
}

impl DeploymentState {
    /// Toolbar caption.
    pub fn label(self) -> &'static str {
        match self {
            DeploymentState::Checking => "Connecting...",
            DeploymentState::NotInstalled => "Install Wrangler",
            DeploymentState::NotAuthenticated => "Connect Cloudflare",
            DeploymentState::WrongAccount => "Wrong Account",
            DeploymentState::NotLinked => "Link Project",
            DeploymentState::Deploying => "Deploying...",
            DeploymentState::Connected => "Cloudflare Pages",
        }
    }

    /// Actions available in this state, in menu order.
    pub fn menu_actions(self) -> &'static [MenuAction] {
        match self {
            DeploymentState::Checking | DeploymentState::Deploying => &[],
            DeploymentState::NotInstalled => &[MenuAction::Install],
            DeploymentState::NotAuthenticated => &[MenuAction::Connect],
            DeploymentState::WrongAccount => &[
                MenuAction::SignIn,
                MenuAction::Disconnect,
                MenuAction::SignOut,
            ],
            DeploymentState::NotLinked => &[MenuAction::LinkProject],
            DeploymentState::Connected => &[
                MenuAction::OpenProduction,
                MenuAction::OpenDashboard,
                MenuAction::DeployNow,
                MenuAction::EnableAutoDeploy,
                MenuAction::Disconnect,
                MenuAction::SignOut,
            ],
        }
    }
}

impl std::fmt::Display for DeploymentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DeploymentState::Checking => "CHECKING",
            DeploymentState::NotInstalled => "NOT_INSTALLED",
            DeploymentState::NotAuthenticated => "NOT_AUTHENTICATED",
            DeploymentState::WrongAccount => "WRONG_ACCOUNT",
            DeploymentState::NotLinked => "NOT_LINKED",
            DeploymentState::Deploying => "DEPLOYING",
            DeploymentState::Connected => "CONNECTED",
        };
        f.write_str(name)
    }
}

/// Point-in-time copy of everything a presentation needs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusSnapshot {
    pub state: DeploymentState,
    pub cli_status: Option<CliAuthStatus>,
    pub accounts: Vec<Account>,
    pub linked: Option<LinkedProject>,
    pub has_git_remote: bool,
    pub installing: bool,
}

impl StatusSnapshot {
    /// The state to render, or `None` while linking is pointless because no git remote exists.
    pub fn visible_state(&self) -> Option<DeploymentState> {
        match self.state {
            DeploymentState::NotLinked if !self.has_git_remote => None,
            state => Some(state),
        }
    }

    pub fn find_account(&self, account_id: &str) -> Option<&Account> {
        self.accounts.iter().find(|a| a.id == account_id)
    }
}
