//! Host action capabilities consumed by the deployment machine.
//!
//! The machine never prints, opens browsers or touches the terminal directly; it asks its host.
//! [`ConsoleHost`] is the terminal rendition used by the `pagewright` binary.

use crate::process::{ExecOptions, Invocation, ProcessInvoker};
use async_trait::async_trait;
use owo_colors::OwoColorize;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Notice severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Info,
    Warning,
    Error,
}

/// A transient, one-shot user-facing message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub severity: Severity,
    pub message: String,
}

impl Notice {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(Severity::Success, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Severity::Info, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }
}

/// What the embedding application lets the machine do on its behalf.
#[async_trait]
pub trait HostActions: Send + Sync {
    async fn show_notice(&self, notice: Notice);

    async fn open_url(&self, url: &str);

    /// Ask the host to re-read branch and remote information.
    async fn refresh_vcs_status(&self);

    async fn focus_terminal(&self);
}

/// Platform URL opener.
pub fn opener_invocation(url: &str) -> Invocation {
    if cfg!(target_os = "macos") {
        Invocation::new("open", [url])
    } else if cfg!(target_os = "windows") {
        Invocation::new("cmd", ["/C", "start", "", url])
    } else {
        Invocation::new("xdg-open", [url])
    }
}

/// Prefix used when printing a notice of the given severity.
pub fn severity_marker(severity: Severity) -> String {
    match severity {
        Severity::Success => format!("{}", "✓".green().bold()),
        Severity::Info => format!("{}", "i".blue().bold()),
        Severity::Warning => format!("{}", "!".yellow().bold()),
        Severity::Error => format!("{}", "✗".red().bold()),
    }
}

/// Terminal host: notices go to stderr, URLs open through the platform opener.
pub struct ConsoleHost {
    invoker: Arc<dyn ProcessInvoker>,
    color: bool,
    show_errors: bool,
}

impl ConsoleHost {
    pub fn new(invoker: Arc<dyn ProcessInvoker>) -> Self {
        Self {
            invoker,
            color: true,
            show_errors: true,
        }
    }

    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    /// Skip error notices when the caller prints the returned error itself.
    pub fn with_error_notices(mut self, show: bool) -> Self {
        self.show_errors = show;
        self
    }

    fn format_notice(&self, notice: &Notice) -> String {
        if self.color {
            format!("{} {}", severity_marker(notice.severity), notice.message)
        } else {
            let tag = match notice.severity {
                Severity::Success => "ok",
                Severity::Info => "info",
                Severity::Warning => "warning",
                Severity::Error => "error",
            };
            format!("[{}] {}", tag, notice.message)
        }
    }
}

#[async_trait]
impl HostActions for ConsoleHost {
    async fn show_notice(&self, notice: Notice) {
        if notice.severity == Severity::Error && !self.show_errors {
            debug!(message = %notice.message, "Error notice left to caller");
            return;
        }
        eprintln!("{}", self.format_notice(&notice));
    }

    async fn open_url(&self, url: &str) {
        let invocation = opener_invocation(url);
        let options = ExecOptions::with_timeout(Duration::from_secs(10));
        match invocation.run(self.invoker.as_ref(), &options).await {
            Ok(output) if output.success() => debug!(url, "Opened URL"),
            Ok(output) => {
                warn!(url, detail = %output.failure_detail(), "URL opener failed");
                eprintln!("Open {} in your browser.", url);
            }
            Err(e) => {
                warn!(url, error = %e, "URL opener unavailable");
                eprintln!("Open {} in your browser.", url);
            }
        }
    }

    async fn refresh_vcs_status(&self) {
        let invocation = Invocation::new("git", ["status", "--short", "--branch"]);
        let options = ExecOptions::with_timeout(Duration::from_secs(10));
        match invocation.run(self.invoker.as_ref(), &options).await {
            Ok(output) if output.success() => {
                if let Some(branch) = output.stdout.lines().next() {
                    eprintln!("{}", branch.trim_start_matches("## ").dimmed());
                }
            }
            Ok(output) => debug!(detail = %output.failure_detail(), "git status failed"),
            Err(e) => debug!(error = %e, "git status unavailable"),
        }
    }

    async fn focus_terminal(&self) {
        // Output already lands in this terminal.
        debug!("Terminal focus requested");
    }
}
