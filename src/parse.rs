//! Output parsers for the Pages CLI.
//!
//! All functions here are total: malformed input yields an empty list or `None`, never an error.
//! The table scraper targets human-oriented output and is expected to be swapped if the CLI ever
//! grows a structured listing mode.

use crate::status::{Account, RemoteProject};
use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;

/// Hostname suffix of every Pages deployment.
pub const PAGES_DOMAIN_SUFFIX: &str = ".pages.dev";

#[derive(Deserialize)]
struct WhoamiResponse {
    accounts: Vec<serde_json::Value>,
}

/// Accounts from `whoami --json` output. Entries lacking a non-empty `id` or `name` are skipped.
pub fn parse_account_list(text: &str) -> Vec<Account> {
    let response: WhoamiResponse = match serde_json::from_str(text) {
        Ok(response) => response,
        Err(_) => return Vec::new(),
    };

    response
        .accounts
        .iter()
        .filter_map(|entry| {
            let id = non_empty_str(entry.get("id"))?;
            let name = non_empty_str(entry.get("name"))?;
            Some(Account {
                id: id.to_string(),
                name: name.to_string(),
            })
        })
        .collect()
}

fn non_empty_str(value: Option<&serde_json::Value>) -> Option<&str> {
    value
        .and_then(serde_json::Value::as_str)
        .filter(|s| !s.is_empty())
}

fn project_row_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"│\s*(.+?)\s*│\s*(\S+\.pages\.dev)\s*│").expect("valid project row pattern")
    })
}

fn deploy_url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"https://\S*\.pages\.dev").expect("valid deploy url pattern"))
}

fn hashed_url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^https://[^.]+\.(.+\.pages\.dev)").expect("valid hashed url pattern")
    })
}

/// Projects from the box-drawn `pages project list` table, in row order.
pub fn parse_project_list(text: &str) -> Vec<RemoteProject> {
    text.lines()
        .filter_map(|line| {
            let captures = project_row_pattern().captures(line)?;
            Some(RemoteProject {
                name: captures[1].trim().to_string(),
                subdomain: captures[2].trim().to_string(),
            })
        })
        .collect()
}

/// Stable production URL from deploy output.
///
/// Takes the first `https://…pages.dev` URL and drops its per-deploy hash label, so
/// `https://abcd1234.demo-site.pages.dev` becomes `https://demo-site.pages.dev`. A URL with no
/// hash label is returned as found.
pub fn extract_production_url(text: &str) -> Option<String> {
    let found = deploy_url_pattern().find(text)?.as_str();
    Some(match hashed_url_pattern().captures(found) {
        Some(captures) => format!("https://{}", &captures[1]),
        None => found.to_string(),
    })
}

/// DNS-label-safe project name: lowercase `[a-z0-9-]`, no leading, trailing or repeated hyphens.
pub fn sanitize_project_name(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars().flat_map(char::to_lowercase) {
        let c = if c.is_ascii_lowercase() || c.is_ascii_digit() {
            c
        } else {
            '-'
        };
        if c == '-' && (out.is_empty() || out.ends_with('-')) {
            continue;
        }
        out.push(c);
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}

/// Whether process output says the CLI (or its launcher) could not be found.
pub fn is_binary_missing(text: &str) -> bool {
    let lower = text.to_lowercase();
    ["not found", "enoent", "err_module"]
        .iter()
        .any(|needle| lower.contains(needle))
}

/// Whether a failed create reported that the project already exists.
pub fn is_already_exists(text: &str) -> bool {
    text.to_lowercase().contains("already exists")
}
