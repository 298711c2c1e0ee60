//! Pagewright: Cloudflare Pages deployment orchestration
//!
//! Drives the `wrangler` CLI on a user's behalf: detects whether it is installed and signed in,
//! creates or links a Pages project, builds the workspace and deploys it. The deployment state is
//! derived from raw signals by a pure function so any front end can render it.

pub mod cli;
pub mod config;
pub mod detect;
pub mod error;
pub mod host;
pub mod logging;
pub mod machine;
pub mod parse;
pub mod process;
pub mod status;
pub mod store;
pub mod wrangler;
