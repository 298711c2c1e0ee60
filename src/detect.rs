//! Build output directory detection.
//!
//! Manifest framework hints first, then on-disk candidates, then a fixed default. Every probe
//! failure falls through to the next step; detection never fails.

use crate::process::{ExecOptions, ProcessInvoker};
use crate::wrangler::WranglerCommands;
use std::time::Duration;
use tracing::debug;

/// Folder assumed when nothing else matches.
pub const DEFAULT_OUTPUT_DIR: &str = "dist";

/// Folders probed, in order, when the manifest names no known framework.
pub const CANDIDATE_OUTPUT_DIRS: &[&str] = &["dist", "build", "out", "public"];

/// Framework dependency name to conventional output folder, in priority order.
pub const FRAMEWORK_OUTPUT_DIRS: &[(&str, &str)] = &[
    ("next", "out"),
    ("nuxt", ".output/public"),
    ("vite", "dist"),
    ("astro", "dist"),
    ("svelte", "dist"),
    ("@sveltejs/kit", "dist"),
    ("react-scripts", "build"),
    ("gatsby", "public"),
];

/// Output folder for the first framework named in `manifest`, if any.
///
/// Matching is a case-insensitive substring search for the quoted dependency name, so
/// `"next"` matches but `"nextra"` does not.
pub fn framework_output_dir(manifest: &str) -> Option<&'static str> {
    let lower = manifest.to_lowercase();
    FRAMEWORK_OUTPUT_DIRS
        .iter()
        .find(|(name, _)| {
            lower.contains(&format!("\"{}\"", name)) || lower.contains(&format!("'{}'", name))
        })
        .map(|(_, dir)| *dir)
}

/// Guess the folder the build writes to.
pub async fn detect_output_directory(
    invoker: &dyn ProcessInvoker,
    commands: &WranglerCommands,
    timeout: Duration,
) -> String {
    let options = ExecOptions::with_timeout(timeout);

    match commands.read_manifest().run(invoker, &options).await {
        Ok(output) if output.success() => {
            if let Some(dir) = framework_output_dir(&output.stdout) {
                debug!(dir, "Output directory from manifest");
                return dir.to_string();
            }
        }
        Ok(output) => debug!(exit_code = output.exit_code, "Manifest unreadable"),
        Err(e) => debug!(error = %e, "Manifest probe failed"),
    }

    for dir in CANDIDATE_OUTPUT_DIRS {
        match commands.dir_exists(dir).run(invoker, &options).await {
            Ok(output) if output.success() => {
                debug!(dir, "Output directory found on disk");
                return dir.to_string();
            }
            Ok(_) => {}
            Err(e) => debug!(dir, error = %e, "Directory probe failed"),
        }
    }

    DEFAULT_OUTPUT_DIR.to_string()
}

/// Hint shown when the build finished but the output folder is absent.
pub fn output_dir_hint(dir: &str) -> String {
    if dir == "out" {
        "Check your framework's output settings. For Next.js, add `output: 'export'` to next.config."
            .to_string()
    } else {
        "Check your framework's output settings.".to_string()
    }
}
