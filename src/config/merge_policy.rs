//! Merge rules: defaults applied before any file or environment source.

use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("storage.link_file", ".pagewright/link.json")?
        .set_default("poll.git_remote_interval_ms", 5000)?
        .set_default("logging.level", "info")
}
