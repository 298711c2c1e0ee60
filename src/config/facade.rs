//! Config facade: single entry point for loading the merged configuration.

use super::{merge_policy, sources, PagewrightConfig};
use config::ConfigError;
use std::path::Path;
use tracing::debug;

/// Loads [`PagewrightConfig`] from every configured source.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for a workspace.
    ///
    /// Precedence (lowest to highest): defaults, user config file,
    /// `.pagewright/config.toml`, `.pagewright/{PAGEWRIGHT_ENV}.toml`, `PAGEWRIGHT__*` env vars.
    pub fn load(workspace_root: &Path) -> Result<PagewrightConfig, ConfigError> {
        let builder = merge_policy::builder_with_defaults()?;
        let builder = sources::global_file::add_to_builder(builder)?;
        let builder = sources::workspace_file::add_to_builder(builder, workspace_root)?;
        let builder = sources::environment::add_to_builder(builder);

        let config: PagewrightConfig = builder.build()?.try_deserialize()?;
        debug!(workspace = %workspace_root.display(), "Configuration loaded");
        Ok(config)
    }

    /// Load configuration from one explicit file (plus defaults and env overrides).
    pub fn load_from_file(path: &Path) -> Result<PagewrightConfig, ConfigError> {
        let path_str = path.to_str().ok_or_else(|| {
            ConfigError::Message(format!("Config path is not valid UTF-8: {:?}", path))
        })?;
        let builder = merge_policy::builder_with_defaults()?
            .add_source(config::File::with_name(path_str).required(true));
        let builder = sources::environment::add_to_builder(builder);

        builder.build()?.try_deserialize()
    }
}
