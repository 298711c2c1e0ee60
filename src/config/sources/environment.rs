//! Environment source: PAGEWRIGHT__SECTION__KEY overrides (e.g. PAGEWRIGHT__TIMEOUTS__BUILD=600).
//!
//! Argument lists are space separated: PAGEWRIGHT__BUILD__ARGS="run build:prod".

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::Environment;

/// Keys whose values split into lists; every other key stays a scalar even with spaces.
const LIST_KEYS: [&str; 2] = ["cli.args", "build.args"];

pub fn add_to_builder(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    builder.add_source(environment())
}

fn environment() -> Environment {
    LIST_KEYS.iter().fold(
        Environment::with_prefix("PAGEWRIGHT")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true)
            .list_separator(" "),
        |env, key| env.with_list_parse_key(key),
    )
}
