//! `jobsift config` -- display resolved configuration.
//!
//! ```text
//! jobsift config show
//! jobsift config show --config ./jobsift.json
//! ```

use jobsift_types::config::Config;

/// Print the resolved configuration as formatted JSON. The API key is
/// serialized as an empty string.
pub fn config_show(config: &Config) -> anyhow::Result<()> {
    println!("{}", render(config)?);
    Ok(())
}

fn render(config: &Config) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(config)?)
}
