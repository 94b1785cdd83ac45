//! CLI configuration: defaults, then a TOML file, then `GPAC_` environment variables

use std::path::Path;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use gpac_access_control::AccessControlConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct Config {
    /// Rule retrieval settings
    pub(crate) access_control: AccessControlConfig,
}

/// Load the configuration; a missing file leaves the defaults in place
///
/// Nested keys in the environment use `__`, e.g.
/// `GPAC_ACCESS_CONTROL__MAX_READ_CHUNK=64`.
pub(crate) fn load_config(path: &Path) -> eyre::Result<Config> {
    let config: Config = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("GPAC_").split("__"))
        .extract()?;

    config.access_control.validate()?;
    Ok(config)
}
