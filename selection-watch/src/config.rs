use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde_derive::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Which display, selection and format to watch.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct WatchConfig {
    /// X display name, e.g. `:0`. `None` uses `$DISPLAY`.
    pub display: Option<String>,
    /// Name of the selection atom.
    pub selection: String,
    /// Name of the target format atom the owner is asked to convert into.
    pub target: String,
}

impl Default for WatchConfig {
    fn default() -> Self {
        WatchConfig {
            display: None,
            selection: "CLIPBOARD".to_owned(),
            target: "TEXT".to_owned(),
        }
    }
}

impl WatchConfig {
    /// Load a TOML config file. A missing file is not an error and yields `None`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Option<WatchConfig>, ConfigError> {
        let config = match fs::read_to_string(path) {
            Ok(config) => config,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        Ok(Some(toml::from_str(&config)?))
    }
}
