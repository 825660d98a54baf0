use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;

/// What to do when a symbol name is defined a second time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Redefinition {
    /// Keep the first definition and warn.
    #[default]
    Warn,
    /// Refuse to assemble.
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Address of the first word of the image.
    pub base_address: u16,
    /// Report link errors and keep going instead of stopping at the first one.
    pub keep_going: bool,
    pub verbose: bool,
    pub redefinition: Redefinition,
    /// Emit a leading `set pc, <entry>` jump.
    pub entry: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to open config file: {0}")]
    Open(String, #[source] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(String, #[source] serde_yaml::Error),
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let file = File::open(path).map_err(|e| ConfigError::Open(path.to_string(), e))?;
        serde_yaml::from_reader(BufReader::new(file))
            .map_err(|e| ConfigError::Parse(path.to_string(), e))
    }
}
