use std::env;
use std::path::PathBuf;

use crate::errors::JournalError;

/// Names the directory records are kept in.
pub const DATA_DIR_VARIABLE: &str = "JOURNAL_DATA_DIR";

const DEFAULT_DATA_DIR: &str = "data";

/// Returns the value of the named environment variable if it exists
/// and isn't blank.
pub fn get_optional_variable(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Settings read from the environment.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub data_dir: PathBuf,
}

impl Config {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Reads the configuration, falling back to `./data` for the data
    /// directory.
    pub fn from_env() -> Result<Self, JournalError> {
        let data_dir = get_optional_variable(DATA_DIR_VARIABLE)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));

        if data_dir.is_file() {
            return Err(JournalError::Configuration {
                name: DATA_DIR_VARIABLE.to_owned(),
                reason: format!("{} is a file", data_dir.display()),
            });
        }

        Ok(Self::new(data_dir))
    }
}
