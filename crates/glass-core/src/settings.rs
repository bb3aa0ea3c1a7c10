//! Process-wide settings
//!
//! Settings are loaded once at startup and handed to every router, so nothing
//! in the dispatch path reads ambient global state.

use crate::paths::Paths;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Global looking-glass settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Prefix every dispatch result with a diagnostic trace
    #[serde(default)]
    pub debug: bool,

    /// Operator command log
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,

    /// Persistent key-value store
    #[serde(default = "default_storage_file")]
    pub storage_file: PathBuf,

    /// User-facing message strings
    #[serde(default)]
    pub messages: Messages,
}

fn default_log_file() -> PathBuf {
    Paths::new().log_file()
}

fn default_storage_file() -> PathBuf {
    Paths::new().storage_file()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug: false,
            log_file: default_log_file(),
            storage_file: default_storage_file(),
            messages: Messages::default(),
        }
    }
}

/// Strings shown to untrusted callers when a dispatch is rejected
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Messages {
    /// Leading text of every error payload
    #[serde(default = "default_error_commandrun")]
    pub error_commandrun: String,

    /// Detail shown when parameters fail validation
    #[serde(default = "default_bad_params")]
    pub bad_params: String,

    /// Detail shown when the backend could not run the command
    #[serde(default = "default_backend_failure")]
    pub backend_failure: String,
}

fn default_error_commandrun() -> String {
    "Error while running command".to_string()
}

fn default_bad_params() -> String {
    "Bad parameters".to_string()
}

fn default_backend_failure() -> String {
    "Backend is not available".to_string()
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            error_commandrun: default_error_commandrun(),
            bad_params: default_bad_params(),
            backend_failure: default_backend_failure(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_gives_defaults() {
        let settings: Settings = serde_yaml::from_str("{}").unwrap();
        assert!(!settings.debug);
        assert_eq!(settings.messages, Messages::default());
        assert_eq!(settings.storage_file, Paths::new().storage_file());
    }

    #[test]
    fn test_partial_document_keeps_other_defaults() {
        let settings: Settings =
            serde_yaml::from_str("debug: true\nmessages:\n  bad_params: Nope\n").unwrap();
        assert!(settings.debug);
        assert_eq!(settings.messages.bad_params, "Nope");
        assert_eq!(settings.messages.error_commandrun, "Error while running command");
    }

    #[test]
    fn test_paths_survive_serialization() {
        let settings = Settings {
            debug: true,
            log_file: PathBuf::from("/var/log/glass.log"),
            ..Settings::default()
        };

        let yaml = serde_yaml::to_string(&settings).unwrap();
        let loaded: Settings = serde_yaml::from_str(&yaml).unwrap();
        assert!(loaded.debug);
        assert_eq!(loaded.log_file, PathBuf::from("/var/log/glass.log"));
    }
}
