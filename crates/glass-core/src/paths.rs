//! Standard paths used by glass tools

use std::path::PathBuf;

/// Standard glass paths
pub struct Paths {
    /// Data directory (~/.local/share/glass)
    pub data: PathBuf,
    /// Config directory (~/.config/glass)
    pub config: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Self::new()
    }
}

impl Paths {
    pub fn new() -> Self {
        let data = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join("glass");

        let config = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("glass");

        Self { data, config }
    }

    /// Main configuration file (routers, commands, settings)
    pub fn config_file(&self) -> PathBuf {
        self.config.join("glass.yaml")
    }

    /// Operator command log
    pub fn log_file(&self) -> PathBuf {
        self.data.join("glass.log")
    }

    /// Persistent key-value store
    pub fn storage_file(&self) -> PathBuf {
        self.data.join("storage.json")
    }
}
