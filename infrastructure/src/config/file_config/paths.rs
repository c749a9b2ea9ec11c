//! Filesystem locations from TOML (`[storage]`, `[logging]`, `[templates]`)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileStorageConfig {
    /// Directory for candidates, selections, outcomes and the ranking model.
    /// Defaults to the platform data directory.
    pub data_dir: Option<PathBuf>,
}

impl FileStorageConfig {
    pub fn resolve_data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("prompt-alchemy")
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    /// JSONL file for observability events; disabled when unset
    pub events_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileTemplatesConfig {
    /// Directory with `<phase-id>.tmpl` overrides
    pub dir: Option<PathBuf>,
}
