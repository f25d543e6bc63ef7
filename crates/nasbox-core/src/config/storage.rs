//! Storage configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Physical storage settings read once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding one subdirectory per owner.
    #[serde(default = "default_root_path")]
    pub root_path: String,
    /// Maximum upload size in bytes (default 10 GiB).
    #[serde(default = "default_max_upload")]
    pub max_upload_size_bytes: u64,
    /// Name of the staging directory for in-flight uploads, created
    /// directly under `root_path`.
    #[serde(default = "default_temp_dir_name")]
    pub temp_dir_name: String,
}

impl StorageConfig {
    /// The storage root as a path.
    pub fn root(&self) -> PathBuf {
        PathBuf::from(&self.root_path)
    }

    /// Absolute location of the upload staging directory.
    pub fn temp_dir(&self) -> PathBuf {
        self.root().join(&self.temp_dir_name)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root_path: default_root_path(),
            max_upload_size_bytes: default_max_upload(),
            temp_dir_name: default_temp_dir_name(),
        }
    }
}

fn default_root_path() -> String {
    "/data/storage".to_string()
}

fn default_max_upload() -> u64 {
    10_737_418_240 // 10 GiB
}

fn default_temp_dir_name() -> String {
    ".nasbox-tmp".to_string()
}
