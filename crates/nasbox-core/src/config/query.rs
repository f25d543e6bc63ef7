//! Default limits for listing queries.

use serde::{Deserialize, Serialize};

/// Limits applied when a caller does not ask for one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Default number of activity entries returned.
    #[serde(default = "default_limit")]
    pub activity_limit: u32,
    /// Default number of search hits returned.
    #[serde(default = "default_limit")]
    pub search_limit: u32,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            activity_limit: default_limit(),
            search_limit: default_limit(),
        }
    }
}

fn default_limit() -> u32 {
    50
}
