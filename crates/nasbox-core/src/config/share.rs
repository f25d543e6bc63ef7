//! Share link configuration.

use serde::{Deserialize, Serialize};

/// Lowest accepted token length in bytes (128 bits).
pub const MIN_TOKEN_BYTES: usize = 16;

/// Share token settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareConfig {
    /// Random bytes per token before hex encoding.
    #[serde(default = "default_token_bytes")]
    pub token_bytes: usize,
}

impl Default for ShareConfig {
    fn default() -> Self {
        Self {
            token_bytes: default_token_bytes(),
        }
    }
}

fn default_token_bytes() -> usize {
    32
}
