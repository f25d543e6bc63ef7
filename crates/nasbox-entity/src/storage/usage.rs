//! Disk usage report.

use serde::{Deserialize, Serialize};

/// Host filesystem capacity, explicitly distinguishing "unknown".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Capacity {
    /// Figures reported by the host filesystem.
    Known {
        /// Total size of the filesystem in bytes.
        total_bytes: u64,
        /// Bytes available to unprivileged writers.
        free_bytes: u64,
    },
    /// The platform could not report capacity.
    Unknown,
}

/// Usage of one scope (an owner root or the whole storage root).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskUsage {
    /// Sum of file sizes under the scope.
    pub used_bytes: u64,
    /// Capacity of the filesystem holding the scope.
    pub capacity: Capacity,
}

impl DiskUsage {
    /// Total capacity, when known.
    pub fn total_bytes(&self) -> Option<u64> {
        match self.capacity {
            Capacity::Known { total_bytes, .. } => Some(total_bytes),
            Capacity::Unknown => None,
        }
    }

    /// Free bytes, when known.
    pub fn free_bytes(&self) -> Option<u64> {
        match self.capacity {
            Capacity::Known { free_bytes, .. } => Some(free_bytes),
            Capacity::Unknown => None,
        }
    }

    /// Percentage of total capacity consumed by this scope, when known.
    pub fn used_percent(&self) -> Option<f64> {
        self.total_bytes()
            .filter(|total| *total > 0)
            .map(|total| self.used_bytes as f64 / total as f64 * 100.0)
    }
}
