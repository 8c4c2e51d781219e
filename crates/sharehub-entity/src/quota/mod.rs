//! Storage quota value object.

use serde::{Deserialize, Serialize};

/// A user's allowance and usage snapshot.
///
/// `total == 0` means unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuotaInfo {
    /// Allowance in bytes.
    pub total: i64,
    /// Sum of owned file sizes.
    pub used: i64,
    /// `max(total - used, 0)`.
    pub available: i64,
    /// `used / total * 100`, or `0` when unlimited.
    pub percentage: f64,
}

impl QuotaInfo {
    /// Derive a snapshot from an allowance and current usage.
    pub fn new(total: i64, used: i64) -> Self {
        let available = (total - used).max(0);
        let percentage = if total == 0 {
            0.0
        } else {
            (used as f64 / total as f64) * 100.0
        };
        Self {
            total,
            used,
            available,
            percentage,
        }
    }

    /// Whether the allowance is unlimited.
    pub fn is_unlimited(&self) -> bool {
        self.total == 0
    }

    /// Whether an additional `size` bytes fit.
    pub fn fits(&self, size: i64) -> bool {
        self.is_unlimited() || size <= self.available
    }
}
