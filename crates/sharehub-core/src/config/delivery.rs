//! Download and archive settings.

use serde::{Deserialize, Serialize};

/// Content delivery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// Hard ceiling on directory nesting walked by an archive download.
    #[serde(default = "default_max_depth")]
    pub max_traversal_depth: usize,
    /// Buffered archive chunks between the producer and the response body.
    #[serde(default = "default_channel_capacity")]
    pub archive_channel_capacity: usize,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            max_traversal_depth: default_max_depth(),
            archive_channel_capacity: default_channel_capacity(),
        }
    }
}

fn default_max_depth() -> usize {
    64
}

fn default_channel_capacity() -> usize {
    16
}
