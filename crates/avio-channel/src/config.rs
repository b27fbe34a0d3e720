use avio_ring::BatchCeilings;
use serde::{Deserialize, Serialize};

/// Per-channel tuning. Missing fields in a serialized config take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Chunk sizes for bus-monitor capture reads.
    pub capture: BatchCeilings,
    /// Chunk sizes for receive-table reads.
    pub receive: BatchCeilings,
    /// Receive tables larger than this are built without per-slot tags.
    pub indexed_tag_threshold: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            capture: BatchCeilings::CAPTURE,
            receive: BatchCeilings::RECEIVE,
            indexed_tag_threshold: 256,
        }
    }
}

impl ChannelConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn capture_ceilings(mut self, ceilings: BatchCeilings) -> Self {
        self.capture = ceilings;
        self
    }

    pub fn receive_ceilings(mut self, ceilings: BatchCeilings) -> Self {
        self.receive = ceilings;
        self
    }

    pub fn indexed_tag_threshold(mut self, threshold: usize) -> Self {
        self.indexed_tag_threshold = threshold;
        self
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
