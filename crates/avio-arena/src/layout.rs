use avio_core::{BoardModel, ChannelKind};
use serde::{Deserialize, Serialize};

use crate::Region;

/// Where the arena of one `(board model, channel kind)` combination lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutEntry {
    pub board: BoardModel,
    pub channel: ChannelKind,
    pub region: Region,
}

/// Static arena region table keyed by board model and channel kind.
///
/// The built-in table covers the boards this crate knows about; integrators with other
/// boards load a JSON table:
///
/// ```json
/// [{ "board": 4660, "channel": "mil1553", "region": { "start": 65536, "size": 131072 } }]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayoutTable {
    entries: Vec<LayoutEntry>,
}

const fn entry(board: BoardModel, channel: ChannelKind, start: u32, size: u32) -> LayoutEntry {
    LayoutEntry {
        board,
        channel,
        region: Region::new(start, size),
    }
}

const BUILTIN: &[LayoutEntry] = &[
    entry(BoardModel::PCIE_1553, ChannelKind::Mil1553, 0x0001_0000, 0x0007_0000),
    entry(BoardModel::USB_1553, ChannelKind::Mil1553, 0x0000_8000, 0x0001_8000),
    entry(BoardModel::PMC_MULTI, ChannelKind::Mil1553, 0x0001_0000, 0x0003_0000),
    entry(BoardModel::PMC_MULTI, ChannelKind::Arinc429, 0x0000_4000, 0x0000_c000),
    entry(BoardModel::PCIE_A429, ChannelKind::Arinc429, 0x0000_8000, 0x0003_8000),
    entry(BoardModel::ENET_MULTI, ChannelKind::Mil1553, 0x0001_0000, 0x0003_0000),
    entry(BoardModel::ENET_MULTI, ChannelKind::Arinc429, 0x0000_8000, 0x0001_8000),
];

impl Default for LayoutTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl LayoutTable {
    pub fn builtin() -> Self {
        Self {
            entries: BUILTIN.to_vec(),
        }
    }

    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Adds `entry`, replacing any existing entry for the same board model and channel kind.
    pub fn insert(&mut self, entry: LayoutEntry) {
        self.entries
            .retain(|e| !(e.board == entry.board && e.channel == entry.channel));
        self.entries.push(entry);
    }

    /// Overlays every entry of `other` on top of this table.
    pub fn merge(&mut self, other: LayoutTable) {
        for entry in other.entries {
            self.insert(entry);
        }
    }

    pub fn lookup(&self, board: BoardModel, channel: ChannelKind) -> Option<Region> {
        self.entries
            .iter()
            .find(|e| e.board == board && e.channel == channel)
            .map(|e| e.region)
    }

    pub fn entries(&self) -> &[LayoutEntry] {
        &self.entries
    }
}
