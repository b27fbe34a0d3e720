//! ARINC-429 receive-parameter record.

use avio_ring::Record;

pub mod word {
    pub const CONTROL: usize = 0;
    pub const API_INFO: usize = 1;
    pub const TIME_HIGH: usize = 2;
    pub const TIME_LOW: usize = 3;
    /// The received 32-bit ARINC-429 word.
    pub const DATA: usize = 4;
    /// Receive channel the word arrived on (multi-channel table only).
    pub const CHANNEL: usize = 5;
    pub const WORDS: usize = 8;
}

/// Slot marker for per-channel receive tables.
pub const RXP_MARKER: u32 = 0x4000_0000;
/// Slot marker for the multi-channel receive table.
pub const MCRX_MARKER: u32 = 0x2000_0000;

/// Control word bit set by the engine when a record was overwritten before the host read it.
pub const CONTROL_OVERRUN: u32 = 1 << 0;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Rxp {
    pub control: u32,
    pub api_info: u32,
    pub timestamp: u64,
    pub data: u32,
    pub channel: u32,
}

impl Rxp {
    /// ARINC-429 label (bits 1-8 of the word).
    pub fn label(&self) -> u8 {
        self.data as u8
    }

    /// Source/destination identifier (bits 9-10).
    pub fn sdi(&self) -> u8 {
        ((self.data >> 8) & 0x3) as u8
    }

    pub fn overrun(&self) -> bool {
        self.control & CONTROL_OVERRUN != 0
    }
}

impl Record for Rxp {
    const WORDS: usize = word::WORDS;

    fn decode(words: &[u32]) -> Self {
        Self {
            control: words[word::CONTROL],
            api_info: words[word::API_INFO],
            timestamp: (u64::from(words[word::TIME_HIGH]) << 32) | u64::from(words[word::TIME_LOW]),
            data: words[word::DATA],
            channel: words[word::CHANNEL],
        }
    }

    fn encode(&self, words: &mut [u32]) {
        words[..word::WORDS].fill(0);
        words[word::CONTROL] = self.control;
        words[word::API_INFO] = self.api_info;
        words[word::TIME_HIGH] = (self.timestamp >> 32) as u32;
        words[word::TIME_LOW] = self.timestamp as u32;
        words[word::DATA] = self.data;
        words[word::CHANNEL] = self.channel;
    }
}
