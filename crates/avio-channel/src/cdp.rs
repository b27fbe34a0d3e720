//! Bus-monitor Capture Data Packet.

use avio_ring::Record;

/// Word indices within a CDP.
pub mod word {
    pub const NEXT: usize = 0;
    /// Identifier assigned by the host when the ring is built.
    pub const API_INFO: usize = 1;
    pub const TIME_HIGH: usize = 2;
    pub const TIME_LOW: usize = 3;
    pub const BLOCK_STATUS: usize = 4;
    pub const CMD1: usize = 5;
    pub const CMD2: usize = 6;
    pub const STS1: usize = 7;
    pub const STS2: usize = 8;
    pub const DATA: usize = 9;
    pub const DATA_WORDS: usize = 32;
    /// Inter-message gap in tenths of a microsecond.
    pub const GAP: usize = DATA + DATA_WORDS;
    pub const WORDS: usize = 44;
}

/// Marker or'ed into [`Cdp::api_info`] next to the slot index.
pub const CDP_MARKER: u32 = 0x8000_0000;

/// One captured MIL-STD-1553 message.
///
/// Command, status and data fields hold 16-bit bus words; the engine stores each in the low
/// half of a device word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cdp {
    pub next: u32,
    pub api_info: u32,
    /// Capture time in microseconds.
    pub timestamp: u64,
    pub block_status: u32,
    pub cmd1: u16,
    pub cmd2: u16,
    pub sts1: u16,
    pub sts2: u16,
    pub data: [u16; word::DATA_WORDS],
    pub gap: u32,
}

impl Default for Cdp {
    fn default() -> Self {
        Self {
            next: 0,
            api_info: 0,
            timestamp: 0,
            block_status: 0,
            cmd1: 0,
            cmd2: 0,
            sts1: 0,
            sts2: 0,
            data: [0; word::DATA_WORDS],
            gap: 0,
        }
    }
}

impl Cdp {
    /// Ring slot this CDP occupies, when it carries a slot tag.
    pub fn slot(&self) -> Option<usize> {
        (self.api_info & CDP_MARKER != 0).then(|| (self.api_info & !CDP_MARKER) as usize)
    }

    /// Remote terminal address from the first command word.
    pub fn rt_address(&self) -> u8 {
        (self.cmd1 >> 11) as u8
    }

    /// Data word count from the first command word; a field value of 0 means 32.
    pub fn word_count(&self) -> usize {
        match self.cmd1 & 0x1f {
            0 => 32,
            n => n as usize,
        }
    }
}

impl Record for Cdp {
    const WORDS: usize = word::WORDS;

    fn decode(words: &[u32]) -> Self {
        let mut data = [0u16; word::DATA_WORDS];
        for (dst, &src) in data.iter_mut().zip(&words[word::DATA..word::GAP]) {
            *dst = src as u16;
        }
        Self {
            next: words[word::NEXT],
            api_info: words[word::API_INFO],
            timestamp: (u64::from(words[word::TIME_HIGH]) << 32) | u64::from(words[word::TIME_LOW]),
            block_status: words[word::BLOCK_STATUS],
            cmd1: words[word::CMD1] as u16,
            cmd2: words[word::CMD2] as u16,
            sts1: words[word::STS1] as u16,
            sts2: words[word::STS2] as u16,
            data,
            gap: words[word::GAP],
        }
    }

    fn encode(&self, words: &mut [u32]) {
        words[..word::WORDS].fill(0);
        words[word::NEXT] = self.next;
        words[word::API_INFO] = self.api_info;
        words[word::TIME_HIGH] = (self.timestamp >> 32) as u32;
        words[word::TIME_LOW] = self.timestamp as u32;
        words[word::BLOCK_STATUS] = self.block_status;
        words[word::CMD1] = u32::from(self.cmd1);
        words[word::CMD2] = u32::from(self.cmd2);
        words[word::STS1] = u32::from(self.sts1);
        words[word::STS2] = u32::from(self.sts2);
        for (dst, &src) in words[word::DATA..word::GAP].iter_mut().zip(&self.data) {
            *dst = u32::from(src);
        }
        words[word::GAP] = self.gap;
    }
}
