//! Channel register offsets.
//!
//! Every offset is a byte offset into the channel's address space. The registers sit below
//! the arena region of every supported board, so ring memory never aliases them.

use avio_ring::{IndexedRoot, LinkedRoot};

/// Bus-monitor capture ring (MIL-STD-1553 only).
pub mod monitor {
    /// First CDP; written when the ring is built.
    pub const START: u32 = 0x200;
    /// Most recent CDP written by the engine.
    pub const PRODUCER: u32 = 0x204;
    /// Most recent CDP consumed by the host.
    pub const CONSUMER: u32 = 0x208;
}

/// Interrupt queue.
pub mod interrupt_queue {
    pub const START: u32 = 0x210;
    pub const PRODUCER: u32 = 0x214;
    pub const CONSUMER: u32 = 0x218;
}

/// Multi-channel receive table (ARINC-429 only): one table shared by every receive channel.
pub mod mcrx {
    pub const TABLE: u32 = 0x300;
    pub const PRODUCER: u32 = 0x304;
}

/// Per-channel receive tables (ARINC-429 only).
pub mod rx {
    pub const BASE: u32 = 0x400;
    /// Register block stride per receive channel.
    pub const STRIDE: u32 = 0x10;
    pub const TABLE: u32 = 0x0;
    pub const PRODUCER: u32 = 0x4;
    pub const CHANNELS: usize = 16;

    pub const fn table(channel: usize) -> u32 {
        BASE + channel as u32 * STRIDE + TABLE
    }

    pub const fn producer(channel: usize) -> u32 {
        BASE + channel as u32 * STRIDE + PRODUCER
    }
}

pub const MONITOR_ROOT: LinkedRoot = LinkedRoot {
    start: monitor::START,
    producer: monitor::PRODUCER,
    consumer: monitor::CONSUMER,
};

pub const INTERRUPT_ROOT: LinkedRoot = LinkedRoot {
    start: interrupt_queue::START,
    producer: interrupt_queue::PRODUCER,
    consumer: interrupt_queue::CONSUMER,
};

pub const MCRX_ROOT: IndexedRoot = IndexedRoot {
    table: mcrx::TABLE,
    producer: mcrx::PRODUCER,
};

/// Root registers of receive channel `channel`; `channel` must be below [`rx::CHANNELS`].
pub const fn rx_root(channel: usize) -> IndexedRoot {
    IndexedRoot {
        table: rx::table(channel),
        producer: rx::producer(channel),
    }
}
