//! Host-side driver core for MIL-STD-1553 and ARINC-429 bus interface boards.
//!
//! The member crates split the work:
//!
//! - [`avio_core`]: device identities, the [`Transport`] collaborator, errors
//! - [`avio_arena`]: the per-device first-fit allocator and the arena layout table
//! - [`avio_ring`]: ring construction and the generic chunked ring reader
//! - [`avio_channel`]: channels, record types, interrupt decoding and the [`Devices`] table
//!
//! Most callers only need [`Devices`] plus a [`Transport`] implementation for their board.
#![forbid(unsafe_code)]

pub use avio_arena as arena;
pub use avio_channel as channel;
pub use avio_ring as ring;

pub use avio_arena::{Arena, LayoutEntry, LayoutTable, Region};
pub use avio_channel::{
    Cdp, Channel, ChannelConfig, Devices, Interrupt, IqCause, IqEntry, Rxp, NO_CONTROL_BLOCK,
};
pub use avio_core::{
    Backplane, BoardModel, ChannelKind, DeviceId, Error, MemTransport, Result, TransferMode,
    Transport, TransportError, TransportKind, WORD_BYTES,
};
pub use avio_ring::{BatchCeilings, BatchPolicy, TransferPath};
