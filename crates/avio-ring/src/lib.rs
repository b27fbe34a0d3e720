//! Producer/consumer rings living in device arena memory.
//!
//! The device's protocol engine produces fixed-size records; the host consumes them. Two ring
//! shapes exist:
//!
//! - [`LinkedRing`]: records chained through an explicit "next" word, the last pointing back
//!   at the first. Positions are record offsets held in three root registers (start,
//!   producer, last consumed).
//! - [`IndexedRing`]: a header followed by a flat array of records. The producer index is a
//!   device register; the consumer index lives in the header.
//!
//! [`read_new`] is the single consumption protocol for both shapes. It reads in chunks sized
//! by a [`BatchPolicy`] and persists the consumer position after every chunk, so a failed
//! call never re-delivers records it already returned.

#![forbid(unsafe_code)]

mod builder;
mod descriptor;
mod reader;
mod record;

pub use builder::{
    build_indexed, build_linked, IndexedRingParams, LinkedRingParams, SlotTag, MIN_SLOTS,
};
pub use descriptor::{
    table_header, IndexedRing, IndexedRoot, LinkedRing, LinkedRoot, Positions, Ring,
};
pub use reader::{
    pending, read_new, read_slot, write_slot, BatchCeilings, BatchPolicy, TransferPath,
};
pub use record::{RawRecord, Record};
