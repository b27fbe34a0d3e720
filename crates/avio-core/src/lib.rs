//! Shared building blocks for the avio host-side driver core.
//!
//! - [`DeviceId`]: the composite identity every piece of per-device state is keyed by
//! - [`Transport`]: the word-granular device access collaborator (register, block, DMA)
//! - [`DeviceTable`]: identity-keyed container used for arenas and channels
//! - [`Error`]: the error taxonomy shared by the allocator and ring layers
//! - [`MemTransport`]: an in-memory device model used for host-side tests and bring-up

#![forbid(unsafe_code)]

mod error;
mod id;
mod mem;
mod table;
mod transport;

pub use error::{Error, Result, TransportError};
pub use id::{Backplane, BoardModel, ChannelKind, DeviceId};
pub use mem::{MemTransport, TransportStats};
pub use table::DeviceTable;
pub use transport::{TransferMode, Transport, TransportKind, WORD_BYTES};
