use thiserror::Error;

use crate::DeviceId;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures reported by a [`crate::Transport`] implementation.
///
/// This layer never retries these; they are surfaced to callers wrapped in
/// [`Error::Transport`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("device access out of range: offset=0x{offset:x} words={words} size=0x{size:x}")]
    OutOfRange { offset: u32, words: usize, size: u32 },

    #[error("device access at 0x{offset:x} is not word aligned")]
    Unaligned { offset: u32 },

    #[error("device is disconnected")]
    Disconnected,

    /// Catch-all for backend failures that do not map to a structured variant.
    #[error("io error: {0}")]
    Io(String),
}

/// Error taxonomy shared by the arena allocator and the ring layers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("device {0} has not been initialized")]
    NotInitialized(DeviceId),

    #[error("out of device memory: requested {requested} bytes, {available} available")]
    OutOfMemory { requested: u32, available: u32 },

    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// The ring holds nothing beyond the consumer position.
    ///
    /// Pollers treat this as "try again later", not as a failure.
    #[error("no new entry")]
    NoNewEntry,

    /// A position register names an offset that is not a record of the ring.
    #[error("ring position 0x{offset:x} is not a record of this ring")]
    BadRingPosition { offset: u32 },

    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),
}

impl Error {
    pub fn is_no_new_entry(&self) -> bool {
        matches!(self, Error::NoNewEntry)
    }
}
