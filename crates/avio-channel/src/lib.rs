//! Channel-level driver API for avionics bus interface boards.
//!
//! A [`Devices`] table owns one [`Channel`] per open device identity. Each channel owns an
//! arena in the board's data-structure memory and the rings built inside it:
//!
//! - the bus-monitor capture ring of [`Cdp`] records (MIL-STD-1553),
//! - per-channel receive tables and the multi-channel receive table of [`Rxp`] records
//!   (ARINC-429),
//! - the interrupt queue of [`IqEntry`] records, decoded into [`Interrupt`]s.
//!
//! Register offsets live in [`regs`]. With the `sim` feature, [`sim::Engine`] fills rings the
//! way the board's protocol engine does.
#![forbid(unsafe_code)]

pub mod cdp;
mod channel;
mod config;
mod devices;
pub mod iq;
pub mod regs;
pub mod rxp;
#[cfg(any(test, feature = "sim"))]
pub mod sim;

pub use cdp::{Cdp, CDP_MARKER};
pub use channel::Channel;
pub use config::ChannelConfig;
pub use devices::Devices;
pub use iq::{Interrupt, IqCause, IqEntry, NO_CONTROL_BLOCK};
pub use rxp::{Rxp, MCRX_MARKER, RXP_MARKER};
#[cfg(any(test, feature = "sim"))]
pub use sim::Engine;
