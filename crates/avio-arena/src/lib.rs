//! Device data-structure memory management.
//!
//! Every channel owns a fixed region of its board's memory for software-defined structures
//! (capture rings, receive tables, interrupt queues). [`Arena`] hands out and reclaims pieces
//! of that region with a first-fit free list; [`LayoutTable`] says where the region lives for
//! each board model and channel kind.

#![forbid(unsafe_code)]

mod arena;
mod layout;

pub use arena::{word_align, Arena, FreeBlock, Region};
pub use layout::{LayoutEntry, LayoutTable};
