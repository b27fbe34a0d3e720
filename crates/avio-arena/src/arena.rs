use core::fmt;

use avio_core::{DeviceId, Error, Result, Transport, WORD_BYTES};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

/// Round `size` up to a whole number of device words.
///
/// Returns `None` if rounding would overflow.
pub fn word_align(size: u32) -> Option<u32> {
    let add = WORD_BYTES - 1;
    size.checked_add(add).map(|v| v / WORD_BYTES * WORD_BYTES)
}

const ADDRESS_SPACE_END: u64 = 1 << 32;

/// A byte range `[start, start + size)` of a channel's address space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub start: u32,
    pub size: u32,
}

impl Region {
    pub const fn new(start: u32, size: u32) -> Self {
        Self { start, size }
    }

    pub fn end(&self) -> u64 {
        u64::from(self.start) + u64::from(self.size)
    }

    /// Whether the whole region lies inside the 32-bit device address space.
    pub fn is_addressable(&self) -> bool {
        self.end() <= ADDRESS_SPACE_END
    }

    pub fn contains_range(&self, start: u32, size: u32) -> bool {
        start >= self.start && u64::from(start) + u64::from(size) <= self.end()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreeBlock {
    pub start: u32,
    pub size: u32,
}

impl FreeBlock {
    pub fn end(&self) -> u64 {
        u64::from(self.start) + u64::from(self.size)
    }
}

/// First-fit allocator over one device's data-structure region.
///
/// Invariant: the free blocks plus every outstanding allocation cover the region exactly,
/// without overlap. `free` trusts its caller: the range must come from an earlier
/// `allocate` on this arena with the same size.
#[derive(Clone)]
pub struct Arena {
    dev: DeviceId,
    region: Region,
    free: Vec<FreeBlock>,
}

impl Arena {
    /// Creates an arena over `region`. Bytes past the end of the 32-bit address space are
    /// never handed out.
    pub fn new(dev: DeviceId, region: Region) -> Self {
        let usable = region.end().min(ADDRESS_SPACE_END) - u64::from(region.start);
        let mut free = Vec::new();
        if usable > 0 {
            free.push(FreeBlock {
                start: region.start,
                size: usable as u32,
            });
        }
        debug!(%dev, start = region.start, size = region.size, "arena created");
        Self { dev, region, free }
    }

    pub fn device(&self) -> &DeviceId {
        &self.dev
    }

    pub fn region(&self) -> Region {
        self.region
    }

    /// Free blocks sorted by start offset.
    pub fn free_blocks(&self) -> &[FreeBlock] {
        &self.free
    }

    /// Total free bytes.
    pub fn available(&self) -> u32 {
        self.free.iter().map(|b| b.size).sum()
    }

    pub fn in_use(&self) -> u32 {
        self.region.size - self.available()
    }

    pub fn largest_free_block(&self) -> u32 {
        self.free.iter().map(|b| b.size).max().unwrap_or(0)
    }

    /// Reserves `size` bytes (rounded up to whole words) without touching the device.
    pub fn reserve(&mut self, size: u32) -> Result<u32> {
        let size = checked_size(size)?;
        let Some(idx) = self.free.iter().position(|b| b.size >= size) else {
            return Err(Error::OutOfMemory {
                requested: size,
                available: self.available(),
            });
        };

        let block = &mut self.free[idx];
        let offset = block.start;
        if block.size == size {
            self.free.remove(idx);
        } else {
            block.start += size;
            block.size -= size;
        }
        Ok(offset)
    }

    /// Returns `[offset, offset + size)` to the free list and merges adjacent blocks.
    pub fn release(&mut self, offset: u32, size: u32) -> Result<()> {
        let size = checked_size(size)?;
        if !self.region.contains_range(offset, size) {
            return Err(Error::InvalidArgument("range lies outside the arena region"));
        }
        self.free.push(FreeBlock {
            start: offset,
            size,
        });
        self.coalesce();
        Ok(())
    }

    /// Allocates `size` bytes and clears them on the device.
    ///
    /// If clearing fails the reservation is returned to the free list before the transport
    /// error is propagated.
    pub fn allocate(&mut self, transport: &mut dyn Transport, size: u32) -> Result<u32> {
        let offset = self.reserve(size)?;
        let size = checked_size(size)?;
        if let Err(err) = transport.zero_words(&self.dev, offset, (size / WORD_BYTES) as usize) {
            self.release(offset, size)?;
            return Err(err.into());
        }
        trace!(dev = %self.dev, offset, size, available = self.available(), "arena allocate");
        Ok(offset)
    }

    pub fn free(&mut self, offset: u32, size: u32) -> Result<()> {
        self.release(offset, size)?;
        trace!(dev = %self.dev, offset, size, available = self.available(), "arena free");
        Ok(())
    }

    fn coalesce(&mut self) {
        self.free.sort_unstable_by_key(|b| b.start);

        let mut merged: Vec<FreeBlock> = Vec::with_capacity(self.free.len());
        for block in self.free.drain(..) {
            match merged.last_mut() {
                Some(last) if last.end() == u64::from(block.start) => last.size += block.size,
                Some(last) if last.end() > u64::from(block.start) => {
                    warn!(
                        dev = %self.dev,
                        start = block.start,
                        size = block.size,
                        "freed range overlaps a free block"
                    );
                    let end = last.end().max(block.end());
                    last.size = (end - u64::from(last.start)) as u32;
                }
                _ => merged.push(block),
            }
        }
        self.free = merged;
    }
}

fn checked_size(size: u32) -> Result<u32> {
    if size == 0 {
        return Err(Error::InvalidArgument("size must be non-zero"));
    }
    word_align(size).ok_or(Error::InvalidArgument("size overflows the address space"))
}

impl fmt::Debug for Arena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena")
            .field("dev", &self.dev)
            .field("region", &self.region)
            .field("available", &self.available())
            .field("free_blocks", &self.free.len())
            .finish()
    }
}
