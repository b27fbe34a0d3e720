use std::collections::HashMap;

use avio_arena::Arena;
use avio_core::{DeviceId, Error, Result, Transport, WORD_BYTES};
use tracing::debug;

/// Word indices of the header that precedes an indexed ring's records.
pub mod table_header {
    /// Number of record slots.
    pub const CAPACITY: usize = 0;
    /// Index of the next slot the host will consume. Owned by the host.
    pub const CONSUMER: usize = 1;
    /// Record size in words.
    pub const RECORD_WORDS: usize = 2;
    pub const RESERVED: usize = 3;
    pub const WORDS: usize = 4;
    pub const BYTES: u32 = WORDS as u32 * 4;
}

/// Register offsets that anchor a linked ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkedRoot {
    /// First record; written once when the ring is built.
    pub start: u32,
    /// Most recently produced record; advanced by the device.
    pub producer: u32,
    /// Most recently consumed record; advanced by the host.
    pub consumer: u32,
}

/// Register offsets that anchor an indexed ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexedRoot {
    /// Holds the table offset.
    pub table: u32,
    /// Index of the next slot the device will write.
    pub producer: u32,
}

/// Consumer and producer positions as slot indices.
///
/// `next` is the slot of the next record to deliver; `end` is one past the newest produced
/// record. The ring is caught up when they are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Positions {
    pub next: usize,
    pub end: usize,
}

impl Positions {
    pub fn pending(&self, capacity: usize) -> usize {
        if self.end >= self.next {
            self.end - self.next
        } else {
            capacity - self.next + self.end
        }
    }
}

/// Geometry and position bookkeeping shared by both ring shapes.
pub trait Ring {
    fn capacity(&self) -> usize;

    fn record_words(&self) -> usize;

    fn slot_offset(&self, slot: usize) -> u32;

    /// Word index of the link field that must survive whole-record writes, if any.
    fn link_word(&self) -> Option<usize> {
        None
    }

    /// Reads the consumer position and a fresh producer position from the device.
    fn positions(&self, dev: &DeviceId, transport: &mut dyn Transport) -> Result<Positions>;

    /// Persists `next` as the consumer position.
    fn commit(&self, dev: &DeviceId, transport: &mut dyn Transport, next: usize) -> Result<()>;

    /// Number of physically contiguous slots starting at `slot`, capped at `limit` and at the
    /// end of the ring. Always at least 1 when `limit > 0`.
    fn contiguous_from(&self, slot: usize, limit: usize) -> usize {
        let record_bytes = self.record_words() as u32 * WORD_BYTES;
        let stop = (slot + limit).min(self.capacity());
        let mut n = 1;
        while slot + n < stop
            && self.slot_offset(slot + n) == self.slot_offset(slot + n - 1) + record_bytes
        {
            n += 1;
        }
        n.min(limit)
    }
}

/// A ring of individually allocated records chained by a next field.
///
/// The host keeps the slot offsets in ring order so rollover and physical contiguity are
/// known without following links on the device.
#[derive(Debug, Clone)]
pub struct LinkedRing {
    root: LinkedRoot,
    record_words: usize,
    next_word: usize,
    slots: Vec<u32>,
    index: HashMap<u32, usize>,
}

impl LinkedRing {
    pub(crate) fn new(
        root: LinkedRoot,
        record_words: usize,
        next_word: usize,
        slots: Vec<u32>,
    ) -> Self {
        let index = slots.iter().enumerate().map(|(i, &o)| (o, i)).collect();
        Self {
            root,
            record_words,
            next_word,
            slots,
            index,
        }
    }

    pub fn root(&self) -> LinkedRoot {
        self.root
    }

    pub fn next_word(&self) -> usize {
        self.next_word
    }

    pub fn record_bytes(&self) -> u32 {
        self.record_words as u32 * WORD_BYTES
    }

    pub fn first(&self) -> u32 {
        self.slots[0]
    }

    /// Record offsets in ring order.
    pub fn slots(&self) -> &[u32] {
        &self.slots
    }

    pub fn slot_of(&self, offset: u32) -> Result<usize> {
        self.index
            .get(&offset)
            .copied()
            .ok_or(Error::BadRingPosition { offset })
    }

    /// Zeroes the root registers and returns every record to the arena.
    pub fn release(&self, arena: &mut Arena, transport: &mut dyn Transport) -> Result<()> {
        let dev = *arena.device();
        for reg in [self.root.start, self.root.producer, self.root.consumer] {
            transport.write_u32(&dev, reg, 0)?;
        }
        for &slot in &self.slots {
            arena.free(slot, self.record_bytes())?;
        }
        debug!(%dev, first = self.first(), count = self.slots.len(), "linked ring released");
        Ok(())
    }
}

impl Ring for LinkedRing {
    fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn record_words(&self) -> usize {
        self.record_words
    }

    fn slot_offset(&self, slot: usize) -> u32 {
        self.slots[slot]
    }

    fn link_word(&self) -> Option<usize> {
        Some(self.next_word)
    }

    fn positions(&self, dev: &DeviceId, transport: &mut dyn Transport) -> Result<Positions> {
        let cap = self.capacity();
        let consumed = self.slot_of(transport.read_u32(dev, self.root.consumer)?)?;
        let produced = self.slot_of(transport.read_u32(dev, self.root.producer)?)?;
        Ok(Positions {
            next: (consumed + 1) % cap,
            end: (produced + 1) % cap,
        })
    }

    fn commit(&self, dev: &DeviceId, transport: &mut dyn Transport, next: usize) -> Result<()> {
        let cap = self.capacity();
        let last = self.slots[(next + cap - 1) % cap];
        transport.write_u32(dev, self.root.consumer, last)?;
        Ok(())
    }
}

/// A header plus a contiguous array of records in one allocation.
#[derive(Debug, Clone)]
pub struct IndexedRing {
    root: IndexedRoot,
    table: u32,
    capacity: usize,
    record_words: usize,
}

impl IndexedRing {
    pub(crate) fn new(root: IndexedRoot, table: u32, capacity: usize, record_words: usize) -> Self {
        Self {
            root,
            table,
            capacity,
            record_words,
        }
    }

    pub fn root(&self) -> IndexedRoot {
        self.root
    }

    pub fn table_offset(&self) -> u32 {
        self.table
    }

    /// Size of the whole allocation: header plus records.
    pub fn table_bytes(&self) -> u32 {
        table_header::BYTES + self.capacity as u32 * self.record_words as u32 * WORD_BYTES
    }

    fn header_offset(&self, word: usize) -> u32 {
        self.table + word as u32 * WORD_BYTES
    }

    fn check_index(&self, value: u32) -> Result<usize> {
        let index = value as usize;
        if index >= self.capacity {
            return Err(Error::BadRingPosition { offset: value });
        }
        Ok(index)
    }

    /// Zeroes the root registers and returns the table to the arena.
    pub fn release(&self, arena: &mut Arena, transport: &mut dyn Transport) -> Result<()> {
        let dev = *arena.device();
        transport.write_u32(&dev, self.root.table, 0)?;
        transport.write_u32(&dev, self.root.producer, 0)?;
        arena.free(self.table, self.table_bytes())?;
        debug!(%dev, table = self.table, capacity = self.capacity, "indexed ring released");
        Ok(())
    }
}

impl Ring for IndexedRing {
    fn capacity(&self) -> usize {
        self.capacity
    }

    fn record_words(&self) -> usize {
        self.record_words
    }

    fn slot_offset(&self, slot: usize) -> u32 {
        self.table + table_header::BYTES + slot as u32 * self.record_words as u32 * WORD_BYTES
    }

    fn positions(&self, dev: &DeviceId, transport: &mut dyn Transport) -> Result<Positions> {
        let next = self.check_index(
            transport.read_u32(dev, self.header_offset(table_header::CONSUMER))?,
        )?;
        let end = self.check_index(transport.read_u32(dev, self.root.producer)?)?;
        Ok(Positions { next, end })
    }

    fn commit(&self, dev: &DeviceId, transport: &mut dyn Transport, next: usize) -> Result<()> {
        transport.write_u32(dev, self.header_offset(table_header::CONSUMER), next as u32)?;
        Ok(())
    }

    /// Records of an indexed ring are always contiguous.
    fn contiguous_from(&self, slot: usize, limit: usize) -> usize {
        limit.min(self.capacity - slot)
    }
}
