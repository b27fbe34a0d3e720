use avio_arena::Arena;
use avio_core::{Error, Result, Transport, WORD_BYTES};
use tracing::debug;

use crate::descriptor::{table_header, IndexedRing, IndexedRoot, LinkedRing, LinkedRoot, Ring};

/// Per-slot identifier written at build time: `slot index | marker`.
///
/// Lets a record read back out of a ring be correlated with the slot it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotTag {
    pub word: usize,
    pub marker: u32,
}

impl SlotTag {
    pub fn value(&self, slot: usize) -> u32 {
        slot as u32 | self.marker
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LinkedRingParams {
    pub root: LinkedRoot,
    pub record_words: usize,
    /// Word index of the "next record" link.
    pub next_word: usize,
    pub tag: Option<SlotTag>,
}

#[derive(Debug, Clone, Copy)]
pub struct IndexedRingParams {
    pub root: IndexedRoot,
    pub record_words: usize,
    pub tag: Option<SlotTag>,
    /// Slots are only tagged when the ring has at most this many records.
    pub tag_threshold: usize,
}

/// Smallest ring that can hold a pending record.
pub const MIN_SLOTS: usize = 2;

fn record_bytes(record_words: usize) -> Result<u32> {
    u32::try_from(record_words)
        .ok()
        .and_then(|w| w.checked_mul(WORD_BYTES))
        .filter(|&b| b > 0)
        .ok_or(Error::InvalidArgument("record size must be non-zero and fit the address space"))
}

fn check_tag(tag: Option<SlotTag>, record_words: usize) -> Result<()> {
    match tag {
        Some(tag) if tag.word >= record_words => {
            Err(Error::InvalidArgument("tag word lies outside the record"))
        }
        _ => Ok(()),
    }
}

/// One slot always separates the producer from the consumer, so a ring holds at most
/// `count - 1` pending records and needs at least two slots.
fn check_count(count: usize) -> Result<()> {
    if count < MIN_SLOTS {
        return Err(Error::InvalidArgument("ring needs at least two slots"));
    }
    Ok(())
}

/// Builds a linked ring of `count` records, one allocation per record.
///
/// Each record is cleared, tagged, and linked from its predecessor; the last record links
/// back to the first. The start, producer and consumer registers all receive the first
/// record's offset.
///
/// An allocation or transport failure aborts the build. Records allocated before the failure
/// stay allocated and the root registers are left untouched.
pub fn build_linked(
    arena: &mut Arena,
    transport: &mut dyn Transport,
    params: &LinkedRingParams,
    count: usize,
) -> Result<LinkedRing> {
    check_count(count)?;
    if params.next_word >= params.record_words {
        return Err(Error::InvalidArgument("link word lies outside the record"));
    }
    check_tag(params.tag, params.record_words)?;
    let bytes = record_bytes(params.record_words)?;
    let dev = *arena.device();
    let link = params.next_word as u32 * WORD_BYTES;

    let mut slots: Vec<u32> = Vec::with_capacity(count);
    for i in 0..count {
        let offset = arena.allocate(transport, bytes)?;
        if let Some(&prev) = slots.last() {
            transport.write_u32(&dev, prev + link, offset)?;
        }
        if let Some(tag) = params.tag {
            transport.write_u32(&dev, offset + tag.word as u32 * WORD_BYTES, tag.value(i))?;
        }
        slots.push(offset);
    }

    let first = slots[0];
    let last = slots[count - 1];
    transport.write_u32(&dev, last + link, first)?;
    for reg in [params.root.start, params.root.producer, params.root.consumer] {
        transport.write_u32(&dev, reg, first)?;
    }

    debug!(%dev, first, count, record_bytes = bytes, "linked ring built");
    Ok(LinkedRing::new(
        params.root,
        params.record_words,
        params.next_word,
        slots,
    ))
}

/// Builds an indexed ring: one allocation holding the header and `count` records.
///
/// The header receives the capacity and record size with the consumer index at 0; the
/// producer register is reset to 0 and the table register receives the table offset.
pub fn build_indexed(
    arena: &mut Arena,
    transport: &mut dyn Transport,
    params: &IndexedRingParams,
    count: usize,
) -> Result<IndexedRing> {
    check_count(count)?;
    check_tag(params.tag, params.record_words)?;
    let bytes = record_bytes(params.record_words)?;
    let total = u32::try_from(count)
        .ok()
        .and_then(|c| c.checked_mul(bytes))
        .and_then(|b| b.checked_add(table_header::BYTES))
        .ok_or(Error::InvalidArgument("ring does not fit the address space"))?;
    let dev = *arena.device();

    let table = arena.allocate(transport, total)?;
    let mut header = [0u32; table_header::WORDS];
    header[table_header::CAPACITY] = count as u32;
    header[table_header::CONSUMER] = 0;
    header[table_header::RECORD_WORDS] = params.record_words as u32;
    transport.write_words(&dev, table, &header)?;

    let ring = IndexedRing::new(params.root, table, count, params.record_words);
    if let Some(tag) = params.tag.filter(|_| count <= params.tag_threshold) {
        for slot in 0..count {
            let at = ring.slot_offset(slot) + tag.word as u32 * WORD_BYTES;
            transport.write_u32(&dev, at, tag.value(slot))?;
        }
    }

    transport.write_u32(&dev, params.root.producer, 0)?;
    transport.write_u32(&dev, params.root.table, table)?;

    debug!(%dev, table, count, record_bytes = bytes, "indexed ring built");
    Ok(ring)
}

#[cfg(test)]
mod tests {
    use super::*;
    use avio_arena::Region;
    use avio_core::{Backplane, BoardModel, ChannelKind, DeviceId, MemTransport};

    fn dev() -> DeviceId {
        DeviceId::new(Backplane::Pci, BoardModel::PMC_MULTI, 0, ChannelKind::Mil1553, 0)
    }

    const LINKED: LinkedRingParams = LinkedRingParams {
        root: LinkedRoot {
            start: 0x100,
            producer: 0x104,
            consumer: 0x108,
        },
        record_words: 4,
        next_word: 1,
        tag: Some(SlotTag {
            word: 2,
            marker: 0x8000_0000,
        }),
    };

    const INDEXED: IndexedRingParams = IndexedRingParams {
        root: IndexedRoot {
            table: 0x200,
            producer: 0x204,
        },
        record_words: 2,
        tag: Some(SlotTag {
            word: 0,
            marker: 0x4000_0000,
        }),
        tag_threshold: 4,
    };

    fn setup() -> (Arena, MemTransport) {
        (
            Arena::new(dev(), Region::new(0x1000, 0x1000)),
            MemTransport::local(0x2000),
        )
    }

    #[test]
    fn linked_ring_closes_the_cycle() {
        let (mut arena, mut t) = setup();
        let ring = build_linked(&mut arena, &mut t, &LINKED, 3).unwrap();
        assert_eq!(ring.slots(), &[0x1000, 0x1010, 0x1020]);

        let mut at = ring.first();
        for i in 0..3 {
            let mut rec = [0u32; 4];
            t.peek_words(&dev(), at, &mut rec).unwrap();
            assert_eq!(rec[2], i | 0x8000_0000);
            at = rec[1];
        }
        assert_eq!(at, ring.first());

        for reg in [0x100, 0x104, 0x108] {
            assert_eq!(t.peek(&dev(), reg).unwrap(), 0x1000);
        }
        assert_eq!(arena.available(), 0x1000 - 3 * 16);
    }

    #[test]
    fn two_record_ring_links_both_ways() {
        let (mut arena, mut t) = setup();
        let ring = build_linked(&mut arena, &mut t, &LINKED, 2).unwrap();
        let [a, b] = [ring.slot_offset(0), ring.slot_offset(1)];
        assert_eq!(t.peek(&dev(), a + 4).unwrap(), b);
        assert_eq!(t.peek(&dev(), b + 4).unwrap(), a);
    }

    #[test]
    fn linked_build_failure_leaks_earlier_records() {
        let mut arena = Arena::new(dev(), Region::new(0x1000, 40));
        let mut t = MemTransport::local(0x2000);
        let err = build_linked(&mut arena, &mut t, &LINKED, 3).unwrap_err();
        assert!(matches!(err, Error::OutOfMemory { .. }));
        // Two records were allocated before the third failed; they are not rolled back.
        assert_eq!(arena.available(), 8);
        assert_eq!(t.peek(&dev(), 0x100).unwrap(), 0);
    }

    #[test]
    fn indexed_ring_writes_header_tags_and_registers() {
        let (mut arena, mut t) = setup();
        t.poke(&dev(), 0x204, 7).unwrap();
        let ring = build_indexed(&mut arena, &mut t, &INDEXED, 3).unwrap();
        assert_eq!(ring.table_offset(), 0x1000);

        let mut header = [0u32; 4];
        t.peek_words(&dev(), 0x1000, &mut header).unwrap();
        assert_eq!(header, [3, 0, 2, 0]);
        for slot in 0..3 {
            assert_eq!(
                t.peek(&dev(), ring.slot_offset(slot)).unwrap(),
                slot as u32 | 0x4000_0000
            );
        }
        assert_eq!(t.peek(&dev(), 0x200).unwrap(), 0x1000);
        assert_eq!(t.peek(&dev(), 0x204).unwrap(), 0);
    }

    #[test]
    fn indexed_ring_above_threshold_is_not_tagged() {
        let (mut arena, mut t) = setup();
        let ring = build_indexed(&mut arena, &mut t, &INDEXED, 5).unwrap();
        for slot in 0..5 {
            assert_eq!(t.peek(&dev(), ring.slot_offset(slot)).unwrap(), 0);
        }
    }

    #[test]
    fn rings_without_room_for_a_record_are_rejected() {
        let (mut arena, mut t) = setup();
        for count in [0, 1] {
            assert!(matches!(
                build_linked(&mut arena, &mut t, &LINKED, count),
                Err(Error::InvalidArgument(_))
            ));
            assert!(matches!(
                build_indexed(&mut arena, &mut t, &INDEXED, count),
                Err(Error::InvalidArgument(_))
            ));
        }
        assert_eq!(arena.available(), 0x1000);
        assert_eq!(t.stats().write_calls, 0);
    }

    #[test]
    fn release_returns_memory_and_clears_registers() {
        let (mut arena, mut t) = setup();
        let linked = build_linked(&mut arena, &mut t, &LINKED, 4).unwrap();
        let indexed = build_indexed(&mut arena, &mut t, &INDEXED, 4).unwrap();

        linked.release(&mut arena, &mut t).unwrap();
        indexed.release(&mut arena, &mut t).unwrap();

        assert_eq!(arena.available(), 0x1000);
        assert_eq!(arena.free_blocks().len(), 1);
        for reg in [0x100, 0x104, 0x108, 0x200, 0x204] {
            assert_eq!(t.peek(&dev(), reg).unwrap(), 0);
        }
    }
}
