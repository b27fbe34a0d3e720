//! Host-side model of a channel's protocol engine.
//!
//! [`Engine`] writes records into a [`Channel`]'s rings and advances the producer registers
//! the way the board firmware does. It goes through [`MemTransport::peek_words`] and
//! [`MemTransport::poke_words`] so its traffic never shows up in the transport statistics a
//! test is measuring.
//!
//! A ring the engine finds full drops the record and reports `None`, like an overrun on the
//! real board.

use avio_core::{Error, MemTransport, Result, WORD_BYTES};
use avio_ring::{table_header, IndexedRing, LinkedRing, Record, Ring};
use tracing::trace;

use crate::cdp::{self, Cdp};
use crate::channel::Channel;
use crate::iq::{self, IqCause, IqEntry};
use crate::rxp::{self, Rxp};

#[derive(Debug, Default)]
pub struct Engine {
    sequence: u32,
    dropped: u64,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records dropped because their ring was full.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Captures `cdp` into the bus-monitor ring and returns the slot's offset.
    ///
    /// The slot keeps its link and host identifier words.
    pub fn capture(
        &mut self,
        channel: &Channel,
        t: &mut MemTransport,
        cdp: &Cdp,
    ) -> Result<Option<u32>> {
        let ring = channel
            .monitor_ring()
            .ok_or(Error::NotInitialized(*channel.id()))?;
        let keep = [cdp::word::NEXT, cdp::word::API_INFO];
        self.produce_linked(channel, t, ring, cdp, &keep)
    }

    /// Writes `rxp` into the receive table of receive channel `rx` and returns the slot index.
    pub fn receive(
        &mut self,
        channel: &Channel,
        t: &mut MemTransport,
        rx: usize,
        rxp: &Rxp,
    ) -> Result<Option<usize>> {
        let ring = channel
            .receive_table(rx)
            .ok_or(Error::NotInitialized(*channel.id()))?;
        self.produce_indexed(channel, t, ring, rxp)
    }

    /// Writes `rxp` into the multi-channel receive table and returns the slot index.
    pub fn receive_multi(
        &mut self,
        channel: &Channel,
        t: &mut MemTransport,
        rxp: &Rxp,
    ) -> Result<Option<usize>> {
        let ring = channel
            .mcrx_table()
            .ok_or(Error::NotInitialized(*channel.id()))?;
        self.produce_indexed(channel, t, ring, rxp)
    }

    /// Queues an interrupt referring to `related` and returns its sequence number.
    pub fn interrupt(
        &mut self,
        channel: &Channel,
        t: &mut MemTransport,
        cause: IqCause,
        related: u32,
    ) -> Result<Option<u32>> {
        let ring = channel
            .interrupt_ring()
            .ok_or(Error::NotInitialized(*channel.id()))?;
        let sequence = self.sequence;
        let entry = IqEntry::new(cause, sequence, related);
        let written = self.produce_linked(channel, t, ring, &entry, &[iq::word::NEXT])?;
        if written.is_none() {
            return Ok(None);
        }
        self.sequence = self.sequence.wrapping_add(1);
        Ok(Some(sequence))
    }

    fn produce_linked<R: Record>(
        &mut self,
        channel: &Channel,
        t: &mut MemTransport,
        ring: &LinkedRing,
        record: &R,
        keep: &[usize],
    ) -> Result<Option<u32>> {
        let dev = channel.id();
        let root = ring.root();
        let produced = ring.slot_of(t.peek(dev, root.producer)?)?;
        let consumed = ring.slot_of(t.peek(dev, root.consumer)?)?;
        let slot = (produced + 1) % ring.capacity();
        if slot == consumed {
            self.dropped += 1;
            trace!(%dev, slot, "engine dropped record: ring full");
            return Ok(None);
        }

        let offset = ring.slot_offset(slot);
        let mut words = vec![0u32; R::WORDS];
        t.peek_words(dev, offset, &mut words)?;
        let kept: Vec<u32> = keep.iter().map(|&w| words[w]).collect();
        record.encode(&mut words);
        for (&w, &value) in keep.iter().zip(&kept) {
            words[w] = value;
        }
        t.poke_words(dev, offset, &words)?;
        t.poke(dev, root.producer, offset)?;
        Ok(Some(offset))
    }

    fn produce_indexed(
        &mut self,
        channel: &Channel,
        t: &mut MemTransport,
        ring: &IndexedRing,
        rxp: &Rxp,
    ) -> Result<Option<usize>> {
        let dev = channel.id();
        let root = ring.root();
        let cap = ring.capacity();
        let slot = t.peek(dev, root.producer)? as usize % cap;
        let consumer_at = ring.table_offset() + table_header::CONSUMER as u32 * WORD_BYTES;
        let consumer = t.peek(dev, consumer_at)? as usize;
        let next = (slot + 1) % cap;
        if next == consumer {
            self.dropped += 1;
            trace!(%dev, slot, "engine dropped record: table full");
            return Ok(None);
        }

        let offset = ring.slot_offset(slot);
        let mut words = [0u32; rxp::word::WORDS];
        t.peek_words(dev, offset, &mut words)?;
        let api_info = words[rxp::word::API_INFO];
        rxp.encode(&mut words);
        words[rxp::word::API_INFO] = api_info;
        t.poke_words(dev, offset, &words)?;
        t.poke(dev, root.producer, next as u32)?;
        Ok(Some(slot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ChannelConfig, CDP_MARKER};
    use avio_arena::Region;
    use avio_core::{Backplane, BoardModel, ChannelKind, DeviceId};

    fn bm() -> DeviceId {
        DeviceId::new(Backplane::Pci, BoardModel::PMC_MULTI, 1, ChannelKind::Mil1553, 0)
    }

    #[test]
    fn capture_keeps_link_and_identifier() {
        let mut t = MemTransport::local(0x10000);
        let mut ch = Channel::new(bm(), Region::new(0x1000, 0x4000), ChannelConfig::default());
        ch.create_monitor_ring(&mut t, 3).unwrap();
        let mut engine = Engine::new();

        let cdp = Cdp {
            next: 0xdead_beef,
            api_info: 0x1234,
            gap: 9,
            ..Cdp::default()
        };
        let offset = engine.capture(&ch, &mut t, &cdp).unwrap().unwrap();
        let ring = ch.monitor_ring().unwrap();
        assert_eq!(offset, ring.slot_offset(1));

        let mut words = [0u32; cdp::word::WORDS];
        t.peek_words(&bm(), offset, &mut words).unwrap();
        assert_eq!(words[cdp::word::NEXT], ring.slot_offset(2));
        assert_eq!(words[cdp::word::API_INFO], CDP_MARKER | 1);
        assert_eq!(words[cdp::word::GAP], 9);
    }

    #[test]
    fn full_ring_drops() {
        let mut t = MemTransport::local(0x10000);
        let mut ch = Channel::new(bm(), Region::new(0x1000, 0x4000), ChannelConfig::default());
        ch.create_interrupt_queue(&mut t, 3).unwrap();
        let mut engine = Engine::new();

        assert_eq!(engine.interrupt(&ch, &mut t, IqCause::Playback, 0).unwrap(), Some(0));
        assert_eq!(engine.interrupt(&ch, &mut t, IqCause::Playback, 0).unwrap(), Some(1));
        assert_eq!(engine.interrupt(&ch, &mut t, IqCause::Playback, 0).unwrap(), None);
        assert_eq!(engine.dropped(), 1);
        assert_eq!(t.stats().read_calls, 0);
    }
}
