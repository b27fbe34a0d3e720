use avio_arena::{Arena, Region};
use avio_core::{ChannelKind, DeviceId, Error, Result, Transport};
use avio_ring::{
    build_indexed, build_linked, pending, read_new, read_slot, write_slot, BatchPolicy,
    IndexedRing, IndexedRingParams, LinkedRing, LinkedRingParams, Positions, Record, Ring,
    SlotTag,
};
use tracing::{debug, trace};

use crate::cdp::{self, Cdp, CDP_MARKER};
use crate::config::ChannelConfig;
use crate::iq::{self, Interrupt, IqEntry};
use crate::regs;
use crate::rxp::{self, Rxp, MCRX_MARKER, RXP_MARKER};

/// Host-side state of one channel: its arena and the rings built in it.
///
/// Every operation that touches the device takes the channel's transport explicitly. A ring
/// that was never created reports [`Error::NotInitialized`].
#[derive(Debug)]
pub struct Channel {
    id: DeviceId,
    arena: Arena,
    config: ChannelConfig,
    monitor: Option<LinkedRing>,
    interrupts: Option<LinkedRing>,
    mcrx: Option<IndexedRing>,
    receive: Vec<Option<IndexedRing>>,
}

impl Channel {
    pub fn new(id: DeviceId, region: Region, config: ChannelConfig) -> Self {
        Self {
            id,
            arena: Arena::new(id, region),
            config,
            monitor: None,
            interrupts: None,
            mcrx: None,
            receive: vec![None; regs::rx::CHANNELS],
        }
    }

    pub fn id(&self) -> &DeviceId {
        &self.id
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    pub fn allocate(&mut self, transport: &mut dyn Transport, size: u32) -> Result<u32> {
        self.arena.allocate(transport, size)
    }

    pub fn free(&mut self, offset: u32, size: u32) -> Result<()> {
        self.arena.free(offset, size)
    }

    pub fn available(&self) -> u32 {
        self.arena.available()
    }

    fn require(&self, kind: ChannelKind, msg: &'static str) -> Result<()> {
        if self.id.channel != kind {
            return Err(Error::InvalidArgument(msg));
        }
        Ok(())
    }

    fn missing(&self) -> Error {
        Error::NotInitialized(self.id)
    }

    // Bus monitor.

    /// Builds the bus-monitor capture ring and returns the offset of its first CDP.
    pub fn create_monitor_ring(
        &mut self,
        transport: &mut dyn Transport,
        count: usize,
    ) -> Result<u32> {
        self.require(ChannelKind::Mil1553, "bus monitor requires a MIL-STD-1553 channel")?;
        if self.monitor.is_some() {
            return Err(Error::InvalidArgument("bus monitor ring already exists"));
        }
        let params = LinkedRingParams {
            root: regs::MONITOR_ROOT,
            record_words: Cdp::WORDS,
            next_word: cdp::word::NEXT,
            tag: Some(SlotTag {
                word: cdp::word::API_INFO,
                marker: CDP_MARKER,
            }),
        };
        let ring = build_linked(&mut self.arena, transport, &params, count)?;
        let first = ring.first();
        self.monitor = Some(ring);
        Ok(first)
    }

    pub fn monitor_ring(&self) -> Option<&LinkedRing> {
        self.monitor.as_ref()
    }

    fn monitor(&self) -> Result<&LinkedRing> {
        self.monitor.as_ref().ok_or_else(|| self.missing())
    }

    /// Appends up to `max` newly captured CDPs to `out`.
    pub fn read_monitor(
        &self,
        transport: &mut dyn Transport,
        max: usize,
        out: &mut Vec<Cdp>,
    ) -> Result<usize> {
        let ring = self.monitor()?;
        let policy = BatchPolicy::for_transport(&*transport, &self.config.capture, Cdp::WORDS);
        read_new(&self.id, transport, ring, policy, max, out)
    }

    pub fn monitor_pending(&self, transport: &mut dyn Transport) -> Result<usize> {
        pending(&self.id, transport, self.monitor()?)
    }

    pub fn read_monitor_slot(&self, transport: &mut dyn Transport, slot: usize) -> Result<Cdp> {
        read_slot(&self.id, transport, self.monitor()?, slot)
    }

    /// Overwrites the CDP at `slot`; its link to the next CDP is kept.
    pub fn write_monitor_slot(
        &self,
        transport: &mut dyn Transport,
        slot: usize,
        cdp: &Cdp,
    ) -> Result<()> {
        write_slot(&self.id, transport, self.monitor()?, slot, cdp)
    }

    // Receive tables.

    fn check_rx(rx: usize) -> Result<()> {
        if rx >= regs::rx::CHANNELS {
            return Err(Error::InvalidArgument("receive channel out of range"));
        }
        Ok(())
    }

    /// Builds the receive table of receive channel `rx` and returns its table offset.
    pub fn create_receive_table(
        &mut self,
        transport: &mut dyn Transport,
        rx: usize,
        count: usize,
    ) -> Result<u32> {
        self.require(ChannelKind::Arinc429, "receive tables require an ARINC-429 channel")?;
        Self::check_rx(rx)?;
        if self.receive[rx].is_some() {
            return Err(Error::InvalidArgument("receive table already exists"));
        }
        let params = IndexedRingParams {
            root: regs::rx_root(rx),
            record_words: Rxp::WORDS,
            tag: Some(SlotTag {
                word: rxp::word::API_INFO,
                marker: RXP_MARKER,
            }),
            tag_threshold: self.config.indexed_tag_threshold,
        };
        let ring = build_indexed(&mut self.arena, transport, &params, count)?;
        let table = ring.table_offset();
        self.receive[rx] = Some(ring);
        Ok(table)
    }

    pub fn receive_table(&self, rx: usize) -> Option<&IndexedRing> {
        self.receive.get(rx).and_then(Option::as_ref)
    }

    fn receive(&self, rx: usize) -> Result<&IndexedRing> {
        Self::check_rx(rx)?;
        self.receive[rx].as_ref().ok_or_else(|| self.missing())
    }

    pub fn read_receive(
        &self,
        transport: &mut dyn Transport,
        rx: usize,
        max: usize,
        out: &mut Vec<Rxp>,
    ) -> Result<usize> {
        let ring = self.receive(rx)?;
        let policy = BatchPolicy::for_transport(&*transport, &self.config.receive, Rxp::WORDS);
        read_new(&self.id, transport, ring, policy, max, out)
    }

    pub fn receive_pending(&self, transport: &mut dyn Transport, rx: usize) -> Result<usize> {
        pending(&self.id, transport, self.receive(rx)?)
    }

    pub fn read_receive_slot(
        &self,
        transport: &mut dyn Transport,
        rx: usize,
        slot: usize,
    ) -> Result<Rxp> {
        read_slot(&self.id, transport, self.receive(rx)?, slot)
    }

    pub fn write_receive_slot(
        &self,
        transport: &mut dyn Transport,
        rx: usize,
        slot: usize,
        rxp: &Rxp,
    ) -> Result<()> {
        write_slot(&self.id, transport, self.receive(rx)?, slot, rxp)
    }

    // Multi-channel receive table.

    pub fn create_mcrx_table(
        &mut self,
        transport: &mut dyn Transport,
        count: usize,
    ) -> Result<u32> {
        self.require(ChannelKind::Arinc429, "receive tables require an ARINC-429 channel")?;
        if self.mcrx.is_some() {
            return Err(Error::InvalidArgument("multi-channel receive table already exists"));
        }
        let params = IndexedRingParams {
            root: regs::MCRX_ROOT,
            record_words: Rxp::WORDS,
            tag: Some(SlotTag {
                word: rxp::word::API_INFO,
                marker: MCRX_MARKER,
            }),
            tag_threshold: self.config.indexed_tag_threshold,
        };
        let ring = build_indexed(&mut self.arena, transport, &params, count)?;
        let table = ring.table_offset();
        self.mcrx = Some(ring);
        Ok(table)
    }

    pub fn mcrx_table(&self) -> Option<&IndexedRing> {
        self.mcrx.as_ref()
    }

    fn mcrx(&self) -> Result<&IndexedRing> {
        self.mcrx.as_ref().ok_or_else(|| self.missing())
    }

    pub fn read_mcrx(
        &self,
        transport: &mut dyn Transport,
        max: usize,
        out: &mut Vec<Rxp>,
    ) -> Result<usize> {
        let ring = self.mcrx()?;
        let policy = BatchPolicy::for_transport(&*transport, &self.config.receive, Rxp::WORDS);
        read_new(&self.id, transport, ring, policy, max, out)
    }

    pub fn mcrx_pending(&self, transport: &mut dyn Transport) -> Result<usize> {
        pending(&self.id, transport, self.mcrx()?)
    }

    pub fn read_mcrx_slot(&self, transport: &mut dyn Transport, slot: usize) -> Result<Rxp> {
        read_slot(&self.id, transport, self.mcrx()?, slot)
    }

    pub fn write_mcrx_slot(
        &self,
        transport: &mut dyn Transport,
        slot: usize,
        rxp: &Rxp,
    ) -> Result<()> {
        write_slot(&self.id, transport, self.mcrx()?, slot, rxp)
    }

    // Interrupt queue.

    /// Builds the interrupt queue and returns the offset of its first entry.
    pub fn create_interrupt_queue(
        &mut self,
        transport: &mut dyn Transport,
        count: usize,
    ) -> Result<u32> {
        if self.interrupts.is_some() {
            return Err(Error::InvalidArgument("interrupt queue already exists"));
        }
        let params = LinkedRingParams {
            root: regs::INTERRUPT_ROOT,
            record_words: IqEntry::WORDS,
            next_word: iq::word::NEXT,
            tag: None,
        };
        let ring = build_linked(&mut self.arena, transport, &params, count)?;
        let first = ring.first();
        self.interrupts = Some(ring);
        Ok(first)
    }

    pub fn interrupt_ring(&self) -> Option<&LinkedRing> {
        self.interrupts.as_ref()
    }

    fn interrupts(&self) -> Result<&LinkedRing> {
        self.interrupts.as_ref().ok_or_else(|| self.missing())
    }

    /// Consumes and decodes the oldest pending interrupt.
    ///
    /// Fails with [`Error::NoNewEntry`] when the queue is caught up. The consumer register only
    /// advances once the entry and the structure it refers to have both been read.
    pub fn read_interrupt(&self, transport: &mut dyn Transport) -> Result<Interrupt> {
        let ring = self.interrupts()?;
        let Positions { next, end } = ring.positions(&self.id, transport)?;
        if next == end {
            return Err(Error::NoNewEntry);
        }
        let entry: IqEntry = read_slot(&self.id, transport, ring, next)?;
        let irq = Interrupt::resolve(&self.id, transport, &entry)?;
        ring.commit(&self.id, transport, (next + 1) % ring.capacity())?;
        trace!(
            dev = %self.id,
            slot = next,
            cause = ?irq.cause,
            sequence = irq.sequence,
            "interrupt consumed"
        );
        Ok(irq)
    }

    /// Appends up to `max` interrupts to `out`. Fails with [`Error::NoNewEntry`] when none
    /// were pending.
    pub fn read_interrupts(
        &self,
        transport: &mut dyn Transport,
        max: usize,
        out: &mut Vec<Interrupt>,
    ) -> Result<usize> {
        if max == 0 {
            return Err(Error::InvalidArgument("read count must be non-zero"));
        }
        let mut count = 0;
        while count < max {
            match self.read_interrupt(transport) {
                Ok(irq) => {
                    out.push(irq);
                    count += 1;
                }
                Err(Error::NoNewEntry) => break,
                Err(err) => return Err(err),
            }
        }
        if count == 0 {
            return Err(Error::NoNewEntry);
        }
        Ok(count)
    }

    pub fn interrupt_pending(&self, transport: &mut dyn Transport) -> Result<usize> {
        pending(&self.id, transport, self.interrupts()?)
    }

    /// Releases every ring: memory goes back to the arena and ring registers are zeroed.
    pub fn release(&mut self, transport: &mut dyn Transport) -> Result<()> {
        if let Some(ring) = self.monitor.take() {
            ring.release(&mut self.arena, transport)?;
        }
        if let Some(ring) = self.interrupts.take() {
            ring.release(&mut self.arena, transport)?;
        }
        if let Some(ring) = self.mcrx.take() {
            ring.release(&mut self.arena, transport)?;
        }
        for slot in &mut self.receive {
            if let Some(ring) = slot.take() {
                ring.release(&mut self.arena, transport)?;
            }
        }
        debug!(dev = %self.id, available = self.arena.available(), "channel released");
        Ok(())
    }
}
