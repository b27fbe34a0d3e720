use avio_core::{DeviceId, Error, Result, TransferMode, Transport, WORD_BYTES};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::descriptor::{Positions, Ring};
use crate::record::Record;

/// Maximum records per transfer for each transfer mode.
///
/// The values trade per-transaction latency against buffer size: network transports pay a
/// round trip per call, DMA is bounded by the descriptor buffer, and register access moves
/// one record at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchCeilings {
    pub network: usize,
    pub dma: usize,
    pub register: usize,
}

impl BatchCeilings {
    /// Bus-monitor capture records.
    pub const CAPTURE: Self = Self {
        network: 6,
        dma: 2,
        register: 1,
    };

    /// ARINC-429 receive records.
    pub const RECEIVE: Self = Self {
        network: 90,
        dma: 25,
        register: 1,
    };

    /// Chooses a transfer path and chunk size for records of `record_words` words.
    ///
    /// A DMA buffer that cannot hold a single record falls back to register access.
    pub fn policy(&self, mode: TransferMode, record_words: usize) -> BatchPolicy {
        match mode {
            TransferMode::Register => BatchPolicy {
                path: TransferPath::Register,
                max_records: self.register.max(1),
            },
            TransferMode::Network => BatchPolicy {
                path: TransferPath::Block,
                max_records: self.network.max(1),
            },
            TransferMode::Dma { max_words } => {
                let fits = max_words / record_words.max(1);
                match self.dma.min(fits) {
                    0 => BatchPolicy {
                        path: TransferPath::Register,
                        max_records: self.register.max(1),
                    },
                    n => BatchPolicy {
                        path: TransferPath::Dma,
                        max_records: n,
                    },
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferPath {
    /// Plain word reads, one record per call.
    Register,
    /// Plain word reads covering several records per call.
    Block,
    /// [`Transport::read_words_dma`].
    Dma,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPolicy {
    pub path: TransferPath,
    pub max_records: usize,
}

impl BatchPolicy {
    pub const SINGLE: Self = Self {
        path: TransferPath::Register,
        max_records: 1,
    };

    pub fn for_transport(
        transport: &dyn Transport,
        ceilings: &BatchCeilings,
        record_words: usize,
    ) -> Self {
        ceilings.policy(transport.transfer_mode(), record_words)
    }
}

fn check_record<R: Record, G: Ring + ?Sized>(ring: &G) -> Result<()> {
    if R::WORDS != ring.record_words() {
        return Err(Error::InvalidArgument("record type does not match the ring's record size"));
    }
    Ok(())
}

/// Number of records produced but not yet consumed. Nothing is consumed.
pub fn pending<G: Ring + ?Sized>(
    dev: &DeviceId,
    transport: &mut dyn Transport,
    ring: &G,
) -> Result<usize> {
    Ok(ring.positions(dev, transport)?.pending(ring.capacity()))
}

/// Appends up to `max` newly produced records to `out` and returns how many were appended.
///
/// Records are delivered in production order. Each chunk is bounded by the end of the ring,
/// the policy's batch size, and (for linked rings) physical contiguity. The consumer position
/// is persisted after every chunk before the chunk reaches `out`, so on error `out` holds
/// exactly the records whose consumption was recorded, and the next call resumes after them.
///
/// A caught-up ring yields `Ok(0)` without touching the consumer position.
pub fn read_new<R: Record, G: Ring + ?Sized>(
    dev: &DeviceId,
    transport: &mut dyn Transport,
    ring: &G,
    policy: BatchPolicy,
    max: usize,
    out: &mut Vec<R>,
) -> Result<usize> {
    if max == 0 {
        return Err(Error::InvalidArgument("read count must be non-zero"));
    }
    check_record::<R, G>(ring)?;

    let cap = ring.capacity();
    let Positions { mut next, end } = ring.positions(dev, transport)?;
    let wanted = Positions { next, end }.pending(cap).min(max);
    let batch = policy.max_records.max(1);

    let mut buf: Vec<u32> = Vec::new();
    let mut delivered = 0;
    while delivered < wanted {
        let count = ring.contiguous_from(next, (wanted - delivered).min(batch));
        let offset = ring.slot_offset(next);
        buf.clear();
        buf.resize(count * R::WORDS, 0);
        match policy.path {
            TransferPath::Dma => transport.read_words_dma(dev, offset, &mut buf)?,
            TransferPath::Register | TransferPath::Block => {
                transport.read_words(dev, offset, &mut buf)?
            }
        }

        let slot = next;
        next = (next + count) % cap;
        ring.commit(dev, transport, next)?;
        out.extend(buf.chunks_exact(R::WORDS).map(R::decode));
        delivered += count;
        trace!(%dev, slot, count, path = ?policy.path, "ring chunk consumed");
    }
    Ok(delivered)
}

fn check_slot<G: Ring + ?Sized>(ring: &G, slot: usize) -> Result<u32> {
    if slot >= ring.capacity() {
        return Err(Error::InvalidArgument("slot index beyond ring capacity"));
    }
    Ok(ring.slot_offset(slot))
}

/// Reads the record at `slot` without affecting ring positions.
pub fn read_slot<R: Record, G: Ring + ?Sized>(
    dev: &DeviceId,
    transport: &mut dyn Transport,
    ring: &G,
    slot: usize,
) -> Result<R> {
    check_record::<R, G>(ring)?;
    let offset = check_slot(ring, slot)?;
    let mut words = vec![0u32; R::WORDS];
    transport.read_words(dev, offset, &mut words)?;
    Ok(R::decode(&words))
}

/// Overwrites the record at `slot`. A linked ring's link word is preserved.
pub fn write_slot<R: Record, G: Ring + ?Sized>(
    dev: &DeviceId,
    transport: &mut dyn Transport,
    ring: &G,
    slot: usize,
    record: &R,
) -> Result<()> {
    check_record::<R, G>(ring)?;
    let offset = check_slot(ring, slot)?;
    let mut words = vec![0u32; R::WORDS];
    record.encode(&mut words);
    if let Some(link) = ring.link_word() {
        words[link] = transport.read_u32(dev, offset + link as u32 * WORD_BYTES)?;
    }
    transport.write_words(dev, offset, &words)?;
    Ok(())
}
