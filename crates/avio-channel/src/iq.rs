//! Interrupt queue entries and cause decoding.

use avio_core::{DeviceId, Error, Result, Transport, WORD_BYTES};
use avio_ring::Record;

use crate::{cdp, rxp};

pub mod word {
    pub const NEXT: usize = 0;
    /// Cause category in the top byte, sequence number below it.
    pub const TYPE_SEQ: usize = 1;
    /// Offset of the structure the interrupt refers to.
    pub const RELATED: usize = 2;
    pub const WORDS: usize = 4;
}

/// Word index of the message number within a bus-controller control block.
pub const CONTROL_BLOCK_MESSAGE: usize = 1;
/// Word index of the host identifier within a remote-terminal message block.
pub const RT_MESSAGE_API_INFO: usize = 1;

/// Info value of an aperiodic-stop interrupt: no control block is associated.
pub const NO_CONTROL_BLOCK: u32 = 0xffff_ffff;

const SEQUENCE_MASK: u32 = 0x00ff_ffff;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IqCause {
    /// A CDP was captured; info is the CDP's host identifier.
    BusMonitor,
    /// A bus-controller control block completed; info is its message number.
    BcControlBlock,
    /// Aperiodic transmission stopped; info is [`NO_CONTROL_BLOCK`].
    BcAperiodicStop,
    /// A remote-terminal message completed; info is the message block's host identifier.
    RtMessage,
    /// A receive record arrived; info is the record's host identifier.
    A429Receive,
    /// A playback buffer drained; info is the buffer offset.
    Playback,
    /// A signal-generator buffer drained; info is the buffer offset.
    SignalGenerator,
    /// A category this layer does not interpret; info is 0.
    Other(u8),
}

impl IqCause {
    pub fn from_code(code: u8) -> Self {
        match code {
            0x01 => IqCause::BusMonitor,
            0x02 => IqCause::BcControlBlock,
            0x03 => IqCause::BcAperiodicStop,
            0x04 => IqCause::RtMessage,
            0x05 => IqCause::A429Receive,
            0x06 => IqCause::Playback,
            0x07 => IqCause::SignalGenerator,
            other => IqCause::Other(other),
        }
    }

    pub fn code(self) -> u8 {
        match self {
            IqCause::BusMonitor => 0x01,
            IqCause::BcControlBlock => 0x02,
            IqCause::BcAperiodicStop => 0x03,
            IqCause::RtMessage => 0x04,
            IqCause::A429Receive => 0x05,
            IqCause::Playback => 0x06,
            IqCause::SignalGenerator => 0x07,
            IqCause::Other(code) => code,
        }
    }

    /// Word of the related structure holding the info value, if the cause dereferences one.
    fn info_word(self) -> Option<usize> {
        match self {
            IqCause::BusMonitor => Some(cdp::word::API_INFO),
            IqCause::BcControlBlock => Some(CONTROL_BLOCK_MESSAGE),
            IqCause::RtMessage => Some(RT_MESSAGE_API_INFO),
            IqCause::A429Receive => Some(rxp::word::API_INFO),
            _ => None,
        }
    }
}

/// Raw interrupt queue entry as the engine writes it.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IqEntry {
    pub next: u32,
    pub type_seq: u32,
    pub related: u32,
}

impl IqEntry {
    pub fn new(cause: IqCause, sequence: u32, related: u32) -> Self {
        Self {
            next: 0,
            type_seq: (u32::from(cause.code()) << 24) | (sequence & SEQUENCE_MASK),
            related,
        }
    }

    pub fn cause(&self) -> IqCause {
        IqCause::from_code((self.type_seq >> 24) as u8)
    }

    pub fn sequence(&self) -> u32 {
        self.type_seq & SEQUENCE_MASK
    }
}

impl Record for IqEntry {
    const WORDS: usize = word::WORDS;

    fn decode(words: &[u32]) -> Self {
        Self {
            next: words[word::NEXT],
            type_seq: words[word::TYPE_SEQ],
            related: words[word::RELATED],
        }
    }

    fn encode(&self, words: &mut [u32]) {
        words[..word::WORDS].fill(0);
        words[word::NEXT] = self.next;
        words[word::TYPE_SEQ] = self.type_seq;
        words[word::RELATED] = self.related;
    }
}

/// A decoded interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interrupt {
    pub cause: IqCause,
    pub sequence: u32,
    pub related: u32,
    pub info: u32,
}

impl Interrupt {
    /// Decodes `entry`, reading the info word from the structure it refers to.
    ///
    /// A related offset whose info word lies past the end of the address space is
    /// [`Error::BadRingPosition`].
    pub fn resolve(
        dev: &DeviceId,
        transport: &mut dyn Transport,
        entry: &IqEntry,
    ) -> Result<Self> {
        let cause = entry.cause();
        let info = match cause {
            IqCause::BcAperiodicStop => NO_CONTROL_BLOCK,
            IqCause::Playback | IqCause::SignalGenerator => entry.related,
            _ => match cause.info_word() {
                Some(word) => {
                    let at = entry
                        .related
                        .checked_add(word as u32 * WORD_BYTES)
                        .ok_or(Error::BadRingPosition {
                            offset: entry.related,
                        })?;
                    transport.read_u32(dev, at)?
                }
                None => 0,
            },
        };
        Ok(Self {
            cause,
            sequence: entry.sequence(),
            related: entry.related,
            info,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use avio_core::{Backplane, BoardModel, ChannelKind, MemTransport};

    fn dev() -> DeviceId {
        DeviceId::new(Backplane::Pci, BoardModel::PCIE_1553, 0, ChannelKind::Mil1553, 0)
    }

    #[test]
    fn type_seq_splits_cause_and_sequence() {
        let entry = IqEntry::new(IqCause::RtMessage, 0x0123_4567, 0);
        assert_eq!(entry.type_seq, 0x0423_4567);
        assert_eq!(entry.cause(), IqCause::RtMessage);
        assert_eq!(entry.sequence(), 0x23_4567);
        assert_eq!(IqCause::from_code(0x42), IqCause::Other(0x42));
        assert_eq!(IqCause::Other(0x42).code(), 0x42);
    }

    #[test]
    fn info_follows_the_related_pointer() {
        let mut t = MemTransport::local(0x4000);
        t.poke(&dev(), 0x2000 + 4, 0x8000_0003).unwrap();
        t.poke(&dev(), 0x3000 + 4, 17).unwrap();

        let capture = IqEntry::new(IqCause::BusMonitor, 1, 0x2000);
        let irq = Interrupt::resolve(&dev(), &mut t, &capture).unwrap();
        assert_eq!(irq.info, 0x8000_0003);

        let block = IqEntry::new(IqCause::BcControlBlock, 2, 0x3000);
        assert_eq!(Interrupt::resolve(&dev(), &mut t, &block).unwrap().info, 17);
    }

    #[test]
    fn non_dereferencing_causes() {
        let mut t = MemTransport::local(0x100);
        t.reset_stats();

        let stop = IqEntry::new(IqCause::BcAperiodicStop, 0, 0xdead_0000);
        assert_eq!(
            Interrupt::resolve(&dev(), &mut t, &stop).unwrap().info,
            NO_CONTROL_BLOCK
        );
        let playback = IqEntry::new(IqCause::Playback, 0, 0x1800);
        assert_eq!(Interrupt::resolve(&dev(), &mut t, &playback).unwrap().info, 0x1800);
        let other = IqEntry::new(IqCause::Other(0x30), 0, 0xdead_0000);
        assert_eq!(Interrupt::resolve(&dev(), &mut t, &other).unwrap().info, 0);

        assert_eq!(t.stats().read_calls, 0);
    }

    #[test]
    fn related_offset_at_the_top_of_the_address_space_is_rejected() {
        let mut t = MemTransport::local(0x100);
        let entry = IqEntry::new(IqCause::BusMonitor, 0, 0xffff_fffc);
        assert_eq!(
            Interrupt::resolve(&dev(), &mut t, &entry),
            Err(Error::BadRingPosition {
                offset: 0xffff_fffc
            })
        );
        assert_eq!(t.stats().read_calls, 0);
    }
}
