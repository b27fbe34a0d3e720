use std::collections::HashMap;

use crate::{DeviceId, TransportError, Transport, TransportKind, WORD_BYTES};

/// Counters for calls that went through the [`Transport`] trait.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TransportStats {
    pub read_calls: u64,
    pub dma_calls: u64,
    pub write_calls: u64,
    pub words_read: u64,
    pub words_written: u64,
    /// Largest single read (plain or DMA), in words.
    pub largest_read_words: usize,
}

/// In-memory model of one or more channel address spaces.
///
/// Each [`DeviceId`] gets its own zero-filled space of `space_bytes` bytes on first access.
/// `peek`/`poke` bypass the statistics and fault injection so tests and simulators can stage
/// device-side state without disturbing what they measure.
#[derive(Debug)]
pub struct MemTransport {
    kind: TransportKind,
    dma_max_words: Option<usize>,
    space_words: usize,
    spaces: HashMap<DeviceId, Vec<u32>>,
    stats: TransportStats,
    reads_until_fault: Option<u64>,
    writes_until_fault: Option<u64>,
}

impl MemTransport {
    pub fn new(kind: TransportKind, space_bytes: u32) -> Self {
        Self {
            kind,
            dma_max_words: None,
            space_words: (space_bytes / WORD_BYTES) as usize,
            spaces: HashMap::new(),
            stats: TransportStats::default(),
            reads_until_fault: None,
            writes_until_fault: None,
        }
    }

    /// A locally-attached transport without DMA.
    pub fn local(space_bytes: u32) -> Self {
        Self::new(TransportKind::Local, space_bytes)
    }

    /// A network-attached transport.
    pub fn network(space_bytes: u32) -> Self {
        Self::new(TransportKind::Network, space_bytes)
    }

    /// A locally-attached transport with a DMA buffer of `max_words` words.
    pub fn dma(space_bytes: u32, max_words: usize) -> Self {
        let mut transport = Self::new(TransportKind::Local, space_bytes);
        transport.dma_max_words = Some(max_words);
        transport
    }

    pub fn space_bytes(&self) -> u32 {
        self.space_words as u32 * WORD_BYTES
    }

    pub fn stats(&self) -> TransportStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = TransportStats::default();
    }

    /// Fails the read call that follows `successes` further successful reads (plain or DMA).
    pub fn fail_read_after(&mut self, successes: u64) {
        self.reads_until_fault = Some(successes);
    }

    /// Fails the write call that follows `successes` further successful writes.
    pub fn fail_write_after(&mut self, successes: u64) {
        self.writes_until_fault = Some(successes);
    }

    pub fn peek(&mut self, dev: &DeviceId, offset: u32) -> Result<u32, TransportError> {
        let mut buf = [0u32; 1];
        self.peek_words(dev, offset, &mut buf)?;
        Ok(buf[0])
    }

    pub fn peek_words(
        &mut self,
        dev: &DeviceId,
        offset: u32,
        dst: &mut [u32],
    ) -> Result<(), TransportError> {
        let start = self.check_range(offset, dst.len())?;
        let space = self.space(dev);
        dst.copy_from_slice(&space[start..start + dst.len()]);
        Ok(())
    }

    pub fn poke(&mut self, dev: &DeviceId, offset: u32, value: u32) -> Result<(), TransportError> {
        self.poke_words(dev, offset, &[value])
    }

    pub fn poke_words(
        &mut self,
        dev: &DeviceId,
        offset: u32,
        src: &[u32],
    ) -> Result<(), TransportError> {
        let start = self.check_range(offset, src.len())?;
        let space = self.space(dev);
        space[start..start + src.len()].copy_from_slice(src);
        Ok(())
    }

    fn space(&mut self, dev: &DeviceId) -> &mut Vec<u32> {
        let words = self.space_words;
        self.spaces.entry(*dev).or_insert_with(|| vec![0; words])
    }

    fn check_range(&self, offset: u32, words: usize) -> Result<usize, TransportError> {
        if offset % WORD_BYTES != 0 {
            return Err(TransportError::Unaligned { offset });
        }
        let start = (offset / WORD_BYTES) as usize;
        let end = start.checked_add(words);
        match end {
            Some(end) if end <= self.space_words => Ok(start),
            _ => Err(TransportError::OutOfRange {
                offset,
                words,
                size: self.space_bytes(),
            }),
        }
    }

    fn take_read_fault(&mut self) -> Result<(), TransportError> {
        take_fault(&mut self.reads_until_fault, "injected read fault")
    }

    fn take_write_fault(&mut self) -> Result<(), TransportError> {
        take_fault(&mut self.writes_until_fault, "injected write fault")
    }

    fn record_read(&mut self, words: usize) {
        self.stats.words_read += words as u64;
        self.stats.largest_read_words = self.stats.largest_read_words.max(words);
    }
}

fn take_fault(counter: &mut Option<u64>, what: &str) -> Result<(), TransportError> {
    match counter {
        Some(0) => {
            *counter = None;
            Err(TransportError::Io(what.to_string()))
        }
        Some(n) => {
            *n -= 1;
            Ok(())
        }
        None => Ok(()),
    }
}

impl Transport for MemTransport {
    fn kind(&self) -> TransportKind {
        self.kind
    }

    fn read_words(
        &mut self,
        dev: &DeviceId,
        offset: u32,
        dst: &mut [u32],
    ) -> Result<(), TransportError> {
        self.take_read_fault()?;
        self.peek_words(dev, offset, dst)?;
        self.stats.read_calls += 1;
        self.record_read(dst.len());
        Ok(())
    }

    fn write_words(
        &mut self,
        dev: &DeviceId,
        offset: u32,
        src: &[u32],
    ) -> Result<(), TransportError> {
        self.take_write_fault()?;
        self.poke_words(dev, offset, src)?;
        self.stats.write_calls += 1;
        self.stats.words_written += src.len() as u64;
        Ok(())
    }

    fn dma_max_words(&self) -> Option<usize> {
        self.dma_max_words
    }

    fn read_words_dma(
        &mut self,
        dev: &DeviceId,
        offset: u32,
        dst: &mut [u32],
    ) -> Result<(), TransportError> {
        let Some(max_words) = self.dma_max_words else {
            return self.read_words(dev, offset, dst);
        };
        if dst.len() > max_words {
            return Err(TransportError::Io(format!(
                "dma read of {} words exceeds buffer of {max_words}",
                dst.len()
            )));
        }
        self.take_read_fault()?;
        self.peek_words(dev, offset, dst)?;
        self.stats.dma_calls += 1;
        self.record_read(dst.len());
        Ok(())
    }
}
