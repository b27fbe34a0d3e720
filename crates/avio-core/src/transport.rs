use crate::{DeviceId, TransportError};

/// All device transfers are 32-bit word granular.
pub const WORD_BYTES: u32 = 4;

/// Whether a transport pays a fixed round trip per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// Board sits on a local bus (PCI, PCIe, USB).
    Local,
    /// Board is reached through request/response transactions over a network.
    Network,
}

/// Transfer strategy selected from a transport's capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMode {
    /// One record per call through plain word reads.
    Register,
    /// Batched block reads; each call is one network transaction.
    Network,
    /// Block reads through a DMA buffer of at most `max_words` words.
    Dma { max_words: usize },
}

/// Word-granular access to one channel's address space.
///
/// Offsets are byte offsets from the start of the channel's address space and must be word
/// aligned. Reads take `&mut self` because real transports have side effects (bus
/// transactions, sockets, DMA descriptors).
pub trait Transport {
    fn kind(&self) -> TransportKind;

    fn read_words(
        &mut self,
        dev: &DeviceId,
        offset: u32,
        dst: &mut [u32],
    ) -> Result<(), TransportError>;

    fn write_words(
        &mut self,
        dev: &DeviceId,
        offset: u32,
        src: &[u32],
    ) -> Result<(), TransportError>;

    /// Maximum words per DMA read, or `None` when the transport cannot DMA.
    fn dma_max_words(&self) -> Option<usize> {
        None
    }

    /// Accelerated block read. Transports without DMA fall back to [`Transport::read_words`].
    fn read_words_dma(
        &mut self,
        dev: &DeviceId,
        offset: u32,
        dst: &mut [u32],
    ) -> Result<(), TransportError> {
        self.read_words(dev, offset, dst)
    }

    fn transfer_mode(&self) -> TransferMode {
        if self.kind() == TransportKind::Network {
            return TransferMode::Network;
        }
        match self.dma_max_words() {
            Some(max_words) if max_words > 0 => TransferMode::Dma { max_words },
            _ => TransferMode::Register,
        }
    }

    fn read_u32(&mut self, dev: &DeviceId, offset: u32) -> Result<u32, TransportError> {
        let mut buf = [0u32; 1];
        self.read_words(dev, offset, &mut buf)?;
        Ok(buf[0])
    }

    fn write_u32(&mut self, dev: &DeviceId, offset: u32, value: u32) -> Result<(), TransportError> {
        self.write_words(dev, offset, &[value])
    }

    /// Clears `words` words starting at `offset`.
    fn zero_words(&mut self, dev: &DeviceId, offset: u32, words: usize) -> Result<(), TransportError> {
        const CHUNK_WORDS: usize = 256;
        let zeros = [0u32; CHUNK_WORDS];
        let mut done = 0;
        while done < words {
            let take = (words - done).min(CHUNK_WORDS);
            let at = offset + done as u32 * WORD_BYTES;
            self.write_words(dev, at, &zeros[..take])?;
            done += take;
        }
        Ok(())
    }
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn kind(&self) -> TransportKind {
        (**self).kind()
    }

    fn read_words(
        &mut self,
        dev: &DeviceId,
        offset: u32,
        dst: &mut [u32],
    ) -> Result<(), TransportError> {
        (**self).read_words(dev, offset, dst)
    }

    fn write_words(
        &mut self,
        dev: &DeviceId,
        offset: u32,
        src: &[u32],
    ) -> Result<(), TransportError> {
        (**self).write_words(dev, offset, src)
    }

    fn dma_max_words(&self) -> Option<usize> {
        (**self).dma_max_words()
    }

    fn transfer_mode(&self) -> TransferMode {
        (**self).transfer_mode()
    }

    fn read_words_dma(
        &mut self,
        dev: &DeviceId,
        offset: u32,
        dst: &mut [u32],
    ) -> Result<(), TransportError> {
        (**self).read_words_dma(dev, offset, dst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Backplane, BoardModel, ChannelKind, MemTransport};

    /// Local bus transport whose DMA engine is disabled by firmware.
    struct NoDma(MemTransport);

    impl Transport for NoDma {
        fn kind(&self) -> TransportKind {
            self.0.kind()
        }

        fn read_words(
            &mut self,
            dev: &DeviceId,
            offset: u32,
            dst: &mut [u32],
        ) -> Result<(), TransportError> {
            self.0.read_words(dev, offset, dst)
        }

        fn write_words(
            &mut self,
            dev: &DeviceId,
            offset: u32,
            src: &[u32],
        ) -> Result<(), TransportError> {
            self.0.write_words(dev, offset, src)
        }

        fn dma_max_words(&self) -> Option<usize> {
            self.0.dma_max_words()
        }

        fn transfer_mode(&self) -> TransferMode {
            TransferMode::Register
        }
    }

    #[test]
    fn borrowed_transport_keeps_its_transfer_mode() {
        let mut inner = NoDma(MemTransport::dma(0x100, 64));
        assert_eq!(inner.dma_max_words(), Some(64));
        let borrowed = &mut inner;
        assert_eq!(
            <&mut NoDma as Transport>::transfer_mode(&borrowed),
            TransferMode::Register
        );
        let erased: &mut dyn Transport = &mut inner;
        assert_eq!(
            <&mut dyn Transport as Transport>::transfer_mode(&erased),
            TransferMode::Register
        );
    }

    #[test]
    fn borrowed_transport_forwards_reads() {
        let dev = DeviceId::new(Backplane::Pci, BoardModel::PCIE_1553, 0, ChannelKind::Mil1553, 0);
        let mut inner = MemTransport::local(0x100);
        inner.poke(&dev, 0x10, 42).unwrap();
        let mut borrowed = &mut inner;
        assert_eq!(Transport::read_u32(&mut borrowed, &dev, 0x10).unwrap(), 42);
        assert_eq!(inner.stats().read_calls, 1);
    }
}
