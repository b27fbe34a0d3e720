use avio_arena::{LayoutTable, Region};
use avio_core::{DeviceId, DeviceTable, Error, Result, Transport, WORD_BYTES};
use tracing::debug;

use crate::channel::Channel;
use crate::config::ChannelConfig;

/// Every open channel, keyed by device identity.
///
/// `&mut self` on the mutating methods and [`Devices::channel_mut`] is the per-device write
/// capability: while a caller holds a channel mutably, nothing else can allocate from its
/// arena or consume its rings.
#[derive(Debug, Default)]
pub struct Devices {
    channels: DeviceTable<Channel>,
    layout: LayoutTable,
    config: ChannelConfig,
}

impl Devices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_layout(mut self, layout: LayoutTable) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_config(mut self, config: ChannelConfig) -> Self {
        self.config = config;
        self
    }

    pub fn layout(&self) -> &LayoutTable {
        &self.layout
    }

    /// Creates the channel's arena over `region`.
    ///
    /// A channel that is already open is returned unchanged, whatever `region` says.
    pub fn init_arena(&mut self, id: DeviceId, region: Region) -> Result<&mut Channel> {
        let config = &self.config;
        self.channels.get_or_try_insert_with(id, || {
            if region.size == 0 {
                return Err(Error::InvalidArgument("arena region must be non-empty"));
            }
            if region.start % WORD_BYTES != 0 {
                return Err(Error::InvalidArgument("arena region must be word aligned"));
            }
            if !region.is_addressable() {
                return Err(Error::InvalidArgument(
                    "arena region extends past the device address space",
                ));
            }
            debug!(dev = %id, start = region.start, size = region.size, "channel opened");
            Ok(Channel::new(id, region, config.clone()))
        })
    }

    /// Opens the channel with the arena region the layout table assigns to its board model
    /// and channel kind.
    pub fn open(&mut self, id: DeviceId) -> Result<&mut Channel> {
        let region = self.layout.lookup(id.board, id.channel).ok_or(Error::InvalidArgument(
            "no arena layout for this board model and channel kind",
        ))?;
        self.init_arena(id, region)
    }

    /// Releases every ring of the channel and forgets it.
    ///
    /// The channel is forgotten even if releasing fails; a later open starts from a fresh
    /// arena.
    pub fn close(&mut self, id: &DeviceId, transport: &mut dyn Transport) -> Result<()> {
        let mut channel = self.channels.remove(id)?;
        channel.release(transport)?;
        debug!(dev = %id, "channel closed");
        Ok(())
    }

    pub fn is_open(&self, id: &DeviceId) -> bool {
        self.channels.contains(id)
    }

    pub fn channel(&self, id: &DeviceId) -> Result<&Channel> {
        self.channels.get(id)
    }

    pub fn channel_mut(&mut self, id: &DeviceId) -> Result<&mut Channel> {
        self.channels.get_mut(id)
    }

    pub fn allocate(
        &mut self,
        id: &DeviceId,
        transport: &mut dyn Transport,
        size: u32,
    ) -> Result<u32> {
        self.channels.get_mut(id)?.allocate(transport, size)
    }

    pub fn free(&mut self, id: &DeviceId, offset: u32, size: u32) -> Result<()> {
        self.channels.get_mut(id)?.free(offset, size)
    }

    pub fn available(&self, id: &DeviceId) -> Result<u32> {
        Ok(self.channels.get(id)?.available())
    }

    pub fn ids(&self) -> impl Iterator<Item = &DeviceId> {
        self.channels.ids()
    }
}
