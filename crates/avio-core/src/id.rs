use core::fmt;

use serde::{Deserialize, Serialize};

/// How the board is attached to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backplane {
    Pci,
    PciExpress,
    Usb,
    /// Network-attached chassis; every access is a request/response transaction.
    Ethernet,
}

impl Backplane {
    pub fn is_network(self) -> bool {
        matches!(self, Backplane::Ethernet)
    }
}

/// Board model number. Arena regions are looked up per model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BoardModel(pub u16);

impl BoardModel {
    /// Four-channel MIL-STD-1553 PCI Express card.
    pub const PCIE_1553: BoardModel = BoardModel(0x1553);
    /// Mixed 1553 / ARINC-429 PMC module.
    pub const PMC_MULTI: BoardModel = BoardModel(0x1429);
    /// ARINC-429 PCI Express card.
    pub const PCIE_A429: BoardModel = BoardModel(0x0429);
    /// Ethernet-attached 1553 + ARINC-429 chassis.
    pub const ENET_MULTI: BoardModel = BoardModel(0xE153);
    /// USB 1553 adapter.
    pub const USB_1553: BoardModel = BoardModel(0x0153);
}

impl fmt::Display for BoardModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04x}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    Mil1553,
    Arinc429,
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelKind::Mil1553 => f.write_str("1553"),
            ChannelKind::Arinc429 => f.write_str("a429"),
        }
    }
}

/// Identity of one protocol channel on one board.
///
/// Two identities never share device memory; every arena and ring is scoped to exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeviceId {
    pub backplane: Backplane,
    pub board: BoardModel,
    pub board_instance: u8,
    pub channel: ChannelKind,
    pub channel_instance: u8,
}

impl DeviceId {
    pub const fn new(
        backplane: Backplane,
        board: BoardModel,
        board_instance: u8,
        channel: ChannelKind,
        channel_instance: u8,
    ) -> Self {
        Self {
            backplane,
            board,
            board_instance,
            channel,
            channel_instance,
        }
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?}/{}#{}/{}#{}",
            self.backplane, self.board, self.board_instance, self.channel, self.channel_instance
        )
    }
}
