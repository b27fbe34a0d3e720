#![allow(dead_code)]

use avio::{Backplane, BoardModel, Cdp, ChannelKind, DeviceId};
use tracing_subscriber::EnvFilter;

/// Routes library events to the test output. Set `RUST_LOG=avio=trace` to see them.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn bus_monitor(backplane: Backplane, instance: u8) -> DeviceId {
    DeviceId::new(backplane, BoardModel::PCIE_1553, 0, ChannelKind::Mil1553, instance)
}

pub fn a429(backplane: Backplane, instance: u8) -> DeviceId {
    DeviceId::new(backplane, BoardModel::ENET_MULTI, 0, ChannelKind::Arinc429, instance)
}

/// A CDP whose first data word identifies it.
pub fn numbered_cdp(n: u16) -> Cdp {
    let mut cdp = Cdp {
        cmd1: (1 << 11) | 1,
        timestamp: u64::from(n),
        ..Cdp::default()
    };
    cdp.data[0] = n;
    cdp
}
