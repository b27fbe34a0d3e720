use avio_channel::{
    Cdp, Devices, Engine, Interrupt, IqCause, Rxp, CDP_MARKER, NO_CONTROL_BLOCK, RXP_MARKER,
};
use avio_core::{Backplane, BoardModel, ChannelKind, DeviceId, Error, MemTransport};
use avio_ring::Ring;
use pretty_assertions::assert_eq;

const SPACE: u32 = 0x8_0000;

fn bm() -> DeviceId {
    DeviceId::new(Backplane::PciExpress, BoardModel::PCIE_1553, 0, ChannelKind::Mil1553, 2)
}

fn a429() -> DeviceId {
    DeviceId::new(Backplane::Ethernet, BoardModel::ENET_MULTI, 0, ChannelKind::Arinc429, 0)
}

fn cdp(n: u16) -> Cdp {
    Cdp {
        cmd1: (3 << 11) | (1 << 10) | 2,
        sts1: 3 << 11,
        timestamp: u64::from(n) * 100,
        data: {
            let mut data = [0u16; 32];
            data[0] = n;
            data
        },
        ..Cdp::default()
    }
}

#[test]
fn captured_messages_raise_interrupts_that_name_them() {
    let mut devices = Devices::new();
    let mut t = MemTransport::local(SPACE);
    let ch = devices.open(bm()).unwrap();
    ch.create_monitor_ring(&mut t, 8).unwrap();
    ch.create_interrupt_queue(&mut t, 16).unwrap();

    let mut engine = Engine::new();
    for n in 0..3 {
        let offset = engine.capture(ch, &mut t, &cdp(n)).unwrap().unwrap();
        engine
            .interrupt(ch, &mut t, IqCause::BusMonitor, offset)
            .unwrap()
            .unwrap();
    }
    engine
        .interrupt(ch, &mut t, IqCause::BcAperiodicStop, 0)
        .unwrap()
        .unwrap();

    let mut irqs = Vec::new();
    assert_eq!(ch.read_interrupts(&mut t, 10, &mut irqs).unwrap(), 4);
    let infos: Vec<u32> = irqs.iter().map(|irq| irq.info).collect();
    assert_eq!(
        infos,
        vec![CDP_MARKER | 1, CDP_MARKER | 2, CDP_MARKER | 3, NO_CONTROL_BLOCK]
    );
    assert_eq!(
        irqs.iter().map(|irq| irq.sequence).collect::<Vec<_>>(),
        vec![0, 1, 2, 3]
    );
    assert_eq!(ch.read_interrupts(&mut t, 10, &mut irqs), Err(Error::NoNewEntry));

    let mut cdps = Vec::new();
    assert_eq!(ch.read_monitor(&mut t, 10, &mut cdps).unwrap(), 3);
    for (n, cdp) in cdps.iter().enumerate() {
        assert_eq!(cdp.data[0], n as u16);
        assert_eq!(cdp.slot(), Some(n + 1));
        assert_eq!(cdp.rt_address(), 3);
        assert_eq!(cdp.word_count(), 2);
    }
}

#[test]
fn interrupt_bulk_read_stops_at_max() {
    let mut devices = Devices::new();
    let mut t = MemTransport::local(SPACE);
    let ch = devices.open(bm()).unwrap();
    ch.create_interrupt_queue(&mut t, 8).unwrap();
    let mut engine = Engine::new();
    for _ in 0..5 {
        engine
            .interrupt(ch, &mut t, IqCause::SignalGenerator, 0x2000)
            .unwrap()
            .unwrap();
    }

    let mut irqs: Vec<Interrupt> = Vec::new();
    assert_eq!(ch.read_interrupts(&mut t, 3, &mut irqs).unwrap(), 3);
    assert_eq!(ch.interrupt_pending(&mut t).unwrap(), 2);
    assert_eq!(ch.read_interrupts(&mut t, 3, &mut irqs).unwrap(), 2);
    assert!(irqs.iter().all(|irq| irq.info == 0x2000));
}

#[test]
fn failed_dereference_leaves_the_interrupt_pending() {
    let mut devices = Devices::new();
    let mut t = MemTransport::local(SPACE);
    let ch = devices.open(bm()).unwrap();
    ch.create_interrupt_queue(&mut t, 4).unwrap();
    let mut engine = Engine::new();
    engine
        .interrupt(ch, &mut t, IqCause::BcControlBlock, 0x3000)
        .unwrap()
        .unwrap();
    t.poke(&bm(), 0x3000 + 4, 42).unwrap();

    // Positions (2 reads) and the entry itself succeed; the control block read fails.
    t.fail_read_after(3);
    assert!(matches!(ch.read_interrupt(&mut t), Err(Error::Transport(_))));
    assert_eq!(ch.interrupt_pending(&mut t).unwrap(), 1);

    let irq = ch.read_interrupt(&mut t).unwrap();
    assert_eq!(irq.cause, IqCause::BcControlBlock);
    assert_eq!(irq.info, 42);
}

#[test]
fn receive_tables_wrap_over_a_network_transport() {
    let mut devices = Devices::new();
    let mut t = MemTransport::network(SPACE);
    let ch = devices.open(a429()).unwrap();
    ch.create_receive_table(&mut t, 1, 5).unwrap();
    ch.create_mcrx_table(&mut t, 5).unwrap();
    let mut engine = Engine::new();

    let mut seen = Vec::new();
    for round in 0..4u32 {
        for i in 0..3 {
            let word = (round << 16) | (i << 8) | 0x5a;
            let rxp = Rxp {
                data: word,
                channel: 1,
                ..Rxp::default()
            };
            engine.receive(ch, &mut t, 1, &rxp).unwrap().unwrap();
            engine.receive_multi(ch, &mut t, &rxp).unwrap().unwrap();
        }
        let mut out = Vec::new();
        assert_eq!(ch.read_receive(&mut t, 1, 90, &mut out).unwrap(), 3);
        let mut multi = Vec::new();
        assert_eq!(ch.read_mcrx(&mut t, 90, &mut multi).unwrap(), 3);
        assert_eq!(
            out.iter().map(|r| r.data).collect::<Vec<_>>(),
            multi.iter().map(|r| r.data).collect::<Vec<_>>()
        );
        seen.extend(out);
    }

    assert_eq!(seen.len(), 12);
    for (n, rxp) in seen.iter().enumerate() {
        let (round, i) = (n as u32 / 3, n as u32 % 3);
        assert_eq!(rxp.data, (round << 16) | (i << 8) | 0x5a);
        assert_eq!(rxp.label(), 0x5a);
        assert_eq!(rxp.api_info, RXP_MARKER | (n as u32 % 5));
    }
    assert_eq!(engine.dropped(), 0);
}

#[test]
fn slot_writes_keep_the_capture_ring_intact() {
    let mut devices = Devices::new();
    let mut t = MemTransport::dma(SPACE, 128);
    let ch = devices.open(bm()).unwrap();
    ch.create_monitor_ring(&mut t, 4).unwrap();

    let mut replacement = cdp(9);
    replacement.next = 0;
    ch.write_monitor_slot(&mut t, 2, &replacement).unwrap();
    let back = ch.read_monitor_slot(&mut t, 2).unwrap();
    let ring = ch.monitor_ring().unwrap();
    assert_eq!(back.next, ring.slot_offset(3));
    assert_eq!(back.data[0], 9);

    let mut engine = Engine::new();
    for n in 0..3 {
        engine.capture(ch, &mut t, &cdp(n)).unwrap().unwrap();
    }
    let mut out = Vec::new();
    assert_eq!(ch.read_monitor(&mut t, 10, &mut out).unwrap(), 3);
    assert_eq!(
        out.iter().map(|c| c.data[0]).collect::<Vec<_>>(),
        vec![0, 1, 2]
    );
    assert!(t.stats().dma_calls > 0);
}
