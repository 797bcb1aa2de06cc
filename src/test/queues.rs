use crate::error::SimError;
use crate::net::{Link, LinkConfig, LinkId, NetWorld, Network, NodeId, Packet};
use crate::queue::{DEFAULT_PKT_BYTES, PacketQueue, mem_from_pkt};
use crate::sim::{SimTime, Simulator, Size, Speed};

fn pkt(id: u64, size_bytes: u64) -> Packet {
    Packet::new(id, NodeId(0), NodeId(1), Size::from_bytes(size_bytes))
}

#[test]
fn queue_enforces_capacity_and_preserves_order() {
    let mut q = PacketQueue::new(Size::from_bytes(100));
    assert_eq!(q.capacity(), Size::from_bytes(100));
    assert!(q.is_empty());

    assert!(q.push(pkt(1, 60)).is_ok());
    assert_eq!(q.occupancy(), Size::from_bytes(60));

    let rejected = q.push(pkt(2, 50)).expect_err("should overflow");
    assert_eq!(rejected.id, 2);
    assert_eq!(q.len(), 1);
    assert_eq!(q.occupancy(), Size::from_bytes(60));

    assert!(q.push(pkt(3, 40)).is_ok());
    assert!((q.fill_ratio() - 1.0).abs() < 1e-12);

    assert_eq!(q.front().expect("front").id, 1);
    assert_eq!(q.pop().expect("pkt").id, 1);
    assert_eq!(q.pop().expect("pkt").id, 3);
    assert_eq!(q.occupancy(), Size::ZERO);
}

#[test]
fn empty_queue_front_and_pop_fail() {
    let mut q = PacketQueue::new(Size::from_bytes(10));
    assert!(matches!(q.front(), Err(SimError::EmptyQueue)));
    assert!(matches!(q.pop(), Err(SimError::EmptyQueue)));
}

#[test]
fn zero_capacity_queue_rejects_and_reports_full() {
    let mut q = PacketQueue::new(Size::ZERO);
    assert!(q.push(pkt(1, 1)).is_err());
    assert_eq!(q.fill_ratio(), 1.0);
    // 零字节包不占容量
    assert!(q.push(pkt(2, 0)).is_ok());
    assert_eq!(q.len(), 1);
}

#[test]
fn mem_from_pkt_uses_default_mtu() {
    assert_eq!(mem_from_pkt(4), Size::from_bytes(4 * DEFAULT_PKT_BYTES));
    let cfg = LinkConfig::default().with_buffer_pkts(2);
    assert_eq!(cfg.egress_buffer, Size::from_bytes(3000));
    assert_eq!(cfg.ingress_buffer, Size::from_bytes(3000));
}

#[test]
fn link_tracks_egress_and_ingress_separately() {
    let cfg = LinkConfig {
        speed: Speed::from_gbps(10),
        delay: SimTime(100),
        egress_buffer: Size::from_bytes(3000),
        ingress_buffer: Size::from_bytes(1500),
    };
    let mut link = Link::new(LinkId(0), NodeId(0), NodeId(1), cfg);
    assert_eq!(link.tx_time(Size::from_bytes(1500)), SimTime(1_200));

    assert_eq!(link.push_egress(pkt(1, 1500)), Ok(true));
    assert_eq!(link.push_egress(pkt(2, 1500)), Ok(false));
    assert!(link.push_egress(pkt(3, 1)).is_err());
    assert!((link.egress_fill() - 1.0).abs() < 1e-12);
    assert_eq!(link.head_tx_time(), Some(SimTime(1_200)));

    let p = link.pop_egress().expect("egress head");
    assert_eq!(p.id, 1);
    assert!(link.push_ingress(p).is_ok());
    assert!(link.has_ingress());
    assert_eq!(link.ingress_occupancy(), Size::from_bytes(1500));
    assert_eq!(link.get_packet().map(|p| p.id), Some(1));
    assert!(link.get_packet().is_none());
    assert_eq!(link.egress_occupancy(), Size::from_bytes(1500));
}

#[test]
fn clear_empties_queue_and_occupancy() {
    let mut q = PacketQueue::new(Size::from_bytes(100));
    q.push(pkt(1, 30)).expect("push");
    q.push(pkt(2, 30)).expect("push");
    assert_eq!(q.clear(), 2);
    assert!(q.is_empty());
    assert_eq!(q.occupancy(), Size::ZERO);
    assert!(q.push(pkt(3, 100)).is_ok());
}

#[test]
fn link_delivers_back_to_back_in_fifo_order() {
    let mut net = Network::new(0);
    let a = net.add_host("a");
    let b = net.add_host("b");
    let cfg = LinkConfig {
        speed: Speed::from_gbps(1),
        delay: SimTime(100),
        egress_buffer: Size::from_kib(64),
        ingress_buffer: Size::from_kib(64),
    };
    let link = net.connect(a, b, cfg).expect("link");

    let mut sim = Simulator::default();
    let mut ids = Vec::new();
    for _ in 0..3 {
        let p = Packet::new(net.next_packet_id(), a, b, Size::from_bytes(1000));
        ids.push(p.id);
        net.schedule_arrival(link, p, &mut sim);
    }

    // 每个 tick 之后看入口队首：新出现的包即为刚到达的包
    let mut world = NetWorld::new(net);
    let mut arrivals: Vec<(u64, SimTime)> = Vec::new();
    while sim.tick(&mut world) {
        let l = world.net.link(link).expect("link");
        if let Ok(head) = l.ingress.front() {
            if arrivals.last().map(|(id, _)| *id) != Some(head.id) {
                arrivals.push((head.id, sim.now()));
            }
        }
    }

    // 1000B @ 1Gbps = 8000ns 序列化，背靠背，再加 100ns 传播
    assert_eq!(
        arrivals,
        vec![
            (ids[0], SimTime(8_100)),
            (ids[1], SimTime(16_100)),
            (ids[2], SimTime(24_100)),
        ]
    );
    assert_eq!(world.net.host(b).expect("b").received(), 3);
    assert_eq!(world.net.stats.delivered_pkts, 3);
}
