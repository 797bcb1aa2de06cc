use std::collections::{BTreeSet, HashMap};

use crate::error::SimError;
use crate::net::{
    AdaptiveFlowletHasher, EcmpHasher, FlowId, FlowletHasher, HasherKind, Link, LinkConfig,
    LinkId, LoopCursor, NodeId, Packet, PacketHasher, RoutingModule, SymmetricHasher,
};
use crate::proto::tcp_flags;
use crate::sim::{SimTime, Size};

fn link(id: usize, from: usize, to: usize) -> Link {
    Link::new(LinkId(id), NodeId(from), NodeId(to), LinkConfig::default())
}

fn flow_pkt(flow: usize, src: usize, dst: usize) -> Packet {
    let mut p = Packet::new(0, NodeId(src), NodeId(dst), Size::from_bytes(100));
    p.flow = Some(FlowId(flow));
    p
}

#[test]
fn routing_module_checks_link_endpoints() {
    let mut rm = RoutingModule::new(NodeId(1));
    assert_eq!(rm.add_inlink(&link(0, 0, 1)).expect("inlink"), true);
    assert_eq!(rm.add_inlink(&link(0, 0, 1)).expect("dup inlink"), false);
    assert!(matches!(
        rm.add_inlink(&link(1, 1, 2)),
        Err(SimError::InvalidLinkEndpoint { .. })
    ));
    assert_eq!(rm.add_outlink(&link(1, 1, 2)).expect("outlink"), true);
    assert!(rm.add_outlink(&link(0, 0, 1)).is_err());
    assert!(rm.update_routing_table(NodeId(2), &link(0, 0, 1), 1).is_err());
}

#[test]
fn routing_table_weights_accumulate() {
    let mut rm = RoutingModule::new(NodeId(0));
    let a = link(0, 0, 1);
    rm.update_routing_table(NodeId(9), &a, 2).expect("route");
    rm.update_routing_table(NodeId(9), &a, 3).expect("route");
    assert_eq!(rm.routes_to(NodeId(9)).and_then(|m| m.get(&LinkId(0))), Some(&5));
    assert!(rm.routes_to(NodeId(8)).is_none());
}

#[test]
fn weighted_selection_follows_path_counts() {
    let mut rm = RoutingModule::new(NodeId(0));
    rm.update_routing_table(NodeId(9), &link(0, 0, 1), 1).expect("route");
    rm.update_routing_table(NodeId(9), &link(1, 0, 2), 3).expect("route");

    let mut counts: HashMap<LinkId, u32> = HashMap::new();
    for flow in 0..4000 {
        let (l, _) = rm
            .get_link_to_destination(&flow_pkt(flow, 0, 9), SimTime::ZERO)
            .expect("route exists");
        *counts.entry(l).or_default() += 1;
    }
    let light = counts.get(&LinkId(0)).copied().unwrap_or(0);
    let heavy = counts.get(&LinkId(1)).copied().unwrap_or(0);
    assert_eq!(light + heavy, 4000);
    // 期望 1000 / 3000
    assert!((800..=1200).contains(&light), "light={light} heavy={heavy}");
}

#[test]
fn missing_route_and_forgotten_link_yield_none() {
    let mut rm = RoutingModule::new(NodeId(0));
    let l = link(0, 0, 1);
    rm.add_outlink(&l).expect("outlink");
    rm.update_routing_table(NodeId(1), &l, 1).expect("route");
    let p = flow_pkt(0, 0, 1);
    assert_eq!(rm.get_link_to_destination(&p, SimTime::ZERO).map(|r| r.0), Some(LinkId(0)));

    rm.forget_link(LinkId(0));
    assert!(rm.get_link_to_destination(&p, SimTime::ZERO).is_none());
    assert!(rm.outlinks().is_empty());
    assert!(rm.get_link_to_destination(&flow_pkt(0, 0, 5), SimTime::ZERO).is_none());
}

#[test]
fn inlinks_are_served_round_robin() {
    let mut rm = RoutingModule::new(NodeId(3));
    for id in [4, 1, 7] {
        rm.add_inlink(&link(id, 0, 3)).expect("inlink");
    }
    let order: Vec<LinkId> = (0..5).filter_map(|_| rm.next_inlink()).collect();
    assert_eq!(
        order,
        vec![LinkId(1), LinkId(4), LinkId(7), LinkId(1), LinkId(4)]
    );
}

#[test]
fn loop_cursor_survives_mutation() {
    let mut keys: BTreeSet<u32> = [1, 2, 3, 4].into_iter().collect();
    let mut cur = LoopCursor::new();
    assert_eq!(cur.advance(&keys), Some(1));
    assert_eq!(cur.advance(&keys), Some(2));

    // 删掉游标所在元素：不跳过下一个
    keys.remove(&2);
    assert_eq!(cur.advance(&keys), Some(3));

    // 在游标之前插入：这一圈不重复服务，下一圈才轮到
    keys.insert(0);
    assert_eq!(cur.advance(&keys), Some(4));
    assert_eq!(cur.advance(&keys), Some(0));
    assert_eq!(cur.rotation(&keys), vec![1, 3, 4, 0]);

    keys.clear();
    assert_eq!(cur.advance(&keys), None);
}

#[test]
fn ecmp_is_stable_per_flow_and_symmetric_ignores_direction() {
    let mut ecmp = EcmpHasher;
    let a = ecmp.hash(&flow_pkt(3, 1, 2), SimTime(0));
    let b = ecmp.hash(&flow_pkt(3, 1, 2), SimTime(500));
    assert_eq!(a, b);

    let mut sym = SymmetricHasher;
    assert_eq!(
        sym.hash(&flow_pkt(3, 1, 2), SimTime(0)),
        sym.hash(&flow_pkt(3, 2, 1), SimTime(0))
    );
}

#[test]
fn salted_ecmp_differs_between_devices() {
    let mut h0 = HasherKind::SaltEcmp.build(NodeId(0), 0);
    let mut h1 = HasherKind::SaltEcmp.build(NodeId(1), 0);
    let differing = (0..64)
        .filter(|f| {
            let p = flow_pkt(*f, 0, 1);
            h0.hash(&p, SimTime::ZERO) != h1.hash(&p, SimTime::ZERO)
        })
        .count();
    assert!(differing > 32);
}

#[test]
fn random_hasher_is_reproducible_with_same_seed() {
    let mut a = HasherKind::Random.build(NodeId(0), 11);
    let mut b = HasherKind::Random.build(NodeId(0), 11);
    let p = flow_pkt(0, 0, 1);
    for _ in 0..16 {
        assert_eq!(a.hash(&p, SimTime::ZERO), b.hash(&p, SimTime::ZERO));
    }
}

#[test]
fn flowlet_shifts_only_after_idle_gap() {
    let mut h = FlowletHasher::new(SimTime(100));
    let p = flow_pkt(5, 0, 1);
    let h0 = h.hash(&p, SimTime(0));
    assert_eq!(h.hash(&p, SimTime(50)), h0);
    assert_eq!(h.hash(&p, SimTime(150)), h0);
    assert_eq!(h.hash(&p, SimTime(400)), h0.wrapping_add(1));
}

#[test]
fn adaptive_flowlet_keeps_shift_without_rtt_flag() {
    let mut h = AdaptiveFlowletHasher::new(0.5);
    let mut p = flow_pkt(5, 0, 1);
    let h0 = h.hash(&p, SimTime(0));
    // 没有 avg_rtt 标志：间隔再大也不换路径
    assert_eq!(h.hash(&p, SimTime(1_000_000)), h0);

    tcp_flags::set_avg_rtt(&mut p.flags, SimTime(1_000)).expect("rtt flag");
    // 阈值 500ns
    assert_eq!(h.hash(&p, SimTime(1_000_400)), h0);
    assert_eq!(h.hash(&p, SimTime(1_001_000)), h0.wrapping_add(1));
}
