use crate::cc::{BasicCc, TcpCc};
use crate::conn::{AddDataToConnection, RoundRobinMplb};
use crate::error::SimError;
use crate::net::{LinkId, NetWorld, Network, NodeId, NodeKind};
use crate::proto::TcpFlowConfig;
use crate::sim::{SimTime, Simulator, Size};
use crate::topo::{
    DumbbellOpts, FatTreeOpts, RouteEntry, build_dumbbell, build_fat_tree, shortest_path_routes,
};
use std::collections::HashSet;

fn routes_from(routes: &[RouteEntry], node: usize, dest: usize) -> Vec<(LinkId, u32)> {
    let mut out: Vec<_> = routes
        .iter()
        .filter(|r| r.node == NodeId(node) && r.dest == NodeId(dest))
        .map(|r| (r.link, r.paths))
        .collect();
    out.sort();
    out
}

#[test]
fn diamond_counts_every_shortest_path() {
    // 0 -> {1, 2} -> 3，另有一条 1 -> 3 的并行链路
    let adj = vec![
        vec![(LinkId(0), NodeId(1)), (LinkId(1), NodeId(2))],
        vec![(LinkId(2), NodeId(3)), (LinkId(4), NodeId(3))],
        vec![(LinkId(3), NodeId(3))],
        vec![],
    ];
    let routes = shortest_path_routes(4, &adj);

    assert_eq!(routes_from(&routes, 1, 3), vec![(LinkId(2), 1), (LinkId(4), 1)]);
    assert_eq!(routes_from(&routes, 2, 3), vec![(LinkId(3), 1)]);
    // 经 1 有两条，经 2 有一条
    assert_eq!(routes_from(&routes, 0, 3), vec![(LinkId(0), 2), (LinkId(1), 1)]);
    // 没有反向链路
    assert!(routes_from(&routes, 3, 0).is_empty());
}

#[test]
fn longer_paths_are_not_routes() {
    // 0 -> 1 -> 2 以及直连 0 -> 2
    let adj = vec![
        vec![(LinkId(0), NodeId(1)), (LinkId(2), NodeId(2))],
        vec![(LinkId(1), NodeId(2))],
        vec![],
    ];
    let routes = shortest_path_routes(3, &adj);
    assert_eq!(routes_from(&routes, 0, 2), vec![(LinkId(2), 1)]);
    assert_eq!(routes_from(&routes, 0, 1), vec![(LinkId(0), 1)]);
}

#[test]
fn fat_tree_counts_and_indexing() {
    let mut net = Network::new(0);
    let opts = FatTreeOpts::default();
    let topo = build_fat_tree(&mut net, &opts).expect("fat tree");

    let half = opts.k / 2;
    assert_eq!(topo.hosts.len(), opts.k * half * half);
    assert_eq!(topo.edge_switches.len(), opts.k * half);
    assert_eq!(topo.agg_switches.len(), opts.k * half);
    assert_eq!(topo.core_switches.len(), half * half);

    let mut seen = HashSet::new();
    for pod in 0..opts.k {
        for edge in 0..half {
            for host in 0..half {
                let h = topo.host(pod, edge, host);
                assert!(seen.insert(h), "duplicate host {h:?}");
                assert!(net.host(h).is_some());
            }
            assert!(net.switch(topo.edge(pod, edge)).is_some());
        }
    }
    assert_eq!(seen.len(), topo.hosts.len());

    let hosts: HashSet<_> = net.nodes_of(NodeKind::Host).collect();
    assert_eq!(hosts, seen);
    let switches = net.nodes_of(NodeKind::Switch).count();
    assert_eq!(switches, opts.k * half * 2 + half * half);
    assert_eq!(
        net.node(topo.core_switches[0]).map(|n| n.kind()),
        Some(NodeKind::Switch)
    );
}

#[test]
fn fat_tree_route_weights_follow_path_counts() {
    let mut net = Network::new(0);
    let opts = FatTreeOpts::default();
    let topo = build_fat_tree(&mut net, &opts).expect("fat tree");
    let half = (opts.k / 2) as u32;

    let dst = topo.host(1, 0, 0);

    // 主机只有一条上行链路，承载全部 (k/2)^2 条路径
    let src = topo.host(0, 0, 0);
    let host_routes = net
        .node(src)
        .and_then(|n| n.routing().routes_to(dst))
        .expect("host routes");
    assert_eq!(host_routes.len(), 1);
    assert_eq!(host_routes.values().copied().sum::<u32>(), half * half);

    // edge 交换机的每条 agg 上行链路各 k/2 条
    let edge_routes = net
        .node(topo.edge(0, 0))
        .and_then(|n| n.routing().routes_to(dst))
        .expect("edge routes");
    assert_eq!(edge_routes.len(), half as usize);
    assert!(edge_routes.values().all(|&w| w == half));

    // 同 edge 下的主机只走下行链路
    let neighbour = topo.host(0, 0, 1);
    let local = net
        .node(topo.edge(0, 0))
        .and_then(|n| n.routing().routes_to(neighbour))
        .expect("local routes");
    assert_eq!(local.len(), 1);
    assert_eq!(local.values().copied().sum::<u32>(), 1);
}

#[test]
fn fat_tree_rejects_odd_arity() {
    let mut net = Network::new(0);
    for k in [0, 3, 5] {
        let opts = FatTreeOpts {
            k,
            ..FatTreeOpts::default()
        };
        let err = build_fat_tree(&mut net, &opts).unwrap_err();
        assert!(matches!(err, SimError::InvalidParameter { name: "k", .. }));
    }
}

#[test]
fn dumbbell_delivers_data_end_to_end() {
    let mut net = Network::new(5);
    let d = build_dumbbell(&mut net, &DumbbellOpts::default()).expect("dumbbell");
    let conn = net
        .add_connection(d.h0, d.h1, Box::new(RoundRobinMplb::new()))
        .expect("connection");
    // 往返约 12us，初始 RTO 需要盖过它
    let cfg = TcpFlowConfig {
        initial_rto: SimTime::from_micros(100),
        ..TcpFlowConfig::default()
    };
    let flow = net
        .add_tcp_flow(conn, TcpCc::Basic(BasicCc), cfg)
        .expect("flow");

    let mut sim = Simulator::default();
    let mut world = NetWorld::new(net);
    sim.schedule(
        SimTime::ZERO,
        AddDataToConnection {
            conn,
            size: Size::from_bytes(4 * 1500),
        },
    );
    sim.run(&mut world);

    let net = &world.net;
    let f = net.flow(flow).expect("flow");
    assert_eq!(f.delivered_data_size(), Size::from_bytes(4 * 1500));
    assert_eq!(f.packets_in_flight(), 0);
    assert!(f.fct().is_some());
    assert_eq!(f.retransmit_count(), 0);
    assert_eq!(net.stats.dropped_pkts, 0);
    // 每个包穿过两台交换机，往返各一次
    let forwarded =
        net.switch(d.s0).expect("s0").forwarded() + net.switch(d.s1).expect("s1").forwarded();
    assert_eq!(forwarded, 4 * 2 * 2);
}
