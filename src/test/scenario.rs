use crate::cc::TcpCc;
use crate::conn::MplbKind;
use crate::error::SimError;
use crate::net::{HasherKind, NetWorld, Network};
use crate::scenario::{ActionSpec, Scenario, ScenarioSpec};
use crate::sim::{SimTime, Simulator, Size};

const LINE: &str = r#"{
    "seed": 7,
    "hosts": [{ "name": "a" }, { "name": "b" }],
    "switches": [
        { "name": "s", "hasher": { "kind": "symmetric" }, "ecn": { "min": 0.2, "max": 0.8, "probability": 0.5 } }
    ],
    "links": [
        { "from": "a", "to": "s", "latency_ns": 300, "speed_gbps": 1000,
          "egress_buffer_bytes": 65536, "ingress_buffer_bytes": 65536 },
        { "from": "s", "to": "b", "latency_ns": 300, "speed_gbps": 1000,
          "egress_buffer_bytes": 65536, "ingress_buffer_bytes": 65536 }
    ],
    "connections": [
        {
            "name": "c0",
            "sender": "a",
            "receiver": "b",
            "flows": [
                { "cc": { "kind": "basic" }, "initial_rto": 100000 },
                { "cc": { "kind": "tahoe" }, "initial_rto": 100000, "ack_mode": "cumulative" }
            ]
        }
    ],
    "actions": [
        { "action": "send_data", "at_ns": 0, "connection": "c0", "bytes": 4500,
          "repeat_count": 2, "repeat_interval_ns": 50000 }
    ]
}"#;

fn build(spec: &ScenarioSpec) -> Result<(Scenario, NetWorld, Simulator), SimError> {
    let mut net = Network::new(spec.seed.unwrap_or(0));
    let mut sim = Simulator::default();
    let sc = Scenario::build(spec, &mut net, &mut sim)?;
    Ok((sc, NetWorld::new(net), sim))
}

fn delivered(net: &Network) -> Size {
    net.flows()
        .map(|f| f.delivered_data_size())
        .fold(Size::ZERO, |acc, s| acc + s)
}

#[test]
fn parses_defaults_and_nested_configs() {
    let spec = ScenarioSpec::from_json(LINE).expect("parse");
    assert_eq!(spec.seed, Some(7));
    assert_eq!(spec.switches[0].config.hasher, HasherKind::Symmetric);
    assert!(spec.switches[0].config.ecn.is_some());
    assert!(spec.links.iter().all(|l| l.bidirectional));
    assert_eq!(spec.connections[0].mplb, MplbKind::RoundRobin);
    let flows = &spec.connections[0].flows;
    assert_eq!(flows.len(), 2);
    assert_eq!(flows[0].tcp.initial_rto, SimTime::from_micros(100));
    // 未给出的字段走默认值
    assert_eq!(flows[0].tcp.packet_size, Size::from_bytes(1500));
    match &spec.actions[0] {
        ActionSpec::SendData {
            repeat_count,
            connections,
            ..
        } => {
            assert_eq!(*repeat_count, 2);
            assert!(connections.is_empty());
        }
        other => panic!("unexpected action {other:?}"),
    }
}

#[test]
fn builds_and_runs_line_scenario() {
    let spec = ScenarioSpec::from_json(LINE).expect("parse");
    let (sc, mut world, mut sim) = build(&spec).expect("build");

    assert_eq!(sc.nodes.len(), 3);
    // 默认双向
    assert_eq!(sc.links.len(), 4);
    assert_eq!(sc.flows.len(), 2);
    let conn = sc.connections["c0"];
    assert_eq!(
        world.net.connection(conn).expect("conn").flows().count(),
        2
    );
    assert!(matches!(
        world.net.flow(sc.flows[1]).expect("flow").cc(),
        TcpCc::Tahoe(_)
    ));

    sim.run(&mut world);

    let net = &world.net;
    assert_eq!(delivered(net), Size::from_bytes(2 * 4500));
    assert_eq!(net.connection(conn).expect("conn").total_data_added(), Size::from_bytes(9000));
    assert_eq!(net.connection(conn).expect("conn").data_to_send(), Size::ZERO);
    assert!(net.flows().all(|f| f.packets_in_flight() == 0));
}

#[test]
fn stop_action_cuts_the_run_short() {
    let mut spec = ScenarioSpec::from_json(LINE).expect("parse");
    spec.actions.push(ActionSpec::Stop { at_ns: 20_000 });
    let (_sc, mut world, mut sim) = build(&spec).expect("build");

    sim.run(&mut world);

    // 第二批在 50us 才加入，已被 Stop 丢弃
    assert_eq!(sim.now(), SimTime::from_micros(20));
    assert_eq!(delivered(&world.net), Size::from_bytes(4500));
    assert!(sim.is_empty());
}

#[test]
fn default_link_buffer_overflows_on_a_burst() {
    let mut spec = ScenarioSpec::from_json(LINE).expect("parse");
    for link in &mut spec.links {
        link.egress_buffer_bytes = None;
        link.ingress_buffer_bytes = None;
    }
    let (_sc, mut world, mut sim) = build(&spec).expect("build");
    sim.run(&mut world);

    // 4 KiB 只装得下两个 1500 B 的包，第三个背靠背的包在出口溢出
    let net = &world.net;
    assert!(net.stats.egress_overflow_drops > 0);
    let retransmits: u64 = net.flows().map(|f| f.retransmit_count()).sum();
    assert!(retransmits > 0);
}

#[test]
fn unknown_names_are_rejected() {
    let mut spec = ScenarioSpec::from_json(LINE).expect("parse");
    spec.links[0].to = "nowhere".to_string();
    assert!(matches!(build(&spec), Err(SimError::Scenario(_))));

    let mut spec = ScenarioSpec::from_json(LINE).expect("parse");
    spec.connections[0].receiver = "ghost".to_string();
    assert!(matches!(build(&spec), Err(SimError::Scenario(_))));

    let mut spec = ScenarioSpec::from_json(LINE).expect("parse");
    spec.actions.push(ActionSpec::SendData {
        at_ns: 0,
        connection: Some("c9".to_string()),
        connections: Vec::new(),
        bytes: 1,
        repeat_count: 1,
        repeat_interval_ns: 0,
    });
    assert!(matches!(build(&spec), Err(SimError::Scenario(_))));
}

#[test]
fn duplicate_names_and_empty_targets_are_rejected() {
    let mut spec = ScenarioSpec::from_json(LINE).expect("parse");
    spec.hosts.push(spec.hosts[0].clone());
    assert!(matches!(build(&spec), Err(SimError::Scenario(_))));

    let mut spec = ScenarioSpec::from_json(LINE).expect("parse");
    spec.connections.push(spec.connections[0].clone());
    assert!(matches!(build(&spec), Err(SimError::Scenario(_))));

    let mut spec = ScenarioSpec::from_json(LINE).expect("parse");
    spec.actions = vec![ActionSpec::SendData {
        at_ns: 0,
        connection: None,
        connections: Vec::new(),
        bytes: 1,
        repeat_count: 1,
        repeat_interval_ns: 0,
    }];
    assert!(matches!(build(&spec), Err(SimError::Scenario(_))));
}

#[test]
fn invalid_flow_config_surfaces_as_error() {
    let mut spec = ScenarioSpec::from_json(LINE).expect("parse");
    spec.connections[0].flows[0].tcp.packet_size = Size::ZERO;
    assert!(matches!(
        build(&spec),
        Err(SimError::InvalidParameter { .. })
    ));
}

#[test]
fn malformed_json_is_a_json_error() {
    let err = ScenarioSpec::from_json(r#"{ "hosts": 3 }"#).unwrap_err();
    assert!(matches!(err, SimError::Json(_)));
}
