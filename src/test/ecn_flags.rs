use crate::error::SimError;
use crate::net::{Ecn, FlagManager, PacketFlags, SchedulingGate};
use crate::proto::tcp_flags::{self, PacketType};
use crate::sim::SimTime;

#[test]
fn ecn_rejects_inverted_thresholds() {
    let err = Ecn::new(0.8, 0.2, 0.5, 1).expect_err("min > max");
    assert!(matches!(err, SimError::InvalidEcnThresholds { .. }));
    assert!(Ecn::new(0.5, 0.5, 0.3, 1).is_ok());
}

#[test]
fn ecn_probability_curve() {
    let ecn = Ecn::new(0.2, 0.6, 0.5, 7).expect("valid ecn");
    assert_eq!(ecn.mark_probability(0.1), 0.0);
    assert_eq!(ecn.mark_probability(0.7), 1.0);
    assert!((ecn.mark_probability(0.4) - 0.25).abs() < 1e-12);
    assert!((ecn.mark_probability(0.6) - 0.5).abs() < 1e-12);

    let flat = Ecn::new(0.5, 0.5, 0.3, 7).expect("valid ecn");
    assert!((flat.mark_probability(0.5) - 0.3).abs() < 1e-12);
}

#[test]
fn ecn_degenerate_threshold_uses_full_probability() {
    let mut always = Ecn::new(0.4, 0.4, 1.0, 3).expect("valid ecn");
    let mut never = Ecn::new(0.4, 0.4, 0.0, 3).expect("valid ecn");
    assert_eq!(always.mark_probability(0.4), 1.0);
    assert_eq!(never.mark_probability(0.4), 0.0);
    for _ in 0..100 {
        assert!(always.get_congestion_mark(0.4));
        assert!(!never.get_congestion_mark(0.4));
    }
    // 点的两侧仍按阈值判定
    assert_eq!(never.mark_probability(0.39), 0.0);
    assert_eq!(never.mark_probability(0.41), 1.0);
}

#[test]
fn ecn_marks_below_min_never_and_above_max_always() {
    let mut ecn = Ecn::new(0.3, 0.7, 0.4, 42).expect("valid ecn");
    for _ in 0..200 {
        assert!(!ecn.get_congestion_mark(0.1));
        assert!(ecn.get_congestion_mark(0.9));
    }
}

#[test]
fn ecn_mark_frequency_follows_probability() {
    let mut ecn = Ecn::new(0.0, 1.0, 1.0, 2024).expect("valid ecn");
    let trials = 500;
    let marked = (0..trials).filter(|_| ecn.get_congestion_mark(0.5)).count();
    // p = 0.5，500 次的标准差约 11
    assert!((180..=320).contains(&marked), "marked {marked} of {trials}");
}

#[test]
fn ecn_same_seed_same_marks() {
    let mut a = Ecn::new(0.0, 1.0, 1.0, 9).expect("valid ecn");
    let mut b = Ecn::new(0.0, 1.0, 1.0, 9).expect("valid ecn");
    let xs: Vec<bool> = (0..64).map(|_| a.get_congestion_mark(0.3)).collect();
    let ys: Vec<bool> = (0..64).map(|_| b.get_congestion_mark(0.3)).collect();
    assert_eq!(xs, ys);
}

#[test]
fn flag_manager_packs_fields_and_validates() {
    let mut m = FlagManager::new();
    m.register_by_amount("type", 3).expect("2 bits");
    m.register_by_length("payload", 10).expect("10 bits");
    assert_eq!(m.free_bits(), 64 - 12);
    assert!(m.is_registered("type"));

    assert!(matches!(
        m.register_by_amount("type", 4),
        Err(SimError::DuplicateFlag(_))
    ));
    assert!(m.register_by_amount("single", 1).is_err());
    assert!(m.register_by_length("empty", 0).is_err());
    assert!(matches!(
        m.register_by_length("huge", 60),
        Err(SimError::FlagOverflow { .. })
    ));

    let mut flags = PacketFlags::default();
    assert_eq!(m.get(&flags, "type").expect("registered"), None);
    m.set(&mut flags, "type", 2).expect("fits");
    m.set(&mut flags, "payload", 1023).expect("fits");
    assert_eq!(m.get(&flags, "type").expect("registered"), Some(2));
    assert_eq!(m.get(&flags, "payload").expect("registered"), Some(1023));

    assert!(matches!(
        m.set(&mut flags, "type", 4),
        Err(SimError::FlagValueTooLarge { .. })
    ));
    assert!(matches!(
        m.get(&flags, "missing"),
        Err(SimError::FlagNotRegistered(_))
    ));
}

#[test]
fn tcp_flag_layout_roundtrips_header_fields() {
    let mut flags = PacketFlags::default();
    assert_eq!(tcp_flags::packet_type(&flags), None);
    assert_eq!(tcp_flags::avg_rtt(&flags), None);

    tcp_flags::set_type(&mut flags, PacketType::CollectiveAck).expect("type");
    tcp_flags::set_ack_ttl(&mut flags, 17).expect("ttl");
    tcp_flags::set_avg_rtt(&mut flags, SimTime(12_500)).expect("rtt");

    assert_eq!(tcp_flags::packet_type(&flags), Some(PacketType::CollectiveAck));
    assert!(PacketType::CollectiveAck.is_ack());
    assert_eq!(tcp_flags::ack_ttl(&flags), Some(17));
    assert_eq!(tcp_flags::avg_rtt(&flags), Some(SimTime(12_500)));
}

#[test]
fn scheduling_gate_only_wakes_on_first_arrival() {
    let mut gate = SchedulingGate::default();
    assert_eq!(gate.notify_arrival(SimTime(10)), Some(SimTime(10)));
    assert_eq!(gate.notify_arrival(SimTime(11)), None);
    assert_eq!(gate.pending(), 2);

    assert!(!gate.notify_finish(SimTime(12)));
    assert!(gate.notify_finish(SimTime(13)));
    assert_eq!(gate.pending(), 0);

    // 空闲后再次到达：不早于上一次处理完成的时间
    assert_eq!(gate.notify_arrival(SimTime(5)), Some(SimTime(13)));
}
