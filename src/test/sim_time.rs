use crate::sim::{SimTime, Size, Speed, rate_gbps};

#[test]
fn sim_time_unit_conversions_saturate() {
    assert_eq!(SimTime::from_micros(1), SimTime(1_000));
    assert_eq!(SimTime::from_millis(1), SimTime(1_000_000));
    assert_eq!(SimTime::from_secs(1), SimTime(1_000_000_000));
    assert_eq!(SimTime::from_secs(u64::MAX), SimTime::MAX);
    assert_eq!(SimTime(5) - SimTime(9), SimTime::ZERO);
    assert_eq!(SimTime::MAX + SimTime(1), SimTime::MAX);
}

#[test]
fn fractional_nanos_round_and_clamp() {
    assert_eq!(SimTime::from_nanos_f64(2.4), SimTime(2));
    assert_eq!(SimTime::from_nanos_f64(2.5), SimTime(3));
    assert_eq!(SimTime::from_nanos_f64(-7.0), SimTime::ZERO);
    assert_eq!(SimTime::from_nanos_f64(f64::NAN), SimTime::ZERO);
    assert_eq!(SimTime(100).mul_f64(0.25), SimTime(25));
}

#[test]
fn transmission_time_rounds_up() {
    // 1500B @ 1Gbps = 12000ns
    assert_eq!(
        Speed::from_gbps(1).transmission_time(Size::from_bytes(1500)),
        SimTime(12_000)
    );
    // 1B @ 3bps: 8/3 s 向上取整到纳秒
    assert_eq!(
        Speed::from_bps(3).transmission_time(Size::from_bytes(1)),
        SimTime(2_666_666_667)
    );
    assert_eq!(Speed::from_gbps(10).transmission_time(Size::ZERO), SimTime::ZERO);
}

#[test]
fn size_arithmetic_saturates() {
    let mut s = Size::from_bytes(10);
    s -= Size::from_bytes(25);
    assert_eq!(s, Size::ZERO);
    assert_eq!(Size::from_kib(2).bytes(), 2048);
    assert_eq!(Size::from_bytes(3).saturating_mul(4), Size::from_bytes(12));
}

#[test]
fn delivery_rate_is_bits_per_nanosecond() {
    assert_eq!(rate_gbps(Size::from_bytes(1500), SimTime::ZERO), None);
    let r = rate_gbps(Size::from_bytes(1250), SimTime(1_000)).expect("non-zero elapsed");
    assert!((r - 10.0).abs() < 1e-9);
}
