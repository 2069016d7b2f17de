use crate::sim::SimTime;

#[test]
fn sim_time_unit_conversions() {
    assert_eq!(SimTime::from_micros(1), SimTime(1_000));
    assert_eq!(SimTime::from_millis(1), SimTime(1_000_000));
    assert_eq!(SimTime::from_secs(1), SimTime(1_000_000_000));
}

#[test]
fn sim_time_unit_conversions_saturate_on_overflow() {
    assert_eq!(SimTime::from_micros(u64::MAX), SimTime(u64::MAX));
    assert_eq!(SimTime::from_millis(u64::MAX), SimTime(u64::MAX));
    assert_eq!(SimTime::from_secs(u64::MAX), SimTime(u64::MAX));
}

#[test]
fn sim_time_from_secs_f64_rounds_and_clamps() {
    assert_eq!(SimTime::from_secs_f64(1.5), SimTime::from_millis(1_500));
    assert_eq!(SimTime::from_secs_f64(0.000_000_000_4), SimTime::ZERO);
    assert_eq!(SimTime::from_secs_f64(0.000_000_000_6), SimTime(1));
    assert_eq!(SimTime::from_secs_f64(-1.0), SimTime::ZERO);
    assert_eq!(SimTime::from_secs_f64(f64::NAN), SimTime::ZERO);
    assert_eq!(SimTime::from_secs_f64(f64::INFINITY), SimTime::MAX);
}

#[test]
fn sim_time_display_uses_seconds() {
    assert_eq!(SimTime::from_millis(20_000).to_string(), "20.000000000s");
    assert_eq!(SimTime::from_secs(20).as_secs_f64(), 20.0);
}

#[test]
fn sim_time_saturating_arithmetic() {
    assert_eq!(SimTime::MAX.saturating_add(SimTime(1)), SimTime::MAX);
    assert_eq!(SimTime(1).saturating_sub(SimTime(2)), SimTime::ZERO);
}
