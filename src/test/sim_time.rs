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
fn sim_time_as_micros_rounds_down() {
    assert_eq!(SimTime::from_micros(42).as_micros(), 42);
    assert_eq!(SimTime(1_999).as_micros(), 1);
}

#[test]
fn sim_time_saturating_arithmetic() {
    let slot = SimTime::from_micros(9);
    assert_eq!(slot.saturating_mul(3), SimTime::from_micros(27));
    assert_eq!(SimTime::MAX.saturating_add(slot), SimTime::MAX);
    assert_eq!(slot.saturating_sub(SimTime::from_micros(10)), SimTime::ZERO);
    assert_eq!(SimTime::MAX.saturating_mul(2), SimTime::MAX);
}
