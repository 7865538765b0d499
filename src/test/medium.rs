use crate::mac::MediumState;
use crate::sim::SimTime;

fn us(v: u64) -> SimTime {
    SimTime::from_micros(v)
}

const SIFS: u64 = 6;
const EIFS_NO_DIFS: u64 = 10;

fn idle(m: &MediumState) -> u64 {
    m.idle_since(us(SIFS), us(EIFS_NO_DIFS)).as_micros()
}

#[test]
fn untouched_medium_is_idle_since_sifs() {
    let m = MediumState::default();
    assert!(!m.is_busy(SimTime::ZERO));
    assert_eq!(idle(&m), SIFS);
}

#[test]
fn ongoing_rx_bounds_idle_by_expected_end() {
    let mut m = MediumState::default();
    m.rx_start(us(20), us(40));
    assert!(m.is_receiving());
    assert!(m.is_busy(us(30)));
    assert_eq!(m.last_rx_start(), us(20));
    assert_eq!(idle(&m), 66);

    m.rx_end_now(us(50), true);
    assert!(!m.is_receiving());
    assert!(!m.is_busy(us(50)));
    assert_eq!(idle(&m), 56);
}

#[test]
fn rx_error_adds_eifs_until_a_later_rx_succeeds() {
    let mut m = MediumState::default();
    m.rx_start(us(20), us(40));
    m.rx_end_now(us(60), false);
    assert!(m.last_rx_was_error());
    assert_eq!(idle(&m), 60 + SIFS + EIFS_NO_DIFS);

    m.rx_start(us(70), us(10));
    m.rx_end_now(us(80), true);
    assert!(!m.last_rx_was_error());
    assert_eq!(idle(&m), 86);
}

#[test]
fn tx_start_during_rx_truncates_it_as_success() {
    let mut m = MediumState::default();
    m.rx_start(us(10), us(100));
    m.tx_start(us(20), us(5));
    assert!(!m.is_receiving());
    assert_eq!(m.rx_end(), us(20));
    assert!(m.is_transmitting(us(24)));
    assert!(!m.is_transmitting(us(25)));
    assert_eq!(idle(&m), 25 + SIFS);
}

#[test]
fn nav_start_extends_and_nav_reset_may_shorten() {
    let mut m = MediumState::default();
    m.nav_start(us(10), us(30));
    m.nav_start(us(15), us(5));
    assert_eq!(m.nav_end(), us(40));

    m.nav_reset(us(20), us(2));
    assert_eq!(m.nav_end(), us(22));
    assert_eq!(idle(&m), 28);
}

#[test]
fn cca_busy_overlaps_and_takes_the_later_end() {
    let mut m = MediumState::default();
    m.tx_start(us(0), us(10));
    m.cca_busy_start(us(5), us(20));
    m.cca_busy_start(us(6), us(1));
    assert_eq!(m.cca_busy_end(), us(25));
    assert!(m.is_busy(us(24)));
    assert_eq!(idle(&m), 31);
}

#[test]
fn switching_truncates_rx_nav_and_cca() {
    let mut m = MediumState::default();
    m.rx_start(us(10), us(100));
    m.nav_start(us(10), us(200));
    m.cca_busy_start(us(10), us(300));

    m.switching_start(us(50), us(20));
    assert!(!m.is_receiving());
    assert!(!m.last_rx_was_error());
    assert_eq!(m.rx_end(), us(50));
    assert_eq!(m.nav_end(), us(50));
    assert_eq!(m.cca_busy_end(), us(50));
    assert!(m.is_switching(us(60)));
    assert!(!m.is_switching(us(70)));
    assert_eq!(m.switching_end(), us(70));
    assert_eq!(idle(&m), 76);
}

#[test]
fn sleeping_flag_does_not_change_idle_since() {
    let mut m = MediumState::default();
    m.set_sleeping(true);
    assert!(m.is_sleeping());
    assert_eq!(idle(&m), SIFS);
    m.set_sleeping(false);
    assert!(!m.is_sleeping());
}
