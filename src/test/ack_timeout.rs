use super::support::{Bench, at, legacy, request, scenario, timing, us};
use crate::mac::Notification::{AccessGranted, InternalCollision};
use crate::scenario::{ScriptAction, run_scenario};

fn with_ack(txop: usize, tx_us: u64, ack_us: u64) -> ScriptAction {
    ScriptAction::RequestAccess {
        txop,
        tx_us,
        ack_timeout_us: Some(ack_us),
    }
}

// 100 发送 10us，之后等 ACK 20us：截止 130
fn grants_with(extra: Vec<crate::scenario::ScriptEvent>) -> Vec<u64> {
    let mut events = vec![at(100, with_ack(0, 10, 20)), at(112, request(0, 2))];
    events.extend(extra);
    let spec = scenario(timing(4, 6, 10), vec![legacy(1, &[])], events);
    run_scenario(&spec).expect("scenario runs").grants_us(0)
}

#[test]
fn expired_ack_timeout_defers_access_by_eifs() {
    assert_eq!(grants_with(vec![]), vec![100, 130 + 6 + 10 + 4]);
}

#[test]
fn ack_reset_before_expiry_restores_sifs_spacing() {
    assert_eq!(
        grants_with(vec![at(125, ScriptAction::AckTimeoutReset)]),
        vec![100, 125 + 6 + 4]
    );
}

#[test]
fn ack_reset_at_the_expiry_instant_wins() {
    assert_eq!(
        grants_with(vec![at(130, ScriptAction::AckTimeoutReset)]),
        vec![100, 130 + 6 + 4]
    );
}

#[test]
fn pending_ack_timeout_holds_back_access_without_collisions() {
    let spec = scenario(
        timing(4, 6, 10),
        vec![legacy(1, &[])],
        vec![at(100, with_ack(0, 10, 20)), at(112, request(0, 2))],
    );
    let out = run_scenario(&spec).expect("scenario runs");
    let kinds: Vec<_> = out.records.iter().map(|r| (r.t_us(), r.kind)).collect();
    assert_eq!(
        kinds,
        vec![
            (100, AccessGranted),
            (112, InternalCollision),
            (150, AccessGranted)
        ]
    );
    assert_eq!(out.stats.collisions, 0);
}

#[test]
fn reset_after_fired_expiry_at_same_instant_revokes_eifs() {
    let mut b = Bench::new(4, 6, 10);
    let q = b.add_txop(1, false, &[]);

    b.request(100, q, 10, Some(20));
    assert_eq!(b.cam().ack_timeout().expiry(), Some(us(130)));
    b.request(112, q, 2, None);

    b.at(130, |cam, _| {
        assert!(!cam.ack_timeout().is_armed());
        assert!(cam.ack_timeout().is_expired());
        assert_eq!(cam.next_evaluation(), Some(us(150)));
    });
    b.at(130, |cam, sim| cam.notify_ack_timeout_reset_now(sim));
    assert!(!b.cam().ack_timeout().is_expired());
    assert_eq!(b.cam().next_evaluation(), Some(us(140)));

    b.run();
    assert_eq!(
        b.records(),
        vec![
            (100, 0, AccessGranted),
            (112, 0, InternalCollision),
            (140, 0, AccessGranted)
        ]
    );
}

#[test]
fn late_reset_does_not_revoke_an_earlier_expiry() {
    let mut b = Bench::new(4, 6, 10);
    let q = b.add_txop(1, false, &[]);

    b.request(100, q, 10, Some(20));
    b.at(131, |cam, sim| cam.notify_ack_timeout_reset_now(sim));
    assert!(b.cam().ack_timeout().is_expired());
    assert_eq!(b.cam().idle_since(), us(146));
}

#[test]
fn rearming_replaces_the_previous_deadline() {
    let mut b = Bench::new(4, 6, 10);
    b.add_txop(1, false, &[]);

    b.at(0, |cam, sim| cam.notify_ack_timeout_start_now(us(50), sim));
    b.at(10, |cam, sim| cam.notify_ack_timeout_start_now(us(5), sim));
    assert_eq!(b.cam().ack_timeout().expiry(), Some(us(15)));
    assert_eq!(b.sim.pending_events(), 1);

    b.run();
    assert_eq!(b.sim.now(), us(15));
    assert!(b.cam().ack_timeout().is_expired());
}

#[test]
fn switching_truncates_ack_timeout_without_eifs() {
    let mut b = Bench::new(4, 6, 10);
    b.add_txop(1, false, &[]);

    b.at(0, |cam, sim| cam.notify_ack_timeout_start_now(us(50), sim));
    b.at(20, |cam, sim| cam.notify_switching_start_now(us(10), sim));
    assert!(!b.cam().ack_timeout().is_armed());
    assert!(!b.cam().ack_timeout().is_expired());
    assert_eq!(b.sim.pending_events(), 0);
    assert_eq!(b.cam().idle_since(), us(36));
}
