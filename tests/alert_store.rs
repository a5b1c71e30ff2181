use std::time::Duration as StdDuration;

use chrono::{Duration, TimeZone, Utc};

use floormon::alert::{initial_alerts, stagnant_alert_id};
use floormon::{Machine, MachineRegistry, MachineStatus, SharedState};

fn registry() -> MachineRegistry {
    MachineRegistry::new(vec![Machine::new("m1", "M1", MachineStatus::Active)])
}

#[tokio::test]
async fn seeded_alerts_keep_their_order() {
    let t0 = Utc.with_ymd_and_hms(2026, 2, 10, 6, 0, 0).unwrap();
    let state = SharedState::new(&registry(), 10, t0);
    state.seed_alerts(initial_alerts(t0)).await;

    let alerts = state.alerts().await;
    let ids: Vec<_> = alerts.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(ids, vec!["a1", "a2", "a3", "a4", "a5", "a6", "a7"]);
}

#[tokio::test]
async fn rule_alerts_are_prepended_ahead_of_manual_ones() {
    let t0 = Utc.with_ymd_and_hms(2026, 2, 10, 6, 0, 0).unwrap();
    let reg = registry();
    let state = SharedState::new(&reg, 10, t0);
    state.seed_alerts(initial_alerts(t0)).await;

    state.detector_tick(&reg, t0 + Duration::minutes(10)).await;

    let alerts = state.alerts().await;
    assert_eq!(alerts.len(), 8);
    assert_eq!(alerts[0].id, stagnant_alert_id("m1"));
    assert_eq!(alerts[1].id, "a1");
}

#[tokio::test]
async fn user_actions_mutate_the_store() {
    let t0 = Utc.with_ymd_and_hms(2026, 2, 10, 6, 0, 0).unwrap();
    let state = SharedState::new(&registry(), 10, t0);
    state.seed_alerts(initial_alerts(t0)).await;

    // a1 unread -> read
    assert!(state.mark_read("a1").await);
    assert!(!state.mark_read("does-not-exist").await);

    // a2 resolved: read and no longer action-required
    assert!(state.resolve("a2").await);
    let alerts = state.alerts().await;
    let a2 = alerts.iter().find(|a| a.id == "a2").unwrap();
    assert!(a2.is_read);
    assert!(!a2.action_required);

    // dismiss removes by id
    assert!(state.dismiss("a5").await);
    assert!(!state.dismiss("a5").await);
    assert_eq!(state.alerts().await.len(), 6);

    // seeds a3, a4, a6 are read; plus a1 and a2 above
    assert_eq!(state.clear_read().await, 5);
    let remaining: Vec<_> = state
        .alerts()
        .await
        .iter()
        .map(|a| a.id.clone())
        .collect();
    assert_eq!(remaining, vec!["a7"]);

    state.mark_all_read().await;
    assert!(state.alerts().await.iter().all(|a| a.is_read));
}

#[tokio::test]
async fn reading_a_rule_alert_does_not_survive_the_next_tick() {
    let t0 = Utc.with_ymd_and_hms(2026, 2, 10, 6, 0, 0).unwrap();
    let reg = registry();
    let state = SharedState::new(&reg, 10, t0);

    state.detector_tick(&reg, t0 + Duration::minutes(10)).await;
    let id = stagnant_alert_id("m1");
    assert!(state.mark_read(&id).await);

    let transitions = state
        .detector_tick(&reg, t0 + Duration::minutes(10) + Duration::seconds(3))
        .await;
    assert_eq!(transitions.len(), 1);

    let alerts = state.alerts().await;
    assert_eq!(alerts.len(), 1);
    assert!(!alerts[0].is_read);
}

#[tokio::test]
async fn threshold_edits_are_clamped() {
    let t0 = Utc.with_ymd_and_hms(2026, 2, 10, 6, 0, 0).unwrap();
    let state = SharedState::new(&registry(), 10, t0);

    assert_eq!(state.set_idle_threshold_minutes(0).await, 1);
    assert_eq!(state.idle_threshold_minutes().await, 1);
    assert_eq!(state.set_idle_threshold_minutes(15).await, 15);
}

#[tokio::test]
async fn readiness_requires_recent_success_from_both_loops() {
    let t0 = Utc.with_ymd_and_hms(2026, 2, 10, 6, 0, 0).unwrap();
    let state = SharedState::new(&registry(), 10, t0);
    let loops = ["simulator", "detector"];
    let staleness = StdDuration::from_secs(60);

    assert!(!state.is_ready(&loops, staleness).await);

    state.record_loop_success("simulator").await;
    assert!(!state.is_ready(&loops, staleness).await);

    state.record_loop_success("detector").await;
    assert!(state.is_ready(&loops, staleness).await);

    state
        .record_loop_failure("detector", "boom".into())
        .await;
    assert!(!state.is_ready(&loops, staleness).await);
}
