use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;

use floormon::alert::stagnant_alert_id;
use floormon::{AlertKind, AlertTransition, FloorState, Machine, MachineRegistry, MachineStatus};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 2, 10, 6, 0, 0).unwrap()
}

fn registry_with(machines: &[(&str, MachineStatus)]) -> MachineRegistry {
    MachineRegistry::new(
        machines
            .iter()
            .map(|(id, status)| Machine::new(id, &id.to_uppercase(), *status))
            .collect(),
    )
}

fn m4_registry() -> MachineRegistry {
    registry_with(&[("m4", MachineStatus::Active)])
}

#[test]
fn alert_fires_at_threshold_not_before() {
    let registry = m4_registry();
    let mut state = FloorState::new(&registry, 10, t0());

    // 9 minutes idle: below threshold, nothing happens
    let transitions = state.apply_detector_tick(&registry, t0() + Duration::minutes(9));
    assert!(transitions.is_empty());
    assert!(state.alerts().is_empty());

    // one millisecond short of the threshold still does not fire
    let just_under = t0() + Duration::minutes(10) - Duration::milliseconds(1);
    assert!(state.apply_detector_tick(&registry, just_under).is_empty());
    assert!(state.alerts().is_empty());

    // exactly at the threshold fires (>= comparison, not >)
    let at_threshold = t0() + Duration::minutes(10);
    let transitions = state.apply_detector_tick(&registry, at_threshold);
    assert_eq!(
        transitions,
        vec![AlertTransition::Raised {
            machine_id: "m4".into()
        }]
    );

    let alert = &state.alerts()[0];
    assert_eq!(alert.id, stagnant_alert_id("m4"));
    assert_eq!(alert.kind, AlertKind::Warning);
    assert!(alert.action_required);
    assert!(!alert.is_read);
    assert_eq!(alert.machine_id.as_deref(), Some("m4"));
    assert_eq!(alert.timestamp, at_threshold);
    assert!(alert.message.contains("10 min"));
    assert!(alert.message.contains("M4"));
}

#[test]
fn repeated_ticks_leave_the_store_untouched() {
    let registry = m4_registry();
    let mut state = FloorState::new(&registry, 10, t0());

    state.apply_detector_tick(&registry, t0() + Duration::minutes(10));
    let after_first: Vec<_> = state.alerts().to_vec();

    // detector runs every 3 seconds; while the floored elapsed minutes do
    // not change and the alert stays unread, nothing may be rewritten
    for seconds in [3, 6, 9, 12, 30, 45] {
        let now = t0() + Duration::minutes(10) + Duration::seconds(seconds);
        let transitions = state.apply_detector_tick(&registry, now);
        assert!(transitions.is_empty(), "unexpected churn at +{seconds}s");
        assert_eq!(state.alerts(), &after_first[..]);
    }
}

#[test]
fn marking_read_reopens_on_the_next_tick() {
    let registry = m4_registry();
    let mut state = FloorState::new(&registry, 10, t0());

    state.apply_detector_tick(&registry, t0() + Duration::minutes(10));
    assert!(state.mark_read(&stagnant_alert_id("m4")));

    // still within the same floored minute: the message text is unchanged,
    // so the reopen must come purely from is_read
    let reopen_at = t0() + Duration::minutes(10) + Duration::seconds(5);
    let transitions = state.apply_detector_tick(&registry, reopen_at);
    assert_eq!(
        transitions,
        vec![AlertTransition::Reopened {
            machine_id: "m4".into()
        }]
    );

    assert_eq!(state.alerts().len(), 1, "reopen must not duplicate");
    let alert = &state.alerts()[0];
    assert_eq!(alert.id, stagnant_alert_id("m4"));
    assert!(!alert.is_read);
    assert!(alert.action_required);
    assert_eq!(alert.timestamp, reopen_at);
}

#[test]
fn resolving_reopens_while_still_stagnant() {
    let registry = m4_registry();
    let mut state = FloorState::new(&registry, 10, t0());

    state.apply_detector_tick(&registry, t0() + Duration::minutes(10));
    assert!(state.resolve(&stagnant_alert_id("m4")));

    let transitions =
        state.apply_detector_tick(&registry, t0() + Duration::minutes(10) + Duration::seconds(3));
    assert_eq!(transitions.len(), 1);
    let alert = &state.alerts()[0];
    assert!(!alert.is_read);
    assert!(alert.action_required);
}

#[test]
fn message_minutes_advance_once_per_minute() {
    let registry = m4_registry();
    let mut state = FloorState::new(&registry, 10, t0());

    state.apply_detector_tick(&registry, t0() + Duration::minutes(10));

    // 57 seconds later the floored minutes are still 10: no rewrite
    let transitions =
        state.apply_detector_tick(&registry, t0() + Duration::minutes(10) + Duration::seconds(57));
    assert!(transitions.is_empty());
    assert!(state.alerts()[0].message.contains("10 min"));

    // crossing the minute boundary rewrites the message in place
    let transitions = state.apply_detector_tick(&registry, t0() + Duration::minutes(11));
    assert_eq!(
        transitions,
        vec![AlertTransition::Reopened {
            machine_id: "m4".into()
        }]
    );
    assert_eq!(state.alerts().len(), 1);
    assert!(state.alerts()[0].message.contains("11 min"));
}

#[test]
fn at_most_one_rule_alert_per_machine() {
    let registry = m4_registry();
    let mut state = FloorState::new(&registry, 10, t0());

    // half an hour of detector ticks at the real 3s period
    for step in 0..600 {
        let now = t0() + Duration::seconds(3 * step);
        state.apply_detector_tick(&registry, now);
    }

    let rule_alerts = state
        .alerts()
        .iter()
        .filter(|a| a.id == stagnant_alert_id("m4"))
        .count();
    assert_eq!(rule_alerts, 1);
    assert_eq!(state.alerts().len(), 1);
}

#[test]
fn live_threshold_change_applies_on_next_tick() {
    let registry = m4_registry();
    let mut state = FloorState::new(&registry, 10, t0());

    // stagnant for 5 minutes under a 10-minute threshold: quiet
    let now = t0() + Duration::minutes(5);
    assert!(state.apply_detector_tick(&registry, now).is_empty());

    // operator tightens the threshold to 1 minute; no restart involved
    state.set_idle_threshold_minutes(1);
    let transitions = state.apply_detector_tick(&registry, now + Duration::seconds(3));
    assert_eq!(transitions.len(), 1);
    assert!(state.alerts()[0].message.contains("5 min"));
}

#[test]
fn machine_without_counter_state_is_not_stagnant() {
    // m9 joins the registry after the state was initialised; absence of
    // telemetry must read as "increased just now", not infinite stagnation
    let initial = m4_registry();
    let mut state = FloorState::new(&initial, 10, t0());

    let grown = registry_with(&[("m4", MachineStatus::Active), ("m9", MachineStatus::Active)]);
    let transitions = state.apply_detector_tick(&grown, t0() + Duration::minutes(5));
    assert!(transitions.is_empty());
    assert!(state.alerts().is_empty());
}

#[test]
fn only_active_machines_are_monitored() {
    let registry = registry_with(&[
        ("m4", MachineStatus::Waiting),
        ("m17", MachineStatus::Inactive),
    ]);
    let mut state = FloorState::new(&registry, 10, t0());

    let transitions = state.apply_detector_tick(&registry, t0() + Duration::hours(4));
    assert!(transitions.is_empty());
    assert!(state.alerts().is_empty());
}

#[test]
fn same_tick_insertions_are_sequential() {
    let registry = registry_with(&[("m1", MachineStatus::Active), ("m2", MachineStatus::Active)]);
    let mut state = FloorState::new(&registry, 10, t0());

    let transitions = state.apply_detector_tick(&registry, t0() + Duration::minutes(10));
    assert_eq!(transitions.len(), 2);

    // each insert prepends, so the machine processed last ends up first
    let ids: Vec<_> = state.alerts().iter().map(|a| a.id.as_str()).collect();
    assert_eq!(
        ids,
        vec![
            stagnant_alert_id("m2").as_str(),
            stagnant_alert_id("m1").as_str()
        ]
    );
}

#[test]
fn recovered_machine_keeps_its_stale_alert() {
    let registry = m4_registry();
    let mut state = FloorState::new(&registry, 10, t0());

    state.apply_detector_tick(&registry, t0() + Duration::minutes(10));
    let stale_message = state.alerts()[0].message.clone();

    // production resumes; loop the seeded simulator until the counter moves
    let resumed_at = t0() + Duration::minutes(12);
    let mut rng = StdRng::seed_from_u64(42);
    while state
        .apply_simulator_tick(&registry, resumed_at, &mut rng)
        .is_empty()
    {}

    // the detector never auto-clears; the stale alert stays until a user
    // dismisses or resolves it
    let transitions =
        state.apply_detector_tick(&registry, resumed_at + Duration::seconds(3));
    assert!(transitions.is_empty());
    assert_eq!(state.alerts().len(), 1);
    assert_eq!(state.alerts()[0].message, stale_message);

    assert!(state.dismiss(&stagnant_alert_id("m4")));
    assert!(state.alerts().is_empty());
}

#[test]
fn simulator_never_touches_the_alert_list() {
    let registry = m4_registry();
    let mut state = FloorState::new(&registry, 10, t0());

    state.apply_detector_tick(&registry, t0() + Duration::minutes(10));
    let alerts_before = state.alerts().to_vec();

    let mut rng = StdRng::seed_from_u64(3);
    for step in 0..20 {
        let now = t0() + Duration::minutes(10) + Duration::seconds(12 * step);
        state.apply_simulator_tick(&registry, now, &mut rng);
    }

    assert_eq!(state.alerts(), &alerts_before[..]);
}
