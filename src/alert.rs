use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// Severity of an alert as rendered in the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Error,
    Warning,
    Info,
    Success,
}

/// Operational area an alert belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertCategory {
    Machine,
    Production,
    Maintenance,
    Employee,
    System,
}

/// A single alert entry. Manually-seeded and rule-generated alerts share
/// this shape and live in the same ordered list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alert {
    pub id: String,
    pub kind: AlertKind,
    pub category: AlertCategory,
    pub title: String,
    pub message: String,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub timestamp: DateTime<Utc>,
    pub is_read: bool,
    pub machine_id: Option<String>,
    pub action_required: bool,
}

/// Id prefix for alerts owned by the stagnant-production rule. At most one
/// alert per machine carries this id at any time.
pub const STAGNANT_RULE_PREFIX: &str = "rule-stagnant-production-";

pub fn stagnant_alert_id(machine_id: &str) -> String {
    format!("{STAGNANT_RULE_PREFIX}{machine_id}")
}

pub fn stagnation_title(machine_label: &str) -> String {
    format!("No production progress on {machine_label}")
}

/// Message shown to operators. The elapsed minutes are floored, so the text
/// only changes roughly once per minute of continued stagnation; the
/// detector relies on that to avoid rewriting the alert every tick.
pub fn stagnation_message(machine_label: &str, minutes: i64, count: u64) -> String {
    format!(
        "Machine {machine_label} is running but its production counter has not \
         increased in {minutes} min (current counter: {count} units). \
         Check operation, material feed and count logging."
    )
}

/// Manual alerts the dashboard starts out with. Timestamps are relative to
/// startup so the feed looks recent.
pub fn initial_alerts(now: DateTime<Utc>) -> Vec<Alert> {
    vec![
        Alert {
            id: "a1".into(),
            kind: AlertKind::Error,
            category: AlertCategory::Machine,
            title: "Machine M3 stopped".into(),
            message: "Machine M3 stopped unexpectedly. Immediate inspection required.".into(),
            timestamp: now - Duration::minutes(5),
            is_read: false,
            machine_id: Some("m3".into()),
            action_required: true,
        },
        Alert {
            id: "a2".into(),
            kind: AlertKind::Warning,
            category: AlertCategory::Production,
            title: "Low output on M4".into(),
            message: "Machine M4 is running at 65% of its normal capacity.".into(),
            timestamp: now - Duration::minutes(15),
            is_read: false,
            machine_id: Some("m4".into()),
            action_required: true,
        },
        Alert {
            id: "a3".into(),
            kind: AlertKind::Info,
            category: AlertCategory::Maintenance,
            title: "Scheduled maintenance".into(),
            message: "Preventive maintenance for M8 scheduled tomorrow at 10:00.".into(),
            timestamp: now - Duration::minutes(30),
            is_read: true,
            machine_id: Some("m8".into()),
            action_required: false,
        },
        Alert {
            id: "a4".into(),
            kind: AlertKind::Success,
            category: AlertCategory::Production,
            title: "Daily goal reached".into(),
            message: "The production line reached the daily goal of 3,000 units.".into(),
            timestamp: now - Duration::minutes(60),
            is_read: true,
            machine_id: None,
            action_required: false,
        },
        Alert {
            id: "a5".into(),
            kind: AlertKind::Error,
            category: AlertCategory::Machine,
            title: "Sensor fault on M14".into(),
            message: "The temperature sensor on M14 is reporting inconsistent readings.".into(),
            timestamp: now - Duration::minutes(90),
            is_read: false,
            machine_id: Some("m14".into()),
            action_required: true,
        },
        Alert {
            id: "a6".into(),
            kind: AlertKind::Info,
            category: AlertCategory::System,
            title: "System update available".into(),
            message: "A new system update is available. Version 2.5.1".into(),
            timestamp: now - Duration::minutes(120),
            is_read: true,
            machine_id: None,
            action_required: false,
        },
        Alert {
            id: "a7".into(),
            kind: AlertKind::Warning,
            category: AlertCategory::Maintenance,
            title: "SKU change required".into(),
            message: "M11 needs a SKU change for the next production order.".into(),
            timestamp: now - Duration::minutes(150),
            is_read: false,
            machine_id: Some("m11".into()),
            action_required: true,
        },
    ]
}
