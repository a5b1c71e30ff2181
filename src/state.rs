use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::alert::{
    stagnant_alert_id, stagnation_message, stagnation_title, Alert, AlertCategory, AlertKind,
};
use crate::registry::{MachineRegistry, MachineStatus};

/// Probability that an active machine produces anything in a simulator tick.
pub const PRODUCTION_PROBABILITY: f64 = 0.8;

/// Largest per-tick counter increment drawn by the simulator.
pub const MAX_TICK_INCREMENT: u64 = 5;

/// Per-machine production telemetry maintained by the simulator loop.
/// `count` is monotonically non-decreasing; `last_increase_at` moves if and
/// only if `count` advanced in that tick.
#[derive(Debug, Clone, Serialize)]
pub struct ProductionCounter {
    pub count: u64,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub last_increase_at: DateTime<Utc>,
}

/// Counter movement reported by a simulator tick, for logging and metrics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterAdvance {
    pub machine_id: String,
    pub increment: u64,
    pub count: u64,
}

/// Alert-list mutation performed by a detector tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlertTransition {
    /// A stagnation alert was created for this machine.
    Raised { machine_id: String },
    /// An existing stagnation alert was refreshed: message or timestamp
    /// updated, `is_read` flipped back to false.
    Reopened { machine_id: String },
}

/// Per-machine view backing the production monitor cards.
#[derive(Debug, Clone, Serialize)]
pub struct MachineSnapshot {
    pub id: String,
    pub name: String,
    pub status: MachineStatus,
    pub count: u64,
    pub stagnant_seconds: i64,
    pub minutes_since_increase: i64,
    pub over_threshold: bool,
}

/// All mutable engine state behind one lock: production counters, the alert
/// list and the shared idle threshold. Tick transitions are plain synchronous
/// methods so ordering and idempotence are testable without timers.
#[derive(Debug)]
pub struct FloorState {
    counters: HashMap<String, ProductionCounter>,
    alerts: Vec<Alert>,
    idle_threshold_minutes: u64,
}

impl FloorState {
    /// Every registered machine starts with a zero counter "increased" at
    /// startup, so nothing is stagnant on the first detector tick.
    pub fn new(
        registry: &MachineRegistry,
        idle_threshold_minutes: u64,
        started_at: DateTime<Utc>,
    ) -> Self {
        let counters = registry
            .machines()
            .iter()
            .map(|m| {
                (
                    m.id.clone(),
                    ProductionCounter {
                        count: 0,
                        last_increase_at: started_at,
                    },
                )
            })
            .collect();

        Self {
            counters,
            alerts: Vec::new(),
            idle_threshold_minutes,
        }
    }

    /// Advance production counters for active machines. Each machine draws
    /// independently: with [`PRODUCTION_PROBABILITY`] an increment in
    /// `1..=MAX_TICK_INCREMENT`, otherwise nothing. Machines that drew zero
    /// keep their stale `last_increase_at`; that staleness is the signal the
    /// detector watches. Never touches the alert list.
    pub fn apply_simulator_tick<R: Rng>(
        &mut self,
        registry: &MachineRegistry,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Vec<CounterAdvance> {
        let mut advances = Vec::new();

        for machine in registry.active() {
            let increment = if rng.gen_bool(PRODUCTION_PROBABILITY) {
                rng.gen_range(1..=MAX_TICK_INCREMENT)
            } else {
                0
            };
            if increment == 0 {
                continue;
            }

            let counter = self
                .counters
                .entry(machine.id.clone())
                .or_insert_with(|| ProductionCounter {
                    count: 0,
                    last_increase_at: now,
                });
            counter.count += increment;
            counter.last_increase_at = now;

            advances.push(CounterAdvance {
                machine_id: machine.id.clone(),
                increment,
                count: counter.count,
            });
        }

        advances
    }

    /// Run the stagnation rule over all active machines. Sequential fold over
    /// the registry order: later machines see alerts inserted by earlier ones
    /// in the same tick.
    ///
    /// A machine with no counter state (registered after startup) counts as
    /// having increased just now, never as infinitely stagnant.
    ///
    /// Deliberately never clears an alert once the machine resumes producing;
    /// stale alerts stay until a user dismisses or resolves them (see
    /// DESIGN.md on this reference-behavior gap).
    pub fn apply_detector_tick(
        &mut self,
        registry: &MachineRegistry,
        now: DateTime<Utc>,
    ) -> Vec<AlertTransition> {
        let threshold_ms = (self.idle_threshold_minutes.max(1) * 60_000) as i64;
        let mut transitions = Vec::new();

        for machine in registry.active() {
            let (stagnant_ms, count) = match self.counters.get(&machine.id) {
                Some(counter) => (
                    now.signed_duration_since(counter.last_increase_at)
                        .num_milliseconds(),
                    counter.count,
                ),
                None => (0, 0),
            };

            if stagnant_ms < threshold_ms {
                continue;
            }

            let minutes = (stagnant_ms / 60_000).max(0);
            let label = machine.id.to_uppercase();
            let message = stagnation_message(&label, minutes, count);
            let alert_id = stagnant_alert_id(&machine.id);

            match self.alerts.iter_mut().find(|a| a.id == alert_id) {
                None => {
                    self.alerts.insert(
                        0,
                        Alert {
                            id: alert_id,
                            kind: AlertKind::Warning,
                            category: AlertCategory::Production,
                            title: stagnation_title(&label),
                            message,
                            timestamp: now,
                            is_read: false,
                            machine_id: Some(machine.id.clone()),
                            action_required: true,
                        },
                    );
                    transitions.push(AlertTransition::Raised {
                        machine_id: machine.id.clone(),
                    });
                }
                Some(existing) => {
                    let should_reopen = existing.is_read || !existing.action_required;
                    if should_reopen || existing.message != message {
                        existing.message = message;
                        existing.timestamp = now;
                        existing.is_read = false;
                        existing.action_required = true;
                        transitions.push(AlertTransition::Reopened {
                            machine_id: machine.id.clone(),
                        });
                    }
                }
            }
        }

        transitions
    }

    /// Prepend an alert. Caller is responsible for id uniqueness; the
    /// detector always checks existence first.
    pub fn insert_alert(&mut self, alert: Alert) {
        self.alerts.insert(0, alert);
    }

    /// Append alerts preserving their given order (startup seeding).
    pub fn extend_alerts(&mut self, alerts: Vec<Alert>) {
        self.alerts.extend(alerts);
    }

    pub fn alerts(&self) -> &[Alert] {
        &self.alerts
    }

    pub fn counter(&self, machine_id: &str) -> Option<&ProductionCounter> {
        self.counters.get(machine_id)
    }

    pub fn mark_read(&mut self, id: &str) -> bool {
        match self.alerts.iter_mut().find(|a| a.id == id) {
            Some(alert) => {
                alert.is_read = true;
                true
            }
            None => false,
        }
    }

    pub fn mark_all_read(&mut self) {
        for alert in &mut self.alerts {
            alert.is_read = true;
        }
    }

    /// Resolve: acknowledge and drop the action flag, keeping the entry.
    pub fn resolve(&mut self, id: &str) -> bool {
        match self.alerts.iter_mut().find(|a| a.id == id) {
            Some(alert) => {
                alert.is_read = true;
                alert.action_required = false;
                true
            }
            None => false,
        }
    }

    pub fn dismiss(&mut self, id: &str) -> bool {
        let before = self.alerts.len();
        self.alerts.retain(|a| a.id != id);
        self.alerts.len() < before
    }

    /// Remove all read alerts, returning how many were dropped.
    pub fn clear_read(&mut self) -> usize {
        let before = self.alerts.len();
        self.alerts.retain(|a| !a.is_read);
        before - self.alerts.len()
    }

    pub fn idle_threshold_minutes(&self) -> u64 {
        self.idle_threshold_minutes
    }

    /// Live threshold edits are clamped to one minute, never rejected.
    pub fn set_idle_threshold_minutes(&mut self, minutes: i64) -> u64 {
        self.idle_threshold_minutes = minutes.max(1) as u64;
        self.idle_threshold_minutes
    }

    pub fn machine_snapshots(
        &self,
        registry: &MachineRegistry,
        now: DateTime<Utc>,
    ) -> Vec<MachineSnapshot> {
        let threshold_minutes = self.idle_threshold_minutes.max(1) as i64;

        registry
            .machines()
            .iter()
            .map(|machine| {
                let (count, stagnant_ms) = match self.counters.get(&machine.id) {
                    Some(counter) => (
                        counter.count,
                        now.signed_duration_since(counter.last_increase_at)
                            .num_milliseconds()
                            .max(0),
                    ),
                    None => (0, 0),
                };
                let minutes = stagnant_ms / 60_000;

                MachineSnapshot {
                    id: machine.id.clone(),
                    name: machine.name.clone(),
                    status: machine.status,
                    count,
                    stagnant_seconds: stagnant_ms / 1_000,
                    minutes_since_increase: minutes,
                    over_threshold: machine.status == MachineStatus::Active
                        && minutes >= threshold_minutes,
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoopHealth {
    pub name: String,
    #[serde(with = "chrono::serde::ts_seconds_option")]
    pub last_success_at: Option<DateTime<Utc>>,
    pub consecutive_failures: u32,
    pub last_error: Option<String>,
}

impl LoopHealth {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            last_success_at: None,
            consecutive_failures: 0,
            last_error: None,
        }
    }
}

struct SharedStateInner {
    floor: RwLock<FloorState>,
    loop_health: RwLock<HashMap<String, LoopHealth>>,
}

/// Shared state container for the HTTP layer and tick loops. Each tick runs
/// to completion under the write lock, so the two loops never interleave
/// mid-computation; the detector observing counters one simulator period
/// stale is expected (simulated telemetry lag).
#[derive(Clone)]
pub struct SharedState {
    inner: Arc<SharedStateInner>,
}

impl SharedState {
    pub fn new(
        registry: &MachineRegistry,
        idle_threshold_minutes: u64,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            inner: Arc::new(SharedStateInner {
                floor: RwLock::new(FloorState::new(registry, idle_threshold_minutes, started_at)),
                loop_health: RwLock::new(HashMap::new()),
            }),
        }
    }

    pub async fn simulator_tick<R: Rng>(
        &self,
        registry: &MachineRegistry,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Vec<CounterAdvance> {
        let mut guard = self.inner.floor.write().await;
        guard.apply_simulator_tick(registry, now, rng)
    }

    pub async fn detector_tick(
        &self,
        registry: &MachineRegistry,
        now: DateTime<Utc>,
    ) -> Vec<AlertTransition> {
        let mut guard = self.inner.floor.write().await;
        guard.apply_detector_tick(registry, now)
    }

    pub async fn seed_alerts(&self, alerts: Vec<Alert>) {
        let mut guard = self.inner.floor.write().await;
        guard.extend_alerts(alerts);
    }

    pub async fn alerts(&self) -> Vec<Alert> {
        self.inner.floor.read().await.alerts().to_vec()
    }

    pub async fn mark_read(&self, id: &str) -> bool {
        self.inner.floor.write().await.mark_read(id)
    }

    pub async fn mark_all_read(&self) {
        self.inner.floor.write().await.mark_all_read();
    }

    pub async fn resolve(&self, id: &str) -> bool {
        self.inner.floor.write().await.resolve(id)
    }

    pub async fn dismiss(&self, id: &str) -> bool {
        self.inner.floor.write().await.dismiss(id)
    }

    pub async fn clear_read(&self) -> usize {
        self.inner.floor.write().await.clear_read()
    }

    pub async fn idle_threshold_minutes(&self) -> u64 {
        self.inner.floor.read().await.idle_threshold_minutes()
    }

    pub async fn set_idle_threshold_minutes(&self, minutes: i64) -> u64 {
        self.inner
            .floor
            .write()
            .await
            .set_idle_threshold_minutes(minutes)
    }

    pub async fn machine_snapshots(
        &self,
        registry: &MachineRegistry,
        now: DateTime<Utc>,
    ) -> Vec<MachineSnapshot> {
        self.inner
            .floor
            .read()
            .await
            .machine_snapshots(registry, now)
    }

    pub async fn record_loop_success(&self, loop_name: &str) {
        let mut guard = self.inner.loop_health.write().await;
        let entry = guard
            .entry(loop_name.to_string())
            .or_insert_with(|| LoopHealth::new(loop_name));
        entry.last_success_at = Some(Utc::now());
        entry.consecutive_failures = 0;
        entry.last_error = None;
    }

    pub async fn record_loop_failure(&self, loop_name: &str, error: String) {
        let mut guard = self.inner.loop_health.write().await;
        let entry = guard
            .entry(loop_name.to_string())
            .or_insert_with(|| LoopHealth::new(loop_name));
        entry.consecutive_failures = entry.consecutive_failures.saturating_add(1);
        entry.last_error = Some(error);
    }

    pub async fn loop_health(&self) -> Vec<LoopHealth> {
        self.inner
            .loop_health
            .read()
            .await
            .values()
            .cloned()
            .collect()
    }

    pub async fn is_ready(&self, loop_names: &[&str], max_staleness: Duration) -> bool {
        let health = self.inner.loop_health.read().await;
        let now = Utc::now();
        let staleness = chrono::Duration::from_std(max_staleness)
            .unwrap_or_else(|_| chrono::Duration::seconds(60));

        loop_names.iter().all(|name| {
            if let Some(entry) = health.get(*name) {
                if entry.consecutive_failures > 0 {
                    return false;
                }
                if let Some(last) = entry.last_success_at {
                    return now.signed_duration_since(last) <= staleness;
                }
                false
            } else {
                false
            }
        })
    }
}
