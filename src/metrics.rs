use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use prometheus::{
    Encoder, GaugeVec, HistogramOpts, HistogramVec, IntCounterVec, IntGaugeVec, Opts, Registry,
    TextEncoder,
};

/// Metrics registry for the agent scraped by Prometheus.
#[derive(Clone)]
pub struct AppMetrics {
    registry: Arc<Registry>,
    loops: LoopMetrics,
    production: ProductionMetrics,
    alerts: AlertMetrics,
}

impl AppMetrics {
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new_custom(Some("floormon".into()), None)?);

        let loops = LoopMetrics::register(&registry)?;
        let production = ProductionMetrics::register(&registry)?;
        let alerts = AlertMetrics::register(&registry)?;

        Ok(Self {
            registry,
            loops,
            production,
            alerts,
        })
    }

    /// Observe the execution duration for a loop.
    pub fn observe_duration(&self, loop_name: &str, duration: Duration) {
        let seconds = duration.as_secs_f64();
        self.loops
            .tick_duration
            .with_label_values(&[loop_name])
            .observe(seconds);
    }

    /// Record a success flag for a loop iteration (1=success, 0=failed).
    pub fn record_success(&self, loop_name: &str, success: bool) {
        self.loops
            .last_success
            .with_label_values(&[loop_name])
            .set(if success { 1 } else { 0 });
    }

    /// Increment the error counter for a loop.
    pub fn inc_error(&self, loop_name: &str) {
        self.loops
            .errors_total
            .with_label_values(&[loop_name])
            .inc();
    }

    /// Record the current production counter for a machine.
    pub fn set_production_count(&self, plant: &str, machine: &str, count: u64) {
        self.production
            .counter_units
            .with_label_values(&[plant, machine])
            .set(count as i64);
    }

    /// Record how long a machine has gone without a counter increase.
    pub fn set_stagnant_seconds(&self, plant: &str, machine: &str, seconds: i64) {
        self.production
            .stagnant_seconds
            .with_label_values(&[plant, machine])
            .set(seconds as f64);
    }

    /// Count a stagnation alert transition ("raised" or "reopened").
    pub fn inc_alert_transition(&self, plant: &str, transition: &str) {
        self.alerts
            .transitions_total
            .with_label_values(&[plant, transition])
            .inc();
    }

    /// Update headline alert-list gauges.
    pub fn set_alert_totals(&self, plant: &str, open: usize, unread: usize, action_required: usize) {
        let plant_label = &[plant];
        self.alerts
            .open
            .with_label_values(plant_label)
            .set(open as i64);
        self.alerts
            .unread
            .with_label_values(plant_label)
            .set(unread as i64);
        self.alerts
            .action_required
            .with_label_values(plant_label)
            .set(action_required as i64);
    }

    pub fn encode(&self) -> Result<String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

#[derive(Clone)]
struct LoopMetrics {
    tick_duration: HistogramVec,
    last_success: IntGaugeVec,
    errors_total: IntCounterVec,
}

impl LoopMetrics {
    fn register(registry: &Registry) -> Result<Self> {
        let tick_duration = HistogramVec::new(
            HistogramOpts::new("loop_tick_duration_seconds", "Tick duration per loop"),
            &["loop"],
        )?;
        let last_success = IntGaugeVec::new(
            Opts::new(
                "loop_last_success",
                "Whether the last loop iteration succeeded",
            ),
            &["loop"],
        )?;
        let errors_total = IntCounterVec::new(
            Opts::new("loop_errors_total", "Loop iteration failures"),
            &["loop"],
        )?;

        registry.register(Box::new(tick_duration.clone()))?;
        registry.register(Box::new(last_success.clone()))?;
        registry.register(Box::new(errors_total.clone()))?;

        Ok(Self {
            tick_duration,
            last_success,
            errors_total,
        })
    }
}

#[derive(Clone)]
struct ProductionMetrics {
    counter_units: IntGaugeVec,
    stagnant_seconds: GaugeVec,
}

impl ProductionMetrics {
    fn register(registry: &Registry) -> Result<Self> {
        let counter_units = IntGaugeVec::new(
            Opts::new(
                "production_counter_units",
                "Simulated production counter per machine",
            ),
            &["plant", "machine"],
        )?;
        let stagnant_seconds = GaugeVec::new(
            Opts::new(
                "production_stagnant_seconds",
                "Seconds since the production counter last increased",
            ),
            &["plant", "machine"],
        )?;

        registry.register(Box::new(counter_units.clone()))?;
        registry.register(Box::new(stagnant_seconds.clone()))?;

        Ok(Self {
            counter_units,
            stagnant_seconds,
        })
    }
}

#[derive(Clone)]
struct AlertMetrics {
    transitions_total: IntCounterVec,
    open: IntGaugeVec,
    unread: IntGaugeVec,
    action_required: IntGaugeVec,
}

impl AlertMetrics {
    fn register(registry: &Registry) -> Result<Self> {
        let transitions_total = IntCounterVec::new(
            Opts::new(
                "alert_transitions_total",
                "Stagnation alert transitions by kind",
            ),
            &["plant", "transition"],
        )?;
        let open = IntGaugeVec::new(
            Opts::new("alerts_open", "Alerts currently in the store"),
            &["plant"],
        )?;
        let unread = IntGaugeVec::new(Opts::new("alerts_unread", "Unread alerts"), &["plant"])?;
        let action_required = IntGaugeVec::new(
            Opts::new(
                "alerts_action_required",
                "Unread alerts flagged action-required",
            ),
            &["plant"],
        )?;

        registry.register(Box::new(transitions_total.clone()))?;
        registry.register(Box::new(open.clone()))?;
        registry.register(Box::new(unread.clone()))?;
        registry.register(Box::new(action_required.clone()))?;

        Ok(Self {
            transitions_total,
            open,
            unread,
            action_required,
        })
    }
}
