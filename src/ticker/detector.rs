use anyhow::Result;
use chrono::Utc;
use tracing::{info, instrument, warn};

use crate::app::AppContext;
use crate::registry::MachineStatus;
use crate::state::AlertTransition;

/// One stagnation-detector tick: run the alert rule over all active machines
/// and refresh the alert and stagnation gauges.
#[instrument(skip_all)]
pub async fn run(ctx: &AppContext) -> Result<()> {
    let now = Utc::now();

    let transitions = ctx.state.detector_tick(&ctx.registry, now).await;
    for transition in &transitions {
        match transition {
            AlertTransition::Raised { machine_id } => {
                warn!(machine = %machine_id, "stagnant production alert raised");
                ctx.metrics.inc_alert_transition(ctx.plant_name(), "raised");
            }
            AlertTransition::Reopened { machine_id } => {
                info!(machine = %machine_id, "stagnant production alert reopened");
                ctx.metrics
                    .inc_alert_transition(ctx.plant_name(), "reopened");
            }
        }
    }

    let snapshots = ctx.state.machine_snapshots(&ctx.registry, now).await;
    for snapshot in snapshots
        .iter()
        .filter(|s| s.status == MachineStatus::Active)
    {
        ctx.metrics
            .set_stagnant_seconds(ctx.plant_name(), &snapshot.id, snapshot.stagnant_seconds);
    }

    let alerts = ctx.state.alerts().await;
    let unread = alerts.iter().filter(|a| !a.is_read).count();
    let action_required = alerts
        .iter()
        .filter(|a| a.action_required && !a.is_read)
        .count();
    ctx.metrics
        .set_alert_totals(ctx.plant_name(), alerts.len(), unread, action_required);

    Ok(())
}
