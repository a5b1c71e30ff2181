use anyhow::Result;
use chrono::Utc;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use tracing::{debug, instrument};

use crate::app::AppContext;

/// One counter-simulator tick: advance production counters for active
/// machines and publish the new counts as gauges. Stand-in for a real
/// telemetry feed; the transition itself lives in [`crate::state::FloorState`].
#[instrument(skip_all)]
pub async fn run(ctx: &AppContext) -> Result<()> {
    let now = Utc::now();
    // SmallRng per tick: ThreadRng is not Send and cannot be held across
    // the state lock await point.
    let mut rng = SmallRng::from_entropy();

    let advances = ctx.state.simulator_tick(&ctx.registry, now, &mut rng).await;

    for advance in &advances {
        debug!(
            machine = %advance.machine_id,
            increment = advance.increment,
            count = advance.count,
            "production counter advanced"
        );
        ctx.metrics
            .set_production_count(ctx.plant_name(), &advance.machine_id, advance.count);
    }

    Ok(())
}
