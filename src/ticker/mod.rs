use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};

use anyhow::Result;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::app::AppContext;

mod detector;
mod simulator;

pub const SIMULATOR_LOOP: &str = "simulator";
pub const DETECTOR_LOOP: &str = "detector";

type LoopFuture = Pin<Box<dyn Future<Output = Result<()>> + Send>>;
type LoopFn = fn(AppContext) -> LoopFuture;

/// Spawn both tick loops and return their join handles. The handles are
/// aborted on shutdown so no timer keeps mutating state nobody observes.
pub fn spawn_all(ctx: AppContext) -> Vec<JoinHandle<()>> {
    let intervals = ctx.config.sample_intervals.clone();

    vec![
        spawn_loop(
            ctx.clone(),
            SIMULATOR_LOOP,
            intervals.simulator,
            Duration::from_millis(50),
            tick_simulator,
        ),
        spawn_loop(
            ctx,
            DETECTOR_LOOP,
            intervals.detector,
            Duration::from_millis(50),
            tick_detector,
        ),
    ]
}

fn spawn_loop(
    ctx: AppContext,
    loop_name: &'static str,
    interval: Duration,
    budget: Duration,
    tick_fn: LoopFn,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            loop_name,
            interval = ?interval,
            budget = ?budget,
            "starting tick loop"
        );

        // tokio::time::interval() completes the first tick immediately,
        // so both loops run once on startup before settling into their period
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if let Err(err) = tick_once(ctx.clone(), loop_name, budget, tick_fn).await {
                error!(loop_name, error = ?err, "tick loop iteration failed");
            }
        }
    })
}

async fn tick_once(
    ctx: AppContext,
    loop_name: &'static str,
    budget: Duration,
    tick_fn: LoopFn,
) -> Result<()> {
    let start = Instant::now();
    match tick_fn(ctx.clone()).await {
        Ok(()) => {
            let elapsed = start.elapsed();
            ctx.metrics.observe_duration(loop_name, elapsed);
            if elapsed > budget {
                warn!(
                    loop_name,
                    elapsed = ?elapsed,
                    budget = ?budget,
                    "loop exceeded budget"
                );
            } else {
                debug!(
                    loop_name,
                    elapsed = ?elapsed,
                    "loop completed successfully"
                );
            }
            ctx.metrics.record_success(loop_name, true);
            ctx.state.record_loop_success(loop_name).await;
            Ok(())
        }
        Err(err) => {
            ctx.metrics.record_success(loop_name, false);
            ctx.metrics.inc_error(loop_name);
            ctx.state
                .record_loop_failure(loop_name, err.to_string())
                .await;
            Err(err)
        }
    }
}

fn tick_simulator(ctx: AppContext) -> LoopFuture {
    Box::pin(async move { simulator::run(&ctx).await })
}

fn tick_detector(ctx: AppContext) -> LoopFuture {
    Box::pin(async move { detector::run(&ctx).await })
}
