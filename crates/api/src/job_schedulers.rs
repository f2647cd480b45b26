use crate::{
    reminder::fire_due_reminders::{FireDueRemindersUseCase, FireReport},
    shared::usecase::execute,
};
use anniv_scheduler_infra::AnnivContext;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Seconds until the next multiple of `interval_secs` since the epoch
pub fn get_start_delay(now_ts: i64, interval_secs: u64) -> u64 {
    let interval_secs = interval_secs.max(1);
    let now_secs = (now_ts / 1000).max(0) as u64;
    interval_secs - now_secs % interval_secs
}

/// Polls for due reminders on every interval boundary until `shutdown` is
/// cancelled. A poll that already started is finished before the job exits.
pub fn start_fire_reminders_job(ctx: AnnivContext, shutdown: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        let poll_interval = ctx.config.poll_interval_secs;
        let secs_to_next_run = get_start_delay(ctx.sys.get_timestamp_millis(), poll_interval);
        let start = Instant::now() + Duration::from_secs(secs_to_next_run);
        let mut ticker = interval_at(start, Duration::from_secs(poll_interval));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(
            "Reminder scanner starts in {} seconds, polling every {} seconds",
            secs_to_next_run, poll_interval
        );

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    drain_due_reminders(&ctx, &shutdown).await;
                }
            }
        }
        info!("Reminder scanner stopped");
    })
}

/// Fires batches of due reminders until the backlog is gone, a batch
/// fails, or shutdown is requested
pub async fn drain_due_reminders(ctx: &AnnivContext, shutdown: &CancellationToken) -> FireReport {
    let batch_size = ctx.config.claim_batch_size;
    let mut total = FireReport::default();

    while !shutdown.is_cancelled() {
        let usecase = FireDueRemindersUseCase { batch_size };
        let report = match execute(usecase, ctx).await {
            Ok(report) => report,
            Err(_) => break,
        };
        total.claimed += report.claimed;
        total.dispatched += report.dispatched;
        total.exhausted += report.exhausted;
        total.failed += report.failed;
        if !report.has_backlog(batch_size) {
            break;
        }
    }

    if total.failed > 0 {
        warn!(
            "{} of {} claimed reminder slots failed and will be retried",
            total.failed, total.claimed
        );
    } else if total.claimed > 0 {
        info!(
            "Fired {} reminders, {} slots exhausted",
            total.dispatched, total.exhausted
        );
    }
    total
}
