use std::sync::Arc;
use std::time::Duration;

use arrival_schema::{Scheduler, SequencingError};
use chrono::{DateTime, Utc};
use futures::StreamExt;
use tokio::time::MissedTickBehavior;
use tokio_stream::wrappers::IntervalStream;
use tokio_util::sync::CancellationToken;

use crate::SequenceService;

/// Recomputes an airport's sequence every `period` until cancelled.
///
/// The first tick fires immediately. Ticks missed while a recomputation is still
/// running are skipped, so the loop never queues up behind itself. `clock` supplies
/// the time each tick is computed for.
pub async fn run_ticks<S, C>(
    service: Arc<SequenceService<S>>,
    airport: String,
    period: Duration,
    clock: C,
    cancellation: CancellationToken,
) where
    S: Scheduler,
    C: Fn() -> DateTime<Utc>,
{
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut ticks = IntervalStream::new(interval);

    log::info!("{airport}: ticking every {period:?}");

    loop {
        tokio::select! {
            _ = cancellation.cancelled() => break,
            tick = ticks.next() => {
                if tick.is_none() {
                    break;
                }

                match service.recompute(&airport, clock(), &cancellation).await {
                    Ok(()) => {}
                    Err(SequencingError::Cancelled(_)) => break,
                    Err(e @ SequencingError::UnknownAirport(_)) => {
                        log::warn!("{airport}: {e}");
                        break;
                    }
                    Err(e) => log::error!("{airport}: recompute failed: {e}"),
                }
            }
        }
    }

    log::info!("{airport}: ticking stopped");
}
