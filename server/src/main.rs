use std::env;
use std::sync::Arc;

use arrival_schema::SequenceSnapshot;
use futures::StreamExt;

use arrival_server::{
    ReplayRunner, Runner, SequenceScheduler, SequenceService, Settings, TableArrivalLookup,
    TableFixLookup, TablePerformanceLookup, WakeSeparationRules, SAMPLE_AIRPORT,
    SAMPLE_ARRIVALS_CSV_PATH,
};

#[tokio::main]
pub async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    env_logger::init();

    let settings = Settings::from_env()?;
    let csv_path = env::var("REPLAY_CSV").unwrap_or_else(|_| SAMPLE_ARRIVALS_CSV_PATH.to_string());

    let arrivals = Arc::new(TableArrivalLookup::sample());
    let service = Arc::new(SequenceService::new(
        SequenceScheduler::new(Arc::new(WakeSeparationRules::default()), arrivals.clone()),
        Arc::new(TablePerformanceLookup::default()),
        Arc::new(TableFixLookup::sample()),
        arrivals,
        settings.clone(),
    ));
    service.provider().create(SAMPLE_AIRPORT.clone()).await?;

    let runner = ReplayRunner::from_csv_path(&csv_path)?.with_speed(settings.replay_speed);

    let (subscription_id, snapshots) = service.subscribe();
    let monitor = snapshots.for_each(|snapshot| {
        log::info!("{}", summarize(&snapshot));
        futures::future::ready(())
    });

    log::info!("replaying {csv_path} at {:?}", settings.replay_speed);

    tokio::select! {
        result = runner.run(service.clone()) => match result {
            Ok(tracked) => log::info!("replay finished with {tracked} flights still tracked"),
            Err(e) => log::error!("replay failed: {e}"),
        },
        _ = monitor => log::warn!("snapshot stream closed before the replay finished"),
    }
    service.unsubscribe(subscription_id);

    let misses = service.misses();
    log::info!(
        "lookup misses: {} trajectories ({} without an average), {} fixes",
        misses.trajectory(),
        misses.average_trajectory(),
        misses.fix()
    );

    Ok(())
}

/// One line per snapshot: each flight's callsign, runway and landing time
fn summarize(snapshot: &SequenceSnapshot) -> String {
    let flights = snapshot
        .flights
        .iter()
        .map(|flight| {
            format!(
                "{} {} {}",
                flight.callsign(),
                flight.assigned_runway().unwrap_or("-"),
                flight.scheduled_landing_time().format("%H:%M:%S")
            )
        })
        .collect::<Vec<_>>();

    format!(
        "{} {} [{}] {}",
        snapshot.airport,
        snapshot.time.format("%H:%M:%S"),
        snapshot.current_runway_mode,
        flights.join(", ")
    )
}
