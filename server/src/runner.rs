use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arrival_schema::{Coordinate, FlightPosition, Scheduler};
use chrono::{DateTime, NaiveTime, TimeDelta, Utc};
use tokio_util::sync::CancellationToken;

use crate::{run_ticks, FeederFixUpdate, FlightUpdate, SequenceService, SequenceScheduler};

pub const SAMPLE_ARRIVALS_CSV_PATH: &str = "./test_data/arrivals.csv";

type Success = <ReplayRunner as Runner<SequenceScheduler>>::Success;
type Error = <ReplayRunner as Runner<SequenceScheduler>>::Error;
type Response = Pin<Box<dyn Future<Output = Result<Success, Error>>>>;

/// A `Runner` drives a `SequenceService` with flight data from some source. It returns
/// a `Response` future, which may be polled to drive its operation until the source
/// is exhausted.
pub trait Runner<S: Scheduler> {
    type Response: Future<Output = Result<Self::Success, Self::Error>>;
    type Success;
    type Error;

    fn run(&self, service: Arc<SequenceService<S>>) -> Self::Response;
}

/// Allows running in fast-forward or slow-motion instead of real-time
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Speed {
    #[default]
    RealTime,
    /// Speed up the runner by the provided multiplier (e.g. `2` gives double speed)
    FastForward(u32),
    /// Slow down the runner by the provided multiplier (e.g. `2` gives half speed)
    SlowMotion(u32),
}

impl Speed {
    pub fn adjust_duration(&self, duration: Duration) -> Duration {
        match self {
            Self::RealTime => duration,
            Self::FastForward(x) => duration / (*x).max(1),
            Self::SlowMotion(x) => duration * (*x).max(1),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid speed '{0}', expected 'realtime', 'xN' or '/N'")]
pub struct ParseSpeedError(String);

impl FromStr for Speed {
    type Err = ParseSpeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let factor = |n: &str| n.parse::<u32>().ok().filter(|n| *n > 0);

        if s == "realtime" {
            return Ok(Self::RealTime);
        }

        s.strip_prefix('x')
            .and_then(factor)
            .map(Self::FastForward)
            .or_else(|| s.strip_prefix('/').and_then(factor).map(Self::SlowMotion))
            .ok_or_else(|| ParseSpeedError(s.to_string()))
    }
}

/// One line of a replay file
#[derive(Clone, Debug, PartialEq)]
struct Record {
    /// Time in __seconds__ _since midnight_ the update was received
    time: i64,
    callsign: String,
    aircraft_type: String,
    origin: String,
    destination: String,
    /// Feeder fix and its estimate in seconds since midnight
    feeder_fix: Option<(String, i64)>,
    landing_estimate: i64,
    position: FlightPosition,
}

impl Record {
    /// `time, callsign, type, origin, destination, feeder fix, feeder fix estimate,
    /// landing estimate, latitude, longitude, altitude, ground speed`; a feeder fix of
    /// `-` means the flight has none.
    fn from_csv(path: &str) -> Result<Vec<Self>, Box<dyn std::error::Error>> {
        let csv_bytes = std::fs::read(path)?;
        let mut records = vec![];

        for line in String::from_utf8(csv_bytes)?.lines() {
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }

            let values = line.split(", ").collect::<Vec<_>>();
            if values.len() != 12 {
                return Err(format!("expected 12 values, got {}: '{line}'", values.len()).into());
            }

            records.push(Self {
                time: values[0].parse::<i64>()?,
                callsign: values[1].to_string(),
                aircraft_type: values[2].to_string(),
                origin: values[3].to_string(),
                destination: values[4].to_string(),
                feeder_fix: match values[5] {
                    "-" => None,
                    fix => Some((fix.to_string(), values[6].parse::<i64>()?)),
                },
                landing_estimate: values[7].parse::<i64>()?,
                position: FlightPosition {
                    coordinate: Coordinate::new(values[8].parse()?, values[9].parse()?),
                    altitude_ft: values[10].parse()?,
                    ground_speed_kt: values[11].parse()?,
                },
            });
        }

        Ok(records)
    }

    fn to_update(&self, midnight: DateTime<Utc>) -> FlightUpdate {
        let at = |seconds: i64| midnight + TimeDelta::seconds(seconds);

        FlightUpdate {
            callsign: self.callsign.as_str().into(),
            aircraft_type: self.aircraft_type.clone(),
            origin: Some(self.origin.clone()),
            destination: self.destination.clone(),
            feeder_fix: self.feeder_fix.as_ref().map(|(identifier, estimate)| FeederFixUpdate {
                identifier: identifier.clone(),
                system_estimate: at(*estimate),
                actual_time_over: None,
            }),
            landing_system_estimate: at(self.landing_estimate),
            arrival: None,
            runway: None,
            position: Some(self.position),
        }
    }
}

/// Replays recorded flight updates through a `SequenceService`, on a simulated clock
/// running at the configured `Speed`.
pub struct ReplayRunner {
    speed: Speed,
    midnight: DateTime<Utc>,
    records: Vec<Record>,
}

impl ReplayRunner {
    /// Simulated time keeps running this long after the last update so the last
    /// arrivals can land
    const DRAIN_SECONDS: i64 = 2 * 60 * 60;

    pub fn from_csv_path(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self {
            speed: Default::default(),
            midnight: Utc::now().date_naive().and_time(NaiveTime::MIN).and_utc(),
            records: Record::from_csv(path)?,
        })
    }

    /// Run with the provided `Speed`
    pub fn with_speed(mut self, speed: Speed) -> Self {
        self.speed = speed;
        self
    }

    /// Replay the day starting at the provided midnight instead of today's
    pub fn with_midnight(mut self, midnight: DateTime<Utc>) -> Self {
        self.midnight = midnight;
        self
    }

    async fn run_inner(
        speed: Speed,
        midnight: DateTime<Utc>,
        mut records: Vec<Record>,
        service: Arc<SequenceService<SequenceScheduler>>,
    ) -> Result<Success, Error> {
        records.sort_by_key(|record| record.time);
        let (first, last) = match (records.first(), records.last()) {
            (Some(first), Some(last)) => (first.time, last.time),
            _ => return Err("No flight updates".to_string()),
        };

        // Seconds since midnight on the simulated clock
        let elapsed = Arc::new(AtomicI64::new(first));
        let clock = {
            let elapsed = elapsed.clone();
            move || midnight + TimeDelta::seconds(elapsed.load(Ordering::Relaxed))
        };

        let cancellation = CancellationToken::new();
        let tick_period = speed.adjust_duration(service.settings().tick_interval);
        let ticks = service
            .provider()
            .airports()
            .await
            .into_iter()
            .map(|airport| {
                tokio::spawn(run_ticks(
                    service.clone(),
                    airport,
                    tick_period,
                    clock.clone(),
                    cancellation.clone(),
                ))
            })
            .collect::<Vec<_>>();

        let adjusted_sleep_duration = speed.adjust_duration(Duration::from_secs(1));
        let mut records = records.into_iter().peekable();
        let mut rejected = HashMap::<String, usize>::new();

        for current_time in first..=last + Self::DRAIN_SECONDS {
            elapsed.store(current_time, Ordering::Relaxed);

            while let Some(record) = records.next_if(|record| record.time <= current_time) {
                let now = clock();
                let update = record.to_update(midnight);
                if let Err(e) = service.update_flight(&record.destination, update, now).await {
                    log::warn!("{} at {now}: {e}", record.callsign);
                    *rejected.entry(record.destination).or_default() += 1;
                }
            }

            tokio::time::sleep(adjusted_sleep_duration).await;
        }

        cancellation.cancel();
        for tick in ticks {
            tick.await.map_err(|e| e.to_string())?;
        }

        for (airport, count) in rejected {
            log::info!("{airport}: {count} updates rejected");
        }

        let mut tracked = 0;
        for airport in service.provider().airports().await {
            let sequence = service
                .provider()
                .acquire(&airport)
                .await
                .map_err(|e| e.to_string())?;
            tracked += sequence.flights().len() + sequence.desequenced().len();
        }

        Ok(tracked)
    }
}

impl Runner<SequenceScheduler> for ReplayRunner {
    type Response = Response;
    /// Number of flights still tracked once the replay has drained
    type Success = usize;
    /// Description of what went wrong
    type Error = String;

    fn run(&self, service: Arc<SequenceService<SequenceScheduler>>) -> Self::Response {
        let records = self.records.clone();
        let speed = self.speed;
        let midnight = self.midnight;
        Box::pin(async move { Self::run_inner(speed, midnight, records, service).await })
    }
}

#[cfg(test)]
mod test {
    use chrono::TimeZone;

    use super::*;
    use crate::{
        Settings, TableArrivalLookup, TableFixLookup, TablePerformanceLookup, WakeSeparationRules,
        SAMPLE_AIRPORT,
    };

    const ARRIVALS_PATH: &'static str = "../test_data/arrivals.csv";

    #[test]
    fn test_parse_speed() {
        assert_eq!("realtime".parse::<Speed>().unwrap(), Speed::RealTime);
        assert_eq!("x60".parse::<Speed>().unwrap(), Speed::FastForward(60));
        assert_eq!("/2".parse::<Speed>().unwrap(), Speed::SlowMotion(2));
        assert!("x0".parse::<Speed>().is_err());
        assert!("fast".parse::<Speed>().is_err());
        assert!("".parse::<Speed>().is_err());

        assert_eq!(
            Speed::FastForward(60).adjust_duration(Duration::from_secs(30)),
            Duration::from_millis(500)
        );
        assert_eq!(
            Speed::SlowMotion(2).adjust_duration(Duration::from_secs(1)),
            Duration::from_secs(2)
        );
    }

    #[test]
    fn test_parse_records() -> Result<(), Box<dyn std::error::Error>> {
        let records = Record::from_csv(ARRIVALS_PATH)?;
        assert!(!records.is_empty());

        let midnight = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let update = records[0].to_update(midnight);
        assert_eq!(update.destination, "YSSY");
        assert!(update.landing_system_estimate > midnight);

        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_replay_drains() -> Result<(), Box<dyn std::error::Error>> {
        let arrivals = Arc::new(TableArrivalLookup::sample());
        let service = Arc::new(SequenceService::new(
            SequenceScheduler::new(Arc::new(WakeSeparationRules::default()), arrivals.clone()),
            Arc::new(TablePerformanceLookup::default()),
            Arc::new(TableFixLookup::sample()),
            arrivals,
            Settings::default(),
        ));
        service.provider().create(SAMPLE_AIRPORT.clone()).await?;
        let (_, mut snapshots) = service.subscribe();

        let runner = ReplayRunner::from_csv_path(ARRIVALS_PATH)?
            .with_midnight(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        let tracked = runner.run(service.clone()).await?;

        // everything has landed and been purged
        assert_eq!(tracked, 0);

        let mut landed = 0;
        while let Ok(Some(snapshot)) = snapshots.try_next() {
            landed = landed.max(
                snapshot
                    .flights
                    .iter()
                    .filter(|flight| flight.state() == arrival_schema::State::Landed)
                    .count(),
            );
        }
        assert!(landed > 0);

        Ok(())
    }
}
