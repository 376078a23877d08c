use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arrival_schema::{AircraftProfile, ArrivalLookup};
use chrono::TimeDelta;

/// Counts of lookups that fell back to a default, for tuning the lookup tables
#[derive(Debug, Default)]
pub struct LookupMisses {
    trajectory: AtomicU64,
    average_trajectory: AtomicU64,
    fix: AtomicU64,
}

impl LookupMisses {
    /// Runway or arrival-specific trajectories that were not found
    pub fn trajectory(&self) -> u64 {
        self.trajectory.load(Ordering::Relaxed)
    }

    /// Trajectory misses that had no airport average to fall back to either
    pub fn average_trajectory(&self) -> u64 {
        self.average_trajectory.load(Ordering::Relaxed)
    }

    pub fn fix(&self) -> u64 {
        self.fix.load(Ordering::Relaxed)
    }

    pub(crate) fn record_fix(&self) {
        self.fix.fetch_add(1, Ordering::Relaxed);
    }
}

/// Time-to-go lookup with an airport-average fallback
pub struct TrajectoryService {
    arrivals: Arc<dyn ArrivalLookup>,
    misses: Arc<LookupMisses>,
}

impl TrajectoryService {
    pub fn new(arrivals: Arc<dyn ArrivalLookup>, misses: Arc<LookupMisses>) -> Self {
        Self { arrivals, misses }
    }

    pub fn time_to_go(
        &self,
        airport: &str,
        feeder_fix: &str,
        arrival: Option<&str>,
        runway: &str,
        aircraft: &AircraftProfile,
    ) -> Option<TimeDelta> {
        if let Some(time_to_go) =
            self.arrivals
                .time_to_go(airport, feeder_fix, arrival, runway, aircraft)
        {
            return Some(time_to_go);
        }

        self.misses.trajectory.fetch_add(1, Ordering::Relaxed);
        log::warn!(
            "{airport}: no trajectory from {feeder_fix} via {} to {runway} for {}, using the average",
            arrival.unwrap_or("any arrival"),
            aircraft.type_code
        );

        let average = self.arrivals.average_time_to_go(airport, feeder_fix);
        if average.is_none() {
            self.misses.average_trajectory.fetch_add(1, Ordering::Relaxed);
            log::warn!("{airport}: no average trajectory from {feeder_fix}");
        }

        average
    }
}

#[cfg(test)]
pub(crate) mod test {
    use arrival_schema::{AircraftCategory, WakeCategory};

    use super::*;

    /// Fixed time-to-go for one runway, with an average for everything else
    pub(crate) struct FixedArrivals {
        pub runway: &'static str,
        pub time_to_go: TimeDelta,
        pub average: Option<TimeDelta>,
    }

    impl ArrivalLookup for FixedArrivals {
        fn time_to_go(
            &self,
            _airport: &str,
            _feeder_fix: &str,
            _arrival: Option<&str>,
            runway: &str,
            _aircraft: &AircraftProfile,
        ) -> Option<TimeDelta> {
            (runway == self.runway).then_some(self.time_to_go)
        }

        fn average_time_to_go(&self, _airport: &str, _feeder_fix: &str) -> Option<TimeDelta> {
            self.average
        }

        fn arrival_interval(
            &self,
            _airport: &str,
            _feeder_fix: &str,
            _runway: &str,
            _aircraft: &AircraftProfile,
        ) -> Option<TimeDelta> {
            None
        }
    }

    #[test]
    fn test_falls_back_to_average_and_counts_misses() {
        let misses = Arc::new(LookupMisses::default());
        let service = TrajectoryService::new(
            Arc::new(FixedArrivals {
                runway: "34L",
                time_to_go: TimeDelta::minutes(18),
                average: Some(TimeDelta::minutes(20)),
            }),
            misses.clone(),
        );
        let aircraft = AircraftProfile::new("B738", WakeCategory::Medium, AircraftCategory::Jet);

        assert_eq!(
            service.time_to_go("YSSY", "RIVET", None, "34L", &aircraft),
            Some(TimeDelta::minutes(18))
        );
        assert_eq!(misses.trajectory(), 0);

        assert_eq!(
            service.time_to_go("YSSY", "RIVET", None, "34R", &aircraft),
            Some(TimeDelta::minutes(20))
        );
        assert_eq!(misses.trajectory(), 1);
        assert_eq!(misses.average_trajectory(), 0);
    }

    #[test]
    fn test_no_average_available() {
        let misses = Arc::new(LookupMisses::default());
        let service = TrajectoryService::new(
            Arc::new(FixedArrivals {
                runway: "34L",
                time_to_go: TimeDelta::minutes(18),
                average: None,
            }),
            misses.clone(),
        );
        let aircraft = AircraftProfile::new("B738", WakeCategory::Medium, AircraftCategory::Jet);

        assert_eq!(service.time_to_go("YSSY", "RIVET", None, "34R", &aircraft), None);
        assert_eq!(misses.average_trajectory(), 1);
    }
}
