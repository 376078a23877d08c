use std::sync::Arc;

use arrival_schema::{AirportConfiguration, FixCrossing, FixLookup, Flight, FlightPosition};
use chrono::{DateTime, TimeDelta, Utc};

use crate::{LookupMisses, TrajectoryService};

/// Derives feeder-fix and landing estimates from system estimates and surveillance
pub struct EstimateProvider {
    fixes: Arc<dyn FixLookup>,
    trajectories: TrajectoryService,
    misses: Arc<LookupMisses>,
}

impl EstimateProvider {
    pub fn new(
        fixes: Arc<dyn FixLookup>,
        trajectories: TrajectoryService,
        misses: Arc<LookupMisses>,
    ) -> Self {
        Self {
            fixes,
            trajectories,
            misses,
        }
    }

    /// Distance from the position to a fix, if the fix is known
    pub fn distance_to_fix_nm(&self, fix: &str, position: &FlightPosition) -> Option<f64> {
        match self.fixes.coordinate(fix) {
            Some(coordinate) => Some(position.coordinate.distance_nm(&coordinate)),
            None => {
                self.misses.record_fix();
                log::warn!("no coordinates for fix {fix}");
                None
            }
        }
    }

    /// Fuses the system estimate with a radar-derived one once the flight is close
    /// enough to the fix for its ground speed to be meaningful.
    pub fn feeder_fix_estimate(
        &self,
        airport: &AirportConfiguration,
        fix: &str,
        system_estimate: DateTime<Utc>,
        position: Option<&FlightPosition>,
        now: DateTime<Utc>,
    ) -> DateTime<Utc> {
        let Some(position) = position else {
            return system_estimate;
        };
        let Some(distance_nm) = self.distance_to_fix_nm(fix, position) else {
            return system_estimate;
        };
        if distance_nm > airport.feeder_fix_estimate_source_range_nm
            || position.ground_speed_kt <= 0.0
        {
            return system_estimate;
        }

        let hours = distance_nm / position.ground_speed_kt;
        let radar_estimate = now + TimeDelta::milliseconds((hours * 3_600_000.0).round() as i64);

        radar_estimate + (system_estimate - radar_estimate) / 2
    }

    /// Feeder-fix time plus time-to-go along the assigned arrival to the assigned runway.
    ///
    /// Falls back to the system estimate when the flight has no feeder fix or runway,
    /// crossed the fix before it was tracked, or no trajectory is known.
    pub fn landing_estimate(
        &self,
        airport: &str,
        flight: &Flight,
        system_estimate: DateTime<Utc>,
    ) -> DateTime<Utc> {
        let (Some(fix), Some(runway)) = (flight.feeder_fix(), flight.assigned_runway()) else {
            return system_estimate;
        };
        if fix.crossing() == Some(FixCrossing::Untracked) {
            return system_estimate;
        }

        let Some(time_to_go) = self.trajectories.time_to_go(
            airport,
            fix.identifier(),
            flight.assigned_arrival(),
            runway,
            flight.aircraft(),
        ) else {
            return system_estimate;
        };

        fix.actual_time_over().unwrap_or(fix.estimate()) + time_to_go
    }
}

#[cfg(test)]
mod test {
    use std::collections::HashMap;

    use arrival_schema::{
        AircraftCategory, AircraftProfile, Coordinate, RunwayMode, WakeCategory,
    };
    use chrono::TimeZone;

    use super::*;
    use crate::trajectory::test::FixedArrivals;

    struct Fixes(HashMap<&'static str, Coordinate>);

    impl FixLookup for Fixes {
        fn coordinate(&self, identifier: &str) -> Option<Coordinate> {
            self.0.get(identifier).copied()
        }
    }

    fn time(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, hour, minute, 0).unwrap()
    }

    fn provider() -> EstimateProvider {
        let misses = Arc::new(LookupMisses::default());
        EstimateProvider::new(
            Arc::new(Fixes(HashMap::from([("RIVET", Coordinate::new(-34.0, 151.0))]))),
            TrajectoryService::new(
                Arc::new(FixedArrivals {
                    runway: "34L",
                    time_to_go: TimeDelta::minutes(18),
                    average: Some(TimeDelta::minutes(20)),
                }),
                misses.clone(),
            ),
            misses,
        )
    }

    fn airport() -> AirportConfiguration {
        AirportConfiguration {
            identifier: "YSSY".to_string(),
            runway_modes: vec![RunwayMode::new("34IVA", vec![], TimeDelta::minutes(5))],
            feeder_fixes: vec!["RIVET".to_string()],
            feeder_fix_estimate_source_range_nm: 100.0,
        }
    }

    fn position(latitude: f64, ground_speed_kt: f64) -> FlightPosition {
        FlightPosition {
            coordinate: Coordinate::new(latitude, 151.0),
            altitude_ft: 20_000,
            ground_speed_kt,
        }
    }

    fn flight() -> Flight {
        Flight::new(
            "QFA1".into(),
            AircraftProfile::new("B738", WakeCategory::Medium, AircraftCategory::Jet),
            "YSSY",
            time(10, 30),
        )
        .with_feeder_fix("RIVET", time(10, 10))
    }

    #[test]
    fn test_feeder_fix_estimate_without_position() {
        let provider = provider();
        assert_eq!(
            provider.feeder_fix_estimate(&airport(), "RIVET", time(10, 10), None, time(9, 0)),
            time(10, 10)
        );
    }

    #[test]
    fn test_feeder_fix_estimate_out_of_range() {
        let provider = provider();

        // 120nm from the fix
        let position = position(-32.0, 480.0);
        assert_eq!(
            provider.feeder_fix_estimate(&airport(), "RIVET", time(10, 10), Some(&position), time(9, 0)),
            time(10, 10)
        );
    }

    #[test]
    fn test_feeder_fix_estimate_averages_sources() {
        let provider = provider();

        // 60nm from the fix at 360kt: radar says ten minutes
        let position = position(-33.0, 360.0);
        let estimate = provider.feeder_fix_estimate(
            &airport(),
            "RIVET",
            time(10, 14),
            Some(&position),
            time(10, 0),
        );
        assert!((estimate - time(10, 12)).num_seconds().abs() <= 1);
    }

    #[test]
    fn test_feeder_fix_estimate_unknown_fix() {
        let provider = provider();
        let position = position(-33.0, 360.0);
        assert_eq!(
            provider.feeder_fix_estimate(&airport(), "BOREE", time(10, 14), Some(&position), time(10, 0)),
            time(10, 14)
        );
        assert_eq!(provider.misses.fix(), 1);
    }

    #[test]
    fn test_landing_estimate() {
        let provider = provider();

        // no runway yet
        let mut flight = flight();
        assert_eq!(provider.landing_estimate("YSSY", &flight, time(10, 35)), time(10, 35));

        flight.assign_runway("34L", false);
        assert_eq!(provider.landing_estimate("YSSY", &flight, time(10, 35)), time(10, 28));

        // average for unknown runway trajectories
        flight.assign_runway("34R", false);
        assert_eq!(provider.landing_estimate("YSSY", &flight, time(10, 35)), time(10, 30));
    }

    #[test]
    fn test_landing_estimate_after_crossing() {
        let provider = provider();
        let mut flight = flight().with_runway("34L");
        flight
            .record_feeder_fix_crossing(FixCrossing::Observed(time(10, 12)))
            .unwrap();
        assert_eq!(provider.landing_estimate("YSSY", &flight, time(10, 35)), time(10, 30));

        let mut flight = self::flight().with_runway("34L");
        flight.record_feeder_fix_crossing(FixCrossing::Untracked).unwrap();
        assert_eq!(provider.landing_estimate("YSSY", &flight, time(10, 35)), time(10, 35));
    }
}
