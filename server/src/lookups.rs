//! In-memory lookup tables, plus the sample airport the binary replays against.

use std::collections::HashMap;

use arrival_schema::{
    AircraftCategory, AircraftPerformance, AircraftProfile, AirportConfiguration, ArrivalLookup,
    Coordinate, FixLookup, PerformanceLookup, Runway, RunwayMode, WakeCategory,
};
use chrono::TimeDelta;
use once_cell::sync::Lazy;

pub static SAMPLE_AIRPORT: Lazy<AirportConfiguration> = Lazy::new(|| AirportConfiguration {
    identifier: "YSSY".to_string(),
    runway_modes: vec![
        RunwayMode::new(
            "34IVA",
            vec![
                Runway::new("34L", TimeDelta::minutes(3))
                    .with_preferred_feeder_fixes(&["BOREE", "MARLN"]),
                Runway::new("34R", TimeDelta::minutes(3))
                    .with_dependency("34L", TimeDelta::seconds(30))
                    .with_preferred_wake_categories(&[WakeCategory::Heavy, WakeCategory::SuperHeavy])
                    .with_preferred_feeder_fixes(&["RIVET"]),
            ],
            TimeDelta::minutes(5),
        ),
        RunwayMode::new(
            "16IVA",
            vec![
                Runway::new("16R", TimeDelta::minutes(3))
                    .with_preferred_wake_categories(&[WakeCategory::Heavy, WakeCategory::SuperHeavy])
                    .with_preferred_feeder_fixes(&["RIVET"]),
                Runway::new("16L", TimeDelta::minutes(3))
                    .with_dependency("16R", TimeDelta::seconds(30))
                    .with_preferred_feeder_fixes(&["BOREE", "MARLN"]),
            ],
            TimeDelta::minutes(5),
        ),
    ],
    feeder_fixes: vec!["RIVET".to_string(), "BOREE".to_string(), "MARLN".to_string()],
    feeder_fix_estimate_source_range_nm: 30.0,
});

/// Aircraft types known to the table; anything else resolves to the lookup fallback
pub struct TablePerformanceLookup {
    types: HashMap<String, AircraftPerformance>,
}

impl TablePerformanceLookup {
    pub fn new<'a>(
        types: impl IntoIterator<Item = (&'a str, WakeCategory, AircraftCategory)>,
    ) -> Self {
        Self {
            types: types
                .into_iter()
                .map(|(type_code, wake_category, category)| {
                    (
                        type_code.to_string(),
                        AircraftPerformance {
                            wake_category,
                            category,
                        },
                    )
                })
                .collect(),
        }
    }
}

impl Default for TablePerformanceLookup {
    fn default() -> Self {
        use AircraftCategory::*;
        use WakeCategory::*;

        Self::new([
            ("A320", Medium, Jet),
            ("A321", Medium, Jet),
            ("A332", Heavy, Jet),
            ("A388", SuperHeavy, Jet),
            ("B38M", Medium, Jet),
            ("B738", Medium, Jet),
            ("B789", Heavy, Jet),
            ("DH8D", Medium, NonJet),
            ("E190", Medium, Jet),
            ("SF34", Light, NonJet),
        ])
    }
}

impl PerformanceLookup for TablePerformanceLookup {
    fn performance(&self, type_code: &str) -> Option<AircraftPerformance> {
        self.types.get(type_code).copied()
    }
}

pub struct TableFixLookup {
    fixes: HashMap<String, Coordinate>,
}

impl TableFixLookup {
    pub fn new<'a>(fixes: impl IntoIterator<Item = (&'a str, Coordinate)>) -> Self {
        Self {
            fixes: fixes
                .into_iter()
                .map(|(identifier, coordinate)| (identifier.to_string(), coordinate))
                .collect(),
        }
    }

    /// Feeder fixes of the sample airport
    pub fn sample() -> Self {
        Self::new([
            ("RIVET", Coordinate::new(-34.45, 150.55)),
            ("BOREE", Coordinate::new(-33.05, 150.85)),
            ("MARLN", Coordinate::new(-33.35, 151.90)),
        ])
    }
}

impl FixLookup for TableFixLookup {
    fn coordinate(&self, identifier: &str) -> Option<Coordinate> {
        self.fixes.get(identifier).copied()
    }
}

/// Times to go from a feeder fix to a runway, optionally per arrival procedure.
///
/// Entries are not broken down by aircraft type.
#[derive(Default)]
pub struct TableArrivalLookup {
    /// (airport, feeder fix, arrival, runway) to time to go
    trajectories: HashMap<(String, String, Option<String>, String), TimeDelta>,
    /// (airport, feeder fix, runway) to minimum interval between arrivals
    intervals: HashMap<(String, String, String), TimeDelta>,
}

impl TableArrivalLookup {
    pub fn with_trajectory(
        mut self,
        airport: &str,
        feeder_fix: &str,
        arrival: Option<&str>,
        runway: &str,
        time_to_go: TimeDelta,
    ) -> Self {
        self.trajectories.insert(
            (
                airport.to_string(),
                feeder_fix.to_string(),
                arrival.map(str::to_string),
                runway.to_string(),
            ),
            time_to_go,
        );
        self
    }

    pub fn with_arrival_interval(
        mut self,
        airport: &str,
        feeder_fix: &str,
        runway: &str,
        interval: TimeDelta,
    ) -> Self {
        self.intervals.insert(
            (airport.to_string(), feeder_fix.to_string(), runway.to_string()),
            interval,
        );
        self
    }

    /// Trajectories of the sample airport
    pub fn sample() -> Self {
        [
            ("RIVET", "34R", 17),
            ("RIVET", "34L", 19),
            ("RIVET", "16R", 14),
            ("RIVET", "16L", 15),
            ("BOREE", "34L", 16),
            ("BOREE", "34R", 17),
            ("BOREE", "16L", 20),
            ("BOREE", "16R", 21),
            ("MARLN", "34L", 15),
            ("MARLN", "34R", 16),
            ("MARLN", "16L", 18),
            ("MARLN", "16R", 19),
        ]
        .into_iter()
        .fold(Self::default(), |lookup, (feeder_fix, runway, minutes)| {
            lookup.with_trajectory("YSSY", feeder_fix, None, runway, TimeDelta::minutes(minutes))
        })
        .with_trajectory("YSSY", "RIVET", Some("RIVET4"), "34R", TimeDelta::minutes(16))
        .with_arrival_interval("YSSY", "MARLN", "34L", TimeDelta::minutes(4))
    }
}

impl ArrivalLookup for TableArrivalLookup {
    /// A procedure-specific entry wins over the generic one for the same runway
    fn time_to_go(
        &self,
        airport: &str,
        feeder_fix: &str,
        arrival: Option<&str>,
        runway: &str,
        _aircraft: &AircraftProfile,
    ) -> Option<TimeDelta> {
        let key = |arrival: Option<&str>| {
            (
                airport.to_string(),
                feeder_fix.to_string(),
                arrival.map(str::to_string),
                runway.to_string(),
            )
        };

        arrival
            .and_then(|arrival| self.trajectories.get(&key(Some(arrival))))
            .or_else(|| self.trajectories.get(&key(None)))
            .copied()
    }

    fn average_time_to_go(&self, airport: &str, feeder_fix: &str) -> Option<TimeDelta> {
        let (total, count) = self
            .trajectories
            .iter()
            .filter(|((a, fix, _, _), _)| a == airport && fix == feeder_fix)
            .fold((TimeDelta::zero(), 0), |(total, count), (_, time_to_go)| {
                (total + *time_to_go, count + 1)
            });

        (count > 0).then(|| total / count)
    }

    fn arrival_interval(
        &self,
        airport: &str,
        feeder_fix: &str,
        runway: &str,
        _aircraft: &AircraftProfile,
    ) -> Option<TimeDelta> {
        self.intervals
            .get(&(airport.to_string(), feeder_fix.to_string(), runway.to_string()))
            .copied()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn b738() -> AircraftProfile {
        AircraftProfile::new("B738", WakeCategory::Medium, AircraftCategory::Jet)
    }

    #[test]
    fn test_performance_fallback() {
        let lookup = TablePerformanceLookup::default();

        assert_eq!(lookup.profile("A388").wake_category, WakeCategory::SuperHeavy);
        assert!(!lookup.profile("DH8D").is_jet());

        let unknown = lookup.profile("ZZZZ");
        assert_eq!(unknown.wake_category, WakeCategory::Medium);
        assert!(unknown.is_jet());
    }

    #[test]
    fn test_arrival_specific_trajectory() {
        let lookup = TableArrivalLookup::sample();

        assert_eq!(
            lookup.time_to_go("YSSY", "RIVET", Some("RIVET4"), "34R", &b738()),
            Some(TimeDelta::minutes(16))
        );
        assert_eq!(
            lookup.time_to_go("YSSY", "RIVET", Some("RIVET5"), "34R", &b738()),
            Some(TimeDelta::minutes(17))
        );
        assert_eq!(lookup.time_to_go("YSSY", "RIVET", None, "07", &b738()), None);
    }

    #[test]
    fn test_average_time_to_go() {
        let lookup = TableArrivalLookup::default()
            .with_trajectory("YSSY", "RIVET", None, "34L", TimeDelta::minutes(20))
            .with_trajectory("YSSY", "RIVET", None, "34R", TimeDelta::minutes(16))
            .with_trajectory("YMML", "RIVET", None, "34", TimeDelta::minutes(60));

        assert_eq!(
            lookup.average_time_to_go("YSSY", "RIVET"),
            Some(TimeDelta::minutes(18))
        );
        assert_eq!(lookup.average_time_to_go("YSSY", "BOREE"), None);
    }

    #[test]
    fn test_sample_airport_is_consistent() {
        let fixes = TableFixLookup::sample();
        let arrivals = TableArrivalLookup::sample();

        for feeder_fix in &SAMPLE_AIRPORT.feeder_fixes {
            assert!(fixes.coordinate(feeder_fix).is_some());
            for mode in &SAMPLE_AIRPORT.runway_modes {
                for runway in &mode.runways {
                    assert!(arrivals
                        .time_to_go("YSSY", feeder_fix, None, &runway.identifier, &b738())
                        .is_some());
                }
            }
        }
    }
}
