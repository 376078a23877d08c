//! Contracts for the lookup tables the sequencer consumes.
//!
//! Every lookup may miss; callers define the fallback.

use chrono::TimeDelta;

use crate::{AircraftCategory, AircraftProfile, Coordinate, RunwayMode, WakeCategory};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AircraftPerformance {
    pub wake_category: WakeCategory,
    pub category: AircraftCategory,
}

pub trait PerformanceLookup: Send + Sync {
    fn performance(&self, type_code: &str) -> Option<AircraftPerformance>;

    /// Resolves an aircraft type, assuming a medium jet when the type is unknown
    fn profile(&self, type_code: &str) -> AircraftProfile {
        match self.performance(type_code) {
            Some(performance) => {
                AircraftProfile::new(type_code, performance.wake_category, performance.category)
            }
            None => {
                log::warn!("no performance data for {type_code}, assuming a medium jet");
                AircraftProfile::new(type_code, WakeCategory::Medium, AircraftCategory::Jet)
            }
        }
    }
}

pub trait FixLookup: Send + Sync {
    fn coordinate(&self, identifier: &str) -> Option<Coordinate>;
}

/// Published arrival procedures and the trajectories flown along them
pub trait ArrivalLookup: Send + Sync {
    /// Time from the feeder fix to touchdown for a specific arrival and runway
    fn time_to_go(
        &self,
        airport: &str,
        feeder_fix: &str,
        arrival: Option<&str>,
        runway: &str,
        aircraft: &AircraftProfile,
    ) -> Option<TimeDelta>;

    /// Airport-wide average time from the feeder fix to touchdown
    fn average_time_to_go(&self, airport: &str, feeder_fix: &str) -> Option<TimeDelta>;

    /// Minimum interval between arrivals from a feeder fix to a runway
    fn arrival_interval(
        &self,
        airport: &str,
        feeder_fix: &str,
        runway: &str,
        aircraft: &AircraftProfile,
    ) -> Option<TimeDelta>;
}

pub trait SeparationRuleProvider: Send + Sync {
    /// Specific spacing required between a leader and its trailer, if any rule applies
    fn minimum_separation(
        &self,
        leader: &AircraftProfile,
        trailer: &AircraftProfile,
        runway_mode: &RunwayMode,
    ) -> Option<TimeDelta>;
}
