use chrono::{DateTime, Utc};

mod entities;
mod error;
mod lookup;
mod runway;
mod scheduler;
mod sequence;
mod slot;

pub use entities::{
    AircraftCategory, AircraftProfile, Callsign, Coordinate, FeederFix, FixCrossing, Flight,
    FlightPosition, FlowControls, State, StateThresholds, WakeCategory,
};
pub use error::SequencingError;
pub use lookup::{
    AircraftPerformance, ArrivalLookup, FixLookup, PerformanceLookup, SeparationRuleProvider,
};
pub use runway::{AirportConfiguration, Runway, RunwayDependency, RunwayMode, RunwayModeChange};
pub use scheduler::Scheduler;
pub use sequence::{InsertPosition, Sequence};
pub use slot::{BlockoutPeriod, Slot};

/// State of a sequence published after every committed scheduling pass
#[derive(Clone, Debug)]
pub struct SequenceSnapshot {
    pub airport: String,
    pub time: DateTime<Utc>,
    /// Tracked flights in sequence order
    pub flights: Vec<Flight>,
    pub desequenced: Vec<Flight>,
    pub slots: Vec<Slot>,
    pub current_runway_mode: String,
    pub next_runway_mode: Option<String>,
}
