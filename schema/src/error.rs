use chrono::{DateTime, Utc};
use ulid::Ulid;

use crate::{Callsign, State};

/// Errors raised by sequencing operations.
///
/// Validation failures are returned to the caller of the offending operation.
/// `UnsatisfiableSchedule` is raised by a scheduling pass that could not find a
/// conflict-free landing time for a flight; that flight keeps its previous schedule.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SequencingError {
    #[error("flight {0} is already in the sequence")]
    DuplicateCallsign(Callsign),

    #[error("flight {callsign} is inbound to {destination}, not {airport}")]
    WrongDestination {
        callsign: Callsign,
        destination: String,
        airport: String,
    },

    #[error("flight {0} not found")]
    FlightNotFound(Callsign),

    #[error("slot {0} not found")]
    SlotNotFound(Ulid),

    #[error("slot must start before it ends (start {start}, end {end})")]
    InvalidSlotTimes {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("flight {0} has already passed its feeder fix")]
    FeederFixPassed(Callsign),

    #[error("flight {0} has been removed and can no longer change state")]
    FlightRemoved(Callsign),

    #[error("flight {callsign} cannot go from {from:?} to {to:?}")]
    InvalidStateTransition {
        callsign: Callsign,
        from: State,
        to: State,
    },

    #[error("flight {0} is no longer sequenced and ignores updates")]
    FlightRetired(Callsign),

    #[error("runway mode change to {mode} is invalid: {reason}")]
    InvalidRunwayModeChange { mode: String, reason: String },

    #[error("no sequence exists for {0}")]
    UnknownAirport(String),

    #[error("a sequence already exists for {0}")]
    DuplicateAirport(String),

    #[error("unable to schedule {callsign} on runway {runway} within {attempts} attempts")]
    UnsatisfiableSchedule {
        callsign: Callsign,
        runway: String,
        attempts: usize,
    },

    #[error("gave up waiting for the {0} sequence")]
    Cancelled(String),
}
