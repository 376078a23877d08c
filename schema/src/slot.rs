use chrono::{DateTime, Utc};
use ulid::Ulid;

use crate::SequencingError;

/// A half-open `[start, end)` window in which landings are not scheduled
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockoutPeriod {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl BlockoutPeriod {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, SequencingError> {
        if start >= end {
            return Err(SequencingError::InvalidSlotTimes { start, end });
        }

        Ok(Self { start, end })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn contains(&self, time: DateTime<Utc>) -> bool {
        self.start <= time && time < self.end
    }
}

/// A controller-declared window on one or more runways that is kept clear of arrivals
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Slot {
    id: Ulid,
    period: BlockoutPeriod,
    runway_identifiers: Vec<String>,
}

impl Slot {
    pub fn new(
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        runway_identifiers: Vec<String>,
    ) -> Result<Self, SequencingError> {
        Ok(Self {
            id: Ulid::new(),
            period: BlockoutPeriod::new(start, end)?,
            runway_identifiers,
        })
    }

    pub fn id(&self) -> Ulid {
        self.id
    }

    pub fn period(&self) -> BlockoutPeriod {
        self.period
    }

    pub fn runway_identifiers(&self) -> &[String] {
        &self.runway_identifiers
    }

    pub fn applies_to(&self, runway_identifier: &str) -> bool {
        self.runway_identifiers.iter().any(|runway| runway == runway_identifier)
    }

    /// Moves the window; the slot is left untouched if the new times are invalid
    pub fn reschedule(
        &mut self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<(), SequencingError> {
        self.period = BlockoutPeriod::new(start, end)?;
        Ok(())
    }
}
