use chrono::{DateTime, TimeDelta, Utc};

use crate::{BlockoutPeriod, SequencingError, WakeCategory};

/// Separation a runway requires against landings on another runway
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunwayDependency {
    pub runway_identifier: String,
    pub separation: TimeDelta,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Runway {
    pub identifier: String,
    /// Minimum time between consecutive landings on this runway
    pub landing_rate: TimeDelta,
    pub dependencies: Vec<RunwayDependency>,
    /// Wake categories this runway is preferred for
    pub preferred_wake_categories: Vec<WakeCategory>,
    /// Feeder fixes whose traffic this runway is preferred for
    pub preferred_feeder_fixes: Vec<String>,
}

impl Runway {
    pub fn new(identifier: impl Into<String>, landing_rate: TimeDelta) -> Self {
        Self {
            identifier: identifier.into(),
            landing_rate,
            dependencies: vec![],
            preferred_wake_categories: vec![],
            preferred_feeder_fixes: vec![],
        }
    }

    pub fn with_dependency(
        mut self,
        runway_identifier: impl Into<String>,
        separation: TimeDelta,
    ) -> Self {
        self.dependencies.push(RunwayDependency {
            runway_identifier: runway_identifier.into(),
            separation,
        });
        self
    }

    pub fn with_preferred_wake_categories(mut self, categories: &[WakeCategory]) -> Self {
        self.preferred_wake_categories = categories.to_vec();
        self
    }

    pub fn with_preferred_feeder_fixes(mut self, feeder_fixes: &[&str]) -> Self {
        self.preferred_feeder_fixes = feeder_fixes.iter().map(|fix| fix.to_string()).collect();
        self
    }

    pub fn dependency_on(&self, runway_identifier: &str) -> Option<&RunwayDependency> {
        self.dependencies
            .iter()
            .find(|dependency| dependency.runway_identifier == runway_identifier)
    }
}

/// A named configuration of active arrival runways
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunwayMode {
    pub identifier: String,
    pub runways: Vec<Runway>,
    /// Separation between a flight on a runway outside this mode and any other landing
    pub off_mode_separation: TimeDelta,
}

impl RunwayMode {
    pub fn new(
        identifier: impl Into<String>,
        runways: Vec<Runway>,
        off_mode_separation: TimeDelta,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            runways,
            off_mode_separation,
        }
    }

    pub fn runway(&self, identifier: &str) -> Option<&Runway> {
        self.runways.iter().find(|runway| runway.identifier == identifier)
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.runway(identifier).is_some()
    }
}

/// A runway mode scheduled to replace the current one.
///
/// The current mode accepts its last landing at `last_landing_time_for_current_mode`
/// and the next mode its first at `first_landing_time_for_next_mode`; nothing lands in
/// between.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunwayModeChange {
    mode: RunwayMode,
    last_landing_time_for_current_mode: DateTime<Utc>,
    first_landing_time_for_next_mode: DateTime<Utc>,
}

impl RunwayModeChange {
    pub fn new(
        mode: RunwayMode,
        last_landing_time_for_current_mode: DateTime<Utc>,
        first_landing_time_for_next_mode: DateTime<Utc>,
    ) -> Result<Self, SequencingError> {
        if first_landing_time_for_next_mode < last_landing_time_for_current_mode {
            return Err(SequencingError::InvalidRunwayModeChange {
                mode: mode.identifier,
                reason: "first landing in the new mode precedes the last landing in the current mode"
                    .to_string(),
            });
        }

        Ok(Self {
            mode,
            last_landing_time_for_current_mode,
            first_landing_time_for_next_mode,
        })
    }

    pub fn mode(&self) -> &RunwayMode {
        &self.mode
    }

    pub fn into_mode(self) -> RunwayMode {
        self.mode
    }

    pub fn last_landing_time_for_current_mode(&self) -> DateTime<Utc> {
        self.last_landing_time_for_current_mode
    }

    pub fn first_landing_time_for_next_mode(&self) -> DateTime<Utc> {
        self.first_landing_time_for_next_mode
    }

    /// The changeover window in which no runway accepts landings
    pub fn changeover(&self) -> Option<BlockoutPeriod> {
        BlockoutPeriod::new(
            self.last_landing_time_for_current_mode,
            self.first_landing_time_for_next_mode,
        )
        .ok()
    }
}

/// Static description of a managed airport
#[derive(Clone, Debug, PartialEq)]
pub struct AirportConfiguration {
    /// ICAO identifier, e.g. `YSSY`
    pub identifier: String,
    /// Available runway modes; the first is in effect when the sequence is created
    pub runway_modes: Vec<RunwayMode>,
    pub feeder_fixes: Vec<String>,
    /// Beyond this distance from the feeder fix the system estimate is used as-is
    pub feeder_fix_estimate_source_range_nm: f64,
}

impl AirportConfiguration {
    pub fn runway_mode(&self, identifier: &str) -> Option<&RunwayMode> {
        self.runway_modes.iter().find(|mode| mode.identifier == identifier)
    }
}
