use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};

use crate::SequencingError;

/// Unique key of a flight within a sequence
#[derive(Default, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Callsign(String);

impl Callsign {
    pub fn new(callsign: impl Into<String>) -> Self {
        Self(callsign.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Callsign {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl fmt::Display for Callsign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Sequencing state of a flight.
///
/// The declaration order is the total order of states: it is the promotion chain
/// `New → Unstable → Stable → SuperStable → Frozen → Landed` and the tie-break used
/// when ordering flights with identical landing times.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum State {
    #[default]
    New,
    Unstable,
    Stable,
    SuperStable,
    Frozen,
    Landed,
    Desequenced,
    Removed,
}

impl State {
    /// Flights in these states can no longer be reordered by estimate
    pub fn position_is_fixed(self) -> bool {
        matches!(self, Self::SuperStable | Self::Frozen | Self::Landed)
    }

    /// Flights in these states take part in scheduling
    pub fn is_sequenced(self) -> bool {
        !matches!(self, Self::Desequenced | Self::Removed)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WakeCategory {
    Light,
    Medium,
    Heavy,
    SuperHeavy,
}

impl<'a> TryFrom<&'a str> for WakeCategory {
    type Error = String;

    fn try_from(s: &'a str) -> Result<Self, Self::Error> {
        match s {
            "L" | "Light" => Ok(Self::Light),
            "M" | "Medium" => Ok(Self::Medium),
            "H" | "Heavy" => Ok(Self::Heavy),
            "J" | "SuperHeavy" => Ok(Self::SuperHeavy),
            _ => Err(format!("invalid wake category: {s}")),
        }
    }
}

#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AircraftCategory {
    #[default]
    Jet,
    NonJet,
}

/// Performance-relevant description of an aircraft
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AircraftProfile {
    /// ICAO type designator, e.g. `B738`
    pub type_code: String,
    pub wake_category: WakeCategory,
    pub category: AircraftCategory,
}

impl AircraftProfile {
    pub fn new(
        type_code: impl Into<String>,
        wake_category: WakeCategory,
        category: AircraftCategory,
    ) -> Self {
        Self {
            type_code: type_code.into(),
            wake_category,
            category,
        }
    }

    pub fn is_jet(&self) -> bool {
        self.category == AircraftCategory::Jet
    }
}

/// Speed restriction issued to absorb delay imposed by the schedule
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlowControls {
    #[default]
    ProfileSpeed,
    ReduceSpeed,
}

/// How a flight crossed its feeder fix
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FixCrossing {
    Observed(DateTime<Utc>),
    /// The flight was already past the fix when it was first tracked
    Untracked,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    const EARTH_RADIUS_NM: f64 = 3_440.065;

    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Great-circle distance to another coordinate in nautical miles
    pub fn distance_nm(&self, other: &Self) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let delta_lat = (other.latitude - self.latitude).to_radians();
        let delta_lon = (other.longitude - self.longitude).to_radians();

        let a = (delta_lat / 2.0).sin().powi(2)
            + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

        Self::EARTH_RADIUS_NM * c
    }
}

/// Last known surveillance position of a flight
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FlightPosition {
    pub coordinate: Coordinate,
    pub altitude_ft: i32,
    pub ground_speed_kt: f64,
}

/// Times at the feeder fix through which a flight enters the terminal area
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeederFix {
    identifier: String,
    system_estimate: DateTime<Utc>,
    initial_estimate: DateTime<Utc>,
    estimate: DateTime<Utc>,
    scheduled_time: DateTime<Utc>,
    crossing: Option<FixCrossing>,
}

impl FeederFix {
    pub fn new(identifier: impl Into<String>, estimate: DateTime<Utc>) -> Self {
        Self {
            identifier: identifier.into(),
            system_estimate: estimate,
            initial_estimate: estimate,
            estimate,
            scheduled_time: estimate,
            crossing: None,
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Latest raw estimate received from the flight data system
    pub fn system_estimate(&self) -> DateTime<Utc> {
        self.system_estimate
    }

    pub fn initial_estimate(&self) -> DateTime<Utc> {
        self.initial_estimate
    }

    pub fn estimate(&self) -> DateTime<Utc> {
        self.estimate
    }

    pub fn scheduled_time(&self) -> DateTime<Utc> {
        self.scheduled_time
    }

    pub fn crossing(&self) -> Option<FixCrossing> {
        self.crossing
    }

    pub fn actual_time_over(&self) -> Option<DateTime<Utc>> {
        match self.crossing {
            Some(FixCrossing::Observed(time)) => Some(time),
            _ => None,
        }
    }

    pub fn has_passed(&self) -> bool {
        self.crossing.is_some()
    }
}

/// Thresholds driving the time-based promotion of flights through the state chain
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StateThresholds {
    /// Time to the feeder fix at which an unstable flight becomes stable
    pub stable: TimeDelta,
    /// Time to landing at which a super-stable flight is frozen
    pub frozen: TimeDelta,
    /// Minimum time a flight stays unstable after activation
    pub minimum_unstable: TimeDelta,
}

impl Default for StateThresholds {
    fn default() -> Self {
        Self {
            stable: TimeDelta::minutes(25),
            frozen: TimeDelta::minutes(15),
            minimum_unstable: TimeDelta::seconds(180),
        }
    }
}

/// A single arrival and everything the sequencer knows or has decided about it
#[derive(Clone, Debug, PartialEq)]
pub struct Flight {
    callsign: Callsign,
    aircraft: AircraftProfile,
    origin: Option<String>,
    destination: String,
    state: State,
    activated_at: Option<DateTime<Utc>>,
    feeder_fix: Option<FeederFix>,
    landing_system_estimate: DateTime<Utc>,
    initial_landing_time: DateTime<Utc>,
    estimated_landing_time: DateTime<Utc>,
    scheduled_landing_time: DateTime<Utc>,
    assigned_runway: Option<String>,
    runway_manually_assigned: bool,
    assigned_arrival: Option<String>,
    high_priority: bool,
    no_delay: bool,
    manual_landing_time: bool,
    flow_controls: FlowControls,
    position: Option<FlightPosition>,
}

impl Flight {
    pub fn new(
        callsign: Callsign,
        aircraft: AircraftProfile,
        destination: impl Into<String>,
        landing_estimate: DateTime<Utc>,
    ) -> Self {
        Self {
            callsign,
            aircraft,
            origin: None,
            destination: destination.into(),
            state: State::New,
            activated_at: None,
            feeder_fix: None,
            landing_system_estimate: landing_estimate,
            initial_landing_time: landing_estimate,
            estimated_landing_time: landing_estimate,
            scheduled_landing_time: landing_estimate,
            assigned_runway: None,
            runway_manually_assigned: false,
            assigned_arrival: None,
            high_priority: false,
            no_delay: false,
            manual_landing_time: false,
            flow_controls: FlowControls::default(),
            position: None,
        }
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    pub fn with_feeder_fix(
        mut self,
        identifier: impl Into<String>,
        estimate: DateTime<Utc>,
    ) -> Self {
        self.feeder_fix = Some(FeederFix::new(identifier, estimate));
        self
    }

    pub fn with_arrival(mut self, arrival: impl Into<String>) -> Self {
        self.assigned_arrival = Some(arrival.into());
        self
    }

    pub fn with_runway(mut self, runway: impl Into<String>) -> Self {
        self.assigned_runway = Some(runway.into());
        self
    }

    pub fn callsign(&self) -> &Callsign {
        &self.callsign
    }

    pub fn aircraft(&self) -> &AircraftProfile {
        &self.aircraft
    }

    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn activated_at(&self) -> Option<DateTime<Utc>> {
        self.activated_at
    }

    pub fn feeder_fix(&self) -> Option<&FeederFix> {
        self.feeder_fix.as_ref()
    }

    pub fn feeder_fix_identifier(&self) -> Option<&str> {
        self.feeder_fix.as_ref().map(FeederFix::identifier)
    }

    pub fn landing_system_estimate(&self) -> DateTime<Utc> {
        self.landing_system_estimate
    }

    pub fn initial_landing_time(&self) -> DateTime<Utc> {
        self.initial_landing_time
    }

    pub fn estimated_landing_time(&self) -> DateTime<Utc> {
        self.estimated_landing_time
    }

    pub fn scheduled_landing_time(&self) -> DateTime<Utc> {
        self.scheduled_landing_time
    }

    pub fn assigned_runway(&self) -> Option<&str> {
        self.assigned_runway.as_deref()
    }

    pub fn runway_manually_assigned(&self) -> bool {
        self.runway_manually_assigned
    }

    pub fn assigned_arrival(&self) -> Option<&str> {
        self.assigned_arrival.as_deref()
    }

    pub fn high_priority(&self) -> bool {
        self.high_priority
    }

    pub fn no_delay(&self) -> bool {
        self.no_delay
    }

    pub fn manual_landing_time(&self) -> bool {
        self.manual_landing_time
    }

    pub fn flow_controls(&self) -> FlowControls {
        self.flow_controls
    }

    pub fn position(&self) -> Option<&FlightPosition> {
        self.position.as_ref()
    }

    pub fn total_delay(&self) -> TimeDelta {
        self.scheduled_landing_time - self.initial_landing_time
    }

    pub fn remaining_delay(&self) -> TimeDelta {
        self.scheduled_landing_time - self.estimated_landing_time
    }

    /// Starts the minimum unstable dwell. The first activation also freezes the
    /// initial estimates at the current ones.
    pub fn activate(&mut self, now: DateTime<Utc>) {
        if self.activated_at.is_none() {
            self.initial_landing_time = self.estimated_landing_time;
            self.scheduled_landing_time = self.estimated_landing_time;
            if let Some(fix) = self.feeder_fix.as_mut() {
                fix.initial_estimate = fix.estimate;
                fix.scheduled_time = fix.estimate;
            }
        }

        self.activated_at = Some(now);
    }

    /// Moves the flight forward through the state chain, or out of it.
    ///
    /// Only [`Flight::resume`] brings a desequenced flight back into the chain, and
    /// nothing leaves `Removed`.
    pub fn set_state(&mut self, state: State) -> Result<(), SequencingError> {
        if self.state == State::Removed {
            return Err(SequencingError::FlightRemoved(self.callsign.clone()));
        }

        let forward = self.state.is_sequenced() && state >= self.state;
        if !forward && state.is_sequenced() {
            return Err(SequencingError::InvalidStateTransition {
                callsign: self.callsign.clone(),
                from: self.state,
                to: state,
            });
        }

        self.state = state;
        Ok(())
    }

    /// Puts a desequenced flight back into the normal chain
    pub fn resume(&mut self, now: DateTime<Utc>) -> Result<(), SequencingError> {
        match self.state {
            State::Removed => return Err(SequencingError::FlightRemoved(self.callsign.clone())),
            State::Desequenced => {}
            from => {
                return Err(SequencingError::InvalidStateTransition {
                    callsign: self.callsign.clone(),
                    from,
                    to: State::Unstable,
                })
            }
        }

        self.state = State::Unstable;
        self.activate(now);
        Ok(())
    }

    /// Applies the time-based promotion rules, returning the new state if it changed.
    ///
    /// Promotions cascade so a flight that satisfies several rules at once (e.g. after
    /// a long gap between ticks) ends up where it belongs. Flights without a feeder fix
    /// measure the feeder-fix conditions against their landing estimate instead.
    pub fn update_state_based_on_time(
        &mut self,
        now: DateTime<Utc>,
        thresholds: &StateThresholds,
    ) -> Option<State> {
        let before = self.state;
        while let Some(next) = self.next_state(now, thresholds) {
            self.state = next;
        }

        (self.state != before).then_some(self.state)
    }

    fn next_state(&self, now: DateTime<Utc>, thresholds: &StateThresholds) -> Option<State> {
        match self.state {
            State::Unstable => {
                let time_to_feeder_fix = self
                    .feeder_fix
                    .as_ref()
                    .map_or(self.estimated_landing_time, FeederFix::estimate)
                    - now;
                let dwelled = self
                    .activated_at
                    .is_some_and(|activated| now - activated > thresholds.minimum_unstable);

                (time_to_feeder_fix <= thresholds.stable && dwelled).then_some(State::Stable)
            }
            State::Stable => {
                let passed = match &self.feeder_fix {
                    Some(fix) => now >= fix.initial_estimate,
                    None => self.estimated_landing_time - now <= thresholds.stable,
                };

                passed.then_some(State::SuperStable)
            }
            State::SuperStable => (self.estimated_landing_time - now <= thresholds.frozen)
                .then_some(State::Frozen),
            State::Frozen => (now >= self.scheduled_landing_time).then_some(State::Landed),
            _ => None,
        }
    }

    pub fn has_passed_feeder_fix(&self) -> bool {
        self.feeder_fix.as_ref().is_some_and(FeederFix::has_passed)
    }

    /// Records the latest raw estimates from the flight data system
    pub fn set_system_estimates(
        &mut self,
        feeder_fix: Option<DateTime<Utc>>,
        landing: DateTime<Utc>,
    ) {
        self.landing_system_estimate = landing;
        if let (Some(fix), Some(estimate)) = (self.feeder_fix.as_mut(), feeder_fix) {
            fix.system_estimate = estimate;
        }
    }

    pub fn update_feeder_fix_estimate(
        &mut self,
        estimate: DateTime<Utc>,
    ) -> Result<(), SequencingError> {
        let Some(fix) = self.feeder_fix.as_mut() else {
            return Ok(());
        };
        if fix.has_passed() {
            return Err(SequencingError::FeederFixPassed(self.callsign.clone()));
        }

        fix.estimate = estimate;
        Ok(())
    }

    pub fn set_feeder_fix_scheduled_time(
        &mut self,
        time: DateTime<Utc>,
    ) -> Result<(), SequencingError> {
        let Some(fix) = self.feeder_fix.as_mut() else {
            return Ok(());
        };
        if fix.has_passed() {
            return Err(SequencingError::FeederFixPassed(self.callsign.clone()));
        }

        fix.scheduled_time = time;
        Ok(())
    }

    pub fn record_feeder_fix_crossing(
        &mut self,
        crossing: FixCrossing,
    ) -> Result<(), SequencingError> {
        let Some(fix) = self.feeder_fix.as_mut() else {
            return Ok(());
        };
        if fix.has_passed() {
            return Err(SequencingError::FeederFixPassed(self.callsign.clone()));
        }

        fix.crossing = Some(crossing);
        Ok(())
    }

    pub fn update_landing_estimate(&mut self, estimate: DateTime<Utc>) {
        self.estimated_landing_time = estimate;
    }

    /// Commits a landing time and runway.
    ///
    /// The scheduled feeder-fix time carries the same delay as the landing time
    /// unless the flight is already past the fix.
    pub fn schedule(&mut self, landing_time: DateTime<Utc>, runway: impl Into<String>) {
        self.assigned_runway = Some(runway.into());
        self.commit_landing_time(landing_time);
    }

    fn commit_landing_time(&mut self, landing_time: DateTime<Utc>) {
        self.scheduled_landing_time = landing_time;
        let delay = self.remaining_delay();
        if let Some(fix) = self.feeder_fix.as_mut().filter(|fix| !fix.has_passed()) {
            fix.scheduled_time = fix.estimate + delay;
        }
    }

    pub fn assign_runway(&mut self, runway: impl Into<String>, manual: bool) {
        self.assigned_runway = Some(runway.into());
        self.runway_manually_assigned = manual;
    }

    /// Lets the scheduler choose the runway again
    pub fn release_runway(&mut self) {
        self.runway_manually_assigned = false;
    }

    pub fn set_arrival(&mut self, arrival: Option<String>) {
        self.assigned_arrival = arrival;
    }

    pub fn set_high_priority(&mut self, high_priority: bool) {
        self.high_priority = high_priority;
    }

    pub fn set_no_delay(&mut self, no_delay: bool) {
        self.no_delay = no_delay;
    }

    /// Pins the landing time; scheduling passes keep it as-is
    pub fn set_manual_landing_time(&mut self, landing_time: DateTime<Utc>) {
        self.manual_landing_time = true;
        self.commit_landing_time(landing_time);
    }

    pub fn clear_manual_landing_time(&mut self) {
        self.manual_landing_time = false;
    }

    pub fn set_flow_controls(&mut self, flow_controls: FlowControls) {
        self.flow_controls = flow_controls;
    }

    pub fn update_position(&mut self, position: FlightPosition) {
        self.position = Some(position);
    }

    /// Sequence order: scheduled landing time, then more-committed states first,
    /// then callsign
    pub fn sequence_order(&self, other: &Self) -> Ordering {
        self.scheduled_landing_time
            .cmp(&other.scheduled_landing_time)
            .then_with(|| other.state.cmp(&self.state))
            .then_with(|| self.callsign.cmp(&other.callsign))
    }
}
