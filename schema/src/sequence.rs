use chrono::{DateTime, TimeDelta, Utc};
use itertools::{Either, Itertools};
use ulid::Ulid;

use crate::{
    AirportConfiguration, BlockoutPeriod, Callsign, Flight, RunwayMode, RunwayModeChange,
    SequenceSnapshot, SequencingError, Slot, State,
};

/// Where a manually inserted flight is placed
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InsertPosition {
    /// One landing interval ahead of the named flight, on its runway
    Before(Callsign),
    /// One landing interval behind the named flight, on its runway
    After(Callsign),
    /// At a fixed landing time
    At(DateTime<Utc>),
}

/// The arrival sequence of a single airport.
///
/// Tracked flights are kept in sequence order (see [`Flight::sequence_order`]) after
/// every scheduling pass; in between, [`Sequence::reposition_by_estimate`] maintains a
/// tentative order based on estimates.
#[derive(Clone, Debug)]
pub struct Sequence {
    airport: AirportConfiguration,
    flights: Vec<Flight>,
    pending: Vec<Flight>,
    desequenced: Vec<Flight>,
    /// Removed and purged flights with their last landing time. Updates for them are
    /// refused until they are forgotten.
    retired: Vec<(Callsign, DateTime<Utc>)>,
    slots: Vec<Slot>,
    current_runway_mode: RunwayMode,
    next_runway_mode: Option<RunwayModeChange>,
}

impl Sequence {
    pub fn new(airport: AirportConfiguration) -> Result<Self, SequencingError> {
        let current_runway_mode = airport.runway_modes.first().cloned().ok_or_else(|| {
            SequencingError::InvalidRunwayModeChange {
                mode: airport.identifier.clone(),
                reason: "the airport has no runway modes".to_string(),
            }
        })?;

        Ok(Self {
            airport,
            flights: vec![],
            pending: vec![],
            desequenced: vec![],
            retired: vec![],
            slots: vec![],
            current_runway_mode,
            next_runway_mode: None,
        })
    }

    pub fn airport(&self) -> &AirportConfiguration {
        &self.airport
    }

    pub fn airport_identifier(&self) -> &str {
        &self.airport.identifier
    }

    /// Tracked flights in sequence order
    pub fn flights(&self) -> &[Flight] {
        &self.flights
    }

    pub fn flights_mut(&mut self) -> &mut [Flight] {
        &mut self.flights
    }

    pub fn pending(&self) -> &[Flight] {
        &self.pending
    }

    pub fn desequenced(&self) -> &[Flight] {
        &self.desequenced
    }

    pub fn flight(&self, callsign: &Callsign) -> Option<&Flight> {
        self.flights.iter().find(|flight| flight.callsign() == callsign)
    }

    pub fn flight_mut(&mut self, callsign: &Callsign) -> Result<&mut Flight, SequencingError> {
        self.flights
            .iter_mut()
            .find(|flight| flight.callsign() == callsign)
            .ok_or_else(|| SequencingError::FlightNotFound(callsign.clone()))
    }

    pub fn desequenced_flight_mut(&mut self, callsign: &Callsign) -> Option<&mut Flight> {
        self.desequenced
            .iter_mut()
            .find(|flight| flight.callsign() == callsign)
    }

    pub fn pending_flight_mut(&mut self, callsign: &Callsign) -> Option<&mut Flight> {
        self.pending.iter_mut().find(|flight| flight.callsign() == callsign)
    }

    /// Whether the flight is tracked, desequenced or not
    pub fn is_tracked(&self, callsign: &Callsign) -> bool {
        self.flights
            .iter()
            .chain(self.desequenced.iter())
            .any(|flight| flight.callsign() == callsign)
    }

    /// Whether the flight was removed or has landed and been purged
    pub fn is_retired(&self, callsign: &Callsign) -> bool {
        self.retired.iter().any(|(retired, _)| retired == callsign)
    }

    fn index_of(&self, callsign: &Callsign) -> Result<usize, SequencingError> {
        self.flights
            .iter()
            .position(|flight| flight.callsign() == callsign)
            .ok_or_else(|| SequencingError::FlightNotFound(callsign.clone()))
    }

    fn validate_new_flight(&self, flight: &Flight) -> Result<(), SequencingError> {
        if flight.destination() != self.airport.identifier {
            return Err(SequencingError::WrongDestination {
                callsign: flight.callsign().clone(),
                destination: flight.destination().to_string(),
                airport: self.airport.identifier.clone(),
            });
        }

        if self.is_tracked(flight.callsign()) {
            return Err(SequencingError::DuplicateCallsign(flight.callsign().clone()));
        }
        if self.is_retired(flight.callsign()) {
            return Err(SequencingError::FlightRetired(flight.callsign().clone()));
        }

        Ok(())
    }

    /// Starts tracking a flight, placing it by estimate. Returns its index.
    pub fn add_flight(&mut self, flight: Flight) -> Result<usize, SequencingError> {
        self.validate_new_flight(&flight)?;

        let callsign = flight.callsign().clone();
        self.pending.retain(|pending| pending.callsign() != &callsign);
        self.flights.push(flight);
        self.reposition_by_estimate(&callsign, false)
    }

    /// Out-of-band insertion by a controller. The flight's landing time and runway are
    /// pinned so scheduling passes work around it. A retired callsign may be inserted
    /// again.
    pub fn insert_flight(
        &mut self,
        mut flight: Flight,
        position: InsertPosition,
    ) -> Result<(), SequencingError> {
        self.retired.retain(|(retired, _)| retired != flight.callsign());
        self.validate_new_flight(&flight)?;

        let (landing_time, runway) = match position {
            InsertPosition::Before(target) => {
                let (time, runway, interval) = self.landing_interval_around(&target)?;
                (time - interval, runway)
            }
            InsertPosition::After(target) => {
                let (time, runway, interval) = self.landing_interval_around(&target)?;
                (time + interval, runway)
            }
            InsertPosition::At(time) => (time, None),
        };

        let runway = runway
            .or_else(|| flight.assigned_runway().map(str::to_string))
            .or_else(|| {
                self.current_runway_mode
                    .runways
                    .first()
                    .map(|runway| runway.identifier.clone())
            });
        if let Some(runway) = runway {
            flight.assign_runway(runway, true);
        }
        flight.set_manual_landing_time(landing_time);

        let callsign = flight.callsign().clone();
        self.pending.retain(|pending| pending.callsign() != &callsign);
        self.flights.push(flight);
        self.sort();

        Ok(())
    }

    /// Scheduled landing time, runway and landing interval of a tracked flight
    fn landing_interval_around(
        &self,
        callsign: &Callsign,
    ) -> Result<(DateTime<Utc>, Option<String>, TimeDelta), SequencingError> {
        let flight = self
            .flight(callsign)
            .ok_or_else(|| SequencingError::FlightNotFound(callsign.clone()))?;
        let runway = flight.assigned_runway().map(str::to_string);
        let interval = runway
            .as_deref()
            .and_then(|runway| self.current_runway_mode.runway(runway))
            .map_or(self.current_runway_mode.off_mode_separation, |runway| {
                runway.landing_rate
            });

        Ok((flight.scheduled_landing_time(), runway, interval))
    }

    /// Moves a flight to the position implied by its estimated landing time. Returns
    /// its new index.
    ///
    /// Unless `displace_stable_flights` is set the flight cannot move ahead of the last
    /// position-fixed flight sharing its runway.
    pub fn reposition_by_estimate(
        &mut self,
        callsign: &Callsign,
        displace_stable_flights: bool,
    ) -> Result<usize, SequencingError> {
        let index = self.index_of(callsign)?;
        let flight = self.flights.remove(index);

        let earliest_index = if displace_stable_flights {
            0
        } else {
            self.flights
                .iter()
                .rposition(|other| {
                    other.state().position_is_fixed() && shares_runway(&flight, other)
                })
                .map_or(0, |i| i + 1)
        };

        let new_index = self.flights[earliest_index..]
            .iter()
            .position(|other| other.estimated_landing_time() >= flight.estimated_landing_time())
            .map_or(self.flights.len(), |i| earliest_index + i);

        self.flights.insert(new_index, flight);
        Ok(new_index)
    }

    pub fn desequence(&mut self, callsign: &Callsign) -> Result<(), SequencingError> {
        let index = self.index_of(callsign)?;
        self.flights[index].set_state(State::Desequenced)?;
        let flight = self.flights.remove(index);
        self.desequenced.push(flight);
        Ok(())
    }

    pub fn resume(
        &mut self,
        callsign: &Callsign,
        now: DateTime<Utc>,
    ) -> Result<usize, SequencingError> {
        let index = self
            .desequenced
            .iter()
            .position(|flight| flight.callsign() == callsign)
            .ok_or_else(|| SequencingError::FlightNotFound(callsign.clone()))?;

        self.desequenced[index].resume(now)?;
        let flight = self.desequenced.remove(index);
        self.flights.push(flight);
        self.reposition_by_estimate(callsign, false)
    }

    /// Stops tracking a flight for good
    pub fn remove(&mut self, callsign: &Callsign) -> Result<Flight, SequencingError> {
        let list = if self.flights.iter().any(|flight| flight.callsign() == callsign) {
            &mut self.flights
        } else {
            &mut self.desequenced
        };

        let index = list
            .iter()
            .position(|flight| flight.callsign() == callsign)
            .ok_or_else(|| SequencingError::FlightNotFound(callsign.clone()))?;
        let mut flight = list.remove(index);
        flight.set_state(State::Removed)?;
        self.retire(&flight);

        Ok(flight)
    }

    /// Adds or refreshes a flight that is known but not yet tracked
    pub fn upsert_pending(&mut self, flight: Flight) -> Result<(), SequencingError> {
        self.validate_new_flight(&flight)?;

        match self.pending_flight_mut(flight.callsign()) {
            Some(existing) => *existing = flight,
            None => self.pending.push(flight),
        }

        Ok(())
    }

    /// Drops pending flights that were due to land before the cutoff
    pub fn expire_pending(&mut self, landing_before: DateTime<Utc>) -> Vec<Flight> {
        let pending = std::mem::take(&mut self.pending);
        let (expired, remaining): (Vec<Flight>, Vec<Flight>) = pending
            .into_iter()
            .partition(|flight| flight.estimated_landing_time() < landing_before);

        self.pending = remaining;
        expired
    }

    pub fn take_pending(&mut self, callsign: &Callsign) -> Option<Flight> {
        let index = self
            .pending
            .iter()
            .position(|flight| flight.callsign() == callsign)?;
        Some(self.pending.remove(index))
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn create_slot(
        &mut self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        runway_identifiers: Vec<String>,
    ) -> Result<Ulid, SequencingError> {
        let slot = Slot::new(start, end, runway_identifiers)?;
        let id = slot.id();
        self.slots.push(slot);
        Ok(id)
    }

    pub fn modify_slot(
        &mut self,
        id: Ulid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<(), SequencingError> {
        self.slots
            .iter_mut()
            .find(|slot| slot.id() == id)
            .ok_or(SequencingError::SlotNotFound(id))?
            .reschedule(start, end)
    }

    pub fn delete_slot(&mut self, id: Ulid) -> Result<Slot, SequencingError> {
        let index = self
            .slots
            .iter()
            .position(|slot| slot.id() == id)
            .ok_or(SequencingError::SlotNotFound(id))?;
        Ok(self.slots.remove(index))
    }

    pub fn current_runway_mode(&self) -> &RunwayMode {
        &self.current_runway_mode
    }

    pub fn next_runway_mode(&self) -> Option<&RunwayModeChange> {
        self.next_runway_mode.as_ref()
    }

    /// Replaces the runway mode outright, discarding any scheduled change
    pub fn change_runway_mode(&mut self, mode: RunwayMode) {
        self.current_runway_mode = mode;
        self.next_runway_mode = None;
    }

    pub fn schedule_runway_mode_change(&mut self, change: RunwayModeChange) {
        self.next_runway_mode = Some(change);
    }

    /// Promotes the scheduled runway mode once its first landing time has arrived
    pub fn try_swap_runway_modes(&mut self, now: DateTime<Utc>) -> bool {
        match self.next_runway_mode.take() {
            Some(change) if now >= change.first_landing_time_for_next_mode() => {
                log::info!(
                    "{}: runway mode {} replaced by {}",
                    self.airport.identifier,
                    self.current_runway_mode.identifier,
                    change.mode().identifier
                );
                self.current_runway_mode = change.into_mode();
                true
            }
            change => {
                self.next_runway_mode = change;
                false
            }
        }
    }

    /// The runway mode accepting landings at the given time
    pub fn runway_mode_at(&self, time: DateTime<Utc>) -> &RunwayMode {
        match &self.next_runway_mode {
            Some(change) if time >= change.first_landing_time_for_next_mode() => change.mode(),
            _ => &self.current_runway_mode,
        }
    }

    /// Windows in which nothing may land on the given runway
    pub fn blockouts_for(&self, runway_identifier: &str) -> Vec<BlockoutPeriod> {
        self.slots
            .iter()
            .filter(|slot| slot.applies_to(runway_identifier))
            .map(Slot::period)
            .chain(
                self.next_runway_mode
                    .as_ref()
                    .and_then(RunwayModeChange::changeover),
            )
            .collect()
    }

    pub fn sort(&mut self) {
        self.flights.sort_by(Flight::sequence_order);
    }

    /// Drops landed flights whose landing time is before the cutoff
    pub fn purge_landed(&mut self, landed_before: DateTime<Utc>) -> Vec<Flight> {
        let flights = std::mem::take(&mut self.flights);
        let (landed, remaining): (Vec<Flight>, Vec<Flight>) =
            flights.into_iter().partition_map(|flight| {
                if flight.state() == State::Landed
                    && flight.scheduled_landing_time() < landed_before
                {
                    Either::Left(flight)
                } else {
                    Either::Right(flight)
                }
            });

        self.flights = remaining;
        for flight in &landed {
            self.retire(flight);
        }
        landed
    }

    fn retire(&mut self, flight: &Flight) {
        let landing_time = flight
            .scheduled_landing_time()
            .max(flight.estimated_landing_time());
        self.retired.push((flight.callsign().clone(), landing_time));
    }

    /// Accepts updates again for retired flights that landed before the cutoff
    pub fn forget_retired(&mut self, landed_before: DateTime<Utc>) -> usize {
        let before = self.retired.len();
        self.retired
            .retain(|(_, landing_time)| *landing_time >= landed_before);
        before - self.retired.len()
    }

    pub fn snapshot(&self, time: DateTime<Utc>) -> SequenceSnapshot {
        SequenceSnapshot {
            airport: self.airport.identifier.clone(),
            time,
            flights: self.flights.clone(),
            desequenced: self.desequenced.clone(),
            slots: self.slots.clone(),
            current_runway_mode: self.current_runway_mode.identifier.clone(),
            next_runway_mode: self
                .next_runway_mode
                .as_ref()
                .map(|change| change.mode().identifier.clone()),
        }
    }
}

/// Flights without a runway are treated as sharing every runway
fn shares_runway(a: &Flight, b: &Flight) -> bool {
    match (a.assigned_runway(), b.assigned_runway()) {
        (Some(a), Some(b)) => a == b,
        _ => true,
    }
}

#[cfg(test)]
mod test {
    use chrono::TimeZone;

    use super::*;
    use crate::{AircraftCategory, AircraftProfile, Runway, WakeCategory};

    fn time(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, hour, minute, 0).unwrap()
    }

    fn mode(identifier: &str, runways: &[&str]) -> RunwayMode {
        RunwayMode::new(
            identifier,
            runways
                .iter()
                .map(|runway| Runway::new(*runway, TimeDelta::minutes(3)))
                .collect(),
            TimeDelta::minutes(5),
        )
    }

    fn sequence() -> Sequence {
        Sequence::new(AirportConfiguration {
            identifier: "YSSY".to_string(),
            runway_modes: vec![mode("34IVA", &["34L", "34R"]), mode("16IVA", &["16L", "16R"])],
            feeder_fixes: vec!["RIVET".to_string(), "BOREE".to_string()],
            feeder_fix_estimate_source_range_nm: 30.0,
        })
        .unwrap()
    }

    fn flight(callsign: &str, landing: DateTime<Utc>, runway: &str) -> Flight {
        Flight::new(
            callsign.into(),
            AircraftProfile::new("B738", WakeCategory::Medium, AircraftCategory::Jet),
            "YSSY",
            landing,
        )
        .with_runway(runway)
    }

    fn callsigns(sequence: &Sequence) -> Vec<&str> {
        sequence
            .flights()
            .iter()
            .map(|flight| flight.callsign().as_str())
            .collect()
    }

    #[test]
    fn test_add_flight_orders_by_estimate() {
        let mut sequence = sequence();
        sequence.add_flight(flight("QFA1", time(10, 10), "34L")).unwrap();
        sequence.add_flight(flight("QFA2", time(10, 0), "34L")).unwrap();
        sequence.add_flight(flight("QFA3", time(10, 5), "34R")).unwrap();

        assert_eq!(callsigns(&sequence), vec!["QFA2", "QFA3", "QFA1"]);
    }

    #[test]
    fn test_add_flight_validation() {
        let mut sequence = sequence();
        sequence.add_flight(flight("QFA1", time(10, 10), "34L")).unwrap();

        assert_eq!(
            sequence.add_flight(flight("QFA1", time(10, 20), "34L")),
            Err(SequencingError::DuplicateCallsign("QFA1".into()))
        );

        let elsewhere = Flight::new(
            "VOZ1".into(),
            AircraftProfile::new("B738", WakeCategory::Medium, AircraftCategory::Jet),
            "YMML",
            time(10, 0),
        );
        assert!(matches!(
            sequence.add_flight(elsewhere),
            Err(SequencingError::WrongDestination { .. })
        ));
    }

    #[test]
    fn test_reposition_stays_behind_frozen_flight() {
        let mut sequence = sequence();
        sequence.add_flight(flight("FRZ", time(10, 0), "34L")).unwrap();
        sequence.add_flight(flight("UNS", time(10, 5), "34L")).unwrap();
        sequence.add_flight(flight("NEW", time(10, 10), "34L")).unwrap();
        sequence
            .flight_mut(&"FRZ".into())
            .unwrap()
            .set_state(State::Frozen)
            .unwrap();

        sequence
            .flight_mut(&"NEW".into())
            .unwrap()
            .update_landing_estimate(time(9, 55));
        let index = sequence.reposition_by_estimate(&"NEW".into(), false).unwrap();

        assert_eq!(index, 1);
        assert_eq!(callsigns(&sequence), vec!["FRZ", "NEW", "UNS"]);

        // displacement lets it move ahead of the frozen flight
        let index = sequence.reposition_by_estimate(&"NEW".into(), true).unwrap();
        assert_eq!(index, 0);
    }

    #[test]
    fn test_reposition_ignores_frozen_flight_on_other_runway() {
        let mut sequence = sequence();
        sequence.add_flight(flight("FRZ", time(10, 0), "34R")).unwrap();
        sequence.add_flight(flight("NEW", time(10, 10), "34L")).unwrap();
        sequence
            .flight_mut(&"FRZ".into())
            .unwrap()
            .set_state(State::Frozen)
            .unwrap();

        sequence
            .flight_mut(&"NEW".into())
            .unwrap()
            .update_landing_estimate(time(9, 55));
        assert_eq!(sequence.reposition_by_estimate(&"NEW".into(), false), Ok(0));
    }

    #[test]
    fn test_desequence_resume_remove() {
        let mut sequence = sequence();
        sequence.add_flight(flight("QFA1", time(10, 0), "34L")).unwrap();

        sequence.desequence(&"QFA1".into()).unwrap();
        assert!(sequence.flights().is_empty());
        assert_eq!(sequence.desequenced()[0].state(), State::Desequenced);
        assert!(sequence.is_tracked(&"QFA1".into()));

        sequence.resume(&"QFA1".into(), time(9, 0)).unwrap();
        let resumed = sequence.flight(&"QFA1".into()).unwrap();
        assert_eq!(resumed.state(), State::Unstable);
        assert_eq!(resumed.activated_at(), Some(time(9, 0)));

        let removed = sequence.remove(&"QFA1".into()).unwrap();
        assert_eq!(removed.state(), State::Removed);
        assert!(!sequence.is_tracked(&"QFA1".into()));
        assert!(sequence.is_retired(&"QFA1".into()));
        assert_eq!(
            sequence.add_flight(flight("QFA1", time(10, 0), "34L")),
            Err(SequencingError::FlightRetired("QFA1".into()))
        );
        assert_eq!(
            sequence.remove(&"QFA1".into()),
            Err(SequencingError::FlightNotFound("QFA1".into()))
        );
    }

    #[test]
    fn test_insert_flight_relative_to_another() {
        let mut sequence = sequence();
        sequence.add_flight(flight("QFA1", time(10, 0), "34L")).unwrap();

        sequence
            .insert_flight(flight("QFA2", time(11, 0), "34R"), InsertPosition::After("QFA1".into()))
            .unwrap();
        let inserted = sequence.flight(&"QFA2".into()).unwrap();
        assert_eq!(inserted.scheduled_landing_time(), time(10, 3));
        assert_eq!(inserted.assigned_runway(), Some("34L"));
        assert!(inserted.runway_manually_assigned());
        assert!(inserted.manual_landing_time());

        sequence
            .insert_flight(flight("QFA3", time(11, 0), "34R"), InsertPosition::Before("QFA1".into()))
            .unwrap();
        assert_eq!(callsigns(&sequence), vec!["QFA3", "QFA1", "QFA2"]);

        assert_eq!(
            sequence.insert_flight(
                flight("QFA4", time(11, 0), "34R"),
                InsertPosition::Before("NOPE".into())
            ),
            Err(SequencingError::FlightNotFound("NOPE".into()))
        );
    }

    #[test]
    fn test_pending_flights() {
        let mut sequence = sequence();
        sequence.upsert_pending(flight("QFA1", time(10, 0), "34L")).unwrap();
        sequence.upsert_pending(flight("QFA1", time(10, 5), "34L")).unwrap();
        assert_eq!(sequence.pending().len(), 1);
        assert_eq!(sequence.pending()[0].estimated_landing_time(), time(10, 5));

        sequence.add_flight(flight("QFA1", time(10, 5), "34L")).unwrap();
        assert!(sequence.pending().is_empty());
        assert!(sequence.upsert_pending(flight("QFA1", time(10, 5), "34L")).is_err());
    }

    #[test]
    fn test_slots() {
        let mut sequence = sequence();
        let id = sequence
            .create_slot(time(10, 0), time(10, 10), vec!["34L".to_string()])
            .unwrap();
        assert_eq!(sequence.blockouts_for("34L").len(), 1);
        assert!(sequence.blockouts_for("34R").is_empty());

        sequence.modify_slot(id, time(10, 5), time(10, 15)).unwrap();
        assert_eq!(sequence.blockouts_for("34L")[0].start(), time(10, 5));
        assert!(sequence.modify_slot(id, time(10, 15), time(10, 5)).is_err());

        sequence.delete_slot(id).unwrap();
        assert_eq!(sequence.delete_slot(id), Err(SequencingError::SlotNotFound(id)));
    }

    #[test]
    fn test_runway_mode_transition() {
        let mut sequence = sequence();
        let change =
            RunwayModeChange::new(mode("16IVA", &["16L", "16R"]), time(10, 0), time(10, 10))
                .unwrap();
        sequence.schedule_runway_mode_change(change);

        assert_eq!(sequence.runway_mode_at(time(10, 5)).identifier, "34IVA");
        assert_eq!(sequence.runway_mode_at(time(10, 10)).identifier, "16IVA");
        assert_eq!(sequence.blockouts_for("34L").len(), 1);

        assert!(!sequence.try_swap_runway_modes(time(10, 9)));
        assert!(sequence.next_runway_mode().is_some());

        assert!(sequence.try_swap_runway_modes(time(10, 10)));
        assert_eq!(sequence.current_runway_mode().identifier, "16IVA");
        assert!(sequence.next_runway_mode().is_none());
    }

    #[test]
    fn test_purge_landed() {
        let mut sequence = sequence();
        sequence.add_flight(flight("QFA1", time(10, 0), "34L")).unwrap();
        sequence.add_flight(flight("QFA2", time(10, 5), "34L")).unwrap();
        sequence
            .flight_mut(&"QFA1".into())
            .unwrap()
            .set_state(State::Landed)
            .unwrap();

        let purged = sequence.purge_landed(time(10, 2));
        assert_eq!(purged.len(), 1);
        assert_eq!(callsigns(&sequence), vec!["QFA2"]);

        assert!(sequence.upsert_pending(flight("QFA1", time(10, 0), "34L")).is_err());
        assert_eq!(sequence.forget_retired(time(10, 0)), 0);
        assert_eq!(sequence.forget_retired(time(10, 1)), 1);
        assert!(sequence.upsert_pending(flight("QFA1", time(10, 0), "34L")).is_ok());
    }

    #[test]
    fn test_expire_pending() {
        let mut sequence = sequence();
        sequence.upsert_pending(flight("QFA1", time(10, 0), "34L")).unwrap();
        sequence.upsert_pending(flight("QFA2", time(10, 30), "34L")).unwrap();

        let expired = sequence.expire_pending(time(10, 5));
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].callsign().as_str(), "QFA1");
        assert_eq!(sequence.pending().len(), 1);
    }

    #[test]
    fn test_insert_retired_flight() {
        let mut sequence = sequence();
        sequence.add_flight(flight("QFA1", time(10, 0), "34L")).unwrap();
        sequence.remove(&"QFA1".into()).unwrap();

        sequence
            .insert_flight(flight("QFA1", time(10, 0), "34L"), InsertPosition::At(time(10, 10)))
            .unwrap();
        assert!(!sequence.is_retired(&"QFA1".into()));
        assert!(sequence.flight(&"QFA1".into()).is_some());
    }
}
