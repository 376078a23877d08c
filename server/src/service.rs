use std::sync::Arc;

use arrival_schema::{
    AirportConfiguration, ArrivalLookup, Callsign, FixCrossing, FixLookup, Flight,
    FlightPosition, InsertPosition, PerformanceLookup, RunwayMode, RunwayModeChange, Scheduler,
    Sequence, SequenceSnapshot, SequencingError, State,
};
use chrono::{DateTime, Utc};
use futures::channel::mpsc;
use itertools::Itertools;
use tokio_util::sync::CancellationToken;
use ulid::Ulid;

use crate::{
    EstimateProvider, LookupMisses, SequenceProvider, Settings, SnapshotPublisher,
    TrajectoryService,
};

/// Feeder-fix part of a flight data update
#[derive(Clone, Debug, PartialEq)]
pub struct FeederFixUpdate {
    pub identifier: String,
    pub system_estimate: DateTime<Utc>,
    /// Observed crossing, once the flight has passed the fix
    pub actual_time_over: Option<DateTime<Utc>>,
}

/// Latest flight data and surveillance for one flight
#[derive(Clone, Debug, PartialEq)]
pub struct FlightUpdate {
    pub callsign: Callsign,
    pub aircraft_type: String,
    pub origin: Option<String>,
    pub destination: String,
    pub feeder_fix: Option<FeederFixUpdate>,
    pub landing_system_estimate: DateTime<Utc>,
    pub arrival: Option<String>,
    pub runway: Option<String>,
    pub position: Option<FlightPosition>,
}

/// The commands accepted for each managed airport.
///
/// Every command takes the airport's lock for its whole read-modify-schedule cycle
/// and publishes a snapshot once the scheduling pass has been committed.
pub struct SequenceService<S: Scheduler> {
    provider: SequenceProvider,
    scheduler: S,
    estimates: EstimateProvider,
    performance: Arc<dyn PerformanceLookup>,
    publisher: SnapshotPublisher,
    settings: Settings,
    misses: Arc<LookupMisses>,
}

impl<S: Scheduler> SequenceService<S> {
    pub fn new(
        scheduler: S,
        performance: Arc<dyn PerformanceLookup>,
        fixes: Arc<dyn FixLookup>,
        arrivals: Arc<dyn ArrivalLookup>,
        settings: Settings,
    ) -> Self {
        let misses = Arc::new(LookupMisses::default());
        let trajectories = TrajectoryService::new(arrivals, misses.clone());

        Self {
            provider: SequenceProvider::default(),
            scheduler,
            estimates: EstimateProvider::new(fixes, trajectories, misses.clone()),
            performance,
            publisher: SnapshotPublisher::default(),
            settings,
            misses,
        }
    }

    pub fn provider(&self) -> &SequenceProvider {
        &self.provider
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn misses(&self) -> &LookupMisses {
        &self.misses
    }

    pub fn subscribe(&self) -> (Ulid, mpsc::UnboundedReceiver<SequenceSnapshot>) {
        self.publisher.subscribe()
    }

    pub fn unsubscribe(&self, id: Ulid) {
        self.publisher.unsubscribe(id)
    }

    pub async fn snapshot(
        &self,
        airport: &str,
        now: DateTime<Utc>,
    ) -> Result<SequenceSnapshot, SequencingError> {
        Ok(self.provider.acquire(airport).await?.snapshot(now))
    }

    /// Applies a change under the airport's lock, then schedules and publishes.
    ///
    /// A rejected change leaves the sequence untouched and publishes nothing. A
    /// scheduling failure is returned after the snapshot has been published.
    async fn with_sequence<T>(
        &self,
        airport: &str,
        now: DateTime<Utc>,
        change: impl FnOnce(&mut Sequence) -> Result<T, SequencingError>,
    ) -> Result<T, SequencingError> {
        let mut sequence = self.provider.acquire(airport).await?;
        let value = change(&mut *sequence)?;

        let scheduled = self.scheduler.schedule(&mut *sequence);
        self.publisher.publish(sequence.snapshot(now));

        scheduled.map(|_| value)
    }

    /// Feeds the latest flight data for a flight into the sequence.
    ///
    /// Tracked flights have their estimates refreshed and are repositioned unless
    /// their position is fixed. Unknown flights are held as pending until they come
    /// within range of their feeder fix, then activated. Removed and landed flights
    /// are refused until the retired retention has passed.
    pub async fn update_flight(
        &self,
        airport: &str,
        update: FlightUpdate,
        now: DateTime<Utc>,
    ) -> Result<(), SequencingError> {
        self.with_sequence(airport, now, |sequence| {
            if update.destination != sequence.airport_identifier() {
                return Err(SequencingError::WrongDestination {
                    callsign: update.callsign.clone(),
                    destination: update.destination.clone(),
                    airport: sequence.airport_identifier().to_string(),
                });
            }

            if sequence.is_retired(&update.callsign) {
                return Err(SequencingError::FlightRetired(update.callsign.clone()));
            }

            let config = sequence.airport().clone();
            let position_is_fixed = match sequence.flight_mut(&update.callsign) {
                Ok(flight) => {
                    apply_flight_data(flight, &update)?;
                    self.refresh_estimates(&config, flight, now);
                    Some(flight.state().position_is_fixed())
                }
                Err(_) => None,
            };
            if let Some(position_is_fixed) = position_is_fixed {
                if !position_is_fixed {
                    sequence.reposition_by_estimate(&update.callsign, false)?;
                }
                return Ok(());
            }

            if let Some(flight) = sequence.desequenced_flight_mut(&update.callsign) {
                apply_flight_data(flight, &update)?;
                self.refresh_estimates(&config, flight, now);
                return Ok(());
            }

            self.track_or_hold(sequence, &config, &update, now)
        })
        .await
    }

    fn track_or_hold(
        &self,
        sequence: &mut Sequence,
        config: &AirportConfiguration,
        update: &FlightUpdate,
        now: DateTime<Utc>,
    ) -> Result<(), SequencingError> {
        let mut flight = Flight::new(
            update.callsign.clone(),
            self.performance.profile(&update.aircraft_type),
            update.destination.clone(),
            update.landing_system_estimate,
        );
        if let Some(origin) = &update.origin {
            flight = flight.with_origin(origin.clone());
        }
        if let Some(feeder_fix) = &update.feeder_fix {
            flight =
                flight.with_feeder_fix(feeder_fix.identifier.clone(), feeder_fix.system_estimate);
        }
        apply_flight_data(&mut flight, update)?;
        self.refresh_estimates(config, &mut flight, now);

        if !self.in_range(&flight) {
            return sequence.upsert_pending(flight);
        }

        let missed_crossing = flight
            .feeder_fix()
            .is_some_and(|fix| !fix.has_passed() && fix.estimate() < now);
        if missed_crossing {
            log::info!(
                "{}: {} passed {:?} before it was tracked",
                config.identifier,
                flight.callsign(),
                flight.feeder_fix_identifier()
            );
            flight.record_feeder_fix_crossing(FixCrossing::Untracked)?;
            self.refresh_estimates(config, &mut flight, now);
        }

        flight.activate(now);
        log::info!(
            "{}: {} activated, estimated {} via {}",
            config.identifier,
            flight.callsign(),
            flight.estimated_landing_time(),
            flight.feeder_fix_identifier().unwrap_or("no feeder fix")
        );
        sequence.add_flight(flight)?;

        Ok(())
    }

    /// Whether a flight is close enough to its feeder fix to be tracked
    fn in_range(&self, flight: &Flight) -> bool {
        match (flight.feeder_fix_identifier(), flight.position()) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(fix), Some(position)) => self
                .estimates
                .distance_to_fix_nm(fix, position)
                .map_or(true, |distance| distance <= self.settings.flight_creation_range_nm),
        }
    }

    /// Re-derives both estimates from the flight's system estimates and position
    fn refresh_estimates(
        &self,
        config: &AirportConfiguration,
        flight: &mut Flight,
        now: DateTime<Utc>,
    ) {
        if flight.state() == State::Landed {
            return;
        }

        let feeder_fix_estimate = flight.feeder_fix().filter(|fix| !fix.has_passed()).map(|fix| {
            self.estimates.feeder_fix_estimate(
                config,
                fix.identifier(),
                fix.system_estimate(),
                flight.position(),
                now,
            )
        });
        if let Some(estimate) = feeder_fix_estimate {
            if let Err(e) = flight.update_feeder_fix_estimate(estimate) {
                log::warn!("{}: {e}", config.identifier);
            }
        }

        let landing_estimate = self.estimates.landing_estimate(
            &config.identifier,
            flight,
            flight.landing_system_estimate(),
        );
        flight.update_landing_estimate(landing_estimate);
    }

    /// Inserts a flight out of band at a controller's request. The flight comes from
    /// the pending list, or is created from its callsign and aircraft type.
    pub async fn insert_flight(
        &self,
        airport: &str,
        callsign: Callsign,
        aircraft_type: Option<&str>,
        position: InsertPosition,
        now: DateTime<Utc>,
    ) -> Result<(), SequencingError> {
        self.with_sequence(airport, now, |sequence| {
            let pending = sequence
                .pending()
                .iter()
                .find(|flight| flight.callsign() == &callsign)
                .cloned();

            let mut flight = match (pending, aircraft_type) {
                (Some(flight), _) => flight,
                (None, Some(aircraft_type)) => {
                    let estimate = match &position {
                        InsertPosition::At(time) => *time,
                        InsertPosition::Before(target) | InsertPosition::After(target) => sequence
                            .flight(target)
                            .ok_or_else(|| SequencingError::FlightNotFound(target.clone()))?
                            .scheduled_landing_time(),
                    };
                    Flight::new(
                        callsign.clone(),
                        self.performance.profile(aircraft_type),
                        sequence.airport_identifier(),
                        estimate,
                    )
                }
                (None, None) => return Err(SequencingError::FlightNotFound(callsign.clone())),
            };

            flight.activate(now);
            sequence.insert_flight(flight, position)?;
            log::info!("{}: {callsign} inserted manually", sequence.airport_identifier());
            Ok(())
        })
        .await
    }

    /// Pins the flight to a runway, or with `None` lets the scheduler choose again
    pub async fn change_runway(
        &self,
        airport: &str,
        callsign: &Callsign,
        runway: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), SequencingError> {
        self.with_sequence(airport, now, |sequence| {
            let flight = sequence.flight_mut(callsign)?;
            match runway {
                Some(runway) => flight.assign_runway(runway, true),
                None => flight.release_runway(),
            }
            Ok(())
        })
        .await
    }

    pub async fn desequence(
        &self,
        airport: &str,
        callsign: &Callsign,
        now: DateTime<Utc>,
    ) -> Result<(), SequencingError> {
        self.with_sequence(airport, now, |sequence| {
            sequence.desequence(callsign)?;
            log::info!("{}: {callsign} desequenced", sequence.airport_identifier());
            Ok(())
        })
        .await
    }

    pub async fn resume(
        &self,
        airport: &str,
        callsign: &Callsign,
        now: DateTime<Utc>,
    ) -> Result<(), SequencingError> {
        self.with_sequence(airport, now, |sequence| {
            sequence.resume(callsign, now)?;
            log::info!("{}: {callsign} resumed", sequence.airport_identifier());
            Ok(())
        })
        .await
    }

    pub async fn remove(
        &self,
        airport: &str,
        callsign: &Callsign,
        now: DateTime<Utc>,
    ) -> Result<(), SequencingError> {
        self.with_sequence(airport, now, |sequence| {
            sequence.remove(callsign)?;
            log::info!("{}: {callsign} removed", sequence.airport_identifier());
            Ok(())
        })
        .await
    }

    pub async fn set_high_priority(
        &self,
        airport: &str,
        callsign: &Callsign,
        high_priority: bool,
        now: DateTime<Utc>,
    ) -> Result<(), SequencingError> {
        self.with_sequence(airport, now, |sequence| {
            sequence.flight_mut(callsign)?.set_high_priority(high_priority);
            Ok(())
        })
        .await
    }

    pub async fn set_no_delay(
        &self,
        airport: &str,
        callsign: &Callsign,
        no_delay: bool,
        now: DateTime<Utc>,
    ) -> Result<(), SequencingError> {
        self.with_sequence(airport, now, |sequence| {
            sequence.flight_mut(callsign)?.set_no_delay(no_delay);
            Ok(())
        })
        .await
    }

    /// Moves a flight to a controller-chosen landing time and keeps it there
    pub async fn change_landing_time(
        &self,
        airport: &str,
        callsign: &Callsign,
        landing_time: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(), SequencingError> {
        self.with_sequence(airport, now, |sequence| {
            sequence
                .flight_mut(callsign)?
                .set_manual_landing_time(landing_time);
            sequence.sort();
            Ok(())
        })
        .await
    }

    pub async fn clear_manual_landing_time(
        &self,
        airport: &str,
        callsign: &Callsign,
        now: DateTime<Utc>,
    ) -> Result<(), SequencingError> {
        self.with_sequence(airport, now, |sequence| {
            sequence.flight_mut(callsign)?.clear_manual_landing_time();
            Ok(())
        })
        .await
    }

    pub async fn create_slot(
        &self,
        airport: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        runway_identifiers: Vec<String>,
        now: DateTime<Utc>,
    ) -> Result<Ulid, SequencingError> {
        self.with_sequence(airport, now, |sequence| {
            sequence.create_slot(start, end, runway_identifiers)
        })
        .await
    }

    pub async fn modify_slot(
        &self,
        airport: &str,
        id: Ulid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(), SequencingError> {
        self.with_sequence(airport, now, |sequence| sequence.modify_slot(id, start, end))
            .await
    }

    pub async fn delete_slot(
        &self,
        airport: &str,
        id: Ulid,
        now: DateTime<Utc>,
    ) -> Result<(), SequencingError> {
        self.with_sequence(airport, now, |sequence| sequence.delete_slot(id).map(|_| ()))
            .await
    }

    /// Switches to one of the airport's runway modes right away
    pub async fn change_runway_mode(
        &self,
        airport: &str,
        mode: &str,
        now: DateTime<Utc>,
    ) -> Result<(), SequencingError> {
        self.with_sequence(airport, now, |sequence| {
            let mode = configured_mode(sequence, mode)?;
            log::info!(
                "{}: runway mode {} replaced by {}",
                sequence.airport_identifier(),
                sequence.current_runway_mode().identifier,
                mode.identifier
            );
            sequence.change_runway_mode(mode);
            Ok(())
        })
        .await
    }

    /// Plans a runway mode change. Nothing lands between the two times.
    pub async fn schedule_runway_mode_change(
        &self,
        airport: &str,
        mode: &str,
        last_landing_time_for_current_mode: DateTime<Utc>,
        first_landing_time_for_next_mode: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(), SequencingError> {
        self.with_sequence(airport, now, |sequence| {
            let change = RunwayModeChange::new(
                configured_mode(sequence, mode)?,
                last_landing_time_for_current_mode,
                first_landing_time_for_next_mode,
            )?;
            log::info!(
                "{}: runway mode {} from {first_landing_time_for_next_mode}",
                sequence.airport_identifier(),
                change.mode().identifier
            );
            sequence.schedule_runway_mode_change(change);
            Ok(())
        })
        .await
    }

    /// Accounts for the passage of time: refreshes estimates, promotes states, swaps
    /// runway modes, reschedules and drops flights that landed long enough ago, along
    /// with pending flights that should have landed by then.
    ///
    /// Gives up without touching the sequence if cancelled while waiting for it.
    pub async fn recompute(
        &self,
        airport: &str,
        now: DateTime<Utc>,
        cancellation: &CancellationToken,
    ) -> Result<(), SequencingError> {
        let mut sequence = self
            .provider
            .acquire_cancellable(airport, cancellation)
            .await?;
        let config = sequence.airport().clone();

        for flight in sequence.flights_mut() {
            self.refresh_estimates(&config, flight, now);
            if let Some(state) = flight.update_state_based_on_time(now, &self.settings.thresholds) {
                log::debug!("{}: {} is now {state:?}", config.identifier, flight.callsign());
            }
        }

        sequence.try_swap_runway_modes(now);

        let unfixed = sequence
            .flights()
            .iter()
            .filter(|flight| !flight.state().position_is_fixed())
            .map(|flight| flight.callsign().clone())
            .collect_vec();
        for callsign in unfixed {
            sequence.reposition_by_estimate(&callsign, false)?;
        }

        let scheduled = self.scheduler.schedule(&mut *sequence);

        for flight in sequence.purge_landed(now - self.settings.landed_retention) {
            log::info!("{}: {} landed, no longer tracked", config.identifier, flight.callsign());
        }
        for flight in sequence.expire_pending(now - self.settings.landed_retention) {
            log::info!("{}: {} never came in range, dropped", config.identifier, flight.callsign());
        }
        let forgotten = sequence.forget_retired(now - self.settings.retired_retention);
        if forgotten > 0 {
            log::debug!("{}: forgot {forgotten} retired callsigns", config.identifier);
        }

        self.publisher.publish(sequence.snapshot(now));
        scheduled
    }
}

fn configured_mode(
    sequence: &Sequence,
    mode: &str,
) -> Result<RunwayMode, SequencingError> {
    sequence
        .airport()
        .runway_mode(mode)
        .cloned()
        .ok_or_else(|| SequencingError::InvalidRunwayModeChange {
            mode: mode.to_string(),
            reason: format!("not a runway mode of {}", sequence.airport_identifier()),
        })
}

/// Copies the raw flight data onto a flight. A feed runway only applies until the
/// scheduler has picked one.
fn apply_flight_data(flight: &mut Flight, update: &FlightUpdate) -> Result<(), SequencingError> {
    flight.set_system_estimates(
        update.feeder_fix.as_ref().map(|fix| fix.system_estimate),
        update.landing_system_estimate,
    );

    if let Some(position) = update.position {
        flight.update_position(position);
    }
    if update.arrival.is_some() {
        flight.set_arrival(update.arrival.clone());
    }
    if flight.assigned_runway().is_none() {
        if let Some(runway) = &update.runway {
            flight.assign_runway(runway.clone(), false);
        }
    }

    let actual_time_over = update
        .feeder_fix
        .as_ref()
        .and_then(|fix| fix.actual_time_over);
    if let Some(time) = actual_time_over {
        if !flight.has_passed_feeder_fix() {
            log::debug!("{} crossed the feeder fix at {time}", flight.callsign());
            flight.record_feeder_fix_crossing(FixCrossing::Observed(time))?;
        }
    }

    Ok(())
}
