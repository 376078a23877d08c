use std::sync::Arc;

use arrival_schema::{
    AircraftProfile, ArrivalLookup, Callsign, Flight, FlowControls, RunwayMode, Scheduler,
    SeparationRuleProvider, Sequence, SequencingError, State,
};
use chrono::{DateTime, TimeDelta, Utc};
use itertools::Itertools;

use crate::{RunwayAssigner, SeparationCalculator};

/// Schedules arrivals in priority passes, resolving each flight against everything
/// already scheduled.
///
/// Stable and later flights are anchors: they stay where they are and everything
/// else is fitted around them. New and unstable flights are scheduled in estimate
/// order within each pass.
pub struct SequenceScheduler {
    /// Specific separation rules between aircraft
    separation_rules: Arc<dyn SeparationRuleProvider>,
    /// Source of runway-dependent arrival intervals
    arrivals: Arc<dyn ArrivalLookup>,
    runway_assigner: RunwayAssigner,
}

/// A committed landing that later flights must keep clear of
#[derive(Clone, Debug)]
struct Landing {
    callsign: Callsign,
    aircraft: AircraftProfile,
    runway: String,
    feeder_fix: Option<String>,
    time: DateTime<Utc>,
    position_is_fixed: bool,
}

impl Landing {
    fn of(flight: &Flight) -> Option<Self> {
        Some(Self {
            callsign: flight.callsign().clone(),
            aircraft: flight.aircraft().clone(),
            runway: flight.assigned_runway()?.to_string(),
            feeder_fix: flight.feeder_fix_identifier().map(str::to_string),
            time: flight.scheduled_landing_time(),
            position_is_fixed: flight.state().position_is_fixed(),
        })
    }
}

/// Scheduling passes, in the order they run
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Pass {
    NoDelay,
    ManualLandingTime,
    HighPriority,
    Normal,
}

impl Pass {
    fn of(flight: &Flight) -> Self {
        if flight.no_delay() {
            Self::NoDelay
        } else if flight.manual_landing_time() {
            Self::ManualLandingTime
        } else if flight.high_priority() {
            Self::HighPriority
        } else {
            Self::Normal
        }
    }
}

impl SequenceScheduler {
    /// Passes through the conflict-resolution loop before a flight is declared
    /// unschedulable
    const MAX_ATTEMPTS: usize = 100;

    pub fn new(
        separation_rules: Arc<dyn SeparationRuleProvider>,
        arrivals: Arc<dyn ArrivalLookup>,
    ) -> Self {
        Self {
            separation_rules,
            arrivals,
            runway_assigner: RunwayAssigner,
        }
    }

    /// Commits a flight at its estimate, ignoring spacing
    fn schedule_without_delay(
        &self,
        sequence: &mut Sequence,
        index: usize,
        landings: &mut Vec<Landing>,
    ) {
        let flight = &sequence.flights()[index];
        let estimate = flight.estimated_landing_time();
        let runway = flight.assigned_runway().map(str::to_string).or_else(|| {
            self.runway_assigner
                .rank(
                    &sequence.runway_mode_at(estimate).runways,
                    flight.aircraft(),
                    flight.feeder_fix_identifier(),
                )
                .first()
                .map(|runway| runway.identifier.clone())
        });
        let Some(runway) = runway else {
            log::warn!(
                "{}: no runway available for {}",
                sequence.airport_identifier(),
                flight.callsign()
            );
            return;
        };

        let flight = &mut sequence.flights_mut()[index];
        flight.schedule(estimate, runway);
        flight.set_flow_controls(FlowControls::ProfileSpeed);
        landings.extend(Landing::of(flight));
    }

    /// Resolves and commits a flight, leaving it untouched if it cannot be scheduled
    fn schedule_with_delay(
        &self,
        sequence: &mut Sequence,
        index: usize,
        landings: &mut Vec<Landing>,
    ) -> Result<(), SequencingError> {
        let flight = &sequence.flights()[index];

        let (landing_time, runway) = match self.schedule_internal(sequence, flight, landings) {
            Ok(schedule) => schedule,
            Err(e) => {
                log::error!(
                    "{}: {e}; keeping {} at {} on {:?}. scheduled landings: {:?}",
                    sequence.airport_identifier(),
                    flight.callsign(),
                    flight.scheduled_landing_time(),
                    flight.assigned_runway(),
                    landings
                        .iter()
                        .map(|landing| (&landing.callsign, &landing.runway, landing.time))
                        .collect_vec()
                );
                landings.extend(Landing::of(flight));
                return Err(e);
            }
        };

        let flow_controls =
            if flight.aircraft().is_jet() && landing_time > flight.estimated_landing_time() {
                FlowControls::ReduceSpeed
            } else {
                FlowControls::ProfileSpeed
            };

        log::debug!(
            "{}: {} scheduled on {runway} at {landing_time} ({} delay)",
            sequence.airport_identifier(),
            flight.callsign(),
            landing_time - flight.estimated_landing_time()
        );

        let flight = &mut sequence.flights_mut()[index];
        flight.schedule(landing_time, runway);
        flight.set_flow_controls(flow_controls);
        landings.extend(Landing::of(flight));

        Ok(())
    }

    /// Chooses the least-delayed runway for a flight in the runway mode in effect at
    /// its estimate, moving on to the next mode if the result falls past the change.
    fn schedule_internal(
        &self,
        sequence: &Sequence,
        flight: &Flight,
        landings: &[Landing],
    ) -> Result<(DateTime<Utc>, String), SequencingError> {
        let estimate = flight.estimated_landing_time();
        let change = sequence.next_runway_mode();
        let mut in_next_mode = change
            .is_some_and(|change| estimate >= change.first_landing_time_for_next_mode());
        let mut earliest = estimate;

        loop {
            let mode = match change {
                Some(change) if in_next_mode => change.mode(),
                _ => sequence.current_runway_mode(),
            };
            let (landing_time, runway) =
                self.best_runway(sequence, flight, mode, earliest, landings)?;

            match change {
                Some(change)
                    if !in_next_mode
                        && landing_time >= change.last_landing_time_for_current_mode() =>
                {
                    in_next_mode = true;
                    earliest = earliest.max(change.first_landing_time_for_next_mode());
                }
                _ => return Ok((landing_time, runway)),
            }
        }
    }

    fn best_runway(
        &self,
        sequence: &Sequence,
        flight: &Flight,
        mode: &RunwayMode,
        earliest: DateTime<Utc>,
        landings: &[Landing],
    ) -> Result<(DateTime<Utc>, String), SequencingError> {
        let candidates = match flight.assigned_runway() {
            Some(runway) if flight.runway_manually_assigned() => vec![runway.to_string()],
            _ => self
                .runway_assigner
                .rank(&mode.runways, flight.aircraft(), flight.feeder_fix_identifier())
                .into_iter()
                .map(|runway| runway.identifier.clone())
                .collect(),
        };

        let mut best: Option<(DateTime<Utc>, String)> = None;
        for runway in candidates {
            let landing_time = self.earliest_landing_time_for_runway(
                sequence, flight, &runway, mode, earliest, landings,
            )?;
            if best.as_ref().map_or(true, |(best_time, _)| landing_time < *best_time) {
                best = Some((landing_time, runway));
            }
        }

        best.ok_or_else(|| SequencingError::UnsatisfiableSchedule {
            callsign: flight.callsign().clone(),
            runway: format!("any runway in {}", mode.identifier),
            attempts: 0,
        })
    }

    /// Earliest time from `earliest` at which the flight can land on the runway
    /// without infringing separation with scheduled landings or any blockout.
    fn earliest_landing_time_for_runway(
        &self,
        sequence: &Sequence,
        flight: &Flight,
        runway: &str,
        mode: &RunwayMode,
        earliest: DateTime<Utc>,
        landings: &[Landing],
    ) -> Result<DateTime<Utc>, SequencingError> {
        let calculator = SeparationCalculator::new(self.separation_rules.as_ref(), mode);
        let blockouts = sequence.blockouts_for(runway);
        let arrival_interval = flight.feeder_fix_identifier().and_then(|feeder_fix| {
            self.arrivals.arrival_interval(
                sequence.airport_identifier(),
                feeder_fix,
                runway,
                flight.aircraft(),
            )
        });
        // The arrival interval only spaces flights that share the runway and feeder fix
        let feeder_fix = flight.feeder_fix_identifier();
        let required = |leader: &AircraftProfile,
                        leader_runway: &str,
                        trailer: &AircraftProfile,
                        trailer_runway: &str,
                        other_feeder_fix: Option<&str>|
         -> Option<TimeDelta> {
            let separation =
                calculator.required_separation(leader, leader_runway, trailer, trailer_runway)?;
            match arrival_interval {
                Some(interval)
                    if leader_runway == trailer_runway && other_feeder_fix == feeder_fix =>
                {
                    Some(separation.max(interval))
                }
                _ => Some(separation),
            }
        };

        // Nothing overtakes a flight whose position is fixed on the same runway
        let mut proposed = landings
            .iter()
            .filter(|landing| landing.position_is_fixed && landing.runway == runway)
            .map(|landing| landing.time)
            .max()
            .map_or(earliest, |fixed| fixed.max(earliest));

        for _ in 0..Self::MAX_ATTEMPTS {
            let before = proposed;

            // Behind every leader that is too close
            if let Some(pushed) = landings
                .iter()
                .filter(|leader| leader.time <= proposed)
                .filter_map(|leader| {
                    let separation = required(
                        &leader.aircraft,
                        &leader.runway,
                        flight.aircraft(),
                        runway,
                        leader.feeder_fix.as_deref(),
                    )?;
                    (proposed - leader.time < separation).then_some(leader.time + separation)
                })
                .max()
            {
                proposed = pushed;
            }

            // Behind the first trailer that would be infringed
            if let Some(trailer) = landings
                .iter()
                .filter(|trailer| trailer.time >= proposed)
                .filter(|trailer| {
                    required(
                        flight.aircraft(),
                        runway,
                        &trailer.aircraft,
                        &trailer.runway,
                        trailer.feeder_fix.as_deref(),
                    )
                    .is_some_and(|separation| trailer.time - proposed < separation)
                })
                .min_by_key(|trailer| trailer.time)
            {
                let separation = required(
                    &trailer.aircraft,
                    &trailer.runway,
                    flight.aircraft(),
                    runway,
                    trailer.feeder_fix.as_deref(),
                )
                .unwrap_or_else(TimeDelta::zero);
                proposed = trailer.time + separation;
            }

            if let Some(blockout) = blockouts.iter().find(|blockout| blockout.contains(proposed)) {
                proposed = blockout.end();
            }

            if proposed == before {
                return Ok(proposed);
            }
        }

        Err(SequencingError::UnsatisfiableSchedule {
            callsign: flight.callsign().clone(),
            runway: runway.to_string(),
            attempts: Self::MAX_ATTEMPTS,
        })
    }
}

impl Scheduler for SequenceScheduler {
    fn schedule(&self, sequence: &mut Sequence) -> Result<(), SequencingError> {
        let mut landings = sequence
            .flights()
            .iter()
            .filter(|flight| flight.state() >= State::Stable && flight.state().is_sequenced())
            .filter_map(Landing::of)
            .collect_vec();

        let schedulable = sequence
            .flights()
            .iter()
            .enumerate()
            .filter(|(_, flight)| matches!(flight.state(), State::New | State::Unstable))
            .sorted_by(|(_, a), (_, b)| {
                Pass::of(a)
                    .cmp(&Pass::of(b))
                    .then_with(|| a.estimated_landing_time().cmp(&b.estimated_landing_time()))
                    .then_with(|| a.callsign().cmp(b.callsign()))
            })
            .map(|(index, flight)| (index, Pass::of(flight)))
            .collect_vec();

        let mut first_error = None;
        for (index, pass) in schedulable {
            match pass {
                Pass::NoDelay => self.schedule_without_delay(sequence, index, &mut landings),
                Pass::ManualLandingTime => {
                    landings.extend(Landing::of(&sequence.flights()[index]));
                }
                Pass::HighPriority | Pass::Normal => {
                    if let Err(e) = self.schedule_with_delay(sequence, index, &mut landings) {
                        first_error.get_or_insert(e);
                    }
                }
            }
        }

        for flight in sequence.flights_mut() {
            if flight.state() == State::New {
                flight.set_state(State::Unstable)?;
            }
        }
        sequence.sort();

        first_error.map_or(Ok(()), Err)
    }
}
