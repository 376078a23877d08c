use std::collections::HashMap;

use arrival_schema::{AircraftProfile, RunwayMode, SeparationRuleProvider, WakeCategory};
use chrono::TimeDelta;

/// No computed spacing between two landings is ever below this many seconds
const MINIMUM_SEPARATION_SECONDS: i64 = 30;

/// Time-based wake turbulence separation between leader and trailer categories
#[derive(Clone, Debug)]
pub struct WakeSeparationRules {
    rules: HashMap<(WakeCategory, WakeCategory), TimeDelta>,
}

impl WakeSeparationRules {
    pub fn new(rules: impl IntoIterator<Item = ((WakeCategory, WakeCategory), TimeDelta)>) -> Self {
        Self {
            rules: rules.into_iter().collect(),
        }
    }
}

impl Default for WakeSeparationRules {
    fn default() -> Self {
        use WakeCategory::*;

        Self::new([
            ((SuperHeavy, Heavy), TimeDelta::seconds(120)),
            ((SuperHeavy, Medium), TimeDelta::seconds(180)),
            ((SuperHeavy, Light), TimeDelta::seconds(180)),
            ((Heavy, Heavy), TimeDelta::seconds(90)),
            ((Heavy, Medium), TimeDelta::seconds(120)),
            ((Heavy, Light), TimeDelta::seconds(180)),
            ((Medium, Light), TimeDelta::seconds(120)),
        ])
    }
}

impl SeparationRuleProvider for WakeSeparationRules {
    fn minimum_separation(
        &self,
        leader: &AircraftProfile,
        trailer: &AircraftProfile,
        _runway_mode: &RunwayMode,
    ) -> Option<TimeDelta> {
        self.rules
            .get(&(leader.wake_category, trailer.wake_category))
            .copied()
    }
}

/// Resolves the spacing required between two landings within a runway mode
pub struct SeparationCalculator<'a> {
    rules: &'a dyn SeparationRuleProvider,
    mode: &'a RunwayMode,
}

impl<'a> SeparationCalculator<'a> {
    pub fn new(rules: &'a dyn SeparationRuleProvider, mode: &'a RunwayMode) -> Self {
        Self { rules, mode }
    }

    /// Spacing the trailer must keep behind the leader, or `None` if the two landings
    /// are independent.
    ///
    /// - same runway: the separation rule, never less than the runway's landing rate
    /// - dependent runways: the dependency's stagger
    /// - either runway outside the mode: the mode's off-mode separation
    pub fn required_separation(
        &self,
        leader: &AircraftProfile,
        leader_runway: &str,
        trailer: &AircraftProfile,
        trailer_runway: &str,
    ) -> Option<TimeDelta> {
        let floor = TimeDelta::seconds(MINIMUM_SEPARATION_SECONDS);

        match (self.mode.runway(leader_runway), self.mode.runway(trailer_runway)) {
            (Some(runway), Some(_)) if leader_runway == trailer_runway => {
                let landing_rate = runway.landing_rate;
                let separation = self
                    .rules
                    .minimum_separation(leader, trailer, self.mode)
                    .map_or(landing_rate, |rule| rule.max(landing_rate));
                Some(separation.max(floor))
            }
            (Some(leader_rwy), Some(trailer_rwy)) => trailer_rwy
                .dependency_on(leader_runway)
                .or_else(|| leader_rwy.dependency_on(trailer_runway))
                .map(|dependency| dependency.separation.max(floor)),
            _ => Some(self.mode.off_mode_separation),
        }
    }
}
