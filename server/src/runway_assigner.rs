use std::cmp::Reverse;

use arrival_schema::{AircraftProfile, Runway};
use itertools::Itertools;

/// Ranks runways by how well they suit a flight.
///
/// The ranking is a preference only; the scheduler picks the runway that gives the
/// least delay among the ranked candidates.
#[derive(Default, Clone, Copy, Debug)]
pub struct RunwayAssigner;

impl RunwayAssigner {
    const WAKE_CATEGORY_WEIGHT: u8 = 2;
    const FEEDER_FIX_WEIGHT: u8 = 1;

    pub fn score(runway: &Runway, aircraft: &AircraftProfile, feeder_fix: Option<&str>) -> u8 {
        let mut score = 0;

        if runway
            .preferred_wake_categories
            .contains(&aircraft.wake_category)
        {
            score += Self::WAKE_CATEGORY_WEIGHT;
        }

        if feeder_fix.is_some_and(|fix| {
            runway
                .preferred_feeder_fixes
                .iter()
                .any(|preferred| preferred == fix)
        }) {
            score += Self::FEEDER_FIX_WEIGHT;
        }

        score
    }

    /// Runways in descending score; ties keep their configured order
    pub fn rank<'a>(
        &self,
        runways: &'a [Runway],
        aircraft: &AircraftProfile,
        feeder_fix: Option<&str>,
    ) -> Vec<&'a Runway> {
        runways
            .iter()
            .sorted_by_key(|runway| Reverse(Self::score(runway, aircraft, feeder_fix)))
            .collect()
    }
}
