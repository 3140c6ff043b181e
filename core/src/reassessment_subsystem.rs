//! Household reassessment: last phase of every month.
//!
//! Every populated household, in row-major order:
//!   1. switching-cost bookkeeping for last month,
//!   2. a fixed-line leg on a retired plan is moved to its replacement,
//!      or dropped,
//!   3. a household left disconnected or over budget re-decides at once.
//!
//! The month's quota of reassessments is then topped up with randomly
//! sampled households, each of whom re-decides only if a draw beats its
//! switching cost.

use crate::{
    config::SimParams,
    context::SimContext,
    decision::decide,
    error::SimResult,
    event::SimEvent,
    experiment::ReplacementMap,
    grid::Grid,
    household::Household,
    market::MarketCatalogue,
    rng::DrawSource,
    subsystem::MonthPhase,
    types::Month,
};

/// Duplicate picks tolerated before contemplator sampling gives up.
pub const MAX_SAMPLE_REPEATS: usize = 50;

/// Outcome of redirecting a household's fixed-line leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Redirect {
    Unchanged,
    Moved,
    Dropped,
}

/// Move a household off a retired fixed-line plan.
pub fn redirect_fixed_leg(
    household: &mut Household,
    market: &MarketCatalogue,
    replacements: &ReplacementMap,
) -> Redirect {
    let Some(fixed) = household.bundle.fixed else {
        return Redirect::Unchanged;
    };
    if market.plan(fixed).is_some_and(|p| p.is_active()) {
        return Redirect::Unchanged;
    }
    match replacements.resolve(fixed) {
        Some(Some(replacement)) => {
            household.bundle.fixed = Some(replacement);
            Redirect::Moved
        }
        Some(None) => {
            household.bundle.fixed = None;
            Redirect::Dropped
        }
        None => {
            log::warn!(
                "reassessment: household ({}, {}) holds retired plan {fixed:?} with no replacement entry",
                household.row,
                household.col
            );
            household.bundle.fixed = None;
            Redirect::Dropped
        }
    }
}

/// Sample up to `n` distinct populated cells. Gives up after
/// `MAX_SAMPLE_REPEATS` duplicate picks.
pub fn sample_contemplators(grid: &Grid, n: usize, rng: &mut DrawSource) -> Vec<(usize, usize)> {
    let populated = grid.populated_count();
    if populated == 0 || grid.side == 0 {
        return Vec::new();
    }
    let n = n.min(populated);

    let mut picked: Vec<(usize, usize)> = Vec::with_capacity(n);
    let mut repeats = 0;
    while picked.len() < n && repeats < MAX_SAMPLE_REPEATS {
        let row = rng.next_below(grid.side);
        let col = rng.next_below(grid.side);
        if grid.get(row, col).is_none() {
            continue;
        }
        if picked.contains(&(row, col)) {
            repeats += 1;
        } else {
            picked.push((row, col));
        }
    }
    picked
}

fn redecide(
    household: &mut Household,
    market: &MarketCatalogue,
    params: &SimParams,
    rng: &mut DrawSource,
) {
    household.bundle = decide(household, market, params, rng, false);
    household.refresh_expenditure(market);
    household.switched = true;
}

pub struct ReassessmentSubsystem;

impl ReassessmentSubsystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ReassessmentSubsystem {
    fn default() -> Self {
        Self::new()
    }
}

impl MonthPhase for ReassessmentSubsystem {
    fn name(&self) -> &'static str {
        "reassessment"
    }

    fn run(
        &mut self,
        ctx: &mut SimContext,
        month: Month,
        _events_in: &[SimEvent],
    ) -> SimResult<Vec<SimEvent>> {
        let SimContext { params, market, grid, rng, replacements, ledger } = ctx;

        for household in grid.households_mut() {
            household.update_switching_cost(params.switching_cost_increase);

            let redirect = redirect_fixed_leg(household, market, replacements);
            if redirect != Redirect::Unchanged {
                ledger.redirected += 1;
            }

            if redirect == Redirect::Dropped || household.has_real_problem(market, params.income_budget) {
                redecide(household, market, params, rng);
                ledger.real_problems += 1;
            } else {
                household.refresh_expenditure(market);
            }
        }

        if ledger.real_problems < params.num_dissatisfied {
            let wanted = params.num_dissatisfied - ledger.real_problems;
            // Each gate draw is followed directly by that household's
            // decision draws, not batched ahead of them.
            for (row, col) in sample_contemplators(grid, wanted, rng) {
                let Some(household) = grid.get_mut(row, col) else { continue };
                if rng.next_f64() > household.switching_cost {
                    redecide(household, market, params, rng);
                    ledger.contemplators += 1;
                }
            }
        }

        let switched = grid.households().filter(|h| h.switched).count();
        log::debug!(
            "month={month} reassessment: real_problems={} contemplators={} redirected={} switched={switched}",
            ledger.real_problems,
            ledger.contemplators,
            ledger.redirected,
        );
        Ok(vec![SimEvent::HouseholdsReassessed {
            month,
            real_problems: ledger.real_problems,
            contemplators: ledger.contemplators,
            redirected:    ledger.redirected,
            switched,
        }])
    }
}
