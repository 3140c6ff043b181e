//! Product experiments: a fixed-line firm withdraws one of its plans or
//! copies a competitor's, and undoes the change if profit does not
//! improve.
//!
//! Runs after price experiments. Plans retired here (or by a rollback)
//! are registered in the run's replacement map so the reassessment pass
//! can move their subscribers the same month.

use crate::{
    context::SimContext,
    error::SimResult,
    event::SimEvent,
    experiment::{review, Experiment, ProductChange, ProductExperiment, ReplacementMap, Review},
    market::{Firm, MarketCatalogue, Plan, PlanStatus},
    rng::DrawSource,
    subsystem::MonthPhase,
    types::{FirmId, Month, PlanId},
};

/// Competitor draws allowed when looking for a plan to copy.
pub const MAX_ADDITION_ATTEMPTS: usize = 50;

/// A competitor's plan is too close to one the firm already sells when it
/// shares the footprint and the speeds are within ±40%.
pub fn too_similar(candidate: &Plan, own: &Firm) -> bool {
    own.active_fixed_plans().any(|p| {
        p.footprint == candidate.footprint
            && candidate.capacity * 0.6 < p.capacity
            && p.capacity < candidate.capacity * 1.4
    })
}

/// Withdraw a random active fixed-line plan. One draw is consumed even
/// when there is nothing to withdraw.
pub fn remove_plan(
    firm: &mut Firm,
    replacements: &mut ReplacementMap,
    rng: &mut DrawSource,
) -> Option<PlanId> {
    let choices: Vec<PlanId> = firm.active_fixed_plans().map(|p| p.id).collect();
    let roll = rng.next_f64();
    if choices.is_empty() {
        return None;
    }
    let index = ((roll * choices.len() as f64) as usize).min(choices.len() - 1);
    let withdrawn = choices[index];

    let replacement = firm.replacement_for(withdrawn);
    firm.plan_mut(withdrawn)?.status = PlanStatus::Retired;
    replacements.insert(withdrawn, replacement);
    Some(withdrawn)
}

/// Find a competitor's fixed-line plan worth copying for firm `acting`.
pub fn pick_plan_to_copy(
    market: &MarketCatalogue,
    acting: FirmId,
    rng: &mut DrawSource,
) -> Option<Plan> {
    let own = market.firm(acting)?;
    if !market.firms.iter().any(|f| f.id != acting && f.is_solvent()) {
        return None;
    }

    for _ in 0..MAX_ADDITION_ATTEMPTS {
        let competitor = loop {
            let pick = &market.firms[rng.next_below(market.firms.len())];
            if pick.id != acting && pick.is_solvent() {
                break pick;
            }
        };
        let candidates: Vec<&Plan> = competitor
            .active_fixed_plans()
            .filter(|p| !too_similar(p, own))
            .collect();
        if candidates.is_empty() {
            continue;
        }
        return Some(candidates[rng.next_below(candidates.len())].clone());
    }
    None
}

fn propose(
    market: &mut MarketCatalogue,
    id: FirmId,
    replacements: &mut ReplacementMap,
    rng: &mut DrawSource,
) -> Option<ProductChange> {
    if rng.next_f64() > 0.5 {
        let firm = &mut market.firms[id];
        remove_plan(firm, replacements, rng).map(|plan| ProductChange::Removed { plan })
    } else {
        let template = pick_plan_to_copy(market, id, rng)?;
        let plan = market.firms[id].push_plan(&template);
        Some(ProductChange::Added { plan })
    }
}

pub struct ProductExperimentSubsystem;

impl ProductExperimentSubsystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ProductExperimentSubsystem {
    fn default() -> Self {
        Self::new()
    }
}

impl MonthPhase for ProductExperimentSubsystem {
    fn name(&self) -> &'static str {
        "product_experiment"
    }

    fn run(
        &mut self,
        ctx: &mut SimContext,
        month: Month,
        _events_in: &[SimEvent],
    ) -> SimResult<Vec<SimEvent>> {
        let SimContext { params, market, rng, replacements, .. } = ctx;
        let mut events = Vec::new();

        for id in 0..market.firms.len() {
            if !market.firms[id].is_solvent() {
                continue;
            }

            if let Some(experiment) = market.firms[id].product_experiment.take() {
                let firm = &mut market.firms[id];
                let (kept, experiment) = match review(experiment, firm.profit) {
                    Review::Running(e) => {
                        firm.product_experiment = Some(e);
                        continue;
                    }
                    Review::Kept(e) => (true, e),
                    Review::Failed(e) => {
                        e.roll_back(firm, replacements);
                        (false, e)
                    }
                };
                log::info!(
                    "month={month} product_exp: {} {} {:?}",
                    firm.name,
                    if kept { "kept" } else { "rolled back" },
                    experiment.change,
                );
                events.push(SimEvent::ProductExperimentConcluded {
                    month,
                    firm: id,
                    change: experiment.change,
                    kept,
                });
                continue;
            }

            if market.firms[id].price_experiment.is_some() {
                continue;
            }
            let triggered = rng.chance(params.pr_plan_exp);
            if !triggered || !market.firms[id].offers_fixed() {
                continue;
            }

            let Some(change) = propose(market, id, replacements, rng) else {
                log::debug!("month={month} product_exp: {} found nothing to change", market.firms[id].name);
                continue;
            };
            let firm = &mut market.firms[id];
            firm.product_experiment = Some(ProductExperiment {
                change,
                months_left:     params.len_plan_exp,
                baseline_profit: firm.profit,
            });
            log::debug!("month={month} product_exp: {} started {change:?}", firm.name);
            events.push(SimEvent::ProductExperimentStarted { month, firm: id, change });
        }
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removal_registers_replacement() {
        let mut market = MarketCatalogue::fixture(1_000.0).unwrap();
        let mut replacements = ReplacementMap::default();
        let mut rng = DrawSource::new(4);
        let withdrawn = remove_plan(&mut market.firms[6], &mut replacements, &mut rng).unwrap();

        let firm = &market.firms[6];
        assert!(!firm.plan(withdrawn).unwrap().is_active());
        // SkyMesh has two remote plans; the other one takes the subscribers.
        let other = firm.active_fixed_plans().next().unwrap().id;
        assert_eq!(replacements.resolve(withdrawn), Some(Some(other)));
        assert_eq!(rng.draws(), 1);
    }

    #[test]
    fn removal_without_fixed_plans_still_draws() {
        let mut market = MarketCatalogue::fixture(1_000.0).unwrap();
        let mut replacements = ReplacementMap::default();
        let mut rng = DrawSource::new(4);
        // Vodafone is mobile-only.
        assert!(remove_plan(&mut market.firms[3], &mut replacements, &mut rng).is_none());
        assert_eq!(rng.draws(), 1);
        assert_eq!(replacements, ReplacementMap::default());
    }

    #[test]
    fn copied_plans_are_not_too_similar() {
        let market = MarketCatalogue::fixture(1_000.0).unwrap();
        let mut rng = DrawSource::new(8);
        for _ in 0..50 {
            if let Some(plan) = pick_plan_to_copy(&market, 5, &mut rng) {
                assert_eq!(plan.kind, crate::market::ServiceKind::Fixed);
                assert_ne!(plan.firm, 5);
                assert!(!too_similar(&plan, &market.firms[5]));
            }
        }
    }

    #[test]
    fn no_solvent_competitor_means_no_copy() {
        let mut market = MarketCatalogue::fixture(1_000.0).unwrap();
        for firm in market.firms.iter_mut().filter(|f| f.id != 0) {
            firm.status = crate::market::FirmStatus::Bankrupt;
        }
        let mut rng = DrawSource::new(8);
        assert!(pick_plan_to_copy(&market, 0, &mut rng).is_none());
        assert_eq!(rng.draws(), 0);
    }

    #[test]
    fn rolled_back_addition_is_retired_and_redirected() {
        let mut market = MarketCatalogue::fixture(1_000.0).unwrap();
        let template = market.firms[1].plan(PlanId::new(1, 4)).unwrap().clone();
        let added = market.firms[6].push_plan(&template);
        let experiment = ProductExperiment {
            change:          ProductChange::Added { plan: added },
            months_left:     0,
            baseline_profit: 10.0,
        };
        let mut replacements = ReplacementMap::default();
        experiment.roll_back(&mut market.firms[6], &mut replacements);

        assert!(!market.firms[6].plan(added).unwrap().is_active());
        assert!(replacements.resolve(added).is_some());
    }
}
