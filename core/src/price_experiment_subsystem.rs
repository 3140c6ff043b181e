//! Price experiments: a firm tries a price change on one plan and keeps
//! it only if profit improves by the end of the trial.
//!
//! Per solvent firm, in id order:
//!   - a running experiment is reviewed (counted down, or concluded);
//!   - otherwise, with no experiment of either kind running, one draw
//!     decides whether to start one.

use crate::{
    config::SimParams,
    context::SimContext,
    error::SimResult,
    event::SimEvent,
    experiment::{review, Experiment, PriceExperiment, Review},
    market::{fixed_wholesale_cost, Firm, Plan, ServiceKind},
    rng::DrawSource,
    subsystem::MonthPhase,
    types::Month,
};

/// Lowest price a cut may reach.
///
/// Fixed-line: above both the wholesale tier cost and the next-slower
/// plan in the same footprint. Mobile: above the next-smaller plan, or
/// zero when there is none.
pub fn price_floor(firm: &Firm, plan: &Plan) -> f64 {
    let next_smaller = |same_footprint: bool| {
        firm.active_plans()
            .filter(|p| p.kind == plan.kind && p.id != plan.id && p.capacity < plan.capacity)
            .filter(|p| !same_footprint || p.footprint == plan.footprint)
            .max_by(|a, b| a.capacity.total_cmp(&b.capacity))
            .map(|p| p.price + 1.0)
    };

    match plan.kind {
        ServiceKind::Fixed => {
            let tier = fixed_wholesale_cost(plan.capacity) + 1.0;
            next_smaller(true).map_or(tier, |slower| tier.max(slower))
        }
        ServiceKind::Mobile => next_smaller(false).unwrap_or(0.0),
    }
}

/// Draw a price experiment for `firm`, or `None` when it has no active
/// plan or the cut would breach the floor. Consumes one draw for the plan
/// and one for the direction.
pub fn propose(firm: &Firm, params: &SimParams, rng: &mut DrawSource) -> Option<PriceExperiment> {
    let candidates: Vec<&Plan> = firm.active_plans().collect();
    if candidates.is_empty() {
        return None;
    }
    let plan = candidates[rng.next_below(candidates.len())];
    let cut = rng.next_f64() < 0.5;
    let change = if cut { -params.percent_price_change } else { params.percent_price_change };

    if cut && plan.price * (1.0 + change) < price_floor(firm, plan) {
        return None;
    }
    Some(PriceExperiment {
        plan:            plan.id,
        change,
        months_left:     params.len_price_exp,
        baseline_profit: firm.profit,
    })
}

/// Apply the experiment's price change and put it on the firm.
/// Returns (old, new) price.
pub fn begin(firm: &mut Firm, experiment: PriceExperiment) -> Option<(f64, f64)> {
    let plan = firm.plan_mut(experiment.plan)?;
    let old = plan.price;
    plan.price *= 1.0 + experiment.change;
    let new = plan.price;
    firm.price_experiment = Some(experiment);
    Some((old, new))
}

pub struct PriceExperimentSubsystem;

impl PriceExperimentSubsystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PriceExperimentSubsystem {
    fn default() -> Self {
        Self::new()
    }
}

impl MonthPhase for PriceExperimentSubsystem {
    fn name(&self) -> &'static str {
        "price_experiment"
    }

    fn run(
        &mut self,
        ctx: &mut SimContext,
        month: Month,
        _events_in: &[SimEvent],
    ) -> SimResult<Vec<SimEvent>> {
        let SimContext { params, market, rng, replacements, .. } = ctx;
        let mut events = Vec::new();

        for firm in market.firms.iter_mut().filter(|f| f.is_solvent()) {
            if let Some(experiment) = firm.price_experiment.take() {
                let (kept, experiment) = match review(experiment, firm.profit) {
                    Review::Running(e) => {
                        firm.price_experiment = Some(e);
                        continue;
                    }
                    Review::Kept(e) => (true, e),
                    Review::Failed(e) => {
                        e.roll_back(firm, replacements);
                        (false, e)
                    }
                };
                let price = firm.plan(experiment.plan).map(|p| p.price).unwrap_or(0.0);
                log::info!(
                    "month={month} price_exp: {} {} {:+.0}% on {:?}, price now ${price:.2}",
                    firm.name,
                    if kept { "kept" } else { "reverted" },
                    experiment.change * 100.0,
                    experiment.plan,
                );
                events.push(SimEvent::PriceExperimentConcluded {
                    month,
                    firm: firm.id,
                    plan: experiment.plan,
                    kept,
                    price,
                });
                continue;
            }

            if firm.product_experiment.is_some() || !rng.chance(params.pr_price_exp) {
                continue;
            }
            let Some(experiment) = propose(firm, params, rng) else {
                log::debug!("month={month} price_exp: {} found no plan to try", firm.name);
                continue;
            };
            let plan = experiment.plan;
            if let Some((old_price, new_price)) = begin(firm, experiment) {
                log::debug!(
                    "month={month} price_exp: {} trying ${old_price:.2} -> ${new_price:.2} on {plan:?}",
                    firm.name
                );
                events.push(SimEvent::PriceExperimentStarted {
                    month,
                    firm: firm.id,
                    plan,
                    old_price,
                    new_price,
                });
            }
        }
        Ok(events)
    }
}
