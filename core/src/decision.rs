//! Household bundle choice.
//!
//! Two entry points: [`assemble_bundles`] turns the operators a household
//! looks at into candidate bundles, and [`select_bundle`] runs the decision
//! tree over them, complete bundles first, then mobile-only, then
//! fixed-only.

use crate::{
    config::SimParams,
    consideration::pick_operators,
    evaluation::{evaluate, new_beats_current, Baseline, Candidate},
    household::{Bundle, Household},
    market::MarketCatalogue,
    rng::DrawSource,
    types::Quadrant,
};

/// At or above this share of income the household only moves to
/// something strictly cheaper.
pub const HIGH_SPEND_SHARE: f64 = 0.05;
/// At or below this share of income a better-value option may win outright.
pub const LOW_SPEND_SHARE: f64 = 0.02;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateSet {
    pub complete: Vec<Candidate>,
    pub mobile:   Vec<Candidate>,
    pub fixed:    Vec<Candidate>,
}

/// Which decision-tree pass is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Complete,
    MobileOnly,
    FixedOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    /// Index into the stage's candidate list.
    Chosen(usize),
    KeepCurrent,
    Infeasible,
}

/// Sample operators for `quadrant` and build every candidate bundle from
/// their active plans available there.
pub fn assemble_bundles(
    market: &MarketCatalogue,
    quadrant: Quadrant,
    params: &SimParams,
    rng: &mut DrawSource,
) -> CandidateSet {
    let offers = pick_operators(market, quadrant, params.time_budget, params.marketing_budget, rng);

    let local_plans = |firms: &[usize], mobile: bool| {
        firms
            .iter()
            .filter_map(|id| market.firm(*id))
            .flat_map(|firm| firm.active_plans())
            .filter(|plan| plan.is_mobile() == mobile && plan.available_in(quadrant))
            .map(|plan| plan.id)
            .collect::<Vec<_>>()
    };
    let mobile_plans = local_plans(&offers.mobile, true);
    let fixed_plans = local_plans(&offers.fixed, false);

    let complete = mobile_plans
        .iter()
        .flat_map(|m| fixed_plans.iter().map(move |f| Candidate::Complete { mobile: *m, fixed: *f }))
        .collect();

    CandidateSet {
        complete,
        mobile: mobile_plans.into_iter().map(Candidate::Mobile).collect(),
        fixed:  fixed_plans.into_iter().map(Candidate::Fixed).collect(),
    }
}

fn baseline_for(
    current: &Bundle,
    stage: Stage,
    market: &MarketCatalogue,
    initial_call: bool,
) -> Baseline {
    if initial_call {
        return Baseline::Placeholder;
    }
    let comparable = match stage {
        Stage::Complete   => current.mobile.is_some() && current.fixed.is_some(),
        Stage::MobileOnly => current.mobile.is_some(),
        Stage::FixedOnly  => current.fixed.is_some(),
    };
    if !comparable {
        return Baseline::Placeholder;
    }
    match Candidate::from_bundle(current) {
        Some(candidate) => match evaluate(&[candidate], market).first() {
            Some(eval) => Baseline::Current(*eval),
            None => Baseline::Placeholder,
        },
        None => Baseline::Placeholder,
    }
}

/// One pass of the decision tree over a single candidate list.
///
/// Candidates are visited in order and each accepted one becomes the new
/// baseline. Affordability (`price / income < income_budget`) gates every
/// candidate.
#[allow(clippy::too_many_arguments)]
pub fn decision_tree(
    current: &Bundle,
    income: f64,
    stage: Stage,
    candidates: &[Candidate],
    market: &MarketCatalogue,
    params: &SimParams,
    rng: &mut DrawSource,
    initial_call: bool,
) -> StageOutcome {
    if income <= 0.0 {
        return StageOutcome::Infeasible;
    }

    let evaluations = evaluate(candidates, market);
    let mut baseline = baseline_for(current, stage, market, initial_call);
    let started_from_placeholder = baseline.is_placeholder();
    let mut chosen = None;

    for (i, eval) in evaluations.iter().enumerate() {
        let share = eval.price / income;
        if share >= params.income_budget {
            continue;
        }

        let accept = if baseline.price() / income >= HIGH_SPEND_SHARE {
            eval.price < baseline.price()
        } else if share >= HIGH_SPEND_SHARE {
            false
        } else if share <= LOW_SPEND_SHARE && eval.value > baseline.value() {
            rng.next_f64() < params.pr_pick_better_value
                || new_beats_current(eval, &baseline, params.pr_sacrifice_wifi, rng)
        } else {
            new_beats_current(eval, &baseline, params.pr_sacrifice_wifi, rng)
        };

        if accept {
            baseline = Baseline::Current(*eval);
            chosen = Some(i);
        }
    }

    match chosen {
        Some(i) => StageOutcome::Chosen(i),
        None if started_from_placeholder => StageOutcome::Infeasible,
        None if baseline.price() / income >= params.income_budget => StageOutcome::Infeasible,
        None => StageOutcome::KeepCurrent,
    }
}

/// Run the three stages in precedence order and return the household's
/// new bundle. Disconnected when no stage yields a decision.
pub fn select_bundle(
    household: &Household,
    candidates: &CandidateSet,
    market: &MarketCatalogue,
    params: &SimParams,
    rng: &mut DrawSource,
    initial_call: bool,
) -> Bundle {
    let stages = [
        (Stage::Complete, &candidates.complete),
        (Stage::MobileOnly, &candidates.mobile),
        (Stage::FixedOnly, &candidates.fixed),
    ];
    for (stage, list) in stages {
        if list.is_empty() {
            continue;
        }
        let outcome = decision_tree(
            &household.bundle,
            household.income,
            stage,
            list,
            market,
            params,
            rng,
            initial_call,
        );
        match outcome {
            StageOutcome::Chosen(i) => return list[i].bundle(),
            StageOutcome::KeepCurrent => return household.bundle,
            StageOutcome::Infeasible => {}
        }
    }
    Bundle::disconnected()
}

/// Assemble candidates for the household's quadrant and choose among them.
pub fn decide(
    household: &Household,
    market: &MarketCatalogue,
    params: &SimParams,
    rng: &mut DrawSource,
    initial_call: bool,
) -> Bundle {
    let candidates = assemble_bundles(market, household.quadrant, params, rng);
    select_bundle(household, &candidates, market, params, rng, initial_call)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PlanId;

    fn household(income: f64) -> Household {
        Household::new(0, 0, Quadrant::Urban, income)
    }

    #[test]
    fn cheapest_of_equal_quality_is_chosen() {
        // Telstra 80GB + 50Mbps = 150, TPG 100GB + 50Mbps = 120. Both clear
        // the quality bar on each leg.
        let market = MarketCatalogue::fixture(1_000.0).unwrap();
        let params = SimParams::default_test();
        let mut rng = DrawSource::new(9);
        let dear = Candidate::Complete { mobile: PlanId::new(0, 1), fixed: PlanId::new(0, 4) };
        let cheap = Candidate::Complete { mobile: PlanId::new(1, 1), fixed: PlanId::new(1, 3) };
        let set = CandidateSet { complete: vec![dear, cheap], ..Default::default() };

        let chosen = select_bundle(&household(3_000.0), &set, &market, &params, &mut rng, true);
        assert_eq!(chosen, cheap.bundle());
    }

    #[test]
    fn nothing_affordable_disconnects() {
        let market = MarketCatalogue::fixture(1_000.0).unwrap();
        let params = SimParams::default_test();
        let mut rng = DrawSource::new(9);
        let set = CandidateSet {
            complete: vec![Candidate::Complete { mobile: PlanId::new(0, 0), fixed: PlanId::new(0, 3) }],
            mobile:   vec![Candidate::Mobile(PlanId::new(0, 0))],
            fixed:    vec![Candidate::Fixed(PlanId::new(0, 3))],
        };
        // Every option is at least 10% of a $400 income.
        let chosen = select_bundle(&household(400.0), &set, &market, &params, &mut rng, true);
        assert_eq!(chosen, Bundle::disconnected());
    }

    #[test]
    fn empty_candidate_set_consumes_no_draws() {
        let market = MarketCatalogue::fixture(1_000.0).unwrap();
        let params = SimParams::default_test();
        let mut rng = DrawSource::new(9);
        let chosen = select_bundle(&household(3_000.0), &CandidateSet::default(), &market, &params, &mut rng, true);
        assert_eq!(chosen, Bundle::disconnected());
        assert_eq!(rng.draws(), 0);
    }

    #[test]
    fn complete_bundle_takes_precedence() {
        let market = MarketCatalogue::fixture(1_000.0).unwrap();
        let params = SimParams::default_test();
        let mut rng = DrawSource::new(3);
        let set = CandidateSet {
            complete: vec![Candidate::Complete { mobile: PlanId::new(0, 0), fixed: PlanId::new(0, 3) }],
            mobile:   vec![Candidate::Mobile(PlanId::new(5, 0))],
            fixed:    vec![Candidate::Fixed(PlanId::new(1, 2))],
        };
        let chosen = select_bundle(&household(5_000.0), &set, &market, &params, &mut rng, true);
        assert!(chosen.mobile.is_some() && chosen.fixed.is_some());
    }

    #[test]
    fn falls_back_to_single_service_when_bundles_unaffordable() {
        let market = MarketCatalogue::fixture(1_000.0).unwrap();
        let params = SimParams::default_test();
        let mut rng = DrawSource::new(3);
        // $120 bundle is over 10% of $1000; the $15 Kogan mobile plan is not.
        let set = CandidateSet {
            complete: vec![Candidate::Complete { mobile: PlanId::new(0, 0), fixed: PlanId::new(0, 3) }],
            mobile:   vec![Candidate::Mobile(PlanId::new(5, 0))],
            fixed:    vec![],
        };
        let chosen = select_bundle(&household(1_000.0), &set, &market, &params, &mut rng, true);
        assert_eq!(chosen, Bundle::mobile_only(PlanId::new(5, 0)));
    }

    #[test]
    fn keeps_current_when_nothing_beats_it() {
        let market = MarketCatalogue::fixture(1_000.0).unwrap();
        let params = SimParams::default_test();
        let mut rng = DrawSource::new(3);
        let mut hh = household(2_000.0);
        hh.bundle = Bundle::complete(PlanId::new(5, 0), PlanId::new(1, 2));
        // A $120 candidate is 6% of income against a $65 baseline.
        let set = CandidateSet {
            complete: vec![Candidate::Complete { mobile: PlanId::new(0, 0), fixed: PlanId::new(0, 3) }],
            ..Default::default()
        };
        let chosen = select_bundle(&hh, &set, &market, &params, &mut rng, false);
        assert_eq!(chosen, hh.bundle);
    }

    #[test]
    fn assembled_plans_are_active_and_local() {
        let market = MarketCatalogue::fixture(1_000.0).unwrap();
        let params = SimParams::default_test();
        let mut rng = DrawSource::new(21);
        for q in Quadrant::ALL {
            let set = assemble_bundles(&market, q, &params, &mut rng);
            for candidate in set.mobile.iter().chain(&set.fixed) {
                let bundle = candidate.bundle();
                for id in [bundle.mobile, bundle.fixed].into_iter().flatten() {
                    let plan = market.plan(id).unwrap();
                    assert!(plan.is_active());
                    assert!(plan.available_in(q));
                }
            }
            assert_eq!(set.complete.len(), set.mobile.len() * set.fixed.len());
        }
    }

    #[test]
    fn chosen_bundle_is_always_affordable() {
        let market = MarketCatalogue::fixture(1_000.0).unwrap();
        let params = SimParams::default_test();
        let mut rng = DrawSource::new(77);
        for income in [400.0, 900.0, 1_500.0, 3_000.0, 8_000.0] {
            for q in Quadrant::ALL {
                let hh = Household::new(0, 0, q, income);
                let bundle = decide(&hh, &market, &params, &mut rng, true);
                if let Some(price) = bundle.price(&market) {
                    assert!(price / income < params.income_budget, "{price} on {income}");
                }
            }
        }
    }
}
