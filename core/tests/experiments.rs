//! Price and product experiments: review, keep, roll back.

use isp_market_core::{
    config::SimParams,
    engine::SimEngine,
    experiment::{PriceExperiment, ProductChange, ProductExperiment},
    market::MarketCatalogue,
    price_experiment_subsystem::{begin, PriceExperimentSubsystem},
    product_experiment_subsystem::ProductExperimentSubsystem,
    subsystem::MonthPhase,
    types::PlanId,
};

fn engine_with_price_trial(baseline_profit: f64) -> (SimEngine, PlanId) {
    let mut engine = SimEngine::build_test("exp-price".into(), 3).unwrap();
    let plan = PlanId::new(0, 0);
    let firm = &mut engine.ctx.market.firms[0];
    firm.plan_mut(plan).unwrap().price = 50.0;
    begin(
        firm,
        PriceExperiment { plan, change: -0.1, months_left: 3, baseline_profit },
    )
    .unwrap();
    (engine, plan)
}

#[test]
fn failed_price_cut_is_reverted_exactly() {
    let (mut engine, plan) = engine_with_price_trial(f64::MAX);
    assert!((engine.ctx.market.plan(plan).unwrap().price - 45.0).abs() < 1e-9);

    let mut phase = PriceExperimentSubsystem::new();
    for month in 1..=3 {
        phase.run(&mut engine.ctx, month, &[]).unwrap();
        assert!(engine.ctx.market.firms[0].price_experiment.is_some());
    }
    phase.run(&mut engine.ctx, 4, &[]).unwrap();

    assert!(engine.ctx.market.firms[0].price_experiment.is_none());
    assert!((engine.ctx.market.plan(plan).unwrap().price - 50.0).abs() < 1e-9);
}

#[test]
fn successful_price_cut_is_kept() {
    let (mut engine, plan) = engine_with_price_trial(f64::MIN);
    let mut phase = PriceExperimentSubsystem::new();
    for month in 1..=4 {
        phase.run(&mut engine.ctx, month, &[]).unwrap();
    }
    assert!(engine.ctx.market.firms[0].price_experiment.is_none());
    assert!((engine.ctx.market.plan(plan).unwrap().price - 45.0).abs() < 1e-9);
}

#[test]
fn failed_removal_reinstates_the_plan() {
    let mut engine = SimEngine::build_test("exp-removal".into(), 4).unwrap();
    let plan = PlanId::new(0, 4);
    let firm = &mut engine.ctx.market.firms[0];
    firm.plan_mut(plan).unwrap().status = isp_market_core::market::PlanStatus::Retired;
    firm.product_experiment = Some(ProductExperiment {
        change:          ProductChange::Removed { plan },
        months_left:     0,
        baseline_profit: f64::MAX,
    });

    ProductExperimentSubsystem::new().run(&mut engine.ctx, 1, &[]).unwrap();
    assert!(engine.ctx.market.plan(plan).unwrap().is_active());
    assert!(engine.ctx.market.firms[0].product_experiment.is_none());
}

#[test]
fn firms_never_run_two_experiments_at_once() {
    let params = SimParams {
        pr_price_exp: 0.6,
        pr_plan_exp:  0.6,
        months:       24,
        ..SimParams::default_test()
    }
    .with_seed(21);
    let market = MarketCatalogue::fixture(params.initial_money_pool).unwrap();
    let mut engine = SimEngine::build("exp-exclusive".into(), params, market).unwrap();

    let mut started = 0;
    while !engine.is_finished() {
        let events = engine.step().unwrap();
        started += events
            .iter()
            .filter(|e| e.type_name().ends_with("experiment_started"))
            .count();
        for firm in &engine.ctx.market.firms {
            assert!(
                !(firm.price_experiment.is_some() && firm.product_experiment.is_some()),
                "{} runs both experiment kinds",
                firm.name
            );
        }
    }
    assert!(started > 0);
}

#[test]
fn nobody_holds_a_retired_plan_after_reassessment() {
    let params = SimParams { pr_plan_exp: 0.8, ..SimParams::default_test() }.with_seed(33);
    let market = MarketCatalogue::fixture(params.initial_money_pool).unwrap();
    let mut engine = SimEngine::build("exp-retired".into(), params, market).unwrap();

    while !engine.is_finished() {
        engine.step().unwrap();
        for h in engine.ctx.grid.households() {
            if let Some(id) = h.bundle.fixed {
                assert!(engine.ctx.market.plan(id).unwrap().is_active(), "{id:?} is retired");
            }
        }
    }
}
