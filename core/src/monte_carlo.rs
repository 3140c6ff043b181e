//! Multi-run driver: one independent simulation per seed, in parallel.
//!
//! Each run builds its own context and draw source from a clone of the
//! parameters and catalogue; nothing mutable is shared between runs. A
//! run that errors or panics is logged with its seed and dropped.

use crate::{
    config::SimParams,
    engine::SimEngine,
    error::SimResult,
    market::{Firm, MarketCatalogue},
    metrics::MarketReport,
};
use rayon::prelude::*;
use std::panic::{catch_unwind, AssertUnwindSafe};

#[derive(Debug, Clone)]
pub struct RunOutput {
    pub seed:        u64,
    pub reports:     Vec<MarketReport>,
    pub final_firms: Vec<Firm>,
}

/// Run one seed to completion without persistence.
pub fn run_one(params: &SimParams, catalogue: &MarketCatalogue, seed: u64) -> SimResult<RunOutput> {
    let params = params.clone().with_seed(seed);
    let mut engine = SimEngine::build(format!("mc-{seed}"), params, catalogue.clone())?;
    engine.run()?;
    let (ctx, reports) = engine.into_parts();
    Ok(RunOutput {
        seed,
        reports,
        final_firms: ctx.market.firms,
    })
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Run every seed in parallel. Survivors come back in seed order.
pub fn run_many(params: &SimParams, catalogue: &MarketCatalogue, seeds: &[u64]) -> Vec<RunOutput> {
    let outcomes: Vec<Option<RunOutput>> = seeds
        .par_iter()
        .map(|&seed| {
            match catch_unwind(AssertUnwindSafe(|| run_one(params, catalogue, seed))) {
                Ok(Ok(output)) => Some(output),
                Ok(Err(e)) => {
                    log::warn!("monte_carlo: discarding run seed={seed}: {e} (params: {params:?})");
                    None
                }
                Err(payload) => {
                    log::warn!(
                        "monte_carlo: discarding run seed={seed}: panicked: {} (params: {params:?})",
                        panic_message(payload.as_ref())
                    );
                    None
                }
            }
        })
        .collect();

    let survivors: Vec<RunOutput> = outcomes.into_iter().flatten().collect();
    log::info!("monte_carlo: {} of {} runs completed", survivors.len(), seeds.len());
    survivors
}

#[cfg(test)]
mod tests {
    use super::*;

    fn short_params() -> SimParams {
        SimParams {
            grid_side: 16,
            months: 4,
            report_interval: 2,
            num_dissatisfied: 10,
            ..SimParams::default_test()
        }
    }

    #[test]
    fn panic_messages_are_recovered() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
    }

    #[test]
    fn single_run_reports_every_interval() {
        let params = short_params();
        let output = run_one(&params, &MarketCatalogue::fixture(params.initial_money_pool).unwrap(), 3).unwrap();
        let months: Vec<u64> = output.reports.iter().map(|r| r.month).collect();
        assert_eq!(months, vec![0, 2, 4]);
        assert_eq!(output.final_firms.len(), 7);
    }
}
