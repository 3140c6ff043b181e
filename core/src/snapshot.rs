//! Snapshot serialization: firm and household state to/from JSON.
//!
//! A snapshot is taken every SNAPSHOT_INTERVAL months and when a run
//! finishes. Reporting reads final state from here.

use crate::{
    context::SimContext,
    household::Household,
    market::Firm,
    types::{Month, RunId},
};
use serde::{Deserialize, Serialize};

pub const SNAPSHOT_INTERVAL: Month = 12; // yearly

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimSnapshot {
    pub run_id:     RunId,
    pub month:      Month,
    pub draws:      u64,
    pub firms:      Vec<Firm>,
    pub households: Vec<Household>,
}

impl SimSnapshot {
    pub fn capture(run_id: &str, month: Month, ctx: &SimContext) -> Self {
        Self {
            run_id:     run_id.to_string(),
            month,
            draws:      ctx.rng.draws(),
            firms:      ctx.market.firms.clone(),
            households: ctx.grid.households().cloned().collect(),
        }
    }
}
