//! Reversible firm experiments.
//!
//! A firm is in one of three states: no experiment, a price experiment, or
//! a product experiment. Both kinds share one contract:
//!   - started with a countdown and the firm's profit at that moment,
//!   - counted down once per month,
//!   - reviewed at expiry: kept when profit improved on the baseline,
//!     rolled back otherwise,
//!   - then cleared.

use crate::{
    market::{Firm, PlanStatus},
    types::PlanId,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Common interface for both experiment kinds.
pub trait Experiment {
    fn months_left(&self) -> u32;

    fn count_down(&mut self);

    /// Firm profit captured when the experiment started.
    fn baseline_profit(&self) -> f64;

    /// Undo the experiment's change on `firm`. Any plan this retires is
    /// registered in `replacements`.
    fn roll_back(&self, firm: &mut Firm, replacements: &mut ReplacementMap);
}

/// Result of one monthly review.
#[derive(Debug, Clone, PartialEq)]
pub enum Review<E> {
    /// Still running; put it back on the firm.
    Running(E),
    /// Expired with improved profit; the change stays.
    Kept(E),
    /// Expired without improvement; the caller must roll back.
    Failed(E),
}

/// Advance an experiment by one month against the firm's current profit.
pub fn review<E: Experiment>(mut experiment: E, current_profit: f64) -> Review<E> {
    if experiment.months_left() > 0 {
        experiment.count_down();
        return Review::Running(experiment);
    }
    if current_profit <= experiment.baseline_profit() {
        Review::Failed(experiment)
    } else {
        Review::Kept(experiment)
    }
}

// ── Price experiment ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceExperiment {
    pub plan:            PlanId,
    /// Signed fraction applied multiplicatively: new = old × (1 + change).
    pub change:          f64,
    pub months_left:     u32,
    pub baseline_profit: f64,
}

impl Experiment for PriceExperiment {
    fn months_left(&self) -> u32 { self.months_left }

    fn count_down(&mut self) { self.months_left = self.months_left.saturating_sub(1); }

    fn baseline_profit(&self) -> f64 { self.baseline_profit }

    fn roll_back(&self, firm: &mut Firm, _replacements: &mut ReplacementMap) {
        if let Some(plan) = firm.plan_mut(self.plan) {
            plan.price /= 1.0 + self.change;
        }
    }
}

// ── Product experiment ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProductChange {
    /// A fixed-line plan was withdrawn (tombstoned).
    Removed { plan: PlanId },
    /// A competitor's fixed-line plan was copied onto the roster.
    Added { plan: PlanId },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductExperiment {
    pub change:          ProductChange,
    pub months_left:     u32,
    pub baseline_profit: f64,
}

impl Experiment for ProductExperiment {
    fn months_left(&self) -> u32 { self.months_left }

    fn count_down(&mut self) { self.months_left = self.months_left.saturating_sub(1); }

    fn baseline_profit(&self) -> f64 { self.baseline_profit }

    fn roll_back(&self, firm: &mut Firm, replacements: &mut ReplacementMap) {
        match self.change {
            ProductChange::Removed { plan } => {
                if let Some(p) = firm.plan_mut(plan) {
                    p.status = PlanStatus::Active;
                }
            }
            ProductChange::Added { plan } => {
                let replacement = firm.replacement_for(plan);
                if let Some(p) = firm.plan_mut(plan) {
                    p.status = PlanStatus::Retired;
                }
                replacements.insert(plan, replacement);
            }
        }
    }
}

// ── Replacement lookup ──────────────────────────────────────────────────

/// Plans retired this month → where their subscribers go (`None` drops
/// the fixed-line leg). Keyed by stable plan id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplacementMap {
    entries: BTreeMap<PlanId, Option<PlanId>>,
}

impl ReplacementMap {
    pub fn insert(&mut self, retired: PlanId, replacement: Option<PlanId>) {
        self.entries.insert(retired, replacement);
    }

    /// `None` when `retired` was not withdrawn this month.
    pub fn resolve(&self, retired: PlanId) -> Option<Option<PlanId>> {
        self.entries.get(&retired).copied()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn experiment(months_left: u32, baseline: f64) -> PriceExperiment {
        PriceExperiment {
            plan: PlanId::new(0, 0),
            change: -0.1,
            months_left,
            baseline_profit: baseline,
        }
    }

    #[test]
    fn review_counts_down_before_expiry() {
        match review(experiment(2, 10.0), 0.0) {
            Review::Running(e) => assert_eq!(e.months_left, 1),
            other => panic!("expected running, got {other:?}"),
        }
    }

    #[test]
    fn review_at_expiry_compares_profit() {
        assert!(matches!(review(experiment(0, 10.0), 10.0), Review::Failed(_)));
        assert!(matches!(review(experiment(0, 10.0), 9.0), Review::Failed(_)));
        assert!(matches!(review(experiment(0, 10.0), 10.5), Review::Kept(_)));
    }

    #[test]
    fn replacement_map_distinguishes_unknown_from_dropped() {
        let mut map = ReplacementMap::default();
        map.insert(PlanId::new(1, 2), None);
        assert_eq!(map.resolve(PlanId::new(1, 2)), Some(None));
        assert_eq!(map.resolve(PlanId::new(1, 3)), None);
    }
}
