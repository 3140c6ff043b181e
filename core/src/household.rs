use crate::{
    market::MarketCatalogue,
    types::{PlanId, Quadrant},
};
use serde::{Deserialize, Serialize};

/// A (mobile, fixed-line) subscription pair. Both absent means
/// disconnected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bundle {
    pub mobile: Option<PlanId>,
    pub fixed:  Option<PlanId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BundleKind {
    Complete,
    MobileOnly,
    FixedOnly,
    Disconnected,
}

impl Bundle {
    pub fn disconnected() -> Self {
        Self::default()
    }

    pub fn complete(mobile: PlanId, fixed: PlanId) -> Self {
        Self { mobile: Some(mobile), fixed: Some(fixed) }
    }

    pub fn mobile_only(mobile: PlanId) -> Self {
        Self { mobile: Some(mobile), fixed: None }
    }

    pub fn fixed_only(fixed: PlanId) -> Self {
        Self { mobile: None, fixed: Some(fixed) }
    }

    pub fn kind(&self) -> BundleKind {
        match (self.mobile, self.fixed) {
            (Some(_), Some(_)) => BundleKind::Complete,
            (Some(_), None)    => BundleKind::MobileOnly,
            (None, Some(_))    => BundleKind::FixedOnly,
            (None, None)       => BundleKind::Disconnected,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.kind() != BundleKind::Disconnected
    }

    /// Current monthly price of every held leg. `None` when disconnected.
    pub fn price(&self, market: &MarketCatalogue) -> Option<f64> {
        if !self.is_connected() {
            return None;
        }
        let leg = |id: Option<PlanId>| {
            id.and_then(|id| market.plan(id)).map(|p| p.price).unwrap_or(0.0)
        };
        Some(leg(self.mobile) + leg(self.fixed))
    }
}

/// Percentage of `income` spent on `bundle`. `None` when disconnected or
/// when income is not positive.
pub fn expenditure_pct(bundle: &Bundle, income: f64, market: &MarketCatalogue) -> Option<f64> {
    if income <= 0.0 {
        return None;
    }
    bundle.price(market).map(|price| price / income * 100.0)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Household {
    pub row:             usize,
    pub col:             usize,
    pub quadrant:        Quadrant,
    /// Monthly income ($).
    pub income:          f64,
    pub bundle:          Bundle,
    pub expenditure_pct: Option<f64>,
    /// Reluctance to re-evaluate. Accrues while the household sits still
    /// and resets to 0 after it re-decides. Capped at 1.0, which is
    /// absorbing: a household there is never moved by the contemplation
    /// gate and only re-decides when it has a real problem.
    pub switching_cost:  f64,
    /// Re-ran the decision engine last month.
    pub switched:        bool,
}

impl Household {
    pub fn new(row: usize, col: usize, quadrant: Quadrant, income: f64) -> Self {
        Self {
            row,
            col,
            quadrant,
            income,
            bundle: Bundle::disconnected(),
            expenditure_pct: None,
            switching_cost: 0.0,
            switched: false,
        }
    }

    pub fn refresh_expenditure(&mut self, market: &MarketCatalogue) {
        self.expenditure_pct = expenditure_pct(&self.bundle, self.income, market);
    }

    /// Disconnected, or paying at or above the affordability ceiling.
    pub fn has_real_problem(&self, market: &MarketCatalogue, income_budget: f64) -> bool {
        if self.income <= 0.0 {
            return true;
        }
        match self.bundle.price(market) {
            None => true,
            Some(price) => price / self.income >= income_budget,
        }
    }

    /// Apply the month's switching-cost bookkeeping and clear the flag.
    pub fn update_switching_cost(&mut self, increase: f64) {
        if self.switched {
            self.switching_cost = 0.0;
        } else if self.switching_cost < 1.0 {
            self.switching_cost = (self.switching_cost + increase).min(1.0);
        }
        self.switched = false;
    }
}
