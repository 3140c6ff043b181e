//! Run configuration: the flat parameter surface and the market-profile
//! selector.

use crate::error::{SimError, SimResult};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Every named numeric parameter of a run. No nesting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimParams {
    // ── Firm economics ─────────────────────────────
    /// Retail markup (%) of the incumbents over wholesale.
    pub large_markup: f64,
    /// Retail markup (%) of every other firm.
    pub small_markup: f64,
    /// Fixed monthly cost per served quadrant, per service line.
    pub reseller_operating_fee: f64,
    /// Fixed monthly cost per served mobile quadrant for wholesalers.
    pub wholesaler_operating_fee: f64,
    /// Share of profit (or savings, when loss-making) spent on marketing.
    pub marketing_budget: f64,
    pub initial_money_pool: f64,

    // ── Experiments ────────────────────────────────
    pub pr_price_exp: f64,
    pub len_price_exp: u32,
    pub percent_price_change: f64,
    pub pr_plan_exp: f64,
    pub len_plan_exp: u32,

    // ── Households ─────────────────────────────────
    /// Target number of reassessments per month, real problems included.
    pub num_dissatisfied: usize,
    pub switching_cost_increase: f64,
    /// Number of operators a household has time to look at.
    pub time_budget: usize,
    /// Affordability ceiling as a price-to-income fraction.
    pub income_budget: f64,
    pub pr_sacrifice_wifi: f64,
    pub pr_pick_better_value: f64,

    // ── Run ────────────────────────────────────────
    pub seed: u64,
    pub months: u64,
    pub grid_side: usize,
    pub report_interval: u64,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            large_markup:             130.0,
            small_markup:             110.0,
            reseller_operating_fee:   200.0,
            wholesaler_operating_fee: 1_000.0,
            marketing_budget:         0.1,
            initial_money_pool:       10_000.0,
            pr_price_exp:             0.1,
            len_price_exp:            3,
            percent_price_change:     0.1,
            pr_plan_exp:              0.05,
            len_plan_exp:             6,
            num_dissatisfied:         100,
            switching_cost_increase:  0.1,
            time_budget:              3,
            income_budget:            0.1,
            pr_sacrifice_wifi:        0.3,
            pr_pick_better_value:     0.5,
            seed:                     42,
            months:                   120,
            grid_side:                100,
            report_interval:          25,
        }
    }
}

impl SimParams {
    /// Load parameters from a JSON file. Missing fields use defaults.
    pub fn load(path: &str) -> SimResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let params: SimParams = serde_json::from_str(&content)?;
        params.validate()?;
        Ok(params)
    }

    /// A small grid and short horizon for tests.
    pub fn default_test() -> Self {
        Self {
            grid_side:        40,
            months:           24,
            num_dissatisfied: 40,
            report_interval:  6,
            ..Self::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn validate(&self) -> SimResult<()> {
        let probabilities = [
            ("pr_price_exp",         self.pr_price_exp),
            ("pr_plan_exp",          self.pr_plan_exp),
            ("pr_sacrifice_wifi",    self.pr_sacrifice_wifi),
            ("pr_pick_better_value", self.pr_pick_better_value),
            ("marketing_budget",     self.marketing_budget),
        ];
        for (name, p) in probabilities {
            if !(0.0..=1.0).contains(&p) {
                return Err(SimError::InvalidParam {
                    name,
                    reason: format!("{p} is outside [0, 1]"),
                });
            }
        }
        if !(self.percent_price_change > 0.0 && self.percent_price_change < 1.0) {
            return Err(SimError::InvalidParam {
                name:   "percent_price_change",
                reason: format!("{} must be in (0, 1)", self.percent_price_change),
            });
        }
        if self.income_budget <= 0.0 {
            return Err(SimError::InvalidParam {
                name:   "income_budget",
                reason: format!("{} must be positive", self.income_budget),
            });
        }
        for (name, markup) in [("large_markup", self.large_markup), ("small_markup", self.small_markup)] {
            if markup <= 100.0 {
                return Err(SimError::InvalidParam {
                    name,
                    reason: format!("{markup}% would sell below wholesale"),
                });
            }
        }
        if self.grid_side == 0 {
            return Err(SimError::InvalidParam {
                name:   "grid_side",
                reason: "grid must have at least one cell".into(),
            });
        }
        if self.report_interval == 0 {
            return Err(SimError::InvalidParam {
                name:   "report_interval",
                reason: "must be at least one month".into(),
            });
        }
        Ok(())
    }
}

/// Which initial market to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketProfile {
    /// Highly competitive, equal-access market.
    Idealistic,
    /// Low-competition market before the national network.
    PreNbn,
    /// Plans on the market at the time the data was collected.
    Realistic,
    /// The realistic market with near-duplicate plans collapsed.
    Simplified,
}

impl MarketProfile {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idealistic => "idealistic",
            Self::PreNbn     => "pre_nbn",
            Self::Realistic  => "realistic",
            Self::Simplified => "simplified",
        }
    }
}

impl fmt::Display for MarketProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MarketProfile {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "idealistic" | "high_competition"                  => Ok(Self::Idealistic),
            "pre_nbn" | "low_competition"                      => Ok(Self::PreNbn),
            "realistic" | "super_realistic"                    => Ok(Self::Realistic),
            "simplified" | "simplified_realistic"              => Ok(Self::Simplified),
            other => Err(SimError::UnknownMarketProfile(other.to_string())),
        }
    }
}
