//! Market-level reporting: concentration, prices and household outcomes.
//!
//! Every average here is `None` when the population it averages over is
//! empty, never NaN.

use crate::{
    context::SimContext,
    grid::income_quartile,
    household::{BundleKind, Household},
    market::{plan::MIN_QUALITY_MOBILE_GB, FirmStatus, MarketCatalogue, ServiceKind},
    types::{FirmId, Month, Quadrant},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketReport {
    pub month:                     Month,
    pub hhi_mobile:                Option<f64>,
    pub hhi_fixed:                 Option<f64>,
    pub mean_price_per_gb:         Option<f64>,
    pub complete:                  usize,
    pub mobile_only:               usize,
    pub fixed_only:                usize,
    pub disconnected:              usize,
    pub mean_switching_cost:       Option<f64>,
    pub real_problems:             usize,
    pub network_wholesale_revenue: f64,
    pub solvent_firms:             usize,
    /// Indexed by `Quadrant::index`.
    pub by_quadrant:               [SpendBands; 4],
    /// Indexed by income quartile, see `grid::income_quartile`.
    pub by_income_quartile:        [SpendBands; 4],
    /// Cheapest good-enough complete bundle on offer in each quadrant.
    pub min_good_bundle_price:     [Option<f64>; 4],
}

/// Fixed-line speed (Mbps) a bundle needs to count towards
/// `min_good_bundle_price`.
pub const GOOD_BUNDLE_FIXED_MBPS: f64 = 50.0;

/// Households in one group, by the share of income a complete bundle takes.
/// Partial and disconnected households are counted on their own.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpendBands {
    pub under_2:      usize,
    pub under_5:      usize,
    pub under_10:     usize,
    pub at_least_10:  usize,
    pub partial:      usize,
    pub disconnected: usize,
}

impl SpendBands {
    pub fn record(&mut self, household: &Household) {
        match household.bundle.kind() {
            BundleKind::Disconnected => self.disconnected += 1,
            BundleKind::MobileOnly | BundleKind::FixedOnly => self.partial += 1,
            BundleKind::Complete => match household.expenditure_pct {
                Some(pct) if pct < 2.0  => self.under_2 += 1,
                Some(pct) if pct < 5.0  => self.under_5 += 1,
                Some(pct) if pct < 10.0 => self.under_10 += 1,
                // no usable income: the bundle is beyond any budget
                _ => self.at_least_10 += 1,
            },
        }
    }

    pub fn total(&self) -> usize {
        self.under_2
            + self.under_5
            + self.under_10
            + self.at_least_10
            + self.partial
            + self.disconnected
    }
}

/// One firm's position at the end of a month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FirmMonthRecord {
    pub month:       Month,
    pub firm:        FirmId,
    pub name:        String,
    pub profit:      f64,
    pub savings:     f64,
    pub status:      FirmStatus,
    pub mobile_subs: usize,
    pub fixed_subs:  usize,
}

/// Herfindahl–Hirschman index over subscriber counts, shares in percent.
/// `None` when nobody subscribes.
pub fn hhi(counts: &[usize]) -> Option<f64> {
    let total: usize = counts.iter().sum();
    if total == 0 {
        return None;
    }
    Some(
        counts
            .iter()
            .map(|c| {
                let share = *c as f64 / total as f64 * 100.0;
                share * share
            })
            .sum(),
    )
}

/// Subscribers per firm for each service line, indexed by firm id.
pub fn subscriber_counts(ctx: &SimContext) -> (Vec<usize>, Vec<usize>) {
    let n = ctx.market.firms.len();
    let mut mobile = vec![0; n];
    let mut fixed = vec![0; n];
    for household in ctx.grid.households() {
        if let Some(id) = household.bundle.mobile {
            if id.firm < n {
                mobile[id.firm] += 1;
            }
        }
        if let Some(id) = household.bundle.fixed {
            if id.firm < n {
                fixed[id.firm] += 1;
            }
        }
    }
    (mobile, fixed)
}

/// Cheapest mobile plan above the quality floor plus the cheapest fixed
/// plan of at least `GOOD_BUNDLE_FIXED_MBPS`, from solvent firms, both
/// available in `quadrant`. `None` when either leg is missing.
pub fn min_good_bundle_price(market: &MarketCatalogue, quadrant: Quadrant) -> Option<f64> {
    let cheapest = |good: &dyn Fn(f64) -> bool, kind: ServiceKind| {
        market
            .solvent_firms()
            .flat_map(|f| f.active_plans())
            .filter(|p| p.kind == kind && good(p.capacity) && p.available_in(quadrant))
            .map(|p| p.price)
            .min_by(|a, b| a.total_cmp(b))
    };
    let mobile = cheapest(&|gb| gb > MIN_QUALITY_MOBILE_GB, ServiceKind::Mobile)?;
    let fixed = cheapest(&|mbps| mbps >= GOOD_BUNDLE_FIXED_MBPS, ServiceKind::Fixed)?;
    Some(mobile + fixed)
}

pub fn market_report(ctx: &SimContext, month: Month) -> MarketReport {
    let (mobile_subs, fixed_subs) = subscriber_counts(ctx);

    let per_gb: Vec<f64> = ctx
        .market
        .solvent_firms()
        .flat_map(|f| f.active_plans())
        .filter(|p| p.kind == ServiceKind::Mobile && p.capacity > 0.0)
        .map(|p| p.price / p.capacity)
        .collect();
    let mean_price_per_gb = if per_gb.is_empty() {
        None
    } else {
        Some(per_gb.iter().sum::<f64>() / per_gb.len() as f64)
    };

    let mut report = MarketReport {
        month,
        hhi_mobile: hhi(&mobile_subs),
        hhi_fixed: hhi(&fixed_subs),
        mean_price_per_gb,
        complete: 0,
        mobile_only: 0,
        fixed_only: 0,
        disconnected: 0,
        mean_switching_cost: None,
        real_problems: ctx.ledger.real_problems,
        network_wholesale_revenue: ctx.ledger.network_wholesale_revenue,
        solvent_firms: ctx.market.solvent_firms().count(),
        by_quadrant: [SpendBands::default(); 4],
        by_income_quartile: [SpendBands::default(); 4],
        min_good_bundle_price: Quadrant::ALL.map(|q| min_good_bundle_price(&ctx.market, q)),
    };

    let mut switching_total = 0.0;
    let mut population = 0usize;
    for household in ctx.grid.households() {
        match household.bundle.kind() {
            BundleKind::Complete     => report.complete += 1,
            BundleKind::MobileOnly   => report.mobile_only += 1,
            BundleKind::FixedOnly    => report.fixed_only += 1,
            BundleKind::Disconnected => report.disconnected += 1,
        }
        report.by_quadrant[household.quadrant.index()].record(household);
        report.by_income_quartile[income_quartile(household.income)].record(household);
        switching_total += household.switching_cost;
        population += 1;
    }
    if population > 0 {
        report.mean_switching_cost = Some(switching_total / population as f64);
    }
    report
}

pub fn firm_month_records(ctx: &SimContext, month: Month) -> Vec<FirmMonthRecord> {
    let (mobile_subs, fixed_subs) = subscriber_counts(ctx);
    ctx.market
        .firms
        .iter()
        .map(|f| FirmMonthRecord {
            month,
            firm:        f.id,
            name:        f.name.clone(),
            profit:      f.profit,
            savings:     f.savings,
            status:      f.status,
            mobile_subs: mobile_subs[f.id],
            fixed_subs:  fixed_subs[f.id],
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hhi_of_monopoly_is_ten_thousand() {
        assert_eq!(hhi(&[0, 12, 0]), Some(10_000.0));
    }

    #[test]
    fn hhi_of_even_split() {
        let value = hhi(&[5, 5, 5, 5]).unwrap();
        assert!((value - 2_500.0).abs() < 1e-9);
    }

    #[test]
    fn hhi_undefined_without_subscribers() {
        assert_eq!(hhi(&[0, 0]), None);
        assert_eq!(hhi(&[]), None);
    }

    fn household_with(bundle: crate::household::Bundle, pct: Option<f64>) -> Household {
        let mut h = Household::new(0, 0, Quadrant::Urban, 3_000.0);
        h.bundle = bundle;
        h.expenditure_pct = pct;
        h
    }

    #[test]
    fn spend_bands_classify_by_bundle_and_share() {
        use crate::{household::Bundle, types::PlanId};
        let (m, f) = (PlanId::new(0, 0), PlanId::new(0, 3));
        let mut bands = SpendBands::default();
        for pct in [1.0, 2.0, 4.99, 9.0, 10.0, 35.0] {
            bands.record(&household_with(Bundle::complete(m, f), Some(pct)));
        }
        bands.record(&household_with(Bundle::complete(m, f), None));
        bands.record(&household_with(Bundle::mobile_only(m), Some(1.0)));
        bands.record(&household_with(Bundle::fixed_only(f), Some(1.0)));
        bands.record(&household_with(Bundle::disconnected(), None));

        assert_eq!(
            bands,
            SpendBands {
                under_2:      1,
                under_5:      2,
                under_10:     1,
                at_least_10:  3,
                partial:      2,
                disconnected: 1,
            }
        );
        assert_eq!(bands.total(), 10);
    }

    #[test]
    fn good_bundle_needs_both_legs_in_the_quadrant() {
        let market = MarketCatalogue::fixture(1_000.0).unwrap();
        let urban = min_good_bundle_price(&market, Quadrant::Urban);
        assert!(urban.is_some_and(|p| p > 0.0));

        let mut gutted = market.clone();
        for firm in gutted.firms.iter_mut() {
            for plan in firm.plans.iter_mut().filter(|p| p.kind == ServiceKind::Fixed) {
                plan.capacity = GOOD_BUNDLE_FIXED_MBPS - 1.0;
            }
        }
        for q in Quadrant::ALL {
            assert_eq!(min_good_bundle_price(&gutted, q), None);
        }
    }
}
