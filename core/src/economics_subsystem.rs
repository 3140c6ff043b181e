//! Economics subsystem: monthly profit and savings per firm.
//!
//! Execution: first phase of every month.
//! Reads the subscriptions households held at the end of last month and
//! the firms' previous profit and savings (marketing spend depends on
//! them). Bankrupt firms are skipped; their fields stay frozen.

use crate::{
    config::SimParams,
    context::SimContext,
    error::SimResult,
    event::SimEvent,
    grid::Grid,
    market::{fixed_wholesale_cost, Firm, MarketCatalogue, MarkupTier, ServiceKind},
    subsystem::MonthPhase,
    types::{Month, PlanId},
};

/// Share of monthly profit (or loss) that accrues into savings.
pub const SAVINGS_RATE: f64 = 0.05;

/// Subscriber-driven income of every firm for one month.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyRevenue {
    /// Indexed by firm id.
    pub by_firm: Vec<f64>,
    /// Paid on fixed-line legs to the network wholesaler.
    pub network_wholesale: f64,
}

/// Wholesale cost of a mobile plan retailed by a firm in `tier`.
pub fn mobile_wholesale_cost(price: f64, tier: MarkupTier, params: &SimParams) -> f64 {
    let markup = match tier {
        MarkupTier::Large => params.large_markup,
        MarkupTier::Small => params.small_markup,
    };
    price / (markup / 100.0)
}

fn credit_leg(
    market: &MarketCatalogue,
    id: PlanId,
    params: &SimParams,
    revenue: &mut MonthlyRevenue,
) {
    let Some(owner) = market.firm(id.firm) else { return };
    let Some(plan) = owner.plan(id) else { return };

    match plan.kind {
        ServiceKind::Mobile => {
            let wholesale = mobile_wholesale_cost(plan.price, owner.markup_tier, params);
            if owner.is_solvent() {
                revenue.by_firm[owner.id] += plan.price - wholesale;
            }
            for firm in market.firms.iter().filter(|f| f.is_solvent()) {
                if let Some(role) = &firm.wholesale {
                    if role.brand == plan.wholesaler {
                        revenue.by_firm[firm.id] += role.share * wholesale;
                    }
                }
            }
        }
        ServiceKind::Fixed => {
            let wholesale = fixed_wholesale_cost(plan.capacity);
            if owner.is_solvent() {
                revenue.by_firm[owner.id] += plan.price - wholesale;
            }
            revenue.network_wholesale += wholesale;
        }
    }
}

/// Sum retail and wholesale margins over every subscribed leg.
pub fn monthly_revenue(market: &MarketCatalogue, grid: &Grid, params: &SimParams) -> MonthlyRevenue {
    let mut revenue = MonthlyRevenue {
        by_firm:           vec![0.0; market.firms.len()],
        network_wholesale: 0.0,
    };
    for household in grid.households() {
        for id in [household.bundle.mobile, household.bundle.fixed].into_iter().flatten() {
            credit_leg(market, id, params, &mut revenue);
        }
    }
    revenue
}

/// Fixed monthly costs: per-location reseller fees, marketing, and the
/// wholesaler fee per served mobile quadrant for wholesale stakeholders.
pub fn fixed_costs(firm: &Firm, params: &SimParams) -> f64 {
    let reseller = params.reseller_operating_fee * firm.locations_operational() as f64;
    let marketing = firm.marketing_spend(params.marketing_budget);
    let wholesaler = firm
        .wholesale
        .as_ref()
        .map(|role| role.share * params.wholesaler_operating_fee * firm.mobile_quadrants.len() as f64)
        .unwrap_or(0.0);
    reseller + marketing + wholesaler
}

pub struct EconomicsSubsystem;

impl EconomicsSubsystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for EconomicsSubsystem {
    fn default() -> Self {
        Self::new()
    }
}

impl MonthPhase for EconomicsSubsystem {
    fn name(&self) -> &'static str {
        "economics"
    }

    fn run(
        &mut self,
        ctx: &mut SimContext,
        month: Month,
        _events_in: &[SimEvent],
    ) -> SimResult<Vec<SimEvent>> {
        let revenue = monthly_revenue(&ctx.market, &ctx.grid, &ctx.params);
        ctx.ledger.network_wholesale_revenue = revenue.network_wholesale;

        let mut events = Vec::new();
        let mut total_profit = 0.0;
        for firm in ctx.market.firms.iter_mut().filter(|f| f.is_solvent()) {
            let income = revenue.by_firm[firm.id];
            let profit = income - fixed_costs(firm, &ctx.params);
            firm.profit = profit;
            firm.savings += SAVINGS_RATE * profit;
            total_profit += profit;

            events.push(SimEvent::FirmAccountsUpdated {
                month,
                firm:    firm.id,
                revenue: income,
                profit,
                savings: firm.savings,
            });
        }

        log::debug!(
            "month={month} economics: {} firms, total profit ${total_profit:.0}, network wholesale ${:.0}",
            events.len(),
            revenue.network_wholesale,
        );
        Ok(events)
    }
}
