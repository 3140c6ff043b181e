//! Bankruptcy check: runs right after economics.
//!
//! A solvent firm whose savings pool is at or below zero is marked
//! bankrupt and pulled from every quadrant index. Its plans stay on the
//! roster for households still subscribed.

use crate::{
    context::SimContext,
    error::SimResult,
    event::SimEvent,
    market::{FirmStatus, MarketCatalogue},
    subsystem::MonthPhase,
    types::{FirmId, Month},
};

/// Apply bankruptcy to every newly insolvent firm. Returns their ids.
pub fn apply_bankruptcies(market: &mut MarketCatalogue) -> Vec<FirmId> {
    let insolvent: Vec<FirmId> = market
        .firms
        .iter()
        .filter(|f| f.is_solvent() && f.savings <= 0.0)
        .map(|f| f.id)
        .collect();
    for id in &insolvent {
        market.firms[*id].status = FirmStatus::Bankrupt;
        market.index.remove_firm(*id);
    }
    insolvent
}

pub struct BankruptcySubsystem;

impl BankruptcySubsystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for BankruptcySubsystem {
    fn default() -> Self {
        Self::new()
    }
}

impl MonthPhase for BankruptcySubsystem {
    fn name(&self) -> &'static str {
        "bankruptcy"
    }

    fn run(
        &mut self,
        ctx: &mut SimContext,
        month: Month,
        _events_in: &[SimEvent],
    ) -> SimResult<Vec<SimEvent>> {
        let failed = apply_bankruptcies(&mut ctx.market);
        let events = failed
            .into_iter()
            .map(|id| {
                let firm = &ctx.market.firms[id];
                log::info!(
                    "month={month} bankruptcy: {} removed from market (savings ${:.2}, profit ${:.2})",
                    firm.name,
                    firm.savings,
                    firm.profit
                );
                SimEvent::FirmBankrupt {
                    month,
                    firm:    id,
                    name:    firm.name.clone(),
                    savings: firm.savings,
                }
            })
            .collect();
        Ok(events)
    }
}
