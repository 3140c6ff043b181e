//! The run context every month phase works on.

use crate::{
    config::SimParams,
    experiment::ReplacementMap,
    grid::Grid,
    market::MarketCatalogue,
    rng::DrawSource,
};

/// Per-month tallies. Reset at the start of every month.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonthLedger {
    /// Wholesale cost paid on fixed-line legs to the network wholesaler.
    pub network_wholesale_revenue: f64,
    /// Households forced to re-decide: disconnected or over budget.
    pub real_problems:             usize,
    /// Sampled households that got past their switching cost.
    pub contemplators:             usize,
    /// Households whose retired fixed-line plan was redirected or dropped.
    pub redirected:                usize,
}

/// All mutable state of one run. Owned by the engine and handed to each
/// phase in turn; nothing outside it is shared between runs.
#[derive(Debug, Clone)]
pub struct SimContext {
    pub params:       SimParams,
    pub market:       MarketCatalogue,
    pub grid:         Grid,
    pub rng:          DrawSource,
    pub replacements: ReplacementMap,
    pub ledger:       MonthLedger,
}

impl SimContext {
    /// Seed the draw source and populate the grid. Population draws come
    /// first on the stream.
    pub fn new(params: SimParams, market: MarketCatalogue) -> Self {
        let mut rng = DrawSource::new(params.seed);
        let grid = Grid::populate(&params, &market, &mut rng);
        Self {
            params,
            market,
            grid,
            rng,
            replacements: ReplacementMap::default(),
            ledger: MonthLedger::default(),
        }
    }

    /// Reset the month's tallies and forget last month's retirements.
    pub fn begin_month(&mut self) {
        self.ledger = MonthLedger::default();
        self.replacements.clear();
    }
}
