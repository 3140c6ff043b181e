//! The household population: a square grid split into four quadrants.

use crate::{
    config::SimParams,
    decision::decide,
    household::Household,
    market::MarketCatalogue,
    rng::DrawSource,
    types::Quadrant,
};

/// Monthly income ranges ($) for the four income quartiles.
pub const INCOME_QUARTILES: [(f64, f64); 4] = [
    (381.0, 2_594.0),
    (2_595.0, 3_838.0),
    (3_839.0, 5_602.0),
    (5_603.0, 15_000.0),
];

/// Income quartile (0-3) a monthly income falls in. Incomes between two
/// ranges belong to the higher one; anything above the top range is in the
/// top quartile.
pub fn income_quartile(income: f64) -> usize {
    INCOME_QUARTILES
        .iter()
        .position(|(_, hi)| income <= *hi)
        .unwrap_or(INCOME_QUARTILES.len() - 1)
}

/// Probability that a cell in the quadrant holds a household.
pub fn population_density(quadrant: Quadrant) -> f64 {
    match quadrant {
        Quadrant::Urban => 0.8,
        Quadrant::InnerRegional | Quadrant::OuterRegional => 0.15,
        Quadrant::Remote => 0.07,
    }
}

/// Weight of each income quartile in the quadrant.
pub fn quartile_weights(quadrant: Quadrant) -> [f64; 4] {
    match quadrant {
        Quadrant::Urban => [0.238, 0.235, 0.239, 0.288],
        Quadrant::InnerRegional | Quadrant::OuterRegional => [0.287, 0.268, 0.246, 0.199],
        Quadrant::Remote => [0.294, 0.246, 0.237, 0.223],
    }
}

#[derive(Debug, Clone)]
pub struct Grid {
    pub side:  usize,
    /// Row-major. `None` is an empty cell.
    pub cells: Vec<Option<Household>>,
}

impl Grid {
    pub fn empty(side: usize) -> Self {
        Self { side, cells: vec![None; side * side] }
    }

    /// Fill the grid and give every household its initial bundle.
    ///
    /// Cells are visited row-major. Each consumes one occupancy draw, and
    /// each household two income draws followed by its initial decision.
    pub fn populate(params: &SimParams, market: &MarketCatalogue, rng: &mut DrawSource) -> Self {
        let side = params.grid_side;
        let mut grid = Self::empty(side);
        for row in 0..side {
            for col in 0..side {
                let quadrant = Quadrant::of_cell(row, col, side);
                if !rng.chance(population_density(quadrant)) {
                    continue;
                }
                let quartile = rng.weighted_index(&quartile_weights(quadrant));
                let (lo, hi) = INCOME_QUARTILES[quartile];
                let income = rng.uniform(lo, hi);

                let mut household = Household::new(row, col, quadrant, income);
                household.bundle = decide(&household, market, params, rng, true);
                household.refresh_expenditure(market);
                grid.cells[row * side + col] = Some(household);
            }
        }
        log::info!(
            "grid populated: side={side} households={} connected={}",
            grid.populated_count(),
            grid.households().filter(|h| h.bundle.is_connected()).count(),
        );
        grid
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&Household> {
        if row >= self.side || col >= self.side {
            return None;
        }
        self.cells[row * self.side + col].as_ref()
    }

    pub fn get_mut(&mut self, row: usize, col: usize) -> Option<&mut Household> {
        if row >= self.side || col >= self.side {
            return None;
        }
        self.cells[row * self.side + col].as_mut()
    }

    pub fn households(&self) -> impl Iterator<Item = &Household> {
        self.cells.iter().flatten()
    }

    pub fn households_mut(&mut self) -> impl Iterator<Item = &mut Household> {
        self.cells.iter_mut().flatten()
    }

    pub fn populated_count(&self) -> usize {
        self.households().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incomes_map_to_their_quartile() {
        assert_eq!(income_quartile(381.0), 0);
        assert_eq!(income_quartile(2_594.0), 0);
        assert_eq!(income_quartile(2_594.5), 1);
        assert_eq!(income_quartile(4_000.0), 2);
        assert_eq!(income_quartile(5_603.0), 3);
        assert_eq!(income_quartile(40_000.0), 3);
        assert_eq!(income_quartile(0.0), 0);
    }

    #[test]
    fn quartile_weights_sum_to_one() {
        for q in Quadrant::ALL {
            let total: f64 = quartile_weights(q).iter().sum();
            assert!((total - 1.0).abs() < 1e-9, "{q:?}");
        }
    }

    #[test]
    fn urban_quadrant_is_densest() {
        let params = SimParams::default_test();
        let market = MarketCatalogue::fixture(params.initial_money_pool).unwrap();
        let mut rng = DrawSource::new(7);
        let grid = Grid::populate(&params, &market, &mut rng);

        let count = |q: Quadrant| grid.households().filter(|h| h.quadrant == q).count();
        assert!(count(Quadrant::Urban) > count(Quadrant::InnerRegional));
        assert!(count(Quadrant::InnerRegional) + count(Quadrant::OuterRegional) > count(Quadrant::Remote));
        assert!(grid.populated_count() > 0);
    }

    #[test]
    fn incomes_fall_inside_quartile_ranges() {
        let params = SimParams::default_test();
        let market = MarketCatalogue::fixture(params.initial_money_pool).unwrap();
        let mut rng = DrawSource::new(8);
        let grid = Grid::populate(&params, &market, &mut rng);
        for h in grid.households() {
            assert!(h.income >= INCOME_QUARTILES[0].0 && h.income <= INCOME_QUARTILES[3].1);
            assert_eq!(h.quadrant, Quadrant::of_cell(h.row, h.col, grid.side));
        }
    }

    #[test]
    fn out_of_range_cells_are_empty() {
        let grid = Grid::empty(4);
        assert!(grid.get(4, 0).is_none());
        assert!(grid.get(0, 0).is_none());
        assert_eq!(grid.populated_count(), 0);
    }
}
