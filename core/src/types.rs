//! Shared primitive types used across the entire simulation.

use serde::{Deserialize, Serialize};

/// A simulated month. Month 0 is the seeded initial state.
pub type Month = u64;

/// The canonical run identifier.
pub type RunId = String;

/// Position of a firm in the catalogue's firm list. Never reused.
pub type FirmId = usize;

/// Stable plan identifier. Rosters are append-only, so a slot never moves
/// once assigned, even after the plan is retired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlanId {
    pub firm: FirmId,
    pub slot: usize,
}

impl PlanId {
    pub fn new(firm: FirmId, slot: usize) -> Self {
        Self { firm, slot }
    }
}

/// One of the four spatial market segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quadrant {
    Urban,
    InnerRegional,
    OuterRegional,
    Remote,
}

impl Quadrant {
    pub const ALL: [Quadrant; 4] = [
        Quadrant::Urban,
        Quadrant::InnerRegional,
        Quadrant::OuterRegional,
        Quadrant::Remote,
    ];

    pub fn index(self) -> usize {
        match self {
            Self::Urban         => 0,
            Self::InnerRegional => 1,
            Self::OuterRegional => 2,
            Self::Remote        => 3,
        }
    }

    pub fn is_regional(self) -> bool {
        matches!(self, Self::InnerRegional | Self::OuterRegional)
    }

    /// Quadrant of grid cell (row, col) on a square grid of side `side`.
    pub fn of_cell(row: usize, col: usize, side: usize) -> Self {
        let half = side / 2;
        match (col < half, row < half) {
            (true, true)   => Self::Urban,
            (true, false)  => Self::InnerRegional,
            (false, true)  => Self::OuterRegional,
            (false, false) => Self::Remote,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_quadrants_split_at_half() {
        assert_eq!(Quadrant::of_cell(0, 0, 100), Quadrant::Urban);
        assert_eq!(Quadrant::of_cell(50, 10, 100), Quadrant::InnerRegional);
        assert_eq!(Quadrant::of_cell(10, 50, 100), Quadrant::OuterRegional);
        assert_eq!(Quadrant::of_cell(99, 99, 100), Quadrant::Remote);
    }
}
