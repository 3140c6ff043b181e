//! The market catalogue: firms, their plan rosters and the per-quadrant
//! operator index.
//!
//! RULE: only the firm economics and experiment phases mutate firms.
//! Households hold `PlanId`s and read prices through the catalogue, so a
//! price change is seen by every subscriber immediately.

pub mod catalogue;
pub mod firm;
pub mod plan;

pub use catalogue::{MarketCatalogue, QuadrantIndex};
pub use firm::{Firm, FirmStatus, MarkupTier, WholesaleRole};
pub use plan::{fixed_wholesale_cost, Footprint, Plan, PlanStatus, ServiceKind};
