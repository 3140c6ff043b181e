//! Month phase trait.
//!
//! RULE: Every step of a simulated month implements MonthPhase.
//! The engine calls run() on each registered phase in registration order,
//! once per month. Execution order is fixed and documented in engine.rs.

use crate::{context::SimContext, error::SimResult, event::SimEvent, types::Month};

/// The contract every month phase must fulfil.
pub trait MonthPhase: Send {
    /// Unique stable name for this phase.
    fn name(&self) -> &'static str;

    /// Called once per month by the engine.
    ///
    /// - `ctx`:       the run's state, including its draw source
    /// - `month`:     the month being simulated (first month is 1)
    /// - `events_in`: events emitted by earlier phases this month
    ///
    /// Returns the events to append to the month's log.
    fn run(
        &mut self,
        ctx: &mut SimContext,
        month: Month,
        events_in: &[SimEvent],
    ) -> SimResult<Vec<SimEvent>>;
}
