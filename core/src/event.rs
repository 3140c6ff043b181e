//! Everything that happens in a run, as an append-only event stream.
//!
//! RULE: Phases report what they changed through events. The event log is
//! the record the determinism tests compare.

use crate::{
    experiment::ProductChange,
    types::{FirmId, Month, PlanId, RunId},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SimEvent {
    // ── Engine events ──────────────────────────────
    MonthStarted {
        month: Month,
    },
    MonthCompleted {
        month: Month,
    },
    RunInitialized {
        run_id:     RunId,
        seed:       u64,
        households: usize,
    },

    // ── Firm economics ─────────────────────────────
    FirmAccountsUpdated {
        month:   Month,
        firm:    FirmId,
        revenue: f64,
        profit:  f64,
        savings: f64,
    },
    FirmBankrupt {
        month:   Month,
        firm:    FirmId,
        name:    String,
        savings: f64,
    },

    // ── Experiments ────────────────────────────────
    PriceExperimentStarted {
        month:     Month,
        firm:      FirmId,
        plan:      PlanId,
        old_price: f64,
        new_price: f64,
    },
    PriceExperimentConcluded {
        month: Month,
        firm:  FirmId,
        plan:  PlanId,
        kept:  bool,
        price: f64,
    },
    ProductExperimentStarted {
        month:  Month,
        firm:   FirmId,
        change: ProductChange,
    },
    ProductExperimentConcluded {
        month:  Month,
        firm:   FirmId,
        change: ProductChange,
        kept:   bool,
    },

    // ── Households ─────────────────────────────────
    HouseholdsReassessed {
        month:         Month,
        real_problems: usize,
        contemplators: usize,
        redirected:    usize,
        switched:      usize,
    },

    // ── Reporting ──────────────────────────────────
    MarketReported {
        month:        Month,
        hhi_mobile:   Option<f64>,
        hhi_fixed:    Option<f64>,
        disconnected: usize,
    },
}

impl SimEvent {
    /// Stable name stored in the event_type column.
    pub fn type_name(&self) -> &'static str {
        match self {
            SimEvent::MonthStarted { .. }               => "month_started",
            SimEvent::MonthCompleted { .. }             => "month_completed",
            SimEvent::RunInitialized { .. }             => "run_initialized",
            SimEvent::FirmAccountsUpdated { .. }        => "firm_accounts_updated",
            SimEvent::FirmBankrupt { .. }               => "firm_bankrupt",
            SimEvent::PriceExperimentStarted { .. }     => "price_experiment_started",
            SimEvent::PriceExperimentConcluded { .. }   => "price_experiment_concluded",
            SimEvent::ProductExperimentStarted { .. }   => "product_experiment_started",
            SimEvent::ProductExperimentConcluded { .. } => "product_experiment_concluded",
            SimEvent::HouseholdsReassessed { .. }       => "households_reassessed",
            SimEvent::MarketReported { .. }             => "market_reported",
        }
    }
}

/// A persisted event log row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub id:         Option<i64>,
    pub run_id:     RunId,
    pub month:      Month,
    pub phase:      String,
    pub event_type: String,
    pub payload:    String, // JSON-serialized SimEvent
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_snake_case_tag() {
        let event = SimEvent::FirmBankrupt {
            month:   4,
            firm:    2,
            name:    "Optus".into(),
            savings: -10.0,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"firm_bankrupt\""));
        let back: SimEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
        assert_eq!(event.type_name(), "firm_bankrupt");
    }
}
