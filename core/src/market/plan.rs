use crate::types::{FirmId, PlanId, Quadrant};
use serde::{Deserialize, Serialize};

/// Minimum data allowance (GB) for a mobile plan to count as "good enough".
pub const MIN_QUALITY_MOBILE_GB: f64 = 61.0;
/// Minimum speed (Mbps) for a fixed-line plan to count as "good enough".
pub const MIN_QUALITY_FIXED_MBPS: f64 = 25.0;

/// Network wholesale tiers: speed ceiling (Mbps) → monthly cost.
pub const FIXED_WHOLESALE_TIERS: [(f64, f64); 6] = [
    (12.0,   12.0),
    (25.0,   26.0),
    (50.0,   50.0),
    (100.0,  55.0),
    (250.0,  60.0),
    (1000.0, 70.0),
];

/// Wholesale cost of a fixed-line connection: the cost of the first tier
/// whose speed is at least the contracted speed. Speeds above the fastest
/// tier pay the fastest tier's cost.
pub fn fixed_wholesale_cost(speed_mbps: f64) -> f64 {
    FIXED_WHOLESALE_TIERS
        .iter()
        .find(|(tier_speed, _)| speed_mbps <= *tier_speed)
        .map(|(_, cost)| *cost)
        .unwrap_or(FIXED_WHOLESALE_TIERS[FIXED_WHOLESALE_TIERS.len() - 1].1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceKind {
    Mobile,
    Fixed,
}

/// Declared service-availability tier of a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Footprint {
    Urban,
    Regional,
    Remote,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    Active,
    /// Tombstoned: still addressable by id, never offered.
    Retired,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub id:         PlanId,
    pub firm:       FirmId,
    pub kind:       ServiceKind,
    /// GB per month for mobile, Mbps for fixed-line.
    pub capacity:   f64,
    pub footprint:  Footprint,
    pub price:      f64,
    /// Wholesale brand (mobile) or network wholesaler (fixed-line).
    pub wholesaler: String,
    pub status:     PlanStatus,
}

impl Plan {
    pub fn is_active(&self) -> bool {
        self.status == PlanStatus::Active
    }

    pub fn is_mobile(&self) -> bool {
        self.kind == ServiceKind::Mobile
    }

    /// Footprint eligibility. Retired plans are never available.
    ///
    /// Fixed-line: urban serves the urban quadrant, regional both regional
    /// quadrants, remote (satellite) everything but urban.
    /// Mobile: remote serves every quadrant, regional every quadrant but
    /// remote. An urban mobile footprint is never offered to households.
    pub fn available_in(&self, quadrant: Quadrant) -> bool {
        if !self.is_active() {
            return false;
        }
        match (self.kind, self.footprint) {
            (ServiceKind::Fixed, Footprint::Urban)     => quadrant == Quadrant::Urban,
            (ServiceKind::Fixed, Footprint::Regional)  => quadrant.is_regional(),
            (ServiceKind::Fixed, Footprint::Remote)    => quadrant != Quadrant::Urban,
            (ServiceKind::Mobile, Footprint::Remote)   => true,
            (ServiceKind::Mobile, Footprint::Regional) => quadrant != Quadrant::Remote,
            (ServiceKind::Mobile, Footprint::Urban)    => false,
        }
    }

    pub fn meets_minimum_quality(&self) -> bool {
        match self.kind {
            ServiceKind::Mobile => self.capacity > MIN_QUALITY_MOBILE_GB,
            ServiceKind::Fixed  => self.capacity > MIN_QUALITY_FIXED_MBPS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(kind: ServiceKind, footprint: Footprint) -> Plan {
        Plan {
            id: PlanId::new(0, 0),
            firm: 0,
            kind,
            capacity: 50.0,
            footprint,
            price: 60.0,
            wholesaler: "net".into(),
            status: PlanStatus::Active,
        }
    }

    #[test]
    fn wholesale_tier_lookup() {
        assert_eq!(fixed_wholesale_cost(12.0), 12.0);
        assert_eq!(fixed_wholesale_cost(13.0), 26.0);
        assert_eq!(fixed_wholesale_cost(100.0), 55.0);
        assert_eq!(fixed_wholesale_cost(1000.0), 70.0);
        assert_eq!(fixed_wholesale_cost(5000.0), 70.0);
    }

    #[test]
    fn fixed_remote_footprint_skips_urban() {
        let p = plan(ServiceKind::Fixed, Footprint::Remote);
        assert!(!p.available_in(Quadrant::Urban));
        assert!(p.available_in(Quadrant::InnerRegional));
        assert!(p.available_in(Quadrant::OuterRegional));
        assert!(p.available_in(Quadrant::Remote));
    }

    #[test]
    fn mobile_regional_footprint_skips_remote() {
        let p = plan(ServiceKind::Mobile, Footprint::Regional);
        assert!(p.available_in(Quadrant::Urban));
        assert!(p.available_in(Quadrant::OuterRegional));
        assert!(!p.available_in(Quadrant::Remote));
    }

    #[test]
    fn retired_plans_are_never_available() {
        let mut p = plan(ServiceKind::Mobile, Footprint::Remote);
        p.status = PlanStatus::Retired;
        for q in Quadrant::ALL {
            assert!(!p.available_in(q));
        }
    }
}
