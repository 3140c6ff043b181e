use super::plan::{Footprint, Plan, PlanStatus, ServiceKind};
use crate::{
    experiment::{PriceExperiment, ProductExperiment},
    types::{FirmId, PlanId, Quadrant},
};
use serde::{Deserialize, Serialize};

/// Retail markup tier. Incumbents carry the large markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkupTier {
    Large,
    Small,
}

/// A firm's stake in a mobile wholesale brand. Two firms holding 0.5 of
/// the same brand split its wholesale margin and operating fee evenly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WholesaleRole {
    pub brand: String,
    pub share: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FirmStatus {
    Solvent,
    /// Savings pool hit zero. Excluded from every quadrant index; plans and
    /// financial fields are frozen for households still subscribed.
    Bankrupt,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Firm {
    pub id:                 FirmId,
    pub name:               String,
    pub markup_tier:        MarkupTier,
    pub wholesale:          Option<WholesaleRole>,
    /// Append-only; retired plans stay in place.
    pub plans:              Vec<Plan>,
    pub mobile_quadrants:   Vec<Quadrant>,
    pub fixed_quadrants:    Vec<Quadrant>,
    pub price_experiment:   Option<PriceExperiment>,
    pub product_experiment: Option<ProductExperiment>,
    pub profit:             f64,
    pub savings:            f64,
    pub status:             FirmStatus,
}

impl Firm {
    pub fn new(
        id: FirmId,
        name: impl Into<String>,
        markup_tier: MarkupTier,
        wholesale: Option<WholesaleRole>,
        plans: Vec<Plan>,
        profit: f64,
        savings: f64,
    ) -> Self {
        let mobile_quadrants = mobile_coverage(&plans);
        let fixed_quadrants = fixed_coverage(&plans);
        Self {
            id,
            name: name.into(),
            markup_tier,
            wholesale,
            plans,
            mobile_quadrants,
            fixed_quadrants,
            price_experiment: None,
            product_experiment: None,
            profit,
            savings,
            status: FirmStatus::Solvent,
        }
    }

    pub fn is_solvent(&self) -> bool {
        self.status == FirmStatus::Solvent
    }

    pub fn offers_fixed(&self) -> bool {
        !self.fixed_quadrants.is_empty()
    }

    pub fn offers_mobile_in(&self, quadrant: Quadrant) -> bool {
        self.mobile_quadrants.contains(&quadrant)
    }

    pub fn offers_fixed_in(&self, quadrant: Quadrant) -> bool {
        self.fixed_quadrants.contains(&quadrant)
    }

    /// Served quadrants summed over both service lines.
    pub fn locations_operational(&self) -> usize {
        self.mobile_quadrants.len() + self.fixed_quadrants.len()
    }

    pub fn in_experiment(&self) -> bool {
        self.price_experiment.is_some() || self.product_experiment.is_some()
    }

    /// Monthly marketing spend: out of savings when loss-making, out of
    /// profit otherwise.
    pub fn marketing_spend(&self, marketing_budget: f64) -> f64 {
        if self.profit <= 0.0 {
            marketing_budget * self.savings
        } else {
            marketing_budget * self.profit
        }
    }

    pub fn plan(&self, id: PlanId) -> Option<&Plan> {
        if id.firm != self.id {
            return None;
        }
        self.plans.get(id.slot)
    }

    pub fn plan_mut(&mut self, id: PlanId) -> Option<&mut Plan> {
        if id.firm != self.id {
            return None;
        }
        self.plans.get_mut(id.slot)
    }

    pub fn active_plans(&self) -> impl Iterator<Item = &Plan> {
        self.plans.iter().filter(|p| p.is_active())
    }

    pub fn active_fixed_plans(&self) -> impl Iterator<Item = &Plan> {
        self.active_plans().filter(|p| p.kind == ServiceKind::Fixed)
    }

    /// Append a copy of `template` under this firm's brand.
    pub fn push_plan(&mut self, template: &Plan) -> PlanId {
        let id = PlanId::new(self.id, self.plans.len());
        self.plans.push(Plan {
            id,
            firm: self.id,
            status: PlanStatus::Active,
            ..template.clone()
        });
        id
    }

    /// Where subscribers of a withdrawn fixed-line plan are moved: the
    /// cheapest active plan in the same footprint priced above it, else the
    /// most expensive one priced at or below it.
    pub fn replacement_for(&self, withdrawn: PlanId) -> Option<PlanId> {
        let target = self.plan(withdrawn)?;
        let same_footprint = || {
            self.active_fixed_plans()
                .filter(|p| p.id != withdrawn && p.footprint == target.footprint)
        };

        let dearer = same_footprint()
            .filter(|p| p.price > target.price)
            .min_by(|a, b| a.price.total_cmp(&b.price));
        if let Some(plan) = dearer {
            return Some(plan.id);
        }

        same_footprint()
            .max_by(|a, b| a.price.total_cmp(&b.price))
            .map(|p| p.id)
    }
}

/// Mobile coverage follows the widest footprint in the roster: remote
/// covers every quadrant, regional all but remote, urban only urban.
fn mobile_coverage(plans: &[Plan]) -> Vec<Quadrant> {
    let footprints: Vec<Footprint> = plans
        .iter()
        .filter(|p| p.kind == ServiceKind::Mobile)
        .map(|p| p.footprint)
        .collect();

    if footprints.contains(&Footprint::Remote) {
        Quadrant::ALL.to_vec()
    } else if footprints.contains(&Footprint::Regional) {
        vec![Quadrant::Urban, Quadrant::InnerRegional, Quadrant::OuterRegional]
    } else if footprints.contains(&Footprint::Urban) {
        vec![Quadrant::Urban]
    } else {
        Vec::new()
    }
}

/// Fixed-line coverage is the union of footprints. A remote (satellite)
/// plan also covers both regional quadrants.
fn fixed_coverage(plans: &[Plan]) -> Vec<Quadrant> {
    let mut quadrants = Vec::new();
    for plan in plans.iter().filter(|p| p.kind == ServiceKind::Fixed) {
        let covered: &[Quadrant] = match plan.footprint {
            Footprint::Urban    => &[Quadrant::Urban],
            Footprint::Regional => &[Quadrant::InnerRegional, Quadrant::OuterRegional],
            Footprint::Remote   => &[Quadrant::InnerRegional, Quadrant::OuterRegional, Quadrant::Remote],
        };
        for q in covered {
            if !quadrants.contains(q) {
                quadrants.push(*q);
            }
        }
    }
    quadrants.sort();
    quadrants
}
