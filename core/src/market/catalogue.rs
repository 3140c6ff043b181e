use super::{
    firm::{Firm, FirmStatus, MarkupTier, WholesaleRole},
    plan::{Footprint, Plan, PlanStatus, ServiceKind},
};
use crate::{
    config::MarketProfile,
    error::{SimError, SimResult},
    types::{FirmId, PlanId, Quadrant},
};
use serde::{Deserialize, Serialize};

// ── Catalogue file format ─────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirmRecord {
    pub name:         String,
    pub markup_tier:  MarkupTier,
    #[serde(default)]
    pub wholesale:    Option<WholesaleRole>,
    /// Market-share seed used as the initial profit proxy.
    #[serde(default)]
    pub market_share: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanRecord {
    pub firm:       String,
    pub kind:       ServiceKind,
    pub capacity:   f64,
    pub footprint:  Footprint,
    pub price:      f64,
    pub wholesaler: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogueFile {
    pub firms: Vec<FirmRecord>,
    pub plans: Vec<PlanRecord>,
}

// ── Quadrant index ────────────────────────────────────────────────────

/// Quadrant → firms operating there, in catalogue order.
/// Mutated only by bankruptcy removal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuadrantIndex {
    operators: [Vec<FirmId>; 4],
}

impl QuadrantIndex {
    pub fn build(firms: &[Firm]) -> Self {
        let mut index = Self::default();
        for firm in firms {
            for q in firm.fixed_quadrants.iter().chain(firm.mobile_quadrants.iter()) {
                let slot = &mut index.operators[q.index()];
                if !slot.contains(&firm.id) {
                    slot.push(firm.id);
                }
            }
        }
        index
    }

    pub fn operators(&self, quadrant: Quadrant) -> &[FirmId] {
        &self.operators[quadrant.index()]
    }

    pub fn contains(&self, firm: FirmId) -> bool {
        self.operators.iter().any(|q| q.contains(&firm))
    }

    /// Drop `firm` from every quadrant. Returns whether anything changed.
    pub fn remove_firm(&mut self, firm: FirmId) -> bool {
        let mut removed = false;
        for quadrant in &mut self.operators {
            let before = quadrant.len();
            quadrant.retain(|f| *f != firm);
            removed |= quadrant.len() != before;
        }
        removed
    }
}

// ── Catalogue ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketCatalogue {
    pub firms: Vec<Firm>,
    pub index: QuadrantIndex,
}

impl MarketCatalogue {
    /// Read `{data_dir}/market/{profile}.json`.
    pub fn load(data_dir: &str, profile: MarketProfile, initial_money_pool: f64) -> SimResult<Self> {
        let path = format!("{data_dir}/market/{}.json", profile.as_str());
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let file: CatalogueFile = serde_json::from_str(&content)?;
        let catalogue = Self::from_file(file, initial_money_pool)?;
        log::info!(
            "market: loaded profile '{profile}' with {} firms and {} plans",
            catalogue.firms.len(),
            catalogue.firms.iter().map(|f| f.plans.len()).sum::<usize>()
        );
        Ok(catalogue)
    }

    /// Build firms and the quadrant index from a catalogue table.
    /// Initial profit is each firm's normalised market share; every firm
    /// starts with `initial_money_pool` savings.
    pub fn from_file(file: CatalogueFile, initial_money_pool: f64) -> SimResult<Self> {
        if file.firms.is_empty() {
            return Err(SimError::InvalidCatalogue("no firms".into()));
        }

        let shares: Vec<f64> = file
            .firms
            .iter()
            .map(|f| f.market_share.unwrap_or(1.0).max(0.0))
            .collect();
        let share_total: f64 = shares.iter().sum();

        let mut rosters: Vec<Vec<Plan>> = vec![Vec::new(); file.firms.len()];
        for record in file.plans {
            let firm = file
                .firms
                .iter()
                .position(|f| f.name == record.firm)
                .ok_or_else(|| {
                    SimError::InvalidCatalogue(format!("plan references unknown firm '{}'", record.firm))
                })?;
            if record.capacity <= 0.0 || record.price < 0.0 {
                return Err(SimError::InvalidCatalogue(format!(
                    "plan of '{}' has capacity {} and price {}",
                    record.firm, record.capacity, record.price
                )));
            }
            let slot = rosters[firm].len();
            rosters[firm].push(Plan {
                id:         PlanId::new(firm, slot),
                firm,
                kind:       record.kind,
                capacity:   record.capacity,
                footprint:  record.footprint,
                price:      record.price,
                wholesaler: record.wholesaler,
                status:     PlanStatus::Active,
            });
        }

        let mut firms = Vec::with_capacity(file.firms.len());
        for (id, (record, plans)) in file.firms.into_iter().zip(rosters).enumerate() {
            if plans.is_empty() {
                return Err(SimError::InvalidCatalogue(format!("firm '{}' has no plans", record.name)));
            }
            let profit = if share_total > 0.0 {
                shares[id] / share_total
            } else {
                1.0 / shares.len() as f64
            };
            firms.push(Firm::new(
                id,
                record.name,
                record.markup_tier,
                record.wholesale,
                plans,
                profit,
                initial_money_pool,
            ));
        }

        let index = QuadrantIndex::build(&firms);
        Ok(Self { firms, index })
    }

    pub fn firm(&self, id: FirmId) -> Option<&Firm> {
        self.firms.get(id)
    }

    pub fn plan(&self, id: PlanId) -> Option<&Plan> {
        self.firms.get(id.firm).and_then(|f| f.plan(id))
    }

    pub fn plan_mut(&mut self, id: PlanId) -> Option<&mut Plan> {
        self.firms.get_mut(id.firm).and_then(|f| f.plan_mut(id))
    }

    pub fn solvent_firms(&self) -> impl Iterator<Item = &Firm> {
        self.firms.iter().filter(|f| f.status == FirmStatus::Solvent)
    }

    /// A small in-code market used by tests and examples: four incumbents
    /// (two sharing one wholesale brand) and three challengers.
    pub fn fixture(initial_money_pool: f64) -> SimResult<Self> {
        Self::from_file(fixture_file(), initial_money_pool)
    }
}

fn fixture_file() -> CatalogueFile {
    use Footprint::{Regional, Remote, Urban};
    use ServiceKind::{Fixed, Mobile};

    let firm = |name: &str, tier: MarkupTier, brand: Option<(&str, f64)>, share: f64| FirmRecord {
        name:         name.into(),
        markup_tier:  tier,
        wholesale:    brand.map(|(b, s)| WholesaleRole { brand: b.into(), share: s }),
        market_share: Some(share),
    };
    let plan = |firm: &str, kind, capacity, footprint, price, wholesaler: &str| PlanRecord {
        firm: firm.into(),
        kind,
        capacity,
        footprint,
        price,
        wholesaler: wholesaler.into(),
    };

    CatalogueFile {
        firms: vec![
            firm("Telstra",  MarkupTier::Large, Some(("Telstra", 1.0)), 0.40),
            firm("TPG",      MarkupTier::Large, Some(("TPG", 0.5)),     0.15),
            firm("Optus",    MarkupTier::Large, Some(("Optus", 1.0)),   0.20),
            firm("Vodafone", MarkupTier::Large, Some(("TPG", 0.5)),     0.10),
            firm("Aussie",   MarkupTier::Small, None,                   0.07),
            firm("Kogan",    MarkupTier::Small, None,                   0.05),
            firm("SkyMesh",  MarkupTier::Small, None,                   0.03),
        ],
        plans: vec![
            plan("Telstra", Mobile, 20.0,  Remote,   45.0,  "Telstra"),
            plan("Telstra", Mobile, 80.0,  Remote,   65.0,  "Telstra"),
            plan("Telstra", Mobile, 180.0, Remote,   85.0,  "Telstra"),
            plan("Telstra", Fixed,  25.0,  Urban,    75.0,  "NBN Co"),
            plan("Telstra", Fixed,  50.0,  Urban,    85.0,  "NBN Co"),
            plan("Telstra", Fixed,  100.0, Urban,    100.0, "NBN Co"),
            plan("Telstra", Fixed,  25.0,  Regional, 80.0,  "NBN Co"),
            plan("Telstra", Fixed,  50.0,  Regional, 90.0,  "NBN Co"),
            plan("Telstra", Fixed,  25.0,  Remote,   95.0,  "NBN Co"),
            plan("TPG",     Mobile, 30.0,  Regional, 35.0,  "TPG"),
            plan("TPG",     Mobile, 100.0, Regional, 50.0,  "TPG"),
            plan("TPG",     Fixed,  12.0,  Urban,    50.0,  "NBN Co"),
            plan("TPG",     Fixed,  50.0,  Urban,    70.0,  "NBN Co"),
            plan("TPG",     Fixed,  100.0, Urban,    85.0,  "NBN Co"),
            plan("TPG",     Fixed,  50.0,  Regional, 72.0,  "NBN Co"),
            plan("Optus",   Mobile, 40.0,  Regional, 45.0,  "Optus"),
            plan("Optus",   Mobile, 120.0, Regional, 60.0,  "Optus"),
            plan("Optus",   Fixed,  25.0,  Urban,    65.0,  "NBN Co"),
            plan("Optus",   Fixed,  50.0,  Urban,    79.0,  "NBN Co"),
            plan("Optus",   Fixed,  250.0, Urban,    99.0,  "NBN Co"),
            plan("Optus",   Fixed,  50.0,  Regional, 80.0,  "NBN Co"),
            plan("Vodafone", Mobile, 15.0, Regional, 25.0,  "TPG"),
            plan("Vodafone", Mobile, 60.0, Regional, 40.0,  "TPG"),
            plan("Vodafone", Mobile, 150.0, Regional, 55.0, "TPG"),
            plan("Aussie",  Fixed,  25.0,  Urban,    69.0,  "NBN Co"),
            plan("Aussie",  Fixed,  100.0, Urban,    89.0,  "NBN Co"),
            plan("Aussie",  Fixed,  50.0,  Regional, 79.0,  "NBN Co"),
            plan("Aussie",  Fixed,  25.0,  Remote,   85.0,  "NBN Co"),
            plan("Kogan",   Mobile, 10.0,  Remote,   15.0,  "TPG"),
            plan("Kogan",   Mobile, 40.0,  Regional, 25.0,  "TPG"),
            plan("Kogan",   Fixed,  12.0,  Urban,    55.0,  "NBN Co"),
            plan("Kogan",   Fixed,  50.0,  Urban,    68.0,  "NBN Co"),
            plan("SkyMesh", Fixed,  12.0,  Remote,   50.0,  "NBN Co"),
            plan("SkyMesh", Fixed,  25.0,  Remote,   65.0,  "NBN Co"),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixture_loads_for_any_money_pool() {
        for pool in [0.0, 1_000.0, 5_000_000.0] {
            let market = MarketCatalogue::fixture(pool).unwrap();
            assert_eq!(market.firms.len(), 7);
            assert!(market.firms.iter().all(|f| !f.plans.is_empty()));
        }
    }

    #[test]
    fn fixture_index_matches_capabilities() {
        let market = MarketCatalogue::fixture(1_000.0).unwrap();
        // Telstra's remote mobile plans put it in every quadrant.
        for q in Quadrant::ALL {
            assert!(market.index.operators(q).contains(&0));
        }
        // SkyMesh is satellite-only: never urban.
        let skymesh = market.firms.iter().position(|f| f.name == "SkyMesh").unwrap();
        assert!(!market.index.operators(Quadrant::Urban).contains(&skymesh));
        assert!(market.index.operators(Quadrant::Remote).contains(&skymesh));
    }

    #[test]
    fn initial_profits_are_normalised_shares() {
        let market = MarketCatalogue::fixture(1_000.0).unwrap();
        let total: f64 = market.firms.iter().map(|f| f.profit).sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert!(market.firms.iter().all(|f| f.savings == 1_000.0));
    }

    #[test]
    fn unknown_firm_in_plan_table_rejected() {
        let mut file = fixture_file();
        file.plans[0].firm = "Nobody".into();
        assert!(matches!(
            MarketCatalogue::from_file(file, 1.0),
            Err(SimError::InvalidCatalogue(_))
        ));
    }

    #[test]
    fn remove_firm_clears_every_quadrant() {
        let mut market = MarketCatalogue::fixture(1_000.0).unwrap();
        assert!(market.index.remove_firm(0));
        assert!(!market.index.contains(0));
        assert!(!market.index.remove_firm(0));
    }
}
