//! Scoring candidates and the minimum-quality tie-break.

use crate::{
    household::Bundle,
    market::MarketCatalogue,
    rng::DrawSource,
    types::PlanId,
};

/// Price of the synthetic "nothing chosen yet" baseline. Any affordable
/// candidate undercuts it.
pub const PLACEHOLDER_PRICE: f64 = 1e9;

/// One option a household may pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Candidate {
    Complete { mobile: PlanId, fixed: PlanId },
    Mobile(PlanId),
    Fixed(PlanId),
}

impl Candidate {
    pub fn bundle(&self) -> Bundle {
        match *self {
            Self::Complete { mobile, fixed } => Bundle::complete(mobile, fixed),
            Self::Mobile(plan)               => Bundle::mobile_only(plan),
            Self::Fixed(plan)                => Bundle::fixed_only(plan),
        }
    }

    /// The candidate equivalent of a connected bundle.
    pub fn from_bundle(bundle: &Bundle) -> Option<Self> {
        match (bundle.mobile, bundle.fixed) {
            (Some(mobile), Some(fixed)) => Some(Self::Complete { mobile, fixed }),
            (Some(mobile), None)        => Some(Self::Mobile(mobile)),
            (None, Some(fixed))         => Some(Self::Fixed(fixed)),
            (None, None)                => None,
        }
    }
}

/// Minimum-quality flags for the legs a candidate actually has.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityFlags {
    Complete { mobile: bool, fixed: bool },
    Mobile(bool),
    Fixed(bool),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub price:   f64,
    /// Capacity relative to the best in the candidate set, in [0, 1].
    pub value:   f64,
    pub quality: QualityFlags,
}

/// What a candidate is compared against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Baseline {
    Placeholder,
    Current(Evaluation),
}

impl Baseline {
    pub fn price(&self) -> f64 {
        match self {
            Self::Placeholder   => PLACEHOLDER_PRICE,
            Self::Current(eval) => eval.price,
        }
    }

    pub fn value(&self) -> f64 {
        match self {
            Self::Placeholder   => 0.0,
            Self::Current(eval) => eval.value,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::Placeholder)
    }
}

struct Leg {
    price:    f64,
    capacity: f64,
    good:     bool,
}

fn leg(market: &MarketCatalogue, id: PlanId) -> Leg {
    match market.plan(id) {
        Some(plan) => Leg {
            price:    plan.price,
            capacity: plan.capacity,
            good:     plan.meets_minimum_quality(),
        },
        None => Leg { price: 0.0, capacity: 0.0, good: false },
    }
}

fn ratio(capacity: f64, max: f64) -> f64 {
    if max > 0.0 { capacity / max } else { 0.0 }
}

/// Score every candidate in the set. Value is normalised against the
/// largest capacity present, averaged over both legs for complete bundles.
pub fn evaluate(candidates: &[Candidate], market: &MarketCatalogue) -> Vec<Evaluation> {
    let mut max_mobile: f64 = 0.0;
    let mut max_fixed: f64 = 0.0;
    let mut max_single: f64 = 0.0;
    for candidate in candidates {
        match *candidate {
            Candidate::Complete { mobile, fixed } => {
                max_mobile = max_mobile.max(leg(market, mobile).capacity);
                max_fixed = max_fixed.max(leg(market, fixed).capacity);
            }
            Candidate::Mobile(plan) | Candidate::Fixed(plan) => {
                max_single = max_single.max(leg(market, plan).capacity);
            }
        }
    }

    candidates
        .iter()
        .map(|candidate| match *candidate {
            Candidate::Complete { mobile, fixed } => {
                let (m, f) = (leg(market, mobile), leg(market, fixed));
                Evaluation {
                    price:   m.price + f.price,
                    value:   (ratio(m.capacity, max_mobile) + ratio(f.capacity, max_fixed)) / 2.0,
                    quality: QualityFlags::Complete { mobile: m.good, fixed: f.good },
                }
            }
            Candidate::Mobile(plan) => {
                let m = leg(market, plan);
                Evaluation {
                    price:   m.price,
                    value:   ratio(m.capacity, max_single),
                    quality: QualityFlags::Mobile(m.good),
                }
            }
            Candidate::Fixed(plan) => {
                let f = leg(market, plan);
                Evaluation {
                    price:   f.price,
                    value:   ratio(f.capacity, max_single),
                    quality: QualityFlags::Fixed(f.good),
                }
            }
        })
        .collect()
}

enum Tie {
    PickCheaper,
    PickBetterValue,
}

/// Ranking of (mobile-ok, fixed-ok) pairs between two complete bundles.
/// `Err` is a settled answer, `Ok` a tie to break.
fn complete_matrix(new: (bool, bool), current: (bool, bool), sacrifice: bool) -> Result<Tie, bool> {
    match (new, current) {
        ((true, true), (true, true))   => Ok(Tie::PickCheaper),
        ((true, true), _)              => Err(true),
        ((true, false), (true, true))  => Err(false),
        ((true, false), (true, false)) => Ok(Tie::PickCheaper),
        ((true, false), (false, true)) => Err(sacrifice),
        ((true, false), (false, false)) => Err(true),
        ((false, true), (true, true))  => Err(false),
        ((false, true), (true, false)) => Err(!sacrifice),
        ((false, true), (false, true)) => Ok(Tie::PickCheaper),
        ((false, true), (false, false)) => Err(true),
        ((false, false), (false, false)) => Ok(Tie::PickBetterValue),
        ((false, false), _)            => Err(false),
    }
}

/// Ranking of two single-service candidates of the same kind.
fn single_matrix(new: bool, current: bool) -> Result<Tie, bool> {
    match (new, current) {
        (true, true)   => Ok(Tie::PickCheaper),
        (true, false)  => Err(true),
        (false, true)  => Err(false),
        (false, false) => Ok(Tie::PickBetterValue),
    }
}

/// Does `new` displace `current` under the minimum-quality strategy?
///
/// Consumes exactly one draw per call. The draw decides the sacrifice
/// branch: with probability `pr_sacrifice_wifi` the option whose mobile
/// leg is good enough wins over the one whose fixed-line leg is.
pub fn new_beats_current(
    new: &Evaluation,
    current: &Baseline,
    pr_sacrifice_wifi: f64,
    rng: &mut DrawSource,
) -> bool {
    let sacrifice = rng.next_f64() < pr_sacrifice_wifi;

    let current = match current {
        Baseline::Placeholder   => return true,
        Baseline::Current(eval) => eval,
    };

    let ranking = match (new.quality, current.quality) {
        (
            QualityFlags::Complete { mobile: nm, fixed: nf },
            QualityFlags::Complete { mobile: cm, fixed: cf },
        ) => complete_matrix((nm, nf), (cm, cf), sacrifice),
        (QualityFlags::Complete { .. }, _) => Err(true),
        (_, QualityFlags::Complete { .. }) => Err(false),
        (QualityFlags::Mobile(_), QualityFlags::Fixed(_)) => Err(sacrifice),
        (QualityFlags::Fixed(_), QualityFlags::Mobile(_)) => Err(!sacrifice),
        (QualityFlags::Mobile(n), QualityFlags::Mobile(c)) => single_matrix(n, c),
        (QualityFlags::Fixed(n), QualityFlags::Fixed(c))   => single_matrix(n, c),
    };

    match ranking {
        Err(settled)              => settled,
        Ok(Tie::PickCheaper)      => new.price <= current.price,
        Ok(Tie::PickBetterValue)  => new.value >= current.value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(price: f64, value: f64, quality: QualityFlags) -> Evaluation {
        Evaluation { price, value, quality }
    }

    fn complete(m: bool, f: bool) -> QualityFlags {
        QualityFlags::Complete { mobile: m, fixed: f }
    }

    #[test]
    fn every_comparison_consumes_one_draw() {
        let mut rng = DrawSource::new(1);
        let a = eval(50.0, 0.5, complete(true, true));
        new_beats_current(&a, &Baseline::Placeholder, 0.5, &mut rng);
        new_beats_current(&a, &Baseline::Current(a), 0.5, &mut rng);
        assert_eq!(rng.draws(), 2);
    }

    #[test]
    fn both_qualified_outranks_partial_quality() {
        let mut rng = DrawSource::new(2);
        let good = eval(120.0, 0.4, complete(true, true));
        let partial = eval(60.0, 0.9, complete(true, false));
        assert!(new_beats_current(&good, &Baseline::Current(partial), 0.5, &mut rng));
        assert!(!new_beats_current(&partial, &Baseline::Current(good), 0.5, &mut rng));
    }

    #[test]
    fn equal_quality_prefers_cheaper() {
        let mut rng = DrawSource::new(3);
        let cheap = eval(60.0, 0.1, complete(true, true));
        let dear = eval(90.0, 1.0, complete(true, true));
        assert!(new_beats_current(&cheap, &Baseline::Current(dear), 0.5, &mut rng));
        assert!(!new_beats_current(&dear, &Baseline::Current(cheap), 0.5, &mut rng));
    }

    #[test]
    fn neither_qualified_prefers_value() {
        let mut rng = DrawSource::new(4);
        let rich = eval(90.0, 0.9, complete(false, false));
        let poor = eval(40.0, 0.2, complete(false, false));
        assert!(new_beats_current(&rich, &Baseline::Current(poor), 0.5, &mut rng));
    }

    #[test]
    fn sacrifice_probability_extremes() {
        let mobile_good = eval(70.0, 0.5, complete(true, false));
        let fixed_good = eval(70.0, 0.5, complete(false, true));
        let mut rng = DrawSource::new(5);
        for _ in 0..20 {
            assert!(new_beats_current(&mobile_good, &Baseline::Current(fixed_good), 1.0, &mut rng));
            assert!(!new_beats_current(&fixed_good, &Baseline::Current(mobile_good), 1.0, &mut rng));
            assert!(!new_beats_current(&mobile_good, &Baseline::Current(fixed_good), 0.0, &mut rng));
            assert!(new_beats_current(&fixed_good, &Baseline::Current(mobile_good), 0.0, &mut rng));
        }
    }

    #[test]
    fn complete_bundle_outranks_single_service() {
        let mut rng = DrawSource::new(6);
        let bundle = eval(200.0, 0.0, complete(false, false));
        let single = eval(10.0, 1.0, QualityFlags::Mobile(true));
        assert!(new_beats_current(&bundle, &Baseline::Current(single), 0.5, &mut rng));
        assert!(!new_beats_current(&single, &Baseline::Current(bundle), 0.5, &mut rng));
    }

    #[test]
    fn values_are_normalised_per_leg() {
        let market = MarketCatalogue::fixture(1_000.0).unwrap();
        // Telstra 20GB + 25Mbps, Telstra 180GB + 100Mbps.
        let small = Candidate::Complete { mobile: PlanId::new(0, 0), fixed: PlanId::new(0, 3) };
        let large = Candidate::Complete { mobile: PlanId::new(0, 2), fixed: PlanId::new(0, 5) };
        let evals = evaluate(&[small, large], &market);
        assert!((evals[1].value - 1.0).abs() < 1e-12);
        let expected = (20.0 / 180.0 + 25.0 / 100.0) / 2.0;
        assert!((evals[0].value - expected).abs() < 1e-12);
        assert_eq!(evals[0].price, 120.0);
        assert_eq!(evals[0].quality, complete(false, false));
        assert_eq!(evals[1].quality, complete(true, true));
    }
}
