//! Which operators a household looks at.
//!
//! Consideration is weighted by marketing spend and drawn without
//! replacement, one draw per pick, up to the household's time budget.
//! Afterwards the mobile and fixed-line offer lists are topped up towards
//! equal length while candidates remain. Balance is best effort: when the
//! candidates run out the lists may stay uneven.

use crate::{
    market::MarketCatalogue,
    rng::DrawSource,
    types::{FirmId, Quadrant},
};

/// Every operator keeps at least this probability of being considered.
pub const MIN_CONSIDERATION_PROBABILITY: f64 = 0.001;

/// Operators drawn for one household, split by the service they offer in
/// its quadrant. A firm offering both appears in both lists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OfferLists {
    pub mobile: Vec<FirmId>,
    pub fixed:  Vec<FirmId>,
}

/// Marketing spend of each operator in `quadrant`, in index order.
pub fn marketing_weights(market: &MarketCatalogue, quadrant: Quadrant, marketing_budget: f64) -> Vec<f64> {
    market
        .index
        .operators(quadrant)
        .iter()
        .map(|id| market.firms[*id].marketing_spend(marketing_budget))
        .collect()
}

/// Normalise spend into a probability vector, lift every entry to the
/// floor, and correct the total back to 1.
///
/// A shortfall is added to one bucket picked with a single draw. An excess
/// is shaved from buckets above the floor in order; anything left once
/// every bucket sits at the floor comes off the last bucket.
pub fn consideration_probabilities(weights: &[f64], rng: &mut DrawSource) -> Vec<f64> {
    if weights.is_empty() {
        return Vec::new();
    }

    let positive: Vec<f64> = weights.iter().map(|w| w.max(0.0)).collect();
    let total: f64 = positive.iter().sum();
    let mut probs: Vec<f64> = if total > 0.0 && total.is_finite() {
        positive.iter().map(|w| w / total).collect()
    } else {
        log::warn!("consideration: operator weights carry no mass; using uniform probabilities");
        vec![1.0 / weights.len() as f64; weights.len()]
    };

    for p in probs.iter_mut() {
        *p = p.max(MIN_CONSIDERATION_PROBABILITY);
    }

    let total: f64 = probs.iter().sum();
    if total == 1.0 {
        return probs;
    }

    if total < 1.0 {
        let bucket = rng.next_below(probs.len());
        probs[bucket] += 1.0 - total;
        return probs;
    }

    let mut excess = total - 1.0;
    for p in probs.iter_mut() {
        if excess <= 0.0 {
            break;
        }
        let room = *p - MIN_CONSIDERATION_PROBABILITY;
        if room > 0.0 {
            let shave = room.min(excess);
            *p -= shave;
            excess -= shave;
        }
    }
    if excess > 0.0 {
        if let Some(last) = probs.last_mut() {
            *last -= excess;
        }
    }
    probs
}

/// Pick one of the remaining candidates, remove it, and renormalise the
/// rest.
fn draw_without_replacement(
    candidates: &mut Vec<FirmId>,
    probs: &mut Vec<f64>,
    rng: &mut DrawSource,
) -> FirmId {
    let pick = rng.weighted_index(probs);
    let firm = candidates.remove(pick);
    probs.remove(pick);

    let sum: f64 = probs.iter().sum();
    if sum > 0.0 {
        for p in probs.iter_mut() {
            *p /= sum;
        }
    }
    firm
}

/// Draw the operators a household in `quadrant` will look at.
pub fn pick_operators(
    market: &MarketCatalogue,
    quadrant: Quadrant,
    time_budget: usize,
    marketing_budget: f64,
    rng: &mut DrawSource,
) -> OfferLists {
    let mut candidates: Vec<FirmId> = market.index.operators(quadrant).to_vec();
    let weights = marketing_weights(market, quadrant, marketing_budget);
    let mut probs = consideration_probabilities(&weights, rng);
    let mut offers = OfferLists::default();

    let mut budget = time_budget.min(candidates.len());
    while budget > 0 && !candidates.is_empty() {
        let id = draw_without_replacement(&mut candidates, &mut probs, rng);
        let firm = &market.firms[id];
        if firm.offers_mobile_in(quadrant) {
            offers.mobile.push(id);
            if firm.offers_fixed_in(quadrant) {
                offers.fixed.push(id);
            }
            budget -= 1;
        } else if firm.offers_fixed_in(quadrant) {
            offers.fixed.push(id);
            budget -= 1;
        }
    }

    while !candidates.is_empty() && offers.mobile.len() > offers.fixed.len() {
        let id = draw_without_replacement(&mut candidates, &mut probs, rng);
        if market.firms[id].offers_fixed_in(quadrant) {
            offers.fixed.push(id);
        }
    }

    while !candidates.is_empty() && offers.mobile.len() < offers.fixed.len() {
        let id = draw_without_replacement(&mut candidates, &mut probs, rng);
        if market.firms[id].offers_mobile_in(quadrant) {
            offers.mobile.push(id);
        }
    }

    offers
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sums_to_one(probs: &[f64]) -> bool {
        (probs.iter().sum::<f64>() - 1.0).abs() <= 1e-9
    }

    #[test]
    fn probabilities_sum_to_one_for_skewed_weights() {
        let mut rng = DrawSource::new(11);
        let cases: Vec<Vec<f64>> = vec![
            vec![1.0],
            vec![1.0, 0.0, 0.0, 0.0],
            vec![1e9, 1.0, 1.0],
            vec![0.3, 0.3, 0.4],
            vec![5.0, -2.0, 0.0, 7.5, 1e-6],
            (0..40).map(|i| i as f64).collect(),
        ];
        for weights in cases {
            let probs = consideration_probabilities(&weights, &mut rng);
            assert_eq!(probs.len(), weights.len());
            assert!(sums_to_one(&probs), "{weights:?} -> {probs:?}");
        }
    }

    #[test]
    fn floor_keeps_every_operator_in_play() {
        let mut rng = DrawSource::new(5);
        let probs = consideration_probabilities(&[1e12, 1.0, 0.0], &mut rng);
        assert!(probs.iter().all(|p| *p >= MIN_CONSIDERATION_PROBABILITY - 1e-12));
    }

    #[test]
    fn zero_mass_falls_back_to_uniform() {
        let mut rng = DrawSource::new(5);
        let probs = consideration_probabilities(&[0.0, 0.0, 0.0, 0.0], &mut rng);
        assert!(sums_to_one(&probs));
        assert!(probs.iter().all(|p| (p - 0.25).abs() < 1e-9));
    }

    #[test]
    fn operators_are_unique_and_local() {
        let market = MarketCatalogue::fixture(1_000.0).unwrap();
        let mut rng = DrawSource::new(99);
        for q in Quadrant::ALL {
            let offers = pick_operators(&market, q, 3, 0.1, &mut rng);
            for id in &offers.mobile {
                assert!(market.firms[*id].offers_mobile_in(q));
            }
            for id in &offers.fixed {
                assert!(market.firms[*id].offers_fixed_in(q));
            }
            let mut mobile = offers.mobile.clone();
            mobile.dedup();
            assert_eq!(mobile.len(), offers.mobile.len());
        }
    }

    #[test]
    fn time_budget_is_clamped_to_available_operators() {
        let market = MarketCatalogue::fixture(1_000.0).unwrap();
        let mut rng = DrawSource::new(3);
        let offers = pick_operators(&market, Quadrant::Remote, 50, 0.1, &mut rng);
        let available = market.index.operators(Quadrant::Remote).len();
        assert!(offers.mobile.len() <= available);
        assert!(offers.fixed.len() <= available);
    }
}
