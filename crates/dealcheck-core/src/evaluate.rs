//! Price classification of a scanned item against its competing offers.

use crate::types::{CanonicalItem, Recommendation, Verdict};

/// Relative margin separating `SO-SO` from `NO DEAL` (5%).
pub const PRICE_MARGIN: f64 = 0.05;

/// How many offers a `DEAL` verdict carries as recommendations.
const DEAL_RECOMMENDATIONS: usize = 2;
/// How many offers a `NO DEAL` verdict carries as recommendations.
const NO_DEAL_RECOMMENDATIONS: usize = 3;

/// Classify `item.price` against `offers` and attach verdict + recommendations.
///
/// `offers` must already be sorted ascending by price; the first element is
/// treated as the cheapest competing offer. With no offers at all, the item
/// defaults to [`Verdict::Deal`] unless it already carries a verdict, which
/// is preserved unchanged. Re-evaluating the same pair is deterministic and
/// idempotent: no history, no hysteresis.
#[must_use]
pub fn evaluate(mut item: CanonicalItem, offers: &[Recommendation]) -> CanonicalItem {
    let Some(cheapest) = offers.first().map(|offer| offer.price) else {
        if item.verdict.is_none() {
            item.verdict = Some(Verdict::Deal);
        }
        return item;
    };

    if item.price <= cheapest {
        item.verdict = Some(Verdict::Deal);
        item.recommendations = offers.iter().take(DEAL_RECOMMENDATIONS).cloned().collect();
    } else if item.price <= cheapest * (1.0 + PRICE_MARGIN) {
        // Recommendations here are the offers priced within the margin of the
        // *scanned* price, not necessarily the cheapest ones; an offer dearer
        // than the scanned price can qualify.
        item.verdict = Some(Verdict::SoSo);
        item.recommendations = offers
            .iter()
            .filter(|offer| relative_difference(offer.price, item.price) <= PRICE_MARGIN)
            .cloned()
            .collect();
    } else {
        item.verdict = Some(Verdict::NoDeal);
        item.recommendations = offers
            .iter()
            .take(NO_DEAL_RECOMMENDATIONS)
            .cloned()
            .collect();
    }

    item
}

/// `|offer - scanned| / scanned`. Only reached when `scanned > 0`: the
/// `SO-SO` branch requires `scanned > cheapest >= 0`.
fn relative_difference(offer: f64, scanned: f64) -> f64 {
    (offer - scanned).abs() / scanned
}
