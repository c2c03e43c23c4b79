use crate::series::{CanonicalSeries, VariationSeries};
use tracing::{debug, warn};

/// Index value assigned to the period just before the first variation.
pub const BASE_INDEX: f64 = 100.0;

/// Chains month-over-month percentage changes into a cumulative index.
///
/// `index[m] = index[m-1] * (1 + delta[m] / 100)`, folded left to right over
/// ascending months starting from [`BASE_INDEX`]. The output has one entry per
/// input month until the chained level stops being finite; those months are
/// left out and a warning is logged.
pub fn reconstruct_index(source: &str, variations: &VariationSeries) -> CanonicalSeries {
    let mut level = BASE_INDEX;
    let points: Vec<_> = variations
        .iter()
        .map(|(month, delta)| {
            level *= 1.0 + delta / 100.0;
            (month, level)
        })
        .collect();
    debug!(
        "reconstructed {} index points for {} (final level {:.4})",
        points.len(),
        source,
        level
    );
    let overflowed = points.iter().filter(|(_, value)| !value.is_finite()).count();
    if overflowed > 0 {
        warn!(
            "{} of {} reconstructed index levels for {} are not finite and were dropped",
            overflowed,
            points.len(),
            source
        );
    }
    CanonicalSeries::from_points(source, points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::MonthKey;

    fn m(year: i32, month: u32) -> MonthKey {
        MonthKey::new(year, month).unwrap()
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn chains_variations_from_base_100() {
        let variations = VariationSeries::from_points(vec![(m(2024, 1), 1.8), (m(2024, 2), -0.5)]);
        let index = reconstruct_index("test", &variations);
        assert_eq!(index.len(), 2);
        assert_close(index.get(m(2024, 1)).unwrap(), 101.8);
        assert_close(index.get(m(2024, 2)).unwrap(), 101.291);
    }

    #[test]
    fn reversed_variations_give_a_different_index() {
        let forward = VariationSeries::from_points(vec![(m(2024, 1), 1.8), (m(2024, 2), -0.5)]);
        let reversed = VariationSeries::from_points(vec![(m(2024, 1), -0.5), (m(2024, 2), 1.8)]);
        let a = reconstruct_index("test", &forward);
        let b = reconstruct_index("test", &reversed);
        assert_ne!(a, b);
        assert_close(b.get(m(2024, 1)).unwrap(), 99.5);
    }

    #[test]
    fn input_order_is_irrelevant_once_keyed_by_month() {
        let shuffled = VariationSeries::from_points(vec![(m(2024, 2), -0.5), (m(2024, 1), 1.8)]);
        let index = reconstruct_index("test", &shuffled);
        assert_close(index.get(m(2024, 1)).unwrap(), 101.8);
        assert_close(index.get(m(2024, 2)).unwrap(), 101.291);
    }

    #[test]
    fn single_entry_is_one_step_from_base() {
        let variations = VariationSeries::from_points(vec![(m(2017, 1), 1.6)]);
        let index = reconstruct_index("test", &variations);
        assert_close(index.get(m(2017, 1)).unwrap(), 101.6);
    }

    #[test]
    fn overflowing_levels_are_left_out() {
        let variations = VariationSeries::from_points(vec![
            (m(2024, 1), 1.0),
            (m(2024, 2), f64::MAX),
            (m(2024, 3), 1.0),
        ]);
        let index = reconstruct_index("test", &variations);
        assert_eq!(index.len(), 1);
        assert_close(index.get(m(2024, 1)).unwrap(), 101.0);
        assert!(index.get(m(2024, 2)).is_none());
    }

    #[test]
    fn empty_variations_give_empty_index() {
        let index = reconstruct_index("test", &VariationSeries::default());
        assert!(index.is_empty());
        assert_eq!(index.source(), "test");
    }
}
