//! Numeric helpers behind averages, rankings, composite scores and range filters.
use serde::Serialize;
use std::cmp::Ordering;

/// Entries reported by a ranking.
pub const TOP_N: usize = 3;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Order {
    Ascending,
    Descending,
}

/// Mean of the values; `None` when there are none.
pub fn average(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Count, mean and extremes of a set of values.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct Summary {
    pub count: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

impl Summary {
    pub fn of(values: &[f64]) -> Option<Self> {
        let mean = average(values)?;
        Some(Summary {
            count: values.len(),
            mean,
            min: values.iter().copied().fold(f64::INFINITY, f64::min),
            max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        })
    }
}

/// Sorts `(label, value)` pairs and keeps the first `limit`. Ties keep their input order.
pub fn rank<T: Clone>(pairs: &[(T, f64)], order: Order, limit: usize) -> Vec<(T, f64)> {
    let mut sorted = pairs.to_vec();
    sorted.sort_by(|(_, a), (_, b)| {
        let ordering = a.partial_cmp(b).unwrap_or(Ordering::Equal);
        match order {
            Order::Ascending => ordering,
            Order::Descending => ordering.reverse(),
        }
    });
    sorted.truncate(limit);
    sorted
}

/// Weighted sum of `values` by `weights`; `None` when any weighted value is missing.
pub fn weighted_score(values: &[Option<f64>], weights: &[f64]) -> Option<f64> {
    values
        .iter()
        .zip(weights)
        .map(|(value, weight)| value.map(|value| value * weight))
        .sum()
}

/// Inclusive bounds check. An inverted range holds nothing.
pub fn within(value: f64, min: f64, max: f64) -> bool {
    min <= value && value <= max
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn average_of_nothing_is_none() {
        assert_eq!(average(&[]), None);
        assert_eq!(average(&[2.0, 4.0, 6.0]), Some(4.0));
    }

    #[test]
    fn summary() {
        let summary = Summary::of(&[3.0, -1.0, 4.0]).unwrap();
        assert_eq!(summary.count, 3);
        assert_eq!(summary.min, -1.0);
        assert_eq!(summary.max, 4.0);
        assert!(Summary::of(&[]).is_none());
    }

    #[test]
    fn ranking_is_stable() {
        let pairs = vec![("A", 5.0), ("B", 3.0), ("C", 5.0), ("D", 3.0), ("E", 1.0)];
        assert_eq!(rank(&pairs, Order::Descending, TOP_N), vec![("A", 5.0), ("C", 5.0), ("B", 3.0)]);
        assert_eq!(rank(&pairs, Order::Ascending, TOP_N), vec![("E", 1.0), ("B", 3.0), ("D", 3.0)]);
        assert_eq!(rank(&pairs[..1], Order::Ascending, TOP_N), vec![("A", 5.0)]);
    }

    #[test]
    fn score_requires_every_metric() {
        assert_eq!(weighted_score(&[Some(10.0), Some(2.0)], &[-0.5, 1.0]), Some(-3.0));
        assert_eq!(weighted_score(&[Some(10.0), None], &[-0.5, 1.0]), None);
    }

    #[test]
    fn range_bounds_are_inclusive() {
        assert!(within(5.0, 5.0, 10.0));
        assert!(within(10.0, 5.0, 10.0));
        assert!(!within(10.5, 5.0, 10.0));
        assert!(!within(7.0, 10.0, 5.0));
    }

    proptest! {
        #[test]
        fn average_matches_numeric_subset(values in prop::collection::vec(prop::option::of(-1e6f64..1e6), 0..40)) {
            let numeric: Vec<f64> = values.iter().flatten().copied().collect();
            match average(&numeric) {
                None => prop_assert!(numeric.is_empty()),
                Some(mean) => {
                    let expected = numeric.iter().sum::<f64>() / numeric.len() as f64;
                    prop_assert!((mean - expected).abs() < 1e-9);
                }
            }
        }
    }
}
