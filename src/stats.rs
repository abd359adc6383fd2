// 📊 Small population statistics shared by the loader and the gap filler

use std::collections::BTreeMap;

/// Median of the given values, `None` when empty.
/// Even-sized inputs average the two middle values.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Median as an integer, fraction truncated toward zero (1985.5 → 1985).
pub fn truncated_median(values: &[f64]) -> Option<i64> {
    median(values).map(|m| m.trunc() as i64)
}

/// Most frequent value. Ties go to the smallest value so the result never
/// depends on input order.
pub fn mode<T, I>(values: I) -> Option<T>
where
    T: Ord + Clone,
    I: IntoIterator<Item = T>,
{
    let mut counts: BTreeMap<T, usize> = BTreeMap::new();
    for value in values {
        *counts.entry(value).or_insert(0) += 1;
    }

    let mut best: Option<(T, usize)> = None;
    for (value, count) in counts {
        // Ascending key order: only a strictly larger count replaces the leader
        match &best {
            Some((_, best_count)) if count <= *best_count => {}
            _ => best = Some((value, count)),
        }
    }

    best.map(|(value, _)| value)
}

/// Key with the largest summed weight. Ties go to the smallest key.
pub fn weighted_argmax<K, I>(pairs: I) -> Option<K>
where
    K: Ord + Clone,
    I: IntoIterator<Item = (K, f64)>,
{
    let sums = group_sums(pairs);

    let mut best: Option<(K, f64)> = None;
    for (key, sum) in sums {
        match &best {
            Some((_, best_sum)) if sum <= *best_sum => {}
            _ => best = Some((key, sum)),
        }
    }

    best.map(|(key, _)| key)
}

/// Sum weights per key, keys in ascending order.
pub fn group_sums<K, I>(pairs: I) -> BTreeMap<K, f64>
where
    K: Ord,
    I: IntoIterator<Item = (K, f64)>,
{
    let mut sums: BTreeMap<K, f64> = BTreeMap::new();
    for (key, weight) in pairs {
        *sums.entry(key).or_insert(0.0) += weight;
    }
    sums
}

pub fn round5(value: f64) -> f64 {
    (value * 1e5).round() / 1e5
}
