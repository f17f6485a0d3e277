//! Scalar reductions over value sequences.
//!
//! `None` is the "undefined" sentinel: mean/min/max over nothing, and
//! percentile/mode/correlation over fewer than two values.

use std::collections::BTreeMap;

use statrs::statistics::Statistics;

/// Minimum sample size for percentile, mode and correlation.
pub const MIN_SAMPLES: usize = 2;

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().mean())
}

pub fn min(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::min)
}

pub fn max(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::max)
}

/// Quantile `q` in `[0, 1]` by linear interpolation between the two
/// nearest order statistics.
pub fn percentile(values: &[f64], q: f64) -> Option<f64> {
    if values.len() < MIN_SAMPLES || !(0.0..=1.0).contains(&q) {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let h = (sorted.len() - 1) as f64 * q;
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    Some(sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo]))
}

pub fn p95(values: &[f64]) -> Option<f64> {
    percentile(values, 0.95)
}

/// Most frequent value. Ties resolve to the smallest value in `Ord` order.
pub fn mode<T: Ord + Clone>(values: impl IntoIterator<Item = T>) -> Option<T> {
    let mut counts: BTreeMap<T, usize> = BTreeMap::new();
    let mut n = 0usize;
    for v in values {
        *counts.entry(v).or_insert(0) += 1;
        n += 1;
    }
    if n < MIN_SAMPLES {
        return None;
    }

    let mut best: Option<(&T, usize)> = None;
    for (value, &count) in &counts {
        if best.is_none_or(|(_, c)| count > c) {
            best = Some((value, count));
        }
    }
    best.map(|(v, _)| v.clone())
}

/// `hits / total * 100`, undefined when `total` is zero.
pub fn rate_pct(hits: usize, total: usize) -> Option<f64> {
    if total == 0 {
        None
    } else {
        Some(hits as f64 / total as f64 * 100.0)
    }
}

/// Pearson correlation of paired samples. Undefined for fewer than two
/// pairs, mismatched lengths, or a constant series.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < MIN_SAMPLES {
        return None;
    }
    let sx = xs.iter().std_dev();
    let sy = ys.iter().std_dev();
    if !(sx > 1e-12 && sy > 1e-12) {
        return None;
    }
    let cov = xs.iter().covariance(ys.iter());
    Some((cov / (sx * sy)).clamp(-1.0, 1.0))
}

/// `last - first`, undefined for an empty sequence.
pub fn delta(values: &[f64]) -> Option<f64> {
    Some(values.last()? - values.first()?)
}
