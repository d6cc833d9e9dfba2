//! Distribution binning and shape statistics.
//!
//! Shape statistics use the bias-corrected sample formulas (third and
//! fourth standardized moments). Degenerate inputs — too few points or a
//! zero-variance distribution — yield 0.0 rather than NaN so a term
//! appearing uniformly across the corpus is reported with defined values.

/// Partition `values` into `bins` contiguous, near-equal-size groups in
/// order, summing each group.
///
/// `bins` is clamped to `[1, values.len()]`; with `bins == values.len()`
/// the result is the input unchanged.
pub fn bin<T>(values: &[T], bins: usize) -> Vec<T>
where
    T: Copy + Default + std::ops::AddAssign,
{
    if values.is_empty() {
        return Vec::new();
    }
    let bins = bins.clamp(1, values.len());
    let mut out = vec![T::default(); bins];
    for (i, &value) in values.iter().enumerate() {
        // Near-equal contiguous groups: position i lands in bin i*b/n.
        out[i * bins / values.len()] += value;
    }
    out
}

fn moments(values: &[f64]) -> Option<(f64, f64, f64, f64)> {
    let n = values.len();
    if n == 0 {
        return None;
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    let mut m2 = 0.0;
    let mut m3 = 0.0;
    let mut m4 = 0.0;
    for &v in values {
        let d = v - mean;
        m2 += d * d;
        m3 += d * d * d;
        m4 += d * d * d * d;
    }
    Some((mean, m2, m3, m4))
}

fn is_constant(values: &[f64]) -> bool {
    values
        .windows(2)
        .all(|w| (w[0] - w[1]).abs() <= f64::EPSILON)
}

/// Bias-corrected sample skewness of a distribution.
///
/// Returns 0.0 for fewer than three points or a constant distribution.
pub fn skewness(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 3 || is_constant(values) {
        return 0.0;
    }
    let Some((_, m2, m3, _)) = moments(values) else {
        return 0.0;
    };
    let variance = m2 / (n as f64 - 1.0);
    if variance <= 0.0 {
        return 0.0;
    }
    let n = n as f64;
    (n / ((n - 1.0) * (n - 2.0))) * m3 / variance.powf(1.5)
}

/// Bias-corrected sample excess kurtosis ("peakedness") of a distribution.
///
/// Returns 0.0 for fewer than four points or a constant distribution.
pub fn peakedness(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 4 || is_constant(values) {
        return 0.0;
    }
    let Some((_, m2, _, m4)) = moments(values) else {
        return 0.0;
    };
    let variance = m2 / (n as f64 - 1.0);
    if variance <= 0.0 {
        return 0.0;
    }
    let n = n as f64;
    let coefficient = n * (n + 1.0) / ((n - 1.0) * (n - 2.0) * (n - 3.0));
    let correction = 3.0 * (n - 1.0) * (n - 1.0) / ((n - 2.0) * (n - 3.0));
    coefficient * m4 / (variance * variance) - correction
}
