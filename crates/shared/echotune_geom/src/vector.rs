/// Tolerance used when checking that a weight triple sums to one.
pub const SUM_TOLERANCE: f64 = 1e-6;

/// Below this mass a component (or a pair of components) is treated as empty.
pub const EPSILON: f64 = 1e-9;

/// Clamp into `[0, 1]`. `NaN` collapses to `0.0`.
#[inline]
pub fn clamp01(v: f64) -> f64 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

/// Scale a triple so it sums to exactly one.
///
/// Negative and non-finite components are treated as zero. A triple with no
/// usable mass falls back to an equal split.
pub fn normalize3(v: [f64; 3]) -> [f64; 3] {
    let cleaned = v.map(|x| if x.is_finite() && x > 0.0 { x } else { 0.0 });
    let total: f64 = cleaned.iter().sum();
    if total <= EPSILON {
        return [1.0 / 3.0; 3];
    }
    let mut out = cleaned.map(|x| x / total);
    // Push the rounding residue into the largest component so the sum is exact.
    let residue = 1.0 - out.iter().sum::<f64>();
    if residue != 0.0 {
        let largest = (0..3)
            .max_by(|&a, &b| out[a].total_cmp(&out[b]))
            .unwrap_or(0);
        out[largest] = (out[largest] + residue).max(0.0);
    }
    out
}

pub fn is_normalized(v: &[f64; 3]) -> bool {
    v.iter().all(|&x| x >= 0.0) && (v.iter().sum::<f64>() - 1.0).abs() <= SUM_TOLERANCE
}
