/// Candidate tick steps, smallest first.
pub const NICE_STEPS: [f64; 12] = [
    0.001, 0.002, 0.005, 0.01, 0.02, 0.025, 0.05, 0.1, 0.2, 0.25, 0.5, 1.0,
];

/// Pick the step from [`NICE_STEPS`] closest to `span / (ticks - 1)`.
///
/// Ties keep the smaller step.
pub fn nice_step(span: f64, ticks: usize) -> f64 {
    let rough = span / (ticks.max(2) - 1) as f64;
    NICE_STEPS
        .iter()
        .copied()
        .fold(NICE_STEPS[0], |best, s| {
            if (s - rough).abs() < (best - rough).abs() {
                s
            } else {
                best
            }
        })
}

/// Decimal places for axis labels given the visible span.
pub fn label_precision(span: f64) -> usize {
    if span <= 0.005 {
        3
    } else if span <= 0.05 {
        2
    } else if span <= 0.5 {
        1
    } else {
        0
    }
}

/// Tick values inside `[min, max)` spaced by `step`, anchored on multiples of `step`.
pub fn tick_values(min: f64, max: f64, step: f64) -> Vec<f64> {
    if !(step > 0.0) || !(max > min) {
        return Vec::new();
    }
    let first = (min / step).floor() as i64;
    let mut out = Vec::new();
    let mut k = first;
    loop {
        let v = k as f64 * step;
        if v >= max {
            break;
        }
        // Tolerate float noise at the lower edge so `min` itself still gets a tick.
        if v >= min - step * 1e-9 {
            out.push(v);
        }
        k += 1;
    }
    out
}
