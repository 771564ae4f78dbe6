use std::f64::consts::{FRAC_PI_2, PI, TAU};

/// Angle of `(dx, dy)` measured clockwise from twelve o'clock, in `[0, 2π)`.
///
/// Screen coordinates are assumed (y grows downwards), so a point straight
/// above the center is `0`, to the right is `π/2`.
pub fn angle_from_top(dx: f64, dy: f64) -> f64 {
    let mut a = dy.atan2(dx);
    if a < 0.0 {
        a += TAU;
    }
    (a + FRAC_PI_2) % TAU
}

/// Inverse of [`angle_from_top`]: the point at `radius` along `angle`.
pub fn point_on_circle(cx: f64, cy: f64, radius: f64, angle: f64) -> (f64, f64) {
    let a = angle - FRAC_PI_2;
    (cx + radius * a.cos(), cy + radius * a.sin())
}

/// Signed difference `to - from`, wrapped into `(-π, π]`.
pub fn wrap_delta(from: f64, to: f64) -> f64 {
    let mut d = (to - from) % TAU;
    if d > PI {
        d -= TAU;
    } else if d <= -PI {
        d += TAU;
    }
    d
}

/// Unsigned shortest distance between two angles.
pub fn angular_distance(a: f64, b: f64) -> f64 {
    wrap_delta(a, b).abs()
}

/// Index of the boundary closest to `angle`, if any lies within `threshold`.
///
/// Ties keep the lower index.
pub fn nearest_boundary(angle: f64, boundaries: &[f64], threshold: f64) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &b) in boundaries.iter().enumerate() {
        let d = angular_distance(angle, b);
        if d >= threshold {
            continue;
        }
        match best {
            Some((_, bd)) if bd <= d => {}
            _ => best = Some((i, d)),
        }
    }
    best.map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_is_zero_and_clockwise() {
        assert!(angle_from_top(0.0, -1.0).abs() < 1e-12);
        assert!((angle_from_top(1.0, 0.0) - FRAC_PI_2).abs() < 1e-12);
        assert!((angle_from_top(0.0, 1.0) - PI).abs() < 1e-12);
        assert!((angle_from_top(-1.0, 0.0) - 3.0 * FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn point_on_circle_round_trips_angle() {
        let (x, y) = point_on_circle(10.0, 10.0, 5.0, 1.2);
        assert!((angle_from_top(x - 10.0, y - 10.0) - 1.2).abs() < 1e-9);
    }

    #[test]
    fn wrap_delta_crosses_top() {
        let d = wrap_delta(TAU - 0.1, 0.1);
        assert!((d - 0.2).abs() < 1e-12);
        let d = wrap_delta(0.1, TAU - 0.1);
        assert!((d + 0.2).abs() < 1e-12);
    }

    #[test]
    fn nearest_boundary_respects_threshold() {
        let b = [1.0, 2.0, TAU];
        assert_eq!(nearest_boundary(1.1, &b, 0.3), Some(0));
        assert_eq!(nearest_boundary(0.05, &b, 0.3), Some(2));
        assert_eq!(nearest_boundary(1.5, &b, 0.3), None);
    }
}
