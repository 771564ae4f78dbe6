//! Weight-apportionment donut: three arcs in fixed order whose shared
//! boundaries can be dragged, plus per-weight slider input.

use std::f64::consts::TAU;

use echotune_geom::{angle_from_top, nearest_boundary, point_on_circle, wrap_delta};

use crate::model::{WeightSlot, WeightVector};
use crate::surface::{ArcShape, DrawSurface, TextAlign, LABEL_COLOR, SERIES_COLORS};

pub const CENTER: (f64, f64) = (150.0, 150.0);
pub const RADIUS: f64 = 100.0;
pub const INNER_RADIUS: f64 = 30.0;
/// Radial slack around the ring that still counts as a hit.
pub const HIT_SLACK: f64 = 10.0;
/// Angular distance (radians) within which a boundary can be grabbed.
pub const BOUNDARY_THRESHOLD: f64 = 0.3;

/// Shares at or below this are not drawn; at or above `1 - FULL_EPS` the
/// segment is drawn as a closed ring.
const FULL_EPS: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundaryDrag {
    pub boundary: usize,
    pub start_angle: f64,
    pub start_weights: WeightVector,
}

pub struct WeightEditor<D: DrawSurface> {
    surface: D,
    drag: Option<BoundaryDrag>,
}

/// Boundary angles, clockwise from the top: after slot 0, after slot 1, and
/// the closing boundary between slot 2 and slot 0.
pub fn boundary_angles(weights: &WeightVector) -> [f64; 3] {
    let [a, b, _] = weights.as_array();
    [a * TAU, (a + b) * TAU, TAU]
}

impl<D: DrawSurface> WeightEditor<D> {
    pub fn new(surface: D) -> Self {
        Self {
            surface,
            drag: None,
        }
    }

    pub fn surface(&self) -> &D {
        &self.surface
    }

    pub fn drag(&self) -> Option<&BoundaryDrag> {
        self.drag.as_ref()
    }

    /// Grab the boundary nearest the pointer, if the pointer is on the ring
    /// and within [`BOUNDARY_THRESHOLD`] of one. Returns whether a drag started.
    pub fn pointer_down(&mut self, weights: &WeightVector, x: f64, y: f64) -> bool {
        let (dx, dy) = (x - CENTER.0, y - CENTER.1);
        let dist = (dx * dx + dy * dy).sqrt();
        if dist <= INNER_RADIUS + HIT_SLACK || dist >= RADIUS + HIT_SLACK {
            return false;
        }
        let angle = angle_from_top(dx, dy);
        match nearest_boundary(angle, &boundary_angles(weights), BOUNDARY_THRESHOLD) {
            Some(boundary) => {
                self.drag = Some(BoundaryDrag {
                    boundary,
                    start_angle: angle,
                    start_weights: *weights,
                });
                true
            }
            None => false,
        }
    }

    /// Move a grabbed boundary. The angular travel since the press becomes a
    /// transfer between the two adjacent weights of the press-time vector.
    pub fn pointer_move(&mut self, weights: &mut WeightVector, x: f64, y: f64) -> bool {
        let Some(drag) = self.drag else {
            return false;
        };
        let angle = angle_from_top(x - CENTER.0, y - CENTER.1);
        let delta = wrap_delta(drag.start_angle, angle) / TAU;
        let next = WeightVector::transferred(&drag.start_weights, drag.boundary, delta);
        let changed = next != *weights;
        *weights = next;
        self.draw(weights);
        changed
    }

    pub fn pointer_up(&mut self) -> bool {
        self.drag.take().is_some()
    }

    /// Slider input for one weight, as a fraction.
    pub fn set_slider(&mut self, weights: &mut WeightVector, slot: WeightSlot, value: f64) -> bool {
        let before = *weights;
        weights.set_share(slot, value);
        self.draw(weights);
        before != *weights
    }

    /// Replace the whole vector (session load, external reset).
    pub fn set_all(&mut self, weights: &mut WeightVector, raw: [f64; 3]) {
        *weights = WeightVector::from_raw(raw);
        self.draw(weights);
    }

    pub fn draw(&mut self, weights: &WeightVector) {
        let (cx, cy) = CENTER;
        self.surface.clear();

        let mut start = 0.0;
        for slot in WeightSlot::ALL {
            let share = weights.get(slot);
            let sweep = share * TAU;
            let color = SERIES_COLORS[slot.index()];
            if share >= 1.0 - FULL_EPS {
                self.surface.draw_arc(
                    ArcShape::Ring {
                        cx,
                        cy,
                        inner: INNER_RADIUS,
                        outer: RADIUS,
                    },
                    color,
                );
            } else if share > FULL_EPS {
                self.surface.draw_arc(
                    ArcShape::Sector {
                        cx,
                        cy,
                        inner: INNER_RADIUS,
                        outer: RADIUS,
                        start,
                        sweep,
                    },
                    color,
                );
            }

            if share > FULL_EPS {
                let mid = start + sweep / 2.0;
                let (lx, ly) = point_on_circle(cx, cy, (RADIUS + INNER_RADIUS) / 2.0, mid);
                self.surface
                    .draw_text((lx, ly - 8.0), slot.label(), LABEL_COLOR, TextAlign::Center);
                self.surface.draw_text(
                    (lx, ly + 8.0),
                    &format!("{:.1}%", share * 100.0),
                    LABEL_COLOR,
                    TextAlign::Center,
                );
            }
            start += sweep;
        }
    }
}
