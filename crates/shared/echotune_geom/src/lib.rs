//! Geometry helpers shared by the echotune editors.
//!
//! Everything here is pure math over `f64`: clamping and renormalizing small
//! vectors, ring/angle arithmetic for the donut chart, axis tick selection, and
//! the clamped value window behind the schedule chart's pan/zoom.

pub mod angle;
pub mod axis;
pub mod vector;
pub mod window;

pub use angle::{angle_from_top, angular_distance, nearest_boundary, point_on_circle, wrap_delta};
pub use axis::{label_precision, nice_step, tick_values, NICE_STEPS};
pub use vector::{clamp01, is_normalized, normalize3};
pub use window::ValueWindow;
