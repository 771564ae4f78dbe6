//! Threshold-schedule chart: four draggable points over a pannable, zoomable
//! vertical window.

use echotune_geom::{label_precision, nice_step, tick_values, ValueWindow};

use crate::discard::BRACKET_LABELS;
use crate::model::{ScheduleVector, BRACKETS};
use crate::surface::{
    ArcShape, DrawSurface, TextAlign, ACTIVE_COLOR, AXIS_COLOR, GRID_COLOR, LABEL_COLOR,
    LINE_COLOR, POINT_COLOR,
};

/// Plot-area insets in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Padding {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

pub const CHART_PADDING: Padding = Padding {
    top: 20.0,
    right: 20.0,
    bottom: 40.0,
    left: 40.0,
};

/// Slack around the `[0, 1]` domain the window may show.
pub const VIEW_PADDING: f64 = 0.05;
pub const MIN_SPAN: f64 = 0.001;
/// Fractional span change per wheel tick.
pub const ZOOM_STEP: f64 = 0.1;
pub const POINT_RADIUS: f64 = 7.0;
pub const HIT_RADIUS: f64 = 10.0;
const TICK_COUNT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragState {
    Idle,
    Point(usize),
    Pan { last_y: f64 },
}

pub struct ScheduleEditor<D: DrawSurface> {
    surface: D,
    window: ValueWindow,
    drag: DragState,
}

impl<D: DrawSurface> ScheduleEditor<D> {
    pub fn new(surface: D) -> Self {
        Self {
            surface,
            window: ValueWindow::new(-VIEW_PADDING, 1.0 + VIEW_PADDING, MIN_SPAN),
            drag: DragState::Idle,
        }
    }

    pub fn surface(&self) -> &D {
        &self.surface
    }

    pub fn window(&self) -> &ValueWindow {
        &self.window
    }

    pub fn drag_state(&self) -> DragState {
        self.drag
    }

    fn plot_width(&self) -> f64 {
        (self.surface.size().0 - CHART_PADDING.left - CHART_PADDING.right).max(1.0)
    }

    fn plot_height(&self) -> f64 {
        (self.surface.size().1 - CHART_PADDING.top - CHART_PADDING.bottom).max(1.0)
    }

    pub fn index_to_x(&self, index: usize) -> f64 {
        CHART_PADDING.left + self.plot_width() / (BRACKETS - 1) as f64 * index as f64
    }

    pub fn value_to_y(&self, value: f64) -> f64 {
        let t = (value - self.window.min) / self.window.span();
        CHART_PADDING.top + self.plot_height() * (1.0 - t)
    }

    pub fn y_to_value(&self, y: f64) -> f64 {
        let t = 1.0 - (y - CHART_PADDING.top) / self.plot_height();
        self.window.min + t * self.window.span()
    }

    /// Set point `index` from a pixel y coordinate. Returns whether the
    /// schedule changed.
    pub fn set_point(&mut self, schedule: &mut ScheduleVector, index: usize, pixel_y: f64) -> bool {
        let changed = schedule.set(index, self.y_to_value(pixel_y));
        self.draw(schedule);
        changed
    }

    /// Numeric field input, in percent. Out-of-range values are clamped and
    /// unparsable (`NaN`) input is ignored.
    pub fn set_input(&mut self, schedule: &mut ScheduleVector, index: usize, percent: f64) -> bool {
        if percent.is_nan() {
            return false;
        }
        let changed = schedule.set(index, percent / 100.0);
        self.draw(schedule);
        changed
    }

    /// Bulk update with a single redraw.
    pub fn set_all(&mut self, schedule: &mut ScheduleVector, values: [f64; BRACKETS]) -> bool {
        let changed = schedule.set_all(values);
        self.draw(schedule);
        changed
    }

    /// Start a gesture: a point within [`HIT_RADIUS`] is grabbed (lowest index
    /// first), anything else starts a pan.
    pub fn pointer_down(&mut self, schedule: &ScheduleVector, x: f64, y: f64) {
        let hit = (0..BRACKETS).find(|&i| {
            let dx = x - self.index_to_x(i);
            let dy = y - self.value_to_y(schedule[i]);
            (dx * dx + dy * dy).sqrt() < HIT_RADIUS
        });
        self.drag = match hit {
            Some(i) => DragState::Point(i),
            None => DragState::Pan { last_y: y },
        };
        self.draw(schedule);
    }

    /// Continue a gesture. Returns whether the schedule changed.
    pub fn pointer_move(&mut self, schedule: &mut ScheduleVector, y: f64) -> bool {
        match self.drag {
            DragState::Idle => false,
            DragState::Point(i) => self.set_point(schedule, i, y),
            DragState::Pan { last_y } => {
                let delta = (y - last_y) / self.plot_height() * self.window.span();
                self.window.pan(delta);
                self.drag = DragState::Pan { last_y: y };
                self.draw(schedule);
                false
            }
        }
    }

    pub fn pointer_up(&mut self, schedule: &ScheduleVector) {
        if self.drag != DragState::Idle {
            self.drag = DragState::Idle;
            self.draw(schedule);
        }
    }

    /// One wheel tick at pixel `y`. Negative `delta_y` zooms in. Ignored when
    /// the pointer is above or below the plot area.
    pub fn wheel(&mut self, schedule: &ScheduleVector, y: f64, delta_y: f64) {
        let (_, height) = self.surface.size();
        if y < CHART_PADDING.top || y > height - CHART_PADDING.bottom {
            return;
        }
        let anchor = self.y_to_value(y);
        let factor = if delta_y < 0.0 {
            1.0 - ZOOM_STEP
        } else {
            1.0 + ZOOM_STEP
        };
        self.window.zoom(anchor, factor);
        self.draw(schedule);
    }

    pub fn resize(&mut self, schedule: &ScheduleVector, width: f64, height: f64) {
        self.surface.resize(width, height);
        self.draw(schedule);
    }

    pub fn draw(&mut self, schedule: &ScheduleVector) {
        let (width, height) = self.surface.size();
        let span = self.window.span();
        let precision = label_precision(span);
        let step = nice_step(span, TICK_COUNT);

        self.surface.clear();

        for value in tick_values(self.window.min, self.window.max, step) {
            let y = self.value_to_y(value);
            self.surface.draw_line(
                (CHART_PADDING.left, y),
                (width - CHART_PADDING.right, y),
                GRID_COLOR,
                1.0,
            );
            self.surface.draw_text(
                (CHART_PADDING.left - 5.0, y + 4.0),
                &format!("{:.*}%", precision, value * 100.0),
                LABEL_COLOR,
                TextAlign::Right,
            );
        }

        let baseline = height - CHART_PADDING.bottom;
        self.surface.draw_line(
            (CHART_PADDING.left, baseline),
            (width - CHART_PADDING.right, baseline),
            AXIS_COLOR,
            1.0,
        );
        for (i, label) in BRACKET_LABELS.iter().enumerate() {
            let x = self.index_to_x(i);
            self.surface
                .draw_text((x, baseline + 20.0), label, LABEL_COLOR, TextAlign::Center);
        }

        let points: Vec<(f64, f64)> = (0..BRACKETS)
            .map(|i| (self.index_to_x(i), self.value_to_y(schedule[i])))
            .collect();
        for pair in points.windows(2) {
            self.surface.draw_line(pair[0], pair[1], LINE_COLOR, 2.0);
        }
        for (i, &(cx, cy)) in points.iter().enumerate() {
            let color = if self.drag == DragState::Point(i) {
                ACTIVE_COLOR
            } else {
                POINT_COLOR
            };
            self.surface.draw_arc(
                ArcShape::Ring {
                    cx,
                    cy,
                    inner: 0.0,
                    outer: POINT_RADIUS,
                },
                color,
            );
        }
    }
}
