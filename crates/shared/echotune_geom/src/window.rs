/// A visible `[min, max]` range kept inside fixed outer bounds.
///
/// Used as the vertical viewport of the schedule chart: panning shifts the
/// window without resizing it, zooming rescales it around an anchor value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueWindow {
    pub min: f64,
    pub max: f64,
    lower: f64,
    upper: f64,
    min_span: f64,
}

impl ValueWindow {
    /// A window covering all of `[lower, upper]`.
    pub fn new(lower: f64, upper: f64, min_span: f64) -> Self {
        Self {
            min: lower,
            max: upper,
            lower,
            upper,
            min_span,
        }
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    pub fn bounds(&self) -> (f64, f64) {
        (self.lower, self.upper)
    }

    pub fn min_span(&self) -> f64 {
        self.min_span
    }

    pub fn reset(&mut self) {
        self.min = self.lower;
        self.max = self.upper;
    }

    /// Shift by `delta`; overshoot on either edge moves both ends back.
    pub fn pan(&mut self, delta: f64) {
        if !delta.is_finite() {
            return;
        }
        let mut lo = self.min + delta;
        let mut hi = self.max + delta;
        if lo < self.lower {
            let over = self.lower - lo;
            lo += over;
            hi += over;
        }
        if hi > self.upper {
            let over = hi - self.upper;
            lo -= over;
            hi -= over;
        }
        self.min = lo;
        self.max = hi;
    }

    /// Rescale the span by `factor` keeping `anchor` at the same relative position.
    ///
    /// The span is floored at `min_span`; a span reaching the full bounds snaps
    /// the window to exactly `[lower, upper]`.
    pub fn zoom(&mut self, anchor: f64, factor: f64) {
        let span = self.span();
        if !(factor > 0.0) || !anchor.is_finite() || !(span > 0.0) {
            return;
        }
        let full = self.upper - self.lower;
        let new_span = (span * factor).max(self.min_span);
        if new_span >= full {
            self.reset();
            return;
        }
        let lo = anchor - (anchor - self.min) * (new_span / span);
        let hi = lo + new_span;
        if lo < self.lower {
            self.min = self.lower;
            self.max = self.lower + new_span;
        } else if hi > self.upper {
            self.max = self.upper;
            self.min = self.upper - new_span;
        } else {
            self.min = lo;
            self.max = hi;
        }
    }

    pub fn contains_window(&self) -> bool {
        self.min >= self.lower - 1e-12 && self.max <= self.upper + 1e-12
    }
}
