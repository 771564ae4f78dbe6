//! Immediate-mode 2D drawing surface used by the editors.
//!
//! Editors issue a full frame on every redraw: `clear` followed by lines, arcs
//! and text. [`DisplayList`] records frames so they can be inspected in tests
//! or exported as SVG by the CLI.

use std::f64::consts::TAU;
use std::fmt::Write as _;

use echotune_geom::point_on_circle;

pub const SERIES_COLORS: [&str; 3] = [
    "#7aa2ff", // blue
    "#fbbf24", // amber
    "#4ade80", // green
];

pub const GRID_COLOR: &str = "rgba(255,255,255,0.08)";
pub const AXIS_COLOR: &str = "#374151";
pub const LABEL_COLOR: &str = "#9ca3af";
pub const LINE_COLOR: &str = "#7aa2ff";
pub const POINT_COLOR: &str = "#fbbf24";
pub const ACTIVE_COLOR: &str = "#fb7185";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

/// Filled arc geometry. Angles are clockwise from twelve o'clock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ArcShape {
    /// Annular sector from `start` sweeping `sweep` radians.
    Sector {
        cx: f64,
        cy: f64,
        inner: f64,
        outer: f64,
        start: f64,
        sweep: f64,
    },
    /// Closed ring; `inner == 0` is a filled disc.
    Ring {
        cx: f64,
        cy: f64,
        inner: f64,
        outer: f64,
    },
}

pub trait DrawSurface {
    /// Width and height in pixels.
    fn size(&self) -> (f64, f64);
    fn resize(&mut self, width: f64, height: f64);
    fn clear(&mut self);
    fn draw_line(&mut self, from: (f64, f64), to: (f64, f64), color: &str, width: f64);
    fn draw_arc(&mut self, shape: ArcShape, color: &str);
    fn draw_text(&mut self, at: (f64, f64), text: &str, color: &str, align: TextAlign);
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCmd {
    Line {
        from: (f64, f64),
        to: (f64, f64),
        color: String,
        width: f64,
    },
    Arc {
        shape: ArcShape,
        color: String,
    },
    Text {
        at: (f64, f64),
        text: String,
        color: String,
        align: TextAlign,
    },
}

/// Recording surface: keeps the commands of the latest frame.
#[derive(Debug, Clone)]
pub struct DisplayList {
    width: f64,
    height: f64,
    commands: Vec<DrawCmd>,
    frames: u64,
}

impl DisplayList {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            commands: Vec::new(),
            frames: 0,
        }
    }

    pub fn commands(&self) -> &[DrawCmd] {
        &self.commands
    }

    /// Number of frames started so far (calls to `clear`).
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn arcs(&self) -> impl Iterator<Item = &ArcShape> {
        self.commands.iter().filter_map(|c| match c {
            DrawCmd::Arc { shape, .. } => Some(shape),
            _ => None,
        })
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().filter_map(|c| match c {
            DrawCmd::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }

    /// Render the current frame as a standalone SVG document.
    pub fn to_svg(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
            w = self.width,
            h = self.height
        );
        let _ = writeln!(
            out,
            r#"<rect width="100%" height="100%" fill="{}"/>"#,
            "#0b1020"
        );
        for cmd in &self.commands {
            match cmd {
                DrawCmd::Line {
                    from,
                    to,
                    color,
                    width,
                } => {
                    let _ = writeln!(
                        out,
                        r#"<line x1="{:.2}" y1="{:.2}" x2="{:.2}" y2="{:.2}" stroke="{}" stroke-width="{}"/>"#,
                        from.0, from.1, to.0, to.1, color, width
                    );
                }
                DrawCmd::Arc { shape, color } => {
                    let _ = writeln!(
                        out,
                        r#"<path d="{}" fill="{}" fill-rule="evenodd"/>"#,
                        arc_path(shape),
                        color
                    );
                }
                DrawCmd::Text {
                    at,
                    text,
                    color,
                    align,
                } => {
                    let anchor = match align {
                        TextAlign::Left => "start",
                        TextAlign::Center => "middle",
                        TextAlign::Right => "end",
                    };
                    let _ = writeln!(
                        out,
                        r#"<text x="{:.2}" y="{:.2}" fill="{}" font-size="11" font-family="monospace" text-anchor="{}">{}</text>"#,
                        at.0,
                        at.1,
                        color,
                        anchor,
                        escape_xml(text)
                    );
                }
            }
        }
        out.push_str("</svg>\n");
        out
    }
}

impl DrawSurface for DisplayList {
    fn size(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    fn resize(&mut self, width: f64, height: f64) {
        self.width = width.max(1.0);
        self.height = height.max(1.0);
    }

    fn clear(&mut self) {
        self.commands.clear();
        self.frames += 1;
    }

    fn draw_line(&mut self, from: (f64, f64), to: (f64, f64), color: &str, width: f64) {
        self.commands.push(DrawCmd::Line {
            from,
            to,
            color: color.to_string(),
            width,
        });
    }

    fn draw_arc(&mut self, shape: ArcShape, color: &str) {
        self.commands.push(DrawCmd::Arc {
            shape,
            color: color.to_string(),
        });
    }

    fn draw_text(&mut self, at: (f64, f64), text: &str, color: &str, align: TextAlign) {
        self.commands.push(DrawCmd::Text {
            at,
            text: text.to_string(),
            color: color.to_string(),
            align,
        });
    }
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Full circle as two half arcs; a single SVG arc cannot close on itself.
fn circle_path(out: &mut String, cx: f64, cy: f64, r: f64) {
    let _ = write!(
        out,
        "M {:.2} {:.2} A {r:.2} {r:.2} 0 1 1 {:.2} {:.2} A {r:.2} {r:.2} 0 1 1 {:.2} {:.2} Z ",
        cx,
        cy - r,
        cx,
        cy + r,
        cx,
        cy - r,
        r = r
    );
}

fn arc_path(shape: &ArcShape) -> String {
    let mut d = String::new();
    match *shape {
        ArcShape::Ring {
            cx,
            cy,
            inner,
            outer,
        } => {
            circle_path(&mut d, cx, cy, outer);
            if inner > 0.0 {
                circle_path(&mut d, cx, cy, inner);
            }
        }
        ArcShape::Sector {
            cx,
            cy,
            inner,
            outer,
            start,
            sweep,
        } => {
            let end = start + sweep.clamp(0.0, TAU);
            let large = if sweep > std::f64::consts::PI { 1 } else { 0 };
            let (ox0, oy0) = point_on_circle(cx, cy, outer, start);
            let (ox1, oy1) = point_on_circle(cx, cy, outer, end);
            let (ix1, iy1) = point_on_circle(cx, cy, inner, end);
            let (ix0, iy0) = point_on_circle(cx, cy, inner, start);
            let _ = write!(
                d,
                "M {ox0:.2} {oy0:.2} A {outer:.2} {outer:.2} 0 {large} 1 {ox1:.2} {oy1:.2} \
                 L {ix1:.2} {iy1:.2} A {inner:.2} {inner:.2} 0 {large} 0 {ix0:.2} {iy0:.2} Z"
            );
        }
    }
    d
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_starts_a_new_frame() {
        let mut list = DisplayList::new(100.0, 50.0);
        list.draw_line((0.0, 0.0), (1.0, 1.0), AXIS_COLOR, 1.0);
        list.clear();
        list.draw_text((1.0, 1.0), "a<b", LABEL_COLOR, TextAlign::Left);
        assert_eq!(list.frames(), 1);
        assert_eq!(list.commands().len(), 1);
        assert!(list.to_svg().contains("a&lt;b"));
    }

    #[test]
    fn full_ring_renders_as_two_half_arcs() {
        let mut list = DisplayList::new(300.0, 300.0);
        list.clear();
        list.draw_arc(
            ArcShape::Ring {
                cx: 150.0,
                cy: 150.0,
                inner: 30.0,
                outer: 100.0,
            },
            SERIES_COLORS[0],
        );
        let svg = list.to_svg();
        assert_eq!(svg.matches(" A ").count(), 4);
        assert!(svg.contains("evenodd"));
    }
}
