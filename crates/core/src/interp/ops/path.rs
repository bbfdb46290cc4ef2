//! Path construction and painting operators.
//!
//! Handles: m, l, c, v, y, h, re, S, s, f, F, f*, B, B*, b, b*, n, W, W*
//!
//! Path construction:
//! - m: Move to (starts a new subpath)
//! - l: Line to
//! - c, v, y: Bezier curves (cubic variants)
//! - h: Close subpath
//! - re: Rectangle shorthand
//!
//! Path painting:
//! - S/s: Stroke (s closes first)
//! - f/F/f*: Fill (F is legacy, f* uses even-odd rule)
//! - B/B*/b/b*: Fill then stroke
//! - n: End path without painting
//!
//! Clipping:
//! - W/W*: Record a clip rule; the next painting operator applies it
//!
//! Points are mapped to device space as they are added.

use crate::clip::{self, as_rectangle, cohen_sutherland};
use crate::error::Result;
use crate::interp::device::LetterSource;
use crate::interp::interpreter::PDFPageInterpreter;
use crate::model::path::{DashPattern, FillingRule, Path, PathCommand, Subpath};
use crate::utils::{Point, matrix_scale};

/// A clipping path enclosing nothing.
pub(crate) fn empty_clip() -> Path {
    let mut path = Path::new();
    path.mark_as_clip(FillingRule::NonZeroWinding);
    path
}

/// Endpoints of a path that is exactly one straight segment.
fn single_segment(path: &Path) -> Option<(Point, Point)> {
    let [sub] = path.subpaths() else {
        return None;
    };
    let mut segment = None;
    for cmd in sub.commands() {
        match *cmd {
            PathCommand::Move(_) if segment.is_none() => {}
            PathCommand::Line { from, to } if segment.is_none() => segment = Some((from, to)),
            _ => return None,
        }
    }
    segment
}

#[allow(non_snake_case)]
impl<L: LetterSource> PDFPageInterpreter<'_, L> {
    // ========================================================================
    // Path Construction Operators
    // ========================================================================

    /// Begins a new subpath at the given point.
    ///
    /// PDF operator: `m`
    pub fn do_m(&mut self, x: f64, y: f64) -> Result<()> {
        let (x, y) = self.to_device(x, y);
        self.curpath.begin_subpath()?;
        self.curpath.move_to(x, y)
    }

    /// PDF operator: `l`
    pub fn do_l(&mut self, x: f64, y: f64) -> Result<()> {
        let (x, y) = self.to_device(x, y);
        self.curpath.line_to(x, y)
    }

    /// Appends a cubic Bezier curve from the current point to (x3, y3)
    /// with control points (x1, y1) and (x2, y2).
    ///
    /// PDF operator: `c`
    pub fn do_c(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, x3: f64, y3: f64) -> Result<()> {
        let c1 = self.to_device(x1, y1);
        let c2 = self.to_device(x2, y2);
        let end = self.to_device(x3, y3);
        self.curpath.bezier_curve_to(c1, c2, end)
    }

    /// Curve whose first control point is the current point.
    ///
    /// PDF operator: `v`
    pub fn do_v(&mut self, x2: f64, y2: f64, x3: f64, y3: f64) -> Result<()> {
        let c2 = self.to_device(x2, y2);
        let end = self.to_device(x3, y3);
        self.curpath.bezier_curve_to_v(c2, end)
    }

    /// Curve whose second control point is the end point.
    ///
    /// PDF operator: `y`
    pub fn do_y(&mut self, x1: f64, y1: f64, x3: f64, y3: f64) -> Result<()> {
        let c1 = self.to_device(x1, y1);
        let end = self.to_device(x3, y3);
        self.curpath.bezier_curve_to(c1, end, end)
    }

    /// PDF operator: `h`
    pub fn do_h(&mut self) -> Result<()> {
        self.curpath.close_subpath()
    }

    /// Appends a rectangle as a closed subpath. Under rotation or skew the
    /// device-space result is a general quadrilateral.
    ///
    /// PDF operator: `re`
    pub fn do_re(&mut self, x: f64, y: f64, w: f64, h: f64) -> Result<()> {
        let corners = [
            self.to_device(x, y),
            self.to_device(x + w, y),
            self.to_device(x + w, y + h),
            self.to_device(x, y + h),
        ];
        self.curpath.polygon(&corners)
    }

    // ========================================================================
    // Path Painting Operators
    // ========================================================================

    /// Shared body of the painting operators.
    ///
    /// Ends the current path. A clip recorded by W/W* is intersected into
    /// the clipping path first, using the unpainted geometry.
    fn paint_path(&mut self, stroke: bool, fill: Option<FillingRule>, close: bool) -> Result<()> {
        let mut path = std::mem::take(&mut self.curpath);
        if close {
            path.close_subpath()?;
        }

        if let Some(rule) = self.pending_clip.take() {
            let mut clip_path = path.clone();
            clip_path.mark_as_clip(rule);
            self.intersect_clip(&clip_path)?;
        }

        if !stroke && fill.is_none() {
            return Ok(());
        }
        if path.is_empty() {
            tracing::trace!("painting an empty path");
            return Ok(());
        }

        let gs = &self.graphicstate;
        let scale = matrix_scale(self.ctm);
        path.line_width = gs.linewidth * scale;
        path.dash_pattern = gs.dash.as_ref().map(|dash| {
            DashPattern::new(
                dash.array.iter().map(|v| v * scale).collect(),
                dash.phase * scale,
            )
        });
        path.line_cap = gs.linecap;
        path.line_join = gs.linejoin;
        if let Some(rule) = fill {
            path.fill_color = Some(gs.fill.color.clone());
            path.mark_as_filled(rule);
        }
        if stroke {
            path.stroke_color = Some(gs.stroke.color.clone());
            path.mark_as_stroked();
        }

        if self.options.clip_paths
            && let Some(clip_path) = &self.graphicstate.clip
        {
            match clip_painted(clip_path, path)? {
                Some(visible) => path = visible,
                None => {
                    tracing::trace!("painted path lies outside the clip");
                    return Ok(());
                }
            }
        }
        self.emit_path(path);
        Ok(())
    }

    /// Intersect `clip_path` into the current clipping path.
    pub(crate) fn intersect_clip(&mut self, clip_path: &Path) -> Result<()> {
        let clip = match &self.graphicstate.clip {
            Some(current) => clip::clip(current, clip_path)?.unwrap_or_else(empty_clip),
            None => clip_path.clone(),
        };
        self.graphicstate.clip = Some(clip);
        Ok(())
    }

    /// Strokes the path.
    ///
    /// PDF operator: `S`
    pub fn do_S(&mut self) -> Result<()> {
        self.paint_path(true, None, false)
    }

    /// Closes and strokes the path.
    ///
    /// PDF operator: `s`
    pub fn do_s(&mut self) -> Result<()> {
        self.paint_path(true, None, true)
    }

    /// Fills using the non-zero winding rule. Open subpaths are filled as
    /// if closed.
    ///
    /// PDF operators: `f`, `F`
    pub fn do_f(&mut self) -> Result<()> {
        self.paint_path(false, Some(FillingRule::NonZeroWinding), false)
    }

    /// PDF operator: `f*`
    pub fn do_f_star(&mut self) -> Result<()> {
        self.paint_path(false, Some(FillingRule::EvenOdd), false)
    }

    /// PDF operator: `B`
    pub fn do_B(&mut self) -> Result<()> {
        self.paint_path(true, Some(FillingRule::NonZeroWinding), false)
    }

    /// PDF operator: `B*`
    pub fn do_B_star(&mut self) -> Result<()> {
        self.paint_path(true, Some(FillingRule::EvenOdd), false)
    }

    /// PDF operator: `b`
    pub fn do_b(&mut self) -> Result<()> {
        self.paint_path(true, Some(FillingRule::NonZeroWinding), true)
    }

    /// PDF operator: `b*`
    pub fn do_b_star(&mut self) -> Result<()> {
        self.paint_path(true, Some(FillingRule::EvenOdd), true)
    }

    /// Ends the path without painting; applies a pending clip.
    ///
    /// PDF operator: `n`
    pub fn do_n(&mut self) -> Result<()> {
        self.paint_path(false, None, false)
    }

    // ========================================================================
    // Clipping Path Operators
    // ========================================================================

    /// PDF operator: `W`
    pub fn do_W(&mut self) {
        self.pending_clip = Some(FillingRule::NonZeroWinding);
    }

    /// PDF operator: `W*`
    pub fn do_W_star(&mut self) {
        self.pending_clip = Some(FillingRule::EvenOdd);
    }
}

/// Visible part of a painted path, None when nothing is left.
///
/// A lone stroked segment against a rectangular clip goes through the line
/// clipper; everything else takes the polygon path.
fn clip_painted(clip_path: &Path, path: Path) -> Result<Option<Path>> {
    if !path.is_filled()
        && let Some(rect) = as_rectangle(clip_path)
        && let Some((from, to)) = single_segment(&path)
    {
        let Some((p0, p1)) = cohen_sutherland(from, to, rect) else {
            return Ok(None);
        };
        let mut segment = Subpath::new();
        segment.move_to(p0.0, p0.1);
        segment.line_to(p1.0, p1.1);
        let mut out = path.clone_empty();
        out.push_subpath(segment);
        out.seal();
        return Ok(Some(out));
    }
    clip::clip(clip_path, &path)
}
