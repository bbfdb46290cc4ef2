//! Vector path model built by the content interpreter.
//!
//! A [`Path`] is an ordered list of [`Subpath`]s plus the paint attributes
//! captured when it was painted or used as a clip. Construction happens one
//! subpath at a time; marking the path as filled, stroked or clipping
//! finalizes it and any further construction fails with
//! [`PdfError::InvalidPathState`].

use std::fmt;

use crate::error::{PdfError, Result};
use crate::model::color::Color;
use crate::utils::{Matrix, Point, Rect, apply_matrix_pt, union_rect};

const FINALIZED: &str = "path has been finalized";

/// Rule deciding which regions count as inside a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum FillingRule {
    #[default]
    NonZeroWinding,
    EvenOdd,
}

impl FillingRule {
    /// Whether a winding number lies inside under this rule.
    #[inline]
    pub const fn contains(self, winding: i32) -> bool {
        match self {
            Self::NonZeroWinding => winding != 0,
            Self::EvenOdd => winding % 2 != 0,
        }
    }
}

/// Line cap style (`J` operator / `LC` entry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineCap {
    #[default]
    Butt,
    Round,
    ProjectingSquare,
}

impl LineCap {
    pub const fn from_int(value: i64) -> Option<Self> {
        match value {
            0 => Some(Self::Butt),
            1 => Some(Self::Round),
            2 => Some(Self::ProjectingSquare),
            _ => None,
        }
    }
}

/// Line join style (`j` operator / `LJ` entry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineJoin {
    #[default]
    Miter,
    Round,
    Bevel,
}

impl LineJoin {
    pub const fn from_int(value: i64) -> Option<Self> {
        match value {
            0 => Some(Self::Miter),
            1 => Some(Self::Round),
            2 => Some(Self::Bevel),
            _ => None,
        }
    }
}

/// Dash pattern: dash/gap lengths and the starting phase.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DashPattern {
    pub array: Vec<f64>,
    pub phase: f64,
}

impl DashPattern {
    pub fn new(array: Vec<f64>, phase: f64) -> Self {
        Self { array, phase }
    }

    /// A solid line has an empty dash array.
    pub fn is_solid(&self) -> bool {
        self.array.is_empty()
    }
}

/// One drawing command of a subpath.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathCommand {
    Move(Point),
    Line {
        from: Point,
        to: Point,
    },
    BezierCurve {
        start: Point,
        c1: Point,
        c2: Point,
        end: Point,
    },
    Close,
}

impl PathCommand {
    /// Tight bounding rectangle of the command, `None` for `Close`.
    pub fn bounding_rectangle(&self) -> Option<Rect> {
        match *self {
            Self::Move(p) => Some((p.0, p.1, p.0, p.1)),
            Self::Line { from, to } => Some((
                from.0.min(to.0),
                from.1.min(to.1),
                from.0.max(to.0),
                from.1.max(to.1),
            )),
            Self::BezierCurve { start, c1, c2, end } => {
                let (x0, x1) = bezier_extent(start.0, c1.0, c2.0, end.0);
                let (y0, y1) = bezier_extent(start.1, c1.1, c2.1, end.1);
                Some((x0, y0, x1, y1))
            }
            Self::Close => None,
        }
    }

    /// Applies a matrix to every point of the command.
    pub fn transform(&self, m: Matrix) -> Self {
        match *self {
            Self::Move(p) => Self::Move(apply_matrix_pt(m, p)),
            Self::Line { from, to } => Self::Line {
                from: apply_matrix_pt(m, from),
                to: apply_matrix_pt(m, to),
            },
            Self::BezierCurve { start, c1, c2, end } => Self::BezierCurve {
                start: apply_matrix_pt(m, start),
                c1: apply_matrix_pt(m, c1),
                c2: apply_matrix_pt(m, c2),
                end: apply_matrix_pt(m, end),
            },
            Self::Close => Self::Close,
        }
    }
}

impl fmt::Display for PathCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Move(p) => write!(f, "M {} {}", p.0, p.1),
            Self::Line { to, .. } => write!(f, "L {} {}", to.0, to.1),
            Self::BezierCurve { c1, c2, end, .. } => write!(
                f,
                "C {} {} {} {} {} {}",
                c1.0, c1.1, c2.0, c2.1, end.0, end.1
            ),
            Self::Close => f.write_str("Z"),
        }
    }
}

/// Evaluate one coordinate of a cubic Bézier curve at `t`.
#[inline]
pub(crate) fn bezier_point(p0: f64, p1: f64, p2: f64, p3: f64, t: f64) -> f64 {
    let mt = 1.0 - t;
    mt * mt * mt * p0 + 3.0 * mt * mt * t * p1 + 3.0 * mt * t * t * p2 + t * t * t * p3
}

/// Min/max of one coordinate of a cubic Bézier curve over t in [0, 1].
fn bezier_extent(p0: f64, p1: f64, p2: f64, p3: f64) -> (f64, f64) {
    let mut lo = p0.min(p3);
    let mut hi = p0.max(p3);

    // Derivative roots: (a - 2b + c) t^2 + 2 (b - a) t + a = 0
    let a = p1 - p0;
    let b = p2 - p1;
    let c = p3 - p2;
    let qa = a - 2.0 * b + c;
    let qb = 2.0 * (b - a);
    let qc = a;

    let mut roots = [f64::NAN; 2];
    if qa.abs() < 1e-12 {
        if qb.abs() > 1e-12 {
            roots[0] = -qc / qb;
        }
    } else {
        let disc = qb * qb - 4.0 * qa * qc;
        if disc >= 0.0 {
            let sq = disc.sqrt();
            roots[0] = (-qb + sq) / (2.0 * qa);
            roots[1] = (-qb - sq) / (2.0 * qa);
        }
    }

    for t in roots {
        if t > 0.0 && t < 1.0 {
            let v = bezier_point(p0, p1, p2, p3, t);
            lo = lo.min(v);
            hi = hi.max(v);
        }
    }
    (lo, hi)
}

/// A contiguous run of drawing commands.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Subpath {
    commands: Vec<PathCommand>,
    start_point: Option<Point>,
    current_point: Option<Point>,
}

impl Subpath {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commands in drawing order.
    pub fn commands(&self) -> &[PathCommand] {
        &self.commands
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// True iff the command sequence contains a `Close`.
    pub fn is_closed(&self) -> bool {
        self.commands.iter().any(|c| matches!(c, PathCommand::Close))
    }

    fn ends_with_close(&self) -> bool {
        matches!(self.commands.last(), Some(PathCommand::Close))
    }

    /// Point where the subpath started (its last `Move`).
    pub const fn start_point(&self) -> Option<Point> {
        self.start_point
    }

    pub const fn current_point(&self) -> Option<Point> {
        self.current_point
    }

    pub fn move_to(&mut self, x: f64, y: f64) {
        self.commands.push(PathCommand::Move((x, y)));
        self.start_point = Some((x, y));
        self.current_point = Some((x, y));
    }

    pub fn line_to(&mut self, x: f64, y: f64) {
        match self.current_point {
            Some(from) => {
                self.commands.push(PathCommand::Line { from, to: (x, y) });
                self.current_point = Some((x, y));
            }
            None => self.move_to(x, y),
        }
    }

    pub fn bezier_curve_to(&mut self, c1: Point, c2: Point, end: Point) {
        match self.current_point {
            Some(start) => {
                self.commands
                    .push(PathCommand::BezierCurve { start, c1, c2, end });
                self.current_point = Some(end);
            }
            None => self.move_to(end.0, end.1),
        }
    }

    /// Appends `Close` unless the subpath already ends with one.
    pub fn close(&mut self) {
        if self.commands.is_empty() || self.ends_with_close() {
            return;
        }
        self.commands.push(PathCommand::Close);
        self.current_point = self.start_point;
    }

    /// Union of the command rectangles, `None` for an empty subpath.
    pub fn bounding_rectangle(&self) -> Option<Rect> {
        self.commands
            .iter()
            .filter_map(PathCommand::bounding_rectangle)
            .reduce(union_rect)
    }

    /// True if the subpath draws anything beyond moves.
    pub fn is_drawn(&self) -> bool {
        self.commands
            .iter()
            .any(|c| matches!(c, PathCommand::Line { .. } | PathCommand::BezierCurve { .. }))
    }

    pub fn transform(&self, m: Matrix) -> Self {
        Self {
            commands: self.commands.iter().map(|c| c.transform(m)).collect(),
            start_point: self.start_point.map(|p| apply_matrix_pt(m, p)),
            current_point: self.current_point.map(|p| apply_matrix_pt(m, p)),
        }
    }
}

impl fmt::Display for Subpath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, cmd) in self.commands.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{cmd}")?;
        }
        Ok(())
    }
}

/// A painted, stroked or clipping path with its paint attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    subpaths: Vec<Subpath>,
    current: Option<Subpath>,
    /// Rule used for filling or clipping
    pub filling_rule: FillingRule,
    /// Non-stroking color at paint time
    pub fill_color: Option<Color>,
    /// Stroking color at paint time
    pub stroke_color: Option<Color>,
    /// Line width in device units
    pub line_width: f64,
    pub dash_pattern: Option<DashPattern>,
    pub line_cap: LineCap,
    pub line_join: LineJoin,
    is_clipping: bool,
    is_filled: bool,
    is_stroked: bool,
    finalized: bool,
}

impl Default for Path {
    fn default() -> Self {
        Self::new()
    }
}

impl Path {
    pub fn new() -> Self {
        Self {
            subpaths: Vec::new(),
            current: None,
            filling_rule: FillingRule::NonZeroWinding,
            fill_color: None,
            stroke_color: None,
            line_width: 1.0,
            dash_pattern: None,
            line_cap: LineCap::Butt,
            line_join: LineJoin::Miter,
            is_clipping: false,
            is_filled: false,
            is_stroked: false,
            finalized: false,
        }
    }

    /// Completed subpaths in construction order.
    pub fn subpaths(&self) -> &[Subpath] {
        &self.subpaths
    }

    /// True if no subpath has been completed or started.
    pub fn is_empty(&self) -> bool {
        self.subpaths.is_empty() && self.current.as_ref().is_none_or(Subpath::is_empty)
    }

    pub const fn is_clipping(&self) -> bool {
        self.is_clipping
    }

    pub const fn is_filled(&self) -> bool {
        self.is_filled
    }

    pub const fn is_stroked(&self) -> bool {
        self.is_stroked
    }

    pub const fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Current point: end of the open subpath, or the start point of the
    /// last subpath if it was closed.
    pub fn current_point(&self) -> Option<Point> {
        if let Some(cur) = &self.current
            && let Some(p) = cur.current_point()
        {
            return Some(p);
        }
        self.subpaths.last().and_then(Subpath::current_point)
    }

    const fn check_open(&self) -> Result<()> {
        if self.finalized {
            Err(PdfError::InvalidPathState(FINALIZED))
        } else {
            Ok(())
        }
    }

    /// Subpaths holding nothing but moves are dropped.
    fn finalize_current(&mut self) {
        if let Some(sub) = self.current.take()
            && (sub.is_drawn() || sub.is_closed())
        {
            self.subpaths.push(sub);
        }
    }

    /// Subpath under construction, started at the current point if needed.
    fn current_mut(&mut self) -> &mut Subpath {
        if self.current.is_none() {
            let mut sub = Subpath::new();
            if let Some((x, y)) = self.current_point() {
                sub.move_to(x, y);
            }
            self.current = Some(sub);
        }
        self.current.get_or_insert_with(Subpath::new)
    }

    /// Finalizes the subpath under construction and starts a new one.
    pub fn begin_subpath(&mut self) -> Result<()> {
        self.check_open()?;
        self.finalize_current();
        self.current = Some(Subpath::new());
        Ok(())
    }

    pub fn move_to(&mut self, x: f64, y: f64) -> Result<()> {
        self.check_open()?;
        match &mut self.current {
            Some(sub) => sub.move_to(x, y),
            None => {
                let mut sub = Subpath::new();
                sub.move_to(x, y);
                self.current = Some(sub);
            }
        }
        Ok(())
    }

    pub fn line_to(&mut self, x: f64, y: f64) -> Result<()> {
        self.check_open()?;
        self.current_mut().line_to(x, y);
        Ok(())
    }

    pub fn bezier_curve_to(&mut self, c1: Point, c2: Point, end: Point) -> Result<()> {
        self.check_open()?;
        self.current_mut().bezier_curve_to(c1, c2, end);
        Ok(())
    }

    /// Two-control-point form: the current point doubles as the first
    /// control point.
    pub fn bezier_curve_to_v(&mut self, c2: Point, end: Point) -> Result<()> {
        self.check_open()?;
        let sub = self.current_mut();
        let c1 = sub.current_point().unwrap_or(c2);
        sub.bezier_curve_to(c1, c2, end);
        Ok(())
    }

    /// Appends a closed polygon as its own subpath.
    pub fn polygon(&mut self, points: &[Point]) -> Result<()> {
        self.check_open()?;
        let Some((&first, rest)) = points.split_first() else {
            return Ok(());
        };
        self.finalize_current();
        let mut sub = Subpath::new();
        sub.move_to(first.0, first.1);
        for &(x, y) in rest {
            sub.line_to(x, y);
        }
        sub.line_to(first.0, first.1);
        sub.close();
        self.subpaths.push(sub);
        Ok(())
    }

    /// Appends the rectangle (x, y, w, h) as a closed subpath.
    pub fn rectangle(&mut self, x: f64, y: f64, w: f64, h: f64) -> Result<()> {
        self.polygon(&[(x, y), (x + w, y), (x + w, y + h), (x, y + h)])
    }

    /// Closes the subpath under construction and appends it to the path.
    ///
    /// Closing twice appends a single `Close`.
    pub fn close_subpath(&mut self) -> Result<()> {
        self.check_open()?;
        if let Some(mut sub) = self.current.take() {
            sub.close();
            if !sub.is_empty() {
                self.subpaths.push(sub);
            }
        }
        Ok(())
    }

    /// Marks the path as a clipping path. Clears the fill and stroke flags.
    pub fn mark_as_clip(&mut self, rule: FillingRule) {
        self.finalize_current();
        self.filling_rule = rule;
        self.is_clipping = true;
        self.is_filled = false;
        self.is_stroked = false;
        self.finalized = true;
    }

    pub fn mark_as_stroked(&mut self) {
        self.finalize_current();
        self.is_stroked = true;
        self.finalized = true;
    }

    pub fn mark_as_filled(&mut self, rule: FillingRule) {
        self.finalize_current();
        self.filling_rule = rule;
        self.is_filled = true;
        self.finalized = true;
    }

    /// Finalizes without changing the paint flags.
    pub(crate) fn seal(&mut self) {
        self.finalize_current();
        self.finalized = true;
    }

    pub(crate) fn push_subpath(&mut self, subpath: Subpath) {
        self.finalize_current();
        if !subpath.is_empty() {
            self.subpaths.push(subpath);
        }
    }

    /// Union of the subpath rectangles, `None` when there are no subpaths.
    pub fn bounding_rectangle(&self) -> Option<Rect> {
        self.subpaths
            .iter()
            .filter_map(Subpath::bounding_rectangle)
            .reduce(union_rect)
    }

    /// Same paint attributes, no geometry, open for construction.
    pub fn clone_empty(&self) -> Self {
        Self {
            subpaths: Vec::new(),
            current: None,
            filling_rule: self.filling_rule,
            fill_color: self.fill_color.clone(),
            stroke_color: self.stroke_color.clone(),
            line_width: self.line_width,
            dash_pattern: self.dash_pattern.clone(),
            line_cap: self.line_cap,
            line_join: self.line_join,
            is_clipping: self.is_clipping,
            is_filled: self.is_filled,
            is_stroked: self.is_stroked,
            finalized: false,
        }
    }

    /// Copy of the path with every point mapped through `m`.
    pub fn transform(&self, m: Matrix) -> Self {
        let mut out = self.clone();
        out.subpaths = self.subpaths.iter().map(|s| s.transform(m)).collect();
        out.current = self.current.as_ref().map(|s| s.transform(m));
        out
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, sub) in self.subpaths.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{sub}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rectangle_is_closed_subpath() {
        let mut path = Path::new();
        path.rectangle(0.0, 0.0, 10.0, 5.0).unwrap();
        assert_eq!(path.subpaths().len(), 1);
        let sub = &path.subpaths()[0];
        assert!(sub.is_closed());
        assert_eq!(sub.commands().len(), 6);
        assert_eq!(path.bounding_rectangle(), Some((0.0, 0.0, 10.0, 5.0)));
    }

    #[test]
    fn test_bezier_bounds_are_tight() {
        let cmd = PathCommand::BezierCurve {
            start: (0.0, 0.0),
            c1: (0.0, 10.0),
            c2: (10.0, 10.0),
            end: (10.0, 0.0),
        };
        let (x0, y0, x1, y1) = cmd.bounding_rectangle().unwrap();
        assert_eq!((x0, y0, x1), (0.0, 0.0, 10.0));
        assert!((y1 - 7.5).abs() < 1e-9);
    }

    #[test]
    fn test_line_after_close_starts_new_subpath() {
        let mut path = Path::new();
        path.begin_subpath().unwrap();
        path.move_to(1.0, 1.0).unwrap();
        path.line_to(5.0, 1.0).unwrap();
        path.close_subpath().unwrap();
        path.line_to(5.0, 5.0).unwrap();
        path.mark_as_stroked();
        assert_eq!(path.subpaths().len(), 2);
        assert_eq!(
            path.subpaths()[1].commands()[0],
            PathCommand::Move((1.0, 1.0))
        );
    }

    #[test]
    fn test_display() {
        let mut path = Path::new();
        path.begin_subpath().unwrap();
        path.move_to(0.0, 0.0).unwrap();
        path.line_to(2.5, 0.0).unwrap();
        path.close_subpath().unwrap();
        assert_eq!(path.to_string(), "M 0 0 L 2.5 0 Z");
    }
}
