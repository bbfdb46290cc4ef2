//! Path clipping.
//!
//! Paths are flattened (curves become [`CURVE_SEGMENTS`] line segments) and
//! snapped to a fixed-point grid of [`SCALE`] units per user unit before
//! intersecting, then scaled back.

pub mod line;
pub mod polygon;

pub use line::{cohen_sutherland, liang_barsky};

use crate::error::{PdfError, Result};
use crate::model::path::{Path, PathCommand, Subpath, bezier_point};
use crate::utils::{Point, Rect};
use polygon::{IPoint, Ring};

/// Line segments per flattened Bézier curve.
pub const CURVE_SEGMENTS: usize = 10;

/// Fixed-point grid units per user unit.
pub const SCALE: f64 = 10_000.0;

#[inline]
fn to_fixed(p: Point) -> IPoint {
    ((p.0 * SCALE).round() as i64, (p.1 * SCALE).round() as i64)
}

#[inline]
fn from_fixed(p: (f64, f64)) -> Point {
    (p.0 / SCALE, p.1 / SCALE)
}

/// A flattened run of points and whether it was closed.
struct Polyline {
    points: Vec<IPoint>,
    closed: bool,
}

/// Flatten a subpath; every `Move` starts a new polyline.
fn flatten_subpath(sub: &Subpath, out: &mut Vec<Polyline>) {
    let mut current: Option<Polyline> = None;
    let push = |cur: &mut Option<Polyline>, p: Point| {
        let q = to_fixed(p);
        let line = cur.get_or_insert_with(|| Polyline {
            points: Vec::new(),
            closed: false,
        });
        if line.points.last() != Some(&q) {
            line.points.push(q);
        }
    };

    for cmd in sub.commands() {
        match *cmd {
            PathCommand::Move(p) => {
                out.extend(current.take());
                push(&mut current, p);
            }
            PathCommand::Line { from, to } => {
                if current.is_none() {
                    push(&mut current, from);
                }
                push(&mut current, to);
            }
            PathCommand::BezierCurve { start, c1, c2, end } => {
                if current.is_none() {
                    push(&mut current, start);
                }
                for i in 1..=CURVE_SEGMENTS {
                    let t = i as f64 / CURVE_SEGMENTS as f64;
                    push(
                        &mut current,
                        (
                            bezier_point(start.0, c1.0, c2.0, end.0, t),
                            bezier_point(start.1, c1.1, c2.1, end.1, t),
                        ),
                    );
                }
            }
            PathCommand::Close => {
                if let Some(line) = &mut current {
                    line.closed = true;
                }
            }
        }
    }
    out.extend(current);
}

fn flatten(path: &Path) -> Vec<Polyline> {
    let mut out = Vec::new();
    for sub in path.subpaths() {
        flatten_subpath(sub, &mut out);
    }
    out
}

/// Closed rings of a path, force-closing open subpaths.
fn rings(path: &Path) -> Vec<Ring> {
    flatten(path)
        .into_iter()
        .filter_map(|pl| {
            let mut ring = pl.points;
            polygon::simplify_ring(&mut ring);
            (ring.len() >= 3).then_some(ring)
        })
        .collect()
}

/// Intersect `subject` with the region of `clip_path`.
///
/// Filled or clipping subjects are intersected as closed polygons; other
/// subjects keep their open topology and only lose their invisible parts.
/// Returns `Ok(None)` when nothing of the subject remains.
pub fn clip(clip_path: &Path, subject: &Path) -> Result<Option<Path>> {
    if !clip_path.is_clipping() {
        return Err(PdfError::InvalidArgument(
            "clip operand is not a clipping path".into(),
        ));
    }
    if subject.is_empty() {
        return Ok(Some(subject.clone()));
    }

    let clip_rings = rings(clip_path);
    if clip_rings.is_empty() {
        return Ok(None);
    }

    let mut out = subject.clone_empty();
    if subject.is_filled() || subject.is_clipping() {
        let subject_rings = rings(subject);
        let contours = polygon::intersect(
            &subject_rings,
            subject.filling_rule,
            &clip_rings,
            clip_path.filling_rule,
        );
        for contour in contours {
            let points: Vec<Point> = contour
                .iter()
                .map(|&(x, y)| from_fixed((x as f64, y as f64)))
                .collect();
            out.polygon(&points)?;
        }
    } else {
        for mut pl in flatten(subject) {
            if pl.closed
                && let Some(&first) = pl.points.first()
                && pl.points.last() != Some(&first)
            {
                pl.points.push(first);
            }
            for run in polygon::clip_polyline(&pl.points, &clip_rings, clip_path.filling_rule) {
                let mut sub = Subpath::new();
                for (i, p) in run.into_iter().map(from_fixed).enumerate() {
                    if i == 0 {
                        sub.move_to(p.0, p.1);
                    } else {
                        sub.line_to(p.0, p.1);
                    }
                }
                out.push_subpath(sub);
            }
        }
    }

    if out.subpaths().is_empty() {
        return Ok(None);
    }
    out.seal();
    Ok(Some(out))
}

/// The rectangle a clipping path describes, if it is a single
/// axis-aligned rectangle.
pub fn as_rectangle(path: &Path) -> Option<Rect> {
    let [sub] = path.subpaths() else {
        return None;
    };
    if sub.commands().iter().any(|c| matches!(c, PathCommand::BezierCurve { .. })) {
        return None;
    }
    let mut lines = Vec::new();
    flatten_subpath(sub, &mut lines);
    let [pl] = lines.as_slice() else {
        return None;
    };
    let mut ring = pl.points.clone();
    polygon::simplify_ring(&mut ring);
    if ring.len() != 4 {
        return None;
    }
    let axis_aligned = (0..4).all(|i| {
        let (a, b) = (ring[i], ring[(i + 1) % 4]);
        a.0 == b.0 || a.1 == b.1
    });
    if !axis_aligned {
        return None;
    }
    let xs = ring.iter().map(|p| p.0);
    let ys = ring.iter().map(|p| p.1);
    let (x0, x1) = (xs.clone().min()?, xs.max()?);
    let (y0, y1) = (ys.clone().min()?, ys.max()?);
    Some((
        x0 as f64 / SCALE,
        y0 as f64 / SCALE,
        x1 as f64 / SCALE,
        y1 as f64 / SCALE,
    ))
}
