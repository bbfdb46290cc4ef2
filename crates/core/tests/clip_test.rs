//! Tests for the clipping engine - polygon intersection and the two line
//! clippers.

use trazo_core::clip::{CURVE_SEGMENTS, SCALE, as_rectangle, clip, cohen_sutherland, liang_barsky};
use trazo_core::model::path::{FillingRule, Path, PathCommand};
use trazo_core::utils::{Point, Rect};

fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> Path {
    let mut p = Path::new();
    p.polygon(&[(x0, y0), (x1, y0), (x1, y1), (x0, y1)]).unwrap();
    p
}

fn clip_square(x0: f64, y0: f64, x1: f64, y1: f64) -> Path {
    let mut p = square(x0, y0, x1, y1);
    p.mark_as_clip(FillingRule::NonZeroWinding);
    p
}

/// Distinct vertices of a path, sorted.
fn vertices(path: &Path) -> Vec<Point> {
    let mut pts: Vec<Point> = path
        .subpaths()
        .iter()
        .flat_map(|s| s.commands())
        .filter_map(|c| match *c {
            PathCommand::Move(p) => Some(p),
            PathCommand::Line { to, .. } => Some(to),
            _ => None,
        })
        .collect();
    pts.sort_by(|a, b| a.partial_cmp(b).unwrap());
    pts.dedup();
    pts
}

// ============================================================================
// Polygon clipping
// ============================================================================

#[test]
fn test_constants() {
    assert_eq!(CURVE_SEGMENTS, 10);
    assert_eq!(SCALE, 10_000.0);
}

#[test]
fn test_empty_subject_is_returned_unchanged() {
    let subject = Path::new();
    assert_eq!(clip(&clip_square(0.0, 0.0, 5.0, 5.0), &subject).unwrap(), Some(subject));
}

#[test]
fn test_overlapping_squares() {
    let mut subject = square(0.0, 0.0, 10.0, 10.0);
    subject.mark_as_filled(FillingRule::NonZeroWinding);
    let out = clip(&clip_square(5.0, 5.0, 15.0, 15.0), &subject)
        .unwrap()
        .unwrap();

    assert_eq!(
        vertices(&out),
        vec![(5.0, 5.0), (5.0, 10.0), (10.0, 5.0), (10.0, 10.0)]
    );
    assert!(out.is_filled());
    assert!(out.subpaths().iter().all(|s| s.is_closed()));
}

#[test]
fn test_disjoint_fill_is_gone() {
    let mut subject = square(0.0, 0.0, 1.0, 1.0);
    subject.mark_as_filled(FillingRule::NonZeroWinding);
    assert_eq!(clip(&clip_square(5.0, 5.0, 6.0, 6.0), &subject).unwrap(), None);
}

#[test]
fn test_open_clip_subpath_is_force_closed() {
    let mut open = Path::new();
    open.move_to(0.0, 0.0).unwrap();
    open.line_to(4.0, 0.0).unwrap();
    open.line_to(4.0, 4.0).unwrap();
    open.line_to(0.0, 4.0).unwrap();
    open.mark_as_clip(FillingRule::NonZeroWinding);

    let mut subject = square(2.0, 2.0, 6.0, 6.0);
    subject.mark_as_filled(FillingRule::NonZeroWinding);
    let out = clip(&open, &subject).unwrap().unwrap();
    assert_eq!(out.bounding_rectangle(), Some((2.0, 2.0, 4.0, 4.0)));
}

#[test]
fn test_even_odd_clip_excludes_hole() {
    let mut ring = square(0.0, 0.0, 10.0, 10.0);
    ring.polygon(&[(3.0, 3.0), (7.0, 3.0), (7.0, 7.0), (3.0, 7.0)])
        .unwrap();
    ring.mark_as_clip(FillingRule::EvenOdd);

    let mut inside_hole = square(4.0, 4.0, 6.0, 6.0);
    inside_hole.mark_as_filled(FillingRule::NonZeroWinding);
    assert_eq!(clip(&ring, &inside_hole).unwrap(), None);

    let mut in_band = square(1.0, 1.0, 2.0, 2.0);
    in_band.mark_as_filled(FillingRule::NonZeroWinding);
    assert!(clip(&ring, &in_band).unwrap().is_some());
}

#[test]
fn test_stroke_keeps_open_topology() {
    let mut line = Path::new();
    line.move_to(-5.0, 5.0).unwrap();
    line.line_to(15.0, 5.0).unwrap();
    line.mark_as_stroked();

    let out = clip(&clip_square(0.0, 0.0, 10.0, 10.0), &line).unwrap().unwrap();
    assert!(out.is_stroked());
    assert_eq!(out.subpaths().len(), 1);
    assert!(!out.subpaths()[0].is_closed());
    assert_eq!(out.bounding_rectangle(), Some((0.0, 5.0, 10.0, 5.0)));
}

#[test]
fn test_as_rectangle_detects_axis_aligned_clip() {
    assert_eq!(
        as_rectangle(&clip_square(1.0, 2.0, 3.0, 4.0)),
        Some((1.0, 2.0, 3.0, 4.0))
    );
}

// ============================================================================
// Line clipping
// ============================================================================

fn close(a: Point, b: Point) -> bool {
    (a.0 - b.0).abs() < 1e-6 && (a.1 - b.1).abs() < 1e-6
}

#[test]
fn test_line_clippers_agree() {
    let rects: [Rect; 2] = [(0.0, 0.0, 10.0, 10.0), (-3.5, 1.25, 4.75, 20.5)];
    let xs = [-7.3, -1.1, 2.7, 6.1, 13.9];
    let ys = [-4.3, 3.3, 8.9, 12.7];
    let points: Vec<Point> = xs
        .iter()
        .flat_map(|&x| ys.iter().map(move |&y| (x, y)))
        .collect();

    for rect in rects {
        for &p0 in &points {
            for &p1 in &points {
                if p0 == p1 {
                    continue;
                }
                let cs = cohen_sutherland(p0, p1, rect);
                let lb = liang_barsky(p0, p1, rect);
                match (cs, lb) {
                    (None, None) => {}
                    (Some((a0, a1)), Some((b0, b1))) => {
                        assert!(
                            close(a0, b0) && close(a1, b1),
                            "{p0:?}->{p1:?} in {rect:?}: {cs:?} vs {lb:?}"
                        );
                    }
                    _ => panic!("{p0:?}->{p1:?} in {rect:?}: {cs:?} vs {lb:?}"),
                }
            }
        }
    }
}

#[test]
fn test_line_inside_is_untouched() {
    let r = (0.0, 0.0, 10.0, 10.0);
    let seg = ((1.0, 2.0), (3.0, 4.0));
    assert_eq!(cohen_sutherland(seg.0, seg.1, r), Some(seg));
    assert_eq!(liang_barsky(seg.0, seg.1, r), Some(seg));
}
