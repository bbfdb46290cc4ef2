//! Line segment clipping against an axis-aligned rectangle.

use crate::utils::{Point, Rect};

const INSIDE: u8 = 0;
const LEFT: u8 = 1;
const RIGHT: u8 = 2;
const BOTTOM: u8 = 4;
const TOP: u8 = 8;

fn outcode(p: Point, r: Rect) -> u8 {
    let mut code = INSIDE;
    if p.0 < r.0 {
        code |= LEFT;
    } else if p.0 > r.2 {
        code |= RIGHT;
    }
    if p.1 < r.1 {
        code |= BOTTOM;
    } else if p.1 > r.3 {
        code |= TOP;
    }
    code
}

/// Cohen-Sutherland clipping. `rect` is (xmin, ymin, xmax, ymax).
pub fn cohen_sutherland(p0: Point, p1: Point, rect: Rect) -> Option<(Point, Point)> {
    let (mut a, mut b) = (p0, p1);
    let mut code_a = outcode(a, rect);
    let mut code_b = outcode(b, rect);

    loop {
        if code_a | code_b == INSIDE {
            return Some((a, b));
        }
        if code_a & code_b != INSIDE {
            return None;
        }
        let out = if code_a != INSIDE { code_a } else { code_b };
        let (dx, dy) = (b.0 - a.0, b.1 - a.1);
        let p = if out & TOP != 0 {
            (a.0 + dx * (rect.3 - a.1) / dy, rect.3)
        } else if out & BOTTOM != 0 {
            (a.0 + dx * (rect.1 - a.1) / dy, rect.1)
        } else if out & RIGHT != 0 {
            (rect.2, a.1 + dy * (rect.2 - a.0) / dx)
        } else {
            (rect.0, a.1 + dy * (rect.0 - a.0) / dx)
        };
        if out == code_a {
            a = p;
            code_a = outcode(a, rect);
        } else {
            b = p;
            code_b = outcode(b, rect);
        }
    }
}

/// Liang-Barsky clipping. `rect` is (xmin, ymin, xmax, ymax).
pub fn liang_barsky(p0: Point, p1: Point, rect: Rect) -> Option<(Point, Point)> {
    let (dx, dy) = (p1.0 - p0.0, p1.1 - p0.1);
    let checks = [
        (-dx, p0.0 - rect.0),
        (dx, rect.2 - p0.0),
        (-dy, p0.1 - rect.1),
        (dy, rect.3 - p0.1),
    ];
    let (mut t0, mut t1) = (0.0f64, 1.0f64);
    for (p, q) in checks {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            if r > t1 {
                return None;
            }
            t0 = t0.max(r);
        } else {
            if r < t0 {
                return None;
            }
            t1 = t1.min(r);
        }
    }
    Some((
        (p0.0 + t0 * dx, p0.1 + t0 * dy),
        (p0.0 + t1 * dx, p0.1 + t1 * dy),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const R: Rect = (0.0, 0.0, 10.0, 10.0);

    #[test]
    fn test_fully_inside() {
        let seg = ((1.0, 1.0), (9.0, 2.0));
        assert_eq!(cohen_sutherland(seg.0, seg.1, R), Some(seg));
        assert_eq!(liang_barsky(seg.0, seg.1, R), Some(seg));
    }

    #[test]
    fn test_fully_outside() {
        assert_eq!(cohen_sutherland((-5.0, -5.0), (-1.0, 20.0), R), None);
        assert_eq!(liang_barsky((-5.0, -5.0), (-1.0, 20.0), R), None);
    }

    #[test]
    fn test_diagonal_through() {
        let cs = cohen_sutherland((-5.0, -5.0), (15.0, 15.0), R).unwrap();
        let lb = liang_barsky((-5.0, -5.0), (15.0, 15.0), R).unwrap();
        assert_eq!(cs, ((0.0, 0.0), (10.0, 10.0)));
        assert_eq!(lb, ((0.0, 0.0), (10.0, 10.0)));
    }
}
