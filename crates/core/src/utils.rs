//! Geometric helpers shared by the model, clipping engine and interpreter.
//!
//! Provides:
//! - Geometric types (Point, Rect, Matrix)
//! - Matrix transformation operations
//! - Rectangle unions and normalization

/// Small epsilon for floating-point comparisons.
pub const EPSILON: f64 = 1e-9;

/// A 2D point (x, y).
pub type Point = (f64, f64);

/// A rectangle defined by (x0, y0, x1, y1) where (x0, y0) is the bottom-left
/// and (x1, y1) the top-right corner.
pub type Rect = (f64, f64, f64, f64);

/// A 6-element affine transformation matrix (a, b, c, d, e, f).
/// Transforms point (x, y) to (ax + cy + e, bx + dy + f).
pub type Matrix = (f64, f64, f64, f64, f64, f64);

/// Identity transformation matrix.
pub const MATRIX_IDENTITY: Matrix = (1.0, 0.0, 0.0, 1.0, 0.0, 0.0);

/// Compares two floats for approximate equality.
#[inline]
pub fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
    (a - b).abs() < epsilon
}

/// Multiplies two matrices: result = m1 * m0.
/// This applies m1 first, then m0.
pub fn mult_matrix(m1: Matrix, m0: Matrix) -> Matrix {
    let (a1, b1, c1, d1, e1, f1) = m1;
    let (a0, b0, c0, d0, e0, f0) = m0;
    (
        a0 * a1 + c0 * b1,
        b0 * a1 + d0 * b1,
        a0 * c1 + c0 * d1,
        b0 * c1 + d0 * d1,
        a0 * e1 + c0 * f1 + e0,
        b0 * e1 + d0 * f1 + f0,
    )
}

/// Translates a matrix by (x, y) inside the projection.
pub fn translate_matrix(m: Matrix, v: Point) -> Matrix {
    let (a, b, c, d, e, f) = m;
    let (x, y) = v;
    (a, b, c, d, x * a + y * c + e, x * b + y * d + f)
}

/// Applies a matrix to a point.
#[inline]
pub fn apply_matrix_pt(m: Matrix, v: Point) -> Point {
    let (a, b, c, d, e, f) = m;
    let (x, y) = v;
    (a * x + c * y + e, b * x + d * y + f)
}

/// Applies a matrix to a vector (ignoring translation).
pub fn apply_matrix_norm(m: Matrix, v: Point) -> Point {
    let (a, b, c, d, _e, _f) = m;
    let (p, q) = v;
    (a * p + c * q, b * p + d * q)
}

/// Applies a matrix to a rectangle.
///
/// The result is the axis-aligned rectangle that tightly fits the
/// transformed corners.
pub fn apply_matrix_rect(m: Matrix, rect: Rect) -> Rect {
    let (x0, y0, x1, y1) = rect;
    let corners = [
        apply_matrix_pt(m, (x0, y0)),
        apply_matrix_pt(m, (x1, y0)),
        apply_matrix_pt(m, (x1, y1)),
        apply_matrix_pt(m, (x0, y1)),
    ];
    corners.iter().skip(1).fold(
        (corners[0].0, corners[0].1, corners[0].0, corners[0].1),
        |acc, &(x, y)| (acc.0.min(x), acc.1.min(y), acc.2.max(x), acc.3.max(y)),
    )
}

/// Scale factor a matrix applies to lengths (geometric mean of the axes).
pub fn matrix_scale(m: Matrix) -> f64 {
    let (a, b, c, d, _, _) = m;
    (a * d - b * c).abs().sqrt()
}

/// Componentwise union of two rectangles.
pub fn union_rect(r0: Rect, r1: Rect) -> Rect {
    (r0.0.min(r1.0), r0.1.min(r1.1), r0.2.max(r1.2), r0.3.max(r1.3))
}

/// Reorders corners so that x0 <= x1 and y0 <= y1.
pub fn normalize_rect(r: Rect) -> Rect {
    (r.0.min(r.2), r.1.min(r.3), r.0.max(r.2), r.1.max(r.3))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mult_matrix_identity() {
        let m = (2.0, 0.0, 0.0, 3.0, 5.0, 7.0);
        assert_eq!(mult_matrix(m, MATRIX_IDENTITY), m);
        assert_eq!(mult_matrix(MATRIX_IDENTITY, m), m);
    }

    #[test]
    fn test_apply_matrix_rect_rotation() {
        let rot90 = (0.0, 1.0, -1.0, 0.0, 0.0, 0.0);
        let r = apply_matrix_rect(rot90, (0.0, 0.0, 2.0, 1.0));
        assert!(approx_eq(r.0, -1.0, EPSILON));
        assert!(approx_eq(r.1, 0.0, EPSILON));
        assert!(approx_eq(r.2, 0.0, EPSILON));
        assert!(approx_eq(r.3, 2.0, EPSILON));
    }

    #[test]
    fn test_matrix_scale() {
        assert!(approx_eq(matrix_scale((2.0, 0.0, 0.0, 2.0, 9.0, 9.0)), 2.0, EPSILON));
    }
}
