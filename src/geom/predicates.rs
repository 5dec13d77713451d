//! Planar orientation and segment predicates.
//!
//! Plain floating-point evaluation; callers that need a tolerance apply it
//! themselves.

use nalgebra::Point2;

/// Twice the signed area of triangle (a, b, c).
///
/// Positive when the triangle is counter-clockwise, negative when clockwise,
/// zero when the points are collinear.
#[inline]
pub fn orient2d(a: &Point2<f64>, b: &Point2<f64>, c: &Point2<f64>) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

/// Check whether `p` lies on the closed segment `[a, b]`, assuming the three
/// points are collinear.
#[inline]
fn within_box(p: &Point2<f64>, a: &Point2<f64>, b: &Point2<f64>) -> bool {
    p.x >= a.x.min(b.x) && p.x <= a.x.max(b.x) && p.y >= a.y.min(b.y) && p.y <= a.y.max(b.y)
}

/// Check whether the closed segments `[p1, p2]` and `[q1, q2]` share at least
/// one point.
///
/// Touching endpoints and collinear overlaps count as intersections.
pub fn segments_intersect(
    p1: &Point2<f64>,
    p2: &Point2<f64>,
    q1: &Point2<f64>,
    q2: &Point2<f64>,
) -> bool {
    let d1 = orient2d(q1, q2, p1);
    let d2 = orient2d(q1, q2, p2);
    let d3 = orient2d(p1, p2, q1);
    let d4 = orient2d(p1, p2, q2);

    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }

    (d1 == 0.0 && within_box(p1, q1, q2))
        || (d2 == 0.0 && within_box(p2, q1, q2))
        || (d3 == 0.0 && within_box(q1, p1, p2))
        || (d4 == 0.0 && within_box(q2, p1, p2))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64) -> Point2<f64> {
        Point2::new(x, y)
    }

    #[test]
    fn test_orient2d_sign() {
        assert!(orient2d(&p(0.0, 0.0), &p(1.0, 0.0), &p(0.0, 1.0)) > 0.0);
        assert!(orient2d(&p(0.0, 0.0), &p(0.0, 1.0), &p(1.0, 0.0)) < 0.0);
        assert_eq!(orient2d(&p(0.0, 0.0), &p(1.0, 1.0), &p(2.0, 2.0)), 0.0);
    }

    #[test]
    fn test_segments_intersect_cases() {
        // Proper crossing
        assert!(segments_intersect(&p(0.0, 0.0), &p(1.0, 1.0), &p(1.0, 0.0), &p(0.0, 1.0)));
        // Shared endpoint
        assert!(segments_intersect(&p(0.0, 0.0), &p(1.0, 0.0), &p(1.0, 0.0), &p(2.0, 1.0)));
        // T-junction
        assert!(segments_intersect(&p(0.0, 0.0), &p(2.0, 0.0), &p(1.0, 0.0), &p(1.0, 1.0)));
        // Collinear overlap
        assert!(segments_intersect(&p(0.0, 0.0), &p(2.0, 0.0), &p(1.0, 0.0), &p(3.0, 0.0)));
        // Collinear, disjoint
        assert!(!segments_intersect(&p(0.0, 0.0), &p(1.0, 0.0), &p(2.0, 0.0), &p(3.0, 0.0)));
        // Parallel
        assert!(!segments_intersect(&p(0.0, 0.0), &p(1.0, 0.0), &p(0.0, 1.0), &p(1.0, 1.0)));
    }
}
