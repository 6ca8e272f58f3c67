use std::cmp::Ordering;

use geo::{Coordinate, GeoFloat, Line};

/// Lexicographic comparison of coordinates: by `x`, then by `y`.
///
/// Panics if a coordinate is not comparable (NaN); segments are
/// checked for finiteness on construction, so this never fires for
/// coordinates stored in the map.
pub(crate) fn lex_cmp<T: GeoFloat>(a: &Coordinate<T>, b: &Coordinate<T>) -> Ordering {
    a.x.partial_cmp(&b.x)
        .map(|o| {
            o.then_with(|| {
                a.y.partial_cmp(&b.y)
                    .expect("coordinates must be comparable")
            })
        })
        .expect("coordinates must be comparable")
}

/// A line segment with end-points normalized left-to-right.
///
/// The `left` end-point is the lexicographically smaller one (smaller
/// `x`, ties broken by smaller `y`). Normalization happens once, in
/// the [`From<Line>`] conversion; the type is `Copy`, so every copy
/// stays normalized.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment<T: GeoFloat> {
    left: Coordinate<T>,
    right: Coordinate<T>,
}

/// Convert from a [`Line`], ordering the end-points.
impl<T: GeoFloat> From<Line<T>> for Segment<T> {
    fn from(line: Line<T>) -> Self {
        for c in [line.start, line.end].iter() {
            assert!(
                c.x.is_finite() && c.y.is_finite(),
                "segment requires finite coordinates"
            );
        }
        let (mut left, mut right) = (line.start, line.end);
        if lex_cmp(&left, &right) == Ordering::Greater {
            std::mem::swap(&mut left, &mut right);
        }
        Segment { left, right }
    }
}

impl<T: GeoFloat> Segment<T> {
    /// The left (lexicographically smaller) end-point.
    #[inline]
    pub fn left(&self) -> Coordinate<T> {
        self.left
    }

    /// The right (lexicographically larger) end-point.
    #[inline]
    pub fn right(&self) -> Coordinate<T> {
        self.right
    }

    /// The segment as a [`Line`] from left to right.
    #[inline]
    pub fn line(&self) -> Line<T> {
        Line::new(self.left, self.right)
    }

    /// Twice the signed area of the triangle (left, right, pt).
    /// Positive iff `pt` is strictly above the supporting line.
    fn signed_area(&self, pt: Coordinate<T>) -> T {
        (self.right.x - self.left.x) * (pt.y - self.left.y)
            - (self.right.y - self.left.y) * (pt.x - self.left.x)
    }

    /// Is `target` above the line through this segment?
    ///
    /// If the signed area at `target` is within `tolerance` of zero
    /// (near-collinear, or a query aligned with an end-point), the
    /// tie is broken by the sign of the area at `guide` instead. The
    /// guide is typically the other end-point of the segment being
    /// located, which resolves the query deterministically.
    pub(crate) fn is_above(
        &self,
        target: Coordinate<T>,
        guide: Coordinate<T>,
        tolerance: T,
    ) -> bool {
        let area = self.signed_area(target);
        if area.abs() > tolerance {
            area > T::zero()
        } else {
            self.signed_area(guide) > T::zero()
        }
    }

    /// The point on the supporting line at abscissa `x`.
    ///
    /// Callers only invoke this for `x` within the segment's x-range;
    /// outside it the supporting line no longer bounds a trapezoid.
    pub(crate) fn point_at_x(&self, x: T) -> Coordinate<T> {
        debug_assert!(
            self.left.x <= x && x <= self.right.x,
            "interpolation outside the segment's x-range"
        );
        let y = self.left.y
            + (self.right.y - self.left.y) / (self.right.x - self.left.x) * (x - self.left.x);
        Coordinate { x, y }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn normalizes_left_to_right() {
        let seg = Segment::from(Line::from([(3., 1.), (-2., 5.)]));
        assert_eq!(seg.left(), Coordinate { x: -2., y: 5. });
        assert_eq!(seg.right(), Coordinate { x: 3., y: 1. });

        // Ties on x are broken by y.
        let seg = Segment::from(Line::from([(0., 2.), (0., -1.)]));
        assert_eq!(seg.left(), Coordinate { x: 0., y: -1. });
        assert_eq!(seg.right(), Coordinate { x: 0., y: 2. });
    }

    #[test]
    fn is_above_clear_cases() {
        let seg = Segment::from(Line::from([(-50., 0.), (50., 0.)]));
        let guide = Coordinate { x: 50., y: 0. };
        assert!(seg.is_above(Coordinate { x: 0., y: 10. }, guide, 0.1));
        assert!(!seg.is_above(Coordinate { x: 0., y: -10. }, guide, 0.1));
    }

    #[test]
    fn is_above_falls_back_to_guide() {
        let seg = Segment::from(Line::from([(-50., 0.), (50., 0.)]));
        // Target is exactly on the line; the guide decides.
        let on_line = Coordinate { x: 0., y: 0. };
        assert!(seg.is_above(on_line, Coordinate { x: 10., y: 30. }, 0.1));
        assert!(!seg.is_above(on_line, Coordinate { x: 10., y: -30. }, 0.1));
    }

    #[test]
    fn interpolation_at_x() {
        let seg = Segment::from(Line::from([(0., 0.), (10., 5.)]));
        let pt = seg.point_at_x(4.);
        assert_relative_eq!(pt.y, 2.);
        let pt = seg.point_at_x(0.);
        assert_relative_eq!(pt.y, 0.);
    }
}
