use glam::IVec2;

use crate::{FRACBITS, Fixed};

/// A partition or sight vector: origin plus delta, both 16.16 map units.
/// The BSP partition lines and the sight trace share this shape.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Trace {
    pub xy: IVec2,
    pub dxy: IVec2,
}

impl Trace {
    #[inline]
    pub const fn new(x: Fixed, y: Fixed, dx: Fixed, dy: Fixed) -> Self {
        Self {
            xy: IVec2::new(x, y),
            dxy: IVec2::new(dx, dy),
        }
    }

    /// Vector running from `v1` to `v2`
    #[inline]
    pub const fn from_points(v1: IVec2, v2: IVec2) -> Self {
        Self::new(v1.x, v1.y, v2.x.wrapping_sub(v1.x), v2.y.wrapping_sub(v1.y))
    }
}

/// Returns `true` when the point is on the back side of the vector.
///
/// Axis aligned partitions are answered without a multiply, then a sign
/// compare settles most of the rest. Only the remaining case needs the
/// integer cross product.
pub fn point_on_vector_side(x: Fixed, y: Fixed, line: &Trace) -> bool {
    let mut dx = line.dxy.x;
    let mut dy = line.dxy.y;

    let x = x.wrapping_sub(line.xy.x);
    if dx == 0 {
        if x <= 0 {
            dy = -dy;
        }
        return dy < 0;
    }

    let y = y.wrapping_sub(line.xy.y);
    if dy == 0 {
        if y <= 0 {
            dx = -dx;
        }
        return dx > 0;
    }

    if (dy ^ dx ^ x ^ y) < 0 {
        // negative compound sign, the front side is a positive cross product
        return (dy ^ x) < 0;
    }

    let left = (dy >> FRACBITS) * (x >> FRACBITS);
    let right = (dx >> FRACBITS) * (y >> FRACBITS);
    right >= left
}

/// Fraction along `first` where `second` crosses it, or `None` when the two
/// are parallel. Only the integer parts of the deltas take part.
pub fn intercept_vector(first: &Trace, second: &Trace) -> Option<Fixed> {
    let dx2 = second.dxy.x >> FRACBITS;
    let dy2 = second.dxy.y >> FRACBITS;

    let den = dy2 * (first.dxy.x >> FRACBITS) - dx2 * (first.dxy.y >> FRACBITS);
    if den == 0 {
        return None;
    }
    let num = ((second.xy.x - first.xy.x) >> FRACBITS) * dy2
        + ((first.xy.y - second.xy.y) >> FRACBITS) * dx2;
    Some((num << FRACBITS) / den)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::int_to_fixed as f;

    #[test]
    fn vertical_partition_sides() {
        // pointing north, the east half is the front
        let line = Trace::new(f(100), 0, 0, f(64));
        assert!(!point_on_vector_side(f(101), f(5), &line));
        assert!(point_on_vector_side(f(99), f(5), &line));
        // points on the line belong to the back
        assert!(point_on_vector_side(f(100), f(5), &line));
    }

    #[test]
    fn horizontal_partition_sides() {
        // pointing east, the south half is the front
        let line = Trace::new(0, f(50), f(64), 0);
        assert!(!point_on_vector_side(f(3), f(49), &line));
        assert!(!point_on_vector_side(f(3), f(50), &line));
        assert!(point_on_vector_side(f(3), f(51), &line));
    }

    #[test]
    fn diagonal_partition_sides() {
        let line = Trace::new(0, 0, f(10), f(10));
        // right of a north east vector is the front
        assert!(!point_on_vector_side(f(10), f(2), &line));
        assert!(point_on_vector_side(f(2), f(10), &line));
        assert!(!point_on_vector_side(f(-2), f(-10), &line));
        assert!(point_on_vector_side(f(-10), f(-2), &line));
    }

    #[test]
    fn intercepts() {
        let first = Trace::new(0, 0, f(100), 0);
        let second = Trace::new(f(25), f(-10), 0, f(20));
        assert_eq!(intercept_vector(&first, &second), Some(crate::FRACUNIT / 4));
        let parallel = Trace::new(0, f(5), f(30), 0);
        assert_eq!(intercept_vector(&first, &parallel), None);
    }
}
