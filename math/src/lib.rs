//! Fixed point, binary angles and the lookup tables the renderer and the
//! spatial queries share. Nothing in here calls a transcendental function
//! after the tables are built.

mod angle;
mod fixed_point;
mod intercept;
mod trig;

pub use angle::*;
pub use fixed_point::*;
pub use intercept::*;
pub use trig::*;

/// Shift from a BAM angle to a fine table index
pub const ANGLETOFINESHIFT: u32 = 19;

/// Convert a slope `num / den` (with `num <= den`) into an angle in the first
/// octant using the reciprocal table instead of a divide.
pub fn slope_angle(num: u32, den: u32) -> Angle {
    let mut num = num >> (FRACBITS - 3);
    let mut den = den >> FRACBITS;
    // keep the ratio but bring far denominators into table range
    while den as usize >= IDIV_LEN {
        num >>= 1;
        den >>= 1;
    }

    let mut num = num.wrapping_mul(idiv(den as usize) >> 9);
    num >>= (FRACBITS as u32 + 3) - SLOPEBITS;
    Angle::new(tantoangle(num as usize))
}

/// BAM angle of the vector from `(x1, y1)` to `(x2, y2)`, found by folding
/// the delta into the first octant and looking the slope up. `(0, 0)` gives
/// an angle of zero.
pub fn point_to_angle(x1: Fixed, y1: Fixed, x2: Fixed, y2: Fixed) -> Angle {
    let mut x = x2.wrapping_sub(x1);
    let mut y = y2.wrapping_sub(y1);

    if x == 0 && y == 0 {
        return Angle::default();
    }

    if x >= 0 {
        if y >= 0 {
            if x > y {
                return slope_angle(y as u32, x as u32);
            }
            return ANG90 - 1 - slope_angle(x as u32, y as u32);
        }
        y = -y;
        if x > y {
            return -slope_angle(y as u32, x as u32);
        }
        return slope_angle(x as u32, y as u32) + ANG270;
    }

    x = -x;
    if y >= 0 {
        if x > y {
            return ANG180 - 1 - slope_angle(y as u32, x as u32);
        }
        return slope_angle(x as u32, y as u32) + ANG90;
    }
    y = -y;
    if x > y {
        return slope_angle(y as u32, x as u32) + ANG180;
    }
    ANG270 - 1 - slope_angle(x as u32, y as u32)
}

/// Exact distance from `(view_x, view_y)` to `(x, y)`: rotate the point onto
/// the x axis using its angle and read off the length.
pub fn point_to_dist(view_x: Fixed, view_y: Fixed, x: Fixed, y: Fixed) -> Fixed {
    let mut x = x.wrapping_sub(view_x).wrapping_abs();
    let mut y = y.wrapping_sub(view_y).wrapping_abs();
    if y > x {
        std::mem::swap(&mut x, &mut y);
    }
    let angle = slope_angle(y as u32, x as u32).fine();
    let rotated = (x >> (FRACBITS - 3)).wrapping_mul(finecosine(angle))
        + (y >> (FRACBITS - 3)).wrapping_mul(finesine(angle));
    rotated >> 3
}

/// Cheap distance estimate: the larger axis plus half the smaller
pub fn approx_distance(dx: Fixed, dy: Fixed) -> Fixed {
    let dx = dx.wrapping_abs();
    let dy = dy.wrapping_abs();
    if dx < dy { dy + (dx >> 1) } else { dx + (dy >> 1) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Angle, b: Angle) -> bool {
        (a - b).abs().bam() <= 1
    }

    #[test]
    fn cardinal_angles() {
        let u = FRACUNIT;
        assert_eq!(point_to_angle(0, 0, u, 0), Angle::default());
        assert!(close(point_to_angle(0, 0, 0, u), ANG90));
        assert!(close(point_to_angle(0, 0, -u, 0), ANG180));
        assert!(close(point_to_angle(0, 0, 0, -u), ANG270));
        assert_eq!(point_to_angle(5, 5, 5, 5), Angle::default());
    }

    #[test]
    fn diagonal_angles() {
        let d = int_to_fixed(64);
        let tol = 1 << 22;
        let checks = [
            (d, d, ANG45),
            (-d, d, ANG90 + ANG45),
            (-d, -d, ANG180 + ANG45),
            (d, -d, ANG270 + ANG45),
        ];
        for (x, y, want) in checks {
            let got = point_to_angle(0, 0, x, y);
            assert!((got - want).abs().bam() < tol, "{x},{y} -> {got:?}");
        }
    }

    #[test]
    fn octant_is_monotonic() {
        let mut last = Angle::default();
        for step in 1..64 {
            let a = point_to_angle(0, 0, int_to_fixed(1000), int_to_fixed(step * 15));
            assert!(a >= last);
            last = a;
        }
    }

    #[test]
    fn distances() {
        let d = point_to_dist(0, 0, int_to_fixed(300), int_to_fixed(400));
        assert!((d - int_to_fixed(500)).abs() < int_to_fixed(2), "{d}");
        let d = point_to_dist(int_to_fixed(10), 0, int_to_fixed(10), int_to_fixed(-77));
        assert!((d - int_to_fixed(77)).abs() < FRACUNIT);
        assert_eq!(approx_distance(int_to_fixed(-30), int_to_fixed(40)), int_to_fixed(55));
    }

    #[test]
    fn far_slopes_stay_in_table() {
        // denominators beyond the reciprocal table still give sane angles
        let a = point_to_angle(0, 0, int_to_fixed(20000), int_to_fixed(20000));
        assert!((a - ANG45).abs().bam() < 1 << 22);
    }
}
