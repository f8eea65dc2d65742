/// Signed 16.16 fixed point. Arithmetic wraps silently like the original
/// engine; geometry is scaled to stay inside the range.
pub type Fixed = i32;

pub const FRACBITS: i32 = 16;
pub const FRACUNIT: Fixed = 1 << FRACBITS;

/// Multiply two 16.16 values. The 64 bit product is truncated back to 32
/// bits, so out of range results wrap.
#[inline]
pub const fn fixed_mul(a: Fixed, b: Fixed) -> Fixed {
    ((a as i64 * b as i64) >> FRACBITS) as i32
}

/// Divide two 16.16 values.
///
/// A zero divisor is a caller bug. Debug builds assert, release builds
/// saturate toward the sign of the numerator instead of trapping.
#[inline]
pub fn fixed_div(a: Fixed, b: Fixed) -> Fixed {
    debug_assert!(b != 0, "fixed_div by zero ({a} / 0)");
    if b == 0 {
        return if a < 0 { i32::MIN } else { i32::MAX };
    }
    (((a as i64) << FRACBITS) / b as i64) as i32
}

#[inline]
pub const fn int_to_fixed(value: i32) -> Fixed {
    value << FRACBITS
}

/// Integer part, rounding toward negative infinity.
#[inline]
pub const fn fixed_to_int(value: Fixed) -> i32 {
    value >> FRACBITS
}

/// Convert a `Fixed` to `f32`, only used for log output
pub const fn fixed_to_float(value: Fixed) -> f32 {
    value as f32 / FRACUNIT as f32
}

pub fn float_to_fixed(value: f32) -> Fixed {
    (value * FRACUNIT as f32) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mul_whole_and_fraction() {
        assert_eq!(fixed_mul(int_to_fixed(3), int_to_fixed(4)), int_to_fixed(12));
        assert_eq!(fixed_mul(int_to_fixed(3), FRACUNIT / 2), int_to_fixed(3) / 2);
        assert_eq!(fixed_mul(-FRACUNIT, int_to_fixed(7)), int_to_fixed(-7));
    }

    #[test]
    fn mul_wraps_instead_of_saturating() {
        let big = int_to_fixed(30000);
        let wrapped = fixed_mul(big, big);
        let expected = ((big as i64 * big as i64) >> FRACBITS) as i32;
        assert_eq!(wrapped, expected);
        assert_ne!(wrapped, i32::MAX);
    }

    #[test]
    fn div_round_trip() {
        let samples = [
            (int_to_fixed(10), int_to_fixed(3)),
            (int_to_fixed(-250), FRACUNIT / 3),
            (12345678, 87654),
            (FRACUNIT, int_to_fixed(-17)),
            (int_to_fixed(1000), 3 * FRACUNIT + 1234),
        ];
        for (a, b) in samples {
            let back = fixed_div(fixed_mul(a, b), b);
            // one ulp lost in the multiply, scaled by 1/b on the way back
            let tolerance = (fixed_div(FRACUNIT, b.abs()).abs() >> FRACBITS) + 2;
            assert!(
                (back - a).abs() <= tolerance,
                "a={a} b={b} back={back} tol={tolerance}"
            );
        }
    }

    #[test]
    fn to_int_floors() {
        assert_eq!(fixed_to_int(int_to_fixed(5) + 1), 5);
        assert_eq!(fixed_to_int(-1), -1);
        assert_eq!(fixed_to_float(FRACUNIT / 4), 0.25);
    }
}
