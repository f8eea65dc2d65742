use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use crate::trig::{FINEANGLES, finecosine, finesine, finetangent};
use crate::{ANGLETOFINESHIFT, Fixed};

/// Binary angle measurement: the full `u32` range maps onto 0..360 degrees
/// and every operation wraps.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Angle(u32);

pub const ANG45: Angle = Angle(0x2000_0000);
pub const ANG90: Angle = Angle(0x4000_0000);
pub const ANG180: Angle = Angle(0x8000_0000);
pub const ANG270: Angle = Angle(0xC000_0000);

impl Angle {
    #[inline]
    pub const fn new(bam: u32) -> Self {
        Angle(bam)
    }

    #[inline]
    pub const fn bam(self) -> u32 {
        self.0
    }

    /// The same bits read as a signed angle, -180..180
    #[inline]
    pub const fn signed(self) -> i32 {
        self.0 as i32
    }

    /// Index into the fine trig tables
    #[inline]
    pub const fn fine(self) -> usize {
        (self.0 >> ANGLETOFINESHIFT) as usize
    }

    #[inline]
    pub fn sin(self) -> Fixed {
        finesine(self.fine())
    }

    #[inline]
    pub fn cos(self) -> Fixed {
        finecosine(self.fine())
    }

    /// Tangent of an angle in the -90..90 window, where `self` is offset by
    /// `ANG90` so that 0 maps to the start of the table.
    #[inline]
    pub fn tan_from_offset(self) -> Fixed {
        finetangent(self.fine() & (FINEANGLES / 2 - 1))
    }

    /// Absolute angular distance from zero, 0..=180 degrees
    #[inline]
    pub const fn abs(self) -> Angle {
        if (self.0 as i32) < 0 {
            Angle(self.0.wrapping_neg())
        } else {
            self
        }
    }

    #[inline]
    pub const fn wrapping_mul(self, by: u32) -> Angle {
        Angle(self.0.wrapping_mul(by))
    }

    pub fn to_degrees(self) -> f32 {
        self.0 as f32 * (360.0 / 4_294_967_296.0)
    }
}

impl Add for Angle {
    type Output = Angle;
    #[inline]
    fn add(self, other: Angle) -> Angle {
        Angle(self.0.wrapping_add(other.0))
    }
}

impl Add<u32> for Angle {
    type Output = Angle;
    #[inline]
    fn add(self, other: u32) -> Angle {
        Angle(self.0.wrapping_add(other))
    }
}

impl AddAssign for Angle {
    #[inline]
    fn add_assign(&mut self, other: Angle) {
        self.0 = self.0.wrapping_add(other.0);
    }
}

impl Sub for Angle {
    type Output = Angle;
    #[inline]
    fn sub(self, other: Angle) -> Angle {
        Angle(self.0.wrapping_sub(other.0))
    }
}

impl Sub<u32> for Angle {
    type Output = Angle;
    #[inline]
    fn sub(self, other: u32) -> Angle {
        Angle(self.0.wrapping_sub(other))
    }
}

impl SubAssign for Angle {
    #[inline]
    fn sub_assign(&mut self, other: Angle) {
        self.0 = self.0.wrapping_sub(other.0);
    }
}

impl Neg for Angle {
    type Output = Angle;
    #[inline]
    fn neg(self) -> Angle {
        Angle(self.0.wrapping_neg())
    }
}

impl From<u32> for Angle {
    fn from(bam: u32) -> Self {
        Angle(bam)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FRACUNIT;

    #[test]
    fn wraps_both_ways() {
        assert_eq!(ANG270 + ANG180, ANG90);
        assert_eq!(Angle::default() - ANG90, ANG270);
        assert_eq!(-ANG90, ANG270);
        assert_eq!(ANG45.wrapping_mul(9), ANG45);
    }

    #[test]
    fn abs_and_signed() {
        assert_eq!(ANG270.abs(), ANG90);
        assert_eq!(ANG90.abs(), ANG90);
        assert!(ANG270.signed() < 0);
        assert_eq!(ANG180.to_degrees(), 180.0);
    }

    #[test]
    fn table_trig() {
        assert!((ANG90.sin() - FRACUNIT).abs() < 8);
        assert!(ANG90.cos().abs() < 32);
        assert!((ANG180.cos() + FRACUNIT).abs() < 8);
        // tan(45) sits a quarter turn into the offset window
        assert!(((ANG90 + ANG45).tan_from_offset() - FRACUNIT).abs() < 64);
    }
}
