use std::f64::consts::TAU;

use once_cell::sync::Lazy;

use crate::{FRACBITS, FRACUNIT, Fixed, fixed_div};

/// Entries in a full circle of the fine tables
pub const FINEANGLES: usize = 8192;
pub const FINEMASK: usize = FINEANGLES - 1;
/// `tantoangle` covers slopes 0..=1 in this many steps
pub const SLOPERANGE: usize = 2048;
pub const SLOPEBITS: u32 = 11;
/// Entries in the reciprocal table
pub const IDIV_LEN: usize = 8192;

/// A full circle plus a quarter so cosine can index the same table
static FINESINE: Lazy<Vec<Fixed>> = Lazy::new(|| {
    (0..FINEANGLES + FINEANGLES / 4)
        .map(|i| {
            let a = (i as f64 + 0.5) * TAU / FINEANGLES as f64;
            (a.sin() * FRACUNIT as f64).round() as Fixed
        })
        .collect()
});

/// -90..90 degrees, index 0 is just past -90
static FINETANGENT: Lazy<Vec<Fixed>> = Lazy::new(|| {
    (0..FINEANGLES / 2)
        .map(|i| {
            let a = (i as f64 - (FINEANGLES / 4) as f64 + 0.5) * TAU / FINEANGLES as f64;
            (a.tan() * FRACUNIT as f64).round() as Fixed
        })
        .collect()
});

static TANTOANGLE: Lazy<Vec<u32>> = Lazy::new(|| {
    (0..=SLOPERANGE)
        .map(|i| {
            let a = (i as f64 / SLOPERANGE as f64).atan();
            (a / TAU * 4_294_967_296.0).round() as u32
        })
        .collect()
});

/// `512.0 / i` in 16.16, with entry 0 saturated
static IDIVTABLE: Lazy<Vec<u32>> = Lazy::new(|| {
    (0..IDIV_LEN)
        .map(|i| {
            if i == 0 {
                u32::MAX
            } else {
                fixed_div(512 << FRACBITS, (i as i32) << FRACBITS) as u32
            }
        })
        .collect()
});

#[inline]
pub fn finesine(index: usize) -> Fixed {
    FINESINE[index & FINEMASK]
}

#[inline]
pub fn finecosine(index: usize) -> Fixed {
    FINESINE[(index & FINEMASK) + FINEANGLES / 4]
}

#[inline]
pub fn finetangent(index: usize) -> Fixed {
    FINETANGENT[index]
}

#[inline]
pub fn tantoangle(slope: usize) -> u32 {
    TANTOANGLE[slope.min(SLOPERANGE)]
}

/// Reciprocal lookup used to replace per column divides
#[inline]
pub fn idiv(value: usize) -> u32 {
    IDIVTABLE[value.min(IDIV_LEN - 1)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_sizes_and_edges() {
        assert_eq!(FINESINE.len(), 10240);
        assert_eq!(FINETANGENT.len(), 4096);
        assert_eq!(TANTOANGLE.len(), 2049);
        assert_eq!(tantoangle(SLOPERANGE), 0x2000_0000);
        assert_eq!(tantoangle(0), 0);
        assert!(finetangent(0) < -100 * FRACUNIT);
        assert!(finetangent(FINEANGLES / 2 - 1) > 100 * FRACUNIT);
    }

    #[test]
    fn cosine_is_shifted_sine() {
        for i in [0, 17, 2048, 5000, 6143] {
            assert_eq!(finecosine(i), finesine(i + FINEANGLES / 4));
        }
    }

    #[test]
    fn reciprocal_table() {
        assert_eq!(idiv(0), u32::MAX);
        assert_eq!(idiv(1), 512 << 16);
        assert_eq!(idiv(512), 1 << 16);
        assert_eq!(idiv(1024), 1 << 15);
        // past the end saturates to the last entry
        assert_eq!(idiv(100_000), idiv(IDIV_LEN - 1));
    }
}
