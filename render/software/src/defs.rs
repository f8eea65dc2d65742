use std::fmt;
use std::str::FromStr;

use math::{FRACBITS, FRACUNIT, Fixed};

/// Widest view the renderer is ever asked for
pub const MAXSCREENWIDTH: usize = 280;
pub const MAXSCREENHEIGHT: usize = 160;

/// Closest z allowed, sprites nearer than this are thrown out
pub const MINZ: Fixed = FRACUNIT * 4;
/// 90 degrees of view, in fine angles
pub const FIELDOFVIEW: usize = 2048;

/// Fraction bits kept in wall and plane heights
pub const HEIGHTBITS: i32 = 6;
pub const FIXEDTOHEIGHT: i32 = FRACBITS - HEIGHTBITS;
/// Fraction bits kept in a column scale
pub const SCALEBITS: i32 = 9;
pub const FIXEDTOSCALE: i32 = FRACBITS - SCALEBITS;
/// The sky is 256 columns around the full circle
pub const ANGLETOSKYSHIFT: u32 = 22;

/// Light values are 5.3, the multiplier only looks at the integer part
pub const LIGHTSCALESHIFT: u32 = 3;
pub const MAX_WALL_LIGHT: u32 = 15;
pub const MAX_FLOOR_LIGHT: u32 = 15;
pub const MAX_SPRITE_LIGHT: u32 = 31;

/// A visplane column nobody has written yet: top past bottom
pub(crate) const OPENMARK: u32 = ((MAXSCREENHEIGHT as u32) - 1) << 8;

// Wall 'action' flags for a vis wall
pub const AC_ADDFLOOR: u32 = 0x1;
pub const AC_ADDCEILING: u32 = 0x2;
pub const AC_TOPTEXTURE: u32 = 0x4;
pub const AC_BOTTOMTEXTURE: u32 = 0x8;
pub const AC_NEWCEILING: u32 = 0x10;
pub const AC_NEWFLOOR: u32 = 0x20;
pub const AC_ADDSKY: u32 = 0x40;
pub const AC_TOPSIL: u32 = 0x80;
pub const AC_BOTTOMSIL: u32 = 0x100;
pub const AC_SOLIDSIL: u32 = 0x200;

/// The six view sizes the game offers, largest first
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ScreenSize {
    #[default]
    Size280x160,
    Size256x144,
    Size224x128,
    Size192x112,
    Size160x96,
    Size128x80,
}

impl ScreenSize {
    pub const ALL: [ScreenSize; 6] = [
        ScreenSize::Size280x160,
        ScreenSize::Size256x144,
        ScreenSize::Size224x128,
        ScreenSize::Size192x112,
        ScreenSize::Size160x96,
        ScreenSize::Size128x80,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn width(self) -> i32 {
        [280, 256, 224, 192, 160, 128][self as usize]
    }

    pub const fn height(self) -> i32 {
        [160, 144, 128, 112, 96, 80][self as usize]
    }

    /// Vertical stretch so the low resolution views keep the TV aspect
    pub fn stretch(self) -> Fixed {
        let w = self.width() as f64;
        let h = self.height() as f64;
        ((160.0 / w) * (h / 180.0) * 2.2 * FRACUNIT as f64) as Fixed
    }
}

impl fmt::Display for ScreenSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width(), self.height())
    }
}

impl FromStr for ScreenSize {
    type Err = String;

    /// Accepts either the size index `0..=5` or `WIDTHxHEIGHT`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(index) = s.parse::<usize>() {
            return Self::from_index(index).ok_or_else(|| format!("no screen size {index}, use 0-5"));
        }
        Self::ALL
            .into_iter()
            .find(|size| size.to_string() == s)
            .ok_or_else(|| format!("unknown screen size {s}"))
    }
}

/// Fixed capacities of the per frame arrays. Anything past a limit is
/// dropped and counted in `FrameStats`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLimits {
    pub max_walls: usize,
    pub max_planes: usize,
    /// At most 128: the sprite index lives in the low 7 bits of the sort key
    pub max_sprites: usize,
    pub max_segs: usize,
    /// Bytes of silhouette storage
    pub max_openings: usize,
    /// Debug builds assert instead of clamping, for finding levels that need
    /// bigger stores
    pub assert_on_overflow: bool,
}

impl FrameLimits {
    pub const MAXWALLCMDS: usize = 128;
    pub const MAXVISPLANES: usize = 64;
    pub const MAXVISSPRITES: usize = 128;
    pub const MAXSEGS: usize = 32;
    pub const MAXOPENINGS: usize = MAXSCREENWIDTH * 64;

    /// Pull out of range values back into what the renderer can index
    pub fn sanitised(self) -> Self {
        Self {
            max_walls: self.max_walls.max(1),
            // visplane 0 is a dummy
            max_planes: self.max_planes.max(2),
            max_sprites: self.max_sprites.min(Self::MAXVISSPRITES),
            // the two sentinel posts are always present
            max_segs: self.max_segs.max(3),
            max_openings: self.max_openings,
            assert_on_overflow: self.assert_on_overflow,
        }
    }
}

impl Default for FrameLimits {
    fn default() -> Self {
        Self {
            max_walls: Self::MAXWALLCMDS,
            max_planes: Self::MAXVISPLANES,
            max_sprites: Self::MAXVISSPRITES,
            max_segs: Self::MAXSEGS,
            max_openings: Self::MAXOPENINGS,
            assert_on_overflow: false,
        }
    }
}

/// Counters for one rendered frame
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FrameStats {
    pub bsp_nodes: u32,
    pub subsectors: u32,
    pub walls: u32,
    pub planes: u32,
    pub sprites: u32,
    pub sprites_drawn: u32,
    pub sprite_pixels: u32,
    pub wall_overflow: u32,
    pub plane_overflow: u32,
    pub sprite_overflow: u32,
    pub seg_overflow: u32,
    pub opening_overflow: u32,
}

impl FrameStats {
    /// True if any capacity was hit this frame
    pub fn overflowed(&self) -> bool {
        self.wall_overflow
            + self.plane_overflow
            + self.sprite_overflow
            + self.seg_overflow
            + self.opening_overflow
            > 0
    }
}

impl fmt::Display for FrameStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "nodes {} subsectors {} walls {} planes {} sprites {}/{} ({} px)",
            self.bsp_nodes,
            self.subsectors,
            self.walls,
            self.planes,
            self.sprites_drawn,
            self.sprites,
            self.sprite_pixels
        )?;
        if self.overflowed() {
            write!(
                f,
                " overflow walls {} planes {} sprites {} segs {} openings {}",
                self.wall_overflow,
                self.plane_overflow,
                self.sprite_overflow,
                self.seg_overflow,
                self.opening_overflow
            )?;
        }
        Ok(())
    }
}

/// The range of columns on the screen clipped against, inclusive
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ClipRange {
    /// Leftmost starting pixel/column
    pub first: i32,
    /// Rightmost ending pixel/column
    pub last: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn screen_sizes() {
        assert_eq!(ScreenSize::default().width(), 280);
        assert_eq!(ScreenSize::Size128x80.height(), 80);
        assert_eq!("3".parse::<ScreenSize>(), Ok(ScreenSize::Size192x112));
        assert_eq!("160x96".parse::<ScreenSize>(), Ok(ScreenSize::Size160x96));
        assert!("9".parse::<ScreenSize>().is_err());
        assert!("100x100".parse::<ScreenSize>().is_err());
        // 160/280 * 160/180 * 2.2
        let s = ScreenSize::Size280x160.stretch();
        assert!((s - 73_233).abs() <= 1, "{s}");
    }

    #[test]
    fn limits_are_sanitised() {
        let limits = FrameLimits {
            max_walls: 0,
            max_planes: 0,
            max_sprites: 1000,
            max_segs: 0,
            max_openings: 5,
            assert_on_overflow: true,
        }
        .sanitised();
        assert!(limits.assert_on_overflow);
        assert_eq!(limits.max_sprites, 128);
        assert_eq!(limits.max_planes, 2);
        assert_eq!(limits.max_segs, 3);
        assert_eq!(FrameLimits::default().max_openings, 280 * 64);
    }

    #[test]
    fn stats_report_overflow() {
        let mut stats = FrameStats::default();
        assert!(!stats.overflowed());
        stats.plane_overflow = 2;
        assert!(stats.overflowed());
        assert!(stats.to_string().contains("planes 2"));
    }
}
