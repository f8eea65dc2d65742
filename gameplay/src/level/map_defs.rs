use std::cell::Cell;

use glam::IVec2;
use math::{Angle, Fixed, Trace, point_to_angle};

use crate::level::flags::LineDefFlags;
use crate::pic::SKY_FLAT;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlopeType {
    Horizontal,
    Vertical,
    Positive,
    Negative,
}

/// The SECTORS record, at runtime.
///
/// Things inside the sector are not stored here, the `MobjArena` keeps the
/// list heads so this can stay plain data.
#[derive(Debug, Default, Clone)]
pub struct Sector {
    /// An incremented "ID" of sorts.
    pub num: u32,
    pub floorheight: Fixed,
    pub ceilingheight: Fixed,
    /// Is a tag or index to a flat
    pub floorpic: usize,
    /// Is a tag or index to a flat, `SKY_FLAT` for an open sky
    pub ceilingpic: usize,
    pub lightlevel: u32,
    pub special: i16,
    pub tag: i16,
    /// Every line that has this sector on either side
    pub lines: Vec<usize>,
    /// Bounding box in blockmap cells: top, bottom, left, right
    pub blockbox: [i32; 4],
}

impl Sector {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        num: u32,
        floorheight: Fixed,
        ceilingheight: Fixed,
        floorpic: usize,
        ceilingpic: usize,
        lightlevel: u32,
        special: i16,
        tag: i16,
    ) -> Self {
        Self {
            num,
            floorheight,
            ceilingheight,
            floorpic,
            ceilingpic,
            lightlevel,
            special,
            tag,
            ..Self::default()
        }
    }

    #[inline]
    pub fn is_sky(&self) -> bool {
        self.ceilingpic == SKY_FLAT
    }
}

#[derive(Debug, Clone)]
pub struct SideDef {
    // add this to the calculated texture column
    pub textureoffset: Fixed,
    // add this to the calculated texture top
    pub rowoffset: Fixed,
    pub toptexture: Option<usize>,
    pub bottomtexture: Option<usize>,
    pub midtexture: Option<usize>,
    /// Sector the SideDef is facing.
    pub sector: usize,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BBox {
    pub top: Fixed,
    pub bottom: Fixed,
    pub left: Fixed,
    pub right: Fixed,
}

impl BBox {
    pub fn new(v1: IVec2, v2: IVec2) -> Self {
        Self {
            top: v1.y.max(v2.y),
            bottom: v1.y.min(v2.y),
            left: v1.x.min(v2.x),
            right: v1.x.max(v2.x),
        }
    }

    /// A box that any added point will replace
    pub const fn cleared() -> Self {
        Self {
            top: Fixed::MIN,
            bottom: Fixed::MAX,
            left: Fixed::MAX,
            right: Fixed::MIN,
        }
    }

    pub fn add_point(&mut self, x: Fixed, y: Fixed) {
        self.left = self.left.min(x);
        self.right = self.right.max(x);
        self.bottom = self.bottom.min(y);
        self.top = self.top.max(y);
    }

    pub fn add_box(&mut self, other: &BBox) {
        self.add_point(other.left, other.bottom);
        self.add_point(other.right, other.top);
    }
}

#[derive(Debug)]
pub struct LineDef {
    // Vertices, from v1 to v2.
    pub v1: IVec2,
    pub v2: IVec2,
    // Precalculated v2 - v1 for side checking.
    pub delta: IVec2,
    pub flags: u32,
    pub special: i16,
    pub tag: i16,
    pub bbox: BBox,
    // To aid move clipping.
    pub slopetype: SlopeType,
    pub front_sidedef: usize,
    pub back_sidedef: Option<usize>,
    // Front and back sector.
    pub frontsector: usize,
    pub backsector: Option<usize>,
    /// Set by the renderer the first time any seg of the line is drawn
    pub mapped: Cell<bool>,
}

impl LineDef {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        v1: IVec2,
        v2: IVec2,
        flags: u32,
        special: i16,
        tag: i16,
        front_sidedef: usize,
        back_sidedef: Option<usize>,
        frontsector: usize,
        backsector: Option<usize>,
    ) -> Self {
        let delta = v2 - v1;
        let slopetype = if delta.x == 0 {
            SlopeType::Vertical
        } else if delta.y == 0 {
            SlopeType::Horizontal
        } else if (delta.y > 0) == (delta.x > 0) {
            SlopeType::Positive
        } else {
            SlopeType::Negative
        };

        Self {
            v1,
            v2,
            delta,
            flags,
            special,
            tag,
            bbox: BBox::new(v1, v2),
            slopetype,
            front_sidedef,
            back_sidedef,
            frontsector,
            backsector,
            mapped: Cell::new(flags & LineDefFlags::Mapped as u32 != 0),
        }
    }

    #[inline]
    pub fn trace(&self) -> Trace {
        Trace::from_points(self.v1, self.v2)
    }

    #[inline]
    pub fn is_mapped(&self) -> bool {
        self.mapped.get()
    }
}

#[derive(Debug, Clone)]
pub struct Segment {
    // Vertices, from v1 to v2.
    pub v1: IVec2,
    pub v2: IVec2,
    /// Offset distance along the linedef (from `start_vertex`) to the start
    /// of this `Segment`
    pub offset: Fixed,
    pub angle: Angle,
    pub sidedef: usize,
    /// The Linedef this segment travels along
    pub linedef: usize,
    pub frontsector: usize,
    pub backsector: Option<usize>,
}

impl Segment {
    pub fn new(
        v1: IVec2,
        v2: IVec2,
        offset: Fixed,
        sidedef: usize,
        linedef: usize,
        frontsector: usize,
        backsector: Option<usize>,
    ) -> Self {
        Self {
            v1,
            v2,
            offset,
            angle: point_to_angle(v1.x, v1.y, v2.x, v2.y),
            sidedef,
            linedef,
            frontsector,
            backsector,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SubSector {
    pub sector: usize,
    /// How many `Segment`s line this `SubSector`
    pub seg_count: u32,
    /// The `Segment` to start with
    pub start_seg: u32,
}

impl SubSector {
    #[inline]
    pub fn segs(&self) -> std::ops::Range<usize> {
        self.start_seg as usize..(self.start_seg + self.seg_count) as usize
    }
}

/// One side of a BSP split: either another node or a leaf
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeChild {
    Node(u32),
    SubSector(u32),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Where the line used for splitting the level starts
    pub xy: IVec2,
    /// Direction and length of the splitting line
    pub delta: IVec2,
    /// Bounding box of each child, front (right) first
    pub bboxes: [BBox; 2],
    /// Front child first, `children[side]` is the child a point on `side`
    /// belongs to
    pub children: [NodeChild; 2],
}

impl Node {
    #[inline]
    pub fn partition(&self) -> Trace {
        Trace {
            xy: self.xy,
            dxy: self.delta,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use math::{ANG90, ANG180, int_to_fixed as f};

    #[test]
    fn slope_types() {
        let mk = |x2, y2| {
            LineDef::new(IVec2::ZERO, IVec2::new(f(x2), f(y2)), 0, 0, 0, 0, None, 0, None)
        };
        assert_eq!(mk(0, 5).slopetype, SlopeType::Vertical);
        assert_eq!(mk(5, 0).slopetype, SlopeType::Horizontal);
        assert_eq!(mk(5, 5).slopetype, SlopeType::Positive);
        assert_eq!(mk(-5, -5).slopetype, SlopeType::Positive);
        assert_eq!(mk(5, -5).slopetype, SlopeType::Negative);
    }

    #[test]
    fn line_bbox_and_mapped_flag() {
        let line = LineDef::new(
            IVec2::new(f(10), f(-4)),
            IVec2::new(f(-2), f(8)),
            LineDefFlags::Mapped as u32,
            0,
            0,
            0,
            None,
            0,
            None,
        );
        assert_eq!(line.bbox, BBox { top: f(8), bottom: f(-4), left: f(-2), right: f(10) });
        assert!(line.is_mapped());
    }

    #[test]
    fn seg_angle() {
        let north = Segment::new(IVec2::ZERO, IVec2::new(0, f(64)), 0, 0, 0, 0, None);
        assert!((north.angle - ANG90).abs().bam() <= 1);
        let west = Segment::new(IVec2::new(f(64), 0), IVec2::ZERO, 0, 0, 0, 0, None);
        assert!((west.angle - ANG180).abs().bam() <= 1);
    }

    #[test]
    fn bbox_accumulates() {
        let mut bbox = BBox::cleared();
        bbox.add_point(f(3), f(4));
        bbox.add_point(f(-1), f(9));
        assert_eq!(bbox, BBox { top: f(9), bottom: f(4), left: f(-1), right: f(3) });
    }
}
