use glam::IVec2;
use log::{debug, info};
use math::{Fixed, fixed_to_float, point_on_vector_side};

use crate::MapError;
use crate::thing::movement::MAXRADIUS;
use crate::level::blockmap::{Blockmap, MAPBLOCKSHIFT};
use crate::level::map_defs::{BBox, LineDef, Node, NodeChild, Sector, Segment, SideDef, SubSector};

/// The smallest vector and the largest vertex, combined make up a
/// rectangle enclosing the level area
#[derive(Debug, Default, Clone, Copy)]
pub struct MapExtents {
    pub min_vertex: IVec2,
    pub max_vertex: IVec2,
    pub min_floor: Fixed,
    pub max_ceiling: Fixed,
}

/// Sector to sector visibility bits. A set bit means nothing in the first
/// sector can possibly see anything in the second.
#[derive(Debug, Default, Clone)]
pub struct RejectMatrix {
    num_sectors: usize,
    bits: Vec<u8>,
}

impl RejectMatrix {
    /// Everything may see everything
    pub fn open(num_sectors: usize) -> Self {
        Self {
            num_sectors,
            bits: vec![0; (num_sectors * num_sectors).div_ceil(8)],
        }
    }

    pub fn from_bytes(num_sectors: usize, bits: Vec<u8>) -> Self {
        Self { num_sectors, bits }
    }

    #[inline]
    fn bit(&self, s1: usize, s2: usize) -> (usize, u8) {
        let pnum = s1 * self.num_sectors + s2;
        (pnum >> 3, 1 << (pnum & 7))
    }

    #[inline]
    pub fn is_blocked(&self, s1: usize, s2: usize) -> bool {
        let (byte, bit) = self.bit(s1, s2);
        self.bits.get(byte).is_some_and(|b| b & bit != 0)
    }

    pub fn set_blocked(&mut self, s1: usize, s2: usize) {
        let (byte, bit) = self.bit(s1, s2);
        if let Some(b) = self.bits.get_mut(byte) {
            *b |= bit;
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bits
    }
}

/// Everything a loader has to hand over to make a level. Parsing the on disk
/// format is somebody else's job; `MapData::new` only derives and checks.
#[derive(Debug, Default)]
pub struct MapLumps {
    pub vertexes: Vec<IVec2>,
    pub sectors: Vec<Sector>,
    pub sidedefs: Vec<SideDef>,
    pub linedefs: Vec<LineDef>,
    pub segments: Vec<Segment>,
    pub subsectors: Vec<SubSector>,
    pub nodes: Vec<Node>,
    /// Built from the lines when absent
    pub blockmap: Option<Blockmap>,
    /// Fully open when absent
    pub reject: Option<RejectMatrix>,
}

/// A `MapData` contains the static spatial index of one level.
///
/// `nodes`, `subsectors`, and `segments` are what get used most to render the
/// basic level. Only the sectors may be mutated once built, the animation
/// code moves floors and ceilings between ticks.
#[derive(Debug)]
pub struct MapData {
    name: String,
    vertexes: Vec<IVec2>,
    linedefs: Vec<LineDef>,
    sectors: Vec<Sector>,
    sidedefs: Vec<SideDef>,
    subsectors: Vec<SubSector>,
    segments: Vec<Segment>,
    nodes: Vec<Node>,
    start_node: NodeChild,
    blockmap: Blockmap,
    reject: RejectMatrix,
    extents: MapExtents,
}

impl MapData {
    /// Check the structure once and derive the sector line lists, the
    /// extents and, if missing, the blockmap.
    pub fn new(name: &str, lumps: MapLumps) -> Result<Self, MapError> {
        let MapLumps {
            vertexes,
            mut sectors,
            sidedefs,
            linedefs,
            segments,
            subsectors,
            nodes,
            blockmap,
            reject,
        } = lumps;

        if sectors.is_empty() || subsectors.is_empty() {
            return Err(MapError::Empty);
        }

        let start_node = if nodes.is_empty() {
            NodeChild::SubSector(0)
        } else {
            NodeChild::Node((nodes.len() - 1) as u32)
        };

        let mut extents = MapExtents {
            min_vertex: IVec2::splat(Fixed::MAX),
            max_vertex: IVec2::splat(Fixed::MIN),
            min_floor: Fixed::MAX,
            max_ceiling: Fixed::MIN,
        };
        for v in vertexes.iter().chain(linedefs.iter().flat_map(|l| [&l.v1, &l.v2])) {
            extents.min_vertex = extents.min_vertex.min(*v);
            extents.max_vertex = extents.max_vertex.max(*v);
        }
        for sector in sectors.iter() {
            extents.min_floor = extents.min_floor.min(sector.floorheight);
            extents.max_ceiling = extents.max_ceiling.max(sector.ceilingheight);
        }

        let blockmap = blockmap.unwrap_or_else(|| {
            Blockmap::build(
                &linedefs,
                extents.min_vertex.x,
                extents.min_vertex.y,
                extents.max_vertex.x,
                extents.max_vertex.y,
            )
        });
        let num_sectors = sectors.len();
        let reject = reject.unwrap_or_else(|| RejectMatrix::open(num_sectors));

        // Sector line lists and block relative bounding boxes
        let mut sector_boxes = vec![BBox::cleared(); sectors.len()];
        for (i, line) in linedefs.iter().enumerate() {
            for s in [Some(line.frontsector), line.backsector].into_iter().flatten() {
                if let Some(sector) = sectors.get_mut(s) {
                    sector.lines.push(i);
                    sector_boxes[s].add_box(&line.bbox);
                }
            }
        }
        for (sector, bbox) in sectors.iter_mut().zip(sector_boxes.iter()) {
            if sector.lines.is_empty() {
                continue;
            }
            sector.blockbox = [
                (bbox.top - blockmap.y_origin + MAXRADIUS) >> MAPBLOCKSHIFT,
                (bbox.bottom - blockmap.y_origin - MAXRADIUS) >> MAPBLOCKSHIFT,
                (bbox.left - blockmap.x_origin - MAXRADIUS) >> MAPBLOCKSHIFT,
                (bbox.right - blockmap.x_origin + MAXRADIUS) >> MAPBLOCKSHIFT,
            ];
        }

        let map = Self {
            name: name.to_owned(),
            vertexes,
            linedefs,
            sectors,
            sidedefs,
            subsectors,
            segments,
            nodes,
            start_node,
            blockmap,
            reject,
            extents,
        };
        map.validate()?;

        info!(
            "{}: {} sectors, {} lines, {} segs, {} subsectors, {} nodes",
            map.name,
            map.sectors.len(),
            map.linedefs.len(),
            map.segments.len(),
            map.subsectors.len(),
            map.nodes.len()
        );
        debug!(
            "{}: extents ({}, {}) to ({}, {}), blockmap {}x{}",
            map.name,
            fixed_to_float(map.extents.min_vertex.x),
            fixed_to_float(map.extents.min_vertex.y),
            fixed_to_float(map.extents.max_vertex.x),
            fixed_to_float(map.extents.max_vertex.y),
            map.blockmap.columns,
            map.blockmap.rows
        );
        Ok(map)
    }

    /// The one place indices are bounds checked. Everything past this point
    /// indexes directly.
    fn validate(&self) -> Result<(), MapError> {
        if self.sectors.is_empty() || self.subsectors.is_empty() {
            return Err(MapError::Empty);
        }
        let num_sectors = self.sectors.len();

        for (i, side) in self.sidedefs.iter().enumerate() {
            if side.sector >= num_sectors {
                return Err(MapError::BadSideDef { side: i });
            }
        }

        for (i, line) in self.linedefs.iter().enumerate() {
            let bad_side = |s: usize| s >= self.sidedefs.len();
            if bad_side(line.front_sidedef)
                || line.back_sidedef.is_some_and(bad_side)
                || line.frontsector >= num_sectors
                || line.backsector.is_some_and(|s| s >= num_sectors)
                || line.back_sidedef.is_some() != line.backsector.is_some()
            {
                return Err(MapError::BadLineDef { line: i });
            }
        }

        for (i, seg) in self.segments.iter().enumerate() {
            if seg.linedef >= self.linedefs.len()
                || seg.sidedef >= self.sidedefs.len()
                || seg.frontsector >= num_sectors
                || seg.backsector.is_some_and(|s| s >= num_sectors)
            {
                return Err(MapError::BadSegment { seg: i });
            }
        }

        for (i, ss) in self.subsectors.iter().enumerate() {
            if ss.sector >= num_sectors || ss.segs().end > self.segments.len() {
                return Err(MapError::BadSubSector { subsector: i });
            }
        }

        // children must point backwards so the walk from the root terminates
        for (i, node) in self.nodes.iter().enumerate() {
            for child in node.children {
                let ok = match child {
                    NodeChild::Node(n) => (n as usize) < i,
                    NodeChild::SubSector(s) => (s as usize) < self.subsectors.len(),
                };
                if !ok {
                    let child = match child {
                        NodeChild::Node(n) | NodeChild::SubSector(n) => n,
                    };
                    return Err(MapError::BadNodeChild { node: i, child });
                }
            }
        }

        let need = (num_sectors * num_sectors).div_ceil(8);
        if self.reject.as_bytes().len() < need {
            return Err(MapError::RejectTooSmall {
                need,
                have: self.reject.as_bytes().len(),
            });
        }

        for (cell, lines) in self.blockmap.cells().iter().enumerate() {
            if let Some(&line) = lines.iter().find(|&&l| l >= self.linedefs.len()) {
                return Err(MapError::BlockmapOutOfRange { cell, line });
            }
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn vertexes(&self) -> &[IVec2] {
        &self.vertexes
    }

    pub fn linedefs(&self) -> &[LineDef] {
        &self.linedefs
    }

    pub fn sectors(&self) -> &[Sector] {
        &self.sectors
    }

    pub fn sectors_mut(&mut self) -> &mut [Sector] {
        &mut self.sectors
    }

    pub fn sidedefs(&self) -> &[SideDef] {
        &self.sidedefs
    }

    pub fn subsectors(&self) -> &[SubSector] {
        &self.subsectors
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    #[inline]
    pub fn start_node(&self) -> NodeChild {
        self.start_node
    }

    pub fn blockmap(&self) -> &Blockmap {
        &self.blockmap
    }

    pub fn reject(&self) -> &RejectMatrix {
        &self.reject
    }

    pub fn extents(&self) -> &MapExtents {
        &self.extents
    }

    /// Index of the subsector containing the point. Every point resolves to
    /// exactly one leaf, points outside the map included.
    ///
    /// Doom function name `R_PointInSubsector`
    pub fn point_in_subsector(&self, x: Fixed, y: Fixed) -> usize {
        let mut child = self.start_node;
        loop {
            match child {
                NodeChild::SubSector(ss) => return ss as usize,
                NodeChild::Node(n) => {
                    let node = &self.nodes[n as usize];
                    let side = point_on_vector_side(x, y, &node.partition());
                    child = node.children[side as usize];
                }
            }
        }
    }

    /// Sector index at a map position
    #[inline]
    pub fn sector_at(&self, x: Fixed, y: Fixed) -> usize {
        self.subsectors[self.point_in_subsector(x, y)].sector
    }

    /// Height of the gap through a line, zero for one sided lines and
    /// closed doors.
    pub fn line_opening(&self, line: &LineDef) -> Fixed {
        let Some(back) = line.backsector else {
            return 0;
        };
        let front = &self.sectors[line.frontsector];
        let back = &self.sectors[back];
        let top = front.ceilingheight.min(back.ceilingheight);
        let bottom = front.floorheight.max(back.floorheight);
        top - bottom
    }
}

#[cfg(test)]
mod tests {
    use math::int_to_fixed;

    use super::*;
    use crate::{GridMapBuilder, SectorSpec};

    fn steps() -> MapData {
        GridMapBuilder::new(64)
            .sector(SectorSpec::new(0, 128, 200))
            .sector(SectorSpec::new(16, 100, 160))
            .sector(SectorSpec::new(0, 0, 200))
            .rows(&["012", "000"])
            .build("STEPS")
            .unwrap()
    }

    fn line_between(map: &MapData, a: usize, b: usize) -> &LineDef {
        map.linedefs()
            .iter()
            .find(|l| {
                l.backsector.is_some_and(|back| {
                    (l.frontsector, back) == (a, b) || (l.frontsector, back) == (b, a)
                })
            })
            .unwrap()
    }

    #[test]
    fn empty_map_is_refused() {
        let err = MapData::new("NONE", MapLumps::default()).unwrap_err();
        assert_eq!(err, MapError::Empty);
    }

    #[test]
    fn every_point_finds_its_sector() {
        let map = steps();
        assert_eq!(map.sector_at(int_to_fixed(32), int_to_fixed(96)), 0);
        assert_eq!(map.sector_at(int_to_fixed(96), int_to_fixed(96)), 1);
        assert_eq!(map.sector_at(int_to_fixed(160), int_to_fixed(96)), 2);
        assert_eq!(map.sector_at(int_to_fixed(160), int_to_fixed(32)), 0);
        // outside still lands in some leaf
        let ss = map.point_in_subsector(int_to_fixed(-500), int_to_fixed(900));
        assert!(ss < map.subsectors().len());
    }

    #[test]
    fn openings() {
        let map = steps();
        assert_eq!(map.line_opening(line_between(&map, 0, 1)), int_to_fixed(84));
        assert!(map.line_opening(line_between(&map, 1, 2)) <= 0);
        let one_sided = map.linedefs().iter().find(|l| l.backsector.is_none()).unwrap();
        assert_eq!(map.line_opening(one_sided), 0);
    }

    #[test]
    fn reject_bits() {
        let mut reject = RejectMatrix::open(3);
        assert_eq!(reject.as_bytes().len(), 2);
        reject.set_blocked(2, 1);
        assert!(reject.is_blocked(2, 1));
        assert!(!reject.is_blocked(1, 2));
        assert!(!reject.is_blocked(0, 0));
        // past the end reads as open
        let short = RejectMatrix::from_bytes(3, vec![]);
        assert!(!short.is_blocked(2, 2));
    }
}
