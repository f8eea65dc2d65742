//! Builds complete levels from a grid of sector ids. Every non void cell
//! becomes one convex subsector, walls go on every edge between different
//! sectors or against the void, and the BSP tree splits the grid along cell
//! boundaries. Stands in for a WAD loader in tests and the demo binary.

use std::collections::HashMap;

use glam::IVec2;
use log::debug;
use math::{FRACBITS, Fixed};

use crate::MapError;
use crate::level::flags::LineDefFlags;
use crate::level::map_data::{MapData, MapLumps, RejectMatrix};
use crate::level::map_defs::{BBox, LineDef, Node, NodeChild, Sector, Segment, SideDef, SubSector};
use crate::pic::SKY_FLAT;

/// Heights and textures for one sector, in whole map units
#[derive(Debug, Clone, Copy)]
pub struct SectorSpec {
    pub floor: i32,
    pub ceiling: i32,
    pub light: u32,
    pub floorpic: usize,
    pub ceilingpic: usize,
    /// Wall texture for sides facing into this sector
    pub wall: usize,
}

impl SectorSpec {
    pub const fn new(floor: i32, ceiling: i32, light: u32) -> Self {
        Self {
            floor,
            ceiling,
            light,
            floorpic: 0,
            ceilingpic: 1,
            wall: 0,
        }
    }

    pub const fn sky(mut self) -> Self {
        self.ceilingpic = SKY_FLAT;
        self
    }

    pub const fn pics(mut self, floorpic: usize, ceilingpic: usize) -> Self {
        self.floorpic = floorpic;
        self.ceilingpic = ceilingpic;
        self
    }

    pub const fn wall(mut self, wall: usize) -> Self {
        self.wall = wall;
        self
    }
}

/// Grid level description. Rows are given top (north) first, one character
/// per cell: `0`-`9` then `a`-`z` index the sectors, anything else is void.
#[derive(Debug, Clone)]
pub struct GridMapBuilder {
    cell_size: i32,
    sectors: Vec<SectorSpec>,
    rows: Vec<String>,
    blocked_sight: Vec<(usize, usize)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edge {
    North,
    East,
    South,
    West,
}

/// Cell coordinates with y growing north, cell (0, 0) at the map origin
type Cell = (i32, i32);

struct Building {
    vertexes: HashMap<(Fixed, Fixed), usize>,
    vertex_list: Vec<IVec2>,
    sidedefs: Vec<SideDef>,
    linedefs: Vec<LineDef>,
    /// Segs per cell, filled as lines are made
    cell_segs: HashMap<Cell, Vec<Segment>>,
    segments: Vec<Segment>,
    subsectors: Vec<SubSector>,
    nodes: Vec<Node>,
}

impl GridMapBuilder {
    /// `cell_size` is the width of one cell in map units
    pub fn new(cell_size: i32) -> Self {
        Self {
            cell_size,
            sectors: Vec::new(),
            rows: Vec::new(),
            blocked_sight: Vec::new(),
        }
    }

    pub fn sector(mut self, spec: SectorSpec) -> Self {
        self.sectors.push(spec);
        self
    }

    pub fn rows(mut self, rows: &[&str]) -> Self {
        self.rows = rows.iter().map(|r| r.to_string()).collect();
        self
    }

    /// Mark two sectors as unable to see each other, both ways
    pub fn block_sight(mut self, s1: usize, s2: usize) -> Self {
        self.blocked_sight.push((s1, s2));
        self
    }

    fn width(&self) -> i32 {
        self.rows.iter().map(|r| r.chars().count()).max().unwrap_or(0) as i32
    }

    fn height(&self) -> i32 {
        self.rows.len() as i32
    }

    /// Sector of a cell, `None` for void or off the grid
    fn cell_sector(&self, (cx, cy): Cell) -> Option<usize> {
        if cx < 0 || cy < 0 || cy >= self.height() {
            return None;
        }
        let row = &self.rows[(self.height() - 1 - cy) as usize];
        row.chars().nth(cx as usize)?.to_digit(36).map(|d| d as usize)
    }

    fn corners(&self, (cx, cy): Cell) -> (Fixed, Fixed, Fixed, Fixed) {
        let size = self.cell_size << FRACBITS;
        (cx * size, cy * size, (cx + 1) * size, (cy + 1) * size)
    }

    fn cell_box(&self, cell: Cell) -> BBox {
        let (x0, y0, x1, y1) = self.corners(cell);
        BBox::new(IVec2::new(x0, y0), IVec2::new(x1, y1))
    }

    pub fn build(&self, name: &str) -> Result<MapData, MapError> {
        let mut cells = Vec::new();
        for cy in 0..self.height() {
            for cx in 0..self.width() {
                if let Some(sector) = self.cell_sector((cx, cy)) {
                    if sector >= self.sectors.len() {
                        return Err(MapError::UnknownSector { sector });
                    }
                    cells.push((cx, cy));
                }
            }
        }
        if cells.is_empty() {
            return Err(MapError::Empty);
        }

        let mut b = Building {
            vertexes: HashMap::new(),
            vertex_list: Vec::new(),
            sidedefs: Vec::new(),
            linedefs: Vec::new(),
            cell_segs: HashMap::new(),
            segments: Vec::new(),
            subsectors: Vec::new(),
            nodes: Vec::new(),
        };

        for &cell in &cells {
            for edge in [Edge::North, Edge::East, Edge::South, Edge::West] {
                self.make_edge(&mut b, cell, edge);
            }
        }

        self.split(&mut b, cells);

        let sectors = self
            .sectors
            .iter()
            .enumerate()
            .map(|(i, s)| {
                Sector::new(
                    i as u32,
                    s.floor << FRACBITS,
                    s.ceiling << FRACBITS,
                    s.floorpic,
                    s.ceilingpic,
                    s.light,
                    0,
                    0,
                )
            })
            .collect::<Vec<_>>();

        let mut reject = RejectMatrix::open(sectors.len());
        for &(s1, s2) in &self.blocked_sight {
            reject.set_blocked(s1, s2);
            reject.set_blocked(s2, s1);
        }

        debug!(
            "Grid map {name}: {}x{} cells, {} lines, {} subsectors",
            self.width(),
            self.height(),
            b.linedefs.len(),
            b.subsectors.len()
        );

        MapData::new(
            name,
            MapLumps {
                vertexes: b.vertex_list,
                sectors,
                sidedefs: b.sidedefs,
                linedefs: b.linedefs,
                segments: b.segments,
                subsectors: b.subsectors,
                nodes: b.nodes,
                blockmap: None,
                reject: Some(reject),
            },
        )
    }

    /// Lines run clockwise around the cell so the cell is on the right,
    /// front side. A shared edge is made once, by the cell west or south of
    /// it, and the neighbour gets the reversed seg.
    fn make_edge(&self, b: &mut Building, cell: Cell, edge: Edge) {
        let (cx, cy) = cell;
        let (x0, y0, x1, y1) = self.corners(cell);
        let (v1, v2, neighbour) = match edge {
            Edge::North => (IVec2::new(x0, y1), IVec2::new(x1, y1), (cx, cy + 1)),
            Edge::East => (IVec2::new(x1, y1), IVec2::new(x1, y0), (cx + 1, cy)),
            Edge::South => (IVec2::new(x1, y0), IVec2::new(x0, y0), (cx, cy - 1)),
            Edge::West => (IVec2::new(x0, y0), IVec2::new(x0, y1), (cx - 1, cy)),
        };
        let Some(front) = self.cell_sector(cell) else {
            return;
        };
        let back = self.cell_sector(neighbour);
        if back == Some(front) {
            return;
        }
        if back.is_some() && matches!(edge, Edge::South | Edge::West) {
            return;
        }

        for v in [v1, v2] {
            b.vertexes.entry((v.x, v.y)).or_insert_with(|| {
                b.vertex_list.push(v);
                b.vertex_list.len() - 1
            });
        }

        let line_index = b.linedefs.len();
        let front_spec = &self.sectors[front];
        let front_side = b.sidedefs.len();
        match back {
            None => {
                b.sidedefs.push(SideDef {
                    textureoffset: 0,
                    rowoffset: 0,
                    toptexture: None,
                    bottomtexture: None,
                    midtexture: Some(front_spec.wall),
                    sector: front,
                });
                b.linedefs.push(LineDef::new(
                    v1,
                    v2,
                    LineDefFlags::Blocking as u32,
                    0,
                    0,
                    front_side,
                    None,
                    front,
                    None,
                ));
                b.cell_segs
                    .entry(cell)
                    .or_default()
                    .push(Segment::new(v1, v2, 0, front_side, line_index, front, None));
            }
            Some(back) => {
                let back_spec = &self.sectors[back];
                for (sector, spec) in [(front, front_spec), (back, back_spec)] {
                    b.sidedefs.push(SideDef {
                        textureoffset: 0,
                        rowoffset: 0,
                        toptexture: Some(spec.wall),
                        bottomtexture: Some(spec.wall),
                        midtexture: None,
                        sector,
                    });
                }
                let back_side = front_side + 1;
                b.linedefs.push(LineDef::new(
                    v1,
                    v2,
                    LineDefFlags::TwoSided as u32,
                    0,
                    0,
                    front_side,
                    Some(back_side),
                    front,
                    Some(back),
                ));
                b.cell_segs.entry(cell).or_default().push(Segment::new(
                    v1,
                    v2,
                    0,
                    front_side,
                    line_index,
                    front,
                    Some(back),
                ));
                b.cell_segs.entry(neighbour).or_default().push(Segment::new(
                    v2,
                    v1,
                    0,
                    back_side,
                    line_index,
                    back,
                    Some(front),
                ));
            }
        }
    }

    /// Recursively partition the cell set until each leaf holds one cell.
    /// Children are pushed before their parent so the root ends up last.
    fn split(&self, b: &mut Building, cells: Vec<Cell>) -> NodeChild {
        if let [cell] = cells[..] {
            let sector = self.cell_sector(cell).unwrap_or(0);
            let segs = b.cell_segs.remove(&cell).unwrap_or_default();
            let start_seg = b.segments.len() as u32;
            let seg_count = segs.len() as u32;
            b.segments.extend(segs);
            b.subsectors.push(SubSector {
                sector,
                seg_count,
                start_seg,
            });
            return NodeChild::SubSector((b.subsectors.len() - 1) as u32);
        }

        let (min_x, max_x) = min_max(cells.iter().map(|c| c.0));
        let (min_y, max_y) = min_max(cells.iter().map(|c| c.1));
        let size = self.cell_size << FRACBITS;

        // Split the longer side as close to the middle as possible while
        // leaving real cells on both sides.
        let vertical = max_x - min_x >= max_y - min_y;
        let axes = if vertical { [true, false] } else { [false, true] };
        let mut chosen = None;
        'axes: for split_x in axes {
            let (lo, hi) = if split_x { (min_x, max_x) } else { (min_y, max_y) };
            let mid = (lo + hi) / 2;
            for offset in 0..=(hi - lo) {
                for k in [mid - offset, mid + offset] {
                    if k < lo || k >= hi {
                        continue;
                    }
                    let key = |c: &Cell| if split_x { c.0 } else { c.1 };
                    let low_count = cells.iter().filter(|c| key(c) <= k).count();
                    if low_count > 0 && low_count < cells.len() {
                        chosen = Some((split_x, k));
                        break 'axes;
                    }
                }
            }
        }
        // Two or more distinct cells always differ on some axis
        let Some((split_x, k)) = chosen else {
            return self.split(b, cells[..1].to_vec());
        };

        let (low, high): (Vec<Cell>, Vec<Cell>) = cells
            .into_iter()
            .partition(|c| if split_x { c.0 <= k } else { c.1 <= k });

        let boundary = (k + 1) * size;
        let (xy, delta, front, back) = if split_x {
            // Partition runs north, east half in front
            (
                IVec2::new(boundary, min_y * size),
                IVec2::new(0, (max_y - min_y + 1) * size),
                high,
                low,
            )
        } else {
            // Partition runs east, south half in front
            (
                IVec2::new(min_x * size, boundary),
                IVec2::new((max_x - min_x + 1) * size, 0),
                low,
                high,
            )
        };

        let bboxes = [self.cells_box(&front), self.cells_box(&back)];
        let front_child = self.split(b, front);
        let back_child = self.split(b, back);
        b.nodes.push(Node {
            xy,
            delta,
            bboxes,
            children: [front_child, back_child],
        });
        NodeChild::Node((b.nodes.len() - 1) as u32)
    }

    fn cells_box(&self, cells: &[Cell]) -> BBox {
        let mut bbox = BBox::cleared();
        for &cell in cells {
            bbox.add_box(&self.cell_box(cell));
        }
        bbox
    }
}

fn min_max(values: impl Iterator<Item = i32>) -> (i32, i32) {
    values.fold((i32::MAX, i32::MIN), |(lo, hi), v| (lo.min(v), hi.max(v)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use math::int_to_fixed as f;

    fn builder() -> GridMapBuilder {
        GridMapBuilder::new(64)
            .sector(SectorSpec::new(0, 128, 160))
            .sector(SectorSpec::new(24, 128, 200))
            .sector(SectorSpec::new(-16, 96, 120).sky())
    }

    #[test]
    fn every_point_has_exactly_its_cell() {
        let rows = ["0001", "0.11", "2211", "2..1"];
        let b = builder().rows(&rows);
        let map = b.build("BSP").unwrap();
        assert_eq!(map.subsectors().len(), rows.concat().chars().filter(|c| *c != '.').count());

        let mut claimed = vec![0; map.subsectors().len()];
        for cy in 0..4 {
            for cx in 0..4 {
                let Some(sector) = b.cell_sector((cx, cy)) else {
                    continue;
                };
                let mut leaf = None;
                // interior sample points, well clear of the edges
                for (px, py) in [(8, 8), (32, 32), (56, 56), (8, 56), (63, 63)] {
                    let x = f(cx * 64 + px);
                    let y = f(cy * 64 + py);
                    let ss = map.point_in_subsector(x, y);
                    assert_eq!(map.sector_at(x, y), sector, "cell ({cx}, {cy})");
                    assert!(leaf.is_none() || leaf == Some(ss));
                    leaf = Some(ss);
                }
                claimed[leaf.unwrap()] += 1;
            }
        }
        assert!(claimed.iter().all(|c| *c == 1));
    }

    #[test]
    fn edge_points_belong_to_west_and_south_cells() {
        let map = builder().rows(&["01"]).build("EDGE").unwrap();
        assert_eq!(map.sector_at(f(64), f(32)), 0);
        assert_eq!(map.sector_at(f(64) + 1, f(32)), 1);
    }

    #[test]
    fn walls_only_where_sectors_change() {
        let map = builder().rows(&["00", "01"]).build("WALLS").unwrap();
        // outer boundary: 8 unit edges, plus 2 shared edges between 0 and 1
        let one_sided = map.linedefs().iter().filter(|l| l.backsector.is_none()).count();
        let two_sided = map.linedefs().iter().filter(|l| l.backsector.is_some()).count();
        assert_eq!(one_sided, 8);
        assert_eq!(two_sided, 2);
        for line in map.linedefs() {
            if line.backsector.is_some() {
                assert_eq!(line.flags & LineDefFlags::TwoSided as u32, LineDefFlags::TwoSided as u32);
                let back = line.backsector.unwrap();
                assert_ne!(line.frontsector, back);
                assert!(line.frontsector <= 1 && back <= 1);
            } else {
                assert_eq!(line.flags & LineDefFlags::Blocking as u32, LineDefFlags::Blocking as u32);
            }
        }
        // each two sided line has a seg on both sides
        assert_eq!(map.segments().len(), 8 + 2 * 2);
        assert_eq!(map.sectors()[1].lines.len(), 4);
    }

    #[test]
    fn segs_face_into_their_subsector() {
        let map = builder().rows(&["012", "1.0"]).build("FACING").unwrap();
        for ss in map.subsectors() {
            for seg in &map.segments()[ss.segs()] {
                assert_eq!(seg.frontsector, ss.sector);
                // a point just off the middle of the seg, to its right
                let d = (seg.v2 - seg.v1) / 8;
                let mid = (seg.v1 + seg.v2) / 2;
                let probe = mid + glam::IVec2::new(d.y, -d.x);
                let trace = math::Trace::from_points(seg.v1, seg.v2);
                assert!(!math::point_on_vector_side(probe.x, probe.y, &trace));
                assert_eq!(map.sector_at(probe.x, probe.y), seg.frontsector);
            }
        }
    }

    #[test]
    fn sky_and_heights_carried_over() {
        let map = builder().rows(&["2"]).build("SKY").unwrap();
        assert!(map.sectors()[2].is_sky());
        assert_eq!(map.sectors()[2].floorheight, f(-16));
        assert!(map.nodes().is_empty());
        assert_eq!(map.start_node(), NodeChild::SubSector(0));
    }

    #[test]
    fn bad_grids_are_rejected() {
        assert_eq!(builder().rows(&["..."]).build("VOID").unwrap_err(), MapError::Empty);
        assert_eq!(
            builder().rows(&["07"]).build("BAD").unwrap_err(),
            MapError::UnknownSector { sector: 7 }
        );
    }

    #[test]
    fn reject_pairs_are_symmetric() {
        let map = builder().rows(&["012"]).block_sight(0, 2).build("REJECT").unwrap();
        assert!(map.reject().is_blocked(0, 2));
        assert!(map.reject().is_blocked(2, 0));
        assert!(!map.reject().is_blocked(0, 1));
    }
}
