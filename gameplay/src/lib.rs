//! Level data, map objects and the BSP/blockmap queries the game logic runs
//! every tick: line of sight and movement clipping.

use std::error::Error;
use std::fmt;

mod level;
mod pic;
pub mod thing;

pub use glam;
pub use level::blockmap::{Blockmap, MAPBLOCKSHIFT, MAPBLOCKSIZE};
pub use level::flags::LineDefFlags;
pub use level::grid::{GridMapBuilder, SectorSpec};
pub use level::map_data::{MapData, MapExtents, MapLumps, RejectMatrix};
pub use level::map_defs::{
    BBox, LineDef, Node, NodeChild, Sector, SideDef, SlopeType, Segment, SubSector,
};
pub use level::{Level, ValidCount};
pub use log;
pub use pic::{FlatPic, PicData, SKY_FLAT, SpriteDef, SpriteFrame, SpritePic, TRANSPARENT, WallPic};
pub use thing::movement::{MAXRADIUS, MAXSTEP, MoveResult, box_cross_line};
pub use thing::sight::SightStats;
pub use thing::{
    MapObjFlag, MapObjInfo, MapObjKind, MapObject, MobjArena, MobjId, ONCEILINGZ, ONFLOORZ, SpriteRef,
};

/// Structural problems found while assembling a level. The per frame and per
/// tick code assumes none of these can happen once `MapData` exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapError {
    Empty,
    UnknownSector { sector: usize },
    BadNodeChild { node: usize, child: u32 },
    BadSubSector { subsector: usize },
    BadSegment { seg: usize },
    BadLineDef { line: usize },
    BadSideDef { side: usize },
    RejectTooSmall { need: usize, have: usize },
    BlockmapOutOfRange { cell: usize, line: usize },
}

impl Error for MapError {}

impl fmt::Display for MapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapError::Empty => write!(f, "map has no sectors or subsectors"),
            MapError::UnknownSector { sector } => write!(f, "sector {sector} is not defined"),
            MapError::BadNodeChild { node, child } => {
                write!(f, "node {node} has an invalid child {child}")
            }
            MapError::BadSubSector { subsector } => {
                write!(f, "subsector {subsector} references segs or a sector that don't exist")
            }
            MapError::BadSegment { seg } => write!(f, "seg {seg} has a bad line, side or sector"),
            MapError::BadLineDef { line } => write!(f, "linedef {line} has a bad side or sector"),
            MapError::BadSideDef { side } => write!(f, "sidedef {side} has a bad sector"),
            MapError::RejectTooSmall { need, have } => {
                write!(f, "reject matrix needs {need} bytes, has {have}")
            }
            MapError::BlockmapOutOfRange { cell, line } => {
                write!(f, "blockmap cell {cell} lists line {line} which doesn't exist")
            }
        }
    }
}
