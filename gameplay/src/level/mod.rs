//! The data that makes up an entire level, along with the things in it and
//! the bookkeeping the tick queries share.

pub mod blockmap;
pub mod flags;
pub mod grid;
pub mod map_data;
pub mod map_defs;

use log::{debug, warn};
use math::Fixed;

use crate::level::map_data::MapData;
use crate::thing::{MapObjFlag, MapObjKind, MapObject, MobjArena, MobjId, ONCEILINGZ, ONFLOORZ};

/// Visit stamps for one kind of traversal. Starting a pass bumps the count,
/// an element is "seen" for the pass once its stamp equals the count. No
/// stamp is ever cleared between passes, except on the 2^32 wrap.
#[derive(Debug, Default, Clone)]
pub struct ValidCount {
    count: u32,
    stamps: Vec<u32>,
}

impl ValidCount {
    pub fn new(len: usize) -> Self {
        Self {
            count: 0,
            stamps: vec![0; len],
        }
    }

    pub fn resize(&mut self, len: usize) {
        self.stamps.resize(len, 0);
    }

    #[inline]
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Begin a new traversal
    #[inline]
    pub fn next_pass(&mut self) {
        self.count = self.count.wrapping_add(1);
        if self.count == 0 {
            self.stamps.fill(0);
            self.count = 1;
        }
    }

    /// Stamp `index`, returning true if this is the first visit of the pass.
    /// Indices past the end always count as first visits.
    #[inline]
    pub fn mark(&mut self, index: usize) -> bool {
        match self.stamps.get_mut(index) {
            Some(stamp) if *stamp == self.count => false,
            Some(stamp) => {
                *stamp = self.count;
                true
            }
            None => true,
        }
    }

    #[inline]
    pub fn is_marked(&self, index: usize) -> bool {
        self.stamps.get(index).is_some_and(|s| *s == self.count)
    }
}

/// The level is considered a `World` of sorts. One that exists only while
/// the player is in it. Map geometry, the things in it and the line stamps
/// used by the movement queries all live here so the tick code can borrow
/// them together.
pub struct Level {
    pub map_data: MapData,
    pub mobjs: MobjArena,
    pub level_time: u32,
    /// Marker for lines checked by the movement code
    pub(crate) valid_lines: ValidCount,
}

impl Level {
    pub fn new(map_data: MapData) -> Self {
        let mobjs = MobjArena::new(map_data.sectors().len(), map_data.blockmap().cell_count());
        let valid_lines = ValidCount::new(map_data.linedefs().len());
        Self {
            map_data,
            mobjs,
            level_time: 0,
            valid_lines,
        }
    }

    /// Create a thing, link it into its sector and block and seed its
    /// floor and ceiling. `ONFLOORZ` and `ONCEILINGZ` place it against the
    /// floor or ceiling of the sector it lands in.
    pub fn spawn_mobj(&mut self, x: Fixed, y: Fixed, z: Fixed, kind: MapObjKind) -> MobjId {
        let id = self.mobjs.insert(MapObject::new(x, y, z, kind));
        self.set_thing_position(id);

        if let Some(mobj) = self.mobjs.get_mut(id) {
            let sector = &self.map_data.sectors()[self.map_data.subsectors()[mobj.subsector].sector];
            mobj.floorz = sector.floorheight;
            mobj.ceilingz = sector.ceilingheight;
            mobj.z = match z {
                ONFLOORZ => mobj.floorz,
                ONCEILINGZ => mobj.ceilingz - mobj.height,
                _ => z,
            };
            debug!(
                "Spawned {:?} at ({}, {}) in subsector {}",
                kind,
                x >> 16,
                y >> 16,
                mobj.subsector
            );
        }
        id
    }

    /// Unlink and free. The handle is dead afterwards.
    pub fn remove_mobj(&mut self, id: MobjId) {
        self.unset_thing_position(id);
        if self.mobjs.remove(id).is_none() {
            warn!("Tried to remove a map object that no longer exists: {id:?}");
        }
    }

    /// Unlinks a thing from block map and sectors
    pub fn unset_thing_position(&mut self, id: MobjId) {
        self.mobjs.unlink_sector(id);
        self.mobjs.unlink_block(id);
    }

    /// Links a thing into both a block and a subsector based on its x & y.
    /// Things with `Nosector` stay off the sector lists (and so are never
    /// drawn), `Noblockmap` things stay off the block lists (and so are never
    /// collided with). Things off the blockmap grid are not block linked.
    pub fn set_thing_position(&mut self, id: MobjId) {
        let Some(mobj) = self.mobjs.get_mut(id) else {
            return;
        };
        let subsector = self.map_data.point_in_subsector(mobj.x, mobj.y);
        mobj.subsector = subsector;
        let flags = mobj.flags;
        let (bx, by) = self.map_data.blockmap().block_coords(mobj.x, mobj.y);

        if !MapObjFlag::Nosector.is_set(flags) {
            let sector = self.map_data.subsectors()[subsector].sector;
            self.mobjs.link_sector(id, sector);
        }
        if !MapObjFlag::Noblockmap.is_set(flags) {
            if let Some(cell) = self.map_data.blockmap().cell_index(bx, by) {
                self.mobjs.link_block(id, cell);
            }
        }
    }

    /// Sector index a thing currently stands in
    pub fn mobj_sector(&self, id: MobjId) -> Option<usize> {
        self.mobjs
            .get(id)
            .map(|m| self.map_data.subsectors()[m.subsector].sector)
    }
}
