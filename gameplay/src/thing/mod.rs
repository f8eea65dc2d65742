//! The bulk of map entities, typically shown as sprites. Things like monsters,
//! barrels, rockets and items.
//!
//! Every `MapObject` lives in the `MobjArena`. The three lists a thing can be
//! on (spawn order, sector, blockmap cell) are intrusive lists of `MobjId`
//! threaded through the objects themselves, so linking and unlinking is O(1)
//! and no list owns a copy of anything.

pub mod movement;
pub mod sight;

use std::fmt::Debug;

use math::{Angle, FRACUNIT, Fixed};

/// Spawn z meaning "stand on the floor"
pub const ONFLOORZ: Fixed = Fixed::MIN;
/// Spawn z meaning "hang from the ceiling"
pub const ONCEILINGZ: Fixed = Fixed::MAX;

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum MapObjFlag {
    /// Call P_SpecialThing when touched.
    Special = 1,
    /// Blocks.
    Solid = 2,
    /// Can be hit.
    Shootable = 4,
    /// Don't use the sector links (invisible but touchable).
    Nosector = 8,
    /// Don't use the block links (inert but displayable)
    Noblockmap = 16,
    /// Not to be activated by sound, deaf monster.
    Ambush = 32,
    /// On level spawning (initial position), hang from ceiling instead of stand
    /// on floor.
    Spawnceiling = 256,
    /// Don't apply gravity (every tic), that is, object will float, keeping
    /// current height or changing it actively.
    Nogravity = 512,
    /// This allows jumps from high places.
    Dropoff = 0x400,
    /// For players, will pick up items.
    Pickup = 0x800,
    /// Player cheat.
    Noclip = 0x1000,
    /// Allow moves to any height, no gravity. For active floaters, e.g.
    /// cacodemons, pain elementals.
    Float = 0x4000,
    /// Don't cross lines or look at heights on teleport.
    Teleport = 0x8000,
    /// Don't hit same species, explode on block. Player missiles as well as
    /// fireballs of various kinds.
    Missile = 0x10000,
    /// Use the shadow draw (spectres, invisibility powerup).
    Shadow = 0x40000,
    /// Flag: don't bleed when shot (use puff), barrels and shootable furniture
    /// shall not bleed.
    Noblood = 0x80000,
    /// On kill, count this enemy object towards intermission kill total.
    Countkill = 0x400000,
    /// Special handling: skull in flight. Neither a cacodemon nor a missile.
    Skullfly = 0x1000000,
}

impl MapObjFlag {
    #[inline]
    pub fn is_set(self, flags: u32) -> bool {
        flags & self as u32 != 0
    }
}

/// Static properties of a kind of thing
#[derive(Debug, Clone, Copy)]
pub struct MapObjInfo {
    pub doomednum: i32,
    pub radius: Fixed,
    pub height: Fixed,
    pub flags: u32,
    pub full_bright: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MapObjKind {
    Player,
    Zombieman,
    Imp,
    Demon,
    Spectre,
    LostSoul,
    Barrel,
    Lamp,
    Medikit,
    ImpBall,
    Rocket,
}

const MONSTER: u32 =
    MapObjFlag::Solid as u32 | MapObjFlag::Shootable as u32 | MapObjFlag::Countkill as u32;
const MISSILE: u32 = MapObjFlag::Noblockmap as u32
    | MapObjFlag::Missile as u32
    | MapObjFlag::Dropoff as u32
    | MapObjFlag::Nogravity as u32;

impl MapObjKind {
    pub const ALL: [MapObjKind; 11] = [
        MapObjKind::Player,
        MapObjKind::Zombieman,
        MapObjKind::Imp,
        MapObjKind::Demon,
        MapObjKind::Spectre,
        MapObjKind::LostSoul,
        MapObjKind::Barrel,
        MapObjKind::Lamp,
        MapObjKind::Medikit,
        MapObjKind::ImpBall,
        MapObjKind::Rocket,
    ];

    pub const fn info(self) -> MapObjInfo {
        let (doomednum, radius, height, flags, full_bright) = match self {
            MapObjKind::Player => (
                1,
                16,
                56,
                MapObjFlag::Solid as u32
                    | MapObjFlag::Shootable as u32
                    | MapObjFlag::Dropoff as u32
                    | MapObjFlag::Pickup as u32,
                false,
            ),
            MapObjKind::Zombieman => (3004, 20, 56, MONSTER, false),
            MapObjKind::Imp => (3001, 20, 56, MONSTER, false),
            MapObjKind::Demon => (3002, 30, 56, MONSTER, false),
            MapObjKind::Spectre => (58, 30, 56, MONSTER | MapObjFlag::Shadow as u32, false),
            MapObjKind::LostSoul => (
                3006,
                16,
                56,
                MapObjFlag::Solid as u32
                    | MapObjFlag::Shootable as u32
                    | MapObjFlag::Float as u32
                    | MapObjFlag::Nogravity as u32,
                true,
            ),
            MapObjKind::Barrel => (
                2035,
                10,
                42,
                MapObjFlag::Solid as u32 | MapObjFlag::Shootable as u32 | MapObjFlag::Noblood as u32,
                false,
            ),
            MapObjKind::Lamp => (2028, 16, 16, MapObjFlag::Solid as u32, true),
            MapObjKind::Medikit => (2012, 20, 16, MapObjFlag::Special as u32, false),
            MapObjKind::ImpBall => (-1, 6, 8, MISSILE, true),
            MapObjKind::Rocket => (-1, 11, 8, MISSILE, true),
        };
        MapObjInfo {
            doomednum,
            radius: radius * FRACUNIT,
            height: height * FRACUNIT,
            flags,
            full_bright,
        }
    }

    /// Sprite number in the `PicData` sprite list
    #[inline]
    pub const fn sprite(self) -> usize {
        self as usize
    }
}

/// What to draw for a thing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpriteRef {
    pub sprite: usize,
    pub frame: u32,
    pub full_bright: bool,
}

/// Stable handle to a slot in the `MobjArena`. A handle to a removed object
/// never resolves again, even once the slot is reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MobjId {
    index: u32,
    generation: u32,
}

impl MobjId {
    #[inline]
    pub fn index(&self) -> usize {
        self.index as usize
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Links {
    next: Option<MobjId>,
    prev: Option<MobjId>,
}

#[derive(Debug, Clone)]
pub struct MapObject {
    /// Info for drawing: position.
    pub x: Fixed,
    pub y: Fixed,
    pub z: Fixed,
    /// orientation
    pub angle: Angle,
    pub sprite: SpriteRef,
    /// For movement checking.
    pub radius: Fixed,
    pub height: Fixed,
    /// The closest interval over all contacted Sectors.
    pub floorz: Fixed,
    pub ceilingz: Fixed,
    pub flags: u32,
    pub health: i32,
    pub kind: MapObjKind,
    /// The subsector this object is currently in, set by
    /// `Level::set_thing_position`
    pub subsector: usize,
    /// Thing being chased/attacked (or NULL), also the originator for
    /// missiles.
    pub target: Option<MobjId>,
    /// Spawn order
    thinker: Links,
    /// Things in the same sector
    sector_links: Links,
    /// Things in the same blockmap cell
    block_links: Links,
    /// Cell the thing is linked under, if any
    block: Option<usize>,
    /// Sector the thing is linked under, if any
    sector: Option<usize>,
}

impl MapObject {
    pub fn new(x: Fixed, y: Fixed, z: Fixed, kind: MapObjKind) -> Self {
        let info = kind.info();
        Self {
            x,
            y,
            z,
            angle: Angle::default(),
            sprite: SpriteRef {
                sprite: kind.sprite(),
                frame: 0,
                full_bright: info.full_bright,
            },
            radius: info.radius,
            height: info.height,
            floorz: 0,
            ceilingz: 0,
            flags: info.flags,
            health: 100,
            kind,
            subsector: 0,
            target: None,
            thinker: Links::default(),
            sector_links: Links::default(),
            block_links: Links::default(),
            block: None,
            sector: None,
        }
    }

    #[inline]
    pub fn is_player(&self) -> bool {
        self.kind == MapObjKind::Player
    }

    #[inline]
    pub fn has_flag(&self, flag: MapObjFlag) -> bool {
        flag.is_set(self.flags)
    }
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    mobj: Option<MapObject>,
}

/// Slot storage for every live `MapObject` plus the list heads of the sector
/// and blockmap thing lists.
#[derive(Debug, Default)]
pub struct MobjArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    head: Option<MobjId>,
    tail: Option<MobjId>,
    len: usize,
    sector_heads: Vec<Option<MobjId>>,
    block_heads: Vec<Option<MobjId>>,
}

impl MobjArena {
    pub fn new(num_sectors: usize, num_cells: usize) -> Self {
        Self {
            sector_heads: vec![None; num_sectors],
            block_heads: vec![None; num_cells],
            ..Self::default()
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, id: MobjId) -> Option<&MapObject> {
        self.slots
            .get(id.index())
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.mobj.as_ref())
    }

    pub fn get_mut(&mut self, id: MobjId) -> Option<&mut MapObject> {
        self.slots
            .get_mut(id.index())
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.mobj.as_mut())
    }

    /// Store a new object at the end of the spawn order. It is on no sector
    /// or block list until positioned.
    pub fn insert(&mut self, mut mobj: MapObject) -> MobjId {
        mobj.thinker = Links {
            next: None,
            prev: self.tail,
        };
        mobj.sector = None;
        mobj.block = None;

        let id = if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.mobj = Some(mobj);
            MobjId {
                index,
                generation: slot.generation,
            }
        } else {
            self.slots.push(Slot {
                generation: 0,
                mobj: Some(mobj),
            });
            MobjId {
                index: (self.slots.len() - 1) as u32,
                generation: 0,
            }
        };

        match self.tail.and_then(|t| self.get_mut(t)) {
            Some(last) => last.thinker.next = Some(id),
            None => self.head = Some(id),
        }
        self.tail = Some(id);
        self.len += 1;
        id
    }

    /// Drop an object from the spawn order and free its slot. Sector and
    /// block links are released too if the caller left them in place.
    pub fn remove(&mut self, id: MobjId) -> Option<MapObject> {
        self.get(id)?;
        self.unlink_sector(id);
        self.unlink_block(id);

        let slot = &mut self.slots[id.index()];
        let mobj = slot.mobj.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.len -= 1;

        let Links { next, prev } = mobj.thinker;
        match next.and_then(|n| self.get_mut(n)) {
            Some(n) => n.thinker.prev = prev,
            None => self.tail = prev,
        }
        match prev.and_then(|p| self.get_mut(p)) {
            Some(p) => p.thinker.next = next,
            None => self.head = next,
        }
        Some(mobj)
    }

    /// All live objects in spawn order
    pub fn iter(&self) -> impl Iterator<Item = (MobjId, &MapObject)> {
        let mut cursor = self.head;
        std::iter::from_fn(move || {
            let id = cursor?;
            let mobj = self.get(id)?;
            cursor = mobj.thinker.next;
            Some((id, mobj))
        })
    }

    /// Snapshot of the spawn order, for loops that mutate the arena
    pub fn ids(&self) -> Vec<MobjId> {
        self.iter().map(|(id, _)| id).collect()
    }

    /// Things linked into a sector, most recently linked first
    pub fn sector_things(&self, sector: usize) -> impl Iterator<Item = (MobjId, &MapObject)> {
        let mut cursor = self.sector_heads.get(sector).copied().flatten();
        std::iter::from_fn(move || {
            let id = cursor?;
            let mobj = self.get(id)?;
            cursor = mobj.sector_links.next;
            Some((id, mobj))
        })
    }

    /// Things linked into a blockmap cell, most recently linked first
    pub fn block_things(&self, cell: usize) -> impl Iterator<Item = (MobjId, &MapObject)> {
        let mut cursor = self.block_heads.get(cell).copied().flatten();
        std::iter::from_fn(move || {
            let id = cursor?;
            let mobj = self.get(id)?;
            cursor = mobj.block_links.next;
            Some((id, mobj))
        })
    }

    pub(crate) fn link_sector(&mut self, id: MobjId, sector: usize) {
        let Some(head) = self.sector_heads.get_mut(sector) else {
            return;
        };
        let next = head.replace(id);
        if let Some(n) = next.and_then(|n| self.get_mut(n)) {
            n.sector_links.prev = Some(id);
        }
        if let Some(mobj) = self.get_mut(id) {
            mobj.sector_links = Links { next, prev: None };
            mobj.sector = Some(sector);
        }
    }

    pub(crate) fn unlink_sector(&mut self, id: MobjId) {
        let Some(mobj) = self.get_mut(id) else {
            return;
        };
        let Some(sector) = mobj.sector.take() else {
            return;
        };
        let Links { next, prev } = std::mem::take(&mut mobj.sector_links);
        if let Some(n) = next.and_then(|n| self.get_mut(n)) {
            n.sector_links.prev = prev;
        }
        match prev.and_then(|p| self.get_mut(p)) {
            Some(p) => p.sector_links.next = next,
            None => self.sector_heads[sector] = next,
        }
    }

    pub(crate) fn link_block(&mut self, id: MobjId, cell: usize) {
        let Some(head) = self.block_heads.get_mut(cell) else {
            return;
        };
        let next = head.replace(id);
        if let Some(n) = next.and_then(|n| self.get_mut(n)) {
            n.block_links.prev = Some(id);
        }
        if let Some(mobj) = self.get_mut(id) {
            mobj.block_links = Links { next, prev: None };
            mobj.block = Some(cell);
        }
    }

    pub(crate) fn unlink_block(&mut self, id: MobjId) {
        let Some(mobj) = self.get_mut(id) else {
            return;
        };
        let Some(cell) = mobj.block.take() else {
            return;
        };
        let Links { next, prev } = std::mem::take(&mut mobj.block_links);
        if let Some(n) = next.and_then(|n| self.get_mut(n)) {
            n.block_links.prev = prev;
        }
        match prev.and_then(|p| self.get_mut(p)) {
            Some(p) => p.block_links.next = next,
            None => self.block_heads[cell] = next,
        }
    }
}
