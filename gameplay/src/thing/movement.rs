//! Movement clipping against the blockmap: lines through the line lists,
//! things through the thing lists of the `MobjArena`.

#[cfg(feature = "hprof")]
use coarse_prof::profile;
use log::trace;
use math::{FRACUNIT, Fixed};

use crate::level::Level;
use crate::level::blockmap::MAPBLOCKSHIFT;
use crate::level::flags::LineDefFlags;
use crate::level::map_data::MapData;
use crate::level::map_defs::{BBox, LineDef, SlopeType};
use crate::thing::{MapObjFlag, MapObjKind, MapObject, MobjId};

/// Largest radius of any thing. Things are filed under the cell of their
/// centre, so searches for things widen by this much.
pub const MAXRADIUS: Fixed = 32 * FRACUNIT;
/// Highest step a walking thing can climb, or drop from without `Dropoff`
pub const MAXSTEP: Fixed = 24 * FRACUNIT;

/// Everything a position check learns about the destination. The
/// heights start as the destination sector's and tighten as lines are
/// contacted.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MoveResult {
    /// The move (or position) is allowed
    pub ok: bool,
    /// If true, the move would be ok if within `floorz - ceilingz`
    pub floatok: bool,
    pub floorz: Fixed,
    pub ceilingz: Fixed,
    /// The lowest point contacted (monsters won't move to a dropoff)
    pub dropoffz: Fixed,
    /// Subsector containing the destination
    pub subsector: usize,
    /// Might be a door that can be opened
    pub blockline: Option<usize>,
    /// Either a skull/missile target or a special pickup
    pub movething: Option<MobjId>,
}

/// The properties of the moving thing the checks need, copied out so the
/// arena isn't borrowed while iterating it.
#[derive(Debug, Clone, Copy)]
struct Mover {
    id: MobjId,
    x: Fixed,
    y: Fixed,
    z: Fixed,
    height: Fixed,
    flags: u32,
    is_player: bool,
    target: Option<MobjId>,
    target_kind: Option<MapObjKind>,
    bbox: BBox,
}

/// True when the box straddles the line. Boxes merely touching the line's
/// bounding box are not crossing.
pub fn box_cross_line(tmbbox: &BBox, ld: &LineDef) -> bool {
    if tmbbox.right <= ld.bbox.left
        || tmbbox.left >= ld.bbox.right
        || tmbbox.top <= ld.bbox.bottom
        || tmbbox.bottom >= ld.bbox.top
    {
        return false;
    }

    let y1 = tmbbox.top;
    let y2 = tmbbox.bottom;
    let (x1, x2) = if ld.slopetype == SlopeType::Positive {
        (tmbbox.left, tmbbox.right)
    } else {
        (tmbbox.right, tmbbox.left)
    };

    let lx = ld.v1.x;
    let ly = ld.v1.y;
    let ldx = ld.v2.x.wrapping_sub(lx) >> 16;
    let ldy = ld.v2.y.wrapping_sub(ly) >> 16;

    let dx1 = x1.wrapping_sub(lx) >> 16;
    let dy1 = y1.wrapping_sub(ly) >> 16;
    let dx2 = x2.wrapping_sub(lx) >> 16;
    let dy2 = y2.wrapping_sub(ly) >> 16;

    let side1 = ldy.wrapping_mul(dx1) < dy1.wrapping_mul(ldx);
    let side2 = ldy.wrapping_mul(dx2) < dy2.wrapping_mul(ldx);
    side1 != side2
}

impl Level {
    /// Runs `func` on each line of a block not yet seen in this pass. The
    /// caller starts the pass with `valid_lines.next_pass()`.
    pub fn block_lines_iter(
        &mut self,
        bx: i32,
        by: i32,
        mut func: impl FnMut(&MapData, usize) -> bool,
    ) -> bool {
        for &line in self.map_data.blockmap().lines_in(bx, by) {
            if self.valid_lines.mark(line) && !func(&self.map_data, line) {
                return false;
            }
        }
        true
    }

    /// Runs `func` on each thing linked into a block
    pub fn block_things_iter(
        &self,
        bx: i32,
        by: i32,
        mut func: impl FnMut(MobjId, &MapObject) -> bool,
    ) -> bool {
        let Some(cell) = self.map_data.blockmap().cell_index(bx, by) else {
            return true;
        };
        for (id, thing) in self.mobjs.block_things(cell) {
            if !func(id, thing) {
                return false;
            }
        }
        true
    }

    /// Would the thing fit at `(x, y)`? Purely informative, nothing is moved.
    ///
    /// Things are checked first, over the box widened by `MAXRADIUS`, then
    /// the lines of every block the box touches.
    ///
    /// Doom function name `P_CheckPosition`
    pub fn check_position(&mut self, id: MobjId, x: Fixed, y: Fixed) -> MoveResult {
        #[cfg(feature = "hprof")]
        profile!("check_position");
        let subsector = self.map_data.point_in_subsector(x, y);
        let sector = &self.map_data.sectors()[self.map_data.subsectors()[subsector].sector];
        let mut ctrl = MoveResult {
            ok: false,
            floatok: false,
            floorz: sector.floorheight,
            ceilingz: sector.ceilingheight,
            dropoffz: sector.floorheight,
            subsector,
            blockline: None,
            movething: None,
        };

        let Some(thing) = self.mobjs.get(id) else {
            return ctrl;
        };
        let mover = Mover {
            id,
            x,
            y,
            z: thing.z,
            height: thing.height,
            flags: thing.flags,
            is_player: thing.is_player(),
            target: thing.target,
            target_kind: thing.target.and_then(|t| self.mobjs.get(t)).map(|t| t.kind),
            bbox: BBox {
                top: y.wrapping_add(thing.radius),
                bottom: y.wrapping_sub(thing.radius),
                left: x.wrapping_sub(thing.radius),
                right: x.wrapping_add(thing.radius),
            },
        };
        let radius = thing.radius;

        self.valid_lines.next_pass();

        if MapObjFlag::Noclip.is_set(mover.flags) {
            ctrl.ok = true;
            return ctrl;
        }

        let bm = self.map_data.blockmap();
        let (columns, rows) = (bm.columns, bm.rows);
        let (ox, oy) = (bm.x_origin, bm.y_origin);
        let range = |grow: Fixed| {
            let block = |v: Fixed, origin: Fixed, grow: Fixed| {
                v.wrapping_sub(origin).wrapping_add(grow) >> MAPBLOCKSHIFT
            };
            (
                block(mover.bbox.left, ox, grow.wrapping_neg()).max(0),
                block(mover.bbox.right, ox, grow).min(columns - 1),
                block(mover.bbox.bottom, oy, grow.wrapping_neg()).max(0),
                block(mover.bbox.top, oy, grow).min(rows - 1),
            )
        };

        let (xl, xh, yl, yh) = range(MAXRADIUS);
        for bx in xl..=xh {
            for by in yl..=yh {
                let mut movething = ctrl.movething;
                let clear = self.block_things_iter(bx, by, |other_id, other| {
                    check_thing(&mover, radius, other_id, other, &mut movething)
                });
                ctrl.movething = movething;
                if !clear {
                    trace!("Thing {:?} blocked by a thing at ({}, {})", id, x >> 16, y >> 16);
                    return ctrl;
                }
            }
        }

        let (xl, xh, yl, yh) = range(0);
        for bx in xl..=xh {
            for by in yl..=yh {
                let clear = self.block_lines_iter(bx, by, |map, line| {
                    let ld = &map.linedefs()[line];
                    !box_cross_line(&mover.bbox, ld) || check_line(map, &mover, line, &mut ctrl)
                });
                if !clear {
                    trace!("Thing {:?} blocked by a line at ({}, {})", id, x >> 16, y >> 16);
                    return ctrl;
                }
            }
        }

        ctrl.ok = true;
        ctrl
    }

    /// Attempt to move to a new position. On success the thing is relinked
    /// at the destination and takes on the new floor and ceiling heights.
    ///
    /// Doom function name `P_TryMove`
    pub fn try_move(&mut self, id: MobjId, x: Fixed, y: Fixed) -> MoveResult {
        let mut ctrl = self.check_position(id, x, y);
        if !ctrl.ok {
            return ctrl;
        }
        let Some(thing) = self.mobjs.get(id) else {
            ctrl.ok = false;
            return ctrl;
        };

        if !thing.has_flag(MapObjFlag::Noclip) {
            ctrl.ok = false;
            let teleport = thing.has_flag(MapObjFlag::Teleport);

            if ctrl.ceilingz.wrapping_sub(ctrl.floorz) < thing.height {
                // doesn't fit
                return ctrl;
            }
            ctrl.floatok = true;
            if !teleport && ctrl.ceilingz.wrapping_sub(thing.z) < thing.height {
                // mobj must lower itself to fit
                return ctrl;
            }
            if !teleport && ctrl.floorz.wrapping_sub(thing.z) > MAXSTEP {
                // too big a step up
                return ctrl;
            }
            if thing.flags & (MapObjFlag::Dropoff as u32 | MapObjFlag::Float as u32) == 0
                && ctrl.floorz.wrapping_sub(ctrl.dropoffz) > MAXSTEP
            {
                // don't stand over a dropoff
                return ctrl;
            }
        }

        self.unset_thing_position(id);
        if let Some(thing) = self.mobjs.get_mut(id) {
            thing.floorz = ctrl.floorz;
            thing.ceilingz = ctrl.ceilingz;
            thing.x = x;
            thing.y = y;
        }
        self.set_thing_position(id);
        ctrl.ok = true;
        ctrl
    }
}

/// Adjusts the heights as lines are contacted. Returns false when the line
/// blocks the move outright.
///
/// Doom function name `PIT_CheckLine`
fn check_line(map: &MapData, mover: &Mover, line: usize, ctrl: &mut MoveResult) -> bool {
    let ld = &map.linedefs()[line];
    let Some(back) = ld.backsector else {
        // one sided line
        return false;
    };

    if !MapObjFlag::Missile.is_set(mover.flags) {
        if ld.flags & LineDefFlags::Blocking as u32 != 0 {
            // explicitly blocking everything
            return false;
        }
        if !mover.is_player && ld.flags & LineDefFlags::BlockMonsters as u32 != 0 {
            // block monsters only
            return false;
        }
    }

    let front = &map.sectors()[ld.frontsector];
    let back = &map.sectors()[back];

    if front.ceilingheight == front.floorheight || back.ceilingheight == back.floorheight {
        // probably a closed door
        ctrl.blockline = Some(line);
        return false;
    }

    let opentop = front.ceilingheight.min(back.ceilingheight);
    let (openbottom, lowfloor) = if front.floorheight > back.floorheight {
        (front.floorheight, back.floorheight)
    } else {
        (back.floorheight, front.floorheight)
    };

    if opentop < ctrl.ceilingz {
        ctrl.ceilingz = opentop;
    }
    if openbottom > ctrl.floorz {
        ctrl.floorz = openbottom;
    }
    if lowfloor < ctrl.dropoffz {
        ctrl.dropoffz = lowfloor;
    }
    true
}

/// Doom function name `PIT_CheckThing`
fn check_thing(
    mover: &Mover,
    radius: Fixed,
    other_id: MobjId,
    thing: &MapObject,
    movething: &mut Option<MobjId>,
) -> bool {
    let solid_like =
        MapObjFlag::Solid as u32 | MapObjFlag::Special as u32 | MapObjFlag::Shootable as u32;
    if thing.flags & solid_like == 0 {
        return true;
    }

    let blockdist = thing.radius.wrapping_add(radius).unsigned_abs();
    if thing.x.wrapping_sub(mover.x).unsigned_abs() >= blockdist
        || thing.y.wrapping_sub(mover.y).unsigned_abs() >= blockdist
    {
        // didn't hit it
        return true;
    }

    if other_id == mover.id {
        // don't clip against self
        return true;
    }

    // skulls slamming into things
    if MapObjFlag::Skullfly.is_set(mover.flags) {
        *movething = Some(other_id);
        return false;
    }

    // missiles can hit other things
    if MapObjFlag::Missile.is_set(mover.flags) {
        if mover.z > thing.z.wrapping_add(thing.height) {
            // overhead
            return true;
        }
        if mover.z.wrapping_add(mover.height) < thing.z {
            // underneath
            return true;
        }
        if mover.target_kind == Some(thing.kind) {
            // don't hit same species as originator
            if mover.target == Some(other_id) {
                return true;
            }
            if thing.kind != MapObjKind::Player {
                // explode, but do no damage
                return false;
            }
            // let players missile other players
        }
        if !thing.has_flag(MapObjFlag::Shootable) {
            // didn't do any damage
            return !thing.has_flag(MapObjFlag::Solid);
        }
        // damage / explode
        *movething = Some(other_id);
        return false;
    }

    // special pickup
    if thing.has_flag(MapObjFlag::Special) && MapObjFlag::Pickup.is_set(mover.flags) {
        *movething = Some(other_id);
        return true;
    }

    !thing.has_flag(MapObjFlag::Solid)
}
