//! Line of sight between two things: the reject matrix first, then a walk
//! of the BSP along the sight trace narrowing a vertical slope window at
//! every two sided line crossed.

#[cfg(feature = "hprof")]
use coarse_prof::profile;
use math::{FRACUNIT, Fixed, Trace, fixed_div, point_on_vector_side};

use crate::level::Level;
use crate::level::map_defs::NodeChild;
use crate::thing::MobjId;

/// Work done by sight checks, for tuning and for tests
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SightStats {
    pub checks: u32,
    /// Checks answered by the reject matrix alone
    pub rejected: u32,
    pub nodes_visited: u32,
    pub subsectors_visited: u32,
    pub lines_checked: u32,
}

/// State of one sight trace
struct SightTrace {
    strace: Trace,
    t2x: Fixed,
    t2y: Fixed,
    /// Integer end points
    t1xs: i32,
    t1ys: i32,
    t2xs: i32,
    t2ys: i32,
    /// Eye z of looker
    zstart: Fixed,
    /// Slopes to top and bottom of target
    top_slope: Fixed,
    bottom_slope: Fixed,
}

/// Make sure a point never lies exactly on a vertex coordinate
#[inline]
fn snap(v: Fixed) -> Fixed {
    (v & !0x1ffff) | 0x10000
}

impl SightTrace {
    /// Fraction along the trace where it crosses the line, or -1 when the
    /// line's end points are both on one side of the trace.
    fn cross_line(&self, v1: glam::IVec2, v2: glam::IVec2) -> Fixed {
        let (p1x, p1y) = (v1.x >> 16, v1.y >> 16);
        let (p2x, p2y) = (v2.x >> 16, v2.y >> 16);
        let (p3x, p3y) = (self.t1xs, self.t1ys);
        let (p4x, p4y) = (self.t2xs, self.t2ys);

        let ndx = p4x - p3x;
        let ndy = p4y - p3y;

        let (dx, dy) = (p2x - p3x, p2y - p3y);
        let s1 = ndy.wrapping_mul(dx) < dy.wrapping_mul(ndx);
        let (dx, dy) = (p1x - p3x, p1y - p3y);
        let s2 = ndy.wrapping_mul(dx) < dy.wrapping_mul(ndx);
        if s1 == s2 {
            return -1;
        }

        // normal to the world line
        let ndx = p1y - p2y;
        let ndy = p2x - p1x;

        let s1 = ndx.wrapping_mul(dx).wrapping_add(ndy.wrapping_mul(dy));
        let (dx, dy) = (p4x - p1x, p4y - p1y);
        let s2 = ndx.wrapping_mul(dx).wrapping_add(ndy.wrapping_mul(dy));
        let den = s1.wrapping_add(s2);
        if den == 0 {
            return -1;
        }
        fixed_div(s1, den)
    }
}

impl Level {
    /// Returns true if a straight line between t1 and t2 is unobstructed.
    /// Aims from the eyes of t1 at any part of t2.
    ///
    /// Doom function name `P_CheckSight`
    pub fn check_sight(&mut self, t1: MobjId, t2: MobjId, stats: &mut SightStats) -> bool {
        #[cfg(feature = "hprof")]
        profile!("check_sight");
        let (Some(m1), Some(m2)) = (self.mobjs.get(t1), self.mobjs.get(t2)) else {
            return false;
        };
        stats.checks += 1;

        let subsectors = self.map_data.subsectors();
        let s1 = subsectors[m1.subsector].sector;
        let s2 = subsectors[m2.subsector].sector;
        if self.map_data.reject().is_blocked(s1, s2) {
            // can't possibly be connected
            stats.rejected += 1;
            return false;
        }

        let x1 = snap(m1.x);
        let y1 = snap(m1.y);
        let t2x = snap(m2.x);
        let t2y = snap(m2.y);
        let zstart = m1.z + m1.height - (m1.height >> 2);
        let mut trace = SightTrace {
            strace: Trace::new(x1, y1, t2x.wrapping_sub(x1), t2y.wrapping_sub(y1)),
            t2x,
            t2y,
            t1xs: x1 >> 16,
            t1ys: y1 >> 16,
            t2xs: t2x >> 16,
            t2ys: t2y >> 16,
            zstart,
            top_slope: m2.z + m2.height - zstart,
            bottom_slope: m2.z - zstart,
        };

        self.valid_lines.next_pass();
        let root = self.map_data.start_node();
        self.cross_bsp_node(root, &mut trace, stats)
    }

    /// Doom function name `PS_CrossBSPNode`
    fn cross_bsp_node(&mut self, child: NodeChild, trace: &mut SightTrace, stats: &mut SightStats) -> bool {
        let node = match child {
            NodeChild::SubSector(ss) => return self.cross_subsector(ss as usize, trace, stats),
            NodeChild::Node(n) => &self.map_data.nodes()[n as usize],
        };
        stats.nodes_visited += 1;

        let partition = node.partition();
        let children = node.children;
        // decide which side the start point is on
        let side = point_on_vector_side(trace.strace.xy.x, trace.strace.xy.y, &partition) as usize;

        // cross the starting side
        if !self.cross_bsp_node(children[side], trace, stats) {
            return false;
        }

        // the partition plane is crossed here
        if side == point_on_vector_side(trace.t2x, trace.t2y, &partition) as usize {
            // the line doesn't touch the other side
            return true;
        }

        // cross the ending side
        self.cross_bsp_node(children[side ^ 1], trace, stats)
    }

    /// Returns true if the trace crosses the subsector successfully
    ///
    /// Doom function name `PS_CrossSubsector`
    fn cross_subsector(&mut self, subsector: usize, trace: &mut SightTrace, stats: &mut SightStats) -> bool {
        stats.subsectors_visited += 1;
        let segs = self.map_data.subsectors()[subsector].segs();

        for seg in &self.map_data.segments()[segs] {
            if !self.valid_lines.mark(seg.linedef) {
                // already checked other side
                continue;
            }
            stats.lines_checked += 1;

            let line = &self.map_data.linedefs()[seg.linedef];
            let frac = trace.cross_line(line.v1, line.v2);
            if !(4..=FRACUNIT).contains(&frac) {
                continue;
            }

            // crosses line
            let Some(back) = line.backsector else {
                // one sided line
                return false;
            };
            let front = &self.map_data.sectors()[line.frontsector];
            let back = &self.map_data.sectors()[back];

            if front.floorheight == back.floorheight && front.ceilingheight == back.ceilingheight {
                // no wall to block sight with
                continue;
            }

            let opentop = front.ceilingheight.min(back.ceilingheight);
            let openbottom = front.floorheight.max(back.floorheight);

            // quick test for totally closed doors
            if openbottom >= opentop {
                return false;
            }

            let frac = frac >> 2;
            if front.floorheight != back.floorheight {
                let slope = ((openbottom - trace.zstart).wrapping_shl(6) / frac).wrapping_shl(8);
                if slope > trace.bottom_slope {
                    trace.bottom_slope = slope;
                }
            }
            if front.ceilingheight != back.ceilingheight {
                let slope = ((opentop - trace.zstart).wrapping_shl(6) / frac).wrapping_shl(8);
                if slope < trace.top_slope {
                    trace.top_slope = slope;
                }
            }

            if trace.top_slope <= trace.bottom_slope {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::grid::{GridMapBuilder, SectorSpec};
    use crate::thing::{MapObjKind, ONFLOORZ};
    use math::int_to_fixed as f;

    fn spawn(level: &mut Level, x: i32, y: i32, kind: MapObjKind) -> MobjId {
        level.spawn_mobj(f(x), f(y), ONFLOORZ, kind)
    }

    #[test]
    fn open_room_is_visible() {
        let map = GridMapBuilder::new(64)
            .sector(SectorSpec::new(0, 128, 160))
            .rows(&["0000", "0000"])
            .build("OPEN")
            .unwrap();
        let mut level = Level::new(map);
        let a = spawn(&mut level, 20, 20, MapObjKind::Player);
        let b = spawn(&mut level, 230, 100, MapObjKind::Imp);
        let mut stats = SightStats::default();
        assert!(level.check_sight(a, b, &mut stats));
        assert!(level.check_sight(b, a, &mut stats));
        assert_eq!(stats.rejected, 0);
        assert!(stats.nodes_visited > 0);
    }

    #[test]
    fn reject_answers_without_walking_the_tree() {
        let map = GridMapBuilder::new(64)
            .sector(SectorSpec::new(0, 128, 160))
            .sector(SectorSpec::new(0, 128, 160))
            .rows(&["0011"])
            .block_sight(0, 1)
            .build("REJECT")
            .unwrap();
        let mut level = Level::new(map);
        let a = spawn(&mut level, 32, 32, MapObjKind::Player);
        let b = spawn(&mut level, 224, 32, MapObjKind::Imp);
        let mut stats = SightStats::default();
        assert!(!level.check_sight(a, b, &mut stats));
        assert_eq!(
            stats,
            SightStats {
                checks: 1,
                rejected: 1,
                nodes_visited: 0,
                subsectors_visited: 0,
                lines_checked: 0,
            }
        );
    }

    #[test]
    fn solid_wall_blocks() {
        // an L shaped room, the corner hides one arm from the other
        let map = GridMapBuilder::new(64)
            .sector(SectorSpec::new(0, 128, 160))
            .rows(&["0..", "0..", "000"])
            .build("CORNER")
            .unwrap();
        let mut level = Level::new(map);
        let a = spawn(&mut level, 32, 160, MapObjKind::Player);
        let b = spawn(&mut level, 160, 32, MapObjKind::Imp);
        let c = spawn(&mut level, 32, 32, MapObjKind::Zombieman);
        let mut stats = SightStats::default();
        assert!(!level.check_sight(a, b, &mut stats));
        assert!(level.check_sight(a, c, &mut stats));
        assert!(level.check_sight(c, b, &mut stats));
        assert!(stats.lines_checked > 0);
    }

    #[test]
    fn high_ledge_hides_what_stands_behind_it() {
        let map = GridMapBuilder::new(64)
            .sector(SectorSpec::new(0, 512, 160))
            .sector(SectorSpec::new(128, 512, 160))
            .rows(&["00100"])
            .build("LEDGE")
            .unwrap();
        let mut level = Level::new(map);
        let a = spawn(&mut level, 32, 32, MapObjKind::Player);
        let b = spawn(&mut level, 288, 32, MapObjKind::Imp);
        let mut stats = SightStats::default();
        assert!(!level.check_sight(a, b, &mut stats));

        // a lost soul floating well above the ledge is in view
        let soul = level.spawn_mobj(f(288), f(32), f(300), MapObjKind::LostSoul);
        assert!(level.check_sight(a, soul, &mut stats));
    }

    #[test]
    fn closed_door_blocks() {
        let map = GridMapBuilder::new(64)
            .sector(SectorSpec::new(0, 128, 160))
            .sector(SectorSpec::new(0, 0, 160))
            .rows(&["010"])
            .build("DOOR")
            .unwrap();
        let mut level = Level::new(map);
        let a = spawn(&mut level, 32, 32, MapObjKind::Player);
        let b = spawn(&mut level, 160, 32, MapObjKind::Imp);
        let mut stats = SightStats::default();
        assert!(!level.check_sight(a, b, &mut stats));

        level.map_data.sectors_mut()[1].ceilingheight = f(128);
        assert!(level.check_sight(a, b, &mut stats));
    }
}
