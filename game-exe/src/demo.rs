//! The level the binary walks through: a grid map with rooms of different
//! heights, a sky yard, two pillars and a handful of things. Each tic the
//! player takes a step along a fixed route and every monster checks
//! whether it can see the player.

use gameplay::log::{debug, info};
use gameplay::{
    GridMapBuilder, Level, MapError, MapObjFlag, MapObjKind, MobjId, ONFLOORZ, SectorSpec,
    SightStats,
};
use math::{FRACBITS, Fixed, approx_distance, int_to_fixed, point_to_angle};
use render_trait::PlayerView;

/// Eye height above the floor
pub const VIEWHEIGHT: Fixed = 41 << FRACBITS;
/// Map units the player walks each tic
const WALK_SPEED: Fixed = 8 << FRACBITS;

const ROWS: [&str; 8] = [
    "1111111111",
    "1111111111",
    "0000000000",
    "0030000300",
    "0000220000",
    "0000220000",
    "4444004444",
    "4444004444",
];

/// Player route, in map units
const ROUTE: [(i32, i32); 7] = [
    (320, 64),
    (320, 160),
    (320, 352),
    (96, 480),
    (544, 480),
    (544, 160),
    (320, 96),
];

const THINGS: [(i32, i32, MapObjKind); 7] = [
    (96, 160, MapObjKind::Zombieman),
    (448, 416, MapObjKind::Imp),
    (608, 288, MapObjKind::Demon),
    (448, 224, MapObjKind::Spectre),
    (224, 224, MapObjKind::Barrel),
    (416, 64, MapObjKind::Lamp),
    (288, 96, MapObjKind::Medikit),
];

pub fn build_level() -> Result<Level, MapError> {
    let map = GridMapBuilder::new(64)
        .sector(SectorSpec::new(0, 128, 200))
        .sector(SectorSpec::new(0, 256, 255).sky())
        .sector(SectorSpec::new(16, 128, 160).wall(1))
        .sector(SectorSpec::new(0, 0, 200))
        .sector(SectorSpec::new(0, 96, 96).pics(1, 0).wall(2))
        // the dark rooms never see the yard
        .block_sight(4, 1)
        .rows(&ROWS)
        .build("DEMO")?;
    Ok(Level::new(map))
}

/// What happened during one tic
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TicReport {
    pub moved: bool,
    /// Monsters with a clear line to the player
    pub seen_by: u32,
}

pub struct Demo {
    pub level: Level,
    pub player: MobjId,
    monsters: Vec<MobjId>,
    waypoint: usize,
    pub sight: SightStats,
    pub blocked_moves: u32,
}

impl Demo {
    pub fn new() -> Result<Self, MapError> {
        let mut level = build_level()?;
        let player = level.spawn_mobj(int_to_fixed(96), int_to_fixed(32), ONFLOORZ, MapObjKind::Player);
        let mut monsters = Vec::new();
        for (x, y, kind) in THINGS {
            let id = level.spawn_mobj(int_to_fixed(x), int_to_fixed(y), ONFLOORZ, kind);
            if kind.info().flags & MapObjFlag::Countkill as u32 != 0 {
                monsters.push(id);
            }
        }
        info!(
            "Demo level: {} sectors, {} lines, {} things",
            level.map_data.sectors().len(),
            level.map_data.linedefs().len(),
            level.mobjs.len()
        );
        Ok(Self {
            level,
            player,
            monsters,
            waypoint: 0,
            sight: SightStats::default(),
            blocked_moves: 0,
        })
    }

    pub fn waypoint(&self) -> usize {
        self.waypoint
    }

    fn next_waypoint(&mut self) {
        self.waypoint = (self.waypoint + 1) % ROUTE.len();
    }

    pub fn tic(&mut self) -> TicReport {
        let mut report = TicReport {
            moved: self.walk(),
            ..TicReport::default()
        };

        let Some((px, py)) = self.level.mobjs.get(self.player).map(|p| (p.x, p.y)) else {
            return report;
        };
        for i in 0..self.monsters.len() {
            let id = self.monsters[i];
            if self.level.check_sight(id, self.player, &mut self.sight) {
                report.seen_by += 1;
                if let Some(m) = self.level.mobjs.get_mut(id) {
                    m.angle = point_to_angle(m.x, m.y, px, py);
                }
            }
        }

        self.level.level_time += 1;
        report
    }

    /// Step toward the current waypoint. A blocked step gives up on that
    /// waypoint.
    fn walk(&mut self) -> bool {
        let Some(player) = self.level.mobjs.get(self.player) else {
            return false;
        };
        let (wx, wy) = ROUTE[self.waypoint];
        let (wx, wy) = (int_to_fixed(wx), int_to_fixed(wy));
        let dx = wx - player.x;
        let dy = wy - player.y;
        let dist = approx_distance(dx, dy);
        let angle = point_to_angle(player.x, player.y, wx, wy);

        let (x, y, arrived) = if dist <= WALK_SPEED {
            (wx, wy, true)
        } else {
            let step = |d: Fixed| (d as i64 * WALK_SPEED as i64 / dist as i64) as Fixed;
            (player.x + step(dx), player.y + step(dy), false)
        };

        if let Some(p) = self.level.mobjs.get_mut(self.player) {
            p.angle = angle;
        }
        let result = self.level.try_move(self.player, x, y);
        if !result.ok {
            debug!(
                "Player blocked at ({}, {}) heading for waypoint {}",
                x >> FRACBITS,
                y >> FRACBITS,
                self.waypoint
            );
            self.blocked_moves += 1;
            self.next_waypoint();
            return false;
        }
        // no gravity, the player stands on whatever floor it reached
        if let Some(p) = self.level.mobjs.get_mut(self.player) {
            p.z = p.floorz;
        }
        if arrived {
            self.next_waypoint();
        }
        true
    }

    pub fn player_view(&self, extralight: u32) -> Option<PlayerView> {
        let p = self.level.mobjs.get(self.player)?;
        Some(PlayerView {
            x: p.x,
            y: p.y,
            z: p.z + VIEWHEIGHT,
            angle: p.angle,
            extralight,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_builds_and_things_spawn() {
        let demo = Demo::new().unwrap();
        assert_eq!(demo.level.mobjs.len(), THINGS.len() + 1);
        assert_eq!(demo.monsters.len(), 4);
        let view = demo.player_view(0).unwrap();
        assert_eq!(view.z, VIEWHEIGHT);
    }

    #[test]
    fn player_walks_the_route() {
        let mut demo = Demo::new().unwrap();
        let start = demo.player_view(0).unwrap();
        let report = demo.tic();
        assert!(report.moved);
        let now = demo.player_view(0).unwrap();
        assert_ne!((start.x, start.y), (now.x, now.y));
        assert_eq!(demo.level.level_time, 1);

        for _ in 0..300 {
            demo.tic();
        }
        assert_eq!(demo.blocked_moves, 0);
        assert_ne!(demo.waypoint(), 0);
    }

    #[test]
    fn step_up_raises_the_view() {
        let mut demo = Demo::new().unwrap();
        // onto the raised floor in the middle of the hall
        while demo.waypoint() < 2 {
            demo.tic();
        }
        let view = demo.player_view(0).unwrap();
        assert_eq!(view.z, int_to_fixed(16) + VIEWHEIGHT);
    }

    #[test]
    fn the_yard_never_sees_the_dark_rooms() {
        let mut demo = Demo::new().unwrap();
        demo.tic();
        // the imp in the yard is answered by the reject matrix alone
        assert!(demo.sight.rejected >= 1);
        assert_eq!(demo.sight.checks, 4);
    }
}
