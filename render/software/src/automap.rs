//! Overhead map of the lines the player has seen, drawn around the player
//! with plain Bresenham lines.

use gameplay::{Level, LineDef, LineDefFlags, MapObject};
use math::{ANG45, ANG90, Angle, FRACBITS, FRACUNIT, Fixed, fixed_mul, float_to_fixed};
use render_trait::PixelBuffer;

/// Largest and smallest allowed map scale
pub const MAXSCALES: Fixed = 0x10000;
pub const MINSCALES: Fixed = 0x00800;
const ZOOMIN: f32 = 1.02;
/// Player arrow and thing marker sizes
const NOSELENGTH: Fixed = 0x200000;
const MOBJLENGTH: Fixed = 0x100000;

const BLACK: [u8; 4] = [0, 0, 0, 255];
const BROWN: [u8; 4] = [132, 64, 16, 255];
const BLUE: [u8; 4] = [0, 0, 240, 255];
const RED: [u8; 4] = [208, 0, 0, 255];
const YELLOW: [u8; 4] = [248, 240, 0, 255];
const GREEN: [u8; 4] = [0, 224, 0, 255];
const LILAC: [u8; 4] = [208, 160, 240, 255];
const LIGHTGREY: [u8; 4] = [192, 192, 192, 255];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Automap {
    scale: Fixed,
    /// Draw lines not yet seen, in grey
    pub show_all_lines: bool,
    /// Mark every thing with a triangle
    pub show_things: bool,
}

impl Default for Automap {
    fn default() -> Self {
        Self {
            scale: FRACUNIT / 16,
            show_all_lines: false,
            show_things: false,
        }
    }
}

impl Automap {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn scale(&self) -> Fixed {
        self.scale
    }

    pub fn set_scale(&mut self, scale: Fixed) {
        self.scale = scale.clamp(MINSCALES, MAXSCALES);
    }

    pub fn zoom_in(&mut self) {
        self.set_scale(fixed_mul(self.scale, float_to_fixed(ZOOMIN)));
    }

    pub fn zoom_out(&mut self) {
        self.set_scale(fixed_mul(self.scale, float_to_fixed(1.0 / ZOOMIN)));
    }

    /// Integer screen offset of a map distance
    #[inline]
    fn to_screen(&self, coord: Fixed) -> i32 {
        (((coord >> FRACBITS) as i64 * self.scale as i64) >> FRACBITS) as i32
    }

    fn line_colour(&self, level: &Level, line: &LineDef) -> [u8; 4] {
        let sectors = level.map_data.sectors();
        if self.show_all_lines && !line.is_mapped() {
            LIGHTGREY
        } else if line.flags & LineDefFlags::TwoSided as u32 == 0 {
            RED
        } else if line.special == 97 || line.special == 39 {
            // Teleporters
            GREEN
        } else if line.flags & LineDefFlags::Secret as u32 != 0 {
            RED
        } else if line.special != 0 {
            BLUE
        } else if line
            .backsector
            .is_some_and(|back| sectors[back].floorheight != sectors[line.frontsector].floorheight)
        {
            YELLOW
        } else {
            BROWN
        }
    }

    /// Clear the buffer and draw the map centred on `player`. Returns how
    /// many lines were drawn.
    ///
    /// Doom function name `AM_Drawer`
    pub fn draw(&self, level: &Level, player: &MapObject, buffer: &mut impl PixelBuffer) -> u32 {
        buffer.clear_with_colour(&BLACK);
        let mut plot = Plotter::new(buffer);
        let ox = player.x;
        let oy = player.y;

        let mut drawn = 0;
        for line in level.map_data.linedefs() {
            let seen = line.is_mapped() && line.flags & LineDefFlags::DontDraw as u32 == 0;
            if !(self.show_all_lines || seen) {
                continue;
            }
            let x1 = self.to_screen(line.v1.x.wrapping_sub(ox));
            let y1 = self.to_screen(line.v1.y.wrapping_sub(oy));
            let x2 = self.to_screen(line.v2.x.wrapping_sub(ox));
            let y2 = self.to_screen(line.v2.y.wrapping_sub(oy));
            if plot.off_screen(x1, y1, x2, y2) {
                continue;
            }
            plot.line(x1, y1, x2, y2, &self.line_colour(level, line));
            drawn += 1;
        }

        // The player's arrow
        let nose = fixed_mul(NOSELENGTH, self.scale);
        let tip = |angle: Angle| {
            (
                (fixed_mul(angle.cos(), nose) >> FRACBITS),
                (fixed_mul(angle.sin(), nose) >> FRACBITS),
            )
        };
        let (nx, ny) = tip(player.angle);
        let (lx, ly) = tip(player.angle - (ANG90 + ANG45));
        let (rx, ry) = tip(player.angle + (ANG90 + ANG45));
        plot.line(rx, ry, lx, ly, &GREEN);
        plot.line(lx, ly, nx, ny, &GREEN);
        plot.line(nx, ny, rx, ry, &GREEN);

        if self.show_things {
            let size = self.to_screen(MOBJLENGTH);
            for (_, thing) in level.mobjs.iter() {
                if thing.is_player() {
                    continue;
                }
                let x1 = self.to_screen(thing.x.wrapping_sub(ox));
                let y1 = self.to_screen(thing.y.wrapping_sub(oy));
                plot.line(x1, y1 - size, x1 - size, y1 + size, &LILAC);
                plot.line(x1 - size, y1 + size, x1 + size, y1 + size, &LILAC);
                plot.line(x1 + size, y1 + size, x1, y1 - size, &LILAC);
            }
        }
        drawn
    }
}

/// Draws in map space: the origin is the middle of the buffer and y runs up
struct Plotter<'a, B: PixelBuffer> {
    buffer: &'a mut B,
    width: i32,
    height: i32,
    center_x: i32,
    center_y: i32,
}

impl<'a, B: PixelBuffer> Plotter<'a, B> {
    fn new(buffer: &'a mut B) -> Self {
        let width = buffer.size().width();
        let height = buffer.size().height();
        Self {
            buffer,
            width,
            height,
            center_x: width / 2,
            center_y: height / 2,
        }
    }

    /// Both ends past the same edge
    fn off_screen(&self, x1: i32, y1: i32, x2: i32, y2: i32) -> bool {
        let left = -self.center_x;
        let right = self.width - 1 - self.center_x;
        let top = self.center_y;
        let bottom = self.center_y - (self.height - 1);
        (y1 > top && y2 > top)
            || (y1 < bottom && y2 < bottom)
            || (x1 > right && x2 > right)
            || (x1 < left && x2 < left)
    }

    #[inline]
    fn pixel(&mut self, x: i32, y: i32, colour: &[u8; 4]) {
        if (0..self.width).contains(&x) && (0..self.height).contains(&y) {
            self.buffer.set_pixel(x as usize, y as usize, colour);
        }
    }

    /// Bresenham, clipped a pixel at a time
    fn line(&mut self, x1: i32, y1: i32, x2: i32, y2: i32, colour: &[u8; 4]) {
        let mut x = x1 + self.center_x;
        let mut y = self.center_y - y1;
        let x_end = x2 + self.center_x;
        let y_end = self.center_y - y2;
        self.pixel(x, y, colour);

        let dx = (x_end - x).abs();
        let dy = (y_end - y).abs();
        if dx == 0 && dy == 0 {
            return;
        }
        let x_step = if x_end < x { -1 } else { 1 };
        let y_step = if y_end < y { -1 } else { 1 };

        let mut delta = 0;
        if dx < dy {
            while y != y_end {
                y += y_step;
                delta += dx;
                if delta >= dy {
                    x += x_step;
                    delta -= dy;
                }
                self.pixel(x, y, colour);
            }
        } else {
            while x != x_end {
                x += x_step;
                delta += dy;
                if delta >= dx {
                    y += y_step;
                    delta -= dx;
                }
                self.pixel(x, y, colour);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FrameLimits, ScreenSize, SoftwareRenderer};
    use gameplay::{GridMapBuilder, MapObjKind, ONFLOORZ, PicData, SectorSpec};
    use math::int_to_fixed;
    use render_target::DrawBuffer;
    use render_trait::{PlayViewRenderer, PlayerView};

    fn level() -> Level {
        let map = GridMapBuilder::new(64)
            .sector(SectorSpec::new(0, 128, 192))
            .sector(SectorSpec::new(24, 128, 192))
            .rows(&["000", "010", "000"])
            .build("AUTOMAP")
            .unwrap();
        Level::new(map)
    }

    fn lit(buffer: &DrawBuffer, colour: [u8; 4]) -> usize {
        (0..buffer.size().height_usize())
            .flat_map(|y| (0..buffer.size().width_usize()).map(move |x| (x, y)))
            .filter(|(x, y)| buffer.read_pixel(*x, *y) == colour)
            .count()
    }

    #[test]
    fn lines_draw_end_to_end() {
        let mut buffer = DrawBuffer::new(21, 21);
        let mut plot = Plotter::new(&mut buffer);
        plot.line(-5, 0, 5, 0, &RED);
        plot.line(0, -3, 2, 7, &BLUE);
        plot.line(30, 30, 40, 40, &GREEN);
        // y runs up the screen from the centre
        assert_eq!(buffer.read_pixel(5, 10), RED);
        assert_eq!(buffer.read_pixel(15, 10), RED);
        assert_eq!(buffer.read_pixel(10, 13), BLUE);
        assert_eq!(buffer.read_pixel(12, 3), BLUE);
        assert_eq!(lit(&buffer, RED), 10);
        assert_eq!(lit(&buffer, BLUE), 11);
        assert_eq!(lit(&buffer, GREEN), 0);
    }

    #[test]
    fn player_far_from_the_lines() {
        let level = level();
        let x = Fixed::MIN + int_to_fixed(100);
        let player = MapObject::new(x, Fixed::MAX, 0, MapObjKind::Player);
        let mut map = Automap::new();
        map.show_all_lines = true;
        let mut buffer = DrawBuffer::new(160, 96);
        assert_eq!(map.draw(&level, &player, &mut buffer), 0);
    }

    #[test]
    fn zoom_is_clamped() {
        let mut map = Automap::new();
        assert_eq!(map.scale(), FRACUNIT / 16);
        for _ in 0..500 {
            map.zoom_in();
        }
        assert_eq!(map.scale(), MAXSCALES);
        for _ in 0..1000 {
            map.zoom_out();
        }
        assert_eq!(map.scale(), MINSCALES);
    }

    #[test]
    fn only_seen_lines_are_drawn() {
        let mut level = level();
        let id = level.spawn_mobj(int_to_fixed(96), int_to_fixed(32), ONFLOORZ, MapObjKind::Player);
        let mut map = Automap::new();
        map.set_scale(FRACUNIT / 2);
        let mut buffer = DrawBuffer::new(160, 96);

        let player = level.mobjs.get(id).unwrap().clone();
        assert_eq!(map.draw(&level, &player, &mut buffer), 0);
        // only the arrow
        assert!(lit(&buffer, GREEN) > 0);
        assert_eq!(lit(&buffer, RED), 0);

        map.show_all_lines = true;
        let all = map.draw(&level, &player, &mut buffer);
        assert!(all > 0);
        assert!(lit(&buffer, LIGHTGREY) > 0);

        // a rendered frame marks what it saw
        map.show_all_lines = false;
        let pics = PicData::generate();
        let mut renderer = SoftwareRenderer::new(ScreenSize::Size160x96, FrameLimits::default());
        let view = PlayerView {
            x: player.x,
            y: player.y,
            z: int_to_fixed(41),
            angle: ANG90,
            extralight: 0,
        };
        renderer.render_player_view(&view, &level, &pics, &mut DrawBuffer::new(160, 96));
        let seen = map.draw(&level, &player, &mut buffer);
        assert!(seen > 0 && seen <= all);
        // outer walls are one sided, the step is a floor change
        assert!(lit(&buffer, RED) > 0);
        assert!(lit(&buffer, YELLOW) > 0);
        assert_eq!(lit(&buffer, LIGHTGREY), 0);
    }

    #[test]
    fn things_are_marked_on_request() {
        let mut level = level();
        let id = level.spawn_mobj(int_to_fixed(96), int_to_fixed(32), ONFLOORZ, MapObjKind::Player);
        level.spawn_mobj(int_to_fixed(160), int_to_fixed(160), ONFLOORZ, MapObjKind::Imp);
        let player = level.mobjs.get(id).unwrap().clone();
        let mut map = Automap::new();
        map.set_scale(FRACUNIT / 2);
        let mut buffer = DrawBuffer::new(160, 96);
        map.draw(&level, &player, &mut buffer);
        assert_eq!(lit(&buffer, LILAC), 0);
        map.show_things = true;
        map.draw(&level, &player, &mut buffer);
        assert!(lit(&buffer, LILAC) > 0);
    }
}
