#[cfg(feature = "hprof")]
use coarse_prof::profile;
use gameplay::log::debug;
use gameplay::{MapObjFlag, MapObject, PicData, SpritePic, TRANSPARENT};
use math::{ANG45, Angle, FRACBITS, Fixed, fixed_div, fixed_mul, int_to_fixed, point_to_angle};
use render_trait::PixelBuffer;

use crate::bsp::RenderFrameContext;
use crate::defs::{
    AC_BOTTOMSIL, AC_SOLIDSIL, AC_TOPSIL, FrameLimits, MAX_SPRITE_LIGHT, MINZ,
};
use crate::segs::VisWall;
use crate::utilities::{ViewTables, light_multiplier, shade, shadow};

/// Colormap bit: draw the image mirrored
pub const SPR_FLIP: u32 = 0x4000;
/// Colormap bit: darken what is already on screen instead of drawing
pub const SPR_SHADOW: u32 = 0x8000;

const SIL_ALL: u32 = AC_TOPSIL | AC_BOTTOMSIL | AC_SOLIDSIL;

/// A thing projected on to the screen for this frame
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct VisSprite {
    /// Screen columns, inclusive. Not clipped to the screen.
    pub x1: i32,
    pub x2: i32,
    /// Screen rows, inclusive. Not clipped to the screen.
    pub y1: i32,
    pub y2: i32,
    pub xscale: Fixed,
    /// Same units as a wall scale, used for sorting and wall clipping
    pub yscale: Fixed,
    /// Light level in the low byte plus `SPR_FLIP` and `SPR_SHADOW`
    pub colormap: u32,
    /// Index of the image in the sprite patch list
    pub patch: usize,
    /// Thing origin, for the wall facing test
    pub gx: Fixed,
    pub gy: Fixed,
}

impl VisSprite {
    #[inline]
    pub fn flipped(&self) -> bool {
        self.colormap & SPR_FLIP != 0
    }

    #[inline]
    pub fn is_shadow(&self) -> bool {
        self.colormap & SPR_SHADOW != 0
    }
}

/// Merge two sorted runs into `dest`. Ties take from `list1` first.
fn merge(list1: &[u32], list2: &[u32], dest: &mut [u32]) {
    let (mut i, mut j) = (0, 0);
    for slot in dest.iter_mut() {
        if j >= list2.len() || (i < list1.len() && list1[i] <= list2[j]) {
            *slot = list1[i];
            i += 1;
        } else {
            *slot = list2[j];
            j += 1;
        }
    }
}

/// Bottom up merge sort of `before`, ping-ponging through `after` which must
/// be at least as long. Returns whichever buffer holds the sorted words.
///
/// Doom function name `SortWords`
pub fn sort_words<'a>(mut before: &'a mut [u32], mut after: &'a mut [u32]) -> &'a [u32] {
    let total = before.len();
    if total < 2 {
        return before;
    }
    debug_assert!(after.len() >= total);
    let total = total.min(after.len());

    let mut chunk = 1;
    loop {
        let mut start = 0;
        while start < total {
            let mid = (start + chunk).min(total);
            let end = (start + chunk * 2).min(total);
            merge(&before[start..mid], &before[mid..end], &mut after[start..end]);
            start = end;
        }

        chunk <<= 1;
        if chunk >= total {
            let sorted: &'a [u32] = after;
            return &sorted[..total];
        }
        std::mem::swap(&mut before, &mut after);
    }
}

/// Texel step for stretching `texels` over `pixels`, lands exactly on the
/// last texel at the last pixel
#[inline]
fn texel_step(texels: i32, pixels: i32) -> Fixed {
    if texels <= 1 || pixels <= 1 {
        return 0;
    }
    fixed_div(int_to_fixed(texels) - 1, int_to_fixed(pixels - 1))
}

/// Is the thing origin on the back side of the wall's seg, in which case the
/// wall can't hide it
fn seg_behind_point(wall: &VisWall, x: Fixed, y: Fixed) -> bool {
    let x1 = wall.v1.x as i64;
    let y1 = wall.v1.y as i64;
    let sdx = (wall.v2.x as i64 - x1) >> FRACBITS;
    let sdy = (wall.v2.y as i64 - y1) >> FRACBITS;
    let dx = (x as i64 - x1) >> FRACBITS;
    let dy = (y as i64 - y1) >> FRACBITS;
    sdx * dy < dx * sdy
}

pub(crate) struct SpriteRender {
    pub sprites: Vec<VisSprite>,
    max_sprites: usize,
    pub overflow: u32,
    keys: Vec<u32>,
    scratch: Vec<u32>,
    /// Per column clip, `top << 8 | bottom`, rows `top..bottom` are visible
    spr_opening: Vec<u32>,
}

impl SpriteRender {
    pub fn new(screen_width: usize, limits: &FrameLimits) -> Self {
        let max_sprites = limits.max_sprites.min(FrameLimits::MAXVISSPRITES);
        Self {
            sprites: Vec::with_capacity(max_sprites),
            max_sprites,
            overflow: 0,
            keys: Vec::with_capacity(max_sprites),
            scratch: Vec::with_capacity(max_sprites),
            spr_opening: vec![0; screen_width],
        }
    }

    pub fn clear(&mut self) {
        self.sprites.clear();
        self.overflow = 0;
    }

    /// Project a thing and keep it if any of it can be on screen. `light` is
    /// the light level of the sector the thing is in.
    ///
    /// Doom function name `PrepMObj`
    pub fn prep_mobj(
        &mut self,
        frame: &RenderFrameContext,
        tables: &ViewTables,
        pic_data: &PicData,
        thing: &MapObject,
        light: u32,
    ) {
        // The player is never drawn in its own view
        if thing.is_player() {
            return;
        }
        if self.sprites.len() >= self.max_sprites {
            self.overflow += 1;
            if self.overflow == 1 {
                debug!("Vissprites full at {}, dropping the rest this frame", self.max_sprites);
            }
            return;
        }

        // Transform the origin point
        let tr_x = thing.x.wrapping_sub(frame.view_x);
        let tr_y = thing.y.wrapping_sub(frame.view_y);
        let tz = fixed_mul(tr_x, frame.view_cos) + fixed_mul(tr_y, frame.view_sin);
        // Too close (or behind)
        if tz < MINZ {
            return;
        }
        let mut tx = fixed_mul(tr_x, frame.view_sin) - fixed_mul(tr_y, frame.view_cos);
        // More than 4 times as far off to the side as it is in front
        if (tx as i64).abs() > (tz as i64) << 2 {
            return;
        }

        let Some(sprite_frame) = pic_data.sprite_frame(thing.sprite.sprite, thing.sprite.frame) else {
            return;
        };
        let rot = if sprite_frame.rotate {
            let ang = point_to_angle(frame.view_x, frame.view_y, thing.x, thing.y) - thing.angle;
            ((ang + Angle::new((ANG45.bam() / 2) * 9)).bam() >> 29) as usize
        } else {
            0
        };
        let lump = sprite_frame.lumps[rot];
        let Some(patch) = pic_data.sprite_patch(lump) else {
            return;
        };

        let xscale = fixed_div(tables.center_x << FRACBITS, tz);
        tx -= patch.left_offset << FRACBITS;
        let x1 = (fixed_mul(tx, xscale) >> FRACBITS) + tables.center_x;
        if x1 > tables.width {
            return;
        }
        let x2 = fixed_mul(patch.width as i32, xscale) + x1;
        if x2 <= 0 {
            return;
        }

        let yscale = fixed_mul(xscale, tables.stretch);
        let mut colormap = if thing.has_flag(MapObjFlag::Shadow) {
            SPR_SHADOW
        } else if thing.sprite.full_bright {
            255
        } else {
            light.min(255)
        };
        if sprite_frame.flip[rot] {
            colormap |= SPR_FLIP;
        }

        let tz = thing.z - frame.view_z + (patch.top_offset << FRACBITS);
        let top_y = (tables.center_y << FRACBITS) - fixed_mul(tz, yscale);
        let bottom_y = top_y + fixed_mul((patch.height as i32) << FRACBITS, yscale);
        let y1 = top_y >> FRACBITS;
        let y2 = bottom_y >> FRACBITS;
        if y2 < 0 || y1 >= tables.height {
            return;
        }

        self.sprites.push(VisSprite {
            x1,
            x2,
            y1,
            y2,
            xscale,
            yscale,
            colormap,
            patch: lump,
            gx: thing.x,
            gy: thing.y,
        });
    }

    /// Sort far to near and paint every sprite over the finished walls and
    /// planes. Returns the sprites that put at least one pixel on screen and
    /// the pixel total.
    pub fn draw_sprites(
        &mut self,
        tables: &ViewTables,
        walls: &[VisWall],
        openings: &[u8],
        pic_data: &PicData,
        buffer: &mut impl PixelBuffer,
    ) -> (u32, u32) {
        #[cfg(feature = "hprof")]
        profile!("draw_sprites");
        let mut keys = std::mem::take(&mut self.keys);
        let mut scratch = std::mem::take(&mut self.scratch);
        keys.clear();
        // The index lives in the low 7 bits, the scale above it
        keys.extend(
            self.sprites
                .iter()
                .enumerate()
                .map(|(i, s)| ((s.yscale.clamp(0, 0x01FF_FFFF) as u32) << 7) | i as u32),
        );
        scratch.clear();
        scratch.resize(keys.len(), 0);

        let mut drawn = 0;
        let mut pixels = 0;
        for key in sort_words(&mut keys, &mut scratch) {
            let Some(sprite) = self.sprites.get((key & 0x7F) as usize).copied() else {
                continue;
            };
            let count = self.draw_vis_sprite(&sprite, tables, walls, openings, pic_data, buffer);
            if count > 0 {
                drawn += 1;
                pixels += count;
            }
        }

        self.keys = keys;
        self.scratch = scratch;
        (drawn, pixels)
    }

    /// Build the per column clip from every nearer wall that overlaps the
    /// sprite, then draw. Returns the pixels written.
    ///
    /// Doom function name `DrawVisSprite`
    pub fn draw_vis_sprite(
        &mut self,
        sprite: &VisSprite,
        tables: &ViewTables,
        walls: &[VisWall],
        openings: &[u8],
        pic_data: &PicData,
        buffer: &mut impl PixelBuffer,
    ) -> u32 {
        let Some(patch) = pic_data.sprite_patch(sprite.patch) else {
            return 0;
        };
        let height = tables.height as u32;
        let x1 = sprite.x1.max(0);
        let x2 = sprite.x2.min(tables.width - 1);
        if x1 > x2 {
            return 0;
        }

        let mut clipped = false;
        // Walls were emitted front to back, the last overlapping ones are
        // the farthest
        for wall in walls.iter().rev() {
            if wall.left_x > x2
                || wall.right_x < x1
                || wall.large_scale <= sprite.yscale
                || !wall.has(SIL_ALL)
            {
                continue;
            }
            if wall.small_scale <= sprite.yscale && seg_behind_point(wall, sprite.gx, sprite.gy) {
                continue;
            }
            if !clipped {
                clipped = true;
                self.spr_opening[x1 as usize..=x2 as usize].fill(height);
            }

            let r1 = wall.left_x.max(x1);
            let r2 = wall.right_x.min(x2);
            let sil = |start: Option<usize>, x: i32| {
                start
                    .and_then(|s| openings.get(s + (x - wall.left_x) as usize))
                    .map(|v| *v as u32)
            };

            if wall.has(AC_SOLIDSIL) {
                self.spr_opening[r1 as usize..=r2 as usize].fill(height << 8);
                continue;
            }
            for x in r1..=r2 {
                let opening = &mut self.spr_opening[x as usize];
                let mut top = *opening >> 8;
                let mut bottom = *opening & 0xFF;
                if wall.has(AC_BOTTOMSIL) && bottom == height {
                    if let Some(low) = sil(wall.bottomsil, x) {
                        bottom = low;
                    }
                }
                if wall.has(AC_TOPSIL) && top == 0 {
                    if let Some(high) = sil(wall.topsil, x) {
                        top = high;
                    }
                }
                *opening = (top << 8) | bottom;
            }
        }

        let mut painter = SpritePainter::new(sprite, patch, tables, pic_data);
        let mut texel_x = painter.start_x + (x1 - sprite.x1) * painter.step_x;
        let mut pixels = 0;
        for x in x1..=x2 {
            let (top, bottom) = if clipped {
                let opening = self.spr_opening[x as usize] as i32;
                (opening >> 8, opening & 0xFF)
            } else {
                (0, tables.height)
            };
            if top < bottom {
                pixels += painter.column(x, texel_x, top, bottom, buffer);
            }
            texel_x += painter.step_x;
        }
        pixels
    }
}

/// Column drawing state for one sprite
struct SpritePainter<'a> {
    sprite: &'a VisSprite,
    patch: &'a SpritePic,
    palette: &'a [[u8; 3]],
    screen_height: i32,
    light: Fixed,
    start_x: Fixed,
    step_x: Fixed,
    step_y: Fixed,
}

impl<'a> SpritePainter<'a> {
    fn new(
        sprite: &'a VisSprite,
        patch: &'a SpritePic,
        tables: &ViewTables,
        pic_data: &'a PicData,
    ) -> Self {
        let render_w = sprite.x2 - sprite.x1 + 1;
        let render_h = sprite.y2 - sprite.y1 + 1;
        let step_x = texel_step(patch.width as i32, render_w);
        let (start_x, step_x) = if sprite.flipped() {
            // Only move off the last texel once nearly a whole one is passed
            (int_to_fixed(patch.width as i32) - 1, -step_x)
        } else {
            (0, step_x)
        };
        Self {
            sprite,
            patch,
            palette: pic_data.palette(),
            screen_height: tables.height,
            light: light_multiplier(sprite.colormap & 0xFF, MAX_SPRITE_LIGHT),
            start_x,
            step_x,
            step_y: texel_step(patch.height as i32, render_h),
        }
    }

    /// Draw rows `top..bottom` of one column, clipped to the sprite and the
    /// screen
    fn column(&mut self, x: i32, texel_x: Fixed, top: i32, bottom: i32, buffer: &mut impl PixelBuffer) -> u32 {
        let y1 = self.sprite.y1.max(top).max(0);
        let y2 = self.sprite.y2.min(bottom - 1).min(self.screen_height - 1);
        if y1 > y2 || self.patch.width == 0 {
            return 0;
        }
        let tx = (texel_x >> FRACBITS).clamp(0, self.patch.width as i32 - 1) as usize;
        let column = &self.patch.data[tx];
        let mut texel_y = (y1 - self.sprite.y1) * self.step_y;
        let mut count = 0;
        for y in y1..=y2 {
            let ty = ((texel_y >> FRACBITS).max(0) as usize).min(column.len().saturating_sub(1));
            let texel = column.get(ty).copied().unwrap_or(TRANSPARENT);
            if texel != TRANSPARENT {
                let pixel = if self.sprite.is_shadow() {
                    shadow(buffer.read_pixel(x as usize, y as usize))
                } else {
                    shade(self.palette[texel as usize], self.light)
                };
                buffer.set_pixel(x as usize, y as usize, &pixel);
                count += 1;
            }
            texel_y += self.step_y;
        }
        count
    }
}
