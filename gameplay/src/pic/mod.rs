//! All data and functions related to pictures.
//! These are:
//! - Wall textures
//! - Flat/span textures
//! - The palette
//! - Sprites (patches and frame sets)
//!
//! Reading the 3DO resource files is out of scope, so the store is filled by
//! a small procedural generator that gives every texture and sprite enough
//! structure to be recognisable in a rendered frame.

use log::debug;

use crate::thing::MapObjKind;

/// Ceiling pic number that means "draw the sky here"
pub const SKY_FLAT: usize = usize::MAX;
/// Palette index never drawn for sprites
pub const TRANSPARENT: u8 = 0;

const FLAT_SIZE: usize = 64;
const SKY_WIDTH: usize = 256;
const SKY_HEIGHT: usize = 128;

/// A wall texture, stored by column
#[derive(Debug)]
pub struct WallPic {
    pub name: String,
    pub width: usize,
    pub height: usize,
    pub data: Vec<Vec<u8>>,
}

impl WallPic {
    /// Column by texture x, wrapping around the texture width
    #[inline]
    pub fn column(&self, x: i32) -> &[u8] {
        &self.data[x.rem_euclid(self.width as i32) as usize]
    }
}

/// A 64x64 floor or ceiling texture, stored by row
#[derive(Debug)]
pub struct FlatPic {
    pub name: String,
    pub data: Vec<u8>,
}

impl FlatPic {
    #[inline]
    pub fn texel(&self, x: i32, y: i32) -> u8 {
        self.data[((y & 63) as usize) * FLAT_SIZE + (x & 63) as usize]
    }
}

/// One sprite image, stored by column. `TRANSPARENT` pixels are skipped.
#[derive(Debug)]
pub struct SpritePic {
    pub name: String,
    pub left_offset: i32,
    pub top_offset: i32,
    pub width: usize,
    pub height: usize,
    pub data: Vec<Vec<u8>>,
}

/// One animation frame of a sprite. With `rotate` set the frame has an image
/// for each of the 8 view directions, otherwise `lumps[0]` is used for all.
#[derive(Debug, Clone)]
pub struct SpriteFrame {
    pub rotate: bool,
    pub lumps: [usize; 8],
    pub flip: [bool; 8],
}

#[derive(Debug)]
pub struct SpriteDef {
    pub name: String,
    pub frames: Vec<SpriteFrame>,
}

#[derive(Debug)]
pub struct PicData {
    /// Colours for pixels
    palette: Vec<[u8; 3]>,
    walls: Vec<WallPic>,
    flats: Vec<FlatPic>,
    sky: WallPic,
    sprite_patches: Vec<SpritePic>,
    sprite_defs: Vec<SpriteDef>,
}

impl Default for PicData {
    fn default() -> Self {
        Self::generate()
    }
}

/// 16 colour ramps of 16 shades. Index 0 is black and doubles as the
/// transparent sprite colour.
fn palette_entry(index: usize) -> [u8; 3] {
    const RAMPS: [[u8; 3]; 16] = [
        [255, 255, 255],
        [176, 120, 72],
        [140, 140, 150],
        [200, 72, 56],
        [96, 160, 72],
        [200, 176, 96],
        [88, 112, 200],
        [230, 200, 60],
        [160, 96, 160],
        [120, 88, 56],
        [96, 168, 176],
        [240, 140, 40],
        [180, 60, 140],
        [110, 120, 90],
        [230, 220, 200],
        [255, 80, 40],
    ];
    if index == 0 {
        return [0, 0, 0];
    }
    let ramp = RAMPS[index >> 4];
    let shade = ((index & 15) + 1) as u32;
    ramp.map(|c| (c as u32 * shade / 16) as u8)
}

#[inline]
fn ramp(ramp: usize, shade: usize) -> u8 {
    (ramp * 16 + shade.min(15)) as u8
}

impl PicData {
    pub fn generate() -> Self {
        let palette = (0..256).map(palette_entry).collect();

        let walls = vec![
            Self::brick_wall("BRICK1", 1),
            Self::panel_wall("METAL1", 2),
            Self::brick_wall("STONE2", 13),
            Self::panel_wall("COMPTALL", 10),
        ];
        let flats = vec![
            Self::checker_flat("FLOOR4_8", 9, 2),
            Self::grid_flat("CEIL3_5", 2),
            Self::checker_flat("NUKAGE1", 4, 4),
            Self::grid_flat("FLAT5_4", 14),
        ];
        let sky = Self::sky_pic();

        let mut sprite_patches = Vec::new();
        let sprite_defs = MapObjKind::ALL
            .iter()
            .map(|kind| Self::make_sprite_def(*kind, &mut sprite_patches))
            .collect();

        debug!(
            "Generated {} walls, {} flats, {} sprite patches",
            walls.len(),
            flats.len(),
            sprite_patches.len()
        );

        Self {
            palette,
            walls,
            flats,
            sky,
            sprite_patches,
            sprite_defs,
        }
    }

    fn brick_wall(name: &str, colour: usize) -> WallPic {
        let (width, height) = (64, 128);
        let data = (0..width)
            .map(|x| {
                (0..height)
                    .map(|y| {
                        let row = y / 16;
                        let shifted = (x + if row & 1 == 0 { 0 } else { 16 }) % 32;
                        if y % 16 == 15 || shifted == 0 {
                            ramp(colour, 4)
                        } else {
                            ramp(colour, 9 + (x * 7 + y * 3) % 5)
                        }
                    })
                    .collect()
            })
            .collect();
        WallPic {
            name: name.to_owned(),
            width,
            height,
            data,
        }
    }

    fn panel_wall(name: &str, colour: usize) -> WallPic {
        let (width, height) = (64, 128);
        let data = (0..width)
            .map(|x| {
                (0..height)
                    .map(|y| {
                        let edge = x % 32 == 0 || y % 64 == 0;
                        let rivet = x % 32 == 3 && y % 16 == 3;
                        if edge {
                            ramp(colour, 3)
                        } else if rivet {
                            ramp(colour, 15)
                        } else {
                            ramp(colour, 10 - (y % 64) / 16)
                        }
                    })
                    .collect()
            })
            .collect();
        WallPic {
            name: name.to_owned(),
            width,
            height,
            data,
        }
    }

    fn checker_flat(name: &str, a: usize, b: usize) -> FlatPic {
        let data = (0..FLAT_SIZE * FLAT_SIZE)
            .map(|i| {
                let (x, y) = (i % FLAT_SIZE, i / FLAT_SIZE);
                if (x / 16 + y / 16) & 1 == 0 {
                    ramp(a, 10)
                } else {
                    ramp(b, 8)
                }
            })
            .collect();
        FlatPic {
            name: name.to_owned(),
            data,
        }
    }

    fn grid_flat(name: &str, colour: usize) -> FlatPic {
        let data = (0..FLAT_SIZE * FLAT_SIZE)
            .map(|i| {
                let (x, y) = (i % FLAT_SIZE, i / FLAT_SIZE);
                if x % 32 == 0 || y % 32 == 0 {
                    ramp(colour, 4)
                } else {
                    ramp(colour, 11)
                }
            })
            .collect();
        FlatPic {
            name: name.to_owned(),
            data,
        }
    }

    fn sky_pic() -> WallPic {
        let data = (0..SKY_WIDTH)
            .map(|x| {
                // a mountain line over a gradient
                let ridge = 80 + ((x * 37) % 23) as i32 - ((x as i32 % 64) - 32).abs() / 2;
                (0..SKY_HEIGHT)
                    .map(|y| {
                        if (y as i32) > ridge {
                            ramp(9, 5 + (x + y) % 3)
                        } else {
                            ramp(6, 4 + y / 12)
                        }
                    })
                    .collect()
            })
            .collect();
        WallPic {
            name: "SKY1".to_owned(),
            width: SKY_WIDTH,
            height: SKY_HEIGHT,
            data,
        }
    }

    /// Monsters and the player get 5 images covering the 8 directions, the
    /// other 3 are mirrored. Everything else is a single image.
    fn make_sprite_def(kind: MapObjKind, patches: &mut Vec<SpritePic>) -> SpriteDef {
        let info = kind.info();
        let width = ((info.radius >> 16) * 2).max(4) as usize;
        let height = (info.height >> 16).max(4) as usize;
        let colour = 1 + kind as usize % 15;
        let name = format!("{kind:?}").to_uppercase();

        let rotates = matches!(
            kind,
            MapObjKind::Player
                | MapObjKind::Zombieman
                | MapObjKind::Imp
                | MapObjKind::Demon
                | MapObjKind::Spectre
        );
        let images = if rotates { 5 } else { 1 };
        let first = patches.len();
        for rot in 0..images {
            patches.push(Self::make_sprite_patch(&format!("{name}A{}", rot + 1), width, height, colour, rot));
        }

        let frame = if rotates {
            SpriteFrame {
                rotate: true,
                lumps: [0, 1, 2, 3, 4, 3, 2, 1].map(|r| first + r),
                flip: [false, false, false, false, false, true, true, true],
            }
        } else {
            SpriteFrame {
                rotate: false,
                lumps: [first; 8],
                flip: [false; 8],
            }
        };
        SpriteDef {
            name,
            frames: vec![frame],
        }
    }

    /// An upright ellipse with a stripe marking which way the thing faces
    fn make_sprite_patch(name: &str, width: usize, height: usize, colour: usize, rot: usize) -> SpritePic {
        let stripe = match rot {
            0 => width / 2,
            4 => usize::MAX,
            r => width / 2 + (width / 2).saturating_sub(1) * r / 4,
        };
        let cx = width as f32 / 2.0;
        let cy = height as f32 / 2.0;
        let data = (0..width)
            .map(|x| {
                (0..height)
                    .map(|y| {
                        let dx = (x as f32 + 0.5 - cx) / cx;
                        let dy = (y as f32 + 0.5 - cy) / cy;
                        if dx * dx + dy * dy > 1.0 {
                            TRANSPARENT
                        } else if x == stripe || x + 1 == stripe {
                            ramp(0, 14)
                        } else {
                            ramp(colour, 12 - y * 6 / height)
                        }
                    })
                    .collect()
            })
            .collect();
        SpritePic {
            name: name.to_owned(),
            left_offset: (width / 2) as i32,
            top_offset: height as i32,
            width,
            height,
            data,
        }
    }

    pub fn palette(&self) -> &[[u8; 3]] {
        &self.palette
    }

    #[inline]
    pub fn num_walls(&self) -> usize {
        self.walls.len()
    }

    #[inline]
    pub fn num_flats(&self) -> usize {
        self.flats.len()
    }

    /// Texture lookup, `None` for a number with no texture behind it
    #[inline]
    pub fn wall(&self, num: usize) -> Option<&WallPic> {
        self.walls.get(num)
    }

    #[inline]
    pub fn flat(&self, num: usize) -> &FlatPic {
        &self.flats[num % self.flats.len()]
    }

    #[inline]
    pub fn sky(&self) -> &WallPic {
        &self.sky
    }

    pub fn sprite_def(&self, sprite: usize) -> Option<&SpriteDef> {
        self.sprite_defs.get(sprite)
    }

    pub fn sprite_frame(&self, sprite: usize, frame: u32) -> Option<&SpriteFrame> {
        let def = self.sprite_defs.get(sprite)?;
        def.frames.get(frame as usize % def.frames.len().max(1))
    }

    #[inline]
    pub fn sprite_patch(&self, lump: usize) -> Option<&SpritePic> {
        self.sprite_patches.get(lump)
    }
}
