//! The seams between the game and a renderer: a pixel buffer to draw into
//! and the call that draws the player's view of a level.

use gameplay::{Level, PicData};
use math::{Angle, Fixed};

/// channels should match pixel format
pub const SOFT_PIXEL_CHANNELS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferSize {
    width_usize: usize,
    height_usize: usize,
    width: i32,
    height: i32,
}

impl BufferSize {
    pub const fn new(width: usize, height: usize) -> Self {
        Self {
            width_usize: width,
            height_usize: height,
            width: width as i32,
            height: height as i32,
        }
    }

    pub const fn width(&self) -> i32 {
        self.width
    }

    pub const fn height(&self) -> i32 {
        self.height
    }

    pub const fn half_width(&self) -> i32 {
        self.width / 2
    }

    pub const fn half_height(&self) -> i32 {
        self.height / 2
    }

    pub const fn width_usize(&self) -> usize {
        self.width_usize
    }

    pub const fn height_usize(&self) -> usize {
        self.height_usize
    }
}

pub trait PixelBuffer {
    fn size(&self) -> &BufferSize;
    fn clear(&mut self);
    fn clear_with_colour(&mut self, colour: &[u8; SOFT_PIXEL_CHANNELS]);
    fn set_pixel(&mut self, x: usize, y: usize, colour: &[u8; SOFT_PIXEL_CHANNELS]);
    fn read_pixel(&self, x: usize, y: usize) -> [u8; SOFT_PIXEL_CHANNELS];
    fn buf_mut(&mut self) -> &mut [u8];
    /// The pitch that should be added/subtracted to go up or down the Y while
    /// keeping X position
    fn pitch(&self) -> usize;
    /// Amount of colour channels, e.g: [R, G, B] == 3
    fn channels(&self) -> usize;
    /// Get an index point for this coord to copy a colour array too
    fn get_buf_index(&self, x: usize, y: usize) -> usize;
}

/// Where the frame is seen from. Supplied once per frame by the game.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PlayerView {
    pub x: Fixed,
    pub y: Fixed,
    /// Eye height, absolute
    pub z: Fixed,
    pub angle: Angle,
    /// Light goggles and muzzle flashes brighten everything a little
    pub extralight: u32,
}

pub trait PlayViewRenderer {
    /// Doom function name `R_RenderPlayerView`
    fn render_player_view(
        &mut self,
        view: &PlayerView,
        level: &Level,
        pic_data: &PicData,
        buffer: &mut impl PixelBuffer,
    );
}
