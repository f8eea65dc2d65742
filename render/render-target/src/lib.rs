//! The software framebuffer every renderer draws into, and a way to get the
//! result out of the process. With no window to blit to, a finished frame is
//! written as a binary PPM image.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

#[cfg(feature = "hprof")]
use coarse_prof::profile;
use log::info;
pub use render_trait::{BufferSize, PixelBuffer, SOFT_PIXEL_CHANNELS};

/// Linear RGBA pixels, row after row
pub struct DrawBuffer {
    size: BufferSize,
    /// Total length is width * height * CHANNELS, where CHANNELS is RGBA bytes
    buffer: Vec<u8>,
    stride: usize,
}

impl DrawBuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            size: BufferSize::new(width, height),
            buffer: vec![0; width * height * SOFT_PIXEL_CHANNELS],
            stride: width * SOFT_PIXEL_CHANNELS,
        }
    }

    /// Write the frame as a binary PPM (P6), dropping alpha
    pub fn write_ppm(&self, mut out: impl Write) -> io::Result<()> {
        #[cfg(feature = "hprof")]
        profile!("write_ppm");
        write!(out, "P6\n{} {}\n255\n", self.size.width(), self.size.height())?;
        let rgb: Vec<u8> = self
            .buffer
            .chunks_exact(SOFT_PIXEL_CHANNELS)
            .flat_map(|px| [px[0], px[1], px[2]])
            .collect();
        out.write_all(&rgb)?;
        out.flush()
    }

    pub fn save_ppm(&self, path: &Path) -> io::Result<()> {
        let file = File::create(path)?;
        self.write_ppm(BufWriter::new(file))?;
        info!(
            "Wrote {}x{} frame to {}",
            self.size.width(),
            self.size.height(),
            path.display()
        );
        Ok(())
    }
}

impl PixelBuffer for DrawBuffer {
    #[inline(always)]
    fn size(&self) -> &BufferSize {
        &self.size
    }

    fn clear(&mut self) {
        self.buffer.fill(0);
    }

    #[inline(always)]
    fn clear_with_colour(&mut self, colour: &[u8; SOFT_PIXEL_CHANNELS]) {
        self.buffer
            .chunks_mut(SOFT_PIXEL_CHANNELS)
            .for_each(|n| n.copy_from_slice(colour));
    }

    /// Read the colour of a single pixel at X|Y
    #[inline]
    fn read_pixel(&self, x: usize, y: usize) -> [u8; SOFT_PIXEL_CHANNELS] {
        let pos = y * self.stride + x * SOFT_PIXEL_CHANNELS;
        let mut slice = [0u8; SOFT_PIXEL_CHANNELS];
        slice.copy_from_slice(&self.buffer[pos..pos + SOFT_PIXEL_CHANNELS]);
        slice
    }

    #[inline(always)]
    fn set_pixel(&mut self, x: usize, y: usize, colour: &[u8; SOFT_PIXEL_CHANNELS]) {
        #[cfg(feature = "safety_check")]
        if x >= self.size.width_usize() || y >= self.size.height_usize() {
            log::error!(
                "Pixel ({x}, {y}) outside of {}x{}",
                self.size.width_usize(),
                self.size.height_usize()
            );
            return;
        }
        let pos = y * self.stride + x * SOFT_PIXEL_CHANNELS;
        if let Some(px) = self.buffer.get_mut(pos..pos + SOFT_PIXEL_CHANNELS) {
            px.copy_from_slice(colour);
        }
    }

    /// Read the full buffer
    #[inline(always)]
    fn buf_mut(&mut self) -> &mut [u8] {
        &mut self.buffer
    }

    #[inline(always)]
    fn pitch(&self) -> usize {
        self.stride
    }

    #[inline(always)]
    fn channels(&self) -> usize {
        SOFT_PIXEL_CHANNELS
    }

    #[inline(always)]
    fn get_buf_index(&self, x: usize, y: usize) -> usize {
        y * self.stride + x * SOFT_PIXEL_CHANNELS
    }
}
