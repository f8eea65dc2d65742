#[cfg(feature = "hprof")]
use coarse_prof::profile;
use gameplay::PicData;
use gameplay::log::debug;
use math::{ANG90, Angle, Fixed, finecosine, finesine};
use render_trait::PixelBuffer;

use crate::bsp::RenderFrameContext;
use crate::defs::{MAX_FLOOR_LIGHT, MAXSCREENHEIGHT, OPENMARK};
use crate::utilities::{ViewTables, light_multiplier, shade};

/// A floor or ceiling area, collected column by column while the walls are
/// walked front to back.
#[derive(Debug, Clone)]
pub struct VisPlane {
    /// Height relative to the view, 10.6
    pub height: i32,
    pub pic: usize,
    pub light: u32,
    pub minx: i32,
    pub maxx: i32,
    /// `top << 8 | bottom` per column, one spare past the right edge
    pub open: Vec<u32>,
}

impl VisPlane {
    pub fn new(screen_width: usize) -> Self {
        Self {
            height: 0,
            pic: 0,
            light: 0,
            minx: 0,
            maxx: 0,
            open: vec![OPENMARK; screen_width + 1],
        }
    }
}

pub(crate) struct VisPlaneRender {
    /// Index 0 is never drawn, its columns are all "in use" so the first
    /// column of every wall has to go looking for a real plane.
    pub visplanes: Vec<VisPlane>,
    pub lastvisplane: usize,
    max_planes: usize,
    /// Column each row's pending span started at
    spanstart: Vec<i32>,
    pub overflow: u32,
}

impl VisPlaneRender {
    pub fn new(screen_width: usize, screen_height: usize, max_planes: usize) -> Self {
        let mut render = Self {
            visplanes: Vec::with_capacity(max_planes),
            lastvisplane: 1,
            max_planes,
            spanstart: vec![0; screen_height],
            overflow: 0,
        };
        render.resize(screen_width, screen_height);
        render
    }

    /// Rebuild the column storage for a new view size
    pub fn resize(&mut self, screen_width: usize, screen_height: usize) {
        self.visplanes.clear();
        let mut dummy = VisPlane::new(screen_width);
        dummy.open.fill(0);
        self.visplanes.push(dummy);
        self.spanstart = vec![0; screen_height];
        self.clear_planes();
    }

    /// R_ClearPlanes, at the start of each frame
    pub fn clear_planes(&mut self) {
        self.lastvisplane = 1;
        self.overflow = 0;
    }

    /// Planes filled in this frame, not counting the dummy
    pub fn planes(&self) -> &[VisPlane] {
        &self.visplanes[1..self.lastvisplane]
    }

    /// Given a span of pixels, see if it is already defined in a record
    /// somewhere after `check`. If it is then merge it, otherwise make a new
    /// plane definition. `None` once every plane is in use.
    pub fn find_plane(
        &mut self,
        check: usize,
        height: i32,
        pic: usize,
        light: u32,
        start: i32,
        stop: i32,
    ) -> Option<usize> {
        for index in check + 1..self.lastvisplane {
            let plane = &mut self.visplanes[index];
            if plane.height == height
                && plane.pic == pic
                && plane.light == light
                && plane.open[start as usize] == OPENMARK
            {
                plane.minx = plane.minx.min(start);
                plane.maxx = plane.maxx.max(stop);
                return Some(index);
            }
        }

        if self.lastvisplane >= self.max_planes {
            self.overflow += 1;
            if self.overflow == 1 {
                debug!("Visplanes full at {}, dropping the rest this frame", self.max_planes);
            }
            return None;
        }

        let index = self.lastvisplane;
        self.lastvisplane += 1;
        if index == self.visplanes.len() {
            let width = self.visplanes[0].open.len() - 1;
            self.visplanes.push(VisPlane::new(width));
        }
        let plane = &mut self.visplanes[index];
        plane.height = height;
        plane.pic = pic;
        plane.light = light;
        plane.minx = start;
        plane.maxx = stop;
        plane.open.fill(OPENMARK);
        Some(index)
    }

    /// Draw every plane collected this frame
    pub fn draw_planes(
        &mut self,
        frame: &RenderFrameContext,
        tables: &ViewTables,
        pic_data: &PicData,
        buffer: &mut impl PixelBuffer,
    ) {
        #[cfg(feature = "hprof")]
        profile!("draw_planes");
        let mapper = PlaneMapper::new(frame, tables);
        for index in 1..self.lastvisplane {
            let plane = &mut self.visplanes[index];
            draw_vis_plane(plane, &mut self.spanstart, &mapper, pic_data, buffer);
        }
    }
}

/// Per frame values shared by every plane span
struct PlaneMapper<'a> {
    tables: &'a ViewTables,
    view_x: Fixed,
    view_angle: Angle,
    plane_y: Fixed,
    base_x_scale: Fixed,
    base_y_scale: Fixed,
}

impl<'a> PlaneMapper<'a> {
    fn new(frame: &RenderFrameContext, tables: &'a ViewTables) -> Self {
        // left to right mapping
        let angle = (frame.view_angle - ANG90).fine();
        let half = tables.width / 2;
        Self {
            tables,
            view_x: frame.view_x,
            view_angle: frame.view_angle,
            plane_y: frame.view_y.wrapping_neg(),
            base_x_scale: finecosine(angle) / half,
            base_y_scale: -(finesine(angle) / half),
        }
    }

    /// Draw one horizontal run, `x1..x2` on row `y`. Plane height is 10.6,
    /// yslope 6.10 and distscale 1.15, giving a 12.4 distance and an 11.5
    /// length.
    ///
    /// Doom function name `R_MapPlane`
    fn map_plane(
        &self,
        plane: &VisPlane,
        plane_height: i64,
        x1: i32,
        x2: i32,
        y: i32,
        pic_data: &PicData,
        buffer: &mut impl PixelBuffer,
    ) {
        if x1 >= x2 || y < 0 || y >= self.tables.height {
            return;
        }
        let distance = (self.tables.yslope[y as usize] as i64 * plane_height) >> 12;
        let length = (self.tables.distscale[x1 as usize] as i64 * distance) >> 14;
        let angle = (self.tables.xtoviewangle[x1 as usize] + self.view_angle).fine();

        let xfrac = (((finecosine(angle) as i64 >> 1) * length) >> 4) + self.view_x as i64;
        let yfrac = self.plane_y as i64 - (((finesine(angle) as i64 >> 1) * length) >> 4);
        let xstep = (distance * self.base_x_scale as i64) >> 4;
        let ystep = (distance * self.base_y_scale as i64) >> 4;

        let light = self.tables.plane_light(plane.light, distance.clamp(1, u32::MAX as i64) as u32);
        let multiplier = light_multiplier(light, MAX_FLOOR_LIGHT);
        let flat = pic_data.flat(plane.pic);
        let palette = pic_data.palette();

        for (i, x) in (x1..x2.min(self.tables.width)).enumerate() {
            let i = i as i64;
            let tx = ((xfrac + xstep * i) >> 16) as i32;
            let ty = ((yfrac + ystep * i) >> 16) as i32;
            let colour = palette[flat.texel(tx, ty) as usize];
            buffer.set_pixel(x as usize, y as usize, &shade(colour, multiplier));
        }
    }
}

/// Turn the per column open records of a plane into horizontal spans. A span
/// starts on a row when a column's open range first covers it and is drawn
/// when the range stops covering it.
fn draw_vis_plane(
    plane: &mut VisPlane,
    spanstart: &mut [i32],
    mapper: &PlaneMapper,
    pic_data: &PicData,
    buffer: &mut impl PixelBuffer,
) {
    let plane_height = (plane.height as i64).abs();
    let stop = plane.maxx + 1;
    // Set posts to stop drawing
    plane.open[stop as usize] = OPENMARK;
    let mut prev = (MAXSCREENHEIGHT as i32 - 1, 0);

    for x in plane.minx..=stop {
        let open = plane.open[x as usize];
        let new = ((open >> 8) as i32, (open & 0xFF) as i32);
        if new == prev {
            continue;
        }
        let (mut prev_top, mut prev_bottom) = prev;
        let (mut new_top, mut new_bottom) = new;

        // For lines on the top, check if the entry is going down
        if prev_top < new_top && prev_top <= prev_bottom {
            let count = (prev_bottom + 1).min(new_top);
            while prev_top < count {
                let start = spanstart[prev_top as usize];
                mapper.map_plane(plane, plane_height, start, x, prev_top, pic_data, buffer);
                prev_top += 1;
            }
        }

        if new_top < prev_top && new_top <= new_bottom {
            let count = (new_bottom + 1).min(prev_top);
            while new_top < count {
                spanstart[new_top as usize] = x;
                new_top += 1;
            }
        }

        if prev_bottom > new_bottom && prev_bottom >= prev_top {
            let count = (prev_top - 1).max(new_bottom);
            while prev_bottom > count {
                let start = spanstart[prev_bottom as usize];
                mapper.map_plane(plane, plane_height, start, x, prev_bottom, pic_data, buffer);
                prev_bottom -= 1;
            }
        }

        if new_bottom > prev_bottom && new_bottom >= new_top {
            let count = (new_top - 1).max(prev_bottom);
            while new_bottom > count {
                spanstart[new_bottom as usize] = x;
                new_bottom -= 1;
            }
        }

        prev = new;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defs::ScreenSize;
    use math::int_to_fixed;
    use render_target::DrawBuffer;

    fn frame() -> RenderFrameContext {
        let mut frame = RenderFrameContext::default();
        frame.view_angle = ANG90;
        frame.view_z = int_to_fixed(41);
        frame
    }

    #[test]
    fn matching_planes_merge() {
        let mut render = VisPlaneRender::new(160, 96, 8);
        let a = render.find_plane(0, -2624, 3, 160, 10, 20).unwrap();
        render.visplanes[a].open[10] = (50 << 8) | 95;
        // same look, column free: reused and widened
        let b = render.find_plane(0, -2624, 3, 160, 21, 40).unwrap();
        assert_eq!(a, b);
        assert_eq!((render.visplanes[a].minx, render.visplanes[a].maxx), (10, 40));
        // same look but the column is taken
        let c = render.find_plane(0, -2624, 3, 160, 10, 12).unwrap();
        assert_ne!(a, c);
        // different light
        let d = render.find_plane(0, -2624, 3, 100, 50, 60).unwrap();
        assert_ne!(c, d);
        assert_eq!(render.planes().len(), 3);
    }

    #[test]
    fn plane_overflow_is_counted() {
        let mut render = VisPlaneRender::new(160, 96, 3);
        assert!(render.find_plane(0, 1, 0, 0, 0, 0).is_some());
        assert!(render.find_plane(0, 2, 0, 0, 0, 0).is_some());
        assert!(render.find_plane(0, 3, 0, 0, 0, 0).is_none());
        assert_eq!(render.overflow, 1);
        render.clear_planes();
        assert_eq!(render.overflow, 0);
        assert!(render.planes().is_empty());
    }

    #[test]
    fn floor_fills_its_open_columns() {
        let tables = ViewTables::new(ScreenSize::Size160x96);
        let pics = PicData::generate();
        let mut buffer = DrawBuffer::new(160, 96);
        let mut render = VisPlaneRender::new(160, 96, 8);

        // a floor 41 units under the eye, lower half of the screen
        let index = render.find_plane(0, -(41 << 6), 0, 255, 0, 159).unwrap();
        for x in 0..160 {
            render.visplanes[index].open[x] = (60 << 8) | 95;
        }
        render.draw_planes(&frame(), &tables, &pics, &mut buffer);

        let lit = |x: usize, y: usize| buffer.read_pixel(x, y)[3] == 255;
        assert!(lit(0, 60) && lit(159, 95) && lit(80, 77));
        assert!(!lit(80, 59));
        assert!(!lit(0, 0));
    }

    #[test]
    fn ragged_plane_stays_in_bounds() {
        let tables = ViewTables::new(ScreenSize::Size160x96);
        let pics = PicData::generate();
        let mut buffer = DrawBuffer::new(160, 96);
        let mut render = VisPlaneRender::new(160, 96, 8);
        let index = render.find_plane(0, 30 << 6, 1, 200, 20, 40).unwrap();
        for x in 20..=40 {
            let top = (x % 7) as u32;
            render.visplanes[index].open[x] = (top << 8) | (10 + top * 2);
        }
        render.draw_planes(&frame(), &tables, &pics, &mut buffer);

        for y in 0..96 {
            for x in 0..160 {
                let drawn = buffer.read_pixel(x, y)[3] == 255;
                let inside = (20..=40).contains(&x) && {
                    let top = x % 7;
                    y >= top && y <= 10 + top * 2
                };
                assert_eq!(drawn, inside, "pixel {x},{y}");
            }
        }
    }
}
