#[cfg(feature = "hprof")]
use coarse_prof::profile;
use gameplay::log::debug;
use glam::IVec2;
use gameplay::{LineDefFlags, MapData, PicData, Sector, Segment, WallPic};
use math::{
    ANG90, ANG180, Angle, FRACBITS, FRACUNIT, Fixed, fixed_mul, idiv, point_to_dist,
};
use render_trait::PixelBuffer;

use crate::bsp::RenderFrameContext;
use crate::defs::*;
use crate::planes::VisPlaneRender;
use crate::utilities::{ViewTables, light_multiplier, scale_from_global_angle, shade};

/// One clipped run of a seg, with everything the later passes need to
/// draw it and clip against it.
#[derive(Debug, Default, Clone)]
pub struct VisWall {
    pub left_x: i32,
    /// Inclusive
    pub right_x: i32,
    /// Seg vertexes, kept for the sprite behind/in front test
    pub v1: IVec2,
    pub v2: IVec2,
    pub actionbits: u32,

    pub t_texture: Option<usize>,
    pub t_topheight: i32,
    pub t_bottomheight: i32,
    pub t_texturemid: Fixed,
    pub b_texture: Option<usize>,
    pub b_topheight: i32,
    pub b_bottomheight: i32,
    pub b_texturemid: Fixed,

    /// Heights relative to the view, 10.6
    pub floorheight: i32,
    pub floornewheight: i32,
    pub ceilingheight: i32,
    pub ceilingnewheight: i32,
    pub floorpic: usize,
    pub ceilingpic: usize,
    pub seglight: u32,

    /// Texture x at the seg start, 16.16
    pub offset: Fixed,
    pub center_angle: Angle,
    /// Perpendicular distance from the view to the seg line
    pub distance: Fixed,
    pub left_scale: Fixed,
    pub right_scale: Fixed,
    pub scale_step: Fixed,
    pub small_scale: Fixed,
    pub large_scale: Fixed,

    /// Start of the per column silhouettes in the openings store
    pub topsil: Option<usize>,
    pub bottomsil: Option<usize>,
}

impl VisWall {
    #[inline]
    pub fn has(&self, bits: u32) -> bool {
        self.actionbits & bits != 0
    }
}

/// The parts of a sector wall prep compares, heights relative to the view
#[derive(Debug, Clone, Copy)]
struct SectorView {
    floor: i32,
    ceil: i32,
    floor_fixed: Fixed,
    ceil_fixed: Fixed,
    floor_pic: usize,
    ceil_pic: usize,
    light: u32,
    sky: bool,
}

impl SectorView {
    /// Stand in for the missing far side of a one sided line
    const VOID: SectorView = SectorView {
        floor: 0,
        ceil: 0,
        floor_fixed: 0,
        ceil_fixed: 0,
        floor_pic: usize::MAX - 1,
        ceil_pic: usize::MAX - 1,
        light: u32::MAX,
        sky: false,
    };

    fn new(sector: &Sector, view_z: Fixed) -> Self {
        let floor_fixed = sector.floorheight.wrapping_sub(view_z);
        let ceil_fixed = sector.ceilingheight.wrapping_sub(view_z);
        Self {
            floor: floor_fixed >> FIXEDTOHEIGHT,
            ceil: ceil_fixed >> FIXEDTOHEIGHT,
            floor_fixed,
            ceil_fixed,
            floor_pic: sector.floorpic,
            ceil_pic: sector.ceilingpic,
            light: sector.lightlevel,
            sky: sector.is_sky(),
        }
    }
}

/// Screen y of a 10.6 height at a 9 bit scale
#[inline]
fn project(center_y: i32, scale: i32, height: i32) -> i32 {
    center_y - ((scale as i64 * height as i64) >> (HEIGHTBITS + SCALEBITS)) as i32
}

/// Walls for a frame plus the column clip bounds used while walking them
pub(crate) struct SegRender {
    pub walls: Vec<VisWall>,
    max_walls: usize,
    /// Silhouette rows for sprite clipping
    pub openings: Vec<u8>,
    last_opening: usize,
    /// Lowest row covered from above, per column
    clip_top: Vec<i32>,
    /// Highest row covered from below, per column
    clip_bottom: Vec<i32>,
    pub wall_overflow: u32,
    pub opening_overflow: u32,
}

impl SegRender {
    pub fn new(screen_width: usize, screen_height: usize, limits: &FrameLimits) -> Self {
        Self {
            walls: Vec::with_capacity(limits.max_walls),
            max_walls: limits.max_walls,
            openings: vec![0; limits.max_openings],
            last_opening: 0,
            clip_top: vec![-1; screen_width],
            clip_bottom: vec![screen_height as i32; screen_width],
            wall_overflow: 0,
            opening_overflow: 0,
        }
    }

    pub fn clear(&mut self) {
        self.walls.clear();
        self.last_opening = 0;
        self.wall_overflow = 0;
        self.opening_overflow = 0;
    }

    /// Reserve `width` silhouette rows, `None` when the store is full
    fn alloc_opening(&mut self, width: usize) -> Option<usize> {
        if self.last_opening + width > self.openings.len() {
            self.opening_overflow += 1;
            if self.opening_overflow == 1 {
                debug!(
                    "Openings full at {} bytes, dropping silhouettes this frame",
                    self.openings.len()
                );
            }
            return None;
        }
        let start = self.last_opening;
        self.last_opening += width;
        Some(start)
    }

    /// Record a visible run `left_x..=right_x` of a seg. `line_angle` is the
    /// angle from the view to the seg's first vertex.
    ///
    /// R_StoreWallRange - r_segs
    #[allow(clippy::too_many_arguments)]
    pub fn store_wall_range(
        &mut self,
        frame: &RenderFrameContext,
        tables: &ViewTables,
        map: &MapData,
        pic_data: &PicData,
        seg: &Segment,
        line_angle: Angle,
        left_x: i32,
        right_x: i32,
    ) {
        if self.walls.len() >= self.max_walls {
            self.wall_overflow += 1;
            if self.wall_overflow == 1 {
                debug!("Wall list full at {} walls, dropping the rest this frame", self.max_walls);
            }
            return;
        }
        let mut wall = self.wall_prep(frame, map, pic_data, seg, left_x, right_x);
        late_prep(&mut wall, frame, tables, seg, line_angle);
        self.walls.push(wall);
    }

    /// Work out what a wall range adds to the frame: which planes start at it,
    /// which textures it shows and how it clips sprites.
    fn wall_prep(
        &mut self,
        frame: &RenderFrameContext,
        map: &MapData,
        pic_data: &PicData,
        seg: &Segment,
        left_x: i32,
        right_x: i32,
    ) -> VisWall {
        let line = &map.linedefs()[seg.linedef];
        // Mark as seen for the automap
        line.mapped.set(true);
        let side = &map.sidedefs()[seg.sidedef];
        let f = SectorView::new(&map.sectors()[seg.frontsector], frame.view_z);
        let b = seg
            .backsector
            .map_or(SectorView::VOID, |b| SectorView::new(&map.sectors()[b], frame.view_z));
        let both_sky = f.sky && b.sky;

        let mut wall = VisWall {
            left_x,
            right_x,
            v1: seg.v1,
            v2: seg.v2,
            floorpic: f.floor_pic,
            ceilingpic: if f.sky { 0 } else { f.ceil_pic },
            ..VisWall::default()
        };
        let mut actionbits = 0;

        if f.floor < 0
            && (f.floor_pic != b.floor_pic
                || f.floor != b.floor
                || f.light != b.light
                || b.ceil == b.floor)
        {
            wall.floorheight = f.floor;
            wall.floornewheight = f.floor;
            actionbits |= AC_ADDFLOOR | AC_NEWFLOOR;
        }

        if !both_sky
            && (f.ceil > 0 || f.sky)
            && (f.ceil_pic != b.ceil_pic
                || f.ceil != b.ceil
                || f.light != b.light
                || b.ceil == b.floor)
        {
            wall.ceilingheight = f.ceil;
            wall.ceilingnewheight = f.ceil;
            if f.sky {
                actionbits |= AC_ADDSKY | AC_NEWCEILING;
            } else {
                actionbits |= AC_ADDCEILING | AC_NEWCEILING;
            }
        }

        wall.t_topheight = f.ceil;

        if seg.backsector.is_none() {
            // One sided, the middle texture fills the whole wall
            if let Some(texture) = side.midtexture {
                let mid = if line.flags & LineDefFlags::UnpegBottom as u32 != 0 {
                    // Bottom of texture at bottom
                    let height = pic_data.wall(texture).map_or(0, |p| p.height as i32);
                    f.floor_fixed.wrapping_add(height << FRACBITS)
                } else {
                    f.ceil_fixed
                };
                wall.t_texture = Some(texture);
                wall.t_texturemid = mid.wrapping_add(side.rowoffset);
                actionbits |= AC_TOPTEXTURE;
            }
            wall.t_bottomheight = f.floor;
            actionbits |= AC_SOLIDSIL;
        } else {
            // Step up, the bottom texture is visible
            if b.floor > f.floor {
                let mid = if line.flags & LineDefFlags::UnpegBottom as u32 != 0 {
                    f.ceil_fixed
                } else {
                    b.floor_fixed
                };
                wall.b_texturemid = mid.wrapping_add(side.rowoffset);
                wall.b_topheight = b.floor;
                wall.floornewheight = b.floor;
                wall.b_bottomheight = f.floor;
                actionbits |= AC_NEWFLOOR;
                if let Some(texture) = side.bottomtexture {
                    wall.b_texture = Some(texture);
                    actionbits |= AC_BOTTOMTEXTURE;
                }
            }

            // Step down from the ceiling, unless both sides show sky
            if b.ceil < f.ceil && !both_sky {
                let mid = if line.flags & LineDefFlags::UnpegTop as u32 != 0 {
                    f.ceil_fixed
                } else {
                    let height = side
                        .toptexture
                        .and_then(|t| pic_data.wall(t))
                        .map_or(0, |p| p.height as i32);
                    b.ceil_fixed.wrapping_add(height << FRACBITS)
                };
                wall.t_texturemid = mid.wrapping_add(side.rowoffset);
                wall.t_bottomheight = b.ceil;
                wall.ceilingnewheight = b.ceil;
                actionbits |= AC_NEWCEILING;
                if let Some(texture) = side.toptexture {
                    wall.t_texture = Some(texture);
                    actionbits |= AC_TOPTEXTURE;
                }
            }

            // Sprite masking
            if b.floor >= f.ceil || b.ceil <= f.floor {
                actionbits |= AC_SOLIDSIL;
            } else {
                let width = (right_x - left_x + 1) as usize;
                if (b.floor > 0 && b.floor > f.floor) || (f.floor < 0 && f.floor > b.floor) {
                    if let Some(start) = self.alloc_opening(width) {
                        wall.bottomsil = Some(start);
                        actionbits |= AC_BOTTOMSIL;
                    }
                }
                if !both_sky
                    && ((b.ceil <= 0 && b.ceil < f.ceil) || (f.ceil > 0 && b.ceil > f.ceil))
                {
                    if let Some(start) = self.alloc_opening(width) {
                        wall.topsil = Some(start);
                        actionbits |= AC_TOPSIL;
                    }
                }
            }
        }

        wall.actionbits = actionbits;
        wall.seglight = if f.light < 240 {
            (f.light + frame.extralight).min(240)
        } else {
            f.light
        };
        wall.offset = side.textureoffset.wrapping_add(seg.offset);
        wall
    }

    /// Walk every wall front to back. Builds the visplanes, fills in the
    /// sprite silhouettes, narrows the column bounds and draws the sky.
    pub fn seg_loop_all(
        &mut self,
        frame: &RenderFrameContext,
        tables: &ViewTables,
        planes: &mut VisPlaneRender,
        pic_data: &PicData,
        buffer: &mut impl PixelBuffer,
    ) {
        #[cfg(feature = "hprof")]
        profile!("seg_loop");
        self.clip_top.fill(-1);
        self.clip_bottom.fill(tables.height);

        let mut ctx = SegLoop {
            frame,
            tables,
            planes,
            pic_data,
            openings: &mut self.openings,
            clip_top: &mut self.clip_top,
            clip_bottom: &mut self.clip_bottom,
        };
        for wall in self.walls.iter() {
            ctx.seg_loop(wall, buffer);
        }
    }

    /// Draw the wall textures back to front, later (nearer) walls cover the
    /// slop of the earlier ones.
    pub fn draw_walls(
        &self,
        tables: &ViewTables,
        pic_data: &PicData,
        buffer: &mut impl PixelBuffer,
    ) {
        #[cfg(feature = "hprof")]
        profile!("draw_walls");
        for wall in self.walls.iter().rev() {
            draw_seg(wall, tables, pic_data, buffer);
        }
    }
}

/// Scales, distance and texture anchor of a wall, now that its screen range
/// is known.
fn late_prep(
    wall: &mut VisWall,
    frame: &RenderFrameContext,
    tables: &ViewTables,
    seg: &Segment,
    line_angle: Angle,
) {
    let normal_angle = seg.angle + ANG90;
    let mut offset_angle = (normal_angle - line_angle).abs();
    if offset_angle > ANG90 {
        offset_angle = ANG90;
    }
    let hyp = point_to_dist(frame.view_x, frame.view_y, seg.v1.x, seg.v1.y);
    wall.distance = fixed_mul(hyp, (ANG90 - offset_angle).sin());

    let left = tables.xtoviewangle[wall.left_x as usize];
    wall.left_scale = scale_from_global_angle(
        tables.stretch_width,
        wall.distance,
        left,
        left + frame.view_angle - normal_angle,
    );
    if wall.right_x > wall.left_x {
        let right = tables.xtoviewangle[wall.right_x as usize];
        wall.right_scale = scale_from_global_angle(
            tables.stretch_width,
            wall.distance,
            right,
            right + frame.view_angle - normal_angle,
        );
        wall.scale_step = (wall.right_scale - wall.left_scale) / (wall.right_x - wall.left_x);
    } else {
        wall.right_scale = wall.left_scale;
        wall.scale_step = 0;
    }
    wall.small_scale = wall.left_scale.min(wall.right_scale);
    wall.large_scale = wall.left_scale.max(wall.right_scale);

    if wall.has(AC_TOPTEXTURE | AC_BOTTOMTEXTURE) {
        let mut offset_angle = normal_angle - line_angle;
        if offset_angle > ANG180 {
            offset_angle = -offset_angle;
        }
        if offset_angle > ANG90 {
            offset_angle = ANG90;
        }
        let mut sine = fixed_mul(hyp, offset_angle.sin());
        if normal_angle - line_angle < ANG180 {
            sine = -sine;
        }
        wall.offset = wall.offset.wrapping_add(sine);
        wall.center_angle = ANG90 + frame.view_angle - normal_angle;
    }
}

/// Borrowed state for one front to back pass over the walls
struct SegLoop<'a> {
    frame: &'a RenderFrameContext,
    tables: &'a ViewTables,
    planes: &'a mut VisPlaneRender,
    pic_data: &'a PicData,
    openings: &'a mut [u8],
    clip_top: &'a mut [i32],
    clip_bottom: &'a mut [i32],
}

impl SegLoop<'_> {
    /// Do a fake wall rendering to get the visplane records, so the walls
    /// can be drawn back to front later.
    fn seg_loop(&mut self, wall: &VisWall, buffer: &mut impl PixelBuffer) {
        let center_y = self.tables.center_y;
        let height = self.tables.height;
        // visplanes[0] is full to force a FindPlane on the first column
        let mut floor_plane = 0;
        let mut ceiling_plane = 0;
        let mut scalefrac = wall.left_scale;

        for x in wall.left_x..=wall.right_x {
            let scale = (scalefrac >> FIXEDTOSCALE).min(0x1fff);
            let col = x as usize;
            let ceilclip = self.clip_top[col];
            let floorclip = self.clip_bottom[col];

            if wall.has(AC_ADDFLOOR) {
                let top = project(center_y, scale, wall.floorheight).max(ceilclip + 1);
                let bottom = floorclip - 1;
                if top <= bottom {
                    if let Some(plane) = self.plane_for(
                        floor_plane,
                        col,
                        wall.floorheight,
                        wall.floorpic,
                        wall,
                    ) {
                        floor_plane = plane;
                        self.planes.visplanes[plane].open[col] = ((top as u32) << 8) | bottom as u32;
                    }
                }
            }

            if wall.has(AC_ADDCEILING) {
                let top = ceilclip + 1;
                let bottom = (project(center_y - 1, scale, wall.ceilingheight)).min(floorclip - 1);
                if top <= bottom {
                    if let Some(plane) = self.plane_for(
                        ceiling_plane,
                        col,
                        wall.ceilingheight,
                        wall.ceilingpic,
                        wall,
                    ) {
                        ceiling_plane = plane;
                        self.planes.visplanes[plane].open[col] = ((top as u32) << 8) | bottom as u32;
                    }
                }
            }

            // Sprite clip sils
            if wall.has(AC_BOTTOMSIL | AC_NEWFLOOR) {
                let low = project(center_y, scale, wall.floornewheight).min(floorclip).max(0);
                if let Some(start) = wall.bottomsil.filter(|_| wall.has(AC_BOTTOMSIL)) {
                    self.openings[start + (x - wall.left_x) as usize] = low as u8;
                }
                if wall.has(AC_NEWFLOOR) {
                    self.clip_bottom[col] = low;
                }
            }

            if wall.has(AC_TOPSIL | AC_NEWCEILING) {
                let high = project(center_y - 1, scale, wall.ceilingnewheight)
                    .max(ceilclip)
                    .min(height - 1);
                if let Some(start) = wall.topsil.filter(|_| wall.has(AC_TOPSIL)) {
                    self.openings[start + (x - wall.left_x) as usize] = (high + 1) as u8;
                }
                if wall.has(AC_NEWCEILING) {
                    self.clip_top[col] = high;
                }
            }

            // The sky can be drawn right now
            if wall.has(AC_ADDSKY) {
                let bottom = project(center_y, scale, wall.ceilingheight).min(floorclip);
                if ceilclip + 1 < bottom {
                    self.draw_sky_column(x, ceilclip + 1, bottom, buffer);
                }
            }

            scalefrac = scalefrac.wrapping_add(wall.scale_step);
        }
    }

    /// Keep using `current` while its column is free, otherwise find or make
    /// a matching plane
    fn plane_for(
        &mut self,
        current: usize,
        col: usize,
        height: i32,
        pic: usize,
        wall: &VisWall,
    ) -> Option<usize> {
        if self.planes.visplanes[current].open[col] == OPENMARK {
            return Some(current);
        }
        self.planes
            .find_plane(current, height, pic, wall.seglight, col as i32, wall.right_x)
    }

    /// Sky columns are full bright and unscaled, 256 columns around the
    /// full circle
    fn draw_sky_column(&self, x: i32, top: i32, bottom: i32, buffer: &mut impl PixelBuffer) {
        let sky = self.pic_data.sky();
        let palette = self.pic_data.palette();
        let angle = self.tables.xtoviewangle[x as usize] + self.frame.view_angle;
        let column = sky.column(((angle.bam() >> ANGLETOSKYSHIFT) & 0xFF) as i32);
        for y in top.max(0)..bottom.min(self.tables.height) {
            let texel = column[y as usize % sky.height];
            buffer.set_pixel(x as usize, y as usize, &shade(palette[texel as usize], FRACUNIT));
        }
    }
}

/// A top or bottom texture piece of a wall
struct TexturePiece<'a> {
    pic: &'a WallPic,
    top: i32,
    bottom: i32,
    mid: Fixed,
}

/// Draw a single wall's textures, column by column
fn draw_seg(
    wall: &VisWall,
    tables: &ViewTables,
    pic_data: &PicData,
    buffer: &mut impl PixelBuffer,
) {
    if !wall.has(AC_TOPTEXTURE | AC_BOTTOMTEXTURE) {
        return;
    }
    let top = wall
        .t_texture
        .filter(|_| wall.has(AC_TOPTEXTURE))
        .and_then(|t| pic_data.wall(t))
        .map(|pic| TexturePiece {
            pic,
            top: wall.t_topheight,
            bottom: wall.t_bottomheight,
            mid: wall.t_texturemid,
        });
    let bottom = wall
        .b_texture
        .filter(|_| wall.has(AC_BOTTOMTEXTURE))
        .and_then(|t| pic_data.wall(t))
        .map(|pic| TexturePiece {
            pic,
            top: wall.b_topheight,
            bottom: wall.b_bottomheight,
            mid: wall.b_texturemid,
        });
    let palette = pic_data.palette();

    let mut scalefrac = wall.left_scale;
    for x in wall.left_x..=wall.right_x {
        let scale = (scalefrac >> FIXEDTOSCALE).min(0x1fff);
        let angle = wall.center_angle + tables.xtoviewangle[x as usize];
        let column =
            wall.offset.wrapping_sub(fixed_mul(angle.tan_from_offset(), wall.distance)) >> FRACBITS;
        let light = tables.wall_light(wall.seglight, scale);
        let multiplier = light_multiplier(light, MAX_WALL_LIGHT);

        for piece in [&top, &bottom].into_iter().flatten() {
            draw_texture(piece, x, scale, column, multiplier, tables, palette, buffer);
        }
        scalefrac = scalefrac.wrapping_add(wall.scale_step);
    }
}

/// Scale one texture column onto the screen. Only clipped to the screen
/// edges.
#[allow(clippy::too_many_arguments)]
fn draw_texture(
    piece: &TexturePiece,
    x: i32,
    scale: i32,
    column: i32,
    multiplier: Fixed,
    tables: &ViewTables,
    palette: &[[u8; 3]],
    buffer: &mut impl PixelBuffer,
) {
    // Source image height
    let run = (piece.top - piece.bottom) >> HEIGHTBITS;
    let tex_height = piece.pic.height as i32;
    if run <= 0 || scale <= 0 || tex_height <= 0 || piece.pic.width == 0 {
        return;
    }
    let y = project(tables.center_y, scale, piece.top);
    let row = (piece.mid.wrapping_sub(piece.top << FIXEDTOHEIGHT) >> FRACBITS).rem_euclid(tex_height);

    let scaled = run as i64 * scale as i64;
    let mut count = scaled >> SCALEBITS;
    if scaled & 0x1F0 != 0 {
        count += 1;
    }
    let step = idiv(scale as usize) as i64;
    let source = piece.pic.column(column);

    let first = (-y).max(0) as i64;
    let last = count.min((tables.height - y) as i64);
    for i in first..last {
        let texel_row = (row as i64 + ((i * step + (FRACUNIT as i64 >> 1)) >> FRACBITS)) % tex_height as i64;
        let colour = palette[source[texel_row as usize] as usize];
        buffer.set_pixel(x as usize, (y as i64 + i) as usize, &shade(colour, multiplier));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gameplay::{GridMapBuilder, SectorSpec};
    use math::int_to_fixed;
    use render_target::DrawBuffer;

    fn map() -> MapData {
        // sector 1 is a raised step, sector 2 a sky area
        GridMapBuilder::new(64)
            .sector(SectorSpec::new(0, 128, 160))
            .sector(SectorSpec::new(24, 128, 160))
            .sector(SectorSpec::new(0, 160, 200).sky())
            .rows(&["002", "001", "000"])
            .build("SEGS")
            .unwrap()
    }

    fn frame(z: i32) -> RenderFrameContext {
        let mut frame = RenderFrameContext::default();
        frame.view_x = int_to_fixed(32);
        frame.view_y = int_to_fixed(32);
        frame.view_z = int_to_fixed(z);
        frame.view_angle = ANG90;
        frame
    }

    fn seg_between<'a>(map: &'a MapData, front: usize, back: Option<usize>) -> &'a Segment {
        map.segments()
            .iter()
            .find(|s| s.frontsector == front && s.backsector == back)
            .unwrap()
    }

    fn render(tables: &ViewTables) -> SegRender {
        SegRender::new(
            tables.width as usize,
            tables.height as usize,
            &FrameLimits::default(),
        )
    }

    #[test]
    fn one_sided_wall_is_solid() {
        let map = map();
        let pics = PicData::generate();
        let tables = ViewTables::new(ScreenSize::Size160x96);
        let mut segs = render(&tables);
        let seg = seg_between(&map, 0, None);
        let line = &map.linedefs()[seg.linedef];
        assert!(!line.is_mapped());

        let wall = segs.wall_prep(&frame(41), &map, &pics, seg, 10, 20);
        assert!(line.is_mapped());
        let want = AC_ADDFLOOR | AC_NEWFLOOR | AC_ADDCEILING | AC_NEWCEILING | AC_TOPTEXTURE | AC_SOLIDSIL;
        assert_eq!(wall.actionbits, want);
        assert_eq!(wall.floorheight, -41 << 6);
        assert_eq!(wall.ceilingheight, 87 << 6);
        assert_eq!(wall.t_texturemid, int_to_fixed(87));
        assert!(wall.topsil.is_none() && wall.bottomsil.is_none());
    }

    #[test]
    fn step_gets_bottom_texture_and_sil() {
        let map = map();
        let pics = PicData::generate();
        let tables = ViewTables::new(ScreenSize::Size160x96);
        let mut segs = render(&tables);
        let seg = seg_between(&map, 0, Some(1));

        // eye below the top of the step, so it hides things behind it
        let wall = segs.wall_prep(&frame(20), &map, &pics, seg, 10, 20);
        assert_eq!(wall.actionbits & AC_BOTTOMSIL, AC_BOTTOMSIL);
        assert_eq!(wall.actionbits & AC_BOTTOMTEXTURE, AC_BOTTOMTEXTURE);
        assert_eq!(wall.actionbits & AC_NEWFLOOR, AC_NEWFLOOR);
        assert!(!wall.has(AC_TOPTEXTURE | AC_SOLIDSIL | AC_TOPSIL));
        assert_eq!(wall.b_topheight, 4 << 6);
        assert_eq!(wall.floornewheight, 4 << 6);
        assert_eq!(wall.b_texturemid, int_to_fixed(4));
        assert_eq!(wall.bottomsil, Some(0));

        // eye above it, nothing behind is hidden
        let wall = segs.wall_prep(&frame(41), &map, &pics, seg, 10, 20);
        assert!(wall.has(AC_BOTTOMTEXTURE));
        assert!(!wall.has(AC_BOTTOMSIL));

        // the same floor seen from above, looking back down the step
        let down = seg_between(&map, 1, Some(0));
        let wall = segs.wall_prep(&frame(65), &map, &pics, down, 30, 40);
        assert!(wall.has(AC_BOTTOMSIL | AC_ADDFLOOR));
        assert!(!wall.has(AC_BOTTOMTEXTURE));
        assert_eq!(wall.bottomsil, Some(11));
    }

    #[test]
    fn sky_ceiling_is_drawn_not_planed() {
        let map = map();
        let pics = PicData::generate();
        let tables = ViewTables::new(ScreenSize::Size160x96);
        let mut segs = render(&tables);
        let seg = seg_between(&map, 2, None);
        let mut lit = frame(41);
        lit.extralight = 64;
        let wall = segs.wall_prep(&lit, &map, &pics, seg, 0, 5);
        assert_eq!(wall.actionbits & AC_ADDSKY, AC_ADDSKY);
        assert_eq!(wall.actionbits & AC_NEWCEILING, AC_NEWCEILING);
        assert!(!wall.has(AC_ADDCEILING));
        assert_eq!(wall.ceilingpic, 0);
        // extra light tops out at 240
        assert_eq!(wall.seglight, 240);
    }

    #[test]
    fn openings_overflow_drops_the_sil() {
        let map = map();
        let pics = PicData::generate();
        let tables = ViewTables::new(ScreenSize::Size160x96);
        let limits = FrameLimits {
            max_openings: 15,
            ..FrameLimits::default()
        };
        let mut segs = SegRender::new(160, 96, &limits);
        let seg = seg_between(&map, 0, Some(1));
        let first = segs.wall_prep(&frame(20), &map, &pics, seg, 0, 9);
        assert!(first.has(AC_BOTTOMSIL));
        let second = segs.wall_prep(&frame(20), &map, &pics, seg, 10, 19);
        assert!(!second.has(AC_BOTTOMSIL));
        assert_eq!(segs.opening_overflow, 1);
    }

    #[test]
    fn wall_scales_and_columns() {
        let map = map();
        let pics = PicData::generate();
        let tables = ViewTables::new(ScreenSize::Size160x96);
        let mut segs = render(&tables);
        let frame = frame(41);

        // north wall of the start room, straight ahead and 96 units away
        let seg = map
            .segments()
            .iter()
            .find(|s| s.backsector.is_none() && s.frontsector == 2 && s.v1.y == s.v2.y)
            .unwrap();
        let angle = math::point_to_angle(frame.view_x, frame.view_y, seg.v1.x, seg.v1.y);
        segs.store_wall_range(&frame, &tables, &map, &pics, seg, angle, 40, 120);
        let wall = &segs.walls[0];
        assert!((wall.distance - int_to_fixed(160)).abs() < 2 * FRACUNIT, "{}", wall.distance);
        // facing the wall square on: same scale at both ends
        assert!((wall.left_scale - wall.right_scale).abs() < wall.left_scale / 20);
        assert!(wall.small_scale <= wall.large_scale);
    }

    #[test]
    fn seg_loop_closes_columns_behind_solid_walls() {
        let map = map();
        let pics = PicData::generate();
        let tables = ViewTables::new(ScreenSize::Size160x96);
        let mut segs = render(&tables);
        let mut planes = VisPlaneRender::new(160, 96, 64);
        let mut buffer = DrawBuffer::new(160, 96);
        let frame = frame(41);

        let seg = seg_between(&map, 0, None);
        let mut wall = segs.wall_prep(&frame, &map, &pics, seg, 10, 20);
        // a quarter scale, 87 units of ceiling and 41 of floor
        wall.left_scale = FRACUNIT / 4;
        wall.right_scale = FRACUNIT / 4;
        segs.walls.push(wall);
        segs.seg_loop_all(&frame, &tables, &mut planes, &pics, &mut buffer);

        // floor and ceiling planes, one each
        assert_eq!(planes.planes().len(), 2);
        for x in 10..=20 {
            assert_eq!(segs.clip_bottom[x], 58);
            assert_eq!(segs.clip_top[x], 26);
        }
        assert_eq!(segs.clip_bottom[21], 96);
        assert_eq!(segs.clip_top[9], -1);

        segs.draw_walls(&tables, &pics, &mut buffer);
        assert_eq!(buffer.read_pixel(15, 48)[3], 255);
        assert_eq!(buffer.read_pixel(30, 48)[3], 0);
    }

    #[test]
    fn texture_column_height_follows_scale() {
        let pics = PicData::generate();
        let tables = ViewTables::new(ScreenSize::Size160x96);
        let mut buffer = DrawBuffer::new(160, 96);
        let piece = TexturePiece {
            pic: pics.wall(0).unwrap(),
            top: 16 << 6,
            bottom: -16 << 6,
            mid: int_to_fixed(16),
        };
        // scale 1.0: 32 units tall, 32 pixels centred on the horizon
        draw_texture(&piece, 5, 1 << SCALEBITS, 0, FRACUNIT, &tables, pics.palette(), &mut buffer);
        let drawn: Vec<usize> = (0..96).filter(|&y| buffer.read_pixel(5, y)[3] == 255).collect();
        assert_eq!(drawn.len(), 32);
        assert_eq!(drawn[0], 32);
    }

    #[test]
    fn empty_texture_draws_nothing() {
        let pics = PicData::generate();
        let tables = ViewTables::new(ScreenSize::Size160x96);
        let mut buffer = DrawBuffer::new(160, 96);
        let empty = WallPic {
            name: "EMPTY".to_owned(),
            width: 0,
            height: 0,
            data: Vec::new(),
        };
        let piece = TexturePiece {
            pic: &empty,
            top: 16 << 6,
            bottom: -16 << 6,
            mid: int_to_fixed(16),
        };
        draw_texture(&piece, 5, 1 << SCALEBITS, 0, FRACUNIT, &tables, pics.palette(), &mut buffer);
        assert!((0..96).all(|y| buffer.read_pixel(5, y)[3] == 0));
    }

    #[test]
    fn unknown_texture_keeps_the_wall_bits_but_draws_nothing() {
        let pics = PicData::generate();
        let tables = ViewTables::new(ScreenSize::Size160x96);
        let mut buffer = DrawBuffer::new(160, 96);
        let wall = VisWall {
            left_x: 10,
            right_x: 20,
            actionbits: AC_TOPTEXTURE,
            t_texture: Some(pics.num_walls() + 7),
            t_topheight: 16 << 6,
            t_bottomheight: -16 << 6,
            left_scale: int_to_fixed(1),
            ..VisWall::default()
        };
        draw_seg(&wall, &tables, &pics, &mut buffer);
        assert!(wall.has(AC_TOPTEXTURE));
        assert!((10..=20).all(|x| (0..96).all(|y| buffer.read_pixel(x, y)[3] == 0)));
    }
}
