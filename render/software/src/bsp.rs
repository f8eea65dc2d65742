#[cfg(feature = "hprof")]
use coarse_prof::profile;
use gameplay::log::{debug, trace, warn};
use gameplay::{BBox, Level, MapData, NodeChild, PicData, ValidCount};
use math::{ANG180, Angle, Fixed, point_on_vector_side, point_to_angle};
use render_trait::{PixelBuffer, PlayViewRenderer, PlayerView};

use crate::clip::ClipList;
use crate::defs::{FrameLimits, FrameStats, ScreenSize};
use crate::planes::VisPlaneRender;
use crate::segs::SegRender;
use crate::things::SpriteRender;
use crate::utilities::ViewTables;

const BOXTOP: usize = 0;
const BOXBOTTOM: usize = 1;
const BOXLEFT: usize = 2;
const BOXRIGHT: usize = 3;

/// Corners of a bounding box that give its widest silhouette, by where the
/// view sits relative to the box. The centre entry is never used.
const CHECKCOORD: [[usize; 4]; 9] = [
    [BOXRIGHT, BOXTOP, BOXLEFT, BOXBOTTOM],    // Above,Left
    [BOXRIGHT, BOXTOP, BOXLEFT, BOXTOP],       // Above,Center
    [BOXRIGHT, BOXBOTTOM, BOXLEFT, BOXTOP],    // Above,Right
    [BOXLEFT, BOXTOP, BOXLEFT, BOXBOTTOM],     // Center,Left
    [0, 0, 0, 0],                              // Center,Center
    [BOXRIGHT, BOXBOTTOM, BOXRIGHT, BOXTOP],   // Center,Right
    [BOXLEFT, BOXTOP, BOXRIGHT, BOXBOTTOM],    // Below,Left
    [BOXLEFT, BOXBOTTOM, BOXRIGHT, BOXBOTTOM], // Below,Center
    [BOXLEFT, BOXBOTTOM, BOXRIGHT, BOXTOP],    // Below,Right
];

/// Where the frame is seen from, plus the per frame visit stamps. Passed
/// down through every stage instead of living in globals.
#[derive(Debug, Default, Clone)]
pub struct RenderFrameContext {
    pub view_x: Fixed,
    pub view_y: Fixed,
    pub view_z: Fixed,
    pub view_angle: Angle,
    pub view_cos: Fixed,
    pub view_sin: Fixed,
    pub extralight: u32,
    /// Sectors whose things were already projected this frame
    pub sectors: ValidCount,
}

impl RenderFrameContext {
    /// Take the view for a new frame and start a fresh sector pass
    pub fn begin(&mut self, view: &PlayerView, num_sectors: usize) {
        self.view_x = view.x;
        self.view_y = view.y;
        self.view_z = view.z;
        self.view_angle = view.angle;
        self.view_cos = view.angle.cos();
        self.view_sin = view.angle.sin();
        self.extralight = view.extralight;
        self.sectors.resize(num_sectors);
        self.sectors.next_pass();
    }
}

/// The 3DO style renderer. Walks the BSP front to back collecting walls and
/// sprites, then draws sky, planes, walls and finally sprites clipped by the
/// wall silhouettes.
pub struct SoftwareRenderer {
    tables: ViewTables,
    limits: FrameLimits,
    frame: RenderFrameContext,
    clip: ClipList,
    seg_render: SegRender,
    plane_render: VisPlaneRender,
    sprite_render: SpriteRender,
    stats: FrameStats,
    /// Visible pieces of the seg being added
    ranges: Vec<(i32, i32)>,
}

impl SoftwareRenderer {
    pub fn new(size: ScreenSize, limits: FrameLimits) -> Self {
        let limits = limits.sanitised();
        let tables = ViewTables::new(size);
        let width = tables.width as usize;
        let height = tables.height as usize;
        debug!("Software renderer {size}, limits {limits:?}");
        Self {
            clip: ClipList::new(limits.max_segs, tables.width),
            seg_render: SegRender::new(width, height, &limits),
            plane_render: VisPlaneRender::new(width, height, limits.max_planes),
            sprite_render: SpriteRender::new(width, &limits),
            tables,
            limits,
            frame: RenderFrameContext::default(),
            stats: FrameStats::default(),
            ranges: Vec::with_capacity(8),
        }
    }

    /// Switch to another view size, rebuilding every size dependent table
    pub fn set_size(&mut self, size: ScreenSize) {
        if size != self.tables.size {
            *self = Self::new(size, self.limits);
        }
    }

    #[inline]
    pub fn size(&self) -> ScreenSize {
        self.tables.size
    }

    #[inline]
    pub fn tables(&self) -> &ViewTables {
        &self.tables
    }

    #[inline]
    pub fn limits(&self) -> &FrameLimits {
        &self.limits
    }

    /// Counters from the last frame drawn
    #[inline]
    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }

    #[inline]
    pub fn frame(&self) -> &RenderFrameContext {
        &self.frame
    }

    fn clear(&mut self) {
        self.clip.clear(self.tables.width);
        self.seg_render.clear();
        self.plane_render.clear_planes();
        self.sprite_render.clear();
        self.stats = FrameStats::default();
    }

    /// Find every wall and sprite in view. Everything is stored, nothing is
    /// drawn yet.
    ///
    /// Doom function name `BSP`
    fn bsp(&mut self, level: &Level, pic_data: &PicData) {
        #[cfg(feature = "hprof")]
        profile!("bsp");
        let map = &level.map_data;
        self.render_bsp_node(level, pic_data, map.start_node());
    }

    /// Walk the tree front to back, only visiting the far side of a split
    /// when its box can still show something.
    ///
    /// R_RenderBSPNode - r_bsp
    fn render_bsp_node(&mut self, level: &Level, pic_data: &PicData, child: NodeChild) {
        let node = match child {
            NodeChild::SubSector(ss) => {
                self.subsector(level, pic_data, ss as usize);
                return;
            }
            NodeChild::Node(n) => &level.map_data.nodes()[n as usize],
        };
        self.stats.bsp_nodes += 1;

        // Decide which side the view point is on
        let side = point_on_vector_side(self.frame.view_x, self.frame.view_y, &node.partition()) as usize;
        let children = node.children;
        let back_box = node.bboxes[side ^ 1];
        // Recursively divide front space
        self.render_bsp_node(level, pic_data, children[side]);
        // Possibly divide back space
        if self.check_bbox(&back_box) {
            self.render_bsp_node(level, pic_data, children[side ^ 1]);
        }
    }

    /// Can any part of the box be seen past the solid walls found so far?
    ///
    /// R_CheckBBox - r_bsp
    fn check_bbox(&self, bbox: &BBox) -> bool {
        let coords = [bbox.top, bbox.bottom, bbox.left, bbox.right];
        let frame = &self.frame;

        let mut boxpos = 0;
        if frame.view_y < bbox.top {
            boxpos = 3;
            if frame.view_y <= bbox.bottom {
                boxpos = 6;
            }
        }
        if frame.view_x > bbox.left {
            boxpos += 1;
            if frame.view_x >= bbox.right {
                boxpos += 1;
            }
        }
        // Inside the box
        if boxpos == 4 {
            return true;
        }

        let corners = CHECKCOORD[boxpos];
        let angle1 = point_to_angle(frame.view_x, frame.view_y, coords[corners[0]], coords[corners[1]])
            - frame.view_angle;
        let angle2 = point_to_angle(frame.view_x, frame.view_y, coords[corners[2]], coords[corners[3]])
            - frame.view_angle;

        // Sitting on the box edge
        let span = angle1 - angle2;
        if span >= ANG180 {
            return true;
        }
        let Some((angle1, angle2)) = self.clip_to_view(angle1, angle2, span) else {
            return false;
        };

        let x1 = self.tables.angle_to_x(angle1);
        let x2 = self.tables.angle_to_x(angle2);
        // Too thin to cover a column
        if x1 == x2 {
            return false;
        }
        !self.clip.is_occluded(x1, x2 - 1)
    }

    /// Clip a view relative angle pair to the field of view. `None` if the
    /// span is entirely off one side.
    fn clip_to_view(&self, mut angle1: Angle, mut angle2: Angle, span: Angle) -> Option<(Angle, Angle)> {
        let clipangle = self.tables.clipangle;
        let doubleclipangle = self.tables.doubleclipangle;

        let mut tspan = angle1 + clipangle;
        if tspan > doubleclipangle {
            tspan -= doubleclipangle;
            // Totally off the left edge?
            if tspan >= span {
                return None;
            }
            angle1 = clipangle;
        }
        tspan = clipangle - angle2;
        if tspan > doubleclipangle {
            tspan -= doubleclipangle;
            // Totally off the right edge?
            if tspan >= span {
                return None;
            }
            angle2 = -clipangle;
        }
        Some((angle1, angle2))
    }

    /// Project the things of a subsector's sector, then every seg.
    ///
    /// R_Subsector - r_bsp
    fn subsector(&mut self, level: &Level, pic_data: &PicData, index: usize) {
        let map = &level.map_data;
        let Some(subsector) = map.subsectors().get(index) else {
            return;
        };
        self.stats.subsectors += 1;
        let sector = subsector.sector;
        self.sprite_prep(level, pic_data, sector);
        for seg in subsector.segs() {
            self.add_line(map, pic_data, seg, sector);
        }
    }

    /// Queue the things standing in `sector`, once per frame
    ///
    /// Doom function name `SpritePrep`
    fn sprite_prep(&mut self, level: &Level, pic_data: &PicData, sector: usize) {
        if !self.frame.sectors.mark(sector) {
            return;
        }
        let light = level.map_data.sectors()[sector].lightlevel;
        for (_, thing) in level.mobjs.sector_things(sector) {
            self.sprite_render
                .prep_mobj(&self.frame, &self.tables, pic_data, thing, light);
        }
    }

    /// Clip a seg to the view and the solid wall list, storing every
    /// visible piece as a wall. Back facing segs are thrown out here.
    ///
    /// R_AddLine - r_bsp
    fn add_line(&mut self, map: &MapData, pic_data: &PicData, seg_index: usize, front: usize) {
        let seg = &map.segments()[seg_index];
        let frame = &self.frame;
        let angle1 = point_to_angle(frame.view_x, frame.view_y, seg.v1.x, seg.v1.y);
        let angle2 = point_to_angle(frame.view_x, frame.view_y, seg.v2.x, seg.v2.y);

        // Back side, i.e. backface culling
        let span = angle1 - angle2;
        if span >= ANG180 {
            return;
        }
        let line_angle = angle1;
        let Some((angle1, angle2)) =
            self.clip_to_view(angle1 - frame.view_angle, angle2 - frame.view_angle, span)
        else {
            return;
        };

        let x1 = self.tables.angle_to_x(angle1);
        let x2 = self.tables.angle_to_x(angle2);
        // Does not cross a pixel?
        if x1 >= x2 {
            return;
        }
        let x2 = x2 - 1;

        let front_sector = &map.sectors()[front];
        let ranges = &mut self.ranges;
        ranges.clear();
        let Some(back) = seg.backsector.map(|b| &map.sectors()[b]) else {
            self.clip.clip_solid(x1, x2, |a, b| ranges.push((a, b)));
            self.store_ranges(map, pic_data, seg_index, line_angle);
            return;
        };

        // Closed door
        if back.ceilingheight <= front_sector.floorheight || back.floorheight >= front_sector.ceilingheight {
            self.clip.clip_solid(x1, x2, |a, b| ranges.push((a, b)));
        } else if back.ceilingheight != front_sector.ceilingheight
            || back.floorheight != front_sector.floorheight
            || back.ceilingpic != front_sector.ceilingpic
            || back.floorpic != front_sector.floorpic
            || back.lightlevel != front_sector.lightlevel
            || map.sidedefs()[seg.sidedef].midtexture.is_some()
        {
            // Window
            self.clip.clip_pass(x1, x2, |a, b| ranges.push((a, b)));
        }
        // Otherwise an identical sector on both sides, nothing to draw
        self.store_ranges(map, pic_data, seg_index, line_angle);
    }

    fn store_ranges(&mut self, map: &MapData, pic_data: &PicData, seg_index: usize, line_angle: Angle) {
        let seg = &map.segments()[seg_index];
        for &(left, right) in self.ranges.iter() {
            self.seg_render.store_wall_range(
                &self.frame,
                &self.tables,
                map,
                pic_data,
                seg,
                line_angle,
                left,
                right,
            );
        }
    }

    fn collect_stats(&mut self, sprites_drawn: u32, sprite_pixels: u32) {
        self.stats.walls = self.seg_render.walls.len() as u32;
        self.stats.planes = self.plane_render.planes().len() as u32;
        self.stats.sprites = self.sprite_render.sprites.len() as u32;
        self.stats.sprites_drawn = sprites_drawn;
        self.stats.sprite_pixels = sprite_pixels;
        self.stats.wall_overflow = self.seg_render.wall_overflow;
        self.stats.opening_overflow = self.seg_render.opening_overflow;
        self.stats.plane_overflow = self.plane_render.overflow;
        self.stats.sprite_overflow = self.sprite_render.overflow;
        self.stats.seg_overflow = self.clip.overflow();
    }
}

impl PlayViewRenderer for SoftwareRenderer {
    fn render_player_view(
        &mut self,
        view: &PlayerView,
        level: &Level,
        pic_data: &PicData,
        buffer: &mut impl PixelBuffer,
    ) {
        if buffer.size().width() < self.tables.width || buffer.size().height() < self.tables.height {
            warn!(
                "Buffer {}x{} is smaller than the {} view",
                buffer.size().width(),
                buffer.size().height(),
                self.tables.size
            );
            return;
        }
        let map = &level.map_data;
        self.clear();
        self.frame.begin(view, map.sectors().len());
        buffer.clear();

        self.bsp(level, pic_data);
        trace!("BSP traversals for render: {}", self.stats.bsp_nodes);

        // Planes and sky
        self.seg_render
            .seg_loop_all(&self.frame, &self.tables, &mut self.plane_render, pic_data, buffer);
        self.plane_render
            .draw_planes(&self.frame, &self.tables, pic_data, buffer);
        self.seg_render.draw_walls(&self.tables, pic_data, buffer);
        let (drawn, pixels) = self.sprite_render.draw_sprites(
            &self.tables,
            &self.seg_render.walls,
            &self.seg_render.openings,
            pic_data,
            buffer,
        );

        self.collect_stats(drawn, pixels);
        trace!("{}", self.stats);
        if self.stats.overflowed() {
            debug!("Frame capacity clamped: {}", self.stats);
            debug_assert!(
                !self.limits.assert_on_overflow,
                "frame capacity exceeded: {}",
                self.stats
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gameplay::{GridMapBuilder, MapObjKind, ONFLOORZ, SectorSpec};
    use math::{ANG45, ANG90, int_to_fixed};
    use render_target::DrawBuffer;

    fn level() -> Level {
        let map = GridMapBuilder::new(64)
            .sector(SectorSpec::new(0, 128, 192))
            .sector(SectorSpec::new(16, 112, 160))
            .rows(&["0000", "0110", "0000", "0000"])
            .build("BSP")
            .unwrap();
        Level::new(map)
    }

    fn view(x: i32, y: i32, angle: Angle) -> PlayerView {
        PlayerView {
            x: int_to_fixed(x),
            y: int_to_fixed(y),
            z: int_to_fixed(41),
            angle,
            extralight: 0,
        }
    }

    #[test]
    fn frame_context_takes_the_view() {
        let mut frame = RenderFrameContext::default();
        frame.begin(&view(10, 20, ANG90), 4);
        assert_eq!(frame.view_cos, 0);
        assert_eq!(frame.view_sin, math::FRACUNIT);
        let first = frame.sectors.count();
        assert!(frame.sectors.mark(2));
        assert!(!frame.sectors.mark(2));
        frame.begin(&view(10, 20, ANG90), 4);
        assert_ne!(frame.sectors.count(), first);
        assert!(frame.sectors.mark(2));
    }

    #[test]
    fn box_containing_the_view_is_visited() {
        let mut r = SoftwareRenderer::new(ScreenSize::Size160x96, FrameLimits::default());
        r.frame.begin(&view(32, 32, ANG90), 1);
        let inside = BBox {
            top: int_to_fixed(64),
            bottom: 0,
            left: 0,
            right: int_to_fixed(64),
        };
        assert!(r.check_bbox(&inside));

        // directly behind the viewer
        let behind = BBox {
            top: int_to_fixed(-64),
            bottom: int_to_fixed(-128),
            left: 0,
            right: int_to_fixed(64),
        };
        assert!(!r.check_bbox(&behind));

        // ahead, until a solid wall covers the whole screen
        let ahead = BBox {
            top: int_to_fixed(256),
            bottom: int_to_fixed(192),
            left: 0,
            right: int_to_fixed(64),
        };
        assert!(r.check_bbox(&ahead));
        let width = r.tables.width;
        r.clip.clip_solid(0, width - 1, |_, _| {});
        assert!(!r.check_bbox(&ahead));
    }

    #[test]
    fn every_column_is_covered_once_the_room_is_walked() {
        let level = level();
        let pics = PicData::generate();
        let mut r = SoftwareRenderer::new(ScreenSize::Size160x96, FrameLimits::default());
        let mut buffer = DrawBuffer::new(160, 96);
        r.render_player_view(&view(32, 32, ANG90), &level, &pics, &mut buffer);

        // the room is closed so the solid walls swallow both sentinels
        let ranges = r.clip.ranges();
        assert_eq!(ranges.len(), 1, "{ranges:?}");
        assert!(ranges[0].first < 0 && ranges[0].last >= r.tables.width);
        let stats = r.stats();
        assert!(stats.walls > 0);
        assert!(stats.planes >= 2);
        assert!(!stats.overflowed());
        // walls and planes fill the view
        let written = (0..96)
            .flat_map(|y| (0..160).map(move |x| (x, y)))
            .filter(|(x, y)| buffer.read_pixel(*x, *y)[3] == 255)
            .count();
        assert!(written * 100 >= 160 * 96 * 95, "{written}");
    }

    #[test]
    fn things_are_prepped_once_per_sector() {
        let mut level = level();
        let pics = PicData::generate();
        level.spawn_mobj(int_to_fixed(96), int_to_fixed(160), ONFLOORZ, MapObjKind::Barrel);
        level.spawn_mobj(int_to_fixed(160), int_to_fixed(224), ONFLOORZ, MapObjKind::Imp);
        level.spawn_mobj(int_to_fixed(32), int_to_fixed(32), ONFLOORZ, MapObjKind::Player);
        let mut r = SoftwareRenderer::new(ScreenSize::Size160x96, FrameLimits::default());
        let mut buffer = DrawBuffer::new(160, 96);
        r.render_player_view(&view(32, 32, ANG45), &level, &pics, &mut buffer);
        // the player is skipped, each other thing appears exactly once
        assert_eq!(r.stats().sprites, 2);
        assert!(r.stats().sprites_drawn >= 1);
    }

    #[test]
    fn tight_limits_are_counted_not_fatal() {
        let level = level();
        let pics = PicData::generate();
        let limits = FrameLimits {
            max_walls: 2,
            max_planes: 2,
            max_segs: 3,
            ..Default::default()
        };
        let mut r = SoftwareRenderer::new(ScreenSize::Size160x96, limits);
        let mut buffer = DrawBuffer::new(160, 96);
        r.render_player_view(&view(32, 32, ANG45), &level, &pics, &mut buffer);
        let stats = *r.stats();
        assert!(stats.overflowed());
        assert!(stats.walls <= 2);
        assert!(stats.wall_overflow > 0);
        assert!(stats.plane_overflow > 0 || stats.seg_overflow > 0);

        // the next frame starts from clean counters and clamps the same way
        r.render_player_view(&view(32, 32, ANG45), &level, &pics, &mut buffer);
        assert_eq!(*r.stats(), stats);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "frame capacity exceeded")]
    fn strict_limits_assert_in_debug_builds() {
        let level = level();
        let pics = PicData::generate();
        let limits = FrameLimits {
            max_walls: 2,
            assert_on_overflow: true,
            ..Default::default()
        };
        let mut r = SoftwareRenderer::new(ScreenSize::Size160x96, limits);
        let mut buffer = DrawBuffer::new(160, 96);
        r.render_player_view(&view(32, 32, ANG45), &level, &pics, &mut buffer);
    }

    #[test]
    fn small_buffer_is_refused() {
        let level = level();
        let pics = PicData::generate();
        let mut r = SoftwareRenderer::new(ScreenSize::Size280x160, FrameLimits::default());
        let mut buffer = DrawBuffer::new(200, 100);
        r.render_player_view(&view(32, 32, ANG90), &level, &pics, &mut buffer);
        assert_eq!(r.stats().walls, 0);
        r.set_size(ScreenSize::Size128x80);
        r.render_player_view(&view(32, 32, ANG90), &level, &pics, &mut buffer);
        assert!(r.stats().walls > 0);
    }
}
