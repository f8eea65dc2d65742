//! Software renderer in the style of the 3DO port: a BSP walk that fills a
//! solid column clip list, walls stored with their silhouettes, visplanes
//! drawn as spans, and sprites clipped against the walls without a depth
//! buffer.

mod automap;
mod bsp;
mod clip;
mod defs;
mod planes;
mod segs;
mod things;
mod utilities;

pub use automap::{Automap, MAXSCALES, MINSCALES};
pub use bsp::{RenderFrameContext, SoftwareRenderer};
pub use clip::ClipList;
pub use defs::{ClipRange, FrameLimits, FrameStats, MAXSCREENHEIGHT, MAXSCREENWIDTH, ScreenSize};
pub use planes::VisPlane;
pub use segs::VisWall;
pub use things::{SPR_FLIP, SPR_SHADOW, VisSprite, sort_words};
pub use utilities::ViewTables;

#[cfg(test)]
mod tests {
    use gameplay::{GridMapBuilder, Level, MapObjKind, ONFLOORZ, PicData, SectorSpec};
    use math::{ANG90, ANG180, Angle, int_to_fixed};
    use render_target::DrawBuffer;
    use render_trait::{PixelBuffer, PlayViewRenderer, PlayerView};

    use crate::{FrameLimits, ScreenSize, SoftwareRenderer};

    fn view(x: i32, y: i32, angle: Angle) -> PlayerView {
        PlayerView {
            x: int_to_fixed(x),
            y: int_to_fixed(y),
            z: int_to_fixed(41),
            angle,
            extralight: 0,
        }
    }

    /// Long hall with a thick pillar in the middle of it
    fn hall() -> Level {
        let map = GridMapBuilder::new(64)
            .sector(SectorSpec::new(0, 128, 200))
            .sector(SectorSpec::new(0, 0, 200))
            .rows(&["00000", "00000", "00000", "00100", "00100", "00000", "00000"])
            .build("HALL")
            .unwrap();
        Level::new(map)
    }

    fn count_drawn(buffer: &DrawBuffer) -> usize {
        let size = buffer.size();
        (0..size.height_usize())
            .flat_map(|y| (0..size.width_usize()).map(move |x| (x, y)))
            .filter(|(x, y)| buffer.read_pixel(*x, *y)[3] == 255)
            .count()
    }

    #[test]
    fn every_screen_size_renders() {
        let level = hall();
        let pics = PicData::generate();
        for size in ScreenSize::ALL {
            let mut r = SoftwareRenderer::new(size, FrameLimits::default());
            let mut buffer = DrawBuffer::new(size.width() as usize, size.height() as usize);
            r.render_player_view(&view(160, 32, ANG90), &level, &pics, &mut buffer);
            assert!(r.stats().walls > 0, "{size}");
            assert!(!r.stats().overflowed(), "{size}: {}", r.stats());
            assert!(count_drawn(&buffer) > 0);
        }
    }

    #[test]
    fn pillar_hides_the_thing_behind_it() {
        let mut level = hall();
        let pics = PicData::generate();
        // straight down the hall, behind the closed pillar
        level.spawn_mobj(int_to_fixed(160), int_to_fixed(352), ONFLOORZ, MapObjKind::Imp);
        let mut r = SoftwareRenderer::new(ScreenSize::Size160x96, FrameLimits::default());
        let mut buffer = DrawBuffer::new(160, 96);
        r.render_player_view(&view(160, 32, ANG90), &level, &pics, &mut buffer);
        assert_eq!(r.stats().sprites, 1);
        assert_eq!(r.stats().sprites_drawn, 0);
        assert_eq!(r.stats().sprite_pixels, 0);

        // from the far side it is in plain view
        r.render_player_view(&view(160, 440, ANG90 + ANG180), &level, &pics, &mut buffer);
        assert_eq!(r.stats().sprites, 1);
        assert_eq!(r.stats().sprites_drawn, 1);
        assert!(r.stats().sprite_pixels > 0);
    }

    #[test]
    fn things_visible_in_the_open() {
        let mut level = hall();
        let pics = PicData::generate();
        level.spawn_mobj(int_to_fixed(160), int_to_fixed(96), ONFLOORZ, MapObjKind::Barrel);
        let mut r = SoftwareRenderer::new(ScreenSize::Size160x96, FrameLimits::default());
        let mut buffer = DrawBuffer::new(160, 96);
        r.render_player_view(&view(160, 32, ANG90), &level, &pics, &mut buffer);
        assert_eq!(r.stats().sprites_drawn, 1);
        assert!(r.stats().sprite_pixels > 0);
    }

    #[test]
    fn same_view_same_picture() {
        let level = hall();
        let pics = PicData::generate();
        let mut r = SoftwareRenderer::new(ScreenSize::Size192x112, FrameLimits::default());
        let mut a = DrawBuffer::new(192, 112);
        let mut b = DrawBuffer::new(192, 112);
        let v = view(100, 60, Angle::new(0x3000_0000));
        r.render_player_view(&v, &level, &pics, &mut a);
        let first = *r.stats();
        r.render_player_view(&v, &level, &pics, &mut b);
        assert_eq!(first, *r.stats());
        assert!(a.buf_mut() == b.buf_mut());
    }
}
