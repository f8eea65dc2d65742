//! `doom3do`: walks the player through the demo level, rendering every tic
//! with the 3DO software renderer, and writes the last frame out as a PPM.

mod cli;
mod config;
mod demo;
mod timestep;

use cli::*;
use simplelog::TermLogger;
use std::error::Error;
use std::path::PathBuf;

use gameplay::log::{self, debug, info, trace};
use gameplay::{PicData, SightStats};
use render_soft::{Automap, FrameStats, SoftwareRenderer};
use render_target::DrawBuffer;
use render_trait::PlayViewRenderer;

use crate::config::UserConfig;
use crate::demo::Demo;
use crate::timestep::TimeStep;

const BASE_DIR: &str = "doom3do/";

/// Counters summed over every rendered frame
#[derive(Debug, Default)]
struct RunTotals {
    frames: u32,
    walls: u64,
    planes: u64,
    sprites_drawn: u64,
    overflowed_frames: u32,
    seen_tics: u32,
}

impl RunTotals {
    fn add(&mut self, stats: &FrameStats) {
        self.frames += 1;
        self.walls += stats.walls as u64;
        self.planes += stats.planes as u64;
        self.sprites_drawn += stats.sprites_drawn as u64;
        if stats.overflowed() {
            self.overflowed_frames += 1;
        }
    }

    fn log(&self, sight: &SightStats) {
        let frames = self.frames.max(1) as u64;
        info!(
            "{} frames: {} walls, {} planes, {} sprites per frame on average, {} frames overflowed",
            self.frames,
            self.walls / frames,
            self.planes / frames,
            self.sprites_drawn / frames,
            self.overflowed_frames
        );
        info!(
            "Sight: {} checks, {} rejected, {} nodes, {} lines, player seen on {} tics",
            sight.checks, sight.rejected, sight.nodes_visited, sight.lines_checked, self.seen_tics
        );
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let mut options: CLIOptions = argh::from_env();

    TermLogger::init(
        options.verbose.unwrap_or(log::LevelFilter::Info),
        simplelog::ConfigBuilder::default()
            .set_time_level(log::LevelFilter::Trace)
            .build(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let mut user_config = UserConfig::load();
    user_config.sync_cli(&mut options);
    if options.write_config {
        user_config.write();
    }

    let size = user_config.screen_size();
    let frames = options.frames.unwrap_or(user_config.frames);
    let extralight = options.extralight.unwrap_or(user_config.extralight);

    let pic_data = PicData::generate();
    let mut demo = Demo::new()?;
    let mut renderer = SoftwareRenderer::new(size, user_config.limits.into());
    let mut buffer = DrawBuffer::new(size.width() as usize, size.height() as usize);
    info!("Rendering {frames} frames at {size}");

    let mut timestep = TimeStep::new();
    let mut totals = RunTotals::default();
    for _ in 0..frames {
        let report = demo.tic();
        if report.seen_by > 0 {
            totals.seen_tics += 1;
        }
        if !report.moved {
            debug!(
                "Player held still on tic {}, now heading for waypoint {}",
                demo.level.level_time,
                demo.waypoint()
            );
        }

        let view = demo
            .player_view(extralight)
            .ok_or("the player was removed from the level")?;
        renderer.render_player_view(&view, &demo.level, &pic_data, &mut buffer);
        trace!("{}", renderer.stats());
        totals.add(renderer.stats());

        if let Some(fps) = timestep.frame_rate() {
            debug!("{fps}");
        }
    }

    info!("{}", timestep.summary());
    totals.log(&demo.sight);
    if demo.blocked_moves > 0 {
        debug!("Player was blocked {} times", demo.blocked_moves);
    }

    // the map shows the lines the walk has seen so far
    if options.automap {
        let mut automap = Automap::new();
        automap.show_things = true;
        let player = demo
            .level
            .mobjs
            .get(demo.player)
            .ok_or("the player was removed from the level")?;
        let lines = automap.draw(&demo.level, player, &mut buffer);
        debug!("Automap drew {lines} lines");
    }

    let output: PathBuf = options.output.into();
    buffer.save_ppm(&output)?;

    #[cfg(feature = "hprof")]
    coarse_prof::write(&mut std::io::stdout())?;
    Ok(())
}
