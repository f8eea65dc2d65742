//! User configuration options.

use crate::{BASE_DIR, CLIOptions};
use dirs::config_dir;
use gameplay::log::{error, info, warn};
use nanoserde::{DeRon, SerRon};
use render_soft::{FrameLimits, ScreenSize};
use std::fs::{File, create_dir_all};
use std::io::{self, Read, Write};
use std::path::PathBuf;

const LOG_TAG: &str = "UserConfig";
const CFG_FILE: &str = "user.cfg";

fn get_cfg_file() -> io::Result<PathBuf> {
    let mut dir = config_dir().ok_or_else(|| {
        io::Error::new(io::ErrorKind::NotFound, "couldn't find the user config dir")
    })?;
    dir.push(BASE_DIR);
    if !dir.exists() {
        create_dir_all(&dir)?;
    }
    dir.push(CFG_FILE);
    Ok(dir)
}

/// Renderer capacities as stored on disk
#[derive(Debug, Clone, Copy, PartialEq, DeRon, SerRon)]
pub struct LimitsConfig {
    pub max_walls: usize,
    pub max_planes: usize,
    pub max_sprites: usize,
    pub max_segs: usize,
    pub max_openings: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        FrameLimits::default().into()
    }
}

impl From<FrameLimits> for LimitsConfig {
    fn from(l: FrameLimits) -> Self {
        Self {
            max_walls: l.max_walls,
            max_planes: l.max_planes,
            max_sprites: l.max_sprites,
            max_segs: l.max_segs,
            max_openings: l.max_openings,
        }
    }
}

impl From<LimitsConfig> for FrameLimits {
    fn from(l: LimitsConfig) -> Self {
        FrameLimits {
            max_walls: l.max_walls,
            max_planes: l.max_planes,
            max_sprites: l.max_sprites,
            max_segs: l.max_segs,
            max_openings: l.max_openings,
            ..FrameLimits::default()
        }
        .sanitised()
    }
}

#[derive(Debug, Clone, PartialEq, DeRon, SerRon)]
pub struct UserConfig {
    /// Index into the six screen sizes, 0 is the largest
    pub screen_size: usize,
    pub frames: u32,
    pub extralight: u32,
    pub limits: LimitsConfig,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            screen_size: ScreenSize::default().index(),
            frames: 140,
            extralight: 0,
            limits: LimitsConfig::default(),
        }
    }
}

impl UserConfig {
    /// Read the config, falling back to defaults if it is missing or
    /// unreadable
    pub fn load() -> Self {
        match Self::read() {
            Ok(Some(config)) => {
                info!(target: LOG_TAG, "Loaded user config file");
                config
            }
            Ok(None) => {
                info!(target: LOG_TAG, "No user config, using defaults");
                UserConfig::default()
            }
            Err(e) => {
                warn!(target: LOG_TAG, "Could not read user config, using defaults: {e}");
                UserConfig::default()
            }
        }
    }

    fn read() -> io::Result<Option<Self>> {
        let path = get_cfg_file()?;
        if !path.exists() {
            return Ok(None);
        }
        let mut buf = String::new();
        File::open(&path)?.read_to_string(&mut buf)?;
        UserConfig::deserialize_ron(&buf)
            .map(Some)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("{path:?}: {e}")))
    }

    pub fn write(&self) {
        let res = get_cfg_file().and_then(|path| {
            let mut file = File::create(&path)?;
            file.write_all(self.serialize_ron().as_bytes())?;
            Ok(path)
        });
        match res {
            Ok(path) => info!(target: LOG_TAG, "Saved user config to {path:?}"),
            Err(e) => error!(target: LOG_TAG, "Could not write config: {e}"),
        }
    }

    pub fn screen_size(&self) -> ScreenSize {
        ScreenSize::from_index(self.screen_size).unwrap_or_default()
    }

    /// Sync the CLI options and UserConfig with each other. Options given on
    /// the command line win.
    pub fn sync_cli(&mut self, cli: &mut CLIOptions) {
        info!(target: LOG_TAG, "Checking CLI options");

        if let Some(size) = cli.size {
            if size.index() != self.screen_size {
                self.screen_size = size.index();
                info!(target: LOG_TAG, "Screen size changed to: {size}");
            }
        } else {
            cli.size = Some(self.screen_size());
        }

        if let Some(frames) = cli.frames {
            self.frames = frames;
        } else {
            cli.frames = Some(self.frames);
        }

        if let Some(light) = cli.extralight {
            self.extralight = light;
        } else {
            cli.extralight = Some(self.extralight);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ron_round_trip_keeps_limits() {
        let mut config = UserConfig::default();
        config.limits.max_sprites = 32;
        config.screen_size = 4;
        let text = config.serialize_ron();
        let back = UserConfig::deserialize_ron(&text).unwrap();
        assert_eq!(back, config);
        assert_eq!(back.screen_size(), ScreenSize::Size160x96);
    }

    #[test]
    fn limits_are_sanitised_on_the_way_in() {
        let limits = LimitsConfig {
            max_sprites: 1000,
            ..LimitsConfig::default()
        };
        let limits: FrameLimits = limits.into();
        assert_eq!(limits.max_sprites, FrameLimits::MAXVISSPRITES);
    }

    #[test]
    fn cli_overrides_config() {
        let mut config = UserConfig::default();
        let mut cli = CLIOptions {
            verbose: None,
            frames: Some(3),
            size: None,
            extralight: None,
            output: String::new(),
            automap: false,
            write_config: false,
        };
        config.sync_cli(&mut cli);
        assert_eq!(config.frames, 3);
        assert_eq!(cli.size, Some(config.screen_size()));
        assert_eq!(cli.extralight, Some(0));
    }

    #[test]
    fn bad_size_index_falls_back() {
        let config = UserConfig {
            screen_size: 99,
            ..UserConfig::default()
        };
        assert_eq!(config.screen_size(), ScreenSize::default());
    }
}
