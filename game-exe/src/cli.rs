use argh::FromArgs;
use gameplay::log;
use render_soft::ScreenSize;

/// Render a walk through the demo level with the 3DO software renderer
#[derive(Debug, Clone, FromArgs)]
pub struct CLIOptions {
    /// verbose level: off, error, warn, info, debug, trace
    #[argh(option)]
    pub verbose: Option<log::LevelFilter>,
    /// number of logic tics to run, one frame is rendered per tic
    #[argh(option)]
    pub frames: Option<u32>,
    /// screen size: 280x160, 256x144, 224x128, 192x112, 160x96 or 128x80
    #[argh(option)]
    pub size: Option<ScreenSize>,
    /// extra light added to every wall and flat
    #[argh(option)]
    pub extralight: Option<u32>,
    /// where to write the last frame as a PPM image
    #[argh(option, default = "String::from(\"doom3do.ppm\")")]
    pub output: String,
    /// draw the automap instead of the player view
    #[argh(switch)]
    pub automap: bool,
    /// save the options given on the command line as the new defaults
    #[argh(switch)]
    pub write_config: bool,
}
