use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use renderer::Viewport;

#[derive(Parser, Debug)]
#[command(
    name = "synthview",
    author,
    version,
    about = "Preview and check Visual Synth fragment shaders"
)]
pub struct Cli {
    /// Configuration file; defaults to `config.toml` in the user config directory.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the explicit-uniform GLSL a shader document compiles to.
    Transpile(TranspileArgs),
    /// Show the author, parameters and metadata problems of a shader document.
    Inspect(InspectArgs),
    /// Build a shader document against the headless backend and run a few frames.
    Check(CheckArgs),
}

#[derive(Args, Debug)]
pub struct TranspileArgs {
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Print the pass-through vertex stage instead of the fragment stage.
    #[arg(long)]
    pub vertex: bool,

    /// Write the result to a file instead of stdout.
    #[arg(long, short, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Emit a JSON report.
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Number of frames to render at a simulated 60 Hz.
    #[arg(long, value_name = "N", default_value_t = 60)]
    pub frames: u32,

    /// Viewport size (e.g. `1280x720`).
    #[arg(
        long,
        value_name = "WIDTHxHEIGHT",
        value_parser = parse_size,
        default_value = "640x480"
    )]
    pub size: Viewport,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_size(spec: &str) -> Result<Viewport, String> {
    let (width, height) = spec
        .trim()
        .split_once(['x', 'X'])
        .ok_or_else(|| "expected WxH format, e.g. 1920x1080".to_string())?;

    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| "invalid width in size specification".to_string())?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| "invalid height in size specification".to_string())?;

    if width == 0 || height == 0 {
        return Err("viewport dimensions must be greater than zero".to_string());
    }

    Ok(Viewport::new(width, height))
}
