use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "shadewatch",
    author,
    version,
    about = "Live-reload runner for ShaderToy-style multi-pass GLSL shaders"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Watch a shader and its passes, recompiling on every change.
    Watch(WatchArgs),
    /// Compile a shader once and report diagnostics.
    Check(CheckArgs),
    /// Print the resolved state file location and its contents.
    Where,
}

#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Workspace root used for `@/` paths; defaults to the shader's directory.
    #[arg(long, value_name = "DIR", env = "SHADEWATCH_WORKSPACE")]
    pub workspace: Option<PathBuf>,

    /// Print outbound messages as JSON lines instead of log output.
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct WatchArgs {
    /// Shader to watch; defaults to the last watched shader.
    #[arg(value_name = "SHADER")]
    pub shader: Option<PathBuf>,

    #[command(flatten)]
    pub target: TargetArgs,

    /// Lock to SHADER once it compiled; other shaders are then ignored.
    #[arg(long)]
    pub lock: bool,

    /// Enable debug mode and inspect this 0-based line of SHADER.
    #[arg(long, value_name = "LINE")]
    pub debug_line: Option<usize>,

    /// Loop iteration to inspect while debugging.
    #[arg(long, value_name = "N", default_value_t = 0)]
    pub debug_iteration: usize,

    /// Frame rate of the headless render loop (0 disables it).
    #[arg(long, value_name = "FPS", env = "SHADEWATCH_FPS", default_value_t = 30.0)]
    pub fps: f32,

    /// Window in which identical outbound messages are suppressed.
    #[arg(
        long,
        value_name = "MILLISECONDS",
        env = "SHADEWATCH_DEBOUNCE_MS",
        default_value_t = 250
    )]
    pub debounce_ms: u64,

    /// Render target size (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_target_size, default_value = "1280x720")]
    pub size: (u32, u32),
}

#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    #[arg(value_name = "SHADER")]
    pub shader: PathBuf,

    #[command(flatten)]
    pub target: TargetArgs,
}

pub fn parse() -> Cli {
    Cli::parse()
}

/// Largest edge accepted for a render target.
const MAX_TARGET_EDGE: u32 = 16_384;

/// Parses `WIDTHxHEIGHT` into a render target size.
pub fn parse_target_size(value: &str) -> Result<(u32, u32), String> {
    let edge = |part: &str, what: &str| -> Result<u32, String> {
        match part.trim().parse::<u32>() {
            Ok(0) => Err(format!("{what} must be at least 1 pixel")),
            Ok(edge) if edge > MAX_TARGET_EDGE => {
                Err(format!("{what} {edge} exceeds {MAX_TARGET_EDGE} pixels"))
            }
            Ok(edge) => Ok(edge),
            Err(_) => Err(format!("{what} '{}' is not a number", part.trim())),
        }
    };
    let (width, height) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("'{value}' is not WIDTHxHEIGHT"))?;
    Ok((edge(width, "width")?, edge(height, "height")?))
}
