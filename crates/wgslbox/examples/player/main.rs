//! Desktop player for wgslbox games
//!
//! Opens a game (a bare `.wgsl` file, a directory with `main.wgsl`, or a
//! zip archive), loads it onto the default GPU adapter and runs the frame
//! loop in a winit window.
//!
//! # Usage
//! ```bash
//! cargo run --example player -- games/bob/main.wgsl
//! ```
//!
//! Keyboard: the game sees every key through `@engine.keys`; the player
//! itself reserves Escape (quit) and Ctrl+R (reload the game from disk).

use clap::Parser;
use winit::event_loop::EventLoop;

mod app;

use app::PlayerApp;

/// Command-line arguments for the player
#[derive(Parser)]
#[command(version, about = "Desktop player for single-file WGSL games")]
struct Args {
    /// Game to run: a .wgsl file, a directory containing main.wgsl, or a .zip
    game: std::path::PathBuf,

    /// Log at debug verbosity
    #[arg(long)]
    verbose: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let level = if args.verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    let subscriber = tracing_subscriber::fmt().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let event_loop = EventLoop::new()?;
    let mut player = PlayerApp::new(args.game);
    event_loop.run_app(&mut player)?;

    Ok(())
}
