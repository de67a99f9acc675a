//! Run a component scene headlessly and dump the result as JSON.

use std::process::ExitCode;

use clap::Parser;

use wtree_core::factory::ComponentFactory;
use wtree_core::scene::SceneNode;
use wtree_core::{ComponentTree, Window};

#[derive(Parser)]
#[command(name = "wtree-scene", about = "Build a component tree from a scene and run it")]
struct Args {
    /// Scene description (JSON). If omitted, the built-in demo scene is used.
    #[arg(long)]
    scene: Option<String>,

    /// Tree configuration file (JSON)
    #[arg(long)]
    config: Option<String>,

    /// Number of update+draw frames to run
    #[arg(long, default_value = "1", value_parser = clap::value_parser!(u32).range(1..))]
    frames: u32,

    /// Event (or JSON array of events) to dispatch after the first update
    #[arg(long)]
    events: Option<String>,

    /// Include the last frame's draw commands in the output
    #[arg(long)]
    draw: bool,

    /// Dedicated worker threads (overrides the config file)
    #[arg(long)]
    threads: Option<usize>,

    /// Maximum node depth (overrides the config file)
    #[arg(long)]
    max_depth: Option<usize>,

    /// Window width
    #[arg(long, default_value = "640")]
    width: f32,

    /// Window height
    #[arg(long, default_value = "480")]
    height: f32,

    /// Compact JSON output (no pretty-printing)
    #[arg(long)]
    compact: bool,

    /// Verbose logging to stderr (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn run(args: &Args) -> Result<String, wtree_core::TreeError> {
    let config = wtree_cli::load_config(args.config.as_deref(), args.threads, args.max_depth)?;
    let scene = match &args.scene {
        Some(path) => SceneNode::from_file(path)?,
        None => wtree_cli::demo_scene(args.width, args.height),
    };
    let events = match &args.events {
        Some(json) => wtree_cli::parse_events(json)?,
        None => Vec::new(),
    };

    let window = Window::headless(args.width, args.height);
    let factory = ComponentFactory::with_builtin_widgets();
    let tree = ComponentTree::from_scene(&config, &factory, &window, &scene)?;
    let report = wtree_cli::run_frames(&tree, args.frames, &events, args.draw);
    tree.close();

    let json = if args.compact {
        serde_json::to_string(&report)?
    } else {
        serde_json::to_string_pretty(&report)?
    };
    Ok(json)
}

fn main() -> ExitCode {
    let args = Args::parse();
    wtree_cli::init_logging(args.verbose);

    match run(&args) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("wtree-scene: {e}");
            ExitCode::FAILURE
        }
    }
}
