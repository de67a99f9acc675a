//! JSON-RPC worker driving a live component tree.
//!
//! Reads line-delimited JSON requests from stdin, dispatches them to a
//! [`wtree_cli::Session`], writes JSON responses to stdout.

use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use clap::Parser;
use serde::{Deserialize, Serialize};

use wtree_core::scene::SceneNode;
use wtree_core::Window;

#[derive(Parser)]
#[command(name = "wtree-worker", about = "Component tree IPC worker process")]
struct Args {
    /// Initial scene (JSON). If omitted, the built-in demo scene is used.
    #[arg(long)]
    scene: Option<String>,

    /// Tree configuration file (JSON)
    #[arg(long)]
    config: Option<String>,

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

    /// Verbose logging to stderr (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Deserialize)]
struct Request {
    id: u64,
    method: String,
    #[serde(default)]
    params: serde_json::Value,
}

#[derive(Serialize)]
struct Response {
    id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn write_response(stdout: &mut impl Write, resp: &Response) {
    if let Ok(json) = serde_json::to_string(resp) {
        let _ = writeln!(stdout, "{json}");
    } else {
        let _ = writeln!(
            stdout,
            r#"{{"id":{},"error":"response serialization failed"}}"#,
            resp.id
        );
    }
    let _ = stdout.flush();
}

fn open_session(args: &Args) -> Result<wtree_cli::Session, wtree_core::TreeError> {
    let config = wtree_cli::load_config(args.config.as_deref(), args.threads, args.max_depth)?;
    let scene = match &args.scene {
        Some(path) => SceneNode::from_file(path)?,
        None => wtree_cli::demo_scene(args.width, args.height),
    };
    wtree_cli::Session::new(&config, &scene, Window::headless(args.width, args.height))
}

fn main() -> ExitCode {
    let args = Args::parse();
    wtree_cli::init_logging(args.verbose);

    let session = match open_session(&args) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("wtree-worker: {e}");
            return ExitCode::FAILURE;
        }
    };
    log::info!("wtree-worker: ready");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                log::warn!("stdin read error: {e}");
                break;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        let req: Request = match serde_json::from_str(&line) {
            Ok(r) => r,
            Err(e) => {
                // No id to echo back.
                write_response(
                    &mut stdout,
                    &Response {
                        id: 0,
                        result: None,
                        error: Some(format!("invalid JSON: {e}")),
                    },
                );
                continue;
            }
        };

        log::debug!("request {} {}", req.id, req.method);
        let resp = match session.dispatch(&req.method, &req.params) {
            Ok(result) => Response {
                id: req.id,
                result: Some(result),
                error: None,
            },
            Err(error) => Response {
                id: req.id,
                result: None,
                error: Some(error),
            },
        };
        write_response(&mut stdout, &resp);
    }

    session.close();
    ExitCode::SUCCESS
}
