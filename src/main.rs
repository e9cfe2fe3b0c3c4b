//! patchcheck - automated send/receive checks for an embedded patch engine
//!
//! Runs headless against the loopback engine. See `--help` for options.

use bevy::log::LogPlugin;
use bevy::prelude::*;
use std::process::ExitCode;
use std::thread;

use patchcheck::{CliArgs, HarnessConfig, HarnessPlugin, HarnessSession, PendingCommands, cli};

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let cli = match CliArgs::parse(&args) {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("{}\n\n{}", e, cli::USAGE);
            return ExitCode::from(2);
        }
    };
    if cli.help {
        println!("{}", cli::USAGE);
        return ExitCode::SUCCESS;
    }

    let mut config = HarnessConfig::load_from(&cli.config_path);
    if let Some(dir) = &cli.results_dir {
        config.results_dir = dir.clone();
    }
    if cli.keep_running {
        config.exit_when_done = false;
    }
    let frame_interval = config.frame_interval();

    let mut app = App::new();
    app.add_plugins(MinimalPlugins)
        .add_plugins(LogPlugin::default())
        .add_plugins(HarnessPlugin { config })
        .insert_resource(PendingCommands(cli.queued_commands().into()));

    // Manual frame loop; the world is read back after exit
    let exit = loop {
        app.update();
        if let Some(exit) = app.should_exit() {
            break exit;
        }
        thread::sleep(frame_interval);
    };

    let session = app.world().resource::<HarnessSession>();
    let any_failed = session.outcomes().iter().any(|o| !o.passed());

    println!("\nResults");
    println!("=======");
    for outcome in session.outcomes() {
        println!("  {}", outcome.console_lines().join("\n  "));
    }
    if let Some(summary) = session.last_summary() {
        println!("\n{}", summary);
    }
    if let Some(path) = session.recorder().path() {
        println!("Results file: {}", path.display());
    }

    if any_failed || exit.is_error() {
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
