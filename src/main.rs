//! Console shell around the render pipeline: argument parsing, palette
//! loading, and a small command loop standing in for the original's
//! systray menu.

use std::io::{self, BufRead, Write};

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use log::info;

use spectrum_led::cli::Args;
use spectrum_led::{PaletteSet, PipelineController, TerminalSink};
use spectrum_led::{AnalyzerConfig, RenderParams};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let palettes = match &args.palettes {
        Some(path) => PaletteSet::load(path, args.rows)
            .with_context(|| format!("reading palette file {}", path.display()))?,
        None => PaletteSet::builtin(),
    };

    if args.list_palettes {
        for name in palettes.names() {
            println!("{}", name);
        }
        return Ok(());
    }

    let ramp = palettes
        .get(&args.palette)
        .ok_or_else(|| anyhow!("unknown palette {:?} (try --list-palettes)", args.palette))?
        .clone();

    let sink = Box::new(TerminalSink::new(args.rows, args.cols));
    let mut pipeline = PipelineController::new(
        sink,
        ramp,
        args.parse_tick_rate(),
        AnalyzerConfig::default(),
        RenderParams::default(),
    )?;

    pipeline.set_enabled(true).context("enabling pipeline")?;
    info!("Capturing. Commands: t=toggle, p <name>=palette, r <rate>=rate, q=quit");

    command_loop(&mut pipeline, &palettes)?;

    pipeline.set_enabled(false)?;
    Ok(())
}

/// Read commands from stdin until quit or EOF
fn command_loop(pipeline: &mut PipelineController, palettes: &PaletteSet) -> Result<()> {
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        let line = line.trim();
        let (cmd, arg) = line.split_once(' ').unwrap_or((line, ""));

        match cmd {
            "" => {}
            "q" => break,
            "t" => {
                let enable = !pipeline.is_enabled();
                pipeline.set_enabled(enable)?;
                println!("{}", if enable { "enabled" } else { "disabled" });
            }
            "p" => match palettes.get(arg.trim()) {
                Some(ramp) => pipeline.set_palette(ramp.clone())?,
                None => println!("unknown palette {:?}", arg.trim()),
            },
            "l" => {
                for name in palettes.names() {
                    println!("{}", name);
                }
            }
            "r" => match spectrum_led::cli::parse_rate(arg.trim()) {
                Some(rate) => pipeline.set_tick_rate(rate),
                None => println!("unknown rate {:?} (8/16/30/60 or e.g. 40ms)", arg.trim()),
            },
            other => {
                println!("unknown command {:?}", other);
                io::stdout().flush()?;
            }
        }
    }
    Ok(())
}
