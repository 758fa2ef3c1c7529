#![deny(unsafe_code)]
//! Headless host for the starfield.
//!
//! Subcommands:
//! - `simulate`: run N frames against a recording surface, print a summary
//! - `render`: run N frames in software, write the last frame as PNG
//! - `list`: print palettes and the default configuration

mod error;
mod script;

use clap::{Args, Parser, Subcommand};
use error::CliError;
use script::{play, RunSummary, Script};
use starfield_core::{
    Field, FieldConfig, FixedContainer, FixedRateTicker, Palette, RecordingSurface, Srgb, Surface,
};
use starfield_raster::PixelSurface;
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser)]
#[command(name = "starfield", about = "Interactive starfield, headless")]
struct Cli {
    /// Output as JSON instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct RunArgs {
    /// Container width in pixels.
    #[arg(short = 'W', long, default_value_t = 1280.0)]
    width: f64,

    /// Container height in pixels.
    #[arg(short = 'H', long, default_value_t = 480.0)]
    height: f64,

    /// Number of frames to run.
    #[arg(short, long, default_value_t = 600)]
    frames: u64,

    /// PRNG seed for deterministic output.
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Palette name (twilight, ember, aurora, mono). Overrides --params.
    #[arg(short, long)]
    palette: Option<String>,

    /// Field parameters as a JSON string.
    #[arg(long, default_value = "{}")]
    params: String,

    /// JSON event script: move / leave / click / resize keyed by frame.
    #[arg(short, long)]
    events: Option<PathBuf>,

    /// Pace frames at the configured target_fps instead of running flat out.
    #[arg(long)]
    realtime: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Run the field against a recording surface and summarize the result.
    Simulate(RunArgs),
    /// Run the field in software and write the last frame as a PNG.
    Render {
        #[command(flatten)]
        run: RunArgs,

        /// Output file path.
        #[arg(short, long, default_value = "starfield.png")]
        output: PathBuf,

        /// Background color as hex. Omit for a transparent PNG.
        #[arg(short, long)]
        background: Option<String>,
    },
    /// List palettes and the default field configuration.
    List,
}

impl RunArgs {
    fn config(&self) -> Result<FieldConfig, CliError> {
        let mut params: serde_json::Value = serde_json::from_str(&self.params)
            .map_err(|e| CliError::Input(format!("invalid --params JSON: {e}")))?;
        if !params.is_object() {
            return Err(CliError::Input("--params must be a JSON object".into()));
        }
        if let Some(name) = &self.palette {
            params["palette"] = serde_json::Value::from(name.as_str());
        }
        Ok(FieldConfig::from_json_validated(&params)?)
    }

    fn script(&self) -> Result<Script, CliError> {
        let Some(path) = &self.events else {
            return Ok(Script::default());
        };
        let text = std::fs::read_to_string(path)
            .map_err(|e| CliError::Io(format!("reading {}: {e}", path.display())))?;
        Script::from_json_str(&text)
            .map_err(|e| CliError::Input(format!("invalid event script {}: {e}", path.display())))
    }

    fn ticker(&self, config: &FieldConfig) -> Result<FixedRateTicker, CliError> {
        let ticker = if self.realtime {
            FixedRateTicker::new(config.target_fps)?
        } else {
            FixedRateTicker::unpaced()
        };
        Ok(ticker.with_frame_limit(self.frames))
    }

    fn field<S: Surface>(
        &self,
        config: FieldConfig,
        surface: S,
    ) -> Result<Field<FixedContainer, S>, CliError> {
        let container = FixedContainer::new(self.width, self.height);
        Ok(Field::initialize(
            Some(container),
            Some(surface),
            config,
            self.seed,
        )?)
    }
}

fn simulate(args: &RunArgs) -> Result<RunSummary, CliError> {
    let config = args.config()?;
    let script = args.script()?;
    let ticker = args.ticker(&config)?;
    let mut field = args.field(config, RecordingSurface::new())?;
    let playback = play(&mut field, &script, &ticker, |surface| {
        surface.take_commands();
    });
    let commands = field.surface().commands().len();
    Ok(RunSummary::new(&field, playback).with_draw_commands(commands))
}

fn render(args: &RunArgs, output: &Path, background: Option<Srgb>) -> Result<RunSummary, CliError> {
    let config = args.config()?;
    let script = args.script()?;
    let ticker = args.ticker(&config)?;
    PixelSurface::checked_size(args.width, args.height)?;
    let mut field = args.field(config, PixelSurface::default())?;
    let playback = play(&mut field, &script, &ticker, |_| {});
    starfield_raster::snapshot::write_png(field.surface(), background, output)?;
    Ok(RunSummary::new(&field, playback))
}

fn print_summary(summary: &RunSummary, json: bool) -> Result<(), CliError> {
    if json {
        println!("{}", serde_json::to_string_pretty(summary)?);
        return Ok(());
    }
    println!(
        "{} frames, {} particles over {}x{}",
        summary.frames, summary.particles, summary.width, summary.height
    );
    println!(
        "events: {} ({} particles kicked)",
        summary.events, summary.kicked
    );
    println!(
        "mean speed {:.4}, mean offset from rest {:.4}",
        summary.mean_speed, summary.mean_offset
    );
    match summary.pointer {
        Some([x, y]) => println!("pointer at ({x}, {y})"),
        None => println!("pointer absent"),
    }
    if let Some(count) = summary.draw_commands {
        println!("draw commands in last frame: {count}");
    }
    Ok(())
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::List => {
            let palettes = Palette::list_names();
            let defaults = FieldConfig::default().to_json();
            if cli.json {
                let info = serde_json::json!({
                    "palettes": palettes,
                    "defaults": defaults,
                    "schema": FieldConfig::schema(),
                });
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                println!("Palettes:");
                println!("  {}", palettes.join(", "));
                println!("Defaults:");
                if let Some(map) = defaults.as_object() {
                    for (key, value) in map {
                        println!("  {key} = {value}");
                    }
                }
            }
        }
        Command::Simulate(args) => {
            let summary = simulate(&args)?;
            print_summary(&summary, cli.json)?;
        }
        Command::Render {
            run,
            output,
            background,
        } => {
            let background = background
                .as_deref()
                .map(Srgb::from_hex)
                .transpose()
                .map_err(|e| CliError::Input(e.to_string()))?;
            let summary = render(&run, &output, background)?;
            if cli.json {
                let mut info = serde_json::to_value(&summary)?;
                info["output"] = serde_json::Value::from(output.display().to_string());
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                eprintln!(
                    "rendered {} frames ({}x{}, seed {}) -> {}",
                    summary.frames,
                    run.width,
                    run.height,
                    run.seed,
                    output.display()
                );
            }
        }
    }

    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let json_mode = cli.json;
    if let Err(e) = run(cli) {
        log::debug!("exiting with {e:?}");
        if json_mode {
            let j = serde_json::json!({"error": e.to_string(), "exit_code": e.exit_code()});
            eprintln!("{}", serde_json::to_string_pretty(&j).unwrap_or_default());
        } else {
            eprintln!("error: {e}");
        }
        process::exit(e.exit_code());
    }
}
