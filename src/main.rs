//! HudWarp - warping texture tool for AR head-up displays
//!
//! Loads the display configuration, feeds calibration documents through the
//! same ingestion path the compositor uses and prints or writes what the
//! warping shader consumes.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use hudwarp::calibration::CalibrationDocument;
use hudwarp::{WarpedOutput, WarpingConfig};

/// HudWarp - warping grids for AR head-up displays
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path (.toml, or legacy .json constants)
    #[arg(short, long, default_value = "warping.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the configuration and derived texture layout
    Info,

    /// Print the texture coordinate transform (ax, ay, cx, cy)
    Uv,

    /// Encode a calibration document into warping texture bytes
    Encode {
        /// Calibration document (JSON)
        #[arg(long)]
        calibration: PathBuf,

        /// Output file for the texture bytes
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Print the blend index and factor for an eye position
    Interpolate {
        /// Calibration document (JSON)
        #[arg(long)]
        calibration: PathBuf,

        /// Eye position in vehicle coordinates (meters)
        #[arg(long, num_args = 3, value_names = ["X", "Y", "Z"], allow_negative_numbers = true)]
        eye: Vec<f64>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();

    info!("HudWarp v{}", env!("CARGO_PKG_VERSION"));

    let config = WarpingConfig::load_or_create(&args.config)?;

    match args.command {
        Command::Info => {
            let texture = config.texture_size();
            println!("{}", toml::to_string_pretty(&config)?);
            println!(
                "texture: {}x{} texels, {} bytes",
                texture.x,
                texture.y,
                config.texture_byte_len()
            );
            println!("vertices: {}", config.vertex_count());
        }
        Command::Uv => {
            let uv = hudwarp::uv::uv_func(&config);
            println!("{} {} {} {}", uv.ax, uv.ay, uv.cx, uv.cy);
        }
        Command::Encode {
            calibration,
            output,
        } => {
            let warped = calibrated_output(config, &calibration)?;
            let data = warped
                .texture_data()
                .context("Calibration does not cover every matrix index")?;
            let size = warped.texture_size();

            std::fs::write(&output, &data)
                .with_context(|| format!("Failed to write texture to {:?}", output))?;
            info!(
                "Wrote {}x{} texture ({} bytes) to {:?}",
                size.x,
                size.y,
                data.len(),
                output
            );
        }
        Command::Interpolate { calibration, eye } => {
            let &[x, y, z] = eye.as_slice() else {
                bail!("--eye needs exactly three values");
            };
            let mut warped = calibrated_output(config, &calibration)?;
            if !warped.is_initialized() {
                bail!("Calibration does not cover every matrix index");
            }

            let head: Vec<u8> = [x as f32, y as f32, z as f32]
                .iter()
                .flat_map(|v| v.to_ne_bytes())
                .collect();
            warped.set_head_position(&head)?;

            let params = warped.render_params();
            println!("{}", serde_json::to_string_pretty(&params)?);
        }
    }

    Ok(())
}

/// Warped output with a calibration document applied
fn calibrated_output(config: WarpingConfig, path: &std::path::Path) -> Result<WarpedOutput> {
    let doc = CalibrationDocument::load(path)?;
    let mut warped = WarpedOutput::new(config);
    doc.apply(&mut warped)
        .with_context(|| format!("Rejected calibration in {:?}", path))?;
    Ok(warped)
}
