use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use facematch::response::{DetectResponse, EncodeResponse, RecognizeResponse};
use facematch::{config, Service};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "facematch")]
#[command(
    version,
    about = "Face encoding and matching from raw pixel intensities"
)]
struct Cli {
    /// Config file (defaults to FACEMATCH_CONFIG_PATH)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode the most prominent face in an image
    Encode {
        /// Image file (JPEG, PNG, ...)
        image: PathBuf,
    },
    /// Match the face in an image against known encodings
    Recognize {
        /// Image file (JPEG, PNG, ...)
        image: PathBuf,
        /// JSON array of known encodings, or `-` for stdin
        #[arg(short, long)]
        known: PathBuf,
    },
    /// List every detected face region
    Detect {
        /// Image file (JPEG, PNG, ...)
        image: PathBuf,
    },
    /// Print the effective configuration
    Config,
}

fn main() -> Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .format_target(false)
        .format_timestamp(None)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(cli.config.as_deref())?;

    if let Commands::Config = cli.command {
        print!("{}", toml::to_string_pretty(&cfg)?);
        return Ok(());
    }

    let service = Service::from_config(&cfg)
        .context("Failed to initialize face matching service")?;

    match cli.command {
        Commands::Encode { image } => {
            let bytes = read_image(&image)?;
            print_json(&EncodeResponse::from_outcome(service.encode(&bytes))?)
        }
        Commands::Recognize { image, known } => {
            let known = read_known(&known)?;
            let bytes = read_image(&image)?;
            print_json(&RecognizeResponse::from_outcome(
                service.recognize_json(&bytes, &known),
            )?)
        }
        Commands::Detect { image } => {
            let bytes = read_image(&image)?;
            print_json(&DetectResponse::from_outcome(service.detect(&bytes))?)
        }
        Commands::Config => Ok(()),
    }
}

fn read_image(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("reading image {}", path.display()))
}

/// Raw bytes; the payload is validated by `recognize_json`.
fn read_known(path: &Path) -> Result<Vec<u8>> {
    if path == Path::new("-") {
        let mut raw = Vec::new();
        std::io::stdin()
            .read_to_end(&mut raw)
            .context("reading known encodings from stdin")?;
        return Ok(raw);
    }
    std::fs::read(path).with_context(|| format!("reading known encodings {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
