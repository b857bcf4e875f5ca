//! IconForge CLI - Compose and Inspect Icons
//!
//! Commands: compose, inspect, config
//! Outputs JSON to stdout, logs to stderr (RUST_LOG)
//! Returns 2 when composition or encoding fails

use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use iconforge_core::{
    encode_ico, ico_filename, Compositor, CropRegion, IconForgeConfig, LabelText, SourceImage,
};

#[derive(Parser)]
#[command(name = "iconforge-cli")]
#[command(about = "IconForge CLI - square icons with short captions")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a JSON config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Crop, caption and export an .ico
    Compose {
        /// Source image
        #[arg(short, long)]
        input: PathBuf,

        /// Crop region as x,y,width,height (defaults to the centered square)
        #[arg(long)]
        crop: Option<CropRegion>,

        /// Caption, at most three characters
        #[arg(short, long, default_value = "")]
        label: String,

        /// Output .ico path (defaults to <prefix>-<label>.ico)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also write the PNG artifact here
        #[arg(long)]
        png: Option<PathBuf>,
    },

    /// Read an .ico and list its entries
    Inspect {
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Print the effective configuration
    Config,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match IconForgeConfig::load_or_default(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            print_error(&e.to_string());
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Commands::Compose { input, crop, label, output, png } => {
            compose(&config, &input, crop, &label, output, png)
        }
        Commands::Inspect { input } => inspect(&input),
        Commands::Config => print_json(&config),
    }
}

fn compose(
    config: &IconForgeConfig,
    input: &Path,
    crop: Option<CropRegion>,
    label: &str,
    output: Option<PathBuf>,
    png_path: Option<PathBuf>,
) -> ExitCode {
    let bytes = match fs::read(input) {
        Ok(b) => b,
        Err(e) => {
            print_error(&format!("Failed to read {}: {}", input.display(), e));
            return ExitCode::FAILURE;
        }
    };

    let source = match SourceImage::decode(&bytes) {
        Ok(s) => s,
        Err(e) => {
            print_error(&e.to_string());
            return ExitCode::from(2);
        }
    };

    let Some(crop) = crop.or_else(|| CropRegion::centered_square(source.width(), source.height()))
    else {
        print_error("Source image has no pixels");
        return ExitCode::from(2);
    };

    let label = LabelText::new(label);
    let compositor = Compositor::from_config(config);
    let artifact = match compositor.compose(&source, crop, &label, config.output_size) {
        Ok(a) => a,
        Err(e) => {
            print_error(&e.to_string());
            return ExitCode::from(2);
        }
    };

    let ico = match encode_ico(artifact.png_bytes()) {
        Ok(i) => i,
        Err(e) => {
            print_error(&e.to_string());
            return ExitCode::from(2);
        }
    };

    let output = output.unwrap_or_else(|| {
        PathBuf::from(ico_filename(
            &config.filename_prefix,
            label.as_str(),
            &config.default_label,
        ))
    });
    if let Err(e) = fs::write(&output, &ico) {
        print_error(&format!("Failed to write {}: {}", output.display(), e));
        return ExitCode::FAILURE;
    }
    if let Some(path) = &png_path {
        if let Err(e) = fs::write(path, artifact.png_bytes()) {
            print_error(&format!("Failed to write {}: {}", path.display(), e));
            return ExitCode::FAILURE;
        }
    }

    print_json(&serde_json::json!({
        "success": true,
        "output": output,
        "png": png_path,
        "crop": crop,
        "label": label,
        "captionFamily": compositor.labels().family(),
        "icoBytes": ico.len(),
        "artifact": artifact.summary(),
    }))
}

fn inspect(input: &Path) -> ExitCode {
    let file = match fs::File::open(input) {
        Ok(f) => f,
        Err(e) => {
            print_error(&format!("Failed to open {}: {}", input.display(), e));
            return ExitCode::FAILURE;
        }
    };

    let dir = match ico::IconDir::read(file) {
        Ok(d) => d,
        Err(e) => {
            print_error(&format!("Not a valid ICO file: {}", e));
            return ExitCode::from(2);
        }
    };

    let entries: Vec<_> = dir
        .entries()
        .iter()
        .map(|entry| serde_json::json!({
            "width": entry.width(),
            "height": entry.height(),
            "bitsPerPixel": entry.bits_per_pixel(),
            "png": entry.is_png(),
            "dataBytes": entry.data().len(),
        }))
        .collect();

    print_json(&serde_json::json!({
        "resourceType": format!("{:?}", dir.resource_type()).to_lowercase(),
        "entries": entries,
    }))
}

fn print_json<T: serde::Serialize>(value: &T) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(s) => {
            println!("{}", s);
            ExitCode::SUCCESS
        }
        Err(e) => {
            print_error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}

fn print_error(message: &str) {
    tracing::error!("{}", message);
    let output = serde_json::json!({
        "success": false,
        "error": message,
    });
    println!("{}", output);
}
