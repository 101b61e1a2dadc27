// pixie-crop/src/cli.rs
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "pixie-crop", version, about = "Crop, rotate, flip and re-encode images")]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Directory holding staged uploads and crop results
    #[arg(long, global = true, default_value = "staging")]
    pub staging_dir: PathBuf,

    /// Worker threads for image processing (0 = one per core)
    #[arg(long, global = true, default_value_t = 0)]
    pub threads: usize,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Stage an image and print its asset reference and dimensions
    Upload {
        input: PathBuf,

        /// Declared content type; guessed from the extension if omitted
        #[arg(long)]
        content_type: Option<String>,
    },

    /// Print dimensions, format and size of a staged asset
    Info { asset: String },

    /// Crop a staged asset
    Crop {
        asset: String,

        #[arg(short, long, default_value_t = 0, allow_negative_numbers = true)]
        x: i64,

        #[arg(short, long, default_value_t = 0, allow_negative_numbers = true)]
        y: i64,

        /// Crop width in --unit; defaults to the preset's width when --preset is given
        #[arg(long)]
        width: Option<f64>,

        /// Crop height in --unit; defaults to the preset's height when --preset is given
        #[arg(long)]
        height: Option<f64>,

        /// px, mm, cm or in
        #[arg(short, long, default_value = "px")]
        unit: String,

        #[arg(long)]
        dpi: Option<f64>,

        /// Fill size and unit from a named preset (see `presets`)
        #[arg(long)]
        preset: Option<String>,

        /// Clockwise rotation: 0, 90, 180 or 270
        #[arg(short, long, default_value_t = 0)]
        rotation: i32,

        #[arg(long)]
        flip_horizontal: bool,

        #[arg(long)]
        flip_vertical: bool,

        /// jpeg, png or webp
        #[arg(short, long, default_value = "jpeg")]
        format: String,

        /// Output quality for jpeg and webp (1-100)
        #[arg(short, long, default_value_t = 85, allow_negative_numbers = true)]
        quality: i32,

        /// Keep the aspect ratio while adjusting the selection (front-end hint)
        #[arg(long)]
        aspect_lock: bool,

        /// Write the result here instead of staging it
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List named crop presets
    Presets,

    /// Purge staged files older than the retention period
    Cleanup {
        /// Retention in hours; defaults to the configured retention
        #[arg(long)]
        max_age_hours: Option<u64>,
    },

    /// Copy a staged asset out of the staging area
    Download {
        asset: String,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Converts an hour count to a duration, saturating instead of overflowing.
pub fn hours(hours: u64) -> Duration {
    Duration::from_secs(hours.saturating_mul(60 * 60))
}
