use anyhow::Context;
use clap::Parser;
use log::LevelFilter;
use pixie_crop::{
    format_file_size, guess_content_type, hours, Cli, Commands, CropRequest, CropService,
    CropperConfig, CropperError, PresetCatalog,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Serialize)]
struct CropResponse<'a> {
    asset_ref: Option<String>,
    path: Option<PathBuf>,
    mime_type: &'a str,
    filename: &'a str,
    width: u32,
    height: u32,
    size_bytes: usize,
}

#[derive(Serialize)]
struct CleanupResponse {
    purged: usize,
}

#[derive(Serialize)]
struct DownloadResponse<'a> {
    path: &'a Path,
    mime_type: &'a str,
    size_bytes: usize,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    message: String,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logger
    env_logger::Builder::new()
        .filter_level(if cli.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        })
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let response = match err.downcast_ref::<CropperError>() {
                Some(e) => ErrorResponse {
                    error: error_name(e),
                    message: e.to_string(),
                },
                None => ErrorResponse {
                    error: "io",
                    message: format!("{:#}", err),
                },
            };
            match serde_json::to_string_pretty(&response) {
                Ok(json) => eprintln!("{}", json),
                Err(_) => eprintln!("{}: {}", response.error, response.message),
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = CropperConfig {
        workers: cli.threads,
        ..CropperConfig::default().with_staging_dir(cli.staging_dir)
    };

    match cli.command {
        Commands::Presets => print_json(&PresetCatalog::new().list()),
        Commands::Upload { input, content_type } => {
            let service = CropService::new(config)?;
            process_upload(&service, &input, content_type)
        }
        Commands::Info { asset } => {
            let service = CropService::new(config)?;
            let info = service.info(&asset)?;
            log::info!("{}: {}", asset, format_file_size(info.size_bytes));
            print_json(&info)
        }
        Commands::Crop {
            asset,
            x,
            y,
            width,
            height,
            unit,
            dpi,
            preset,
            rotation,
            flip_horizontal,
            flip_vertical,
            format,
            quality,
            aspect_lock,
            output,
        } => {
            let mut request = CropRequest {
                asset_ref: asset,
                x,
                y,
                width: width.unwrap_or_default(),
                height: height.unwrap_or_default(),
                unit,
                dpi,
                rotation,
                flip_horizontal,
                flip_vertical,
                output_format: format,
                quality,
                aspect_lock,
            };

            if let Some(name) = preset {
                let preset = PresetCatalog::new().find(&name).ok_or_else(|| {
                    CropperError::InvalidParameter(format!("Unknown preset: {}", name))
                })?;
                request.unit = preset.unit.as_str().to_string();
                request.width = width.unwrap_or(f64::from(preset.width));
                request.height = height.unwrap_or(f64::from(preset.height));
            }

            let service = CropService::new(config)?;
            process_crop(&service, &request, output)
        }
        Commands::Cleanup { max_age_hours } => {
            let service = CropService::new(config)?;
            let purged = match max_age_hours {
                Some(max_age) => service.cleanup_older_than(hours(max_age)),
                None => service.cleanup(),
            };
            print_json(&CleanupResponse { purged })
        }
        Commands::Download { asset, output } => {
            let service = CropService::new(config)?;
            let file = service.download(&asset)?;
            let output_path = output.unwrap_or_else(|| PathBuf::from(&file.filename));
            std::fs::write(&output_path, &file.bytes)
                .with_context(|| format!("Failed to write {}", output_path.display()))?;
            print_json(&DownloadResponse {
                path: &output_path,
                mime_type: file.mime_type,
                size_bytes: file.bytes.len(),
            })
        }
    }
}

fn process_upload(
    service: &CropService,
    input: &Path,
    content_type: Option<String>,
) -> anyhow::Result<()> {
    let bytes = std::fs::read(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let content_type = content_type.unwrap_or_else(|| guess_content_type(input).to_string());
    let filename = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let info = service.upload(&bytes, &content_type, &filename)?;
    log::info!(
        "Uploaded {} as {} ({})",
        input.display(),
        info.asset_ref,
        format_file_size(info.size_bytes)
    );
    print_json(&info)
}

fn process_crop(
    service: &CropService,
    request: &CropRequest,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let (encoded, asset_ref, path) = match output {
        Some(path) => {
            let encoded = service.crop(request)?;
            std::fs::write(&path, &encoded.bytes)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            (encoded, None, Some(path))
        }
        None => {
            let (encoded, asset_ref) = service.crop_and_store(request)?;
            (encoded, Some(asset_ref.to_string()), None)
        }
    };

    print_json(&CropResponse {
        asset_ref,
        path,
        mime_type: encoded.mime_type,
        filename: &encoded.filename,
        width: encoded.width,
        height: encoded.height,
        size_bytes: encoded.bytes.len(),
    })
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn error_name(err: &CropperError) -> &'static str {
    match err {
        CropperError::InvalidType(_) => "invalid_type",
        CropperError::FileTooLarge { .. } => "file_too_large",
        CropperError::EmptyFile => "empty_file",
        CropperError::InvalidUnit(_) => "invalid_unit",
        CropperError::InvalidQuality(_) => "invalid_quality",
        CropperError::DegenerateCrop { .. } => "degenerate_crop",
        CropperError::NotFound(_) => "not_found",
        other => match other.kind() {
            pixie_crop::ErrorKind::Validation => "validation",
            pixie_crop::ErrorKind::NotFound => "not_found",
            pixie_crop::ErrorKind::Geometry => "geometry",
            pixie_crop::ErrorKind::Encode => "encode",
            pixie_crop::ErrorKind::Io => "io",
        },
    }
}
