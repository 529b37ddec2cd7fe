mod error;
mod filesystem;
mod services;
mod settings;

use clap::{Parser, Subcommand};
use error::AppError;
use services::gallery_service;
use services::{save_capture, spawn_operation, CaptureRequest, IdSource};
use settings::{AppSettings, CaptureSettings};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use supabase_store::{LocationRecord, RemoteStore};

/// Field capture of GPS locations and photos, stored in Supabase
#[derive(Parser, Debug)]
#[command(name = "palmastour", version, about)]
struct Cli {
    /// Settings file (defaults to palmastour.toml in the app data directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Store backend URL and API key in the settings file
    Configure {
        #[arg(long)]
        url: String,
        #[arg(long)]
        api_key: String,
    },
    /// List all locations, newest first
    Locations,
    /// Show one location with its photos
    Location { id: String },
    /// Save a position and upload the photos taken there
    Capture {
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        #[arg(long, allow_negative_numbers = true)]
        lng: f64,
        #[arg(long)]
        name: Option<String>,
        /// Photo file, may be repeated
        #[arg(long = "photo")]
        photos: Vec<PathBuf>,
    },
    /// Rename a location
    Rename { id: String, name: String },
    /// Delete a location together with its photos
    DeleteLocation { id: String },
    /// Show one photo
    Photo { id: String },
    /// Change the description of a photo
    DescribePhoto { id: String, description: String },
    /// Delete a photo and its stored file
    DeletePhoto { id: String },
    /// Upload a file to storage and print its public URL
    Upload {
        file: PathBuf,
        bucket: String,
        path: String,
    },
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::Configure { .. } => "configure",
            Command::Locations => "list locations",
            Command::Location { .. } => "show location",
            Command::Capture { .. } => "capture",
            Command::Rename { .. } => "rename location",
            Command::DeleteLocation { .. } => "delete location",
            Command::Photo { .. } => "show photo",
            Command::DescribePhoto { .. } => "describe photo",
            Command::DeletePhoto { .. } => "delete photo",
            Command::Upload { .. } => "upload",
        }
    }
}

fn init_logging() {
    #[cfg(target_os = "android")]
    {
        android_logger::init_once(
            android_logger::Config::default()
                .with_max_level(log::LevelFilter::Info)
                .with_tag("palmastour"),
        );
    }

    #[cfg(not(target_os = "android"))]
    {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
            .init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(message) => {
            println!("{}", message);
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{}", e);
            eprintln!("{}", e.user_message());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<String, AppError> {
    let settings_path = cli.config.unwrap_or_else(filesystem::settings_path);

    if let Command::Configure { url, api_key } = cli.command {
        let mut settings = AppSettings::load(&settings_path)?;
        settings.backend.url = url;
        settings.backend.api_key = api_key;
        settings.to_remote_config()?.validate()?;
        settings.save(&settings_path)?;
        return Ok(format!("Settings saved to {}", settings_path.display()));
    }

    let settings = AppSettings::load_with_env(&settings_path)?;
    let config = settings.to_remote_config()?;
    log::info!(
        "Using backend {} (key {})",
        config.base_url,
        config.redacted_key()
    );
    let store = Arc::new(RemoteStore::new(config)?);

    let name = cli.command.name();
    spawn_operation(name, execute(store, settings.capture, cli.command))
        .outcome()
        .await
}

/// Runs one command against the backend and renders the notice to print
async fn execute(
    store: Arc<RemoteStore>,
    capture: CaptureSettings,
    command: Command,
) -> Result<String, AppError> {
    match command {
        Command::Configure { .. } => Err(AppError::Validation(
            "configure does not talk to the backend".to_string(),
        )),
        Command::Locations => {
            let summaries = gallery_service::list_locations(&store).await?;
            if summaries.is_empty() {
                return Ok("No locations yet.".to_string());
            }
            Ok(summaries
                .iter()
                .map(|s| {
                    format!(
                        "{}  {} ({}, {})  {} photo(s)  {}",
                        s.id, s.name, s.latitude, s.longitude, s.photo_count, s.created_at
                    )
                })
                .collect::<Vec<_>>()
                .join("\n"))
        }
        Command::Location { id } => {
            let location = gallery_service::show_location(&store, &id).await?;
            Ok(render_location(&location))
        }
        Command::Capture {
            lat,
            lng,
            name,
            photos,
        } => {
            let request = CaptureRequest {
                latitude: lat,
                longitude: lng,
                name,
                photo_paths: photos,
            };
            let report = save_capture(&store, &capture, request).await?;
            let mut lines = vec![report.summary()];
            lines.push(format!("Location id: {}", report.location_id));
            if report.id_source == IdSource::LocalFallback {
                lines.push("(id could not be confirmed by the server)".to_string());
            }
            for path in &report.missing_files {
                lines.push(format!("Missing: {}", path.display()));
            }
            for (path, reason) in &report.failed_files {
                lines.push(format!("Failed: {} ({})", path.display(), reason));
            }
            Ok(lines.join("\n"))
        }
        Command::Rename { id, name } => {
            let location = gallery_service::rename_location(&store, &id, &name).await?;
            Ok(format!("Location renamed to '{}'.", location.name))
        }
        Command::DeleteLocation { id } => {
            let report = gallery_service::delete_location(&store, &id).await?;
            if report.is_complete() {
                Ok(format!(
                    "Location deleted with {} photo(s).",
                    report.photos_deleted
                ))
            } else if !report.children_listed {
                Ok("Location deleted, its photos could not be checked.".to_string())
            } else {
                Ok(format!(
                    "Location deleted, {} of {} photos could not be removed.",
                    report.failed_photo_ids.len(),
                    report.photos_found
                ))
            }
        }
        Command::Photo { id } => {
            let photo = gallery_service::show_photo(&store, &id).await?;
            Ok(format!(
                "{}  {}  {}  {}",
                photo.id,
                photo.created_at_string(),
                photo.description.as_deref().unwrap_or("-"),
                photo.storage_url.as_deref().unwrap_or("(not uploaded)")
            ))
        }
        Command::DescribePhoto { id, description } => {
            gallery_service::describe_photo(&store, &id, &description).await?;
            Ok("Description saved.".to_string())
        }
        Command::DeletePhoto { id } => {
            gallery_service::delete_photo(&store, &id).await?;
            Ok("Photo deleted.".to_string())
        }
        Command::Upload { file, bucket, path } => Ok(store.upload(&file, &bucket, &path).await?),
    }
}

fn render_location(location: &LocationRecord) -> String {
    let mut lines = vec![
        location.to_string(),
        format!("id: {}", location.id),
        format!("created: {}", location.created_at_string()),
        format!("{} photo(s)", location.photos.len()),
    ];
    for photo in &location.photos {
        lines.push(format!(
            "  {}  {}",
            photo.id,
            photo.storage_url.as_deref().unwrap_or("(not uploaded)")
        ));
    }
    lines.join("\n")
}
