use crate::error::AppError;
use crate::filesystem::partition_existing;
use crate::settings::{CaptureSettings, IdRecovery};
use std::path::PathBuf;
use std::time::Duration;
use supabase_store::{find_recent_match, LocationRecord, PhotoRecord, RemoteStore};

/// A position taken in the field plus the photos shot there
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureRequest {
    pub latitude: f64,
    pub longitude: f64,
    /// Defaults to a label built from the capture time
    pub name: Option<String>,
    pub photo_paths: Vec<PathBuf>,
}

/// Where the location id attached to the photos came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdSource {
    /// Newest stored location at the captured coordinates
    Scan,
    /// Re-fetch failed or nothing matched; the id generated before insert
    LocalFallback,
    /// Row echoed by the insert
    Representation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaptureReport {
    pub location_id: String,
    pub id_source: IdSource,
    pub photos_saved: usize,
    pub photos_total: usize,
    pub missing_files: Vec<PathBuf>,
    pub failed_files: Vec<(PathBuf, String)>,
}

impl CaptureReport {
    pub fn all_saved(&self) -> bool {
        self.photos_saved == self.photos_total
    }

    /// Short notice for the user
    pub fn summary(&self) -> String {
        if self.photos_total == 0 {
            "Location saved.".to_string()
        } else if self.all_saved() {
            format!("Location and {} photo(s) saved.", self.photos_saved)
        } else {
            format!(
                "Location saved, {} of {} photos uploaded.",
                self.photos_saved, self.photos_total
            )
        }
    }
}

fn validate_position(latitude: f64, longitude: f64) -> Result<(), AppError> {
    if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
        return Err(AppError::Validation(
            "Latitude must be between -90 and 90".to_string(),
        ));
    }
    if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
        return Err(AppError::Validation(
            "Longitude must be between -180 and 180".to_string(),
        ));
    }
    Ok(())
}

/// Creates the location, learns its id, then uploads every photo.
///
/// Failing to create the location fails the capture. Photo failures are
/// counted in the report and do not stop the remaining photos.
pub async fn save_capture(
    store: &RemoteStore,
    settings: &CaptureSettings,
    request: CaptureRequest,
) -> Result<CaptureReport, AppError> {
    validate_position(request.latitude, request.longitude)?;

    let mut location = match request.name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => {
            LocationRecord::new(request.latitude, request.longitude, name)
        }
        _ => LocationRecord::at(request.latitude, request.longitude),
    };

    let (location_id, id_source) = match settings.id_recovery {
        IdRecovery::Representation => {
            let stored = store.create_location_returning(&mut location).await?;
            (stored.id, IdSource::Representation)
        }
        IdRecovery::Scan => {
            store.create_location(&mut location).await?;
            resolve_by_scan(store, &location, settings.settle_delay_ms).await
        }
    };
    log::info!("Capture location id {} ({:?})", location_id, id_source);

    let (existing, missing_files) = partition_existing(&request.photo_paths);
    for path in &missing_files {
        log::warn!("Photo file does not exist, skipping: {}", path.display());
    }

    let mut report = CaptureReport {
        location_id,
        id_source,
        photos_saved: 0,
        photos_total: request.photo_paths.len(),
        missing_files,
        failed_files: Vec::new(),
    };

    for path in existing {
        let mut photo = PhotoRecord::new(
            report.location_id.clone(),
            path.to_string_lossy(),
            settings.photo_description.clone(),
        );
        match store.create_photo_with_file(&mut photo, &path).await {
            Ok(url) => {
                log::debug!("Photo {} stored at {}", photo.id, url);
                report.photos_saved += 1;
            }
            Err(e) => {
                log::error!("Photo {} not saved: {}", path.display(), e);
                report.failed_files.push((path, e.to_string()));
            }
        }
    }

    log::info!(
        "Capture finished: {}/{} photos saved",
        report.photos_saved,
        report.photos_total
    );
    Ok(report)
}

/// Waits for the insert to settle, then looks for the row by coordinates
async fn resolve_by_scan(
    store: &RemoteStore,
    location: &LocationRecord,
    settle_delay_ms: u64,
) -> (String, IdSource) {
    if settle_delay_ms > 0 {
        tokio::time::sleep(Duration::from_millis(settle_delay_ms)).await;
    }

    match store.list_locations().await {
        Ok(locations) => {
            match find_recent_match(&locations, location.latitude, location.longitude) {
                Some(found) => return (found.id.clone(), IdSource::Scan),
                None => log::warn!(
                    "No stored location near ({}, {}), using local id",
                    location.latitude,
                    location.longitude
                ),
            }
        }
        Err(e) => log::warn!("Could not re-fetch locations, using local id: {}", e),
    }
    (location.id.clone(), IdSource::LocalFallback)
}
