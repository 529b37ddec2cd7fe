use crate::error::{RemoteError, RemoteResult};
use crate::models::{LocationRecord, Record};
use crate::service::RemoteStore;

/// Outcome of deleting a location together with its photos
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CascadeReport {
    /// Photos that referenced the location when the delete started
    pub photos_found: usize,
    pub photos_deleted: usize,
    /// Ids of photos whose delete failed; the location was deleted anyway
    pub failed_photo_ids: Vec<String>,
    /// False if the child photos could not be listed at all
    pub children_listed: bool,
}

impl CascadeReport {
    pub fn is_complete(&self) -> bool {
        self.children_listed && self.failed_photo_ids.is_empty()
    }
}

impl RemoteStore {
    /// Inserts a location. An invalid id is replaced before sending.
    pub async fn create_location(&self, location: &mut LocationRecord) -> RemoteResult<()> {
        self.ensure_connected().await?;
        Self::ensure_record_id(location);

        self.insert_row(&*location, false).await?;
        log::info!("Location {} saved", location.id);
        Ok(())
    }

    /// Inserts a location and returns the row as stored by the backend
    pub async fn create_location_returning(
        &self,
        location: &mut LocationRecord,
    ) -> RemoteResult<LocationRecord> {
        self.ensure_connected().await?;
        Self::ensure_record_id(location);

        let stored = self
            .insert_row(&*location, true)
            .await?
            .ok_or_else(|| RemoteError::Decode("insert returned no row".to_string()))?;
        log::info!("Location {} saved", stored.id);
        Ok(stored)
    }

    /// All locations, each with its photos (one extra query per location)
    pub async fn list_locations(&self) -> RemoteResult<Vec<LocationRecord>> {
        let mut locations: Vec<LocationRecord> = self.select_rows(&[]).await?;

        for location in &mut locations {
            match self.list_photos_by_location(&location.id).await {
                Ok(photos) => location.photos = photos,
                Err(e) => {
                    log::warn!("Could not load photos of location {}: {}", location.id, e);
                }
            }
        }

        log::debug!("Loaded {} locations", locations.len());
        Ok(locations)
    }

    /// One location with its photos, `None` if the id is unknown
    pub async fn get_location(&self, id: &str) -> RemoteResult<Option<LocationRecord>> {
        Self::require_uuid("location id", id)?;

        let rows: Vec<LocationRecord> = self.select_rows(&[("id", id)]).await?;
        let Some(mut location) = rows.into_iter().next() else {
            log::debug!("No location with id {}", id);
            return Ok(None);
        };

        match self.list_photos_by_location(id).await {
            Ok(photos) => location.photos = photos,
            Err(e) => log::warn!("Could not load photos of location {}: {}", id, e),
        }
        Ok(Some(location))
    }

    /// Writes all fields of `location`. The id must already be valid.
    pub async fn update_location(&self, location: &LocationRecord) -> RemoteResult<()> {
        self.ensure_connected().await?;
        Self::require_uuid("location id", &location.id)?;

        self.patch_row(location).await?;
        log::info!("Location {} updated", location.id);
        Ok(())
    }

    /// Deletes every photo of the location (rows and files), then the location.
    ///
    /// A photo that fails to delete is logged and reported; it never stops
    /// the cascade, and the location row is deleted regardless.
    pub async fn delete_location(&self, id: &str) -> RemoteResult<CascadeReport> {
        self.ensure_connected().await?;
        Self::require_uuid("location id", id)?;

        let mut report = CascadeReport {
            children_listed: true,
            ..CascadeReport::default()
        };

        let photos = match self.list_photos_by_location(id).await {
            Ok(photos) => photos,
            Err(e) => {
                log::warn!("Could not list photos of location {}: {}", id, e);
                report.children_listed = false;
                Vec::new()
            }
        };
        report.photos_found = photos.len();
        if !photos.is_empty() {
            log::debug!("Deleting {} photos of location {}", photos.len(), id);
        }

        for photo in &photos {
            match self.remove_photo(photo).await {
                Ok(()) => report.photos_deleted += 1,
                Err(e) => {
                    log::error!("Photo {} not deleted: {}", photo.id, e);
                    report.failed_photo_ids.push(photo.id.clone());
                }
            }
        }

        self.delete_row(LocationRecord::TABLE, id).await?;
        log::info!(
            "Location {} deleted ({}/{} photos)",
            id,
            report.photos_deleted,
            report.photos_found
        );
        Ok(report)
    }
}
