use crate::error::{RemoteError, RemoteResult};
use crate::models::{PhotoRecord, Record};
use crate::service::RemoteStore;
use crate::storage::{read_local_file, StorageObject, PHOTO_BUCKET};
use std::path::Path;

/// The photo's parent id, which must exist and be a UUID
fn parent_location_id(photo: &PhotoRecord) -> RemoteResult<&str> {
    match photo.location_id.as_deref() {
        None | Some("") => {
            log::error!("Photo {} has no location id", photo.id);
            Err(RemoteError::invalid_id("location_id", ""))
        }
        Some(id) => {
            RemoteStore::require_uuid("location_id", id)?;
            Ok(id)
        }
    }
}

impl RemoteStore {
    /// Inserts photo metadata.
    ///
    /// The parent `location_id` is checked first and nothing is changed or
    /// sent if it is missing or malformed. Only then is an invalid photo id
    /// replaced.
    pub async fn create_photo(&self, photo: &mut PhotoRecord) -> RemoteResult<()> {
        self.ensure_connected().await?;
        parent_location_id(photo)?;
        Self::ensure_record_id(photo);

        self.insert_row(&*photo, false).await?;
        log::info!("Photo {} saved", photo.id);
        Ok(())
    }

    /// Uploads `file`, then stores the photo with the resulting public URL.
    ///
    /// The object goes to `photos/<location_id>/<file name>`. If the metadata
    /// insert fails after a successful upload the object stays in storage;
    /// no compensating delete is attempted.
    pub async fn create_photo_with_file(
        &self,
        photo: &mut PhotoRecord,
        file: &Path,
    ) -> RemoteResult<String> {
        self.ensure_connected().await?;
        let data = read_local_file(file).await?;
        let location_id = parent_location_id(photo)?.to_string();

        let file_name = file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| RemoteError::FileUnavailable {
                path: file.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "no file name"),
            })?;
        let object = StorageObject::new(PHOTO_BUCKET, format!("{}/{}", location_id, file_name));

        let public_url = self.upload_bytes(data, file_name, &object).await?;
        photo.storage_url = Some(public_url.clone());

        if let Err(e) = self.create_photo(photo).await {
            log::error!(
                "Photo metadata not saved, uploaded object {} is orphaned: {}",
                public_url,
                e
            );
            return Err(e);
        }
        Ok(public_url)
    }

    /// Photos referencing `location_id`
    pub async fn list_photos_by_location(&self, location_id: &str) -> RemoteResult<Vec<PhotoRecord>> {
        Self::require_uuid("location id", location_id)?;
        self.select_rows(&[("location_id", location_id)]).await
    }

    /// One photo, `None` if the id is unknown
    pub async fn get_photo(&self, id: &str) -> RemoteResult<Option<PhotoRecord>> {
        Self::require_uuid("photo id", id)?;
        let rows: Vec<PhotoRecord> = self.select_rows(&[("id", id)]).await?;
        Ok(rows.into_iter().next())
    }

    /// Writes all fields of `photo`. The id must already be valid.
    pub async fn update_photo(&self, photo: &PhotoRecord) -> RemoteResult<()> {
        self.ensure_connected().await?;
        Self::require_uuid("photo id", &photo.id)?;

        self.patch_row(photo).await?;
        log::info!("Photo {} updated", photo.id);
        Ok(())
    }

    /// Deletes a photo's stored file (best effort) and its row
    pub async fn delete_photo(&self, id: &str) -> RemoteResult<()> {
        self.ensure_connected().await?;
        Self::require_uuid("photo id", id)?;

        let photo = self
            .get_photo(id)
            .await?
            .ok_or_else(|| RemoteError::NotFound(format!("photo {}", id)))?;
        self.remove_photo(&photo).await
    }

    /// Object first, then row. A failed object delete does not stop the row delete.
    pub(crate) async fn remove_photo(&self, photo: &PhotoRecord) -> RemoteResult<()> {
        match photo.storage_url.as_deref().filter(|url| !url.is_empty()) {
            Some(url) => {
                if let Some(object) = self.extract_path(url) {
                    if let Err(e) = self.delete_object(&object).await {
                        log::error!("Could not delete stored file {}: {}", object.key(), e);
                    }
                }
            }
            None => log::debug!("Photo {} has no stored file", photo.id),
        }

        self.delete_row(PhotoRecord::TABLE, &photo.id).await?;
        log::info!("Photo {} deleted", photo.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeBackend;
    use serde_json::json;
    use std::io::Write;

    const LOCATION_ID: &str = "6f1c2a9e-3d4b-4c5d-8e7f-0a1b2c3d4e5f";
    const PHOTO_ID: &str = "a1b2c3d4-0000-4000-8000-000000000001";

    fn photo_file() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let mut file = std::fs::File::create(dir.path().join("IMG_20240601.jpg")).unwrap();
        file.write_all(b"\xff\xd8\xff\xe0 fake jpeg").unwrap();
        dir
    }

    #[tokio::test]
    async fn test_create_photo_without_location_sends_nothing() {
        let backend = FakeBackend::start().await;
        let store = backend.store();

        for location_id in [None, Some(String::new()), Some("loc-1".to_string())] {
            let mut photo = PhotoRecord::new("", "/tmp/p.jpg", "d");
            photo.location_id = location_id;
            photo.id = "bad".to_string();

            let err = store.create_photo(&mut photo).await.unwrap_err();

            assert!(matches!(err, RemoteError::InvalidId { field: "location_id", .. }));
            assert_eq!(photo.id, "bad");
        }
        assert!(backend.requests().is_empty());
    }

    #[tokio::test]
    async fn test_create_photo_repairs_own_id() {
        let backend = FakeBackend::start().await;
        let mut photo = PhotoRecord::new(LOCATION_ID, "/tmp/p.jpg", "d");
        photo.id = String::new();

        backend.store().create_photo(&mut photo).await.unwrap();

        assert!(photo.has_valid_id());
        let rows = backend.rows("photos");
        assert_eq!(rows[0]["id"], photo.id.as_str());
        assert_eq!(rows[0]["location_id"], LOCATION_ID);
    }

    #[tokio::test]
    async fn test_create_photo_offline() {
        let backend = FakeBackend::start().await;
        let mut photo = PhotoRecord::new(LOCATION_ID, "/tmp/p.jpg", "d");

        let err = backend
            .store_with_network(false)
            .create_photo(&mut photo)
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::NoConnectivity));
        assert!(backend.requests().is_empty());
    }

    #[tokio::test]
    async fn test_create_with_file_uploads_then_saves() {
        let backend = FakeBackend::start().await;
        let store = backend.store();
        let dir = photo_file();
        let path = dir.path().join("IMG_20240601.jpg");
        let mut photo = PhotoRecord::new(LOCATION_ID, path.to_string_lossy(), "Photo of location");

        let url = store.create_photo_with_file(&mut photo, &path).await.unwrap();

        let key = format!("photos/{}/IMG_20240601.jpg", LOCATION_ID);
        assert!(backend.has_object(&key));
        assert_eq!(photo.storage_url.as_deref(), Some(url.as_str()));
        assert_eq!(
            store.extract_path(&url).map(|object| object.key()),
            Some(key)
        );
        assert_eq!(backend.rows("photos")[0]["storage_url"], url.as_str());

        let paths: Vec<String> = backend.requests().into_iter().map(|r| r.path).collect();
        assert!(paths[0].starts_with("/storage/v1/object/"));
        assert_eq!(paths[1], "/rest/v1/photos");
    }

    #[tokio::test]
    async fn test_create_with_file_offline() {
        let backend = FakeBackend::start().await;
        let dir = photo_file();
        let path = dir.path().join("IMG_20240601.jpg");
        let mut photo = PhotoRecord::new(LOCATION_ID, path.to_string_lossy(), "d");

        let err = backend
            .store_with_network(false)
            .create_photo_with_file(&mut photo, &path)
            .await
            .unwrap_err();

        assert!(matches!(err, RemoteError::NoConnectivity));
        assert!(backend.requests().is_empty());
        assert!(photo.storage_url.is_none());
    }

    #[tokio::test]
    async fn test_create_with_file_name_needing_encoding() {
        let backend = FakeBackend::start().await;
        let store = backend.store();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("IMG a#1?.jpg");
        std::fs::write(&path, b"jpeg").unwrap();
        let mut photo = PhotoRecord::new(LOCATION_ID, path.to_string_lossy(), "d");

        let url = store.create_photo_with_file(&mut photo, &path).await.unwrap();

        let key = format!("photos/{}/IMG a#1?.jpg", LOCATION_ID);
        assert!(backend.has_object(&key));
        assert_eq!(backend.object_count(), 1);
        assert!(url.ends_with("/IMG%20a%231%3F.jpg"));
        assert_eq!(store.extract_path(&url).map(|object| object.key()), Some(key));
    }

    #[tokio::test]
    async fn test_create_with_directory_sends_nothing() {
        let backend = FakeBackend::start().await;
        let dir = tempfile::tempdir().unwrap();
        let mut photo = PhotoRecord::new(LOCATION_ID, dir.path().to_string_lossy(), "d");

        let err = backend
            .store()
            .create_photo_with_file(&mut photo, dir.path())
            .await
            .unwrap_err();

        assert!(matches!(err, RemoteError::FileUnavailable { .. }));
        assert!(backend.requests().is_empty());
    }

    #[tokio::test]
    async fn test_create_with_missing_file_does_nothing() {
        let backend = FakeBackend::start().await;
        let mut photo = PhotoRecord::new(LOCATION_ID, "/nowhere/x.jpg", "d");

        let err = backend
            .store()
            .create_photo_with_file(&mut photo, Path::new("/nowhere/x.jpg"))
            .await
            .unwrap_err();

        assert!(matches!(err, RemoteError::FileUnavailable { .. }));
        assert!(backend.requests().is_empty());
        assert!(photo.storage_url.is_none());
    }

    #[tokio::test]
    async fn test_create_with_file_needs_location() {
        let backend = FakeBackend::start().await;
        let dir = photo_file();
        let path = dir.path().join("IMG_20240601.jpg");
        let mut photo = PhotoRecord::new("", path.to_string_lossy(), "d");
        photo.location_id = None;

        let err = backend
            .store()
            .create_photo_with_file(&mut photo, &path)
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::InvalidId { .. }));
        assert_eq!(backend.object_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_metadata_write_leaves_orphan() {
        let backend = FakeBackend::start().await;
        backend.fail("POST", "/rest/v1/photos", 500);
        let dir = photo_file();
        let path = dir.path().join("IMG_20240601.jpg");
        let mut photo = PhotoRecord::new(LOCATION_ID, path.to_string_lossy(), "d");

        let err = backend
            .store()
            .create_photo_with_file(&mut photo, &path)
            .await
            .unwrap_err();

        assert!(matches!(err, RemoteError::Status { status: 500, .. }));
        assert!(backend.has_object(&format!("photos/{}/IMG_20240601.jpg", LOCATION_ID)));
        assert!(backend.rows("photos").is_empty());
        assert_eq!(backend.count("DELETE", "/storage/"), 0);
    }

    #[tokio::test]
    async fn test_failed_upload_skips_metadata() {
        let backend = FakeBackend::start().await;
        backend.fail("POST", "/storage/v1/object/", 500);
        let dir = photo_file();
        let path = dir.path().join("IMG_20240601.jpg");
        let mut photo = PhotoRecord::new(LOCATION_ID, path.to_string_lossy(), "d");

        assert!(backend
            .store()
            .create_photo_with_file(&mut photo, &path)
            .await
            .is_err());
        assert_eq!(backend.count("POST", "/rest/v1/photos"), 0);
        assert!(photo.storage_url.is_none());
    }

    #[tokio::test]
    async fn test_get_and_update_photo() {
        let backend = FakeBackend::start().await;
        backend.seed(
            "photos",
            json!({"id": PHOTO_ID, "location_id": LOCATION_ID,
                   "created_at": "2024-06-01T12:01:00.000Z", "description": "old"}),
        );
        let store = backend.store();

        let mut photo = store.get_photo(PHOTO_ID).await.unwrap().unwrap();
        photo.description = Some("new".to_string());
        store.update_photo(&photo).await.unwrap();

        assert_eq!(backend.rows("photos")[0]["description"], "new");
        assert!(store
            .get_photo("00000000-0000-4000-8000-000000000000")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_update_photo_does_not_repair_id() {
        let backend = FakeBackend::start().await;
        let mut photo = PhotoRecord::new(LOCATION_ID, "p.jpg", "d");
        photo.id = "x".to_string();

        let err = backend.store().update_photo(&photo).await.unwrap_err();
        assert!(matches!(err, RemoteError::InvalidId { .. }));
        assert!(backend.requests().is_empty());
    }

    #[tokio::test]
    async fn test_update_photo_offline() {
        let backend = FakeBackend::start().await;
        let photo = PhotoRecord::new(LOCATION_ID, "p.jpg", "d");

        let err = backend
            .store_with_network(false)
            .update_photo(&photo)
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::NoConnectivity));
        assert!(backend.requests().is_empty());
    }

    #[tokio::test]
    async fn test_delete_photo_offline() {
        let backend = FakeBackend::start().await;
        backend.seed(
            "photos",
            json!({"id": PHOTO_ID, "location_id": LOCATION_ID,
                   "created_at": "2024-06-01T12:01:00.000Z"}),
        );

        let err = backend
            .store_with_network(false)
            .delete_photo(PHOTO_ID)
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::NoConnectivity));
        assert!(backend.requests().is_empty());
        assert_eq!(backend.rows("photos").len(), 1);
    }

    #[tokio::test]
    async fn test_delete_photo_removes_object_and_row() {
        let backend = FakeBackend::start().await;
        let key = format!("photos/{}/one.jpg", LOCATION_ID);
        backend.seed(
            "photos",
            json!({"id": PHOTO_ID, "location_id": LOCATION_ID,
                   "storage_url": format!("{}/storage/v1/object/public/{}", backend.base_url(), key),
                   "created_at": "2024-06-01T12:01:00.000Z"}),
        );
        backend.seed_object(&key);

        backend.store().delete_photo(PHOTO_ID).await.unwrap();

        assert!(!backend.has_object(&key));
        assert!(backend.rows("photos").is_empty());
    }

    #[tokio::test]
    async fn test_delete_photo_survives_storage_failure() {
        let backend = FakeBackend::start().await;
        backend.seed(
            "photos",
            json!({"id": PHOTO_ID, "location_id": LOCATION_ID,
                   "storage_url": format!("{}/storage/v1/object/public/photos/gone.jpg", backend.base_url()),
                   "created_at": "2024-06-01T12:01:00.000Z"}),
        );

        backend.store().delete_photo(PHOTO_ID).await.unwrap();

        assert_eq!(backend.count("DELETE", "/storage/v1/object/"), 1);
        assert!(backend.rows("photos").is_empty());
    }

    #[tokio::test]
    async fn test_delete_unknown_photo() {
        let backend = FakeBackend::start().await;
        let err = backend.store().delete_photo(PHOTO_ID).await.unwrap_err();
        assert!(matches!(err, RemoteError::NotFound(_)));
        assert_eq!(backend.count("DELETE", "/"), 0);
    }
}
