use crate::error::AppError;
use supabase_store::{CascadeReport, LocationRecord, PhotoRecord, RemoteStore};

/// One row of the location list
#[derive(Debug, Clone, PartialEq)]
pub struct LocationSummary {
    pub id: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub created_at: String,
    pub photo_count: usize,
}

impl From<&LocationRecord> for LocationSummary {
    fn from(location: &LocationRecord) -> Self {
        Self {
            id: location.id.clone(),
            name: location.name.clone(),
            latitude: location.latitude,
            longitude: location.longitude,
            created_at: location.created_at_string(),
            photo_count: location.photos.len(),
        }
    }
}

/// All locations, newest first, with their photo counts
pub async fn list_locations(store: &RemoteStore) -> Result<Vec<LocationSummary>, AppError> {
    let mut locations = store.list_locations().await?;
    locations.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(locations.iter().map(LocationSummary::from).collect())
}

/// One location with its photos
pub async fn show_location(store: &RemoteStore, id: &str) -> Result<LocationRecord, AppError> {
    store
        .get_location(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Location {}", id)))
}

pub async fn rename_location(
    store: &RemoteStore,
    id: &str,
    name: &str,
) -> Result<LocationRecord, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("Name must not be empty".to_string()));
    }

    let mut location = show_location(store, id).await?;
    location.name = name.to_string();
    store.update_location(&location).await?;
    Ok(location)
}

/// Deletes the location and its photos; child failures end up in the report
pub async fn delete_location(store: &RemoteStore, id: &str) -> Result<CascadeReport, AppError> {
    let report = store.delete_location(id).await?;
    if !report.is_complete() {
        log::warn!(
            "Location {} deleted, {} photo(s) left behind",
            id,
            report.failed_photo_ids.len()
        );
    }
    Ok(report)
}

pub async fn show_photo(store: &RemoteStore, id: &str) -> Result<PhotoRecord, AppError> {
    store
        .get_photo(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Photo {}", id)))
}

/// Replaces the description with the trimmed text
pub async fn describe_photo(
    store: &RemoteStore,
    id: &str,
    description: &str,
) -> Result<PhotoRecord, AppError> {
    let mut photo = show_photo(store, id).await?;
    photo.description = Some(description.trim().to_string());
    store.update_photo(&photo).await?;
    Ok(photo)
}

pub async fn delete_photo(store: &RemoteStore, id: &str) -> Result<(), AppError> {
    store.delete_photo(id).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use supabase_store::testing::FakeBackend;
    use supabase_store::RemoteError;

    const OLD_ID: &str = "11111111-1111-4111-8111-111111111111";
    const NEW_ID: &str = "22222222-2222-4222-8222-222222222222";
    const PHOTO_A: &str = "aaaaaaaa-aaaa-4aaa-8aaa-aaaaaaaaaaaa";
    const PHOTO_B: &str = "bbbbbbbb-bbbb-4bbb-8bbb-bbbbbbbbbbbb";

    async fn seeded() -> FakeBackend {
        let backend = FakeBackend::start().await;
        backend.seed(
            "locations",
            json!({"id": OLD_ID, "latitude": 1.0, "longitude": 2.0, "name": "Cachoeira",
                   "created_at": "2024-05-01T08:00:00.000Z"}),
        );
        backend.seed(
            "locations",
            json!({"id": NEW_ID, "latitude": 3.0, "longitude": 4.0, "name": null,
                   "created_at": "2024-06-01T08:00:00.000Z"}),
        );
        let url = format!(
            "{}/storage/v1/object/public/photos/{}/a.jpg",
            backend.base_url(),
            OLD_ID
        );
        backend.seed_object(&format!("photos/{}/a.jpg", OLD_ID));
        backend.seed(
            "photos",
            json!({"id": PHOTO_A, "location_id": OLD_ID, "storage_url": url,
                   "created_at": "2024-05-01T08:01:00.000Z", "description": "Photo of location"}),
        );
        backend.seed(
            "photos",
            json!({"id": PHOTO_B, "location_id": OLD_ID,
                   "created_at": "2024-05-01T08:02:00.000Z"}),
        );
        backend
    }

    #[tokio::test]
    async fn test_list_newest_first_with_counts() {
        let backend = seeded().await;
        let summaries = list_locations(&backend.store()).await.unwrap();

        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].id, NEW_ID);
        assert_eq!(summaries[0].name, "");
        assert_eq!(summaries[0].photo_count, 0);
        assert_eq!(summaries[1].id, OLD_ID);
        assert_eq!(summaries[1].photo_count, 2);
        assert_eq!(summaries[1].created_at, "2024-05-01T08:00:00.000Z");
    }

    #[tokio::test]
    async fn test_show_unknown_location() {
        let backend = seeded().await;
        let err = show_location(&backend.store(), "33333333-3333-4333-8333-333333333333")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_rename_location() {
        let backend = seeded().await;
        let renamed = rename_location(&backend.store(), OLD_ID, " Cachoeira do Taquaruçu ")
            .await
            .unwrap();

        assert_eq!(renamed.name, "Cachoeira do Taquaruçu");
        let row = backend
            .rows("locations")
            .into_iter()
            .find(|r| r["id"] == OLD_ID)
            .unwrap();
        assert_eq!(row["name"], "Cachoeira do Taquaruçu");
        assert_eq!(backend.count("PATCH", "/rest/v1/locations"), 1);
    }

    #[tokio::test]
    async fn test_rename_rejects_blank_name() {
        let backend = seeded().await;
        let err = rename_location(&backend.store(), OLD_ID, "  ").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(backend.requests().is_empty());
    }

    #[tokio::test]
    async fn test_describe_photo() {
        let backend = seeded().await;
        let store = backend.store();

        let photo = describe_photo(&store, PHOTO_B, "Vista do mirante").await.unwrap();
        assert_eq!(photo.description.as_deref(), Some("Vista do mirante"));

        let photo = describe_photo(&store, PHOTO_A, "").await.unwrap();
        assert_eq!(photo.description.as_deref(), Some(""));
        let row = backend
            .rows("photos")
            .into_iter()
            .find(|r| r["id"] == PHOTO_A)
            .unwrap();
        assert_eq!(row["description"], "");
        assert_eq!(backend.count("PATCH", "/rest/v1/photos"), 2);
    }

    #[tokio::test]
    async fn test_delete_photo_removes_row_and_object() {
        let backend = seeded().await;
        delete_photo(&backend.store(), PHOTO_A).await.unwrap();

        assert_eq!(backend.rows("photos").len(), 1);
        assert_eq!(backend.object_count(), 0);

        let err = delete_photo(&backend.store(), PHOTO_A).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_location_cascades() {
        let backend = seeded().await;
        let report = delete_location(&backend.store(), OLD_ID).await.unwrap();

        assert_eq!(report.photos_found, 2);
        assert_eq!(report.photos_deleted, 2);
        assert!(report.is_complete());
        assert_eq!(backend.rows("locations").len(), 1);
        assert!(backend.rows("photos").is_empty());
        assert_eq!(backend.object_count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_id_is_refused() {
        let backend = seeded().await;
        let err = delete_location(&backend.store(), "not-a-uuid").await.unwrap_err();
        assert!(matches!(err, AppError::Remote(RemoteError::InvalidId { .. })));
        assert!(backend.requests().is_empty());
    }
}
