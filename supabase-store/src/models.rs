use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use uuid::Uuid;

/// Timestamp layout used on the wire: millisecond precision, literal `Z`
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// A row in one of the backend's REST collections
pub trait Record: Serialize + DeserializeOwned {
    /// Collection name below `/rest/v1/`
    const TABLE: &'static str;

    fn id(&self) -> &str;
    fn set_id(&mut self, id: String);
}

/// Returns true if `value` parses as a UUID
pub fn is_valid_uuid(value: &str) -> bool {
    Uuid::parse_str(value).is_ok()
}

/// Serde adapter for the fixed timestamp format.
///
/// Writing always uses [`TIMESTAMP_FORMAT`]. Reading also accepts RFC 3339
/// with an offset and zone-less timestamps (taken as UTC), which is how the
/// backend renders columns it filled in itself.
pub mod wire_time {
    use super::TIMESTAMP_FORMAT;
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn to_wire(ts: &DateTime<Utc>) -> String {
        ts.format(TIMESTAMP_FORMAT).to_string()
    }

    pub fn from_wire(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Some(ts.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    }

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&to_wire(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        from_wire(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", raw)))
    }
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Parses a timestamp given by the caller, falling back to now
fn created_at_or_now(timestamp: &str) -> DateTime<Utc> {
    match wire_time::from_wire(timestamp) {
        Some(ts) => ts,
        None => {
            log::error!("Could not parse timestamp '{}', using current time", timestamp);
            Utc::now()
        }
    }
}

/// A captured GPS position
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LocationRecord {
    #[serde(default)]
    pub id: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
    #[serde(with = "wire_time", default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    /// Filled by a separate query, never sent to the backend
    #[serde(skip)]
    pub photos: Vec<PhotoRecord>,
}

impl LocationRecord {
    pub fn new(latitude: f64, longitude: f64, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            latitude,
            longitude,
            name: name.into(),
            created_at: Utc::now(),
            photos: Vec::new(),
        }
    }

    /// New location labelled with its capture time
    pub fn at(latitude: f64, longitude: f64) -> Self {
        let mut location = Self::new(latitude, longitude, String::new());
        location.name = format!("Location {}", location.created_at_string());
        location
    }

    /// Overrides the creation time from a wire-format string
    pub fn with_created_at_str(mut self, timestamp: &str) -> Self {
        if !timestamp.is_empty() {
            self.created_at = created_at_or_now(timestamp);
        }
        self
    }

    pub fn created_at_string(&self) -> String {
        wire_time::to_wire(&self.created_at)
    }

    pub fn has_valid_id(&self) -> bool {
        is_valid_uuid(&self.id)
    }

    pub fn add_photo(&mut self, photo: PhotoRecord) {
        self.photos.push(photo);
    }
}

impl fmt::Display for LocationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, {})", self.name, self.latitude, self.longitude)
    }
}

impl Record for LocationRecord {
    const TABLE: &'static str = "locations";

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}

/// A photo attached to a location
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PhotoRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_id: Option<String>,
    /// Path on the capturing device, meaningless elsewhere
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    /// Public object URL, set once the upload succeeded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_url: Option<String>,
    #[serde(with = "wire_time", default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl PhotoRecord {
    pub fn new(
        location_id: impl Into<String>,
        file_path: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            location_id: Some(location_id.into()),
            file_path: Some(file_path.into()),
            storage_url: None,
            created_at: Utc::now(),
            description: Some(description.into()),
        }
    }

    pub fn with_created_at_str(mut self, timestamp: &str) -> Self {
        if !timestamp.is_empty() {
            self.created_at = created_at_or_now(timestamp);
        }
        self
    }

    pub fn created_at_string(&self) -> String {
        wire_time::to_wire(&self.created_at)
    }

    pub fn has_valid_id(&self) -> bool {
        is_valid_uuid(&self.id)
    }

    /// The owning location id, if present and a valid UUID
    pub fn valid_location_id(&self) -> Option<&str> {
        self.location_id
            .as_deref()
            .filter(|id| is_valid_uuid(id))
    }
}

impl Record for PhotoRecord {
    const TABLE: &'static str = "photos";

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}
