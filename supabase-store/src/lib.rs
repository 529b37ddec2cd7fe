//! # Supabase Store
//!
//! Remote data access for the field capture app: location and photo records
//! kept in a Supabase project (PostgREST tables plus object storage).
//!
//! This crate provides:
//! - The domain records ([`LocationRecord`], [`PhotoRecord`]) and their JSON wire format
//! - CRUD for both record types, with client-side cascade delete
//! - Multipart upload and deletion of photo files, and the public URL codec
//! - The coordinate scan used to recover the id of a just-inserted location
//!
//! ## Separation of Concerns
//!
//! This crate only talks to the backend. It does **not**:
//! - Decide where captured photos live on the device
//! - Schedule work or retry failed calls (handled by the application)
//! - Hold any global state; a [`RemoteStore`] is built and passed explicitly
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use supabase_store::{LocationRecord, RemoteConfig, RemoteStore};
//!
//! let store = RemoteStore::new(RemoteConfig::new("https://xyz.supabase.co", api_key))?;
//!
//! let mut location = LocationRecord::at(-10.184, -48.333);
//! store.create_location(&mut location).await?;
//! for location in store.list_locations().await? {
//!     println!("{} has {} photos", location, location.photos.len());
//! }
//! ```

pub mod config;
pub mod connectivity;
pub mod error;
pub mod identity;
pub mod locations;
pub mod models;
pub mod photos;
pub mod service;
pub mod storage;

#[cfg(any(test, feature = "test-backend"))]
pub mod testing;

pub use config::RemoteConfig;
pub use connectivity::{Connectivity, StaticConnectivity, SystemConnectivity};
pub use error::{RemoteError, RemoteResult};
pub use identity::{find_recent_match, same_position, COORDINATE_TOLERANCE};
pub use locations::CascadeReport;
pub use models::{is_valid_uuid, LocationRecord, PhotoRecord, Record, TIMESTAMP_FORMAT};
pub use service::RemoteStore;
pub use storage::{StorageObject, PHOTO_BUCKET};
