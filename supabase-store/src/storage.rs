//! Object storage: multipart upload, deletion, and the public URL codec.
//!
//! Records only keep the public URL of their file. The `bucket/path` pair
//! needed to delete the object is recovered by stripping the known public
//! prefix again, so [`StorageObject::public_url`] and
//! [`StorageObject::from_public_url`] must stay exact inverses.

use crate::config::RemoteConfig;
use crate::error::{RemoteError, RemoteResult};
use crate::service::RemoteStore;
use reqwest::multipart::{Form, Part};
use reqwest::Method;
use std::path::Path;

/// Bucket holding captured photos
pub const PHOTO_BUCKET: &str = "photos";

/// A `bucket/path` address in object storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageObject {
    pub bucket: String,
    pub path: String,
}

impl StorageObject {
    pub fn new(bucket: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            path: path.into(),
        }
    }

    /// `bucket/path`, unencoded
    pub fn key(&self) -> String {
        format!("{}/{}", self.bucket, self.path)
    }

    /// `bucket/path` with every segment percent-encoded for use in a URL
    pub fn encoded_key(&self) -> String {
        std::iter::once(self.bucket.as_str())
            .chain(self.path.split('/'))
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/")
    }

    pub fn public_url(&self, config: &RemoteConfig) -> String {
        format!("{}{}", config.public_object_prefix(), self.encoded_key())
    }

    /// Endpoint used to upload or delete the object
    pub fn object_url(&self, config: &RemoteConfig) -> String {
        format!("{}{}", config.storage_object_prefix(), self.encoded_key())
    }

    /// Inverse of [`public_url`](Self::public_url); `None` for foreign URLs
    pub fn from_public_url(config: &RemoteConfig, url: &str) -> Option<Self> {
        let encoded = url.strip_prefix(&config.public_object_prefix())?;
        let (bucket, path) = encoded.split_once('/')?;
        if bucket.is_empty() || path.is_empty() {
            return None;
        }

        let decode = |segment: &str| urlencoding::decode(segment).ok().map(|s| s.into_owned());
        let path = path
            .split('/')
            .map(decode)
            .collect::<Option<Vec<_>>>()?
            .join("/");
        Some(Self::new(decode(bucket)?, path))
    }
}

impl RemoteStore {
    /// Public URL an object will have once uploaded
    pub fn public_url(&self, bucket: &str, path: &str) -> String {
        StorageObject::new(bucket, path).public_url(self.config())
    }

    /// Recovers `bucket/path` from a public URL produced by this store
    pub fn extract_path(&self, public_url: &str) -> Option<StorageObject> {
        let object = StorageObject::from_public_url(self.config(), public_url);
        if object.is_none() {
            log::error!("URL does not have the expected format: {}", public_url);
        }
        object
    }

    /// Uploads `file` to `bucket/path` and returns its public URL.
    ///
    /// The URL is constructed locally, the upload response is not parsed.
    pub async fn upload(&self, file: &Path, bucket: &str, path: &str) -> RemoteResult<String> {
        let data = read_local_file(file).await?;
        let file_name = file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        self.upload_bytes(data, file_name, &StorageObject::new(bucket, path))
            .await
    }

    /// Sends already-read file contents as the single multipart part `file`
    pub(crate) async fn upload_bytes(
        &self,
        data: Vec<u8>,
        file_name: String,
        object: &StorageObject,
    ) -> RemoteResult<String> {
        log::debug!(
            "Uploading {} ({} bytes) to {}",
            file_name,
            data.len(),
            object.key()
        );

        let part = Part::bytes(data)
            .file_name(file_name)
            .mime_str("application/octet-stream")?;
        let form = Form::new().part("file", part);

        let request = self
            .request(Method::POST, &object.object_url(self.config()))
            .multipart(form);
        self.send(request, "upload object").await?;

        let public_url = object.public_url(self.config());
        log::info!("Upload finished, public URL: {}", public_url);
        Ok(public_url)
    }

    /// Deletes one object from storage
    pub async fn delete_object(&self, object: &StorageObject) -> RemoteResult<()> {
        self.ensure_connected().await?;
        let request = self.request(Method::DELETE, &object.object_url(self.config()));
        self.send(request, "delete object").await?;
        log::debug!("Deleted object {}", object.key());
        Ok(())
    }
}

/// Reads a local file, mapping every failure to `FileUnavailable`
pub(crate) async fn read_local_file(file: &Path) -> RemoteResult<Vec<u8>> {
    let unavailable = |source: std::io::Error| {
        log::error!("File not readable: {} ({})", file.display(), source);
        RemoteError::FileUnavailable {
            path: file.to_path_buf(),
            source,
        }
    };

    let metadata = tokio::fs::metadata(file).await.map_err(unavailable)?;
    if !metadata.is_file() {
        return Err(unavailable(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "not a regular file",
        )));
    }
    tokio::fs::read(file).await.map_err(unavailable)
}
