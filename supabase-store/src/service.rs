use crate::config::RemoteConfig;
use crate::connectivity::{self, Connectivity, SystemConnectivity};
use crate::error::{RemoteError, RemoteResult};
use crate::models::{is_valid_uuid, Record};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder, Response};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

const PREFER_MINIMAL: &str = "return=minimal";
const PREFER_REPRESENTATION: &str = "return=representation";

/// Client for the backend's REST and storage APIs
///
/// Built once from a [`RemoteConfig`] and shared by reference (or `Arc`).
/// All calls are async and must run on a background task, never on an
/// interactive thread. Record operations live in `locations.rs` and
/// `photos.rs`, file operations in `storage.rs`.
pub struct RemoteStore {
    config: RemoteConfig,
    http: reqwest::Client,
    connectivity: Arc<dyn Connectivity>,
}

impl RemoteStore {
    /// Create a store that probes the real network before writes
    pub fn new(config: RemoteConfig) -> RemoteResult<Self> {
        let connectivity = Arc::new(SystemConnectivity::for_url(&config.base_url));
        Self::with_connectivity(config, connectivity)
    }

    /// Create a store with a custom connectivity check
    pub fn with_connectivity(
        config: RemoteConfig,
        connectivity: Arc<dyn Connectivity>,
    ) -> RemoteResult<Self> {
        config.validate()?;

        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(concat!("supabase-store/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RemoteError::Config(format!("Client build failed: {}", e)))?;

        log::debug!(
            "Remote store for {} (key {})",
            config.base_url,
            config.redacted_key()
        );

        Ok(Self {
            config,
            http,
            connectivity,
        })
    }

    pub fn config(&self) -> &RemoteConfig {
        &self.config
    }

    /// Fails fast when there is no network path
    pub(crate) async fn ensure_connected(&self) -> RemoteResult<()> {
        if connectivity::check(self.connectivity.clone()).await {
            Ok(())
        } else {
            log::error!("No internet connection");
            Err(RemoteError::NoConnectivity)
        }
    }

    /// Adds `apikey` and bearer authorization
    pub(crate) fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.http
            .request(method, url)
            .header("apikey", self.config.api_key.as_str())
            .header(AUTHORIZATION, format!("Bearer {}", self.config.api_key))
    }

    /// Request for a write: JSON content type plus a `Prefer` header
    fn write_request(&self, method: Method, url: &str, prefer: &str) -> RequestBuilder {
        self.request(method, url)
            .header(CONTENT_TYPE, "application/json")
            .header("Prefer", prefer)
    }

    /// Sends and maps transport errors and non-2xx statuses
    pub(crate) async fn send(&self, request: RequestBuilder, what: &str) -> RemoteResult<Response> {
        let response = request.send().await.map_err(|e| {
            log::error!("{}: request failed: {}", what, e);
            RemoteError::Transport(e)
        })?;

        let status = response.status();
        if status.is_success() {
            log::debug!("{}: {}", what, status.as_u16());
            return Ok(response);
        }

        let body = match response.text().await {
            Ok(body) if !body.is_empty() => body,
            _ => "<no body>".to_string(),
        };
        log::error!("{}: status {}, body: {}", what, status.as_u16(), body);
        Err(RemoteError::Status {
            status: status.as_u16(),
            body,
        })
    }

    /// Replaces a missing or malformed record id with a fresh UUID
    pub(crate) fn ensure_record_id<R: Record>(record: &mut R) {
        if !is_valid_uuid(record.id()) {
            let new_id = Uuid::new_v4().to_string();
            log::warn!(
                "{} id '{}' is not a valid UUID, replacing with {}",
                R::TABLE,
                record.id(),
                new_id
            );
            record.set_id(new_id);
        }
    }

    pub(crate) fn require_uuid(field: &'static str, value: &str) -> RemoteResult<()> {
        if is_valid_uuid(value) {
            Ok(())
        } else {
            log::error!("{} is not a valid UUID: '{}'", field, value);
            Err(RemoteError::invalid_id(field, value))
        }
    }

    /// POST one record; with `returning` the backend echoes the stored row
    pub(crate) async fn insert_row<R: Record>(
        &self,
        record: &R,
        returning: bool,
    ) -> RemoteResult<Option<R>> {
        let payload = serde_json::to_string(record)?;
        log::debug!("Insert into {}: {}", R::TABLE, payload);

        let prefer = if returning {
            PREFER_REPRESENTATION
        } else {
            PREFER_MINIMAL
        };
        let request = self
            .write_request(Method::POST, &self.config.rest_url(R::TABLE), prefer)
            .body(payload);
        let response = self.send(request, &format!("insert {}", R::TABLE)).await?;

        if !returning {
            return Ok(None);
        }
        let mut rows: Vec<R> = decode_rows(response).await?;
        if rows.is_empty() {
            return Err(RemoteError::Decode(format!(
                "insert into {} returned no row",
                R::TABLE
            )));
        }
        Ok(Some(rows.swap_remove(0)))
    }

    /// GET rows matching equality filters (`column=eq.value`)
    pub(crate) async fn select_rows<R: Record>(
        &self,
        filters: &[(&str, &str)],
    ) -> RemoteResult<Vec<R>> {
        let query: Vec<(&str, String)> = if filters.is_empty() {
            vec![("select", "*".to_string())]
        } else {
            filters
                .iter()
                .map(|(column, value)| (*column, format!("eq.{}", value)))
                .collect()
        };

        let request = self
            .request(Method::GET, &self.config.rest_url(R::TABLE))
            .query(&query);
        let response = self.send(request, &format!("select {}", R::TABLE)).await?;
        decode_rows(response).await
    }

    /// PATCH the full record, filtered by its id
    pub(crate) async fn patch_row<R: Record>(&self, record: &R) -> RemoteResult<()> {
        let payload = serde_json::to_string(record)?;
        log::debug!("Update {} {}: {}", R::TABLE, record.id(), payload);

        let request = self
            .write_request(Method::PATCH, &self.config.rest_url(R::TABLE), PREFER_MINIMAL)
            .query(&[("id", format!("eq.{}", record.id()))])
            .body(payload);
        self.send(request, &format!("update {}", R::TABLE)).await?;
        Ok(())
    }

    /// DELETE the row with the given id
    pub(crate) async fn delete_row(&self, table: &str, id: &str) -> RemoteResult<()> {
        let request = self
            .write_request(Method::DELETE, &self.config.rest_url(table), PREFER_MINIMAL)
            .query(&[("id", format!("eq.{}", id))]);
        self.send(request, &format!("delete {}", table)).await?;
        Ok(())
    }
}

/// Decodes a JSON array body; an empty body counts as no rows
async fn decode_rows<R: Record>(response: Response) -> RemoteResult<Vec<R>> {
    let body = response.text().await?;
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(&body).map_err(|e| {
        log::error!("Cannot decode {} rows: {}", R::TABLE, e);
        RemoteError::from(e)
    })
}
