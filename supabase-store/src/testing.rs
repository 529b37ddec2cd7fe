//! In-process stand-in for the backend, used by tests.
//!
//! Implements just enough of the REST (`eq.` filters, `Prefer`) and storage
//! endpoints for the client, and records every request it sees.

use crate::config::RemoteConfig;
use crate::connectivity::StaticConnectivity;
use crate::service::RemoteStore;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub const FAKE_API_KEY: &str = "test-anon-key-0123456789";

/// One request as seen by the fake backend
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: String,
    pub apikey: Option<String>,
    pub authorization: Option<String>,
    pub prefer: Option<String>,
    pub content_type: Option<String>,
}

#[derive(Debug, Clone)]
struct CannedResponse {
    method: String,
    path_prefix: String,
    status: u16,
    body: String,
}

#[derive(Default)]
struct FakeState {
    tables: HashMap<String, Vec<Value>>,
    objects: HashMap<String, usize>,
    requests: Vec<RecordedRequest>,
    canned: Vec<CannedResponse>,
}

type Shared = Arc<Mutex<FakeState>>;

pub struct FakeBackend {
    base_url: String,
    state: Shared,
}

impl FakeBackend {
    /// Bind to an ephemeral loopback port and serve in the background
    pub async fn start() -> Self {
        let state: Shared = Arc::new(Mutex::new(FakeState::default()));
        let router = Router::new().fallback(handle).with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake backend");
        let addr = listener.local_addr().expect("fake backend address");
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                log::error!("Fake backend stopped: {}", e);
            }
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn config(&self) -> RemoteConfig {
        RemoteConfig::new(self.base_url.clone(), FAKE_API_KEY)
    }

    /// Store that always believes it is online
    pub fn store(&self) -> RemoteStore {
        self.store_with_network(true)
    }

    pub fn store_with_network(&self, online: bool) -> RemoteStore {
        RemoteStore::with_connectivity(self.config(), Arc::new(StaticConnectivity(online)))
            .expect("fake backend config is valid")
    }

    pub fn seed(&self, table: &str, row: Value) {
        self.lock().tables.entry(table.to_string()).or_default().push(row);
    }

    pub fn seed_object(&self, key: &str) {
        self.lock().objects.insert(key.to_string(), 0);
    }

    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.lock().tables.get(table).cloned().unwrap_or_default()
    }

    pub fn has_object(&self, key: &str) -> bool {
        self.lock().objects.contains_key(key)
    }

    pub fn object_count(&self) -> usize {
        self.lock().objects.len()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.lock().requests.clone()
    }

    /// Number of requests with this method whose path starts with `path_prefix`
    pub fn count(&self, method: &str, path_prefix: &str) -> usize {
        self.lock()
            .requests
            .iter()
            .filter(|r| r.method == method && r.path.starts_with(path_prefix))
            .count()
    }

    /// Answer matching requests with `status` and an error body
    pub fn fail(&self, method: &str, path_prefix: &str, status: u16) {
        self.respond_raw(method, path_prefix, status, r#"{"message":"forced failure"}"#);
    }

    /// Answer matching requests with a fixed status and body
    pub fn respond_raw(&self, method: &str, path_prefix: &str, status: u16, body: &str) {
        self.lock().canned.push(CannedResponse {
            method: method.to_string(),
            path_prefix: path_prefix.to_string(),
            status,
            body: body.to_string(),
        });
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

fn json_response(status: StatusCode, body: String) -> Response {
    (status, [(header::CONTENT_TYPE, "application/json")], body).into_response()
}

/// `column=eq.value` pairs from the query string
fn eq_filters(query: &str) -> Vec<(String, String)> {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .filter_map(|(column, value)| {
            value
                .strip_prefix("eq.")
                .map(|v| (column.to_string(), v.to_string()))
        })
        .collect()
}

fn row_matches(row: &Value, filters: &[(String, String)]) -> bool {
    filters.iter().all(|(column, expected)| match row.get(column) {
        Some(Value::String(s)) => s == expected,
        Some(other) => other.to_string() == *expected,
        None => false,
    })
}

async fn handle(
    State(state): State<Shared>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = uri.path().to_string();
    let query = uri.query().unwrap_or_default().to_string();
    let request = RecordedRequest {
        method: method.to_string(),
        path: path.clone(),
        query: query.clone(),
        apikey: header_string(&headers, "apikey"),
        authorization: header_string(&headers, "authorization"),
        prefer: header_string(&headers, "prefer"),
        content_type: header_string(&headers, "content-type"),
    };

    let mut state = state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    state.requests.push(request.clone());

    if let Some(canned) = state
        .canned
        .iter()
        .find(|c| c.method == request.method && path.starts_with(&c.path_prefix))
    {
        let status = StatusCode::from_u16(canned.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return json_response(status, canned.body.clone());
    }

    if request.apikey.as_deref() != Some(FAKE_API_KEY) {
        return json_response(
            StatusCode::UNAUTHORIZED,
            r#"{"message":"Invalid API key"}"#.to_string(),
        );
    }

    if let Some(table) = path.strip_prefix("/rest/v1/") {
        let filters = eq_filters(&query);
        let rows = state.tables.entry(table.to_string()).or_default();
        return match method {
            Method::GET => {
                let matching: Vec<&Value> = rows.iter().filter(|r| row_matches(r, &filters)).collect();
                json_response(StatusCode::OK, serde_json::to_string(&matching).unwrap_or_default())
            }
            Method::POST => {
                let inserted: Vec<Value> = match serde_json::from_slice::<Value>(&body) {
                    Ok(Value::Array(items)) => items,
                    Ok(item @ Value::Object(_)) => vec![item],
                    _ => {
                        return json_response(
                            StatusCode::BAD_REQUEST,
                            r#"{"message":"invalid JSON"}"#.to_string(),
                        )
                    }
                };
                rows.extend(inserted.iter().cloned());
                let wants_row = request
                    .prefer
                    .as_deref()
                    .is_some_and(|p| p.contains("return=representation"));
                if wants_row {
                    json_response(
                        StatusCode::CREATED,
                        serde_json::to_string(&inserted).unwrap_or_default(),
                    )
                } else {
                    StatusCode::CREATED.into_response()
                }
            }
            Method::PATCH => {
                let changes = match serde_json::from_slice::<Value>(&body) {
                    Ok(Value::Object(changes)) => changes,
                    _ => {
                        return json_response(
                            StatusCode::BAD_REQUEST,
                            r#"{"message":"invalid JSON"}"#.to_string(),
                        )
                    }
                };
                for row in rows.iter_mut().filter(|r| row_matches(r, &filters)) {
                    if let Value::Object(fields) = row {
                        for (key, value) in &changes {
                            fields.insert(key.clone(), value.clone());
                        }
                    }
                }
                StatusCode::NO_CONTENT.into_response()
            }
            Method::DELETE => {
                rows.retain(|r| !row_matches(r, &filters));
                StatusCode::NO_CONTENT.into_response()
            }
            _ => StatusCode::METHOD_NOT_ALLOWED.into_response(),
        };
    }

    if let Some(encoded) = path.strip_prefix("/storage/v1/object/") {
        let key = urlencoding::decode(encoded)
            .map(|k| k.into_owned())
            .unwrap_or_else(|_| encoded.to_string());
        let key = key.as_str();
        return match method {
            Method::POST => {
                let is_multipart = request
                    .content_type
                    .as_deref()
                    .is_some_and(|c| c.starts_with("multipart/form-data"));
                if !is_multipart {
                    return json_response(
                        StatusCode::BAD_REQUEST,
                        r#"{"message":"expected multipart"}"#.to_string(),
                    );
                }
                state.objects.insert(key.to_string(), body.len());
                json_response(StatusCode::OK, format!(r#"{{"Key":"{}"}}"#, key))
            }
            Method::DELETE => {
                if state.objects.remove(key).is_some() {
                    json_response(StatusCode::OK, r#"{"message":"Successfully deleted"}"#.to_string())
                } else {
                    json_response(
                        StatusCode::NOT_FOUND,
                        r#"{"message":"Object not found"}"#.to_string(),
                    )
                }
            }
            _ => StatusCode::METHOD_NOT_ALLOWED.into_response(),
        };
    }

    StatusCode::NOT_FOUND.into_response()
}
