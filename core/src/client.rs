//! Stateless HTTP request builder and response parser for the Prodex API.
//!
//! # Design
//! `ProdexClient` holds only the API base URL and the session token. Each
//! operation is split into a `build_*` method that produces an
//! `HttpRequest` and a `parse_*` method that consumes an `HttpResponse`. The
//! caller executes the round trip, keeping the core deterministic and free of
//! I/O.
//!
//! Every `build_*` that names a model resolves it through
//! `Endpoint::resolve` before compiling anything, so an unknown model never
//! gets as far as filter compilation or payload normalization.

use std::fmt;

use serde_json::{Map, Value};

use crate::error::{ApiError, Result};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::m2m::{merge_m2m, M2MModes};
use crate::models::Endpoint;
use crate::multipart;
use crate::normalize::normalize_payload;
use crate::query::FindQuery;
use crate::types::{Credentials, Session, Thumbnail};

/// Synchronous, stateless client for the Prodex API.
#[derive(Debug, Clone)]
pub struct ProdexClient {
    api_url: String,
    token: Option<String>,
}

impl ProdexClient {
    /// `url` is the server root; `/api` is appended after trailing slashes
    /// are stripped.
    pub fn new(url: &str) -> Self {
        Self {
            api_url: format!("{}/api", url.trim_end_matches('/')),
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn set_token(&mut self, token: impl Into<String>) {
        self.token = Some(token.into());
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn request(&self, method: HttpMethod, path: String) -> HttpRequest {
        let mut req = HttpRequest::new(method, path);
        if let Some(token) = &self.token {
            req.headers.push(("authorization".to_string(), format!("Token {token}")));
        }
        req
    }

    fn collection_url(&self, endpoint: Endpoint) -> String {
        format!("{}/{}/", self.api_url, endpoint.path())
    }

    fn record_url(&self, endpoint: Endpoint, id: &dyn fmt::Display) -> String {
        format!("{}/{}/{id}/", self.api_url, endpoint.path())
    }

    fn write_request(&self, method: HttpMethod, path: String, data: &Map<String, Value>, thumbnail: Option<&Thumbnail>) -> Result<HttpRequest> {
        let mut req = self.request(method, path);
        let (content_type, body) = match thumbnail {
            Some(thumbnail) => multipart::encode(data, thumbnail),
            None => {
                let body = serde_json::to_vec(data).map_err(|e| ApiError::Serialization(e.to_string()))?;
                ("application/json".to_string(), body)
            }
        };
        req.headers.push(("content-type".to_string(), content_type));
        req.body = Some(body);
        tracing::debug!(method = method.as_str(), path = %req.path, "built write request");
        Ok(req)
    }

    // -----------------------------------------------------------------------
    // Authentication
    // -----------------------------------------------------------------------

    pub fn build_authenticate(&self, login: &str, password: &str) -> Result<HttpRequest> {
        let credentials = Credentials {
            username: login,
            password,
        };
        let body = serde_json::to_vec(&credentials).map_err(|e| ApiError::Serialization(e.to_string()))?;
        let mut req = HttpRequest::new(HttpMethod::Post, format!("{}/token-auth/", self.api_url));
        req.headers.push(("content-type".to_string(), "application/json".to_string()));
        req.body = Some(body);
        Ok(req)
    }

    pub fn parse_authenticate(&self, response: HttpResponse) -> Result<Session> {
        check_status(&response, &[200])?;
        let value: Value = parse_json(&response)?;
        let token = value
            .get("token")
            .and_then(Value::as_str)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| ApiError::AuthFailed(response.body.clone()))?;
        Ok(Session {
            token: token.to_string(),
            user: value.get("user").cloned().unwrap_or(Value::Null),
        })
    }

    // -----------------------------------------------------------------------
    // Read
    // -----------------------------------------------------------------------

    pub fn build_find(&self, model: &str, query: &FindQuery) -> Result<HttpRequest> {
        let endpoint = Endpoint::resolve(model)?;
        let params = query.compile()?;
        let mut req = self.request(HttpMethod::Get, self.collection_url(endpoint));
        tracing::debug!(model, ?params, "compiled find query");
        req.query = params.into_iter().collect();
        Ok(req)
    }

    pub fn parse_find(&self, response: HttpResponse) -> Result<Vec<Value>> {
        check_status(&response, &[200])?;
        parse_json(&response)
    }

    /// Fetch the current value of the fields governed by `modes`.
    pub fn build_m2m_fetch(&self, model: &str, id: impl fmt::Display, modes: &M2MModes) -> Result<HttpRequest> {
        let query = FindQuery::new()
            .filter("id", "=", id.to_string())
            .fields(modes.keys().cloned());
        self.build_find(model, &query)
    }

    /// Extract the fetched record; fails with `RecordNotFound` when the
    /// server returned no match.
    pub fn parse_m2m_fetch(&self, model: &str, id: impl fmt::Display, response: HttpResponse) -> Result<Map<String, Value>> {
        let records = self.parse_find(response)?;
        let mut record = match records.into_iter().next() {
            Some(Value::Object(record)) => record,
            Some(other) => {
                return Err(ApiError::Deserialization(format!("expected a record object, got {other}")));
            }
            None => {
                return Err(ApiError::RecordNotFound {
                    model: model.to_string(),
                    id: id.to_string(),
                });
            }
        };
        normalize_payload(&mut record)?;
        Ok(record)
    }

    // -----------------------------------------------------------------------
    // Write
    // -----------------------------------------------------------------------

    pub fn build_create(&self, model: &str, mut data: Map<String, Value>, thumbnail: Option<&Thumbnail>) -> Result<HttpRequest> {
        let endpoint = Endpoint::resolve(model)?;
        normalize_payload(&mut data)?;
        self.write_request(HttpMethod::Post, self.collection_url(endpoint), &data, thumbnail)
    }

    pub fn parse_create(&self, response: HttpResponse) -> Result<Value> {
        check_status(&response, &[201])?;
        parse_json(&response)
    }

    /// Partial update of record `id`.
    pub fn build_update(&self, model: &str, id: impl fmt::Display, mut data: Map<String, Value>, thumbnail: Option<&Thumbnail>) -> Result<HttpRequest> {
        let endpoint = Endpoint::resolve(model)?;
        normalize_payload(&mut data)?;
        self.write_request(HttpMethod::Patch, self.record_url(endpoint, &id), &data, thumbnail)
    }

    /// Partial update where the fields in `modes` are reconciled against
    /// `initial`, the record returned by `parse_m2m_fetch`.
    pub fn build_update_m2m(
        &self,
        model: &str,
        id: impl fmt::Display,
        mut data: Map<String, Value>,
        initial: &Map<String, Value>,
        modes: &M2MModes,
        thumbnail: Option<&Thumbnail>,
    ) -> Result<HttpRequest> {
        let endpoint = Endpoint::resolve(model)?;
        normalize_payload(&mut data)?;
        let data = merge_m2m(initial, &data, modes)?;
        self.write_request(HttpMethod::Patch, self.record_url(endpoint, &id), &data, thumbnail)
    }

    pub fn parse_update(&self, response: HttpResponse) -> Result<Value> {
        check_status(&response, &[200])?;
        parse_json(&response)
    }

    // -----------------------------------------------------------------------
    // Trash
    // -----------------------------------------------------------------------

    /// Soft delete; deleting a trashed record deletes it for good.
    pub fn build_delete(&self, model: &str, id: impl fmt::Display) -> Result<HttpRequest> {
        let endpoint = Endpoint::resolve(model)?;
        Ok(self.request(HttpMethod::Delete, self.record_url(endpoint, &id)))
    }

    /// Returns the trashed record, or `Value::Null` when the server answered
    /// without a body.
    pub fn parse_delete(&self, response: HttpResponse) -> Result<Value> {
        check_status(&response, &[200, 204])?;
        if response.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        parse_json(&response)
    }

    pub fn build_restore(&self, model: &str, id: impl fmt::Display) -> Result<HttpRequest> {
        let endpoint = Endpoint::resolve(model)?;
        Ok(self.request(HttpMethod::Patch, format!("{}restore/", self.record_url(endpoint, &id))))
    }

    pub fn parse_restore(&self, response: HttpResponse) -> Result<Value> {
        check_status(&response, &[200])?;
        parse_json(&response)
    }

    // -----------------------------------------------------------------------
    // Schema
    // -----------------------------------------------------------------------

    /// Plain list of field names.
    pub fn build_schema_fields(&self, model: &str) -> Result<HttpRequest> {
        let endpoint = Endpoint::resolve(model)?;
        Ok(self.request(HttpMethod::Get, format!("{}fields/", self.collection_url(endpoint))))
    }

    pub fn parse_schema_fields(&self, response: HttpResponse) -> Result<Vec<String>> {
        check_status(&response, &[200])?;
        parse_json(&response)
    }

    /// Per-action field metadata.
    pub fn build_schema(&self, model: &str) -> Result<HttpRequest> {
        let endpoint = Endpoint::resolve(model)?;
        Ok(self.request(HttpMethod::Options, self.collection_url(endpoint)))
    }

    pub fn parse_schema(&self, response: HttpResponse) -> Result<Value> {
        check_status(&response, &[200])?;
        let mut value: Value = parse_json(&response)?;
        match value.get_mut("actions").map(Value::take) {
            Some(actions) => Ok(actions),
            None => Ok(value),
        }
    }
}

/// Map non-expected status codes to the matching `ApiError` variant.
fn check_status(response: &HttpResponse, expected: &[u16]) -> Result<()> {
    if expected.contains(&response.status) {
        return Ok(());
    }
    tracing::warn!(status = response.status, ?expected, "unexpected status");
    Err(ApiError::from_status(response.status, response.body.clone()))
}

fn parse_json<T: serde::de::DeserializeOwned>(response: &HttpResponse) -> Result<T> {
    serde_json::from_str(&response.body).map_err(|e| ApiError::Deserialization(e.to_string()))
}
