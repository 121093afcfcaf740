//! Executes `HttpRequest` values against the network.
//!
//! # Design
//! The `Transport` trait is the host side of the host-does-IO split. Status
//! codes are data, not transport errors: a 4xx/5xx comes back as an
//! `HttpResponse` so `ProdexClient::parse_*` can classify it. Only failures
//! to complete the round trip become `ApiError::Transport`. No retries.

use std::time::Duration;

use crate::error::{ApiError, Result};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

pub trait Transport {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        (**self).execute(request)
    }
}

/// Blocking transport backed by a `ureq` agent.
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new(timeout: Option<Duration>) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(timeout)
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        tracing::debug!(method = request.method.as_str(), path = %request.path, "executing request");
        let HttpRequest {
            method,
            path,
            query,
            headers,
            body,
        } = request;
        let query = query.iter().map(|(k, v)| (k.as_str(), v.as_str()));

        let result = match method {
            HttpMethod::Get => {
                let mut builder = self.agent.get(&path).query_pairs(query);
                for (name, value) in &headers {
                    builder = builder.header(name, value);
                }
                builder.call()
            }
            HttpMethod::Delete => {
                let mut builder = self.agent.delete(&path).query_pairs(query);
                for (name, value) in &headers {
                    builder = builder.header(name, value);
                }
                builder.call()
            }
            HttpMethod::Options => {
                let mut builder = self.agent.options(&path).query_pairs(query);
                for (name, value) in &headers {
                    builder = builder.header(name, value);
                }
                builder.call()
            }
            HttpMethod::Post | HttpMethod::Patch => {
                let mut builder = match method {
                    HttpMethod::Post => self.agent.post(&path),
                    _ => self.agent.patch(&path),
                }
                .query_pairs(query);
                for (name, value) in &headers {
                    builder = builder.header(name, value);
                }
                match body {
                    Some(body) => builder.send(&body[..]),
                    None => builder.send_empty(),
                }
            }
        };

        let mut response = result.map_err(|e| ApiError::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| Some((name.as_str().to_string(), value.to_str().ok()?.to_string())))
            .collect();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        tracing::debug!(status, "received response");

        Ok(HttpResponse { status, headers, body })
    }
}
