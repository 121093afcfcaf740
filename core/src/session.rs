//! Authenticated, high-level access to the Prodex API.
//!
//! `Prodex` pairs a `ProdexClient` with a `Transport` and runs each build,
//! execute and parse step in one call. A failed compilation returns before
//! the transport is touched.

use std::fmt;

use serde_json::{Map, Value};

use crate::client::ProdexClient;
use crate::config::ClientConfig;
use crate::error::Result;
use crate::m2m::M2MModes;
use crate::query::FindQuery;
use crate::transport::{Transport, UreqTransport};
use crate::types::{Session, Thumbnail};

pub struct Prodex<T: Transport> {
    client: ProdexClient,
    transport: T,
    session: Session,
}

impl Prodex<UreqTransport> {
    /// Authenticate over a `ureq` transport configured from `config`.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Self::connect(config, UreqTransport::new(config.timeout()))
    }
}

impl<T: Transport> Prodex<T> {
    /// Exchange credentials for a token. Every later call carries it.
    pub fn connect(config: &ClientConfig, transport: T) -> Result<Self> {
        let mut client = ProdexClient::new(&config.url);
        let req = client.build_authenticate(&config.login, &config.password)?;
        let session = client.parse_authenticate(transport.execute(req)?)?;
        client.set_token(session.token.clone());
        tracing::info!(api_url = client.api_url(), login = %config.login, "connected to prodex");
        Ok(Self {
            client,
            transport,
            session,
        })
    }

    /// The authenticated user as returned by the token endpoint.
    pub fn user(&self) -> &Value {
        &self.session.user
    }

    pub fn client(&self) -> &ProdexClient {
        &self.client
    }

    pub fn find(&self, model: &str, query: &FindQuery) -> Result<Vec<Value>> {
        let req = self.client.build_find(model, query)?;
        self.client.parse_find(self.transport.execute(req)?)
    }

    pub fn create(&self, model: &str, data: Map<String, Value>, thumbnail: Option<&Thumbnail>) -> Result<Value> {
        let req = self.client.build_create(model, data, thumbnail)?;
        self.client.parse_create(self.transport.execute(req)?)
    }

    /// Partial update. When `modes` is non-empty the governed list fields
    /// are fetched first and reconciled before the update is sent.
    pub fn update(
        &self,
        model: &str,
        id: impl fmt::Display,
        data: Map<String, Value>,
        modes: &M2MModes,
        thumbnail: Option<&Thumbnail>,
    ) -> Result<Value> {
        let req = if modes.is_empty() {
            self.client.build_update(model, &id, data, thumbnail)?
        } else {
            let fetch = self.client.build_m2m_fetch(model, &id, modes)?;
            let initial = self.client.parse_m2m_fetch(model, &id, self.transport.execute(fetch)?)?;
            self.client.build_update_m2m(model, &id, data, &initial, modes, thumbnail)?
        };
        self.client.parse_update(self.transport.execute(req)?)
    }

    pub fn delete(&self, model: &str, id: impl fmt::Display) -> Result<Value> {
        let req = self.client.build_delete(model, id)?;
        self.client.parse_delete(self.transport.execute(req)?)
    }

    pub fn restore(&self, model: &str, id: impl fmt::Display) -> Result<Value> {
        let req = self.client.build_restore(model, id)?;
        self.client.parse_restore(self.transport.execute(req)?)
    }

    pub fn schema_fields(&self, model: &str) -> Result<Vec<String>> {
        let req = self.client.build_schema_fields(model)?;
        self.client.parse_schema_fields(self.transport.execute(req)?)
    }

    pub fn schema(&self, model: &str) -> Result<Value> {
        let req = self.client.build_schema(model)?;
        self.client.parse_schema(self.transport.execute(req)?)
    }
}
