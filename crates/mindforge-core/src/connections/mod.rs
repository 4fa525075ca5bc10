//! External API connection records.
//!
//! A connection's `state` is only ever changed by a connection test, which
//! the store runs as a delayed timer task through a [`ConnectionProbe`].

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApiKind {
    #[serde(rename = "REST")]
    Rest,
    #[serde(rename = "GraphQL")]
    GraphQl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Active,
    Inactive,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConnection {
    pub id: String,
    pub name: String,
    pub url: String,
    pub kind: ApiKind,
    pub method: HttpMethod,
    pub headers: BTreeMap<String, String>,
    pub state: ConnectionState,
    pub last_access: Option<DateTime<Utc>>,
    pub clone_authorized: bool,
    pub interpretation_notes: String,
    /// Reason for the last failed test.
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewConnection {
    pub name: String,
    pub url: String,
    pub kind: ApiKind,
    pub method: HttpMethod,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub clone_authorized: bool,
    #[serde(default)]
    pub interpretation_notes: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectionPatch {
    pub name: Option<String>,
    pub url: Option<String>,
    pub kind: Option<ApiKind>,
    pub method: Option<HttpMethod>,
    pub headers: Option<BTreeMap<String, String>>,
    pub clone_authorized: Option<bool>,
    pub interpretation_notes: Option<String>,
}

fn validate_fields(name: &str, url: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::MissingField("name"));
    }
    if url.trim().is_empty() {
        return Err(ValidationError::MissingField("url"));
    }
    Ok(())
}

impl NewConnection {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_fields(&self.name, &self.url)
    }

    pub fn build(self) -> ApiConnection {
        ApiConnection {
            id: format!("conn-{}", uuid::Uuid::new_v4()),
            name: self.name,
            url: self.url,
            kind: self.kind,
            method: self.method,
            headers: self.headers,
            state: ConnectionState::Inactive,
            last_access: None,
            clone_authorized: self.clone_authorized,
            interpretation_notes: self.interpretation_notes,
            last_error: None,
        }
    }
}

impl ApiConnection {
    pub fn apply(&mut self, patch: ConnectionPatch) -> Result<(), ValidationError> {
        validate_fields(
            patch.name.as_deref().unwrap_or(&self.name),
            patch.url.as_deref().unwrap_or(&self.url),
        )?;
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(url) = patch.url {
            self.url = url;
        }
        if let Some(kind) = patch.kind {
            self.kind = kind;
        }
        if let Some(method) = patch.method {
            self.method = method;
        }
        if let Some(headers) = patch.headers {
            self.headers = headers;
        }
        if let Some(clone_authorized) = patch.clone_authorized {
            self.clone_authorized = clone_authorized;
        }
        if let Some(notes) = patch.interpretation_notes {
            self.interpretation_notes = notes;
        }
        Ok(())
    }

    /// Record a finished test.
    pub fn record_test(&mut self, result: Result<(), ProbeError>) {
        self.last_access = Some(Utc::now());
        match result {
            Ok(()) => {
                self.state = ConnectionState::Active;
                self.last_error = None;
            }
            Err(e) => {
                self.state = ConnectionState::Error;
                self.last_error = Some(e.to_string());
            }
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("{0}")]
pub struct ProbeError(pub String);

/// Decides whether a connection is reachable.
pub trait ConnectionProbe: Send + Sync {
    fn probe(&self, connection: &ApiConnection) -> Result<(), ProbeError>;
}

/// Offline probe: a connection passes when its URL is an absolute http(s)
/// URL with a host and its method fits its kind.
#[derive(Debug, Clone, Copy, Default)]
pub struct UrlProbe;

impl ConnectionProbe for UrlProbe {
    fn probe(&self, connection: &ApiConnection) -> Result<(), ProbeError> {
        let url = Url::parse(&connection.url)
            .map_err(|e| ProbeError(format!("invalid URL '{}': {e}", connection.url)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ProbeError(format!("unsupported scheme '{}'", url.scheme())));
        }
        if url.host_str().map_or(true, str::is_empty) {
            return Err(ProbeError("URL has no host".into()));
        }
        if connection.kind == ApiKind::GraphQl
            && !matches!(connection.method, HttpMethod::Get | HttpMethod::Post)
        {
            return Err(ProbeError("GraphQL endpoints accept only GET or POST".into()));
        }
        Ok(())
    }
}
