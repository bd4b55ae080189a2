use serde::de::DeserializeOwned;

use crate::{AttemptError, TransportResponse};

/// Backend service tried during failover. Position in the client's list is
/// its priority.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceDescriptor {
    pub name: String,
    pub base_url: String,
}

impl ServiceDescriptor {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
        }
    }

    /// Three placeholder services on localhost, handy for local development.
    pub fn local_defaults() -> Vec<Self> {
        vec![
            Self::new("Flask", "http://localhost:5000/api"),
            Self::new("FastAPI", "http://localhost:8000/api"),
            Self::new("Django", "http://localhost:8080/api"),
        ]
    }
}

/// Normalized response payload.
#[derive(Clone, Debug, PartialEq)]
pub enum ResponseBody {
    /// The service returned no payload.
    Empty,
    /// Payload decoded as JSON.
    Json(serde_json::Value),
    /// Payload that is not valid JSON, decoded lossily as UTF-8.
    Text(String),
}

impl ResponseBody {
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

/// Successful outcome of [`FailoverClient::dispatch`](crate::FailoverClient::dispatch).
#[derive(Clone, Debug, PartialEq)]
pub struct RequestResult {
    /// Name of the service that answered.
    pub service_name: String,
    pub status: u16,
    pub body: ResponseBody,
}

impl RequestResult {
    /// Deserializes a JSON body into `T`.
    ///
    /// Returns `None` when the body is empty or not JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Option<serde_json::Result<T>> {
        self.body
            .as_json()
            .map(|value| serde_json::from_value(value.clone()))
    }
}

/// Untouched transport response, returned by
/// [`FailoverClient::dispatch_raw`](crate::FailoverClient::dispatch_raw).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawResponse {
    pub service_name: String,
    pub response: TransportResponse,
}

/// Result of one attempt against one service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttemptOutcome {
    pub succeeded: bool,
    /// Status code, when the service answered at all.
    pub status: Option<u16>,
    pub error: Option<AttemptError>,
}

impl AttemptOutcome {
    pub(crate) fn from_result(result: &Result<TransportResponse, AttemptError>) -> Self {
        match result {
            Ok(response) => Self {
                succeeded: true,
                status: Some(response.status),
                error: None,
            },
            Err(error) => Self {
                succeeded: false,
                status: match error {
                    AttemptError::HttpStatus { status, .. } => Some(*status),
                    _ => None,
                },
                error: Some(error.clone()),
            },
        }
    }
}
