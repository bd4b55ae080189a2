use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};

use crate::{Attachment, HttpMethod, TransportError};

/// One HTTP exchange handed to a [`Transport`].
///
/// The failover client has already applied the method rules: `body` is `None`
/// for GET and DELETE, `attachments` is empty for anything but POST.
#[derive(Clone, Debug, PartialEq)]
pub struct TransportRequest {
    pub url: String,
    pub method: HttpMethod,
    pub headers: BTreeMap<String, String>,
    pub query: BTreeMap<String, String>,
    pub body: Option<serde_json::Value>,
    pub attachments: Vec<Attachment>,
    pub timeout: Duration,
}

/// Response as received from the wire.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// Returns the first header matching `name`, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// HTTP capability used by [`FailoverClient`](crate::FailoverClient).
///
/// Implementations perform a single exchange; retries and failover are
/// handled by the client.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError>;
}

/// Default [`Transport`] backed by a pooled `reqwest` client.
#[derive(Clone, Default)]
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReqwestTransport").finish_non_exhaustive()
    }
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps a preconfigured client (proxies, TLS roots, default headers).
    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let TransportRequest {
            url,
            method,
            headers,
            query,
            body,
            attachments,
            timeout,
        } = request;

        let mut builder = self.http.request(method.into(), &url).timeout(timeout);
        if !query.is_empty() {
            builder = builder.query(&query);
        }
        for (name, value) in &headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        if !attachments.is_empty() {
            builder = builder.multipart(build_form(body, attachments)?);
        } else if let Some(body) = body {
            builder = builder.json(&body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_owned(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response.bytes().await?.to_vec();

        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}

/// Builds a multipart form from file parts plus an optional JSON body.
///
/// Object bodies become one text field per top-level key; any other body is
/// sent as a single `payload` field.
fn build_form(
    body: Option<serde_json::Value>,
    attachments: Vec<Attachment>,
) -> Result<Form, TransportError> {
    let mut form = Form::new();

    match body {
        Some(serde_json::Value::Object(fields)) => {
            for (name, value) in fields {
                form = form.text(name, form_text(value));
            }
        }
        Some(other) => form = form.text("payload", other.to_string()),
        None => {}
    }

    for attachment in attachments {
        let mut part = Part::bytes(attachment.bytes);
        if let Some(file_name) = attachment.file_name {
            part = part.file_name(file_name);
        }
        if let Some(content_type) = attachment.content_type {
            part = part
                .mime_str(&content_type)
                .map_err(|err| TransportError::Request(err.to_string()))?;
        }
        form = form.part(attachment.field, part);
    }

    Ok(form)
}

fn form_text(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(text) => text,
        other => other.to_string(),
    }
}
