use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::Url;
use serde_json::Value;
use thiserror::Error;

use super::request::{FormValue, Method, Payload, RequestDescriptor};
use crate::error::{AppError, AppResult};
use crate::identity::Session;

/// Header carrying the session user's role string.
pub const ROLES_HEADER: &str = "roles";

/// Credentials attached to an outbound call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthHeaders {
    pub authorization: String,
    pub roles: String,
}

impl AuthHeaders {
    pub fn for_session(session: &Session) -> Self {
        Self {
            authorization: format!("Bearer {}", session.token),
            roles: session.user.roles.to_header_value(),
        }
    }
}

/// What came back over the wire, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Value,
}

#[derive(Debug, Error)]
pub enum TransportError {
    /// The request never produced a response.
    #[error("no response from {url}: {message}")]
    NoResponse { url: String, message: String },
    /// The request could not be built.
    #[error("invalid request to {url}: {message}")]
    InvalidRequest { url: String, message: String },
}

/// Sends one prepared request. Any HTTP status is a successful send.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, req: &RequestDescriptor, auth: Option<&AuthHeaders>) -> Result<RawResponse, TransportError>;
}

/// reqwest-backed transport against the records API.
#[derive(Clone)]
pub struct HttpTransport {
    base: Url,
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(base: &str, timeout: Option<Duration>) -> AppResult<Self> {
        let base = Url::parse(base)
            .map_err(|e| AppError::config("invalid_api_url".to_string(), format!("{}: {}", base, e)))?;
        let mut builder = reqwest::Client::builder();
        if let Some(t) = timeout { builder = builder.timeout(t); }
        let client = builder
            .build()
            .map_err(|e| AppError::config("http_client".to_string(), e.to_string()))?;
        Ok(Self { base, client })
    }

    /// Resolve an API path against the base, keeping any path prefix the base carries.
    fn resolve(&self, path: &str) -> Result<Url, TransportError> {
        if path.starts_with("http://") || path.starts_with("https://") {
            return Url::parse(path).map_err(|e| TransportError::InvalidRequest { url: path.to_string(), message: e.to_string() });
        }
        let joined = format!("{}/{}", self.base.as_str().trim_end_matches('/'), path.trim_start_matches('/'));
        Url::parse(&joined).map_err(|e| TransportError::InvalidRequest { url: joined.clone(), message: e.to_string() })
    }

    fn headers(auth: Option<&AuthHeaders>, url: &str) -> Result<HeaderMap, TransportError> {
        let mut headers = HeaderMap::new();
        let Some(auth) = auth else { return Ok(headers); };
        let invalid = |e: reqwest::header::InvalidHeaderValue| TransportError::InvalidRequest { url: url.to_string(), message: e.to_string() };
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&auth.authorization).map_err(invalid)?);
        // Role tokens are not limited to ASCII; send the string's bytes as-is.
        headers.insert(HeaderName::from_static(ROLES_HEADER), HeaderValue::from_bytes(auth.roles.as_bytes()).map_err(invalid)?);
        Ok(headers)
    }

    fn multipart(payload: Option<Payload>, url: &str) -> Result<reqwest::multipart::Form, TransportError> {
        let mut form = reqwest::multipart::Form::new();
        let fields = payload.map(Payload::into_form_fields).unwrap_or_default();
        for field in fields {
            form = match field.value {
                FormValue::Text(text) => form.text(field.name, text),
                FormValue::File { file_name, content_type, bytes } => {
                    let mut part = reqwest::multipart::Part::bytes(bytes).file_name(file_name);
                    if let Some(ct) = content_type {
                        part = part.mime_str(&ct).map_err(|e| TransportError::InvalidRequest { url: url.to_string(), message: e.to_string() })?;
                    }
                    form.part(field.name, part)
                }
            };
        }
        Ok(form)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, req: &RequestDescriptor, auth: Option<&AuthHeaders>) -> Result<RawResponse, TransportError> {
        let url = self.resolve(&req.url)?;
        let url_str = url.to_string();
        let mut builder = self
            .client
            .request(req.method.http_method(), url)
            .headers(Self::headers(auth, &url_str)?);
        if !req.params.is_empty() {
            builder = builder.query(&req.params);
        }
        builder = match (req.method, req.payload.clone()) {
            (Method::Upload, payload) => builder.multipart(Self::multipart(payload, &url_str)?),
            (_, Some(Payload::Form(fields))) => builder.multipart(Self::multipart(Some(Payload::Form(fields)), &url_str)?),
            (_, Some(Payload::Json(body))) => builder.json(&body),
            (_, None) => builder,
        };

        let resp = builder
            .send()
            .await
            .map_err(|e| TransportError::NoResponse { url: url_str.clone(), message: e.to_string() })?;
        let status = resp.status().as_u16();
        // A body that fails to arrive or is not JSON is kept as text (or dropped when empty).
        let text = resp.text().await.unwrap_or_default();
        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };
        Ok(RawResponse { status, body })
    }
}
