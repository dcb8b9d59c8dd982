//! Generic request executor.
//!
//! Turns an [`ApiCall`] (relative endpoint, verb, optional JSON body, auth
//! flag) into an [`HttpRequest`] with the standard headers, sends it through an
//! [`HttpTransport`] and normalizes the outcome. Credentials are not attached
//! here; see [`crate::session::SessionManager::attach_credentials`].

use reqwest::{
    Url,
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue},
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::{
    error::ApiError,
    transport::{HttpRequest, HttpTransport, Method},
};

/// Relative paths of the remote service.
pub mod endpoint {
    pub const LOGIN: &str = "/api/auth/login";
    pub const REGISTER: &str = "/api/auth/register";
    pub const LOGOUT: &str = "/api/auth/logout";
    pub const REFRESH: &str = "/api/auth/refresh";
    pub const WEATHER_CURRENT: &str = "/api/weather/current";
    pub const WEATHER_HISTORY: &str = "/api/weather/history";
    pub const PROFILE: &str = "/api/profile";
    pub const HEALTH: &str = "/api/health";
}

const JSON: &str = "application/json";

/// Description of one call against the API.
#[derive(Debug, Clone)]
pub struct ApiCall {
    pub endpoint: String,
    pub method: Method,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub requires_auth: bool,
}

impl ApiCall {
    pub fn new(method: Method, endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            method,
            query: Vec::new(),
            body: None,
            requires_auth: true,
        }
    }

    pub fn get(endpoint: impl Into<String>) -> Self {
        Self::new(Method::Get, endpoint)
    }

    pub fn post(endpoint: impl Into<String>) -> Self {
        Self::new(Method::Post, endpoint)
    }

    pub fn put(endpoint: impl Into<String>) -> Self {
        Self::new(Method::Put, endpoint)
    }

    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, ApiError> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Marks the call as one that must never carry credentials.
    pub fn without_auth(mut self) -> Self {
        self.requires_auth = false;
        self
    }
}

/// Error body shape the server uses on failures. Both fields are optional.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RequestExecutor {
    base_url: String,
    transport: Arc<dyn HttpTransport>,
}

impl RequestExecutor {
    pub fn new(base_url: impl Into<String>, transport: Arc<dyn HttpTransport>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            transport,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Builds the request with content-type and accept headers. The body is
    /// dropped for verbs that do not carry one.
    pub fn build(&self, call: &ApiCall) -> Result<HttpRequest, ApiError> {
        let raw = format!("{}{}", self.base_url, call.endpoint);
        let mut url = Url::parse(&raw).map_err(|e| ApiError::InvalidUrl {
            url: raw.clone(),
            reason: e.to_string(),
        })?;

        if !call.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &call.query {
                pairs.append_pair(key, value);
            }
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON));
        headers.insert(ACCEPT, HeaderValue::from_static(JSON));

        let body = if call.method.carries_body() {
            call.body.clone()
        } else {
            None
        };

        Ok(HttpRequest {
            method: call.method,
            url,
            headers,
            body,
        })
    }

    /// Sends a built request and returns the decoded JSON body on success.
    ///
    /// An empty success body decodes to `Value::Null`. A non-success status
    /// becomes [`ApiError::Http`] whether or not the body is readable.
    pub async fn dispatch(&self, request: HttpRequest) -> Result<Value, ApiError> {
        let method = request.method;
        let url = request.url.to_string();

        debug!(
            %method,
            %url,
            headers = ?redacted_headers(&request.headers),
            body = ?request.body,
            "API request"
        );

        let response = match self.transport.send(request).await {
            Ok(response) => response,
            Err(err) => {
                debug!(%method, %url, error = %err, "API request failed");
                return Err(err);
            }
        };

        debug!(
            %method,
            %url,
            status = response.status,
            body = %truncate_body(&response.body),
            "API response"
        );

        if !response.is_success() {
            let detail: ErrorBody = serde_json::from_str(&response.body).unwrap_or_default();
            return Err(ApiError::from_status(
                response.status,
                non_empty(detail.error),
                non_empty(detail.message),
            ));
        }

        if response.body.trim().is_empty() {
            return Ok(Value::Null);
        }

        Ok(serde_json::from_str(&response.body)?)
    }
}

/// Decodes a payload returned by [`RequestExecutor::dispatch`] into `T`.
pub fn decode<T: DeserializeOwned>(value: Value) -> Result<T, ApiError> {
    Ok(serde_json::from_value(value)?)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

fn redacted_headers(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            let shown = if name == AUTHORIZATION {
                "Bearer <redacted>".to_string()
            } else {
                value.to_str().unwrap_or("<binary>").to_string()
            };
            (name.to_string(), shown)
        })
        .collect()
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    } else {
        body.to_string()
    }
}
