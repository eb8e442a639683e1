use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::header::{self, HeaderName};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use reqwest::Client;
use serde_json::Value;

use crate::errors::{AppError, AppResult};

/// Backend status and body, relayed to the caller as-is.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendReply {
    pub status: StatusCode,
    pub body: Option<Value>,
}

impl IntoResponse for BackendReply {
    fn into_response(self) -> Response {
        match self.body {
            Some(body) => (self.status, Json(body)).into_response(),
            None => self.status.into_response(),
        }
    }
}

/// JSON client for the backend API.
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> AppResult<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.into(),
        })
    }

    pub fn url_for(&self, path: &str, query: Option<&str>) -> String {
        match query.filter(|q| !q.is_empty()) {
            Some(query) => format!("{}{}?{}", self.base_url, path, query),
            None => format!("{}{}", self.base_url, path),
        }
    }

    /// One call, no retries. Transport errors and non-JSON bodies are errors;
    /// any HTTP status is a successful reply.
    pub async fn forward(
        &self,
        method: Method,
        path: &str,
        query: Option<&str>,
        authorization: &HeaderValue,
        body: Option<Value>,
    ) -> AppResult<BackendReply> {
        let mut request = self
            .client
            .request(method, self.url_for(path, query))
            .header(header::AUTHORIZATION, authorization.clone())
            .header(header::CONTENT_TYPE, "application/json");

        if let Some(body) = body {
            request = request.body(serde_json::to_vec(&body).map_err(|err| AppError::internal(err.to_string()))?);
        }

        let response = request.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        let body = if bytes.iter().all(u8::is_ascii_whitespace) {
            None
        } else {
            let value = serde_json::from_slice(&bytes)
                .map_err(|err| AppError::upstream(format!("backend returned invalid JSON: {err}")))?;
            Some(value)
        };

        Ok(BackendReply { status, body })
    }
}

/// Pass-through client for the page-rendering frontend.
#[derive(Debug, Clone)]
pub struct FrontendClient {
    client: Client,
    base_url: String,
}

const HOP_BY_HOP: [HeaderName; 5] = [
    header::CONNECTION,
    header::HOST,
    header::CONTENT_LENGTH,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

impl FrontendClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> AppResult<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.into(),
        })
    }

    pub async fn relay(
        &self,
        method: Method,
        path_and_query: &str,
        headers: &HeaderMap,
        body: Bytes,
    ) -> AppResult<Response> {
        let url = format!("{}{}", self.base_url, path_and_query);

        let response = self
            .client
            .request(method, url)
            .headers(without_hop_by_hop(headers))
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let response_headers = without_hop_by_hop(response.headers());
        let bytes = response.bytes().await?;

        let mut relayed = Response::new(Body::from(bytes));
        *relayed.status_mut() = status;
        *relayed.headers_mut() = response_headers;
        Ok(relayed)
    }
}

fn without_hop_by_hop(headers: &HeaderMap) -> HeaderMap {
    let mut filtered = headers.clone();
    for name in &HOP_BY_HOP {
        filtered.remove(name);
    }
    filtered
}

fn build_client(timeout: Duration) -> AppResult<Client> {
    Client::builder()
        .timeout(timeout)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .map_err(|err| AppError::configuration(format!("failed to build HTTP client: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_for_appends_path_and_query() {
        let client = BackendClient::new("http://backend:8080", Duration::from_secs(1)).unwrap();
        assert_eq!(client.url_for("/api/v1/bookings", None), "http://backend:8080/api/v1/bookings");
        assert_eq!(client.url_for("/api/v1/bookings", Some("")), "http://backend:8080/api/v1/bookings");
        assert_eq!(
            client.url_for("/api/v1/bookings", Some("page=2")),
            "http://backend:8080/api/v1/bookings?page=2"
        );
    }

    #[test]
    fn hop_by_hop_headers_are_dropped() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("gateway"));
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from_static("10"));
        headers.insert(header::COOKIE, HeaderValue::from_static("a=b"));

        let filtered = without_hop_by_hop(&headers);
        assert!(filtered.get(header::HOST).is_none());
        assert!(filtered.get(header::CONTENT_LENGTH).is_none());
        assert_eq!(filtered.get(header::COOKIE).unwrap(), "a=b");
    }
}
