//! REST client producing [`FetchResponse`]s.

use crate::error::{FetchError, FetchResult, HttpError};
use crate::fetch::{decode_body, FetchResponse};
use fedisync_protocol::ServerErrorBody;
use reqwest::header::{HeaderMap, LINK};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use url::Url;

const TOTAL_COUNT_HEADER: &str = "x-total-count";

/// Thin reqwest wrapper for the REST API.
#[derive(Debug, Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

impl RestClient {
    /// Creates a client for `base_url` (e.g., "https://social.example").
    pub fn new(base_url: &str) -> FetchResult<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| FetchError::Network(format!("invalid base url {base_url}: {e}")))?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;
        Ok(Self {
            http,
            base_url,
            token: None,
        })
    }

    /// Sets the bearer token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolves a path or an absolute URL (such as a `next` cursor).
    pub fn resolve(&self, path_or_url: &str) -> FetchResult<Url> {
        self.base_url
            .join(path_or_url)
            .map_err(|e| FetchError::Network(format!("invalid url {path_or_url}: {e}")))
    }

    /// `GET`s a path or a pagination cursor.
    pub async fn get(&self, path_or_url: &str) -> FetchResult<FetchResponse> {
        self.send(self.request(Method::GET, path_or_url)?).await
    }

    /// `POST`s a JSON body.
    pub async fn post(&self, path: &str, body: &Value) -> FetchResult<FetchResponse> {
        self.send(self.request(Method::POST, path)?.json(body)).await
    }

    /// `DELETE`s a resource.
    pub async fn delete(&self, path: &str) -> FetchResult<FetchResponse> {
        self.send(self.request(Method::DELETE, path)?).await
    }

    fn request(&self, method: Method, path_or_url: &str) -> FetchResult<RequestBuilder> {
        let url = self.resolve(path_or_url)?;
        let builder = self.http.request(method, url);
        Ok(match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        })
    }

    async fn send(&self, builder: RequestBuilder) -> FetchResult<FetchResponse> {
        let response = builder
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;
        debug!(status = status.as_u16(), len = bytes.len(), "rest response");

        if !status.is_success() {
            let mut error = HttpError::new(status.as_u16());
            error.body = ServerErrorBody::parse(&bytes);
            return Err(FetchError::Http(error));
        }

        Ok(response_from_parts(status, &headers, decode_body(&bytes)?))
    }
}

fn response_from_parts(status: StatusCode, headers: &HeaderMap, data: Value) -> FetchResponse {
    let mut response = FetchResponse::ok(data);
    response.status = status.as_u16();
    if let Some(link) = headers.get(LINK).and_then(|v| v.to_str().ok()) {
        response = response.with_link_header(link);
    }
    response.total_count = headers
        .get(TOTAL_COUNT_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok());
    response.partial = status == StatusCode::PARTIAL_CONTENT;
    response
}
