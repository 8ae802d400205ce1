//! GitLab API client: authentication, URL building and response handling.

use std::sync::Arc;

use glbridge_core::paginate::{ListOptions, Page};
use glbridge_core::{Client, Error, Id, Result};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::DEFAULT_GITLAB_URL;

/// Response header carrying the next page number.
const NEXT_PAGE_HEADER: &str = "x-next-page";

/// GitLab API client.
pub struct GitLabClient {
    base_url: String,
    token: String,
    client: reqwest::Client,
}

impl GitLabClient {
    /// Create a new client for gitlab.com.
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_base_url(DEFAULT_GITLAB_URL, token)
    }

    /// Create a new GitLab client with a custom base URL.
    pub fn with_base_url(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Wrap the client as the shared service bundle.
    pub fn into_client(self) -> Client {
        Client::from_shared(Arc::new(self))
    }

    /// Build request with common headers.
    pub(crate) fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("PRIVATE-TOKEN", &self.token)
    }

    /// Get the API URL for a given endpoint.
    pub(crate) fn api_url(&self, endpoint: &str) -> String {
        format!("{}/api/v4{}", self.base_url, endpoint)
    }

    /// Get the URL of a project-scoped endpoint.
    pub(crate) fn project_url(&self, project: &Id, endpoint: &str) -> String {
        self.api_url(&format!("/projects/{}{}", segment(project), endpoint))
    }

    /// Get the URL of a group-scoped endpoint.
    pub(crate) fn group_url(&self, group: &Id, endpoint: &str) -> String {
        self.api_url(&format!("/groups/{}{}", segment(group), endpoint))
    }

    /// Make an authenticated GET request with typed deserialization.
    pub(crate) async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        debug!(url = url, "GitLab GET request");
        let response = self.send(self.request(Method::GET, url)).await?;
        decode(response).await
    }

    /// GET one page of a listing. `build` adds endpoint-specific filters.
    pub(crate) async fn get_page<T, F>(
        &self,
        url: &str,
        list: &ListOptions,
        build: F,
    ) -> Result<Page<T>>
    where
        T: DeserializeOwned,
        F: FnOnce(RequestBuilder) -> RequestBuilder,
    {
        debug!(url = url, page = list.page, "GitLab GET page request");

        let request = build(self.request(Method::GET, url).query(list));
        let response = self.send(request).await?;
        let next_page = next_page(&response);
        let items = decode(response).await?;

        Ok(Page::new(items, next_page))
    }

    /// GET a raw text endpoint. Invalid UTF-8 is replaced.
    pub(crate) async fn get_text(&self, url: &str) -> Result<String> {
        self.get_text_with(url, |request| request).await
    }

    pub(crate) async fn get_text_with<F>(&self, url: &str, build: F) -> Result<String>
    where
        F: FnOnce(RequestBuilder) -> RequestBuilder,
    {
        debug!(url = url, "GitLab GET raw request");

        let response = self.send(build(self.request(Method::GET, url))).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Make an authenticated POST request.
    pub(crate) async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T> {
        debug!(url = url, "GitLab POST request");
        let response = self.send(self.request(Method::POST, url).json(body)).await?;
        decode(response).await
    }

    /// POST without a request body.
    pub(crate) async fn post_empty<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        debug!(url = url, "GitLab POST request");
        let response = self.send(self.request(Method::POST, url)).await?;
        decode(response).await
    }

    /// POST whose response carries nothing of interest.
    pub(crate) async fn post_discard(&self, url: &str) -> Result<()> {
        debug!(url = url, "GitLab POST request");
        self.send(self.request(Method::POST, url)).await?;
        Ok(())
    }

    /// Make an authenticated PUT request.
    pub(crate) async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T> {
        debug!(url = url, "GitLab PUT request");
        let response = self.send(self.request(Method::PUT, url).json(body)).await?;
        decode(response).await
    }

    /// Make an authenticated DELETE request.
    pub(crate) async fn delete(&self, url: &str) -> Result<()> {
        debug!(url = url, "GitLab DELETE request");
        self.send(self.request(Method::DELETE, url)).await?;
        Ok(())
    }

    /// Send a request and map error statuses.
    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let status_code = status.as_u16();
            let message = response.text().await.unwrap_or_default();
            warn!(
                status = status_code,
                message = message,
                "GitLab API error response"
            );
            return Err(Error::from_status(status_code, message));
        }

        Ok(response)
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    response
        .json()
        .await
        .map_err(|e| Error::InvalidData(format!("Failed to parse response: {}", e)))
}

/// Read the next page cursor. A missing or empty header means there is none.
fn next_page(response: &Response) -> u64 {
    response
        .headers()
        .get(NEXT_PAGE_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(0)
}

/// Render an identifier as a single URL path segment.
pub(crate) fn segment(id: &Id) -> String {
    match id {
        Id::Int(n) => n.to_string(),
        Id::Path(p) => urlencoding::encode(p).into_owned(),
    }
}

/// Encode every component of a slash-separated path, keeping the slashes.
pub(crate) fn encode_path_components(path: &str) -> String {
    path.split('/')
        .map(|part| urlencoding::encode(part).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
