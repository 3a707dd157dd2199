//! Resource Fetcher
//!
//! Page-token pagination over GCP list calls. A [`ListRequest`] names the
//! call and where its items live in the response; a [`Pager`] walks the
//! pages one at a time so callers can process each page as it arrives.

use crate::error::ApiError;
use crate::gcp::client::GcpClient;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;

/// Where the items of a list response live
#[derive(Debug, Clone, Copy)]
pub enum Items {
    /// `{"<key>": [...]}`
    Key(&'static str),
    /// Compute aggregated list: `{"items": {"<scope>": {"<key>": [...]}}}`
    Aggregated(&'static str),
}

/// One paginated list call
#[derive(Debug, Clone)]
pub struct ListRequest {
    pub url: String,
    pub items: Items,
    pub query: Vec<(&'static str, String)>,
    /// Request body; its presence turns the call into a POST
    pub body: Option<Value>,
}

impl ListRequest {
    pub fn get(url: String, items: Items) -> Self {
        Self {
            url,
            items,
            query: Vec::new(),
            body: None,
        }
    }

    pub fn post(url: String, items: Items, body: Value) -> Self {
        Self {
            url,
            items,
            query: Vec::new(),
            body: Some(body),
        }
    }

    pub fn query(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.query.push((key, value.into()));
        self
    }
}

/// Result of one page
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_token: Option<String>,
}

/// Fetch one page of `request`
pub async fn fetch_page<T: DeserializeOwned>(
    client: &GcpClient,
    request: &ListRequest,
    page_token: Option<&str>,
) -> Result<Page<T>, ApiError> {
    let mut query = request.query.clone();
    if let Some(token) = page_token {
        query.push(("pageToken", token.to_string()));
    }

    let response = match &request.body {
        Some(body) => client.post(&request.url, &query, Some(body)).await?,
        None => client.get(&request.url, &query).await?,
    };

    let raw = match request.items {
        Items::Key(key) => response
            .get(key)
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default(),
        Items::Aggregated(key) => flatten_aggregated(&response, key),
    };

    let items = raw
        .into_iter()
        .map(serde_json::from_value)
        .collect::<Result<Vec<T>, _>>()
        .map_err(|source| ApiError::Decode {
            url: request.url.clone(),
            source: Arc::new(source),
        })?;

    // An empty token is the same as no token
    let next_token = response
        .get("nextPageToken")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string());

    Ok(Page { items, next_token })
}

/// Items of every scope of an aggregated list, skipping scopes that only
/// carry a `warning` (e.g. "no results in this zone")
fn flatten_aggregated(response: &Value, key: &str) -> Vec<Value> {
    let Some(scopes) = response.get("items").and_then(|v| v.as_object()) else {
        return Vec::new();
    };

    scopes
        .values()
        .filter_map(|scope| scope.get(key).and_then(|v| v.as_array()))
        .flat_map(|items| items.iter().cloned())
        .collect()
}

/// Walks the pages of a list call
pub struct Pager<'a, T> {
    client: &'a GcpClient,
    request: ListRequest,
    next_token: Option<String>,
    done: bool,
    _items: PhantomData<T>,
}

impl<'a, T: DeserializeOwned> Pager<'a, T> {
    pub fn new(client: &'a GcpClient, request: ListRequest) -> Self {
        Self {
            client,
            request,
            next_token: None,
            done: false,
            _items: PhantomData,
        }
    }

    /// Next page of items, `None` once the last page was returned
    pub async fn next_page(&mut self) -> Result<Option<Vec<T>>, ApiError> {
        if self.done {
            return Ok(None);
        }

        let page = fetch_page(self.client, &self.request, self.next_token.as_deref()).await?;
        self.next_token = page.next_token;
        self.done = self.next_token.is_none();
        Ok(Some(page.items))
    }
}

/// Fetch all items of `request` (auto-paginate)
pub async fn fetch_all<T: DeserializeOwned>(
    client: &GcpClient,
    request: ListRequest,
) -> Result<Vec<T>, ApiError> {
    let mut all_items = Vec::new();
    let mut pager = Pager::new(client, request);
    while let Some(items) = pager.next_page().await? {
        all_items.extend(items);
    }
    Ok(all_items)
}

/// Short name of a GCP resource URL or resource name
/// e.g., ".../compute/v1/projects/my-project/zones/us-central1-a" -> "us-central1-a"
pub fn short_name(url: &str) -> &str {
    url.rsplit('/').next().unwrap_or(url)
}
