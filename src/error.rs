//! Error types
//!
//! Errors are layered the way a fetch flows: [`ApiError`] for a provider
//! call, [`TransformError`] for turning a provider object into a resource,
//! [`FetchError`] for a whole resource kind, [`RelateError`] for the
//! relation wave and [`Error`] for a collection.
//!
//! Every type is `Clone` so that a failed deduplicated lookup can be handed
//! to each of its waiters. Sources that are not `Clone` are kept in an `Arc`.

use crate::collection::Service;
use crate::graph::{ResourceKey, ResourceType};
use std::sync::Arc;
use thiserror::Error;

/// Failure of a single GCP API call
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The caller is not allowed to read the resource (HTTP 403 PERMISSION_DENIED)
    #[error("access denied: {message}")]
    AccessDenied { url: String, message: String },

    #[error("API request failed: {status} - {message}")]
    Status {
        status: u16,
        url: String,
        message: String,
    },

    #[error("failed to send request to {url}")]
    Transport {
        url: String,
        #[source]
        source: Arc<reqwest::Error>,
    },

    #[error("failed to parse response JSON from {url}")]
    Decode {
        url: String,
        #[source]
        source: Arc<serde_json::Error>,
    },

    #[error("failed to get access token: {0}")]
    Auth(String),
}

impl ApiError {
    pub fn is_access_denied(&self) -> bool {
        matches!(self, ApiError::AccessDenied { .. })
    }

    /// HTTP status of the failed call, when the provider answered
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::AccessDenied { .. } => Some(403),
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Failure to turn a provider object into a resource
#[derive(Debug, Clone, Error)]
pub enum TransformError {
    /// The object is not of the shape its fetcher expects
    #[error("unknown source shape for type [{kind}]: {found}")]
    UnknownShape { kind: ResourceType, found: String },

    #[error("type [{kind}]: object has no identifier")]
    MissingId { kind: ResourceType },

    #[error("type [{kind}]: prop '{property}': {reason}")]
    Property {
        kind: ResourceType,
        property: &'static str,
        reason: String,
    },

    /// A property needing its own API call failed
    #[error("type [{kind}]: prop '{property}': {source}")]
    Fetch {
        kind: ResourceType,
        property: &'static str,
        #[source]
        source: ApiError,
    },
}

/// Failure while fetching one resource kind
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Transform(#[from] TransformError),
}

impl FetchError {
    /// Provider failure behind this error, either on the listing call or on
    /// a side-fetch made while extracting properties
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            FetchError::Api(err)
            | FetchError::Transform(TransformError::Fetch { source: err, .. }) => Some(err),
            FetchError::Transform(_) => None,
        }
    }

    pub fn is_access_denied(&self) -> bool {
        self.api_error().is_some_and(ApiError::is_access_denied)
    }
}

/// Failure while linking resources
#[derive(Debug, Clone, Error)]
pub enum RelateError {
    #[error("{subject} references {target}, which is not in the graph")]
    MissingTarget {
        subject: ResourceKey,
        target: ResourceKey,
    },

    #[error("{subject}: dependent lookup failed: {source}")]
    Lookup {
        subject: ResourceKey,
        #[source]
        source: ApiError,
    },
}

/// Failure of a collection fetch
#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("this account lacks permission for service {service}")]
    AccessDenied {
        service: Service,
        #[source]
        source: FetchError,
    },

    #[error("{service}[{kind}]: {source}")]
    Fetch {
        service: Service,
        kind: &'static str,
        #[source]
        source: FetchError,
    },

    #[error("{service}[{kind}]: {source}")]
    Relate {
        service: Service,
        kind: &'static str,
        #[source]
        source: RelateError,
    },

    #[error("{service}: expected exactly one region anchor, found {found}")]
    RegionAnchor { service: Service, found: usize },

    #[error("{service}: unknown resource kind '{kind}'")]
    UnknownKind { service: Service, kind: String },

    #[error("{service}: task failed: {reason}")]
    Task { service: Service, reason: String },
}

impl Error {
    pub fn is_access_denied(&self) -> bool {
        matches!(self, Error::AccessDenied { .. })
    }

    /// Wrap a per-kind fetch failure, classifying provider access denial
    pub(crate) fn from_fetch(service: Service, kind: &'static str, source: FetchError) -> Self {
        if source.is_access_denied() {
            Error::AccessDenied { service, source }
        } else {
            Error::Fetch {
                service,
                kind,
                source,
            }
        }
    }
}
