//! tgcp-inventory
//!
//! Builds a point-in-time graph of a GCP project's resources. Each service
//! (compute, access, storage, dns, messaging) is a [`collection::Collection`]
//! that fetches its resource kinds concurrently, normalizes every provider
//! object into a [`graph::Resource`] and then links the resources with
//! containment and dependency relations.
//!
//! # Module Structure
//!
//! - [`collection`] - Per-service orchestration, relation rules and the dedup cache
//! - [`resource`] - Pagination, property extractors and the resource transformer
//! - [`model`] - Typed GCP API shapes
//! - [`graph`] - The in-memory resource graph
//! - [`gcp`] - Authentication and HTTP plumbing
//! - [`config`] - Persistent configuration and sync toggles
//!
//! # Example
//!
//! ```ignore
//! use tgcp_inventory::collection::{Collection, Service};
//! use tgcp_inventory::config::SyncConfig;
//! use tgcp_inventory::gcp::client::{Endpoints, GcpClient};
//!
//! async fn example() -> anyhow::Result<()> {
//!     let client = GcpClient::new("my-project", "us-central1", Endpoints::default()).await?;
//!     let compute = Collection::new(Service::Compute, client, SyncConfig::default());
//!     let graph = compute.fetch_resources().await?;
//!     println!("{} resources", graph.len());
//!     Ok(())
//! }
//! ```

pub mod collection;
pub mod config;
pub mod error;
pub mod gcp;
pub mod graph;
pub mod model;
pub mod resource;

pub use error::{ApiError, Error, FetchError, RelateError, TransformError};
