//! GCP API interaction module
//!
//! This module provides the core functionality for interacting with Google Cloud Platform
//! APIs: authentication, the HTTP client and error classification.
//!
//! # Module Structure
//!
//! - [`auth`] - Application Default Credentials, static tokens, gcloud defaults
//! - [`client`] - Main GCP client and API URL builders
//! - [`http`] - HTTP utilities for REST API calls
//!
//! # Example
//!
//! ```ignore
//! use tgcp_inventory::gcp::client::{Endpoints, GcpClient};
//!
//! async fn example() -> anyhow::Result<()> {
//!     let client = GcpClient::new("my-project", "us-central1", Endpoints::default()).await?;
//!     let networks = client.get(&client.compute_global_url("networks"), &[]).await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod http;
