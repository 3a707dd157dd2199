//! Resource abstraction layer
//!
//! Turns GCP list responses into graph resources.
//!
//! # Architecture
//!
//! - [`fetcher`] - Page-token pagination over list calls
//! - [`extract`] - Composable property extractors
//! - [`registry`] - Per-type property tables, built once per process
//! - [`transform`] - The [`Source`] trait and the [`Transformer`]
//!
//! # Example
//!
//! ```ignore
//! use tgcp_inventory::resource::{ListRequest, Items, Pager, Transformer};
//!
//! async fn topics(client: &GcpClient) -> Result<Vec<Resource>, FetchError> {
//!     let transformer = Transformer::new(client.clone());
//!     let request = ListRequest::get(client.pubsub_url("topics"), Items::Key("topics"));
//!     let mut pager = Pager::<Topic>::new(client, request);
//!     let mut resources = Vec::new();
//!     while let Some(page) = pager.next_page().await? {
//!         for topic in &page {
//!             resources.push(transformer.transform(topic).await?);
//!         }
//!     }
//!     Ok(resources)
//! }
//! ```

pub mod extract;
pub mod fetcher;
pub mod registry;
pub mod transform;

pub use fetcher::{fetch_all, short_name, Items, ListRequest, Pager};
pub use registry::{prop, PropertyDef, PropertyTable, TableCell};
pub use transform::{Source, Transformer};
