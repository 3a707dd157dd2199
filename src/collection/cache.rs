//! Dedup cache
//!
//! Several resource kinds of a service need the same expensive listing
//! (storage buckets for both `bucket` and `object`, service accounts for both
//! `serviceaccount` and `serviceaccountkey`). A [`Dedup`] runs such a listing
//! once per fetch cycle: the first caller computes, concurrent callers wait,
//! and every caller sees the same value or the same error.

use crate::error::FetchError;
use crate::model::dns::ManagedZone;
use crate::model::iam::ServiceAccount;
use crate::model::storage::Bucket;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::OnceCell;

pub struct Dedup<T> {
    cell: OnceCell<Result<T, FetchError>>,
}

impl<T: Clone> Dedup<T> {
    pub fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    /// Value of the cache, running `fetch` if no caller did yet
    pub async fn get_or_fetch<F, Fut>(&self, fetch: F) -> Result<T, FetchError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        self.cell.get_or_init(fetch).await.clone()
    }
}

impl<T: Clone> Default for Dedup<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared listings of one fetch cycle
#[derive(Default)]
pub struct Caches {
    /// Every bucket of the project, whatever its location
    pub buckets: Dedup<Arc<Vec<Bucket>>>,
    pub service_accounts: Dedup<Arc<Vec<ServiceAccount>>>,
    pub managed_zones: Dedup<Arc<Vec<ManagedZone>>>,
}
