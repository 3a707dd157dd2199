//! IAM kinds
//!
//! Service accounts carry the roles the project IAM policy binds to them;
//! roles are linked back to the accounts by full role name. Predefined roles
//! (`roles/...`) are not listed, so bindings to them link nothing.

use super::relation::{Builder, RelationKind};
use super::{kind, Cycle, Fetched, KindFetcher};
use crate::error::{ApiError, FetchError};
use crate::graph::ResourceType;
use crate::model::iam::{Policy, Role, ServiceAccount, ServiceAccountKey};
use crate::resource::extract::{short, strings, time, value};
use crate::resource::{
    fetch_all, prop, short_name, Items, ListRequest, PropertyTable, Source, TableCell,
};
use futures::future::{try_join_all, BoxFuture};
use futures::FutureExt;
use serde_json::json;
use std::sync::Arc;

pub(crate) fn kinds() -> Vec<Arc<dyn KindFetcher>> {
    vec![
        kind(
            "serviceaccount",
            fetch_service_accounts,
            vec![
                Builder::RegionParent,
                Builder::Alias {
                    target: ResourceType::Role,
                    property: "Name",
                    aliases: ServiceAccount::bound_role_names,
                    relation: RelationKind::AppliesOn,
                },
            ],
        ),
        kind(
            "serviceaccountkey",
            fetch_service_account_keys,
            vec![Builder::resolve_one(
                ResourceType::ServiceAccount,
                ServiceAccountKey::account_email,
                RelationKind::ParentOf,
            )],
        ),
        kind("role", fetch_roles, vec![Builder::RegionParent]),
    ]
}

/// Every service account of the project, listed once per cycle
async fn service_accounts(cycle: &Cycle) -> Result<Arc<Vec<ServiceAccount>>, FetchError> {
    cycle
        .caches
        .service_accounts
        .get_or_fetch(|| async {
            let request = ListRequest::get(
                cycle.client.iam_url("serviceAccounts"),
                Items::Key("accounts"),
            );
            let accounts: Vec<ServiceAccount> = fetch_all(&cycle.client, request).await?;
            Ok::<_, FetchError>(Arc::new(accounts))
        })
        .await
}

async fn project_policy(cycle: &Cycle) -> Result<Policy, ApiError> {
    let url = cycle.client.resourcemanager_url("getIamPolicy");
    let body = json!({"options": {"requestedPolicyVersion": 3}});
    let response = cycle.client.post(&url, &[], Some(&body)).await?;
    serde_json::from_value(response).map_err(|source| ApiError::Decode {
        url,
        source: Arc::new(source),
    })
}

fn fetch_service_accounts(
    cycle: &Cycle,
) -> BoxFuture<'_, Result<Fetched<ServiceAccount>, FetchError>> {
    accounts_with_roles(cycle).boxed()
}

async fn accounts_with_roles(cycle: &Cycle) -> Result<Fetched<ServiceAccount>, FetchError> {
    let accounts = service_accounts(cycle).await?;
    let policy = project_policy(cycle).await?;

    let accounts = accounts.iter().cloned().map(|mut account| {
        if let Some(member) = account.member() {
            account.bound_roles = policy.roles_of(&member);
        }
        account
    });
    cycle.transform_all(accounts).await
}

fn fetch_service_account_keys(
    cycle: &Cycle,
) -> BoxFuture<'_, Result<Fetched<ServiceAccountKey>, FetchError>> {
    account_keys(cycle).boxed()
}

async fn account_keys(cycle: &Cycle) -> Result<Fetched<ServiceAccountKey>, FetchError> {
    let accounts = service_accounts(cycle).await?;
    let per_account = try_join_all(accounts.iter().filter_map(|a| a.email.as_deref()).map(|email| {
        let url = cycle.client.iam_url(&format!("serviceAccounts/{}/keys", email));
        cycle.collect(ListRequest::get(url, Items::Key("keys")), Some)
    }))
    .await?;

    let mut fetched = Fetched::new();
    for keys in per_account {
        fetched.extend(keys);
    }
    Ok(fetched)
}

fn fetch_roles(cycle: &Cycle) -> BoxFuture<'_, Result<Fetched<Role>, FetchError>> {
    let request =
        ListRequest::get(cycle.client.iam_url("roles"), Items::Key("roles")).query("view", "FULL");
    cycle.collect(request, Some).boxed()
}

impl Source for ServiceAccount {
    const TYPE: ResourceType = ResourceType::ServiceAccount;

    fn native_id(&self) -> Option<String> {
        self.email.clone()
    }

    fn properties() -> &'static PropertyTable<Self> {
        static TABLE: TableCell<ServiceAccount> = TableCell::new();
        TABLE.get_or_init(|| {
            vec![
                prop("Name", value(|a: &ServiceAccount| a.email.clone())),
                prop("DisplayName", value(|a: &ServiceAccount| a.display_name.clone())),
                prop("Description", value(|a: &ServiceAccount| a.description.clone())),
                prop("UniqueId", value(|a: &ServiceAccount| a.unique_id.clone())),
                prop("Project", value(|a: &ServiceAccount| a.project_id.clone())),
                prop("Disabled", value(|a: &ServiceAccount| a.disabled)),
                prop("Roles", strings(|a: &ServiceAccount| a.bound_roles.as_slice())),
            ]
        })
    }
}

impl Source for ServiceAccountKey {
    const TYPE: ResourceType = ResourceType::ServiceAccountKey;

    fn native_id(&self) -> Option<String> {
        self.name.as_deref().map(|name| short_name(name).to_string())
    }

    fn properties() -> &'static PropertyTable<Self> {
        static TABLE: TableCell<ServiceAccountKey> = TableCell::new();
        TABLE.get_or_init(|| {
            vec![
                prop("Name", short(|k: &ServiceAccountKey| k.name.as_deref())),
                prop(
                    "Account",
                    value(|k: &ServiceAccountKey| k.account_email().map(str::to_string)),
                ),
                prop("Type", value(|k: &ServiceAccountKey| k.key_type.clone())),
                prop("Algorithm", value(|k: &ServiceAccountKey| k.key_algorithm.clone())),
                prop("Origin", value(|k: &ServiceAccountKey| k.key_origin.clone())),
                prop("Disabled", value(|k: &ServiceAccountKey| k.disabled)),
                prop("ValidAfter", time(|k: &ServiceAccountKey| k.valid_after_time.as_deref())),
                prop("ValidBefore", time(|k: &ServiceAccountKey| k.valid_before_time.as_deref())),
            ]
        })
    }
}

impl Source for Role {
    const TYPE: ResourceType = ResourceType::Role;

    fn native_id(&self) -> Option<String> {
        self.name.as_deref().map(|name| short_name(name).to_string())
    }

    fn properties() -> &'static PropertyTable<Self> {
        static TABLE: TableCell<Role> = TableCell::new();
        TABLE.get_or_init(|| {
            vec![
                // Full `projects/{p}/roles/{r}` name, matched by role bindings
                prop("Name", value(|r: &Role| r.name.clone())),
                prop("Title", value(|r: &Role| r.title.clone())),
                prop("Description", value(|r: &Role| r.description.clone())),
                prop("Stage", value(|r: &Role| r.stage.clone())),
                prop("Permissions", strings(|r: &Role| r.included_permissions.as_slice())),
                prop("Deleted", value(|r: &Role| r.deleted)),
            ]
        })
    }
}
