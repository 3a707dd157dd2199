//! IAM and Resource Manager API shapes

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceAccount {
    /// `projects/{project}/serviceAccounts/{email}`
    pub name: Option<String>,
    pub project_id: Option<String>,
    pub unique_id: Option<String>,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub disabled: Option<bool>,
    /// Roles bound to this account in the project IAM policy
    #[serde(skip)]
    pub bound_roles: Vec<String>,
}

impl ServiceAccount {
    pub fn bound_role_names(&self) -> Vec<&str> {
        self.bound_roles.iter().map(String::as_str).collect()
    }

    /// Member string the account appears as in IAM policies
    pub fn member(&self) -> Option<String> {
        self.email
            .as_deref()
            .map(|email| format!("serviceAccount:{}", email))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceAccountKey {
    /// `projects/{project}/serviceAccounts/{email}/keys/{key}`
    pub name: Option<String>,
    pub key_algorithm: Option<String>,
    pub key_origin: Option<String>,
    pub key_type: Option<String>,
    pub valid_after_time: Option<String>,
    pub valid_before_time: Option<String>,
    pub disabled: Option<bool>,
}

impl ServiceAccountKey {
    /// Email of the owning account, read from the key's resource name
    pub fn account_email(&self) -> Option<&str> {
        let name = self.name.as_deref()?;
        let (_, rest) = name.split_once("/serviceAccounts/")?;
        rest.split('/').next().filter(|email| !email.is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    /// `projects/{project}/roles/{role}`
    pub name: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub stage: Option<String>,
    #[serde(default)]
    pub included_permissions: Vec<String>,
    pub deleted: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Policy {
    #[serde(default)]
    pub bindings: Vec<Binding>,
}

impl Policy {
    /// Roles bound to `member`, in policy order
    pub fn roles_of(&self, member: &str) -> Vec<String> {
        self.bindings
            .iter()
            .filter(|b| b.members.iter().any(|m| m == member))
            .map(|b| b.role.clone())
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Binding {
    pub role: String,
    #[serde(default)]
    pub members: Vec<String>,
}
