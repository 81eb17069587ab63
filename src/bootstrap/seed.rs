use uuid::Uuid;

use crate::store::models::{Policy, PolicySubject, Role, Scope, SubjectKind};

/// Module-level constant tables read by [`super::run`] — the Rust analogue
/// of the reference implementation's `Enum` of predefined scope/role/policy
/// instances (see SPEC_FULL §9).
pub fn predefined_scopes() -> Vec<Scope> {
    [
        "idp.scope.list",
        "idp.scope.read",
        "idp.scope.write",
        "idp.scope.delete",
        "idp.role.list",
        "idp.role.read",
        "idp.role.write",
        "idp.role.delete",
        "idp.user.list",
        "idp.user.read",
        "idp.user.write",
        "idp.user.delete",
        "idp.client.list",
        "idp.client.read",
        "idp.client.write",
        "idp.client.delete",
        "idp.policy.list",
        "idp.policy.read",
        "idp.policy.write",
        "idp.policy.delete",
        "idp.root",
        "idp.admin",
        "openid",
        "offline_access",
    ]
    .into_iter()
    .map(|name| Scope {
        id: Uuid::new_v4(),
        name: name.to_string(),
        description: None,
        sensitive: false,
        fixed: true,
    })
    .collect()
}

pub fn predefined_roles() -> Vec<Role> {
    vec![Role {
        id: Uuid::new_v4(),
        name: "idp.admin".to_string(),
        description: Some("Full administrative access to the directory.".to_string()),
        fixed: true,
    }]
}

/// A single fixed policy granting the `idp.admin` role every `idp.*` scope
/// on the self-reference URI and everything beneath it.
pub fn predefined_policies(self_reference_uri: &str) -> Vec<Policy> {
    vec![Policy {
        id: Uuid::new_v4(),
        name: "idp-admin-root".to_string(),
        resource: self_reference_uri.to_string(),
        subjects: vec![PolicySubject {
            kind: SubjectKind::Role,
            subject: "idp.admin".to_string(),
        }],
        scopes: vec!["idp.root".to_string()],
        fixed: true,
    }]
}
