use std::collections::HashSet;

use thiserror::Error;

use crate::store::models::{OAuthClient, Policy, PolicySubject, Role, SubjectKind, User};
use crate::store::{ClientStore, PolicyStore, RoleStore, StoreError, UserStore};

#[derive(Debug, Error)]
pub enum ResolverError {
    #[error("invalid-subject")]
    InvalidSubject(PolicySubject),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Default)]
pub struct PolicyResolution {
    /// Descriptive `Kind/name` strings for every expanded actor.
    pub subjects: Vec<String>,
    pub policies: Vec<Policy>,
}

impl PolicyResolution {
    /// Ascending-sorted, space-joined union of scopes across surviving
    /// policies — the value §4.5 hands to an access-token's `scope` claim.
    pub fn granted_scopes(&self) -> Vec<String> {
        let mut set: HashSet<String> = HashSet::new();
        for policy in &self.policies {
            set.extend(policy.scopes.iter().cloned());
        }
        let mut scopes: Vec<String> = set.into_iter().collect();
        scopes.sort();
        scopes
    }
}

enum Actor {
    Client(OAuthClient),
    Role(Role),
    User(User),
}

/// Maps a subject set + resource URL + requested scopes onto the policies
/// that authorize them. Users are matched against policy subjects by
/// **email**, not by the `name`/`id` that `UserStore::get` otherwise accepts
/// — preserved exactly as specified; see DESIGN.md for the rationale.
#[derive(Clone)]
pub struct PolicyResolver {
    client_store: ClientStore,
    role_store: RoleStore,
    user_store: UserStore,
    policy_store: PolicyStore,
    self_reference_uri: String,
}

impl PolicyResolver {
    pub fn new(
        client_store: ClientStore,
        role_store: RoleStore,
        user_store: UserStore,
        policy_store: PolicyStore,
        self_reference_uri: String,
    ) -> Self {
        PolicyResolver {
            client_store,
            role_store,
            user_store,
            policy_store,
            self_reference_uri,
        }
    }

    pub async fn evaluate(
        &self,
        subjects: &[PolicySubject],
        resource_url: Option<&str>,
        requested_scopes: Option<&[String]>,
    ) -> Result<PolicyResolution, ResolverError> {
        let resource_url = resource_url.unwrap_or(&self.self_reference_uri).to_string();

        let mut actors: Vec<Actor> = Vec::new();

        for subject in subjects {
            match subject.kind {
                SubjectKind::Client => {
                    let client = self
                        .client_store
                        .get(&subject.subject)
                        .await?
                        .ok_or_else(|| ResolverError::InvalidSubject(subject.clone()))?;
                    actors.push(Actor::Client(client));
                }
                SubjectKind::Role => {
                    let role = self
                        .role_store
                        .get(&subject.subject)
                        .await?
                        .ok_or_else(|| ResolverError::InvalidSubject(subject.clone()))?;
                    actors.push(Actor::Role(role));
                }
                SubjectKind::User => {
                    let user = self
                        .user_store
                        .get(&subject.subject)
                        .await?
                        .ok_or_else(|| ResolverError::InvalidSubject(subject.clone()))?;

                    if !user.roles.is_empty() {
                        let inherited = self.role_store.select_by_names(&user.roles).await?;
                        actors.extend(inherited.into_iter().map(Actor::Role));
                    }

                    actors.push(Actor::User(user));
                }
            }
        }

        let psl: Vec<String> = actors
            .iter()
            .map(|actor| match actor {
                Actor::Client(c) => format!("Client/{}", c.name),
                Actor::Role(r) => format!("Role/{}", r.name),
                Actor::User(u) => format!("User/{}", u.name),
            })
            .collect();

        let client_names: HashSet<&str> = actors
            .iter()
            .filter_map(|a| match a {
                Actor::Client(c) => Some(c.name.as_str()),
                _ => None,
            })
            .collect();
        let role_names: HashSet<&str> = actors
            .iter()
            .filter_map(|a| match a {
                Actor::Role(r) => Some(r.name.as_str()),
                _ => None,
            })
            .collect();
        let user_emails: HashSet<&str> = actors
            .iter()
            .filter_map(|a| match a {
                Actor::User(u) => Some(u.email.as_str()),
                _ => None,
            })
            .collect();

        let candidates = self.policy_store.select_by_resource(&resource_url).await?;

        let matched_by_subject: Vec<Policy> = candidates
            .into_iter()
            .filter(|policy| {
                policy.subjects.iter().any(|ps| match ps.kind {
                    SubjectKind::Client => client_names.contains(ps.subject.as_str()),
                    SubjectKind::Role => role_names.contains(ps.subject.as_str()),
                    SubjectKind::User => user_emails.contains(ps.subject.as_str()),
                })
            })
            .collect();

        let policies = match requested_scopes {
            Some(requested) if !requested.is_empty() => {
                let requested: HashSet<&str> = requested.iter().map(String::as_str).collect();
                matched_by_subject
                    .into_iter()
                    .filter(|policy| {
                        let granted: HashSet<&str> =
                            policy.scopes.iter().map(String::as_str).collect();
                        requested.is_subset(&granted)
                    })
                    .collect()
            }
            _ => matched_by_subject,
        };

        Ok(PolicyResolution {
            subjects: psl,
            policies,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::models::Policy as PolicyModel;

    fn policy(scopes: &[&str]) -> PolicyModel {
        PolicyModel {
            id: uuid::Uuid::new_v4(),
            name: "p".into(),
            resource: "http://svc/".into(),
            subjects: vec![],
            scopes: scopes.iter().map(|s| s.to_string()).collect(),
            fixed: false,
        }
    }

    #[test]
    fn granted_scopes_are_sorted_union() {
        let resolution = PolicyResolution {
            subjects: vec![],
            policies: vec![policy(&["idp.user.write", "idp.user.read"]), policy(&["idp.user.read"])],
        };
        assert_eq!(
            resolution.granted_scopes(),
            vec!["idp.user.read".to_string(), "idp.user.write".to_string()]
        );
    }
}
