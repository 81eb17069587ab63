use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Scope {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub sensitive: bool,
    pub fixed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub fixed: bool,
}

/// `password` holds the plaintext once decrypted from the `users.password`
/// column; mutating the in-memory copy never writes back to storage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub email: String,
    pub full_name: Option<String>,
    pub roles: Vec<String>,
}

impl User {
    /// Strips the plaintext password unless `full` access has been granted,
    /// matching the gate's `X-Access-Level: full` sensitive-field contract.
    pub fn redacted(mut self, full_access: bool) -> Self {
        if !full_access {
            self.password = None;
        }
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OAuthClient {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    pub audience: Option<String>,
    pub grant_types: Vec<String>,
    pub response_types: Vec<String>,
    pub scopes: Vec<String>,
    pub extras: JsonValue,
    pub description: Option<String>,
}

impl OAuthClient {
    pub fn redacted(mut self, full_access: bool) -> Self {
        if !full_access {
            self.secret = None;
        }
        self
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SubjectKind {
    Client,
    Role,
    User,
}

impl std::fmt::Display for SubjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SubjectKind::Client => "Client",
            SubjectKind::Role => "Role",
            SubjectKind::User => "User",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PolicySubject {
    pub kind: SubjectKind,
    pub subject: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Policy {
    pub id: Uuid,
    pub name: String,
    pub resource: String,
    pub subjects: Vec<PolicySubject>,
    pub scopes: Vec<String>,
    pub fixed: bool,
}
