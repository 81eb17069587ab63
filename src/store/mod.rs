pub mod clients;
pub mod models;
pub mod policies;
pub mod roles;
pub mod scopes;
pub mod users;

pub use clients::ClientStore;
pub use policies::PolicyStore;
pub use roles::RoleStore;
pub use scopes::ScopeStore;
pub use users::UserStore;

use thiserror::Error;

/// Shared error type across the per-entity DAOs (C3). `Duplicate` corresponds
/// to an `Insert` whose `ON CONFLICT DO NOTHING` inserted zero rows.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate")]
    Duplicate,
    #[error("crypto-unavailable")]
    CryptoUnavailable,
    #[error(transparent)]
    Sql(#[from] sqlx::Error),
}

/// Builds the `id = :id OR name = :id [OR email = :id]` canonical lookup
/// clause shared by every DAO's `Get`.
pub(crate) fn id_or_name_clause(extra_column: Option<&str>) -> String {
    match extra_column {
        Some(col) => format!("(id::text = $1 OR name = $1 OR {col} = $1)"),
        None => "(id::text = $1 OR name = $1)".to_string(),
    }
}
