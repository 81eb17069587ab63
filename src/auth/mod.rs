pub mod client;
pub mod user;

pub use client::{ClientAuthError, ClientAuthenticator, GRANT_TYPE_CLIENT_CREDENTIALS, GRANT_TYPE_DEVICE_CODE};
pub use user::{AuthenticatedUser, UserAuthError, UserAuthenticator};
