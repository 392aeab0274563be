mod auth;
mod error;
mod paths;
mod schema;
mod store;

pub use auth::{dashboard_route, AuthError, Authenticator};
pub use error::ProfileStoreError;
pub use paths::{profile_file_name, STORAGE_KEY};
pub use schema::{UserProfile, UserRole};
pub use store::ProfileStore;
