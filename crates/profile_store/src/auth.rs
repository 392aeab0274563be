use std::path::PathBuf;

use thiserror::Error;

use crate::error::ProfileStoreError;
use crate::schema::{UserProfile, UserRole};
use crate::store::ProfileStore;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error(transparent)]
    Store(#[from] ProfileStoreError),
}

/// Demo credential table. A real deployment replaces this with a backend
/// call; the surrounding lifecycle (persist on login, clear on logout,
/// restore on startup) stays the same.
const DEMO_ACCOUNTS: [(&str, &str, &str, &str, UserRole); 3] = [
    ("admin@example.com", "password", "1", "Admin User", UserRole::Admin),
    (
        "consultant@example.com",
        "password",
        "2",
        "Consultant User",
        UserRole::Consultant,
    ),
    ("hr@example.com", "password", "3", "HR User", UserRole::Hr),
];

/// Authentication collaborator: mock-credential login backed by the
/// persisted profile record.
#[derive(Debug)]
pub struct Authenticator {
    store: ProfileStore,
    user: Option<UserProfile>,
    loading: bool,
}

impl Authenticator {
    /// Creates an authenticator and restores any persisted profile.
    ///
    /// A corrupt or unreadable record is treated as logged-out rather than a
    /// startup failure.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let store = ProfileStore::new(root);
        let user = store.load().ok().flatten();

        Self {
            store,
            user,
            loading: false,
        }
    }

    #[must_use]
    pub fn user(&self) -> Option<&UserProfile> {
        self.user.as_ref()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Checks the credentials, persists the matched profile, and signs the
    /// user in. The stored record is untouched when the credentials are
    /// rejected.
    pub fn login(&mut self, email: &str, password: &str) -> Result<&UserProfile, AuthError> {
        self.loading = true;
        let result = self.login_inner(email, password);
        self.loading = false;

        Ok(self.user.insert(result?))
    }

    fn login_inner(&mut self, email: &str, password: &str) -> Result<UserProfile, AuthError> {
        let (_, _, id, name, role) = DEMO_ACCOUNTS
            .iter()
            .find(|(account_email, account_password, ..)| {
                *account_email == email && *account_password == password
            })
            .ok_or(AuthError::InvalidCredentials)?;

        let profile = UserProfile::new(*id, *name, email, *role);
        self.store.save(&profile)?;
        Ok(profile)
    }

    /// Signs the user out and removes the persisted record.
    pub fn logout(&mut self) -> Result<(), AuthError> {
        self.store.clear()?;
        self.user = None;
        Ok(())
    }
}

/// Dashboard route for a signed-in role.
///
/// Consults the authenticated role directly instead of inspecting the email
/// address.
#[must_use]
pub fn dashboard_route(role: UserRole) -> &'static str {
    if role.is_administrative() {
        "/admin/dashboard"
    } else {
        "/consultant/dashboard"
    }
}
