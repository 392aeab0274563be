use std::path::{Path, PathBuf};

/// Fixed storage key for the single persisted user-profile record.
pub const STORAGE_KEY: &str = "user";

#[must_use]
pub fn profile_file_name() -> String {
    format!("{STORAGE_KEY}.json")
}

#[must_use]
pub(crate) fn profile_path(root: &Path) -> PathBuf {
    root.join(profile_file_name())
}
