use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ProfileStoreError;
use crate::paths::profile_path;
use crate::schema::UserProfile;

/// Persists the single user-profile record under a caller-supplied root
/// directory.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    root: PathBuf,
}

impl ProfileStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Loads the persisted profile, or `None` when no record exists.
    pub fn load(&self) -> Result<Option<UserProfile>, ProfileStoreError> {
        let path = profile_path(&self.root);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ProfileStoreError::io("reading profile record", &path, source))
            }
        };

        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| ProfileStoreError::JsonParse { path, source })
    }

    /// Writes the profile record, creating the root directory when needed.
    pub fn save(&self, profile: &UserProfile) -> Result<(), ProfileStoreError> {
        fs::create_dir_all(&self.root)
            .map_err(|source| ProfileStoreError::io("creating profile root", &self.root, source))?;

        let path = profile_path(&self.root);
        let raw = serde_json::to_string(profile)
            .map_err(|source| ProfileStoreError::JsonSerialize {
                path: path.clone(),
                source,
            })?;

        fs::write(&path, raw)
            .map_err(|source| ProfileStoreError::io("writing profile record", &path, source))
    }

    /// Removes the persisted record; absent records are not an error.
    pub fn clear(&self) -> Result<(), ProfileStoreError> {
        let path = profile_path(&self.root);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(ProfileStoreError::io("removing profile record", &path, source)),
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use crate::schema::{UserProfile, UserRole};

    use super::ProfileStore;

    fn sample_profile() -> UserProfile {
        UserProfile::new("1", "Admin User", "admin@example.com", UserRole::Admin)
    }

    #[test]
    fn load_returns_none_before_first_save() {
        let dir = tempdir().expect("tempdir");
        let store = ProfileStore::new(dir.path());
        assert_eq!(store.load().expect("load succeeds"), None);
    }

    #[test]
    fn save_then_load_round_trips_the_record() {
        let dir = tempdir().expect("tempdir");
        let store = ProfileStore::new(dir.path().join("state"));

        store.save(&sample_profile()).expect("save succeeds");
        assert_eq!(
            store.load().expect("load succeeds"),
            Some(sample_profile())
        );
    }

    #[test]
    fn clear_removes_the_record_and_is_idempotent() {
        let dir = tempdir().expect("tempdir");
        let store = ProfileStore::new(dir.path());

        store.save(&sample_profile()).expect("save succeeds");
        store.clear().expect("clear succeeds");
        assert_eq!(store.load().expect("load succeeds"), None);
        store.clear().expect("second clear is a no-op");
    }

    #[test]
    fn corrupt_record_surfaces_parse_error() {
        let dir = tempdir().expect("tempdir");
        let store = ProfileStore::new(dir.path());
        std::fs::write(dir.path().join("user.json"), "{not json").expect("write corrupt record");

        assert!(store.load().is_err());
    }
}
