use crate::{Error, Result};
use std::path::{Path, PathBuf};

/// A Chrome user-data directory.
///
/// Persistent profiles keep the target site's login between runs; temporary
/// ones are removed on drop.
pub struct ProfileManager {
    path: PathBuf,
    is_temporary: bool,
}

impl ProfileManager {
    pub fn temporary() -> Result<Self> {
        let path = tempfile::Builder::new()
            .prefix("autooff-profile-")
            .tempdir()?
            .keep();

        Ok(Self {
            path,
            is_temporary: true,
        })
    }

    pub fn persistent(path: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&path)?;
        Ok(Self {
            path,
            is_temporary: false,
        })
    }

    /// `~/.autooff/profiles/<name>`
    pub fn named(name: &str) -> Result<Self> {
        if name.is_empty() || name.contains(['/', '\\']) || name == ".." {
            return Err(Error::Browser(format!("Invalid profile name: {:?}", name)));
        }
        let home = dirs::home_dir()
            .ok_or_else(|| Error::Browser("Could not determine home directory".to_string()))?;
        Self::persistent(home.join(".autooff").join("profiles").join(name))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_temporary(&self) -> bool {
        self.is_temporary
    }
}

impl Drop for ProfileManager {
    fn drop(&mut self) {
        if self.is_temporary && self.path.exists() {
            if let Err(e) = std::fs::remove_dir_all(&self.path) {
                tracing::debug!("Could not remove {}: {}", self.path.display(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temporary_profile_is_removed_on_drop() {
        let profile = ProfileManager::temporary().unwrap();
        let path = profile.path().to_path_buf();
        assert!(path.is_dir());
        assert!(profile.is_temporary());

        drop(profile);
        assert!(!path.exists());
    }

    #[test]
    fn test_persistent_profile_survives_drop() {
        let temp_dir = tempfile::tempdir().unwrap();
        let profile_path = temp_dir.path().join("nested").join("profile");

        let profile = ProfileManager::persistent(profile_path.clone()).unwrap();
        assert!(profile_path.is_dir());
        assert!(!profile.is_temporary());

        drop(profile);
        assert!(profile_path.exists());
    }

    #[test]
    fn test_named_profile_rejects_paths() {
        assert!(ProfileManager::named("../elsewhere").is_err());
        assert!(ProfileManager::named("").is_err());
    }
}
