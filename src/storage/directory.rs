use super::{DEFAULT_STORAGE_LIMIT, Project, ProjectStore, StorageUsage, check_quota, sort_recent_first};
use crate::error::StorageError;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Store keeping one `<id>.json` file per project in a directory.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
    limit: u64,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            limit: DEFAULT_STORAGE_LIMIT,
        }
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    /// `<data dir>/compose-bridge/projects`, falling back to the working directory.
    pub fn default_location() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("compose-bridge")
            .join("projects")
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, id: &Uuid) -> PathBuf {
        self.root.join(format!("{}.json", id))
    }

    fn entries(&self) -> Result<Vec<PathBuf>, StorageError> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        Ok(fs::read_dir(&self.root)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .collect())
    }

    fn used(&self) -> Result<u64, StorageError> {
        let mut used = 0;
        for path in self.entries()? {
            used += fs::metadata(&path)?.len();
        }
        Ok(used)
    }
}

impl Default for DirectoryStore {
    fn default() -> Self {
        Self::new(Self::default_location())
    }
}

impl ProjectStore for DirectoryStore {
    fn get(&self, id: &Uuid) -> Result<Option<Project>, StorageError> {
        let path = self.path_for(id);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    fn set(&mut self, project: Project) -> Result<(), StorageError> {
        let json = serde_json::to_vec(&project)?;
        let path = self.path_for(&project.id);
        let existing = fs::metadata(&path).map_or(0, |m| m.len());
        check_quota(self.used()?, existing, json.len() as u64, self.limit)?;

        fs::create_dir_all(&self.root)?;
        fs::write(&path, json)?;
        log::debug!("Saved project {} to {}", project.id, path.display());
        Ok(())
    }

    fn list(&self) -> Result<Vec<Project>, StorageError> {
        let mut projects = Vec::new();
        for path in self.entries()? {
            // Foreign or corrupt files in the directory are skipped
            let parsed = fs::read_to_string(&path)
                .ok()
                .and_then(|content| serde_json::from_str::<Project>(&content).ok());
            match parsed {
                Some(project) => projects.push(project),
                None => log::warn!("Skipping unreadable project file {}", path.display()),
            }
        }
        sort_recent_first(&mut projects);
        Ok(projects)
    }

    fn delete(&mut self, id: &Uuid) -> Result<bool, StorageError> {
        let path = self.path_for(id);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(path)?;
        Ok(true)
    }

    fn usage(&self) -> Result<StorageUsage, StorageError> {
        Ok(StorageUsage::new(self.used()?, self.limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::ConversionOptions;
    use tempfile::TempDir;

    #[test]
    fn test_round_trip_on_disk() {
        let dir = TempDir::new().unwrap();
        let mut store = DirectoryStore::new(dir.path().join("projects"));
        assert!(store.list().unwrap().is_empty());

        let project = Project::new("shop", "compose.yml", "services: {}\n", ConversionOptions::default());
        let id = project.id;
        store.set(project.clone()).unwrap();

        assert_eq!(store.get(&id).unwrap(), Some(project));
        assert!(store.usage().unwrap().used > 0);
        assert!(store.delete(&id).unwrap());
        assert_eq!(store.get(&id).unwrap(), None);
    }

    #[test]
    fn test_corrupt_files_are_skipped() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("junk.json"), "{not json").unwrap();
        let store = DirectoryStore::new(dir.path());
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_quota_enforced() {
        let dir = TempDir::new().unwrap();
        let mut store = DirectoryStore::new(dir.path()).with_limit(64);
        let project = Project::new("shop", "compose.yml", "x".repeat(200), ConversionOptions::default());
        assert!(matches!(
            store.set(project),
            Err(StorageError::QuotaExceeded { .. })
        ));
        assert!(!dir.path().join("projects").exists());
    }
}
