use super::{DEFAULT_STORAGE_LIMIT, Project, ProjectStore, StorageUsage, check_quota, sort_recent_first};
use crate::error::StorageError;
use std::collections::HashMap;
use uuid::Uuid;

/// In-memory project store.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    projects: HashMap<Uuid, (Project, u64)>,
    limit: u64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::with_limit(DEFAULT_STORAGE_LIMIT)
    }
}

impl MemoryStore {
    pub fn with_limit(limit: u64) -> Self {
        Self {
            projects: HashMap::new(),
            limit,
        }
    }

    fn used(&self) -> u64 {
        self.projects.values().map(|(_, size)| size).sum()
    }
}

impl ProjectStore for MemoryStore {
    fn get(&self, id: &Uuid) -> Result<Option<Project>, StorageError> {
        Ok(self.projects.get(id).map(|(project, _)| project.clone()))
    }

    fn set(&mut self, project: Project) -> Result<(), StorageError> {
        let size = project.stored_size()?;
        let existing = self.projects.get(&project.id).map_or(0, |(_, size)| *size);
        check_quota(self.used(), existing, size, self.limit)?;
        self.projects.insert(project.id, (project, size));
        Ok(())
    }

    fn list(&self) -> Result<Vec<Project>, StorageError> {
        let mut projects: Vec<Project> = self.projects.values().map(|(p, _)| p.clone()).collect();
        sort_recent_first(&mut projects);
        Ok(projects)
    }

    fn delete(&mut self, id: &Uuid) -> Result<bool, StorageError> {
        Ok(self.projects.remove(id).is_some())
    }

    fn usage(&self) -> Result<StorageUsage, StorageError> {
        Ok(StorageUsage::new(self.used(), self.limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::ConversionOptions;

    fn project(name: &str, content: &str) -> Project {
        Project::new(name, "docker-compose.yml", content, ConversionOptions::default())
    }

    #[test]
    fn test_set_get_delete() {
        let mut store = MemoryStore::default();
        let p = project("shop", "services:\n  web:\n    image: nginx\n");
        let id = p.id;
        store.set(p.clone()).unwrap();

        assert_eq!(store.get(&id).unwrap(), Some(p));
        assert_eq!(store.list().unwrap().len(), 1);
        assert!(store.delete(&id).unwrap());
        assert!(!store.delete(&id).unwrap());
        assert_eq!(store.usage().unwrap().used, 0);
    }

    #[test]
    fn test_quota_rejects_oversized_project() {
        let mut store = MemoryStore::with_limit(512);
        let err = store.set(project("big", &"x".repeat(1024))).unwrap_err();
        assert!(matches!(err, StorageError::QuotaExceeded { limit: 512, .. }));
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_replacing_project_reuses_its_space() {
        let mut p = project("shop", &"x".repeat(300));
        let limit = p.stored_size().unwrap() + 40;
        let mut store = MemoryStore::with_limit(limit);
        store.set(p.clone()).unwrap();

        p.compose.content = "x".repeat(305);
        p.touch();
        store.set(p).unwrap();
        assert_eq!(store.list().unwrap().len(), 1);
    }
}
