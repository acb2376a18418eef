//! Saved conversion projects.
//!
//! Projects are kept behind the [`ProjectStore`] trait so the conversion core
//! never depends on a storage runtime. Two stores ship with the crate:
//! [`MemoryStore`] for tests and embedding, and [`DirectoryStore`] which keeps
//! one JSON file per project on disk.
//!
//! Every store enforces a byte quota. Writes that would push usage past the
//! limit fail with [`StorageError::QuotaExceeded`].

mod directory;
mod memory;

pub use directory::DirectoryStore;
pub use memory::MemoryStore;

use crate::converter::ConversionOptions;
use crate::error::StorageError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default quota for a store.
pub const DEFAULT_STORAGE_LIMIT: u64 = 5 * 1024 * 1024;

/// Usage at or above this percentage is reported as near the limit.
pub const NEAR_LIMIT_PERCENTAGE: f64 = 80.0;

/// The compose file a project was created from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComposeSource {
    pub filename: String,
    pub content: String,
}

/// A saved conversion project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub compose: ComposeSource,
    pub options: ConversionOptions,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub fn new(
        name: impl Into<String>,
        filename: impl Into<String>,
        content: impl Into<String>,
        options: ConversionOptions,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            compose: ComposeSource {
                filename: filename.into(),
                content: content.into(),
            },
            options,
            created_at: now,
            updated_at: now,
        }
    }

    /// Bumps `updated_at`.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Size the project occupies in a store, in bytes.
    pub fn stored_size(&self) -> Result<u64, StorageError> {
        Ok(serde_json::to_vec(self)?.len() as u64)
    }
}

/// Quota usage of a store.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageUsage {
    pub used: u64,
    pub limit: u64,
    pub usage_percentage: f64,
    pub near_limit: bool,
}

impl StorageUsage {
    pub fn new(used: u64, limit: u64) -> Self {
        let usage_percentage = if limit == 0 {
            100.0
        } else {
            used as f64 / limit as f64 * 100.0
        };
        Self {
            used,
            limit,
            usage_percentage,
            near_limit: usage_percentage >= NEAR_LIMIT_PERCENTAGE,
        }
    }
}

/// Key-value store of projects keyed by id.
pub trait ProjectStore {
    fn get(&self, id: &Uuid) -> Result<Option<Project>, StorageError>;

    /// Inserts or replaces a project.
    fn set(&mut self, project: Project) -> Result<(), StorageError>;

    /// All projects, most recently updated first.
    fn list(&self) -> Result<Vec<Project>, StorageError>;

    /// Removes a project. Returns whether it existed.
    fn delete(&mut self, id: &Uuid) -> Result<bool, StorageError>;

    fn usage(&self) -> Result<StorageUsage, StorageError>;
}

/// Fails when replacing `existing` bytes with `incoming` bytes would exceed `limit`.
pub(crate) fn check_quota(used: u64, existing: u64, incoming: u64, limit: u64) -> Result<(), StorageError> {
    let projected = used.saturating_sub(existing) + incoming;
    if projected > limit {
        log::warn!("Project store quota exceeded: {} of {} bytes", projected, limit);
        return Err(StorageError::QuotaExceeded {
            used: projected,
            limit,
        });
    }
    Ok(())
}

/// Finds a project by full id or unique id prefix.
pub fn find_project(store: &dyn ProjectStore, identifier: &str) -> Result<Option<Project>, StorageError> {
    if let Ok(id) = Uuid::parse_str(identifier) {
        return store.get(&id);
    }
    let mut matches: Vec<Project> = store
        .list()?
        .into_iter()
        .filter(|p| p.id.to_string().starts_with(identifier))
        .collect();
    if matches.len() == 1 {
        Ok(matches.pop())
    } else {
        Ok(None)
    }
}

fn sort_recent_first(projects: &mut [Project]) {
    projects.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.id.cmp(&b.id)));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_percentage() {
        let usage = StorageUsage::new(4 * 1024 * 1024, DEFAULT_STORAGE_LIMIT);
        assert!((usage.usage_percentage - 80.0).abs() < f64::EPSILON);
        assert!(usage.near_limit);
        assert!(!StorageUsage::new(1024, DEFAULT_STORAGE_LIMIT).near_limit);
    }

    #[test]
    fn test_check_quota_counts_replacement() {
        assert!(check_quota(90, 40, 50, 100).is_ok());
        match check_quota(90, 0, 20, 100) {
            Err(StorageError::QuotaExceeded { used, limit }) => assert_eq!((used, limit), (110, 100)),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_find_project_by_prefix() {
        let mut store = MemoryStore::default();
        let project = Project::new("shop", "docker-compose.yml", "services: {}\n", ConversionOptions::default());
        let id = project.id;
        store.set(project).unwrap();

        let prefix = &id.to_string()[..8];
        assert_eq!(find_project(&store, prefix).unwrap().map(|p| p.id), Some(id));
        assert_eq!(find_project(&store, &id.to_string()).unwrap().map(|p| p.id), Some(id));
        assert!(find_project(&store, "zzzz").unwrap().is_none());
    }
}
