// Handler modules
pub mod convert;
pub mod harden;
pub mod parse;
pub mod projects;
pub mod validate;

// Re-export all handler functions
pub use convert::handle_convert;
pub use harden::handle_harden;
pub use parse::handle_parse;
pub use projects::handle_projects;
pub use validate::handle_validate;

use crate::storage::DirectoryStore;
use std::path::Path;

/// Store at `dir`, or the default data directory.
pub fn open_store(dir: Option<&Path>) -> DirectoryStore {
    match dir {
        Some(dir) => DirectoryStore::new(dir),
        None => DirectoryStore::default(),
    }
}
