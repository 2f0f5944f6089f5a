//! Version store test utilities

use std::sync::Arc;

use tempfile::TempDir;

use version_check::version::store::{SqliteSlot, VersionStore};

/// Creates a store on a fresh SQLite file, with `current` stored when given
pub fn create_test_store(current: Option<&str>) -> (TempDir, Arc<VersionStore<SqliteSlot>>) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("versions.db");
    let store = VersionStore::new(SqliteSlot::new(&db_path).unwrap());
    if let Some(current) = current {
        store.set_current(Some(current)).unwrap();
    }
    (temp_dir, Arc::new(store))
}
