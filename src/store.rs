use std::path::Path;

use crate::data::loader;
use crate::data::model::{Dataset, Table};
use crate::error::LoadError;

// ---------------------------------------------------------------------------
// DatasetStore – versioned holder of the current dataset
// ---------------------------------------------------------------------------

/// Owns the current dataset of one session and hands out strictly
/// increasing version numbers. Loading replaces the base dataset;
/// committing a transformed table supersedes the working dataset.
/// Payloads are immutable once versioned.
#[derive(Debug, Default)]
pub struct DatasetStore {
    current: Option<Dataset>,
    next_version: u64,
}

impl DatasetStore {
    pub fn new() -> Self {
        DatasetStore {
            current: None,
            next_version: 1,
        }
    }

    /// Load a dataset from a file, replacing any previous one. On error
    /// the store is left untouched (the old dataset, if any, survives).
    pub fn load(&mut self, path: &Path) -> Result<&Dataset, LoadError> {
        let table = loader::load_file(path)?;
        let id = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("dataset")
            .to_string();
        Ok(self.install(id, table))
    }

    /// Commit a transformed table as the new current dataset, keeping the
    /// identity of the dataset it was derived from.
    pub fn commit(&mut self, table: Table) -> &Dataset {
        let id = self
            .current
            .as_ref()
            .map(|d| d.id.clone())
            .unwrap_or_else(|| "dataset".to_string());
        self.install(id, table)
    }

    fn install(&mut self, id: String, table: Table) -> &Dataset {
        let version = self.next_version;
        self.next_version += 1;
        log::info!("dataset '{id}' now at v{version} ({} rows)", table.len());
        self.current = Some(Dataset { id, version, table });
        self.current.as_ref().unwrap_or_else(|| unreachable!())
    }

    /// The current dataset, `None` until the first successful load.
    pub fn current(&self) -> Option<&Dataset> {
        self.current.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{CellValue, Column, ColumnType};
    use std::io::Write;

    fn table() -> Table {
        let col = Column::new("a", ColumnType::Integer, vec![CellValue::Integer(1)]);
        Table::new(vec![col]).unwrap()
    }

    #[test]
    fn versions_strictly_increase_across_commits() {
        let mut store = DatasetStore::new();
        let v1 = store.commit(table()).version;
        let v2 = store.commit(table()).version;
        assert!(v2 > v1);
    }

    #[test]
    fn failed_load_leaves_store_untouched() {
        let mut store = DatasetStore::new();
        store.commit(table());
        let before = store.current().unwrap().version;

        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        file.write_all(b"not json").unwrap();
        assert!(store.load(file.path()).is_err());
        assert_eq!(store.current().unwrap().version, before);
    }
}
