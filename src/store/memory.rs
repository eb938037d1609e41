use dashmap::DashMap;

use super::{ReviewRecord, ReviewStore, StoreError};

/// In-memory review table backed by a lock-free concurrent map.
#[derive(Debug, Default)]
pub struct MemoryReviewStore {
    table: String,
    items: DashMap<(String, String), ReviewRecord>,
}

impl MemoryReviewStore {
    /// Create an empty table named `table`
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            items: DashMap::new(),
        }
    }

    /// Number of stored records
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the table is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Snapshot of all records, sorted by key
    #[must_use]
    pub fn records(&self) -> Vec<ReviewRecord> {
        let mut records: Vec<ReviewRecord> =
            self.items.iter().map(|entry| entry.value().clone()).collect();
        records.sort_by(|a, b| a.key().cmp(&b.key()));
        records
    }
}

impl ReviewStore for MemoryReviewStore {
    fn put_review(&self, record: &ReviewRecord) -> Result<(), StoreError> {
        self.items.insert(
            (record.app_name.clone(), record.create_date.clone()),
            record.clone(),
        );
        Ok(())
    }

    fn get_review(
        &self,
        app_name: &str,
        create_date: &str,
    ) -> Result<Option<ReviewRecord>, StoreError> {
        Ok(self
            .items
            .get(&(app_name.to_string(), create_date.to_string()))
            .map(|entry| entry.value().clone()))
    }

    fn table_name(&self) -> &str {
        &self.table
    }
}
