use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::debug;

use super::{ReviewRecord, ReviewStore, StoreError};

/// Append-only review table stored as JSON lines in `<dir>/<table>.jsonl`.
///
/// Writes are serialized through a mutex and flushed before returning. A read
/// scans the whole file and returns the last line written for the key, which
/// gives overwrite semantics for repeated keys.
#[derive(Debug)]
pub struct FileReviewStore {
    table: String,
    path: PathBuf,
    file: Mutex<File>,
}

impl FileReviewStore {
    /// Open (creating if needed) the table file under `dir`.
    pub fn open(dir: impl AsRef<Path>, table: impl Into<String>) -> Result<Self, StoreError> {
        let table = table.into();
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let path = dir.join(format!("{table}.jsonl"));
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        debug!(path = %path.display(), "Opened review table file");
        Ok(Self {
            table,
            path,
            file: Mutex::new(file),
        })
    }

    /// Location of the table file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReviewStore for FileReviewStore {
    fn put_review(&self, record: &ReviewRecord) -> Result<(), StoreError> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');
        let mut file = self
            .file
            .lock()
            .map_err(|_| StoreError::Rejected("table file lock poisoned".into()))?;
        file.write_all(&line)?;
        file.flush()?;
        Ok(())
    }

    fn get_review(
        &self,
        app_name: &str,
        create_date: &str,
    ) -> Result<Option<ReviewRecord>, StoreError> {
        // Hold the writer lock so a concurrent append is never read half-written.
        let _guard = self
            .file
            .lock()
            .map_err(|_| StoreError::Rejected("table file lock poisoned".into()))?;
        let reader = BufReader::new(File::open(&self.path)?);
        let mut found = None;
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record: ReviewRecord = serde_json::from_str(&line)?;
            if record.key() == (app_name, create_date) {
                found = Some(record);
            }
        }
        Ok(found)
    }

    fn table_name(&self) -> &str {
        &self.table
    }
}
