//! Append-only storage for audit entries.
//!
//! Callers depend on [`AuditStore`] only; whether lines end up in a file or in
//! memory is decided at wiring time.

use std::{
    collections::VecDeque,
    fs::{self, OpenOptions},
    io::{self, BufRead, BufReader, Write},
    path::{Path, PathBuf},
    sync::Mutex,
};
use tracing::{debug, info};

use super::entry::AuditEntry;

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("audit log I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("audit store lock poisoned")]
    Poisoned,
    #[error("audit task failed: {0}")]
    Task(String),
}

pub trait AuditStore: Send + Sync {
    /// Append one entry. Entries are never edited or removed afterwards.
    ///
    /// # Errors
    /// Returns an error if the entry could not be persisted.
    fn append(&self, entry: &AuditEntry) -> Result<(), AuditError>;

    /// Visit every stored entry in append order.
    ///
    /// # Errors
    /// Returns an error if the backing storage cannot be read.
    fn scan(&self, visit: &mut dyn FnMut(&AuditEntry)) -> Result<(), AuditError>;

    /// Count the entries matching `predicate`.
    ///
    /// # Errors
    /// Returns an error if the backing storage cannot be read.
    fn count(&self, predicate: &dyn Fn(&AuditEntry) -> bool) -> Result<usize, AuditError> {
        let mut matches = 0;
        self.scan(&mut |entry| {
            if predicate(entry) {
                matches += 1;
            }
        })?;
        Ok(matches)
    }
}

/// Single shared log file; every day goes into the same file.
#[derive(Debug)]
pub struct FileAuditStore {
    path: PathBuf,
}

impl FileAuditStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_parent_dir(&self) -> io::Result<()> {
        let Some(dir) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) else {
            return Ok(());
        };
        if !dir.exists() {
            fs::create_dir_all(dir)?;
            info!("Created audit log directory at: {}", dir.display());
        }
        Ok(())
    }
}

impl AuditStore for FileAuditStore {
    fn append(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        self.ensure_parent_dir()?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        // One write per line so concurrent appenders never split a line.
        file.write_all(entry.to_line().as_bytes())?;
        Ok(())
    }

    fn scan(&self, visit: &mut dyn FnMut(&AuditEntry)) -> Result<(), AuditError> {
        self.ensure_parent_dir()?;
        let file = match fs::File::open(&self.path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(err) => return Err(err.into()),
        };

        for line in BufReader::new(file).split(b'\n') {
            let line = line?;
            let line = String::from_utf8_lossy(&line);
            if line.trim().is_empty() {
                continue;
            }
            match line.parse::<AuditEntry>() {
                Ok(entry) => visit(&entry),
                Err(err) => debug!("Skipping unreadable audit line: {err}"),
            }
        }

        Ok(())
    }
}

/// In-process store, optionally bounded as a ring buffer.
#[derive(Debug, Default)]
pub struct MemoryAuditStore {
    entries: Mutex<VecDeque<AuditEntry>>,
    capacity: Option<usize>,
}

impl MemoryAuditStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep at most `capacity` entries, dropping the oldest first.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity: Some(capacity),
        }
    }

    /// Snapshot of the stored entries in append order.
    ///
    /// # Errors
    /// Returns an error if the lock is poisoned.
    pub fn entries(&self) -> Result<Vec<AuditEntry>, AuditError> {
        let entries = self.entries.lock().map_err(|_| AuditError::Poisoned)?;
        Ok(entries.iter().cloned().collect())
    }
}

impl AuditStore for MemoryAuditStore {
    fn append(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        let mut entries = self.entries.lock().map_err(|_| AuditError::Poisoned)?;
        if let Some(capacity) = self.capacity {
            if capacity == 0 {
                return Ok(());
            }
            while entries.len() >= capacity {
                entries.pop_front();
            }
        }
        entries.push_back(entry.clone());
        Ok(())
    }

    fn scan(&self, visit: &mut dyn FnMut(&AuditEntry)) -> Result<(), AuditError> {
        let entries = self.entries.lock().map_err(|_| AuditError::Poisoned)?;
        entries.iter().for_each(|entry| visit(entry));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storefront::audit::entry::Outcome;
    use chrono::{TimeZone, Utc};

    fn entry(minute: u32, outcome: Outcome, identity: &str) -> AuditEntry {
        let ts = Utc
            .with_ymd_and_hms(2025, 4, 15, 9, minute, 0)
            .single()
            .unwrap();
        AuditEntry::new(ts, outcome, identity)
    }

    #[test]
    fn file_store_creates_missing_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("logs").join("auth_logins.log");
        let store = FileAuditStore::new(&path);

        store
            .append(&entry(0, Outcome::Success, "test@example.com"))
            .unwrap();

        assert!(path.exists());
        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(
            contents,
            "2025-04-15T09:00:00.000Z - SUCCESS - Login for email: test@example.com\n"
        );
    }

    #[test]
    fn file_store_appends_in_order() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileAuditStore::new(tmp.path().join("auth_logins.log"));

        store.append(&entry(0, Outcome::Failed, "a@example.com")).unwrap();
        store.append(&entry(1, Outcome::Success, "b@example.com")).unwrap();
        store.append(&entry(2, Outcome::Failed, "a@example.com")).unwrap();

        let mut seen = Vec::new();
        store
            .scan(&mut |e| seen.push((e.outcome(), e.identity().to_string())))
            .unwrap();
        assert_eq!(
            seen,
            vec![
                (Outcome::Failed, "a@example.com".to_string()),
                (Outcome::Success, "b@example.com".to_string()),
                (Outcome::Failed, "a@example.com".to_string()),
            ]
        );
    }

    #[test]
    fn file_store_missing_file_reads_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileAuditStore::new(tmp.path().join("nothing-yet.log"));
        assert_eq!(store.count(&|_| true).unwrap(), 0);
    }

    #[test]
    fn file_store_skips_garbage_lines() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("auth_logins.log");
        fs::write(
            &path,
            "not an audit line\n\n2025-04-15T09:00:00.000Z - FAILED - Login attempt for email: a@example.com\n",
        )
        .unwrap();

        let store = FileAuditStore::new(&path);
        assert_eq!(store.count(&AuditEntry::is_failure).unwrap(), 1);
    }

    #[test]
    fn file_store_surfaces_io_errors() {
        let tmp = tempfile::tempdir().unwrap();
        // A directory where the file should be makes both paths fail.
        let store = FileAuditStore::new(tmp.path());
        assert!(matches!(
            store.append(&entry(0, Outcome::Failed, "a@example.com")),
            Err(AuditError::Io(_))
        ));
        assert!(store.count(&|_| true).is_err());
    }

    #[test]
    fn memory_store_ring_buffer_drops_oldest() {
        let store = MemoryAuditStore::with_capacity(2);
        store.append(&entry(0, Outcome::Failed, "first@example.com")).unwrap();
        store.append(&entry(1, Outcome::Failed, "second@example.com")).unwrap();
        store.append(&entry(2, Outcome::Failed, "third@example.com")).unwrap();

        let identities: Vec<String> = store
            .entries()
            .unwrap()
            .iter()
            .map(|e| e.identity().to_string())
            .collect();
        assert_eq!(identities, vec!["second@example.com", "third@example.com"]);
    }

    #[test]
    fn count_uses_predicate() {
        let store = MemoryAuditStore::new();
        store.append(&entry(0, Outcome::Failed, "a@example.com")).unwrap();
        store.append(&entry(1, Outcome::Success, "a@example.com")).unwrap();
        store.append(&entry(2, Outcome::Failed, "b@example.com")).unwrap();

        let failed_for_a = store
            .count(&|e| e.is_failure() && e.is_for("a@example.com"))
            .unwrap();
        assert_eq!(failed_for_a, 1);
    }
}
