//! File-backed problem records.
//!
//! A differential saved between CLI runs is one JSON [`ProblemRecord`].
//! Writers hold `<file>.lock`, created exclusively, for the whole
//! read-modify-write, and replace the file by renaming a fully written
//! `<file>.tmp` over it. A reader therefore sees the old record or the new
//! one, never a partial write, and two writers cannot drop each other's
//! evidence.

use super::{HypothesisStore, ProblemRecord, StoreError};
use crate::logging::{event_names, Stage};
use dpe_common::{Error, ProblemId};
use std::ffi::OsString;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// How long [`RecordFile::lock`] waits for another writer by default.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

const LOCK_RETRY: Duration = Duration::from_millis(10);

/// A problem record on disk, plus its lock and temp siblings.
#[derive(Debug, Clone)]
pub struct RecordFile {
    path: PathBuf,
    lock_path: PathBuf,
    tmp_path: PathBuf,
    lock_timeout: Duration,
}

/// Exclusive right to rewrite a [`RecordFile`]. Released on drop.
#[derive(Debug)]
pub struct RecordLock {
    lock_path: PathBuf,
}

impl Drop for RecordLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.lock_path);
    }
}

impl RecordFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            lock_path: sibling(&path, "lock"),
            tmp_path: sibling(&path, "tmp"),
            path,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Take the writer lock, polling until the timeout runs out.
    ///
    /// A lock left behind by a killed process is never broken automatically;
    /// the caller gets [`Error::RecordLocked`] and must remove it by hand.
    pub fn lock(&self) -> Result<RecordLock, Error> {
        let started = Instant::now();
        loop {
            match OpenOptions::new()
                .create_new(true)
                .write(true)
                .open(&self.lock_path)
            {
                Ok(mut handle) => {
                    let _ = writeln!(handle, "{}", std::process::id());
                    return Ok(RecordLock {
                        lock_path: self.lock_path.clone(),
                    });
                }
                Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                    if started.elapsed() >= self.lock_timeout {
                        warn!(
                            event = event_names::STORE_RECORD_LOCKED,
                            stage = %Stage::Store,
                            path = %self.path.display(),
                            waited_ms = started.elapsed().as_millis() as u64,
                            "record still locked"
                        );
                        return Err(Error::RecordLocked {
                            path: self.path.display().to_string(),
                        });
                    }
                    thread::sleep(LOCK_RETRY);
                }
                Err(err) => return Err(Error::Io(err)),
            }
        }
    }

    pub fn read(&self) -> Result<ProblemRecord, Error> {
        let content = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Replace the record. The temp file is synced before the rename.
    pub fn write(&self, record: &ProblemRecord, _lock: &RecordLock) -> Result<(), Error> {
        let json = serde_json::to_vec_pretty(record)?;
        {
            let mut file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&self.tmp_path)?;
            file.write_all(&json)?;
            file.sync_all()?;
        }
        fs::rename(&self.tmp_path, &self.path)?;
        debug!(
            event = event_names::STORE_RECORD_WRITTEN,
            stage = %Stage::Store,
            path = %self.path.display(),
            problem_id = %record.problem_id,
            hypotheses = record.hypotheses.len(),
            "record written"
        );
        Ok(())
    }

    /// Import the record into `store`, apply `change`, write the result back.
    ///
    /// The lock is held from the read to the rename. If `change` fails the
    /// file is left untouched.
    pub fn update<F>(&self, store: &HypothesisStore, change: F) -> Result<ProblemRecord, Error>
    where
        F: FnOnce(&HypothesisStore, ProblemId) -> Result<(), StoreError>,
    {
        let lock = self.lock()?;
        let problem = store.import_problem(self.read()?)?;
        change(store, problem)?;
        let record = store.export_problem(problem)?;
        self.write(&record, &lock)?;
        Ok(record)
    }
}

/// `ddx.json` -> `ddx.json.<suffix>`, in the same directory so the rename
/// stays on one filesystem.
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("record"));
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dpe_common::DiagnosisId;
    use dpe_config::StorePolicy;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn seeded(file: &RecordFile) -> ProblemRecord {
        let store = HypothesisStore::default();
        let problem = store.open_problem().unwrap();
        store
            .propose(problem, DiagnosisId::parse("pe").unwrap(), 0.2)
            .unwrap();
        let record = store.export_problem(problem).unwrap();
        let lock = file.lock().unwrap();
        file.write(&record, &lock).unwrap();
        record
    }

    #[test]
    fn sibling_paths_keep_the_full_name() {
        let file = RecordFile::new("/tmp/cases/ddx.json");
        assert_eq!(file.lock_path, PathBuf::from("/tmp/cases/ddx.json.lock"));
        assert_eq!(file.tmp_path, PathBuf::from("/tmp/cases/ddx.json.tmp"));
    }

    #[test]
    fn write_replaces_and_cleans_up() {
        let dir = tempdir().unwrap();
        let file = RecordFile::new(dir.path().join("ddx.json"));
        let record = seeded(&file);

        assert_eq!(file.read().unwrap(), record);
        assert!(!file.tmp_path.exists());
        assert!(!file.lock_path.exists(), "lock must be released on drop");
    }

    #[test]
    fn lock_is_exclusive_until_dropped() {
        let dir = tempdir().unwrap();
        let file = RecordFile::new(dir.path().join("ddx.json"))
            .with_lock_timeout(Duration::from_millis(30));

        let held = file.lock().unwrap();
        assert!(matches!(file.lock(), Err(Error::RecordLocked { .. })));
        drop(held);
        assert!(file.lock().is_ok());
    }

    #[test]
    fn update_waits_out_a_foreign_lock_then_fails_cleanly() {
        let dir = tempdir().unwrap();
        let file = RecordFile::new(dir.path().join("ddx.json"))
            .with_lock_timeout(Duration::from_millis(30));
        seeded(&file);
        let before = fs::read(file.path()).unwrap();

        fs::write(&file.lock_path, "4242\n").unwrap();
        let err = file
            .update(&HypothesisStore::default(), |store, problem| {
                store
                    .propose(problem, DiagnosisId::parse("acs").unwrap(), 0.3)
                    .map(|_| ())
            })
            .unwrap_err();
        assert!(matches!(err, Error::RecordLocked { .. }));
        assert_eq!(fs::read(file.path()).unwrap(), before);
        // Someone else's lock is not ours to remove.
        assert!(file.lock_path.exists());
    }

    #[test]
    fn failed_change_leaves_file_untouched() {
        let dir = tempdir().unwrap();
        let file = RecordFile::new(dir.path().join("ddx.json"));
        seeded(&file);
        let before = fs::read(file.path()).unwrap();

        let err = file
            .update(&HypothesisStore::default(), |store, problem| {
                store
                    .propose(problem, DiagnosisId::parse("pe").unwrap(), 0.5)
                    .map(|_| ())
            })
            .unwrap_err();
        assert!(matches!(err, Error::InvalidField { .. }));
        assert_eq!(fs::read(file.path()).unwrap(), before);
        assert!(!file.lock_path.exists());
    }

    #[test]
    fn leftover_temp_file_does_not_corrupt_the_record() {
        let dir = tempdir().unwrap();
        let file = RecordFile::new(dir.path().join("ddx.json"));
        let record = seeded(&file);

        // A writer killed mid-write leaves only a partial temp file behind.
        fs::write(&file.tmp_path, "{\"problem_id\": ").unwrap();
        assert_eq!(file.read().unwrap(), record);

        let updated = file
            .update(&HypothesisStore::default(), |store, problem| {
                store
                    .propose(problem, DiagnosisId::parse("acs").unwrap(), 0.3)
                    .map(|_| ())
            })
            .unwrap();
        assert_eq!(updated.hypotheses.len(), 2);
        assert_eq!(file.read().unwrap(), updated);
        assert!(!file.tmp_path.exists());
    }

    #[test]
    fn concurrent_updates_through_separate_stores_all_land() {
        const WRITERS: usize = 8;
        let dir = tempdir().unwrap();
        let file = Arc::new(RecordFile::new(dir.path().join("ddx.json")));
        let record = seeded(&file);
        let target = record.hypotheses[0].id;

        let handles: Vec<_> = (0..WRITERS)
            .map(|_| {
                let file = Arc::clone(&file);
                thread::spawn(move || {
                    // Each writer is its own process in practice: fresh store, shared file.
                    let store = HypothesisStore::new(StorePolicy::default()).unwrap();
                    file.update(&store, |store, problem| {
                        store.record_evidence(problem, target, 1.1).map(|_| ())
                    })
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap().unwrap();
        }

        let stored = file.read().unwrap();
        let ledger = &stored.hypotheses[0].evidence;
        assert_eq!(ledger.len(), WRITERS);
        for pair in ledger.windows(2) {
            assert_eq!(pair[0].posterior, pair[1].prior, "ledger must chain");
        }
    }
}
