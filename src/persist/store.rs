//! Persistent Response Store
//!
//! Disk-backed storage of HTTP responses keyed by request identity. An
//! in-memory [`ResponseIndex`] is mirrored by one file per entry in a flat
//! directory; files are loaded back lazily, one identity at a time.
//!
//! Every public operation holds the store lock for its whole duration, so
//! an index mutation and the matching file write or delete never interleave
//! with another call. All I/O is blocking.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use crate::cache::CacheStats;
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::persist::file_namer::{is_data_file, is_temp_file, TEMP_FILE_PREFIX};
use crate::persist::{
    EntrySerializer, FileNamer, JsonEntrySerializer, ResponseIndex, StoredResponse,
};

pub struct PersistentResponseStore {
    namer: FileNamer,
    serializer: Box<dyn EntrySerializer>,
    state: Mutex<StoreState>,
    active: AtomicBool,
}

struct StoreState {
    index: ResponseIndex,
    stats: CacheStats,
    /// Files whose delete failed, retried on reconcile, close and drop
    pending_deletes: Vec<PathBuf>,
}

impl PersistentResponseStore {
    // == Constructors ==
    pub fn new(cache_dir: impl Into<PathBuf>, limit: usize) -> Result<Self> {
        Self::with_serializer(cache_dir, limit, Box::new(JsonEntrySerializer))
    }

    pub fn with_serializer(
        cache_dir: impl Into<PathBuf>,
        limit: usize,
        serializer: Box<dyn EntrySerializer>,
    ) -> Result<Self> {
        if limit == 0 {
            return Err(CacheError::InvalidConfig(
                "response store limit must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            namer: FileNamer::new(cache_dir),
            serializer,
            state: Mutex::new(StoreState {
                index: ResponseIndex::new(limit),
                stats: CacheStats::new(),
                pending_deletes: Vec::new(),
            }),
            active: AtomicBool::new(true),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.cache_dir.clone(), config.max_response_entries)
    }

    pub fn cache_dir(&self) -> &Path {
        self.namer.cache_dir()
    }

    /// File an entry for `id` is persisted to.
    pub fn file_path(&self, id: &str) -> PathBuf {
        self.namer.path_for(id)
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    // == Get ==
    /// Returns the entry for `id`, loading it from disk when it is not
    /// indexed. Unreadable files are deleted and reported as a miss.
    pub fn get(&self, id: &str) -> Result<Option<StoredResponse>> {
        let mut state = self.lock_active()?;
        self.get_locked(&mut state, id)
    }

    // == Put ==
    /// Stores `entry` under `id` and persists it when it is new or changed.
    ///
    /// When the index is full the least recently used entry is evicted and
    /// its file deleted.
    pub fn put(&self, id: &str, entry: StoredResponse) -> Result<()> {
        let mut state = self.lock_active()?;
        self.put_locked(&mut state, id, entry, true)
    }

    // == Remove ==
    /// Removes `id` from the index and deletes its file, if any.
    pub fn remove(&self, id: &str) -> Result<()> {
        let mut guard = self.lock_active()?;
        let state = &mut *guard;
        state.index.remove(id);
        delete_file(&self.namer.path_for(id), &mut state.pending_deletes);
        Ok(())
    }

    // == Update ==
    /// Replaces the entry for `id` with the result of `mutate`.
    ///
    /// `mutate` receives the current entry, loaded from disk if needed.
    /// Returning `None` removes the entry.
    pub fn update<F>(&self, id: &str, mutate: F) -> Result<()>
    where
        F: FnOnce(Option<&StoredResponse>) -> Option<StoredResponse>,
    {
        let mut guard = self.lock_active()?;
        let state = &mut *guard;

        let candidate = state.index.removal_candidate(id);
        let existing = self.get_locked(state, id).unwrap_or_else(|err| {
            warn!(%id, %err, "could not load entry before update");
            None
        });

        let result = match mutate(existing.as_ref()) {
            Some(entry) => self.insert_locked(state, id, entry, true),
            None => {
                state.index.remove(id);
                delete_file(&self.namer.path_for(id), &mut state.pending_deletes);
                Ok(())
            }
        };
        self.confirm_eviction(state, candidate);
        result
    }

    /// Whether `id` is currently indexed. Never touches the disk.
    pub fn contains(&self, id: &str) -> bool {
        self.lock().index.contains(id)
    }

    pub fn len(&self) -> usize {
        self.lock().index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.lock();
        let mut stats = state.stats.clone();
        stats.set_total_entries(state.index.len());
        stats
    }

    // == Reconcile ==
    /// Deletes every data file that has no indexed entry, along with temp
    /// files left by interrupted writes, and retries deferred deletes.
    /// Returns how many files were removed.
    ///
    /// I/O failures are logged and skipped.
    pub fn reconcile(&self) -> usize {
        let Ok(mut guard) = self.lock_active() else {
            return 0;
        };
        let state = &mut *guard;
        retry_pending_deletes(&mut state.pending_deletes);

        let used: HashSet<PathBuf> = state
            .index
            .keys()
            .map(|id| self.namer.path_for(id))
            .collect();
        let files = match self.data_files() {
            Ok(files) => files,
            Err(err) => {
                debug!(dir = %self.cache_dir().display(), %err, "skipping reconcile");
                return 0;
            }
        };

        // Writes only happen under the lock, so any temp file is stale.
        let temp_files = self.list_files(is_temp_file).unwrap_or_default();

        let mut removed = 0;
        let orphans = files.iter().filter(|f| !used.contains(*f));
        for file in orphans.chain(&temp_files) {
            if delete_file(file, &mut state.pending_deletes) {
                removed += 1;
            }
        }
        removed
    }

    /// Lists the data files in the cache directory.
    pub fn data_files(&self) -> io::Result<Vec<PathBuf>> {
        self.list_files(is_data_file)
    }

    fn list_files(&self, keep: fn(&Path) -> bool) -> io::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(self.cache_dir())? {
            let path = entry?.path();
            if keep(&path) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    // == Shutdown ==
    /// Ends a session-scoped store: deletes every data file in the cache
    /// directory. Only the first call has any effect.
    pub fn shutdown(&self) {
        if !self.active.swap(false, Ordering::SeqCst) {
            return;
        }
        let mut guard = self.lock();
        let state = &mut *guard;
        state.index.clear();
        retry_pending_deletes(&mut state.pending_deletes);

        let mut files = self.data_files().unwrap_or_default();
        files.extend(self.list_files(is_temp_file).unwrap_or_default());
        let mut removed = 0;
        for file in &files {
            if delete_file(file, &mut state.pending_deletes) {
                removed += 1;
            }
        }
        info!(dir = %self.cache_dir().display(), removed, "response store shut down");
    }

    // == Close ==
    /// Releases in-memory state and keeps the files for the next session.
    /// Only the first call has any effect.
    pub fn close(&self) {
        if !self.active.swap(false, Ordering::SeqCst) {
            return;
        }
        let mut state = self.lock();
        state.index.clear();
        retry_pending_deletes(&mut state.pending_deletes);
        debug!(dir = %self.cache_dir().display(), "response store closed");
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Takes the store lock, failing once the store is closed. The flag is
    /// checked under the lock so a call queued behind `shutdown` or `close`
    /// cannot write after it.
    fn lock_active(&self) -> Result<MutexGuard<'_, StoreState>> {
        let guard = self.lock();
        if self.is_active() {
            Ok(guard)
        } else {
            Err(CacheError::Closed)
        }
    }

    fn get_locked(&self, state: &mut StoreState, id: &str) -> Result<Option<StoredResponse>> {
        if let Some(entry) = state.index.get(id).cloned() {
            state.stats.record_hit();
            return Ok(Some(entry));
        }

        match self.load_entry(state, id)? {
            Some(entry) => {
                state.stats.record_hit();
                // Loaded from its own file, so there is nothing to write back.
                self.put_locked(state, id, entry.clone(), false)?;
                Ok(Some(entry))
            }
            None => {
                state.stats.record_miss();
                Ok(None)
            }
        }
    }

    /// Inserts with the removal candidate chosen before the mutation and
    /// confirmed after it: the candidate's file is deleted only if the
    /// index no longer holds it.
    fn put_locked(
        &self,
        state: &mut StoreState,
        id: &str,
        entry: StoredResponse,
        persist: bool,
    ) -> Result<()> {
        let candidate = state.index.removal_candidate(id);
        let result = self.insert_locked(state, id, entry, persist);
        self.confirm_eviction(state, candidate);
        result
    }

    /// Writes the file first when the entry is new or differs from the
    /// indexed one, then indexes it. A failed write leaves the index as it was.
    fn insert_locked(
        &self,
        state: &mut StoreState,
        id: &str,
        entry: StoredResponse,
        persist: bool,
    ) -> Result<()> {
        if persist && state.index.peek(id) != Some(&entry) {
            self.write_entry(id, &entry)?;
        }
        state.index.insert(id.to_string(), entry);
        Ok(())
    }

    fn confirm_eviction(&self, state: &mut StoreState, candidate: Option<String>) {
        let Some(key) = candidate else {
            return;
        };
        if state.index.contains(&key) {
            return;
        }
        if delete_file(&self.namer.path_for(&key), &mut state.pending_deletes) {
            state.stats.record_eviction();
            debug!(%key, "evicted persisted response");
        }
    }

    fn load_entry(&self, state: &mut StoreState, id: &str) -> Result<Option<StoredResponse>> {
        let path = self.namer.path_for(id);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        let decoded = {
            let mut reader = BufReader::new(file);
            self.serializer.read_from(&mut reader)
        };
        match decoded {
            Ok(entry) => {
                debug!(%id, "loaded persisted response");
                Ok(Some(entry))
            }
            Err(err) => {
                warn!(path = %path.display(), %err, "deleting unreadable cache file");
                delete_file(&path, &mut state.pending_deletes);
                Ok(None)
            }
        }
    }

    /// Writes to a temp file in the cache directory, then renames it over
    /// the target.
    fn write_entry(&self, id: &str, entry: &StoredResponse) -> Result<()> {
        let dir = self.cache_dir();
        fs::create_dir_all(dir)?;

        let mut tmp = tempfile::Builder::new()
            .prefix(TEMP_FILE_PREFIX)
            .tempfile_in(dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            self.serializer.write_to(entry, &mut writer)?;
            writer.flush()?;
        }

        let path = self.namer.path_for(id);
        tmp.persist(&path).map_err(|err| err.error)?;
        debug!(%id, path = %path.display(), "persisted response");
        Ok(())
    }
}

impl Drop for PersistentResponseStore {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        retry_pending_deletes(&mut state.pending_deletes);
    }
}

/// Deletes `path`, returning whether a file was removed. A missing file is
/// not an error; any other failure queues the path for a later retry.
fn delete_file(path: &Path, pending: &mut Vec<PathBuf>) -> bool {
    match fs::remove_file(path) {
        Ok(()) => true,
        Err(err) if err.kind() == io::ErrorKind::NotFound => false,
        Err(err) => {
            warn!(path = %path.display(), %err, "delete failed, will retry");
            if !pending.iter().any(|p| p == path) {
                pending.push(path.to_path_buf());
            }
            false
        }
    }
}

fn retry_pending_deletes(pending: &mut Vec<PathBuf>) {
    pending.retain(|path| match fs::remove_file(path) {
        Ok(()) => false,
        Err(err) => err.kind() != io::ErrorKind::NotFound,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;

    fn response(body: &str) -> StoredResponse {
        StoredResponse::new(
            200,
            vec![("content-type".to_string(), "text/plain".to_string())],
            body.as_bytes().to_vec(),
        )
    }

    fn create_test_store(limit: usize) -> (PersistentResponseStore, TempDir) {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let store = PersistentResponseStore::new(dir.path(), limit).unwrap();
        (store, dir)
    }

    #[test]
    fn test_zero_limit_rejected() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            PersistentResponseStore::new(dir.path(), 0),
            Err(CacheError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_put_writes_file() {
        let (store, _dir) = create_test_store(10);

        store.put("https://x/a", response("a")).unwrap();

        assert!(store.file_path("https://x/a").is_file());
        assert_eq!(store.get("https://x/a").unwrap().unwrap().body, b"a");
        assert_eq!(store.stats().hits, 1);
    }

    #[test]
    fn test_put_creates_cache_dir() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("nested").join("http");
        let store = PersistentResponseStore::new(&nested, 4).unwrap();

        store.put("id", response("body")).unwrap();

        assert!(nested.join(crate::persist::file_name_for("id")).is_file());
    }

    #[test]
    fn test_get_missing() {
        let (store, _dir) = create_test_store(10);
        assert_eq!(store.get("https://x/missing").unwrap(), None);
        assert_eq!(store.stats().misses, 1);
    }

    #[test]
    fn test_unchanged_put_skips_write() {
        let (store, _dir) = create_test_store(10);
        let entry = response("a");
        store.put("id", entry.clone()).unwrap();

        let path = store.file_path("id");
        fs::write(&path, b"sentinel").unwrap();
        store.put("id", entry).unwrap();

        let mut contents = String::new();
        File::open(&path).unwrap().read_to_string(&mut contents).unwrap();
        assert_eq!(contents, "sentinel");
    }

    #[test]
    fn test_changed_put_overwrites_file() {
        let (store, dir) = create_test_store(10);
        store.put("id", response("old")).unwrap();
        store.put("id", response("new")).unwrap();

        let reopened = PersistentResponseStore::new(dir.path(), 10).unwrap();
        assert_eq!(reopened.get("id").unwrap().unwrap().body, b"new");
    }

    #[test]
    fn test_remove_deletes_file() {
        let (store, _dir) = create_test_store(10);
        store.put("id", response("a")).unwrap();

        store.remove("id").unwrap();

        assert!(!store.file_path("id").exists());
        assert_eq!(store.get("id").unwrap(), None);
        // Removing again is harmless
        store.remove("id").unwrap();
    }

    #[test]
    fn test_corrupt_file_deleted_on_get() {
        let (store, _dir) = create_test_store(10);
        let path = store.file_path("id");
        fs::write(&path, b"{not json").unwrap();

        assert_eq!(store.get("id").unwrap(), None);
        assert!(!path.exists());
    }

    #[test]
    fn test_eviction_deletes_least_recent_file() {
        let (store, _dir) = create_test_store(2);
        store.put("a", response("a")).unwrap();
        store.put("b", response("b")).unwrap();
        store.get("a").unwrap();

        store.put("c", response("c")).unwrap();

        assert!(store.contains("a"));
        assert!(!store.contains("b"));
        assert!(store.contains("c"));
        assert!(!store.file_path("b").exists());
        assert_eq!(store.stats().evictions, 1);
    }

    #[test]
    fn test_update_adds_changes_and_removes() {
        let (store, _dir) = create_test_store(10);

        store.update("id", |old| {
            assert!(old.is_none());
            Some(response("v1"))
        })
        .unwrap();
        assert!(store.file_path("id").is_file());

        store.update("id", |old| {
            let mut next = old.cloned().unwrap();
            next.status = 304;
            Some(next)
        })
        .unwrap();
        assert_eq!(store.get("id").unwrap().unwrap().status, 304);

        store.update("id", |_| None).unwrap();
        assert!(!store.contains("id"));
        assert!(!store.file_path("id").exists());
    }

    #[test]
    fn test_update_sees_entry_on_disk() {
        let (store, dir) = create_test_store(10);
        store.put("id", response("disk")).unwrap();
        drop(store);

        let reopened = PersistentResponseStore::new(dir.path(), 10).unwrap();
        reopened
            .update("id", |old| {
                assert_eq!(old.map(|o| o.body.clone()), Some(b"disk".to_vec()));
                old.cloned()
            })
            .unwrap();
        assert!(reopened.contains("id"));
    }

    #[test]
    fn test_update_at_capacity_evicts() {
        let (store, _dir) = create_test_store(1);
        store.put("a", response("a")).unwrap();

        store.update("b", |_| Some(response("b"))).unwrap();

        assert_eq!(store.len(), 1);
        assert!(store.contains("b"));
        assert!(!store.file_path("a").exists());
    }

    #[test]
    fn test_reconcile_removes_orphans() {
        let (store, dir) = create_test_store(10);
        store.put("kept", response("k")).unwrap();
        let orphan = dir.path().join("orphan.0123.data");
        let unrelated = dir.path().join("notes.txt");
        fs::write(&orphan, b"x").unwrap();
        fs::write(&unrelated, b"x").unwrap();

        assert_eq!(store.reconcile(), 1);

        assert!(!orphan.exists());
        assert!(unrelated.exists());
        assert!(store.file_path("kept").exists());
    }

    #[test]
    fn test_reconcile_missing_dir() {
        let dir = TempDir::new().unwrap();
        let store = PersistentResponseStore::new(dir.path().join("absent"), 4).unwrap();
        assert_eq!(store.reconcile(), 0);
    }

    #[test]
    fn test_close_keeps_files() {
        let (store, _dir) = create_test_store(10);
        store.put("id", response("a")).unwrap();

        store.close();
        store.close();

        assert!(store.file_path("id").exists());
        assert!(matches!(store.get("id"), Err(CacheError::Closed)));
        assert!(matches!(store.put("x", response("x")), Err(CacheError::Closed)));
    }

    #[test]
    fn test_shutdown_deletes_all_files() {
        let (store, dir) = create_test_store(10);
        store.put("a", response("a")).unwrap();
        store.put("b", response("b")).unwrap();
        let foreign = dir.path().join("left.over.data");
        fs::write(&foreign, b"x").unwrap();

        store.shutdown();
        store.shutdown();

        assert!(store.data_files().unwrap().is_empty());
        assert!(!store.is_active());
        assert_eq!(store.reconcile(), 0);
    }

    #[test]
    fn test_put_queued_behind_shutdown_is_rejected() {
        let (store, _dir) = create_test_store(10);

        std::thread::scope(|scope| {
            let mut late = None;
            let mut stopper = None;
            store
                .update("a", |_| {
                    // Both calls start while this update holds the lock
                    late = Some(scope.spawn(|| store.put("late", response("late"))));
                    std::thread::sleep(std::time::Duration::from_millis(50));
                    stopper = Some(scope.spawn(|| store.shutdown()));
                    std::thread::sleep(std::time::Duration::from_millis(50));
                    Some(response("a"))
                })
                .unwrap();

            let late = late.unwrap().join().unwrap();
            stopper.unwrap().join().unwrap();
            assert!(matches!(late, Err(CacheError::Closed)));
        });

        assert!(store.is_empty());
        assert!(store.data_files().unwrap().is_empty());
        assert!(!store.file_path("late").exists());
    }

    #[test]
    fn test_wide_character_identity_persists() {
        let (store, dir) = create_test_store(10);
        let id = format!("https://marketplace.example.org/{}", "市场节点".repeat(40));

        store.put(&id, response("wide")).unwrap();

        let reopened = PersistentResponseStore::new(dir.path(), 10).unwrap();
        assert_eq!(reopened.get(&id).unwrap().unwrap().body, b"wide");
    }

    #[test]
    fn test_writes_leave_no_temp_files() {
        let (store, dir) = create_test_store(10);
        store.put("a", response("a")).unwrap();
        store.put("a", response("b")).unwrap();

        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| is_temp_file(&e.path()))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_reconcile_removes_interrupted_writes() {
        let (store, dir) = create_test_store(10);
        store.put("kept", response("k")).unwrap();
        let partial = dir.path().join(format!("{TEMP_FILE_PREFIX}x1y2z3"));
        fs::write(&partial, b"{\"format_version\":1,").unwrap();

        assert_eq!(store.reconcile(), 1);

        assert!(!partial.exists());
        assert!(store.file_path("kept").exists());
    }

    #[test]
    fn test_shutdown_removes_interrupted_writes() {
        let (store, dir) = create_test_store(10);
        let partial = dir.path().join(format!("{TEMP_FILE_PREFIX}abc"));
        fs::write(&partial, b"x").unwrap();

        store.shutdown();

        assert!(!partial.exists());
    }

    #[test]
    fn test_delete_file_tolerates_missing() {
        let dir = TempDir::new().unwrap();
        let mut pending = Vec::new();
        assert!(!delete_file(&dir.path().join("missing.data"), &mut pending));
        assert!(pending.is_empty());
    }

    #[test]
    fn test_failed_delete_is_queued() {
        let dir = TempDir::new().unwrap();
        // Removing a directory with remove_file fails without NotFound
        let blocker = dir.path().join("blocker.data");
        fs::create_dir(&blocker).unwrap();
        let mut pending = Vec::new();

        assert!(!delete_file(&blocker, &mut pending));
        assert_eq!(pending, vec![blocker.clone()]);

        fs::remove_dir(&blocker).unwrap();
        retry_pending_deletes(&mut pending);
        assert!(pending.is_empty());
    }
}
