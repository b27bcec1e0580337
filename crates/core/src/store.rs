//! Draft, history and theme persistence.
//!
//! [`Store`] is constructed once at startup over an injected
//! [`KeyValueStore`]. Reads are corruption tolerant: a record that cannot be
//! read or decoded is logged and treated as absent.

use std::{
    collections::HashMap,
    fs,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
    sync::Mutex,
};

use serde::{Serialize, de::DeserializeOwned};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    error::Result,
    paths::get_record_path,
    types::{SavedGrading, Theme, VideoMetadata},
};

pub const DRAFT_KEY: &str = "draft";
pub const HISTORY_KEY: &str = "history";
pub const THEME_KEY: &str = "theme";

/// Raw string storage addressed by fixed keys.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// One JSON file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(get_record_path(&self.dir, key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Writes to a temp file and renames it over the record, so a reader
    /// sees either the old or the new value.
    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = get_record_path(&self.dir, key);
        let tmp_path = path.with_extension("json.tmp");

        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(value.as_bytes())?;
        file.sync_all()?;
        drop(file);

        if let Err(e) = fs::rename(&tmp_path, &path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        match fs::remove_file(get_record_path(&self.dir, key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn records(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.records().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.records().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.records().remove(key);
        Ok(())
    }
}

pub struct Store<S> {
    backend: S,
    history: Vec<SavedGrading>,
}

impl Store<FileStore> {
    pub fn open_dir(dir: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self::open(FileStore::new(dir)?))
    }
}

impl<S: KeyValueStore> Store<S> {
    /// Wrap `backend` and load the saved history into memory.
    pub fn open(backend: S) -> Self {
        let history = read_record(&backend, HISTORY_KEY).unwrap_or_default();
        Self { backend, history }
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    pub fn load_draft(&self) -> VideoMetadata {
        read_record(&self.backend, DRAFT_KEY).unwrap_or_default()
    }

    pub fn save_draft(&self, metadata: &VideoMetadata) -> Result<()> {
        write_record(&self.backend, DRAFT_KEY, metadata)
    }

    /// Erase the draft record entirely rather than storing an empty one.
    pub fn clear_draft(&self) -> Result<()> {
        self.backend.remove(DRAFT_KEY)
    }

    /// Re-read history from the backend, bypassing the in-memory copy.
    pub fn load_history(&self) -> Vec<SavedGrading> {
        read_record(&self.backend, HISTORY_KEY).unwrap_or_default()
    }

    /// In-memory history, newest first.
    pub fn history(&self) -> &[SavedGrading] {
        &self.history
    }

    pub fn find_saved(&self, id: Uuid) -> Option<&SavedGrading> {
        self.history.iter().find(|entry| entry.id == id)
    }

    /// Replace the whole collection. Memory is only updated once the write succeeds.
    pub fn save_history(&mut self, entries: Vec<SavedGrading>) -> Result<()> {
        write_record(&self.backend, HISTORY_KEY, &entries)?;
        self.history = entries;
        Ok(())
    }

    pub fn append_saved(&mut self, entry: SavedGrading) -> Result<&[SavedGrading]> {
        let id = entry.id;
        let mut entries = Vec::with_capacity(self.history.len() + 1);
        entries.push(entry);
        entries.extend(self.history.iter().cloned());

        self.save_history(entries)?;
        info!(%id, total = self.history.len(), "saved grading to history");
        Ok(&self.history)
    }

    /// Unknown ids are a no-op.
    pub fn remove_saved(&mut self, id: Uuid) -> Result<&[SavedGrading]> {
        if self.find_saved(id).is_none() {
            return Ok(&self.history);
        }

        let entries = self
            .history
            .iter()
            .filter(|entry| entry.id != id)
            .cloned()
            .collect();

        self.save_history(entries)?;
        info!(%id, total = self.history.len(), "removed grading from history");
        Ok(&self.history)
    }

    pub fn load_theme(&self) -> Theme {
        read_record(&self.backend, THEME_KEY).unwrap_or_default()
    }

    pub fn save_theme(&self, theme: Theme) -> Result<()> {
        write_record(&self.backend, THEME_KEY, &theme)
    }
}

fn read_record<S: KeyValueStore, T: DeserializeOwned>(backend: &S, key: &str) -> Option<T> {
    let content = match backend.get(key) {
        Ok(Some(content)) => content,
        Ok(None) => return None,
        Err(e) => {
            warn!(key, error = %e, "failed to read stored record, treating as absent");
            return None;
        }
    };

    match serde_json::from_str(&content) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(key, error = %e, "stored record is corrupt, treating as absent");
            None
        }
    }
}

fn write_record<S: KeyValueStore, T: Serialize + ?Sized>(
    backend: &S,
    key: &str,
    value: &T,
) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    backend.set(key, &json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AnalysisResult, GradingDetails};

    fn details(score: u8) -> GradingDetails {
        GradingDetails {
            score,
            feedback: vec![],
            recommendations: vec![],
            suggestions: vec![],
            specific_tags: None,
            structural_suggestions: None,
        }
    }

    fn saved(title: &str, score: u8) -> SavedGrading {
        SavedGrading::new(
            VideoMetadata {
                title: title.to_string(),
                ..Default::default()
            },
            AnalysisResult {
                overall_score: score,
                summary: String::new(),
                title: details(score),
                description: details(score),
                tags: details(score),
                competitive_audit: None,
            },
        )
    }

    #[test]
    fn draft_round_trips_and_clears() {
        let store = Store::open(MemoryStore::new());
        assert_eq!(store.load_draft(), VideoMetadata::default());

        let draft = VideoMetadata {
            title: "My Video".to_string(),
            tags: "cats, pets".to_string(),
            script: Some("hello".to_string()),
            ..Default::default()
        };
        store.save_draft(&draft).unwrap();
        assert_eq!(store.load_draft(), draft);

        store.clear_draft().unwrap();
        assert_eq!(store.backend().get(DRAFT_KEY).unwrap(), None);
        assert_eq!(store.load_draft(), VideoMetadata::default());
    }

    #[test]
    fn corrupt_records_load_as_empty() {
        let backend = MemoryStore::new();
        backend.set(DRAFT_KEY, "{not json").unwrap();
        backend.set(HISTORY_KEY, "[{\"id\": 42}]").unwrap();
        backend.set(THEME_KEY, "\"sepia\"").unwrap();

        let store = Store::open(backend);
        assert_eq!(store.load_draft(), VideoMetadata::default());
        assert!(store.history().is_empty());
        assert!(store.load_history().is_empty());
        assert_eq!(store.load_theme(), Theme::Dark);
    }

    #[test]
    fn draft_from_older_schema_fills_missing_fields() {
        let backend = MemoryStore::new();
        backend
            .set(DRAFT_KEY, r#"{"title": "Old", "description": "Desc"}"#)
            .unwrap();

        let draft = Store::open(backend).load_draft();
        assert_eq!(draft.title, "Old");
        assert_eq!(draft.tags, "");
        assert_eq!(draft.competitor_url, None);
    }

    #[test]
    fn append_is_newest_first_and_persisted() {
        let mut store = Store::open(MemoryStore::new());
        let first = saved("First", 50);
        let second = saved("Second", 60);

        store.append_saved(first.clone()).unwrap();
        let history = store.append_saved(second.clone()).unwrap();

        assert_eq!(history, &[second.clone(), first.clone()]);
        assert_eq!(store.load_history(), vec![second, first]);
    }

    #[test]
    fn remove_unknown_id_is_noop() {
        let mut store = Store::open(MemoryStore::new());
        store.append_saved(saved("A", 10)).unwrap();
        store.append_saved(saved("B", 20)).unwrap();
        let before = store.history().to_vec();

        let after = store.remove_saved(Uuid::new_v4()).unwrap();
        assert_eq!(after, before.as_slice());
    }

    #[test]
    fn remove_drops_matching_entry() {
        let mut store = Store::open(MemoryStore::new());
        let keep = saved("Keep", 10);
        let drop_me = saved("Drop", 20);
        store.append_saved(keep.clone()).unwrap();
        store.append_saved(drop_me.clone()).unwrap();

        let history = store.remove_saved(drop_me.id).unwrap();
        assert_eq!(history, &[keep.clone()]);
        assert_eq!(store.load_history(), vec![keep]);
    }

    #[test]
    fn theme_round_trips() {
        let store = Store::open(MemoryStore::new());
        store.save_theme(Theme::Light).unwrap();
        assert_eq!(store.load_theme(), Theme::Light);
    }

    #[test]
    fn file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();

        let mut store = Store::open_dir(dir.path()).unwrap();
        let entry = saved("Persisted", 77);
        store.append_saved(entry.clone()).unwrap();
        store
            .save_draft(&VideoMetadata {
                title: "Draft".to_string(),
                ..Default::default()
            })
            .unwrap();

        let reopened = Store::open_dir(dir.path()).unwrap();
        assert_eq!(reopened.history(), &[entry]);
        assert_eq!(reopened.load_draft().title, "Draft");
        assert!(!dir.path().join("history.json.tmp").exists());
    }

    #[test]
    fn file_store_missing_and_corrupt_files() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileStore::new(dir.path()).unwrap();
        assert_eq!(backend.get(DRAFT_KEY).unwrap(), None);
        backend.remove(DRAFT_KEY).unwrap();

        fs::write(get_record_path(dir.path(), HISTORY_KEY), "garbage").unwrap();
        let store = Store::open(backend);
        assert!(store.history().is_empty());
    }
}
