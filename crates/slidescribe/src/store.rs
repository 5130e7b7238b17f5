//! Saved recordings, scoped by user, lecture and record name
//!
//! Records persist as JSON documents:
//!
//! ```text
//! <data_dir>/users/<user>/lectures/<lecture>/<record>.json
//! ```
//!
//! Lectures are directories, so an empty lecture exists once created. Loading
//! accepts either the full document or a bare array of segments.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::sync::RwLock;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Local, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, info};

use crate::ledger::Segment;

const RECORD_EXTENSION: &str = "json";

/// Where one saved record lives.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScopeKey {
    pub user: String,
    pub lecture: String,
    pub record: String,
}

impl ScopeKey {
    /// A trailing `.json` on the record name is dropped.
    pub fn new(
        user: impl Into<String>,
        lecture: impl Into<String>,
        record: impl Into<String>,
    ) -> Self {
        let record = record.into();
        let record = match record.strip_suffix(".json") {
            Some(stem) => stem.to_string(),
            None => record,
        };
        Self {
            user: user.into(),
            lecture: lecture.into(),
            record,
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_name("user", &self.user)?;
        validate_name("lecture", &self.lecture)?;
        validate_name("record", &self.record)
    }
}

impl std::fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.user, self.lecture, self.record)
    }
}

/// Names become path components, so they must stay inside their directory.
pub fn validate_name(kind: &str, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        bail!("{kind} name cannot be empty");
    }
    if name.contains('/') || name.contains('\\') || name.contains("..") || name.contains('\0') {
        bail!("invalid {kind} name '{name}'");
    }
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) if !matches!(name.trim(), "." | "..") => Ok(()),
        _ => bail!("invalid {kind} name '{name}'"),
    }
}

/// `session_2024-03-01T09-15-00` for a save at that local time.
pub fn default_record_name(at: DateTime<Local>) -> String {
    format!("session_{}", at.format("%Y-%m-%dT%H-%M-%S"))
}

/// A saved record as written to disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordDocument {
    #[serde(default)]
    pub lecture_name: String,

    pub records: Vec<Segment>,

    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl RecordDocument {
    pub fn new(lecture_name: impl Into<String>, records: Vec<Segment>) -> Self {
        let now = Utc::now();
        Self {
            lecture_name: lecture_name.into(),
            records,
            created_at: Some(now),
            updated_at: Some(now),
        }
    }

    /// Parse either the document form or a bare segment array.
    pub fn from_json(lecture: &str, json: &str) -> Result<Self> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Stored {
            Document(RecordDocument),
            Bare(Vec<Segment>),
        }

        let doc = match serde_json::from_str::<Stored>(json)
            .context("record is neither a record document nor a segment array")?
        {
            Stored::Document(mut doc) => {
                if doc.lecture_name.is_empty() {
                    doc.lecture_name = lecture.to_string();
                }
                doc
            }
            Stored::Bare(records) => RecordDocument {
                lecture_name: lecture.to_string(),
                records,
                created_at: None,
                updated_at: None,
            },
        };
        Ok(doc)
    }
}

/// Accepts RFC 3339 and naive ISO timestamps (read as UTC); anything else is dropped.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|text| {
        DateTime::parse_from_rfc3339(&text)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDateTime::parse_from_str(&text, "%Y-%m-%dT%H:%M:%S%.f")
                    .ok()
                    .map(|naive| naive.and_utc())
            })
    }))
}

/// Trait for record storage backends
pub trait RecordStore: Send + Sync {
    /// Load a full saved document
    fn load_document(&self, scope: &ScopeKey) -> Result<Option<RecordDocument>>;

    /// Write `segments` under `scope`, keeping the original creation time
    fn save(&self, scope: &ScopeKey, segments: &[Segment]) -> Result<()>;

    /// Lectures for `user`, sorted by name
    fn list_lectures(&self, user: &str) -> Result<Vec<String>>;

    fn create_lecture(&self, user: &str, lecture: &str) -> Result<()>;

    /// Delete a lecture and every record in it
    fn delete_lecture(&self, user: &str, lecture: &str) -> Result<bool>;

    /// Record names (without extension) in a lecture, sorted
    fn list_records(&self, user: &str, lecture: &str) -> Result<Vec<String>>;

    fn delete_record(&self, scope: &ScopeKey) -> Result<bool>;

    /// Load just the segments
    fn load(&self, scope: &ScopeKey) -> Result<Option<Vec<Segment>>> {
        Ok(self.load_document(scope)?.map(|doc| doc.records))
    }

    fn exists(&self, scope: &ScopeKey) -> Result<bool> {
        Ok(self.load_document(scope)?.is_some())
    }
}

fn build_document(
    previous: Option<RecordDocument>,
    lecture: &str,
    segments: &[Segment],
) -> RecordDocument {
    let mut doc = RecordDocument::new(lecture, segments.to_vec());
    if let Some(created_at) = previous.and_then(|p| p.created_at) {
        doc.created_at = Some(created_at);
    }
    doc
}

type LectureRecords = BTreeMap<String, RecordDocument>;

/// In-memory record store (BTreeMap-backed)
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    lectures: RwLock<BTreeMap<(String, String), LectureRecords>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(
        &self,
    ) -> Result<std::sync::RwLockReadGuard<'_, BTreeMap<(String, String), LectureRecords>>> {
        self.lectures
            .read()
            .map_err(|_| anyhow!("record store lock poisoned"))
    }

    fn write(
        &self,
    ) -> Result<std::sync::RwLockWriteGuard<'_, BTreeMap<(String, String), LectureRecords>>> {
        self.lectures
            .write()
            .map_err(|_| anyhow!("record store lock poisoned"))
    }
}

impl RecordStore for InMemoryRecordStore {
    fn load_document(&self, scope: &ScopeKey) -> Result<Option<RecordDocument>> {
        scope.validate()?;
        let lectures = self.read()?;
        Ok(lectures
            .get(&(scope.user.clone(), scope.lecture.clone()))
            .and_then(|records| records.get(&scope.record))
            .cloned())
    }

    fn save(&self, scope: &ScopeKey, segments: &[Segment]) -> Result<()> {
        scope.validate()?;
        let mut lectures = self.write()?;
        let records = lectures
            .entry((scope.user.clone(), scope.lecture.clone()))
            .or_default();
        let doc = build_document(records.remove(&scope.record), &scope.lecture, segments);
        records.insert(scope.record.clone(), doc);
        Ok(())
    }

    fn list_lectures(&self, user: &str) -> Result<Vec<String>> {
        validate_name("user", user)?;
        let lectures = self.read()?;
        Ok(lectures
            .keys()
            .filter(|(u, _)| u == user)
            .map(|(_, lecture)| lecture.clone())
            .collect())
    }

    fn create_lecture(&self, user: &str, lecture: &str) -> Result<()> {
        validate_name("user", user)?;
        validate_name("lecture", lecture)?;
        self.write()?
            .entry((user.to_string(), lecture.to_string()))
            .or_default();
        Ok(())
    }

    fn delete_lecture(&self, user: &str, lecture: &str) -> Result<bool> {
        validate_name("user", user)?;
        validate_name("lecture", lecture)?;
        Ok(self
            .write()?
            .remove(&(user.to_string(), lecture.to_string()))
            .is_some())
    }

    fn list_records(&self, user: &str, lecture: &str) -> Result<Vec<String>> {
        validate_name("user", user)?;
        validate_name("lecture", lecture)?;
        let lectures = self.read()?;
        Ok(lectures
            .get(&(user.to_string(), lecture.to_string()))
            .map(|records| records.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn delete_record(&self, scope: &ScopeKey) -> Result<bool> {
        scope.validate()?;
        let mut lectures = self.write()?;
        Ok(lectures
            .get_mut(&(scope.user.clone(), scope.lecture.clone()))
            .and_then(|records| records.remove(&scope.record))
            .is_some())
    }
}

/// File-backed record store (one JSON file per record)
#[derive(Debug, Clone)]
pub struct FileRecordStore {
    root: PathBuf,
}

impl FileRecordStore {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            root: data_dir.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn user_dir(&self, user: &str) -> PathBuf {
        self.root.join("users").join(user).join("lectures")
    }

    fn lecture_dir(&self, user: &str, lecture: &str) -> PathBuf {
        self.user_dir(user).join(lecture)
    }

    /// Path of a record file.
    pub fn record_path(&self, scope: &ScopeKey) -> PathBuf {
        self.lecture_dir(&scope.user, &scope.lecture)
            .join(format!("{}.{}", scope.record, RECORD_EXTENSION))
    }

    fn sorted_entries(dir: &Path, want_dirs: bool) -> Result<Vec<String>> {
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in std::fs::read_dir(dir)
            .with_context(|| format!("Failed to read directory: {}", dir.display()))?
        {
            let path = entry?.path();
            let name = if want_dirs {
                path.is_dir()
                    .then(|| path.file_name().map(|n| n.to_string_lossy().into_owned()))
                    .flatten()
            } else {
                let is_record = path.is_file()
                    && path.extension().is_some_and(|ext| ext == RECORD_EXTENSION);
                is_record
                    .then(|| path.file_stem().map(|n| n.to_string_lossy().into_owned()))
                    .flatten()
            };
            names.extend(name);
        }
        names.sort();
        Ok(names)
    }
}

impl RecordStore for FileRecordStore {
    fn load_document(&self, scope: &ScopeKey) -> Result<Option<RecordDocument>> {
        scope.validate()?;
        let path = self.record_path(scope);
        if !path.exists() {
            return Ok(None);
        }

        let json = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read record: {}", path.display()))?;
        let doc = RecordDocument::from_json(&scope.lecture, &json)
            .with_context(|| format!("Failed to parse record: {}", path.display()))?;

        debug!(%scope, count = doc.records.len(), "record loaded");
        Ok(Some(doc))
    }

    fn save(&self, scope: &ScopeKey, segments: &[Segment]) -> Result<()> {
        scope.validate()?;
        // An unreadable previous version is overwritten
        let previous = self.load_document(scope).ok().flatten();
        let doc = build_document(previous, &scope.lecture, segments);
        let json = serde_json::to_string_pretty(&doc)?;

        let path = self.record_path(scope);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        // Atomic write: write to temp, then rename
        let temp_path = path.with_extension("tmp");
        std::fs::write(&temp_path, json)
            .with_context(|| format!("Failed to write record: {}", temp_path.display()))?;
        std::fs::rename(&temp_path, &path)
            .with_context(|| format!("Failed to move record into place: {}", path.display()))?;

        info!(%scope, count = segments.len(), "record saved");
        Ok(())
    }

    fn list_lectures(&self, user: &str) -> Result<Vec<String>> {
        validate_name("user", user)?;
        Self::sorted_entries(&self.user_dir(user), true)
    }

    fn create_lecture(&self, user: &str, lecture: &str) -> Result<()> {
        validate_name("user", user)?;
        validate_name("lecture", lecture)?;
        let dir = self.lecture_dir(user, lecture);
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create lecture: {}", dir.display()))?;
        info!(user, lecture, "lecture created");
        Ok(())
    }

    fn delete_lecture(&self, user: &str, lecture: &str) -> Result<bool> {
        validate_name("user", user)?;
        validate_name("lecture", lecture)?;
        let dir = self.lecture_dir(user, lecture);
        if !dir.exists() {
            return Ok(false);
        }
        std::fs::remove_dir_all(&dir)
            .with_context(|| format!("Failed to delete lecture: {}", dir.display()))?;
        info!(user, lecture, "lecture deleted");
        Ok(true)
    }

    fn list_records(&self, user: &str, lecture: &str) -> Result<Vec<String>> {
        validate_name("user", user)?;
        validate_name("lecture", lecture)?;
        Self::sorted_entries(&self.lecture_dir(user, lecture), false)
    }

    fn delete_record(&self, scope: &ScopeKey) -> Result<bool> {
        scope.validate()?;
        let path = self.record_path(scope);
        if !path.exists() {
            return Ok(false);
        }
        std::fs::remove_file(&path)
            .with_context(|| format!("Failed to delete record: {}", path.display()))?;
        info!(%scope, "record deleted");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timecode::TimeCode;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn segments() -> Vec<Segment> {
        vec![
            Segment::new("1", "Intro", TimeCode::ZERO, TimeCode::from_millis(1_500)),
            Segment::new(
                "2",
                "Topic 2",
                TimeCode::from_millis(1_500),
                TimeCode::from_millis(4_000),
            )
            .with_notes("key idea"),
        ]
    }

    fn exercise_store(store: &dyn RecordStore) {
        let scope = ScopeKey::new("alice", "Physics", "session_1");
        assert_eq!(store.load(&scope).unwrap(), None);

        store.save(&scope, &segments()).unwrap();
        assert_eq!(store.load(&scope).unwrap().unwrap(), segments());
        assert!(store.exists(&scope).unwrap());

        store.create_lecture("alice", "Chemistry").unwrap();
        assert_eq!(
            store.list_lectures("alice").unwrap(),
            vec!["Chemistry".to_string(), "Physics".to_string()]
        );
        assert!(store.list_lectures("bob").unwrap().is_empty());
        assert!(store.list_records("alice", "Chemistry").unwrap().is_empty());
        assert_eq!(
            store.list_records("alice", "Physics").unwrap(),
            vec!["session_1".to_string()]
        );

        assert!(store.delete_record(&scope).unwrap());
        assert!(!store.delete_record(&scope).unwrap());

        assert!(store.delete_lecture("alice", "Chemistry").unwrap());
        assert!(!store.delete_lecture("alice", "Chemistry").unwrap());
    }

    #[test]
    fn test_in_memory_store() {
        exercise_store(&InMemoryRecordStore::new());
    }

    #[test]
    fn test_file_store() {
        let dir = TempDir::new().unwrap();
        exercise_store(&FileRecordStore::new(dir.path()));
    }

    #[test]
    fn test_file_layout_and_document_shape() {
        let dir = TempDir::new().unwrap();
        let store = FileRecordStore::new(dir.path());
        let scope = ScopeKey::new("alice", "Physics", "take1.json");
        store.save(&scope, &segments()).unwrap();

        let path = dir
            .path()
            .join("users/alice/lectures/Physics/take1.json");
        assert_eq!(store.record_path(&scope), path);

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["lecture_name"], "Physics");
        assert_eq!(value["records"][1]["slide_title"], "Topic 2");
        assert_eq!(value["records"][1]["end_time"], "00:00:04.000");
        assert!(value["created_at"].is_string());
        assert!(value["updated_at"].is_string());
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_resave_keeps_created_at() {
        let store = InMemoryRecordStore::new();
        let scope = ScopeKey::new("u", "l", "r");
        store.save(&scope, &segments()).unwrap();
        let first = store.load_document(&scope).unwrap().unwrap();

        store.save(&scope, &segments()[..1]).unwrap();
        let second = store.load_document(&scope).unwrap().unwrap();
        assert_eq!(second.created_at, first.created_at);
        assert_eq!(second.records.len(), 1);
    }

    #[test]
    fn test_loads_bare_array() {
        let dir = TempDir::new().unwrap();
        let store = FileRecordStore::new(dir.path());
        let scope = ScopeKey::new("u", "Lecture", "legacy");
        let path = store.record_path(&scope);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, serde_json::to_string(&segments()).unwrap()).unwrap();

        let doc = store.load_document(&scope).unwrap().unwrap();
        assert_eq!(doc.lecture_name, "Lecture");
        assert_eq!(doc.records, segments());
        assert_eq!(doc.created_at, None);
    }

    #[test]
    fn test_naive_timestamps_are_accepted() {
        let json = r#"{
            "lecture_name": "L",
            "records": [],
            "created_at": "2024-05-01T10:00:00.000Z",
            "updated_at": "2024-05-01T10:30:00.123456",
            "filename": "2024-05-01_103000.json"
        }"#;
        let doc = RecordDocument::from_json("L", json).unwrap();
        assert!(doc.created_at.is_some());
        assert!(doc.updated_at.is_some());
    }

    #[test]
    fn test_corrupt_record_is_an_error() {
        let dir = TempDir::new().unwrap();
        let store = FileRecordStore::new(dir.path());
        let scope = ScopeKey::new("u", "l", "bad");
        let path = store.record_path(&scope);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{ not json").unwrap();

        let err = store.load(&scope).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse record"));
    }

    #[test]
    fn test_rejects_escaping_names() {
        let store = InMemoryRecordStore::new();
        for scope in [
            ScopeKey::new("u", "../etc", "r"),
            ScopeKey::new("u", "l", "a/b"),
            ScopeKey::new("", "l", "r"),
            ScopeKey::new("u", "l", "a\\b"),
        ] {
            assert!(store.save(&scope, &[]).is_err(), "{scope} should be rejected");
        }
        assert!(store.create_lecture("u", " ").is_err());
    }

    #[test]
    fn test_dot_names_are_rejected() {
        for name in [".", "..", " . ", "./"] {
            assert!(validate_name("lecture", name).is_err(), "{name:?} should be rejected");
        }
        assert!(validate_name("lecture", ".hidden").is_ok());
        assert!(validate_name("lecture", "v1.2").is_ok());
    }

    #[test]
    fn test_dot_lecture_cannot_remove_siblings() {
        let dir = TempDir::new().unwrap();
        let store = FileRecordStore::new(dir.path());
        let physics = ScopeKey::new("alice", "Physics", "take1");
        store.save(&physics, &segments()).unwrap();
        store
            .save(&ScopeKey::new("alice", "Chemistry", "take1"), &segments())
            .unwrap();

        assert!(store.delete_lecture("alice", ".").is_err());
        assert!(store.create_lecture("alice", ".").is_err());
        assert!(store.save(&ScopeKey::new("alice", "Physics", "."), &segments()).is_err());
        assert!(store.save(&ScopeKey::new("alice", ".", "take2"), &segments()).is_err());

        assert_eq!(store.load(&physics).unwrap().unwrap(), segments());
        assert_eq!(store.list_lectures("alice").unwrap().len(), 2);
    }

    #[test]
    fn test_default_record_name() {
        let at = Local.with_ymd_and_hms(2024, 3, 1, 9, 15, 0).unwrap();
        assert_eq!(default_record_name(at), "session_2024-03-01T09-15-00");
    }

    #[test]
    fn test_records_listing_ignores_other_files() {
        let dir = TempDir::new().unwrap();
        let store = FileRecordStore::new(dir.path());
        store.create_lecture("u", "l").unwrap();
        let lecture = dir.path().join("users/u/lectures/l");
        std::fs::write(lecture.join("b.json"), "[]").unwrap();
        std::fs::write(lecture.join("a.json"), "[]").unwrap();
        std::fs::write(lecture.join("notes.txt"), "").unwrap();
        std::fs::write(lecture.join("c.tmp"), "").unwrap();

        assert_eq!(
            store.list_records("u", "l").unwrap(),
            vec!["a".to_string(), "b".to_string()]
        );
    }
}
