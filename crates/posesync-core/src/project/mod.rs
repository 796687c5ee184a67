use std::collections::HashMap;
use std::fmt;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::annotate::Annotation;

/// Persistence write failure (quota, I/O). Recovered by logging and carrying
/// on with in-memory state only; never surfaced as a hard stop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageError(pub String);

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "storage write failed: {}", self.0)
    }
}

impl std::error::Error for StorageError {}

/// Annotation delete with an out-of-range index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnnotationIndexError {
    pub index: usize,
    pub len: usize,
}

impl fmt::Display for AnnotationIndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "annotation index {} out of range (have {})",
            self.index, self.len
        )
    }
}

impl std::error::Error for AnnotationIndexError {}

/// Key-value persistence the store writes through. The host decides what
/// backs it (a directory of files, browser local storage, memory).
pub trait Storage {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// In-memory storage, mainly for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: HashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Cheap fingerprint of the loaded video: file name plus byte size. Not
/// collision-resistant; two distinct videos sharing name and size alias to
/// the same project. Preserved as-is because strengthening it would change
/// which saved projects a reload finds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaIdentity {
    pub name: String,
    pub byte_size: u64,
}

impl MediaIdentity {
    pub fn new(name: &str, byte_size: u64) -> Self {
        Self {
            name: name.to_string(),
            byte_size,
        }
    }

    pub fn storage_key(&self) -> String {
        format!("project_{}_{}", self.name, self.byte_size)
    }
}

/// The persisted aggregate: offset, annotations, sample rate, creation time,
/// free-form notes, and (for bundle export only) the source file names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRecord {
    #[serde(rename = "syncOffset", default)]
    pub sync_offset: f64,
    #[serde(default)]
    pub timestamps: Vec<Annotation>,
    #[serde(rename = "sampleRate")]
    pub sample_rate_hz: f64,
    #[serde(rename = "createdAt")]
    pub created_at: String,
    #[serde(default)]
    pub notes: String,
    #[serde(rename = "videoFileName", skip_serializing_if = "Option::is_none")]
    pub video_file_name: Option<String>,
    #[serde(rename = "csvFileName", skip_serializing_if = "Option::is_none")]
    pub csv_file_name: Option<String>,
}

impl ProjectRecord {
    pub fn new(sample_rate_hz: f64) -> Self {
        Self {
            sync_offset: 0.0,
            timestamps: Vec::new(),
            sample_rate_hz,
            created_at: chrono::Utc::now().to_rfc3339(),
            notes: String::new(),
            video_file_name: None,
            csv_file_name: None,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Identity-keyed project persistence. Holds the live aggregate and writes it
/// through after every mutating action, overwriting unconditionally
/// (last-writer-wins, no merge).
#[derive(Debug)]
pub struct ProjectStore<S: Storage> {
    storage: S,
    identity: Option<MediaIdentity>,
    record: ProjectRecord,
}

impl<S: Storage> ProjectStore<S> {
    pub fn new(storage: S, sample_rate_hz: f64) -> Self {
        Self {
            storage,
            identity: None,
            record: ProjectRecord::new(sample_rate_hz),
        }
    }

    pub fn record(&self) -> &ProjectRecord {
        &self.record
    }

    /// Consumes the store, handing back its backing storage.
    pub fn into_storage(self) -> S {
        self.storage
    }

    pub fn identity(&self) -> Option<&MediaIdentity> {
        self.identity.as_ref()
    }

    /// Keys the store to a newly loaded video. Returns the stored aggregate
    /// if one exists for this identity; the caller must merge it wholesale
    /// into live state (offset, annotations, notes). Otherwise a fresh
    /// record is started.
    pub fn attach_media(&mut self, identity: MediaIdentity) -> Option<ProjectRecord> {
        let key = identity.storage_key();
        self.identity = Some(identity);

        match self.storage.get(&key) {
            Some(text) => match ProjectRecord::from_json(&text) {
                Ok(record) => {
                    info!(
                        "Restored project {key}: {} annotations, offset {:.3}s",
                        record.timestamps.len(),
                        record.sync_offset
                    );
                    self.record = record.clone();
                    Some(record)
                }
                Err(err) => {
                    warn!("Ignoring unreadable stored project {key}: {err}");
                    self.record = ProjectRecord::new(self.record.sample_rate_hz);
                    None
                }
            },
            None => {
                self.record = ProjectRecord::new(self.record.sample_rate_hz);
                None
            }
        }
    }

    /// Replaces identity and aggregate wholesale (bundle import path), then
    /// persists under the new key.
    pub fn rekey(&mut self, identity: MediaIdentity, record: ProjectRecord) {
        self.identity = Some(identity);
        self.record = record;
        self.save();
    }

    /// Replaces the live aggregate without changing the identity key. Used
    /// when a bundle carries metadata but no media entry.
    pub fn replace_record(&mut self, record: ProjectRecord) {
        self.record = record;
        self.save();
    }

    /// Persists the live aggregate under the identity key. A missing identity
    /// or a storage failure is logged and swallowed; the interactive session
    /// continues on in-memory state.
    pub fn save(&mut self) {
        let Some(identity) = &self.identity else {
            debug!("Skipping save: no media identity yet");
            return;
        };

        let text = match self.record.to_json() {
            Ok(text) => text,
            Err(err) => {
                warn!("Failed to serialize project: {err}");
                return;
            }
        };

        if let Err(err) = self.storage.set(&identity.storage_key(), &text) {
            warn!("{err}; continuing with in-memory state");
        }
    }

    pub fn set_offset(&mut self, offset_seconds: f64) {
        self.record.sync_offset = offset_seconds;
        self.save();
    }

    pub fn set_notes(&mut self, notes: &str) {
        self.record.notes = notes.to_string();
        self.save();
    }

    pub fn set_sample_rate(&mut self, sample_rate_hz: f64) {
        self.record.sample_rate_hz = sample_rate_hz;
        self.save();
    }

    /// Appends an annotation and persists.
    pub fn add_annotation(&mut self, time: f64, label: &str, event_type: &str, notes: &str) {
        self.record
            .timestamps
            .push(Annotation::new(time, label, event_type, notes));
        self.save();
    }

    /// Removes the annotation at `index` and persists. Out-of-range indices
    /// leave the sequence untouched.
    pub fn delete_annotation(&mut self, index: usize) -> Result<Annotation, AnnotationIndexError> {
        if index >= self.record.timestamps.len() {
            return Err(AnnotationIndexError {
                index,
                len: self.record.timestamps.len(),
            });
        }
        let removed = self.record.timestamps.remove(index);
        self.save();
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn store() -> ProjectStore<MemoryStorage> {
        ProjectStore::new(MemoryStorage::new(), 50.0)
    }

    #[test]
    fn identity_key_is_name_plus_size() {
        let identity = MediaIdentity::new("walk.mp4", 1_048_576);
        assert_eq!(identity.storage_key(), "project_walk.mp4_1048576");
    }

    #[test]
    fn save_without_identity_is_silent() {
        let mut store = store();
        store.add_annotation(1.0, "", "custom", "");
        assert_eq!(store.record().timestamps.len(), 1);
        assert!(store.identity().is_none());
    }

    #[test]
    fn save_then_attach_round_trips() {
        let mut store = store();
        store.attach_media(MediaIdentity::new("walk.mp4", 9000));
        store.set_offset(2.5);
        store.add_annotation(3.0, "toe off", "toe_off", "left");
        store.set_notes("outdoor trial");

        let saved = store.record().clone();

        // Simulate a reload against the same backing storage.
        let mut reloaded = ProjectStore::new(store.into_storage(), 50.0);
        let restored = reloaded
            .attach_media(MediaIdentity::new("walk.mp4", 9000))
            .expect("stored project");

        assert_eq!(restored, saved);
        assert_relative_eq!(reloaded.record().sync_offset, 2.5);
        assert_eq!(reloaded.record().timestamps[0].label, "toe off");
        assert_eq!(reloaded.record().notes, "outdoor trial");
    }

    #[test]
    fn attach_unknown_media_starts_fresh() {
        let mut store = store();
        store.attach_media(MediaIdentity::new("a.mp4", 1));
        store.add_annotation(1.0, "x", "custom", "");

        let loaded = store.attach_media(MediaIdentity::new("b.mp4", 2));
        assert!(loaded.is_none());
        assert!(store.record().timestamps.is_empty());
    }

    #[test]
    fn load_overwrites_live_state_wholesale() {
        let mut store = store();
        store.attach_media(MediaIdentity::new("a.mp4", 1));
        store.add_annotation(1.0, "saved", "custom", "");

        // In-memory edits after the save point...
        store.record.notes = "unsaved edit".to_string();

        // ...are discarded when the stored aggregate is re-attached.
        let restored = store.attach_media(MediaIdentity::new("a.mp4", 1)).unwrap();
        assert_eq!(restored.notes, "");
        assert_eq!(store.record().notes, "");
        assert_eq!(store.record().timestamps.len(), 1);
    }

    #[test]
    fn delete_out_of_range_errors_and_preserves_sequence() {
        let mut store = store();
        store.add_annotation(1.0, "a", "custom", "");
        store.add_annotation(2.0, "b", "custom", "");

        let err = store.delete_annotation(2).unwrap_err();
        assert_eq!(err, AnnotationIndexError { index: 2, len: 2 });
        assert_eq!(store.record().timestamps.len(), 2);

        let removed = store.delete_annotation(0).unwrap();
        assert_eq!(removed.label, "a");
        assert_eq!(store.record().timestamps[0].label, "b");
    }

    #[test]
    fn record_json_round_trip() {
        let mut record = ProjectRecord::new(100.0);
        record.sync_offset = -1.25;
        record.notes = "n".to_string();
        record.timestamps.push(Annotation::new(4.0, "", "custom", ""));
        record.video_file_name = Some("v.mp4".to_string());

        let json = record.to_json().unwrap();
        assert!(json.contains("\"syncOffset\""));
        assert!(json.contains("\"sampleRate\""));
        assert!(json.contains("\"createdAt\""));
        assert!(json.contains("\"videoFileName\""));
        assert!(!json.contains("csvFileName"));

        let back = ProjectRecord::from_json(&json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn failing_storage_degrades_to_memory_only() {
        struct FailingStorage;
        impl Storage for FailingStorage {
            fn get(&self, _key: &str) -> Option<String> {
                None
            }
            fn set(&mut self, _key: &str, _value: &str) -> Result<(), StorageError> {
                Err(StorageError("quota exceeded".to_string()))
            }
        }

        let mut store = ProjectStore::new(FailingStorage, 50.0);
        store.attach_media(MediaIdentity::new("a.mp4", 1));
        store.add_annotation(1.0, "kept", "custom", "");
        assert_eq!(store.record().timestamps.len(), 1);
    }
}
