use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::quiz::Quiz;

pub const DEFAULT_STORAGE_KEY: &str = "quizmaster_quizzes";

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("failed to access stored value {key}: {source}")]
    Io {
        key: String,
        source: std::io::Error,
    },
    #[error("storage backend rejected {key}: {reason}")]
    Backend { key: String, reason: String },
    #[error("failed to decode stored value {key}: {source}")]
    Decode {
        key: String,
        source: serde_json::Error,
    },
    #[error("failed to encode quizzes for {key}: {source}")]
    Encode {
        key: String,
        source: serde_json::Error,
    },
}

impl PartialEq for PersistenceError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Io { key: left, .. }, Self::Io { key: right, .. }) => left == right,
            (
                Self::Backend {
                    key: left,
                    reason: left_reason,
                },
                Self::Backend {
                    key: right,
                    reason: right_reason,
                },
            ) => left == right && left_reason == right_reason,
            (Self::Decode { key: left, .. }, Self::Decode { key: right, .. }) => left == right,
            (Self::Encode { key: left, .. }, Self::Encode { key: right, .. }) => left == right,
            _ => false,
        }
    }
}

impl Eq for PersistenceError {}

/// Key-value storage holding one serialized value per key.
pub trait StorageBackend {
    /// Returns `Ok(None)` when nothing is stored under `key`.
    fn read(&self, key: &str) -> Result<Option<String>, PersistenceError>;

    fn write(&mut self, key: &str, value: &str) -> Result<(), PersistenceError>;
}

/// Backend kept entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    entries: HashMap<String, String>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }
}

impl StorageBackend for MemoryBackend {
    fn read(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        Ok(self.entries.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), PersistenceError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Backend storing each key as `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl StorageBackend for FileBackend {
    fn read(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }

        fs::read_to_string(&path)
            .map(Some)
            .map_err(|source| PersistenceError::Io {
                key: key.to_string(),
                source,
            })
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), PersistenceError> {
        let to_io = |source| PersistenceError::Io {
            key: key.to_string(),
            source,
        };

        fs::create_dir_all(&self.dir).map_err(to_io)?;
        fs::write(self.path_for(key), value).map_err(to_io)
    }
}

/// Best-effort persistence of the whole quiz collection under a single key.
///
/// Failures never reach the caller: a failed load yields an empty collection and a failed save
/// is dropped. Both are logged.
#[derive(Debug, Clone)]
pub struct QuizStore<B> {
    backend: B,
    key: String,
}

impl<B: StorageBackend> QuizStore<B> {
    pub fn new(backend: B, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn load(&self) -> Vec<Quiz> {
        match self.try_load() {
            Ok(quizzes) => quizzes,
            Err(error) => {
                warn!(%error, "failed to load quizzes, starting with an empty collection");
                Vec::new()
            }
        }
    }

    pub fn save(&mut self, quizzes: &[Quiz]) {
        if let Err(error) = self.try_save(quizzes) {
            warn!(%error, "failed to save quizzes");
        }
    }

    pub fn try_load(&self) -> Result<Vec<Quiz>, PersistenceError> {
        let Some(data) = self.backend.read(&self.key)? else {
            return Ok(Vec::new());
        };

        serde_json::from_str(&data).map_err(|source| PersistenceError::Decode {
            key: self.key.clone(),
            source,
        })
    }

    pub fn try_save(&mut self, quizzes: &[Quiz]) -> Result<(), PersistenceError> {
        let data = serde_json::to_string(quizzes).map_err(|source| PersistenceError::Encode {
            key: self.key.clone(),
            source,
        })?;

        self.backend.write(&self.key, &data)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Added,
    Updated,
}

/// The quiz collection together with its store. Every change rewrites the whole collection.
#[derive(Debug, Clone)]
pub struct QuizLibrary<B> {
    store: QuizStore<B>,
    quizzes: Vec<Quiz>,
}

impl<B: StorageBackend> QuizLibrary<B> {
    pub fn open(backend: B, key: impl Into<String>) -> Self {
        let store = QuizStore::new(backend, key);
        let quizzes = store.load();

        Self { store, quizzes }
    }

    pub fn quizzes(&self) -> &[Quiz] {
        &self.quizzes
    }

    pub fn get(&self, id: &str) -> Option<&Quiz> {
        self.quizzes.iter().find(|quiz| quiz.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.quizzes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.quizzes.len()
    }

    pub fn store(&self) -> &QuizStore<B> {
        &self.store
    }

    /// Replaces the quiz with the same id in place, or puts a new quiz first.
    pub fn upsert(&mut self, quiz: Quiz) -> Upsert {
        let outcome = match self.quizzes.iter().position(|existing| existing.id == quiz.id) {
            Some(index) => {
                self.quizzes[index] = quiz;
                Upsert::Updated
            }
            None => {
                self.quizzes.insert(0, quiz);
                Upsert::Added
            }
        };

        info!(?outcome, total = self.quizzes.len(), "quiz saved");
        self.store.save(&self.quizzes);
        outcome
    }

    /// Deletes the quiz with `id`. Returns false when no such quiz exists.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.quizzes.len();
        self.quizzes.retain(|quiz| quiz.id != id);

        if self.quizzes.len() == before {
            return false;
        }

        info!(quiz_id = id, total = self.quizzes.len(), "quiz deleted");
        self.store.save(&self.quizzes);
        true
    }
}
