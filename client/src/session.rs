//! Durable storage for the signed-in user between runs.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chorus_model::User;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session storage I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("Saved session is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Single-slot storage for the current user record
pub trait SessionStore: Send + Sync {
    fn load(&self) -> Result<Option<User>, SessionError>;

    fn save(&self, user: &User) -> Result<(), SessionError>;

    fn clear(&self) -> Result<(), SessionError>;
}

/// JSON file on disk
pub struct FileSession {
    path: PathBuf,
}

impl FileSession {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSession {
    fn load(&self) -> Result<Option<User>, SessionError> {
        match fs::read_to_string(&self.path) {
            Ok(text) => Ok(Some(serde_json::from_str(&text)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, user: &User) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string(user)?)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

/// Session held in memory, serialized the same way as on disk
#[derive(Default)]
pub struct MemorySession {
    saved: Mutex<Option<String>>,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a user already saved
    pub fn with_user(user: &User) -> Result<Self, SessionError> {
        Ok(Self {
            saved: Mutex::new(Some(serde_json::to_string(user)?)),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.saved
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}

impl SessionStore for MemorySession {
    fn load(&self) -> Result<Option<User>, SessionError> {
        let saved = self.saved.lock().unwrap_or_else(PoisonError::into_inner);
        match saved.as_deref() {
            Some(text) => Ok(Some(serde_json::from_str(text)?)),
            None => Ok(None),
        }
    }

    fn save(&self, user: &User) -> Result<(), SessionError> {
        let text = serde_json::to_string(user)?;
        *self.saved.lock().unwrap_or_else(PoisonError::into_inner) = Some(text);
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        *self.saved.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}
