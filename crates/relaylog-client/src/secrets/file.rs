//! Filesystem-backed secret store.
//!
//! Layout under the root directory:
//!
//! ```text
//! session.key       raw session key text
//! session.json      connection details announced with the key
//! tokens/<logger>   JSON object {"token": ".."}
//! ```

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use serde::Deserialize;

use super::{SecretStore, SecretStoreError};
use crate::session::{SessionInfo, SessionKey};

const SESSION_KEY_FILE: &str = "session.key";
const SESSION_INFO_FILE: &str = "session.json";
const TOKENS_DIR: &str = "tokens";
const STAGING_PREFIX: &str = ".staging-";

/// Secret store rooted at a directory.
///
/// Every save is staged in a uniquely named sibling file and renamed into
/// place, so a reader never sees a half-written file and concurrent writers
/// never share a staging file. On unix staged files are created with mode
/// `0o600`.
#[derive(Debug, Clone)]
pub struct FileSecrets {
    dir: PathBuf,
}

#[derive(Deserialize)]
struct TokenFile {
    token: String,
}

impl FileSecrets {
    /// Store rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Root directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn session_key_path(&self) -> PathBuf {
        self.dir.join(SESSION_KEY_FILE)
    }

    fn session_info_path(&self) -> PathBuf {
        self.dir.join(SESSION_INFO_FILE)
    }

    fn token_path(&self, logger: &str) -> Result<PathBuf, SecretStoreError> {
        let valid = !logger.is_empty()
            && logger != "."
            && logger != ".."
            && !logger.contains(['/', '\\', '\0']);
        if !valid {
            return Err(SecretStoreError::InvalidName(logger.to_string()));
        }
        Ok(self.dir.join(TOKENS_DIR).join(logger))
    }

    /// Replace `target` with `contents` through a fresh staging file.
    fn write_atomic(&self, target: &Path, contents: &[u8]) -> Result<(), SecretStoreError> {
        fs::create_dir_all(&self.dir).map_err(|e| io_error(&self.dir, &e))?;

        let mut staging = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempfile_in(&self.dir)
            .map_err(|e| io_error(&self.dir, &e))?;
        staging.write_all(contents).map_err(|e| io_error(staging.path(), &e))?;
        staging.as_file().sync_all().map_err(|e| io_error(staging.path(), &e))?;

        staging.persist(target).map_err(|e| io_error(target, &e.error))?;
        Ok(())
    }
}

fn io_error(path: &Path, err: &io::Error) -> SecretStoreError {
    SecretStoreError::Io(format!("{}: {err}", path.display()))
}

fn read_optional(path: &Path) -> Result<Option<String>, SecretStoreError> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(io_error(path, &err)),
    }
}

impl SecretStore for FileSecrets {
    fn save_session_key(&self, key: &SessionKey) -> Result<(), SecretStoreError> {
        let target = self.session_key_path();
        self.write_atomic(&target, key.value().as_bytes())?;

        tracing::debug!(path = %target.display(), "session key persisted");
        Ok(())
    }

    fn load_session_key(&self) -> Result<Option<SessionKey>, SecretStoreError> {
        let Some(text) = read_optional(&self.session_key_path())? else {
            return Ok(None);
        };

        let value = text.trim();
        if value.is_empty() {
            return Ok(None);
        }
        Ok(Some(SessionKey::new(value)))
    }

    fn clear_session_key(&self) -> Result<(), SecretStoreError> {
        let path = self.session_key_path();
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(io_error(&path, &err)),
        }
    }

    fn save_session_info(&self, info: &SessionInfo) -> Result<(), SecretStoreError> {
        let target = self.session_info_path();
        let json = serde_json::to_vec(info)
            .map_err(|e| SecretStoreError::Corrupt(format!("{}: {e}", target.display())))?;
        self.write_atomic(&target, &json)?;

        tracing::debug!(path = %target.display(), "session details persisted");
        Ok(())
    }

    fn load_session_info(&self) -> Result<Option<SessionInfo>, SecretStoreError> {
        let path = self.session_info_path();
        let Some(text) = read_optional(&path)? else {
            return Ok(None);
        };

        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| SecretStoreError::Corrupt(format!("{}: {e}", path.display())))
    }

    fn load_token(&self, logger: &str) -> Result<Option<String>, SecretStoreError> {
        let path = self.token_path(logger)?;
        let Some(text) = read_optional(&path)? else {
            return Ok(None);
        };

        let file: TokenFile = serde_json::from_str(&text)
            .map_err(|e| SecretStoreError::Corrupt(format!("{}: {e}", path.display())))?;
        Ok(Some(file.token))
    }
}
