pub mod models;
pub mod queries;
pub mod revocations;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use thiserror::Error;
use tracing::{debug, info};

use chirp_types::models::UserId;

use crate::models::StoreDocument;

pub type Result<T, E = StoreError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O failed on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("store document at {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode store document: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("no {0} ids left to allocate")]
    IdsExhausted(&'static str),

    #[error("user {0} does not exist")]
    UnknownUser(UserId),
}

/// Single-file JSON datastore.
///
/// Every write goes through [`Database::transaction`], which holds the
/// exclusive lock across the whole load/mutate/save span. Reads share the lock.
/// Saves overwrite the file in place: a crash mid-write can leave it truncated.
/// The lock guards no data: a panic inside a transaction leaves the file as it
/// was and does not block later access.
pub struct Database {
    path: PathBuf,
    lock: RwLock<()>,
}

impl Database {
    /// Open the store at `path`, creating an empty document if the file does
    /// not exist. A file that exists but does not parse is an error; callers
    /// must not continue against it.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            write_document(path, &StoreDocument::default())?;
            info!("Initialised empty store at {}", path.display());
        }

        let doc = read_document(path)?;

        info!(
            "Store opened at {} ({} users, {} posts, {} revoked tokens)",
            path.display(),
            doc.users.len(),
            doc.posts.len(),
            doc.revoked_tokens.len()
        );
        Ok(Self {
            path: path.to_path_buf(),
            lock: RwLock::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load a full copy of the document under the shared lock.
    pub fn load(&self) -> Result<StoreDocument> {
        let _guard = self.lock.read().unwrap_or_else(PoisonError::into_inner);
        read_document(&self.path)
    }

    /// Overwrite the backing file with `doc` under the exclusive lock.
    pub fn save(&self, doc: &StoreDocument) -> Result<()> {
        let _guard = self.lock.write().unwrap_or_else(PoisonError::into_inner);
        write_document(&self.path, doc)
    }

    /// Run a read-only closure against a freshly loaded document.
    pub fn read<F, T, E>(&self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&StoreDocument) -> std::result::Result<T, E>,
        E: From<StoreError>,
    {
        let doc = self.load()?;
        f(&doc)
    }

    /// Load, mutate and save as one step. The exclusive lock is held for the
    /// whole span, so concurrent transactions are serialised. If `f` fails the
    /// document is not written.
    pub fn transaction<F, T, E>(&self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&mut StoreDocument) -> std::result::Result<T, E>,
        E: From<StoreError>,
    {
        let _guard = self.lock.write().unwrap_or_else(PoisonError::into_inner);

        let mut doc = read_document(&self.path)?;
        let out = f(&mut doc)?;
        write_document(&self.path, &doc)?;
        Ok(out)
    }

    /// Like [`Database::transaction`] but only writes when `f` reports a
    /// change, for idempotent operations.
    pub fn transaction_if_changed<F, T, E>(&self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&mut StoreDocument) -> std::result::Result<(T, bool), E>,
        E: From<StoreError>,
    {
        let _guard = self.lock.write().unwrap_or_else(PoisonError::into_inner);

        let mut doc = read_document(&self.path)?;
        let (out, changed) = f(&mut doc)?;
        if changed {
            write_document(&self.path, &doc)?;
        } else {
            debug!("Transaction made no changes; skipping write");
        }
        Ok(out)
    }
}

fn read_document(path: &Path) -> Result<StoreDocument> {
    let data = fs::read(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&data).map_err(|source| StoreError::Corrupt {
        path: path.to_path_buf(),
        source,
    })
}

fn write_document(path: &Path, doc: &StoreDocument) -> Result<()> {
    let data = serde_json::to_vec_pretty(doc).map_err(StoreError::Encode)?;
    fs::write(path, data).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })
}
