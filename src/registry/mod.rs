//! Paired-device registry.
//!
//! A persistent set of television ip addresses that completed pairing with
//! the stored identity. The set is authoritative for the session engine's
//! gating check: an address not in the set is refused before any socket is
//! opened.

use std::collections::BTreeSet;
use std::net::IpAddr;
use std::sync::{Mutex, RwLock};
use tokio::sync::watch;

use crate::fs_utils::write_atomic;

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O failure on the backing store
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stored data could not be parsed or written
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Abstract backing store for the paired-ip set.
pub trait PairedStore: Send + Sync {
    /// Load the persisted set.
    ///
    /// # Errors
    ///
    /// Returns error if the store exists but cannot be read.
    fn load(&self) -> Result<Vec<String>, StorageError>;

    /// Persist the full set.
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be written.
    fn persist(&self, ips: &[String]) -> Result<(), StorageError>;
}

/// In-memory store (non-persistent), for tests and ephemeral clients.
#[derive(Debug, Default)]
pub struct MemoryStore {
    ips: Mutex<Vec<String>>,
}

impl MemoryStore {
    /// Create an empty in-memory store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl PairedStore for MemoryStore {
    fn load(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.ips.lock().expect("paired store poisoned").clone())
    }

    fn persist(&self, ips: &[String]) -> Result<(), StorageError> {
        *self.ips.lock().expect("paired store poisoned") = ips.to_vec();
        Ok(())
    }
}

/// File-backed store: a JSON array of ip strings, written atomically.
pub struct FileStore {
    path: std::path::PathBuf,
}

impl FileStore {
    /// Create a file store at the given path.
    #[must_use]
    pub fn new(path: impl Into<std::path::PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl PairedStore for FileStore {
    fn load(&self) -> Result<Vec<String>, StorageError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let file = std::fs::File::open(&self.path)?;
        let reader = std::io::BufReader::new(file);
        serde_json::from_reader(reader).map_err(|e| StorageError::Serialization(e.to_string()))
    }

    fn persist(&self, ips: &[String]) -> Result<(), StorageError> {
        let json = serde_json::to_vec_pretty(ips)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        write_atomic(&self.path, &json)?;
        Ok(())
    }
}

/// The paired-device set with change notification.
///
/// Mutations go through the backing store before the in-memory view and the
/// change channel update, so observers never see an ip the store does not
/// hold.
pub struct PairedRegistry {
    ips: RwLock<BTreeSet<String>>,
    store: Box<dyn PairedStore>,
    tx: watch::Sender<Vec<String>>,
}

impl PairedRegistry {
    /// Create a registry over the given store, loading the persisted set.
    ///
    /// # Errors
    ///
    /// Returns error if the store exists but cannot be read.
    pub fn new(store: Box<dyn PairedStore>) -> Result<Self, StorageError> {
        let ips: BTreeSet<String> = store.load()?.into_iter().collect();
        let (tx, _) = watch::channel(ips.iter().cloned().collect());
        Ok(Self {
            ips: RwLock::new(ips),
            store,
            tx,
        })
    }

    /// Check whether an address completed pairing.
    #[must_use]
    pub fn is_paired(&self, ip: IpAddr) -> bool {
        self.ips
            .read()
            .expect("registry poisoned")
            .contains(&ip.to_string())
    }

    /// Record a successfully paired address.
    ///
    /// # Errors
    ///
    /// Returns error if persisting fails; the in-memory set is unchanged.
    pub fn add(&self, ip: IpAddr) -> Result<(), StorageError> {
        let mut ips = self.ips.write().expect("registry poisoned");
        if !ips.insert(ip.to_string()) {
            return Ok(());
        }
        let snapshot: Vec<String> = ips.iter().cloned().collect();
        if let Err(e) = self.store.persist(&snapshot) {
            ips.remove(&ip.to_string());
            return Err(e);
        }
        drop(ips);
        let _ = self.tx.send(snapshot);
        Ok(())
    }

    /// Remove an address (explicit unpair, or certificate rejection).
    ///
    /// Returns whether the address was present.
    ///
    /// # Errors
    ///
    /// Returns error if persisting fails; the in-memory set is unchanged.
    pub fn remove(&self, ip: IpAddr) -> Result<bool, StorageError> {
        let mut ips = self.ips.write().expect("registry poisoned");
        if !ips.remove(&ip.to_string()) {
            return Ok(false);
        }
        let snapshot: Vec<String> = ips.iter().cloned().collect();
        if let Err(e) = self.store.persist(&snapshot) {
            ips.insert(ip.to_string());
            return Err(e);
        }
        drop(ips);
        let _ = self.tx.send(snapshot);
        Ok(true)
    }

    /// List all paired addresses.
    #[must_use]
    pub fn list(&self) -> Vec<String> {
        self.ips
            .read()
            .expect("registry poisoned")
            .iter()
            .cloned()
            .collect()
    }

    /// Subscribe to changes of the paired set.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Vec<String>> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests;
