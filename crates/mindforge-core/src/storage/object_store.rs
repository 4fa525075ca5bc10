//! Remote object storage boundary.
//!
//! The engine only ever calls `upload` and `remove`; the backing service
//! lives outside this crate.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::ingest::DocumentKind;

/// Metadata sent along with uploaded bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadMetadata {
    pub name: String,
    pub kind: DocumentKind,
    pub byte_size: u64,
}

/// Where the uploaded object can be fetched from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub url: String,
}

/// Opaque remote object/content storage.
///
/// Failures surface as [`StorageError`]; callers never retry.
pub trait ObjectStorage: Send + Sync {
    fn upload(&self, bytes: &[u8], metadata: &UploadMetadata)
        -> Result<UploadReceipt, StorageError>;

    fn remove(&self, url: &str) -> Result<(), StorageError>;
}

/// In-process object storage, used by default and in tests.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    fail_uploads: AtomicBool,
    fail_removes: AtomicBool,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent upload fail.
    pub fn fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent remove fail.
    pub fn fail_removes(&self, fail: bool) {
        self.fail_removes.store(fail, Ordering::SeqCst);
    }

    pub fn contains(&self, url: &str) -> bool {
        self.objects
            .lock()
            .map(|objects| objects.contains_key(url))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.objects.lock().map(|objects| objects.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ObjectStorage for MemoryObjectStore {
    fn upload(
        &self,
        bytes: &[u8],
        metadata: &UploadMetadata,
    ) -> Result<UploadReceipt, StorageError> {
        let failed = |message: &str| StorageError::UploadFailed {
            name: metadata.name.clone(),
            message: message.to_string(),
        };
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(failed("storage unavailable"));
        }
        let url = format!("memory://documents/{}/{}", uuid::Uuid::new_v4(), metadata.name);
        self.objects
            .lock()
            .map_err(|_| failed("storage lock poisoned"))?
            .insert(url.clone(), bytes.to_vec());
        Ok(UploadReceipt { url })
    }

    fn remove(&self, url: &str) -> Result<(), StorageError> {
        let failed = |message: &str| StorageError::RemoveFailed {
            url: url.to_string(),
            message: message.to_string(),
        };
        if self.fail_removes.load(Ordering::SeqCst) {
            return Err(failed("storage unavailable"));
        }
        let mut objects = self.objects.lock().map_err(|_| failed("storage lock poisoned"))?;
        objects
            .remove(url)
            .map(|_| ())
            .ok_or_else(|| failed("no such object"))
    }
}
