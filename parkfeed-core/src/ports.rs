//! Traits describing source and storage capabilities and their error types.

use std::io::Error as IoError;
use std::path::PathBuf;

use async_trait::async_trait;
use reqwest::Error as ReqwestError;
use serde_json::Error as JsonError;

use crate::model::{DatasetId, DatasetPayload, ParkingRecord, SourceMeta};

#[derive(thiserror::Error, Debug)]
/// Errors raised while retrieving or interpreting a provider payload.
pub enum UpstreamError {
    /// Connection failure, timeout, or non-success HTTP status.
    #[error("Network error: {0}")]
    Network(#[from] ReqwestError),
    /// Response body was not valid for the expected structure.
    #[error("Decode error: {0}")]
    Decode(#[from] JsonError),
    /// A field held a value that could not be coerced.
    #[error("Invalid value for {field}: {value:?}")]
    InvalidField {
        /// Provider field name.
        field: &'static str,
        /// Offending raw value.
        value: String,
    },
}

#[derive(thiserror::Error, Debug)]
/// Errors raised while reading or writing persisted datasets.
pub enum StorageError {
    /// Filesystem access failed.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        /// Path that was being accessed.
        path: PathBuf,
        /// Underlying error.
        source: IoError,
    },
    /// Payload could not be serialized or deserialized.
    #[error("Serialization error: {0}")]
    Serde(#[from] JsonError),
    /// Backing store is unusable, e.g. a poisoned lock.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
/// Trait for provider-specific parking sources.
pub trait SourcePort: Send + Sync {
    /// Metadata describing the source and the dataset it feeds.
    fn source(&self) -> &SourceMeta;

    /// Retrieve the provider payload and map it into live canonical records.
    ///
    /// # Errors
    ///
    /// Returns an [`UpstreamError`] when the request fails, the provider answers with a
    /// non-success status, or any record cannot be normalized.
    async fn fetch_and_normalize(&self) -> Result<Vec<ParkingRecord>, UpstreamError>;
}

/// Trait for durable dataset storage with a primary and a fallback copy.
pub trait DatasetStore: Send + Sync {
    /// Store `payload` as both the primary and the fallback copy of `dataset_id`.
    ///
    /// The fallback copy is only replaced once the primary copy was written.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] when either copy cannot be written.
    fn write(&self, dataset_id: &DatasetId, payload: &DatasetPayload) -> Result<(), StorageError>;

    /// Read the fallback copy of `dataset_id`, `None` when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] when the copy exists but cannot be read or parsed.
    fn read_fallback(&self, dataset_id: &DatasetId) -> Result<Option<DatasetPayload>, StorageError>;

    /// Records of the fallback copy, each re-tagged as
    /// [`SourceStatus::Fallback`](crate::model::SourceStatus::Fallback).
    ///
    /// Missing or unreadable copies yield an empty sequence.
    fn load_fallback(&self, dataset_id: &DatasetId) -> Vec<ParkingRecord> {
        match self.read_fallback(dataset_id) {
            Ok(Some(payload)) => payload
                .records
                .into_iter()
                .map(ParkingRecord::into_fallback)
                .collect(),
            Ok(None) => Vec::new(),
            Err(err) => {
                log::warn!("Ignoring unreadable fallback for {dataset_id}: {err}");
                Vec::new()
            }
        }
    }
}
