// src/services/gateway.rs
//! Contract of the remote image service the pipeline drives.
//!
//! Every operation is correlated by the `uuid` string returned from
//! [`ImageGateway::upload`]. Implementations report stage failures with the
//! matching [`StudioError`] variant and transport failures as
//! [`StudioError::NetworkError`].

use crate::errors::StudioError;
use crate::models::{HistoryEntry, ImageStatus, NewHistoryEntry, TransformationRequest, UploadFile};
use async_trait::async_trait;
use bytes::Bytes;

#[async_trait]
pub trait ImageGateway: Send + Sync {
    /// Stores the source image and assigns its correlation id.
    async fn upload(&self, file: &UploadFile) -> Result<String, StudioError>;

    async fn generate_mask(&self, uuid: &str) -> Result<(), StudioError>;

    async fn analyze(&self, uuid: &str) -> Result<(), StudioError>;

    async fn image_status(&self, uuid: &str) -> Result<ImageStatus, StudioError>;

    async fn recolor(&self, request: &TransformationRequest) -> Result<(), StudioError>;

    /// Fixed address of the recolored artifact for `uuid`.
    fn recolored_url(&self, uuid: &str) -> String;

    async fn fetch_recolored(&self, uuid: &str) -> Result<Bytes, StudioError>;

    async fn list_history(&self) -> Result<Vec<HistoryEntry>, StudioError>;

    /// Persists a row; the server assigns the timestamp.
    async fn create_history(&self, entry: &NewHistoryEntry) -> Result<(), StudioError>;

    /// Fails with [`StudioError::HistoryNotFound`] when no row has `uuid`.
    async fn delete_history(&self, uuid: &str) -> Result<(), StudioError>;
}
