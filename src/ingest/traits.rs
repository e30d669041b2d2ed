use crate::model::IngestError;
use std::path::PathBuf;

/// A file waiting to be analyzed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub filename: String,
    pub path: PathBuf,
}

#[async_trait::async_trait]
pub trait UploadSource: Send + Sync {
    /// Pending uploads, in the order they should be processed.
    async fn list(&self) -> Result<Vec<Upload>, IngestError>;
    async fn fetch(&self, upload: &Upload) -> Result<Vec<u8>, IngestError>;
    /// Acknowledges an upload so it is not listed again.
    async fn complete(&self, upload: &Upload) -> Result<(), IngestError>;
    /// Sets aside an upload that could not be analyzed.
    async fn reject(&self, upload: &Upload) -> Result<(), IngestError>;
}
