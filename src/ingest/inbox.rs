use crate::ingest::traits::{Upload, UploadSource};
use crate::model::IngestError;
use crate::utils::is_csv_file;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Picks up `*.csv` files dropped into a directory.
///
/// Completed files are moved to `processed_dir`, rejected ones to `rejected_dir`.
pub struct InboxSource {
    inbox_dir: PathBuf,
    processed_dir: PathBuf,
    rejected_dir: PathBuf,
}

impl InboxSource {
    pub fn new(
        inbox_dir: impl Into<PathBuf>,
        processed_dir: impl Into<PathBuf>,
        rejected_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            inbox_dir: inbox_dir.into(),
            processed_dir: processed_dir.into(),
            rejected_dir: rejected_dir.into(),
        }
    }

    async fn move_into(&self, upload: &Upload, dir: &Path) -> Result<(), IngestError> {
        fs::create_dir_all(dir).await.map_err(|e| io_error(dir, e))?;
        let target = free_target(dir, &upload.filename).await?;
        fs::rename(&upload.path, &target)
            .await
            .map_err(|e| io_error(&upload.path, e))?;
        debug!("Moved '{}' to {}", upload.filename, target.display());
        Ok(())
    }
}

/// First name in `dir` not already taken: `plant.csv`, then `plant-1.csv`, `plant-2.csv`, ...
async fn free_target(dir: &Path, filename: &str) -> Result<PathBuf, IngestError> {
    let original = Path::new(filename);
    let stem = original
        .file_stem()
        .map_or_else(|| filename.to_string(), |s| s.to_string_lossy().into_owned());
    let extension = original.extension().map(|e| e.to_string_lossy().into_owned());

    let mut candidate = dir.join(filename);
    let mut n = 0u32;
    while fs::try_exists(&candidate).await.map_err(|e| io_error(&candidate, e))? {
        n += 1;
        let name = match &extension {
            Some(ext) => format!("{stem}-{n}.{ext}"),
            None => format!("{stem}-{n}"),
        };
        candidate = dir.join(name);
    }
    Ok(candidate)
}

fn io_error(path: &Path, source: std::io::Error) -> IngestError {
    IngestError::Io {
        path: path.display().to_string(),
        source,
    }
}

#[async_trait::async_trait]
impl UploadSource for InboxSource {
    async fn list(&self) -> Result<Vec<Upload>, IngestError> {
        fs::create_dir_all(&self.inbox_dir)
            .await
            .map_err(|e| io_error(&self.inbox_dir, e))?;

        let mut entries = fs::read_dir(&self.inbox_dir)
            .await
            .map_err(|e| io_error(&self.inbox_dir, e))?;

        let mut uploads = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| io_error(&self.inbox_dir, e))?
        {
            let path = entry.path();
            let is_file = entry
                .file_type()
                .await
                .map_err(|e| io_error(&path, e))?
                .is_file();
            if !is_file || !is_csv_file(&path) {
                continue;
            }
            let filename = entry.file_name().to_string_lossy().into_owned();
            uploads.push(Upload { filename, path });
        }

        uploads.sort_by(|a, b| a.filename.cmp(&b.filename));
        Ok(uploads)
    }

    async fn fetch(&self, upload: &Upload) -> Result<Vec<u8>, IngestError> {
        fs::read(&upload.path).await.map_err(|e| io_error(&upload.path, e))
    }

    async fn complete(&self, upload: &Upload) -> Result<(), IngestError> {
        self.move_into(upload, &self.processed_dir).await
    }

    async fn reject(&self, upload: &Upload) -> Result<(), IngestError> {
        self.move_into(upload, &self.rejected_dir).await
    }
}
