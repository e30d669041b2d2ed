// Glue between an upload source, the analyzer, the history store and its SQLite mirror.
use crate::analyzer::{Analyzer, CsvAnalyzer};
use crate::history::HistoryStore;
use crate::ingest::{Upload, UploadSource};
use crate::model::{AnalysisError, IngestError, PersistenceError, StoredRecord, SummaryRecord};
use crate::storage::SqliteStorage;
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

type Analysis = Result<SummaryRecord, AnalysisError>;

#[derive(Debug)]
pub enum Outcome {
    Stored(StoredRecord),
    Rejected(AnalysisError),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub stored: usize,
    pub rejected: usize,
    pub failed: usize,
}

pub struct Pipeline {
    source: Arc<dyn UploadSource>,
    analyzer: CsvAnalyzer,
    store: Arc<HistoryStore>,
    storage: Option<Arc<Mutex<SqliteStorage>>>,
}

impl Pipeline {
    pub fn new(
        source: Arc<dyn UploadSource>,
        store: Arc<HistoryStore>,
        storage: Option<Arc<Mutex<SqliteStorage>>>,
    ) -> Self {
        Self {
            source,
            analyzer: CsvAnalyzer::new(),
            store,
            storage,
        }
    }

    pub fn store(&self) -> &HistoryStore {
        &self.store
    }

    /// Fetches and analyzes every pending upload concurrently, then records the
    /// results one at a time in listing order.
    pub async fn run_cycle(&self) -> Result<CycleReport, IngestError> {
        let uploads = self.source.list().await?;
        if uploads.is_empty() {
            return Ok(CycleReport::default());
        }
        info!("Processing {} upload(s)...", uploads.len());

        let analyses = join_all(uploads.iter().map(|upload| self.analyze(upload))).await;

        let mut report = CycleReport::default();
        for (upload, analysis) in uploads.iter().zip(analyses) {
            match self.record(upload, analysis).await {
                Ok(Outcome::Stored(stored)) => {
                    info!("'{}' stored as summary #{}", upload.filename, stored.id);
                    report.stored += 1;
                }
                Ok(Outcome::Rejected(e)) => {
                    warn!("Invalid file '{}': {}", upload.filename, e);
                    report.rejected += 1;
                }
                Err(e) => {
                    warn!("Upload '{}' failed: {}", upload.filename, e);
                    report.failed += 1;
                }
            }
        }
        Ok(report)
    }

    async fn analyze(&self, upload: &Upload) -> Result<Analysis, IngestError> {
        let raw = self.source.fetch(upload).await?;
        Ok(self.analyzer.analyze(&raw, &upload.filename))
    }

    /// Claims the upload before its summary is inserted, so a file that cannot be
    /// moved out of the source stays unrecorded and is never stored twice.
    /// An unusable file is set aside, not retried.
    async fn record(
        &self,
        upload: &Upload,
        analysis: Result<Analysis, IngestError>,
    ) -> Result<Outcome, IngestError> {
        let summary = match analysis? {
            Ok(summary) => summary,
            Err(e) => {
                self.source.reject(upload).await?;
                return Ok(Outcome::Rejected(e));
            }
        };

        self.source.complete(upload).await?;

        let stored = self.store.insert(summary);
        if let Err(e) = self.persist(&stored).await {
            warn!("Persisting summary #{} failed: {}", stored.id, e);
        }
        Ok(Outcome::Stored(stored))
    }

    async fn persist(&self, record: &StoredRecord) -> Result<(), PersistenceError> {
        let Some(storage) = &self.storage else {
            return Ok(());
        };
        let storage = storage.lock().await;
        storage.save(record)?;
        storage.trim_to(self.store.capacity())?;
        Ok(())
    }
}
