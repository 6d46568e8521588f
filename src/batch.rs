use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tracing::{error, info};

use crate::domain::{Accession, QueryMode};
use crate::error::TaxoError;
use crate::interpro::{Fetcher, HttpTransport, Sleeper, query_url};
use crate::store::ArtifactStore;

#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Re-fetch and overwrite even when the artifact already exists.
    pub force: bool,
    /// Wait between successive accessions, after a save or a failure but not
    /// after a skip. Keeps the request rate polite toward the shared API.
    pub request_pause: Duration,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            force: false,
            request_pause: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub started_at: String,
    pub mode: QueryMode,
    pub total: usize,
    pub attempted: usize,
    pub saved: usize,
    pub skipped: usize,
    pub failed: usize,
    pub failures: Vec<FailedItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedItem {
    pub accession: Accession,
    pub cause: String,
}

/// Drives the store and the fetcher over an ordered accession list, one item
/// at a time. A failed item is logged and skipped, never fatal to the batch;
/// since nothing was written it stays eligible for the next run.
pub struct BatchDownloader<T: HttpTransport, F: Sleeper, P: Sleeper> {
    store: ArtifactStore,
    fetcher: Fetcher<T, F>,
    pacer: P,
    base_url: String,
    options: BatchOptions,
}

impl<T: HttpTransport, F: Sleeper, P: Sleeper> BatchDownloader<T, F, P> {
    pub fn new(
        store: ArtifactStore,
        fetcher: Fetcher<T, F>,
        pacer: P,
        base_url: String,
        options: BatchOptions,
    ) -> Self {
        Self {
            store,
            fetcher,
            pacer,
            base_url,
            options,
        }
    }

    pub fn run(
        &self,
        accessions: &[Accession],
        mode: QueryMode,
    ) -> Result<BatchSummary, TaxoError> {
        self.store.ensure_root()?;

        let mut summary = BatchSummary {
            started_at: chrono::Utc::now().to_rfc3339(),
            mode,
            total: accessions.len(),
            attempted: 0,
            saved: 0,
            skipped: 0,
            failed: 0,
            failures: Vec::new(),
        };

        for accession in accessions {
            if !self.options.force && self.store.exists(accession, mode) {
                info!(%accession, "already downloaded, skipping");
                summary.skipped += 1;
                continue;
            }

            summary.attempted += 1;
            info!(%accession, %mode, "downloading");
            match self.fetch_one(accession, mode) {
                Ok(()) => summary.saved += 1,
                Err(err) => {
                    error!(%accession, cause = %err, "[FAILED]");
                    summary.failed += 1;
                    summary.failures.push(FailedItem {
                        accession: accession.clone(),
                        cause: err.to_string(),
                    });
                }
            }

            self.pacer.pause(self.options.request_pause);
        }

        info!(
            total = summary.total,
            attempted = summary.attempted,
            saved = summary.saved,
            skipped = summary.skipped,
            failed = summary.failed,
            "batch finished"
        );
        Ok(summary)
    }

    fn fetch_one(&self, accession: &Accession, mode: QueryMode) -> Result<(), TaxoError> {
        let url = query_url(&self.base_url, accession, mode);
        let body = self.fetcher.fetch(&url)?;
        let value: Value =
            serde_json::from_str(&body).map_err(|err| TaxoError::Decode(err.to_string()))?;
        let path = self.store.write(accession, mode, &value)?;
        info!(%accession, %path, "saved");
        Ok(())
    }
}
