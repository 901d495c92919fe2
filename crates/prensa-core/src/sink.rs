//! Standalone delivery target: buffer records in memory and write one
//! JSON file per run, named after the site and the run timestamp.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::error::AppError;
use crate::models::ArticleRecord;
use crate::traits::RecordSink;
use crate::util::run_output_filename;

/// File sink for harvests run without a queue. Records accumulate in
/// memory during the run; [`JsonFileSink::finish`] writes them out as
/// one pretty-printed JSON array.
#[derive(Clone)]
pub struct JsonFileSink {
    site_url: String,
    out_dir: PathBuf,
    records: Arc<Mutex<Vec<ArticleRecord>>>,
}

impl JsonFileSink {
    pub fn new(site_url: &str, out_dir: &Path) -> Self {
        Self {
            site_url: site_url.to_string(),
            out_dir: out_dir.to_path_buf(),
            records: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write the buffered records to `{site}_{timestamp}.json` in the
    /// output directory and return the path. A run with no records
    /// still produces a file, so an empty harvest is observable.
    pub async fn finish(&self) -> Result<PathBuf, AppError> {
        let records = self
            .records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        let path = self.out_dir.join(run_output_filename(&self.site_url)?);
        let json = serde_json::to_vec_pretty(&records)?;
        tokio::fs::create_dir_all(&self.out_dir)
            .await
            .map_err(|e| AppError::Generic(format!("cannot create output dir: {e}")))?;
        tokio::fs::write(&path, json)
            .await
            .map_err(|e| AppError::Generic(format!("cannot write {}: {e}", path.display())))?;
        tracing::info!(path = %path.display(), count = records.len(), "Harvest output written");
        Ok(path)
    }
}

impl RecordSink for JsonFileSink {
    async fn deliver(&self, record: &ArticleRecord) -> Result<(), AppError> {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(record.clone());
        Ok(())
    }
}
