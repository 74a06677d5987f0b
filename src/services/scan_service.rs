use crate::models::ScanEntry;
use crate::services::scanner::{NotebookScanner, ScanOutcome};
use crate::services::scratch::{ScratchError, ScratchSpace};
use crate::utils::validation::display_name;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncRead;
use tracing::{info, warn};

/// Turns an uploaded archive into one scan entry per contained notebook.
pub struct ScanService {
    scanner: Arc<dyn NotebookScanner>,
    scratch_dir: Option<PathBuf>,
}

impl ScanService {
    pub fn new(scanner: Arc<dyn NotebookScanner>, scratch_dir: Option<PathBuf>) -> Self {
        Self {
            scanner,
            scratch_dir,
        }
    }

    /// Persist, extract and scan an uploaded archive. Scratch state is
    /// removed before this returns, whatever the outcome.
    pub async fn scan_upload<'a>(
        &self,
        reader: impl AsyncRead + Unpin + Send + 'a,
    ) -> Result<Vec<ScanEntry>, ScratchError> {
        let mut scratch = ScratchSpace::create(self.scratch_dir.as_deref())?;
        let result = self.run(&mut scratch, reader).await;
        scratch.close();
        result
    }

    async fn run<'a>(
        &self,
        scratch: &mut ScratchSpace,
        reader: impl AsyncRead + Unpin + Send + 'a,
    ) -> Result<Vec<ScanEntry>, ScratchError> {
        let size = scratch.persist(reader).await?;
        tracing::debug!(
            "Stored {} byte upload at {}",
            size,
            scratch.archive_path().display()
        );

        scratch.extract().await?;
        let notebooks = scratch.notebooks().await?;
        info!("🔍 Scanning {} notebook(s)", notebooks.len());

        // Strictly sequential: one scanner process at a time
        let mut results = Vec::with_capacity(notebooks.len());
        for notebook in &notebooks {
            results.push(self.scan_notebook(notebook).await);
        }

        Ok(results)
    }

    /// Scan a single notebook, folding every failure into an error entry.
    pub async fn scan_notebook(&self, notebook: &Path) -> ScanEntry {
        let file = display_name(notebook);

        match self.scanner.scan(notebook).await {
            Ok(ScanOutcome::Passed { stdout }) => ScanEntry::Success {
                file,
                output: stdout,
            },
            Ok(ScanOutcome::Failed { stderr }) => {
                warn!("Scanner reported failure for {}", file);
                ScanEntry::Failure {
                    file,
                    error: stderr,
                }
            }
            Err(e) => {
                warn!("Scanner could not run for {}: {}", file, e);
                ScanEntry::Failure {
                    file,
                    error: e.to_string(),
                }
            }
        }
    }
}
