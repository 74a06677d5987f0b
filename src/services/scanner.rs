use anyhow::{Result, anyhow};
use std::env;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;

/// Result of running the scanner on one notebook
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// Scanner exited with status 0
    Passed { stdout: String },
    /// Scanner exited non-zero or was killed by a signal
    Failed { stderr: String },
}

/// Trait for notebook scanning implementations
#[async_trait::async_trait]
pub trait NotebookScanner: Send + Sync {
    /// Scan the notebook at `notebook`. `Err` means the scanner could not be run at all.
    async fn scan(&self, notebook: &Path) -> Result<ScanOutcome>;

    /// Check if the scanner is available
    async fn health_check(&self) -> bool;

    /// Human readable identifier, e.g. the executable name
    fn name(&self) -> &str;
}

/// Runs an external executable as `<program> <absolute-notebook-path>`.
///
/// No timeout is applied; a hung scanner blocks the caller until it exits.
/// Dropping the scan future (a cancelled request) kills the child.
pub struct CommandScanner {
    program: String,
}

impl CommandScanner {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Locate the executable, either as a path or through `PATH`.
    pub fn resolve_program(&self) -> Option<PathBuf> {
        let candidate = Path::new(&self.program);
        if candidate.components().count() > 1 {
            return candidate.is_file().then(|| candidate.to_path_buf());
        }

        let paths = env::var_os("PATH")?;
        env::split_paths(&paths)
            .map(|dir| dir.join(&self.program))
            .find(|path| path.is_file())
    }
}

#[async_trait::async_trait]
impl NotebookScanner for CommandScanner {
    async fn scan(&self, notebook: &Path) -> Result<ScanOutcome> {
        let output = Command::new(&self.program)
            .arg(notebook)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| anyhow!("Failed to run scanner '{}': {}", self.program, e))?;

        if output.status.success() {
            Ok(ScanOutcome::Passed {
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            })
        } else {
            tracing::debug!(
                "Scanner '{}' exited with {} for {}",
                self.program,
                output.status,
                notebook.display()
            );
            Ok(ScanOutcome::Failed {
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            })
        }
    }

    async fn health_check(&self) -> bool {
        self.resolve_program().is_some()
    }

    fn name(&self) -> &str {
        &self.program
    }
}

/// Factory function to create the scanner configured for this service
pub fn create_scanner(program: &str) -> Arc<dyn NotebookScanner> {
    Arc::new(CommandScanner::new(program))
}
