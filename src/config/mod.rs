use std::env;
use std::path::PathBuf;

/// Runtime configuration for the scan service
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// External scanner executable (default: "nbdefense")
    pub scanner_binary: String,

    /// Maximum upload size in bytes (default: 256 MB)
    pub max_upload_size: usize,

    /// Parent directory for per-request scratch files (default: system temp dir)
    pub scratch_dir: Option<PathBuf>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            scanner_binary: "nbdefense".to_string(),
            max_upload_size: 256 * 1024 * 1024, // 256 MB
            scratch_dir: None,
        }
    }
}

impl ServiceConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup, falling back to defaults
    /// for missing or unparsable values.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let default = Self::default();

        Self {
            scanner_binary: lookup("SCANNER_BINARY")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(default.scanner_binary),

            max_upload_size: lookup("MAX_UPLOAD_SIZE")
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_upload_size),

            scratch_dir: lookup("SCRATCH_DIR")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .or(default.scratch_dir),
        }
    }
}
