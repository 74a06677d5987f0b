use std::path::Path;

/// File suffix an upload must carry to be accepted.
pub const ZIP_EXTENSION: &str = ".zip";

/// File suffix identifying a notebook inside an archive.
pub const NOTEBOOK_EXTENSION: &str = ".ipynb";

/// Checks the uploaded file name only; content is not sniffed.
pub fn has_zip_extension(filename: &str) -> bool {
    filename.ends_with(ZIP_EXTENSION)
}

/// Exact, case-sensitive suffix match.
pub fn is_notebook(filename: &str) -> bool {
    filename.ends_with(NOTEBOOK_EXTENSION)
}

/// Same as [`is_notebook`] but for a path's final component.
pub fn is_notebook_path(path: &Path) -> bool {
    path.file_name()
        .map(|name| is_notebook(&name.to_string_lossy()))
        .unwrap_or(false)
}

/// Base name used to key scan results.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}
