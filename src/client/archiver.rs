use super::ClientError;
use crate::utils::validation::is_notebook_path;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use walkdir::WalkDir;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Write every `.ipynb` under `source` into a new Deflate ZIP at `output`,
/// named by their path relative to `source`. An existing `output` is
/// overwritten. Returns the number of notebooks packaged.
pub fn collect_and_package(source: &Path, output: &Path) -> Result<usize, ClientError> {
    let file = File::create(output)?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut packaged = 0;

    for entry in WalkDir::new(source).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() || !is_notebook_path(entry.path()) {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(io::Error::other)?;
        let name = entry_name(relative);
        tracing::debug!("Adding {}", name);

        zip.start_file(name, options)?;
        let mut notebook = File::open(entry.path())?;
        io::copy(&mut notebook, &mut zip)?;
        packaged += 1;
    }

    let mut writer = zip.finish()?;
    writer.flush()?;

    tracing::info!("Created ZIP file: {}", output.display());
    Ok(packaged)
}

/// Archive entry names always use `/`, whatever the host separator.
fn entry_name(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
