use crate::utils::validation::is_notebook_path;
use std::fs;
use std::io::{self, BufReader, Read, Write};
use std::path::{Component, Path, PathBuf};
use tempfile::{Builder, NamedTempFile, TempDir};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use walkdir::WalkDir;
use zip::ZipArchive;
use zip::result::ZipError;

const SCRATCH_PREFIX: &str = "nbscan-";
const COPY_BUFFER_SIZE: usize = 64 * 1024;

#[derive(Error, Debug)]
pub enum ScratchError {
    /// Reading the upload stream failed (client side)
    #[error("Failed to read upload: {0}")]
    Upload(#[source] io::Error),

    /// The scratch archive is not a readable ZIP
    #[error("Invalid archive: {0}")]
    InvalidArchive(#[source] ZipError),

    #[error("Scratch I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Per-request scratch storage: the uploaded archive plus, once extraction
/// starts, the directory it is extracted into.
///
/// Both are removed when the value is dropped, so every exit path (including
/// a cancelled request future) cleans up. [`ScratchSpace::close`] does the same
/// eagerly and reports failures.
pub struct ScratchSpace {
    archive: NamedTempFile,
    dir: Option<TempDir>,
    parent: Option<PathBuf>,
}

impl ScratchSpace {
    /// Create an empty scratch archive under `parent` (or the system temp dir).
    pub fn create(parent: Option<&Path>) -> Result<Self, ScratchError> {
        let mut builder = Builder::new();
        builder.prefix(SCRATCH_PREFIX).suffix(".zip");

        let archive = match parent {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };

        Ok(Self {
            archive,
            dir: None,
            parent: parent.map(Path::to_path_buf),
        })
    }

    pub fn archive_path(&self) -> &Path {
        self.archive.path()
    }

    pub fn dir_path(&self) -> Option<&Path> {
        self.dir.as_ref().map(TempDir::path)
    }

    /// Copy the whole upload stream into the scratch archive, returning the byte count.
    pub async fn persist<R>(&mut self, mut reader: R) -> Result<u64, ScratchError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let std_file = self.archive.as_file().try_clone()?;
        let mut file = tokio::fs::File::from_std(std_file);
        let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
        let mut written = 0u64;

        loop {
            let n = reader
                .read(&mut buffer)
                .await
                .map_err(ScratchError::Upload)?;
            if n == 0 {
                break;
            }
            file.write_all(&buffer[..n]).await?;
            written += n as u64;
        }

        file.flush().await?;
        Ok(written)
    }

    /// Extract the scratch archive into a fresh scratch directory.
    ///
    /// The directory is owned by `self` before extraction begins, so partially
    /// extracted content is cleaned up as well.
    pub async fn extract(&mut self) -> Result<PathBuf, ScratchError> {
        let mut builder = Builder::new();
        builder.prefix(SCRATCH_PREFIX);
        let dir = match &self.parent {
            Some(parent) => builder.tempdir_in(parent)?,
            None => builder.tempdir()?,
        };
        let target = dir.path().to_path_buf();
        self.dir = Some(dir);

        let archive_path = self.archive.path().to_path_buf();
        let extract_to = target.clone();
        let entries = tokio::task::spawn_blocking(move || extract_zip(&archive_path, &extract_to))
            .await??;

        tracing::debug!("Extracted {} entries into {}", entries, target.display());
        Ok(target)
    }

    /// Absolute paths of every notebook under the scratch directory, in
    /// traversal order (sorted by file name per directory). Empty if nothing
    /// was extracted.
    pub async fn notebooks(&self) -> Result<Vec<PathBuf>, ScratchError> {
        let Some(root) = self.dir_path().map(Path::to_path_buf) else {
            return Ok(Vec::new());
        };

        let found = tokio::task::spawn_blocking(move || find_notebooks(&root)).await??;
        Ok(found)
    }

    /// Delete the scratch archive and directory now, logging anything that
    /// could not be removed.
    pub fn close(self) {
        let Self { archive, dir, .. } = self;

        let archive_path = archive.path().to_path_buf();
        if let Err(e) = archive.close() {
            tracing::warn!(
                "Failed to remove scratch archive {}: {}",
                archive_path.display(),
                e
            );
        }

        if let Some(dir) = dir {
            let dir_path = dir.path().to_path_buf();
            if let Err(e) = dir.close() {
                tracing::warn!(
                    "Failed to remove scratch directory {}: {}",
                    dir_path.display(),
                    e
                );
            }
        }
    }
}

fn extract_zip(archive_path: &Path, target: &Path) -> Result<usize, ScratchError> {
    let file = fs::File::open(archive_path)?;
    let mut archive = ZipArchive::new(BufReader::new(file)).map_err(classify_zip_error)?;
    let mut extracted = 0;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(classify_zip_error)?;

        let Some(relative) = sanitized_name(&entry.mangled_name()) else {
            tracing::debug!("Skipping entry with empty name '{}'", entry.name());
            continue;
        };
        let out_path = target.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&out_path)?;
            continue;
        }

        // Symlink entries land as regular files holding the link target
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = fs::File::create(&out_path)?;
        copy_entry(&mut entry, &mut out)?;
        extracted += 1;
    }

    Ok(extracted)
}

/// Keep only the plain components of an entry name, dropping root, prefix,
/// `.` and `..`, so every entry stays inside the extraction directory.
fn sanitized_name(name: &Path) -> Option<PathBuf> {
    let relative: PathBuf = name
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part),
            _ => None,
        })
        .collect();

    (!relative.as_os_str().is_empty()).then_some(relative)
}

/// Read failures come from corrupt entry data (bad CRC, truncated stream);
/// write failures are local I/O.
fn copy_entry(entry: &mut impl Read, out: &mut impl Write) -> Result<(), ScratchError> {
    let mut buffer = [0u8; 8 * 1024];
    loop {
        let n = entry
            .read(&mut buffer)
            .map_err(|e| ScratchError::InvalidArchive(ZipError::Io(e)))?;
        if n == 0 {
            return Ok(());
        }
        out.write_all(&buffer[..n])?;
    }
}

/// Headers that point past the end of the file or decode to garbage surface
/// as `UnexpectedEof`/`InvalidData`; those mean a malformed archive.
fn classify_zip_error(err: ZipError) -> ScratchError {
    match err {
        ZipError::Io(e)
            if matches!(
                e.kind(),
                io::ErrorKind::UnexpectedEof | io::ErrorKind::InvalidData
            ) =>
        {
            ScratchError::InvalidArchive(ZipError::Io(e))
        }
        ZipError::Io(e) => ScratchError::Io(e),
        other => ScratchError::InvalidArchive(other),
    }
}

fn find_notebooks(root: &Path) -> Result<Vec<PathBuf>, ScratchError> {
    let root = fs::canonicalize(root)?;
    let mut notebooks = Vec::new();

    for entry in WalkDir::new(&root).sort_by_file_name() {
        let entry = entry.map_err(io::Error::from)?;
        if entry.file_type().is_file() && is_notebook_path(entry.path()) {
            notebooks.push(entry.into_path());
        }
    }

    Ok(notebooks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use zip::ZipWriter;
    use zip::write::FileOptions;

    fn build_zip(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        {
            let mut zip = ZipWriter::new(&mut buffer);
            let options = FileOptions::default();
            for (name, content) in entries {
                zip.start_file(*name, options).unwrap();
                zip.write_all(content.as_bytes()).unwrap();
            }
            zip.finish().unwrap();
        }
        buffer.into_inner()
    }

    fn residue(dir: &Path) -> Vec<PathBuf> {
        fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect()
    }

    #[tokio::test]
    async fn test_extract_and_find_notebooks() {
        let root = tempfile::tempdir().unwrap();
        let data = build_zip(&[
            ("z.ipynb", "{}"),
            ("a/b.ipynb", "{}"),
            ("a/readme.md", "hi"),
            ("c/UPPER.IPYNB", "{}"),
        ]);

        let mut scratch = ScratchSpace::create(Some(root.path())).unwrap();
        let written = scratch.persist(Cursor::new(data.clone())).await.unwrap();
        assert_eq!(written, data.len() as u64);

        scratch.extract().await.unwrap();
        let notebooks = scratch.notebooks().await.unwrap();

        let names: Vec<String> = notebooks
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["b.ipynb", "z.ipynb"]);
        assert!(notebooks.iter().all(|p| p.is_absolute()));

        scratch.close();
        assert!(residue(root.path()).is_empty());
    }

    #[tokio::test]
    async fn test_invalid_archive_is_classified() {
        let root = tempfile::tempdir().unwrap();
        let mut scratch = ScratchSpace::create(Some(root.path())).unwrap();
        scratch
            .persist(Cursor::new(b"this is not a zip".to_vec()))
            .await
            .unwrap();

        let err = scratch.extract().await.unwrap_err();
        assert!(matches!(err, ScratchError::InvalidArchive(_)));
        assert!(scratch.dir_path().is_some());

        scratch.close();
        assert!(residue(root.path()).is_empty());
    }

    #[tokio::test]
    async fn test_drop_removes_everything() {
        let root = tempfile::tempdir().unwrap();
        {
            let mut scratch = ScratchSpace::create(Some(root.path())).unwrap();
            scratch
                .persist(Cursor::new(build_zip(&[("deep/er/x.ipynb", "{}")])))
                .await
                .unwrap();
            scratch.extract().await.unwrap();
            assert_eq!(residue(root.path()).len(), 2);
        }
        assert!(residue(root.path()).is_empty());
    }

    #[tokio::test]
    async fn test_escaping_entry_names_stay_inside_scratch_dir() {
        let root = tempfile::tempdir().unwrap();
        let inner = root.path().join("inner");
        fs::create_dir(&inner).unwrap();

        let mut scratch = ScratchSpace::create(Some(&inner)).unwrap();
        scratch
            .persist(Cursor::new(build_zip(&[
                ("../escaped.ipynb", "{}"),
                ("/abs/rooted.ipynb", "{}"),
                ("./a/../b/ok.ipynb", "{}"),
            ])))
            .await
            .unwrap();

        let dir = scratch.extract().await.unwrap();
        assert!(dir.join("escaped.ipynb").is_file());
        assert!(dir.join("abs/rooted.ipynb").is_file());
        assert!(dir.join("a/b/ok.ipynb").is_file());
        assert!(!root.path().join("escaped.ipynb").exists());

        let names: Vec<String> = scratch
            .notebooks()
            .await
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["ok.ipynb", "rooted.ipynb", "escaped.ipynb"]);
        scratch.close();
    }

    #[test]
    fn test_sanitized_name() {
        assert_eq!(
            sanitized_name(Path::new("../../x/y.ipynb")),
            Some(PathBuf::from("x/y.ipynb"))
        );
        assert_eq!(
            sanitized_name(Path::new("/etc/z.ipynb")),
            Some(PathBuf::from("etc/z.ipynb"))
        );
        assert_eq!(sanitized_name(Path::new("..")), None);
        assert_eq!(sanitized_name(Path::new("")), None);
    }

    #[tokio::test]
    async fn test_symlink_entries_become_regular_files() {
        let root = tempfile::tempdir().unwrap();
        let mut buffer = Cursor::new(Vec::new());
        {
            let mut zip = ZipWriter::new(&mut buffer);
            zip.add_symlink("link.ipynb", "/etc/passwd", FileOptions::default())
                .unwrap();
            zip.start_file("real.ipynb", FileOptions::default()).unwrap();
            zip.write_all(b"{}").unwrap();
            zip.finish().unwrap();
        }

        let mut scratch = ScratchSpace::create(Some(root.path())).unwrap();
        scratch.persist(Cursor::new(buffer.into_inner())).await.unwrap();
        let dir = scratch.extract().await.unwrap();

        let link = dir.join("link.ipynb");
        assert!(!fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert_eq!(fs::read_to_string(&link).unwrap(), "/etc/passwd");

        let notebooks = scratch.notebooks().await.unwrap();
        assert_eq!(notebooks.len(), 2);
        scratch.close();
    }

    #[tokio::test]
    async fn test_truncated_central_directory_is_invalid() {
        let root = tempfile::tempdir().unwrap();
        let mut scratch = ScratchSpace::create(Some(root.path())).unwrap();
        scratch
            .persist(Cursor::new(with_oversized_central_name(build_zip(&[(
                "a.ipynb", "{}",
            )]))))
            .await
            .unwrap();

        let err = scratch.extract().await.unwrap_err();
        assert!(matches!(err, ScratchError::InvalidArchive(_)));
        scratch.close();
        assert!(residue(root.path()).is_empty());
    }

    #[test]
    fn test_classify_zip_error() {
        let eof = ZipError::Io(io::Error::from(io::ErrorKind::UnexpectedEof));
        assert!(matches!(classify_zip_error(eof), ScratchError::InvalidArchive(_)));

        let denied = ZipError::Io(io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(matches!(classify_zip_error(denied), ScratchError::Io(_)));

        let bad = ZipError::InvalidArchive("bad");
        assert!(matches!(classify_zip_error(bad), ScratchError::InvalidArchive(_)));
    }

    /// Set the file name length of the first central directory header to
    /// 0xFFFF so the header runs past the end of the archive.
    fn with_oversized_central_name(mut data: Vec<u8>) -> Vec<u8> {
        let at = data
            .windows(4)
            .position(|w| w == b"PK\x01\x02")
            .unwrap();
        data[at + 28] = 0xFF;
        data[at + 29] = 0xFF;
        data
    }

    #[tokio::test]
    async fn test_notebooks_without_extraction_is_empty() {
        let root = tempfile::tempdir().unwrap();
        let scratch = ScratchSpace::create(Some(root.path())).unwrap();
        assert!(scratch.dir_path().is_none());
        assert!(scratch.notebooks().await.unwrap().is_empty());
        assert!(scratch.archive_path().to_string_lossy().ends_with(".zip"));
        scratch.close();
        assert!(residue(root.path()).is_empty());
    }
}
