//! Client side: package notebooks into a ZIP and submit it to the scan service.

pub mod archiver;
pub mod uploader;

pub use archiver::collect_and_package;
pub use uploader::upload_archive;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to walk source directory: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Failed to write archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-200 status
    #[error("Error: {status} {body}")]
    Rejected { status: u16, body: String },
}
