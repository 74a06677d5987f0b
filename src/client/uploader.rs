use super::ClientError;
use crate::models::ScanResponse;
use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};
use std::path::Path;

pub const ZIP_CONTENT_TYPE: &str = "application/zip";

/// POST the archive at `archive_path` to `endpoint_url` as the `file` field of
/// a multipart form.
///
/// A 200 response is parsed as a [`ScanResponse`]. Any other status becomes
/// [`ClientError::Rejected`] with the raw body. Nothing is retried.
pub async fn upload_archive(
    archive_path: &Path,
    endpoint_url: &str,
) -> Result<ScanResponse, ClientError> {
    let data = tokio::fs::read(archive_path).await?;
    let file_name = archive_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let part = Part::bytes(data)
        .file_name(file_name)
        .mime_str(ZIP_CONTENT_TYPE)?;
    let form = Form::new().part("file", part);

    let response = reqwest::Client::new()
        .post(endpoint_url)
        .multipart(form)
        .send()
        .await?;

    let status = response.status();
    if status == StatusCode::OK {
        Ok(response.json::<ScanResponse>().await?)
    } else {
        let body = response.text().await?;
        Err(ClientError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}
