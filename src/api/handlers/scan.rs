use crate::AppState;
use crate::api::error::{AppError, INVALID_FILE_TYPE, MISSING_FILE_FIELD};
use crate::models::ScanResponse;
use crate::utils::validation::has_zip_extension;
use axum::{
    Json,
    extract::{Multipart, State},
};
use futures::TryStreamExt;
use tokio_util::io::StreamReader;
use utoipa::ToSchema;

/// Multipart form accepted by `/scan-zip/`.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct ScanUpload {
    /// ZIP archive containing `.ipynb` files
    #[schema(value_type = String, format = Binary)]
    file: Vec<u8>,
}

#[utoipa::path(
    post,
    path = "/scan-zip/",
    request_body(content = ScanUpload, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Every notebook in the archive was scanned", body = ScanResponse),
        (status = 400, description = "Not a .zip upload, or not a valid ZIP file", body = ErrorResponse),
        (status = 413, description = "Upload exceeds the configured limit", body = ErrorResponse),
        (status = 422, description = "No file field in the form", body = ErrorResponse),
        (status = 500, description = "Unexpected failure while extracting", body = ErrorResponse)
    ),
    tag = "scan"
)]
pub async fn scan_zip(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ScanResponse>, AppError> {
    let result: Result<Json<ScanResponse>, AppError> = async {
        while let Some(field) = multipart.next_field().await? {
            if field.name() != Some("file") {
                continue;
            }

            let filename = field.file_name().unwrap_or_default().to_string();
            if !has_zip_extension(&filename) {
                tracing::warn!("Rejected upload '{}': not a .zip file", filename);
                return Err(AppError::BadRequest(INVALID_FILE_TYPE.to_string()));
            }

            let reader = StreamReader::new(field.map_err(std::io::Error::other));
            let results = state.scan_service.scan_upload(reader).await?;

            let failed = results.iter().filter(|r| !r.is_success()).count();
            tracing::info!(
                "✅ Scanned '{}': {} notebook(s), {} failed",
                filename,
                results.len(),
                failed
            );

            return Ok(Json(ScanResponse::completed(results)));
        }

        Err(AppError::Unprocessable(MISSING_FILE_FIELD.to_string()))
    }
    .await;

    match result {
        Ok(res) => Ok(res),
        Err(e) => {
            // Drain the rest of the body so the client sees our response instead of a reset
            while let Ok(Some(mut field)) = multipart.next_field().await {
                while let Ok(Some(_)) = field.chunk().await {}
            }
            Err(e)
        }
    }
}
