use std::time::Duration;

use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;

/// Lifetime of download links handed to the browser.
pub const DOWNLOAD_LINK_TTL: Duration = Duration::from_secs(15 * 60);

pub fn export_key(user_id: Uuid, document_id: Uuid) -> String {
    format!("documents/{user_id}/{document_id}.html")
}

/// Uploads a rendered export and returns a presigned GET URL for it.
pub async fn upload_export(
    s3: &aws_sdk_s3::Client,
    bucket: &str,
    key: &str,
    html: String,
) -> Result<String, AppError> {
    s3.put_object()
        .bucket(bucket)
        .key(key)
        .body(ByteStream::from(html.into_bytes()))
        .content_type("text/html; charset=utf-8")
        .send()
        .await
        .map_err(|e| AppError::Storage(format!("S3 upload failed: {e}")))?;

    info!("Uploaded export to s3://{bucket}/{key}");

    let presigning = PresigningConfig::expires_in(DOWNLOAD_LINK_TTL)
        .map_err(|e| AppError::Storage(format!("Invalid presigning config: {e}")))?;

    let request = s3
        .get_object()
        .bucket(bucket)
        .key(key)
        .presigned(presigning)
        .await
        .map_err(|e| AppError::Storage(format!("Presigning failed: {e}")))?;

    Ok(request.uri().to_string())
}
