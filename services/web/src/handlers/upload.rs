//! Multipart parsing for school submissions.

use std::path::Path;

use axum::extract::Multipart;
use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use schoolhub_domain::image::{ImageRejection, check_image_type};
use schoolhub_domain::school::SchoolFields;

use crate::error::WebServiceError;
use crate::infra::staging::{StagedImage, StagingWriter};

/// Form field carrying the school photo.
pub const IMAGE_FIELD: &str = "image";

/// Text fields plus the staged image, if one was sent.
#[derive(Debug, Default)]
pub struct Submission {
    pub fields: SchoolFields,
    pub image: Option<StagedImage>,
}

/// Read every part of the form. The image is type-checked from its file name and
/// declared content type before any byte is staged, and size-checked while streaming.
pub async fn read_submission(
    mut multipart: Multipart,
    staging_dir: &Path,
) -> Result<Submission, WebServiceError> {
    let mut submission = Submission::default();

    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_owned();

        if field.file_name().is_none() {
            let value = field.text().await.map_err(multipart_error)?;
            // Unknown text fields are ignored.
            submission.fields.set(&name, value);
            continue;
        }

        // A file input left blank arrives as a part with an empty file name.
        if field.file_name() == Some("") {
            while field.chunk().await.map_err(multipart_error)?.is_some() {}
            continue;
        }

        if name != IMAGE_FIELD {
            return Err(WebServiceError::Validation(format!(
                "Unexpected file field `{name}`"
            )));
        }
        if submission.image.is_some() {
            return Err(WebServiceError::Validation(
                "Only one school image may be uploaded".to_owned(),
            ));
        }

        let format = check_image_type(field.file_name().unwrap_or_default(), field.content_type())?;
        let mut writer = StagingWriter::create(staging_dir, format).await?;
        while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
            writer.write_chunk(&chunk).await?;
        }
        submission.image = writer.finish().await?;
    }

    Ok(submission)
}

fn multipart_error(err: MultipartError) -> WebServiceError {
    // The body limit surfaces here when an image is far over the size cap.
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return ImageRejection::TooLarge.into();
    }
    WebServiceError::Validation(err.body_text())
}
