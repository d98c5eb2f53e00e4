//! Image upload rules: allowed formats and size ceiling.

use std::path::Path;

/// Largest accepted image, in bytes (5 MiB).
pub const MAX_IMAGE_BYTES: u64 = 5 * 1024 * 1024;

/// Image formats accepted for school pictures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
}

impl ImageFormat {
    /// Map a file extension (case-insensitive, without the dot).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "gif" => Some(Self::Gif),
            _ => None,
        }
    }

    /// Map a declared `Content-Type`; parameters such as `; charset=` are ignored.
    pub fn from_mime(content_type: &str) -> Option<Self> {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            "image/gif" => Some(Self::Gif),
            _ => None,
        }
    }

    /// Canonical extension used for stored files.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Gif => "gif",
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Gif => "image/gif",
        }
    }
}

/// Why an uploaded file was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImageRejection {
    #[error("Only image files are allowed!")]
    UnsupportedType,
    #[error("Image must be 5 MB or smaller")]
    TooLarge,
}

/// Check the file name and declared MIME type of an upload.
///
/// Both must name an allowed format and they must agree, so a renamed
/// `report.pdf -> report.png` sent as `application/pdf` is refused.
pub fn check_image_type(
    file_name: &str,
    content_type: Option<&str>,
) -> Result<ImageFormat, ImageRejection> {
    let by_extension = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(ImageFormat::from_extension)
        .ok_or(ImageRejection::UnsupportedType)?;
    let by_mime = content_type
        .and_then(ImageFormat::from_mime)
        .ok_or(ImageRejection::UnsupportedType)?;
    if by_extension != by_mime {
        return Err(ImageRejection::UnsupportedType);
    }
    Ok(by_extension)
}

/// Check a byte count against [`MAX_IMAGE_BYTES`].
pub fn check_image_size(len: u64) -> Result<(), ImageRejection> {
    if len > MAX_IMAGE_BYTES {
        Err(ImageRejection::TooLarge)
    } else {
        Ok(())
    }
}
