use image::{ImageFormat, RgbImage};

use crate::error::{MatchError, Result};

/// Formats the upload form accepts.
pub const ACCEPTED_FORMATS: [ImageFormat; 2] = [ImageFormat::Jpeg, ImageFormat::Png];

/// Sniffs the upload and returns its format if it is one we accept.
pub fn sniff_format(bytes: &[u8]) -> Result<ImageFormat> {
    if bytes.is_empty() {
        return Err(MatchError::invalid("empty upload"));
    }
    let format = image::guess_format(bytes)
        .map_err(|_| MatchError::invalid("upload is not an image; use JPEG or PNG"))?;
    if !ACCEPTED_FORMATS.contains(&format) {
        return Err(MatchError::invalid(format!(
            "unsupported image format {format:?}; use JPEG or PNG"
        )));
    }
    Ok(format)
}

/// Decodes a JPEG/PNG upload into an 8-bit RGB bitmap.
///
/// Non-images are `InvalidInput`; a recognised file that fails to decode is a
/// `ModelInference` failure since the captioner cannot process it.
pub fn decode_upload(bytes: &[u8]) -> Result<RgbImage> {
    let format = sniff_format(bytes)?;
    let img = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| MatchError::ModelInference(format!("corrupt {format:?} image: {e}")))?;
    tracing::debug!(
        width = img.width(),
        height = img.height(),
        ?format,
        "decoded upload"
    );
    Ok(img.to_rgb8())
}

/// MIME type for the preview `data:` URI.
pub fn mime_type(format: ImageFormat) -> &'static str {
    format.to_mime_type()
}
