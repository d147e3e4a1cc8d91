//! Image preparation module
//!
//! Gets a label photo under the model service's upload limit:
//! - Small files pass through untouched with a media type from the extension
//! - Large files are downscaled once and re-encoded as JPEG
//!
//! The downscale assumes encoded size tracks pixel area. That is only an
//! approximation, so a single pass can still land above the budget; the
//! result is returned anyway and a warning is logged. A re-encode that does
//! not shrink the file at all is discarded in favour of the original bytes.

use crate::error::{PipelineError, Result};
use crate::types::{MediaType, PreparedImage};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{info, warn};

/// Files at or below this size are sent as-is (5 MiB)
pub const MAX_IMAGE_BYTES: u64 = 5 * 1024 * 1024;
/// Byte budget aimed for when downscaling (4.5 MiB)
pub const TARGET_IMAGE_BYTES: u64 = 4_718_592;
/// JPEG quality used when re-encoding
pub const JPEG_QUALITY: u8 = 85;

/// Size limits for image preparation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrepareOptions {
    pub max_bytes: u64,
    pub target_bytes: u64,
    pub jpeg_quality: u8,
}

impl Default for PrepareOptions {
    fn default() -> Self {
        Self {
            max_bytes: MAX_IMAGE_BYTES,
            target_bytes: TARGET_IMAGE_BYTES,
            jpeg_quality: JPEG_QUALITY,
        }
    }
}

/// Load an image file and fit it under the configured byte budget
pub fn prepare_image(path: &Path, options: &PrepareOptions) -> Result<PreparedImage> {
    let not_found = || PipelineError::FileNotFound(path.to_path_buf());

    let metadata = fs::metadata(path).map_err(|_| not_found())?;
    if !metadata.is_file() {
        return Err(not_found());
    }

    let bytes = fs::read(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound | ErrorKind::PermissionDenied => not_found(),
        _ => PipelineError::Io(e),
    })?;
    let original_size = bytes.len() as u64;

    if original_size <= options.max_bytes {
        let media_type = MediaType::from_path(path);
        info!(
            "Using {} as-is ({} bytes, {})",
            path.display(),
            original_size,
            media_type
        );
        return Ok(PreparedImage {
            bytes,
            media_type,
            size_bytes: original_size,
            original_size_bytes: original_size,
            resized: false,
        });
    }

    info!(
        "{} is {} bytes, above the {} byte limit; downscaling",
        path.display(),
        original_size,
        options.max_bytes
    );
    let encoded = downscale_to_jpeg(&bytes, original_size, options)?;
    let size = encoded.len() as u64;

    if size >= original_size {
        warn!(
            "Re-encoded image is {} bytes, not smaller than the original {}; sending the original",
            size, original_size
        );
        return Ok(PreparedImage {
            bytes,
            media_type: MediaType::from_path(path),
            size_bytes: original_size,
            original_size_bytes: original_size,
            resized: false,
        });
    }

    if size > options.target_bytes {
        warn!(
            "Resized image is still {} bytes (target {}); sending it anyway",
            size, options.target_bytes
        );
    }

    Ok(PreparedImage {
        bytes: encoded,
        media_type: MediaType::Jpeg,
        size_bytes: size,
        original_size_bytes: original_size,
        resized: true,
    })
}

/// Width after scaling by `sqrt(target / current)`, never larger than `width`
pub fn scaled_width(width: u32, current_bytes: u64, target_bytes: u64) -> u32 {
    if width == 0 || current_bytes <= target_bytes {
        return width;
    }

    let scale = (target_bytes as f64 / current_bytes as f64).sqrt();
    ((width as f64 * scale).floor() as u32).clamp(1, width)
}

/// Decode, shrink proportionally and re-encode as JPEG
fn downscale_to_jpeg(
    bytes: &[u8],
    current_bytes: u64,
    options: &PrepareOptions,
) -> Result<Vec<u8>> {
    let img = image::load_from_memory(bytes)?;
    let (width, height) = (img.width(), img.height());

    let new_width = scaled_width(width, current_bytes, options.target_bytes);
    let resized = if new_width < width {
        let new_height = ((height as u64 * new_width as u64) / width as u64).max(1) as u32;
        info!("Resizing {}x{} -> {}x{}", width, height, new_width, new_height);
        img.resize_exact(new_width, new_height, FilterType::Lanczos3)
    } else {
        img
    };

    let mut encoded = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut encoded, options.jpeg_quality);
    resized.to_rgb8().write_with_encoder(encoder)?;

    Ok(encoded)
}
