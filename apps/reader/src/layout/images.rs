//! Image assets and the half-size JPEG previews embedded in the flattened document.

use std::io::Cursor;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::ImageFormat;
use thiserror::Error;

pub const PREVIEW_JPEG_QUALITY: u8 = 85;

#[derive(Debug, Error)]
pub enum ImageAssetError {
    #[error("image payload is not a recognized format")]
    UnknownFormat,

    #[error("unsupported image format {0:?}")]
    Unsupported(ImageFormat),

    #[error("image processing failed: {0}")]
    Codec(#[from] image::ImageError),
}

/// An encoded image plus the media type sniffed from its magic bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageAsset {
    pub bytes: Bytes,
    pub content_type: &'static str,
    pub extension: &'static str,
}

impl ImageAsset {
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Result<Self, ImageAssetError> {
        let bytes = bytes.into();
        let format = image::guess_format(&bytes).map_err(|_| ImageAssetError::UnknownFormat)?;
        let (content_type, extension) = match format {
            ImageFormat::Jpeg => ("image/jpeg", "jpg"),
            ImageFormat::Png => ("image/png", "png"),
            ImageFormat::WebP => ("image/webp", "webp"),
            other => return Err(ImageAssetError::Unsupported(other)),
        };
        Ok(Self {
            bytes,
            content_type,
            extension,
        })
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }
}

/// Re-encodes `bytes` as a JPEG at half width and height (Lanczos3, quality 85).
/// CPU-bound: call from the blocking pool.
pub fn halve_image(bytes: &[u8]) -> Result<Vec<u8>, ImageAssetError> {
    let img = image::load_from_memory(bytes)?;
    let (w, h) = (img.width() / 2, img.height() / 2);
    let resized = img.resize_exact(w.max(1), h.max(1), FilterType::Lanczos3);

    let mut buf = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut buf, PREVIEW_JPEG_QUALITY);
    resized.to_rgb8().write_with_encoder(encoder)?;
    Ok(buf.into_inner())
}

pub fn data_uri(content_type: &str, bytes: &[u8]) -> String {
    format!("data:{content_type};base64,{}", BASE64.encode(bytes))
}
