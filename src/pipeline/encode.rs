//! Image encoding: `PixelBuffer` → base64 PNG wrapped in `ImageData`.
//!
//! Vision APIs take images as base64 data embedded in the JSON request body.
//! PNG is lossless, so glyph edges reach the model exactly as rendered.

use super::recolor::PixelBuffer;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::{ImageFormat, RgbaImage};
use std::io::Cursor;
use tracing::debug;

/// PNG-encode a pixel buffer.
pub fn encode_png(buffer: &PixelBuffer) -> Result<Vec<u8>, image::ImageError> {
    let img = RgbaImage::from(buffer.clone());
    let mut png = Vec::new();
    img.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
    Ok(png)
}

/// Encode a rendered page as a base64 PNG ready for the vision API.
///
/// `detail: "high"` lets the provider tile the image at full resolution so
/// small print stays legible.
pub fn encode_page(buffer: &PixelBuffer) -> Result<ImageData, image::ImageError> {
    let png = encode_png(buffer)?;
    let b64 = STANDARD.encode(&png);
    debug!("Encoded page {}x{} → {} bytes base64", buffer.width(), buffer.height(), b64.len());

    Ok(ImageData::new(b64, "image/png").with_detail("high"))
}
