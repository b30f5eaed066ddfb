//! Pixel buffers and brightness-threshold recolouring.
//!
//! Each pixel is classified on its own: brightness is the mean of R, G and B,
//! compared strictly against a threshold. There is no neighbourhood filtering,
//! so anti-aliased glyph edges rendered at a low scale can come out jagged.
//! Render the page at a higher scale before recolouring and place the result
//! back at the original page size to keep edges clean.

use crate::error::PdfOpsError;
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Default brightness threshold.
pub const DEFAULT_THRESHOLD: u8 = 128;

/// A row-major RGBA8 pixel buffer (`width × height × 4` bytes).
///
/// A buffer is owned by the page that produced it: it is recoloured in place
/// and then moved into the document model for embedding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Wrap raw RGBA bytes, checking the length matches the dimensions.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self, PdfOpsError> {
        let expected = width as usize * height as usize * 4;
        if data.len() != expected {
            return Err(PdfOpsError::Internal(format!(
                "pixel buffer is {} bytes, expected {expected} for {width}x{height} RGBA",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// A buffer filled with one colour.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let data = rgba
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();
        Self {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// RGBA of the pixel at `(x, y)`, or `None` outside the buffer.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        Some([
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ])
    }

    /// RGB bytes with alpha composited over a white background.
    pub fn to_rgb_over_white(&self) -> Vec<u8> {
        let mut rgb = Vec::with_capacity(self.width as usize * self.height as usize * 3);
        for px in self.data.chunks_exact(4) {
            let alpha = px[3] as u32;
            for &channel in &px[..3] {
                let blended = (channel as u32 * alpha + 255 * (255 - alpha) + 127) / 255;
                rgb.push(blended as u8);
            }
        }
        rgb
    }
}

impl From<RgbaImage> for PixelBuffer {
    fn from(img: RgbaImage) -> Self {
        Self {
            width: img.width(),
            height: img.height(),
            data: img.into_raw(),
        }
    }
}

impl From<PixelBuffer> for RgbaImage {
    fn from(buf: PixelBuffer) -> Self {
        // Length is checked on construction, so this cannot fail.
        RgbaImage::from_raw(buf.width, buf.height, buf.data)
            .unwrap_or_else(|| RgbaImage::new(0, 0))
    }
}

/// An opaque RGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };
    pub const WHITE: Rgb = Rgb {
        r: 255,
        g: 255,
        b: 255,
    };

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Channels as 0.0–1.0 floats, as PDF colour operators expect.
    pub fn to_unit(self) -> [f32; 3] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
        ]
    }
}

impl FromStr for Rgb {
    type Err = PdfOpsError;

    /// Parse `#rrggbb`, `rrggbb` or `#rgb`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        let bad = || PdfOpsError::InvalidOptions(format!("Invalid colour '{s}': expected #rrggbb"));
        let channel = |h: &str| u8::from_str_radix(h, 16).map_err(|_| bad());
        if !hex.is_ascii() {
            return Err(bad());
        }
        match hex.len() {
            6 => Ok(Rgb::new(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            )),
            3 => {
                let expand = |h: &str| channel(h).map(|v| v * 17);
                Ok(Rgb::new(
                    expand(&hex[0..1])?,
                    expand(&hex[1..2])?,
                    expand(&hex[2..3])?,
                ))
            }
            _ => Err(bad()),
        }
    }
}

/// Which side of the threshold gets recoloured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecolorMode {
    /// Pixels darker than the threshold (text on a light page).
    #[default]
    Dark,
    /// Pixels lighter than the threshold (text on a dark page).
    Light,
}

impl RecolorMode {
    /// Brightness predicate, compared on the channel sum to stay exact.
    fn matches(self, channel_sum: u32, threshold: u8) -> bool {
        let scaled = threshold as u32 * 3;
        match self {
            RecolorMode::Dark => channel_sum < scaled,
            RecolorMode::Light => channel_sum > scaled,
        }
    }
}

/// Mean of R, G and B on the 0–255 scale.
pub fn brightness(r: u8, g: u8, b: u8) -> f32 {
    (r as u32 + g as u32 + b as u32) as f32 / 3.0
}

/// Rewrite every pixel matching `mode`/`threshold` to `target`, in place.
///
/// Alpha is never touched. Returns the number of pixels changed.
pub fn recolor(buffer: &mut PixelBuffer, mode: RecolorMode, threshold: u8, target: Rgb) -> usize {
    let mut changed = 0;
    for px in buffer.as_bytes_mut().chunks_exact_mut(4) {
        let sum = px[0] as u32 + px[1] as u32 + px[2] as u32;
        if mode.matches(sum, threshold) {
            px[0] = target.r;
            px[1] = target.g;
            px[2] = target.b;
            changed += 1;
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(pixels: &[[u8; 4]]) -> PixelBuffer {
        PixelBuffer::new(
            pixels.len() as u32,
            1,
            pixels.iter().flatten().copied().collect(),
        )
        .unwrap()
    }

    const RED: Rgb = Rgb::new(255, 0, 0);

    #[test]
    fn dark_mode_rewrites_only_darker_pixels() {
        let mut buf = buffer(&[[10, 10, 10, 200], [200, 200, 200, 255], [128, 128, 128, 7]]);
        let changed = recolor(&mut buf, RecolorMode::Dark, DEFAULT_THRESHOLD, RED);
        assert_eq!(changed, 1);
        assert_eq!(buf.pixel(0, 0), Some([255, 0, 0, 200]));
        assert_eq!(buf.pixel(1, 0), Some([200, 200, 200, 255]));
        // Exactly at the threshold is not "strictly less".
        assert_eq!(buf.pixel(2, 0), Some([128, 128, 128, 7]));
    }

    #[test]
    fn light_mode_rewrites_only_lighter_pixels() {
        let mut buf = buffer(&[[250, 250, 250, 0], [20, 20, 20, 255], [128, 128, 128, 255]]);
        let changed = recolor(&mut buf, RecolorMode::Light, DEFAULT_THRESHOLD, Rgb::BLACK);
        assert_eq!(changed, 1);
        assert_eq!(buf.pixel(0, 0), Some([0, 0, 0, 0]));
        assert_eq!(buf.pixel(1, 0), Some([20, 20, 20, 255]));
        assert_eq!(buf.pixel(2, 0), Some([128, 128, 128, 255]));
    }

    #[test]
    fn brightness_uses_exact_mean() {
        // Mean 127.67 is below 128 even though integer division of 383/3 is 127.
        let mut buf = buffer(&[[127, 128, 128, 255]]);
        assert_eq!(recolor(&mut buf, RecolorMode::Dark, 128, RED), 1);
        // Mean 128.33 is above 128.
        let mut buf = buffer(&[[129, 128, 128, 255]]);
        assert_eq!(recolor(&mut buf, RecolorMode::Light, 128, RED), 1);
        assert!((brightness(127, 128, 128) - 127.666).abs() < 0.01);
    }

    #[test]
    fn alpha_is_bitwise_unchanged() {
        let pixels: Vec<[u8; 4]> = (0..=255u8).map(|v| [v, v / 2, 255 - v, v]).collect();
        let mut buf = buffer(&pixels);
        recolor(&mut buf, RecolorMode::Dark, 200, RED);
        for (x, original) in pixels.iter().enumerate() {
            assert_eq!(buf.pixel(x as u32, 0).unwrap()[3], original[3]);
        }
    }

    #[test]
    fn non_matching_pixels_survive_repeated_passes() {
        let mut buf = buffer(&[[240, 240, 240, 255], [5, 5, 5, 255]]);
        recolor(&mut buf, RecolorMode::Dark, 100, Rgb::new(0, 0, 255));
        let once = buf.clone();
        recolor(&mut buf, RecolorMode::Dark, 100, Rgb::new(0, 0, 255));
        assert_eq!(buf, once);
        assert_eq!(buf.pixel(0, 0), Some([240, 240, 240, 255]));
    }

    #[test]
    fn threshold_extremes() {
        let mut buf = buffer(&[[0, 0, 0, 255], [255, 255, 255, 255]]);
        assert_eq!(recolor(&mut buf, RecolorMode::Dark, 0, RED), 0);
        assert_eq!(recolor(&mut buf, RecolorMode::Light, 255, RED), 0);
    }

    #[test]
    fn buffer_length_checked() {
        assert!(PixelBuffer::new(2, 2, vec![0; 15]).is_err());
        assert!(PixelBuffer::new(2, 2, vec![0; 16]).is_ok());
    }

    #[test]
    fn rgb_over_white_composites_alpha() {
        let buf = buffer(&[[0, 0, 0, 0], [0, 0, 0, 255], [100, 50, 0, 255]]);
        assert_eq!(
            buf.to_rgb_over_white(),
            vec![255, 255, 255, 0, 0, 0, 100, 50, 0]
        );
    }

    #[test]
    fn parse_colours() {
        assert_eq!("#ff8000".parse::<Rgb>().unwrap(), Rgb::new(255, 128, 0));
        assert_eq!("0a0B0c".parse::<Rgb>().unwrap(), Rgb::new(10, 11, 12));
        assert_eq!("#fff".parse::<Rgb>().unwrap(), Rgb::WHITE);
        assert!("#12345".parse::<Rgb>().is_err());
        assert!("zzzzzz".parse::<Rgb>().is_err());
    }
}
