//! Input files: named byte blobs plus type sniffing.
//!
//! Every operation works on bytes in memory. The type checks look at magic
//! bytes only, never at file extensions, and run before any collaborator
//! sees the data.

use crate::error::PdfOpsError;
use image::ImageFormat;
use std::path::Path;
use tracing::debug;

/// How far into the file the `%PDF` header may appear.
const PDF_HEADER_WINDOW: usize = 1024;

/// One input document or image.
#[derive(Debug, Clone)]
pub struct InputFile {
    /// File name used to derive output names. Directories are ignored.
    pub name: String,
    pub bytes: Vec<u8>,
}

/// What an input file looks like on the inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Pdf,
    Png,
    Jpeg,
    Unknown,
}

impl InputFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk, mapping the common failures to typed errors.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, PdfOpsError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::PermissionDenied => PdfOpsError::PermissionDenied {
                path: path.to_path_buf(),
            },
            _ => PdfOpsError::FileNotFound {
                path: path.to_path_buf(),
            },
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        debug!("Read input '{}' ({} bytes)", name, bytes.len());
        Ok(Self { name, bytes })
    }

    pub fn kind(&self) -> InputKind {
        sniff(&self.bytes)
    }

    pub fn is_pdf(&self) -> bool {
        is_pdf(&self.bytes)
    }

    pub fn is_image(&self) -> bool {
        matches!(self.kind(), InputKind::Png | InputKind::Jpeg)
    }
}

/// `true` when `%PDF` appears within the first 1024 bytes.
///
/// Some producers write junk (or a BOM) before the header; readers accept
/// that, so the check does too.
pub fn is_pdf(bytes: &[u8]) -> bool {
    let window = &bytes[..bytes.len().min(PDF_HEADER_WINDOW)];
    window.windows(4).any(|w| w == b"%PDF")
}

/// Classify bytes by their magic number.
pub fn sniff(bytes: &[u8]) -> InputKind {
    if is_pdf(bytes) {
        return InputKind::Pdf;
    }
    match image::guess_format(bytes) {
        Ok(ImageFormat::Png) => InputKind::Png,
        Ok(ImageFormat::Jpeg) => InputKind::Jpeg,
        _ => InputKind::Unknown,
    }
}

/// Require exactly one PDF input.
pub fn require_single_pdf(inputs: &[InputFile]) -> Result<&InputFile, PdfOpsError> {
    match inputs {
        [] => Err(PdfOpsError::InvalidOptions("no input file given".into())),
        [one] if one.is_pdf() => Ok(one),
        [one] => Err(PdfOpsError::InvalidFileType {
            name: one.name.clone(),
            expected: "a PDF document".into(),
        }),
        many => Err(PdfOpsError::InvalidOptions(format!(
            "this operation takes one PDF, got {} files",
            many.len()
        ))),
    }
}

/// Require at least one input and every input to be PNG or JPEG.
pub fn require_images(inputs: &[InputFile]) -> Result<(), PdfOpsError> {
    if inputs.is_empty() {
        return Err(PdfOpsError::InvalidOptions("no image files given".into()));
    }
    if let Some(bad) = inputs.iter().find(|f| !f.is_image()) {
        return Err(PdfOpsError::InvalidFileType {
            name: bad.name.clone(),
            expected: "a PNG or JPEG image".into(),
        });
    }
    Ok(())
}
