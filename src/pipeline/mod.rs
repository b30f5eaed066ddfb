//! The shared transformation core plus the collaborator adapters.
//!
//! Core algorithms (no I/O, no collaborators):
//!
//! * [`pages`]: resolve a page selection into validated 0-based indices
//! * [`recolor`]: rewrite RGBA pixels by a brightness predicate
//! * [`layout`]: page size and placement rectangle for content
//! * [`naming`]: split output names and "every N pages" ranges
//! * [`ocr`]: recognition session lifecycle
//!
//! Collaborator adapters:
//!
//! * [`render`]: rasterise a page via pdfium; runs in `spawn_blocking`
//! * [`encode`]: PNG + base64 for the vision API request body
//! * [`llm`]: vision-model [`ocr::RecognitionEngine`] with retry/backoff
//! * [`postprocess`]: deterministic cleanup of recognised text
//! * [`input`]: input blobs and magic-byte type checks
//!
//! ## Data Flow (OCR)
//!
//! ```text
//! pages ──▶ render ──▶ ocr session ──▶ encode ──▶ llm ──▶ postprocess
//! (indices)  (pdfium)   (per page)      (base64)  (VLM)   (cleanup)
//! ```

pub mod encode;
pub mod input;
pub mod layout;
pub mod llm;
pub mod naming;
pub mod ocr;
pub mod pages;
pub mod postprocess;
pub mod recolor;
pub mod render;
