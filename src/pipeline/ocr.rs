//! OCR session lifecycle.
//!
//! A [`RecognitionEngine`] turns a page image into text. The engine is
//! expensive to set up (model download, provider handshake), so one
//! [`OcrSession`] is started per job and reused for every page:
//!
//! ```text
//! Uninitialized ──start──▶ Ready ──recognize──▶ Recognizing ──▶ Ready ...
//!                            │
//!                            └──terminate──▶ Terminated
//! ```
//!
//! [`OcrSession::terminate`] consumes the session, so it cannot run twice.
//! Callers hold the session across the page loop and terminate it after the
//! loop returns, whatever the loop's result was. A session dropped while
//! still live logs a warning.

use super::recolor::PixelBuffer;
use crate::error::{PageError, PdfOpsError};
use std::future::Future;
use tracing::{debug, warn};

/// Something that can recognise text in a page image.
///
/// Calls arrive in order: one `start`, any number of `recognize`, one
/// `terminate`. The engine may be reused for a later job after `terminate`.
pub trait RecognitionEngine: Send {
    /// Prepare the engine for the given languages (ordered, non-empty).
    fn start(&mut self, languages: &[String])
        -> impl Future<Output = Result<(), PdfOpsError>> + Send;

    /// Recognise the text in one page image.
    fn recognize(
        &mut self,
        image: &PixelBuffer,
    ) -> impl Future<Output = Result<String, PdfOpsError>> + Send;

    /// Release everything acquired in `start`.
    fn terminate(&mut self) -> impl Future<Output = ()> + Send;
}

/// Where an [`OcrSession`] is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Ready,
    Recognizing,
    Terminated,
}

/// A started recognition session borrowing its engine for one job.
pub struct OcrSession<'a, E: RecognitionEngine> {
    engine: &'a mut E,
    languages: Vec<String>,
    state: SessionState,
    pages_recognised: usize,
}

impl<'a, E: RecognitionEngine> OcrSession<'a, E> {
    /// Start a session. On failure the engine is terminated before the error
    /// is returned, so no half-started engine survives.
    pub async fn start(engine: &'a mut E, languages: &[String]) -> Result<Self, PdfOpsError> {
        if languages.is_empty() {
            return Err(PdfOpsError::InvalidOptions(
                "OCR needs at least one language".into(),
            ));
        }

        let mut session = Self {
            engine,
            languages: languages.to_vec(),
            state: SessionState::Uninitialized,
            pages_recognised: 0,
        };

        if let Err(e) = session.engine.start(&session.languages).await {
            warn!("OCR engine failed to start: {}", e);
            session.engine.terminate().await;
            session.state = SessionState::Terminated;
            return Err(e);
        }

        session.state = SessionState::Ready;
        debug!("OCR session ready for [{}]", session.languages.join(", "));
        Ok(session)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn languages(&self) -> &[String] {
        &self.languages
    }

    /// Recognise one page. Engine failures come back as a [`PageError`] for
    /// that page; the session stays usable for the next one.
    pub async fn recognize(
        &mut self,
        page_num: usize,
        image: &PixelBuffer,
    ) -> Result<String, PageError> {
        if self.state != SessionState::Ready {
            return Err(PageError::RecognitionFailed {
                page: page_num,
                detail: format!("session is {:?}, not ready", self.state),
            });
        }

        self.state = SessionState::Recognizing;
        let result = self.engine.recognize(image).await;
        self.state = SessionState::Ready;
        self.pages_recognised += 1;

        result.map_err(|e| {
            warn!("Page {}: recognition failed: {}", page_num, e);
            PageError::RecognitionFailed {
                page: page_num,
                detail: e.to_string(),
            }
        })
    }

    /// Tear the session down. Consumes the session so it runs exactly once.
    pub async fn terminate(mut self) {
        self.engine.terminate().await;
        self.state = SessionState::Terminated;
        debug!(
            "OCR session terminated after {} page(s)",
            self.pages_recognised
        );
    }
}

impl<E: RecognitionEngine> Drop for OcrSession<'_, E> {
    fn drop(&mut self) {
        if matches!(self.state, SessionState::Ready | SessionState::Recognizing) {
            warn!("OCR session dropped without terminate (state {:?})", self.state);
        }
    }
}
