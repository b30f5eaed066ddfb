//! Page selection: resolve what the user asked for into 0-based page indices.
//!
//! Two policies exist because operations differ in what a bad entry means:
//!
//! * [`SelectionPolicy::Additive`]: the operation adds something to the
//!   selected pages (a tint, recolouring, OCR text). An out-of-range page
//!   number only narrows the operation, so it is dropped silently.
//! * [`SelectionPolicy::Extractive`]: the operation extracts pages into new
//!   outputs (split, form-field placement). Dropping an entry would silently
//!   lose caller intent, so every bad entry is a hard error.
//!
//! Range lists are validated range-by-range under both policies. Resolution
//! never sorts: indices come out in the order the caller gave them.

use crate::error::{PageRangeError, PdfOpsError};
use serde::{Deserialize, Serialize};

/// A 1-based, inclusive page range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRange {
    pub start: u32,
    pub end: u32,
}

impl PageRange {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// A range covering exactly one page.
    pub fn single(page: u32) -> Self {
        Self {
            start: page,
            end: page,
        }
    }

    /// Number of pages in the range (0 for an inverted range).
    pub fn len(&self) -> usize {
        if self.end < self.start {
            0
        } else {
            (self.end - self.start) as usize + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_single_page(&self) -> bool {
        self.start == self.end
    }

    /// Check the range against a document of `total_pages` pages.
    ///
    /// `position` is the 1-based position of this range in the caller's list.
    pub fn validate(&self, position: usize, total_pages: usize) -> Result<(), PageRangeError> {
        if self.start < 1 {
            return Err(PageRangeError::StartBelowOne {
                position,
                start: self.start,
            });
        }
        if self.end < self.start {
            return Err(PageRangeError::EndBeforeStart {
                position,
                start: self.start,
                end: self.end,
            });
        }
        if self.end as usize > total_pages {
            return Err(PageRangeError::EndBeyondDocument {
                position,
                end: self.end,
                total: total_pages,
            });
        }
        Ok(())
    }

    /// 0-based indices covered by the range, in ascending order.
    pub fn indices(&self) -> impl Iterator<Item = usize> {
        let start = self.start.max(1) as usize - 1;
        let end = self.end as usize;
        start..end.max(start)
    }
}

/// Whether bad page numbers narrow the operation or abort it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SelectionPolicy {
    /// Drop out-of-range page numbers silently.
    #[default]
    Additive,
    /// Reject out-of-range page numbers.
    Extractive,
}

/// Specifies which pages of a document an operation targets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSelection {
    /// Every page, in document order (default).
    #[default]
    All,
    /// Explicit 1-based page numbers, in the given order.
    Pages(Vec<u32>),
    /// Explicit 1-based inclusive ranges, in the given order.
    Ranges(Vec<PageRange>),
}

impl PageSelection {
    /// Resolve the selection to 0-based indices against `total_pages`.
    ///
    /// The result keeps input order and drops repeated pages (first
    /// occurrence wins). It may be empty; use [`Self::resolve_required`]
    /// when the operation needs at least one page.
    pub fn resolve(
        &self,
        total_pages: usize,
        policy: SelectionPolicy,
    ) -> Result<Vec<usize>, PageRangeError> {
        let mut seen = vec![false; total_pages];
        let mut indices = Vec::new();
        let mut push = |idx: usize, out: &mut Vec<usize>| {
            if !seen[idx] {
                seen[idx] = true;
                out.push(idx);
            }
        };

        match self {
            PageSelection::All => indices.extend(0..total_pages),
            PageSelection::Pages(pages) => {
                for (i, &page) in pages.iter().enumerate() {
                    if page >= 1 && page as usize <= total_pages {
                        push(page as usize - 1, &mut indices);
                    } else if policy == SelectionPolicy::Extractive {
                        return Err(PageRangeError::PageOutOfRange {
                            position: i + 1,
                            page,
                            total: total_pages,
                        });
                    }
                }
            }
            PageSelection::Ranges(ranges) => {
                for (i, range) in ranges.iter().enumerate() {
                    range.validate(i + 1, total_pages)?;
                    for idx in range.indices() {
                        push(idx, &mut indices);
                    }
                }
            }
        }

        Ok(indices)
    }

    /// Like [`Self::resolve`], but an empty result is a
    /// [`PdfOpsError::NoValidPages`] error.
    pub fn resolve_required(
        &self,
        total_pages: usize,
        policy: SelectionPolicy,
    ) -> Result<Vec<usize>, PdfOpsError> {
        let indices = self.resolve(total_pages, policy)?;
        if indices.is_empty() {
            return Err(PdfOpsError::NoValidPages { total: total_pages });
        }
        Ok(indices)
    }

    /// Parse a user-facing selection string: `all`, `3`, `1,4,7`, `2-5`, or
    /// `1-3,8,10-12`.
    ///
    /// A string made only of single numbers becomes [`PageSelection::Pages`];
    /// anything containing a `start-end` token becomes
    /// [`PageSelection::Ranges`]. Malformed tokens are skipped.
    pub fn parse(input: &str) -> PageSelection {
        let trimmed = input.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
            return PageSelection::All;
        }
        let ranges = super::naming::parse_page_ranges(trimmed);
        if ranges.iter().all(PageRange::is_single_page) {
            PageSelection::Pages(ranges.iter().map(|r| r.start).collect())
        } else {
            PageSelection::Ranges(ranges)
        }
    }
}

/// Validate every range against `total_pages`, in order, stopping at the first
/// violation.
pub fn validate_ranges(ranges: &[PageRange], total_pages: usize) -> Result<(), PageRangeError> {
    for (i, range) in ranges.iter().enumerate() {
        range.validate(i + 1, total_pages)?;
    }
    Ok(())
}
