//! Output naming and split partitioning.
//!
//! Output names are a pure function of the input name and the range being
//! written, so re-running a split produces byte-identical file names and two
//! ranges of the same job never collide.

use super::pages::PageRange;
use crate::error::PdfOpsError;

/// Strip the last extension from a file name (`report.v2.pdf` → `report.v2`).
///
/// Directory components are dropped; names without an extension, and dot
/// files such as `.pdf`, are returned unchanged.
pub fn base_name(original: &str) -> &str {
    let file = original
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(original);
    match file.rfind('.') {
        Some(pos) if pos > 0 => &file[..pos],
        _ => file,
    }
}

/// File name for one split output.
///
/// `range_index` is 1-based. A single-range split omits the `_part{n}`
/// prefix:
///
/// | ranges | range | name |
/// |--------|-------|------|
/// | 1 | 2–2 | `report_page_2.pdf` |
/// | 1 | 1–3 | `report_pages_1-3.pdf` |
/// | 2 | 1–3 (2nd) | `report_part2_pages_1-3.pdf` |
pub fn split_output_name(
    original: &str,
    range: PageRange,
    range_index: usize,
    total_ranges: usize,
) -> String {
    let base = base_name(original);
    let pages = if range.is_single_page() {
        format!("page_{}", range.start)
    } else {
        format!("pages_{}-{}", range.start, range.end)
    };
    if total_ranges > 1 {
        format!("{base}_part{range_index}_{pages}.pdf")
    } else {
        format!("{base}_{pages}.pdf")
    }
}

/// File name for a whole-document output: `{base}_{suffix}.{extension}`.
pub fn derived_name(original: &str, suffix: &str, extension: &str) -> String {
    format!("{}_{}.{}", base_name(original), suffix, extension)
}

/// Consecutive, non-overlapping chunks of `n` pages covering `1..=total_pages`.
///
/// The last chunk may be shorter. `n == 0` is rejected.
pub fn ranges_every_n(total_pages: usize, n: usize) -> Result<Vec<PageRange>, PdfOpsError> {
    if n == 0 {
        return Err(PdfOpsError::InvalidOptions(
            "Pages per split must be at least 1".into(),
        ));
    }
    Ok((1..=total_pages)
        .step_by(n)
        .map(|start| {
            let end = start.saturating_add(n - 1).min(total_pages);
            PageRange::new(start as u32, end as u32)
        })
        .collect())
}

/// Parse comma-separated page tokens (`5`, `2-7`) into ranges.
///
/// Input order is preserved. Tokens that do not parse as integers are
/// skipped without aborting the rest. Bounds are not checked here; inverted
/// or out-of-range results are caught by [`PageRange::validate`].
pub fn parse_page_ranges(input: &str) -> Vec<PageRange> {
    input
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .filter_map(|token| match token.split_once('-') {
            Some((start, end)) => {
                let start = start.trim().parse::<u32>().ok()?;
                let end = end.trim().parse::<u32>().ok()?;
                Some(PageRange::new(start, end))
            }
            None => token.parse::<u32>().ok().map(PageRange::single),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_range_names() {
        assert_eq!(
            split_output_name("report.pdf", PageRange::new(2, 2), 1, 1),
            "report_page_2.pdf"
        );
        assert_eq!(
            split_output_name("report.pdf", PageRange::new(1, 3), 1, 1),
            "report_pages_1-3.pdf"
        );
    }

    #[test]
    fn multi_range_names_carry_part_index() {
        assert_eq!(
            split_output_name("report.pdf", PageRange::new(1, 3), 2, 2),
            "report_part2_pages_1-3.pdf"
        );
        assert_eq!(
            split_output_name("report.pdf", PageRange::new(7, 7), 3, 4),
            "report_part3_page_7.pdf"
        );
    }

    #[test]
    fn base_name_edge_cases() {
        assert_eq!(base_name("report.v2.pdf"), "report.v2");
        assert_eq!(base_name("README"), "README");
        assert_eq!(base_name("/tmp/in/scan.PDF"), "scan");
        assert_eq!(base_name(".pdf"), ".pdf");
        assert_eq!(derived_name("a.pdf", "ocr", "txt"), "a_ocr.txt");
    }

    #[test]
    fn every_n_chunks() {
        assert_eq!(
            ranges_every_n(10, 3).unwrap(),
            vec![
                PageRange::new(1, 3),
                PageRange::new(4, 6),
                PageRange::new(7, 9),
                PageRange::new(10, 10),
            ]
        );
        assert_eq!(ranges_every_n(4, 4).unwrap(), vec![PageRange::new(1, 4)]);
        assert_eq!(ranges_every_n(2, 5).unwrap(), vec![PageRange::new(1, 2)]);
        assert!(ranges_every_n(0, 3).unwrap().is_empty());
        assert!(ranges_every_n(5, 0).is_err());
    }

    #[test]
    fn every_n_larger_than_any_document() {
        assert_eq!(
            ranges_every_n(10, usize::MAX).unwrap(),
            vec![PageRange::new(1, 10)]
        );
        assert_eq!(
            ranges_every_n(1, usize::MAX - 1).unwrap(),
            vec![PageRange::new(1, 1)]
        );
    }

    #[test]
    fn parser_skips_malformed_tokens() {
        assert_eq!(
            parse_page_ranges("3, x, 1-2,,5-a, 9 - 10"),
            vec![
                PageRange::single(3),
                PageRange::new(1, 2),
                PageRange::new(9, 10),
            ]
        );
        assert!(parse_page_ranges("").is_empty());
    }

    #[test]
    fn parser_keeps_inverted_ranges_for_validation() {
        assert_eq!(parse_page_ranges("5-3"), vec![PageRange::new(5, 3)]);
    }
}
