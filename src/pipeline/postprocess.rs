//! Cleanup applied to each page of recognised text before assembly.
//!
//! Only layout noise is touched: a fence wrapped around the whole answer,
//! carriage returns, trailing blanks, long runs of empty lines and
//! zero-width characters. Words are never rewritten.

use once_cell::sync::Lazy;
use regex::Regex;

/// Longest run of empty lines kept between two paragraphs.
const MAX_EMPTY_RUN: usize = 2;

/// Characters that render as nothing but break search and copy/paste.
const INVISIBLE: [char; 6] = [
    '\u{200B}', '\u{200C}', '\u{200D}', '\u{2060}', '\u{FEFF}', '\u{00AD}',
];

static WHOLE_ANSWER_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^```[a-zA-Z]*\r?\n(.*)\r?\n```\s*$").expect("fence pattern compiles")
});

/// Clean one page of recognised text.
///
/// The result is empty for blank input and otherwise ends in exactly one
/// newline.
pub fn clean_text(raw: &str) -> String {
    let unix = unwrap_fence(raw).replace("\r\n", "\n").replace('\r', "\n");

    let mut kept: Vec<&str> = Vec::new();
    let mut empty_run = 0;
    for line in unix.lines().map(str::trim_end) {
        if line.is_empty() {
            empty_run += 1;
            if empty_run > MAX_EMPTY_RUN {
                continue;
            }
        } else {
            empty_run = 0;
        }
        kept.push(line);
    }

    let visible: String = kept
        .join("\n")
        .chars()
        .filter(|c| !INVISIBLE.contains(c))
        .collect();
    match visible.trim_end() {
        "" => String::new(),
        body => format!("{body}\n"),
    }
}

/// The fenced body when the whole answer is one code block, else `raw`.
fn unwrap_fence(raw: &str) -> &str {
    WHOLE_ANSWER_FENCE
        .captures(raw.trim())
        .and_then(|caps| caps.get(1))
        .map_or(raw, |body| body.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fence_around_whole_answer_is_removed() {
        assert_eq!(unwrap_fence("```\nhello\n```"), "hello");
        assert_eq!(unwrap_fence("```text\nhello\nworld\n```\n"), "hello\nworld");
        assert_eq!(unwrap_fence("no fences"), "no fences");
        // A fence in the middle of the text is content.
        let inline = "see:\n```\ncode\n```\nafter";
        assert_eq!(unwrap_fence(inline), inline);
    }

    #[test]
    fn carriage_returns_become_newlines() {
        assert_eq!(clean_text("a\r\nb\rc"), "a\nb\nc\n");
    }

    #[test]
    fn empty_runs_are_capped() {
        assert_eq!(clean_text("a\n\n\n\n\n\nb"), "a\n\n\nb\n");
        assert_eq!(clean_text("a\n\nb"), "a\n\nb\n");
    }

    #[test]
    fn invisible_characters_are_dropped() {
        let input = "hello\u{200B}world\u{FEFF}foo\u{00AD}bar";
        assert_eq!(clean_text(input), "helloworldfoobar\n");
    }

    #[test]
    fn blank_page_stays_empty() {
        assert_eq!(clean_text("   \n\n "), "");
        assert_eq!(clean_text("\u{200B}\n"), "");
    }

    #[test]
    fn leading_indent_survives() {
        assert_eq!(clean_text("    indented\n"), "    indented\n");
    }

    #[test]
    fn fenced_crlf_answer() {
        let input = "```\nInvoice 42   \r\n\r\n\r\n\r\n\r\nTotal:\u{200B} 10\n```";
        assert_eq!(clean_text(input), "Invoice 42\n\n\nTotal: 10\n");
    }
}
