//! Generated-document repair.
//!
//! [`repair_document`] turns arbitrary generated text into a render-ready
//! document. It never fails: every step degrades to the best text available.
//!
//! Steps, in order:
//!
//! 1. Locate the document: text that starts with a doctype or `<html` is used
//!    as is, otherwise everything before the first occurrence is dropped. Text
//!    with neither is wrapped in a minimal document.
//! 2. Drop trailing text after the last `</html>` (prose, code fences).
//! 3. Close an unterminated document with `</body></html>` as needed.
//! 4. Inject a viewport meta tag as the first child of `<head>` when missing,
//!    creating the head if there is none.
//! 5. Open `<body>` after `</head>` when the document has no body.
//! 6. Strip `<script>` blocks.
//! 7. Re-serialize through a tolerant HTML parser and check the viewport again.
//!
//! ```rust
//! use replica_core::repair::repair_document;
//!
//! let outcome = repair_document("Sorry, here is the page: hello");
//! let html = outcome.document.as_str();
//! assert!(html.starts_with("<!DOCTYPE html>"));
//! assert!(html.contains(r#"name="viewport""#));
//! assert!(html.contains("hello"));
//! ```

use std::sync::LazyLock;

use regex::Regex;
use scraper::Html;

use crate::types::GeneratedDocument;

/// Baseline viewport directive injected into repaired documents.
pub const VIEWPORT_META: &str =
    r#"<meta name="viewport" content="width=device-width, initial-scale=1.0">"#;

// SAFETY: Patterns are compile-time constants verified by tests
#[allow(clippy::unwrap_used)]
static DOCUMENT_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<!doctype\s+html|<html[\s>]").unwrap());

#[allow(clippy::unwrap_used)]
static DOCTYPE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^\s*<!doctype").unwrap());

#[allow(clippy::unwrap_used)]
static HTML_OPEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<html(\s[^>]*)?>").unwrap());

#[allow(clippy::unwrap_used)]
static HTML_CLOSE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)</html\s*>").unwrap());

#[allow(clippy::unwrap_used)]
static HEAD_OPEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<head(\s[^>]*)?>").unwrap());

#[allow(clippy::unwrap_used)]
static HEAD_CLOSE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)</head\s*>").unwrap());

#[allow(clippy::unwrap_used)]
static BODY_OPEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<body[\s>]").unwrap());

#[allow(clippy::unwrap_used)]
static BODY_CLOSE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)</body\s*>").unwrap());

#[allow(clippy::unwrap_used)]
static VIEWPORT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<meta[^>]*viewport").unwrap());

#[allow(clippy::unwrap_used)]
static SCRIPT_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").unwrap());

#[allow(clippy::unwrap_used)]
static SCRIPT_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</?script\b[^>]*>").unwrap());

/// Result of [`repair_document`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairOutcome {
    /// The repaired document.
    pub document: GeneratedDocument,
    /// Whether the tolerant re-serialization produced the document. When
    /// false, the pre-parse text was returned.
    pub reparsed: bool,
}

/// Repair generated text into a well-formed document.
#[must_use]
pub fn repair_document(raw: &str) -> RepairOutcome {
    let candidate = locate_document(raw);
    let candidate = drop_trailing_text(candidate);
    let candidate = close_document(candidate);
    let candidate = inject_viewport(candidate);
    let candidate = open_body(candidate);
    let candidate = strip_scripts(&candidate);

    match reserialize(&candidate) {
        Some(document) => RepairOutcome {
            document: GeneratedDocument::new(document),
            reparsed: true,
        },
        None => {
            tracing::warn!("re-serialization produced no root element, keeping repaired text");
            RepairOutcome {
                document: GeneratedDocument::new(inject_viewport(candidate)),
                reparsed: false,
            }
        }
    }
}

fn minimal_wrapper(text: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n{VIEWPORT_META}\n</head>\n<body>\n{text}\n</body>\n</html>"
    )
}

fn locate_document(raw: &str) -> String {
    let trimmed = raw.trim();
    match DOCUMENT_START.find(trimmed) {
        Some(found) => trimmed[found.start()..].to_string(),
        None => minimal_wrapper(raw),
    }
}

fn drop_trailing_text(mut html: String) -> String {
    if let Some(end) = HTML_CLOSE.find_iter(&html).last().map(|m| m.end()) {
        html.truncate(end);
    }
    html
}

fn close_document(mut html: String) -> String {
    if HTML_CLOSE.is_match(&html) {
        return html;
    }
    let body_open = BODY_OPEN.is_match(&html);
    if !body_open || !BODY_CLOSE.is_match(&html) {
        html.push_str("</body>");
    }
    html.push_str("</html>");
    html
}

fn inject_viewport(mut html: String) -> String {
    if VIEWPORT.is_match(&html) {
        return html;
    }
    if let Some(at) = HEAD_OPEN.find(&html).map(|m| m.end()) {
        html.insert_str(at, &format!("\n{VIEWPORT_META}"));
    } else if let Some(at) = HTML_OPEN.find(&html).map(|m| m.end()) {
        html.insert_str(at, &format!("\n<head>\n{VIEWPORT_META}\n</head>"));
    }
    html
}

fn open_body(mut html: String) -> String {
    if BODY_OPEN.is_match(&html) {
        return html;
    }
    let anchor = HEAD_CLOSE
        .find(&html)
        .or_else(|| HTML_OPEN.find(&html))
        .map(|m| m.end());
    if let Some(at) = anchor {
        html.insert_str(at, "\n<body>");
    }
    html
}

fn strip_scripts(html: &str) -> String {
    let without_blocks = SCRIPT_BLOCK.replace_all(html, "");
    SCRIPT_TAG.replace_all(&without_blocks, "").into_owned()
}

/// Parse tolerantly and serialize again, keeping the doctype.
///
/// The parser always synthesizes a `<head>`, so the viewport is checked again
/// on the serialized tree.
fn reserialize(html: &str) -> Option<String> {
    let serialized = Html::parse_document(html).html();
    if !serialized.to_ascii_lowercase().contains("<html") {
        return None;
    }
    let serialized = inject_viewport(strip_scripts(&serialized));
    if DOCTYPE.is_match(&serialized) {
        Some(serialized)
    } else {
        Some(format!("<!DOCTYPE html>{serialized}"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn count_tag(html: &str, pattern: &Regex) -> usize {
        pattern.find_iter(html).count()
    }

    fn assert_well_formed(html: &str) {
        let lower = html.to_ascii_lowercase();
        assert!(
            lower.starts_with("<!doctype html") || lower.starts_with("<html"),
            "bad start: {html}"
        );
        assert_eq!(count_tag(html, &HEAD_OPEN), 1, "head count in {html}");
        assert_eq!(count_tag(html, &BODY_OPEN), 1, "body count in {html}");
        assert!(VIEWPORT.is_match(html), "viewport missing in {html}");
        assert!(!lower.contains("<script"), "script left in {html}");
    }

    #[test]
    fn test_plain_text_is_wrapped() {
        // Given: generation returned prose without markup
        let outcome = repair_document("I could not render that page, sorry.");

        // Then: the text sits inside a full document with a viewport
        let html = outcome.document.as_str();
        assert!(outcome.reparsed);
        assert_well_formed(html);
        let body = &html[html.find("<body>").unwrap()..html.find("</body>").unwrap()];
        assert_eq!(body.trim_start_matches("<body>").trim(), "I could not render that page, sorry.");
    }

    #[test]
    fn test_leading_prose_and_code_fence_dropped() {
        let raw = "Here is the clone:\n```html\n<!DOCTYPE html><html><head><title>T</title></head><body><p>Hi</p></body></html>\n```\nLet me know!";

        let html = repair_document(raw).document.into_string();

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(!html.contains("```"));
        assert!(!html.contains("Let me know"));
        assert!(html.contains("<p>Hi</p>"));
        assert_well_formed(&html);
    }

    #[test]
    fn test_truncated_document_is_closed() {
        let candidate = close_document("<html><head></head><body><p>cut off".to_string());
        assert!(candidate.ends_with("</body></html>"));

        let candidate = close_document("<html><head></head><body></body>".to_string());
        assert!(candidate.ends_with("</body></html>"));
        assert_eq!(candidate.matches("</body>").count(), 1);
    }

    #[test]
    fn test_viewport_injected_as_first_head_child() {
        let candidate = inject_viewport(r#"<html><head lang="en"><title>x</title></head></html>"#.to_string());
        assert!(candidate.starts_with(&format!(r#"<html><head lang="en">{}{VIEWPORT_META}<title>"#, "\n")));

        // no head at all: one is created
        let candidate = inject_viewport("<html><body>x</body></html>".to_string());
        assert_eq!(
            candidate,
            format!("<html>\n<head>\n{VIEWPORT_META}\n</head><body>x</body></html>")
        );

        let existing = r#"<html><head><meta name="viewport" content="width=500"></head></html>"#;
        assert_eq!(inject_viewport(existing.to_string()), existing);
    }

    #[test]
    fn test_body_opened_after_head() {
        let candidate = open_body("<html><head></head><p>x</p></html>".to_string());
        assert_eq!(candidate, "<html><head></head>\n<body><p>x</p></html>");

        // header is not a head tag
        let candidate = open_body("<html><header>x</header></html>".to_string());
        assert_eq!(candidate, "<html>\n<body><header>x</header></html>");
    }

    #[test]
    fn test_scripts_removed() {
        let raw = r#"<!DOCTYPE html><html><head><script src="a.js"></script></head>
            <body><p>a</p><SCRIPT type="module">alert("x")</SCRIPT><p>b</p><script>unterminated</body></html>"#;

        let html = repair_document(raw).document.into_string();

        assert!(!html.to_ascii_lowercase().contains("<script"));
        assert!(!html.contains("alert"));
        assert!(html.contains("<p>a</p>"));
        assert!(html.contains("<p>b</p>"));
    }

    #[test]
    fn test_uppercase_root_found() {
        let html = repair_document("result: <HTML><BODY>Hello</BODY></HTML> done")
            .document
            .into_string();
        assert!(html.contains("Hello"));
        assert!(!html.contains("done"));
        assert_well_formed(&html);
    }

    #[test]
    fn test_fenced_document_without_head_gets_viewport() {
        let outcome = repair_document("```html\n<html><body><h1>Welcome</h1></body></html>\n```");

        let html = outcome.document.as_str();
        assert!(outcome.reparsed);
        assert!(html.contains("<h1>Welcome</h1>"));
        assert!(!html.contains("```"));
        assert_well_formed(html);
    }

    #[test]
    fn test_viewport_restored_after_reparse() {
        // no html tag before parsing, so the viewport arrives with the synthesized head
        let html = reserialize("<!DOCTYPE html><p>x</p>").unwrap();
        assert!(VIEWPORT.is_match(&html));
        assert_eq!(count_tag(&html, &HEAD_OPEN), 1);
    }

    fn fragment() -> impl Strategy<Value = &'static str> {
        prop::sample::select(vec![
            "<!DOCTYPE html>",
            "<html>",
            "</html>",
            "<head>",
            "</head>",
            "<body>",
            "</body>",
            "<title>t</title>",
            "<p>",
            "</p>",
            "text",
            " ",
            "\n",
            "```",
            "<script>x()</script>",
            r#"<meta name="viewport" content="width=1">"#,
        ])
    }

    proptest! {
        #[test]
        fn prop_repair_always_well_formed(parts in prop::collection::vec(fragment(), 0..40)) {
            let raw: String = parts.concat();
            let outcome = repair_document(&raw);
            let html = outcome.document.as_str();
            let lower = html.to_ascii_lowercase();

            prop_assert!(lower.starts_with("<!doctype html") || lower.starts_with("<html"));
            prop_assert_eq!(count_tag(html, &HEAD_OPEN), 1);
            prop_assert_eq!(count_tag(html, &BODY_OPEN), 1);
            prop_assert!(VIEWPORT.is_match(html));
            prop_assert!(!lower.contains("<script"));
        }

        #[test]
        fn prop_repair_never_panics(raw in "\\PC{0,300}") {
            let _ = repair_document(&raw);
        }
    }
}
