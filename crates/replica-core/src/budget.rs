//! Payload budgeting.
//!
//! Turns a fetched page and its [`PageAnalysis`] into a [`GenerationPayload`]
//! whose prompt fits [`BudgetConfig::max_prompt_chars`]. Every step is
//! deterministic: identical input yields an identical prompt.
//!
//! Rules, applied in order:
//!
//! 1. Each asset list keeps its first `max_assets_per_category` entries. The
//!    asset summary keeps the original totals.
//! 2. HTML longer than `html_threshold` keeps `html_head_chars` leading and
//!    `html_tail_chars` trailing characters around [`ELISION_MARKER`].
//! 3. CSS sources are capped to `max_css_sources`, scripts to `max_js_sources`.
//! 4. The prompt is composed; its combined CSS is capped at `max_css_chars`.
//! 5. A prompt still over budget loses its fingerprint section, then its HTML
//!    and CSS shrink, and finally it is cut at the budget.
//!
//! All lengths are counted in characters, never bytes.

use std::fmt::Write as _;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html};
use serde::{Deserialize, Serialize};

use crate::config::BudgetConfig;
use crate::extract::{CssSource, JsSource, PageAnalysis};
use crate::fingerprint::StructuralFingerprint;

/// Separator inserted where the middle of oversized text was removed.
pub const ELISION_MARKER: &str = "\n...\n";

// SAFETY: Patterns are compile-time constants verified by tests
#[allow(clippy::unwrap_used)]
static CLASS_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"class=["']([^"'>]+)["']"#).unwrap());

#[allow(clippy::unwrap_used)]
static ID_ATTR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"id=["']([^"'>]+)["']"#).unwrap());

#[allow(clippy::unwrap_used)]
static IMG_SRC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<img[^>]*?src=["']([^"'>]+)["']"#).unwrap());

#[allow(clippy::unwrap_used)]
static VIEWPORT_META: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<meta[^>]*?viewport[^>]*?>").unwrap());

const FINGERPRINT_OMITTED: &str = "(omitted to fit the payload budget)";

const INSTRUCTIONS: &str = "## OUTPUT REQUIREMENTS

1. Return ONE complete HTML document that starts with <!DOCTYPE html> and contains nothing else: no explanations, no markdown fences.
2. Put all styling in a single <style> element inside <head>. Do not reference external stylesheets other than font imports.
3. Do not include any <script> elements or inline event handlers.
4. Include a viewport meta tag and the original title.
5. Preserve ALL textual content of the original page verbatim: every heading, paragraph, list item, link text, label and footer line. Do not summarize, abbreviate or truncate.
6. Keep the original class names and ids so the structure stays recognizable.

## FIDELITY PRIORITIES

1. Typography: identical font families, sizes, weights, line heights and letter spacing.
2. Color: identical foreground, background and border colors.
3. Spacing: identical margins, paddings and gaps.
4. Responsive behavior: the same breakpoints and layout changes across screen sizes.
";

/// Size-bounded bundle handed to the generative service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationPayload {
    /// Page URL the prompt refers to.
    pub url: String,
    /// HTML after middle elision.
    pub html: String,
    /// At most the configured number of stylesheets.
    pub css: Vec<CssSource>,
    /// At most the configured number of scripts.
    pub js: Vec<JsSource>,
    /// Fingerprint with capped asset lists.
    pub fingerprint: StructuralFingerprint,
    /// Final prompt, never longer than the prompt budget.
    pub prompt: String,
}

/// Keep the first `head` and last `tail` characters of `text` when it is
/// longer than `threshold` characters.
///
/// ```rust
/// use replica_core::budget::elide_middle;
///
/// assert_eq!(elide_middle("abcdefghij", 6, 2, 3), "ab\n...\nhij");
/// assert_eq!(elide_middle("short", 6, 2, 3), "short");
/// ```
#[must_use]
pub fn elide_middle(text: &str, threshold: usize, head: usize, tail: usize) -> String {
    let total = text.chars().count();
    if total <= threshold {
        return text.to_string();
    }
    let head = head.min(total);
    let tail = tail.min(total - head);

    let mut out = String::with_capacity(text.len().min(head * 4 + tail * 4 + ELISION_MARKER.len()));
    out.push_str(char_prefix(text, head));
    out.push_str(ELISION_MARKER);
    out.push_str(char_suffix(text, tail));
    out
}

/// First `count` characters of `text`.
fn char_prefix(text: &str, count: usize) -> &str {
    text.char_indices()
        .nth(count)
        .map_or(text, |(idx, _)| &text[..idx])
}

/// Last `count` characters of `text`.
fn char_suffix(text: &str, count: usize) -> &str {
    if count == 0 {
        return "";
    }
    text.char_indices()
        .rev()
        .nth(count - 1)
        .map_or(text, |(idx, _)| &text[idx..])
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Unique values in first-seen order.
fn dedup_ordered<I>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen: Vec<String> = Vec::new();
    for value in values {
        if !value.is_empty() && !seen.contains(&value) {
            seen.push(value);
        }
    }
    seen
}

/// Prompt pieces that the hard budget may drop or shrink.
struct PromptSections {
    overview: String,
    fingerprint: String,
    images: String,
    html: String,
    css: String,
}

impl PromptSections {
    fn render(&self) -> String {
        let mut prompt = String::new();
        prompt.push_str(&self.overview);
        let _ = write!(
            prompt,
            "\n## FULL PAGE STRUCTURE (JSON)\n```json\n{}\n```\n",
            self.fingerprint
        );
        let _ = write!(
            prompt,
            "\n## IMAGE REFERENCES (keep dimensions and positions)\n{}\n",
            self.images
        );
        let _ = write!(
            prompt,
            "\n## ORIGINAL HTML (structural reference)\n```html\n{}\n```\n",
            self.html
        );
        let _ = write!(
            prompt,
            "\n## COMPILED CSS\n```css\n{}\n```\n\n",
            self.css
        );
        prompt.push_str(INSTRUCTIONS);
        prompt
    }
}

/// Build the generation payload for `url` within `config`.
#[must_use]
pub fn build_payload(
    url: &str,
    html: &str,
    analysis: &PageAnalysis,
    config: &BudgetConfig,
) -> GenerationPayload {
    let mut fingerprint = analysis.fingerprint.clone();
    fingerprint.assets.truncate(config.max_assets_per_category);

    let html = elide_middle(
        html,
        config.html_threshold,
        config.html_head_chars,
        config.html_tail_chars,
    );

    let css: Vec<CssSource> = analysis
        .css
        .iter()
        .take(config.max_css_sources)
        .cloned()
        .collect();
    let js: Vec<JsSource> = analysis
        .js
        .iter()
        .take(config.max_js_sources)
        .cloned()
        .collect();

    let mut sections = PromptSections {
        overview: overview(url, &html, &fingerprint),
        fingerprint: serde_json::to_string_pretty(&fingerprint).unwrap_or_default(),
        images: image_references(&html),
        html: html.clone(),
        css: char_prefix(&combined_css(&css), config.max_css_chars).to_string(),
    };
    let prompt = fit_prompt(&mut sections, config.max_prompt_chars);

    GenerationPayload {
        url: url.to_string(),
        html,
        css,
        js,
        fingerprint,
        prompt,
    }
}

/// Apply the hard prompt budget.
fn fit_prompt(sections: &mut PromptSections, max_chars: usize) -> String {
    let mut prompt = sections.render();
    if char_len(&prompt) <= max_chars {
        return prompt;
    }

    tracing::debug!(
        chars = char_len(&prompt),
        budget = max_chars,
        "prompt over budget, dropping fingerprint section"
    );
    sections.fingerprint = FINGERPRINT_OMITTED.to_string();
    prompt = sections.render();

    let overflow = char_len(&prompt).saturating_sub(max_chars);
    if overflow > 0 {
        let keep = char_len(&sections.html).saturating_sub(overflow + ELISION_MARKER.len());
        sections.html = elide_middle(&sections.html, keep, keep / 2, keep - keep / 2);
        prompt = sections.render();
    }

    let overflow = char_len(&prompt).saturating_sub(max_chars);
    if overflow > 0 {
        let keep = char_len(&sections.css).saturating_sub(overflow);
        sections.css = char_prefix(&sections.css, keep).to_string();
        prompt = sections.render();
    }

    if char_len(&prompt) > max_chars {
        prompt = char_prefix(&prompt, max_chars).to_string();
    }
    prompt
}

fn tier(colors: &[String], range: std::ops::Range<usize>, fallback: &str) -> String {
    if colors.len() > range.start {
        colors[range.start..range.end.min(colors.len())].join(", ")
    } else {
        fallback.to_string()
    }
}

fn font_role(fonts: &[String], index: usize) -> &str {
    fonts
        .get(index)
        .or_else(|| fonts.first())
        .map_or("Arial, sans-serif", String::as_str)
}

fn overview(url: &str, html: &str, fingerprint: &StructuralFingerprint) -> String {
    let design = &fingerprint.design;
    let yes_no = |flag: bool| if flag { "Yes" } else { "No" };

    let classes = dedup_ordered(CLASS_ATTR.captures_iter(html).flat_map(|c| {
        c[1].split_whitespace()
            .map(str::to_string)
            .collect::<Vec<_>>()
    }));
    let ids = dedup_ordered(ID_ATTR.captures_iter(html).map(|c| c[1].trim().to_string()));
    let viewport = VIEWPORT_META
        .find(html)
        .map_or("Not specified", |m| m.as_str());
    let structure = body_outline(html);

    let fonts = if design.fonts.is_empty() {
        "Arial, sans-serif".to_string()
    } else {
        design.fonts.join(", ")
    };

    let mut out = String::new();
    let _ = writeln!(
        out,
        "You are an expert at recreating web pages using only HTML and CSS. \
         Produce a clone that is visually indistinguishable from the original and \
         contains all of its textual content."
    );
    let _ = writeln!(out, "\nWEBSITE TO CLONE: {url}");
    let _ = writeln!(out, "\n## DESIGN SYSTEM ANALYSIS\n\n### COLOR SYSTEM");
    let _ = writeln!(
        out,
        "PRIMARY COLORS: {}",
        tier(&design.colors, 0..10, "#000000, #ffffff")
    );
    let _ = writeln!(
        out,
        "SECONDARY COLORS: {}",
        tier(&design.colors, 10..30, "#cccccc, #f0f0f0")
    );
    let _ = writeln!(
        out,
        "ACCENT COLORS: {}",
        tier(&design.colors, 30..50, "#3366cc, #ff9900")
    );
    let _ = writeln!(out, "\n### TYPOGRAPHY SYSTEM (match exactly)\nFONTS: {fonts}");
    let _ = writeln!(
        out,
        "1. PRIMARY FONT: {} (main content and body text)",
        font_role(&design.fonts, 0)
    );
    let _ = writeln!(
        out,
        "2. HEADING FONT: {} (headers and titles)",
        font_role(&design.fonts, 1)
    );
    let _ = writeln!(
        out,
        "3. ACCENT FONT: {} (special elements)",
        font_role(&design.fonts, 2)
    );
    let _ = writeln!(out, "\n### LAYOUT SYSTEM");
    let _ = writeln!(out, "GRID SYSTEM: {}", yes_no(design.layout.grid_detected));
    let _ = writeln!(out, "FLEXBOX USAGE: {}", yes_no(design.layout.flex_detected));
    let _ = writeln!(out, "CONTAINER COUNT: {}", design.layout.containers);
    let _ = writeln!(out, "\n### COMPONENT IDENTIFIERS");
    let _ = writeln!(
        out,
        "KEY CLASSES: {}",
        if classes.is_empty() {
            "No specific classes identified".to_string()
        } else {
            classes.join(", ")
        }
    );
    let _ = writeln!(
        out,
        "IMPORTANT IDs: {}",
        if ids.is_empty() {
            "No specific IDs identified".to_string()
        } else {
            ids.join(", ")
        }
    );
    let _ = writeln!(out, "VIEWPORT SETTINGS: {viewport}");
    let _ = writeln!(
        out,
        "\n## DOM STRUCTURE INSIGHTS\n{}",
        if structure.is_empty() {
            "Standard DOM hierarchy".to_string()
        } else {
            structure.join("\n")
        }
    );
    out
}

/// Top-level body children rendered as `tag` or `tag.firstclass`.
fn body_outline(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let Some(body) = document
        .root_element()
        .children()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "body")
    else {
        return Vec::new();
    };

    body.children()
        .filter_map(ElementRef::wrap)
        .map(|child| {
            let name = child.value().name();
            child
                .value()
                .attr("class")
                .and_then(|classes| classes.split_ascii_whitespace().next())
                .map_or_else(|| name.to_string(), |class| format!("{name}.{class}"))
        })
        .collect()
}

fn image_references(html: &str) -> String {
    let images = dedup_ordered(IMG_SRC.captures_iter(html).map(|c| c[1].to_string()));
    if images.is_empty() {
        "No specific images found".to_string()
    } else {
        serde_json::to_string_pretty(&images).unwrap_or_default()
    }
}

/// Embedded stylesheet bodies in document order.
fn combined_css(sources: &[CssSource]) -> String {
    let mut css = String::new();
    for content in sources.iter().filter_map(CssSource::content) {
        css.push_str(content);
        css.push_str("\n\n");
    }
    css
}
