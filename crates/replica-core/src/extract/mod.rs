//! Structural feature extraction.
//!
//! Every extractor is a pure function over a parsed [`scraper::Html`] tree and
//! the page's base URL. Extractors never fail: malformed or missing markup
//! degrades to empty values. Traversal is always document order, which makes
//! [`analyze_page`] deterministic for identical input.
//!
//! ```rust
//! use replica_core::config::ExtractionConfig;
//! use replica_core::extract::analyze_page;
//! use url::Url;
//!
//! let base = Url::parse("https://example.com/")?;
//! let html = r#"<html><head><style>h1 { color: #112233; }</style></head>
//!     <body><h1>Hi</h1></body></html>"#;
//!
//! let analysis = analyze_page(html, &base, &ExtractionConfig::default());
//! assert_eq!(analysis.fingerprint.design.colors, vec!["#112233"]);
//! # Ok::<(), url::ParseError>(())
//! ```

pub mod assets;
pub mod components;
pub mod design;
pub mod dom;
pub mod layout;
pub mod sources;

use scraper::{ElementRef, Html};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::config::ExtractionConfig;
use crate::fingerprint::StructuralFingerprint;
pub use sources::{CssSource, JsSource, MetaTag};

/// Everything learned from one fetched page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageAnalysis {
    /// `<title>` text, empty when absent.
    pub title: String,
    /// Inline style blocks first, then linked stylesheets.
    pub css: Vec<CssSource>,
    /// Scripts in document order.
    pub js: Vec<JsSource>,
    /// Every `<meta>` element.
    pub meta: Vec<MetaTag>,
    /// Structural fingerprint of the page.
    pub fingerprint: StructuralFingerprint,
}

/// Parse `html` once and run every extractor against it.
///
/// Blank input yields [`PageAnalysis::default`].
#[must_use]
pub fn analyze_page(html: &str, base_url: &Url, config: &ExtractionConfig) -> PageAnalysis {
    if html.trim().is_empty() {
        return PageAnalysis::default();
    }
    let document = Html::parse_document(html);
    analyze_document(&document, base_url, config)
}

/// Run every extractor against an already parsed tree.
#[must_use]
pub fn analyze_document(
    document: &Html,
    base_url: &Url,
    config: &ExtractionConfig,
) -> PageAnalysis {
    let fingerprint = StructuralFingerprint {
        design: design::extract_design(document, config),
        dom: dom::analyze_dom(document, config),
        components: components::identify_components(document),
        assets: assets::catalog_assets(document, base_url, config),
        layout: layout::compute_layout_metrics(document, config),
    };

    let analysis = PageAnalysis {
        title: sources::extract_title(document),
        css: sources::extract_css(document, base_url),
        js: sources::extract_js(document, base_url),
        meta: sources::extract_meta(document),
        fingerprint,
    };

    debug!(
        fonts = analysis.fingerprint.design.fonts.len(),
        colors = analysis.fingerprint.design.colors.len(),
        components = analysis.fingerprint.components.ui_components.len(),
        assets = analysis.fingerprint.assets.summary.total_all,
        breakpoints = analysis.fingerprint.layout.breakpoints.len(),
        "page analysis complete"
    );

    analysis
}

// ---------------------------------------------------------------------------
// Shared tree helpers
// ---------------------------------------------------------------------------

/// All elements in document order, the root `<html>` included.
pub(crate) fn elements(document: &Html) -> impl Iterator<Item = ElementRef<'_>> {
    document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
}

/// Elements below `element`, excluding itself.
pub(crate) fn descendants<'a>(element: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    element.descendants().skip(1).filter_map(ElementRef::wrap)
}

pub(crate) fn child_elements<'a>(element: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    element.children().filter_map(ElementRef::wrap)
}

pub(crate) fn parent_element<'a>(element: ElementRef<'a>) -> Option<ElementRef<'a>> {
    element.parent().and_then(ElementRef::wrap)
}

pub(crate) fn tag(element: ElementRef<'_>) -> &str {
    element.value().name()
}

pub(crate) fn class_tokens(element: ElementRef<'_>) -> Vec<String> {
    // `Element::classes` is sorted; keep source order instead
    let mut tokens: Vec<String> = Vec::new();
    for token in element
        .value()
        .attr("class")
        .unwrap_or_default()
        .split_ascii_whitespace()
    {
        if !tokens.iter().any(|seen| seen == token) {
            tokens.push(token.to_string());
        }
    }
    tokens
}

/// True when any class token contains one of `needles` as a substring.
pub(crate) fn class_contains_any(element: ElementRef<'_>, needles: &[&str]) -> bool {
    element
        .value()
        .classes()
        .any(|class| needles.iter().any(|needle| class.contains(needle)))
}

/// Non-empty `id` attribute.
pub(crate) fn element_id(element: ElementRef<'_>) -> Option<String> {
    element
        .value()
        .attr("id")
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

pub(crate) fn attr(element: ElementRef<'_>, name: &str) -> Option<String> {
    element.value().attr(name).map(str::to_string)
}

pub(crate) fn has_attr(element: ElementRef<'_>, name: &str) -> bool {
    element.value().attr(name).is_some()
}

/// Text pieces trimmed and concatenated.
pub(crate) fn stripped_text(element: ElementRef<'_>) -> String {
    element.text().map(str::trim).collect()
}

/// Character count of [`stripped_text`].
pub(crate) fn text_length(element: ElementRef<'_>) -> usize {
    element.text().map(|piece| piece.trim().chars().count()).sum()
}

/// Raw text of an element, e.g. a `<style>` body.
pub(crate) fn raw_text(element: ElementRef<'_>) -> String {
    element.text().collect()
}

/// Non-empty `<style>` bodies in document order.
pub(crate) fn style_bodies(document: &Html) -> Vec<String> {
    elements(document)
        .filter(|el| tag(*el) == "style")
        .map(raw_text)
        .filter(|body| !body.trim().is_empty())
        .collect()
}

/// Inline `style` attributes in document order.
pub(crate) fn inline_styles(document: &Html) -> Vec<String> {
    elements(document)
        .filter_map(|el| el.value().attr("style"))
        .filter(|style| !style.trim().is_empty())
        .map(str::to_string)
        .collect()
}

/// `<link>` elements whose `rel` includes `stylesheet`.
pub(crate) fn stylesheet_links(document: &Html) -> impl Iterator<Item = ElementRef<'_>> {
    elements(document).filter(|el| {
        tag(*el) == "link"
            && el.value().attr("rel").is_some_and(|rel| {
                rel.split_ascii_whitespace()
                    .any(|token| token.eq_ignore_ascii_case("stylesheet"))
            })
    })
}

/// Resolve `raw` against `base`; `None` when empty or unresolvable.
pub(crate) fn resolve_url(base: &Url, raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    base.join(raw).ok().map(String::from)
}

/// Deterministic selector path, root first, excluding `<html>`.
///
/// Each element renders as `tag#id`, `tag.class1.class2` or `tag`.
pub(crate) fn selector_path(element: ElementRef<'_>) -> String {
    let mut segments: Vec<String> = element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .take_while(|ancestor| tag(*ancestor) != "html")
        .map(selector_segment)
        .collect();
    segments.reverse();
    segments.push(selector_segment(element));
    segments.join(" > ")
}

fn selector_segment(element: ElementRef<'_>) -> String {
    let name = tag(element);
    if let Some(id) = element_id(element) {
        return format!("{name}#{id}");
    }
    let classes = class_tokens(element);
    if classes.is_empty() {
        name.to_string()
    } else {
        format!("{name}.{}", classes.join("."))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use scraper::Selector;

    fn base() -> Url {
        Url::parse("https://example.com/blog/").unwrap()
    }

    #[test]
    fn test_selector_path_renders_id_before_classes() {
        let doc = Html::parse_document(
            r#"<html><body><div id="main" class="x"><ul class="nav primary"><li><a href="/">Home</a></li></ul></div></body></html>"#,
        );
        let anchor = doc.select(&Selector::parse("a").unwrap()).next().unwrap();

        assert_eq!(
            selector_path(anchor),
            "body > div#main > ul.nav.primary > li > a"
        );
    }

    #[test]
    fn test_class_tokens_keep_source_order() {
        let doc = Html::parse_document(
            r#"<html><body><header class="top  bar top sticky">x</header></body></html>"#,
        );
        let header = doc.select(&Selector::parse("header").unwrap()).next().unwrap();

        assert_eq!(class_tokens(header), vec!["top", "bar", "sticky"]);
        assert_eq!(selector_path(header), "body > header.top.bar.sticky");
    }

    #[test]
    fn test_resolve_url_relative_and_empty() {
        assert_eq!(
            resolve_url(&base(), "../img/a.png").as_deref(),
            Some("https://example.com/img/a.png")
        );
        assert_eq!(resolve_url(&base(), "   "), None);
        assert_eq!(
            resolve_url(&base(), "//cdn.test/x.js").as_deref(),
            Some("https://cdn.test/x.js")
        );
    }

    #[test]
    fn test_blank_input_is_default() {
        let analysis = analyze_page("  \n\t ", &base(), &ExtractionConfig::default());
        assert_eq!(analysis, PageAnalysis::default());
    }

    #[test]
    fn test_analysis_is_deterministic() {
        let html = r#"<!doctype html><html><head><title>Demo</title>
            <style>@font-face { font-family: 'Brand'; src: url('/f/brand.woff2'); }
            body { font-family: Inter, sans-serif; color: #333; margin: 8px; }
            @media (min-width: 768px) { .a { padding: 16px; } }
            @media (min-width: 780px) { .b { padding: 1rem; } }</style></head>
            <body><header><nav><ul><li><a href="/a">A</a></li><li><a href="/b">B</a></li>
            <li><a href="/c">C</a></li></ul></nav></header>
            <main class="content"><h1>Title</h1><p>Body text</p>
            <div class="card"><img src="hero.jpg" width="800" height="600"><h3>Card</h3></div>
            <a class="btn btn-primary" href="/go">Go</a></main></body></html>"#;

        let first = analyze_page(html, &base(), &ExtractionConfig::default());
        let second = analyze_page(html, &base(), &ExtractionConfig::default());

        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
        assert_eq!(first.title, "Demo");
        assert!(first.fingerprint.design.fonts.contains(&"Brand".to_string()));
        assert_eq!(first.fingerprint.layout.breakpoints, vec![774.0]);
    }

    #[test]
    fn test_helvetica_scenario() {
        // Given: two style blocks with the same declarations
        let html = r#"<html><head>
            <style>body { font-family: 'Helvetica Neue', sans-serif; color: #112233; }</style>
            <style>p { font-family: 'Helvetica Neue', sans-serif; color: #112233; }</style>
            </head><body><p>x</p></body></html>"#;

        // When: the page is analyzed
        let analysis = analyze_page(html, &base(), &ExtractionConfig::default());

        // Then: fonts and colors are deduplicated
        let design = &analysis.fingerprint.design;
        assert_eq!(design.fonts, vec!["Helvetica Neue", "sans-serif"]);
        assert_eq!(design.colors, vec!["#112233"]);
    }
}
