//! Stylesheet, script, meta and title inventory.

use scraper::Html;
use serde::{Deserialize, Serialize};
use url::Url;

use super::{attr, elements, raw_text, resolve_url, stylesheet_links, tag};

/// A stylesheet referenced or embedded by the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CssSource {
    /// A `<style>` block.
    Inline {
        /// Raw block text.
        content: String,
    },
    /// A `<link rel="stylesheet">`.
    External {
        /// Absolute `href`.
        url: String,
        /// `media` attribute, `all` when absent.
        media: String,
    },
}

impl CssSource {
    /// CSS text of an embedded stylesheet.
    #[must_use]
    pub fn content(&self) -> Option<&str> {
        match self {
            Self::Inline { content } => Some(content),
            Self::External { .. } => None,
        }
    }
}

/// A script embedded or referenced by the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JsSource {
    /// A `<script>` with a body.
    Inline {
        /// Script text.
        content: String,
    },
    /// A `<script src>`.
    External {
        /// Absolute `src`.
        url: String,
    },
}

/// Attributes of one `<meta>` element. Absent attributes are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaTag {
    /// `name` attribute.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// `property` attribute (Open Graph).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property: Option<String>,
    /// `content` attribute.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// `charset` attribute.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub charset: Option<String>,
    #[serde(
        rename = "http-equiv",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    /// `http-equiv` attribute.
    pub http_equiv: Option<String>,
}

impl MetaTag {
    fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.property.is_none()
            && self.content.is_none()
            && self.charset.is_none()
            && self.http_equiv.is_none()
    }
}

/// Inline `<style>` bodies, then `<link rel=stylesheet>` references.
pub fn extract_css(document: &Html, base_url: &Url) -> Vec<CssSource> {
    let mut sources: Vec<CssSource> = elements(document)
        .filter(|el| tag(*el) == "style")
        .map(raw_text)
        .filter(|content| !content.trim().is_empty())
        .map(|content| CssSource::Inline { content })
        .collect();

    sources.extend(stylesheet_links(document).filter_map(|link| {
        let url = resolve_url(base_url, link.value().attr("href")?)?;
        Some(CssSource::External {
            url,
            media: attr(link, "media").unwrap_or_else(|| "all".to_string()),
        })
    }));

    sources
}

/// Scripts in document order; external references win over inline bodies.
pub fn extract_js(document: &Html, base_url: &Url) -> Vec<JsSource> {
    elements(document)
        .filter(|el| tag(*el) == "script")
        .filter_map(|script| match script.value().attr("src") {
            Some(src) => resolve_url(base_url, src).map(|url| JsSource::External { url }),
            None => {
                let content = raw_text(script);
                (!content.trim().is_empty()).then_some(JsSource::Inline { content })
            }
        })
        .collect()
}

/// Every `<meta>` tag in document order.
pub fn extract_meta(document: &Html) -> Vec<MetaTag> {
    elements(document)
        .filter(|el| tag(*el) == "meta")
        .map(|meta| MetaTag {
            name: attr(meta, "name"),
            property: attr(meta, "property"),
            content: attr(meta, "content"),
            charset: attr(meta, "charset"),
            http_equiv: attr(meta, "http-equiv"),
        })
        .filter(|meta| !meta.is_empty())
        .collect()
}

/// Trimmed `<title>` text.
pub fn extract_title(document: &Html) -> String {
    elements(document)
        .find(|el| tag(*el) == "title")
        .map(|title| raw_text(title).trim().to_string())
        .unwrap_or_default()
}
