//! Asset cataloging.
//!
//! Every stored URL is absolute. References that cannot be resolved against
//! the page URL are skipped rather than stored relative.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html};
use url::Url;

use super::design::HOSTED_FONT_HOST;
use super::{
    attr, class_contains_any, class_tokens, elements, has_attr, parent_element, resolve_url,
    selector_path, stripped_text, style_bodies, stylesheet_links, tag,
};
use crate::config::{ExtractionConfig, SizeThresholds};
use crate::fingerprint::{
    AssetCatalog, DocumentAsset, FontAsset, FontSource, ImageAsset, MediaAsset, SizeCategory,
    SvgAsset, SvgPurpose,
};

// SAFETY: Patterns are compile-time constants verified by tests
#[allow(clippy::unwrap_used)]
static FONT_FACE_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@font-face\s*\{([^}]*)\}").unwrap());

#[allow(clippy::unwrap_used)]
static CSS_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"url\(\s*['"]?([^'")]+)['"]?\s*\)"#).unwrap());

const ICON_HINTS: [&str; 4] = ["icon", "logo", "avatar", "symbol"];
const DOCUMENT_EXTENSIONS: [&str; 9] = [
    "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "zip", "rar",
];

/// Catalog images, icons, inline SVGs, media, fonts and linked documents.
pub fn catalog_assets(document: &Html, base_url: &Url, config: &ExtractionConfig) -> AssetCatalog {
    let (icons, images) = images(document, base_url, config);
    let mut catalog = AssetCatalog {
        images,
        icons,
        svgs: svgs(document),
        videos: media(document, base_url, "video"),
        audio: media(document, base_url, "audio"),
        fonts: fonts(document, base_url),
        other_media: documents(document, base_url),
        summary: Default::default(),
    };
    catalog.summary = catalog.tally();
    catalog
}

fn parse_dimension(raw: &str) -> Option<u64> {
    raw.trim().parse().ok()
}

/// Size bucket for declared dimensions.
///
/// A missing dimension counts as zero. A dimension that is not an integer
/// makes the category `unknown`.
#[must_use]
pub fn size_category(
    width: Option<&str>,
    height: Option<&str>,
    thresholds: &SizeThresholds,
) -> SizeCategory {
    let dimension = |raw: Option<&str>| match raw {
        None => Some(0),
        Some(raw) if raw.trim().is_empty() => Some(0),
        Some(raw) => parse_dimension(raw),
    };
    let (Some(w), Some(h)) = (dimension(width), dimension(height)) else {
        return SizeCategory::Unknown;
    };

    match w.saturating_mul(h) {
        0 => SizeCategory::Unknown,
        area if area <= thresholds.icon => SizeCategory::Icon,
        area if area <= thresholds.thumbnail => SizeCategory::Thumbnail,
        area if area <= thresholds.medium => SizeCategory::Medium,
        area if area <= thresholds.large => SizeCategory::Large,
        _ => SizeCategory::ExtraLarge,
    }
}

/// Explicit small dimensions win; class hints are only consulted otherwise.
fn is_icon(image: ElementRef<'_>, max_dimension: u32) -> bool {
    let width = image.value().attr("width").and_then(parse_dimension);
    let height = image.value().attr("height").and_then(parse_dimension);
    if let (Some(w), Some(h)) = (width, height) {
        if w <= u64::from(max_dimension) && h <= u64::from(max_dimension) {
            return true;
        }
    }
    class_contains_any(image, &ICON_HINTS)
}

/// Returns `(icons, images)`.
fn images(
    document: &Html,
    base_url: &Url,
    config: &ExtractionConfig,
) -> (Vec<ImageAsset>, Vec<ImageAsset>) {
    let mut icons = Vec::new();
    let mut images = Vec::new();

    for img in elements(document).filter(|el| tag(*el) == "img") {
        let Some(url) = img
            .value()
            .attr("src")
            .and_then(|src| resolve_url(base_url, src))
        else {
            continue;
        };

        let width = attr(img, "width");
        let height = attr(img, "height");
        let asset = ImageAsset {
            url,
            alt_text: attr(img, "alt").unwrap_or_default(),
            size_category: size_category(
                width.as_deref(),
                height.as_deref(),
                &config.size_thresholds,
            ),
            width,
            height,
            loading: attr(img, "loading").unwrap_or_else(|| "eager".to_string()),
            classes: class_tokens(img),
            element_path: selector_path(img),
        };

        if is_icon(img, config.icon_max_dimension) {
            icons.push(asset);
        } else {
            images.push(asset);
        }
    }

    (icons, images)
}

fn svgs(document: &Html) -> Vec<SvgAsset> {
    elements(document)
        .filter(|el| tag(*el) == "svg")
        .map(|svg| SvgAsset {
            code_length: svg.html().chars().count(),
            purpose: if class_contains_any(svg, &["icon", "logo", "symbol"]) {
                SvgPurpose::Icon
            } else if class_contains_any(svg, &["illustration", "diagram", "chart"]) {
                SvgPurpose::Illustration
            } else {
                SvgPurpose::Unknown
            },
            width: attr(svg, "width"),
            height: attr(svg, "height"),
            view_box: attr(svg, "viewBox").or_else(|| attr(svg, "viewbox")),
            classes: class_tokens(svg),
            element_path: selector_path(svg),
        })
        .collect()
}

/// `<video>`/`<audio>` elements and their `<source>` children.
///
/// Playback flags of a `<source>` come from its media element.
fn media(document: &Html, base_url: &Url, kind: &str) -> Vec<MediaAsset> {
    elements(document)
        .filter_map(|el| {
            let owner = match tag(el) {
                name if name == kind => el,
                "source" => parent_element(el).filter(|parent| tag(*parent) == kind)?,
                _ => return None,
            };
            let url = resolve_url(base_url, el.value().attr("src")?)?;
            Some(MediaAsset {
                url,
                mime_type: attr(el, "type").unwrap_or_default(),
                controls: has_attr(owner, "controls"),
                autoplay: has_attr(owner, "autoplay"),
                muted: has_attr(owner, "muted"),
                looped: has_attr(owner, "loop"),
                element_path: selector_path(el),
            })
        })
        .collect()
}

/// Lowercase extension of the path part of `reference`.
fn extension_of(reference: &str) -> Option<String> {
    let path = reference.split(['?', '#']).next().unwrap_or(reference);
    let file = path.rsplit('/').next().unwrap_or(path);
    file.rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .filter(|ext| !ext.is_empty())
}

fn fonts(document: &Html, base_url: &Url) -> Vec<FontAsset> {
    let mut fonts = Vec::new();

    for body in style_bodies(document) {
        for block in FONT_FACE_BLOCK.captures_iter(&body) {
            for reference in CSS_URL.captures_iter(&block[1]) {
                let raw = reference[1].trim();
                if let Some(url) = resolve_url(base_url, raw) {
                    fonts.push(FontAsset {
                        url,
                        source: FontSource::FontFace,
                        format: extension_of(raw).unwrap_or_else(|| "unknown".to_string()),
                    });
                }
            }
        }
    }

    for href in stylesheet_links(document).filter_map(|link| link.value().attr("href")) {
        if !href.contains(HOSTED_FONT_HOST) {
            continue;
        }
        if let Some(url) = resolve_url(base_url, href) {
            fonts.push(FontAsset {
                url,
                source: FontSource::HostedStylesheet,
                format: "css".to_string(),
            });
        }
    }

    fonts
}

fn documents(document: &Html, base_url: &Url) -> Vec<DocumentAsset> {
    elements(document)
        .filter(|el| tag(*el) == "a")
        .filter_map(|anchor| {
            let href = anchor.value().attr("href")?;
            let lower = href.trim().to_lowercase();
            let extension = DOCUMENT_EXTENSIONS
                .iter()
                .find(|ext| lower.ends_with(&format!(".{ext}")))?;
            Some(DocumentAsset {
                url: resolve_url(base_url, href)?,
                extension: (*extension).to_string(),
                text: stripped_text(anchor),
                element_path: selector_path(anchor),
            })
        })
        .collect()
}
