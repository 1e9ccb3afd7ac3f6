//! Typography, color and layout-flag extraction.
//!
//! Patterns are applied to `<style>` bodies first and inline `style`
//! attributes second. Results keep first-seen order.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use scraper::Html;

use super::{descendants, elements, inline_styles, style_bodies, stylesheet_links, tag};
use crate::config::ExtractionConfig;
use crate::fingerprint::{DesignTokens, LayoutFlags};

// SAFETY: Patterns are compile-time constants verified by tests
#[allow(clippy::unwrap_used)]
static FONT_FAMILY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"font-family:\s*([^;}]+)[;}]").unwrap());

#[allow(clippy::unwrap_used)]
static FONT_FACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@font-face\s*\{([^}]+)\}").unwrap());

#[allow(clippy::unwrap_used)]
static HOSTED_FAMILY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"family=([^&]+)").unwrap());

#[allow(clippy::unwrap_used)]
static COLOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:color|background|background-color|border-color):\s*(#[0-9a-fA-F]{3,8}|rgba?\([^)]+\)|hsla?\([^)]+\)|[a-zA-Z]+)[;}]",
    )
    .unwrap()
});

/// Host serving font stylesheets whose URLs name the families.
pub const HOSTED_FONT_HOST: &str = "fonts.googleapis.com";

const SERIF_STACK: [&str; 6] = [
    "Times New Roman",
    "Georgia",
    "Cambria",
    "serif",
    "Palatino",
    "Garamond",
];
const SANS_STACK: [&str; 6] = [
    "Arial",
    "Helvetica",
    "Verdana",
    "sans-serif",
    "Segoe UI",
    "Roboto",
];
const SERIF_NAMES: [&str; 5] = ["times", "georgia", "cambria", "palatino", "garamond"];

/// Insertion-ordered set of strings.
#[derive(Default)]
struct OrderedSet {
    items: Vec<String>,
}

impl OrderedSet {
    fn insert(&mut self, value: &str) {
        if !value.is_empty() && !self.items.iter().any(|existing| existing == value) {
            self.items.push(value.to_string());
        }
    }

    fn into_vec(self) -> Vec<String> {
        self.items
    }
}

/// Fonts, colors, heading counts and coarse layout flags.
pub fn extract_design(document: &Html, config: &ExtractionConfig) -> DesignTokens {
    let bodies = style_bodies(document);
    // A trailing declaration without `;` still terminates the match.
    let inline: Vec<String> = inline_styles(document)
        .into_iter()
        .map(|style| format!("{style};"))
        .collect();

    let mut fonts = OrderedSet::default();
    for text in bodies.iter().chain(inline.iter()) {
        for capture in FONT_FAMILY.captures_iter(text) {
            for family in split_families(&capture[1]) {
                if !matches!(family.to_lowercase().as_str(), "inherit" | "initial") {
                    fonts.insert(&family);
                }
            }
        }
    }

    let mut colors = OrderedSet::default();
    for text in bodies.iter().chain(inline.iter()) {
        for capture in COLOR.captures_iter(text) {
            colors.insert(capture[1].trim());
        }
    }

    for body in &bodies {
        for face in FONT_FACE.captures_iter(body) {
            if let Some(family) = FONT_FAMILY.captures(&face[1]) {
                for name in split_families(&family[1]) {
                    fonts.insert(&name);
                }
            }
        }
    }

    for href in stylesheet_links(document).filter_map(|link| link.value().attr("href")) {
        if href.contains(HOSTED_FONT_HOST) {
            for name in hosted_families(href) {
                fonts.insert(&name);
            }
        }
    }

    let mut fonts = fonts.into_vec();
    if fonts.is_empty() {
        let stack = if is_serif_dominant(document, config.serif_sample_size) {
            SERIF_STACK
        } else {
            SANS_STACK
        };
        fonts = stack.iter().map(|name| (*name).to_string()).collect();
    }

    DesignTokens {
        headings: heading_counts(document),
        fonts,
        colors: colors.into_vec(),
        layout: layout_flags(document),
    }
}

fn split_families(list: &str) -> Vec<String> {
    list.split(',')
        .map(|family| family.trim().trim_matches(|c| c == '\'' || c == '"').trim())
        .filter(|family| !family.is_empty())
        .map(str::to_string)
        .collect()
}

/// Family names from every `family=` parameter of a hosted-font URL.
fn hosted_families(href: &str) -> Vec<String> {
    HOSTED_FAMILY
        .captures_iter(href)
        .flat_map(|capture| {
            capture[1]
                .replace('+', " ")
                .split('|')
                .filter_map(|family| family.split(':').next())
                .map(str::trim)
                .filter(|family| !family.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .collect()
}

fn is_serif_dominant(document: &Html, sample_size: usize) -> bool {
    let Some(body) = elements(document).find(|el| tag(*el) == "body") else {
        return false;
    };

    descendants(body)
        .filter(|el| matches!(tag(*el), "p" | "div" | "span" | "h1" | "h2" | "h3"))
        .take(sample_size)
        .filter_map(|el| el.value().attr("style"))
        .filter_map(|style| {
            FONT_FAMILY
                .captures(&format!("{style};"))
                .map(|capture| capture[1].to_lowercase())
        })
        .any(|family| names_serif(&family))
}

fn names_serif(family: &str) -> bool {
    family.replace("sans-serif", "").contains("serif")
        || SERIF_NAMES.iter().any(|name| family.contains(name))
}

fn heading_counts(document: &Html) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for el in elements(document) {
        let name = tag(el);
        if matches!(name, "h1" | "h2" | "h3" | "h4" | "h5" | "h6") {
            *counts.entry(name.to_string()).or_insert(0) += 1;
        }
    }
    counts
}

fn layout_flags(document: &Html) -> LayoutFlags {
    let mut flags = LayoutFlags::default();
    for el in elements(document).filter(|el| el.value().attr("class").is_some()) {
        let classes: Vec<&str> = el.value().classes().collect();
        if classes.contains(&"container") {
            flags.containers += 1;
        }
        let joined = classes.join(" ").to_lowercase();
        if ["grid", "row", "col", "container"]
            .iter()
            .any(|needle| joined.contains(needle))
        {
            flags.grid_detected = true;
        }
        if joined.contains("flex") {
            flags.flex_detected = true;
        }
    }
    flags
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn design(html: &str) -> DesignTokens {
        extract_design(&Html::parse_document(html), &ExtractionConfig::default())
    }

    #[test]
    fn test_inline_style_without_trailing_semicolon() {
        let tokens = design(
            r#"<html><body><p style="color: red; font-family: Lora">x</p></body></html>"#,
        );
        assert_eq!(tokens.fonts, vec!["Lora"]);
        assert_eq!(tokens.colors, vec!["red"]);
    }

    #[test]
    fn test_fonts_drop_inherit_and_keep_first_seen_order() {
        let tokens = design(
            r#"<html><head><style>
                h1 { font-family: "Playfair Display", Georgia, serif; }
                p { font-family: inherit; }
                body { font-family: Georgia, Inter; }
            </style></head><body></body></html>"#,
        );
        assert_eq!(
            tokens.fonts,
            vec!["Playfair Display", "Georgia", "serif", "Inter"]
        );
    }

    #[test]
    fn test_colors_from_each_property_form() {
        let tokens = design(
            r"<html><head><style>
                a { color: #0af; }
                b { background-color: rgba(0, 0, 0, 0.5); }
                c { border-color: hsl(120, 50%, 50%); }
                d { background: white; }
                e { color: navy }
            </style></head></html>",
        );
        assert_eq!(
            tokens.colors,
            vec!["#0af", "rgba(0, 0, 0, 0.5)", "hsl(120, 50%, 50%)", "white"]
        );
        assert!(!tokens.colors.contains(&"navy".to_string()));
    }

    #[test]
    fn test_hosted_font_families_every_parameter() {
        let tokens = design(
            r#"<html><head>
            <link rel="stylesheet" href="https://fonts.googleapis.com/css2?family=Open+Sans:wght@400;700&family=Roboto+Mono&display=swap">
            <link rel="stylesheet" href="https://fonts.googleapis.com/css?family=Lato|Merriweather:300">
            </head></html>"#,
        );
        assert_eq!(
            tokens.fonts,
            vec!["Open Sans", "Roboto Mono", "Lato", "Merriweather"]
        );
    }

    #[test]
    fn test_font_face_family_is_collected() {
        let tokens = design(
            r"<html><head><style>@font-face { src: url(brand.woff2); font-family: Brand }</style></head></html>",
        );
        assert_eq!(tokens.fonts, vec!["Brand"]);
    }

    #[test]
    fn test_default_stack_sans_when_nothing_found() {
        let tokens = design("<html><body><p>plain</p></body></html>");
        assert_eq!(tokens.fonts[0], "Arial");
        assert_eq!(tokens.fonts.len(), 6);
    }

    #[test]
    fn test_serif_detection_ignores_sans_serif() {
        assert!(names_serif("georgia"));
        assert!(names_serif("serif"));
        assert!(names_serif("'times new roman', sans-serif"));
        assert!(!names_serif("helvetica, sans-serif"));
    }

    #[test]
    fn test_headings_and_layout_flags() {
        let tokens = design(
            r#"<html><body>
            <div class="container"><div class="row"><div class="d-flex">x</div></div></div>
            <div class="container"><h1>a</h1><h2>b</h2><h2>c</h2></div>
            </body></html>"#,
        );
        assert_eq!(tokens.headings.get("h1"), Some(&1));
        assert_eq!(tokens.headings.get("h2"), Some(&2));
        assert!(!tokens.headings.contains_key("h3"));
        assert_eq!(tokens.layout.containers, 2);
        assert!(tokens.layout.grid_detected);
        assert!(tokens.layout.flex_detected);
    }
}
