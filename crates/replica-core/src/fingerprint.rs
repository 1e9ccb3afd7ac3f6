//! Structural fingerprint types.
//!
//! A [`StructuralFingerprint`] is the deterministic description of a page's
//! design system: typography, colors, DOM shape, UI components, assets and
//! layout metrics. Each extractor in [`crate::extract`] fills one slice.
//!
//! Every list is in document order unless documented otherwise, and every map
//! is a `BTreeMap`, so serializing the same fingerprint twice yields identical
//! bytes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Aggregated design description of a page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuralFingerprint {
    /// Typography, colors and layout flags.
    pub design: DesignTokens,
    /// Element tree statistics.
    pub dom: DomAnalysis,
    /// UI component candidates.
    pub components: VisualComponents,
    /// Media catalog with resolved URLs.
    pub assets: AssetCatalog,
    /// Spacing, grid and breakpoint metrics.
    pub layout: LayoutMetrics,
}

impl StructuralFingerprint {
    /// Compact summary stored alongside a completed clone.
    #[must_use]
    pub fn summary(&self) -> FingerprintSummary {
        FingerprintSummary {
            fonts: self.design.fonts.clone(),
            color_count: self.design.colors.len(),
            primary_colors: self.design.colors.iter().take(5).cloned().collect(),
            heading_counts: self.design.headings.clone(),
            max_depth: self.dom.max_depth,
            repeating_structures: self.dom.repeating_structures.len(),
            ui_components: self.components.ui_components.len(),
            total_assets: self.assets.summary.total_all,
            grid_system: self.layout.grid_system.kind,
            breakpoints: self.layout.breakpoints.clone(),
        }
    }
}

/// Headline numbers from a fingerprint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FingerprintSummary {
    /// Font families, first-seen order.
    pub fonts: Vec<String>,
    /// Distinct color tokens.
    pub color_count: usize,
    /// First five color tokens.
    pub primary_colors: Vec<String>,
    /// Non-zero `h1`..`h6` counts.
    pub heading_counts: BTreeMap<String, usize>,
    /// Deepest element nesting.
    pub max_depth: usize,
    /// Number of repeating sibling runs.
    pub repeating_structures: usize,
    /// Number of UI component candidates.
    pub ui_components: usize,
    /// Assets found, before capping.
    pub total_assets: usize,
    /// Detected grid system.
    pub grid_system: GridKind,
    /// Clustered breakpoints in pixels.
    pub breakpoints: Vec<f64>,
}

// ---------------------------------------------------------------------------
// Design tokens
// ---------------------------------------------------------------------------

/// Typography, color and coarse layout flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesignTokens {
    /// `h1`..`h6` counts; zero counts are omitted.
    pub headings: BTreeMap<String, usize>,
    /// Font family names, first-seen order.
    pub fonts: Vec<String>,
    /// Color tokens, first-seen order.
    pub colors: Vec<String>,
    /// Coarse layout hints from class names.
    pub layout: LayoutFlags,
}

/// Class-name hints about the layout technique.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutFlags {
    /// Elements carrying the exact `container` class token.
    pub containers: usize,
    /// Some class mentions `grid`, `row`, `col` or `container`.
    pub grid_detected: bool,
    /// Some class mentions `flex`.
    pub flex_detected: bool,
}

// ---------------------------------------------------------------------------
// DOM analysis
// ---------------------------------------------------------------------------

/// Shape of the element tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomAnalysis {
    /// Most frequent tags, highest count first.
    pub element_counts: Vec<TagCount>,
    /// Elements on the deepest root-to-leaf path.
    pub max_depth: usize,
    /// Counts of landmark tags (`header`, `nav`, `main`, ...).
    pub semantic_counts: BTreeMap<String, usize>,
    /// Region that most likely holds the primary content.
    pub main_content: Option<MainContent>,
    /// Primary navigation region.
    pub navigation: Option<NavigationPattern>,
    /// Highest repeat count first.
    pub repeating_structures: Vec<RepeatingStructure>,
}

/// Occurrences of one tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagCount {
    /// Lowercase tag name.
    pub tag: String,
    /// Number of elements.
    pub count: usize,
}

/// Element chosen as the main content region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MainContent {
    /// Tag name.
    pub tag: String,
    /// Class tokens in source order.
    pub classes: Vec<String>,
    /// `id` attribute, if any.
    pub id: Option<String>,
    /// Where the region sits in the page.
    pub location: ContentLocation,
}

/// Position of the main content region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentLocation {
    /// A `main` or `article` element.
    Central,
    /// Any other element.
    Unknown,
}

/// Shape of the primary navigation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationPattern {
    /// `Horizontal` when items outnumber lists three to one.
    pub orientation: Orientation,
    /// `li` descendants of the navigation region.
    pub item_count: usize,
    /// A `ul` nested inside another list.
    pub has_dropdown: bool,
    /// Whether the navigation is or sits inside a `header`.
    pub location: NavLocation,
}

/// Layout direction of a menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    /// Items laid out in a row.
    Horizontal,
    /// Items stacked.
    Vertical,
}

/// Placement of a navigation region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavLocation {
    /// Inside a `header` element.
    Header,
    /// Anywhere else.
    Standalone,
}

/// A run of same-tag siblings under one parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepeatingStructure {
    /// Parent tag name.
    pub parent: String,
    /// Tag of the repeated children.
    pub pattern: String,
    /// Number of repeated children.
    pub count: usize,
    /// Class tokens of the parent.
    pub classes: Vec<String>,
    /// Guess based on the parent and child tags.
    pub purpose: StructurePurpose,
}

/// What a repeating structure is probably for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructurePurpose {
    /// A list whose items contain links.
    Navigation,
    /// Anything else.
    Content,
}

// ---------------------------------------------------------------------------
// Visual components
// ---------------------------------------------------------------------------

/// Component-level view of the page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisualComponents {
    /// Buttons, then forms, then cards, then navbars.
    pub ui_components: Vec<UiComponent>,
    /// Headings with the blocks they introduce.
    pub content_sections: Vec<ContentSection>,
    /// Links, buttons and form controls.
    pub interactive_elements: Vec<InteractiveElement>,
}

/// A UI component candidate found by class and tag heuristics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UiComponent {
    /// A `button`, button-typed `input`, or button-classed anchor.
    Button {
        /// Trimmed text content.
        text: String,
        /// Class tokens in source order.
        classes: Vec<String>,
        /// `id` attribute, if any.
        id: Option<String>,
        /// Declarations parsed from the inline `style` attribute.
        styles: BTreeMap<String, String>,
        /// A class token mentions `primary`.
        is_primary: bool,
        /// Selector path from `body`.
        element_path: String,
    },
    /// A `form` element.
    Form {
        /// Descendant `input`, `select` and `textarea` elements.
        input_count: usize,
        /// Contains a submit control.
        has_submit: bool,
        /// Class tokens in source order.
        classes: Vec<String>,
        /// `id` attribute, if any.
        id: Option<String>,
        /// Selector path from `body`.
        element_path: String,
    },
    /// A `div`, `section` or `article` with a card-like class.
    Card {
        /// Contains an `img`.
        has_image: bool,
        /// Contains a heading or `header` element.
        has_header: bool,
        /// Contains a `footer` element.
        has_footer: bool,
        /// Class tokens in source order.
        classes: Vec<String>,
        /// `id` attribute, if any.
        id: Option<String>,
        /// Selector path from `body`.
        element_path: String,
    },
    /// A `nav`, `div` or `header` with a navigation-like class.
    Navbar {
        /// Descendant anchors.
        item_count: usize,
        /// Layout direction of the items.
        orientation: Orientation,
        /// Class tokens in source order.
        classes: Vec<String>,
        /// `id` attribute, if any.
        id: Option<String>,
        /// Selector path from `body`.
        element_path: String,
    },
}

impl UiComponent {
    /// Lowercase component kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Button { .. } => "button",
            Self::Form { .. } => "form",
            Self::Card { .. } => "card",
            Self::Navbar { .. } => "navbar",
        }
    }

    /// Selector path of the component's element.
    #[must_use]
    pub fn element_path(&self) -> &str {
        match self {
            Self::Button { element_path, .. }
            | Self::Form { element_path, .. }
            | Self::Card { element_path, .. }
            | Self::Navbar { element_path, .. } => element_path,
        }
    }
}

/// A heading together with the content blocks that follow it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentSection {
    /// Heading text.
    pub heading: String,
    /// 1 to 6.
    pub heading_level: u8,
    /// Sibling `p/ul/ol/div/section` blocks before the next heading.
    pub content_elements: usize,
    /// Trimmed text length of those blocks.
    pub approximate_length: usize,
    /// Selector path of the heading.
    pub element_path: String,
}

/// A link, button or form control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractiveElement {
    /// Tag name.
    pub tag: String,
    /// Trimmed text, or the `value` attribute for inputs.
    pub text: String,
    /// Class tokens in source order.
    pub classes: Vec<String>,
    /// `id` attribute, if any.
    pub id: Option<String>,
    /// Selector path from `body`.
    pub element_path: String,
}

// ---------------------------------------------------------------------------
// Assets
// ---------------------------------------------------------------------------

/// Catalog of every resolvable media reference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetCatalog {
    /// Content images.
    pub images: Vec<ImageAsset>,
    /// Images classified as icons.
    pub icons: Vec<ImageAsset>,
    /// Inline `svg` elements.
    pub svgs: Vec<SvgAsset>,
    /// Video sources.
    pub videos: Vec<MediaAsset>,
    /// Audio sources.
    pub audio: Vec<MediaAsset>,
    /// Font files and hosted font stylesheets.
    pub fonts: Vec<FontAsset>,
    /// Linked documents and archives.
    pub other_media: Vec<DocumentAsset>,
    /// Totals as found, before any capping.
    pub summary: AssetSummary,
}

impl AssetCatalog {
    /// Recompute the summary from the current lists.
    #[must_use]
    pub fn tally(&self) -> AssetSummary {
        let mut summary = AssetSummary {
            total_images: self.images.len(),
            total_icons: self.icons.len(),
            total_svgs: self.svgs.len(),
            total_videos: self.videos.len(),
            total_audio: self.audio.len(),
            total_fonts: self.fonts.len(),
            total_other_media: self.other_media.len(),
            total_all: 0,
        };
        summary.total_all = summary.total_images
            + summary.total_icons
            + summary.total_svgs
            + summary.total_videos
            + summary.total_audio
            + summary.total_fonts
            + summary.total_other_media;
        summary
    }

    /// Keep the first `limit` entries of every list. The summary is untouched.
    pub fn truncate(&mut self, limit: usize) {
        self.images.truncate(limit);
        self.icons.truncate(limit);
        self.svgs.truncate(limit);
        self.videos.truncate(limit);
        self.audio.truncate(limit);
        self.fonts.truncate(limit);
        self.other_media.truncate(limit);
    }
}

/// Per-kind asset totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetSummary {
    /// Content images.
    pub total_images: usize,
    /// Icons.
    pub total_icons: usize,
    /// Inline SVGs.
    pub total_svgs: usize,
    /// Video sources.
    pub total_videos: usize,
    /// Audio sources.
    pub total_audio: usize,
    /// Font references.
    pub total_fonts: usize,
    /// Documents and archives.
    pub total_other_media: usize,
    /// Sum of the above.
    pub total_all: usize,
}

/// An `img` element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageAsset {
    /// Absolute `src`.
    pub url: String,
    /// `alt` attribute, empty when absent.
    pub alt_text: String,
    /// Raw `width` attribute.
    pub width: Option<String>,
    /// Raw `height` attribute.
    pub height: Option<String>,
    /// `loading` attribute, `eager` when absent.
    pub loading: String,
    /// Class tokens in source order.
    pub classes: Vec<String>,
    /// Selector path from `body`.
    pub element_path: String,
    /// Bucket derived from the declared dimensions.
    pub size_category: SizeCategory,
}

/// Image size bucket derived from the declared area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeCategory {
    /// No usable dimensions.
    Unknown,
    /// Smallest area bucket.
    Icon,
    /// Up to the thumbnail threshold.
    Thumbnail,
    /// Up to the medium threshold.
    Medium,
    /// Up to the large threshold.
    Large,
    /// Anything bigger.
    ExtraLarge,
}

/// An inline `svg` element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SvgAsset {
    /// Length of the serialized element, in characters.
    pub code_length: usize,
    /// Icon or illustration guess.
    pub purpose: SvgPurpose,
    /// Raw `width` attribute.
    pub width: Option<String>,
    /// Raw `height` attribute.
    pub height: Option<String>,
    /// Raw `viewBox` attribute.
    pub view_box: Option<String>,
    /// Class tokens in source order.
    pub classes: Vec<String>,
    /// Selector path from `body`.
    pub element_path: String,
}

/// What an inline SVG is probably for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SvgPurpose {
    /// Icon, logo or symbol class.
    Icon,
    /// Illustration, diagram or chart class.
    Illustration,
    /// No signal either way.
    Unknown,
}

/// A `video`/`audio` element or one of its `source` children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaAsset {
    /// Absolute source URL.
    pub url: String,
    /// `type` attribute, empty when absent.
    pub mime_type: String,
    /// `controls` attribute present.
    pub controls: bool,
    /// `autoplay` attribute present.
    pub autoplay: bool,
    /// `muted` attribute present.
    pub muted: bool,
    /// `loop` attribute present.
    #[serde(rename = "loop")]
    pub looped: bool,
    /// Selector path of the element carrying `src`.
    pub element_path: String,
}

/// A font file or a hosted font stylesheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FontAsset {
    /// Absolute URL.
    pub url: String,
    /// Where the reference was found.
    pub source: FontSource,
    /// File extension, `css` for hosted stylesheets, `unknown` otherwise.
    pub format: String,
}

/// Origin of a font reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FontSource {
    /// A `url(...)` inside an `@font-face` rule.
    FontFace,
    /// A `<link>` to a hosted font service.
    HostedStylesheet,
}

/// Downloadable documents and archives linked from anchors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentAsset {
    /// Absolute `href`.
    pub url: String,
    /// Lowercase file extension.
    pub extension: String,
    /// Anchor text.
    pub text: String,
    /// Selector path of the anchor.
    pub element_path: String,
}

// ---------------------------------------------------------------------------
// Layout metrics
// ---------------------------------------------------------------------------

/// Spacing, width and responsive measurements.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutMetrics {
    /// One entry per unit that occurs, in `px, rem, em, %, vh, vw` order.
    pub spacing_patterns: Vec<SpacingPattern>,
    /// Pixel margin summary, when any pixel margins exist.
    pub margins: Option<MarginSummary>,
    /// `max-width` pixel values in style blocks, document order.
    pub container_widths: Vec<f64>,
    /// Counts of container-like class names; zero counts omitted.
    pub container_classes: BTreeMap<String, usize>,
    /// Detected grid system.
    pub grid_system: GridSystem,
    /// Counts of alignment utility classes; zero counts omitted.
    pub alignments: BTreeMap<String, usize>,
    /// Clustered pixel breakpoints, ascending.
    pub breakpoints: Vec<f64>,
    /// `None` when the page has no width media queries.
    pub responsive: Option<ResponsivePattern>,
}

/// Margin and padding values for one unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpacingPattern {
    /// `px`, `rem`, `em`, `%`, `vh` or `vw`.
    pub unit: String,
    /// Most frequent values, highest count first.
    pub common_values: Vec<f64>,
    /// Top values with their counts.
    pub frequency: Vec<ValueCount>,
}

/// A value and how often it occurs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueCount {
    /// Numeric value.
    pub value: f64,
    /// Occurrences.
    pub count: usize,
}

/// Pixel margin values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarginSummary {
    /// Three most frequent values.
    pub common_values_px: Vec<f64>,
    /// The single most frequent value.
    pub most_frequent: f64,
}

/// Grid classification with its column count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSystem {
    /// Detected technique.
    pub kind: GridKind,
    /// Column count, 0 when unknown.
    pub columns: u8,
}

/// Layout technique inferred from class names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridKind {
    /// No signal.
    #[default]
    Unknown,
    /// `col-*` utility classes.
    TwelveColumn,
    /// A class mentioning `grid`.
    CssGrid,
    /// A class mentioning `flex`.
    Flexbox,
}

/// How the page adapts to width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponsivePattern {
    /// Classification by breakpoint count.
    pub kind: ResponsiveKind,
    /// Some query uses `min-width`.
    pub mobile_first: bool,
    /// Clustered breakpoints.
    pub breakpoint_count: usize,
}

/// Responsive classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponsiveKind {
    /// Three or more clustered breakpoints.
    MultiBreakpoint,
    /// One or two.
    Simple,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn image(url: &str) -> ImageAsset {
        ImageAsset {
            url: url.to_string(),
            alt_text: String::new(),
            width: None,
            height: None,
            loading: "eager".to_string(),
            classes: Vec::new(),
            element_path: "body > img".to_string(),
            size_category: SizeCategory::Unknown,
        }
    }

    #[test]
    fn test_truncate_keeps_summary_and_order() {
        let mut catalog = AssetCatalog {
            images: (0..15).map(|i| image(&format!("https://a.test/{i}.png"))).collect(),
            ..AssetCatalog::default()
        };
        catalog.summary = catalog.tally();

        catalog.truncate(10);

        assert_eq!(catalog.images.len(), 10);
        assert_eq!(catalog.images[0].url, "https://a.test/0.png");
        assert_eq!(catalog.images[9].url, "https://a.test/9.png");
        assert_eq!(catalog.summary.total_images, 15);
        assert_eq!(catalog.summary.total_all, 15);
    }

    #[test]
    fn test_ui_component_tagged_serialization() {
        let card = UiComponent::Card {
            has_image: true,
            has_header: false,
            has_footer: false,
            classes: vec!["card".into()],
            id: None,
            element_path: "body > div.card".into(),
        };
        let json = serde_json::to_value(&card).unwrap();
        assert_eq!(json["type"], "card");
        assert_eq!(card.kind(), "card");
        assert_eq!(card.element_path(), "body > div.card");
    }

    #[test]
    fn test_summary_of_default_is_empty() {
        let summary = StructuralFingerprint::default().summary();
        assert!(summary.fonts.is_empty());
        assert_eq!(summary.total_assets, 0);
        assert_eq!(summary.grid_system, GridKind::Unknown);
    }
}
