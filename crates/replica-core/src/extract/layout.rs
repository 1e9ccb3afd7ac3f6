//! Spacing, container, grid, alignment and breakpoint metrics.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use scraper::Html;

use super::{class_contains_any, elements, style_bodies};
use crate::config::ExtractionConfig;
use crate::fingerprint::{
    GridKind, GridSystem, LayoutMetrics, MarginSummary, ResponsiveKind, ResponsivePattern,
    SpacingPattern, ValueCount,
};

// SAFETY: Patterns are compile-time constants verified by tests
#[allow(clippy::unwrap_used)]
static SPACING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(margin|padding)(-[a-z]+)?\s*:\s*([\d.]+)([a-z%]+)").unwrap()
});

#[allow(clippy::unwrap_used)]
static MAX_WIDTH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"max-width\s*:\s*([\d.]+)([a-z%]+)").unwrap());

#[allow(clippy::unwrap_used)]
static MEDIA_PRELUDE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"@media([^{]+)\{").unwrap());

#[allow(clippy::unwrap_used)]
static WIDTH_CONDITION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(min|max)-width\s*:\s*([\d.]+)([a-z]+)").unwrap());

#[allow(clippy::unwrap_used)]
static COLUMN_CLASS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"col(-[a-z]+)?-\d+").unwrap());

const SPACING_UNITS: [&str; 6] = ["px", "rem", "em", "%", "vh", "vw"];
const CONTAINER_CLASSES: [&str; 5] = ["container", "wrapper", "content", "main", "page"];
const ALIGNMENT_CLASSES: [&str; 5] = [
    "text-center",
    "text-left",
    "text-right",
    "align-items-center",
    "justify-content-center",
];
const TOP_SPACING_VALUES: usize = 5;
const TOP_MARGIN_VALUES: usize = 3;

/// A width condition found in a media query prelude.
#[derive(Debug, Clone, Copy, PartialEq)]
struct WidthQuery {
    is_min: bool,
    value: f64,
    is_px: bool,
}

/// Spacing, containers, grid, alignment and breakpoint metrics from style blocks and classes.
pub fn compute_layout_metrics(document: &Html, config: &ExtractionConfig) -> LayoutMetrics {
    let bodies = style_bodies(document);

    let spacing = spacing_values(&bodies);
    let spacing_patterns: Vec<SpacingPattern> = SPACING_UNITS
        .iter()
        .zip(&spacing)
        .filter(|(_, values)| !values.is_empty())
        .map(|(unit, values)| {
            let frequency = most_common(values, TOP_SPACING_VALUES);
            SpacingPattern {
                unit: (*unit).to_string(),
                common_values: frequency.iter().map(|entry| entry.value).collect(),
                frequency,
            }
        })
        .collect();

    let margins = most_common(&spacing[0], TOP_MARGIN_VALUES);
    let margins = margins.first().map(|top| MarginSummary {
        most_frequent: top.value,
        common_values_px: margins.iter().map(|entry| entry.value).collect(),
    });

    let queries = width_queries(&bodies);
    let breakpoints = cluster_breakpoints(
        queries.iter().filter(|q| q.is_px).map(|q| q.value).collect(),
        config.breakpoint_tolerance,
    );
    let responsive = (!breakpoints.is_empty()).then(|| ResponsivePattern {
        kind: if breakpoints.len() >= 3 {
            ResponsiveKind::MultiBreakpoint
        } else {
            ResponsiveKind::Simple
        },
        mobile_first: queries.iter().any(|q| q.is_min),
        breakpoint_count: breakpoints.len(),
    });

    LayoutMetrics {
        spacing_patterns,
        margins,
        container_widths: container_widths(&bodies),
        container_classes: class_counts(document, &CONTAINER_CLASSES),
        grid_system: grid_system(document),
        alignments: class_counts(document, &ALIGNMENT_CLASSES),
        breakpoints,
        responsive,
    }
}

/// Spacing values per unit, indexed like [`SPACING_UNITS`].
fn spacing_values(bodies: &[String]) -> Vec<Vec<f64>> {
    let mut values = vec![Vec::new(); SPACING_UNITS.len()];
    for body in bodies {
        for capture in SPACING.captures_iter(body) {
            let Some(slot) = SPACING_UNITS.iter().position(|unit| *unit == &capture[4]) else {
                continue;
            };
            if let Ok(value) = capture[3].parse::<f64>() {
                values[slot].push(value);
            }
        }
    }
    values
}

/// Highest counts first; ties keep first-seen order.
fn most_common(values: &[f64], limit: usize) -> Vec<ValueCount> {
    let mut counts: Vec<ValueCount> = Vec::new();
    for &value in values {
        match counts.iter_mut().find(|entry| entry.value.total_cmp(&value).is_eq()) {
            Some(entry) => entry.count += 1,
            None => counts.push(ValueCount { value, count: 1 }),
        }
    }
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts.truncate(limit);
    counts
}

fn container_widths(bodies: &[String]) -> Vec<f64> {
    bodies
        .iter()
        .flat_map(|body| MAX_WIDTH.captures_iter(body))
        .filter(|capture| &capture[2] == "px")
        .filter_map(|capture| capture[1].parse().ok())
        .collect()
}

/// Elements whose class tokens contain each name; zero counts omitted.
fn class_counts(document: &Html, names: &[&str]) -> BTreeMap<String, usize> {
    names
        .iter()
        .filter_map(|name| {
            let count = elements(document)
                .filter(|el| class_contains_any(*el, &[*name]))
                .count();
            (count > 0).then(|| ((*name).to_string(), count))
        })
        .collect()
}

fn grid_system(document: &Html) -> GridSystem {
    let mut has_columns = false;
    let mut has_grid = false;
    let mut has_flex = false;
    for el in elements(document) {
        for class in el.value().classes() {
            has_columns |= COLUMN_CLASS.is_match(class);
            has_grid |= class.contains("grid");
            has_flex |= class.contains("flex");
        }
    }

    // a column utility still implies 12 columns when a later rule retypes it
    let columns = if has_columns { 12 } else { 0 };
    let kind = if has_grid {
        GridKind::CssGrid
    } else if has_flex {
        GridKind::Flexbox
    } else if has_columns {
        GridKind::TwelveColumn
    } else {
        return GridSystem::default();
    };
    GridSystem { kind, columns }
}

fn width_queries(bodies: &[String]) -> Vec<WidthQuery> {
    let mut queries = Vec::new();
    for body in bodies {
        for prelude in MEDIA_PRELUDE.captures_iter(body) {
            for condition in WIDTH_CONDITION.captures_iter(&prelude[1]) {
                if let Ok(value) = condition[2].parse::<f64>() {
                    queries.push(WidthQuery {
                        is_min: &condition[1] == "min",
                        value,
                        is_px: &condition[3] == "px",
                    });
                }
            }
        }
    }
    queries
}

/// Sort, then merge each value into the current cluster when it is within
/// `tolerance` of the cluster's last member. Each cluster becomes its mean.
///
/// ```rust
/// use replica_core::extract::layout::cluster_breakpoints;
///
/// let clusters = cluster_breakpoints(vec![1024.0, 768.0, 780.0, 480.0], 20.0);
/// assert_eq!(clusters, vec![480.0, 774.0, 1024.0]);
/// ```
#[must_use]
pub fn cluster_breakpoints(mut values: Vec<f64>, tolerance: f64) -> Vec<f64> {
    values.sort_by(f64::total_cmp);

    let mut clusters: Vec<Vec<f64>> = Vec::new();
    for value in values {
        match clusters.last_mut() {
            Some(group) if group.last().is_some_and(|last| value - last <= tolerance) => {
                group.push(value);
            }
            _ => clusters.push(vec![value]),
        }
    }

    clusters
        .iter()
        .map(|group| {
            #[allow(clippy::cast_precision_loss)]
            let len = group.len() as f64;
            group.iter().sum::<f64>() / len
        })
        .collect()
}
