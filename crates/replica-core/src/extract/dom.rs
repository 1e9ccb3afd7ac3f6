//! DOM hierarchy analysis.

use std::collections::BTreeMap;

use scraper::{ElementRef, Html};

use super::{
    child_elements, class_contains_any, class_tokens, descendants, element_id, elements,
    parent_element, tag, text_length,
};
use crate::config::ExtractionConfig;
use crate::fingerprint::{
    ContentLocation, DomAnalysis, MainContent, NavLocation, NavigationPattern, Orientation,
    RepeatingStructure, StructurePurpose, TagCount,
};

const SEMANTIC_TAGS: [&str; 7] = [
    "header", "nav", "main", "article", "section", "aside", "footer",
];
const CONTENT_HINTS: [&str; 4] = ["content", "main", "article", "body"];
const MIN_REPEAT: usize = 3;

/// Element counts, nesting depth and structural patterns.
pub fn analyze_dom(document: &Html, config: &ExtractionConfig) -> DomAnalysis {
    DomAnalysis {
        element_counts: element_counts(document, config.top_element_count),
        max_depth: max_depth(document),
        semantic_counts: semantic_counts(document),
        main_content: main_content(document),
        navigation: navigation_pattern(document),
        repeating_structures: repeating_structures(document, config.max_repeating_structures),
    }
}

/// Tag frequencies, highest first; ties keep first-seen order.
fn element_counts(document: &Html, limit: usize) -> Vec<TagCount> {
    let mut counts: Vec<TagCount> = Vec::new();
    for el in elements(document) {
        let name = tag(el);
        match counts.iter_mut().find(|entry| entry.tag == name) {
            Some(entry) => entry.count += 1,
            None => counts.push(TagCount {
                tag: name.to_string(),
                count: 1,
            }),
        }
    }
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts.truncate(limit);
    counts
}

/// Elements on the deepest root-to-leaf path, walked with an explicit stack.
fn max_depth(document: &Html) -> usize {
    let mut deepest = 0;
    let mut stack = vec![(document.root_element(), 1usize)];
    while let Some((element, depth)) = stack.pop() {
        deepest = deepest.max(depth);
        stack.extend(child_elements(element).map(|child| (child, depth + 1)));
    }
    deepest
}

fn semantic_counts(document: &Html) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for el in elements(document) {
        let name = tag(el);
        if SEMANTIC_TAGS.contains(&name) {
            *counts.entry(name.to_string()).or_insert(0) += 1;
        }
    }
    counts
}

fn main_content(document: &Html) -> Option<MainContent> {
    let mut best: Option<(ElementRef<'_>, usize)> = None;
    for candidate in elements(document).filter(|el| {
        matches!(tag(*el), "main" | "article" | "div") && class_contains_any(*el, &CONTENT_HINTS)
    }) {
        let length = text_length(candidate);
        if best.is_none_or(|(_, best_length)| length > best_length) {
            best = Some((candidate, length));
        }
    }

    best.map(|(element, _)| MainContent {
        tag: tag(element).to_string(),
        classes: class_tokens(element),
        id: element_id(element),
        location: if matches!(tag(element), "main" | "article") {
            ContentLocation::Central
        } else {
            ContentLocation::Unknown
        },
    })
}

fn navigation_pattern(document: &Html) -> Option<NavigationPattern> {
    let nav = elements(document).find(|el| matches!(tag(*el), "nav" | "header"))?;

    let items = descendants(nav).filter(|el| tag(*el) == "li").count();
    let lists = descendants(nav).filter(|el| tag(*el) == "ul").count();
    let has_dropdown = descendants(nav)
        .filter(|el| tag(*el) == "ul")
        .any(|list| has_list_ancestor_within(list, nav));
    let in_header = tag(nav) == "header" || parent_element(nav).is_some_and(|p| tag(p) == "header");

    Some(NavigationPattern {
        orientation: if items > lists * 3 {
            Orientation::Horizontal
        } else {
            Orientation::Vertical
        },
        item_count: items,
        has_dropdown,
        location: if in_header {
            NavLocation::Header
        } else {
            NavLocation::Standalone
        },
    })
}

/// Whether a `ul` sits between `list` and `scope`.
fn has_list_ancestor_within(list: ElementRef<'_>, scope: ElementRef<'_>) -> bool {
    list.ancestors()
        .filter_map(ElementRef::wrap)
        .take_while(|ancestor| ancestor.id() != scope.id())
        .any(|ancestor| tag(ancestor) == "ul")
}

fn repeating_structures(document: &Html, limit: usize) -> Vec<RepeatingStructure> {
    let mut found: Vec<RepeatingStructure> = elements(document)
        .filter(|el| matches!(tag(*el), "ul" | "ol" | "div"))
        .filter_map(repeating_run)
        .collect();
    found.sort_by(|a, b| b.count.cmp(&a.count));
    found.truncate(limit);
    found
}

/// Longest run of consecutive same-tag element children, if at least three long.
fn repeating_run(parent: ElementRef<'_>) -> Option<RepeatingStructure> {
    let children: Vec<ElementRef<'_>> = child_elements(parent).collect();

    let mut best: Option<(usize, usize)> = None;
    let mut start = 0;
    while start < children.len() {
        let name = tag(children[start]);
        let mut end = start + 1;
        while end < children.len() && tag(children[end]) == name {
            end += 1;
        }
        let len = end - start;
        if len >= MIN_REPEAT && best.is_none_or(|(_, best_len)| len > best_len) {
            best = Some((start, len));
        }
        start = end;
    }

    let (start, len) = best?;
    let run = &children[start..start + len];
    let is_list = matches!(tag(parent), "ul" | "ol");
    let has_links = run
        .iter()
        .any(|item| descendants(*item).any(|el| tag(el) == "a"));

    Some(RepeatingStructure {
        parent: tag(parent).to_string(),
        pattern: tag(run[0]).to_string(),
        count: len,
        classes: class_tokens(parent),
        purpose: if is_list && has_links {
            StructurePurpose::Navigation
        } else {
            StructurePurpose::Content
        },
    })
}
