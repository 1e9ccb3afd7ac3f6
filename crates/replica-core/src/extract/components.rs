//! Visual component heuristics.

use std::collections::BTreeMap;

use scraper::{ElementRef, Html};

use super::{
    attr, class_contains_any, class_tokens, descendants, element_id, elements, selector_path,
    stripped_text, tag, text_length,
};
use crate::fingerprint::{
    ContentSection, InteractiveElement, Orientation, UiComponent, VisualComponents,
};

const BUTTON_INPUT_TYPES: [&str; 3] = ["button", "submit", "reset"];
const CLICKABLE_INPUT_TYPES: [&str; 5] = ["submit", "button", "reset", "checkbox", "radio"];
const CARD_HINTS: [&str; 4] = ["card", "panel", "box", "tile"];
const NAV_HINTS: [&str; 3] = ["nav", "menu", "navigation"];

/// Buttons, forms, cards and navbars, then content sections and interactive elements.
pub fn identify_components(document: &Html) -> VisualComponents {
    let mut ui_components = buttons(document);
    ui_components.extend(forms(document));
    ui_components.extend(cards(document));
    ui_components.extend(navbars(document));

    VisualComponents {
        ui_components,
        content_sections: content_sections(document),
        interactive_elements: interactive_elements(document),
    }
}

fn input_type_in(element: ElementRef<'_>, allowed: &[&str]) -> bool {
    element
        .value()
        .attr("type")
        .is_some_and(|kind| allowed.iter().any(|a| kind.eq_ignore_ascii_case(a)))
}

fn is_button(element: ElementRef<'_>) -> bool {
    match tag(element) {
        "button" => true,
        "input" => input_type_in(element, &BUTTON_INPUT_TYPES),
        "a" => element
            .value()
            .classes()
            .any(|class| class == "btn" || class == "button"),
        _ => false,
    }
}

/// `prop: value` pairs of an inline style attribute.
fn parse_inline_style(style: &str) -> BTreeMap<String, String> {
    style
        .split(';')
        .filter_map(|declaration| declaration.split_once(':'))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .filter(|(key, _)| !key.is_empty())
        .collect()
}

fn buttons(document: &Html) -> Vec<UiComponent> {
    elements(document)
        .filter(|el| is_button(*el))
        .map(|el| UiComponent::Button {
            text: stripped_text(el),
            classes: class_tokens(el),
            id: element_id(el),
            styles: el
                .value()
                .attr("style")
                .map(parse_inline_style)
                .unwrap_or_default(),
            is_primary: class_contains_any(el, &["primary"]),
            element_path: selector_path(el),
        })
        .collect()
}

fn forms(document: &Html) -> Vec<UiComponent> {
    elements(document)
        .filter(|el| tag(*el) == "form")
        .map(|form| {
            let input_count = descendants(form)
                .filter(|el| matches!(tag(*el), "input" | "select" | "textarea"))
                .count();
            let has_submit = descendants(form).any(|el| {
                tag(el) == "button" || (tag(el) == "input" && input_type_in(el, &["submit"]))
            });
            UiComponent::Form {
                input_count,
                has_submit,
                classes: class_tokens(form),
                id: element_id(form),
                element_path: selector_path(form),
            }
        })
        .collect()
}

fn cards(document: &Html) -> Vec<UiComponent> {
    elements(document)
        .filter(|el| {
            matches!(tag(*el), "div" | "section" | "article") && class_contains_any(*el, &CARD_HINTS)
        })
        .map(|card| UiComponent::Card {
            has_image: descendants(card).any(|el| tag(el) == "img"),
            has_header: descendants(card).any(|el| {
                matches!(
                    tag(el),
                    "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "header"
                )
            }),
            has_footer: descendants(card).any(|el| tag(el) == "footer"),
            classes: class_tokens(card),
            id: element_id(card),
            element_path: selector_path(card),
        })
        .collect()
}

fn navbars(document: &Html) -> Vec<UiComponent> {
    elements(document)
        .filter(|el| {
            matches!(tag(*el), "nav" | "div" | "header") && class_contains_any(*el, &NAV_HINTS)
        })
        .map(|nav| UiComponent::Navbar {
            item_count: descendants(nav).filter(|el| tag(*el) == "a").count(),
            orientation: if tag(nav) == "header" || class_contains_any(nav, &["header"]) {
                Orientation::Horizontal
            } else {
                Orientation::Vertical
            },
            classes: class_tokens(nav),
            id: element_id(nav),
            element_path: selector_path(nav),
        })
        .collect()
}

fn heading_level(element: ElementRef<'_>) -> Option<u8> {
    match tag(element) {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        _ => None,
    }
}

/// h1-h3 headings with their following content siblings.
fn content_sections(document: &Html) -> Vec<ContentSection> {
    let mut sections = Vec::new();
    for heading in elements(document) {
        let Some(level) = heading_level(heading) else {
            continue;
        };

        let blocks: Vec<ElementRef<'_>> = heading
            .next_siblings()
            .filter_map(ElementRef::wrap)
            .take_while(|sibling| heading_level(*sibling).is_none())
            .filter(|sibling| matches!(tag(*sibling), "p" | "ul" | "ol" | "div" | "section"))
            .collect();

        if blocks.is_empty() {
            continue;
        }
        sections.push(ContentSection {
            heading: stripped_text(heading),
            heading_level: level,
            content_elements: blocks.len(),
            approximate_length: blocks.iter().map(|block| text_length(*block)).sum(),
            element_path: selector_path(heading),
        });
    }
    sections
}

fn interactive_elements(document: &Html) -> Vec<InteractiveElement> {
    elements(document)
        .filter(|el| match tag(*el) {
            "a" | "button" => true,
            "input" => input_type_in(*el, &CLICKABLE_INPUT_TYPES),
            _ => false,
        })
        .map(|el| InteractiveElement {
            tag: tag(el).to_string(),
            text: if tag(el) == "input" {
                attr(el, "value").unwrap_or_default()
            } else {
                stripped_text(el)
            },
            classes: class_tokens(el),
            id: element_id(el),
            element_path: selector_path(el),
        })
        .collect()
}
