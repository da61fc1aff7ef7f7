// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! HTML content extraction
//!
//! Three-stage fallback chain: a precise DOM pass over known content
//! containers, a relaxed DOM pass that admits tables, and a regex
//! tag-pattern sweep for markup the DOM heuristics cannot model.

use regex::Regex;
use scraper::node::Element;
use scraper::{ElementRef, Html, Selector};

use crate::config::ExtractionSettings;

// Priority order of container selectors to try
const CANDIDATE_SELECTORS: [&str; 12] = [
    "article",
    "main",
    "[role='main']",
    ".post-content",
    ".article-content",
    ".entry-content",
    ".story-body",    // BBC
    ".article__body", // news CMSes
    ".content-body",
    "#article-body",
    "#content",
    ".prose", // Tailwind
];

// Elements whose text is collected by the DOM passes
const TEXT_BLOCK_TAGS: [&str; 13] = [
    "p", "h1", "h2", "h3", "h4", "h5", "h6", "li", "blockquote", "pre", "figcaption", "dt", "dd",
];
const TABLE_CELL_TAGS: [&str; 2] = ["td", "th"];

// Subtrees never worth reading
const EXCLUDED_TAGS: [&str; 12] = [
    "nav", "header", "footer", "aside", "form", "script", "style", "noscript", "iframe", "svg",
    "button", "select",
];

// Class/id fragments that mark comment threads; filtered in every pass
const COMMENT_CLASS_HINTS: [&str; 2] = ["comment", "disqus"];

// Class/id fragments that mark page furniture; filtered in the precise pass
const BOILERPLATE_CLASS_HINTS: [&str; 13] = [
    "sidebar",
    "share",
    "social",
    "related",
    "advert",
    "sponsor",
    "promo",
    "breadcrumb",
    "cookie",
    "subscribe",
    "newsletter",
    "menu",
    "nav",
];

// Candidate containers below this length are treated as navigation shells
const CANDIDATE_MIN_LEN: usize = 200;

// Tag-pattern fallback containers, in priority order
const FALLBACK_PATTERNS: [&str; 3] = [
    r"(?is)<article[^>]*>(.*?)</article>",
    r#"(?is)<div[^>]+class=["'][^"']*(?:content|post|article|entry|story|text)[^"']*["'][^>]*>(.*?)</div>"#,
    r"(?is)<main[^>]*>(.*?)</main>",
];

#[derive(Debug, Clone, Copy)]
struct HeuristicPass {
    include_tables: bool,
    filter_boilerplate: bool,
}

const PRECISE_PASS: HeuristicPass = HeuristicPass {
    include_tables: false,
    filter_boilerplate: true,
};

const RELAXED_PASS: HeuristicPass = HeuristicPass {
    include_tables: true,
    filter_boilerplate: false,
};

/// Extract main content text from HTML
///
/// Stages are tried in order until one clears its quality bar:
/// 1. Precise DOM pass: first substantial container from the candidate
///    selector list, boilerplate and tables stripped
/// 2. Relaxed DOM pass: tables admitted, only comment threads stripped
/// 3. Tag-pattern fallback: regex search for `<article>`, a content-class
///    `<div>`, or `<main>`, with tags stripped and entities decoded
///
/// # Arguments
/// * `html` - Raw HTML string
/// * `settings` - Quality thresholds and the truncation cap
///
/// # Returns
/// Cleaned text, or `None` when no stage produced acceptable content
pub fn extract_main_text(html: &str, settings: &ExtractionSettings) -> Option<String> {
    let document = Html::parse_document(html);

    for pass in [PRECISE_PASS, RELAXED_PASS] {
        if let Some(text) = heuristic_pass(&document, pass) {
            if text.len() >= settings.min_text_len {
                return Some(truncate_at_word(&text, settings.max_text_chars));
            }
        }
    }

    let text = tag_pattern_fallback(html)?;
    if text.len() >= settings.min_fallback_len {
        Some(truncate_at_word(&text, settings.max_text_chars))
    } else {
        None
    }
}

/// Extract the page title
pub fn extract_title(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("title").ok()?;

    document
        .select(&selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|title| !title.is_empty())
}

/// One DOM pass: pick a container, gather its content blocks
fn heuristic_pass(document: &Html, pass: HeuristicPass) -> Option<String> {
    for selector_str in CANDIDATE_SELECTORS {
        if let Ok(selector) = Selector::parse(selector_str) {
            if let Some(element) = document.select(&selector).next() {
                let text = collect_block_text(element, pass);
                if text.len() > CANDIDATE_MIN_LEN {
                    return Some(text);
                }
            }
        }
    }

    // No substantial container; gather content blocks document-wide
    let text = collect_block_text(document.root_element(), pass);
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn collect_block_text(root: ElementRef, pass: HeuristicPass) -> String {
    let mut parts: Vec<String> = Vec::new();
    collect_blocks(root, pass, &mut parts);
    parts.join("\n")
}

/// Walk the subtree, collecting top-most content blocks
fn collect_blocks(element: ElementRef, pass: HeuristicPass, parts: &mut Vec<String>) {
    for child in element.children() {
        let child_el = match ElementRef::wrap(child) {
            Some(el) => el,
            None => continue,
        };
        let value = child_el.value();

        if is_excluded(value, pass) {
            continue;
        }

        if is_content_block(value.name(), pass) {
            let mut raw = String::new();
            text_within(child_el, &mut raw);
            let block = clean_text(&raw);
            if !block.is_empty() {
                parts.push(block);
            }
        } else {
            collect_blocks(child_el, pass, parts);
        }
    }
}

/// Gather text below a content block, still skipping excluded subtrees
fn text_within(element: ElementRef, out: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
        } else if let Some(child_el) = ElementRef::wrap(child) {
            if !EXCLUDED_TAGS.contains(&child_el.value().name()) {
                out.push(' ');
                text_within(child_el, out);
            }
        }
    }
}

fn is_content_block(tag: &str, pass: HeuristicPass) -> bool {
    TEXT_BLOCK_TAGS.contains(&tag) || (pass.include_tables && TABLE_CELL_TAGS.contains(&tag))
}

fn is_excluded(element: &Element, pass: HeuristicPass) -> bool {
    let tag = element.name();
    if EXCLUDED_TAGS.contains(&tag) {
        return true;
    }
    if !pass.include_tables && tag == "table" {
        return true;
    }
    if has_class_hint(element, &COMMENT_CLASS_HINTS) {
        return true;
    }
    pass.filter_boilerplate && has_class_hint(element, &BOILERPLATE_CLASS_HINTS)
}

fn has_class_hint(element: &Element, hints: &[&str]) -> bool {
    for class in element.classes() {
        let class = class.to_lowercase();
        if hints.iter().any(|hint| class.contains(hint)) {
            return true;
        }
    }
    if let Some(id) = element.id() {
        let id = id.to_lowercase();
        if hints.iter().any(|hint| id.contains(hint)) {
            return true;
        }
    }
    false
}

/// Last-resort extraction over raw markup
///
/// Non-greedy container matching stops at the first closing tag, so nested
/// containers truncate; acceptable for a stage that only runs when the DOM
/// passes found nothing.
fn tag_pattern_fallback(html: &str) -> Option<String> {
    let script_re = Regex::new(r"(?is)<script[^>]*>.*?</script>").ok()?;
    let style_re = Regex::new(r"(?is)<style[^>]*>.*?</style>").ok()?;
    let stripped = script_re.replace_all(html, " ");
    let stripped = style_re.replace_all(&stripped, " ");

    for pattern in FALLBACK_PATTERNS {
        let re = Regex::new(pattern).ok()?;
        if let Some(captures) = re.captures(&stripped) {
            let inner = captures.get(1)?.as_str();
            return Some(strip_tags(inner));
        }
    }

    None
}

fn strip_tags(fragment: &str) -> String {
    match Regex::new(r"<[^>]+>") {
        Ok(tag_re) => {
            let text = tag_re.replace_all(fragment, " ");
            clean_text(&decode_entities(&text))
        }
        Err(_) => clean_text(&decode_entities(fragment)),
    }
}

/// Decode the entities that commonly survive tag stripping
fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Normalize whitespace to single spaces
fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncate to `max_chars` characters at a word boundary; 0 disables
fn truncate_at_word(text: &str, max_chars: usize) -> String {
    if max_chars == 0 || text.chars().count() <= max_chars {
        return text.to_string();
    }

    let cut = text
        .char_indices()
        .nth(max_chars)
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    let truncated = &text[..cut];
    match truncated.rfind(' ') {
        Some(last_space) => format!("{}...", &truncated[..last_space]),
        None => format!("{}...", truncated),
    }
}
