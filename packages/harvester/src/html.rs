//! HTML navigation helpers shared by the extractors.
//!
//! Table-of-contents scanning, anchor lookup and the block walker that turns
//! a chapter subtree into ordered [`ContentBlock`]s.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use unicode_normalization::UnicodeNormalization;
use url::Url;

use crate::terms::TermMatcher;
use crate::types::{ChapterRef, ContentBlock};

/// Elements whose content is never part of a chapter.
const SKIPPED_TAGS: &[&str] = &[
    "script", "style", "nav", "noscript", "template", "head", "button", "form", "select",
    "iframe",
];

/// Elements that start a new block.
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "body", "dd", "div", "dl", "dt", "fieldset",
    "figure", "footer", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "html", "li",
    "main", "ol", "p", "pre", "section", "table", "tbody", "td", "tfoot", "th", "thead", "tr",
    "ul", "br",
];

#[allow(clippy::expect_used)] // Static selector that is guaranteed to be valid
static ANCHOR_TARGETS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("[id], a[name]").expect("valid selector"));

#[allow(clippy::expect_used)] // Static selector that is guaranteed to be valid
static HEADINGS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h1, h2, h3, h4, h5, h6").expect("valid selector"));

#[allow(clippy::expect_used)] // Static selector that is guaranteed to be valid
static CONTENT_AREAS: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("div[class], article[class], section[class]").expect("valid selector")
});

#[allow(clippy::expect_used)] // Static selector that is guaranteed to be valid
static BODY: LazyLock<Selector> = LazyLock::new(|| Selector::parse("body").expect("valid selector"));

/// Class names that mark a content area.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static CONTENT_CLASS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("content|main|body|text|section").expect("valid regex"));

#[allow(clippy::expect_used)] // Static selector that is guaranteed to be valid
static LINKS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid selector"));

/// Collapse whitespace and NFC-normalise.
///
/// # Examples
/// ```
/// use ethics_harvester::html::normalize_text;
///
/// assert_eq!(normalize_text("  Sec.\u{a0}2.30.010\n  Purpose "), "Sec. 2.30.010 Purpose");
/// ```
#[must_use]
pub fn normalize_text(text: &str) -> String {
    let composed: String = text.nfc().collect();
    composed.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalised text content of an element, skipping script and style.
#[must_use]
pub fn text_of(element: ElementRef<'_>) -> String {
    let mut raw = String::new();
    collect_text(element, &mut raw, false);
    normalize_text(&raw)
}

fn collect_text(element: ElementRef<'_>, out: &mut String, skip_lists: bool) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
        } else if let Some(child_el) = ElementRef::wrap(child) {
            let name = child_el.value().name();
            if SKIPPED_TAGS.contains(&name) || (skip_lists && matches!(name, "ul" | "ol")) {
                continue;
            }
            if is_block(name) {
                out.push(' ');
            }
            collect_text(child_el, out, skip_lists);
        }
    }
}

/// Resolve `href` against `base`.
///
/// # Examples
/// ```
/// use ethics_harvester::html::resolve_url;
///
/// assert_eq!(
///     resolve_url("https://provo.municipal.codes/Code", "/Code/2.70").as_deref(),
///     Some("https://provo.municipal.codes/Code/2.70")
/// );
/// ```
#[must_use]
pub fn resolve_url(base: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with("javascript:") || href.starts_with("mailto:") {
        return None;
    }
    let base = Url::parse(base).ok()?;
    base.join(href).ok().map(String::from)
}

/// Fragment of a URL, if any.
#[must_use]
pub fn fragment_of(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()?
        .fragment()
        .filter(|f| !f.is_empty())
        .map(str::to_string)
}

/// URL without its fragment, for page identity comparisons.
#[must_use]
pub fn without_fragment(url: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) => {
            parsed.set_fragment(None);
            parsed.to_string()
        }
        Err(_) => url.split('#').next().unwrap_or(url).to_string(),
    }
}

/// Host of a URL, lowercased.
#[must_use]
pub fn host_of(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()?
        .host_str()
        .map(|h| h.to_ascii_lowercase())
}

/// Href of a TOC entry: the element's own `href`, or its first link.
fn entry_href(entry: ElementRef<'_>) -> Option<String> {
    if let Some(href) = entry.value().attr("href") {
        return Some(href.to_string());
    }
    entry
        .select(&LINKS)
        .next()
        .and_then(|a| a.value().attr("href"))
        .map(str::to_string)
}

/// Scan table-of-contents entries in document order and return the first
/// whose title matches any term.
///
/// Entries without a title or a resolvable link are not counted.
/// `accept_href` filters entries by their raw href before they are counted.
///
/// # Arguments
/// * `html` - Parsed TOC page
/// * `base_url` - URL the page was loaded from
/// * `entries` - Selector for TOC entries
/// * `terms` - Ethics terms
/// * `accept_href` - Platform-specific link filter
pub fn scan_toc(
    html: &Html,
    base_url: &str,
    entries: &Selector,
    terms: &TermMatcher,
    accept_href: impl Fn(&str) -> bool,
) -> Option<ChapterRef> {
    let mut index = 0;
    for entry in html.select(entries) {
        let title = text_of(entry);
        if title.is_empty() {
            continue;
        }
        let Some(href) = entry_href(entry) else {
            continue;
        };
        if !accept_href(&href) {
            continue;
        }
        let Some(locator_url) = resolve_url(base_url, &href) else {
            continue;
        };
        if terms.matches(&title) {
            return Some(ChapterRef {
                title,
                locator_url,
                document_order_index: index,
            });
        }
        index += 1;
    }
    None
}

/// Find the element an in-page fragment points at (`id` or `a[name]`).
#[must_use]
pub fn find_anchor<'a>(html: &'a Html, fragment: &str) -> Option<ElementRef<'a>> {
    html.select(&ANCHOR_TARGETS).find(|el| {
        el.value().id() == Some(fragment) || el.value().attr("name") == Some(fragment)
    })
}

/// First heading outside navigation whose text is `title`, or contains it.
/// Case is ignored.
#[must_use]
pub fn find_heading<'a>(html: &'a Html, title: &str) -> Option<ElementRef<'a>> {
    let wanted = normalize_text(title).to_lowercase();
    if wanted.is_empty() {
        return None;
    }
    html.select(&HEADINGS)
        .filter(|heading| !in_skipped(*heading))
        .find(|heading| text_of(*heading).to_lowercase().contains(&wanted))
}

/// Main content area of a page: the first `div`, `article` or `section`
/// with a content-like class, else `body`.
#[must_use]
pub fn main_content(html: &Html) -> Option<ElementRef<'_>> {
    html.select(&CONTENT_AREAS)
        .filter(|area| !in_skipped(*area))
        .find(|area| area.value().classes().any(|c| CONTENT_CLASS.is_match(c)))
        .or_else(|| html.select(&BODY).next())
}

fn in_skipped(element: ElementRef<'_>) -> bool {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|a| SKIPPED_TAGS.contains(&a.value().name()))
}

/// Blocks of every child of `root`, in document order.
#[must_use]
pub fn collect_blocks(root: ElementRef<'_>) -> Vec<ContentBlock> {
    let mut walker = BlockWalker::default();
    walker.walk_children(root, 0);
    walker.finish()
}

/// Blocks of the section an anchor points at.
///
/// An anchor inside a heading selects that heading and its following
/// siblings up to the next heading of the same or a higher rank. An empty
/// inline marker (`<a name="..."></a>`) selects the section that starts
/// after it. An anchor on a container selects the container's content.
#[must_use]
pub fn section_blocks(anchor: ElementRef<'_>) -> Vec<ContentBlock> {
    let mut target = anchor;
    while !is_block(target.value().name()) {
        match target.parent().and_then(ElementRef::wrap) {
            Some(parent) => target = parent,
            None => break,
        }
    }

    match heading_rank(target.value().name()) {
        Some(rank) => heading_section(target, rank),
        None if is_marker(anchor) => marker_section(empty_wrapper(anchor)),
        None => collect_blocks(target),
    }
}

/// An inline element without text, used only as a link target.
fn is_marker(element: ElementRef<'_>) -> bool {
    !is_block(element.value().name()) && is_empty(element)
}

/// Outermost ancestor of a marker that holds no text of its own.
fn empty_wrapper(marker: ElementRef<'_>) -> ElementRef<'_> {
    let mut current = marker;
    while let Some(parent) = current.parent().and_then(ElementRef::wrap) {
        if matches!(parent.value().name(), "body" | "html") || !is_empty(parent) {
            break;
        }
        current = parent;
    }
    current
}

fn is_empty(element: ElementRef<'_>) -> bool {
    element.text().all(|t| t.trim().is_empty())
}

/// Whether an element is an empty link target, or only wraps one.
fn is_target_marker(element: ElementRef<'_>) -> bool {
    is_empty(element)
        && (element.value().id().is_some()
            || element.value().attr("name").is_some()
            || element.select(&ANCHOR_TARGETS).next().is_some())
}

/// Section following an empty marker: the next heading's section when the
/// marker sits right before a heading, otherwise the siblings up to the
/// next marker or heading.
fn marker_section(marker: ElementRef<'_>) -> Vec<ContentBlock> {
    let next = marker.next_siblings().find_map(ElementRef::wrap);
    if let Some(heading) = next {
        if let Some(rank) = heading_rank(heading.value().name()) {
            return heading_section(heading, rank);
        }
    }
    sibling_blocks(marker, |el| {
        heading_rank(el.value().name()).is_some() || is_target_marker(el)
    })
}

/// A heading and its following siblings up to the next heading of the same
/// or a higher rank.
fn heading_section(heading: ElementRef<'_>, rank: u8) -> Vec<ContentBlock> {
    let mut walker = BlockWalker::default();
    walker.visit_element(heading, 0);
    for sibling in heading.next_siblings() {
        if let Some(text) = sibling.value().as_text() {
            walker.inline.push_str(text);
        } else if let Some(el) = ElementRef::wrap(sibling) {
            if heading_rank(el.value().name()).is_some_and(|r| r <= rank) {
                break;
            }
            walker.visit_element(el, 0);
        }
    }
    walker.finish()
}

/// Collects blocks from sibling elements until `stop` returns true.
///
/// Used where a chapter is a run of siblings rather than a subtree.
#[must_use]
pub fn sibling_blocks(
    start: ElementRef<'_>,
    stop: impl Fn(ElementRef<'_>) -> bool,
) -> Vec<ContentBlock> {
    let mut walker = BlockWalker::default();
    for sibling in start.next_siblings() {
        if let Some(text) = sibling.value().as_text() {
            walker.inline.push_str(text);
        } else if let Some(el) = ElementRef::wrap(sibling) {
            if stop(el) {
                break;
            }
            walker.flush(0);
            walker.visit_element(el, 0);
        }
    }
    walker.finish()
}

/// Whether the element carries the given class.
#[must_use]
pub fn has_class(element: ElementRef<'_>, class: &str) -> bool {
    element.value().classes().any(|c| c == class)
}

fn is_block(name: &str) -> bool {
    BLOCK_TAGS.contains(&name)
}

fn heading_rank(name: &str) -> Option<u8> {
    match name {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        "h4" => Some(4),
        "h5" => Some(5),
        "h6" => Some(6),
        _ => None,
    }
}

/// Depth-first walk emitting blocks in document order.
#[derive(Default)]
struct BlockWalker {
    blocks: Vec<ContentBlock>,
    /// Pending inline text between block elements.
    inline: String,
}

impl BlockWalker {
    fn finish(mut self) -> Vec<ContentBlock> {
        self.flush(0);
        self.blocks
    }

    fn push(&mut self, block: ContentBlock) {
        if !block.text.is_empty() {
            self.blocks.push(block);
        }
    }

    fn flush(&mut self, depth: u8) {
        if self.inline.trim().is_empty() {
            self.inline.clear();
            return;
        }
        let text = normalize_text(&self.inline);
        self.inline.clear();
        self.push(ContentBlock::paragraph(text, depth));
    }

    fn walk_children(&mut self, element: ElementRef<'_>, depth: u8) {
        for child in element.children() {
            if let Some(text) = child.value().as_text() {
                self.inline.push_str(text);
            } else if let Some(child_el) = ElementRef::wrap(child) {
                self.visit_element(child_el, depth);
            }
        }
        self.flush(depth);
    }

    fn visit_element(&mut self, element: ElementRef<'_>, depth: u8) {
        let name = element.value().name();
        if SKIPPED_TAGS.contains(&name) {
            return;
        }
        if !is_block(name) {
            let mut raw = String::new();
            collect_text(element, &mut raw, false);
            self.inline.push_str(&raw);
            return;
        }

        self.flush(depth);

        if let Some(rank) = heading_rank(name) {
            self.push(ContentBlock::heading(text_of(element), rank - 1));
            return;
        }

        match name {
            "p" | "pre" | "dt" | "dd" => {
                self.push(ContentBlock::paragraph(text_of(element), depth));
            }
            "ul" | "ol" => self.walk_children(element, depth.saturating_add(1)),
            "li" => {
                let mut raw = String::new();
                collect_text(element, &mut raw, true);
                self.push(ContentBlock::list_item(
                    normalize_text(&raw),
                    depth.saturating_sub(1),
                ));
                for nested in element.children().filter_map(ElementRef::wrap) {
                    if matches!(nested.value().name(), "ul" | "ol") {
                        self.visit_element(nested, depth);
                    }
                }
            }
            "tr" => {
                let cells: Vec<String> = element
                    .children()
                    .filter_map(ElementRef::wrap)
                    .filter(|c| matches!(c.value().name(), "td" | "th"))
                    .map(text_of)
                    .filter(|t| !t.is_empty())
                    .collect();
                self.push(ContentBlock::paragraph(cells.join(" | "), depth));
            }
            "br" | "hr" => {}
            _ => self.walk_children(element, depth),
        }
    }
}
