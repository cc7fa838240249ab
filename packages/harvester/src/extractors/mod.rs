//! Extractor contract and the platform extractors.
//!
//! Every hosting platform lays out its table of contents and chapter pages
//! differently, but the orchestrator only ever sees the [`Extractor`] trait.
//! Extractors hold no state between calls; they are functions over a
//! fetched [`Document`].

mod ecode360;
mod general_code;
mod hosted;
mod municode;

use std::collections::BTreeSet;
use std::sync::LazyLock;

use scraper::Selector;

use crate::error::{HarvesterError, Result};
use crate::fetch::Document;
use crate::html;
use crate::terms::TermMatcher;
use crate::types::{ChapterRef, ContentBlock, PlatformTag};

pub use ecode360::Ecode360Extractor;
pub use general_code::GeneralCodeExtractor;
pub use hosted::{AmlegalExtractor, CivicLinQExtractor, CodePublishingExtractor, EncodePlusExtractor};
pub use municode::{MunicipalCodeOnlineExtractor, MunicodeExtractor};

/// Capability set shared by all platform extractors.
pub trait Extractor: Send + Sync {
    /// Platform this extractor handles.
    fn platform(&self) -> PlatformTag;

    /// Selector that must be present before a table of contents is scanned.
    fn toc_ready_selector(&self) -> Option<&'static str> {
        None
    }

    /// Selector that must be present before chapter content is extracted.
    fn content_ready_selector(&self) -> Option<&'static str> {
        None
    }

    /// Find the first table-of-contents entry whose title matches any term.
    ///
    /// `Ok(None)` means the table of contents was readable but nothing
    /// matched. An unreadable table of contents is an extraction error.
    fn locate_ethics_chapter(
        &self,
        toc: &Document,
        terms: &TermMatcher,
    ) -> Result<Option<ChapterRef>>;

    /// Walk the chapter's subtree into ordered content blocks.
    ///
    /// `page` is the document loaded from `chapter.locator_url`. Fails when
    /// the expected structure is missing or yields no content.
    fn extract_content(&self, page: &Document, chapter: &ChapterRef) -> Result<Vec<ContentBlock>>;

    /// Discretionary terms occurring anywhere in the blocks.
    fn detect_aspirational(
        &self,
        blocks: &[ContentBlock],
        terms: &TermMatcher,
    ) -> BTreeSet<String> {
        detect_terms(blocks, terms)
    }
}

/// Case-insensitive substring detection over every block's text.
///
/// # Examples
/// ```
/// use ethics_harvester::extractors::detect_terms;
/// use ethics_harvester::terms::TermMatcher;
/// use ethics_harvester::types::ContentBlock;
///
/// let blocks = vec![ContentBlock::paragraph("Members shall endeavor to serve.", 0)];
/// let found = detect_terms(&blocks, &TermMatcher::new(["shall endeavor", "strive"]));
/// assert!(found.contains("shall endeavor"));
/// assert_eq!(found.len(), 1);
/// ```
#[must_use]
pub fn detect_terms(blocks: &[ContentBlock], terms: &TermMatcher) -> BTreeSet<String> {
    blocks
        .iter()
        .flat_map(|block| terms.matched_terms(&block.text))
        .collect()
}

#[allow(clippy::expect_used)] // Static selector that is guaranteed to be valid
pub(crate) static LINKS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid selector"));

/// First matching TOC entry, counting only entries accepted by `accept_href`.
pub(crate) fn locate_entry(
    toc: &Document,
    entries: &Selector,
    terms: &TermMatcher,
    accept_href: impl Fn(&str) -> bool,
) -> Option<ChapterRef> {
    let parsed = toc.parse();
    html::scan_toc(&parsed, &toc.url, entries, terms, accept_href)
}

/// Section named by the locator's fragment, if the page has that anchor.
fn anchored_blocks(parsed: &scraper::Html, chapter: &ChapterRef) -> Option<Vec<ContentBlock>> {
    html::fragment_of(&chapter.locator_url)
        .and_then(|fragment| html::find_anchor(parsed, &fragment))
        .map(html::section_blocks)
}

/// Blocks of a chapter whose platform keeps chapter text in a known root.
///
/// A locator fragment that names an element on the page selects that
/// section; otherwise the whole root is the chapter.
pub(crate) fn extract_in_root(
    page: &Document,
    chapter: &ChapterRef,
    root: &Selector,
    root_css: &str,
) -> Result<Vec<ContentBlock>> {
    let parsed = page.parse();
    let blocks = match anchored_blocks(&parsed, chapter) {
        Some(blocks) => blocks,
        None => {
            let root = parsed.select(root).next().ok_or_else(|| {
                HarvesterError::extraction(&page.url, format!("content root '{root_css}' not found"))
            })?;
            html::collect_blocks(root)
        }
    };
    non_empty(blocks, page, chapter)
}

/// Blocks of a chapter on a page with no platform-specific layout.
///
/// Tried in order: the locator's fragment, a heading carrying the chapter
/// title, the page's main content area.
pub(crate) fn extract_generic(page: &Document, chapter: &ChapterRef) -> Result<Vec<ContentBlock>> {
    let parsed = page.parse();
    let blocks = anchored_blocks(&parsed, chapter)
        .or_else(|| html::find_heading(&parsed, &chapter.title).map(html::section_blocks))
        .or_else(|| html::main_content(&parsed).map(html::collect_blocks))
        .unwrap_or_default();
    non_empty(blocks, page, chapter)
}

/// Reject a chapter that produced no content.
pub(crate) fn non_empty(
    blocks: Vec<ContentBlock>,
    page: &Document,
    chapter: &ChapterRef,
) -> Result<Vec<ContentBlock>> {
    if blocks.is_empty() {
        return Err(HarvesterError::extraction(
            &page.url,
            format!("chapter '{}' has no content", chapter.title),
        ));
    }
    Ok(blocks)
}
