//! Municode library and Municipal Code Online extractors.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use super::{extract_generic, locate_entry, non_empty, Extractor, LINKS};
use crate::error::{HarvesterError, Result};
use crate::fetch::Document;
use crate::html;
use crate::terms::TermMatcher;
use crate::types::{ChapterRef, ContentBlock, PlatformTag};

/// Extractor for library.municode.com.
///
/// Any link on the table of contents whose text matches counts as an entry;
/// the chapter page is read through the generic lookup.
#[derive(Debug, Default, Clone, Copy)]
pub struct MunicodeExtractor;

impl Extractor for MunicodeExtractor {
    fn platform(&self) -> PlatformTag {
        PlatformTag::Municode
    }

    fn locate_ethics_chapter(
        &self,
        toc: &Document,
        terms: &TermMatcher,
    ) -> Result<Option<ChapterRef>> {
        Ok(locate_entry(toc, &LINKS, terms, |_| true))
    }

    fn extract_content(&self, page: &Document, chapter: &ChapterRef) -> Result<Vec<ContentBlock>> {
        extract_generic(page, chapter)
    }
}

const MCO_CONTENTS_CSS: &str = "div#contents.loadable";

#[allow(clippy::expect_used)] // Static selector that is guaranteed to be valid
static MCO_CONTENTS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(MCO_CONTENTS_CSS).expect("valid selector"));

#[allow(clippy::expect_used)] // Static selector that is guaranteed to be valid
static MCO_SECTION_NAME: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.phx-name").expect("valid selector"));

#[allow(clippy::expect_used)] // Static selector that is guaranteed to be valid
static MCO_HEADING_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a.k-link").expect("valid selector"));

/// Extractor for municipalcodeonline.com.
///
/// The whole book is one page. Section headings are `div.phx-name` blocks
/// inside `div#contents`, and a section's text is the run of siblings that
/// follows its heading up to the next heading or history note.
#[derive(Debug, Default, Clone, Copy)]
pub struct MunicipalCodeOnlineExtractor;

/// A section heading on a Municipal Code Online page.
struct SectionHeading<'a> {
    element: ElementRef<'a>,
    title: String,
    locator_url: String,
}

impl MunicipalCodeOnlineExtractor {
    fn contents<'a>(parsed: &'a Html, page: &Document) -> Result<ElementRef<'a>> {
        parsed.select(&MCO_CONTENTS).next().ok_or_else(|| {
            HarvesterError::extraction(
                &page.url,
                format!("table of contents '{MCO_CONTENTS_CSS}' not found"),
            )
        })
    }

    /// Section headings with a title, in document order.
    fn headings<'a>(contents: ElementRef<'a>, page_url: &str) -> Vec<SectionHeading<'a>> {
        contents
            .select(&MCO_SECTION_NAME)
            .filter_map(|element| {
                let link = element.select(&MCO_HEADING_LINK).next()?;
                let title = html::text_of(link);
                if title.is_empty() {
                    return None;
                }
                let locator_url = link
                    .value()
                    .attr("href")
                    .and_then(|href| html::resolve_url(page_url, href))
                    .or_else(|| {
                        element
                            .value()
                            .id()
                            .and_then(|id| html::resolve_url(page_url, &format!("#{id}")))
                    })
                    .unwrap_or_else(|| page_url.to_string());
                Some(SectionHeading {
                    element,
                    title,
                    locator_url,
                })
            })
            .collect()
    }

    fn is_boundary(element: ElementRef<'_>) -> bool {
        html::has_class(element, "phx-name")
            || html::has_class(element, "phx-docs")
            || element.select(&MCO_SECTION_NAME).next().is_some()
    }
}

impl Extractor for MunicipalCodeOnlineExtractor {
    fn platform(&self) -> PlatformTag {
        PlatformTag::MunicipalCodeOnline
    }

    fn locate_ethics_chapter(
        &self,
        toc: &Document,
        terms: &TermMatcher,
    ) -> Result<Option<ChapterRef>> {
        let parsed = toc.parse();
        let contents = Self::contents(&parsed, toc)?;
        let chapter = Self::headings(contents, &toc.url)
            .into_iter()
            .enumerate()
            .find(|(_, heading)| terms.matches(&heading.title))
            .map(|(index, heading)| ChapterRef {
                title: heading.title,
                locator_url: heading.locator_url,
                document_order_index: index,
            });
        Ok(chapter)
    }

    fn extract_content(&self, page: &Document, chapter: &ChapterRef) -> Result<Vec<ContentBlock>> {
        let parsed = page.parse();
        let contents = Self::contents(&parsed, page)?;
        let headings = Self::headings(contents, &page.url);

        let heading = headings
            .get(chapter.document_order_index)
            .filter(|h| h.title == chapter.title)
            .or_else(|| headings.iter().find(|h| h.title == chapter.title))
            .ok_or_else(|| {
                HarvesterError::extraction(
                    &page.url,
                    format!("section heading '{}' not found", chapter.title),
                )
            })?;

        // Headings are usually wrapped; the text follows the wrapper.
        let start = match heading.element.parent().and_then(ElementRef::wrap) {
            Some(parent) if *parent != *contents => parent,
            _ => heading.element,
        };

        let mut blocks = vec![ContentBlock::heading(heading.title.clone(), 1)];
        blocks.extend(html::sibling_blocks(start, Self::is_boundary));
        // The heading alone is not a chapter.
        if blocks.len() == 1 {
            blocks.clear();
        }
        non_empty(blocks, page, chapter)
    }
}
