//! eCode360 extractor.

use std::sync::LazyLock;

use scraper::Selector;

use super::{locate_entry, non_empty, Extractor};
use crate::error::Result;
use crate::fetch::Document;
use crate::html;
use crate::terms::TermMatcher;
use crate::types::{ChapterRef, ContentBlock, PlatformTag};

#[allow(clippy::expect_used)] // Static selector that is guaranteed to be valid
static TITLE_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a.titleLink").expect("valid selector"));

const PAGE_CONTENT_CSS: &str = "div#page-content";

#[allow(clippy::expect_used)] // Static selector that is guaranteed to be valid
static PAGE_CONTENT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(PAGE_CONTENT_CSS).expect("valid selector"));

#[allow(clippy::expect_used)] // Static selector that is guaranteed to be valid
static BODY: LazyLock<Selector> = LazyLock::new(|| Selector::parse("body").expect("valid selector"));

/// Extractor for codes on ecode360.com.
///
/// Chapters are `a.titleLink` entries whose hrefs are bare numeric ids
/// relative to the host. Chapter pages are rendered client side into
/// `div#page-content`; a page without it (a bot challenge) never becomes
/// ready.
#[derive(Debug, Default, Clone, Copy)]
pub struct Ecode360Extractor;

impl Extractor for Ecode360Extractor {
    fn platform(&self) -> PlatformTag {
        PlatformTag::Ecode360
    }

    fn content_ready_selector(&self) -> Option<&'static str> {
        Some(PAGE_CONTENT_CSS)
    }

    fn locate_ethics_chapter(
        &self,
        toc: &Document,
        terms: &TermMatcher,
    ) -> Result<Option<ChapterRef>> {
        Ok(locate_entry(toc, &TITLE_LINK, terms, |_| true))
    }

    fn extract_content(&self, page: &Document, chapter: &ChapterRef) -> Result<Vec<ContentBlock>> {
        let parsed = page.parse();
        let blocks = parsed
            .select(&PAGE_CONTENT)
            .next()
            .or_else(|| parsed.select(&BODY).next())
            .map(html::collect_blocks)
            .unwrap_or_default();
        non_empty(blocks, page, chapter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const HOME: &str = r#"<html><body>
        <div id="toc">
          <a class="titleLink" href="8555600">Chapter 1 General Provisions</a>
          <a class="titleLink" href="8555611">Chapter 12 Code of Ethics</a>
          <a class="titleLink" href="8555700">Chapter 15 Ethics Board</a>
        </div>
        <a href="/help">Ethics help</a>
    </body></html>"#;

    #[test]
    fn test_locate_title_link() {
        let toc = Document::new("https://ecode360.com/MA1379", HOME);
        let chapter = Ecode360Extractor
            .locate_ethics_chapter(&toc, &TermMatcher::new(["ethic"]))
            .unwrap()
            .unwrap();
        assert_eq!(chapter.title, "Chapter 12 Code of Ethics");
        assert_eq!(chapter.locator_url, "https://ecode360.com/8555611");
        assert_eq!(chapter.document_order_index, 1);
    }

    #[test]
    fn test_extract_page_content() {
        let chapter = ChapterRef {
            title: "Chapter 12 Code of Ethics".to_string(),
            locator_url: "https://ecode360.com/8555611".to_string(),
            document_order_index: 1,
        };
        let page = Document::new(
            "https://ecode360.com/8555611",
            r#"<div id="header">Town of Malta</div>
               <div id="page-content">
                 <h2>Chapter 12 Code of Ethics</h2>
                 <div class="contentText">Officers shall strive to act in the public's best interest.</div>
               </div>"#,
        );
        let blocks = Ecode360Extractor.extract_content(&page, &chapter).unwrap();
        assert_eq!(
            blocks,
            vec![
                ContentBlock::heading("Chapter 12 Code of Ethics", 1),
                ContentBlock::paragraph(
                    "Officers shall strive to act in the public's best interest.",
                    0
                ),
            ]
        );
        let found = Ecode360Extractor
            .detect_aspirational(&blocks, &TermMatcher::new(["strive", "best interest"]));
        assert_eq!(found.len(), 2);
        assert_eq!(Ecode360Extractor.content_ready_selector(), Some("div#page-content"));
    }
}
