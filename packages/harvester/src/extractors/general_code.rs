//! General Code (`*.municipal.codes`) extractor.

use std::sync::LazyLock;

use scraper::Selector;

use super::{extract_in_root, locate_entry, Extractor};
use crate::error::Result;
use crate::fetch::Document;
use crate::terms::TermMatcher;
use crate::types::{ChapterRef, ContentBlock, PlatformTag};

#[allow(clippy::expect_used)] // Static selector that is guaranteed to be valid
static TOC_ENTRY: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a.homepage-product-list-item").expect("valid selector"));

const CONTENT_CSS: &str = "div#main-column";

#[allow(clippy::expect_used)] // Static selector that is guaranteed to be valid
static CONTENT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(CONTENT_CSS).expect("valid selector"));

/// Product links on the home page that are not part of the code proper.
const EXCLUDED_PRODUCTS: &[&str] = &["/Tables", "/CFS", "/SSDFS"];

/// Extractor for codes hosted by General Code on `<city>.municipal.codes`.
///
/// The home page lists one `a.homepage-product-list-item` per title; only
/// links into `/Code/` count as chapters. Chapter text lives in
/// `div#main-column`.
#[derive(Debug, Default, Clone, Copy)]
pub struct GeneralCodeExtractor;

impl GeneralCodeExtractor {
    fn is_code_link(href: &str) -> bool {
        href.contains("/Code/") && !EXCLUDED_PRODUCTS.iter().any(|p| href.contains(p))
    }
}

impl Extractor for GeneralCodeExtractor {
    fn platform(&self) -> PlatformTag {
        PlatformTag::GeneralCode
    }

    fn locate_ethics_chapter(
        &self,
        toc: &Document,
        terms: &TermMatcher,
    ) -> Result<Option<ChapterRef>> {
        Ok(locate_entry(toc, &TOC_ENTRY, terms, Self::is_code_link))
    }

    fn extract_content(&self, page: &Document, chapter: &ChapterRef) -> Result<Vec<ContentBlock>> {
        extract_in_root(page, chapter, &CONTENT, CONTENT_CSS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HarvesterError;
    use crate::types::BlockKind;

    const HOME: &str = r#"<html><body>
        <a class="homepage-product-list-item" href="/Tables/Ethics">Ethics Tables</a>
        <a class="homepage-product-list-item" href="/Code/1">Title 1 General Provisions</a>
        <a class="homepage-product-list-item" href="/Code/2.70">Chapter 2.70 Ethics</a>
        <a class="homepage-product-list-item" href="/GenPlan">General Plan</a>
    </body></html>"#;

    #[test]
    fn test_locate_skips_non_code_products() {
        let toc = Document::new("https://provo.municipal.codes/", HOME);
        let chapter = GeneralCodeExtractor
            .locate_ethics_chapter(&toc, &TermMatcher::new(["ethic"]))
            .unwrap()
            .unwrap();
        assert_eq!(chapter.title, "Chapter 2.70 Ethics");
        assert_eq!(chapter.locator_url, "https://provo.municipal.codes/Code/2.70");
        assert_eq!(chapter.document_order_index, 1);
    }

    #[test]
    fn test_locate_no_match_is_none() {
        let toc = Document::new("https://provo.municipal.codes/", HOME);
        let chapter = GeneralCodeExtractor
            .locate_ethics_chapter(&toc, &TermMatcher::new(["code of conduct"]))
            .unwrap();
        assert_eq!(chapter, None);
    }

    #[test]
    fn test_extract_main_column() {
        let chapter = ChapterRef {
            title: "Chapter 2.70 Ethics".to_string(),
            locator_url: "https://provo.municipal.codes/Code/2.70".to_string(),
            document_order_index: 1,
        };
        let page = Document::new(
            "https://provo.municipal.codes/Code/2.70",
            r#"<div id="header">Provo City Code</div>
               <div id="main-column">
                 <h1>Chapter 2.70 Ethics</h1>
                 <h3>2.70.010 Purpose</h3>
                 <p>Public officers shall act with integrity.</p>
               </div>"#,
        );
        let blocks = GeneralCodeExtractor.extract_content(&page, &chapter).unwrap();
        let kinds: Vec<BlockKind> = blocks.iter().map(|b| b.kind).collect();
        assert_eq!(
            kinds,
            vec![BlockKind::Heading, BlockKind::Heading, BlockKind::Paragraph]
        );
        assert_eq!(blocks[1].indent_level, 2);
    }

    #[test]
    fn test_extract_empty_column_is_error() {
        let chapter = ChapterRef {
            title: "Ethics".to_string(),
            locator_url: "https://provo.municipal.codes/Code/2.70".to_string(),
            document_order_index: 0,
        };
        let page = Document::new(
            "https://provo.municipal.codes/Code/2.70",
            r#"<div id="main-column">   </div>"#,
        );
        let err = GeneralCodeExtractor
            .extract_content(&page, &chapter)
            .unwrap_err();
        assert!(matches!(err, HarvesterError::Extraction { .. }));
    }
}
