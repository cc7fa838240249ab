//! Extractors for platforms that render their table of contents with
//! JavaScript and share no stable markup worth keying on.
//!
//! Amlegal, CivicLinQ, Code Publishing and EncodePlus are all read the same
//! way: every link on the table-of-contents page is a candidate entry, and a
//! chapter page is read through the generic lookup in
//! [`extract_generic`](super::extract_generic). Code Publishing puts several
//! chapters on one page and links them by `#anchor`; the fragment lookup
//! handles that case for all four.

use super::{extract_generic, locate_entry, Extractor, LINKS};
use crate::error::Result;
use crate::fetch::Document;
use crate::terms::TermMatcher;
use crate::types::{ChapterRef, ContentBlock, PlatformTag};

/// Declares a link-scanning extractor.
macro_rules! hosted_extractor {
    (
        $(#[$meta:meta])*
        $name:ident => $platform:expr
    ) => {
        $(#[$meta])*
        #[derive(Debug, Default, Clone, Copy)]
        pub struct $name;

        impl Extractor for $name {
            fn platform(&self) -> PlatformTag {
                $platform
            }

            fn locate_ethics_chapter(
                &self,
                toc: &Document,
                terms: &TermMatcher,
            ) -> Result<Option<ChapterRef>> {
                Ok(locate_entry(toc, &LINKS, terms, |_| true))
            }

            fn extract_content(
                &self,
                page: &Document,
                chapter: &ChapterRef,
            ) -> Result<Vec<ContentBlock>> {
                extract_generic(page, chapter)
            }
        }
    };
}

hosted_extractor! {
    /// Extractor for American Legal Publishing's code library.
    AmlegalExtractor => PlatformTag::Amlegal
}

hosted_extractor! {
    /// Extractor for CivicLinQ hosted codes.
    CivicLinQExtractor => PlatformTag::CivicLinQ
}

hosted_extractor! {
    /// Extractor for codepublishing.com.
    CodePublishingExtractor => PlatformTag::CodePublishing
}

hosted_extractor! {
    /// Extractor for EncodePlus online regulations.
    EncodePlusExtractor => PlatformTag::EncodePlus
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SANDY: &str = "https://www.codepublishing.com/UT/Sandy/html/Sandy02.html";

    #[test]
    fn test_platforms() {
        assert_eq!(AmlegalExtractor.platform(), PlatformTag::Amlegal);
        assert_eq!(CivicLinQExtractor.platform(), PlatformTag::CivicLinQ);
        assert_eq!(CodePublishingExtractor.platform(), PlatformTag::CodePublishing);
        assert_eq!(EncodePlusExtractor.platform(), PlatformTag::EncodePlus);
    }

    #[test]
    fn test_no_ready_selectors() {
        assert_eq!(AmlegalExtractor.toc_ready_selector(), None);
        assert_eq!(CodePublishingExtractor.content_ready_selector(), None);
    }

    #[test]
    fn test_code_publishing_anchor_section() {
        let page = Document::new(
            SANDY,
            r#"<div id="toc">
                 <a href="Sandy02.html#2.10">2.10 Council</a>
                 <a href="Sandy02.html#2.30">2.30 Ethics</a>
               </div>
               <div id="mainContent">
                 <h3><a name="2.10"></a>Chapter 2.10 Council</h3>
                 <p>The council consists of five members.</p>
                 <h3><a name="2.30"></a>Chapter 2.30 Ethics</h3>
                 <p>Members shall strive to avoid conflicts.</p>
                 <ol><li>Disclose gifts.</li><li>Recuse when interested.</li></ol>
                 <h3><a name="2.40"></a>Chapter 2.40 Elections</h3>
                 <p>Elections are held in November.</p>
               </div>"#,
        );
        let terms = TermMatcher::new(["ethic"]);
        let chapter = CodePublishingExtractor
            .locate_ethics_chapter(&page, &terms)
            .unwrap()
            .unwrap();
        assert_eq!(chapter.locator_url, format!("{SANDY}#2.30"));

        let blocks = CodePublishingExtractor.extract_content(&page, &chapter).unwrap();
        assert_eq!(
            blocks,
            vec![
                ContentBlock::heading("Chapter 2.30 Ethics", 2),
                ContentBlock::paragraph("Members shall strive to avoid conflicts.", 0),
                ContentBlock::list_item("Disclose gifts.", 0),
                ContentBlock::list_item("Recuse when interested.", 0),
            ]
        );
    }

    #[test]
    fn test_code_publishing_marker_before_heading() {
        let page = Document::new(
            SANDY,
            r#"<div id="mainContent">
                 <a name="2.10"></a><h3>Chapter 2.10 Council</h3>
                 <p>The council consists of five members.</p>
                 <a name="2.30"></a><h3>Chapter 2.30 Ethics</h3>
                 <p>Members shall strive to avoid conflicts.</p>
                 <a name="2.40"></a><h3>Chapter 2.40 Elections</h3>
                 <p>Elections are held in November.</p>
               </div>"#,
        );
        let chapter = ChapterRef {
            title: "2.30 Ethics".to_string(),
            locator_url: format!("{SANDY}#2.30"),
            document_order_index: 1,
        };

        let blocks = CodePublishingExtractor.extract_content(&page, &chapter).unwrap();
        assert_eq!(
            blocks,
            vec![
                ContentBlock::heading("Chapter 2.30 Ethics", 2),
                ContentBlock::paragraph("Members shall strive to avoid conflicts.", 0),
            ]
        );
        let found = CodePublishingExtractor
            .detect_aspirational(&blocks, &TermMatcher::new(["strive", "best interest"]));
        assert_eq!(found.into_iter().collect::<Vec<_>>(), vec!["strive".to_string()]);
    }

    #[test]
    fn test_amlegal_link_anywhere_in_toc() {
        let toc = Document::new(
            "https://codelibrary.amlegal.com/codes/loganut/latest/logan_ut/0-0-0-1",
            r#"<header><a href="/codes/loganut/latest/overview">Logan City Code</a></header>
               <nav class="toc">
                 <a href="/codes/loganut/latest/logan_ut/0-0-0-300">Chapter 2.40 Council</a>
                 <a href="/codes/loganut/latest/logan_ut/0-0-0-500">Chapter 2.44 Code of Ethics</a>
               </nav>"#,
        );
        let chapter = AmlegalExtractor
            .locate_ethics_chapter(&toc, &TermMatcher::new(["ethic"]))
            .unwrap()
            .unwrap();
        assert_eq!(chapter.title, "Chapter 2.44 Code of Ethics");
        assert_eq!(
            chapter.locator_url,
            "https://codelibrary.amlegal.com/codes/loganut/latest/logan_ut/0-0-0-500"
        );
        assert_eq!(chapter.document_order_index, 2);
    }

    #[test]
    fn test_amlegal_chapter_page() {
        let chapter = ChapterRef {
            title: "Chapter 2.44 Code of Ethics".to_string(),
            locator_url: "https://codelibrary.amlegal.com/codes/loganut/latest/logan_ut/0-0-0-500"
                .to_string(),
            document_order_index: 2,
        };
        let page = Document::new(
            chapter.locator_url.clone(),
            r#"<body><nav><a href="/">Home</a></nav>
               <h2>Chapter 2.44 Code of Ethics</h2><p>Employees shall seek to serve.</p>
               <h2>Chapter 2.48 Purchasing</h2><p>Bids are sealed.</p></body>"#,
        );
        let blocks = AmlegalExtractor.extract_content(&page, &chapter).unwrap();
        assert_eq!(blocks.len(), 2);
        let found = AmlegalExtractor.detect_aspirational(&blocks, &TermMatcher::new(["seek to"]));
        assert!(found.contains("seek to"));
    }

    #[test]
    fn test_encodeplus_no_match() {
        let toc = Document::new(
            "https://online.encodeplus.com/regs/orem-ut/index.aspx",
            r#"<div class="toc-node"><a href="doc-viewer.aspx#secid-1">Zoning</a></div>"#,
        );
        let chapter = EncodePlusExtractor
            .locate_ethics_chapter(&toc, &TermMatcher::new(["ethic"]))
            .unwrap();
        assert_eq!(chapter, None);
    }
}
