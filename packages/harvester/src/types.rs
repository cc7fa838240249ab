//! Core data types for the harvester.
//!
//! These types describe municipalities, the platforms that host their codes,
//! located chapters, extracted content and per-municipality outcomes.

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;

/// Municipal code hosting platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatformTag {
    /// Municipal Code Online (municipalcodeonline.com).
    MunicipalCodeOnline,

    /// Municode library (library.municode.com).
    Municode,

    /// General Code hosted codes (*.municipal.codes).
    GeneralCode,

    /// American Legal Publishing code library.
    Amlegal,

    /// CivicLinQ hosting.
    #[serde(rename = "civiclinq")]
    CivicLinQ,

    /// Code Publishing (codepublishing.com).
    CodePublishing,

    /// EncodePlus online codes.
    #[serde(rename = "encodeplus")]
    EncodePlus,

    /// General Code eCode360.
    #[serde(rename = "ecode360")]
    Ecode360,

    /// Anything not matched by the classifier.
    Unknown,
}

impl PlatformTag {
    /// Every tag, in declaration order.
    pub const ALL: [PlatformTag; 9] = [
        Self::MunicipalCodeOnline,
        Self::Municode,
        Self::GeneralCode,
        Self::Amlegal,
        Self::CivicLinQ,
        Self::CodePublishing,
        Self::EncodePlus,
        Self::Ecode360,
        Self::Unknown,
    ];

    /// Stable identifier used in cache files and summaries.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MunicipalCodeOnline => "municipal_code_online",
            Self::Municode => "municode",
            Self::GeneralCode => "general_code",
            Self::Amlegal => "amlegal",
            Self::CivicLinQ => "civiclinq",
            Self::CodePublishing => "code_publishing",
            Self::EncodePlus => "encodeplus",
            Self::Ecode360 => "ecode360",
            Self::Unknown => "unknown",
        }
    }

    /// Human readable platform name.
    #[must_use]
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::MunicipalCodeOnline => "Municipal Code Online",
            Self::Municode => "Municode",
            Self::GeneralCode => "General Code",
            Self::Amlegal => "Amlegal",
            Self::CivicLinQ => "CivicLinQ",
            Self::CodePublishing => "Code Publishing",
            Self::EncodePlus => "EncodePlus",
            Self::Ecode360 => "eCode360",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for PlatformTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A municipality whose code is hosted on one of the supported platforms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Municipality {
    /// Unique within a state list (e.g., "UT-provo").
    pub id: String,

    /// Display name (e.g., "Provo").
    pub name: String,

    /// Two-letter state code.
    pub state: String,

    /// Entry URL of the hosted code.
    pub source_url: String,

    /// Platform, once classified.
    pub platform_tag: Option<PlatformTag>,
}

impl Municipality {
    /// Create an unclassified municipality.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        state: impl Into<String>,
        source_url: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            state: state.into(),
            source_url: source_url.into(),
            platform_tag: None,
        }
    }

    /// Set the platform tag.
    #[must_use]
    pub fn with_platform(mut self, platform: PlatformTag) -> Self {
        self.platform_tag = Some(platform);
        self
    }
}

/// A located table-of-contents entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterRef {
    /// Entry title as shown in the table of contents.
    pub title: String,

    /// Where the chapter content lives (absolute URL, may carry a fragment).
    pub locator_url: String,

    /// Position of the entry among the scanned entries, in document order.
    pub document_order_index: usize,
}

/// Kind of an extracted content block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Heading,
    Paragraph,
    ListItem,
}

/// An ordered, leveled unit of extracted text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentBlock {
    pub kind: BlockKind,
    pub text: String,
    /// Heading level offset for headings, nesting depth otherwise.
    pub indent_level: u8,
}

impl ContentBlock {
    #[must_use]
    pub fn heading(text: impl Into<String>, level: u8) -> Self {
        Self {
            kind: BlockKind::Heading,
            text: text.into(),
            indent_level: level,
        }
    }

    #[must_use]
    pub fn paragraph(text: impl Into<String>, indent_level: u8) -> Self {
        Self {
            kind: BlockKind::Paragraph,
            text: text.into(),
            indent_level,
        }
    }

    #[must_use]
    pub fn list_item(text: impl Into<String>, indent_level: u8) -> Self {
        Self {
            kind: BlockKind::ListItem,
            text: text.into(),
            indent_level,
        }
    }
}

/// Metadata handed to the renderer alongside the content blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterMetadata {
    pub municipality: String,
    pub state: String,
    pub platform: PlatformTag,
    pub source_url: String,
    pub chapter: ChapterRef,
    pub detected_terms: BTreeSet<String>,
}

/// Outcome status of one municipality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrapeStatus {
    Success,
    NotFound,
    Error(ErrorKind),
}

impl fmt::Display for ScrapeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => f.write_str("success"),
            Self::NotFound => f.write_str("not_found"),
            Self::Error(kind) => write!(f, "error({kind})"),
        }
    }
}

/// Recorded outcome for exactly one municipality in a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeResult {
    pub municipality_id: String,
    pub platform: PlatformTag,
    pub status: ScrapeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chapter: Option<ChapterRef>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty", default)]
    pub detected_terms: BTreeSet<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
    pub timestamp: DateTime<Utc>,
}

impl ScrapeResult {
    fn base(municipality_id: &str, platform: PlatformTag, status: ScrapeStatus) -> Self {
        Self {
            municipality_id: municipality_id.to_string(),
            platform,
            status,
            chapter: None,
            detected_terms: BTreeSet::new(),
            error_detail: None,
            output_path: None,
            timestamp: Utc::now(),
        }
    }

    #[must_use]
    pub fn success(
        municipality_id: &str,
        platform: PlatformTag,
        chapter: ChapterRef,
        detected_terms: BTreeSet<String>,
        output_path: PathBuf,
    ) -> Self {
        Self {
            chapter: Some(chapter),
            detected_terms,
            output_path: Some(output_path),
            ..Self::base(municipality_id, platform, ScrapeStatus::Success)
        }
    }

    #[must_use]
    pub fn not_found(municipality_id: &str, platform: PlatformTag) -> Self {
        Self::base(municipality_id, platform, ScrapeStatus::NotFound)
    }

    #[must_use]
    pub fn error(
        municipality_id: &str,
        platform: PlatformTag,
        kind: ErrorKind,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            error_detail: Some(detail.into()),
            ..Self::base(municipality_id, platform, ScrapeStatus::Error(kind))
        }
    }

    /// Attach the chapter that was located before a later stage failed.
    #[must_use]
    pub fn with_chapter(mut self, chapter: ChapterRef) -> Self {
        self.chapter = Some(chapter);
        self
    }
}

/// Regex for slug generation - matches non-word characters.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static SLUG_NON_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s-]").expect("valid regex"));

/// Regex for slug generation - matches whitespace, dashes and underscores.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static SLUG_SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-_\s]+").expect("valid regex"));

/// Generate a URL-friendly slug.
///
/// # Examples
/// ```
/// use ethics_harvester::types::slugify;
///
/// assert_eq!(slugify("Town of Malta"), "town-of-malta");
/// assert_eq!(slugify("St. George"), "st-george");
/// ```
#[must_use]
pub fn slugify(text: &str) -> String {
    let text = text.to_lowercase();
    let text = SLUG_NON_WORD.replace_all(&text, "");
    let text = SLUG_SEPARATORS.replace_all(&text, "-");
    text.trim_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_tag_as_str_matches_serde() {
        for tag in PlatformTag::ALL {
            let json = serde_json::to_string(&tag).unwrap();
            assert_eq!(json, format!("\"{}\"", tag.as_str()));
        }
    }

    #[test]
    fn test_platform_tag_display_name() {
        assert_eq!(PlatformTag::CivicLinQ.display_name(), "CivicLinQ");
        assert_eq!(
            PlatformTag::MunicipalCodeOnline.display_name(),
            "Municipal Code Online"
        );
    }

    #[test]
    fn test_scrape_status_display() {
        assert_eq!(ScrapeStatus::Success.to_string(), "success");
        assert_eq!(ScrapeStatus::NotFound.to_string(), "not_found");
        assert_eq!(
            ScrapeStatus::Error(ErrorKind::Classification).to_string(),
            "error(classification)"
        );
    }

    #[test]
    fn test_scrape_result_error_constructor() {
        let result = ScrapeResult::error(
            "UT-provo",
            PlatformTag::GeneralCode,
            ErrorKind::Render,
            "disk full",
        );
        assert_eq!(result.status, ScrapeStatus::Error(ErrorKind::Render));
        assert_eq!(result.error_detail.as_deref(), Some("disk full"));
        assert!(result.chapter.is_none());
        assert!(result.detected_terms.is_empty());
    }

    #[test]
    fn test_slugify_special_chars() {
        assert_eq!(slugify("Salt Lake City"), "salt-lake-city");
        assert_eq!(slugify("  Coeur d'Alene  "), "coeur-dalene");
        assert_eq!(slugify("Town_of  Hyde--Park"), "town-of-hyde-park");
    }

    #[test]
    fn test_municipality_with_platform() {
        let m = Municipality::new("UT-orem", "Orem", "UT", "https://online.encodeplus.com/regs/orem-ut/")
            .with_platform(PlatformTag::EncodePlus);
        assert_eq!(m.platform_tag, Some(PlatformTag::EncodePlus));
        assert_eq!(m.state, "UT");
    }
}
