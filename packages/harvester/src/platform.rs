//! Platform classification by source URL.

use crate::types::PlatformTag;

/// Ordered host patterns. The first fragment contained in the lowercased URL
/// decides the platform.
const PLATFORM_PATTERNS: &[(&str, PlatformTag)] = &[
    ("municipalcodeonline.com", PlatformTag::MunicipalCodeOnline),
    ("library.municode.com", PlatformTag::Municode),
    ("municode.com", PlatformTag::Municode),
    (".municipal.codes", PlatformTag::GeneralCode),
    ("amlegal.com", PlatformTag::Amlegal),
    ("civiclinq.com", PlatformTag::CivicLinQ),
    ("codepublishing.com", PlatformTag::CodePublishing),
    ("encodeplus.com", PlatformTag::EncodePlus),
    ("ecode360.com", PlatformTag::Ecode360),
];

/// Classify a source URL into a platform tag.
///
/// Pure; never fails. Unrecognised URLs (including empty strings) map to
/// [`PlatformTag::Unknown`].
///
/// # Examples
/// ```
/// use ethics_harvester::platform::classify;
/// use ethics_harvester::types::PlatformTag;
///
/// assert_eq!(
///     classify("https://library.municode.com/ut/provo/codes/code_of_ordinances"),
///     PlatformTag::Municode
/// );
/// assert_eq!(classify("https://example.org/code"), PlatformTag::Unknown);
/// ```
#[must_use]
pub fn classify(url: &str) -> PlatformTag {
    let url = url.trim().to_lowercase();
    if url.is_empty() {
        return PlatformTag::Unknown;
    }
    PLATFORM_PATTERNS
        .iter()
        .find(|(fragment, _)| url.contains(fragment))
        .map(|(_, tag)| *tag)
        .unwrap_or(PlatformTag::Unknown)
}
