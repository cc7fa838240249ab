//! Registry configuration for the supported hosting platforms.

use super::core::ParserRegistry;
use crate::extractors::{
    AmlegalExtractor, CivicLinQExtractor, CodePublishingExtractor, Ecode360Extractor,
    EncodePlusExtractor, Extractor, GeneralCodeExtractor, MunicipalCodeOnlineExtractor,
    MunicodeExtractor,
};
use crate::types::PlatformTag;

/// The extractor for a platform, if the platform is scraped at all.
///
/// The match is exhaustive, so a new [`PlatformTag`] does not compile until
/// it is given an extractor or explicitly left without one.
#[must_use]
pub fn extractor_for(platform: PlatformTag) -> Option<Box<dyn Extractor>> {
    match platform {
        PlatformTag::MunicipalCodeOnline => Some(Box::new(MunicipalCodeOnlineExtractor)),
        PlatformTag::Municode => Some(Box::new(MunicodeExtractor)),
        PlatformTag::GeneralCode => Some(Box::new(GeneralCodeExtractor)),
        PlatformTag::Amlegal => Some(Box::new(AmlegalExtractor)),
        PlatformTag::CivicLinQ => Some(Box::new(CivicLinQExtractor)),
        PlatformTag::CodePublishing => Some(Box::new(CodePublishingExtractor)),
        PlatformTag::EncodePlus => Some(Box::new(EncodePlusExtractor)),
        PlatformTag::Ecode360 => Some(Box::new(Ecode360Extractor)),
        PlatformTag::Unknown => None,
    }
}

/// Create a registry with every platform extractor.
#[must_use]
pub fn create_platform_registry() -> ParserRegistry {
    let mut registry = ParserRegistry::new();
    for platform in PlatformTag::ALL {
        if let Some(extractor) = extractor_for(platform) {
            registry.register_boxed(extractor);
        }
    }
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_platform_registry() {
        let registry = create_platform_registry();

        assert!(registry.has_extractor(PlatformTag::MunicipalCodeOnline));
        assert!(registry.has_extractor(PlatformTag::Municode));
        assert!(registry.has_extractor(PlatformTag::GeneralCode));
        assert!(registry.has_extractor(PlatformTag::Amlegal));
        assert!(registry.has_extractor(PlatformTag::CivicLinQ));
        assert!(registry.has_extractor(PlatformTag::CodePublishing));
        assert!(registry.has_extractor(PlatformTag::EncodePlus));
        assert!(registry.has_extractor(PlatformTag::Ecode360));

        assert!(!registry.has_extractor(PlatformTag::Unknown));
        assert_eq!(registry.platforms().len(), 8);
    }

    #[test]
    fn test_extractor_reports_its_platform() {
        for platform in PlatformTag::ALL {
            if let Some(extractor) = extractor_for(platform) {
                assert_eq!(extractor.platform(), platform);
            }
        }
    }
}
