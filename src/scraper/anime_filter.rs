//! Inclusion rules for seasonal catalog entries
//!
//! An entry is kept only when it is popular enough and is not Chinese
//! animation. The member threshold is checked first, so an entry failing
//! both rules is only counted as a low-members rejection.

use super::jikan::CatalogEntry;

/// Type tags that always mark Chinese animation
const EXCLUDED_TYPES: [&str; 2] = ["ONA-CN", "DONGHUA"];

/// Producer name fragments of Chinese streaming platforms
const CHINESE_PLATFORM_KEYWORDS: [&str; 4] = ["bilibili", "tencent", "iqiyi", "youku"];

/// Result of applying the inclusion rules to one entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterVerdict {
    Keep,
    LowMembers,
    ChineseAnimation,
}

/// Applies the inclusion rules with a fixed member threshold
#[derive(Debug, Clone, Copy)]
pub struct AnimeFilter {
    min_members: u64,
}

impl AnimeFilter {
    pub fn new(min_members: u64) -> Self {
        Self { min_members }
    }

    pub fn evaluate(&self, entry: &CatalogEntry) -> FilterVerdict {
        if entry.members() < self.min_members {
            tracing::debug!(
                "Entry '{}' excluded: {} members below {}",
                entry.title.as_deref().unwrap_or_default(),
                entry.members(),
                self.min_members
            );
            return FilterVerdict::LowMembers;
        }

        if is_chinese_animation(entry) {
            tracing::debug!(
                "Entry '{}' excluded: Chinese animation",
                entry.title.as_deref().unwrap_or_default()
            );
            return FilterVerdict::ChineseAnimation;
        }

        FilterVerdict::Keep
    }
}

/// Checks the type tag, and for ONA entries the producer names
pub fn is_chinese_animation(entry: &CatalogEntry) -> bool {
    let kind = entry.kind.as_deref().unwrap_or_default().to_uppercase();

    if EXCLUDED_TYPES.contains(&kind.as_str()) {
        return true;
    }

    if kind == "ONA" {
        return entry.producer_names().any(|name| {
            let name = name.to_lowercase();
            CHINESE_PLATFORM_KEYWORDS
                .iter()
                .any(|keyword| name.contains(keyword))
        });
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraper::jikan::NamedRef;

    fn make_entry(kind: &str, members: u64, producers: &[&str]) -> CatalogEntry {
        CatalogEntry {
            title: Some("Test Anime".to_string()),
            kind: Some(kind.to_string()),
            members: Some(members),
            producers: Some(
                producers
                    .iter()
                    .map(|name| NamedRef {
                        name: Some(name.to_string()),
                    })
                    .collect(),
            ),
            ..Default::default()
        }
    }

    #[test]
    fn test_low_members_excluded_regardless_of_origin() {
        let filter = AnimeFilter::new(5000);

        assert_eq!(
            filter.evaluate(&make_entry("TV", 4999, &[])),
            FilterVerdict::LowMembers
        );
        // Fails both rules, counted under the first one only
        assert_eq!(
            filter.evaluate(&make_entry("DONGHUA", 10, &["bilibili"])),
            FilterVerdict::LowMembers
        );
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let filter = AnimeFilter::new(5000);
        assert_eq!(
            filter.evaluate(&make_entry("TV", 5000, &[])),
            FilterVerdict::Keep
        );
    }

    #[test]
    fn test_excluded_type_tags() {
        let filter = AnimeFilter::new(5000);

        assert_eq!(
            filter.evaluate(&make_entry("ONA-CN", 1_000_000, &[])),
            FilterVerdict::ChineseAnimation
        );
        assert_eq!(
            filter.evaluate(&make_entry("Donghua", 1_000_000, &[])),
            FilterVerdict::ChineseAnimation
        );
    }

    #[test]
    fn test_ona_with_chinese_platform_producer() {
        let filter = AnimeFilter::new(5000);

        assert_eq!(
            filter.evaluate(&make_entry("ONA", 20_000, &["Aniplex", "BiliBili"])),
            FilterVerdict::ChineseAnimation
        );
        assert_eq!(
            filter.evaluate(&make_entry("ONA", 20_000, &["Tencent Penguin Pictures"])),
            FilterVerdict::ChineseAnimation
        );
    }

    #[test]
    fn test_ona_without_chinese_platform_kept() {
        let filter = AnimeFilter::new(5000);
        assert_eq!(
            filter.evaluate(&make_entry("ONA", 20_000, &["Netflix", "Aniplex"])),
            FilterVerdict::Keep
        );
    }

    #[test]
    fn test_producer_check_only_applies_to_ona() {
        let filter = AnimeFilter::new(5000);
        assert_eq!(
            filter.evaluate(&make_entry("TV", 20_000, &["bilibili"])),
            FilterVerdict::Keep
        );
    }

    #[test]
    fn test_missing_type_is_not_excluded() {
        let entry = CatalogEntry {
            members: Some(9000),
            ..Default::default()
        };
        assert!(!is_chinese_animation(&entry));
    }
}
