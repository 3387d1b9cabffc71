//! Geographic relevance of an offer to an actor's business location.

use std::collections::HashSet;

use crate::models::{BusinessContext, CatalogItem};

/// District-level match
pub const DISTRICT_MATCH: f64 = 100.0;
/// Province-level match or nationwide offer
pub const PROVINCE_MATCH: f64 = 80.0;
/// Region on file but nothing matched
pub const NO_MATCH: f64 = 30.0;
/// No region on file
pub const UNKNOWN_REGION: f64 = 50.0;

/// Administrative suffixes, longest first so "특별시" wins over "시"
const ADMIN_SUFFIXES: [&str; 8] = [
    "특별자치도",
    "특별자치시",
    "특별시",
    "광역시",
    "도",
    "시",
    "군",
    "구",
];

/// Shortest stem a suffix may be stripped down to. "대구" and "서구" are
/// names in their own right, not "대" and "서" plus a suffix.
const MIN_STEM_CHARS: usize = 2;

/// Reduces a region name to its comparable stem.
///
/// Whitespace is dropped and one administrative suffix is stripped, unless
/// that would leave a stem shorter than two characters.
pub fn normalize_region_name(name: &str) -> String {
    let compact: String = name.chars().filter(|c| !c.is_whitespace()).collect();

    ADMIN_SUFFIXES
        .iter()
        .find_map(|suffix| {
            compact
                .strip_suffix(*suffix)
                .filter(|stem| stem.chars().count() >= MIN_STEM_CHARS)
                .map(str::to_string)
        })
        .unwrap_or(compact)
}

/// A set of normalized region names matched exactly first, then by
/// containment in either direction when the shorter name has at least two
/// characters.
///
/// Containment makes "경기" match "경기도". Short stems can over-match.
#[derive(Debug, Default, Clone)]
pub struct RegionMatcher {
    names: HashSet<String>,
}

impl RegionMatcher {
    pub fn new<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        let names = names
            .into_iter()
            .map(normalize_region_name)
            .filter(|name| !name.is_empty())
            .collect();
        Self { names }
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn matches(&self, name: &str) -> bool {
        let candidate = normalize_region_name(name);
        if candidate.is_empty() {
            return false;
        }

        if self.names.contains(&candidate) {
            return true;
        }

        self.names.iter().any(|known| {
            known.chars().count().min(candidate.chars().count()) >= MIN_STEM_CHARS
                && (known.contains(candidate.as_str()) || candidate.contains(known.as_str()))
        })
    }
}

/// Scores how relevant an item's region scope is to a business location
#[derive(Debug, Default, Clone, Copy)]
pub struct RegionAffinityEvaluator;

impl RegionAffinityEvaluator {
    pub fn new() -> Self {
        Self
    }

    /// Returns one of 100, 80, 30 or 50; never fails
    pub fn score(&self, context: &BusinessContext, item: &CatalogItem) -> f64 {
        if !context.has_region() {
            return UNKNOWN_REGION;
        }
        if item.regions.is_empty() {
            return NO_MATCH;
        }

        let districts = RegionMatcher::new(context.district_name.as_deref());
        let provinces = RegionMatcher::new(context.province_name.as_deref());

        let district_hit = !districts.is_empty()
            && item
                .regions
                .regions
                .iter()
                .filter_map(|region| region.district.as_deref())
                .any(|name| districts.matches(name));
        if district_hit {
            return DISTRICT_MATCH;
        }

        if item.regions.nationwide {
            return PROVINCE_MATCH;
        }

        let province_hit = !provinces.is_empty()
            && item
                .regions
                .regions
                .iter()
                .filter_map(|region| region.province.as_deref())
                .any(|name| provinces.matches(name));
        if province_hit {
            return PROVINCE_MATCH;
        }

        NO_MATCH
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, RegionRef, RegionScope};
    use chrono::Utc;

    fn context(province: Option<&str>, district: Option<&str>) -> BusinessContext {
        BusinessContext::new(province.map(str::to_string), district.map(str::to_string))
    }

    fn item(regions: Vec<RegionRef>) -> CatalogItem {
        CatalogItem::new(Category::Grant, "지역 소상공인 지원", Utc::now())
            .with_regions(RegionScope::from_refs(regions))
    }

    #[test]
    fn test_normalize_strips_suffixes() {
        assert_eq!(normalize_region_name("경기도"), "경기");
        assert_eq!(normalize_region_name("서울특별시"), "서울");
        assert_eq!(normalize_region_name("부산광역시"), "부산");
        assert_eq!(normalize_region_name("성남시"), "성남");
        assert_eq!(normalize_region_name(" 제주 특별자치도 "), "제주");
    }

    #[test]
    fn test_normalize_keeps_bare_suffix() {
        assert_eq!(normalize_region_name("구"), "구");
        assert_eq!(normalize_region_name(""), "");
    }

    #[test]
    fn test_normalize_keeps_short_names_whole() {
        assert_eq!(normalize_region_name("대구"), "대구");
        assert_eq!(normalize_region_name("서구"), "서구");
        assert_eq!(normalize_region_name("중구"), "중구");
        assert_eq!(normalize_region_name("서초구"), "서초");
        assert_eq!(normalize_region_name("대구광역시"), "대구");
        assert_eq!(normalize_region_name("양평군"), "양평");
    }

    #[test]
    fn test_single_character_does_not_match_by_containment() {
        let matcher = RegionMatcher::new(["서"]);
        assert!(matcher.matches("서"));
        assert!(!matcher.matches("서초구"));
        assert!(!matcher.matches("강서구"));
    }

    #[test]
    fn test_similar_district_names_do_not_match() {
        let ctx = context(Some("서울특별시"), Some("서구"));
        let item = item(vec![RegionRef::district("서초구")]);
        assert_eq!(RegionAffinityEvaluator::new().score(&ctx, &item), 30.0);
    }

    #[test]
    fn test_similar_city_names_do_not_match() {
        let ctx = context(Some("대구"), None);
        let other_city = item(vec![RegionRef::province("대전광역시")]);
        assert_eq!(RegionAffinityEvaluator::new().score(&ctx, &other_city), 30.0);

        let same_city = item(vec![RegionRef::province("대구광역시")]);
        assert_eq!(RegionAffinityEvaluator::new().score(&ctx, &same_city), 80.0);
    }

    #[test]
    fn test_matcher_containment_both_directions() {
        let matcher = RegionMatcher::new(["경기도"]);
        assert!(matcher.matches("경기"));
        assert!(matcher.matches("경기도"));
        assert!(!matcher.matches("강원도"));

        let short = RegionMatcher::new(["경기"]);
        assert!(short.matches("경기도"));
    }

    #[test]
    fn test_district_match_scores_100() {
        let ctx = context(Some("경기도"), Some("성남시"));
        let item = item(vec![RegionRef::new(
            Some("경기도".to_string()),
            Some("성남시".to_string()),
        )]);
        assert_eq!(RegionAffinityEvaluator::new().score(&ctx, &item), 100.0);
    }

    #[test]
    fn test_province_only_match_scores_80() {
        let ctx = context(Some("경기도"), Some("성남시"));
        let item = item(vec![RegionRef::province("경기도")]);
        assert_eq!(RegionAffinityEvaluator::new().score(&ctx, &item), 80.0);
    }

    #[test]
    fn test_nationwide_scores_80() {
        let ctx = context(Some("경기도"), Some("성남시"));
        let item = item(vec![RegionRef::province("전국")]);
        assert_eq!(RegionAffinityEvaluator::new().score(&ctx, &item), 80.0);

        let declared = CatalogItem::new(Category::Loan, "전국 정책 자금", Utc::now())
            .with_regions(RegionScope::nationwide());
        assert_eq!(RegionAffinityEvaluator::new().score(&ctx, &declared), 80.0);
    }

    #[test]
    fn test_nationwide_with_matching_district_scores_100() {
        let ctx = context(Some("경기도"), Some("성남시"));
        let item = item(vec![RegionRef::province("전국"), RegionRef::district("성남")]);
        assert_eq!(RegionAffinityEvaluator::new().score(&ctx, &item), 100.0);
    }

    #[test]
    fn test_mismatch_scores_30() {
        let ctx = context(Some("경기도"), Some("성남시"));
        let item = item(vec![RegionRef::district("부산")]);
        assert_eq!(RegionAffinityEvaluator::new().score(&ctx, &item), 30.0);
    }

    #[test]
    fn test_item_without_regions_scores_30_when_context_has_region() {
        let ctx = context(Some("경기도"), None);
        let item = item(vec![]);
        assert_eq!(RegionAffinityEvaluator::new().score(&ctx, &item), 30.0);
    }

    #[test]
    fn test_no_business_region_scores_50() {
        let ctx = context(None, None);
        let item = item(vec![RegionRef::province("경기도")]);
        assert_eq!(RegionAffinityEvaluator::new().score(&ctx, &item), 50.0);
    }
}
