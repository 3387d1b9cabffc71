use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};
use uuid::Uuid;

/// Region text that marks an offer as available everywhere
const NATIONWIDE_MARKERS: [&str; 2] = ["전국", "nationwide"];

/// Major offer categories of the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Policy loans and interest subsidies
    Loan,
    /// Government grants and subsidies
    Grant,
    /// Credit guarantees
    Guarantee,
    /// Training and education programs
    Education,
    /// Consulting and mentoring programs
    Consulting,
    Other,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Loan => "loan",
            Category::Grant => "grant",
            Category::Guarantee => "guarantee",
            Category::Education => "education",
            Category::Consulting => "consulting",
            Category::Other => "other",
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "loan" => Ok(Category::Loan),
            "grant" => Ok(Category::Grant),
            "guarantee" => Ok(Category::Guarantee),
            "education" => Ok(Category::Education),
            "consulting" => Ok(Category::Consulting),
            "other" => Ok(Category::Other),
            other => Err(format!("unknown category: {}", other)),
        }
    }
}

/// A region an offer is scoped to, at province and/or district level
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionRef {
    pub province: Option<String>,
    pub district: Option<String>,
}

impl RegionRef {
    pub fn new(province: Option<String>, district: Option<String>) -> Self {
        Self { province, district }
    }

    pub fn province(name: impl Into<String>) -> Self {
        Self::new(Some(name.into()), None)
    }

    pub fn district(name: impl Into<String>) -> Self {
        Self::new(None, Some(name.into()))
    }

    fn is_nationwide_marker(&self) -> bool {
        [self.province.as_deref(), self.district.as_deref()]
            .into_iter()
            .flatten()
            .any(|name| {
                let name = name.trim().to_lowercase();
                NATIONWIDE_MARKERS.contains(&name.as_str())
            })
    }
}

/// Geographic scope of an offer
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RegionScope {
    /// Offered everywhere, regardless of the listed regions
    pub nationwide: bool,
    pub regions: Vec<RegionRef>,
}

impl RegionScope {
    /// Scope of an offer open everywhere
    pub fn nationwide() -> Self {
        Self {
            nationwide: true,
            regions: Vec::new(),
        }
    }

    /// Builds a scope from region references, turning "전국" entries into
    /// the nationwide marker
    pub fn from_refs(refs: Vec<RegionRef>) -> Self {
        let (markers, regions): (Vec<_>, Vec<_>) =
            refs.into_iter().partition(RegionRef::is_nationwide_marker);

        Self {
            nationwide: !markers.is_empty(),
            regions,
        }
    }

    /// No region declared at all
    pub fn is_empty(&self) -> bool {
        !self.nationwide && self.regions.is_empty()
    }
}

/// Age eligibility declared by an offer
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgeCondition {
    /// Inclusive range in full years
    Range { min: u32, max: u32 },
    /// Eligible up to and including this age
    AtMost { age: u32 },
    /// Eligible from this age on
    AtLeast { age: u32 },
    /// Free-form eligibility text, parsed at evaluation time
    Text { text: String },
    #[default]
    Unspecified,
}

/// An offer in the catalog. Owned by the catalog collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: Uuid,
    pub category: Category,
    pub title: String,
    #[serde(default)]
    pub regions: RegionScope,
    #[serde(default)]
    pub age_condition: AgeCondition,
    pub created_at: DateTime<Utc>,
}

impl CatalogItem {
    pub fn new(category: Category, title: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            category,
            title: title.into(),
            regions: RegionScope::default(),
            age_condition: AgeCondition::Unspecified,
            created_at,
        }
    }

    pub fn with_regions(mut self, regions: RegionScope) -> Self {
        self.regions = regions;
        self
    }

    pub fn with_age_condition(mut self, age_condition: AgeCondition) -> Self {
        self.age_condition = age_condition;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_round_trips_through_str() {
        for category in [
            Category::Loan,
            Category::Grant,
            Category::Guarantee,
            Category::Education,
            Category::Consulting,
            Category::Other,
        ] {
            assert_eq!(category.as_str().parse::<Category>(), Ok(category));
        }
    }

    #[test]
    fn test_category_parse_is_case_insensitive() {
        assert_eq!(" Loan ".parse::<Category>(), Ok(Category::Loan));
        assert!("mortgage".parse::<Category>().is_err());
    }

    #[test]
    fn test_region_scope_detects_nationwide_marker() {
        let scope = RegionScope::from_refs(vec![
            RegionRef::province("전국"),
            RegionRef::district("성남시"),
        ]);

        assert!(scope.nationwide);
        assert_eq!(scope.regions, vec![RegionRef::district("성남시")]);
    }

    #[test]
    fn test_region_scope_without_marker_is_local() {
        let scope = RegionScope::from_refs(vec![RegionRef::province("경기도")]);
        assert!(!scope.nationwide);
        assert!(!scope.is_empty());
        assert!(RegionScope::default().is_empty());
        assert!(!RegionScope::nationwide().is_empty());
    }

    #[test]
    fn test_age_condition_serialization() {
        let condition = AgeCondition::Range { min: 19, max: 39 };
        let json = serde_json::to_string(&condition).unwrap();
        assert_eq!(json, r#"{"type":"range","min":19,"max":39}"#);
    }
}
