use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The business an actor is currently operating
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessContext {
    pub id: Uuid,
    /// Province-level region name (e.g. "경기도")
    pub province_name: Option<String>,
    /// District-level region name (e.g. "성남시")
    pub district_name: Option<String>,
    pub industry: Option<String>,
}

impl BusinessContext {
    pub fn new(province_name: Option<String>, district_name: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            province_name,
            district_name,
            industry: None,
        }
    }

    /// Whether any region name is on file
    pub fn has_region(&self) -> bool {
        [self.province_name.as_deref(), self.district_name.as_deref()]
            .into_iter()
            .flatten()
            .any(|name| !name.trim().is_empty())
    }
}

/// The end user recommendations are generated for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: Uuid,
    pub birth_date: Option<NaiveDate>,
    pub business_context: BusinessContext,
}

impl Actor {
    pub fn new(birth_date: Option<NaiveDate>, business_context: BusinessContext) -> Self {
        Self {
            id: Uuid::new_v4(),
            birth_date,
            business_context,
        }
    }

    /// Full age in years on the given date, `None` without a birth date on file
    pub fn age_on(&self, date: NaiveDate) -> Option<u32> {
        let birth = self.birth_date?;
        let mut age = date.year() - birth.year();
        if (date.month(), date.day()) < (birth.month(), birth.day()) {
            age -= 1;
        }
        u32::try_from(age).ok()
    }
}
