//! Age eligibility as a soft ranking signal.
//!
//! Even a clearly excluded age keeps a small positive score so an offer that
//! is strong on every other axis is never dropped from a ranking.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;

use crate::models::{Actor, AgeCondition};

/// Graded fit between an actor's age and an offer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgeTier {
    Excluded,
    Poor,
    Marginal,
    Acceptable,
    Good,
    Perfect,
}

impl AgeTier {
    pub fn score(&self) -> f64 {
        match self {
            AgeTier::Perfect => 100.0,
            AgeTier::Good => 85.0,
            AgeTier::Acceptable => 70.0,
            AgeTier::Marginal => 50.0,
            AgeTier::Poor => 30.0,
            AgeTier::Excluded => 15.0,
        }
    }
}

/// Years outside an explicit range that still count as marginal
const RANGE_MARGINAL_YEARS: u32 = 2;
/// Years outside an explicit range that still count as poor
const RANGE_POOR_YEARS: u32 = 10;
/// Distance from a threshold, on the eligible side, that counts as comfortably inside
const THRESHOLD_COMFORT_YEARS: u32 = 2;

// "19~39세", "만 19세 ~ 34세", "19-39", "19 to 39"
static RANGE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{1,3})\s*세?\s*(?:~|-|–|부터|to)\s*(?:만\s*)?(\d{1,3})")
        .expect("Invalid age range regex")
});

// "19세 이상 39세 이하"
static BOUNDED_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{1,3})\s*세\s*(이상|초과).*?(\d{1,3})\s*세\s*(이하|미만)")
        .expect("Invalid bounded age regex")
});

// "만 39세 이하", "39세 미만", "60세 이상", "18세 초과"
static THRESHOLD_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{1,3})\s*세\s*(이하|미만|이상|초과)").expect("Invalid age threshold regex")
});

// "under 39", "over 60"
static ENGLISH_THRESHOLD_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(under|below|over|above)\s+(\d{1,3})\b")
        .expect("Invalid english age threshold regex")
});

fn number(text: &str) -> Option<u32> {
    text.parse().ok()
}

/// Upper bound in full years for an exclusive or inclusive "up to" marker
fn upper_bound(age: u32, marker: &str) -> Option<u32> {
    match marker {
        "미만" | "under" | "below" => age.checked_sub(1),
        _ => Some(age),
    }
}

/// Lower bound in full years for an exclusive or inclusive "from" marker
fn lower_bound(age: u32, marker: &str) -> u32 {
    match marker {
        "초과" | "over" | "above" => age + 1,
        _ => age,
    }
}

fn threshold(age: u32, marker: &str) -> Option<AgeCondition> {
    match marker {
        "이하" | "미만" | "under" | "below" => {
            upper_bound(age, marker).map(|age| AgeCondition::AtMost { age })
        }
        _ => Some(AgeCondition::AtLeast {
            age: lower_bound(age, marker),
        }),
    }
}

fn ordered_range(min: u32, max: u32) -> AgeCondition {
    AgeCondition::Range {
        min: min.min(max),
        max: min.max(max),
    }
}

/// Parses free-form eligibility text into a structured condition.
///
/// Returns `None` when nothing age-related can be recognised.
pub fn parse_age_condition(text: &str) -> Option<AgeCondition> {
    if let Some(caps) = BOUNDED_PATTERN.captures(text) {
        let min = lower_bound(number(&caps[1])?, &caps[2]);
        let max = upper_bound(number(&caps[3])?, &caps[4])?;
        return Some(ordered_range(min, max));
    }

    if let Some(caps) = RANGE_PATTERN.captures(text) {
        return Some(ordered_range(number(&caps[1])?, number(&caps[2])?));
    }

    if let Some(caps) = THRESHOLD_PATTERN.captures(text) {
        return threshold(number(&caps[1])?, &caps[2]);
    }

    if let Some(caps) = ENGLISH_THRESHOLD_PATTERN.captures(text) {
        let marker = caps[1].to_lowercase();
        return threshold(number(&caps[2])?, &marker);
    }

    None
}

/// Scores an actor's age against an offer's declared age condition
#[derive(Debug, Default, Clone, Copy)]
pub struct AgeAffinityEvaluator;

impl AgeAffinityEvaluator {
    pub fn new() -> Self {
        Self
    }

    /// Score for the actor's age as of `today`
    pub fn score(&self, actor: &Actor, condition: &AgeCondition, today: NaiveDate) -> f64 {
        self.tier(actor.age_on(today), condition).score()
    }

    pub fn tier(&self, age: Option<u32>, condition: &AgeCondition) -> AgeTier {
        let Some(age) = age else {
            return AgeTier::Acceptable;
        };

        match condition {
            AgeCondition::Range { min, max } => range_tier(age, *min, *max),
            AgeCondition::AtMost { age: limit } => at_most_tier(age, *limit),
            AgeCondition::AtLeast { age: limit } => at_least_tier(age, *limit),
            AgeCondition::Text { text } => match parse_age_condition(text) {
                Some(parsed) => self.tier(Some(age), &parsed),
                None => AgeTier::Acceptable,
            },
            AgeCondition::Unspecified => default_tier(age),
        }
    }
}

fn range_tier(age: u32, min: u32, max: u32) -> AgeTier {
    let (min, max) = (min.min(max), min.max(max));

    if (min..=max).contains(&age) {
        let width = max - min;
        let from_edge = (age - min).min(max - age);
        return if from_edge * 4 >= width {
            AgeTier::Perfect
        } else {
            AgeTier::Good
        };
    }

    let outside = if age < min { min - age } else { age - max };

    if outside <= RANGE_MARGINAL_YEARS {
        AgeTier::Marginal
    } else if outside <= RANGE_POOR_YEARS {
        AgeTier::Poor
    } else {
        AgeTier::Excluded
    }
}

/// Tier for an actor `past` years on the wrong side of a one-sided threshold
fn past_threshold_tier(past: u32) -> AgeTier {
    match past {
        0..=1 => AgeTier::Good,
        2..=3 => AgeTier::Acceptable,
        4..=5 => AgeTier::Marginal,
        6..=10 => AgeTier::Poor,
        _ => AgeTier::Excluded,
    }
}

fn at_most_tier(age: u32, limit: u32) -> AgeTier {
    if age <= limit {
        if limit - age >= THRESHOLD_COMFORT_YEARS {
            AgeTier::Perfect
        } else {
            AgeTier::Good
        }
    } else {
        past_threshold_tier(age - limit)
    }
}

fn at_least_tier(age: u32, limit: u32) -> AgeTier {
    if age >= limit {
        if age - limit >= THRESHOLD_COMFORT_YEARS {
            AgeTier::Perfect
        } else {
            AgeTier::Good
        }
    } else {
        past_threshold_tier(limit - age)
    }
}

/// Curve for offers that state no age condition; never excludes
fn default_tier(age: u32) -> AgeTier {
    match age {
        25..=45 => AgeTier::Perfect,
        20..=55 => AgeTier::Good,
        18..=65 => AgeTier::Acceptable,
        16..=70 => AgeTier::Marginal,
        _ => AgeTier::Poor,
    }
}
