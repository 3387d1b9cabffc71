use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};
use uuid::Uuid;

/// Kind of behavior an actor showed toward an item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InteractionKind {
    View,
    Scroll,
    Click,
    Scrap,
    /// Removing a scrap is recorded as its own event
    Unscrap,
    Rating,
    Comment,
}

impl InteractionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionKind::View => "VIEW",
            InteractionKind::Scroll => "SCROLL",
            InteractionKind::Click => "CLICK",
            InteractionKind::Scrap => "SCRAP",
            InteractionKind::Unscrap => "UNSCRAP",
            InteractionKind::Rating => "RATING",
            InteractionKind::Comment => "COMMENT",
        }
    }
}

impl Display for InteractionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for InteractionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "VIEW" => Ok(InteractionKind::View),
            "SCROLL" => Ok(InteractionKind::Scroll),
            "CLICK" => Ok(InteractionKind::Click),
            "SCRAP" => Ok(InteractionKind::Scrap),
            "UNSCRAP" => Ok(InteractionKind::Unscrap),
            "RATING" => Ok(InteractionKind::Rating),
            "COMMENT" => Ok(InteractionKind::Comment),
            other => Err(format!("unknown interaction kind: {}", other)),
        }
    }
}

/// Optional measurements attached to an interaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InteractionMetadata {
    /// Dwell time in seconds
    pub duration_seconds: Option<u32>,
    /// How far the page was scrolled, 0-100
    pub scroll_depth: Option<u8>,
    /// Star rating, 1-5
    pub rating: Option<u8>,
}

impl InteractionMetadata {
    /// Checks the measurement ranges for the given kind of interaction
    pub fn validate(&self, kind: InteractionKind) -> Result<(), String> {
        if let Some(depth) = self.scroll_depth {
            if depth > 100 {
                return Err(format!("scroll depth must be within 0-100, got {}", depth));
            }
        }

        match self.rating {
            Some(rating) if !(1..=5).contains(&rating) => {
                Err(format!("rating must be within 1-5, got {}", rating))
            }
            None if kind == InteractionKind::Rating => {
                Err("RATING interactions require a rating".to_string())
            }
            _ => Ok(()),
        }
    }
}

/// One immutable behavioral event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionEvent {
    pub id: Uuid,
    pub actor_id: Uuid,
    pub item_id: Uuid,
    pub kind: InteractionKind,
    #[serde(flatten)]
    pub metadata: InteractionMetadata,
    pub created_at: DateTime<Utc>,
}

impl InteractionEvent {
    pub fn new(
        actor_id: Uuid,
        item_id: Uuid,
        kind: InteractionKind,
        metadata: InteractionMetadata,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            actor_id,
            item_id,
            kind,
            metadata,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_serialization() {
        let json = serde_json::to_string(&InteractionKind::Unscrap).unwrap();
        assert_eq!(json, "\"UNSCRAP\"");

        let kind: InteractionKind = serde_json::from_str("\"RATING\"").unwrap();
        assert_eq!(kind, InteractionKind::Rating);
    }

    #[test]
    fn test_kind_from_str_accepts_lowercase() {
        assert_eq!("scrap".parse::<InteractionKind>(), Ok(InteractionKind::Scrap));
        assert!("LIKE".parse::<InteractionKind>().is_err());
    }

    #[test]
    fn test_validate_scroll_depth_bounds() {
        let ok = InteractionMetadata {
            scroll_depth: Some(100),
            ..Default::default()
        };
        assert!(ok.validate(InteractionKind::Scroll).is_ok());

        let too_deep = InteractionMetadata {
            scroll_depth: Some(101),
            ..Default::default()
        };
        assert!(too_deep.validate(InteractionKind::Scroll).is_err());
    }

    #[test]
    fn test_validate_rating() {
        let missing = InteractionMetadata::default();
        assert!(missing.validate(InteractionKind::Rating).is_err());
        assert!(missing.validate(InteractionKind::View).is_ok());

        let zero = InteractionMetadata {
            rating: Some(0),
            ..Default::default()
        };
        assert!(zero.validate(InteractionKind::Rating).is_err());

        let five = InteractionMetadata {
            rating: Some(5),
            ..Default::default()
        };
        assert!(five.validate(InteractionKind::Rating).is_ok());
    }
}
