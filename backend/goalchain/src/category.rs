//! Decorative goal categories, matched from the description text.
//!
//! Display only — the category never feeds into status or eligibility.

use serde::Serialize;

/// Iconography bucket for a goal, chosen by keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalCategory {
    Cardio,
    Nutrition,
    Mindfulness,
    Strength,
    Sleep,
    Hydration,
    General,
}

impl GoalCategory {
    /// Classify a description by case-insensitive substring match against a
    /// fixed ordered keyword list; first matching group wins.
    pub fn from_description(description: &str) -> Self {
        let lower = description.to_lowercase();
        let has = |keywords: &[&str]| keywords.iter().any(|k| lower.contains(k));

        if has(&["run", "walk", "jog"]) {
            Self::Cardio
        } else if has(&["eat", "nutrition", "diet"]) {
            Self::Nutrition
        } else if has(&["meditat", "yoga", "mindful"]) {
            Self::Mindfulness
        } else if has(&["gym", "workout", "exercise"]) {
            Self::Strength
        } else if has(&["sleep", "rest"]) {
            Self::Sleep
        } else if has(&["water", "hydrat"]) {
            Self::Hydration
        } else {
            Self::General
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Self::Cardio => "⚡",
            Self::Nutrition => "🥗",
            Self::Mindfulness => "🧘",
            Self::Strength => "💪",
            Self::Sleep => "😴",
            Self::Hydration => "💧",
            Self::General => "🎯",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cardio => "cardio",
            Self::Nutrition => "nutrition",
            Self::Mindfulness => "mindfulness",
            Self::Strength => "strength",
            Self::Sleep => "sleep",
            Self::Hydration => "hydration",
            Self::General => "general",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_groups() {
        assert_eq!(GoalCategory::from_description("Run 30 km in 10 days"), GoalCategory::Cardio);
        assert_eq!(GoalCategory::from_description("jogging every morning"), GoalCategory::Cardio);
        assert_eq!(GoalCategory::from_description("eat more greens"), GoalCategory::Nutrition);
        assert_eq!(GoalCategory::from_description("daily meditation"), GoalCategory::Mindfulness);
        assert_eq!(GoalCategory::from_description("hit the gym 4x a week"), GoalCategory::Strength);
        assert_eq!(GoalCategory::from_description("sleep 8 hours"), GoalCategory::Sleep);
        assert_eq!(GoalCategory::from_description("drink more water"), GoalCategory::Hydration);
    }

    #[test]
    fn match_is_case_insensitive() {
        assert_eq!(GoalCategory::from_description("GYM TIME"), GoalCategory::Strength);
        assert_eq!(GoalCategory::from_description("MeDitAte"), GoalCategory::Mindfulness);
    }

    #[test]
    fn first_group_wins() {
        // "run" appears before "gym" in the keyword order.
        assert_eq!(GoalCategory::from_description("run to the gym"), GoalCategory::Cardio);
    }

    #[test]
    fn unmatched_defaults_to_general() {
        assert_eq!(GoalCategory::from_description("read 12 books"), GoalCategory::General);
        assert_eq!(GoalCategory::from_description(""), GoalCategory::General);
    }

    #[test]
    fn every_category_has_an_emoji() {
        for c in [
            GoalCategory::Cardio,
            GoalCategory::Nutrition,
            GoalCategory::Mindfulness,
            GoalCategory::Strength,
            GoalCategory::Sleep,
            GoalCategory::Hydration,
            GoalCategory::General,
        ] {
            assert!(!c.emoji().is_empty());
            assert!(!c.as_str().is_empty());
        }
    }
}
