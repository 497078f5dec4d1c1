//! Difficulty feedback translator.
//!
//! Converts a completion rating into the directive text handed verbatim to
//! the next generation request. Weights are contractual metadata only; the
//! generator collaborator owns any numeric difficulty scaling.

use crate::model::feedback::{DifficultyRating, FeedbackDirective};

const CONTINUE_FALLBACK: &str =
    "Previous mission completed. Continue the progression with the next mission.";
const BREAKTHROUGH_FALLBACK: &str =
    "This is a rank-breakthrough attempt. Generate a mission that proves readiness for this rank.";

/// Signed difficulty weight in percent.
pub fn weight_percent(rating: DifficultyRating) -> f64 {
    match rating {
        DifficultyRating::TooEasy => 1.5,
        DifficultyRating::Perfect => 1.0,
        DifficultyRating::TooHard => -0.5,
    }
}

/// Weight tag embedded in directive text, e.g. `-0.5%`.
pub fn weight_tag(rating: DifficultyRating) -> &'static str {
    match rating {
        DifficultyRating::TooEasy => "+1.5%",
        DifficultyRating::Perfect => "+1.0%",
        DifficultyRating::TooHard => "-0.5%",
    }
}

fn instruction(rating: DifficultyRating) -> &'static str {
    match rating {
        DifficultyRating::TooEasy => {
            "The previous mission was too easy. Increase the difficulty of the next mission."
        }
        DifficultyRating::Perfect => {
            "The previous mission was just right. Keep a similar difficulty for the next mission."
        }
        DifficultyRating::TooHard => {
            "The previous mission was too hard. Reduce the difficulty of the next mission."
        }
    }
}

/// Builds a directive; blank free text is dropped.
pub fn translate(rating: DifficultyRating, free_text: Option<&str>) -> FeedbackDirective {
    let free_text = free_text
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string);
    FeedbackDirective {
        category: rating,
        free_text,
    }
}

/// Renders the directive as generator feedback text.
pub fn directive_text(directive: &FeedbackDirective) -> String {
    let mut text = format!(
        "{} [difficulty_weight={}]",
        instruction(directive.category),
        weight_tag(directive.category)
    );
    if let Some(note) = directive.free_text.as_deref() {
        text.push_str(" User note: ");
        text.push_str(note);
    }
    text
}

/// Feedback text used when no directive is pending.
pub fn fallback_text(breakthrough: bool) -> &'static str {
    if breakthrough {
        BREAKTHROUGH_FALLBACK
    } else {
        CONTINUE_FALLBACK
    }
}
