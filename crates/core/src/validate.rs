//! Response validation.
//!
//! Validation never fails: an unacceptable value yields `false` and the
//! caller decides what to show (disabled submit, red counter, tab warning).

use crate::types::{ItemType, ResponseValue, NO, YES};

/// Lowest accepted rating.
pub const RATING_MIN: i64 = 1;
/// Highest accepted rating, also the number of stars shown.
pub const RATING_MAX: i64 = 5;
/// Minimum observation length, in characters.
pub const OBSERVATION_MIN_CHARS: usize = 50;

/// Whether `value` is an acceptable answer for an item of type `item_type`.
pub fn is_valid(value: &ResponseValue, item_type: ItemType) -> bool {
    match item_type {
        ItemType::Numeric => value
            .as_integer()
            .is_some_and(|n| (RATING_MIN..=RATING_MAX).contains(&n)),
        // Raw character count, no trimming or normalization.
        ItemType::Observation => value
            .as_text()
            .is_some_and(|s| s.chars().count() >= OBSERVATION_MIN_CHARS),
        ItemType::Boolean => matches!(value.as_text(), Some(YES) | Some(NO)),
        ItemType::Unknown => false,
    }
}

/// Same as [`is_valid`] but treats a missing response as invalid.
pub fn is_answered(value: Option<&ResponseValue>, item_type: ItemType) -> bool {
    value.is_some_and(|v| is_valid(v, item_type))
}

/// Live character counter state for an observation field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObservationFeedback {
    pub count: usize,
    pub minimum: usize,
    pub satisfied: bool,
}

impl ObservationFeedback {
    /// Characters still needed to reach the minimum.
    pub fn remaining(&self) -> usize {
        self.minimum.saturating_sub(self.count)
    }
}

pub fn observation_feedback(value: Option<&ResponseValue>) -> ObservationFeedback {
    let count = value
        .and_then(ResponseValue::as_text)
        .map(|s| s.chars().count())
        .unwrap_or(0);
    ObservationFeedback {
        count,
        minimum: OBSERVATION_MIN_CHARS,
        satisfied: count >= OBSERVATION_MIN_CHARS,
    }
}
