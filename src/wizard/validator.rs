//! Step validation gates.

use crate::error::ValidationError;
use crate::session::SessionState;

use super::state::Step;

pub const MIN_AGE: i32 = 0;
pub const MAX_AGE: i32 = 120;

/// Decide whether the wizard may advance from `step`.
///
/// Reports the first failing rule only and never touches the session.
pub fn validate(step: Step, session: &SessionState) -> Result<(), ValidationError> {
    match step {
        Step::Sex if session.demographics.gender.is_none() => Err(ValidationError::new(
            step,
            "Please select your biological sex",
        )),
        Step::Age => match session.demographics.age {
            Some(age) if (MIN_AGE..=MAX_AGE).contains(&age) => Ok(()),
            _ => Err(ValidationError::new(step, "Please enter a valid age")),
        },
        Step::History if !session.has_history() => Err(ValidationError::new(
            step,
            "Please answer at least one question",
        )),
        Step::Symptoms if !session.has_symptoms() => Err(ValidationError::new(
            step,
            "Please select at least one symptom",
        )),
        _ => Ok(()),
    }
}
