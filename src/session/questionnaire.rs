//! Static medical-history questionnaire.

use super::{HistoryAnswer, HistoryKey};

/// Answer options offered for every history question, in display order.
pub const HISTORY_OPTIONS: [HistoryAnswer; 3] =
    [HistoryAnswer::Yes, HistoryAnswer::No, HistoryAnswer::Unknown];

const QUESTIONS: [(HistoryKey, &str); 6] = [
    (HistoryKey::Injury, "I've recently suffered an injury"),
    (
        HistoryKey::Smoking,
        "I have smoked cigarettes for at least 10 years",
    ),
    (
        HistoryKey::Allergies,
        "I, or my parents, siblings or grandparents have an allergic disease \
         (e.g., asthma, atopic dermatitis, or food allergy)",
    ),
    (HistoryKey::Weight, "I'm overweight or obese"),
    (HistoryKey::Diabetes, "I have diabetes"),
    (HistoryKey::Hypertension, "I have hypertension"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryQuestion {
    pub key: HistoryKey,
    pub text: &'static str,
    pub options: &'static [HistoryAnswer],
}

/// Load the history questions. Returns a fresh copy on every call.
pub fn load_history_questions() -> Vec<HistoryQuestion> {
    QUESTIONS
        .iter()
        .map(|(key, text)| HistoryQuestion {
            key: *key,
            text: *text,
            options: &HISTORY_OPTIONS,
        })
        .collect()
}
