//! Session state — the single mutable intake record.
//!
//! Created empty when the engine starts, mutated as the patient moves
//! through the wizard, and sent to the backend in full. Never persisted.

pub mod questionnaire;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::wizard::{MAX_AGE, MIN_AGE};

pub use questionnaire::{HISTORY_OPTIONS, HistoryQuestion, load_history_questions};

/// Biological sex as asked on the first step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Male => write!(f, "male"),
            Self::Female => write!(f, "female"),
        }
    }
}

impl std::str::FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "male" | "m" => Ok(Self::Male),
            "female" | "f" => Ok(Self::Female),
            other => Err(format!("unknown sex '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Demographics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    /// Age in years as entered. Range is enforced when leaving the age step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<i32>,
}

/// Fixed medical-history question keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryKey {
    Injury,
    Smoking,
    Allergies,
    Weight,
    Diabetes,
    Hypertension,
}

impl HistoryKey {
    pub const ALL: [HistoryKey; 6] = [
        Self::Injury,
        Self::Smoking,
        Self::Allergies,
        Self::Weight,
        Self::Diabetes,
        Self::Hypertension,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Injury => "injury",
            Self::Smoking => "smoking",
            Self::Allergies => "allergies",
            Self::Weight => "weight",
            Self::Diabetes => "diabetes",
            Self::Hypertension => "hypertension",
        }
    }
}

impl std::fmt::Display for HistoryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for HistoryKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == needle)
            .ok_or_else(|| format!("unknown history question '{needle}'"))
    }
}

/// Answer to a history question. Travels as its button label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HistoryAnswer {
    Yes,
    No,
    #[serde(rename = "Don't know")]
    Unknown,
}

impl HistoryAnswer {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Yes => "Yes",
            Self::No => "No",
            Self::Unknown => "Don't know",
        }
    }
}

impl std::fmt::Display for HistoryAnswer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for HistoryAnswer {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "yes" | "y" => Ok(Self::Yes),
            "no" | "n" => Ok(Self::No),
            "unknown" | "don't know" | "dont know" | "?" => Ok(Self::Unknown),
            other => Err(format!("unknown answer '{other}'")),
        }
    }
}

/// Answer to a backend follow-up question. Shape follows the question type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FollowUpAnswer {
    /// Scale question, 1..=10.
    Scale(u8),
    /// Multi-select question, the checked options.
    Choices(Vec<String>),
    /// Anything else.
    Text(String),
}

/// The intake record transmitted to the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    #[serde(default)]
    pub demographics: Demographics,
    #[serde(default)]
    pub history: BTreeMap<HistoryKey, HistoryAnswer>,
    /// Selected symptoms, unique, in insertion order.
    #[serde(default)]
    pub symptoms: Vec<String>,
    /// Follow-up answers keyed by the literal question text.
    #[serde(default)]
    pub detailed_symptoms: BTreeMap<String, FollowUpAnswer>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_gender(&mut self, gender: Gender) {
        self.demographics.gender = Some(gender);
    }

    /// Record the age if it lies in `MIN_AGE..=MAX_AGE`. An out-of-range
    /// entry clears any earlier age and returns false.
    pub fn set_age(&mut self, age: i32) -> bool {
        let valid = (MIN_AGE..=MAX_AGE).contains(&age);
        self.demographics.age = valid.then_some(age);
        valid
    }

    /// Record a history answer, returning the one it replaced.
    pub fn answer_history(&mut self, key: HistoryKey, answer: HistoryAnswer) -> Option<HistoryAnswer> {
        self.history.insert(key, answer)
    }

    pub fn has_history(&self) -> bool {
        !self.history.is_empty()
    }

    pub fn has_symptoms(&self) -> bool {
        !self.symptoms.is_empty()
    }

    pub fn has_symptom(&self, name: &str) -> bool {
        self.symptoms.iter().any(|s| s == name)
    }

    /// Insert a symptom. Returns false if it was already selected.
    pub fn add_symptom(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        if self.has_symptom(&name) {
            return false;
        }
        self.symptoms.push(name);
        true
    }

    /// Remove a symptom. Returns false if it was not selected.
    pub fn remove_symptom(&mut self, name: &str) -> bool {
        let before = self.symptoms.len();
        self.symptoms.retain(|s| s != name);
        self.symptoms.len() != before
    }

    /// Record a follow-up answer, returning any answer stored under the same
    /// question text.
    pub fn record_answer(
        &mut self,
        question: impl Into<String>,
        answer: FollowUpAnswer,
    ) -> Option<FollowUpAnswer> {
        self.detailed_symptoms.insert(question.into(), answer)
    }
}
