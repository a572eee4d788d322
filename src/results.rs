//! Result renderer — turns an analysis payload into display sections.
//!
//! Pure: never touches the session. Missing or empty sections are omitted.

use std::fmt;

use crate::backend::{AnalysisPayload, Condition, RecommendedTest, Urgency};

pub const CONDITIONS_TITLE: &str = "Possible Conditions";
pub const TESTS_TITLE: &str = "Recommended Tests";
pub const ANALYSIS_FAILED_MESSAGE: &str = "Error analyzing symptoms. Please try again.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultEntry {
    pub name: String,
    /// Whole percent, 0..=100.
    pub confidence: u8,
    pub explanation: String,
    pub priority: Option<String>,
}

impl ResultEntry {
    pub fn confidence_label(&self) -> String {
        format!("{}% confidence", self.confidence)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultSection {
    pub title: &'static str,
    pub entries: Vec<ResultEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrgencyBanner {
    pub level: Urgency,
}

impl UrgencyBanner {
    pub fn label(&self) -> String {
        format!("Urgency Level: {}", self.level.as_str().to_uppercase())
    }
}

/// Display form of an analysis.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResultDisplay {
    pub conditions: Option<ResultSection>,
    pub tests: Option<ResultSection>,
    pub urgency: Option<UrgencyBanner>,
}

impl ResultDisplay {
    pub fn is_empty(&self) -> bool {
        self.conditions.is_none() && self.tests.is_none() && self.urgency.is_none()
    }
}

/// What the result area shows.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AnalysisPanel {
    #[default]
    Idle,
    Loading,
    Ready(ResultDisplay),
    Failed,
}

impl AnalysisPanel {
    pub fn display(&self) -> Option<&ResultDisplay> {
        match self {
            Self::Ready(display) => Some(display),
            _ => None,
        }
    }
}

pub fn render(payload: &AnalysisPayload) -> ResultDisplay {
    let conditions = payload
        .conditions
        .as_deref()
        .filter(|c| !c.is_empty())
        .map(|c| ResultSection {
            title: CONDITIONS_TITLE,
            entries: c.iter().map(condition_entry).collect(),
        });

    let tests = payload
        .tests
        .as_deref()
        .filter(|t| !t.is_empty())
        .map(|t| ResultSection {
            title: TESTS_TITLE,
            entries: t.iter().map(test_entry).collect(),
        });

    let urgency = payload.urgency.clone().map(|level| UrgencyBanner { level });

    ResultDisplay {
        conditions,
        tests,
        urgency,
    }
}

fn condition_entry(c: &Condition) -> ResultEntry {
    ResultEntry {
        name: c.name.clone(),
        confidence: percent(c.confidence),
        explanation: c.explanation.clone(),
        priority: None,
    }
}

fn test_entry(t: &RecommendedTest) -> ResultEntry {
    ResultEntry {
        name: t.name.clone(),
        confidence: percent(t.confidence),
        explanation: t.explanation.clone(),
        priority: t.priority.clone(),
    }
}

fn percent(raw: f64) -> u8 {
    if raw.is_nan() {
        return 0;
    }
    raw.round().clamp(0.0, 100.0) as u8
}

impl fmt::Display for ResultDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for section in [&self.conditions, &self.tests].into_iter().flatten() {
            writeln!(f, "## {}", section.title)?;
            for entry in &section.entries {
                writeln!(f, "- {} ({})", entry.name, entry.confidence_label())?;
                if !entry.explanation.is_empty() {
                    writeln!(f, "  {}", entry.explanation)?;
                }
                if let Some(priority) = &entry.priority {
                    writeln!(f, "  Priority: {priority}")?;
                }
            }
        }
        if let Some(urgency) = &self.urgency {
            writeln!(f, "## {}", urgency.label())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flu_with_low_urgency_and_no_tests() {
        let payload: AnalysisPayload = serde_json::from_value(serde_json::json!({
            "conditions": [{"name": "Flu", "confidence": 72, "explanation": "Fever with body aches"}],
            "urgency": "low"
        }))
        .unwrap();

        let display = render(&payload);
        let conditions = display.conditions.as_ref().unwrap();
        assert_eq!(conditions.title, CONDITIONS_TITLE);
        assert_eq!(conditions.entries[0].name, "Flu");
        assert_eq!(conditions.entries[0].confidence_label(), "72% confidence");
        assert!(display.tests.is_none());
        assert_eq!(display.urgency.as_ref().unwrap().level, Urgency::Low);

        let text = display.to_string();
        assert!(text.contains("Flu (72% confidence)"));
        assert!(text.contains("Urgency Level: LOW"));
        assert!(!text.contains(TESTS_TITLE));
    }

    #[test]
    fn tests_carry_priority() {
        let payload = AnalysisPayload {
            tests: Some(vec![RecommendedTest {
                name: "Complete blood count".into(),
                confidence: 80.4,
                explanation: "Checks for infection".into(),
                priority: Some("high".into()),
            }]),
            ..Default::default()
        };
        let display = render(&payload);
        assert!(display.conditions.is_none());
        let entry = &display.tests.as_ref().unwrap().entries[0];
        assert_eq!(entry.confidence, 80);
        assert_eq!(entry.priority.as_deref(), Some("high"));
        assert!(display.to_string().contains("Priority: high"));
    }

    #[test]
    fn empty_payload_renders_nothing() {
        let display = render(&AnalysisPayload::default());
        assert!(display.is_empty());
        assert_eq!(display.to_string(), "");

        let payload = AnalysisPayload {
            conditions: Some(Vec::new()),
            tests: Some(Vec::new()),
            urgency: None,
        };
        assert!(render(&payload).is_empty());
    }

    #[test]
    fn confidence_is_clamped() {
        assert_eq!(percent(-5.0), 0);
        assert_eq!(percent(150.0), 100);
        assert_eq!(percent(f64::NAN), 0);
        assert_eq!(percent(99.5), 100);
    }
}
