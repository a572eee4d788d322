//! View model — everything a presentation surface needs, and the trait it
//! implements to receive it.

use crate::followup::FollowUpPanel;
use crate::results::AnalysisPanel;
use crate::search::SuggestionPanel;
use crate::session::{Demographics, HistoryAnswer, HistoryKey};
use crate::wizard::Step;

pub const NEXT_LABEL: &str = "Continue";
pub const RESULTS_LABEL: &str = "Get Results";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepIndicator {
    pub step: Step,
    pub title: &'static str,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub show_back: bool,
    pub show_next: bool,
    pub next_label: &'static str,
}

impl Navigation {
    pub fn for_step(step: Step) -> Self {
        Self {
            show_back: step != Step::Sex,
            show_next: step != Step::Results,
            next_label: if step == Step::FollowUp {
                RESULTS_LABEL
            } else {
                NEXT_LABEL
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryQuestionView {
    pub key: HistoryKey,
    pub text: &'static str,
    pub options: &'static [HistoryAnswer],
    pub selected: Option<HistoryAnswer>,
}

/// Snapshot of the engine for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewModel {
    pub active_step: Step,
    /// One indicator per step; exactly one is active.
    pub steps: Vec<StepIndicator>,
    pub navigation: Navigation,
    /// Last validation message, cleared by the next transition.
    pub notice: Option<String>,
    pub demographics: Demographics,
    pub history: Vec<HistoryQuestionView>,
    pub query: String,
    pub suggestions: SuggestionPanel,
    pub selected_symptoms: Vec<String>,
    pub follow_up: FollowUpPanel,
    pub analysis: AnalysisPanel,
}

impl ViewModel {
    pub fn step_indicators(active: Step) -> Vec<StepIndicator> {
        Step::ALL
            .into_iter()
            .map(|step| StepIndicator {
                step,
                title: step.title(),
                active: step == active,
            })
            .collect()
    }
}

/// A presentation surface.
pub trait Presenter: Send {
    fn render(&mut self, view: &ViewModel);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn navigation_chrome() {
        let first = Navigation::for_step(Step::Sex);
        assert!(!first.show_back);
        assert!(first.show_next);
        assert_eq!(first.next_label, NEXT_LABEL);

        assert_eq!(Navigation::for_step(Step::FollowUp).next_label, RESULTS_LABEL);

        let last = Navigation::for_step(Step::Results);
        assert!(last.show_back);
        assert!(!last.show_next);
    }

    #[test]
    fn exactly_one_indicator_active() {
        for step in Step::ALL {
            let indicators = ViewModel::step_indicators(step);
            assert_eq!(indicators.len(), 6);
            let active: Vec<_> = indicators.iter().filter(|i| i.active).collect();
            assert_eq!(active.len(), 1);
            assert_eq!(active[0].step, step);
        }
    }
}
