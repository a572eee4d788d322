//! Wizard state machine — tracks which of the six steps is active.

use serde::{Deserialize, Serialize};

/// The six intake screens.
///
/// Forward order: Sex → Age → History → Symptoms → FollowUp → Results.
/// Results is the last screen but not terminal: earlier steps stay reachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Sex,
    Age,
    History,
    Symptoms,
    FollowUp,
    Results,
}

impl Step {
    pub const ALL: [Step; 6] = [
        Self::Sex,
        Self::Age,
        Self::History,
        Self::Symptoms,
        Self::FollowUp,
        Self::Results,
    ];

    /// 1-based position of the step.
    pub fn number(self) -> u8 {
        match self {
            Self::Sex => 1,
            Self::Age => 2,
            Self::History => 3,
            Self::Symptoms => 4,
            Self::FollowUp => 5,
            Self::Results => 6,
        }
    }

    pub fn from_number(n: u8) -> Option<Step> {
        Self::ALL.into_iter().find(|s| s.number() == n)
    }

    pub fn next(self) -> Option<Step> {
        Self::from_number(self.number() + 1)
    }

    pub fn previous(self) -> Option<Step> {
        self.number().checked_sub(1).and_then(Self::from_number)
    }

    /// Completed steps are always reachable, plus at most one step ahead.
    pub fn can_jump_to(self, target: Step) -> bool {
        target.number() <= self.number() + 1
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Sex => "Sex",
            Self::Age => "Age",
            Self::History => "Medical history",
            Self::Symptoms => "Symptoms",
            Self::FollowUp => "Follow-up questions",
            Self::Results => "Results",
        }
    }
}

impl Default for Step {
    fn default() -> Self {
        Self::Sex
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Sex => "sex",
            Self::Age => "age",
            Self::History => "history",
            Self::Symptoms => "symptoms",
            Self::FollowUp => "follow_up",
            Self::Results => "results",
        };
        write!(f, "{s}")
    }
}

/// Position of the wizard. Knows nothing about validation or side effects.
#[derive(Debug, Clone, Default)]
pub struct Wizard {
    current: Step,
}

impl Wizard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Step {
        self.current
    }

    pub fn is_active(&self, step: Step) -> bool {
        self.current == step
    }

    /// Move forward one step. Returns the new step, or `None` on the last one.
    pub fn advance(&mut self) -> Option<Step> {
        let next = self.current.next()?;
        self.current = next;
        Some(next)
    }

    /// Move back one step. Returns the new step, or `None` on the first one.
    pub fn retreat(&mut self) -> Option<Step> {
        let prev = self.current.previous()?;
        self.current = prev;
        Some(prev)
    }

    /// Jump to `target` if it is reachable from the current step.
    pub fn jump_to(&mut self, target: Step) -> bool {
        if !self.current.can_jump_to(target) {
            return false;
        }
        self.current = target;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_are_one_based_and_dense() {
        for (i, step) in Step::ALL.into_iter().enumerate() {
            assert_eq!(step.number() as usize, i + 1);
            assert_eq!(Step::from_number(step.number()), Some(step));
        }
        assert!(Step::from_number(0).is_none());
        assert!(Step::from_number(7).is_none());
    }

    #[test]
    fn next_walks_all_steps() {
        let mut current = Step::Sex;
        for expected in &Step::ALL[1..] {
            let next = current.next().unwrap();
            assert_eq!(next, *expected);
            current = next;
        }
        assert!(current.next().is_none());
        assert!(Step::Sex.previous().is_none());
    }

    #[test]
    fn jump_reachability() {
        use Step::*;
        assert!(History.can_jump_to(Sex));
        assert!(History.can_jump_to(History));
        assert!(History.can_jump_to(Symptoms));
        assert!(!History.can_jump_to(FollowUp));
        assert!(!Sex.can_jump_to(History));
        assert!(Results.can_jump_to(Sex));
    }

    #[test]
    fn display_matches_serde() {
        for step in Step::ALL {
            let display = format!("{step}");
            let json = serde_json::to_string(&step).unwrap();
            assert_eq!(
                format!("\"{display}\""),
                json,
                "Display and serde should match for {step:?}"
            );
        }
    }

    #[test]
    fn wizard_stays_in_bounds() {
        let mut wizard = Wizard::new();
        assert_eq!(wizard.current(), Step::Sex);
        assert!(wizard.retreat().is_none());
        assert_eq!(wizard.current(), Step::Sex);

        for _ in 0..10 {
            wizard.advance();
        }
        assert_eq!(wizard.current(), Step::Results);
        assert!(wizard.advance().is_none());

        assert_eq!(wizard.retreat(), Some(Step::FollowUp));
    }

    #[test]
    fn wizard_jump_is_ignored_when_too_far() {
        let mut wizard = Wizard::new();
        assert!(!wizard.jump_to(Step::History));
        assert_eq!(wizard.current(), Step::Sex);

        assert!(wizard.jump_to(Step::Age));
        assert!(wizard.jump_to(Step::History));
        assert!(wizard.jump_to(Step::Sex));
        assert!(wizard.is_active(Step::Sex));
    }
}
