//! Tour state machine — which phase a mounted tour is in and which step it
//! is showing. Pure data; side effects live in the engine.

use serde::{Deserialize, Serialize};

use super::step::Step;

/// Phases of one tour mount.
///
/// Idle → (AwaitingConsent →) Running → Terminal. Idle and AwaitingConsent can
/// also go straight to Terminal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TourPhase {
    #[default]
    Idle,
    AwaitingConsent,
    Running,
    Terminal,
}

impl TourPhase {
    /// Check if a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: TourPhase) -> bool {
        use TourPhase::*;
        matches!(
            (self, target),
            (Idle, AwaitingConsent)
                | (Idle, Running)
                | (Idle, Terminal)
                | (AwaitingConsent, Running)
                | (AwaitingConsent, Terminal)
                | (Running, Terminal)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminal)
    }
}

impl std::fmt::Display for TourPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::AwaitingConsent => "awaiting_consent",
            Self::Running => "running",
            Self::Terminal => "terminal",
        };
        write!(f, "{s}")
    }
}

/// How a tour ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TourOutcome {
    Completed,
    Skipped,
}

/// Per-mount engine state. Never persisted.
#[derive(Debug, Clone, Default)]
pub struct TourEngineState {
    pub phase: TourPhase,
    pub step_index: usize,
    /// Steps whose targets resolved when the tour began running.
    pub filtered_steps: Vec<Step>,
    /// Set once the start decision has been made for this mount.
    pub has_started: bool,
    pub outcome: Option<TourOutcome>,
}

impl TourEngineState {
    /// Claim the one start decision of this mount. False if already claimed.
    pub fn mark_started(&mut self) -> bool {
        if self.has_started {
            return false;
        }
        self.has_started = true;
        true
    }

    fn transition_to(&mut self, target: TourPhase) -> Result<(), String> {
        if !self.phase.can_transition_to(target) {
            return Err(format!("Cannot transition from {} to {}", self.phase, target));
        }
        self.phase = target;
        Ok(())
    }

    pub fn await_consent(&mut self) -> Result<(), String> {
        self.transition_to(TourPhase::AwaitingConsent)
    }

    /// Enter Running at the first of `steps`.
    pub fn run(&mut self, steps: Vec<Step>) -> Result<(), String> {
        self.transition_to(TourPhase::Running)?;
        self.filtered_steps = steps;
        self.step_index = 0;
        Ok(())
    }

    /// Move to the next step. `None` means the current step was the last one.
    pub fn advance(&mut self) -> Option<usize> {
        if self.step_index + 1 < self.filtered_steps.len() {
            self.step_index += 1;
            Some(self.step_index)
        } else {
            None
        }
    }

    /// Move to the previous step, staying put at the first one.
    pub fn rewind(&mut self) -> usize {
        self.step_index = self.step_index.saturating_sub(1);
        self.step_index
    }

    pub fn finish(&mut self, outcome: TourOutcome) -> Result<(), String> {
        self.transition_to(TourPhase::Terminal)?;
        self.outcome = Some(outcome);
        Ok(())
    }

    pub fn current_step(&self) -> Option<&Step> {
        match self.phase {
            TourPhase::Running => self.filtered_steps.get(self.step_index),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn steps(n: usize) -> Vec<Step> {
        (0..n)
            .map(|i| Step::new(&format!("#s{i}"), &format!("Step {i}"), "..."))
            .collect()
    }

    #[test]
    fn valid_transitions() {
        use TourPhase::*;
        let transitions = [
            (Idle, AwaitingConsent),
            (Idle, Running),
            (Idle, Terminal),
            (AwaitingConsent, Running),
            (AwaitingConsent, Terminal),
            (Running, Terminal),
        ];
        for (from, to) in transitions {
            assert!(from.can_transition_to(to), "{from} should transition to {to}");
        }
    }

    #[test]
    fn invalid_transitions() {
        use TourPhase::*;
        assert!(!Running.can_transition_to(AwaitingConsent));
        assert!(!Running.can_transition_to(Idle));
        assert!(!Terminal.can_transition_to(Running));
        assert!(!Terminal.can_transition_to(Idle));
        assert!(!Running.can_transition_to(Running));
    }

    #[test]
    fn display_matches_serde() {
        use TourPhase::*;
        for phase in [Idle, AwaitingConsent, Running, Terminal] {
            let json = serde_json::to_string(&phase).unwrap();
            assert_eq!(format!("\"{phase}\""), json);
        }
    }

    #[test]
    fn start_is_claimed_once() {
        let mut state = TourEngineState::default();
        assert!(state.mark_started());
        assert!(!state.mark_started());
        assert!(state.has_started);
    }

    #[test]
    fn advance_and_rewind_within_bounds() {
        let mut state = TourEngineState::default();
        state.run(steps(3)).unwrap();
        assert_eq!(state.step_index, 0);

        assert_eq!(state.rewind(), 0, "rewind at first step is a no-op");
        assert_eq!(state.advance(), Some(1));
        assert_eq!(state.advance(), Some(2));
        assert_eq!(state.advance(), None, "last step cannot advance");
        assert_eq!(state.step_index, 2);
        assert_eq!(state.rewind(), 1);
        assert_eq!(state.current_step().unwrap().target, "#s1");
    }

    #[test]
    fn terminal_is_final() {
        let mut state = TourEngineState::default();
        state.run(steps(1)).unwrap();
        state.finish(TourOutcome::Completed).unwrap();
        assert!(state.phase.is_terminal());
        assert_eq!(state.outcome, Some(TourOutcome::Completed));
        assert!(state.finish(TourOutcome::Skipped).is_err());
        assert!(state.run(steps(1)).is_err());
        assert!(state.current_step().is_none());
    }
}
