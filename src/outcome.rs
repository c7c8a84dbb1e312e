//! Trial outcome classification
//!
//! What counts as a "success" or a "miss" depends on the task's state
//! machine, so the crate never names outcomes itself. Callers implement
//! `TrialOutcomeClassifier` for their paradigm.

use crate::session::TrialView;

/// Capability to label a trial with a paradigm-specific outcome
pub trait TrialOutcomeClassifier {
    type Outcome;

    fn classify(&self, trial: &TrialView<'_>) -> Self::Outcome;
}

impl<F, O> TrialOutcomeClassifier for F
where
    F: Fn(&TrialView<'_>) -> O,
{
    type Outcome = O;

    fn classify(&self, trial: &TrialView<'_>) -> O {
        self(trial)
    }
}
