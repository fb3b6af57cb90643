use crate::core::models::error_kind::ErrorKind;
use crate::core::models::results::StepResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Where a run failed and what went wrong there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnosis {
    /// Index of the first failing step; also the index of the deck job to fix.
    pub error_step_id: usize,
    /// Sorted by label, without duplicates.
    pub errors: BTreeSet<ErrorKind>,
}

impl Diagnosis {
    pub fn has(&self, kind: &ErrorKind) -> bool {
        self.errors.contains(kind)
    }
}

/// Finds the first step reporting an error.
pub fn detect(steps: &[StepResult]) -> Option<Diagnosis> {
    steps
        .iter()
        .enumerate()
        .find(|(_, step)| step.has_error)
        .map(|(idx, step)| Diagnosis {
            error_step_id: idx,
            errors: step.errors.iter().cloned().collect(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(has_error: bool, errors: &[ErrorKind]) -> StepResult {
        StepResult {
            has_error,
            errors: errors.to_vec(),
            ..Default::default()
        }
    }

    #[test]
    fn clean_run_has_no_diagnosis() {
        assert_eq!(detect(&[step(false, &[]), step(false, &[])]), None);
        assert_eq!(detect(&[]), None);
    }

    #[test]
    fn first_failing_step_wins() {
        let steps = [
            step(false, &[]),
            step(true, &[ErrorKind::Killed]),
            step(true, &[ErrorKind::NanValues]),
        ];
        let diagnosis = detect(&steps).unwrap();
        assert_eq!(diagnosis.error_step_id, 1);
        assert!(diagnosis.has(&ErrorKind::Killed));
        assert!(!diagnosis.has(&ErrorKind::NanValues));
    }

    #[test]
    fn errors_are_sorted_and_deduplicated() {
        let steps = [step(
            true,
            &[
                ErrorKind::GeometryOptimizationFailed,
                ErrorKind::BadScfConvergence,
                ErrorKind::GeometryOptimizationFailed,
            ],
        )];
        let diagnosis = detect(&steps).unwrap();
        let labels: Vec<&str> = diagnosis.errors.iter().map(ErrorKind::label).collect();
        assert_eq!(
            labels,
            vec!["Bad SCF convergence", "Geometry optimization failed"]
        );
    }

    #[test]
    fn detection_is_idempotent() {
        let steps = [step(true, &[ErrorKind::AutozError])];
        assert_eq!(detect(&steps), detect(&steps));
    }
}
