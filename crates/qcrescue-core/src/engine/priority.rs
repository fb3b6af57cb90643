use crate::core::models::error_kind::ErrorKind;
use std::collections::BTreeSet;

/// Error kinds in the order they are fixed when several are reported together, highest first.
pub const PRIORITY: [ErrorKind; 13] = [
    ErrorKind::PcmSolventDeprecated,
    ErrorKind::AutozError,
    ErrorKind::NoInputText,
    ErrorKind::Killed,
    ErrorKind::InsufficientStaticMemory,
    ErrorKind::NotEnoughTotalMemory,
    ErrorKind::NanValues,
    ErrorKind::BadScfConvergence,
    ErrorKind::GeometryOptimizationFailed,
    ErrorKind::FreqJobTooSmall,
    ErrorKind::ExitCode134,
    ErrorKind::MissingMolecularCharge,
    ErrorKind::MissingSpinMultiplicity,
];

/// Picks the error a correction addresses: the highest-ranked one present, otherwise the
/// label-smallest.
pub fn governing_error(errors: &BTreeSet<ErrorKind>) -> Option<&ErrorKind> {
    PRIORITY
        .iter()
        .find_map(|kind| errors.get(kind))
        .or_else(|| errors.first())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(kinds: &[ErrorKind]) -> BTreeSet<ErrorKind> {
        kinds.iter().cloned().collect()
    }

    #[test]
    fn highest_ranked_error_governs() {
        let errors = set(&[
            ErrorKind::ExitCode134,
            ErrorKind::BadScfConvergence,
            ErrorKind::Killed,
        ]);
        assert_eq!(governing_error(&errors), Some(&ErrorKind::Killed));
    }

    #[test]
    fn selection_does_not_depend_on_insertion_order() {
        let forward = set(&[ErrorKind::NanValues, ErrorKind::GeometryOptimizationFailed]);
        let backward = set(&[ErrorKind::GeometryOptimizationFailed, ErrorKind::NanValues]);
        assert_eq!(governing_error(&forward), governing_error(&backward));
        assert_eq!(governing_error(&forward), Some(&ErrorKind::NanValues));
    }

    #[test]
    fn pcm_solvent_outranks_killed() {
        let errors = set(&[ErrorKind::Killed, ErrorKind::PcmSolventDeprecated]);
        assert_eq!(
            governing_error(&errors),
            Some(&ErrorKind::PcmSolventDeprecated)
        );
    }

    #[test]
    fn unranked_errors_fall_back_to_label_order() {
        let errors = set(&[
            ErrorKind::UnknownError,
            ErrorKind::NegativeEigen,
            ErrorKind::LambdaDeterminationFailed,
        ]);
        assert_eq!(
            governing_error(&errors),
            Some(&ErrorKind::LambdaDeterminationFailed)
        );
    }

    #[test]
    fn ranked_error_beats_unclassified_label() {
        let errors = set(&[
            ErrorKind::Unclassified("Aaa weird failure".into()),
            ErrorKind::FreqJobTooSmall,
        ]);
        assert_eq!(governing_error(&errors), Some(&ErrorKind::FreqJobTooSmall));
    }

    #[test]
    fn empty_set_has_no_governing_error() {
        assert_eq!(governing_error(&BTreeSet::new()), None);
    }
}
