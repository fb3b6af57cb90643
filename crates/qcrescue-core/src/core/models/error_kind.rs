use phf::{Map, phf_map};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// An error label reported by the output parser for one step of a run.
///
/// The vocabulary is closed: every label the parser emits today maps to a named variant. A label
/// outside that vocabulary is kept verbatim in [`ErrorKind::Unclassified`] so that detection still
/// works and dispatch can refuse it explicitly instead of guessing.
///
/// Ordering follows the label text, which is the order the parser's error lists are sorted in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ErrorKind {
    PcmSolventDeprecated,
    AutozError,
    NoInputText,
    Killed,
    InsufficientStaticMemory,
    NotEnoughTotalMemory,
    NanValues,
    BadScfConvergence,
    GeometryOptimizationFailed,
    FreqJobTooSmall,
    ExitCode134,
    MissingMolecularCharge,
    MissingSpinMultiplicity,
    NegativeEigen,
    LambdaDeterminationFailed,
    UnknownError,
    Unclassified(String),
}

static LABELS: Map<&'static str, ErrorKind> = phf_map! {
    "pcm_solvent deprecated" => ErrorKind::PcmSolventDeprecated,
    "autoz error" => ErrorKind::AutozError,
    "No input text" => ErrorKind::NoInputText,
    "Killed" => ErrorKind::Killed,
    "Insufficient static memory" => ErrorKind::InsufficientStaticMemory,
    "Not Enough Total Memory" => ErrorKind::NotEnoughTotalMemory,
    "NAN values" => ErrorKind::NanValues,
    "Bad SCF convergence" => ErrorKind::BadScfConvergence,
    "Geometry optimization failed" => ErrorKind::GeometryOptimizationFailed,
    "Freq Job Too Small" => ErrorKind::FreqJobTooSmall,
    "Exit Code 134" => ErrorKind::ExitCode134,
    "Molecular charge is not found" => ErrorKind::MissingMolecularCharge,
    "Molecular spin multipilicity is not found" => ErrorKind::MissingSpinMultiplicity,
    "Negative Eigen" => ErrorKind::NegativeEigen,
    "Lamda Determination Failed" => ErrorKind::LambdaDeterminationFailed,
    "Unknown Error" => ErrorKind::UnknownError,
};

impl ErrorKind {
    /// Maps a parser label onto the vocabulary.
    pub fn from_label(label: &str) -> Self {
        LABELS
            .get(label)
            .cloned()
            .unwrap_or_else(|| ErrorKind::Unclassified(label.to_string()))
    }

    pub fn is_unclassified(&self) -> bool {
        matches!(self, ErrorKind::Unclassified(_))
    }

    /// The exact label the output parser uses for this error.
    pub fn label(&self) -> &str {
        match self {
            ErrorKind::PcmSolventDeprecated => "pcm_solvent deprecated",
            ErrorKind::AutozError => "autoz error",
            ErrorKind::NoInputText => "No input text",
            ErrorKind::Killed => "Killed",
            ErrorKind::InsufficientStaticMemory => "Insufficient static memory",
            ErrorKind::NotEnoughTotalMemory => "Not Enough Total Memory",
            ErrorKind::NanValues => "NAN values",
            ErrorKind::BadScfConvergence => "Bad SCF convergence",
            ErrorKind::GeometryOptimizationFailed => "Geometry optimization failed",
            ErrorKind::FreqJobTooSmall => "Freq Job Too Small",
            ErrorKind::ExitCode134 => "Exit Code 134",
            ErrorKind::MissingMolecularCharge => "Molecular charge is not found",
            ErrorKind::MissingSpinMultiplicity => "Molecular spin multipilicity is not found",
            ErrorKind::NegativeEigen => "Negative Eigen",
            ErrorKind::LambdaDeterminationFailed => "Lamda Determination Failed",
            ErrorKind::UnknownError => "Unknown Error",
            ErrorKind::Unclassified(label) => label,
        }
    }
}

impl PartialOrd for ErrorKind {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ErrorKind {
    fn cmp(&self, other: &Self) -> Ordering {
        self.label()
            .cmp(other.label())
            .then_with(|| self.is_unclassified().cmp(&other.is_unclassified()))
    }
}

impl From<String> for ErrorKind {
    fn from(label: String) -> Self {
        ErrorKind::from_label(&label)
    }
}

impl From<ErrorKind> for String {
    fn from(kind: ErrorKind) -> Self {
        kind.label().to_string()
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn unclassified_with_known_label_orders_after_named_variant() {
        let odd = ErrorKind::Unclassified("Killed".to_string());
        assert_ne!(odd, ErrorKind::Killed);
        assert_eq!(ErrorKind::Killed.cmp(&odd), Ordering::Less);
        assert_eq!(odd.cmp(&ErrorKind::Killed), Ordering::Greater);
        let set: BTreeSet<ErrorKind> = [odd.clone(), ErrorKind::Killed].into_iter().collect();
        assert_eq!(set.len(), 2);
        assert_eq!(set.into_iter().collect::<Vec<_>>(), vec![ErrorKind::Killed, odd]);
    }

    #[test]
    fn from_label_recognizes_parser_vocabulary() {
        assert_eq!(ErrorKind::from_label("Killed"), ErrorKind::Killed);
        assert_eq!(
            ErrorKind::from_label("Lamda Determination Failed"),
            ErrorKind::LambdaDeterminationFailed
        );
        assert_eq!(
            ErrorKind::from_label("Molecular spin multipilicity is not found"),
            ErrorKind::MissingSpinMultiplicity
        );
    }

    #[test]
    fn from_label_keeps_unknown_labels_verbatim() {
        let kind = ErrorKind::from_label("Basis set not found");
        assert_eq!(kind, ErrorKind::Unclassified("Basis set not found".into()));
        assert_eq!(kind.label(), "Basis set not found");
    }

    #[test]
    fn labels_round_trip_for_every_named_variant() {
        for (label, kind) in LABELS.entries() {
            assert_eq!(kind.label(), *label);
        }
    }

    #[test]
    fn ordering_follows_label_text() {
        let set: BTreeSet<ErrorKind> = [
            ErrorKind::Killed,
            ErrorKind::PcmSolventDeprecated,
            ErrorKind::BadScfConvergence,
            ErrorKind::Killed,
        ]
        .into_iter()
        .collect();
        let labels: Vec<_> = set.iter().map(|k| k.label()).collect();
        assert_eq!(
            labels,
            vec!["Bad SCF convergence", "Killed", "pcm_solvent deprecated"]
        );
    }

    #[test]
    fn serializes_as_plain_label() {
        let json = serde_json::to_string(&ErrorKind::NanValues).unwrap();
        assert_eq!(json, "\"NAN values\"");
        let back: ErrorKind = serde_json::from_str("\"Exit Code 134\"").unwrap();
        assert_eq!(back, ErrorKind::ExitCode134);
    }
}
