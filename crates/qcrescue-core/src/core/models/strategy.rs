use serde::{Deserialize, Serialize};
use std::fmt;

/// Version stamped on newly created SCF strategies.
pub const SCF_STRATEGY_VERSION: f64 = 2.0;

/// A named remedy for SCF non-convergence.
///
/// Each method fixes an SCF algorithm and an initial guess; `fon` additionally enables
/// fractional orbital occupation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScfMethod {
    #[serde(rename = "increase_iter")]
    IncreaseIter,
    #[serde(rename = "rca_diis")]
    RcaDiis,
    #[serde(rename = "gwh")]
    Gwh,
    #[serde(rename = "gdm")]
    Gdm,
    #[serde(rename = "rca")]
    Rca,
    #[serde(rename = "core+rca")]
    CoreRca,
    #[serde(rename = "diis_gdm")]
    DiisGdm,
    #[serde(rename = "core+gdm")]
    CoreGdm,
    #[serde(rename = "fon")]
    Fon,
}

impl ScfMethod {
    /// Ordering tried when the SCF was still far from convergence.
    pub const RCA_FIRST: [ScfMethod; 7] = [
        ScfMethod::IncreaseIter,
        ScfMethod::RcaDiis,
        ScfMethod::Gwh,
        ScfMethod::Gdm,
        ScfMethod::Rca,
        ScfMethod::CoreRca,
        ScfMethod::Fon,
    ];

    /// Ordering tried when the SCF was close to convergence.
    pub const GDM_FIRST: [ScfMethod; 7] = [
        ScfMethod::IncreaseIter,
        ScfMethod::DiisGdm,
        ScfMethod::Gwh,
        ScfMethod::Rca,
        ScfMethod::Gdm,
        ScfMethod::CoreGdm,
        ScfMethod::Fon,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ScfMethod::IncreaseIter => "increase_iter",
            ScfMethod::RcaDiis => "rca_diis",
            ScfMethod::Gwh => "gwh",
            ScfMethod::Gdm => "gdm",
            ScfMethod::Rca => "rca",
            ScfMethod::CoreRca => "core+rca",
            ScfMethod::DiisGdm => "diis_gdm",
            ScfMethod::CoreGdm => "core+gdm",
            ScfMethod::Fon => "fon",
        }
    }

    /// The `(scf_algorithm, scf_guess)` pair this method applies.
    pub fn settings(&self) -> (&'static str, &'static str) {
        match self {
            ScfMethod::IncreaseIter => ("diis", "sad"),
            ScfMethod::RcaDiis => ("rca_diis", "sad"),
            ScfMethod::Gwh => ("diis", "gwh"),
            ScfMethod::Gdm => ("gdm", "sad"),
            ScfMethod::Rca => ("rca", "sad"),
            ScfMethod::CoreRca => ("rca", "core"),
            ScfMethod::DiisGdm => ("diis_gdm", "sad"),
            ScfMethod::CoreGdm => ("gdm", "core"),
            ScfMethod::Fon => ("diis", "sad"),
        }
    }
}

impl fmt::Display for ScfMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A named remedy for a geometry optimization that ran out of cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GeomMethod {
    #[serde(rename = "increase_iter")]
    IncreaseIter,
    #[serde(rename = "GDIIS")]
    Gdiis,
    #[serde(rename = "CartCoords")]
    CartCoords,
}

impl GeomMethod {
    pub const ALL: [GeomMethod; 3] = [
        GeomMethod::IncreaseIter,
        GeomMethod::Gdiis,
        GeomMethod::CartCoords,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            GeomMethod::IncreaseIter => "increase_iter",
            GeomMethod::Gdiis => "GDIIS",
            GeomMethod::CartCoords => "CartCoords",
        }
    }
}

impl fmt::Display for GeomMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Progress through an ordered list of fix methods.
///
/// The record is embedded as JSON in the step's `$comment` so a later process resumes where the
/// previous one stopped. Field order matches the sorted-key JSON layout of existing decks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixStrategy<M> {
    pub current_method_id: usize,
    pub methods: Vec<M>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<f64>,
}

impl<M: Copy> FixStrategy<M> {
    pub fn new(methods: Vec<M>, version: Option<f64>) -> Self {
        Self {
            current_method_id: 0,
            methods,
            version,
        }
    }

    /// Moves on to the next method.
    pub fn advance(&mut self) {
        self.current_method_id += 1;
    }

    /// The method to apply now, or `None` once every method has been tried.
    pub fn current(&self) -> Option<M> {
        self.methods.get(self.current_method_id).copied()
    }

    pub fn is_exhausted(&self) -> bool {
        self.current_method_id >= self.methods.len()
    }
}

impl FixStrategy<ScfMethod> {
    /// Picks the SCF method ordering from the last energy change of the failed SCF.
    pub fn for_scf(last_delta_energy: f64, rca_gdm_thresh: f64) -> Self {
        let methods = if last_delta_energy >= rca_gdm_thresh {
            ScfMethod::RCA_FIRST
        } else {
            ScfMethod::GDM_FIRST
        };
        Self::new(methods.to_vec(), Some(SCF_STRATEGY_VERSION))
    }
}

impl FixStrategy<GeomMethod> {
    pub fn for_geometry() -> Self {
        Self::new(GeomMethod::ALL.to_vec(), None)
    }
}
