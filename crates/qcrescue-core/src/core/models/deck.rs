use super::molecule::Molecule;
use super::results::JobType;
use super::strategy::{FixStrategy, GeomMethod, ScfMethod};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;

/// The `$rem` directives of a job step.
///
/// Q-Chem treats keys and values case-insensitively, so both are normalized to lower case on the
/// way in. Values are kept as text; typed accessors parse on demand.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rem(BTreeMap<String, String>);

impl Rem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(&key.to_ascii_lowercase()).map(String::as_str)
    }

    /// Parses the directive as an integer; `None` when absent or not numeric.
    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(|v| v.parse().ok())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(&key.to_ascii_lowercase())
    }

    pub fn set(&mut self, key: &str, value: impl Display) {
        self.0.insert(
            key.to_ascii_lowercase(),
            value.to_string().to_ascii_lowercase(),
        );
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(&key.to_ascii_lowercase())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The `$molecule` section of a job step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoleculeSection {
    /// `read`: take the geometry from the previous job in the same deck.
    Read,
    Explicit(Molecule),
}

impl MoleculeSection {
    pub fn as_molecule(&self) -> Option<&Molecule> {
        match self {
            MoleculeSection::Read => None,
            MoleculeSection::Explicit(mol) => Some(mol),
        }
    }
}

/// The `$comment` section: free-text annotation plus the fix strategies persisted inside it.
///
/// On disk the strategies live as sentinel-delimited JSON inside the comment text; in memory they
/// are explicit fields so the engine never edits the text directly.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Comment {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scf_strategy: Option<FixStrategy<ScfMethod>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geom_strategy: Option<FixStrategy<GeomMethod>>,
}

impl Comment {
    pub fn from_text(text: &str) -> Self {
        Self {
            text: text.to_string(),
            ..Default::default()
        }
    }

    /// True when nothing would be written to a `$comment` section.
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty() && self.scf_strategy.is_none() && self.geom_strategy.is_none()
    }
}

/// One job of an input deck.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStep {
    pub molecule: MoleculeSection,
    pub rem: Rem,
    /// Other `$sections` keyed by lower-case name, stored as their raw body text.
    #[serde(default)]
    pub sections: BTreeMap<String, String>,
    #[serde(default)]
    pub comment: Comment,
}

impl JobStep {
    pub fn new(molecule: MoleculeSection) -> Self {
        Self {
            molecule,
            rem: Rem::new(),
            sections: BTreeMap::new(),
            comment: Comment::default(),
        }
    }

    /// The step's job type; Q-Chem defaults to a single point when `jobtype` is absent.
    pub fn job_type(&self) -> JobType {
        self.rem
            .get("jobtype")
            .map(JobType::from_name)
            .unwrap_or_default()
    }

    pub fn disable_symmetry(&mut self) {
        self.rem.set("sym_ignore", true);
        self.rem.set("symmetry", false);
    }

    /// Sets the DFT quadrature grid as `radial` points by `angular` Lebedev points.
    pub fn set_dft_grid(&mut self, radial: u32, angular: u32) {
        self.rem
            .set("xc_grid", format!("{:06}{:06}", radial, angular));
    }

    pub fn set_integral_threshold(&mut self, thresh: u32) {
        self.rem.set("thresh", thresh);
    }

    pub fn set_scf_algorithm_and_iterations(&mut self, algorithm: &str, iterations: usize) {
        self.rem.set("scf_algorithm", algorithm);
        self.rem.set("max_scf_cycles", iterations);
    }

    pub fn set_scf_initial_guess(&mut self, guess: &str) {
        self.rem.set("scf_guess", guess);
    }

    pub fn set_scf_convergence_threshold(&mut self, exponent: u32) {
        self.rem.set("scf_convergence", exponent);
    }

    pub fn set_geom_max_iterations(&mut self, iterations: usize) {
        self.rem.set("geom_opt_max_cycles", iterations);
    }

    /// Sets the GDIIS subspace size; `0` turns GDIIS off.
    pub fn set_geom_opt_use_gdiis(&mut self, subspace_size: u32) {
        self.rem.set("geom_opt_max_diis", subspace_size);
    }

    pub fn set_geom_opt_coords_type(&mut self, coords: GeomCoords) {
        self.rem.set("geom_opt_coords", coords.code());
    }
}

/// Coordinate systems the geometry optimizer can work in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeomCoords {
    Delocalized,
    Cartesian,
    ZMatrix,
}

impl GeomCoords {
    fn code(self) -> i32 {
        match self {
            GeomCoords::Delocalized => -1,
            GeomCoords::Cartesian => 0,
            GeomCoords::ZMatrix => 2,
        }
    }
}

/// An ordered list of job steps; the unit the engine reads and rewrites.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InputDeck {
    pub jobs: Vec<JobStep>,
}

impl InputDeck {
    pub fn new(jobs: Vec<JobStep>) -> Self {
        Self { jobs }
    }

    /// Atom count of the first step carrying an explicit geometry.
    pub fn first_atom_count(&self) -> Option<usize> {
        self.jobs
            .iter()
            .find_map(|job| job.molecule.as_molecule())
            .map(Molecule::len)
    }
}
