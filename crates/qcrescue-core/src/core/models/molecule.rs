use nalgebra::Point3;
use serde::{Deserialize, Serialize};

/// A single atomic site of a molecule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    /// Element symbol as written in the `$molecule` section (e.g. "C", "Li").
    pub species: String,
    /// Cartesian coordinates in Angstroms.
    pub coords: Point3<f64>,
}

impl Site {
    pub fn new(species: &str, coords: Point3<f64>) -> Self {
        Self {
            species: species.to_string(),
            coords,
        }
    }
}

/// A molecular geometry together with its total charge and spin multiplicity.
///
/// This is the unit exchanged between the output parser (trajectory snapshots) and the input
/// deck (the `$molecule` section of a job step).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Molecule {
    /// Total molecular charge in elementary charge units.
    pub charge: i32,
    /// Spin multiplicity (2S + 1).
    pub spin_multiplicity: u32,
    /// Atomic sites in input order.
    pub sites: Vec<Site>,
}

impl Molecule {
    pub fn new(charge: i32, spin_multiplicity: u32, sites: Vec<Site>) -> Self {
        Self {
            charge,
            spin_multiplicity,
            sites,
        }
    }

    /// Number of atoms in the molecule.
    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn water() -> Molecule {
        Molecule::new(
            0,
            1,
            vec![
                Site::new("O", Point3::new(0.0, 0.0, 0.1173)),
                Site::new("H", Point3::new(0.0, 0.7572, -0.4692)),
                Site::new("H", Point3::new(0.0, -0.7572, -0.4692)),
            ],
        )
    }

    #[test]
    fn len_counts_sites() {
        let mol = water();
        assert_eq!(mol.len(), 3);
        assert!(!mol.is_empty());
    }

    #[test]
    fn empty_molecule_reports_empty() {
        let mol = Molecule::new(-1, 2, Vec::new());
        assert!(mol.is_empty());
        assert_eq!(mol.len(), 0);
    }

    #[test]
    fn serializes_coordinates_as_arrays() {
        let mol = water();
        let json = serde_json::to_value(&mol).unwrap();
        assert_eq!(json["sites"][0]["species"], "O");
        assert_eq!(json["sites"][1]["coords"][1], 0.7572);
        let back: Molecule = serde_json::from_value(json).unwrap();
        assert_eq!(back, mol);
    }
}
