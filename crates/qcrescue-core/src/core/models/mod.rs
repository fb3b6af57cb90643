//! # Core Models Module
//!
//! Data structures describing a Q-Chem run from the point of view of the correction engine.
//!
//! ## Key Components
//!
//! - [`molecule`] - Cartesian molecular geometry with charge and spin multiplicity
//! - [`deck`] - The input deck: an ordered list of job steps with `$rem` directives, extra
//!   sections, molecule and comment
//! - [`results`] - Per-step results produced by the output parser
//! - [`error_kind`] - The closed vocabulary of error labels the output parser emits
//! - [`strategy`] - Multi-attempt fix strategies persisted across process restarts
//!
//! ## Usage
//!
//! ```ignore
//! use qcrescue::core::models::deck::{InputDeck, JobStep};
//!
//! let mut step = JobStep::new(MoleculeSection::Explicit(molecule));
//! step.rem.set("jobtype", "opt");
//! step.set_integral_threshold(12);
//! let deck = InputDeck::new(vec![step]);
//! ```

pub mod deck;
pub mod error_kind;
pub mod molecule;
pub mod results;
pub mod strategy;
