//! # qcrescue Core Library
//!
//! Automated recovery for unattended Q-Chem runs: after a job finishes or crashes, the library
//! inspects the parsed output, classifies what went wrong, and rewrites the next input deck so
//! that a resubmission has a chance of succeeding.
//!
//! ## Architectural Philosophy
//!
//! The library follows a three-layer architecture:
//!
//! - **[`core`]: The Foundation.** Plain data models (`InputDeck`, `StepResult`, `Molecule`,
//!   `ErrorKind`, fix strategies) and the I/O boundary: the Q-Chem input format, the structured
//!   results reader, and the codec that keeps strategy progress inside a step's `$comment`.
//!
//! - **[`engine`]: The Logic Core.** Detection, the error priority table, one fix function per
//!   error kind, the resource escalation policy driven through the [`engine::runner::JobRunner`]
//!   seam, archival of the run before every mutation, and handler snapshots.
//!
//! - **[`workflows`]: The Public API.** [`workflows::handler::QChemErrorHandler`] ties the layers
//!   into the `check()` / `correct()` cycle an external supervisor drives between resubmissions.

pub mod core;
pub mod engine;
pub mod workflows;
