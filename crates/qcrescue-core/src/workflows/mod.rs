//! # Workflows Module
//!
//! High-level entry points that drive a complete correction cycle.
//!
//! ## Overview
//!
//! A supervisor runs the job, then asks the handler whether the run failed (`check`) and, if so,
//! for a correction (`correct`). The handler loads the results and the deck, archives the run,
//! applies at most one fix, and writes the deck back only when that fix produced an action.
//!
//! ## Architecture
//!
//! - **Error Handler** ([`handler`]) - [`handler::QChemErrorHandler`], generic over the output
//!   parser and the job runner, plus the [`handler::CorrectionReport`] it returns.

pub mod handler;
