//! # Core Module
//!
//! Stateless building blocks shared by the correction engine.
//!
//! ## Architecture
//!
//! - **Data Models** ([`models`]) - Molecules, input decks, per-step run results, the closed error
//!   vocabulary and the persisted fix strategies
//! - **File I/O** ([`io`]) - The Q-Chem input format, the structured results reader and the
//!   comment-embedded strategy codec
//!
//! Nothing in this module decides *how* to fix a run; it only describes runs and decks and moves
//! them across the file-system boundary without losing information.

pub mod io;
pub mod models;
