//! Moves runs and decks across the file-system boundary.
//!
//! This module contains the Q-Chem input reader/writer behind a trait-based interface, the
//! reader for structured per-step results, and the codec that persists fix strategies inside a
//! step's `$comment` text.

pub mod qcinp;
pub mod results;
pub mod strategy_tag;
pub mod traits;
