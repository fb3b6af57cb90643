//! # Engine Module
//!
//! This module implements the decision logic of error correction: given the parsed results of a
//! failed run and its input deck, it decides which single change gives a resubmission the best
//! chance of succeeding.
//!
//! ## Overview
//!
//! A correction cycle is a small state machine. Detection finds the first failing step and its
//! error set, the prioritizer selects one governing error, and exactly one fix function runs
//! against a working copy of the deck. Multi-step remedies (SCF and geometry convergence) record
//! their progress inside the deck itself so that the next cycle, possibly in a new process,
//! resumes where this one stopped.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Thresholds, cycle limits, file names and the cluster profile
//! - **Detection** ([`detect`]) - First failing step and its sorted, de-duplicated errors
//! - **Prioritization** ([`priority`]) - Fixed precedence table for choosing the governing error
//! - **Job Runner** ([`runner`]) - Launch-mode and memory policy behind the [`runner::JobRunner`] trait
//! - **Backup** ([`backup`]) - Numbered `error.<n>.tar.gz` archives taken before every correction
//! - **Snapshots** ([`snapshot`]) - Versioned JSON image of the handler state
//! - **Error Handling** ([`error`]) - Engine-level error type aggregating every layer
//!
//! ## Key Capabilities
//!
//! - **Deterministic dispatch** independent of the order errors were reported in
//! - **Persisted fix strategies** that advance by exactly one method per cycle
//! - **Monotonic resource escalation** from the default launch to `half_cpus` or `openmp`
//! - **Transactional edits** so a fix that gives up leaves the deck byte-for-byte unchanged

pub mod backup;
pub mod config;
pub mod detect;
pub mod error;
pub(crate) mod fixes;
pub mod priority;
pub mod runner;
pub mod snapshot;
