//! # Workflows Module
//!
//! High-level entry points that tie the backends and the core model together into
//! complete procedures: writing a deck for a configuration and evaluating finished
//! runs.
//!
//! ## Architecture
//!
//! - **Deck Preparation** ([`prepare`]) - Validates a configuration, compiles it with a
//!   backend and writes the deck files into a run directory.
//! - **Report Evaluation** ([`evaluate`]) - Parses one report or a batch of reports in
//!   parallel, detecting the simulation code when it is not given.
//! - **Progress Reporting** ([`progress`]) - Callback plumbing used by batch workflows to
//!   inform front ends about their state.

pub mod evaluate;
pub mod prepare;
pub mod progress;
