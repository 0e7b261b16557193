//! # Core Module
//!
//! Code-independent building blocks shared by every backend.
//!
//! ## Architecture
//!
//! - **Elements** ([`elements`]) - The element catalog and per-row parameter overrides
//! - **Configuration** ([`config`]) - The simulation model, its option enums, validation
//!   and JSON persistence
//! - **Deck and Report I/O** ([`io`]) - Backend traits, deck files, numeric formatting,
//!   block scanning and table helpers
//! - **Results** ([`result`]) - The uniform result model, comparison and CSV export

pub mod config;
pub mod elements;
pub mod io;
pub mod result;
