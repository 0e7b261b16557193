//! # bcadeck
//!
//! A format-translation layer for binary-collision-approximation (BCA) ion-beam
//! simulation codes. One code-agnostic [`Configuration`] describes an irradiation
//! experiment; backends compile it into the native input deck of SDTrimSP or TRIDYN,
//! read such decks back, and parse the codes' text reports into a uniform
//! [`SimulationResult`].
//!
//! ## Architectural Philosophy
//!
//! The library is split into three layers:
//!
//! - **[`core`]: The Foundation.** The element catalog, the configuration model with its
//!   validation and persistence, the backend traits and text helpers, and the result
//!   model. Nothing here knows about a specific code.
//!
//! - **[`backends`]: The Translators.** One module per code implementing deck
//!   compilation, deck reading and report parsing, plus a registry that selects a
//!   backend by code and detects the code of an unknown report.
//!
//! - **[`workflows`]: The Public API.** End-to-end procedures such as writing a deck
//!   into a run directory and evaluating batches of reports in parallel.

pub mod backends;
pub mod core;
pub mod error;
pub mod workflows;

pub use crate::backends::registry::{backend_for, backend_with_version, parse_any, parse_any_path};
pub use crate::core::config::model::Configuration;
pub use crate::core::config::options::SimulationCode;
pub use crate::core::elements::catalog::ElementCatalog;
pub use crate::core::result::model::SimulationResult;
pub use crate::error::{Error, Result};
