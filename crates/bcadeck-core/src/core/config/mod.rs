//! The code-agnostic description of an irradiation experiment.
//!
//! A [`model::Configuration`] holds beam rows, target rows, the layered target
//! structure and run settings. [`validation`] checks its structural invariants,
//! and [`persistence`] reads and writes the JSON document form.

pub mod model;
pub mod options;
pub mod persistence;
pub mod validation;
