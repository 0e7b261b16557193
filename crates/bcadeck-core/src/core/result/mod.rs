//! The unified outcome of a simulation run.
//!
//! Report parsers produce a [`model::SimulationResult`]. Each scalar is a
//! [`model::Reported`] so that placeholders ("no backward sputtering") and absent
//! blocks stay distinguishable from zero. [`export`] writes results as CSV and
//! [`compare`] lines up two runs species by species.

pub mod compare;
pub mod export;
pub mod model;
