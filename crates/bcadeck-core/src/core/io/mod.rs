//! Shared plumbing for the text formats of the simulation codes.
//!
//! [`traits`] defines the contracts every code implementation fulfils: compiling a
//! configuration into a [`deck::Deck`], reading a deck back, and parsing a report.
//! [`format`] renders and parses Fortran-style numeric tokens, while [`scan`] and
//! [`table`] split reports into label-anchored blocks and column tables.

pub mod deck;
pub mod format;
pub mod scan;
pub mod table;
pub mod traits;
