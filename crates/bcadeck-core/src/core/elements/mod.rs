//! Reference element parameters and the override mechanism used by configurations.
//!
//! [`catalog::ElementCatalog`] loads per-element physical data from TOML.
//! [`element::Element`] is the value stored in configuration rows. It is either the
//! pristine catalog entry or a single override layer on top of it.

pub mod catalog;
pub mod element;
