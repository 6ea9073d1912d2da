//! Umbral - compliance evidence regression gate
//!
//! Evidence artifacts carry timestamped assessment results. For every target
//! this library picks an accepted baseline ("threshold") result and the latest
//! result, classifies how each control changed between the two, and advances
//! the baseline only when nothing regressed. The baseline marker lives inside
//! the artifacts themselves, so the gate needs no external state.

pub mod artifact;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod grouping;
pub mod merge;
pub mod persist;
pub mod producer;
pub mod properties;
pub mod regression;
pub mod report;
pub mod resolver;
