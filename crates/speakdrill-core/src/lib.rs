//! speakdrill-core — Scheduling engine, data model, and traits.
//!
//! This crate holds the adaptive question ordering (mastery estimation and
//! priority scheduling), the practice session loop, and the judge and
//! history store seams that the rest of speakdrill builds on.

pub mod error;
pub mod history;
pub mod mastery;
pub mod model;
pub mod parser;
pub mod scheduler;
pub mod session;
pub mod statistics;
pub mod traits;
