#![forbid(unsafe_code)]

//! Shared types for the `riskscan` client: the analysis result model,
//! local document pre-validation, and persisted client settings.

pub mod analysis;
pub mod document;
pub mod settings;
