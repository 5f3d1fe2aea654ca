//! modgen Core
//!
//! Core types and interfaces shared by the modgen extractor and synthesizer.

pub mod config;
pub mod error;
pub mod location;
pub mod types;

pub use error::{Error, Result};
pub use location::Location;
pub use types::*;
