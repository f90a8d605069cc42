//! # presage_core
//!
//! Domain vocabulary for the expectation-bias simulation: trial types and
//! sequences, the `Stat` tagged value (Defined / NotApplicable),
//! configuration with clamping normalization, and typed errors.
//!
//! The simulation pipeline itself lives in `presage_sim`; this crate holds
//! only the pure data model both the pipeline and its callers share.

pub mod config;
pub mod error;
pub mod trial;

pub use config::{ArousalModel, SimConfig, SourceMode};
pub use error::SimError;
pub use trial::{ByType, Sequence, Stat, TrialType};
