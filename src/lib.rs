//! Authgate Rules - authentication rules engine
//!
//! Gates which sign-in methods a user may use, based on contextual signals
//! (IP, geography, velocity) and a prioritized set of stored rules.

pub mod config;
pub mod domain;
pub mod error;
pub mod policy;
pub mod repository;
pub mod telemetry;

// Re-export commonly used types
pub use config::Config;
pub use domain::{AuthContext, EvaluationOutcome, EvaluationResult};
pub use error::{AppError, Result};
pub use policy::RulesEngine;
