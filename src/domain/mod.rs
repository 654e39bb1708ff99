//! Domain models for the rules engine

pub mod context;
pub mod evaluation;
pub mod rule;

pub use context::*;
pub use evaluation::*;
pub use rule::*;
