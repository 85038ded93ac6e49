//! Lookup Expression Evaluator
//!
//! Invokes bound lookup functions, applies defaults and pins `Once` results.

mod cache;
mod engine;

pub use cache::PreparedLookup;
pub use engine::Evaluator;
