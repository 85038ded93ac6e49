//! Lookup expression parser
//!
//! This module provides a nom-based parser that recognises lookup expressions in
//! string values and converts them into [`LookupExpression`]s.

pub mod expression;
pub mod expression_cache;
pub mod grammar;

pub use expression::{Arity, DefaultSpec, LookupExpression};
pub use expression_cache::{ExpressionCache, ExpressionCacheStats, SharedExpression};
pub use grammar::{looks_like_lookup, parse_lookup};

/// Parse a string value into a lookup expression, `None` for literals
pub fn parse(input: &str) -> crate::error::Result<Option<LookupExpression>> {
    parse_lookup(input)
}
