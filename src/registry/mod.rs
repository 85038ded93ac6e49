//! Lookup function registry
//!
//! Binds the function names used in lookup expressions to caller-supplied functions.

pub mod function;
pub mod function_registry;

pub use function::{LookupError, LookupFunction, LookupResult, MapLookup};
pub use function_registry::{FunctionRegistry, RegistryStats, SharedLookup};
