// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Lookup function contract
//!
//! A lookup function receives the optional key written in the expression and either
//! returns a value, signals that the value does not exist, or fails. Only the
//! not-found signal is eligible for default substitution.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Result type returned by lookup functions
pub type LookupResult = Result<Value, LookupError>;

/// Outcome of a lookup function that did not produce a value
#[derive(Error, Debug, Clone)]
pub enum LookupError {
    /// The requested value does not exist in the external source
    #[error("value not found: {message}")]
    NotFound {
        /// Human-readable description
        message: String,
    },

    /// Any other failure; never replaced by a default
    #[error("{0}")]
    Failed(Arc<dyn std::error::Error + Send + Sync>),
}

impl LookupError {
    /// Signal that the value does not exist
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Wrap a hard failure raised by the external source
    pub fn failed<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Failed(Arc::new(error))
    }

    /// Hard failure described only by a message
    pub fn message(message: impl Into<String>) -> Self {
        let boxed: Box<dyn std::error::Error + Send + Sync> = message.into().into();
        Self::Failed(Arc::from(boxed))
    }

    /// True for the distinguished not-found signal
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// A function that can be bound to a name and called from lookup expressions
///
/// Closures of the shape `Fn(Option<&Value>) -> LookupResult` implement this trait, so
/// most callers never implement it by hand.
///
/// # Example
/// ```rust
/// use uplook::registry::{LookupError, LookupFunction, LookupResult};
/// use serde_json::{Value, json};
///
/// struct Hello;
///
/// impl LookupFunction for Hello {
///     fn lookup(&self, key: Option<&Value>) -> LookupResult {
///         match key {
///             None => Ok(json!("hello")),
///             Some(_) => Err(LookupError::not_found("hello takes no key")),
///         }
///     }
/// }
/// ```
pub trait LookupFunction: Send + Sync {
    /// Retrieve the value for `key`, or for no key when the expression has no arguments
    fn lookup(&self, key: Option<&Value>) -> LookupResult;
}

impl<F> LookupFunction for F
where
    F: Fn(Option<&Value>) -> LookupResult + Send + Sync,
{
    fn lookup(&self, key: Option<&Value>) -> LookupResult {
        self(key)
    }
}

/// Lookup function backed by an in-memory table
///
/// Keys are matched by their string form; a missing key signals not-found and calling it
/// without a key is a hard failure.
#[derive(Debug, Clone, Default)]
pub struct MapLookup {
    values: HashMap<String, Value>,
}

impl MapLookup {
    /// Build from `(key, value)` pairs
    pub fn new<I, K, V>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Self {
            values: values
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Add or replace a single entry
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }
}

impl LookupFunction for MapLookup {
    fn lookup(&self, key: Option<&Value>) -> LookupResult {
        let key = key.ok_or_else(|| LookupError::message("a key is required"))?;
        let name = match key {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        self.values
            .get(&name)
            .cloned()
            .ok_or_else(|| LookupError::not_found(format!("'{name}' does not return any value")))
    }
}
