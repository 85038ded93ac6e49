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

//! The `UpLook` value container
//!
//! A container stores named raw values. Preparation happens once, either through an
//! explicit [`UpLook::prepare`] call or on the first read, and converts every string
//! that matches the lookup grammar into a prepared expression with its own resolution
//! slot. Functions can be registered before or after preparation; the registry is only
//! consulted when an expression is read.

use super::node::{Fields, Preparation};
use super::view::{ExportOptions, View};
use crate::config::UpLookConfig;
use crate::error::{Result, UpLookError};
use crate::evaluator::Evaluator;
use crate::parser::{ExpressionCache, ExpressionCacheStats};
use crate::registry::{FunctionRegistry, LookupResult, SharedLookup};
use indexmap::IndexMap;
use indexmap::map::Entry;
use once_cell::sync::OnceCell;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Named configuration values with deferred lookups
///
/// # Example
/// ```rust
/// use uplook::UpLook;
/// use uplook::registry::LookupError;
/// use serde_json::json;
///
/// let values = UpLook::new([
///     ("one", json!("~lookup(\"one\")")),
///     ("four", json!("~lookup(\"four\", \"default\")")),
///     ("plain", json!("een")),
/// ])
/// .unwrap();
///
/// assert_eq!(values.function_names().unwrap(), vec!["lookup"]);
///
/// values.register("lookup", |key| match key.and_then(|k| k.as_str()) {
///     Some("one") => Ok(json!("een")),
///     _ => Err(LookupError::not_found("no such key")),
/// });
///
/// assert_eq!(values.get("one").unwrap(), json!("een"));
/// assert_eq!(values.get("four").unwrap(), json!("default"));
/// assert_eq!(values.get("plain").unwrap(), json!("een"));
/// ```
pub struct UpLook {
    input: IndexMap<String, Value>,
    prepared: OnceCell<Fields>,
    registry: Arc<FunctionRegistry>,
    evaluator: Evaluator,
    expressions: ExpressionCache,
    config: UpLookConfig,
}

impl UpLook {
    /// Create a container from `(name, value)` pairs with the default configuration
    pub fn new<I, K>(values: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Self::with_config(values, UpLookConfig::default())
    }

    /// Create a container from `(name, value)` pairs
    ///
    /// Fails with `DuplicateField` when a name is supplied twice.
    pub fn with_config<I, K>(values: I, config: UpLookConfig) -> Result<Self>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Self::with_registry(values, config, Arc::new(FunctionRegistry::new()))
    }

    /// Create a container that resolves through a shared `registry`
    ///
    /// Bindings registered through any container sharing the registry are visible to
    /// all of them, and referenced names accumulate across them.
    pub fn with_registry<I, K>(
        values: I,
        config: UpLookConfig,
        registry: Arc<FunctionRegistry>,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let mut input = IndexMap::new();
        for (name, value) in values {
            match input.entry(name.into()) {
                Entry::Occupied(entry) => {
                    return Err(UpLookError::DuplicateField {
                        field: entry.key().clone(),
                    });
                }
                Entry::Vacant(entry) => {
                    entry.insert(value);
                }
            }
        }
        Ok(Self::from_parts(input, config, registry))
    }

    /// Create a container from a JSON object
    pub fn from_json(value: Value) -> Result<Self> {
        Self::from_json_with_config(value, UpLookConfig::default())
    }

    /// Create a container from a JSON object with a custom configuration
    pub fn from_json_with_config(value: Value, config: UpLookConfig) -> Result<Self> {
        match value {
            Value::Object(members) => Self::with_config(members, config),
            other => Err(UpLookError::InvalidInput {
                message: format!("expected a JSON object, got {other}"),
            }),
        }
    }

    fn from_parts(
        input: IndexMap<String, Value>,
        config: UpLookConfig,
        registry: Arc<FunctionRegistry>,
    ) -> Self {
        Self {
            input,
            prepared: OnceCell::new(),
            evaluator: Evaluator::new(registry.clone(), &config),
            registry,
            expressions: ExpressionCache::with_enabled(config.parse_cache_enabled),
            config,
        }
    }

    /// Bind `name` to a lookup function, replacing any previous binding
    ///
    /// `Once` values that were already resolved keep their pinned value.
    pub fn register<F>(&self, name: impl Into<String>, function: F)
    where
        F: Fn(Option<&Value>) -> LookupResult + Send + Sync + 'static,
    {
        self.registry.register(name, function);
    }

    /// Bind `name` to an existing lookup function
    pub fn register_function(&self, name: impl Into<String>, function: SharedLookup) {
        self.registry.register_function(name, function);
    }

    /// The function registry
    pub fn registry(&self) -> &Arc<FunctionRegistry> {
        &self.registry
    }

    /// The container configuration
    pub fn config(&self) -> &UpLookConfig {
        &self.config
    }

    /// Parse every value and discover referenced functions
    ///
    /// Runs at most once; later calls and reads reuse the prepared tree.
    pub fn prepare(&self) -> Result<()> {
        self.fields().map(|_| ())
    }

    /// True once preparation succeeded
    pub fn is_prepared(&self) -> bool {
        self.prepared.get().is_some()
    }

    fn fields(&self) -> Result<&Fields> {
        self.prepared.get_or_try_init(|| {
            log::debug!("Preparing {} top-level values", self.input.len());
            let preparation = Preparation {
                expressions: &self.expressions,
                registry: &self.registry,
                malformed_policy: self.config.malformed_policy,
            };
            let fields = preparation.prepare_fields(self.input.iter(), "")?;

            // Nothing is parsed again once the tree exists
            self.expressions.clear();

            let stats = self.registry.stats();
            if stats.is_ready() {
                log::debug!("Prepared; {stats}");
            } else {
                log::debug!(
                    "Prepared; {stats}, waiting for {:?}",
                    self.registry.unbound_names()
                );
            }
            Ok(fields)
        })
    }

    /// Function names referenced by at least one expression, in first-seen order
    ///
    /// Includes names that have not been registered yet.
    pub fn function_names(&self) -> Result<Vec<String>> {
        self.prepare()?;
        Ok(self.registry.referenced_names())
    }

    /// Referenced function names that still need a binding
    pub fn unbound_functions(&self) -> Result<Vec<String>> {
        self.prepare()?;
        Ok(self.registry.unbound_names())
    }

    /// Top-level field names in input order
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.input.keys().map(String::as_str)
    }

    /// Check if a top-level field exists
    pub fn contains(&self, name: &str) -> bool {
        self.input.contains_key(name)
    }

    /// The values as supplied at construction
    pub fn raw(&self) -> &IndexMap<String, Value> {
        &self.input
    }

    /// View over the top-level fields
    pub fn view(&self) -> Result<View<'_>> {
        Ok(View::new(self.fields()?, &self.evaluator, String::new()))
    }

    /// Read a top-level field
    pub fn get(&self, name: &str) -> Result<Value> {
        self.view()?.get(name)
    }

    /// View over a nested object field
    pub fn nested(&self, name: &str) -> Result<View<'_>> {
        self.view()?.nested(name)
    }

    /// Read a field by dotted path
    pub fn get_path(&self, path: &str) -> Result<Value> {
        self.view()?.get_path(path)
    }

    /// Resolve every field into a plain JSON object
    pub fn export(&self) -> Result<Value> {
        self.export_with(ExportOptions {
            include_null: self.config.include_null_in_export,
        })
    }

    /// Resolve every field into a plain JSON object with explicit options
    pub fn export_with(&self, options: ExportOptions) -> Result<Value> {
        self.view()?.export(options)
    }

    /// Iterate top-level `(name, value)` pairs, resolving each value as it is reached
    pub fn iter(&self) -> Result<impl Iterator<Item = (&str, Result<Value>)>> {
        Ok(self.view()?.iter())
    }

    /// Resolve every top-level field, stopping at the first error
    pub fn resolve_all(&self) -> Result<Vec<(String, Value)>> {
        self.iter()?
            .map(|(name, value)| value.map(|value| (name.to_string(), value)))
            .collect()
    }

    /// Statistics of the parse cache
    pub fn expression_stats(&self) -> ExpressionCacheStats {
        self.expressions.stats()
    }
}

impl fmt::Debug for UpLook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpLook")
            .field("input", &self.input)
            .field("prepared", &self.is_prepared())
            .field("registry", &self.registry)
            .finish()
    }
}

impl fmt::Display for UpLook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let raw = serde_json::to_string(&self.input).map_err(|_| fmt::Error)?;
        write!(f, "UpLook({raw})")
    }
}
