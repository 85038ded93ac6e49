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

//! Lookup evaluation
//!
//! Resolution order for one read:
//!
//! 1. a resolved `Once` slot answers without calling anything;
//! 2. the function name must be bound, otherwise the read fails with `UnboundFunction`;
//! 3. a value pins the `Once` slot and is returned;
//! 4. not-found returns the default (without pinning) or fails with `NoDefaultAvailable`;
//! 5. any other failure propagates as `LookupFailed` and leaves the slot empty.

use super::cache::PreparedLookup;
use crate::config::UpLookConfig;
use crate::error::{Result, UpLookError};
use crate::parser::LookupExpression;
use crate::registry::{FunctionRegistry, LookupError, LookupResult, SharedLookup};
use serde_json::Value;
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::Duration;

/// Why a lookup produced no value to pin
enum Miss {
    /// Not-found with a default; returned but never cached
    Default(Value),
    /// Hard error for this read
    Error(UpLookError),
}

/// Evaluates prepared lookups against a function registry
#[derive(Debug, Clone)]
pub struct Evaluator {
    registry: Arc<FunctionRegistry>,
    lookup_timeout: Option<Duration>,
}

impl Evaluator {
    /// Create an evaluator over `registry`
    pub fn new(registry: Arc<FunctionRegistry>, config: &UpLookConfig) -> Self {
        Self {
            registry,
            lookup_timeout: config.lookup_timeout,
        }
    }

    /// The registry consulted at evaluation time
    pub fn registry(&self) -> &Arc<FunctionRegistry> {
        &self.registry
    }

    /// Resolve one read of `lookup`
    pub fn evaluate(&self, lookup: &PreparedLookup) -> Result<Value> {
        let expression = lookup.expression();
        let Some(slot) = lookup.slot() else {
            return Self::settle(self.invoke(expression));
        };

        if let Some(value) = slot.get() {
            log::trace!("Cache hit for {expression}");
            return Ok(value.clone());
        }

        // Concurrent first readers block here until the winner has finished
        match slot.get_or_try_init(|| self.invoke(expression)) {
            Ok(value) => Ok(value.clone()),
            Err(miss) => Self::settle(Err(miss)),
        }
    }

    /// Resolve an expression without any caching
    pub fn evaluate_expression(&self, expression: &LookupExpression) -> Result<Value> {
        Self::settle(self.invoke(expression))
    }

    fn settle(outcome: std::result::Result<Value, Miss>) -> Result<Value> {
        match outcome {
            Ok(value) | Err(Miss::Default(value)) => Ok(value),
            Err(Miss::Error(err)) => Err(err),
        }
    }

    fn invoke(&self, expression: &LookupExpression) -> std::result::Result<Value, Miss> {
        let name = expression.function.as_str();
        let function = self.registry.resolve(name).ok_or_else(|| {
            Miss::Error(UpLookError::UnboundFunction {
                function: name.to_string(),
            })
        })?;

        log::trace!("Invoking lookup function for {expression}");
        let outcome = self
            .call(name, function, expression.key.as_ref())
            .map_err(Miss::Error)?;

        match outcome {
            Ok(value) => Ok(value),
            Err(LookupError::NotFound { message }) => match &expression.default {
                Some(default) => {
                    log::debug!("{expression} fell back to its default: {message}");
                    Err(Miss::Default(default.to_value()))
                }
                None => Err(Miss::Error(UpLookError::NoDefaultAvailable {
                    function: name.to_string(),
                    key: expression.key_display(),
                })),
            },
            Err(source) => Err(Miss::Error(UpLookError::LookupFailed {
                function: name.to_string(),
                source,
            })),
        }
    }

    /// Run the function, on a helper thread when a timeout is configured
    fn call(&self, name: &str, function: SharedLookup, key: Option<&Value>) -> Result<LookupResult> {
        let Some(timeout) = self.lookup_timeout else {
            return Ok(function.lookup(key));
        };

        let key = key.cloned();
        let (sender, receiver) = mpsc::channel();
        thread::Builder::new()
            .name(format!("uplook-{name}"))
            .spawn(move || {
                // The receiver is gone when the read already timed out
                let _ = sender.send(function.lookup(key.as_ref()));
            })
            .map_err(|e| UpLookError::LookupFailed {
                function: name.to_string(),
                source: LookupError::failed(e),
            })?;

        receiver.recv_timeout(timeout).map_err(|e| match e {
            mpsc::RecvTimeoutError::Timeout => UpLookError::LookupTimeout {
                function: name.to_string(),
                timeout,
            },
            mpsc::RecvTimeoutError::Disconnected => UpLookError::LookupFailed {
                function: name.to_string(),
                source: LookupError::message("lookup function panicked"),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{Arity, DefaultSpec};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_registry(calls: Arc<AtomicUsize>) -> Arc<FunctionRegistry> {
        let registry = Arc::new(FunctionRegistry::new());
        registry.register("count", move |_| {
            Ok(json!(calls.fetch_add(1, Ordering::SeqCst)))
        });
        registry
    }

    fn prepared(expression: LookupExpression) -> PreparedLookup {
        PreparedLookup::new(Arc::new(expression))
    }

    #[test]
    fn test_once_pins_first_success() {
        let calls = Arc::new(AtomicUsize::new(0));
        let evaluator = Evaluator::new(counting_registry(calls.clone()), &UpLookConfig::default());
        let lookup = prepared(LookupExpression::new(Arity::Once, "count"));

        assert_eq!(evaluator.evaluate(&lookup).unwrap(), json!(0));
        assert_eq!(evaluator.evaluate(&lookup).unwrap(), json!(0));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(lookup.is_resolved());
    }

    #[test]
    fn test_always_invokes_every_read() {
        let calls = Arc::new(AtomicUsize::new(0));
        let evaluator = Evaluator::new(counting_registry(calls.clone()), &UpLookConfig::default());
        let lookup = prepared(LookupExpression::new(Arity::Always, "count"));

        assert_eq!(evaluator.evaluate(&lookup).unwrap(), json!(0));
        assert_eq!(evaluator.evaluate(&lookup).unwrap(), json!(1));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_unbound_function_ignores_default() {
        let evaluator = Evaluator::new(Arc::new(FunctionRegistry::new()), &UpLookConfig::default());
        let lookup = prepared(
            LookupExpression::new(Arity::Once, "missing")
                .with_key("k")
                .with_default(DefaultSpec::Literal("d".to_string())),
        );

        assert!(matches!(
            evaluator.evaluate(&lookup),
            Err(UpLookError::UnboundFunction { function }) if function == "missing"
        ));
    }

    #[test]
    fn test_default_is_not_pinned() {
        let registry = Arc::new(FunctionRegistry::new());
        registry.register("lookup", |_| Err(LookupError::not_found("nothing yet")));
        let evaluator = Evaluator::new(registry.clone(), &UpLookConfig::default());
        let lookup = prepared(
            LookupExpression::new(Arity::Once, "lookup")
                .with_key("k")
                .with_default(DefaultSpec::Literal("fallback".to_string())),
        );

        assert_eq!(evaluator.evaluate(&lookup).unwrap(), json!("fallback"));
        assert!(!lookup.is_resolved());

        registry.register("lookup", |_| Ok(json!("real")));
        assert_eq!(evaluator.evaluate(&lookup).unwrap(), json!("real"));
        assert!(lookup.is_resolved());
    }

    #[test]
    fn test_not_found_without_default() {
        let registry = Arc::new(FunctionRegistry::new());
        registry.register("lookup", |_| Err(LookupError::not_found("gone")));
        let evaluator = Evaluator::new(registry, &UpLookConfig::default());
        let expression = LookupExpression::new(Arity::Always, "lookup").with_key("four");

        match evaluator.evaluate_expression(&expression) {
            Err(UpLookError::NoDefaultAvailable { function, key }) => {
                assert_eq!(function, "lookup");
                assert_eq!(key.as_deref(), Some("\"four\""));
            }
            other => panic!("expected NoDefaultAvailable, got {other:?}"),
        }
    }

    #[test]
    fn test_hard_failure_is_not_defaulted_or_pinned() {
        let registry = Arc::new(FunctionRegistry::new());
        registry.register("lookup", |_| Err(LookupError::message("connection refused")));
        let evaluator = Evaluator::new(registry.clone(), &UpLookConfig::default());
        let lookup = prepared(
            LookupExpression::new(Arity::Once, "lookup")
                .with_key("k")
                .with_default(DefaultSpec::Literal("d".to_string())),
        );

        match evaluator.evaluate(&lookup) {
            Err(UpLookError::LookupFailed { function, source }) => {
                assert_eq!(function, "lookup");
                assert_eq!(source.to_string(), "connection refused");
            }
            other => panic!("expected LookupFailed, got {other:?}"),
        }
        assert!(!lookup.is_resolved());

        registry.register("lookup", |_| Ok(json!("recovered")));
        assert_eq!(evaluator.evaluate(&lookup).unwrap(), json!("recovered"));
    }

    #[test]
    fn test_json_default() {
        let registry = Arc::new(FunctionRegistry::new());
        registry.register("lookup", |_| Err(LookupError::not_found("gone")));
        let evaluator = Evaluator::new(registry, &UpLookConfig::default());
        let expression = LookupExpression::new(Arity::Once, "lookup")
            .with_key("k")
            .with_default(DefaultSpec::Json {
                source: "[]".to_string(),
                value: json!([]),
            });

        assert_eq!(evaluator.evaluate_expression(&expression).unwrap(), json!([]));
    }

    #[test]
    fn test_key_is_passed_through() {
        let registry = Arc::new(FunctionRegistry::new());
        registry.register("echo", |key| Ok(key.cloned().unwrap_or(Value::Null)));
        let evaluator = Evaluator::new(registry, &UpLookConfig::default());

        let keyed = LookupExpression::new(Arity::Always, "echo").with_key(5);
        assert_eq!(evaluator.evaluate_expression(&keyed).unwrap(), json!(5));

        let bare = LookupExpression::new(Arity::Always, "echo");
        assert_eq!(evaluator.evaluate_expression(&bare).unwrap(), Value::Null);
    }

    #[test]
    fn test_timeout() {
        let registry = Arc::new(FunctionRegistry::new());
        registry.register("slow", |_| {
            thread::sleep(Duration::from_millis(300));
            Ok(json!("late"))
        });
        registry.register("fast", |_| Ok(json!("early")));
        let config = UpLookConfig::default().with_lookup_timeout(Duration::from_millis(20));
        let evaluator = Evaluator::new(registry, &config);

        let slow = prepared(LookupExpression::new(Arity::Once, "slow"));
        assert!(matches!(
            evaluator.evaluate(&slow),
            Err(UpLookError::LookupTimeout { function, .. }) if function == "slow"
        ));
        assert!(!slow.is_resolved());

        let fast = prepared(LookupExpression::new(Arity::Once, "fast"));
        assert_eq!(evaluator.evaluate(&fast).unwrap(), json!("early"));
    }

    #[test]
    fn test_panicking_function_with_timeout() {
        let registry = Arc::new(FunctionRegistry::new());
        registry.register("boom", |_| panic!("lookup exploded"));
        let config = UpLookConfig::default().with_lookup_timeout(Duration::from_secs(5));
        let evaluator = Evaluator::new(registry, &config);

        let expression = LookupExpression::new(Arity::Always, "boom");
        assert!(matches!(
            evaluator.evaluate_expression(&expression),
            Err(UpLookError::LookupFailed { .. })
        ));
    }
}
