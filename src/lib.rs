//! Deferred lookup expressions for configuration values
//!
//! Values stored in an [`UpLook`] container may be plain JSON or lookup expressions
//! that are resolved on read through named functions:
//!
//! - `~name("key", default)` is resolved once and the result is kept
//! - `~~name("key", default)` is resolved on every read
//!
//! The key and the default are optional. A quoted default is used verbatim; an
//! unquoted default is parsed as JSON. Functions may be registered before or after the
//! container is prepared, and [`UpLook::function_names`] lists the names that need a
//! binding.
//!
//! # Example
//! ```rust
//! use uplook::{MapLookup, UpLook};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let values = UpLook::from_json(json!({
//!     "service": {
//!         "host": "~settings(\"host\", \"localhost\")",
//!         "port": "~settings(\"port\", 8080)",
//!     },
//!     "name": "demo",
//! }))
//! .unwrap();
//!
//! values.register_function("settings", Arc::new(MapLookup::new([("host", "db.internal")])));
//!
//! assert_eq!(values.get_path("service.host").unwrap(), json!("db.internal"));
//! assert_eq!(values.get_path("service.port").unwrap(), json!(8080));
//! assert_eq!(
//!     values.export().unwrap(),
//!     json!({"service": {"host": "db.internal", "port": 8080}, "name": "demo"})
//! );
//! ```

pub mod config;
pub mod error;
pub mod evaluator;
pub mod model;
pub mod parser;
pub mod registry;

pub use config::{MalformedPolicy, UpLookConfig};
pub use error::{Result, UpLookError};
pub use evaluator::{Evaluator, PreparedLookup};
pub use model::{ExportOptions, UpLook, View};
pub use parser::{Arity, DefaultSpec, LookupExpression, parse};
pub use registry::{FunctionRegistry, LookupError, LookupFunction, LookupResult, MapLookup};
