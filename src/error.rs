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

//! Error types for lookup preparation and resolution
//!
//! Structural problems (duplicate fields, malformed expressions, bad JSON defaults)
//! surface when a container is built or prepared. Everything else surfaces at the
//! read that triggered it.

use crate::registry::LookupError;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for uplook operations
pub type Result<T> = std::result::Result<T, UpLookError>;

/// Errors raised while building, preparing or reading a container
#[derive(Error, Debug, Clone)]
pub enum UpLookError {
    /// The expression references a function that has not been registered
    #[error("There is no lookup function with name '{function}'")]
    UnboundFunction {
        /// Name of the missing function
        function: String,
    },

    /// The lookup function reported not-found and the expression has no default
    #[error("Lookup function '{function}' returned no value{} and no default is set", .key.as_ref().map(|k| format!(" for {k}")).unwrap_or_default())]
    NoDefaultAvailable {
        /// Function that was invoked
        function: String,
        /// Key the function was invoked with, rendered as JSON
        key: Option<String>,
    },

    /// An unquoted default is not valid JSON
    #[error("Invalid default '{default}' in expression '{expression}': {message}")]
    InvalidDefaultSyntax {
        /// Full source text of the expression
        expression: String,
        /// The offending default text
        default: String,
        /// JSON parser message
        message: String,
    },

    /// The same field name was supplied twice at construction
    #[error("Duplicate field '{field}'")]
    DuplicateField {
        /// The repeated field name
        field: String,
    },

    /// A string starts like a lookup call but does not match the grammar
    #[error("Malformed lookup expression '{expression}' at position {position}: {message}")]
    MalformedExpression {
        /// Full source text of the expression
        expression: String,
        /// Byte offset where matching failed
        position: usize,
        /// Human-readable reason
        message: String,
    },

    /// The lookup function failed with something other than not-found
    #[error("Lookup function '{function}' failed: {source}")]
    LookupFailed {
        /// Function that was invoked
        function: String,
        /// The error reported by the function
        #[source]
        source: LookupError,
    },

    /// The lookup function did not answer within the configured timeout
    #[error("Lookup function '{function}' did not answer within {timeout:?}")]
    LookupTimeout {
        /// Function that was invoked
        function: String,
        /// The configured timeout
        timeout: Duration,
    },

    /// A field name is not present in the container
    #[error("'{field}' is an unknown value")]
    NoSuchField {
        /// The requested field or dotted path
        field: String,
    },

    /// A nested view was requested on a field that is not an object
    #[error("'{field}' is not a nested value")]
    NotNested {
        /// The requested field
        field: String,
    },

    /// Construction input has the wrong shape
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// Human-readable reason
        message: String,
    },
}

impl UpLookError {
    /// Create a malformed-expression error
    pub fn malformed(
        expression: impl Into<String>,
        position: usize,
        message: impl Into<String>,
    ) -> Self {
        Self::MalformedExpression {
            expression: expression.into(),
            position,
            message: message.into(),
        }
    }

    /// Create an unknown-field error
    pub fn no_such_field(field: impl Into<String>) -> Self {
        Self::NoSuchField {
            field: field.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_default_message_includes_key() {
        let err = UpLookError::NoDefaultAvailable {
            function: "lookup".to_string(),
            key: Some("\"four\"".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "Lookup function 'lookup' returned no value for \"four\" and no default is set"
        );

        let err = UpLookError::NoDefaultAvailable {
            function: "hello".to_string(),
            key: None,
        };
        assert_eq!(
            err.to_string(),
            "Lookup function 'hello' returned no value and no default is set"
        );
    }
}
