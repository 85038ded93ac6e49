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

//! Prepared value tree
//!
//! Preparation turns the raw input into a tree of literals, prepared lookups and nested
//! field maps. Strings inside arrays stay literal; only object members are scanned.

use crate::config::MalformedPolicy;
use crate::error::{Result, UpLookError};
use crate::evaluator::PreparedLookup;
use crate::parser::ExpressionCache;
use crate::registry::FunctionRegistry;
use indexmap::IndexMap;
use serde_json::{Map, Value};

/// Ordered field map of one nesting level
pub(crate) type Fields = IndexMap<String, Node>;

/// One prepared value
#[derive(Debug)]
pub(crate) enum Node {
    Literal(Value),
    Lookup(PreparedLookup),
    Object(Fields),
}

/// Shared state for one preparation pass
pub(crate) struct Preparation<'a> {
    pub(crate) expressions: &'a ExpressionCache,
    pub(crate) registry: &'a FunctionRegistry,
    pub(crate) malformed_policy: MalformedPolicy,
}

impl Preparation<'_> {
    pub(crate) fn prepare_fields<'v, I>(&self, values: I, path: &str) -> Result<Fields>
    where
        I: IntoIterator<Item = (&'v String, &'v Value)>,
    {
        values
            .into_iter()
            .map(|(name, value)| {
                let field_path = join_path(path, name);
                Ok((name.clone(), self.prepare_value(value, &field_path)?))
            })
            .collect()
    }

    fn prepare_value(&self, value: &Value, path: &str) -> Result<Node> {
        match value {
            Value::String(text) => self.prepare_string(text, path),
            Value::Object(members) => Ok(Node::Object(self.prepare_object(members, path)?)),
            other => Ok(Node::Literal(other.clone())),
        }
    }

    fn prepare_object(&self, members: &Map<String, Value>, path: &str) -> Result<Fields> {
        self.prepare_fields(members.iter(), path)
    }

    fn prepare_string(&self, text: &str, path: &str) -> Result<Node> {
        match self.expressions.get_or_parse(text) {
            Ok(Some(expression)) => {
                self.registry.note_reference(&expression.function);
                Ok(Node::Lookup(PreparedLookup::new(expression)))
            }
            Ok(None) => Ok(Node::Literal(Value::String(text.to_string()))),
            Err(err @ UpLookError::MalformedExpression { .. })
                if self.malformed_policy == MalformedPolicy::Literal =>
            {
                log::warn!("Keeping '{path}' as a literal: {err}");
                Ok(Node::Literal(Value::String(text.to_string())))
            }
            Err(err) => Err(err),
        }
    }
}

pub(crate) fn join_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}.{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn prepare(input: Value, policy: MalformedPolicy) -> (Result<Fields>, FunctionRegistry) {
        let expressions = ExpressionCache::new();
        let registry = FunctionRegistry::new();
        let fields = {
            let preparation = Preparation {
                expressions: &expressions,
                registry: &registry,
                malformed_policy: policy,
            };
            match &input {
                Value::Object(members) => preparation.prepare_fields(members.iter(), ""),
                _ => unreachable!("test input is an object"),
            }
        };
        (fields, registry)
    }

    #[test]
    fn test_prepare_tree_shapes() {
        let (fields, registry) = prepare(
            json!({
                "plain": "een",
                "number": 1,
                "list": ["~f()"],
                "lookup": "~f(\"k\")",
                "nested": {"deeper": {"dynamic": "~~g()"}},
            }),
            MalformedPolicy::Reject,
        );
        let fields = fields.unwrap();

        assert!(matches!(fields["plain"], Node::Literal(Value::String(_))));
        assert!(matches!(fields["number"], Node::Literal(_)));
        assert!(matches!(fields["list"], Node::Literal(Value::Array(_))));
        assert!(matches!(fields["lookup"], Node::Lookup(_)));
        match &fields["nested"] {
            Node::Object(nested) => match &nested["deeper"] {
                Node::Object(deeper) => assert!(matches!(deeper["dynamic"], Node::Lookup(_))),
                other => panic!("expected object, got {other:?}"),
            },
            other => panic!("expected object, got {other:?}"),
        }
        assert_eq!(registry.referenced_names(), vec!["f", "g"]);
    }

    #[test]
    fn test_malformed_policy() {
        let (fields, _) = prepare(json!({"bad": "~f("}), MalformedPolicy::Reject);
        assert!(matches!(
            fields,
            Err(UpLookError::MalformedExpression { .. })
        ));

        let (fields, _) = prepare(json!({"bad": "~f("}), MalformedPolicy::Literal);
        assert!(matches!(
            fields.unwrap()["bad"],
            Node::Literal(Value::String(_))
        ));
    }

    #[test]
    fn test_invalid_default_is_never_kept_as_literal() {
        let (fields, _) = prepare(json!({"bad": "~f(\"k\", nope)"}), MalformedPolicy::Literal);
        assert!(matches!(
            fields,
            Err(UpLookError::InvalidDefaultSyntax { .. })
        ));
    }

    #[test]
    fn test_join_path() {
        assert_eq!(join_path("", "a"), "a");
        assert_eq!(join_path("a.b", "c"), "a.b.c");
    }
}
