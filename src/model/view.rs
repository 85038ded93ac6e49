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

//! Read access to one nesting level of a prepared container

use super::node::{Fields, Node, join_path};
use crate::error::{Result, UpLookError};
use crate::evaluator::Evaluator;
use serde_json::{Map, Value};

/// Options for snapshot export
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportOptions {
    /// Keep fields whose resolved value is null
    pub include_null: bool,
}

impl ExportOptions {
    /// Export that drops null values at every depth
    pub fn without_null() -> Self {
        Self {
            include_null: false,
        }
    }
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self { include_null: true }
    }
}

/// A view over one level of fields
///
/// Reading a field returns literals unchanged, resolves lookups through the evaluator
/// and resolves nested objects completely. [`View::nested`] descends into a nested
/// object without resolving it.
#[derive(Debug, Clone)]
pub struct View<'a> {
    fields: &'a Fields,
    evaluator: &'a Evaluator,
    path: String,
}

impl<'a> View<'a> {
    pub(crate) fn new(fields: &'a Fields, evaluator: &'a Evaluator, path: String) -> Self {
        Self {
            fields,
            evaluator,
            path,
        }
    }

    /// Dotted path of this view, empty at the root
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Field names in input order
    pub fn names(&self) -> impl Iterator<Item = &'a str> + use<'a> {
        self.fields.keys().map(String::as_str)
    }

    /// Number of fields at this level
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True when this level has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Check if a field exists at this level
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Read one field
    pub fn get(&self, name: &str) -> Result<Value> {
        resolve_node(self.node(name)?, self.evaluator, ExportOptions::default())
    }

    /// Descend into a nested object
    pub fn nested(&self, name: &str) -> Result<View<'a>> {
        match self.node(name)? {
            Node::Object(fields) => Ok(View::new(
                fields,
                self.evaluator,
                join_path(&self.path, name),
            )),
            _ => Err(UpLookError::NotNested {
                field: join_path(&self.path, name),
            }),
        }
    }

    /// Read a field by dotted path, e.g. `"database.primary.host"`
    pub fn get_path(&self, path: &str) -> Result<Value> {
        match path.rsplit_once('.') {
            None => self.get(path),
            Some((parents, last)) => {
                let mut view = self.clone();
                for segment in parents.split('.') {
                    view = view.nested(segment)?;
                }
                view.get(last)
            }
        }
    }

    /// Iterate `(name, value)` pairs, resolving each value as it is reached
    pub fn iter(&self) -> impl Iterator<Item = (&'a str, Result<Value>)> + use<'a> {
        let evaluator = self.evaluator;
        self.fields.iter().map(move |(name, node)| {
            (
                name.as_str(),
                resolve_node(node, evaluator, ExportOptions::default()),
            )
        })
    }

    /// Resolve every field of this level into a plain JSON object
    pub fn export(&self, options: ExportOptions) -> Result<Value> {
        export_fields(self.fields, self.evaluator, options).map(Value::Object)
    }

    fn node(&self, name: &str) -> Result<&'a Node> {
        self.fields
            .get(name)
            .ok_or_else(|| UpLookError::no_such_field(join_path(&self.path, name)))
    }
}

fn resolve_node(node: &Node, evaluator: &Evaluator, options: ExportOptions) -> Result<Value> {
    match node {
        Node::Literal(value) => Ok(value.clone()),
        Node::Lookup(lookup) => evaluator.evaluate(lookup),
        Node::Object(fields) => export_fields(fields, evaluator, options).map(Value::Object),
    }
}

fn export_fields(
    fields: &Fields,
    evaluator: &Evaluator,
    options: ExportOptions,
) -> Result<Map<String, Value>> {
    let mut result = Map::with_capacity(fields.len());
    for (name, node) in fields {
        let value = resolve_node(node, evaluator, options)?;
        if value.is_null() && !options.include_null {
            continue;
        }
        result.insert(name.clone(), value);
    }
    Ok(result)
}
