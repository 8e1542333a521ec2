// -------------------------------------------------------------------------------------------------
//  Copyright (C) 2015-2026 Nautech Systems Pty Ltd. All rights reserved.
//  https://nautechsystems.io
//
//  Licensed under the GNU Lesser General Public License Version 3.0 (the "License");
//  You may not use this file except in compliance with the License.
//  You may obtain a copy of the License at https://www.gnu.org/licenses/lgpl-3.0.en.html
//
//  Unless required by applicable law or agreed to in writing, software
//  distributed under the License is distributed on an "AS IS" BASIS,
//  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//  See the License for the specific language governing permissions and
//  limitations under the License.
// -------------------------------------------------------------------------------------------------

//! Typed GraphQL selection builder.
//!
//! A [`Selection`] is an object field with optional alias and arguments and a non-empty
//! list of sub-fields. Rendering is deterministic: arguments keep insertion order and
//! nested selections render in the order they were added.
//!
//! ```
//! use pnw::http::query::Selection;
//!
//! let query = Selection::new("nations")
//!     .arg("id", 1)
//!     .arg("first", 50)
//!     .sub(Selection::new("data").fields(["id", "nation_name"]))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(query, "nations(id:1 first:50) {data {id nation_name}}");
//! ```

use std::fmt::{self, Display, Write};

use super::error::PnwBuildError;

/// A GraphQL argument value.
#[derive(Clone, Debug, PartialEq)]
pub enum ArgValue {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    /// Bare enum literal, rendered without quotes (e.g. `DESC`).
    Enum(String),
    List(Vec<ArgValue>),
}

impl ArgValue {
    /// Creates an enum literal argument.
    #[must_use]
    pub fn enum_literal(value: impl Into<String>) -> Self {
        Self::Enum(value.into())
    }
}

impl Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Enum(v) => f.write_str(v),
            Self::Str(v) => {
                f.write_char('"')?;
                for c in v.chars() {
                    match c {
                        '"' => f.write_str("\\\"")?,
                        '\\' => f.write_str("\\\\")?,
                        '\n' => f.write_str("\\n")?,
                        c => f.write_char(c)?,
                    }
                }
                f.write_char('"')
            }
            Self::List(values) => {
                f.write_char('[')?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_char(',')?;
                    }
                    write!(f, "{value}")?;
                }
                f.write_char(']')
            }
        }
    }
}

impl From<i64> for ArgValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for ArgValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u32> for ArgValue {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for ArgValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for ArgValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for ArgValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for ArgValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl<T: Into<ArgValue>> From<Vec<T>> for ArgValue {
    fn from(values: Vec<T>) -> Self {
        Self::List(values.into_iter().map(Into::into).collect())
    }
}

/// A node in a selection set.
#[derive(Clone, Debug, PartialEq)]
pub enum QueryField {
    Scalar(String),
    Object(Selection),
}

impl From<&str> for QueryField {
    fn from(name: &str) -> Self {
        Self::Scalar(name.to_string())
    }
}

impl From<String> for QueryField {
    fn from(name: String) -> Self {
        Self::Scalar(name)
    }
}

impl From<Selection> for QueryField {
    fn from(selection: Selection) -> Self {
        Self::Object(selection)
    }
}

/// An object field selection: `alias: name(args) {fields}`.
#[derive(Clone, Debug, PartialEq)]
pub struct Selection {
    alias: Option<String>,
    name: String,
    args: Vec<(String, ArgValue)>,
    fields: Vec<QueryField>,
}

impl Selection {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            alias: None,
            name: name.into(),
            args: Vec::new(),
            fields: Vec::new(),
        }
    }

    #[must_use]
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Adds an argument; a repeated key replaces the earlier value in place.
    #[must_use]
    pub fn arg(mut self, key: impl Into<String>, value: impl Into<ArgValue>) -> Self {
        let key = key.into();
        let value = value.into();

        match self.args.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.args.push((key, value)),
        }
        self
    }

    #[must_use]
    pub fn field(mut self, field: impl Into<QueryField>) -> Self {
        self.fields.push(field.into());
        self
    }

    #[must_use]
    pub fn fields<I, F>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<QueryField>,
    {
        self.fields.extend(fields.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn sub(self, selection: Selection) -> Self {
        self.field(selection)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Renders the selection.
    ///
    /// # Errors
    ///
    /// Returns [`PnwBuildError::MissingSubSelection`] if this or any nested selection has
    /// no fields.
    pub fn build(&self) -> Result<String, PnwBuildError> {
        let mut out = String::new();
        self.render(&mut out)?;
        Ok(out)
    }

    fn render(&self, out: &mut String) -> Result<(), PnwBuildError> {
        if self.fields.is_empty() {
            return Err(PnwBuildError::MissingSubSelection(self.name.clone()));
        }

        if let Some(alias) = &self.alias {
            let _ = write!(out, "{alias}: ");
        }
        out.push_str(&self.name);

        if !self.args.is_empty() {
            out.push('(');
            for (i, (key, value)) in self.args.iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                let _ = write!(out, "{key}:{value}");
            }
            out.push(')');
        }

        out.push_str(" {");
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            match field {
                QueryField::Scalar(name) => out.push_str(name),
                QueryField::Object(selection) => selection.render(out)?,
            }
        }
        out.push('}');

        Ok(())
    }
}

/// Wraps one or more rendered root selections into a query document.
#[must_use]
pub fn wrap_query(selections: &str) -> String {
    format!("{{{selections}}}")
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn test_scalar_fields_only() {
        let query = Selection::new("me")
            .sub(Selection::new("nation").fields(["id", "nation_name"]))
            .build()
            .unwrap();

        assert_eq!(query, "me {nation {id nation_name}}");
    }

    #[rstest]
    fn test_args_keep_insertion_order() {
        let query = Selection::new("nations")
            .arg("first", 500)
            .arg("page", 2)
            .arg("vmode", false)
            .field("id")
            .build()
            .unwrap();

        assert_eq!(query, "nations(first:500 page:2 vmode:false) {id}");
    }

    #[rstest]
    fn test_repeated_arg_replaces_in_place() {
        let query = Selection::new("nations")
            .arg("first", 1)
            .arg("page", 1)
            .arg("first", 2)
            .field("id")
            .build()
            .unwrap();

        assert_eq!(query, "nations(first:2 page:1) {id}");
    }

    #[rstest]
    fn test_alias_and_value_kinds() {
        let query = Selection::new("nations")
            .alias("page_1")
            .arg("nation_name", "Say \"hi\"")
            .arg("id", vec![1, 2, 3])
            .arg("orderBy", ArgValue::enum_literal("DESC"))
            .arg("min_score", 12.5)
            .field("id")
            .build()
            .unwrap();

        assert_eq!(
            query,
            r#"page_1: nations(nation_name:"Say \"hi\"" id:[1,2,3] orderBy:DESC min_score:12.5) {id}"#
        );
    }

    #[rstest]
    fn test_missing_sub_selection_is_rejected() {
        let err = Selection::new("nations").build().unwrap_err();
        assert_eq!(err, PnwBuildError::MissingSubSelection("nations".to_string()));

        let err = Selection::new("nations")
            .sub(Selection::new("data"))
            .build()
            .unwrap_err();
        assert_eq!(err, PnwBuildError::MissingSubSelection("data".to_string()));
    }

    #[rstest]
    fn test_wrap_query() {
        assert_eq!(wrap_query("me {key}"), "{me {key}}");
    }
}
