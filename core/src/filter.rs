//! OData filter primitives.
//!
//! # Design
//! Every filter kind is a variant of one `Filter` enum. Escaping lives in a
//! single `escape` function and rendering in a single `execute` match, so
//! all variants quote values the same way. Filters are plain immutable
//! values: the `and`/`or` joining them is owned by the query builder.

use std::fmt;

/// A scalar compared against a field.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
}

impl From<&str> for FilterValue {
    fn from(v: &str) -> Self {
        FilterValue::String(v.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(v: String) -> Self {
        FilterValue::String(v)
    }
}

impl From<&String> for FilterValue {
    fn from(v: &String) -> Self {
        FilterValue::String(v.clone())
    }
}

impl From<i32> for FilterValue {
    fn from(v: i32) -> Self {
        FilterValue::Integer(v.into())
    }
}

impl From<i64> for FilterValue {
    fn from(v: i64) -> Self {
        FilterValue::Integer(v)
    }
}

impl From<u32> for FilterValue {
    fn from(v: u32) -> Self {
        FilterValue::Integer(v.into())
    }
}

impl From<f64> for FilterValue {
    fn from(v: f64) -> Self {
        FilterValue::Float(v)
    }
}

impl From<bool> for FilterValue {
    fn from(v: bool) -> Self {
        FilterValue::Bool(v)
    }
}

/// Render a value as an OData literal.
///
/// Strings are wrapped in single quotes with embedded quotes doubled
/// (`O'Brien` becomes `'O''Brien'`). Numbers and booleans are not quoted.
pub fn escape(value: &FilterValue) -> String {
    match value {
        FilterValue::String(s) => quote(s),
        FilterValue::Integer(n) => n.to_string(),
        FilterValue::Float(n) => n.to_string(),
        FilterValue::Bool(b) => b.to_string(),
    }
}

/// Quote a string literal. Shared with entity keys in `types::EntityId`.
pub(crate) fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// A single OData predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Equal { field: String, value: FilterValue },
    NotEqual { field: String, value: FilterValue },
    MoreThan { field: String, value: FilterValue },
    MoreThanEqual { field: String, value: FilterValue },
    LessThan { field: String, value: FilterValue },
    LessThanEqual { field: String, value: FilterValue },
    Between {
        field: String,
        from: FilterValue,
        to: FilterValue,
    },
    Contains { field: String, value: FilterValue },
    StartsWith { field: String, value: FilterValue },
    EndsWith { field: String, value: FilterValue },
    InArray {
        field: String,
        values: Vec<FilterValue>,
    },
    NotInArray {
        field: String,
        values: Vec<FilterValue>,
    },
    /// A literal expression emitted verbatim.
    Raw(String),
}

impl Filter {
    pub fn equal(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Filter::Equal {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn not_equal(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Filter::NotEqual {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn more_than(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Filter::MoreThan {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn more_than_equal(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Filter::MoreThanEqual {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn less_than(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Filter::LessThan {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn less_than_equal(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Filter::LessThanEqual {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Inclusive range: `field ge from and field le to`.
    pub fn between(
        field: impl Into<String>,
        from: impl Into<FilterValue>,
        to: impl Into<FilterValue>,
    ) -> Self {
        Filter::Between {
            field: field.into(),
            from: from.into(),
            to: to.into(),
        }
    }

    pub fn contains(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Filter::Contains {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn starts_with(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Filter::StartsWith {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn ends_with(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Filter::EndsWith {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn in_array<I, V>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<FilterValue>,
    {
        Filter::InArray {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn not_in_array<I, V>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<FilterValue>,
    {
        Filter::NotInArray {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn raw(expression: impl Into<String>) -> Self {
        Filter::Raw(expression.into())
    }

    /// Render this filter as an OData boolean expression.
    pub fn execute(&self) -> String {
        match self {
            Filter::Equal { field, value } => compare(field, "eq", value),
            Filter::NotEqual { field, value } => compare(field, "ne", value),
            Filter::MoreThan { field, value } => compare(field, "gt", value),
            Filter::MoreThanEqual { field, value } => compare(field, "ge", value),
            Filter::LessThan { field, value } => compare(field, "lt", value),
            Filter::LessThanEqual { field, value } => compare(field, "le", value),
            Filter::Between { field, from, to } => format!(
                "({field} ge {} and {field} le {})",
                escape(from),
                escape(to)
            ),
            Filter::Contains { field, value } => call("contains", field, value),
            Filter::StartsWith { field, value } => call("startswith", field, value),
            Filter::EndsWith { field, value } => call("endswith", field, value),
            Filter::InArray { field, values } => group(field, "eq", " or ", values),
            Filter::NotInArray { field, values } => group(field, "ne", " and ", values),
            Filter::Raw(expression) => expression.clone(),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.execute())
    }
}

fn compare(field: &str, op: &str, value: &FilterValue) -> String {
    format!("{field} {op} {}", escape(value))
}

fn call(function: &str, field: &str, value: &FilterValue) -> String {
    format!("{function}({field},{})", escape(value))
}

fn group(field: &str, op: &str, separator: &str, values: &[FilterValue]) -> String {
    let clauses: Vec<String> = values.iter().map(|v| compare(field, op, v)).collect();
    format!("({})", clauses.join(separator))
}
