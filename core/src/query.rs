//! Compilation of filters, projections and ordering into query parameters.
//!
//! # Design
//! Each compiler is a pure function returning a flat `QueryParams` map whose
//! keys follow the backend's lookup syntax: a bare field for equality,
//! `field__lookup` for every other operator, `fields` / `omit` for
//! projections and `ordering` for sorting. A compiler either returns the
//! whole map or an error; it never yields a partially compiled triple.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ApiError, Result};
use crate::normalize::require_id;
use crate::operators;

/// Compiled query parameters. Keys are unique; the last write wins.
pub type QueryParams = BTreeMap<String, String>;

/// One operator symbol or an ordered chain of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Operators {
    Single(String),
    Chain(Vec<String>),
}

impl From<&str> for Operators {
    fn from(symbol: &str) -> Self {
        Operators::Single(symbol.to_string())
    }
}

impl From<Vec<&str>> for Operators {
    fn from(chain: Vec<&str>) -> Self {
        Operators::Chain(chain.into_iter().map(str::to_string).collect())
    }
}

/// A `(field, operator, value)` condition.
///
/// Serialized as a three-element array, e.g. `["id", "<=", 100]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "(String, Operators, Value)", into = "(String, Operators, Value)")]
pub struct Filter {
    pub field: String,
    pub operators: Operators,
    pub value: Value,
}

impl Filter {
    pub fn new(field: impl Into<String>, operators: impl Into<Operators>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            operators: operators.into(),
            value: value.into(),
        }
    }

    /// Compiled query key for this filter.
    pub fn key(&self) -> Result<String> {
        match &self.operators {
            Operators::Single(symbol) => {
                let suffix = operators::suffix(symbol)?;
                if operators::is_equality(symbol) {
                    Ok(self.field.clone())
                } else {
                    Ok(format!("{}{suffix}", self.field))
                }
            }
            Operators::Chain(chain) => {
                let mut key = self.field.clone();
                for symbol in chain {
                    key.push_str(operators::suffix(symbol)?);
                }
                Ok(key)
            }
        }
    }
}

impl From<(String, Operators, Value)> for Filter {
    fn from((field, operators, value): (String, Operators, Value)) -> Self {
        Self { field, operators, value }
    }
}

impl From<Filter> for (String, Operators, Value) {
    fn from(filter: Filter) -> Self {
        (filter.field, filter.operators, filter.value)
    }
}

/// Render a filter value in its query-string form.
///
/// Arrays are comma-joined without escaping; entity references collapse to
/// their identifier.
fn wire_value(value: &Value, field: &str) -> Result<String> {
    match value {
        Value::Null => Ok(String::new()),
        Value::String(s) => Ok(s.clone()),
        Value::Bool(_) | Value::Number(_) => Ok(value.to_string()),
        Value::Object(entity) => wire_value(require_id(entity, field)?, field),
        Value::Array(items) => {
            let parts = items
                .iter()
                .map(|item| wire_value(item, field))
                .collect::<Result<Vec<_>>>()?;
            Ok(parts.join(","))
        }
    }
}

pub fn compile_filters(filters: &[Filter]) -> Result<QueryParams> {
    let mut params = QueryParams::new();
    for filter in filters {
        let value = wire_value(&filter.value, &filter.field)?;
        let key = filter.key()?;
        params.insert(key, value);
    }
    Ok(params)
}

/// Which projection parameter to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionAction {
    Fields,
    Omit,
}

impl ProjectionAction {
    pub fn as_str(self) -> &'static str {
        match self {
            ProjectionAction::Fields => "fields",
            ProjectionAction::Omit => "omit",
        }
    }
}

pub fn compile_projection(action: ProjectionAction, fields: &[String]) -> QueryParams {
    let mut params = QueryParams::new();
    if !fields.is_empty() {
        params.insert(action.as_str().to_string(), fields.join(","));
    }
    params
}

/// Sort directive. `direction` defaults to `ASC`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Order {
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub direction: Option<String>,
}

impl Order {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: Some(field.into()),
            direction: Some("ASC".to_string()),
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: Some(field.into()),
            direction: Some("DESC".to_string()),
        }
    }
}

pub fn compile_order(order: Option<&Order>) -> Result<QueryParams> {
    let mut params = QueryParams::new();
    let Some(order) = order else {
        return Ok(params);
    };
    let descending = match order.direction.as_deref().unwrap_or("ASC") {
        "ASC" => false,
        "DESC" => true,
        other => return Err(ApiError::InvalidDirection(other.to_string())),
    };
    let field = order
        .field
        .as_deref()
        .ok_or_else(|| ApiError::InvalidValue("order directive needs a field".to_string()))?;
    let value = if descending { format!("-{field}") } else { field.to_string() };
    params.insert("ordering".to_string(), value);
    Ok(params)
}

/// Everything a find call can send as query parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FindQuery {
    #[serde(default)]
    pub filters: Vec<Filter>,
    #[serde(default)]
    pub fields: Vec<String>,
    #[serde(default)]
    pub omit: Vec<String>,
    #[serde(default)]
    pub order: Option<Order>,
}

impl FindQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, field: impl Into<String>, operators: impl Into<Operators>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::new(field, operators, value));
        self
    }

    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn omit<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.omit = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn order(mut self, order: Order) -> Self {
        self.order = Some(order);
        self
    }

    /// Compile every part of the query into one parameter map.
    pub fn compile(&self) -> Result<QueryParams> {
        let mut params = compile_filters(&self.filters)?;
        params.extend(compile_projection(ProjectionAction::Fields, &self.fields));
        params.extend(compile_projection(ProjectionAction::Omit, &self.omit));
        params.extend(compile_order(self.order.as_ref())?);
        Ok(params)
    }
}
