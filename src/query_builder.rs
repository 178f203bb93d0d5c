// Query Builder - assembles structured v3 queries from validated legacy input
// Required fields are always copied; optional fields only when the legacy
// parameter is present and non-empty.

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::coerce::{parse_identifier_list, parse_int, split_list};
use crate::enum_mapping::EnumMapping;
use crate::errors::{BridgeError, ErrorCode};
use crate::form::LegacyForm;

/// Structured v3 query: field name to JSON value
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct StructuredQuery {
    fields: Map<String, Value>,
}

impl StructuredQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(field.into(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }
}

/// Fluent builder reading from a [`LegacyForm`]
///
/// Each step checks and converts its own parameter only; steps never look at
/// fields set by earlier steps.
pub struct QueryBuilder<'a> {
    form: &'a LegacyForm,
    query: StructuredQuery,
}

impl<'a> QueryBuilder<'a> {
    pub fn new(form: &'a LegacyForm) -> Self {
        Self {
            form,
            query: StructuredQuery::new(),
        }
    }

    /// Required single integer, reported as `ParamsNeedInt` when malformed
    pub fn required_int(mut self, param: &str, field: &str) -> Result<Self, BridgeError> {
        let raw = self.form.require(param)?;
        let value = parse_int(param, raw)
            .map_err(|e| BridgeError::not_an_integer(ErrorCode::ParamsNeedInt, e))?;
        self.query.insert(field, value);
        Ok(self)
    }

    /// Optional single integer
    pub fn optional_int(mut self, param: &str, field: &str) -> Result<Self, BridgeError> {
        if let Some(raw) = self.form.value(param) {
            let value = parse_int(param, raw)
                .map_err(|e| BridgeError::not_an_integer(ErrorCode::ParamsNeedInt, e))?;
            self.query.insert(field, value);
        }
        Ok(self)
    }

    /// Required identifier list; `code` is reported when any element is malformed
    pub fn required_ids(
        mut self,
        param: &str,
        field: &str,
        code: ErrorCode,
    ) -> Result<Self, BridgeError> {
        let raw = self.form.require(param)?;
        let ids = parse_identifier_list(param, raw)
            .map_err(|e| BridgeError::not_an_integer(code, e))?;
        self.query.insert(field, ids);
        Ok(self)
    }

    /// Optional identifier list
    pub fn optional_ids(
        mut self,
        param: &str,
        field: &str,
        code: ErrorCode,
    ) -> Result<Self, BridgeError> {
        if let Some(raw) = self.form.value(param) {
            let ids = parse_identifier_list(param, raw)
                .map_err(|e| BridgeError::not_an_integer(code, e))?;
            self.query.insert(field, ids);
        }
        Ok(self)
    }

    /// Required comma-joined string list, copied without further parsing
    pub fn required_strings(mut self, param: &str, field: &str) -> Result<Self, BridgeError> {
        let raw = self.form.require(param)?;
        self.query.insert(field, split_list(raw));
        Ok(self)
    }

    /// Optional comma-joined enum tokens translated through `table`
    pub fn optional_enum(
        mut self,
        table: &EnumMapping,
        field: &str,
    ) -> Result<Self, BridgeError> {
        if let Some(raw) = self.form.value(table.field()) {
            let tokens = split_list(raw);
            let translated = table.translate(&tokens)?;
            self.query.insert(field, translated);
        }
        Ok(self)
    }

    /// Field projection; an empty list asks for every field
    pub fn fields(mut self, fields: &[&str]) -> Self {
        self.query.insert("fields", fields.to_vec());
        self
    }

    /// Filter condition object
    pub fn condition(mut self, condition: Map<String, Value>) -> Self {
        self.query.insert("condition", Value::Object(condition));
        self
    }

    /// Pagination meaning "return everything"
    pub fn page_all(mut self) -> Self {
        self.query.insert("page", json!({ "start": 0, "limit": 0 }));
        self
    }

    pub fn build(self) -> StructuredQuery {
        self.query
    }
}
