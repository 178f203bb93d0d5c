// Response Reshaper - v3 payloads into the shapes legacy clients expect
//
// Two policies coexist: keyed reindexing drops bad rows one by one,
// while the host list conversion rejects the whole reply on any bad shape.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::v3_client::V3Result;

/// Field lookup on a downstream row failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowFieldError {
    #[error("field {0} not found")]
    NotFound(String),

    #[error("field {field} is not an integer: {value}")]
    NotInteger { field: String, value: String },
}

/// The downstream payload does not have the expected shape
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReshapeError {
    #[error("expected a list or an object with an info list, got {0}")]
    UnexpectedPayload(&'static str),

    #[error("row {index} is {kind}, expected an object")]
    RowNotObject { index: usize, kind: &'static str },
}

/// Read-only view over one downstream row
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    fields: &'a Map<String, Value>,
}

impl<'a> Row<'a> {
    pub fn new(fields: &'a Map<String, Value>) -> Self {
        Self { fields }
    }

    pub fn get(&self, field: &str) -> Option<&'a Value> {
        self.fields.get(field)
    }

    /// Integer value of `field`
    ///
    /// Accepts JSON integers, integral floats and numeric strings, which is
    /// how identifiers show up in v3 replies.
    pub fn as_i64(&self, field: &str) -> Result<i64, RowFieldError> {
        let value = self
            .fields
            .get(field)
            .ok_or_else(|| RowFieldError::NotFound(field.to_string()))?;

        let not_integer = || RowFieldError::NotInteger {
            field: field.to_string(),
            value: value.to_string(),
        };

        match value {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| {
                    n.as_f64()
                        .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64)
                        .map(|f| f as i64)
                })
                .ok_or_else(not_integer),
            Value::String(s) => s.parse::<i64>().map_err(|_| not_integer()),
            _ => Err(not_integer()),
        }
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

/// Rows of a reply: a bare list or the `info` list of a paginated envelope
///
/// The envelope's `count` is not carried over.
fn rows_of(data: &Value) -> Result<&[Value], ReshapeError> {
    match data {
        Value::Null => Ok(&[]),
        Value::Array(rows) => Ok(rows),
        Value::Object(envelope) => match envelope.get("info") {
            Some(Value::Array(rows)) => Ok(rows),
            Some(Value::Null) => Ok(&[]),
            Some(other) => Err(ReshapeError::UnexpectedPayload(kind_of(other))),
            None => Err(ReshapeError::UnexpectedPayload("an object without info")),
        },
        other => Err(ReshapeError::UnexpectedPayload(kind_of(other))),
    }
}

/// Key rows by the integer value of `field`
///
/// Rows that are not objects, lack the field or carry a non-integer value
/// are left out; they never fail the reply. A later row with the same key
/// replaces an earlier one.
pub fn reindex_by_field(
    result: &V3Result,
    field: &str,
) -> Result<BTreeMap<i64, Map<String, Value>>, ReshapeError> {
    let mut keyed = BTreeMap::new();
    for (index, row) in rows_of(&result.data)?.iter().enumerate() {
        let Some(fields) = row.as_object() else {
            debug!(index, "dropping row that is not an object");
            continue;
        };
        match Row::new(fields).as_i64(field) {
            Ok(id) => {
                keyed.insert(id, fields.clone());
            }
            Err(e) => debug!(index, error = %e, "dropping row"),
        }
    }
    Ok(keyed)
}

/// Host rows as the bare list legacy clients expect
///
/// Rows are copied verbatim; only the envelope around them changes.
pub fn host_list_to_v2(result: &V3Result) -> Result<Value, ReshapeError> {
    let rows = rows_of(&result.data)?;
    let mut hosts = Vec::with_capacity(rows.len());
    for (index, row) in rows.iter().enumerate() {
        if !row.is_object() {
            return Err(ReshapeError::RowNotObject {
                index,
                kind: kind_of(row),
            });
        }
        hosts.push(row.clone());
    }
    Ok(Value::Array(hosts))
}
