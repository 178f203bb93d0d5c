// Value coercion for comma-joined legacy parameters

use thiserror::Error;

/// A value that should have been a base-10 integer was not
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field} is not an integer: {value:?}")]
pub struct NotAnInteger {
    field: String,
    value: String,
}

impl NotAnInteger {
    fn new(field: &str, value: &str) -> Self {
        Self {
            field: field.to_string(),
            value: value.to_string(),
        }
    }

    /// Parameter the offending value came from
    pub fn field(&self) -> &str {
        &self.field
    }

    /// The piece that failed to parse
    pub fn value(&self) -> &str {
        &self.value
    }
}

/// Split on commas without trimming
///
/// Empty pieces are kept so that downstream validation sees them.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',').map(str::to_string).collect()
}

/// Parse a single signed 64-bit identifier
pub fn parse_int(field: &str, raw: &str) -> Result<i64, NotAnInteger> {
    raw.parse::<i64>()
        .map_err(|_| NotAnInteger::new(field, raw))
}

/// Parse a comma-separated identifier list, all or nothing
///
/// Order is preserved and duplicates are kept. Whitespace is not tolerated:
/// `"1, 2"` fails on `" 2"`. Callers treat an empty string as an absent
/// parameter and do not call this with one.
pub fn parse_identifier_list(field: &str, raw: &str) -> Result<Vec<i64>, NotAnInteger> {
    raw.split(',').map(|piece| parse_int(field, piece)).collect()
}
