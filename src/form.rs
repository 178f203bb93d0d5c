// Legacy form parameters and required-field validation
// Confines the stringly-typed v2 parameters to a single typed accessor layer.

use std::collections::HashMap;

use axum::http::{header::CONTENT_TYPE, HeaderMap};
use thiserror::Error;
use url::form_urlencoded;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// The raw request could not be read as form parameters
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormParseError {
    #[error("malformed percent-escape at byte {offset} of the {source_name}")]
    MalformedEscape {
        source_name: &'static str,
        offset: usize,
    },

    #[error("the {source_name} is not valid UTF-8 once decoded")]
    InvalidUtf8 { source_name: &'static str },
}

/// A required parameter is absent or only carries empty values
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field} required")]
pub struct MissingField {
    field: String,
}

impl MissingField {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }

    /// Name of the first missing parameter
    pub fn field(&self) -> &str {
        &self.field
    }
}

/// Legacy request parameters: name to every value supplied for it
///
/// Keys are case-sensitive. Body values precede query-string values for the
/// same key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LegacyForm {
    values: HashMap<String, Vec<String>>,
}

impl LegacyForm {
    /// Parse the query string and, for form-encoded requests, the body
    pub fn from_parts(
        headers: &HeaderMap,
        query: Option<&str>,
        body: &[u8],
    ) -> Result<Self, FormParseError> {
        let mut form = Self::default();

        let is_form_body = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim_start().to_ascii_lowercase().starts_with(FORM_CONTENT_TYPE))
            .unwrap_or(false);

        if is_form_body && !body.is_empty() {
            check_encoding(body, "request body")?;
            form.extend_encoded(body);
        }

        if let Some(query) = query {
            check_encoding(query.as_bytes(), "query string")?;
            form.extend_encoded(query.as_bytes());
        }

        Ok(form)
    }

    /// Build a form from already decoded pairs
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut form = Self::default();
        for (key, value) in pairs {
            form.push(key.into(), value.into());
        }
        form
    }

    fn extend_encoded(&mut self, encoded: &[u8]) {
        for (key, value) in form_urlencoded::parse(encoded) {
            self.push(key.into_owned(), value.into_owned());
        }
    }

    fn push(&mut self, key: String, value: String) {
        self.values.entry(key).or_default().push(value);
    }

    /// First non-empty value of `name`, if any
    pub fn value(&self, name: &str) -> Option<&str> {
        self.values
            .get(name)?
            .iter()
            .map(String::as_str)
            .find(|v| !v.is_empty())
    }

    /// Every value supplied for `name`, empty ones included
    pub fn values(&self, name: &str) -> &[String] {
        self.values.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    /// Whether `name` carries at least one non-empty value
    pub fn is_present(&self, name: &str) -> bool {
        self.value(name).is_some()
    }

    /// Return the value of a required parameter
    pub fn require(&self, name: &str) -> Result<&str, MissingField> {
        self.value(name).ok_or_else(|| MissingField::new(name))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Check every required parameter in declared order
///
/// Reports the first parameter that is absent or empty.
pub fn validate_required(form: &LegacyForm, required: &[&str]) -> Result<(), MissingField> {
    match required.iter().find(|name| !form.is_present(name)) {
        Some(name) => Err(MissingField::new(*name)),
        None => Ok(()),
    }
}

/// Reject malformed percent-escapes and input that does not decode to UTF-8
///
/// `form_urlencoded` would silently substitute U+FFFD for bad sequences.
/// Separators are ASCII, so checking the fully decoded buffer covers every
/// key and value.
fn check_encoding(encoded: &[u8], source_name: &'static str) -> Result<(), FormParseError> {
    let mut decoded = Vec::with_capacity(encoded.len());
    let mut offset = 0;
    while offset < encoded.len() {
        if encoded[offset] == b'%' {
            let byte = encoded
                .get(offset + 1..offset + 3)
                .and_then(|hex| std::str::from_utf8(hex).ok())
                .filter(|hex| hex.bytes().all(|b| b.is_ascii_hexdigit()))
                .and_then(|hex| u8::from_str_radix(hex, 16).ok())
                .ok_or(FormParseError::MalformedEscape {
                    source_name,
                    offset,
                })?;
            decoded.push(byte);
            offset += 3;
        } else {
            decoded.push(encoded[offset]);
            offset += 1;
        }
    }

    std::str::from_utf8(&decoded)
        .map(|_| ())
        .map_err(|_| FormParseError::InvalidUtf8 { source_name })
}
