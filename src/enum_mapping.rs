//! Legacy enum tokens and their v3 equivalents
//!
//! Each table is built once on first use and never mutated afterwards, so
//! concurrent handlers read it without synchronization.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use thiserror::Error;

/// A token outside the declared domain of an [`EnumMapping`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field} not in {domain}, it is {token}")]
pub struct UnknownToken {
    field: &'static str,
    token: String,
    domain: String,
}

impl UnknownToken {
    pub fn field(&self) -> &str {
        self.field
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Valid legacy tokens, comma-joined in declared order
    pub fn domain(&self) -> &str {
        &self.domain
    }
}

/// Static mapping from legacy token to v3 token for one field
#[derive(Debug)]
pub struct EnumMapping {
    field: &'static str,
    tokens: IndexMap<&'static str, &'static str>,
}

impl EnumMapping {
    fn new(field: &'static str, pairs: &[(&'static str, &'static str)]) -> Self {
        Self {
            field,
            tokens: pairs.iter().copied().collect(),
        }
    }

    /// Legacy parameter name this table applies to
    pub fn field(&self) -> &'static str {
        self.field
    }

    /// Map one token
    pub fn get(&self, token: &str) -> Option<&'static str> {
        self.tokens.get(token).copied()
    }

    /// Legacy tokens in declared order
    pub fn legacy_tokens(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.tokens.keys().copied()
    }

    /// Translate every token in order, failing on the first unknown one
    ///
    /// No partial result is returned and unknown tokens are never replaced by
    /// a default.
    pub fn translate<S: AsRef<str>>(&self, tokens: &[S]) -> Result<Vec<&'static str>, UnknownToken> {
        tokens
            .iter()
            .map(|token| {
                let token = token.as_ref();
                self.get(token).ok_or_else(|| self.unknown(token))
            })
            .collect()
    }

    fn unknown(&self, token: &str) -> UnknownToken {
        UnknownToken {
            field: self.field,
            token: token.to_string(),
            domain: self.legacy_tokens().collect::<Vec<_>>().join(","),
        }
    }
}

/// `SetEnviType`: 1 test, 2 experience, 3 formal
pub static SET_ENV_TYPE: Lazy<EnumMapping> =
    Lazy::new(|| EnumMapping::new("SetEnviType", &[("1", "1"), ("2", "2"), ("3", "3")]));

/// `SetServiceStatus`: v2 uses 0 for closed, v3 uses 2
pub static SET_SERVICE_STATUS: Lazy<EnumMapping> =
    Lazy::new(|| EnumMapping::new("SetServiceStatus", &[("0", "2"), ("1", "1")]));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translate_maps_in_order() {
        assert_eq!(
            SET_SERVICE_STATUS.translate(&["1", "0", "1"]).unwrap(),
            vec!["1", "2", "1"]
        );
        assert_eq!(SET_ENV_TYPE.translate(&["3", "1"]).unwrap(), vec!["3", "1"]);
    }

    #[test]
    fn test_unknown_token_cites_token_and_domain() {
        let err = SET_ENV_TYPE.translate(&["1", "9", "2"]).unwrap_err();
        assert_eq!(err.token(), "9");
        assert_eq!(err.domain(), "1,2,3");
        assert_eq!(err.to_string(), "SetEnviType not in 1,2,3, it is 9");
    }

    #[test]
    fn test_empty_token_is_unknown() {
        let err = SET_SERVICE_STATUS.translate(&["1", ""]).unwrap_err();
        assert_eq!(err.field(), "SetServiceStatus");
        assert_eq!(err.token(), "");
        assert_eq!(err.domain(), "0,1");
    }

    #[test]
    fn test_status_zero_is_not_passed_through() {
        assert_eq!(SET_SERVICE_STATUS.get("0"), Some("2"));
        assert_eq!(SET_SERVICE_STATUS.get("2"), None);
    }
}
