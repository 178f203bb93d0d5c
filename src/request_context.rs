//! Per-request context extracted from inbound headers
//!
//! Carries the request id used in every log line, the language used to
//! render error messages, and the allow-listed headers forwarded to the v3
//! service.

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use uuid::Uuid;

use crate::errors::Language;

/// Header carrying the request id across services
pub const REQUEST_ID_HEADER: &str = "cc_request_id";

/// Header selecting the message language
pub const LANGUAGE_HEADER: &str = "blueking-language";

/// Gateway-style spelling of [`LANGUAGE_HEADER`], as sent by older callers
pub const GATEWAY_LANGUAGE_HEADER: &str = "http_blueking_language";

/// Headers copied verbatim to the v3 call
const FORWARDED_HEADERS: &[&str] = &[
    "bk_user",
    "http_blueking_supplier_account",
    LANGUAGE_HEADER,
    GATEWAY_LANGUAGE_HEADER,
];

#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,
    pub language: Language,
    forwarded: HeaderMap,
}

impl RequestContext {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let request_id = header_str(headers, REQUEST_ID_HEADER)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().simple().to_string());

        let language = Language::from_header(
            header_str(headers, LANGUAGE_HEADER)
                .or_else(|| header_str(headers, GATEWAY_LANGUAGE_HEADER)),
        );

        let mut forwarded = HeaderMap::new();
        for &name in FORWARDED_HEADERS {
            if let Some(value) = headers.get(name) {
                forwarded.insert(HeaderName::from_static(name), value.clone());
            }
        }
        if let Ok(value) = HeaderValue::from_str(&request_id) {
            forwarded.insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
        }

        Self {
            request_id,
            language,
            forwarded,
        }
    }

    /// Headers to attach to the downstream call
    pub fn forwarded_headers(&self) -> &HeaderMap {
        &self.forwarded
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::from_headers(&HeaderMap::new())
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_is_reused_when_present() {
        let mut headers = HeaderMap::new();
        headers.insert("cc_request_id", HeaderValue::from_static("abc123"));
        let ctx = RequestContext::from_headers(&headers);
        assert_eq!(ctx.request_id, "abc123");
        assert_eq!(ctx.forwarded_headers()["cc_request_id"], "abc123");
    }

    #[test]
    fn test_request_id_is_generated_when_absent() {
        let ctx = RequestContext::default();
        assert_eq!(ctx.request_id.len(), 32);
        assert_eq!(ctx.language, Language::En);
    }

    #[test]
    fn test_only_allow_listed_headers_are_forwarded() {
        let mut headers = HeaderMap::new();
        headers.insert("bk_user", HeaderValue::from_static("admin"));
        headers.insert("blueking-language", HeaderValue::from_static("zh"));
        headers.insert("authorization", HeaderValue::from_static("secret"));
        let ctx = RequestContext::from_headers(&headers);

        assert_eq!(ctx.language, Language::Zh);
        let forwarded = ctx.forwarded_headers();
        assert_eq!(forwarded["bk_user"], "admin");
        assert_eq!(forwarded["blueking-language"], "zh");
        assert!(forwarded.get("authorization").is_none());
    }

    #[test]
    fn test_gateway_style_language_header_is_understood() {
        let mut headers = HeaderMap::new();
        headers.insert("http_blueking_language", HeaderValue::from_static("zh-cn"));
        let ctx = RequestContext::from_headers(&headers);

        assert_eq!(ctx.language, Language::Zh);
        assert_eq!(ctx.forwarded_headers()["http_blueking_language"], "zh-cn");
    }

    #[test]
    fn test_dash_style_language_header_wins_when_both_are_sent() {
        let mut headers = HeaderMap::new();
        headers.insert("blueking-language", HeaderValue::from_static("en"));
        headers.insert("http_blueking_language", HeaderValue::from_static("zh"));
        assert_eq!(RequestContext::from_headers(&headers).language, Language::En);
    }
}
