// Error Catalogue - stable legacy error codes and localized message templates
// Every failure leaving the gateway is expressed as one of these codes, except
// downstream application errors which keep the downstream's own code.

use std::fmt;

use thiserror::Error;

use crate::coerce::NotAnInteger;
use crate::enum_mapping::UnknownToken;
use crate::form::{FormParseError, MissingField};
use crate::reshape::ReshapeError;
use crate::v3_client::TransportError;

/// Language used to render catalogue messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    #[default]
    En,
    Zh,
}

impl Language {
    /// Parse the value of the language header, falling back to English
    pub fn from_header(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()) {
            Some(v) if v == "zh" || v.starts_with("zh-") || v.starts_with("zh_") => Language::Zh,
            _ => Language::En,
        }
    }
}

/// Legacy error codes with stable numeric values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    HttpDoRequestFailed,
    PostInputParseError,
    ParamsNeedSet,
    ParamsNeedInt,
    ReplyDataFormatError,
    DownstreamFailed,
    V2DirectErr,
    V2MultiModuleIdErr,
    V2MultiSetIdErr,
}

impl ErrorCode {
    /// Numeric code written into the legacy envelope
    pub const fn number(self) -> i64 {
        match self {
            ErrorCode::HttpDoRequestFailed => 1_199_002,
            ErrorCode::PostInputParseError => 1_199_006,
            ErrorCode::ParamsNeedSet => 1_199_008,
            ErrorCode::ParamsNeedInt => 1_199_009,
            ErrorCode::ReplyDataFormatError => 1_199_013,
            ErrorCode::DownstreamFailed => 1_199_017,
            ErrorCode::V2DirectErr => 1_170_002,
            ErrorCode::V2MultiModuleIdErr => 1_170_003,
            ErrorCode::V2MultiSetIdErr => 1_170_004,
        }
    }

    /// Message template; each `{}` is replaced by one argument in order
    pub const fn template(self, language: Language) -> &'static str {
        match (self, language) {
            (ErrorCode::HttpDoRequestFailed, Language::En) => {
                "failed to communicate with the downstream service"
            }
            (ErrorCode::HttpDoRequestFailed, Language::Zh) => "与下游服务通讯失败",
            (ErrorCode::PostInputParseError, Language::En) => {
                "failed to parse the request parameters"
            }
            (ErrorCode::PostInputParseError, Language::Zh) => "请求参数解析失败",
            (ErrorCode::ParamsNeedSet, Language::En) => "{} required",
            (ErrorCode::ParamsNeedSet, Language::Zh) => "参数 {} 必须设置",
            (ErrorCode::ParamsNeedInt, Language::En) => "{} must be an integer",
            (ErrorCode::ParamsNeedInt, Language::Zh) => "参数 {} 必须为整数",
            (ErrorCode::ReplyDataFormatError, Language::En) => "downstream reply data format error",
            (ErrorCode::ReplyDataFormatError, Language::Zh) => "下游返回数据格式错误",
            (ErrorCode::DownstreamFailed, Language::En) => "downstream service reported failure",
            (ErrorCode::DownstreamFailed, Language::Zh) => "下游服务返回失败",
            (ErrorCode::V2DirectErr, _) => "{}",
            (ErrorCode::V2MultiModuleIdErr, Language::En) => {
                "ModuleID must be a comma separated list of integers"
            }
            (ErrorCode::V2MultiModuleIdErr, Language::Zh) => "ModuleID 必须为逗号分隔的整数列表",
            (ErrorCode::V2MultiSetIdErr, Language::En) => {
                "SetID must be a comma separated list of integers"
            }
            (ErrorCode::V2MultiSetIdErr, Language::Zh) => "SetID 必须为逗号分隔的整数列表",
        }
    }

    /// Render the template for `language` with positional arguments
    pub fn render(self, language: Language, args: &[&str]) -> String {
        let template = self.template(language);
        let mut rendered = String::with_capacity(template.len() + 16);
        let mut args = args.iter();
        let mut pieces = template.split("{}").peekable();
        while let Some(piece) = pieces.next() {
            rendered.push_str(piece);
            if pieces.peek().is_some() {
                rendered.push_str(args.next().copied().unwrap_or_default());
            }
        }
        rendered
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// Every way a legacy request can terminate with a failure
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("request parameters could not be parsed: {0}")]
    FormParse(#[from] FormParseError),

    #[error(transparent)]
    Missing(#[from] MissingField),

    /// An identifier failed integer parsing; `code` picks the legacy code for the field
    #[error("{source}")]
    NotAnInteger {
        code: ErrorCode,
        #[source]
        source: NotAnInteger,
    },

    #[error(transparent)]
    UnknownToken(#[from] UnknownToken),

    #[error("downstream unreachable: {0}")]
    Transport(#[from] TransportError),

    #[error("downstream reported failure: code={code} message={message}")]
    Application { code: i64, message: String },

    #[error("downstream reply has an unexpected shape: {0}")]
    Reshape(#[from] ReshapeError),
}

impl BridgeError {
    /// Integer identifier failure reported under a field-specific code
    pub fn not_an_integer(code: ErrorCode, source: NotAnInteger) -> Self {
        BridgeError::NotAnInteger { code, source }
    }

    /// Downstream failure passed through with its own code and message
    pub fn application(code: i64, message: impl Into<String>) -> Self {
        BridgeError::Application {
            code,
            message: message.into(),
        }
    }

    /// Numeric code for the legacy envelope
    pub fn code(&self) -> i64 {
        match self {
            BridgeError::Application { code, .. } if *code != 0 => *code,
            BridgeError::Application { .. } => ErrorCode::DownstreamFailed.number(),
            other => other.catalogue_code().map_or(0, ErrorCode::number),
        }
    }

    fn catalogue_code(&self) -> Option<ErrorCode> {
        match self {
            BridgeError::FormParse(_) => Some(ErrorCode::PostInputParseError),
            BridgeError::Missing(_) => Some(ErrorCode::ParamsNeedSet),
            BridgeError::NotAnInteger { code, .. } => Some(*code),
            BridgeError::UnknownToken(_) => Some(ErrorCode::V2DirectErr),
            BridgeError::Transport(_) => Some(ErrorCode::HttpDoRequestFailed),
            BridgeError::Application { .. } => None,
            BridgeError::Reshape(_) => Some(ErrorCode::ReplyDataFormatError),
        }
    }

    /// Message for the legacy envelope, rendered in `language`
    pub fn message(&self, language: Language) -> String {
        match self {
            BridgeError::Missing(missing) => {
                ErrorCode::ParamsNeedSet.render(language, &[missing.field()])
            }
            BridgeError::NotAnInteger { code, source } => code.render(language, &[source.field()]),
            BridgeError::UnknownToken(unknown) => {
                ErrorCode::V2DirectErr.render(language, &[&unknown.to_string()])
            }
            BridgeError::Application { code: _, message } if !message.is_empty() => {
                message.clone()
            }
            BridgeError::Application { .. } => ErrorCode::DownstreamFailed.render(language, &[]),
            other => other
                .catalogue_code()
                .map(|code| code.render(language, &[]))
                .unwrap_or_default(),
        }
    }

    /// Input errors are detected locally and never reach the downstream service
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            BridgeError::FormParse(_)
                | BridgeError::Missing(_)
                | BridgeError::NotAnInteger { .. }
                | BridgeError::UnknownToken(_)
        )
    }
}
