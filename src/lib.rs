// v2 Compatibility Gateway - legacy form-encoded host queries over the v3 services
// Root library module

pub mod coerce;
pub mod config;
pub mod enum_mapping;
pub mod errors;
pub mod form;
pub mod http_server;
pub mod http_types;
pub mod legacy_service;
pub mod observability;
pub mod query_builder;
pub mod request_context;
pub mod reshape;
pub mod v3_client;

// Re-export key types
pub use observability::{
    init_logging, init_logging_with_config, init_logging_with_level, request_counts,
    with_request_id,
};

pub use config::{GatewayConfig, LoggingConfig};

pub use errors::{BridgeError, ErrorCode, Language};

pub use form::{validate_required, LegacyForm, MissingField};

pub use coerce::{parse_identifier_list, parse_int, split_list, NotAnInteger};

pub use enum_mapping::{EnumMapping, UnknownToken, SET_ENV_TYPE, SET_SERVICE_STATUS};

pub use query_builder::{QueryBuilder, StructuredQuery};

pub use v3_client::{HttpV3Client, TransportError, V3Call, V3Client, V3Operation, V3Result};

pub use reshape::{host_list_to_v2, reindex_by_field, Row, RowFieldError, ReshapeError};

pub use http_types::LegacyEnvelope;

pub use legacy_service::{LegacyHostService, LegacyOperation};

pub use request_context::RequestContext;

pub use http_server::{create_server, start_server};
