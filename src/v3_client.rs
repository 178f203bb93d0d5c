//! v3 service invoker
//!
//! The gateway talks to the v3 host/topology services through the
//! [`V3Client`] trait. Two failure channels are kept apart: a
//! [`TransportError`] means the service could not be asked, while a
//! [`V3Result`] with `success == false` means the service answered no.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::query_builder::StructuredQuery;
use crate::request_context::RequestContext;

/// Reply of a v3 call, as returned on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct V3Result {
    #[serde(rename = "result")]
    pub success: bool,
    #[serde(rename = "bk_error_code", default)]
    pub code: i64,
    #[serde(
        rename = "bk_error_msg",
        default,
        deserialize_with = "nullable_string"
    )]
    pub message: String,
    #[serde(default)]
    pub data: Value,
}

impl V3Result {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            code: 0,
            message: "success".to_string(),
            data,
        }
    }

    pub fn failure(code: i64, message: impl Into<String>) -> Self {
        Self {
            success: false,
            code,
            message: message.into(),
            data: Value::Null,
        }
    }
}

fn nullable_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// v3 endpoints used by the legacy surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum V3Operation {
    IpAndProxyByCompany,
    HostSearchByIp,
    HostSearchBySetId,
    HostSearchByModuleId,
    HostSearchByAppId,
    HostSearchByProperty,
    SearchModuleByApp { app_id: i64 },
}

impl V3Operation {
    /// Path relative to the v3 base URL
    pub fn path(&self) -> String {
        match self {
            V3Operation::IpAndProxyByCompany => {
                "/host/v3/openapi/host/getIPAndProxyByCompany".to_string()
            }
            V3Operation::HostSearchByIp => "/host/v3/openapi/host/getHostListByIP".to_string(),
            V3Operation::HostSearchBySetId => "/host/v3/openapi/host/getSetHostList".to_string(),
            V3Operation::HostSearchByModuleId => {
                "/host/v3/openapi/host/getModuleHostList".to_string()
            }
            V3Operation::HostSearchByAppId => "/host/v3/openapi/host/getAppHostList".to_string(),
            V3Operation::HostSearchByProperty => {
                "/host/v3/openapi/host/getHostsByProperty".to_string()
            }
            V3Operation::SearchModuleByApp { app_id } => {
                format!("/topo/v3/openapi/module/searchByApp/{app_id}")
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            V3Operation::IpAndProxyByCompany => "ip_and_proxy_by_company",
            V3Operation::HostSearchByIp => "host_search_by_ip",
            V3Operation::HostSearchBySetId => "host_search_by_set_id",
            V3Operation::HostSearchByModuleId => "host_search_by_module_id",
            V3Operation::HostSearchByAppId => "host_search_by_app_id",
            V3Operation::HostSearchByProperty => "host_search_by_property",
            V3Operation::SearchModuleByApp { .. } => "search_module_by_app",
        }
    }
}

/// One outbound call: which endpoint and with what query
#[derive(Debug, Clone, PartialEq)]
pub struct V3Call {
    pub operation: V3Operation,
    pub query: StructuredQuery,
}

impl V3Call {
    pub fn new(operation: V3Operation, query: StructuredQuery) -> Self {
        Self { operation, query }
    }
}

/// The v3 service could not be asked
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("no reply within {0:?}")]
    Timeout(Duration),

    #[error("unexpected HTTP status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("reply could not be decoded: {0}")]
    Decode(String),
}

#[async_trait]
pub trait V3Client: Send + Sync {
    /// Perform one call
    ///
    /// Cancellation and deadline expiry surface as a [`TransportError`].
    async fn invoke(&self, ctx: &RequestContext, call: &V3Call)
        -> Result<V3Result, TransportError>;
}

/// [`V3Client`] speaking JSON over HTTP
#[derive(Debug, Clone)]
pub struct HttpV3Client {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpV3Client {
    pub fn new(base_url: &Url, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.as_str().trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn endpoint(&self, operation: &V3Operation) -> String {
        format!("{}{}", self.base_url, operation.path())
    }

    async fn exchange(
        &self,
        ctx: &RequestContext,
        call: &V3Call,
    ) -> Result<V3Result, TransportError> {
        let mut request = self.client.post(self.endpoint(&call.operation));
        for (name, value) in ctx.forwarded_headers() {
            request = request.header(name.as_str(), value.as_bytes());
        }

        let response = request.json(&call.query).send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout(self.timeout)
            } else {
                TransportError::Request(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| TransportError::Decode(e.to_string()))
    }
}

#[async_trait]
impl V3Client for HttpV3Client {
    async fn invoke(
        &self,
        ctx: &RequestContext,
        call: &V3Call,
    ) -> Result<V3Result, TransportError> {
        debug!(
            request_id = %ctx.request_id,
            operation = call.operation.name(),
            "calling v3 service"
        );

        let result = match tokio::time::timeout(self.timeout, self.exchange(ctx, call)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout(self.timeout)),
        };

        if let Err(e) = &result {
            warn!(
                request_id = %ctx.request_id,
                operation = call.operation.name(),
                error = %e,
                "v3 call failed"
            );
        }
        result
    }
}
