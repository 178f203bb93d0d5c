//! Legacy host endpoints
//!
//! One pipeline per v2 endpoint: validate the required parameters, build the
//! v3 query (coercing identifiers and translating enum tokens on the way),
//! call the v3 service and reshape its reply. The first failing stage ends
//! the pipeline; nothing is retried.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::debug;

use crate::coerce::parse_int;
use crate::enum_mapping::{SET_ENV_TYPE, SET_SERVICE_STATUS};
use crate::errors::{BridgeError, ErrorCode};
use crate::form::{validate_required, LegacyForm};
use crate::query_builder::{QueryBuilder, StructuredQuery};
use crate::request_context::RequestContext;
use crate::reshape::{host_list_to_v2, reindex_by_field};
use crate::v3_client::{V3Call, V3Client, V3Operation, V3Result};

const MODULE_ID_FIELD: &str = "bk_module_id";

/// The v2 operations served by the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LegacyOperation {
    IpAndProxyByCompany,
    HostListByIp,
    SetHostList,
    ModuleHostList,
    AppHostList,
    HostsByProperty,
    ModulesByApp,
}

impl LegacyOperation {
    pub const ALL: [LegacyOperation; 7] = [
        LegacyOperation::IpAndProxyByCompany,
        LegacyOperation::HostListByIp,
        LegacyOperation::SetHostList,
        LegacyOperation::ModuleHostList,
        LegacyOperation::AppHostList,
        LegacyOperation::HostsByProperty,
        LegacyOperation::ModulesByApp,
    ];

    /// Route the legacy clients call
    pub fn path(self) -> &'static str {
        match self {
            LegacyOperation::IpAndProxyByCompany => "/api/v2/host/getIPAndProxyByCompany",
            LegacyOperation::HostListByIp => "/api/v2/host/getHostListByIP",
            LegacyOperation::SetHostList => "/api/v2/host/getSetHostList",
            LegacyOperation::ModuleHostList => "/api/v2/host/getModuleHostList",
            LegacyOperation::AppHostList => "/api/v2/host/getAppHostList",
            LegacyOperation::HostsByProperty => "/api/v2/host/getHostsByProperty",
            LegacyOperation::ModulesByApp => "/api/v2/module/getModulesByApp",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            LegacyOperation::IpAndProxyByCompany => "getIPAndProxyByCompany",
            LegacyOperation::HostListByIp => "getHostListByIP",
            LegacyOperation::SetHostList => "getSetHostList",
            LegacyOperation::ModuleHostList => "getModuleHostList",
            LegacyOperation::AppHostList => "getAppHostList",
            LegacyOperation::HostsByProperty => "getHostsByProperty",
            LegacyOperation::ModulesByApp => "getModulesByApp",
        }
    }
}

/// Translates legacy requests into v3 calls and back
#[derive(Clone)]
pub struct LegacyHostService {
    client: Arc<dyn V3Client>,
}

impl LegacyHostService {
    pub fn new(client: Arc<dyn V3Client>) -> Self {
        Self { client }
    }

    /// Run the pipeline for `operation`
    pub async fn execute(
        &self,
        operation: LegacyOperation,
        ctx: &RequestContext,
        form: &LegacyForm,
    ) -> Result<Value, BridgeError> {
        match operation {
            LegacyOperation::IpAndProxyByCompany => self.ip_and_proxy_by_company(ctx, form).await,
            LegacyOperation::HostListByIp => self.host_list_by_ip(ctx, form).await,
            LegacyOperation::SetHostList => self.set_host_list(ctx, form).await,
            LegacyOperation::ModuleHostList => self.module_host_list(ctx, form).await,
            LegacyOperation::AppHostList => self.app_host_list(ctx, form).await,
            LegacyOperation::HostsByProperty => self.hosts_by_property(ctx, form).await,
            LegacyOperation::ModulesByApp => self.modules_by_app(ctx, form).await,
        }
    }

    pub async fn ip_and_proxy_by_company(
        &self,
        ctx: &RequestContext,
        form: &LegacyForm,
    ) -> Result<Value, BridgeError> {
        validate_required(form, &["appId", "platId", "ipList"])?;

        let query = QueryBuilder::new(form)
            .required_strings("ipList", "ips")?
            .required_int("appId", "bk_biz_id")?
            .required_int("platId", "bk_cloud_id")?
            .build();

        let reply = self
            .invoke(ctx, V3Operation::IpAndProxyByCompany, query)
            .await?;
        Ok(reply.data)
    }

    pub async fn host_list_by_ip(
        &self,
        ctx: &RequestContext,
        form: &LegacyForm,
    ) -> Result<Value, BridgeError> {
        validate_required(form, &["IP"])?;

        let query = QueryBuilder::new(form)
            .required_strings("IP", "ip_list")?
            .optional_ids("ApplicationID", "bk_biz_id", ErrorCode::ParamsNeedInt)?
            .optional_int("platID", "bk_cloud_id")?
            .build();

        let reply = self.invoke(ctx, V3Operation::HostSearchByIp, query).await?;
        Ok(host_list_to_v2(&reply)?)
    }

    pub async fn set_host_list(
        &self,
        ctx: &RequestContext,
        form: &LegacyForm,
    ) -> Result<Value, BridgeError> {
        validate_required(form, &["ApplicationID", "SetID"])?;

        let query = QueryBuilder::new(form)
            .required_int("ApplicationID", "bk_biz_id")?
            .required_ids("SetID", "bk_set_id", ErrorCode::V2MultiSetIdErr)?
            .build();

        let reply = self
            .invoke(ctx, V3Operation::HostSearchBySetId, query)
            .await?;
        Ok(host_list_to_v2(&reply)?)
    }

    pub async fn module_host_list(
        &self,
        ctx: &RequestContext,
        form: &LegacyForm,
    ) -> Result<Value, BridgeError> {
        validate_required(form, &["ApplicationID", "ModuleID"])?;

        let query = QueryBuilder::new(form)
            .required_int("ApplicationID", "bk_biz_id")?
            .required_ids("ModuleID", MODULE_ID_FIELD, ErrorCode::V2MultiModuleIdErr)?
            .build();

        let reply = self
            .invoke(ctx, V3Operation::HostSearchByModuleId, query)
            .await?;
        Ok(host_list_to_v2(&reply)?)
    }

    pub async fn app_host_list(
        &self,
        ctx: &RequestContext,
        form: &LegacyForm,
    ) -> Result<Value, BridgeError> {
        validate_required(form, &["ApplicationID"])?;

        let query = QueryBuilder::new(form)
            .required_int("ApplicationID", "bk_biz_id")?
            .build();

        let reply = self
            .invoke(ctx, V3Operation::HostSearchByAppId, query)
            .await?;
        let hosts = host_list_to_v2(&reply)?;
        debug!(
            request_id = %ctx.request_id,
            hosts = hosts.as_array().map_or(0, Vec::len),
            "app host list reshaped"
        );
        Ok(hosts)
    }

    pub async fn hosts_by_property(
        &self,
        ctx: &RequestContext,
        form: &LegacyForm,
    ) -> Result<Value, BridgeError> {
        validate_required(form, &["ApplicationID"])?;

        let query = QueryBuilder::new(form)
            .required_int("ApplicationID", "bk_biz_id")?
            .optional_ids("SetID", "bk_set_id", ErrorCode::V2MultiSetIdErr)?
            .optional_enum(&SET_ENV_TYPE, "bk_set_env")?
            .optional_enum(&SET_SERVICE_STATUS, "bk_service_status")?
            .build();

        let reply = self
            .invoke(ctx, V3Operation::HostSearchByProperty, query)
            .await?;
        Ok(host_list_to_v2(&reply)?)
    }

    pub async fn modules_by_app(
        &self,
        ctx: &RequestContext,
        form: &LegacyForm,
    ) -> Result<Value, BridgeError> {
        validate_required(form, &["ApplicationID"])?;
        let app_id = parse_int("ApplicationID", form.require("ApplicationID")?)
            .map_err(|e| BridgeError::not_an_integer(ErrorCode::ParamsNeedInt, e))?;

        let modules = self.module_info_by_app(ctx, app_id).await?;
        Ok(Value::Object(
            modules
                .into_iter()
                .map(|(id, module)| (id.to_string(), Value::Object(module)))
                .collect(),
        ))
    }

    /// Every module of an application, keyed by module id
    ///
    /// Modules whose id is missing or not an integer are left out.
    pub async fn module_info_by_app(
        &self,
        ctx: &RequestContext,
        app_id: i64,
    ) -> Result<BTreeMap<i64, Map<String, Value>>, BridgeError> {
        let query = QueryBuilder::new(&LegacyForm::default())
            .fields(&[])
            .condition(Map::new())
            .page_all()
            .build();

        let reply = self
            .invoke(ctx, V3Operation::SearchModuleByApp { app_id }, query)
            .await?;
        Ok(reindex_by_field(&reply, MODULE_ID_FIELD)?)
    }

    /// Call the v3 service, separating "could not ask" from "was told no"
    async fn invoke(
        &self,
        ctx: &RequestContext,
        operation: V3Operation,
        query: StructuredQuery,
    ) -> Result<V3Result, BridgeError> {
        let call = V3Call::new(operation, query);
        debug!(
            request_id = %ctx.request_id,
            operation = operation.name(),
            query = %call.query.clone().into_value(),
            "invoking v3 service"
        );

        let reply = self.client.invoke(ctx, &call).await?;
        if !reply.success {
            return Err(BridgeError::application(reply.code, reply.message));
        }
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::v3_client::TransportError;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Replays one canned reply and records every call
    struct Canned {
        reply: Mutex<Option<Result<V3Result, TransportError>>>,
        calls: Mutex<Vec<V3Call>>,
    }

    impl Canned {
        fn new(reply: Result<V3Result, TransportError>) -> Arc<Self> {
            Arc::new(Self {
                reply: Mutex::new(Some(reply)),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<V3Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl V3Client for Canned {
        async fn invoke(
            &self,
            _ctx: &RequestContext,
            call: &V3Call,
        ) -> Result<V3Result, TransportError> {
            self.calls.lock().unwrap().push(call.clone());
            self.reply
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Err(TransportError::Request("no reply left".into())))
        }
    }

    fn service(client: &Arc<Canned>) -> LegacyHostService {
        LegacyHostService::new(client.clone())
    }

    #[tokio::test]
    async fn test_hosts_by_property_builds_translated_query() {
        let client = Canned::new(Ok(V3Result::ok(json!({ "count": 0, "info": [] }))));
        let form = LegacyForm::from_pairs([
            ("ApplicationID", "5"),
            ("SetEnviType", "3,1"),
            ("SetServiceStatus", "0"),
        ]);

        let data = service(&client)
            .execute(LegacyOperation::HostsByProperty, &RequestContext::default(), &form)
            .await
            .unwrap();
        assert_eq!(data, json!([]));

        let calls = client.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].operation, V3Operation::HostSearchByProperty);
        assert_eq!(
            calls[0].query.clone().into_value(),
            json!({ "bk_biz_id": 5, "bk_set_env": ["3", "1"], "bk_service_status": ["2"] })
        );
    }

    #[tokio::test]
    async fn test_input_errors_never_reach_downstream() {
        let client = Canned::new(Ok(V3Result::ok(json!([]))));
        let form = LegacyForm::from_pairs([("ApplicationID", "5"), ("SetEnviType", "9")]);

        let err = service(&client)
            .hosts_by_property(&RequestContext::default(), &form)
            .await
            .unwrap_err();
        assert!(err.is_input_error());
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn test_application_failure_keeps_downstream_code() {
        let client = Canned::new(Ok(V3Result::failure(1101030, "no permission")));
        let form = LegacyForm::from_pairs([("ApplicationID", "5")]);

        let err = service(&client)
            .app_host_list(&RequestContext::default(), &form)
            .await
            .unwrap_err();
        assert_eq!(err.code(), 1101030);
        assert!(matches!(err, BridgeError::Application { .. }));
    }

    #[tokio::test]
    async fn test_transport_failure_is_not_an_application_failure() {
        let client = Canned::new(Err(TransportError::Request("connection refused".into())));
        let form = LegacyForm::from_pairs([("ApplicationID", "5")]);

        let err = service(&client)
            .app_host_list(&RequestContext::default(), &form)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::HttpDoRequestFailed.number());
    }

    #[tokio::test]
    async fn test_modules_by_app_uses_paging_defaults_and_keys_rows() {
        let client = Canned::new(Ok(V3Result::ok(json!({
            "count": 3,
            "info": [
                { "bk_module_id": 7, "bk_module_name": "idle" },
                { "bk_module_name": "broken" },
                { "bk_module_id": 9, "bk_module_name": "fault" }
            ]
        }))));
        let form = LegacyForm::from_pairs([("ApplicationID", "2")]);

        let data = service(&client)
            .modules_by_app(&RequestContext::default(), &form)
            .await
            .unwrap();
        assert_eq!(data.as_object().unwrap().len(), 2);
        assert_eq!(data["7"]["bk_module_name"], "idle");
        assert_eq!(data["9"]["bk_module_name"], "fault");

        let calls = client.calls();
        assert_eq!(calls[0].operation, V3Operation::SearchModuleByApp { app_id: 2 });
        assert_eq!(
            calls[0].query.get("page"),
            Some(&json!({ "start": 0, "limit": 0 }))
        );
    }

    #[tokio::test]
    async fn test_ip_and_proxy_passes_data_through() {
        let payload = json!({ "1.1.1.1": { "bk_host_id": 3 } });
        let client = Canned::new(Ok(V3Result::ok(payload.clone())));
        let form =
            LegacyForm::from_pairs([("appId", "3"), ("platId", "0"), ("ipList", "1.1.1.1")]);

        let data = service(&client)
            .ip_and_proxy_by_company(&RequestContext::default(), &form)
            .await
            .unwrap();
        assert_eq!(data, payload);
        assert_eq!(
            client.calls()[0].query.clone().into_value(),
            json!({ "ips": ["1.1.1.1"], "bk_biz_id": 3, "bk_cloud_id": 0 })
        );
    }

    #[test]
    fn test_operation_paths_are_unique() {
        let mut paths: Vec<_> = LegacyOperation::ALL.iter().map(|op| op.path()).collect();
        paths.sort();
        paths.dedup();
        assert_eq!(paths.len(), LegacyOperation::ALL.len());
    }
}
