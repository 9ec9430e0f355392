use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{Map, Value as JsonValue};

use super::rest::RestClient;
use super::traits::{ClientResult, RestMethod, SystemOperations};
use crate::reconcile::ApiResponse;

const SYSTEM: &str = "system";
const HA: &str = "ha";

pub struct SystemClient {
    rest: Arc<RestClient>,
}

impl SystemClient {
    pub fn new(rest: Arc<RestClient>) -> Self {
        Self { rest }
    }
}

#[async_trait]
impl SystemOperations for SystemClient {
    async fn set_server_as_standby(&self, peer: &str) -> ClientResult<ApiResponse> {
        let form = [("server", peer.to_string())];
        self.rest.command(Method::PUT, &[SYSTEM, HA, "standby"], &form).await
    }

    async fn takeover_standby_server(&self) -> ClientResult<ApiResponse> {
        self.rest.command(Method::POST, &[SYSTEM, HA, "takeover"], &[]).await
    }

    async fn remove_active_or_standby_server(&self, peer: &str) -> ClientResult<ApiResponse> {
        self.rest.command(Method::DELETE, &[SYSTEM, HA, peer], &[]).await
    }

    async fn get_active_standby_status(&self) -> ClientResult<JsonValue> {
        self.rest.query(&[SYSTEM, HA], &[]).await
    }

    async fn get_log_events(&self, count: Option<u32>, session: Option<&str>) -> ClientResult<JsonValue> {
        let mut params = Vec::new();
        if let Some(count) = count {
            params.push(("count", count.to_string()));
        }
        if let Some(session) = session {
            params.push(("session", session.to_string()));
        }
        self.rest.query(&[SYSTEM, "logevents"], &params).await
    }

    async fn get_log_packages(&self) -> ClientResult<JsonValue> {
        self.rest.query(&[SYSTEM, "logpackages"], &[]).await
    }

    async fn get_session_types(&self) -> ClientResult<JsonValue> {
        self.rest.query(&[SYSTEM, "sessiontypes"], &[]).await
    }

    async fn get_server_version(&self) -> ClientResult<JsonValue> {
        self.rest.query(&[SYSTEM, "version"], &[]).await
    }

    async fn get_volume_counts(&self) -> ClientResult<JsonValue> {
        self.rest.query(&[SYSTEM, "volumecounts"], &[]).await
    }

    async fn raw_request(
        &self,
        method: RestMethod,
        path_resource: &str,
        data: Option<&Map<String, JsonValue>>,
        headers: Option<&BTreeMap<String, String>>,
    ) -> ClientResult<JsonValue> {
        self.rest.raw(method, path_resource, data, headers).await
    }
}
