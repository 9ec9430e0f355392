use std::collections::BTreeMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::info;
use serde::Deserialize;
use serde_json::{Map, Value as JsonValue};

use crate::modules::csm::clients::{CsmClients, RestMethod};
use crate::modules::{AutomationModule, ExecutionResult};
use crate::reconcile::{RawRequest, ReconcileRequest, Reconciler};
use crate::utils::Duty;

/// Calls any resource under `/CSM/web/` that has no dedicated module.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RestCallParams {
    pub path_resource: String,
    #[serde(alias = "action")]
    pub method: RestMethod,
    #[serde(default)]
    pub data: Option<Map<String, JsonValue>>,
    #[serde(default)]
    pub headers: Option<BTreeMap<String, String>>,
}

impl RestCallParams {
    pub fn to_raw(&self) -> RawRequest {
        RawRequest {
            method: self.method,
            path_resource: self.path_resource.trim_start_matches('/').to_string(),
            data: self.data.clone(),
            headers: self.headers.clone(),
        }
    }
}

pub struct RestCallModule;

impl RestCallModule {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RestCallModule {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AutomationModule for RestCallModule {
    fn name(&self) -> &str {
        "rest_call"
    }

    fn supported_duty_types(&self) -> Vec<&str> {
        vec!["rest_call", "ibm_csm_run_any_rest_call"]
    }

    async fn validate(&self, duty: &Duty) -> Result<()> {
        let params: RestCallParams = duty.parse_params()?;
        if params.path_resource.trim_matches('/').is_empty() {
            anyhow::bail!("path_resource must name a resource");
        }
        Ok(())
    }

    async fn apply(&self, clients: &CsmClients, duty: &Duty) -> Result<ExecutionResult> {
        self.validate(duty).await?;
        let params: RestCallParams = duty.parse_params()?;
        let raw = params.to_raw();

        if !raw.method.is_mutating() {
            info!("GET {}", raw.path_resource);
            let body = clients
                .system
                .raw_request(raw.method, &raw.path_resource, raw.data.as_ref(), raw.headers.as_ref())
                .await
                .with_context(|| format!("Failed to get {}", raw.path_resource))?;
            return Ok(ExecutionResult::query(body));
        }

        let reconciliation = Reconciler::new(clients).reconcile(&ReconcileRequest::Raw(raw)).await?;
        let context = format!("Failed to {} {}.", params.method, params.path_resource);
        Ok(ExecutionResult::from_reconciliation(reconciliation, &context))
    }
}
