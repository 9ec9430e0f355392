use anyhow::Result;
use async_trait::async_trait;
use log::{info, warn};
use serde::Deserialize;

use crate::modules::csm::clients::CsmClients;
use crate::modules::{AutomationModule, ExecutionResult};
use crate::reconcile::{ReconcileError, ReconcileRequest, Reconciler, RoleChange};
use crate::utils::Duty;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StandbyAction {
    SetServerAsStandby,
    Takeover,
    Remove,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActiveStandbyParams {
    /// The peer server.
    #[serde(default)]
    pub csm_server: Option<String>,
    pub action: StandbyAction,
}

impl ActiveStandbyParams {
    pub fn to_request(&self) -> Result<ReconcileRequest, ReconcileError> {
        let peer = || {
            self.csm_server.clone().ok_or_else(|| {
                ReconcileError::Configuration(format!("csm_server is required for {:?}", self.action))
            })
        };

        let change = match self.action {
            StandbyAction::SetServerAsStandby => RoleChange::SetServerAsStandby { peer: peer()? },
            StandbyAction::Remove => RoleChange::Remove { peer: peer()? },
            StandbyAction::Takeover => {
                if let Some(server) = &self.csm_server {
                    warn!("csm_server '{}' is ignored for takeover", server);
                }
                RoleChange::Takeover
            }
        };

        Ok(ReconcileRequest::ActiveStandby(change))
    }
}

pub struct ActiveStandbyActionModule;

impl ActiveStandbyActionModule {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ActiveStandbyActionModule {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AutomationModule for ActiveStandbyActionModule {
    fn name(&self) -> &str {
        "active_standby_action"
    }

    fn supported_duty_types(&self) -> Vec<&str> {
        vec!["active_standby_action", "ibm_csm_active_standby_action"]
    }

    async fn validate(&self, duty: &Duty) -> Result<()> {
        let params: ActiveStandbyParams = duty.parse_params()?;
        params.to_request()?;
        Ok(())
    }

    async fn apply(&self, clients: &CsmClients, duty: &Duty) -> Result<ExecutionResult> {
        let params: ActiveStandbyParams = duty.parse_params()?;
        let request = params.to_request()?;
        info!("Active/standby action {:?}", params.action);

        let reconciliation = Reconciler::new(clients).reconcile(&request).await?;
        Ok(ExecutionResult::from_reconciliation(
            reconciliation,
            "Failed the active/standby command.",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: serde_json::Value) -> ActiveStandbyParams {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_set_standby_needs_peer() {
        let err = params(json!({"action": "set_server_as_standby"})).to_request().unwrap_err();
        assert!(matches!(err, ReconcileError::Configuration(_)));

        let request = params(json!({"action": "set_server_as_standby", "csm_server": "serverA"}))
            .to_request()
            .unwrap();
        assert_eq!(
            request,
            ReconcileRequest::ActiveStandby(RoleChange::SetServerAsStandby {
                peer: "serverA".to_string()
            })
        );
    }

    #[test]
    fn test_takeover_without_peer() {
        let request = params(json!({"action": "takeover"})).to_request().unwrap();
        assert_eq!(request, ReconcileRequest::ActiveStandby(RoleChange::Takeover));
    }

    #[test]
    fn test_remove_needs_peer() {
        assert!(params(json!({"action": "remove"})).to_request().is_err());
    }
}
