use anyhow::Result;
use async_trait::async_trait;
use log::info;
use serde::Deserialize;

use super::string_or_number;
use crate::modules::csm::clients::CsmClients;
use crate::modules::{AutomationModule, ExecutionResult};
use crate::reconcile::{BackupTarget, ReconcileRequest, Reconciler, ResourceRef, SessionCommand};
use crate::utils::Duty;

pub const DEFAULT_BACKUP_ROLE: &str = "H1";

/// Issues a named command, e.g. `Start H1->H2` or `Recover Backup`, to a
/// session.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionActionParams {
    pub name: String,
    pub command: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub backup_id: Option<String>,
    /// Role holding the backup.
    #[serde(default)]
    pub role: Option<String>,
}

impl SessionActionParams {
    pub fn to_request(&self) -> ReconcileRequest {
        let backup = self.backup_id.as_ref().map(|backup_id| BackupTarget {
            role: self.role.clone().unwrap_or_else(|| DEFAULT_BACKUP_ROLE.to_string()),
            backup_id: backup_id.clone(),
        });

        ReconcileRequest::SessionCommand {
            session: ResourceRef::name(&self.name),
            command: SessionCommand {
                command: self.command.clone(),
                backup,
            },
        }
    }
}

pub struct SessionActionModule;

impl SessionActionModule {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SessionActionModule {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AutomationModule for SessionActionModule {
    fn name(&self) -> &str {
        "session_action"
    }

    fn supported_duty_types(&self) -> Vec<&str> {
        vec!["session_action", "ibm_csm_session_action"]
    }

    async fn validate(&self, duty: &Duty) -> Result<()> {
        let params: SessionActionParams = duty.parse_params()?;
        if params.command.trim().is_empty() {
            anyhow::bail!("command must not be empty");
        }
        Ok(())
    }

    async fn apply(&self, clients: &CsmClients, duty: &Duty) -> Result<ExecutionResult> {
        self.validate(duty).await?;
        let params: SessionActionParams = duty.parse_params()?;
        info!("Issuing '{}' to session {}", params.command, params.name);

        let reconciliation = Reconciler::new(clients).reconcile(&params.to_request()).await?;
        Ok(ExecutionResult::from_reconciliation(reconciliation, "Failed the session command."))
    }
}
