use anyhow::Result;
use async_trait::async_trait;
use log::{info, warn};
use serde::Deserialize;

use super::string_or_number;
use crate::modules::csm::clients::CsmClients;
use crate::modules::{AutomationModule, ExecutionResult};
use crate::reconcile::{ReconcileError, ReconcileRequest, Reconciler, ResourceRef, TaskAction, TaskTime};
use crate::utils::Duty;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskCommand {
    Run,
    Enable,
    Disable,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScheduledTaskParams {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: Option<String>,
    pub action: TaskCommand,
    #[serde(default)]
    pub synchronous: bool,
    /// `yyyy-MM-dd'T'HH-mm`
    #[serde(default)]
    pub at_time: Option<String>,
}

impl ScheduledTaskParams {
    pub fn to_request(&self) -> Result<ReconcileRequest, ReconcileError> {
        let id = self
            .id
            .as_deref()
            .ok_or_else(|| ReconcileError::Configuration("id of the scheduled task is required".to_string()))?;
        let at_time = self.at_time.as_deref().map(TaskTime::parse).transpose()?;

        let action = match self.action {
            TaskCommand::Run => {
                if self.synchronous && at_time.is_some() {
                    warn!("synchronous has no effect when the task is run at a given time");
                }
                TaskAction::Run {
                    at_time,
                    synchronous: self.synchronous,
                }
            }
            TaskCommand::Enable => TaskAction::Enable { at_time },
            TaskCommand::Disable => {
                if at_time.is_some() {
                    return Err(ReconcileError::Configuration(
                        "at_time is not supported when disabling a task".to_string(),
                    ));
                }
                TaskAction::Disable
            }
        };

        Ok(ReconcileRequest::ScheduledTask {
            task: ResourceRef::id(id),
            action,
        })
    }
}

pub struct ScheduledTaskActionModule;

impl ScheduledTaskActionModule {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ScheduledTaskActionModule {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AutomationModule for ScheduledTaskActionModule {
    fn name(&self) -> &str {
        "scheduled_task_action"
    }

    fn supported_duty_types(&self) -> Vec<&str> {
        vec!["scheduled_task_action", "ibm_csm_scheduled_task_action"]
    }

    async fn validate(&self, duty: &Duty) -> Result<()> {
        let params: ScheduledTaskParams = duty.parse_params()?;
        params.to_request()?;
        Ok(())
    }

    async fn apply(&self, clients: &CsmClients, duty: &Duty) -> Result<ExecutionResult> {
        let params: ScheduledTaskParams = duty.parse_params()?;
        let request = params.to_request()?;
        info!("Scheduled task action {:?} on task {:?}", params.action, params.id);

        let reconciliation = Reconciler::new(clients).reconcile(&request).await?;
        let context = format!(
            "Failed to {:?} scheduled task {}.",
            params.action,
            params.id.as_deref().unwrap_or_default()
        )
        .to_lowercase();
        Ok(ExecutionResult::from_reconciliation(reconciliation, &context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(value: serde_json::Value) -> Result<ReconcileRequest, ReconcileError> {
        let params: ScheduledTaskParams = serde_json::from_value(value).unwrap();
        params.to_request()
    }

    #[test]
    fn test_run_at_time() {
        let request = request(json!({"id": 7, "action": "run", "at_time": "2022-08-09T17-15"})).unwrap();
        assert_eq!(
            request,
            ReconcileRequest::ScheduledTask {
                task: ResourceRef::id("7"),
                action: TaskAction::Run {
                    at_time: Some(TaskTime::parse("2022-08-09T17-15").unwrap()),
                    synchronous: false,
                },
            }
        );
    }

    #[test]
    fn test_bad_time_is_configuration_error() {
        let err = request(json!({"id": "7", "action": "enable", "at_time": "2022-08-09 17:15"})).unwrap_err();
        assert!(matches!(err, ReconcileError::Configuration(_)));
    }

    #[test]
    fn test_disable_rejects_time() {
        let err = request(json!({"id": "2", "action": "disable", "at_time": "2022-08-09T17-15"})).unwrap_err();
        assert!(matches!(err, ReconcileError::Configuration(_)));
    }

    #[test]
    fn test_id_required() {
        let err = request(json!({"action": "disable"})).unwrap_err();
        assert!(err.to_string().contains("id"));
    }

    #[test]
    fn test_unknown_action() {
        assert!(serde_json::from_value::<ScheduledTaskParams>(json!({"id": 1, "action": "pause"})).is_err());
    }
}
