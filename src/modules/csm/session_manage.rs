use anyhow::Result;
use async_trait::async_trait;
use log::{info, warn};
use serde::Deserialize;

use super::State;
use crate::modules::csm::clients::CsmClients;
use crate::modules::{AutomationModule, ExecutionResult};
use crate::reconcile::{
    DesiredState, Operation, ReconcileError, ReconcileRequest, Reconciler, ResourceRef, SessionSpec,
};
use crate::utils::Duty;

/// Session types the server can create.
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum SessionType {
    ESESizer,
    FC,
    Snapshot,
    SGC,
    SGCSVC,
    SnapshotSVC,
    Migration,
    MMBasic,
    MM,
    MMPracticeOneSite,
    MMPracticeOneSiteSVC,
    MMCVSVC,
    GMBasic,
    GMBasicSVC,
    GM,
    GMSVC,
    GMPracticeOneSiteSVC,
    GMPracticeOneSite,
    GMPracticeTwoSite,
    GMCVSVC,
    GMTwoSite,
    GMTwoSiteWithSite3,
    MGM,
    // The server spells it this way.
    MGMPRacticeOneSite,
    #[serde(rename = "MT_MM_MM")]
    MtMmMm,
    #[serde(rename = "MT_MM_GM")]
    MtMmGm,
    #[serde(rename = "MT_MM_GMPractice")]
    MtMmGmPractice,
    #[serde(rename = "MT_MM_GM_Site3GM")]
    MtMmGmSite3Gm,
    #[serde(rename = "MT_MM_GM_4Site")]
    MtMmGm4Site,
    #[serde(rename = "MT_MM_MM_4Site")]
    MtMmMm4Site,
}

impl SessionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionType::ESESizer => "ESESizer",
            SessionType::FC => "FC",
            SessionType::Snapshot => "Snapshot",
            SessionType::SGC => "SGC",
            SessionType::SGCSVC => "SGCSVC",
            SessionType::SnapshotSVC => "SnapshotSVC",
            SessionType::Migration => "Migration",
            SessionType::MMBasic => "MMBasic",
            SessionType::MM => "MM",
            SessionType::MMPracticeOneSite => "MMPracticeOneSite",
            SessionType::MMPracticeOneSiteSVC => "MMPracticeOneSiteSVC",
            SessionType::MMCVSVC => "MMCVSVC",
            SessionType::GMBasic => "GMBasic",
            SessionType::GMBasicSVC => "GMBasicSVC",
            SessionType::GM => "GM",
            SessionType::GMSVC => "GMSVC",
            SessionType::GMPracticeOneSiteSVC => "GMPracticeOneSiteSVC",
            SessionType::GMPracticeOneSite => "GMPracticeOneSite",
            SessionType::GMPracticeTwoSite => "GMPracticeTwoSite",
            SessionType::GMCVSVC => "GMCVSVC",
            SessionType::GMTwoSite => "GMTwoSite",
            SessionType::GMTwoSiteWithSite3 => "GMTwoSiteWithSite3",
            SessionType::MGM => "MGM",
            SessionType::MGMPRacticeOneSite => "MGMPRacticeOneSite",
            SessionType::MtMmMm => "MT_MM_MM",
            SessionType::MtMmGm => "MT_MM_GM",
            SessionType::MtMmGmPractice => "MT_MM_GMPractice",
            SessionType::MtMmGmSite3Gm => "MT_MM_GM_Site3GM",
            SessionType::MtMmGm4Site => "MT_MM_GM_4Site",
            SessionType::MtMmMm4Site => "MT_MM_MM_4Site",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionManageParams {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub volume_group: Option<String>,
    #[serde(default, rename = "type")]
    pub session_type: Option<SessionType>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub state: State,
}

impl SessionManageParams {
    pub fn to_request(&self) -> Result<ReconcileRequest, ReconcileError> {
        let target = match (&self.name, &self.volume_group) {
            (Some(name), None) => ResourceRef::name(name),
            (None, Some(group)) => ResourceRef::volume_group(group),
            (Some(_), Some(_)) => {
                return Err(ReconcileError::Configuration(
                    "name and volume_group are mutually exclusive".to_string(),
                ))
            }
            (None, None) => {
                return Err(ReconcileError::Configuration(
                    "one of name or volume_group is required".to_string(),
                ))
            }
        };

        let desired = match self.state {
            State::Present => DesiredState::Present(SessionSpec {
                session_type: self.session_type.map(|t| t.as_str().to_string()),
                description: self.description.clone(),
            }),
            State::Absent if matches!(target, ResourceRef::VolumeGroup(_)) => {
                return Err(ReconcileError::Configuration(
                    "a session can only be deleted by name, not by volume_group".to_string(),
                ))
            }
            State::Absent => {
                if self.session_type.is_some() || self.description.is_some() {
                    warn!("type and description are ignored when deleting a session");
                }
                DesiredState::Absent(())
            }
        };

        Ok(ReconcileRequest::Session { target, desired })
    }
}

pub struct SessionManageModule;

impl SessionManageModule {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SessionManageModule {
    fn default() -> Self {
        Self::new()
    }
}

fn failure_context(operation: Operation, target: &str) -> String {
    match operation {
        Operation::DeleteSession => format!("Failed to delete session {}.", target),
        Operation::ModifySessionDescription => {
            format!("Failed to modify the description of session {}.", target)
        }
        _ => format!("Failed to create session {}.", target),
    }
}

#[async_trait]
impl AutomationModule for SessionManageModule {
    fn name(&self) -> &str {
        "session_manage"
    }

    fn supported_duty_types(&self) -> Vec<&str> {
        vec!["session_manage", "ibm_csm_session_manage"]
    }

    async fn validate(&self, duty: &Duty) -> Result<()> {
        let params: SessionManageParams = duty.parse_params()?;
        params.to_request()?;
        Ok(())
    }

    async fn apply(&self, clients: &CsmClients, duty: &Duty) -> Result<ExecutionResult> {
        let params: SessionManageParams = duty.parse_params()?;
        let request = params.to_request()?;

        let target = match &request {
            ReconcileRequest::Session { target, .. } => target.as_str().to_string(),
            _ => String::new(),
        };
        info!("Managing session {} (state={:?})", target, params.state);

        let reconciliation = Reconciler::new(clients).reconcile(&request).await?;
        let context = failure_context(reconciliation.operation, &target);
        Ok(ExecutionResult::from_reconciliation(reconciliation, &context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: serde_json::Value) -> SessionManageParams {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_session_type_wire_names() {
        let parsed: SessionType = serde_json::from_value(json!("MT_MM_GM_4Site")).unwrap();
        assert_eq!(parsed, SessionType::MtMmGm4Site);
        assert_eq!(parsed.as_str(), "MT_MM_GM_4Site");
        assert!(serde_json::from_value::<SessionType>(json!("Bogus")).is_err());
    }

    #[test]
    fn test_present_with_type_creates() {
        let request = params(json!({"name": "S1", "type": "Snapshot"})).to_request().unwrap();
        assert_eq!(
            request,
            ReconcileRequest::Session {
                target: ResourceRef::name("S1"),
                desired: DesiredState::Present(SessionSpec {
                    session_type: Some("Snapshot".to_string()),
                    description: None,
                }),
            }
        );
    }

    #[test]
    fn test_volume_group_target() {
        let request = params(json!({"volume_group": "SPECTRUM-VIRTUALIZE:VOLGROUP:FAB3:rg1", "type": "SnapshotSVC"}))
            .to_request()
            .unwrap();
        assert!(matches!(
            request,
            ReconcileRequest::Session {
                target: ResourceRef::VolumeGroup(_),
                ..
            }
        ));
    }

    #[test]
    fn test_name_and_volume_group_conflict() {
        let err = params(json!({"name": "S1", "volume_group": "vg"})).to_request().unwrap_err();
        assert!(matches!(err, ReconcileError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_volume_group_cannot_delete() {
        let err = params(json!({"volume_group": "vg", "state": "absent"}))
            .to_request()
            .unwrap_err();
        assert!(matches!(err, ReconcileError::Configuration(_)));

        let duty = Duty::new("d", "session_manage", json!({"volume_group": "vg", "state": "absent"}));
        assert!(SessionManageModule::new().validate(&duty).await.is_err());
    }

    #[test]
    fn test_missing_target() {
        let err = params(json!({"state": "absent"})).to_request().unwrap_err();
        assert!(matches!(err, ReconcileError::Configuration(_)));
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(serde_json::from_value::<SessionManageParams>(json!({"name": "S1", "colour": "red"})).is_err());
    }

    #[tokio::test]
    async fn test_validate_reports_bad_params() {
        let module = SessionManageModule::new();
        let duty = Duty::new("d", "session_manage", json!({"name": "S1", "state": "gone"}));
        assert!(module.validate(&duty).await.is_err());

        let duty = Duty::new("d", "session_manage", json!({"name": "S1", "state": "absent"}));
        assert!(module.validate(&duty).await.is_ok());
    }
}
