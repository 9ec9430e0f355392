use anyhow::Result;
use async_trait::async_trait;
use log::info;
use serde::Deserialize;
use serde_json::Value as JsonValue;

use super::{parse_literal, ListParam, State};
use crate::modules::csm::clients::CsmClients;
use crate::modules::{AutomationModule, ExecutionResult};
use crate::reconcile::{
    CopysetAddition, CopysetRemoval, DesiredState, ReconcileError, ReconcileRequest, Reconciler, ResourceRef,
};
use crate::utils::Duty;

/// Copy sets as supplied by the user: one list of volumes per copy set, a
/// flat list of volumes, or either of those written as a literal string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum CopysetsParam {
    Nested(Vec<Vec<String>>),
    Flat(Vec<String>),
    Literal(String),
}

enum Volumes {
    Nested(Vec<Vec<String>>),
    Flat(Vec<String>),
}

impl CopysetsParam {
    fn resolve(self) -> Result<Volumes> {
        match self {
            CopysetsParam::Nested(sets) => Ok(Volumes::Nested(sets)),
            CopysetsParam::Flat(volumes) => Ok(Volumes::Flat(volumes)),
            CopysetsParam::Literal(literal) => {
                let value: JsonValue = parse_literal(&literal)?;
                match serde_json::from_value(value) {
                    Ok(CopysetsParam::Nested(sets)) => Ok(Volumes::Nested(sets)),
                    Ok(CopysetsParam::Flat(volumes)) => Ok(Volumes::Flat(volumes)),
                    _ => anyhow::bail!("'{}' is not a list of volumes", literal),
                }
            }
        }
    }

    /// For additions a flat list is a single copy set.
    pub fn into_copysets(self) -> Result<Vec<Vec<String>>> {
        match self.resolve()? {
            Volumes::Nested(sets) => Ok(sets),
            Volumes::Flat(volumes) if volumes.is_empty() => Ok(Vec::new()),
            Volumes::Flat(volumes) => Ok(vec![volumes]),
        }
    }

    /// For removals each copy set is named by one of its volumes.
    pub fn into_volumes(self) -> Result<Vec<String>> {
        match self.resolve()? {
            Volumes::Flat(volumes) => Ok(volumes),
            Volumes::Nested(_) => Err(ReconcileError::Configuration(
                "copy sets to remove are given as a flat list of volumes, one per copy set".to_string(),
            )
            .into()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CopysetManageParams {
    pub name: String,
    #[serde(default)]
    pub state: State,
    #[serde(default)]
    pub copysets: Option<CopysetsParam>,
    #[serde(default)]
    pub role_order: Option<ListParam<Vec<String>>>,
    #[serde(default)]
    pub force: bool,
    #[serde(default, alias = "keeponhw")]
    pub keep_on_hardware: bool,
}

impl CopysetManageParams {
    pub fn to_request(&self) -> Result<ReconcileRequest> {
        let copysets = self.copysets.clone().ok_or_else(|| {
            ReconcileError::Configuration(format!("copysets are required to manage copy sets of {}", self.name))
        })?;

        let desired = match self.state {
            State::Present => {
                let role_order = match self.role_order.clone() {
                    Some(order) => order.into_list()?,
                    None => Vec::new(),
                };
                DesiredState::Present(CopysetAddition {
                    copysets: copysets.into_copysets()?,
                    role_order,
                })
            }
            State::Absent => DesiredState::Absent(CopysetRemoval {
                volumes: copysets.into_volumes()?,
                force: self.force,
                keep_on_hardware: self.keep_on_hardware,
            }),
        };

        Ok(ReconcileRequest::Copysets {
            session: ResourceRef::name(&self.name),
            desired,
        })
    }
}

pub struct CopysetManageModule;

impl CopysetManageModule {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CopysetManageModule {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AutomationModule for CopysetManageModule {
    fn name(&self) -> &str {
        "copyset_manage"
    }

    fn supported_duty_types(&self) -> Vec<&str> {
        vec!["copyset_manage", "ibm_csm_copyset_manage"]
    }

    async fn validate(&self, duty: &Duty) -> Result<()> {
        let params: CopysetManageParams = duty.parse_params()?;
        params.to_request()?;
        Ok(())
    }

    async fn apply(&self, clients: &CsmClients, duty: &Duty) -> Result<ExecutionResult> {
        let params: CopysetManageParams = duty.parse_params()?;
        let request = params.to_request()?;
        info!("Managing copy sets of session {} (state={:?})", params.name, params.state);

        let reconciliation = Reconciler::new(clients).reconcile(&request).await?;
        let context = match params.state {
            State::Present => format!("Failed to create the copy sets in session {}.", params.name),
            State::Absent => format!("Failed to delete the copy sets from session {}.", params.name),
        };
        Ok(ExecutionResult::from_reconciliation(reconciliation, &context))
    }
}
