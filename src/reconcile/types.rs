use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value as JsonValue};

use super::error::ReconcileError;
use crate::modules::csm::clients::{ClientError, RestMethod};

/// Identifies an object on the replication server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceRef {
    Name(String),
    Id(String),
    VolumeGroup(String),
}

impl ResourceRef {
    pub fn name(name: impl Into<String>) -> Self {
        ResourceRef::Name(name.into())
    }

    pub fn id(id: impl Into<String>) -> Self {
        ResourceRef::Id(id.into())
    }

    pub fn volume_group(key: impl Into<String>) -> Self {
        ResourceRef::VolumeGroup(key.into())
    }

    pub fn as_str(&self) -> &str {
        match self {
            ResourceRef::Name(v) | ResourceRef::Id(v) | ResourceRef::VolumeGroup(v) => v,
        }
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceRef::Name(v) => write!(f, "name '{}'", v),
            ResourceRef::Id(v) => write!(f, "id '{}'", v),
            ResourceRef::VolumeGroup(v) => write!(f, "volume group '{}'", v),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    Session,
    CopysetMembership,
    ScheduledTask,
    ActiveStandbyRole,
    SessionCommand,
    RawRequest,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceKind::Session => "session",
            ResourceKind::CopysetMembership => "copyset-membership",
            ResourceKind::ScheduledTask => "scheduled-task",
            ResourceKind::ActiveStandbyRole => "active-standby-role",
            ResourceKind::SessionCommand => "session-command",
            ResourceKind::RawRequest => "raw-request",
        };
        f.write_str(name)
    }
}

/// The single mutating call a reconcile issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateSession,
    CreateSessionByVolumeGroup,
    ModifySessionDescription,
    DeleteSession,
    AddCopysets,
    RemoveCopysets,
    RunTask,
    RunTaskAt,
    EnableTask,
    EnableTaskAt,
    DisableTask,
    SetServerAsStandby,
    Takeover,
    RemoveServer,
    RunSessionCommand,
    RunBackupCommand,
    RawRequest,
}

impl Operation {
    pub fn kind(self) -> ResourceKind {
        match self {
            Operation::CreateSession
            | Operation::CreateSessionByVolumeGroup
            | Operation::ModifySessionDescription
            | Operation::DeleteSession => ResourceKind::Session,
            Operation::AddCopysets | Operation::RemoveCopysets => ResourceKind::CopysetMembership,
            Operation::RunTask
            | Operation::RunTaskAt
            | Operation::EnableTask
            | Operation::EnableTaskAt
            | Operation::DisableTask => ResourceKind::ScheduledTask,
            Operation::SetServerAsStandby | Operation::Takeover | Operation::RemoveServer => {
                ResourceKind::ActiveStandbyRole
            }
            Operation::RunSessionCommand | Operation::RunBackupCommand => ResourceKind::SessionCommand,
            Operation::RawRequest => ResourceKind::RawRequest,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Operation::CreateSession => "create_session",
            Operation::CreateSessionByVolumeGroup => "create_session_by_volume_group",
            Operation::ModifySessionDescription => "modify_session_description",
            Operation::DeleteSession => "delete_session",
            Operation::AddCopysets => "add_copysets",
            Operation::RemoveCopysets => "remove_copysets",
            Operation::RunTask => "run_scheduled_task",
            Operation::RunTaskAt => "run_scheduled_task_at_time",
            Operation::EnableTask => "enable_scheduled_task",
            Operation::EnableTaskAt => "enable_scheduled_task_at_time",
            Operation::DisableTask => "disable_scheduled_task",
            Operation::SetServerAsStandby => "set_server_as_standby",
            Operation::Takeover => "takeover_standby_server",
            Operation::RemoveServer => "remove_active_or_standby_server",
            Operation::RunSessionCommand => "run_session_command",
            Operation::RunBackupCommand => "run_backup_command",
            Operation::RawRequest => "raw_request",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the caller wants the object to exist. `A` carries options that
/// only make sense for removal.
#[derive(Debug, Clone, PartialEq)]
pub enum DesiredState<P, A = ()> {
    Present(P),
    Absent(A),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSpec {
    pub session_type: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CopysetAddition {
    /// One entry per copy set, volumes listed in `role_order` order.
    pub copysets: Vec<Vec<String>>,
    pub role_order: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CopysetRemoval {
    /// The volume that identifies each copy set to remove.
    pub volumes: Vec<String>,
    /// Remove even if the hardware reports errors.
    pub force: bool,
    /// Leave the hardware relationship in place.
    pub keep_on_hardware: bool,
}

pub const TASK_TIME_FORMAT: &str = "%Y-%m-%dT%H-%M";

/// A deferred execution time in the server's `yyyy-MM-dd'T'HH-mm` form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TaskTime(String);

impl TaskTime {
    pub fn parse(value: &str) -> Result<Self, ReconcileError> {
        NaiveDateTime::parse_from_str(value, TASK_TIME_FORMAT).map_err(|e| {
            ReconcileError::Configuration(format!(
                "at_time '{}' does not match yyyy-MM-ddTHH-mm: {}",
                value, e
            ))
        })?;
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TaskTime {
    type Error = ReconcileError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        TaskTime::parse(&value)
    }
}

impl From<TaskTime> for String {
    fn from(time: TaskTime) -> Self {
        time.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TaskAction {
    /// `synchronous` asks the server to answer only once the run is over.
    Run { at_time: Option<TaskTime>, synchronous: bool },
    Enable { at_time: Option<TaskTime> },
    Disable,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RoleChange {
    SetServerAsStandby { peer: String },
    Takeover,
    Remove { peer: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct BackupTarget {
    pub role: String,
    pub backup_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionCommand {
    pub command: String,
    pub backup: Option<BackupTarget>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawRequest {
    pub method: RestMethod,
    pub path_resource: String,
    pub data: Option<Map<String, JsonValue>>,
    pub headers: Option<BTreeMap<String, String>>,
}

/// One reconcile invocation; the variant is the resource kind.
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileRequest {
    Session {
        target: ResourceRef,
        desired: DesiredState<SessionSpec>,
    },
    Copysets {
        session: ResourceRef,
        desired: DesiredState<CopysetAddition, CopysetRemoval>,
    },
    ScheduledTask {
        task: ResourceRef,
        action: TaskAction,
    },
    ActiveStandby(RoleChange),
    SessionCommand {
        session: ResourceRef,
        command: SessionCommand,
    },
    Raw(RawRequest),
}

impl ReconcileRequest {
    pub fn kind(&self) -> ResourceKind {
        match self {
            ReconcileRequest::Session { .. } => ResourceKind::Session,
            ReconcileRequest::Copysets { .. } => ResourceKind::CopysetMembership,
            ReconcileRequest::ScheduledTask { .. } => ResourceKind::ScheduledTask,
            ReconcileRequest::ActiveStandby(_) => ResourceKind::ActiveStandbyRole,
            ReconcileRequest::SessionCommand { .. } => ResourceKind::SessionCommand,
            ReconcileRequest::Raw(_) => ResourceKind::RawRequest,
        }
    }
}

/// A decoded server reply to a mutating call.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub message_code: String,
    pub message_text: String,
    pub payload: JsonValue,
}

impl ApiResponse {
    pub fn new(message_code: impl Into<String>, message_text: impl Into<String>) -> Self {
        let message_code = message_code.into();
        let message_text = message_text.into();
        let payload = serde_json::json!({
            "msg": message_code,
            "msgTranslated": message_text,
        });
        Self {
            message_code,
            message_text,
            payload,
        }
    }

    /// Requires a message code under `msg` or `messageCode`.
    pub fn from_json(payload: JsonValue) -> Result<Self, ClientError> {
        let message_code = string_field(&payload, &["msg", "messageCode"]).ok_or_else(|| {
            ClientError::Decode(format!("response carries no message code: {}", payload))
        })?;
        let message_text = string_field(&payload, &["msgTranslated", "messageTranslated"]).unwrap_or_default();

        Ok(Self {
            message_code,
            message_text,
            payload,
        })
    }

    /// For arbitrary resources that may not follow the message convention.
    pub fn lenient(payload: JsonValue) -> Self {
        let message_code = string_field(&payload, &["msg", "messageCode"]).unwrap_or_default();
        let message_text = string_field(&payload, &["msgTranslated", "messageTranslated"]).unwrap_or_default();
        Self {
            message_code,
            message_text,
            payload,
        }
    }
}

impl Serialize for ApiResponse {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.payload.serialize(serializer)
    }
}

fn string_field(payload: &JsonValue, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| payload.get(*key).and_then(JsonValue::as_str))
        .map(str::to_string)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    NoopAlreadySatisfied,
    NoopAlreadyAbsent,
    Failure { message: String },
}

impl Outcome {
    pub fn is_changed(&self) -> bool {
        matches!(self, Outcome::Success)
    }

    pub fn is_ok(&self) -> bool {
        !matches!(self, Outcome::Failure { .. })
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Success => f.write_str("success"),
            Outcome::NoopAlreadySatisfied => f.write_str("already in the desired state"),
            Outcome::NoopAlreadyAbsent => f.write_str("already absent"),
            Outcome::Failure { message } => write!(f, "failure: {}", message),
        }
    }
}

/// The result of one reconcile: the call issued, its reply and its
/// classification.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    pub operation: Operation,
    pub outcome: Outcome,
    pub response: ApiResponse,
}

impl Reconciliation {
    pub fn kind(&self) -> ResourceKind {
        self.operation.kind()
    }

    pub fn changed(&self) -> bool {
        self.outcome.is_changed()
    }

    pub fn ok(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Turns a `Failure` classification into `ReconcileError::RemoteOperation`.
    pub fn into_result(self) -> Result<Self, ReconcileError> {
        match &self.outcome {
            Outcome::Failure { message } => Err(ReconcileError::RemoteOperation {
                operation: self.operation,
                code: self.response.message_code.clone(),
                text: message.clone(),
                response: Box::new(self.response),
            }),
            _ => Ok(self),
        }
    }
}
