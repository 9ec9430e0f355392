//! Translates a desired state or action against one remote object into at
//! most one mutating call, then classifies the reply.
//!
//! Nothing is remembered between calls and nothing is retried here.

pub mod error;
pub mod policy;
pub mod types;

pub use error::ReconcileError;
pub use types::*;

use log::{info, warn};

use crate::modules::csm::clients::CsmClients;

pub type Result<T> = std::result::Result<T, ReconcileError>;

pub struct Reconciler<'a> {
    clients: &'a CsmClients,
}

impl<'a> Reconciler<'a> {
    pub fn new(clients: &'a CsmClients) -> Self {
        Self { clients }
    }

    pub async fn reconcile(&self, request: &ReconcileRequest) -> Result<Reconciliation> {
        match request {
            ReconcileRequest::Session { target, desired } => self.reconcile_session(target, desired).await,
            ReconcileRequest::Copysets { session, desired } => self.reconcile_copysets(session, desired).await,
            ReconcileRequest::ScheduledTask { task, action } => self.reconcile_scheduled_task(task, action).await,
            ReconcileRequest::ActiveStandby(change) => self.reconcile_active_standby(change).await,
            ReconcileRequest::SessionCommand { session, command } => {
                self.reconcile_session_command(session, command).await
            }
            ReconcileRequest::Raw(raw) => self.reconcile_raw(raw).await,
        }
    }

    /// Create, modify or delete a session.
    ///
    /// With a session name, `Present` creates when a type is given and
    /// otherwise updates the description; a volume group key can only
    /// create. Supplying neither type nor description fails before any call.
    pub async fn reconcile_session(
        &self,
        target: &ResourceRef,
        desired: &DesiredState<SessionSpec>,
    ) -> Result<Reconciliation> {
        let session = &self.clients.session;

        let (operation, response) = match (desired, target) {
            (DesiredState::Present(spec), ResourceRef::Name(name)) => {
                if let Some(session_type) = &spec.session_type {
                    info!("Creating session '{}' of type {}", name, session_type);
                    let response = session
                        .create_session(name, session_type, spec.description.as_deref())
                        .await?;
                    (Operation::CreateSession, response)
                } else if let Some(description) = &spec.description {
                    info!("Updating description of session '{}'", name);
                    let response = session.modify_session_description(name, description).await?;
                    (Operation::ModifySessionDescription, response)
                } else {
                    return Err(ReconcileError::Configuration(format!(
                        "Failed to create the session {} or modify the description. \
                         Type is required when creating the session and description \
                         is required when modifying the session.",
                        name
                    )));
                }
            }
            (DesiredState::Present(spec), ResourceRef::VolumeGroup(group)) => {
                let session_type = spec.session_type.as_deref().ok_or_else(|| {
                    ReconcileError::Configuration(format!(
                        "Type is required when creating a session from volume group {}",
                        group
                    ))
                })?;
                info!("Creating {} session from volume group '{}'", session_type, group);
                let response = session
                    .create_session_by_volume_group(group, session_type, spec.description.as_deref())
                    .await?;
                (Operation::CreateSessionByVolumeGroup, response)
            }
            (DesiredState::Absent(()), ResourceRef::Name(name)) => {
                info!("Deleting session '{}'", name);
                (Operation::DeleteSession, session.delete_session(name).await?)
            }
            (_, other) => {
                return Err(ReconcileError::Configuration(format!(
                    "a session cannot be {} by {}",
                    if matches!(desired, DesiredState::Present(_)) {
                        "created"
                    } else {
                        "deleted"
                    },
                    other
                )));
            }
        };

        Ok(settle(operation, response))
    }

    /// Add or remove copy sets. `force` and `keep_on_hardware` are passed to
    /// the server as-is and have no effect on classification.
    pub async fn reconcile_copysets(
        &self,
        session: &ResourceRef,
        desired: &DesiredState<CopysetAddition, CopysetRemoval>,
    ) -> Result<Reconciliation> {
        let name = require_name(session, "copy sets")?;

        let (operation, response) = match desired {
            DesiredState::Present(addition) => {
                validate_copysets(addition)?;
                info!(
                    "Adding {} copy sets to session '{}' with roles {:?}",
                    addition.copysets.len(),
                    name,
                    addition.role_order
                );
                let response = self
                    .clients
                    .session
                    .add_copysets(name, &addition.copysets, &addition.role_order)
                    .await?;
                (Operation::AddCopysets, response)
            }
            DesiredState::Absent(removal) => {
                if removal.volumes.is_empty() {
                    return Err(ReconcileError::Configuration(
                        "at least one copy set is required".to_string(),
                    ));
                }
                info!(
                    "Removing {} copy sets from session '{}' (force={}, keep_on_hardware={})",
                    removal.volumes.len(),
                    name,
                    removal.force,
                    removal.keep_on_hardware
                );
                let response = self
                    .clients
                    .session
                    .remove_copysets(name, &removal.volumes, removal.force, removal.keep_on_hardware)
                    .await?;
                (Operation::RemoveCopysets, response)
            }
        };

        Ok(settle(operation, response))
    }

    /// Run, enable or disable a scheduled task. A time selects the deferred
    /// variant of run and enable.
    pub async fn reconcile_scheduled_task(&self, task: &ResourceRef, action: &TaskAction) -> Result<Reconciliation> {
        let id = match task {
            ResourceRef::Id(id) | ResourceRef::Name(id) => id.as_str(),
            other => {
                return Err(ReconcileError::Configuration(format!(
                    "a scheduled task cannot be addressed by {}",
                    other
                )))
            }
        };
        let session = &self.clients.session;

        let (operation, response) = match action {
            TaskAction::Run {
                at_time: Some(at_time),
                ..
            } => {
                info!("Scheduling run of task {} at {}", id, at_time.as_str());
                (
                    Operation::RunTaskAt,
                    session.run_scheduled_task_at_time(id, at_time.as_str()).await?,
                )
            }
            TaskAction::Run {
                at_time: None,
                synchronous,
            } => {
                info!("Running task {} now (synchronous={})", id, synchronous);
                (Operation::RunTask, session.run_scheduled_task(id, *synchronous).await?)
            }
            TaskAction::Enable { at_time: Some(at_time) } => {
                info!("Enabling task {} at {}", id, at_time.as_str());
                (
                    Operation::EnableTaskAt,
                    session.enable_scheduled_task_at_time(id, at_time.as_str()).await?,
                )
            }
            TaskAction::Enable { at_time: None } => {
                info!("Enabling task {}", id);
                (Operation::EnableTask, session.enable_scheduled_task(id).await?)
            }
            TaskAction::Disable => {
                info!("Disabling task {}", id);
                (Operation::DisableTask, session.disable_scheduled_task(id).await?)
            }
        };

        Ok(settle(operation, response))
    }

    pub async fn reconcile_active_standby(&self, change: &RoleChange) -> Result<Reconciliation> {
        let system = &self.clients.system;

        let (operation, response) = match change {
            RoleChange::SetServerAsStandby { peer } => {
                info!("Setting this server as standby to '{}'", peer);
                (Operation::SetServerAsStandby, system.set_server_as_standby(peer).await?)
            }
            RoleChange::Takeover => {
                info!("Taking over as the active server");
                (Operation::Takeover, system.takeover_standby_server().await?)
            }
            RoleChange::Remove { peer } => {
                info!("Removing '{}' from the active/standby pair", peer);
                (
                    Operation::RemoveServer,
                    system.remove_active_or_standby_server(peer).await?,
                )
            }
        };

        Ok(settle(operation, response))
    }

    pub async fn reconcile_session_command(
        &self,
        session: &ResourceRef,
        command: &SessionCommand,
    ) -> Result<Reconciliation> {
        let name = require_name(session, "session commands")?;
        let client = &self.clients.session;

        let (operation, response) = match &command.backup {
            Some(backup) => {
                info!(
                    "Issuing '{}' to session '{}' for backup {} on role {}",
                    command.command, name, backup.backup_id, backup.role
                );
                let response = client
                    .run_backup_command(name, &backup.role, &backup.backup_id, &command.command)
                    .await?;
                (Operation::RunBackupCommand, response)
            }
            None => {
                info!("Issuing '{}' to session '{}'", command.command, name);
                (
                    Operation::RunSessionCommand,
                    client.run_session_command(name, &command.command).await?,
                )
            }
        };

        Ok(settle(operation, response))
    }

    /// Replies from arbitrary resources may lack a message code; those are
    /// taken as success.
    pub async fn reconcile_raw(&self, raw: &RawRequest) -> Result<Reconciliation> {
        info!("Sending raw {} to '{}'", raw.method, raw.path_resource);
        let body = self
            .clients
            .system
            .raw_request(raw.method, &raw.path_resource, raw.data.as_ref(), raw.headers.as_ref())
            .await?;

        Ok(settle(Operation::RawRequest, ApiResponse::lenient(body)))
    }
}

fn settle(operation: Operation, response: ApiResponse) -> Reconciliation {
    let outcome = policy::classify(operation, &response);

    match &outcome {
        Outcome::Failure { message } => {
            warn!("{} failed with {}: {}", operation, response.message_code, message)
        }
        Outcome::Success => info!("{} succeeded ({})", operation, response.message_code),
        noop => info!("{} left unchanged: {} ({})", operation, noop, response.message_code),
    }

    Reconciliation {
        operation,
        outcome,
        response,
    }
}

fn require_name<'r>(target: &'r ResourceRef, what: &str) -> Result<&'r str> {
    match target {
        ResourceRef::Name(name) => Ok(name),
        other => Err(ReconcileError::Configuration(format!(
            "{} need a session name, got {}",
            what, other
        ))),
    }
}

fn validate_copysets(addition: &CopysetAddition) -> Result<()> {
    if addition.copysets.is_empty() {
        return Err(ReconcileError::Configuration(
            "at least one copy set is required".to_string(),
        ));
    }

    if addition.role_order.is_empty() {
        return Ok(());
    }

    for copyset in &addition.copysets {
        if copyset.len() != addition.role_order.len() {
            return Err(ReconcileError::Configuration(format!(
                "copy set {:?} has {} volumes but role order {:?} names {} roles",
                copyset,
                copyset.len(),
                addition.role_order,
                addition.role_order.len()
            )));
        }
    }

    Ok(())
}
