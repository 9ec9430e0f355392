use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use super::ClientError;
use crate::reconcile::ApiResponse;

pub type ClientResult<T> = std::result::Result<T, ClientError>;

/// HTTP verbs accepted by the raw REST passthrough.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RestMethod {
    Get,
    Put,
    Post,
    Delete,
}

impl RestMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            RestMethod::Get => "get",
            RestMethod::Put => "put",
            RestMethod::Post => "post",
            RestMethod::Delete => "delete",
        }
    }

    pub fn is_mutating(&self) -> bool {
        !matches!(self, RestMethod::Get)
    }
}

impl std::fmt::Display for RestMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sessions, copysets, session commands and scheduled tasks.
#[async_trait]
pub trait SessionOperations: Send + Sync {
    async fn create_session(
        &self,
        name: &str,
        session_type: &str,
        description: Option<&str>,
    ) -> ClientResult<ApiResponse>;
    async fn create_session_by_volume_group(
        &self,
        volume_group: &str,
        session_type: &str,
        description: Option<&str>,
    ) -> ClientResult<ApiResponse>;
    async fn modify_session_description(&self, name: &str, description: &str) -> ClientResult<ApiResponse>;
    async fn delete_session(&self, name: &str) -> ClientResult<ApiResponse>;

    async fn add_copysets(
        &self,
        name: &str,
        copysets: &[Vec<String>],
        role_order: &[String],
    ) -> ClientResult<ApiResponse>;
    async fn remove_copysets(
        &self,
        name: &str,
        volumes: &[String],
        force: bool,
        keep_on_hardware: bool,
    ) -> ClientResult<ApiResponse>;

    async fn run_session_command(&self, name: &str, command: &str) -> ClientResult<ApiResponse>;
    async fn run_backup_command(
        &self,
        name: &str,
        role: &str,
        backup_id: &str,
        command: &str,
    ) -> ClientResult<ApiResponse>;

    async fn run_scheduled_task(&self, id: &str, synchronous: bool) -> ClientResult<ApiResponse>;
    async fn run_scheduled_task_at_time(&self, id: &str, at_time: &str) -> ClientResult<ApiResponse>;
    async fn enable_scheduled_task(&self, id: &str) -> ClientResult<ApiResponse>;
    async fn enable_scheduled_task_at_time(&self, id: &str, at_time: &str) -> ClientResult<ApiResponse>;
    async fn disable_scheduled_task(&self, id: &str) -> ClientResult<ApiResponse>;

    async fn get_session_overviews(&self) -> ClientResult<JsonValue>;
    async fn get_session_overviews_short(&self) -> ClientResult<JsonValue>;
    async fn get_session_info(&self, name: &str) -> ClientResult<JsonValue>;
    async fn get_available_commands(&self, name: &str) -> ClientResult<JsonValue>;
    async fn get_session_options(&self, name: &str) -> ClientResult<JsonValue>;
    async fn get_copysets(&self, name: &str) -> ClientResult<JsonValue>;
    async fn get_pair_info(&self, name: &str, rolepair: &str) -> ClientResult<JsonValue>;
    async fn get_rolepair_info(&self, name: &str, rolepair: &str) -> ClientResult<JsonValue>;
    async fn get_backup_details(&self, name: &str, role: &str, backup_id: &str) -> ClientResult<JsonValue>;
    async fn get_recovered_backups(&self, name: &str) -> ClientResult<JsonValue>;
    async fn get_recovered_backup_details(&self, name: &str, backup_id: &str) -> ClientResult<JsonValue>;
    async fn get_snapshot_details(&self, name: &str, role: &str, snapshot: &str) -> ClientResult<JsonValue>;
    async fn get_snapshot_clones(&self, name: &str) -> ClientResult<JsonValue>;
    async fn get_snapshot_clone_details(&self, name: &str, snapshot: &str) -> ClientResult<JsonValue>;
    async fn get_scheduled_tasks(&self) -> ClientResult<JsonValue>;
}

/// Storage systems, logical paths, hosts and volumes.
#[async_trait]
pub trait HardwareOperations: Send + Sync {
    async fn get_devices(&self, device_type: &str) -> ClientResult<JsonValue>;
    async fn get_paths(&self) -> ClientResult<JsonValue>;
    async fn get_paths_on_storage_system(&self, system_id: &str) -> ClientResult<JsonValue>;
    async fn get_svc_hosts(&self, device_id: &str) -> ClientResult<JsonValue>;
    async fn get_volumes(&self, system_name: &str) -> ClientResult<JsonValue>;
    async fn get_volumes_by_wwn(&self, wwn: &str) -> ClientResult<JsonValue>;
}

/// Server-level state: active/standby topology, logs, versions, and an
/// escape hatch for arbitrary REST resources.
#[async_trait]
pub trait SystemOperations: Send + Sync {
    async fn set_server_as_standby(&self, peer: &str) -> ClientResult<ApiResponse>;
    async fn takeover_standby_server(&self) -> ClientResult<ApiResponse>;
    async fn remove_active_or_standby_server(&self, peer: &str) -> ClientResult<ApiResponse>;

    async fn get_active_standby_status(&self) -> ClientResult<JsonValue>;
    async fn get_log_events(&self, count: Option<u32>, session: Option<&str>) -> ClientResult<JsonValue>;
    async fn get_log_packages(&self) -> ClientResult<JsonValue>;
    async fn get_session_types(&self) -> ClientResult<JsonValue>;
    async fn get_server_version(&self) -> ClientResult<JsonValue>;
    async fn get_volume_counts(&self) -> ClientResult<JsonValue>;

    async fn raw_request(
        &self,
        method: RestMethod,
        path_resource: &str,
        data: Option<&Map<String, JsonValue>>,
        headers: Option<&BTreeMap<String, String>>,
    ) -> ClientResult<JsonValue>;
}
