use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value as JsonValue;

use super::rest::RestClient;
use super::traits::{ClientResult, SessionOperations};
use crate::reconcile::ApiResponse;

const SESSIONS: &str = "sessions";
const SCHEDULED_TASKS: &str = "scheduledtasks";

pub struct SessionClient {
    rest: Arc<RestClient>,
}

impl SessionClient {
    pub fn new(rest: Arc<RestClient>) -> Self {
        Self { rest }
    }
}

fn with_description(mut form: Vec<(&'static str, String)>, description: Option<&str>) -> Vec<(&'static str, String)> {
    if let Some(description) = description {
        form.push(("description", description.to_string()));
    }
    form
}

/// `roleorder` is left out when empty so the server applies its default.
fn copyset_form(
    copysets: &[Vec<String>],
    role_order: &[String],
) -> ClientResult<Vec<(&'static str, String)>> {
    let mut form = vec![("copysets", serde_json::to_string(copysets)?)];
    if !role_order.is_empty() {
        form.push(("roleorder", serde_json::to_string(role_order)?));
    }
    Ok(form)
}

#[async_trait]
impl SessionOperations for SessionClient {
    async fn create_session(
        &self,
        name: &str,
        session_type: &str,
        description: Option<&str>,
    ) -> ClientResult<ApiResponse> {
        let form = with_description(vec![("type", session_type.to_string())], description);
        self.rest.command(Method::PUT, &[SESSIONS, name], &form).await
    }

    async fn create_session_by_volume_group(
        &self,
        volume_group: &str,
        session_type: &str,
        description: Option<&str>,
    ) -> ClientResult<ApiResponse> {
        let form = with_description(
            vec![
                ("volgroup", volume_group.to_string()),
                ("type", session_type.to_string()),
            ],
            description,
        );
        self.rest.command(Method::PUT, &[SESSIONS, "byvolgroup"], &form).await
    }

    async fn modify_session_description(&self, name: &str, description: &str) -> ClientResult<ApiResponse> {
        let form = [("description", description.to_string())];
        self.rest.command(Method::POST, &[SESSIONS, name, "description"], &form).await
    }

    async fn delete_session(&self, name: &str) -> ClientResult<ApiResponse> {
        self.rest.command(Method::DELETE, &[SESSIONS, name], &[]).await
    }

    async fn add_copysets(
        &self,
        name: &str,
        copysets: &[Vec<String>],
        role_order: &[String],
    ) -> ClientResult<ApiResponse> {
        let form = copyset_form(copysets, role_order)?;
        self.rest.command(Method::POST, &[SESSIONS, name, "copysets"], &form).await
    }

    async fn remove_copysets(
        &self,
        name: &str,
        volumes: &[String],
        force: bool,
        keep_on_hardware: bool,
    ) -> ClientResult<ApiResponse> {
        let form = [
            ("copysets", serde_json::to_string(volumes)?),
            ("force", force.to_string()),
            ("soft", keep_on_hardware.to_string()),
        ];
        self.rest.command(Method::DELETE, &[SESSIONS, name, "copysets"], &form).await
    }

    async fn run_session_command(&self, name: &str, command: &str) -> ClientResult<ApiResponse> {
        let form = [("cmd", command.to_string())];
        self.rest.command(Method::POST, &[SESSIONS, name], &form).await
    }

    async fn run_backup_command(
        &self,
        name: &str,
        role: &str,
        backup_id: &str,
        command: &str,
    ) -> ClientResult<ApiResponse> {
        let form = [("cmd", command.to_string())];
        self.rest
            .command(Method::POST, &[SESSIONS, name, "backups", role, backup_id], &form)
            .await
    }

    async fn run_scheduled_task(&self, id: &str, synchronous: bool) -> ClientResult<ApiResponse> {
        let form = [("synchronous", synchronous.to_string())];
        self.rest
            .command(Method::POST, &[SESSIONS, SCHEDULED_TASKS, id], &form)
            .await
    }

    async fn run_scheduled_task_at_time(&self, id: &str, at_time: &str) -> ClientResult<ApiResponse> {
        self.rest
            .command(Method::POST, &[SESSIONS, SCHEDULED_TASKS, id, at_time], &[])
            .await
    }

    async fn enable_scheduled_task(&self, id: &str) -> ClientResult<ApiResponse> {
        self.rest
            .command(Method::POST, &[SESSIONS, SCHEDULED_TASKS, "enable", id], &[])
            .await
    }

    async fn enable_scheduled_task_at_time(&self, id: &str, at_time: &str) -> ClientResult<ApiResponse> {
        self.rest
            .command(Method::POST, &[SESSIONS, SCHEDULED_TASKS, "enable", id, at_time], &[])
            .await
    }

    async fn disable_scheduled_task(&self, id: &str) -> ClientResult<ApiResponse> {
        self.rest
            .command(Method::POST, &[SESSIONS, SCHEDULED_TASKS, "disable", id], &[])
            .await
    }

    async fn get_session_overviews(&self) -> ClientResult<JsonValue> {
        self.rest.query(&[SESSIONS], &[]).await
    }

    async fn get_session_overviews_short(&self) -> ClientResult<JsonValue> {
        self.rest.query(&[SESSIONS, "short"], &[]).await
    }

    async fn get_session_info(&self, name: &str) -> ClientResult<JsonValue> {
        self.rest.query(&[SESSIONS, name], &[]).await
    }

    async fn get_available_commands(&self, name: &str) -> ClientResult<JsonValue> {
        self.rest.query(&[SESSIONS, name, "availablecommands"], &[]).await
    }

    async fn get_session_options(&self, name: &str) -> ClientResult<JsonValue> {
        self.rest.query(&[SESSIONS, name, "options"], &[]).await
    }

    async fn get_copysets(&self, name: &str) -> ClientResult<JsonValue> {
        self.rest.query(&[SESSIONS, name, "copysets"], &[]).await
    }

    async fn get_pair_info(&self, name: &str, rolepair: &str) -> ClientResult<JsonValue> {
        self.rest.query(&[SESSIONS, name, "pairs", rolepair], &[]).await
    }

    async fn get_rolepair_info(&self, name: &str, rolepair: &str) -> ClientResult<JsonValue> {
        self.rest.query(&[SESSIONS, name, "rolepair", rolepair], &[]).await
    }

    async fn get_backup_details(&self, name: &str, role: &str, backup_id: &str) -> ClientResult<JsonValue> {
        self.rest.query(&[SESSIONS, name, "backups", role, backup_id], &[]).await
    }

    async fn get_recovered_backups(&self, name: &str) -> ClientResult<JsonValue> {
        self.rest.query(&[SESSIONS, name, "recoveredbackups"], &[]).await
    }

    async fn get_recovered_backup_details(&self, name: &str, backup_id: &str) -> ClientResult<JsonValue> {
        self.rest
            .query(&[SESSIONS, name, "recoveredbackups", backup_id], &[])
            .await
    }

    async fn get_snapshot_details(&self, name: &str, role: &str, snapshot: &str) -> ClientResult<JsonValue> {
        self.rest.query(&[SESSIONS, name, "snapshots", role, snapshot], &[]).await
    }

    async fn get_snapshot_clones(&self, name: &str) -> ClientResult<JsonValue> {
        self.rest.query(&[SESSIONS, name, "snapshotclones"], &[]).await
    }

    async fn get_snapshot_clone_details(&self, name: &str, snapshot: &str) -> ClientResult<JsonValue> {
        self.rest.query(&[SESSIONS, name, "snapshotclones", snapshot], &[]).await
    }

    async fn get_scheduled_tasks(&self) -> ClientResult<JsonValue> {
        self.rest.query(&[SESSIONS, SCHEDULED_TASKS], &[]).await
    }
}
