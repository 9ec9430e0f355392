#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Map, Value as JsonValue};

use csmctl::modules::csm::clients::{
    ClientError, ClientResult, CsmClients, HardwareOperations, RestMethod, SessionOperations, SystemOperations,
};
use csmctl::reconcile::ApiResponse;

pub const OK_CODE: &str = "IWNR1000I";

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub method: &'static str,
    pub args: Vec<String>,
}

/// In-memory server: records every call and answers mutations from a
/// script, falling back to an informational reply.
#[derive(Default)]
pub struct MockCsm {
    calls: Mutex<Vec<Call>>,
    replies: Mutex<VecDeque<ClientResult<ApiResponse>>>,
    queries: Mutex<HashMap<&'static str, JsonValue>>,
    raw_bodies: Mutex<VecDeque<JsonValue>>,
}

impl MockCsm {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn clients(self: &Arc<Self>) -> CsmClients {
        CsmClients::new(self.clone(), self.clone(), self.clone())
    }

    pub fn reply(&self, code: &str, text: &str) {
        self.replies.lock().unwrap().push_back(Ok(ApiResponse::new(code, text)));
    }

    pub fn fail_transport(&self, reason: &str) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Err(ClientError::Decode(reason.to_string())));
    }

    pub fn answer_query(&self, method: &'static str, value: JsonValue) {
        self.queries.lock().unwrap().insert(method, value);
    }

    pub fn raw_body(&self, body: JsonValue) {
        self.raw_bodies.lock().unwrap().push_back(body);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn methods(&self) -> Vec<&'static str> {
        self.calls().into_iter().map(|c| c.method).collect()
    }

    fn record(&self, method: &'static str, args: &[&str]) {
        self.calls.lock().unwrap().push(Call {
            method,
            args: args.iter().map(|a| a.to_string()).collect(),
        });
    }

    fn mutate(&self, method: &'static str, args: &[&str]) -> ClientResult<ApiResponse> {
        self.record(method, args);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(ApiResponse::new(OK_CODE, format!("{} completed", method))))
    }

    fn query(&self, method: &'static str, args: &[&str]) -> ClientResult<JsonValue> {
        self.record(method, args);
        Ok(self
            .queries
            .lock()
            .unwrap()
            .get(method)
            .cloned()
            .unwrap_or_else(|| json!({"query": method, "args": args})))
    }
}

fn opt(value: Option<&str>) -> &str {
    value.unwrap_or("None")
}

fn flag(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

#[async_trait]
impl SessionOperations for MockCsm {
    async fn create_session(
        &self,
        name: &str,
        session_type: &str,
        description: Option<&str>,
    ) -> ClientResult<ApiResponse> {
        self.mutate("create_session", &[name, session_type, opt(description)])
    }

    async fn create_session_by_volume_group(
        &self,
        volume_group: &str,
        session_type: &str,
        description: Option<&str>,
    ) -> ClientResult<ApiResponse> {
        self.mutate(
            "create_session_by_volume_group",
            &[volume_group, session_type, opt(description)],
        )
    }

    async fn modify_session_description(&self, name: &str, description: &str) -> ClientResult<ApiResponse> {
        self.mutate("modify_session_description", &[name, description])
    }

    async fn delete_session(&self, name: &str) -> ClientResult<ApiResponse> {
        self.mutate("delete_session", &[name])
    }

    async fn add_copysets(
        &self,
        name: &str,
        copysets: &[Vec<String>],
        role_order: &[String],
    ) -> ClientResult<ApiResponse> {
        let copysets = serde_json::to_string(copysets).unwrap();
        let role_order = serde_json::to_string(role_order).unwrap();
        self.mutate("add_copysets", &[name, &copysets, &role_order])
    }

    async fn remove_copysets(
        &self,
        name: &str,
        volumes: &[String],
        force: bool,
        keep_on_hardware: bool,
    ) -> ClientResult<ApiResponse> {
        let volumes = serde_json::to_string(volumes).unwrap();
        self.mutate(
            "remove_copysets",
            &[name, &volumes, flag(force), flag(keep_on_hardware)],
        )
    }

    async fn run_session_command(&self, name: &str, command: &str) -> ClientResult<ApiResponse> {
        self.mutate("run_session_command", &[name, command])
    }

    async fn run_backup_command(
        &self,
        name: &str,
        role: &str,
        backup_id: &str,
        command: &str,
    ) -> ClientResult<ApiResponse> {
        self.mutate("run_backup_command", &[name, role, backup_id, command])
    }

    async fn run_scheduled_task(&self, id: &str, synchronous: bool) -> ClientResult<ApiResponse> {
        self.mutate("run_scheduled_task", &[id, flag(synchronous)])
    }

    async fn run_scheduled_task_at_time(&self, id: &str, at_time: &str) -> ClientResult<ApiResponse> {
        self.mutate("run_scheduled_task_at_time", &[id, at_time])
    }

    async fn enable_scheduled_task(&self, id: &str) -> ClientResult<ApiResponse> {
        self.mutate("enable_scheduled_task", &[id])
    }

    async fn enable_scheduled_task_at_time(&self, id: &str, at_time: &str) -> ClientResult<ApiResponse> {
        self.mutate("enable_scheduled_task_at_time", &[id, at_time])
    }

    async fn disable_scheduled_task(&self, id: &str) -> ClientResult<ApiResponse> {
        self.mutate("disable_scheduled_task", &[id])
    }

    async fn get_session_overviews(&self) -> ClientResult<JsonValue> {
        self.query("get_session_overviews", &[])
    }

    async fn get_session_overviews_short(&self) -> ClientResult<JsonValue> {
        self.query("get_session_overviews_short", &[])
    }

    async fn get_session_info(&self, name: &str) -> ClientResult<JsonValue> {
        self.query("get_session_info", &[name])
    }

    async fn get_available_commands(&self, name: &str) -> ClientResult<JsonValue> {
        self.query("get_available_commands", &[name])
    }

    async fn get_session_options(&self, name: &str) -> ClientResult<JsonValue> {
        self.query("get_session_options", &[name])
    }

    async fn get_copysets(&self, name: &str) -> ClientResult<JsonValue> {
        self.query("get_copysets", &[name])
    }

    async fn get_pair_info(&self, name: &str, rolepair: &str) -> ClientResult<JsonValue> {
        self.query("get_pair_info", &[name, rolepair])
    }

    async fn get_rolepair_info(&self, name: &str, rolepair: &str) -> ClientResult<JsonValue> {
        self.query("get_rolepair_info", &[name, rolepair])
    }

    async fn get_backup_details(&self, name: &str, role: &str, backup_id: &str) -> ClientResult<JsonValue> {
        self.query("get_backup_details", &[name, role, backup_id])
    }

    async fn get_recovered_backups(&self, name: &str) -> ClientResult<JsonValue> {
        self.query("get_recovered_backups", &[name])
    }

    async fn get_recovered_backup_details(&self, name: &str, backup_id: &str) -> ClientResult<JsonValue> {
        self.query("get_recovered_backup_details", &[name, backup_id])
    }

    async fn get_snapshot_details(&self, name: &str, role: &str, snapshot: &str) -> ClientResult<JsonValue> {
        self.query("get_snapshot_details", &[name, role, snapshot])
    }

    async fn get_snapshot_clones(&self, name: &str) -> ClientResult<JsonValue> {
        self.query("get_snapshot_clones", &[name])
    }

    async fn get_snapshot_clone_details(&self, name: &str, snapshot: &str) -> ClientResult<JsonValue> {
        self.query("get_snapshot_clone_details", &[name, snapshot])
    }

    async fn get_scheduled_tasks(&self) -> ClientResult<JsonValue> {
        self.query("get_scheduled_tasks", &[])
    }
}

#[async_trait]
impl HardwareOperations for MockCsm {
    async fn get_devices(&self, device_type: &str) -> ClientResult<JsonValue> {
        self.query("get_devices", &[device_type])
    }

    async fn get_paths(&self) -> ClientResult<JsonValue> {
        self.query("get_paths", &[])
    }

    async fn get_paths_on_storage_system(&self, system_id: &str) -> ClientResult<JsonValue> {
        self.query("get_paths_on_storage_system", &[system_id])
    }

    async fn get_svc_hosts(&self, device_id: &str) -> ClientResult<JsonValue> {
        self.query("get_svc_hosts", &[device_id])
    }

    async fn get_volumes(&self, system_name: &str) -> ClientResult<JsonValue> {
        self.query("get_volumes", &[system_name])
    }

    async fn get_volumes_by_wwn(&self, wwn: &str) -> ClientResult<JsonValue> {
        self.query("get_volumes_by_wwn", &[wwn])
    }
}

#[async_trait]
impl SystemOperations for MockCsm {
    async fn set_server_as_standby(&self, peer: &str) -> ClientResult<ApiResponse> {
        self.mutate("set_server_as_standby", &[peer])
    }

    async fn takeover_standby_server(&self) -> ClientResult<ApiResponse> {
        self.mutate("takeover_standby_server", &[])
    }

    async fn remove_active_or_standby_server(&self, peer: &str) -> ClientResult<ApiResponse> {
        self.mutate("remove_active_or_standby_server", &[peer])
    }

    async fn get_active_standby_status(&self) -> ClientResult<JsonValue> {
        self.query("get_active_standby_status", &[])
    }

    async fn get_log_events(&self, count: Option<u32>, session: Option<&str>) -> ClientResult<JsonValue> {
        let count = count.map(|c| c.to_string());
        self.query("get_log_events", &[opt(count.as_deref()), opt(session)])
    }

    async fn get_log_packages(&self) -> ClientResult<JsonValue> {
        self.query("get_log_packages", &[])
    }

    async fn get_session_types(&self) -> ClientResult<JsonValue> {
        self.query("get_session_types", &[])
    }

    async fn get_server_version(&self) -> ClientResult<JsonValue> {
        self.query("get_server_version", &[])
    }

    async fn get_volume_counts(&self) -> ClientResult<JsonValue> {
        self.query("get_volume_counts", &[])
    }

    async fn raw_request(
        &self,
        method: RestMethod,
        path_resource: &str,
        data: Option<&Map<String, JsonValue>>,
        headers: Option<&BTreeMap<String, String>>,
    ) -> ClientResult<JsonValue> {
        let data = data.map(|d| JsonValue::Object(d.clone()).to_string());
        let headers = headers.map(|h| serde_json::to_string(h).unwrap());
        self.record(
            "raw_request",
            &[method.as_str(), path_resource, opt(data.as_deref()), opt(headers.as_deref())],
        );
        Ok(self
            .raw_bodies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| json!({"msg": OK_CODE, "msgTranslated": "ok"})))
    }
}
