use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use super::rest::RestClient;
use super::traits::{ClientResult, HardwareOperations};

const STORAGE_DEVICES: &str = "storagedevices";

pub struct HardwareClient {
    rest: Arc<RestClient>,
}

impl HardwareClient {
    pub fn new(rest: Arc<RestClient>) -> Self {
        Self { rest }
    }
}

#[async_trait]
impl HardwareOperations for HardwareClient {
    async fn get_devices(&self, device_type: &str) -> ClientResult<JsonValue> {
        self.rest
            .query(&[STORAGE_DEVICES], &[("type", device_type.to_string())])
            .await
    }

    async fn get_paths(&self) -> ClientResult<JsonValue> {
        self.rest.query(&[STORAGE_DEVICES, "paths"], &[]).await
    }

    async fn get_paths_on_storage_system(&self, system_id: &str) -> ClientResult<JsonValue> {
        self.rest.query(&[STORAGE_DEVICES, "paths", system_id], &[]).await
    }

    async fn get_svc_hosts(&self, device_id: &str) -> ClientResult<JsonValue> {
        self.rest.query(&[STORAGE_DEVICES, device_id, "hosts"], &[]).await
    }

    async fn get_volumes(&self, system_name: &str) -> ClientResult<JsonValue> {
        self.rest.query(&[STORAGE_DEVICES, "volumes", system_name], &[]).await
    }

    async fn get_volumes_by_wwn(&self, wwn: &str) -> ClientResult<JsonValue> {
        self.rest.query(&[STORAGE_DEVICES, "volumes", "wwn", wwn], &[]).await
    }
}
