//! Read-only inventory of the server. Each subset maps to one query; results
//! are returned as the server sent them.

use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use thiserror::Error;

use super::string_or_number;
use crate::modules::csm::clients::{ClientError, CsmClients};
use crate::modules::{AutomationModule, ExecutionResult};
use crate::utils::Duty;

pub const DEFAULT_LOG_EVENT_COUNT: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subset {
    All,
    CopysetList,
    CopysetPairList,
    HardwareDeviceList,
    HardwarePathList,
    HardwareSvchostsList,
    HardwareVolumeListByWwn,
    HardwareVolumeListBySystem,
    ScheduledTaskList,
    SessionBackupDetail,
    SessionCommandList,
    SessionDetail,
    SessionList,
    SessionListShort,
    SessionOptionList,
    SessionRecoveredBackupDetail,
    SessionRecoveredBackupList,
    SessionRolepairList,
    SessionSnapshotCloneDetail,
    SessionSnapshotCloneList,
    SessionSnapshotDetail,
    SystemLogEventList,
    SystemLogPackagesList,
    SystemSessionSupportedList,
    SystemVersionList,
    SystemVolumeCountList,
    SystemActiveStandbyStatus,
}

impl Subset {
    /// Every concrete subset, in output order.
    pub const CONCRETE: [Subset; 26] = [
        Subset::CopysetList,
        Subset::CopysetPairList,
        Subset::HardwareDeviceList,
        Subset::HardwarePathList,
        Subset::HardwareSvchostsList,
        Subset::HardwareVolumeListBySystem,
        Subset::HardwareVolumeListByWwn,
        Subset::ScheduledTaskList,
        Subset::SessionBackupDetail,
        Subset::SessionCommandList,
        Subset::SessionDetail,
        Subset::SessionList,
        Subset::SessionListShort,
        Subset::SessionOptionList,
        Subset::SessionRecoveredBackupDetail,
        Subset::SessionRecoveredBackupList,
        Subset::SessionRolepairList,
        Subset::SessionSnapshotCloneDetail,
        Subset::SessionSnapshotCloneList,
        Subset::SessionSnapshotDetail,
        Subset::SystemLogEventList,
        Subset::SystemLogPackagesList,
        Subset::SystemSessionSupportedList,
        Subset::SystemVersionList,
        Subset::SystemVolumeCountList,
        Subset::SystemActiveStandbyStatus,
    ];

    /// Subsets that need no parameters.
    pub const UNPARAMETERIZED: [Subset; 10] = [
        Subset::HardwarePathList,
        Subset::ScheduledTaskList,
        Subset::SessionList,
        Subset::SessionListShort,
        Subset::SystemLogEventList,
        Subset::SystemLogPackagesList,
        Subset::SystemSessionSupportedList,
        Subset::SystemVersionList,
        Subset::SystemVolumeCountList,
        Subset::SystemActiveStandbyStatus,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Subset::All => "all",
            Subset::CopysetList => "copyset_list",
            Subset::CopysetPairList => "copyset_pair_list",
            Subset::HardwareDeviceList => "hardware_device_list",
            Subset::HardwarePathList => "hardware_path_list",
            Subset::HardwareSvchostsList => "hardware_svchosts_list",
            Subset::HardwareVolumeListByWwn => "hardware_volume_list_by_wwn",
            Subset::HardwareVolumeListBySystem => "hardware_volume_list_by_system",
            Subset::ScheduledTaskList => "scheduled_task_list",
            Subset::SessionBackupDetail => "session_backup_detail",
            Subset::SessionCommandList => "session_command_list",
            Subset::SessionDetail => "session_detail",
            Subset::SessionList => "session_list",
            Subset::SessionListShort => "session_list_short",
            Subset::SessionOptionList => "session_option_list",
            Subset::SessionRecoveredBackupDetail => "session_recovered_backup_detail",
            Subset::SessionRecoveredBackupList => "session_recovered_backup_list",
            Subset::SessionRolepairList => "session_rolepair_list",
            Subset::SessionSnapshotCloneDetail => "session_snapshot_clone_detail",
            Subset::SessionSnapshotCloneList => "session_snapshot_clone_list",
            Subset::SessionSnapshotDetail => "session_snapshot_detail",
            Subset::SystemLogEventList => "system_log_event_list",
            Subset::SystemLogPackagesList => "system_log_packages_list",
            Subset::SystemSessionSupportedList => "system_session_supported_list",
            Subset::SystemVersionList => "system_version_list",
            Subset::SystemVolumeCountList => "system_volume_count_list",
            Subset::SystemActiveStandbyStatus => "system_active_standby_status",
        }
    }

    /// Key under which the subset appears in the result. Two subsets are
    /// published without their `_list` suffix.
    pub fn output_key(&self) -> &'static str {
        match self {
            Subset::SessionRolepairList => "session_rolepair",
            Subset::SystemVersionList => "system_version",
            other => other.as_str(),
        }
    }
}

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("{message}")]
    SubsetUnavailable { subset: Subset, message: String },

    #[error("Subset {subset} query failed: {source}")]
    Transport {
        subset: &'static str,
        #[source]
        source: ClientError,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InfoParams {
    #[serde(default = "default_subsets")]
    pub gather_subset: Vec<Subset>,
    #[serde(default = "default_true")]
    pub gather_error_fail: bool,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub rolepair: Option<String>,
    #[serde(default)]
    pub snapshot: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub backup_id: Option<String>,
    #[serde(default = "default_count")]
    pub count: u32,
    #[serde(default, deserialize_with = "string_or_number")]
    pub device_id: Option<String>,
    #[serde(default)]
    pub device_type: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub system_id: Option<String>,
    #[serde(default)]
    pub system_name: Option<String>,
    #[serde(default)]
    pub wwn_name: Option<String>,
}

fn default_subsets() -> Vec<Subset> {
    vec![Subset::All]
}

fn default_true() -> bool {
    true
}

fn default_count() -> u32 {
    DEFAULT_LOG_EVENT_COUNT
}

fn given(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl InfoParams {
    /// Expands `all` (or an empty selection) into the parameterless subsets
    /// plus every subset whose parameters were supplied.
    pub fn selected_subsets(&self) -> Vec<Subset> {
        if !self.gather_subset.is_empty() && !self.gather_subset.contains(&Subset::All) {
            return Subset::CONCRETE
                .into_iter()
                .filter(|s| self.gather_subset.contains(s))
                .collect();
        }

        let mut wanted: Vec<Subset> = Subset::UNPARAMETERIZED.to_vec();

        if given(&self.name).is_some() {
            wanted.extend([
                Subset::CopysetList,
                Subset::SessionCommandList,
                Subset::SessionDetail,
                Subset::SessionOptionList,
                Subset::SessionRecoveredBackupList,
                Subset::SessionSnapshotCloneList,
            ]);

            if given(&self.rolepair).is_some() {
                wanted.extend([Subset::CopysetPairList, Subset::SessionRolepairList]);
            }

            if given(&self.backup_id).is_some() {
                wanted.push(Subset::SessionRecoveredBackupDetail);
                if given(&self.role).is_some() {
                    wanted.push(Subset::SessionBackupDetail);
                }
            }

            if given(&self.snapshot).is_some() {
                wanted.push(Subset::SessionSnapshotCloneDetail);
                if given(&self.role).is_some() {
                    wanted.push(Subset::SessionSnapshotDetail);
                }
            }
        }

        if given(&self.device_type).is_some() {
            wanted.push(Subset::HardwareDeviceList);
        }
        if given(&self.device_id).is_some() {
            wanted.push(Subset::HardwareSvchostsList);
        }
        if given(&self.system_name).is_some() {
            wanted.push(Subset::HardwareVolumeListBySystem);
        }
        if given(&self.wwn_name).is_some() {
            wanted.push(Subset::HardwareVolumeListByWwn);
        }

        Subset::CONCRETE.into_iter().filter(|s| wanted.contains(s)).collect()
    }

    fn require<'a, const N: usize>(
        &self,
        subset: Subset,
        values: [(&'static str, &'a Option<String>); N],
    ) -> Result<[&'a str; N], QueryError> {
        if values.iter().any(|(_, v)| given(v).is_none()) {
            let mut message = format!("Subset {} failed.  Required parameters and values:", subset.as_str());
            for (key, value) in &values {
                message.push_str(&format!("  {}={}", key, given(value).unwrap_or("None")));
            }
            return Err(QueryError::SubsetUnavailable { subset, message });
        }

        Ok(values.map(|(_, v)| given(v).unwrap_or_default()))
    }

    async fn query(&self, clients: &CsmClients, subset: Subset) -> Result<JsonValue, QueryError> {
        let session = &clients.session;
        let hardware = &clients.hardware;
        let system = &clients.system;

        let result = match subset {
            Subset::All => return Ok(JsonValue::Null),
            Subset::CopysetList => {
                let [name] = self.require(subset, [("name", &self.name)])?;
                session.get_copysets(name).await
            }
            Subset::CopysetPairList => {
                let [name, rolepair] = self.require(subset, [("name", &self.name), ("rolepair", &self.rolepair)])?;
                session.get_pair_info(name, rolepair).await
            }
            Subset::HardwareDeviceList => {
                let [device_type] = self.require(subset, [("device_type", &self.device_type)])?;
                hardware.get_devices(device_type).await
            }
            Subset::HardwarePathList => match given(&self.system_id) {
                Some(system_id) => hardware.get_paths_on_storage_system(system_id).await,
                None => hardware.get_paths().await,
            },
            Subset::HardwareSvchostsList => {
                let [device_id] = self.require(subset, [("device_id", &self.device_id)])?;
                hardware.get_svc_hosts(device_id).await
            }
            Subset::HardwareVolumeListBySystem => {
                let [system_name] = self.require(subset, [("system_name", &self.system_name)])?;
                hardware.get_volumes(system_name).await
            }
            Subset::HardwareVolumeListByWwn => {
                let [wwn_name] = self.require(subset, [("wwn_name", &self.wwn_name)])?;
                hardware.get_volumes_by_wwn(wwn_name).await
            }
            Subset::ScheduledTaskList => session.get_scheduled_tasks().await,
            Subset::SessionBackupDetail => {
                let [name, role, backup_id] = self.require(
                    subset,
                    [("name", &self.name), ("role", &self.role), ("backup_id", &self.backup_id)],
                )?;
                session.get_backup_details(name, role, backup_id).await
            }
            Subset::SessionCommandList => {
                let [name] = self.require(subset, [("name", &self.name)])?;
                session.get_available_commands(name).await
            }
            Subset::SessionDetail => {
                let [name] = self.require(subset, [("name", &self.name)])?;
                session.get_session_info(name).await
            }
            Subset::SessionList => session.get_session_overviews().await,
            Subset::SessionListShort => session.get_session_overviews_short().await,
            Subset::SessionOptionList => {
                let [name] = self.require(subset, [("name", &self.name)])?;
                session.get_session_options(name).await
            }
            Subset::SessionRecoveredBackupDetail => {
                let [name, backup_id] =
                    self.require(subset, [("name", &self.name), ("backup_id", &self.backup_id)])?;
                session.get_recovered_backup_details(name, backup_id).await
            }
            Subset::SessionRecoveredBackupList => {
                let [name] = self.require(subset, [("name", &self.name)])?;
                session.get_recovered_backups(name).await
            }
            Subset::SessionRolepairList => {
                let [name, rolepair] = self.require(subset, [("name", &self.name), ("rolepair", &self.rolepair)])?;
                session.get_rolepair_info(name, rolepair).await
            }
            Subset::SessionSnapshotCloneDetail => {
                let [name, snapshot] =
                    self.require(subset, [("name", &self.name), ("snapshot_name", &self.snapshot)])?;
                session.get_snapshot_clone_details(name, snapshot).await
            }
            Subset::SessionSnapshotCloneList => {
                let [name] = self.require(subset, [("name", &self.name)])?;
                session.get_snapshot_clones(name).await
            }
            Subset::SessionSnapshotDetail => {
                let [name, role, snapshot] = self.require(
                    subset,
                    [("name", &self.name), ("role", &self.role), ("snapshot_name", &self.snapshot)],
                )?;
                session.get_snapshot_details(name, role, snapshot).await
            }
            Subset::SystemLogEventList => {
                let count = (self.count > 0).then_some(self.count);
                system.get_log_events(count, given(&self.name)).await
            }
            Subset::SystemLogPackagesList => system.get_log_packages().await,
            Subset::SystemSessionSupportedList => system.get_session_types().await,
            Subset::SystemVersionList => system.get_server_version().await,
            Subset::SystemVolumeCountList => system.get_volume_counts().await,
            Subset::SystemActiveStandbyStatus => system.get_active_standby_status().await,
        };

        result.map_err(|source| QueryError::Transport {
            subset: subset.as_str(),
            source,
        })
    }

    /// Runs every selected subset. With `gather_error_fail` a subset that
    /// lacks its parameters fails the whole gather; otherwise its value is
    /// `[]` and the message lands in `gather_errors`.
    pub async fn gather(&self, clients: &CsmClients) -> Result<Map<String, JsonValue>, QueryError> {
        let mut output = Map::new();
        let mut gather_errors: BTreeMap<&'static str, String> = BTreeMap::new();

        for subset in self.selected_subsets() {
            info!("Gathering subset {}", subset.as_str());
            let value = match self.query(clients, subset).await {
                Ok(value) => value,
                Err(QueryError::SubsetUnavailable { message, .. }) if !self.gather_error_fail => {
                    warn!("{}", message);
                    gather_errors.insert(subset.as_str(), message);
                    JsonValue::Array(Vec::new())
                }
                Err(e) => return Err(e),
            };
            output.insert(subset.output_key().to_string(), value);
        }

        if !self.gather_error_fail {
            output.insert(
                "gather_errors".to_string(),
                serde_json::to_value(gather_errors).unwrap_or_default(),
            );
        }

        Ok(output)
    }
}

pub struct InfoModule;

impl InfoModule {
    pub fn new() -> Self {
        Self
    }
}

impl Default for InfoModule {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AutomationModule for InfoModule {
    fn name(&self) -> &str {
        "info"
    }

    fn supported_duty_types(&self) -> Vec<&str> {
        vec!["info", "ibm_csm_info"]
    }

    async fn validate(&self, duty: &Duty) -> Result<()> {
        duty.parse_params::<InfoParams>()?;
        Ok(())
    }

    async fn apply(&self, clients: &CsmClients, duty: &Duty) -> Result<ExecutionResult> {
        let params: InfoParams = duty.parse_params()?;

        match params.gather(clients).await {
            Ok(output) => Ok(ExecutionResult::query(JsonValue::Object(output))),
            Err(QueryError::SubsetUnavailable { message, .. }) => Ok(ExecutionResult::failure(message)),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: JsonValue) -> InfoParams {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_defaults() {
        let p = params(json!({}));
        assert_eq!(p.gather_subset, vec![Subset::All]);
        assert!(p.gather_error_fail);
        assert_eq!(p.count, 10);
    }

    #[test]
    fn test_all_without_options_is_parameterless_set() {
        let selected = params(json!({})).selected_subsets();
        assert_eq!(selected.len(), Subset::UNPARAMETERIZED.len());
        for subset in Subset::UNPARAMETERIZED {
            assert!(selected.contains(&subset));
        }
    }

    #[test]
    fn test_all_with_name_and_rolepair() {
        let selected = params(json!({"gather_subset": ["all"], "name": "S1", "rolepair": "H1-H2"})).selected_subsets();
        assert!(selected.contains(&Subset::SessionDetail));
        assert!(selected.contains(&Subset::CopysetPairList));
        assert!(selected.contains(&Subset::SessionRolepairList));
        assert!(!selected.contains(&Subset::SessionBackupDetail));
        assert!(!selected.contains(&Subset::HardwareDeviceList));
    }

    #[test]
    fn test_backup_detail_needs_role() {
        let selected = params(json!({"name": "S1", "backup_id": 1662577200})).selected_subsets();
        assert!(selected.contains(&Subset::SessionRecoveredBackupDetail));
        assert!(!selected.contains(&Subset::SessionBackupDetail));

        let selected = params(json!({"name": "S1", "backup_id": 1, "role": "H1"})).selected_subsets();
        assert!(selected.contains(&Subset::SessionBackupDetail));
    }

    #[test]
    fn test_explicit_selection_keeps_only_requested() {
        let selected = params(json!({"gather_subset": ["system_version_list", "session_list"]})).selected_subsets();
        assert_eq!(selected, vec![Subset::SessionList, Subset::SystemVersionList]);
    }

    #[test]
    fn test_output_key_quirks() {
        assert_eq!(Subset::SessionRolepairList.output_key(), "session_rolepair");
        assert_eq!(Subset::SystemVersionList.output_key(), "system_version");
        assert_eq!(Subset::SessionList.output_key(), "session_list");
    }

    #[test]
    fn test_missing_parameter_message() {
        let p = params(json!({"rolepair": "H1-H2"}));
        let err = p
            .require(
                Subset::SessionRolepairList,
                [("name", &p.name), ("rolepair", &p.rolepair)],
            )
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Subset session_rolepair_list failed.  Required parameters and values:  name=None  rolepair=H1-H2"
        );
    }

    #[test]
    fn test_unknown_subset_rejected() {
        assert!(serde_json::from_value::<InfoParams>(json!({"gather_subset": ["everything"]})).is_err());
    }
}
