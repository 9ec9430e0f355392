pub mod csm;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::modules::csm::clients::CsmClients;
use crate::reconcile::{ReconcileError, Reconciliation};
use crate::utils::Duty;

/// What a duty reports back. `changed` is true only when a mutating call was
/// issued and the server accepted it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub changed: bool,
    pub failed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
    #[serde(default)]
    pub result: JsonValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_result: Option<JsonValue>,
}

impl ExecutionResult {
    /// Renders a reconcile outcome. A rejected call becomes a failed result
    /// whose message starts with `context` and carries the raw body.
    pub fn from_reconciliation(reconciliation: Reconciliation, context: &str) -> Self {
        match reconciliation.into_result() {
            Ok(done) => Self {
                changed: done.changed(),
                failed: false,
                msg: None,
                result: done.response.payload,
                server_result: None,
            },
            Err(ReconcileError::RemoteOperation {
                code, text, response, ..
            }) => Self {
                changed: false,
                failed: true,
                msg: Some(format!("{} ERR: {}: {}", context, code, text)),
                result: response.payload.clone(),
                server_result: Some(response.payload),
            },
            Err(other) => Self::failure(format!("{} ERR: {}", context, other)),
        }
    }

    /// Read-only result; never changed.
    pub fn query(result: JsonValue) -> Self {
        Self {
            result,
            ..Default::default()
        }
    }

    pub fn failure(msg: impl Into<String>) -> Self {
        Self {
            failed: true,
            msg: Some(msg.into()),
            ..Default::default()
        }
    }
}

#[async_trait]
pub trait AutomationModule: Send + Sync {
    fn name(&self) -> &str;

    /// Names a duty may use to select this module.
    fn supported_duty_types(&self) -> Vec<&str>;

    /// Checks parameters without contacting the server.
    async fn validate(&self, duty: &Duty) -> Result<()>;

    async fn apply(&self, clients: &CsmClients, duty: &Duty) -> Result<ExecutionResult>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::{ApiResponse, Operation, Outcome};
    use serde_json::json;

    fn reconciliation(outcome: Outcome, code: &str) -> Reconciliation {
        Reconciliation {
            operation: Operation::CreateSession,
            outcome,
            response: ApiResponse::new(code, "server text"),
        }
    }

    #[test]
    fn test_success_is_changed() {
        let result = ExecutionResult::from_reconciliation(reconciliation(Outcome::Success, "IWNR1021I"), "ctx");
        assert!(result.changed);
        assert!(!result.failed);
        assert_eq!(result.result["msg"], "IWNR1021I");
        assert!(result.server_result.is_none());
    }

    #[test]
    fn test_noop_is_unchanged_and_ok() {
        let result = ExecutionResult::from_reconciliation(
            reconciliation(Outcome::NoopAlreadySatisfied, "IWNR1019E"),
            "ctx",
        );
        assert!(!result.changed);
        assert!(!result.failed);
    }

    #[test]
    fn test_failure_carries_server_result() {
        let result = ExecutionResult::from_reconciliation(
            reconciliation(
                Outcome::Failure {
                    message: "server text".to_string(),
                },
                "IWNR2000E",
            ),
            "Failed to create the session S1.",
        );
        assert!(result.failed);
        assert!(!result.changed);
        assert_eq!(
            result.msg.as_deref(),
            Some("Failed to create the session S1. ERR: IWNR2000E: server text")
        );
        assert_eq!(
            result.server_result,
            Some(json!({"msg": "IWNR2000E", "msgTranslated": "server text"}))
        );
    }

    #[test]
    fn test_serialization_skips_empty_fields() {
        let value = serde_json::to_value(ExecutionResult::query(json!([1]))).unwrap();
        assert_eq!(value, json!({"changed": false, "failed": false, "result": [1]}));
    }
}
