pub mod active_standby_action;
pub mod clients;
pub mod copyset_manage;
pub mod info;
pub mod rest_call;
pub mod scheduled_task_action;
pub mod session_action;
pub mod session_manage;

use std::sync::Arc;

use anyhow::{Context, Result};
use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer};
use serde_json::Value as JsonValue;

use crate::modules::AutomationModule;

pub use active_standby_action::ActiveStandbyActionModule;
pub use copyset_manage::CopysetManageModule;
pub use info::InfoModule;
pub use rest_call::RestCallModule;
pub use scheduled_task_action::ScheduledTaskActionModule;
pub use session_action::SessionActionModule;
pub use session_manage::SessionManageModule;

/// Every module shipped with the crate.
pub fn default_modules() -> Vec<Arc<dyn AutomationModule>> {
    vec![
        Arc::new(SessionManageModule::new()),
        Arc::new(CopysetManageModule::new()),
        Arc::new(ScheduledTaskActionModule::new()),
        Arc::new(ActiveStandbyActionModule::new()),
        Arc::new(SessionActionModule::new()),
        Arc::new(RestCallModule::new()),
        Arc::new(InfoModule::new()),
    ]
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum State {
    #[default]
    Present,
    Absent,
}

/// Accepts `7` as well as `"7"` for identifiers.
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<JsonValue>::deserialize(deserializer)? {
        None | Some(JsonValue::Null) => Ok(None),
        Some(JsonValue::String(s)) => Ok(Some(s)),
        Some(JsonValue::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(de::Error::custom(format!(
            "expected a string or a number, got {}",
            other
        ))),
    }
}

/// A list given either natively or as a bracketed literal such as
/// `"['H1', 'H2']"`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ListParam<T> {
    List(T),
    Literal(String),
}

impl<T: DeserializeOwned> ListParam<T> {
    pub fn into_list(self) -> Result<T> {
        match self {
            ListParam::List(list) => Ok(list),
            ListParam::Literal(literal) => parse_literal(&literal),
        }
    }
}

/// Parses a list literal. A literal with double quotes is read as JSON as
/// written; otherwise single quotes are requoted, so values inside a
/// single-quoted literal cannot contain an apostrophe.
pub fn parse_literal<T: DeserializeOwned>(literal: &str) -> Result<T> {
    let json = if literal.contains('"') {
        literal.to_string()
    } else {
        literal.replace('\'', "\"")
    };
    serde_json::from_str(&json).with_context(|| format!("'{}' is not a valid list", literal))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Deserialize)]
    struct Ids {
        #[serde(default, deserialize_with = "string_or_number")]
        id: Option<String>,
    }

    #[test]
    fn test_string_or_number() {
        let ids: Ids = serde_json::from_value(json!({"id": 7})).unwrap();
        assert_eq!(ids.id.as_deref(), Some("7"));
        let ids: Ids = serde_json::from_value(json!({"id": "7"})).unwrap();
        assert_eq!(ids.id.as_deref(), Some("7"));
        let ids: Ids = serde_json::from_value(json!({})).unwrap();
        assert!(ids.id.is_none());
        assert!(serde_json::from_value::<Ids>(json!({"id": [7]})).is_err());
    }

    #[test]
    fn test_list_param_accepts_literal() {
        let param: ListParam<Vec<String>> = serde_json::from_value(json!("['H1', 'H2']")).unwrap();
        assert_eq!(param.into_list().unwrap(), vec!["H1", "H2"]);

        let param: ListParam<Vec<Vec<String>>> =
            serde_json::from_value(json!("[['a:1','a:2'],\n ['b:1','b:2']]")).unwrap();
        assert_eq!(param.into_list().unwrap(), vec![vec!["a:1", "a:2"], vec!["b:1", "b:2"]]);
    }

    #[test]
    fn test_list_param_accepts_native_list() {
        let param: ListParam<Vec<String>> = serde_json::from_value(json!(["H1", "H2"])).unwrap();
        assert_eq!(param, ListParam::List(vec!["H1".to_string(), "H2".to_string()]));
    }

    #[test]
    fn test_double_quoted_literal_keeps_apostrophes() {
        let roles: Vec<String> = parse_literal(r#"["H1", "site 'B'"]"#).unwrap();
        assert_eq!(roles, vec!["H1", "site 'B'"]);

        let escaped: Vec<String> = parse_literal(r#"["a\"b"]"#).unwrap();
        assert_eq!(escaped, vec!["a\"b"]);
    }

    #[test]
    fn test_bad_literal_is_error() {
        let param: ListParam<Vec<String>> = serde_json::from_value(json!("H1, H2")).unwrap();
        assert!(param.into_list().is_err());
    }

    #[test]
    fn test_module_names_are_unique() {
        let modules = default_modules();
        let mut names: Vec<&str> = modules.iter().flat_map(|m| m.supported_duty_types()).collect();
        let total = names.len();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), total);
    }
}
