use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// One step of a playbook: which module to run and with what parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Duty {
    pub name: String,
    pub module: String,
    #[serde(default)]
    pub params: JsonValue,
    #[serde(default)]
    pub ignore_errors: bool,
}

impl Duty {
    pub fn new(name: impl Into<String>, module: impl Into<String>, params: JsonValue) -> Self {
        Self {
            name: name.into(),
            module: module.into(),
            params,
            ignore_errors: false,
        }
    }

    /// Deserializes the parameters into a module's typed params. Missing
    /// params are treated as an empty map.
    pub fn parse_params<T: DeserializeOwned>(&self) -> Result<T> {
        let params = match &self.params {
            JsonValue::Null => JsonValue::Object(Default::default()),
            other => other.clone(),
        };

        serde_json::from_value(params)
            .with_context(|| format!("Invalid parameters for duty '{}' ({})", self.name, self.module))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Deserialize, Debug, Default)]
    struct Params {
        #[serde(default)]
        name: Option<String>,
    }

    #[test]
    fn test_null_params_parse_as_empty() {
        let duty = Duty::new("d", "info", JsonValue::Null);
        let params: Params = duty.parse_params().unwrap();
        assert!(params.name.is_none());
    }

    #[test]
    fn test_parse_error_names_duty() {
        let duty = Duty::new("bad", "info", json!({"name": 5}));
        let err = duty.parse_params::<Params>().unwrap_err();
        assert!(format!("{:#}", err).contains("bad"));
    }
}
