//! Host-facing names used by the bridge.
//!
//! Defaults match the graph-drawing framework. Embedders that host the model under different
//! module names can override any field from JSON:
//!
//! ```
//! use gdbridge_core::BridgeConfig;
//!
//! let config = BridgeConfig::default()
//!     .with_overrides(&serde_json::json!({ "modules": { "digraph": "my.Digraph" } }))?;
//! assert_eq!(config.modules.digraph, "my.Digraph");
//! assert_eq!(config.modules.coordinate, "pgf.gd.model.Coordinate");
//! # Ok::<(), gdbridge_core::Error>(())
//! ```

use crate::error::{Error, Result};
use gdbridge_host::model;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub modules: ModuleNames,
    /// Function of the interface module that receives declarations.
    pub declare_function: String,
    /// Declaration field under which the native dispatcher is stored.
    pub dispatcher_field: String,
    pub tail_anchor_key: String,
    pub head_anchor_key: String,
    /// Stop the host collector while a declaration is being submitted. Works around hosts that
    /// link their runtime twice and can observe half-built tables.
    pub suspend_collector_during_declare: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleNames {
    pub interface: String,
    pub coordinate: String,
    pub path: String,
    pub digraph: String,
}

impl Default for ModuleNames {
    fn default() -> Self {
        Self {
            interface: model::INTERFACE_MODULE.to_string(),
            coordinate: model::COORDINATE_MODULE.to_string(),
            path: model::PATH_MODULE.to_string(),
            digraph: model::DIGRAPH_MODULE.to_string(),
        }
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            modules: ModuleNames::default(),
            declare_function: "declare".to_string(),
            dispatcher_field: model::DISPATCHER_FIELD.to_string(),
            tail_anchor_key: "tail anchor".to_string(),
            head_anchor_key: "head anchor".to_string(),
            suspend_collector_during_declare: true,
        }
    }
}

impl BridgeConfig {
    pub fn from_value(value: &Value) -> Result<Self> {
        Self::default().with_overrides(value)
    }

    /// Deep-merges `overrides` onto this configuration.
    pub fn with_overrides(self, overrides: &Value) -> Result<Self> {
        let mut base = serde_json::to_value(&self).map_err(|e| Error::Config {
            message: e.to_string(),
        })?;
        if !overrides.is_object() {
            return Err(Error::Config {
                message: "overrides must be a JSON object".to_string(),
            });
        }
        deep_merge_value(&mut base, overrides);
        serde_json::from_value(base).map_err(|e| Error::Config {
            message: e.to_string(),
        })
    }

    /// Whether per-phase dispatch timings are logged (`GDBRIDGE_DISPATCH_TIMING=1`).
    pub fn dispatch_timing_enabled() -> bool {
        static ENABLED: std::sync::OnceLock<bool> = std::sync::OnceLock::new();
        *ENABLED.get_or_init(|| {
            matches!(
                std::env::var("GDBRIDGE_DISPATCH_TIMING").as_deref(),
                Ok("1") | Ok("true")
            )
        })
    }
}

fn deep_merge_value(base: &mut Value, incoming: &Value) {
    match (base, incoming) {
        (Value::Object(base_map), Value::Object(in_map)) => {
            for (key, in_value) in in_map {
                match base_map.get_mut(key) {
                    Some(base_value) => deep_merge_value(base_value, in_value),
                    None => {
                        base_map.insert(key.clone(), in_value.clone());
                    }
                }
            }
        }
        (base_slot, in_value) => {
            *base_slot = in_value.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn overrides_merge_nested_fields() {
        let config = BridgeConfig::default()
            .with_overrides(&json!({
                "modules": { "path": "custom.Path" },
                "suspend_collector_during_declare": false
            }))
            .unwrap();
        assert_eq!(config.modules.path, "custom.Path");
        assert_eq!(config.modules.interface, model::INTERFACE_MODULE);
        assert!(!config.suspend_collector_during_declare);
        assert_eq!(config.tail_anchor_key, "tail anchor");
    }

    #[test]
    fn overrides_must_be_objects() {
        let err = BridgeConfig::default().with_overrides(&json!(3)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid bridge configuration: overrides must be a JSON object"
        );
    }

    #[test]
    fn ill_typed_overrides_are_rejected() {
        let err = BridgeConfig::from_value(&json!({ "head_anchor_key": 7 })).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }
}
