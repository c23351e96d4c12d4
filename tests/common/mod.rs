//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;

use capflow::{ConfigMap, NodeConfig};
use std::sync::{Arc, Mutex};

/// Shared, ordered record of which bodies ran.
#[derive(Clone, Default)]
pub struct CallLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: impl Into<String>) {
        self.entries.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }
}

/// Build a `ConfigMap` from a `json!` object literal
pub fn config_map(value: serde_json::Value) -> ConfigMap {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("expected a JSON object, got {}", other),
    }
}

/// Assert a captured config's node name and kwargs
pub fn assert_config(config: &NodeConfig, name: &str, kwargs: serde_json::Value) {
    assert_eq!(config.node().name(), name, "unexpected node in {:?}", config);
    assert_eq!(
        serde_json::Value::Object(config.kwargs().clone()),
        kwargs,
        "unexpected kwargs for `{}`",
        name
    );
}
