//! Node registry.
//!
//! Maps node names to [`Node`]s so that a captured config, an invocation file
//! or a command line can be dispatched back to the node it names.
//!
//! ```ignore
//! let mut registry = NodeRegistry::new();
//! registry.register(train)?;
//! registry.register(evaluate)?;
//!
//! for record in graph.to_record().walk() {
//!     // a scheduler would run these on separate workers
//!     registry.replay(record)?;
//! }
//! ```

use crate::error::{CapflowError, Result};
use crate::node::{CapturedNode, Node};
use std::collections::BTreeMap;
use tracing::{debug, warn};

#[derive(Debug, Default, Clone)]
pub struct NodeRegistry {
    nodes: BTreeMap<String, Node>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node under its name. Names must be unique.
    pub fn register(&mut self, node: Node) -> Result<()> {
        let name = node.name().to_string();
        if self.nodes.contains_key(&name) {
            return Err(CapflowError::Registry(format!(
                "node `{}` is already registered",
                name
            )));
        }
        debug!(node = %name, "added to registry");
        self.nodes.insert(name, node);
        Ok(())
    }

    /// Look up a node by name
    pub fn get(&self, name: &str) -> Option<&Node> {
        self.nodes.get(name)
    }

    /// Like [`get`](Self::get), but a missing node is an error.
    pub fn require(&self, name: &str) -> Result<&Node> {
        self.get(name).ok_or_else(|| {
            CapflowError::Registry(format!(
                "unknown node `{}` (registered: {})",
                name,
                self.names().join(", ")
            ))
        })
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        self.nodes.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Run the single node a captured record names, with its recorded kwargs.
    ///
    /// Children are not replayed; each record in a captured graph is a unit
    /// of work of its own.
    pub fn replay(&self, record: &CapturedNode) -> Result<()> {
        let node = self.lookup(record)?;
        node.run_config(&record.kwargs)
    }

    pub async fn replay_async(&self, record: &CapturedNode) -> Result<()> {
        let node = self.lookup(record)?;
        let kwargs = node.function().kwargs_from_config(&record.kwargs)?;
        node.invoke_async(kwargs).await
    }

    fn lookup(&self, record: &CapturedNode) -> Result<&Node> {
        let node = self.require(&record.name)?;
        if node.kind() != record.kind {
            return Err(CapflowError::Registry(format!(
                "node `{}` is a {}, but the record describes a {}",
                record.name,
                node.kind(),
                record.kind
            )));
        }
        if node.meta().version != record.version {
            warn!(
                node = %record.name,
                registered = %node.meta().version,
                recorded = %record.version,
                "replaying a record captured from another node version"
            );
        }
        Ok(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{component, Kwargs, NodeKind};
    use crate::schema::{Field, FieldType};
    use std::sync::{Arc, Mutex};

    fn counter(name: &str) -> (Arc<Mutex<i64>>, Node) {
        let total = Arc::new(Mutex::new(0));
        let sum = total.clone();
        let node = component(name)
            .param(Field::new("n", FieldType::Int))
            .body(move |kw: &Kwargs| {
                *sum.lock().unwrap() += kw.get::<i64>("n")?;
                Ok(())
            })
            .unwrap();
        (total, node)
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = NodeRegistry::new();
        registry.register(counter("b").1).unwrap();
        registry.register(counter("a").1).unwrap();
        assert_eq!(registry.names(), ["a", "b"]);
        assert!(registry.get("a").is_some());
        assert!(registry.require("c").unwrap_err().to_string().contains("unknown node `c`"));
    }

    #[test]
    fn test_duplicate_names_are_rejected() {
        let mut registry = NodeRegistry::new();
        registry.register(counter("a").1).unwrap();
        let err = registry.register(counter("a").1).unwrap_err();
        assert!(matches!(err, CapflowError::Registry(_)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_replay_runs_recorded_kwargs() {
        let (total, node) = counter("add");
        let mut registry = NodeRegistry::new();
        registry.register(node).unwrap();

        let record = CapturedNode {
            name: "add".to_string(),
            display_name: "add".to_string(),
            version: "0.0.1".to_string(),
            kind: NodeKind::Component,
            kwargs: serde_json::json!({"n": 5}).as_object().cloned().unwrap_or_default(),
            children: Vec::new(),
        };
        registry.replay(&record).unwrap();
        registry.replay(&record).unwrap();
        assert_eq!(*total.lock().unwrap(), 10);

        let wrong_kind = CapturedNode {
            kind: NodeKind::Pipeline,
            ..record
        };
        assert!(registry.replay(&wrong_kind).is_err());
    }
}
