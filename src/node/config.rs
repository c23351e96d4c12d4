//! Captured node invocations.

use crate::error::{CapflowError, Result};
use crate::node::{Node, NodeKind};
use crate::schema::ConfigMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One captured invocation: the node, its text-encoded kwargs and the
/// configs captured while its body ran, in call order.
#[derive(Clone)]
pub struct NodeConfig {
    node: Node,
    kwargs: ConfigMap,
    children: Vec<NodeConfig>,
}

impl NodeConfig {
    pub fn new(node: Node, kwargs: ConfigMap, children: Vec<NodeConfig>) -> Self {
        Self {
            node,
            kwargs,
            children,
        }
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    pub fn kwargs(&self) -> &ConfigMap {
        &self.kwargs
    }

    pub fn children(&self) -> &[NodeConfig] {
        &self.children
    }

    /// Number of configs in this tree, including this one.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(NodeConfig::count).sum::<usize>()
    }

    /// Serializable form of the whole tree.
    pub fn to_record(&self) -> CapturedNode {
        let meta = self.node.meta();
        CapturedNode {
            name: meta.name.clone(),
            display_name: meta.display_name.clone(),
            version: meta.version.clone(),
            kind: self.node.kind(),
            kwargs: self.kwargs.clone(),
            children: self.children.iter().map(NodeConfig::to_record).collect(),
        }
    }
}

impl fmt::Debug for NodeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeConfig")
            .field("node", &self.node.name())
            .field("kwargs", &self.kwargs)
            .field("children", &self.children)
            .finish()
    }
}

/// A captured graph as handed to a scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapturedNode {
    pub name: String,
    pub display_name: String,
    pub version: String,
    pub kind: NodeKind,
    #[serde(default)]
    pub kwargs: ConfigMap,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<CapturedNode>,
}

impl CapturedNode {
    pub fn to_json(&self, pretty: bool) -> Result<String> {
        let text = if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        };
        text.map_err(|e| CapflowError::Serialization(format!("Failed to serialize capture: {}", e)))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| CapflowError::Serialization(format!("Failed to parse capture: {}", e)))
    }

    /// Depth-first, parents before children.
    pub fn walk(&self) -> Vec<&CapturedNode> {
        let mut out = vec![self];
        for child in &self.children {
            out.extend(child.walk());
        }
        out
    }
}
