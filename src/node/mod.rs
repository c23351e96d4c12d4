//! Callable nodes.
//!
//! A [`Node`] wraps a body together with its metadata and parsed signature.
//! Invoking it dispatches on the active [`Mode`]:
//!
//! - **run** - resolve the arguments and execute the body.
//! - **build** - encode the arguments and commit a [`NodeConfig`] to the
//!   active [`Sink`]. A component's body is skipped; a pipeline's body runs
//!   against a fresh sink so the nodes it calls become its children.
//!
//! Spawned tasks and threads start with no context: a task spawned from a
//! building pipeline runs its nodes instead of capturing them unless it is
//! wrapped with [`Snapshot::instrument`](crate::context::Snapshot::instrument).
//! Such runs log a warning while any capture is open.
//!
//! # Example
//!
//! ```ignore
//! use capflow::{args, build_graph, component, pipeline, Field, FieldType, Kwargs};
//!
//! let double = component("double")
//!     .param(Field::new("n", FieldType::Int))
//!     .body(|kw: &Kwargs| {
//!         println!("{}", kw.get::<i64>("n")? * 2);
//!         Ok(())
//!     })?;
//!
//! let twice = pipeline("twice")
//!     .param(Field::new("n", FieldType::Int))
//!     .body(move |kw: &Kwargs| {
//!         let n = kw.get::<i64>("n")?;
//!         double.call(args![n])?;
//!         double.call(args![n + 1])?;
//!         Ok(())
//!     })?;
//!
//! twice.call(args![3])?;                  // prints 6, 8
//! let graph = build_graph(&twice, args![3])?; // captures twice(3) -> [double(3), double(4)]
//! ```

pub mod args;
pub mod config;

pub use args::{CallArgs, Kwargs};
pub use config::{CapturedNode, NodeConfig};

use crate::context::{Mode, Sink};
use crate::error::{CapflowError, ContextError, Result, SchemaError};
use crate::schema::{parse, ConfigMap, Field, FieldType, ParsedFunction, Signature};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{debug, warn};

/// Version given to nodes that do not declare one.
pub const DEFAULT_VERSION: &str = "0.0.1";

pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

type SyncBody = Arc<dyn Fn(&Kwargs) -> anyhow::Result<()> + Send + Sync>;
type AsyncBody = Arc<dyn Fn(Kwargs) -> BoxFuture<anyhow::Result<()>> + Send + Sync>;

#[derive(Clone)]
enum Body {
    Sync(SyncBody),
    Async(AsyncBody),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Leaf node; its body never runs while building
    Component,
    /// Composite node; its body runs while building to capture its children
    Pipeline,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Component => write!(f, "component"),
            NodeKind::Pipeline => write!(f, "pipeline"),
        }
    }
}

/// Static identity of a node.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeMeta {
    pub name: String,
    pub display_name: String,
    pub version: String,
    pub doc: Option<String>,
    pub deterministic: bool,
    pub tags: BTreeMap<String, String>,
}

impl NodeMeta {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            display_name: name.to_string(),
            version: DEFAULT_VERSION.to_string(),
            doc: None,
            deterministic: true,
            tags: BTreeMap::new(),
        }
    }
}

struct NodeInner {
    kind: NodeKind,
    meta: NodeMeta,
    function: ParsedFunction,
    body: Body,
}

/// A registered node. Cheap to clone; clones share the same node.
#[derive(Clone)]
pub struct Node {
    inner: Arc<NodeInner>,
}

/// Start declaring a leaf node.
pub fn component(name: impl Into<String>) -> NodeBuilder {
    Node::component(name)
}

/// Start declaring a composite node.
pub fn pipeline(name: impl Into<String>) -> NodeBuilder {
    Node::pipeline(name)
}

impl Node {
    pub fn component(name: impl Into<String>) -> NodeBuilder {
        NodeBuilder::new(NodeKind::Component, name.into())
    }

    pub fn pipeline(name: impl Into<String>) -> NodeBuilder {
        NodeBuilder::new(NodeKind::Pipeline, name.into())
    }

    pub fn name(&self) -> &str {
        &self.inner.meta.name
    }

    pub fn kind(&self) -> NodeKind {
        self.inner.kind
    }

    pub fn meta(&self) -> &NodeMeta {
        &self.inner.meta
    }

    /// The parsed signature, derived once when the node was built.
    pub fn function(&self) -> &ParsedFunction {
        &self.inner.function
    }

    pub fn is_async(&self) -> bool {
        matches!(self.inner.body, Body::Async(_))
    }

    /// Whether both handles refer to the same node.
    pub fn ptr_eq(&self, other: &Node) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Invoke with native arguments.
    pub fn call(&self, args: CallArgs) -> Result<()> {
        let kwargs = self.inner.function.kwargs_from_native(args)?;
        self.invoke(kwargs)
    }

    pub async fn call_async(&self, args: CallArgs) -> Result<()> {
        let kwargs = self.inner.function.kwargs_from_native(args)?;
        self.invoke_async(kwargs).await
    }

    /// Invoke with `--name value` command-line tokens.
    pub fn run_cli<S: AsRef<str>>(&self, argv: &[S]) -> Result<()> {
        let kwargs = self.inner.function.kwargs_from_cli(argv)?;
        self.invoke(kwargs)
    }

    /// Invoke with a text-config map.
    pub fn run_config(&self, config: &ConfigMap) -> Result<()> {
        let kwargs = self.inner.function.kwargs_from_config(config)?;
        self.invoke(kwargs)
    }

    /// Dispatch already resolved arguments on the current mode.
    pub fn invoke(&self, kwargs: Kwargs) -> Result<()> {
        match Mode::current() {
            Mode::Run => {
                self.warn_if_detached();
                self.execute(&kwargs)
            }
            Mode::Build => self.build(kwargs),
        }
    }

    pub async fn invoke_async(&self, kwargs: Kwargs) -> Result<()> {
        match Mode::current() {
            Mode::Run => {
                self.warn_if_detached();
                self.execute_async(kwargs).await
            }
            Mode::Build => self.build_async(kwargs).await,
        }
    }

    fn execute(&self, kwargs: &Kwargs) -> Result<()> {
        match &self.inner.body {
            Body::Sync(body) => body(kwargs).map_err(|e| CapflowError::from_body(self.name(), e)),
            Body::Async(_) => Err(ContextError::AsyncBody {
                node: self.name().to_string(),
            }
            .into()),
        }
    }

    async fn execute_async(&self, kwargs: Kwargs) -> Result<()> {
        let result = match &self.inner.body {
            Body::Sync(body) => body(&kwargs),
            Body::Async(body) => body(kwargs).await,
        };
        result.map_err(|e| CapflowError::from_body(self.name(), e))
    }

    fn build(&self, kwargs: Kwargs) -> Result<()> {
        let encoded = self.inner.function.kwargs_to_config(&kwargs)?;
        let children = match self.inner.kind {
            NodeKind::Component => Vec::new(),
            NodeKind::Pipeline => {
                let (result, children) =
                    Mode::Build.enter(|| Sink::capture(|| self.execute(&kwargs)));
                self.settle(result, children.len())?;
                children
            }
        };
        Sink::put(NodeConfig::new(self.clone(), encoded, children))?;
        Ok(())
    }

    async fn build_async(&self, kwargs: Kwargs) -> Result<()> {
        let encoded = self.inner.function.kwargs_to_config(&kwargs)?;
        let children = match self.inner.kind {
            NodeKind::Component => Vec::new(),
            NodeKind::Pipeline => {
                let (result, children) = Mode::Build
                    .enter_async(Sink::capture_async(self.execute_async(kwargs)))
                    .await;
                self.settle(result, children.len())?;
                children
            }
        };
        Sink::put(NodeConfig::new(self.clone(), encoded, children))?;
        Ok(())
    }

    fn warn_if_detached(&self) {
        if Sink::is_detached() {
            warn!(
                node = self.name(),
                "running with no build context while a capture is open; \
                 spawned tasks need Snapshot::instrument to keep building"
            );
        }
    }

    /// A failed pipeline body drops everything it captured.
    fn settle(&self, result: Result<()>, captured: usize) -> Result<()> {
        if let Err(err) = &result {
            warn!(node = self.name(), dropped = captured, error = %err, "pipeline body failed while building");
        }
        result
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("name", &self.name())
            .field("kind", &self.kind())
            .field("fields", &self.inner.function.fields().len())
            .field("async", &self.is_async())
            .finish()
    }
}

/// Declares a node. Finished by [`NodeBuilder::body`] or
/// [`NodeBuilder::body_async`], which parse the signature.
#[derive(Debug, Clone)]
pub struct NodeBuilder {
    kind: NodeKind,
    meta: NodeMeta,
    signature: Signature,
}

impl NodeBuilder {
    fn new(kind: NodeKind, name: String) -> Self {
        Self {
            kind,
            meta: NodeMeta::new(&name),
            signature: Signature::new(name),
        }
    }

    pub fn param(mut self, field: Field) -> Self {
        self.signature = self.signature.param(field);
        self
    }

    pub fn returns(mut self, ty: FieldType) -> Self {
        self.signature = self.signature.returns(ty);
        self
    }

    pub fn display_name(mut self, display_name: impl Into<String>) -> Self {
        self.meta.display_name = display_name.into();
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.meta.version = version.into();
        self
    }

    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.meta.doc = Some(doc.into());
        self
    }

    pub fn deterministic(mut self, deterministic: bool) -> Self {
        self.meta.deterministic = deterministic;
        self
    }

    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta.tags.insert(key.into(), value.into());
        self
    }

    pub fn body<F>(self, body: F) -> std::result::Result<Node, SchemaError>
    where
        F: Fn(&Kwargs) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.finish(Body::Sync(Arc::new(body)))
    }

    pub fn body_async<F, Fut>(self, body: F) -> std::result::Result<Node, SchemaError>
    where
        F: Fn(Kwargs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.finish(Body::Async(Arc::new(move |kwargs| {
            Box::pin(body(kwargs)) as BoxFuture<anyhow::Result<()>>
        })))
    }

    fn finish(self, body: Body) -> std::result::Result<Node, SchemaError> {
        let function = parse(self.signature)?;
        debug!(node = %self.meta.name, kind = %self.kind, fields = function.fields().len(), "node registered");
        Ok(Node {
            inner: Arc::new(NodeInner {
                kind: self.kind,
                meta: self.meta,
                function,
                body,
            }),
        })
    }
}

/// Run `f` in build mode against a fresh root sink.
pub fn capture<R>(f: impl FnOnce() -> R) -> (R, Vec<NodeConfig>) {
    Mode::Build.enter(|| Sink::capture(f))
}

pub async fn capture_async<F: Future>(future: F) -> (F::Output, Vec<NodeConfig>) {
    Mode::Build.enter_async(Sink::capture_async(future)).await
}

/// Build `node` with `args` and return its captured config.
pub fn build_graph(node: &Node, args: CallArgs) -> Result<NodeConfig> {
    let (result, roots) = capture(|| node.call(args));
    result?;
    single_root(node, roots)
}

pub async fn build_graph_async(node: &Node, args: CallArgs) -> Result<NodeConfig> {
    let (result, roots) = capture_async(node.call_async(args)).await;
    result?;
    single_root(node, roots)
}

fn single_root(node: &Node, mut roots: Vec<NodeConfig>) -> Result<NodeConfig> {
    if roots.len() != 1 {
        return Err(ContextError::UnexpectedRoots {
            node: node.name().to_string(),
            captured: roots.len(),
        }
        .into());
    }
    Ok(roots.remove(0))
}
