//! # capflow: typed functions as graph nodes
//!
//! Ordinary typed functions double as nodes of a computation graph. Called
//! normally they execute; called in build mode they capture themselves, and
//! every node they call, into a nested tree of [`NodeConfig`]s that can be
//! serialized and handed to an external scheduler.
//!
//! ## Architecture
//!
//! - **Schema**: declared parameters become per-field codecs for the native,
//!   command-line and text-config surfaces
//! - **Context**: a task-local chain carries the active [`Mode`] and capture
//!   [`Sink`] through nested calls, including across `.await`
//! - **Node**: components (leaves) and pipelines (composites) dispatch on the
//!   mode; pipelines capture the nodes their body calls
//! - **Entry**: registry, settings and `argv`/invocation-file dispatch
//!
//! ## Configuration
//!
//! Settings live in `capflow.toml` in the platform config directory (see
//! [`config`]).
//!
//! ## Example
//!
//! ```ignore
//! use capflow::{args, build_graph, component, pipeline, Field, FieldType, Kwargs};
//!
//! fn main() -> anyhow::Result<()> {
//!     let scale = component("scale")
//!         .param(Field::new("n", FieldType::Int).min(0))
//!         .body(|kw: &Kwargs| {
//!             println!("scaling {}", kw.get::<i64>("n")?);
//!             Ok(())
//!         })?;
//!
//!     let fan_out = pipeline("fan_out")
//!         .param(Field::new("n", FieldType::Int))
//!         .body(move |kw: &Kwargs| {
//!             let n = kw.get::<i64>("n")?;
//!             scale.call(args![n * 2])?;
//!             scale.call(args![n * 3])?;
//!             Ok(())
//!         })?;
//!
//!     // Runs both calls
//!     fan_out.call(args![4])?;
//!
//!     // Captures fan_out(n=4) -> [scale(n=8), scale(n=12)] without running scale
//!     let graph = build_graph(&fan_out, args![4])?;
//!     println!("{}", graph.to_record().to_json(true)?);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod context;
pub mod entry;
pub mod error;
pub mod node;
pub mod registry;
pub mod schema;

// Re-export commonly used types
pub use config::{InvocationFile, Settings};
pub use context::{ContextStack, Mode, Sink, Snapshot};
pub use error::{ArgumentError, CapflowError, ContextError, Result, ResultExt, SchemaError};
pub use node::{
    build_graph, build_graph_async, capture, capture_async, component, pipeline, CallArgs,
    CapturedNode, Kwargs, Node, NodeBuilder, NodeConfig, NodeKind, NodeMeta,
};
pub use registry::NodeRegistry;
pub use schema::{ConfigMap, Field, FieldType, FromValue, Value};
