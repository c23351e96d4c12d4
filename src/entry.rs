//! Process entry points.
//!
//! A binary embedding capflow registers its nodes and hands `argv` over:
//!
//! ```ignore
//! fn main() -> capflow::Result<()> {
//!     let settings = Settings::load_default_location();
//!     capflow::entry::init_tracing(&settings.logging)?;
//!
//!     let mut registry = NodeRegistry::new();
//!     registry.register(train_node()?)?;
//!
//!     let args: Vec<String> = std::env::args().skip(1).collect();
//!     capflow::entry::main_entry(&registry, &args)
//! }
//! ```
//!
//! `args` is `<node> --field value ...`, or `<node> --help`.

use crate::config::{CaptureConfig, InvocationFile, LogFormat, LoggingConfig};
use crate::error::{CapflowError, Result};
use crate::node::{Kwargs, Node, NodeConfig};
use crate::registry::NodeRegistry;
use std::fmt::Write as _;
use std::path::Path;
use tracing::info;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` overrides the configured filter.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.filter).map_err(|e| {
            CapflowError::Config(format!("Invalid log filter {:?}: {}", config.filter, e))
        })?,
    };

    let layer: Box<dyn Layer<Registry> + Send + Sync> = match config.format {
        LogFormat::Pretty => fmt::layer().pretty().boxed(),
        LogFormat::Compact => fmt::layer().compact().boxed(),
        LogFormat::Json => fmt::layer().json().boxed(),
    };

    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .try_init()
        .map_err(|e| CapflowError::Config(format!("Failed to install tracing subscriber: {}", e)))
}

/// Dispatch `args` (`<node> --field value ...`) to a registered node.
pub fn main_entry<S: AsRef<str>>(registry: &NodeRegistry, args: &[S]) -> Result<()> {
    let (name, rest) = args.split_first().ok_or_else(|| {
        CapflowError::Config(format!(
            "expected a node name, one of: {}",
            registry.names().join(", ")
        ))
    })?;
    let node = registry.require(name.as_ref())?;

    if let [flag] = rest {
        if flag.as_ref() == "--help" {
            print!("{}", usage(node));
            return Ok(());
        }
    }

    info!(node = node.name(), "running from the command line");
    let kwargs = node.function().kwargs_from_cli(rest)?;
    run_kwargs(node, kwargs)
}

/// Replay an invocation file (`{ node, kwargs }`, TOML or JSON).
pub fn run_invocation_file(registry: &NodeRegistry, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let invocation = InvocationFile::load(path)?;
    let node = registry.require(&invocation.node)?;
    info!(node = node.name(), file = ?path, "running invocation file");
    let kwargs = node.function().kwargs_from_config(&invocation.kwargs)?;
    run_kwargs(node, kwargs)
}

/// Async bodies get a runtime of their own, so this must not be called from
/// inside one.
fn run_kwargs(node: &Node, kwargs: Kwargs) -> Result<()> {
    if !node.is_async() {
        return node.invoke(kwargs);
    }
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(node.invoke_async(kwargs))
}

/// Human-readable description of a node's command-line surface.
pub fn usage(node: &Node) -> String {
    let meta = node.meta();
    let fields = node.function().fields();

    let mut out = format!("Usage: {}", meta.name);
    for field in fields {
        if field.is_required() {
            let _ = write!(out, " --{} <{}>", field.name(), field.ty());
        } else {
            let _ = write!(out, " [--{} <{}>]", field.name(), field.ty());
        }
    }
    out.push('\n');

    if meta.display_name != meta.name {
        let _ = writeln!(out, "\n{}", meta.display_name);
    }
    if let Some(doc) = &meta.doc {
        let _ = writeln!(out, "\n{}", doc);
    }

    if !fields.is_empty() {
        out.push_str("\nOptions:\n");
        let width = fields
            .iter()
            .map(|f| f.name().len() + f.ty().to_string().len())
            .max()
            .unwrap_or(0)
            + 6;
        for field in fields {
            let flag = format!("--{} <{}>", field.name(), field.ty());
            let mut line = format!("  {:<width$}", flag, width = width);
            match field.config_default() {
                Some(default) => {
                    let _ = write!(line, "default: {}", default);
                }
                None => line.push_str("required"),
            }
            if let Some(doc) = field.doc() {
                let _ = write!(line, "  {}", doc);
            }
            out.push_str(line.trim_end());
            out.push('\n');
        }
    }
    out
}

/// Serialize a captured graph as configured.
pub fn render_capture(graph: &NodeConfig, config: &CaptureConfig) -> Result<String> {
    graph.to_record().to_json(config.pretty_json)
}
