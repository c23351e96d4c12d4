//! Build context shared by nested node calls.
//!
//! Node bodies call each other as plain functions, so the "which mode is
//! active" and "where do captured configs go" questions are answered through
//! dynamically scoped channels instead of parameters:
//!
//! - [`Mode`] - build or run, defaults to run.
//! - [`Sink`] - the capture list of the innermost pipeline being built.
//!
//! Both ride on [`ContextStack`], a tokio task-local chain that follows the
//! call nesting, including across `.await` points.

pub mod mode;
pub mod sink;
pub mod stack;

pub use mode::Mode;
pub use sink::Sink;
pub use stack::{ContextStack, Snapshot};
