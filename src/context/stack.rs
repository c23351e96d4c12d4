//! Dynamically scoped value channels.
//!
//! All channels share one immutable chain of frames held in a tokio
//! task-local. Pushing a value builds a new frame on top of the chain visible
//! at the call site and installs it for the remainder of that call only:
//!
//! ```ignore
//! static LABELS: ContextStack<&'static str> = ContextStack::new("labels");
//!
//! LABELS.scope("X", || {
//!     LABELS.scope("Y", || assert_eq!(LABELS.read(), ["X", "Y"]));
//!     assert_eq!(LABELS.read(), ["X"]);
//! });
//! ```
//!
//! Futures wrapped with [`ContextStack::scope_async`] re-install their chain
//! on every poll, so a value stays visible across suspension points while
//! sibling futures interleaved on the same thread never observe it.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

type Chain = Option<Arc<Frame>>;

struct Frame {
    channel: &'static str,
    value: Arc<dyn Any + Send + Sync>,
    parent: Chain,
}

tokio::task_local! {
    static CHAIN: Chain;
}

fn current_chain() -> Chain {
    CHAIN.try_with(|chain| chain.clone()).ok().flatten()
}

fn frames(chain: &Chain) -> impl Iterator<Item = &Frame> {
    std::iter::successors(chain.as_deref(), |frame| frame.parent.as_deref())
}

/// A named channel of values of type `T`.
pub struct ContextStack<T> {
    channel: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> ContextStack<T> {
    pub const fn new(channel: &'static str) -> Self {
        Self {
            channel,
            _marker: PhantomData,
        }
    }

    pub fn channel(&self) -> &'static str {
        self.channel
    }
}

impl<T> ContextStack<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Every value on this channel visible from the caller, nearest last.
    pub fn read(&self) -> Vec<T> {
        let chain = current_chain();
        let mut values: Vec<T> = frames(&chain)
            .filter_map(|frame| self.downcast(frame))
            .collect();
        values.reverse();
        values
    }

    /// The most recently pushed value visible from the caller.
    pub fn nearest(&self) -> Option<T> {
        let chain = current_chain();
        let found = frames(&chain).find_map(|frame| self.downcast(frame));
        found
    }

    /// Run `f` with `value` pushed on this channel.
    pub fn scope<R>(&self, value: T, f: impl FnOnce() -> R) -> R {
        CHAIN.sync_scope(self.push(value), f)
    }

    /// Drive `future` with `value` pushed on this channel.
    ///
    /// The push happens against the chain visible where this is called, not
    /// where the future is first polled.
    pub fn scope_async<F: Future>(&self, value: T, future: F) -> impl Future<Output = F::Output> {
        CHAIN.scope(self.push(value), future)
    }

    fn push(&self, value: T) -> Chain {
        Some(Arc::new(Frame {
            channel: self.channel,
            value: Arc::new(value),
            parent: current_chain(),
        }))
    }

    fn downcast(&self, frame: &Frame) -> Option<T> {
        if frame.channel != self.channel {
            return None;
        }
        frame.value.downcast_ref::<T>().cloned()
    }
}

impl<T> fmt::Debug for ContextStack<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextStack")
            .field("channel", &self.channel)
            .finish()
    }
}

/// The whole chain as seen from one call site.
///
/// Carry a snapshot into a spawned task so that the task descends from the
/// spawning call:
///
/// ```ignore
/// let snapshot = Snapshot::capture();
/// tokio::spawn(snapshot.instrument(async move { node.call_async(args).await }));
/// ```
#[derive(Clone, Default)]
pub struct Snapshot {
    chain: Chain,
}

impl Snapshot {
    pub fn capture() -> Self {
        Self {
            chain: current_chain(),
        }
    }

    pub fn enter<R>(&self, f: impl FnOnce() -> R) -> R {
        CHAIN.sync_scope(self.chain.clone(), f)
    }

    pub fn instrument<F: Future>(self, future: F) -> impl Future<Output = F::Output> {
        CHAIN.scope(self.chain, future)
    }

    /// Channel names of every frame, nearest first.
    pub fn channels(&self) -> Vec<&'static str> {
        frames(&self.chain).map(|frame| frame.channel).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_none()
    }
}

impl fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Snapshot")
            .field("channels", &self.channels())
            .finish()
    }
}
