use crate::context::stack::ContextStack;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;

static MODE: ContextStack<Mode> = ContextStack::new("capflow.mode");

/// Whether node invocations execute or capture themselves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Build,
    #[default]
    Run,
}

impl Mode {
    /// The mode visible from the caller; `Run` when none was entered.
    pub fn current() -> Mode {
        MODE.nearest().unwrap_or_default()
    }

    pub fn is_building() -> bool {
        Mode::current() == Mode::Build
    }

    /// Run `f` with this mode active.
    pub fn enter<R>(self, f: impl FnOnce() -> R) -> R {
        MODE.scope(self, f)
    }

    pub fn enter_async<F: Future>(self, future: F) -> impl Future<Output = F::Output> {
        MODE.scope_async(self, future)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Build => write!(f, "build"),
            Mode::Run => write!(f, "run"),
        }
    }
}
