//! Fire-and-forget background task execution.
//!
//! Long-running loops (subscription broadcast, duplex bridge forwarding) are
//! detached through a [`TaskSpawner`] so the runtime that owns them stays a
//! pluggable collaborator.

use std::future::Future;
use std::pin::Pin;

/// Boxed detached task.
pub type BoxTask = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Runs detached background work.
pub trait TaskSpawner: Send + Sync {
    /// Schedule the task and return immediately. The task's completion is
    /// not observable through this interface.
    fn spawn(&self, task: BoxTask);
}

/// Default spawner backed by the ambient tokio runtime.
///
/// Panics (inside tokio) if used outside a runtime context.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSpawner;

impl TaskSpawner for TokioSpawner {
    fn spawn(&self, task: BoxTask) {
        drop(tokio::spawn(task));
    }
}
