//! Orchestration progress reporting
//!
//! The engine announces what it is doing through this trait instead of
//! printing; the CLI plugs in its spinner/styling adapter, tests plug in
//! [`NullProgress`] or a recorder.

use crate::error::Result;

pub trait Progress: Send + Sync {
    fn step_started(&self, _label: &str) {}

    fn step_done(&self, _label: &str) {}

    fn step_failed(&self, _label: &str) {}

    /// A non-fatal problem (deletion partial failures).
    fn warn(&self, _label: &str, _message: &str) {}

    fn note(&self, _message: &str) {}

    /// Called once per retry attempt while waiting out the IAM propagation
    /// window during function creation.
    fn propagation_wait(&self, _attempt: u32) {}
}

/// Reports nothing.
pub struct NullProgress;

impl Progress for NullProgress {}

/// Run one orchestration step, bracketing it with progress callbacks.
pub(crate) async fn step<T, F>(progress: &dyn Progress, label: &str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    progress.step_started(label);
    match fut.await {
        Ok(value) => {
            progress.step_done(label);
            Ok(value)
        }
        Err(err) => {
            progress.step_failed(label);
            Err(err)
        }
    }
}
