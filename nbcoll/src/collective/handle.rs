use crate::error::{CollectiveError, Result};
use std::future::Future;
use tokio::task::JoinHandle;

/// Background task running one collective's algorithm rounds.
///
/// If dropped before the task finishes, the task is aborted so its staging
/// buffers are released.
pub(crate) struct CollectiveHandle {
    inner: JoinHandle<Result<Vec<u8>>>,
}

impl CollectiveHandle {
    /// Spawn `fut` on the current tokio runtime. Fails with `NoRuntime`
    /// when called outside one.
    pub(crate) fn spawn(
        fut: impl Future<Output = Result<Vec<u8>>> + Send + 'static,
    ) -> Result<Self> {
        let rt = tokio::runtime::Handle::try_current().map_err(|_| CollectiveError::NoRuntime)?;
        Ok(Self {
            inner: rt.spawn(fut),
        })
    }

    /// Wait for the task and return its result bytes.
    ///
    /// Must not be called again once it has returned.
    pub(crate) async fn wait(&mut self) -> Result<Vec<u8>> {
        (&mut self.inner)
            .await
            .map_err(|e| CollectiveError::transport_with_source("collective task failed", e))?
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.inner.is_finished()
    }
}

impl Drop for CollectiveHandle {
    fn drop(&mut self) {
        self.inner.abort();
    }
}
