// Deferred deletion of delivered single-file artifacts

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::store::JobStore;

struct Inner {
    store: Arc<JobStore>,
    delay: Duration,
    tasks: Mutex<HashMap<String, JoinHandle<()>>>,
}

/// Schedules one-shot deletions of delivered files.
///
/// Multi-file jobs delete each item right after its upload and never come
/// through here. Handles are kept per job id so tests (or a teardown) can
/// abort pending timers instead of leaking them.
#[derive(Clone)]
pub struct CleanupQueue {
    inner: Arc<Inner>,
}

impl CleanupQueue {
    pub fn new(store: Arc<JobStore>, minutes: u64) -> Self {
        Self::with_delay(store, Duration::from_secs(minutes.max(1) * 60))
    }

    pub fn with_delay(store: Arc<JobStore>, delay: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                delay,
                tasks: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Delete the job's file after the configured delay, if it still exists
    /// by then. Delete errors are ignored.
    pub fn schedule(&self, job_id: String) {
        let inner = Arc::clone(&self.inner);
        let key = job_id.clone();

        // Holding the map lock across the insert keeps the spawned task's
        // own removal from racing us on a very short delay.
        let mut tasks = self.inner.tasks.lock();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(inner.delay).await;
            if let Some(job) = inner.store.get(&job_id) {
                if let Some(path) = job.file_path {
                    if path.is_file() {
                        debug!(job = %job_id, path = %path.display(), "removing delivered file");
                        let _ = tokio::fs::remove_file(&path).await;
                    }
                }
            }
            inner.tasks.lock().remove(&job_id);
        });

        // A second schedule for the same job replaces the first timer.
        if let Some(old) = tasks.insert(key, handle) {
            old.abort();
        }
    }

    /// Abort all pending timers.
    pub fn shutdown(&self) {
        for (_, handle) in self.inner.tasks.lock().drain() {
            handle.abort();
        }
    }

    #[cfg(test)]
    fn pending(&self) -> usize {
        self.inner.tasks.lock().len()
    }
}
