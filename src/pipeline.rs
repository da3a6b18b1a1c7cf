// Job pipeline - drives one job from queued to a terminal state

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};
use url::Url;

use crate::classify::classify;
use crate::cleanup::CleanupQueue;
use crate::engines::{EngineOutcome, EngineSet};
use crate::notify::Notify;
use crate::queue::JobRunner;
use crate::store::{JobPatch, JobStatus, JobStore};

/// Runs the full lifecycle of a single job:
/// `queued -> downloading -> uploading -> done`, or `error` on any failure.
/// Errors terminate the job only; they never escape into the scheduler.
pub struct Pipeline {
    store: Arc<JobStore>,
    engines: EngineSet,
    notifier: Arc<dyn Notify>,
    cleanup: CleanupQueue,
}

impl Pipeline {
    pub fn new(
        store: Arc<JobStore>,
        engines: EngineSet,
        notifier: Arc<dyn Notify>,
        cleanup: CleanupQueue,
    ) -> Self {
        Self {
            store,
            engines,
            notifier,
            cleanup,
        }
    }

    async fn process(&self, job_id: &str) -> Result<(), String> {
        let job = self
            .store
            .get(job_id)
            .ok_or_else(|| format!("job {} vanished from the store", job_id))?;

        self.store.patch(
            job_id,
            JobPatch {
                status: Some(JobStatus::Downloading),
                ..Default::default()
            },
        );

        // Best-effort: a broken chat must not abort the download itself.
        if let Err(e) = self
            .notifier
            .send_text(&format!("Downloading {}", job.url))
            .await
        {
            warn!(job = %job_id, "start notification failed: {}", e);
        }

        // The URL was validated at submission; a parse failure here means
        // the record was tampered with, which is still a job-level error.
        let url = Url::parse(&job.url).map_err(|e| format!("bad stored url: {}", e))?;
        let kind = classify(&url);
        let engine = self.engines.for_kind(kind);
        info!(job = %job_id, engine = engine.name(), kind = ?kind, "dispatching");

        let outcome = engine
            .run(job_id, &job.url)
            .await
            .map_err(|e| e.to_string())?;

        self.store.patch(
            job_id,
            JobPatch {
                status: Some(JobStatus::Uploading),
                ..Default::default()
            },
        );

        match outcome {
            EngineOutcome::SingleFile(path) => self.deliver_single(job_id, &path).await,
            EngineOutcome::FileList(paths) => self.deliver_list(job_id, paths).await,
        }
    }

    async fn deliver_single(&self, job_id: &str, path: &Path) -> Result<(), String> {
        let name = file_label(path);

        self.notifier
            .send_file(path, &name)
            .await
            .map_err(|e| format!("delivery failed: {}", e))?;

        self.store.patch(
            job_id,
            JobPatch {
                status: Some(JobStatus::Done),
                file_path: Some(path.to_path_buf()),
                file_name: Some(name.clone()),
                ..Default::default()
            },
        );

        if let Err(e) = self.notifier.send_text(&format!("Done: {}", name)).await {
            warn!(job = %job_id, "completion notification failed: {}", e);
        }

        // The file stays around for a while so the user can re-fetch it.
        self.cleanup.schedule(job_id.to_string());
        Ok(())
    }

    /// Upload items strictly in sorted order, deleting each artifact right
    /// after its upload so the whole set is never held on disk longer than
    /// necessary. A failure mid-list aborts the job; items delivered and
    /// deleted before that point are gone. That is intentional: there is no
    /// partial-success state to resume from.
    async fn deliver_list(&self, job_id: &str, mut paths: Vec<std::path::PathBuf>) -> Result<(), String> {
        paths.sort();
        let total = paths.len();

        self.notifier
            .send_text(&format!("Got {} files, sending them over", total))
            .await
            .map_err(|e| format!("delivery failed: {}", e))?;

        for path in &paths {
            let name = file_label(path);
            self.notifier
                .send_file(path, &name)
                .await
                .map_err(|e| format!("delivery of {} failed: {}", name, e))?;
            let _ = tokio::fs::remove_file(path).await;
        }

        self.store.patch(
            job_id,
            JobPatch {
                status: Some(JobStatus::Done),
                file_name: Some(format!("{} files", total)),
                ..Default::default()
            },
        );

        if let Err(e) = self
            .notifier
            .send_text(&format!("Done: {} files delivered", total))
            .await
        {
            warn!(job = %job_id, "completion notification failed: {}", e);
        }
        Ok(())
    }
}

#[async_trait]
impl JobRunner for Pipeline {
    async fn run(&self, job_id: String) {
        if let Err(message) = self.process(&job_id).await {
            warn!(job = %job_id, "job failed: {}", message);
            self.store.patch(
                &job_id,
                JobPatch {
                    status: Some(JobStatus::Error),
                    error: Some(message.clone()),
                    ..Default::default()
                },
            );
            // Swallow secondary failures so they never mask the original one.
            if let Err(e) = self
                .notifier
                .send_text(&format!("Download failed: {}", message))
                .await
            {
                warn!(job = %job_id, "failure notification also failed: {}", e);
            }
        }
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
