// In-memory job registry

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use parking_lot::Mutex;
use serde::Serialize;
use time::OffsetDateTime;

/// Job lifecycle states. `Done` and `Error` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Downloading,
    Uploading,
    Done,
    Error,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error)
    }
}

/// One URL-to-delivery unit of work.
#[derive(Debug, Clone, Serialize)]
pub struct Job {
    pub id: String,
    pub url: String,
    pub status: JobStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    pub file_path: Option<PathBuf>,
    pub file_name: Option<String>,
    pub error: Option<String>,
    pub log: String,
}

/// Partial update applied by `JobStore::patch`. `None` fields are left alone.
#[derive(Debug, Default)]
pub struct JobPatch {
    pub status: Option<JobStatus>,
    pub file_path: Option<PathBuf>,
    pub file_name: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug)]
pub struct DuplicateJob(pub String);

impl fmt::Display for DuplicateJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job id already registered: {}", self.0)
    }
}

impl std::error::Error for DuplicateJob {}

/// Registry of all jobs seen during this process lifetime.
///
/// Records are never deleted; a long-running instance accumulates finished
/// jobs. Readers always get a cloned snapshot, never a half-applied patch.
#[derive(Default)]
pub struct JobStore {
    jobs: Mutex<HashMap<String, Job>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, id: &str, url: &str) -> Result<(), DuplicateJob> {
        let mut jobs = self.jobs.lock();
        if jobs.contains_key(id) {
            return Err(DuplicateJob(id.to_string()));
        }
        let now = OffsetDateTime::now_utc();
        jobs.insert(
            id.to_string(),
            Job {
                id: id.to_string(),
                url: url.to_string(),
                status: JobStatus::Queued,
                created_at: now,
                updated_at: now,
                file_path: None,
                file_name: None,
                error: None,
                log: String::new(),
            },
        );
        Ok(())
    }

    /// Merge `patch` into the record and refresh `updated_at`.
    /// Unknown ids are ignored.
    pub fn patch(&self, id: &str, patch: JobPatch) {
        let mut jobs = self.jobs.lock();
        if let Some(job) = jobs.get_mut(id) {
            if let Some(status) = patch.status {
                job.status = status;
            }
            if let Some(path) = patch.file_path {
                job.file_path = Some(path);
            }
            if let Some(name) = patch.file_name {
                job.file_name = Some(name);
            }
            if let Some(error) = patch.error {
                job.error = Some(error);
            }
            job.updated_at = OffsetDateTime::now_utc();
        }
    }

    pub fn append_log(&self, id: &str, text: &str) {
        let mut jobs = self.jobs.lock();
        if let Some(job) = jobs.get_mut(id) {
            job.log.push_str(text);
            job.updated_at = OffsetDateTime::now_utc();
        }
    }

    /// Snapshot of a job, or `None` if the id is unknown.
    pub fn get(&self, id: &str) -> Option<Job> {
        self.jobs.lock().get(id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_then_get() {
        let store = JobStore::new();
        store.create("a", "https://example.com/x").unwrap();
        let job = store.get("a").unwrap();
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.url, "https://example.com/x");
        assert!(job.file_path.is_none());
        assert!(job.error.is_none());
        assert!(job.log.is_empty());
    }

    #[test]
    fn duplicate_id_rejected() {
        let store = JobStore::new();
        store.create("a", "https://example.com/x").unwrap();
        assert!(store.create("a", "https://example.com/y").is_err());
    }

    #[test]
    fn patch_merges_and_bumps_updated_at() {
        let store = JobStore::new();
        store.create("a", "https://example.com/x").unwrap();
        let before = store.get("a").unwrap().updated_at;

        store.patch(
            "a",
            JobPatch {
                status: Some(JobStatus::Downloading),
                ..Default::default()
            },
        );
        let job = store.get("a").unwrap();
        assert_eq!(job.status, JobStatus::Downloading);
        assert!(job.updated_at >= before);
        // untouched fields survive the merge
        assert_eq!(job.url, "https://example.com/x");
    }

    #[test]
    fn patch_unknown_id_is_noop() {
        let store = JobStore::new();
        store.patch(
            "missing",
            JobPatch {
                status: Some(JobStatus::Error),
                ..Default::default()
            },
        );
        assert!(store.get("missing").is_none());
    }

    #[test]
    fn append_log_concatenates() {
        let store = JobStore::new();
        store.create("a", "https://example.com/x").unwrap();
        store.append_log("a", "line one\n");
        store.append_log("a", "line two\n");
        assert_eq!(store.get("a").unwrap().log, "line one\nline two\n");
    }
}
