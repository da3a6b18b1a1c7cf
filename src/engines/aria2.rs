// Direct-file engine backed by aria2c

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::Config;
use crate::store::JobStore;

use super::{list_files, run_logged, Engine, EngineError, EngineOutcome};

pub struct Aria2Engine {
    bin: String,
    output_dir: PathBuf,
    store: Arc<JobStore>,
}

impl Aria2Engine {
    pub fn new(config: &Config, store: Arc<JobStore>) -> Self {
        Self {
            bin: config.aria2c_bin.clone(),
            output_dir: config.output_dir.clone(),
            store,
        }
    }
}

#[async_trait]
impl Engine for Aria2Engine {
    fn name(&self) -> &'static str {
        "aria2c"
    }

    async fn run(&self, job_id: &str, url: &str) -> Result<EngineOutcome, EngineError> {
        // Job-scoped directory so concurrent downloads never collide.
        let dir = self.output_dir.join(job_id);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| EngineError::Io(format!("create {}: {}", dir.display(), e)))?;

        let args = vec![
            "--dir".to_string(),
            dir.to_string_lossy().to_string(),
            "--continue=true".to_string(),
            "--allow-overwrite=true".to_string(),
            "--auto-file-renaming=false".to_string(),
            url.to_string(),
        ];

        run_logged(&self.store, job_id, &self.bin, &args)
            .await?
            .require_success()?;

        let files = list_files(&dir)
            .map_err(|e| EngineError::Io(format!("read {}: {}", dir.display(), e)))?;

        // More than one file here is possible (metalinks). We take the
        // lexicographically smallest so the choice is at least deterministic.
        match files.into_iter().next() {
            Some(path) => Ok(EngineOutcome::SingleFile(path)),
            None => Err(EngineError::MissingOutput(format!(
                "aria2c exited cleanly but {} is empty",
                dir.display()
            ))),
        }
    }
}
