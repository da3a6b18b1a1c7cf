// Music-service engine backed by spotdl (single tracks or whole playlists)

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::Config;
use crate::store::JobStore;

use super::{list_files, run_logged, Engine, EngineError, EngineOutcome};

pub struct SpotdlEngine {
    bin: String,
    output_dir: PathBuf,
    store: Arc<JobStore>,
}

impl SpotdlEngine {
    pub fn new(config: &Config, store: Arc<JobStore>) -> Self {
        Self {
            bin: config.spotdl_bin.clone(),
            output_dir: config.output_dir.clone(),
            store,
        }
    }
}

#[async_trait]
impl Engine for SpotdlEngine {
    fn name(&self) -> &'static str {
        "spotdl"
    }

    async fn run(&self, job_id: &str, url: &str) -> Result<EngineOutcome, EngineError> {
        let dir = self.output_dir.join(job_id);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| EngineError::Io(format!("create {}: {}", dir.display(), e)))?;

        let args = vec![
            "download".to_string(),
            url.to_string(),
            "--output".to_string(),
            format!("{}/{{title}}.{{output-ext}}", dir.to_string_lossy()),
        ];

        run_logged(&self.store, job_id, &self.bin, &args)
            .await?
            .require_success()?;

        // Ordered delivery relies on this sort; list_files already sorts.
        let files: Vec<PathBuf> = list_files(&dir)
            .map_err(|e| EngineError::Io(format!("read {}: {}", dir.display(), e)))?;

        if files.is_empty() {
            return Err(EngineError::MissingOutput(format!(
                "spotdl exited cleanly but produced no files in {}",
                dir.display()
            )));
        }

        Ok(EngineOutcome::FileList(files))
    }
}
