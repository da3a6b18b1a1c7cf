// Streaming-manifest engine backed by ffmpeg (stream copy, no re-encode)

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::Config;
use crate::store::JobStore;

use super::{run_logged, Engine, EngineError, EngineOutcome};

pub struct FfmpegEngine {
    bin: String,
    output_dir: PathBuf,
    store: Arc<JobStore>,
}

impl FfmpegEngine {
    pub fn new(config: &Config, store: Arc<JobStore>) -> Self {
        Self {
            bin: config.ffmpeg_bin.clone(),
            output_dir: config.output_dir.clone(),
            store,
        }
    }
}

#[async_trait]
impl Engine for FfmpegEngine {
    fn name(&self) -> &'static str {
        "ffmpeg"
    }

    async fn run(&self, job_id: &str, url: &str) -> Result<EngineOutcome, EngineError> {
        let output = self.output_dir.join(format!("{}.mp4", job_id));

        let args = vec![
            "-y".to_string(),
            "-i".to_string(),
            url.to_string(),
            "-c".to_string(),
            "copy".to_string(),
            output.to_string_lossy().to_string(),
        ];

        run_logged(&self.store, job_id, &self.bin, &args)
            .await?
            .require_success()?;

        if !output.is_file() {
            return Err(EngineError::MissingOutput(format!(
                "ffmpeg exited cleanly but {} does not exist",
                output.display()
            )));
        }

        Ok(EngineOutcome::SingleFile(output))
    }
}
