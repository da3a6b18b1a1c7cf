// Generic extractor engine backed by yt-dlp

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;

use crate::config::Config;
use crate::store::JobStore;

use super::{run_logged, Engine, EngineError, EngineOutcome};

pub struct YtDlpEngine {
    bin: String,
    output_dir: PathBuf,
    store: Arc<JobStore>,
}

impl YtDlpEngine {
    pub fn new(config: &Config, store: Arc<JobStore>) -> Self {
        Self {
            bin: config.ytdlp_bin.clone(),
            output_dir: config.output_dir.clone(),
            store,
        }
    }
}

#[async_trait]
impl Engine for YtDlpEngine {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    async fn run(&self, job_id: &str, url: &str) -> Result<EngineOutcome, EngineError> {
        let template = self
            .output_dir
            .join(format!("{}.%(ext)s", job_id))
            .to_string_lossy()
            .to_string();

        let args = vec![
            "--no-playlist".to_string(),
            "--newline".to_string(),
            "-f".to_string(),
            "bestvideo*+bestaudio/best".to_string(),
            "--merge-output-format".to_string(),
            "mp4".to_string(),
            "-o".to_string(),
            template,
            url.to_string(),
        ];

        let res = run_logged(&self.store, job_id, &self.bin, &args)
            .await?
            .require_success()?;

        let path = parse_output_path(&res.stdout).ok_or_else(|| {
            EngineError::MissingOutput("could not find output path in yt-dlp output".to_string())
        })?;

        // A zero exit without the file on disk is still a failure.
        if !path.is_file() {
            return Err(EngineError::MissingOutput(format!(
                "yt-dlp reported {} but the file does not exist",
                path.display()
            )));
        }

        Ok(EngineOutcome::SingleFile(path))
    }
}

lazy_static! {
    static ref MERGER_RE: Regex =
        Regex::new(r#"\[(?:Merger|ffmpeg)\] Merging formats into "(.+)""#).unwrap();
    static ref DESTINATION_RE: Regex = Regex::new(r"\[download\] Destination: (.+)").unwrap();
    static ref ALREADY_RE: Regex =
        Regex::new(r"\[download\] (.+) has already been downloaded").unwrap();
}

/// Extract the final output path from yt-dlp's stdout.
///
/// When formats get merged the merger line names the final container, which
/// supersedes the per-format `Destination:` lines. Otherwise the last
/// destination (or the "already downloaded" notice) wins.
pub fn parse_output_path(stdout: &str) -> Option<PathBuf> {
    if let Some(caps) = MERGER_RE.captures_iter(stdout).last() {
        return Some(PathBuf::from(caps[1].trim()));
    }
    if let Some(caps) = ALREADY_RE.captures_iter(stdout).last() {
        return Some(PathBuf::from(caps[1].trim()));
    }
    if let Some(caps) = DESTINATION_RE.captures_iter(stdout).last() {
        return Some(PathBuf::from(caps[1].trim()));
    }
    None
}
