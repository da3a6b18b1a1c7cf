// Download engines - one adapter per external tool

pub mod aria2;
pub mod ffmpeg;
pub mod spotdl;
pub mod ytdlp;

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

use crate::classify::UrlKind;
use crate::config::Config;
use crate::store::JobStore;

pub use aria2::Aria2Engine;
pub use ffmpeg::FfmpegEngine;
pub use spotdl::SpotdlEngine;
pub use ytdlp::YtDlpEngine;

/// Number of trailing stderr lines kept for failure diagnostics.
const STDERR_TAIL_LINES: usize = 30;

/// Normalized result of an engine run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineOutcome {
    /// The tool produced exactly one file.
    SingleFile(PathBuf),
    /// The tool produced an ordered collection of files (e.g. a playlist).
    FileList(Vec<PathBuf>),
}

#[derive(Debug, Clone)]
pub enum EngineError {
    /// Binary missing or not executable.
    Spawn(String),

    /// Process exited non-zero.
    Failed {
        code: Option<i32>,
        stderr_tail: String,
    },

    /// Zero exit but the expected output never appeared on disk.
    MissingOutput(String),

    /// Filesystem trouble while preparing or inspecting the output directory.
    Io(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spawn(msg) => write!(f, "failed to start tool: {}", msg),
            Self::Failed { code, stderr_tail } => match code {
                Some(code) => write!(f, "tool exited with code {}: {}", code, stderr_tail),
                None => write!(f, "tool killed by signal: {}", stderr_tail),
            },
            Self::MissingOutput(msg) => write!(f, "no output produced: {}", msg),
            Self::Io(msg) => write!(f, "io error: {}", msg),
        }
    }
}

impl std::error::Error for EngineError {}

/// Trait for download engine implementations.
#[async_trait]
pub trait Engine: Send + Sync {
    /// Name of the engine (for logging).
    fn name(&self) -> &'static str;

    /// Run the external tool for one job. Output must land in a job-scoped
    /// location so concurrent jobs never collide.
    async fn run(&self, job_id: &str, url: &str) -> Result<EngineOutcome, EngineError>;
}

/// One engine per routing decision.
pub struct EngineSet {
    pub generic: Arc<dyn Engine>,
    pub direct: Arc<dyn Engine>,
    pub stream: Arc<dyn Engine>,
    pub music: Arc<dyn Engine>,
}

impl EngineSet {
    pub fn from_config(config: &Config, store: Arc<JobStore>) -> Self {
        Self {
            generic: Arc::new(YtDlpEngine::new(config, store.clone())),
            direct: Arc::new(Aria2Engine::new(config, store.clone())),
            stream: Arc::new(FfmpegEngine::new(config, store.clone())),
            music: Arc::new(SpotdlEngine::new(config, store)),
        }
    }

    pub fn for_kind(&self, kind: UrlKind) -> &Arc<dyn Engine> {
        match kind {
            UrlKind::Generic => &self.generic,
            UrlKind::Direct => &self.direct,
            UrlKind::StreamManifest => &self.stream,
            UrlKind::MusicService => &self.music,
        }
    }
}

/// What a finished subprocess left behind.
#[derive(Debug)]
pub(crate) struct RunResult {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr_tail: String,
}

impl RunResult {
    /// Map a non-zero exit to `EngineError::Failed`.
    pub fn require_success(self) -> Result<Self, EngineError> {
        if self.status.success() {
            Ok(self)
        } else {
            Err(EngineError::Failed {
                code: self.status.code(),
                stderr_tail: self.stderr_tail,
            })
        }
    }
}

/// Spawn `bin` with `args`, streaming every stdout/stderr line into the
/// job's log as it arrives so a concurrent status check sees progress.
/// Captures full stdout (engines parse it) and a bounded stderr tail.
pub(crate) async fn run_logged(
    store: &Arc<JobStore>,
    job_id: &str,
    bin: &str,
    args: &[String],
) -> Result<RunResult, EngineError> {
    let mut child = Command::new(bin)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| EngineError::Spawn(format!("{}: {}", bin, e)))?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| EngineError::Spawn(format!("{}: no stdout pipe", bin)))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| EngineError::Spawn(format!("{}: no stderr pipe", bin)))?;

    let out_store = Arc::clone(store);
    let out_job = job_id.to_string();
    let stdout_task = tokio::spawn(async move {
        let mut lines = BufReader::new(stdout).lines();
        let mut captured = String::new();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    out_store.append_log(&out_job, &format!("{}\n", line));
                    captured.push_str(&line);
                    captured.push('\n');
                }
                Ok(None) => break,
                // Leave a trace instead of silently truncating the capture
                // (some tools emit non-UTF-8 bytes on stdout).
                Err(e) => {
                    out_store.append_log(&out_job, &format!("[stdout read error: {}]\n", e));
                    break;
                }
            }
        }
        captured
    });

    let err_store = Arc::clone(store);
    let err_job = job_id.to_string();
    let stderr_task = tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        let mut tail: Vec<String> = Vec::new();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    err_store.append_log(&err_job, &format!("{}\n", line));
                    if tail.len() == STDERR_TAIL_LINES {
                        tail.remove(0);
                    }
                    tail.push(line);
                }
                Ok(None) => break,
                Err(e) => {
                    err_store.append_log(&err_job, &format!("[stderr read error: {}]\n", e));
                    break;
                }
            }
        }
        tail.join("\n")
    });

    let status = child
        .wait()
        .await
        .map_err(|e| EngineError::Spawn(format!("{}: wait failed: {}", bin, e)))?;
    let stdout = stdout_task.await.unwrap_or_default();
    let stderr_tail = stderr_task.await.unwrap_or_default();

    Ok(RunResult {
        status,
        stdout,
        stderr_tail,
    })
}

/// Regular files directly under `dir`, lexicographically sorted.
pub(crate) fn list_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}
