// Chat delivery - text notifications and file uploads

use std::fmt;
use std::path::Path;

use async_trait::async_trait;
use serde_json::json;

#[derive(Debug, Clone)]
pub enum NotifyError {
    /// Transport-level failure (connect, TLS, timeout).
    Http(String),
    /// The chat API answered with a non-success status.
    Api { status: u16, body: String },
    /// Could not read the file to upload.
    Io(String),
}

impl fmt::Display for NotifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(msg) => write!(f, "request failed: {}", msg),
            Self::Api { status, body } => write!(f, "chat API returned {}: {}", status, body),
            Self::Io(msg) => write!(f, "cannot read upload: {}", msg),
        }
    }
}

impl std::error::Error for NotifyError {}

/// The two operations the job pipeline needs from the chat side.
#[async_trait]
pub trait Notify: Send + Sync {
    async fn send_text(&self, text: &str) -> Result<(), NotifyError>;

    async fn send_file(&self, path: &Path, caption: &str) -> Result<(), NotifyError>;
}

/// Telegram Bot API notifier.
pub struct TelegramNotifier {
    http: reqwest::Client,
    base_url: String,
    token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(token: String, chat_id: String) -> Self {
        Self::with_base_url("https://api.telegram.org".to_string(), token, chat_id)
    }

    /// Point at a different API host (tests run against a local stand-in).
    pub fn with_base_url(base_url: String, token: String, chat_id: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            token,
            chat_id,
        }
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, self.token, method)
    }

    async fn check(&self, response: reqwest::Response) -> Result<(), NotifyError> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(NotifyError::Api {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl Notify for TelegramNotifier {
    async fn send_text(&self, text: &str) -> Result<(), NotifyError> {
        let response = self
            .http
            .post(self.endpoint("sendMessage"))
            .json(&json!({ "chat_id": self.chat_id, "text": text }))
            .send()
            .await
            .map_err(|e| NotifyError::Http(e.to_string()))?;
        self.check(response).await
    }

    async fn send_file(&self, path: &Path, caption: &str) -> Result<(), NotifyError> {
        // Stream from disk; downloads can be far bigger than we want in memory.
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| NotifyError::Io(format!("{}: {}", path.display(), e)))?;
        let file = tokio::fs::File::open(path)
            .await
            .map_err(|e| NotifyError::Io(format!("{}: {}", path.display(), e)))?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "file".to_string());

        let body = reqwest::Body::wrap_stream(tokio_util::io::ReaderStream::new(file));
        let part = reqwest::multipart::Part::stream_with_length(body, metadata.len())
            .file_name(file_name);
        let form = reqwest::multipart::Form::new()
            .text("chat_id", self.chat_id.clone())
            .text("caption", caption.to_string())
            .part("document", part);

        let response = self
            .http
            .post(self.endpoint("sendDocument"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| NotifyError::Http(e.to_string()))?;
        self.check(response).await
    }
}
