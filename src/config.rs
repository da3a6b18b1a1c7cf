// Environment-level configuration

use std::path::PathBuf;

/// Runtime settings, read once at startup.
///
/// Everything has a default except the chat credentials; binaries are
/// resolved through `PATH` unless overridden.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub max_concurrent: usize,
    pub cleanup_minutes: u64,
    pub output_dir: PathBuf,

    pub ytdlp_bin: String,
    pub aria2c_bin: String,
    pub ffmpeg_bin: String,
    pub spotdl_bin: String,

    pub bot_token: String,
    pub chat_id: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            max_concurrent: 1,
            cleanup_minutes: 30,
            output_dir: PathBuf::from("downloads"),
            ytdlp_bin: "yt-dlp".to_string(),
            aria2c_bin: "aria2c".to_string(),
            ffmpeg_bin: "ffmpeg".to_string(),
            spotdl_bin: "spotdl".to_string(),
            bot_token: String::new(),
            chat_id: String::new(),
        }
    }
}

impl Config {
    /// Load from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(port) = env_parse("FETCHBOT_PORT") {
            config.port = port;
        }
        if let Some(n) = env_parse::<usize>("FETCHBOT_MAX_CONCURRENT") {
            config.max_concurrent = n.max(1);
        }
        if let Some(minutes) = env_parse::<u64>("FETCHBOT_CLEANUP_MINUTES") {
            // anything below a minute would race the upload itself
            config.cleanup_minutes = minutes.max(1);
        }
        if let Some(dir) = env_string("FETCHBOT_OUTPUT_DIR") {
            config.output_dir = PathBuf::from(dir);
        }

        if let Some(bin) = env_string("YTDLP_BIN") {
            config.ytdlp_bin = bin;
        }
        if let Some(bin) = env_string("ARIA2C_BIN") {
            config.aria2c_bin = bin;
        }
        if let Some(bin) = env_string("FFMPEG_BIN") {
            config.ffmpeg_bin = bin;
        }
        if let Some(bin) = env_string("SPOTDL_BIN") {
            config.spotdl_bin = bin;
        }

        if let Some(token) = env_string("TELEGRAM_BOT_TOKEN") {
            config.bot_token = token;
        }
        if let Some(chat_id) = env_string("TELEGRAM_CHAT_ID") {
            config.chat_id = chat_id;
        }

        config
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env_string(name).and_then(|v| v.parse().ok())
}
