// URL classification - decides which download engine handles a URL

use url::Url;

/// Routing decision for a submitted URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlKind {
    /// Plain downloadable file (video/audio/archive/image extension).
    Direct,
    /// HLS/DASH manifest that needs remuxing.
    StreamManifest,
    /// Track or playlist on a music service.
    MusicService,
    /// Everything else - handed to the general-purpose extractor.
    Generic,
}

/// Extensions we download directly instead of going through an extractor.
const DIRECT_EXTENSIONS: &[&str] = &[
    // video
    "mp4", "mkv", "webm", "avi", "mov", "flv", "ts",
    // audio
    "mp3", "flac", "wav", "m4a", "ogg", "opus", "aac",
    // archives
    "zip", "rar", "7z", "tar", "gz",
    // images / documents
    "jpg", "jpeg", "png", "gif", "webp", "pdf",
];

const MANIFEST_EXTENSIONS: &[&str] = &["m3u8", "mpd"];

const MUSIC_DOMAINS: &[&str] = &[
    "spotify.com",
    "open.spotify.com",
    "music.yandex.ru",
    "music.yandex.com",
    "deezer.com",
    "soundcloud.com",
];

/// Classify a URL. Pure and deterministic; first match wins:
/// direct extension, then manifest suffix, then music domain, then generic.
pub fn classify(url: &Url) -> UrlKind {
    let path = url.path().to_ascii_lowercase();

    if let Some((_, ext)) = path.rsplit_once('.') {
        if !ext.contains('/') {
            if DIRECT_EXTENSIONS.contains(&ext) {
                return UrlKind::Direct;
            }
            if MANIFEST_EXTENSIONS.contains(&ext) {
                return UrlKind::StreamManifest;
            }
        }
    }

    if let Some(host) = url.host_str() {
        let host = host.to_ascii_lowercase();
        let matches_domain = MUSIC_DOMAINS
            .iter()
            .any(|d| host == *d || host.ends_with(&format!(".{}", d)));
        if matches_domain {
            return UrlKind::MusicService;
        }
    }

    UrlKind::Generic
}
