use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://api.dropbox.com/1";
pub const DEFAULT_CONTENT_URL: &str = "https://api-content.dropbox.com/1";
pub const DEFAULT_NOTIFY_URL: &str = "https://api-notify.dropbox.com/1";
pub const DEFAULT_LOCALE: &str = "en";

/// Default size of one chunk sent by the chunked upload.
pub const DEFAULT_CHUNK_SIZE: usize = 4 * 1024 * 1024;
/// Largest body accepted by `files_put`, and the upper bound of a chunk.
pub const MAX_PUT_FILE_SIZE: usize = 150 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Root {
    #[default]
    Dropbox,
    Sandbox,
}

impl Root {
    pub fn as_str(self) -> &'static str {
        match self {
            Root::Dropbox => "dropbox",
            Root::Sandbox => "sandbox",
        }
    }
}

impl fmt::Display for Root {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Root {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "dropbox" => Ok(Root::Dropbox),
            "sandbox" | "app_folder" => Ok(Root::Sandbox),
            other => Err(format!("unknown root '{other}', expected dropbox or sandbox")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DropboxConfig {
    pub root: Root,
    pub locale: String,
    pub api_url: String,
    pub content_url: String,
    pub notify_url: String,
    pub chunk_size: usize,
    /// Per-request timeout for regular calls. Long-poll lifts it for its own request.
    pub timeout: Option<Duration>,
}

impl Default for DropboxConfig {
    fn default() -> Self {
        Self {
            root: Root::Dropbox,
            locale: DEFAULT_LOCALE.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            content_url: DEFAULT_CONTENT_URL.to_string(),
            notify_url: DEFAULT_NOTIFY_URL.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            timeout: None,
        }
    }
}

impl DropboxConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            root: read_env("DROPBOX_ROOT")
                .and_then(|value| value.parse().ok())
                .unwrap_or(defaults.root),
            locale: read_env("DROPBOX_LOCALE").unwrap_or(defaults.locale),
            api_url: read_env("DROPBOX_API_URL").unwrap_or(defaults.api_url),
            content_url: read_env("DROPBOX_CONTENT_URL").unwrap_or(defaults.content_url),
            notify_url: read_env("DROPBOX_NOTIFY_URL").unwrap_or(defaults.notify_url),
            chunk_size: clamp_chunk_size(read_usize_env("DROPBOX_CHUNK_SIZE", 0)),
            timeout: read_env("DROPBOX_TIMEOUT_SECS")
                .and_then(|value| value.parse::<u64>().ok())
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
        }
    }

    /// Points every endpoint family at the same server.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.api_url = base_url.to_string();
        self.content_url = base_url.to_string();
        self.notify_url = base_url.to_string();
        self
    }

    pub fn with_root(mut self, root: Root) -> Self {
        self.root = root;
        self
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = clamp_chunk_size(chunk_size);
        self
    }
}

/// Zero selects the default; anything above the single-request limit is cut down to it.
pub fn clamp_chunk_size(chunk_size: usize) -> usize {
    if chunk_size == 0 {
        DEFAULT_CHUNK_SIZE
    } else {
        chunk_size.min(MAX_PUT_FILE_SIZE)
    }
}

fn read_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn read_usize_env(name: &str, default: usize) -> usize {
    read_env(name)
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_size_is_clamped() {
        assert_eq!(clamp_chunk_size(0), DEFAULT_CHUNK_SIZE);
        assert_eq!(clamp_chunk_size(1), 1);
        assert_eq!(clamp_chunk_size(MAX_PUT_FILE_SIZE), MAX_PUT_FILE_SIZE);
        assert_eq!(clamp_chunk_size(MAX_PUT_FILE_SIZE + 1), MAX_PUT_FILE_SIZE);
    }

    #[test]
    fn root_parses_known_names() {
        assert_eq!("dropbox".parse::<Root>().unwrap(), Root::Dropbox);
        assert_eq!(" Sandbox ".parse::<Root>().unwrap(), Root::Sandbox);
        assert!("home".parse::<Root>().is_err());
        assert_eq!(Root::Sandbox.to_string(), "sandbox");
    }

    #[test]
    fn base_url_override_covers_all_endpoints() {
        let config = DropboxConfig::default().with_base_url("http://127.0.0.1:9000");
        assert_eq!(config.api_url, "http://127.0.0.1:9000");
        assert_eq!(config.content_url, "http://127.0.0.1:9000");
        assert_eq!(config.notify_url, "http://127.0.0.1:9000");
        assert_eq!(config.locale, DEFAULT_LOCALE);
    }

    #[test]
    fn with_chunk_size_clamps() {
        let config = DropboxConfig::default().with_chunk_size(usize::MAX);
        assert_eq!(config.chunk_size, MAX_PUT_FILE_SIZE);
    }
}
