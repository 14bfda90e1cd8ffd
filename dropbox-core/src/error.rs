use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DropboxError {
    #[error("authentication required")]
    NotAuthenticated,
    #[error("not found")]
    NotFound,
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("unsupported media: {0}")]
    UnsupportedMedia(String),
    #[error("malformed reply: {0}")]
    MalformedReply(String),
    #[error(
        "could not upload {size} bytes with a single request (limit is {limit}), use upload_by_chunk instead"
    )]
    SizeLimitExceeded { size: u64, limit: u64 },
    #[error("value {value} out of range [{min}; {max}]")]
    OutOfRange { value: u32, min: u32, max: u32 },
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("api returned {status}: {body}")]
    Api { status: StatusCode, body: String },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("base url cannot carry a path: {0}")]
    InvalidBaseUrl(String),
    #[error("invalid date: {0}")]
    Date(#[from] time::error::Parse),
    #[error("could not format date: {0}")]
    DateFormat(#[from] time::error::Format),
}

pub type Result<T> = std::result::Result<T, DropboxError>;

impl From<serde_json::Error> for DropboxError {
    fn from(err: serde_json::Error) -> Self {
        DropboxError::MalformedReply(err.to_string())
    }
}

/// Body sent with 400 and 405 replies. The `error` member is either a plain
/// message or an object mapping a parameter name to the reason it was refused.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: serde_json::Value,
}

pub(crate) fn bad_request_from_body(status: StatusCode, body: &[u8]) -> DropboxError {
    let envelope: ErrorEnvelope = match serde_json::from_slice(body) {
        Ok(envelope) => envelope,
        Err(err) => return err.into(),
    };
    let message = match envelope.error {
        serde_json::Value::String(message) => message,
        serde_json::Value::Object(params) => {
            params
                .iter()
                .filter_map(|(param, reason)| reason.as_str().map(|reason| (param, reason)))
                .min_by(|a, b| a.0.cmp(b.0))
                .map(|(param, reason)| format!("{param}: {reason}"))
                .unwrap_or_else(|| "wrong parameter".to_string())
        }
        _ => format!("request error HTTP code {}", status.as_u16()),
    };
    DropboxError::BadRequest(message)
}

/// Maps a non-success reply to the matching error kind. The body has already
/// been read in full by the caller.
pub(crate) fn error_from_status(status: StatusCode, body: &[u8]) -> DropboxError {
    match status {
        StatusCode::NOT_FOUND => DropboxError::NotFound,
        StatusCode::UNAUTHORIZED => DropboxError::NotAuthenticated,
        StatusCode::BAD_REQUEST | StatusCode::METHOD_NOT_ALLOWED => {
            bad_request_from_body(status, body)
        }
        _ => DropboxError::Api {
            status,
            body: String::from_utf8_lossy(body).into_owned(),
        },
    }
}
