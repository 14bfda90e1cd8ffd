//! Client for the Dropbox core HTTP API.
//!
//! Every operation is one request on [`DropboxClient`]. Chunked uploads are
//! driven by [`ChunkedUpload`], the change feed by [`DropboxClient::delta`]
//! and [`DropboxClient::longpoll_delta`].

mod client;
mod config;
mod credentials;
mod delta;
mod error;
mod oauth;
mod transfer;
mod types;
mod upload;

pub use client::{
    CopySource, DropboxClient, METADATA_LIMIT_DEFAULT, METADATA_LIMIT_MAX, MetadataOptions,
    REVISIONS_LIMIT_DEFAULT, REVISIONS_LIMIT_MAX, SEARCH_LIMIT_DEFAULT, SEARCH_LIMIT_MAX,
};
pub use config::{
    DEFAULT_API_URL, DEFAULT_CHUNK_SIZE, DEFAULT_CONTENT_URL, DEFAULT_LOCALE, DEFAULT_NOTIFY_URL,
    DropboxConfig, MAX_PUT_FILE_SIZE, Root, clamp_chunk_size,
};
pub use credentials::{CredentialProvider, StaticToken};
pub use delta::{POLL_MAX_TIMEOUT, POLL_MIN_TIMEOUT, check_poll_timeout};
pub use error::{DropboxError, Result};
pub use oauth::{OAuthClient, OAuthError, OAuthToken};
pub use transfer::ContentStream;
pub use types::{
    Account, ChunkSession, CopyRef, DeltaEntry, DeltaPage, DeltaPoll, Entry, Link, QuotaInfo,
    ThumbnailFormat, ThumbnailSize, format_date, parse_date,
};
pub use upload::{ChunkStep, ChunkedUpload};
