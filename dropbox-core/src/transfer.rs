use std::path::Path;

use log::{debug, warn};
use reqwest::header::RANGE;
use reqwest::{Method, Response, StatusCode};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::client::{DropboxClient, Host, Params, append_params};
use crate::error::{DropboxError, Result, error_from_status};
use crate::types::{Entry, ThumbnailFormat, ThumbnailSize};

const METADATA_HEADER: &str = "x-dropbox-metadata";

/// Body of a download, released when dropped.
#[derive(Debug)]
pub struct ContentStream {
    response: Response,
    metadata: Option<Entry>,
}

impl ContentStream {
    pub fn content_length(&self) -> Option<u64> {
        self.response.content_length()
    }

    /// Metadata sent along with thumbnails.
    pub fn metadata(&self) -> Option<&Entry> {
        self.metadata.as_ref()
    }

    /// Whether the server honoured the requested range.
    pub fn is_partial(&self) -> bool {
        self.response.status() == StatusCode::PARTIAL_CONTENT
    }

    pub fn into_response(self) -> Response {
        self.response
    }

    /// Copies the remaining body into `sink` and returns the number of bytes written.
    pub async fn write_to<W>(mut self, sink: &mut W) -> Result<u64>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let mut written = 0u64;
        while let Some(chunk) = self.response.chunk().await? {
            sink.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        sink.flush().await?;
        Ok(written)
    }
}

impl DropboxClient {
    /// Starts downloading `path`, optionally at revision `rev`, skipping the
    /// first `offset` bytes.
    pub async fn download(&self, path: &str, rev: Option<&str>, offset: u64) -> Result<ContentStream> {
        let mut url = self.endpoint(Host::Content, "files", Some(path))?;
        if let Some(rev) = rev.filter(|rev| !rev.is_empty()) {
            append_params(&mut url, &[("rev", rev.to_string())]);
        }
        debug!("download {path} from offset {offset}");
        let mut request = self.authorized(Method::GET, url)?;
        if offset != 0 {
            request = request.header(RANGE, format!("bytes={offset}-"));
        }
        let response = request.send().await?;
        match response.status() {
            StatusCode::OK | StatusCode::PARTIAL_CONTENT => Ok(ContentStream {
                response,
                metadata: None,
            }),
            status => {
                let body = response.bytes().await?;
                Err(error_from_status(status, &body))
            }
        }
    }

    /// Downloads `path` into `dst`, truncating it first. Nothing is left at
    /// `dst` when the transfer fails.
    pub async fn download_to_file(&self, path: &str, dst: &Path, rev: Option<&str>) -> Result<u64> {
        let result = {
            let mut file = tokio::fs::File::create(dst).await?;
            match self.download(path, rev, 0).await {
                Ok(stream) => stream.write_to(&mut file).await,
                Err(err) => Err(err),
            }
        };
        remove_on_error(result, dst).await
    }

    /// Appends the part of `path` missing from `dst`. Whatever was received is
    /// kept on failure, so calling again continues where it stopped.
    ///
    /// A file that is already complete yields `0`. When the server answers
    /// with the whole file instead of the missing range, `dst` is rewritten
    /// from the start.
    pub async fn download_to_file_resume(
        &self,
        path: &str,
        dst: &Path,
        rev: Option<&str>,
    ) -> Result<u64> {
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(dst)
            .await?;
        let offset = file.metadata().await?.len();
        let stream = match self.download(path, rev, offset).await {
            Ok(stream) => stream,
            Err(DropboxError::Api { status, .. })
                if offset > 0 && status == StatusCode::RANGE_NOT_SATISFIABLE =>
            {
                debug!("{} already holds all of {path}", dst.display());
                return Ok(0);
            }
            Err(err) => return Err(err),
        };
        if offset > 0 && !stream.is_partial() {
            warn!("range ignored for {path}, rewriting {}", dst.display());
            file.set_len(0).await?;
        }
        stream.write_to(&mut file).await
    }

    pub async fn thumbnail(
        &self,
        path: &str,
        format: ThumbnailFormat,
        size: ThumbnailSize,
    ) -> Result<ContentStream> {
        let mut url = self.endpoint(Host::Content, "thumbnails", Some(path))?;
        let params: Params = vec![
            ("format", format.as_str().to_string()),
            ("size", size.as_str().to_string()),
        ];
        append_params(&mut url, &params);
        debug!("thumbnail {path} ({}, {})", format.as_str(), size.as_str());
        let response = self.authorized(Method::GET, url)?.send().await?;
        match response.status() {
            StatusCode::OK => {
                let metadata = response
                    .headers()
                    .get(METADATA_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .and_then(|value| serde_json::from_str(value).ok());
                Ok(ContentStream { response, metadata })
            }
            StatusCode::UNSUPPORTED_MEDIA_TYPE => Err(DropboxError::UnsupportedMedia(format!(
                "the image located at '{path}' cannot be converted to a thumbnail"
            ))),
            status => {
                let body = response.bytes().await?;
                Err(error_from_status(status, &body))
            }
        }
    }

    /// Writes the thumbnail of `path` to `dst`, removing `dst` on failure.
    pub async fn thumbnail_to_file(
        &self,
        path: &str,
        dst: &Path,
        format: ThumbnailFormat,
        size: ThumbnailSize,
    ) -> Result<Option<Entry>> {
        let result = {
            let mut file = tokio::fs::File::create(dst).await?;
            match self.thumbnail(path, format, size).await {
                Ok(mut stream) => {
                    let metadata = stream.metadata.take();
                    stream.write_to(&mut file).await.map(|_| metadata)
                }
                Err(err) => Err(err),
            }
        };
        remove_on_error(result, dst).await
    }
}

async fn remove_on_error<T>(result: Result<T>, dst: &Path) -> Result<T> {
    if result.is_err() {
        warn!("removing partially written {}", dst.display());
        if let Err(err) = tokio::fs::remove_file(dst).await {
            warn!("could not remove {}: {err}", dst.display());
        }
    }
    result
}
