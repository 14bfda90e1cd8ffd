use std::path::Path;

use log::debug;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Body, Method};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::io::ReaderStream;

use crate::client::{DropboxClient, Host, Params, append_params, decode_response};
use crate::config::{MAX_PUT_FILE_SIZE, clamp_chunk_size};
use crate::error::{DropboxError, Result};
use crate::types::{ChunkSession, Entry};

/// Outcome of sending one chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkStep {
    pub session: ChunkSession,
    /// Bytes taken from the source by this step.
    pub sent: usize,
    /// The source returned fewer bytes than a full chunk, so nothing is left to send.
    pub end_of_input: bool,
}

impl DropboxClient {
    /// Sends the next chunk of `source`, opening a new upload session when
    /// `session` is `None`.
    pub async fn chunked_upload<R>(
        &self,
        session: Option<&ChunkSession>,
        source: &mut R,
        chunk_size: usize,
    ) -> Result<ChunkStep>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let mut url = self.endpoint(Host::Content, "chunked_upload", None)?;
        if let Some(session) = session {
            append_params(
                &mut url,
                &[
                    ("upload_id", session.upload_id.clone()),
                    ("offset", session.offset.to_string()),
                ],
            );
        }
        // Nothing is taken from the source until the request can be sent.
        let request = self.authorized(Method::POST, url)?;

        let chunk_size = clamp_chunk_size(chunk_size);
        let mut chunk = Vec::new();
        source.take(chunk_size as u64).read_to_end(&mut chunk).await?;
        let sent = chunk.len();

        let response = request
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(chunk)
            .send()
            .await?;
        let session: ChunkSession = decode_response(response).await?;
        debug!(
            "chunk of {sent} bytes accepted for upload {}, offset {}",
            session.upload_id, session.offset
        );

        Ok(ChunkStep {
            session,
            sent,
            end_of_input: sent < chunk_size,
        })
    }

    /// Gives the bytes of upload session `upload_id` a name.
    pub async fn commit_chunked_upload(
        &self,
        upload_id: &str,
        dst: &str,
        overwrite: bool,
        parent_rev: Option<&str>,
    ) -> Result<Entry> {
        let mut url = self.endpoint(Host::Content, "commit_chunked_upload", Some(dst))?;
        let mut params: Params = vec![
            ("locale", self.config.locale.clone()),
            ("upload_id", upload_id.to_string()),
            ("overwrite", overwrite.to_string()),
        ];
        if let Some(parent_rev) = parent_rev.filter(|rev| !rev.is_empty()) {
            params.push(("parent_rev", parent_rev.to_string()));
        }
        append_params(&mut url, &params);
        debug!("commit upload {upload_id} to {dst}");
        let response = self.authorized(Method::POST, url)?.send().await?;
        decode_response(response).await
    }

    /// Uploads everything `source` yields in chunks of `chunk_size` bytes, then commits it to `dst`.
    pub async fn upload_by_chunk<R>(
        &self,
        source: &mut R,
        chunk_size: usize,
        dst: &str,
        overwrite: bool,
        parent_rev: Option<&str>,
    ) -> Result<Entry>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let mut upload = ChunkedUpload::start(self, chunk_size);
        while !upload.send_chunk(source).await? {}
        upload.commit(dst, overwrite, parent_rev).await
    }

    /// Uploads `size` bytes of `source` with a single request.
    pub async fn files_put<R>(
        &self,
        source: R,
        size: u64,
        dst: &str,
        overwrite: bool,
        parent_rev: Option<&str>,
    ) -> Result<Entry>
    where
        R: AsyncRead + Send + 'static,
    {
        if size > MAX_PUT_FILE_SIZE as u64 {
            return Err(DropboxError::SizeLimitExceeded {
                size,
                limit: MAX_PUT_FILE_SIZE as u64,
            });
        }
        let mut url = self.endpoint(Host::Content, "files_put", Some(dst))?;
        let mut params: Params = vec![("overwrite", overwrite.to_string())];
        if let Some(parent_rev) = parent_rev.filter(|rev| !rev.is_empty()) {
            params.push(("parent_rev", parent_rev.to_string()));
        }
        append_params(&mut url, &params);
        debug!("put {size} bytes to {dst}");

        let body = Body::wrap_stream(ReaderStream::new(source.take(size)));
        let response = self
            .authorized(Method::PUT, url)?
            .header(CONTENT_LENGTH, size)
            .body(body)
            .send()
            .await?;
        decode_response(response).await
    }

    /// Uploads a local file, in one request when it fits and in chunks otherwise.
    pub async fn upload_file(
        &self,
        src: &Path,
        dst: &str,
        overwrite: bool,
        parent_rev: Option<&str>,
    ) -> Result<Entry> {
        let mut file = tokio::fs::File::open(src).await?;
        let size = file.metadata().await?.len();
        if size > MAX_PUT_FILE_SIZE as u64 {
            let chunk_size = self.config.chunk_size;
            return self
                .upload_by_chunk(&mut file, chunk_size, dst, overwrite, parent_rev)
                .await;
        }
        self.files_put(file, size, dst, overwrite, parent_rev).await
    }
}

/// Client-side state of one chunked upload.
///
/// The session is threaded through every chunk and consumed by `commit`, so a
/// committed upload cannot be continued.
#[derive(Debug)]
pub struct ChunkedUpload<'a> {
    client: &'a DropboxClient,
    session: Option<ChunkSession>,
    chunk_size: usize,
    finished: bool,
}

impl<'a> ChunkedUpload<'a> {
    pub fn start(client: &'a DropboxClient, chunk_size: usize) -> Self {
        Self {
            client,
            session: None,
            chunk_size: clamp_chunk_size(chunk_size),
            finished: false,
        }
    }

    /// Continues an interrupted upload. The source passed to `send_chunk` must
    /// be positioned at `session.offset`.
    pub fn resume(client: &'a DropboxClient, session: ChunkSession, chunk_size: usize) -> Self {
        Self {
            client,
            session: Some(session),
            chunk_size: clamp_chunk_size(chunk_size),
            finished: false,
        }
    }

    pub fn session(&self) -> Option<&ChunkSession> {
        self.session.as_ref()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Sends one chunk and returns `true` once the source is exhausted.
    pub async fn send_chunk<R>(&mut self, source: &mut R) -> Result<bool>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        if self.finished {
            return Ok(true);
        }
        let step = self
            .client
            .chunked_upload(self.session.as_ref(), source, self.chunk_size)
            .await?;
        self.session = Some(step.session);
        self.finished = step.end_of_input;
        Ok(self.finished)
    }

    /// Names the uploaded bytes `dst`. Without any chunk sent yet, an empty
    /// chunk opens the session first, which produces an empty file.
    pub async fn commit(
        self,
        dst: &str,
        overwrite: bool,
        parent_rev: Option<&str>,
    ) -> Result<Entry> {
        let session = match self.session {
            Some(session) => session,
            None => {
                self.client
                    .chunked_upload(None, &mut tokio::io::empty(), self.chunk_size)
                    .await?
                    .session
            }
        };
        self.client
            .commit_chunked_upload(&session.upload_id, dst, overwrite, parent_rev)
            .await
    }
}
