use std::time::Duration;

use log::debug;
use reqwest::Method;

use crate::client::{DropboxClient, Host, Params, append_params, decode_response};
use crate::error::{DropboxError, Result};
use crate::types::{DeltaPage, DeltaPoll, RawDeltaPage};

pub const POLL_MIN_TIMEOUT: u32 = 30;
pub const POLL_MAX_TIMEOUT: u32 = 480;

/// Server-side default when no timeout is sent.
const POLL_DEFAULT_TIMEOUT: u32 = 30;
/// Slack on top of the poll timeout before the connection itself is abandoned.
const POLL_GRACE: Duration = Duration::from_secs(90);

impl DropboxClient {
    /// Fetches one page of changes since `cursor`; an empty cursor starts from
    /// the beginning. While `has_more` is set, call again with the returned cursor.
    pub async fn delta(&self, cursor: &str, path_prefix: Option<&str>) -> Result<DeltaPage> {
        let url = self.endpoint(Host::Api, "delta", None)?;
        let mut params: Params = Vec::new();
        if !cursor.is_empty() {
            params.push(("cursor", cursor.to_string()));
        }
        if let Some(prefix) = path_prefix.filter(|prefix| !prefix.is_empty()) {
            params.push(("path_prefix", prefix.to_string()));
        }
        let raw: RawDeltaPage = self.do_request(Method::POST, url, Some(params)).await?;
        let page = raw.into_page()?;
        debug!(
            "delta page: {} entries, reset={}, has_more={}",
            page.entries.len(),
            page.reset,
            page.has_more
        );
        Ok(page)
    }

    /// Follows `has_more` until the feed is drained and merges the pages.
    ///
    /// A page with `reset` drops whatever earlier pages contributed, so the
    /// result always describes changes relative to the state it asks to keep.
    pub async fn delta_all(&self, cursor: &str, path_prefix: Option<&str>) -> Result<DeltaPage> {
        let mut merged = DeltaPage::default();
        let mut cursor = cursor.to_string();
        loop {
            let page = self.delta(&cursor, path_prefix).await?;
            if page.reset {
                merged.reset = true;
                merged.entries.clear();
            }
            merged.entries.extend(page.entries);
            merged.cursor = page.cursor;
            if !page.has_more {
                return Ok(merged);
            }
            cursor = merged.cursor.clone();
        }
    }

    /// Blocks until the feed behind `cursor` changes or `timeout` seconds pass.
    ///
    /// The notify endpoint takes no credentials. A timeout of `None` or `0`
    /// leaves the choice to the server; other values must lie in
    /// [`POLL_MIN_TIMEOUT`], [`POLL_MAX_TIMEOUT`].
    pub async fn longpoll_delta(&self, cursor: &str, timeout: Option<u32>) -> Result<DeltaPoll> {
        let timeout = timeout.filter(|secs| *secs != 0);
        let mut params: Params = Vec::new();
        if let Some(secs) = timeout {
            check_poll_timeout(secs)?;
            params.push(("timeout", secs.to_string()));
        }
        params.push(("cursor", cursor.to_string()));

        let mut url = self.endpoint(Host::Notify, "longpoll_delta", None)?;
        append_params(&mut url, &params);
        let wait = Duration::from_secs(u64::from(timeout.unwrap_or(POLL_DEFAULT_TIMEOUT)));
        debug!("long-poll for up to {}s", wait.as_secs());

        let response = self
            .http
            .request(Method::GET, url)
            .timeout(wait + POLL_GRACE)
            .send()
            .await?;
        decode_response(response).await
    }
}

pub fn check_poll_timeout(secs: u32) -> Result<()> {
    if (POLL_MIN_TIMEOUT..=POLL_MAX_TIMEOUT).contains(&secs) {
        Ok(())
    } else {
        Err(DropboxError::OutOfRange {
            value: secs,
            min: POLL_MIN_TIMEOUT,
            max: POLL_MAX_TIMEOUT,
        })
    }
}
