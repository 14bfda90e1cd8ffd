use std::sync::Arc;

use log::debug;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use crate::config::DropboxConfig;
use crate::credentials::{CredentialProvider, StaticToken};
use crate::error::{DropboxError, Result, error_from_status};
use crate::types::{Account, CopyRef, Entry, Link};

pub const METADATA_LIMIT_DEFAULT: u32 = 10_000;
pub const METADATA_LIMIT_MAX: u32 = 25_000;
pub const REVISIONS_LIMIT_DEFAULT: u32 = 10;
pub const REVISIONS_LIMIT_MAX: u32 = 1_000;
pub const SEARCH_LIMIT_DEFAULT: u32 = 1_000;
pub const SEARCH_LIMIT_MAX: u32 = 1_000;

/// Ordered query parameters of one call.
pub(crate) type Params = Vec<(&'static str, String)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Host {
    Api,
    Content,
    Notify,
}

#[derive(Clone)]
pub struct DropboxClient {
    pub(crate) http: Client,
    pub(crate) config: DropboxConfig,
    api_url: Url,
    content_url: Url,
    notify_url: Url,
    credentials: Arc<dyn CredentialProvider>,
}

impl std::fmt::Debug for DropboxClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DropboxClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Options of a metadata query. `file_limit` of `None` or `0` selects the default.
#[derive(Debug, Clone, Default)]
pub struct MetadataOptions {
    pub list: bool,
    pub include_deleted: bool,
    /// Folder hash from a previous listing.
    pub hash: Option<String>,
    pub rev: Option<String>,
    pub file_limit: Option<u32>,
}

/// Where a copy takes its content from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopySource<'a> {
    Path(&'a str),
    /// A reference obtained from `copy_ref`, possibly from another account.
    Ref(&'a str),
}

impl DropboxClient {
    pub fn new(token: impl Into<String>) -> Result<Self> {
        Self::with_config(DropboxConfig::default(), StaticToken::new(token))
    }

    pub fn with_base_url(base_url: &str, token: impl Into<String>) -> Result<Self> {
        Self::with_config(
            DropboxConfig::default().with_base_url(base_url),
            StaticToken::new(token),
        )
    }

    pub fn with_config(
        config: DropboxConfig,
        credentials: impl CredentialProvider + 'static,
    ) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            http: builder.build()?,
            api_url: Url::parse(&config.api_url)?,
            content_url: Url::parse(&config.content_url)?,
            notify_url: Url::parse(&config.notify_url)?,
            config,
            credentials: Arc::new(credentials),
        })
    }

    /// Same configuration and connection pool, other credentials.
    pub fn with_credentials(&self, credentials: impl CredentialProvider + 'static) -> Self {
        Self {
            credentials: Arc::new(credentials),
            ..self.clone()
        }
    }

    pub fn config(&self) -> &DropboxConfig {
        &self.config
    }

    pub async fn account_info(&self) -> Result<Account> {
        let url = self.endpoint(Host::Api, "account/info", None)?;
        self.do_request(Method::GET, url, None).await
    }

    /// Shareable link to a file or folder.
    pub async fn shares(&self, path: &str, short_url: bool) -> Result<Link> {
        let url = self.endpoint(Host::Api, "shares", Some(path))?;
        let params = short_url.then(|| vec![("short_url", true.to_string())]);
        self.do_request(Method::POST, url, params).await
    }

    /// Direct streaming link to a file.
    pub async fn media(&self, path: &str) -> Result<Link> {
        let url = self.endpoint(Host::Api, "media", Some(path))?;
        self.do_request(Method::POST, url, None).await
    }

    pub async fn search(
        &self,
        path: &str,
        query: &str,
        file_limit: Option<u32>,
        include_deleted: bool,
    ) -> Result<Vec<Entry>> {
        let url = self.endpoint(Host::Api, "search", Some(path))?;
        let file_limit = clamp_limit(file_limit, SEARCH_LIMIT_DEFAULT, SEARCH_LIMIT_MAX);
        let params = vec![
            ("query", query.to_string()),
            ("file_limit", file_limit.to_string()),
            ("include_deleted", include_deleted.to_string()),
        ];
        self.do_request(Method::GET, url, Some(params)).await
    }

    pub async fn metadata(&self, path: &str, options: &MetadataOptions) -> Result<Entry> {
        let url = self.endpoint(Host::Api, "metadata", Some(path))?;
        let file_limit = clamp_limit(
            options.file_limit,
            METADATA_LIMIT_DEFAULT,
            METADATA_LIMIT_MAX,
        );
        let mut params = vec![
            ("list", options.list.to_string()),
            ("include_deleted", options.include_deleted.to_string()),
            ("file_limit", file_limit.to_string()),
        ];
        if let Some(rev) = options.rev.as_deref().filter(|rev| !rev.is_empty()) {
            params.push(("rev", rev.to_string()));
        }
        if let Some(hash) = options.hash.as_deref().filter(|hash| !hash.is_empty()) {
            params.push(("hash", hash.to_string()));
        }
        self.do_request(Method::GET, url, Some(params)).await
    }

    pub async fn copy_ref(&self, path: &str) -> Result<CopyRef> {
        let url = self.endpoint(Host::Api, "copy_ref", Some(path))?;
        self.do_request(Method::GET, url, None).await
    }

    pub async fn revisions(&self, path: &str, rev_limit: Option<u32>) -> Result<Vec<Entry>> {
        let url = self.endpoint(Host::Api, "revisions", Some(path))?;
        let rev_limit = clamp_limit(rev_limit, REVISIONS_LIMIT_DEFAULT, REVISIONS_LIMIT_MAX);
        let params = vec![("rev_limit", rev_limit.to_string())];
        self.do_request(Method::GET, url, Some(params)).await
    }

    /// Brings a file back to the content it had at `rev`.
    pub async fn restore(&self, path: &str, rev: &str) -> Result<Entry> {
        let url = self.endpoint(Host::Api, "restore", Some(path))?;
        let params = vec![("rev", rev.to_string())];
        self.do_request(Method::POST, url, Some(params)).await
    }

    pub async fn copy(&self, from: CopySource<'_>, to_path: &str) -> Result<Entry> {
        let url = self.endpoint(Host::Api, "fileops/copy", None)?;
        let mut params = vec![
            ("root", self.config.root.to_string()),
            ("to_path", to_path.to_string()),
        ];
        match from {
            CopySource::Path(path) => params.push(("from_path", path.to_string())),
            CopySource::Ref(copy_ref) => params.push(("from_copy_ref", copy_ref.to_string())),
        }
        self.do_request(Method::POST, url, Some(params)).await
    }

    pub async fn create_folder(&self, path: &str) -> Result<Entry> {
        let url = self.endpoint(Host::Api, "fileops/create_folder", None)?;
        let params = vec![
            ("root", self.config.root.to_string()),
            ("path", path.to_string()),
        ];
        self.do_request(Method::POST, url, Some(params)).await
    }

    /// Deletes a file, or a folder with everything below it.
    pub async fn delete(&self, path: &str) -> Result<Entry> {
        let url = self.endpoint(Host::Api, "fileops/delete", None)?;
        let params = vec![
            ("root", self.config.root.to_string()),
            ("path", path.to_string()),
        ];
        self.do_request(Method::POST, url, Some(params)).await
    }

    pub async fn move_entry(&self, from_path: &str, to_path: &str) -> Result<Entry> {
        let url = self.endpoint(Host::Api, "fileops/move", None)?;
        let params = vec![
            ("root", self.config.root.to_string()),
            ("from_path", from_path.to_string()),
            ("to_path", to_path.to_string()),
        ];
        self.do_request(Method::POST, url, Some(params)).await
    }

    /// Runs one authenticated call against an API endpoint and decodes the reply.
    ///
    /// Without a parameter set the configured locale is sent; an explicit,
    /// even empty, set is sent as is.
    pub(crate) async fn do_request<T: DeserializeOwned>(
        &self,
        method: Method,
        mut url: Url,
        params: Option<Params>,
    ) -> Result<T> {
        let params = params.unwrap_or_else(|| vec![("locale", self.config.locale.clone())]);
        append_params(&mut url, &params);
        debug!("{method} {}", url.path());
        let response = self.authorized(method, url)?.send().await?;
        decode_response(response).await
    }

    pub(crate) fn authorized(&self, method: Method, url: Url) -> Result<RequestBuilder> {
        let token = self
            .credentials
            .access_token()
            .filter(|token| !token.is_empty())
            .ok_or(DropboxError::NotAuthenticated)?;
        Ok(self
            .http
            .request(method, url)
            .header(AUTHORIZATION, format!("Bearer {token}")))
    }

    /// Builds `<base>/<action>` and, for path-addressed calls,
    /// `<base>/<action>/<root>/<remote path>` with every component escaped.
    pub(crate) fn endpoint(&self, host: Host, action: &str, remote: Option<&str>) -> Result<Url> {
        let mut url = match host {
            Host::Api => self.api_url.clone(),
            Host::Content => self.content_url.clone(),
            Host::Notify => self.notify_url.clone(),
        };
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| DropboxError::InvalidBaseUrl(url_string(host, self)))?;
            segments.pop_if_empty();
            segments.extend(action.split('/').filter(|part| !part.is_empty()));
            if let Some(remote) = remote {
                segments.push(self.config.root.as_str());
                let mut parts = remote_segments(remote).peekable();
                if parts.peek().is_none() {
                    segments.push("");
                }
                segments.extend(parts);
            }
        }
        Ok(url)
    }
}

fn url_string(host: Host, client: &DropboxClient) -> String {
    match host {
        Host::Api => client.config.api_url.clone(),
        Host::Content => client.config.content_url.clone(),
        Host::Notify => client.config.notify_url.clone(),
    }
}

pub(crate) fn append_params(url: &mut Url, params: &[(&'static str, String)]) {
    if params.is_empty() {
        return;
    }
    url.query_pairs_mut()
        .extend_pairs(params.iter().map(|(name, value)| (*name, value.as_str())));
}

/// Reads the whole body, then decodes a 200 reply or maps the error status.
pub(crate) async fn decode_response<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    let body = response.bytes().await?;
    if status == StatusCode::OK {
        Ok(serde_json::from_slice(&body)?)
    } else {
        Err(error_from_status(status, &body))
    }
}

pub(crate) fn remote_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|part| !part.is_empty())
}

pub(crate) fn clamp_limit(limit: Option<u32>, default: u32, max: u32) -> u32 {
    match limit {
        None | Some(0) => default,
        Some(limit) => limit.min(max),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Root;

    fn client(base: &str) -> DropboxClient {
        DropboxClient::with_base_url(base, "token").unwrap()
    }

    #[test]
    fn limits_use_defaults_and_maximums() {
        assert_eq!(clamp_limit(None, 10, 1000), 10);
        assert_eq!(clamp_limit(Some(0), 10, 1000), 10);
        assert_eq!(clamp_limit(Some(25), 10, 1000), 25);
        assert_eq!(
            clamp_limit(Some(5000), SEARCH_LIMIT_DEFAULT, SEARCH_LIMIT_MAX),
            1000
        );
        assert_eq!(
            clamp_limit(Some(30_000), METADATA_LIMIT_DEFAULT, METADATA_LIMIT_MAX),
            25_000
        );
    }

    #[test]
    fn endpoint_escapes_remote_components() {
        let client = client("https://api.example/1");
        let url = client
            .endpoint(Host::Api, "metadata", Some("/Photos/Summer 2014/a#b.jpg"))
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.example/1/metadata/dropbox/Photos/Summer%202014/a%23b.jpg"
        );
    }

    #[test]
    fn endpoint_for_root_keeps_trailing_slash() {
        let client = client("https://api.example/1/");
        let url = client.endpoint(Host::Api, "metadata", Some("/")).unwrap();
        assert_eq!(url.as_str(), "https://api.example/1/metadata/dropbox/");
    }

    #[test]
    fn endpoint_without_remote_path_uses_action_only() {
        let config = DropboxConfig::default()
            .with_base_url("http://127.0.0.1:8080")
            .with_root(Root::Sandbox);
        let client = DropboxClient::with_config(config, StaticToken::new("t")).unwrap();
        let url = client.endpoint(Host::Api, "fileops/copy", None).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8080/fileops/copy");
        let url = client
            .endpoint(Host::Content, "files", Some("a/b.txt"))
            .unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8080/files/sandbox/a/b.txt");
    }

    #[test]
    fn empty_parameter_set_leaves_no_query() {
        let mut url = Url::parse("https://api.example/1/delta").unwrap();
        append_params(&mut url, &[]);
        assert_eq!(url.query(), None);
        append_params(&mut url, &[("cursor", "a b".to_string())]);
        assert_eq!(url.query(), Some("cursor=a+b"));
    }

    #[test]
    fn missing_token_fails_before_sending() {
        let client = DropboxClient::with_base_url("https://api.example/1", "").unwrap();
        let url = client.endpoint(Host::Api, "account/info", None).unwrap();
        assert!(matches!(
            client.authorized(Method::GET, url),
            Err(DropboxError::NotAuthenticated)
        ));
    }

    #[test]
    fn debug_output_hides_credentials() {
        let rendered = format!("{:?}", client("https://api.example/1"));
        assert!(rendered.contains("DropboxClient"));
        assert!(!rendered.contains("token"));
    }
}
