use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

const DEFAULT_AUTHORIZE_URL: &str = "https://www.dropbox.com/1/oauth2/authorize";
const DEFAULT_TOKEN_URL: &str = "https://api.dropbox.com/1/oauth2/token";

#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("api returned {status}: {body}")]
    Api { status: StatusCode, body: String },
}

/// Authorization-code flow for an app registered with an app key and secret.
#[derive(Clone)]
pub struct OAuthClient {
    http: Client,
    authorize_url: Url,
    token_url: Url,
    app_key: String,
    app_secret: String,
}

impl OAuthClient {
    pub fn new(app_key: impl Into<String>, app_secret: impl Into<String>) -> Result<Self, OAuthError> {
        Self::with_urls(DEFAULT_AUTHORIZE_URL, DEFAULT_TOKEN_URL, app_key, app_secret)
    }

    /// Serves both endpoints from `base_url`, under `/1/oauth2/`.
    pub fn with_base_url(
        base_url: &str,
        app_key: impl Into<String>,
        app_secret: impl Into<String>,
    ) -> Result<Self, OAuthError> {
        let base = Url::parse(base_url)?;
        Ok(Self {
            http: Client::new(),
            authorize_url: base.join("/1/oauth2/authorize")?,
            token_url: base.join("/1/oauth2/token")?,
            app_key: app_key.into(),
            app_secret: app_secret.into(),
        })
    }

    pub fn with_urls(
        authorize_url: &str,
        token_url: &str,
        app_key: impl Into<String>,
        app_secret: impl Into<String>,
    ) -> Result<Self, OAuthError> {
        Ok(Self {
            http: Client::new(),
            authorize_url: Url::parse(authorize_url)?,
            token_url: Url::parse(token_url)?,
            app_key: app_key.into(),
            app_secret: app_secret.into(),
        })
    }

    /// Page the user opens to grant access. Without `redirect_uri` the code is
    /// shown to the user, who pastes it back into the application.
    pub fn authorize_url(&self, redirect_uri: Option<&str>, state: Option<&str>) -> Url {
        let mut url = self.authorize_url.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("response_type", "code");
            query.append_pair("client_id", &self.app_key);
            if let Some(redirect_uri) = redirect_uri {
                query.append_pair("redirect_uri", redirect_uri);
            }
            if let Some(state) = state {
                query.append_pair("state", state);
            }
        }
        url
    }

    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: Option<&str>,
    ) -> Result<OAuthToken, OAuthError> {
        let mut form = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", self.app_key.as_str()),
            ("client_secret", self.app_secret.as_str()),
        ];
        if let Some(redirect_uri) = redirect_uri {
            form.push(("redirect_uri", redirect_uri));
        }

        let response = self
            .http
            .post(self.token_url.clone())
            .form(&form)
            .send()
            .await?;
        if response.status().is_success() {
            Ok(response.json::<OAuthToken>().await?)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(OAuthError::Api { status, body })
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct OAuthToken {
    pub access_token: String,
    pub token_type: String,
    #[serde(default)]
    pub uid: Option<String>,
}
