use std::fmt;

/// Supplies the bearer token attached to authenticated requests.
///
/// Returning `None` (or an empty token) makes every authenticated call fail
/// with `DropboxError::NotAuthenticated` before anything is sent.
pub trait CredentialProvider: Send + Sync {
    fn access_token(&self) -> Option<String>;
}

#[derive(Clone, Default)]
pub struct StaticToken {
    token: Option<String>,
}

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        let token = token.into();
        Self {
            token: (!token.is_empty()).then_some(token),
        }
    }

    pub fn none() -> Self {
        Self { token: None }
    }
}

impl fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticToken")
            .field("token", &self.token.as_ref().map(|_| "****"))
            .finish()
    }
}

impl CredentialProvider for StaticToken {
    fn access_token(&self) -> Option<String> {
        self.token.clone()
    }
}

impl<F> CredentialProvider for F
where
    F: Fn() -> Option<String> + Send + Sync,
{
    fn access_token(&self) -> Option<String> {
        self()
    }
}
