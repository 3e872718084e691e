use std::future::Future;

use log::{info, warn};
use serde::Deserialize;
use url::Url;

use crate::{
    api::{ApiClient, ApiError},
    config::Config,
};

/// Session as reported by the identity provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub is_loaded: bool,
    pub is_signed_in: bool,
    pub user: Option<CurrentUser>,
}

impl SessionState {
    pub fn signed_out() -> Self {
        Self {
            is_loaded: true,
            is_signed_in: false,
            user: None,
        }
    }

    pub fn signed_in(user: CurrentUser) -> Self {
        Self {
            is_loaded: true,
            is_signed_in: true,
            user: Some(user),
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: String,
    #[serde(default)]
    pub username: Option<String>,
    pub profile_image_url: Url,
}

pub trait Identity: Send + Sync + 'static {
    fn load(&self) -> impl Future<Output = Result<SessionState, ApiError>> + Send;
}

#[derive(Deserialize, Debug)]
struct MeResponse {
    response: CurrentUser,
}

/// Reads the signed-in user from a Clerk-style frontend API.
#[derive(Debug, Clone)]
pub struct ClerkClient {
    inner: ApiClient,
    frontend_api: Option<Url>,
}

impl ClerkClient {
    pub fn new(config: &Config) -> Self {
        Self {
            inner: ApiClient::new(config.retries(), config.limit(), config.session()),
            frontend_api: config.identity_url().cloned(),
        }
    }

    async fn fetch_me(&self, base: &Url) -> Result<SessionState, ApiError> {
        let url = Url::parse(&format!("{}/v1/me", base.as_str().trim_end_matches('/')))?;
        let (status, bytes) = self.inner.get(url).await?;

        if status.as_u16() == 401 || status.as_u16() == 403 {
            info!("Session rejected, signed out");
            return Ok(SessionState::signed_out());
        }
        if !status.is_success() {
            return Err(ApiError::Status(status.as_u16()));
        }

        let me: MeResponse = serde_json::from_slice(&bytes)?;
        info!(
            "Signed in as {}",
            me.response.username.as_deref().unwrap_or(&me.response.id)
        );
        Ok(SessionState::signed_in(me.response))
    }
}

impl Identity for ClerkClient {
    async fn load(&self) -> Result<SessionState, ApiError> {
        let Some(base) = self.frontend_api.as_ref().filter(|_| self.inner.has_cookie()) else {
            info!("No session configured, signed out");
            return Ok(SessionState::signed_out());
        };

        match self.fetch_me(base).await {
            Ok(session) => Ok(session),
            Err(e) => {
                warn!("Failed to load session: {}", e);
                Ok(SessionState::signed_out())
            }
        }
    }
}
