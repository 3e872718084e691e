use log::warn;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use url::Url;

use crate::{
    config::Config,
    model::{CreatePost, Post, PostWithAuthor},
    timed,
    utils::{Failure, Json, Success},
};

use super::{ApiClient, ApiError, PostsApi, RemoteError};

/// Client for the app's tRPC router (superjson transformer).
#[derive(Debug, Clone)]
pub struct TrpcClient {
    inner: ApiClient,
    base: Url,
}

impl TrpcClient {
    pub fn new(config: &Config) -> Self {
        let inner = ApiClient::new(config.retries(), config.limit(), config.session());
        Self {
            inner,
            base: config.api_url().clone(),
        }
    }

    fn procedure_url(&self, path: &str) -> Url {
        let mut url = self.base.clone();
        let prefix = url.path().trim_end_matches('/').to_string();
        url.set_path(&format!("{}/api/trpc/{}", prefix, path));
        url
    }

    pub async fn query<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let mut url = self.procedure_url(path);
        let input = serde_json::to_string(&Json::new(()))?;
        url.set_query(Some(&format!("input={}", urlencoding::encode(&input))));

        let (status, bytes) = self.inner.get(url).await?;
        Self::decode(path, status, &bytes)
    }

    pub async fn mutation<I: serde::Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        input: I,
    ) -> Result<T, ApiError> {
        let url = self.procedure_url(path);
        let (status, bytes) = self.inner.post_json(url, &Json::new(input)).await?;
        Self::decode(path, status, &bytes)
    }

    fn decode<T: DeserializeOwned>(
        path: &str,
        status: StatusCode,
        bytes: &[u8],
    ) -> Result<T, ApiError> {
        match serde_json::from_slice::<Success<T>>(bytes) {
            Ok(value) => Ok(value.raw()),
            Err(e) => {
                if let Ok(Failure::<RemoteError> { error }) = serde_json::from_slice(bytes) {
                    let error = error.raw();
                    warn!("{} failed: {}", path, error.message);
                    return Err(ApiError::Remote(error));
                }
                if !status.is_success() {
                    return Err(ApiError::Status(status.as_u16()));
                }
                Err(ApiError::Decode(e))
            }
        }
    }
}

impl PostsApi for TrpcClient {
    async fn get_all(&self) -> Result<Vec<PostWithAuthor>, ApiError> {
        timed!("posts.getAll", self.query("posts.getAll").await)
    }

    async fn create(&self, input: CreatePost) -> Result<Post, ApiError> {
        timed!("posts.create", self.mutation("posts.create", input).await)
    }
}
