pub mod error;
pub mod trpc;

use std::{future::Future, sync::Arc};

use log::{debug, log_enabled, trace};
use reqwest::{header, Client, StatusCode};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware, RequestBuilder};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Semaphore;
use url::Url;

use crate::model::{CreatePost, Post, PostWithAuthor};

pub use error::{ApiError, RemoteError};
pub use trpc::TrpcClient;

/// The remote procedures the home page consumes.
pub trait PostsApi: Send + Sync + 'static {
    fn get_all(&self) -> impl Future<Output = Result<Vec<PostWithAuthor>, ApiError>> + Send;
    fn create(&self, input: CreatePost) -> impl Future<Output = Result<Post, ApiError>> + Send;
}

/// Shared HTTP plumbing: retrying client behind a concurrency limit.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: ClientWithMiddleware,
    /// Same connection pool without retries, for writes that must not repeat.
    once: ClientWithMiddleware,
    semaphore: Arc<Semaphore>,
    cookie: Option<String>,
}

impl ApiClient {
    pub fn new(retries: u32, limit: usize, cookie: Option<String>) -> Self {
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(retries);
        let http = Client::new();
        let once = ClientBuilder::new(http.clone()).build();
        let client = ClientBuilder::new(http)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();
        Self {
            client,
            once,
            semaphore: Arc::new(Semaphore::new(limit.max(1))),
            cookie,
        }
    }

    pub fn has_cookie(&self) -> bool {
        self.cookie.is_some()
    }

    fn wrap_request(&self, builder: RequestBuilder) -> RequestBuilder {
        let builder = builder.header(header::ACCEPT, "application/json");
        match &self.cookie {
            Some(cookie) => builder.header(header::COOKIE, cookie),
            None => builder,
        }
    }

    pub async fn get(&self, url: Url) -> Result<(StatusCode, Vec<u8>), ApiError> {
        debug!("GET {}", url);
        let request = self.wrap_request(self.client.get(url));
        self.send(request).await
    }

    /// Writes go out once; they are never retried.
    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        url: Url,
        body: &T,
    ) -> Result<(StatusCode, Vec<u8>), ApiError> {
        debug!("POST {}", url);
        let request = self.wrap_request(self.once.post(url)).json(body);
        self.send(request).await
    }

    async fn send(&self, request: RequestBuilder) -> Result<(StatusCode, Vec<u8>), ApiError> {
        let _permit = self.semaphore.acquire().await.ok();
        let response = request.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?.to_vec();

        if log_enabled!(log::Level::Trace) {
            match serde_json::from_slice::<Value>(&bytes) {
                Ok(value) => trace!("{} {}", status, serde_json::to_string_pretty(&value)?),
                Err(_) => trace!("{} {}", status, String::from_utf8_lossy(&bytes)),
            }
        }

        Ok((status, bytes))
    }
}
