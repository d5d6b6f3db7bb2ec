use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use crate::error::ReplayError;
use crate::store::LocalStore;

/// Replay logic for one feature area (orders, tables, stock, ...)
#[async_trait]
pub trait Replayer: Send + Sync {
    async fn replay(&self) -> Result<(), ReplayError>;
}

pub type ReplayerRef = Arc<dyn Replayer>;

/// Adapts an async closure into a [`Replayer`]
pub struct FnReplayer<F> {
    f: F,
}

impl<F> FnReplayer<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> Replayer for FnReplayer<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), ReplayError>> + Send + 'static,
{
    async fn replay(&self) -> Result<(), ReplayError> {
        (self.f)().await
    }
}

/// Posts the whole pending queue as one JSON batch: `{ "actions": [...] }`
pub struct HttpReplayer {
    store: Arc<LocalStore>,
    client: reqwest::Client,
    url: String,
}

impl HttpReplayer {
    pub fn new(store: Arc<LocalStore>, url: impl Into<String>) -> Self {
        Self {
            store,
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Replayer for HttpReplayer {
    async fn replay(&self) -> Result<(), ReplayError> {
        let actions = self.store.pending_actions();
        if actions.is_empty() {
            return Ok(());
        }

        let count = actions.len();
        let response = self
            .client
            .post(&self.url)
            .json(&json!({ "actions": actions }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReplayError::Remote {
                status: status.as_u16(),
                body,
            });
        }

        tracing::info!("Replayed {} pending actions to {}", count, self.url);
        Ok(())
    }
}
