use crate::models::{ChangeEvent, Contribution, Incentive, NewContribution, NewIncentive};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("server error {status}: {message}")]
    Server { status: u16, message: String },

    #[error("not found: {0}")]
    NotFound(String),
}

#[async_trait]
pub trait ContributionStore: Send + Sync {
    /// All incentives, ordered by `created_at` ascending.
    async fn fetch_incentives(&self) -> Result<Vec<Incentive>, StoreError>;

    async fn fetch_contributions(&self) -> Result<Vec<Contribution>, StoreError>;

    /// The store assigns `id` and `created_at`.
    async fn insert_contribution(&self, new: NewContribution) -> Result<Contribution, StoreError>;

    async fn insert_incentive(&self, new: NewIncentive) -> Result<Incentive, StoreError>;

    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent>;
}

pub type SharedStore = Arc<dyn ContributionStore>;
