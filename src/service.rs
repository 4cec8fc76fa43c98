//! Marketplace Service
//!
//! The query surface shared by the remote service and its caching decorator.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use url::Url;

use crate::model::{Category, FavoriteList, InstallErrorReport, Market, News, Node, SearchResult};

// == Service Error Enum ==
/// Failures reported by a marketplace service.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Not authorized: {0}")]
    NotAuthorized(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

// == Marketplace Service Trait ==
/// Queries against a remote marketplace catalog.
///
/// Results are handed out as shared handles so a caching implementation can
/// return the same instance to every caller.
#[async_trait]
pub trait MarketplaceService: Send + Sync {
    /// Base URL of the remote service.
    fn base_url(&self) -> &Url;

    async fn list_markets(&self) -> ServiceResult<Arc<Vec<Market>>>;

    async fn get_market(&self, market: &Market) -> ServiceResult<Arc<Market>>;

    async fn get_category(&self, category: &Category) -> ServiceResult<Arc<Category>>;

    async fn get_node(&self, node: &Node) -> ServiceResult<Arc<Node>>;

    /// Resolves a batch of nodes. Nodes that cannot be found are omitted.
    async fn get_nodes(&self, nodes: &[Node]) -> ServiceResult<Vec<Arc<Node>>>;

    async fn search(
        &self,
        market: Option<&Market>,
        category: Option<&Category>,
        query: &str,
    ) -> ServiceResult<Arc<SearchResult>>;

    async fn tagged(&self, tags: &[String]) -> ServiceResult<Arc<SearchResult>>;

    async fn featured(
        &self,
        market: Option<&Market>,
        category: Option<&Category>,
    ) -> ServiceResult<Arc<SearchResult>>;

    async fn recent(&self) -> ServiceResult<Arc<SearchResult>>;

    async fn top_favorites(&self) -> ServiceResult<Arc<SearchResult>>;

    async fn popular(&self) -> ServiceResult<Arc<SearchResult>>;

    async fn related(&self, based_on: &[Node]) -> ServiceResult<Arc<SearchResult>>;

    async fn news(&self) -> ServiceResult<Arc<News>>;

    /// Favorites of the signed-in user.
    async fn user_favorites(&self) -> ServiceResult<Arc<SearchResult>>;

    /// Sets the favorite status of `nodes` for the signed-in user, as carried
    /// by each node's `favorited` flag.
    async fn update_user_favorites(&self, nodes: &[Node]) -> ServiceResult<()>;

    /// Nodes of the favorites list published at `list_url`.
    async fn favorites_at(&self, list_url: &Url) -> ServiceResult<Arc<SearchResult>>;

    async fn user_favorite_lists(&self) -> ServiceResult<Arc<Vec<FavoriteList>>>;

    async fn report_install_error(&self, report: &InstallErrorReport) -> ServiceResult<()>;

    async fn report_install_success(&self, node: &Node) -> ServiceResult<()>;
}
