//! Caching Marketplace Service
//!
//! Decorator that memoizes marketplace query results in a bounded object
//! index. Misses and stale entries are forwarded to the wrapped service and
//! failures propagate unchanged without touching the cache.
//!
//! The index lock is held only around index access, never across a fetch, so
//! fetches for different keys run concurrently. Concurrent misses on the same
//! key are not coalesced: each performs its own fetch and the last store wins.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;
use url::Url;

use crate::cache::keys::{
    FAVORITES, FEATURED, MARKETS_KEY, NEWS_KEY, POPULAR, RECENT, RELATED, SEARCH, TAGGED,
};
use crate::cache::{CacheStats, Cacheable, EntityKeys, KeyedItem, ObjectIndex, SearchKey};
use crate::config::Config;
use crate::model::{
    Category, FavoriteList, InstallErrorReport, Market, News, Node, SearchResult,
};
use crate::service::{MarketplaceService, ServiceResult};
use crate::staleness::{DefaultStalenessPolicy, StalenessPolicy};

pub struct CachingMarketplaceService<S> {
    delegate: S,
    index: Mutex<ObjectIndex>,
    keys: EntityKeys,
    policy: Arc<dyn StalenessPolicy>,
}

impl<S: MarketplaceService> CachingMarketplaceService<S> {
    /// Wraps `delegate` using the object cache settings from `config`.
    pub fn new(delegate: S, config: &Config) -> Self {
        let policy = Arc::new(DefaultStalenessPolicy::new(config.max_stale()));
        Self::with_policy(
            delegate,
            config.max_object_entries,
            config.object_ttl(),
            policy,
        )
    }

    pub fn with_policy(
        delegate: S,
        max_entries: usize,
        ttl: Option<Duration>,
        policy: Arc<dyn StalenessPolicy>,
    ) -> Self {
        let keys = EntityKeys::new(delegate.base_url());
        Self {
            delegate,
            index: Mutex::new(ObjectIndex::new(max_entries, ttl)),
            keys,
            policy,
        }
    }

    pub fn delegate(&self) -> &S {
        &self.delegate
    }

    pub fn keys(&self) -> &EntityKeys {
        &self.keys
    }

    // == Get Or Fetch ==
    /// Returns the first fresh value cached under `keys`, or fetches one.
    ///
    /// A fetched value is stored under `keys[0]` and under every key its
    /// nested entities are addressable by. With no keys the fetch bypasses
    /// the cache entirely.
    pub async fn get_or_fetch<T, F, Fut>(&self, keys: &[String], fetch: F) -> ServiceResult<Arc<T>>
    where
        T: Cacheable,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = ServiceResult<Arc<T>>> + Send,
    {
        let Some(primary) = keys.first() else {
            return fetch().await;
        };

        if let Some(hit) = self.lookup::<T>(keys).await {
            return Ok(hit);
        }

        let value = fetch().await?;
        self.store(primary.clone(), &value).await;
        Ok(value)
    }

    /// Drops the entry under `key`, returning whether one was present.
    pub async fn invalidate(&self, key: &str) -> bool {
        self.index.lock().await.remove(key)
    }

    pub async fn purge_expired(&self) -> usize {
        self.index.lock().await.purge_expired()
    }

    pub async fn clear(&self) {
        self.index.lock().await.clear();
    }

    pub async fn stats(&self) -> CacheStats {
        self.index.lock().await.stats()
    }

    /// Tries `keys` in order and counts one hit or miss for the whole lookup.
    async fn lookup<T: Cacheable>(&self, keys: &[String]) -> Option<Arc<T>> {
        let mut index = self.index.lock().await;
        for key in keys {
            let Some(entry) = index.peek(key) else {
                // Drops the entry if it expired, so the slot is reclaimed.
                index.access(key);
                continue;
            };
            let Some(value) = T::from_item(&entry.item) else {
                continue;
            };
            let origin_url = entry.origin_url.clone();
            index.access(key);

            if let Some(url) = origin_url.as_deref() {
                if self.policy.needs_refresh(url) {
                    debug!(%key, %url, "cached value needs refresh");
                    index.record_lookup(false);
                    return None;
                }
            }
            debug!(%key, "object cache hit");
            index.record_lookup(true);
            return Some(value);
        }
        index.record_lookup(false);
        None
    }

    async fn store<T: Cacheable>(&self, key: String, value: &Arc<T>) {
        let nested = T::nested(value, &self.keys);
        let primary = KeyedItem {
            key,
            origin_url: value.origin_url().map(str::to_string),
            item: T::into_item(value.clone()),
        };
        let mut index = self.index.lock().await;
        // Primary goes last so it is the most recently used entry.
        for item in nested.into_iter().chain(std::iter::once(primary)) {
            index.insert(item.key, item.item, item.origin_url);
        }
    }

    async fn store_nested<T: Cacheable>(&self, value: &Arc<T>) {
        let nested = T::nested(value, &self.keys);
        let mut index = self.index.lock().await;
        for item in nested {
            index.insert(item.key, item.item, item.origin_url);
        }
    }
}

#[async_trait]
impl<S: MarketplaceService> MarketplaceService for CachingMarketplaceService<S> {
    fn base_url(&self) -> &Url {
        self.delegate.base_url()
    }

    async fn list_markets(&self) -> ServiceResult<Arc<Vec<Market>>> {
        let keys = [MARKETS_KEY.to_string()];
        self.get_or_fetch(&keys, || self.delegate.list_markets()).await
    }

    async fn get_market(&self, market: &Market) -> ServiceResult<Arc<Market>> {
        let keys: Vec<String> = EntityKeys::market(market).into_iter().collect();
        self.get_or_fetch(&keys, || self.delegate.get_market(market)).await
    }

    async fn get_category(&self, category: &Category) -> ServiceResult<Arc<Category>> {
        let keys: Vec<String> = EntityKeys::category(category).into_iter().collect();
        self.get_or_fetch(&keys, || self.delegate.get_category(category)).await
    }

    async fn get_node(&self, node: &Node) -> ServiceResult<Arc<Node>> {
        let keys = EntityKeys::node_lookup(node);
        self.get_or_fetch(&keys, || self.delegate.get_node(node)).await
    }

    async fn get_nodes(&self, nodes: &[Node]) -> ServiceResult<Vec<Arc<Node>>> {
        let mut resolved: Vec<Option<Arc<Node>>> = Vec::with_capacity(nodes.len());
        let mut unresolved = Vec::new();
        for node in nodes {
            let hit = self.lookup::<Node>(&EntityKeys::node_lookup(node)).await;
            if hit.is_none() {
                unresolved.push(node.clone());
            }
            resolved.push(hit);
        }

        if !unresolved.is_empty() {
            debug!(count = unresolved.len(), "fetching uncached nodes");
            let fetched = self.delegate.get_nodes(&unresolved).await?;

            let mut by_key: HashMap<String, Arc<Node>> = HashMap::new();
            for node in &fetched {
                self.store_nested(node).await;
                for key in self.keys.node_aliases(node) {
                    by_key.insert(key, node.clone());
                }
            }

            for (slot, node) in resolved.iter_mut().zip(nodes) {
                if slot.is_none() {
                    *slot = EntityKeys::node_lookup(node)
                        .iter()
                        .find_map(|key| by_key.get(key).cloned());
                }
            }
        }

        Ok(resolved.into_iter().flatten().collect())
    }

    async fn search(
        &self,
        market: Option<&Market>,
        category: Option<&Category>,
        query: &str,
    ) -> ServiceResult<Arc<SearchResult>> {
        let key = SearchKey::new(SEARCH)
            .market(market)
            .category(category)
            .term(query)
            .build();
        self.get_or_fetch(&[key], || self.delegate.search(market, category, query)).await
    }

    async fn tagged(&self, tags: &[String]) -> ServiceResult<Arc<SearchResult>> {
        let key = SearchKey::new(TAGGED).tags(tags).build();
        self.get_or_fetch(&[key], || self.delegate.tagged(tags)).await
    }

    async fn featured(
        &self,
        market: Option<&Market>,
        category: Option<&Category>,
    ) -> ServiceResult<Arc<SearchResult>> {
        let key = SearchKey::new(FEATURED)
            .market(market)
            .category(category)
            .build();
        self.get_or_fetch(&[key], || self.delegate.featured(market, category)).await
    }

    async fn recent(&self) -> ServiceResult<Arc<SearchResult>> {
        let key = SearchKey::new(RECENT).build();
        self.get_or_fetch(&[key], || self.delegate.recent()).await
    }

    async fn top_favorites(&self) -> ServiceResult<Arc<SearchResult>> {
        let key = SearchKey::new(FAVORITES).build();
        self.get_or_fetch(&[key], || self.delegate.top_favorites()).await
    }

    async fn popular(&self) -> ServiceResult<Arc<SearchResult>> {
        let key = SearchKey::new(POPULAR).build();
        self.get_or_fetch(&[key], || self.delegate.popular()).await
    }

    async fn related(&self, based_on: &[Node]) -> ServiceResult<Arc<SearchResult>> {
        let key = SearchKey::new(RELATED).based_on(based_on).build();
        self.get_or_fetch(&[key], || self.delegate.related(based_on)).await
    }

    async fn news(&self) -> ServiceResult<Arc<News>> {
        let keys = [NEWS_KEY.to_string()];
        self.get_or_fetch(&keys, || self.delegate.news()).await
    }

    // Per-user state is never memoized.
    async fn user_favorites(&self) -> ServiceResult<Arc<SearchResult>> {
        self.delegate.user_favorites().await
    }

    async fn update_user_favorites(&self, nodes: &[Node]) -> ServiceResult<()> {
        self.delegate.update_user_favorites(nodes).await
    }

    async fn favorites_at(&self, list_url: &Url) -> ServiceResult<Arc<SearchResult>> {
        self.delegate.favorites_at(list_url).await
    }

    async fn user_favorite_lists(&self) -> ServiceResult<Arc<Vec<FavoriteList>>> {
        self.delegate.user_favorite_lists().await
    }

    async fn report_install_error(&self, report: &InstallErrorReport) -> ServiceResult<()> {
        self.delegate.report_install_error(report).await
    }

    async fn report_install_success(&self, node: &Node) -> ServiceResult<()> {
        self.delegate.report_install_success(node).await
    }
}
