//! Cache Entry Module
//!
//! Defines object cache entries, the values they hold, and how domain types
//! map onto them.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::cache::EntityKeys;
use crate::model::{Category, Market, News, Node, SearchResult};

// == Cached Item ==
/// A value held by the object cache.
#[derive(Debug, Clone)]
pub enum CachedItem {
    Markets(Arc<Vec<Market>>),
    Market(Arc<Market>),
    Category(Arc<Category>),
    Node(Arc<Node>),
    SearchResult(Arc<SearchResult>),
    News(Arc<News>),
}

// == Object Entry ==
#[derive(Debug, Clone)]
pub struct ObjectEntry {
    pub key: String,
    pub item: CachedItem,
    /// URL the value was loaded from, checked against the staleness policy
    pub origin_url: Option<String>,
    pub created_at: Instant,
    /// None = no expiration
    pub expires_at: Option<Instant>,
}

impl ObjectEntry {
    pub fn new(
        key: String,
        item: CachedItem,
        origin_url: Option<String>,
        ttl: Option<Duration>,
    ) -> Self {
        let now = Instant::now();
        Self {
            key,
            item,
            origin_url,
            created_at: now,
            expires_at: ttl.and_then(|ttl| now.checked_add(ttl)),
        }
    }

    /// An entry is expired once the current time reaches its expiration time.
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|expires| Instant::now() >= expires)
    }

    pub fn ttl_remaining(&self) -> Option<Duration> {
        self.expires_at
            .map(|expires| expires.saturating_duration_since(Instant::now()))
    }
}

/// A value paired with the key it should be stored under.
#[derive(Debug, Clone)]
pub struct KeyedItem {
    pub key: String,
    pub item: CachedItem,
    pub origin_url: Option<String>,
}

// == Cacheable ==
/// Domain types the object cache knows how to store.
pub trait Cacheable: Send + Sync + Sized + 'static {
    fn into_item(value: Arc<Self>) -> CachedItem;

    /// Returns the value if `item` holds this type.
    fn from_item(item: &CachedItem) -> Option<Arc<Self>>;

    fn origin_url(&self) -> Option<&str> {
        None
    }

    /// Additional keys the value, or the entities it contains, are
    /// addressable under.
    fn nested(value: &Arc<Self>, keys: &EntityKeys) -> Vec<KeyedItem> {
        let _ = (value, keys);
        Vec::new()
    }
}

fn market_items(market: &Arc<Market>, out: &mut Vec<KeyedItem>) {
    for category in &market.categories {
        if let Some(key) = EntityKeys::category(category) {
            out.push(KeyedItem {
                key,
                origin_url: category.url.clone(),
                item: CachedItem::Category(Arc::new(category.clone())),
            });
        }
    }
    if let Some(key) = EntityKeys::market(market) {
        out.push(KeyedItem {
            key,
            origin_url: market.url.clone(),
            item: CachedItem::Market(market.clone()),
        });
    }
}

fn node_items(node: &Arc<Node>, keys: &EntityKeys, out: &mut Vec<KeyedItem>) {
    for key in keys.node_aliases(node) {
        out.push(KeyedItem {
            key,
            origin_url: node.url.clone(),
            item: CachedItem::Node(node.clone()),
        });
    }
}

impl Cacheable for Vec<Market> {
    fn into_item(value: Arc<Self>) -> CachedItem {
        CachedItem::Markets(value)
    }

    fn from_item(item: &CachedItem) -> Option<Arc<Self>> {
        match item {
            CachedItem::Markets(markets) => Some(markets.clone()),
            _ => None,
        }
    }

    fn nested(value: &Arc<Self>, _keys: &EntityKeys) -> Vec<KeyedItem> {
        let mut out = Vec::new();
        for market in value.iter() {
            market_items(&Arc::new(market.clone()), &mut out);
        }
        out
    }
}

impl Cacheable for Market {
    fn into_item(value: Arc<Self>) -> CachedItem {
        CachedItem::Market(value)
    }

    fn from_item(item: &CachedItem) -> Option<Arc<Self>> {
        match item {
            CachedItem::Market(market) => Some(market.clone()),
            _ => None,
        }
    }

    fn origin_url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    fn nested(value: &Arc<Self>, _keys: &EntityKeys) -> Vec<KeyedItem> {
        let mut out = Vec::new();
        market_items(value, &mut out);
        out
    }
}

impl Cacheable for Category {
    fn into_item(value: Arc<Self>) -> CachedItem {
        CachedItem::Category(value)
    }

    fn from_item(item: &CachedItem) -> Option<Arc<Self>> {
        match item {
            CachedItem::Category(category) => Some(category.clone()),
            _ => None,
        }
    }

    fn origin_url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    fn nested(value: &Arc<Self>, _keys: &EntityKeys) -> Vec<KeyedItem> {
        EntityKeys::category(value)
            .map(|key| KeyedItem {
                key,
                origin_url: value.url.clone(),
                item: CachedItem::Category(value.clone()),
            })
            .into_iter()
            .collect()
    }
}

impl Cacheable for Node {
    fn into_item(value: Arc<Self>) -> CachedItem {
        CachedItem::Node(value)
    }

    fn from_item(item: &CachedItem) -> Option<Arc<Self>> {
        match item {
            CachedItem::Node(node) => Some(node.clone()),
            _ => None,
        }
    }

    fn origin_url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    fn nested(value: &Arc<Self>, keys: &EntityKeys) -> Vec<KeyedItem> {
        let mut out = Vec::new();
        node_items(value, keys, &mut out);
        out
    }
}

impl Cacheable for SearchResult {
    fn into_item(value: Arc<Self>) -> CachedItem {
        CachedItem::SearchResult(value)
    }

    fn from_item(item: &CachedItem) -> Option<Arc<Self>> {
        match item {
            CachedItem::SearchResult(result) => Some(result.clone()),
            _ => None,
        }
    }

    fn nested(value: &Arc<Self>, keys: &EntityKeys) -> Vec<KeyedItem> {
        let mut out = Vec::new();
        for node in &value.nodes {
            node_items(&Arc::new(node.clone()), keys, &mut out);
        }
        out
    }
}

impl Cacheable for News {
    fn into_item(value: Arc<Self>) -> CachedItem {
        CachedItem::News(value)
    }

    fn from_item(item: &CachedItem) -> Option<Arc<Self>> {
        match item {
            CachedItem::News(news) => Some(news.clone()),
            _ => None,
        }
    }

    fn origin_url(&self) -> Option<&str> {
        self.url.as_deref()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use url::Url;

    fn keys() -> EntityKeys {
        EntityKeys::new(&Url::parse("https://marketplace.example.org").unwrap())
    }

    fn news_item() -> CachedItem {
        CachedItem::News(Arc::new(News::default()))
    }

    #[test]
    fn test_entry_without_ttl_never_expires() {
        let entry = ObjectEntry::new("k".to_string(), news_item(), None, None);
        assert!(entry.expires_at.is_none());
        assert!(!entry.is_expired());
        assert!(entry.ttl_remaining().is_none());
    }

    #[test]
    fn test_entry_expiration() {
        let entry = ObjectEntry::new(
            "k".to_string(),
            news_item(),
            None,
            Some(Duration::from_millis(30)),
        );
        assert!(!entry.is_expired());

        sleep(Duration::from_millis(50));

        assert!(entry.is_expired());
        assert_eq!(entry.ttl_remaining(), Some(Duration::ZERO));
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let now = Instant::now();
        let entry = ObjectEntry {
            key: "k".to_string(),
            item: news_item(),
            origin_url: None,
            created_at: now,
            expires_at: Some(now),
        };
        assert!(entry.is_expired(), "Entry should be expired at boundary");
    }

    #[test]
    fn test_from_item_checks_type() {
        let item = Market::into_item(Arc::new(Market::with_id("m")));
        assert!(Market::from_item(&item).is_some());
        assert!(Category::from_item(&item).is_none());
        assert!(Node::from_item(&item).is_none());
    }

    #[test]
    fn test_market_nested_includes_categories() {
        let mut market = Market::with_id("m");
        market.categories = vec![
            Category::with_id("c1"),
            Category::default(),
            Category::with_id("c2"),
        ];

        let nested = Market::nested(&Arc::new(market), &keys());
        let nested_keys: Vec<_> = nested.iter().map(|n| n.key.as_str()).collect();

        assert_eq!(nested_keys, vec!["Category:c1", "Category:c2", "Market:m"]);
    }

    #[test]
    fn test_search_result_nested_includes_node_aliases() {
        let result = SearchResult {
            matched_count: Some(2),
            nodes: vec![Node::with_id("1"), Node::with_url("https://x/content/two")],
        };

        let nested = SearchResult::nested(&Arc::new(result), &keys());
        let nested_keys: Vec<_> = nested.iter().map(|n| n.key.as_str()).collect();

        assert_eq!(
            nested_keys,
            vec![
                "Node:1",
                "Node:https://marketplace.example.org/node/1",
                "Node:https://x/content/two",
            ]
        );
    }

    #[test]
    fn test_origin_url() {
        let mut node = Node::with_id("1");
        assert_eq!(node.origin_url(), None);
        node.url = Some("https://x/1".to_string());
        assert_eq!(node.origin_url(), Some("https://x/1"));
        assert_eq!(SearchResult::default().origin_url(), None);
    }
}
