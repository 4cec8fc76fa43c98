//! Cache Keys Module
//!
//! Derives object cache keys for entities and for parameterized queries.

use url::Url;

use crate::model::{Category, Market, Node};

/// Key of the full market list.
pub const MARKETS_KEY: &str = "Markets:Markets";

/// Key of the news item.
pub const NEWS_KEY: &str = "News:News";

/// Path segment under the service base URL that addresses single nodes.
pub const NODE_API_PATH: &str = "node";

// == Query Operation Tags ==
pub const SEARCH: &str = "search";
pub const TAGGED: &str = "tagged";
pub const FEATURED: &str = "featured";
pub const RECENT: &str = "recent";
pub const FAVORITES: &str = "favorites";
pub const POPULAR: &str = "popular";
pub const RELATED: &str = "related";

// == Entity Keys ==
/// Identity keys for single entities.
///
/// Keys prefer the entity id and fall back to its URL. An entity with
/// neither has no key and is never cached.
#[derive(Debug, Clone)]
pub struct EntityKeys {
    node_api_base: String,
}

impl EntityKeys {
    pub fn new(base_url: &Url) -> Self {
        Self {
            node_api_base: format!(
                "{}/{}",
                base_url.as_str().trim_end_matches('/'),
                NODE_API_PATH
            ),
        }
    }

    pub fn market(market: &Market) -> Option<String> {
        identity_key("Market", market.id.as_deref(), market.url.as_deref())
    }

    pub fn category(category: &Category) -> Option<String> {
        identity_key("Category", category.id.as_deref(), category.url.as_deref())
    }

    /// `Node:<id>`
    pub fn node_id(node: &Node) -> Option<String> {
        non_empty(node.id.as_deref()).map(|id| format!("Node:{id}"))
    }

    /// `Node:<url>`
    pub fn node_url(node: &Node) -> Option<String> {
        non_empty(node.url.as_deref()).map(|url| format!("Node:{url}"))
    }

    /// `Node:<base>/node/<id>`, the address the service itself uses for a node.
    pub fn node_api_url(&self, node: &Node) -> Option<String> {
        non_empty(node.id.as_deref()).map(|id| format!("Node:{}/{id}", self.node_api_base))
    }

    /// Keys tried, in order, when looking a node up.
    pub fn node_lookup(node: &Node) -> Vec<String> {
        [Self::node_id(node), Self::node_url(node)]
            .into_iter()
            .flatten()
            .collect()
    }

    /// Every key a fetched node is stored under.
    pub fn node_aliases(&self, node: &Node) -> Vec<String> {
        [
            Self::node_id(node),
            Self::node_url(node),
            self.node_api_url(node),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

fn identity_key(kind: &str, id: Option<&str>, url: Option<&str>) -> Option<String> {
    non_empty(id)
        .or_else(|| non_empty(url))
        .map(|identity| format!("{kind}:{identity}"))
}

// == Search Key Builder ==
/// Builds the composite key of a search-like query:
/// `<operation>:<market id>:<category id>:<term>`.
///
/// ```
/// use catalog_cache::cache::SearchKey;
///
/// let key = SearchKey::new("search").term("  rust  ").build();
/// assert_eq!(key, "search:::rust");
/// ```
#[derive(Debug, Clone)]
pub struct SearchKey<'a> {
    operation: &'a str,
    market: Option<&'a str>,
    category: Option<&'a str>,
    term: Option<String>,
}

impl<'a> SearchKey<'a> {
    pub fn new(operation: &'a str) -> Self {
        Self {
            operation,
            market: None,
            category: None,
            term: None,
        }
    }

    pub fn market(mut self, market: Option<&'a Market>) -> Self {
        self.market = market.and_then(|m| m.id.as_deref());
        self
    }

    pub fn category(mut self, category: Option<&'a Category>) -> Self {
        self.category = category.and_then(|c| c.id.as_deref());
        self
    }

    /// Free text, trimmed.
    pub fn term(mut self, term: &str) -> Self {
        self.term = Some(term.trim().to_string());
        self
    }

    /// Trimmed tags joined by `,`; blank tags are skipped.
    pub fn tags(mut self, tags: &[String]) -> Self {
        let joined = tags
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(",");
        self.term = Some(joined);
        self
    }

    /// Ids of the nodes a recommendation is based on, joined by `+`.
    pub fn based_on(mut self, nodes: &[Node]) -> Self {
        let joined = nodes
            .iter()
            .filter_map(|n| non_empty(n.id.as_deref()))
            .collect::<Vec<_>>()
            .join("+");
        self.term = Some(joined);
        self
    }

    pub fn build(&self) -> String {
        format!(
            "{}:{}:{}:{}",
            self.operation,
            self.market.unwrap_or(""),
            self.category.unwrap_or(""),
            self.term.as_deref().unwrap_or("")
        )
    }
}
