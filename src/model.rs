//! Domain Model
//!
//! Plain data carriers returned by the marketplace service.

use serde::{Deserialize, Serialize};

/// A marketplace, grouping a set of categories.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Market {
    pub id: Option<String>,
    pub name: Option<String>,
    pub url: Option<String>,
    #[serde(default)]
    pub categories: Vec<Category>,
}

impl Market {
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }
}

/// A category inside a market.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: Option<String>,
    pub name: Option<String>,
    pub url: Option<String>,
    pub count: Option<u32>,
}

impl Category {
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }
}

/// A single listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: Option<String>,
    pub name: Option<String>,
    pub url: Option<String>,
    pub short_description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub favorited: Option<u32>,
    pub installs_total: Option<u32>,
}

impl Node {
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }
}

/// Result of a search-like query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub matched_count: Option<u32>,
    #[serde(default)]
    pub nodes: Vec<Node>,
}

/// Marketplace news item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct News {
    pub id: Option<String>,
    pub title: Option<String>,
    pub short_title: Option<String>,
    pub url: Option<String>,
    /// Publication time, seconds since the Unix epoch
    pub timestamp: Option<i64>,
}

/// A named list of favorited nodes, owned by a marketplace user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteList {
    pub id: Option<String>,
    pub name: Option<String>,
    pub owner: Option<String>,
    pub owner_profile_url: Option<String>,
    pub icon: Option<String>,
    #[serde(default)]
    pub nodes: Vec<Node>,
}

/// Details of an install that could not be resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallErrorReport {
    /// Status message of the failed operation
    pub status: String,
    /// Nodes included in the install, empty if unknown
    #[serde(default)]
    pub nodes: Vec<Node>,
    /// Installable units as `id,version`, empty if unknown
    #[serde(default)]
    pub installable_units: Vec<String>,
    pub resolution_details: Option<String>,
}
