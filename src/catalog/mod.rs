//! Article catalog: the static category/group data the bingo set is drawn
//! from. The engine treats this as plain data handed in by the host; the
//! TOML loader here is a convenience for hosts that keep it in a file.

use crate::util::normalize;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in catalog file: {0}")]
    Parse(#[from] toml::de::Error),

    /// No article data at all — the only failure that makes a game
    /// impossible to construct.
    #[error("Catalog contains no playable articles")]
    Empty,

    /// Even with group caps relaxed the catalog cannot fill a set.
    #[error("Catalog cannot supply {needed} distinct titles (only {available} available)")]
    Insufficient { needed: usize, available: usize },
}

/// A themed pool of article titles. A category contributes at most one
/// article per generator pass.
#[derive(Debug, Clone, Deserialize)]
pub struct Category {
    pub name: String,
    pub articles: Vec<String>,
    /// Optional group for capping, e.g. many "US state" categories capped
    /// at a few per game.
    #[serde(default)]
    pub group: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub categories: Vec<Category>,
    /// group name → maximum categories from that group per game
    #[serde(default)]
    pub group_caps: HashMap<String, usize>,
}

impl Catalog {
    /// Maximum catalog file size (1 MB).
    const MAX_FILE_SIZE: usize = 1_048_576;

    pub fn new(categories: Vec<Category>, group_caps: HashMap<String, usize>) -> Self {
        Self {
            categories,
            group_caps,
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self, CatalogError> {
        if content.len() > Self::MAX_FILE_SIZE {
            return Err(CatalogError::Parse(serde::de::Error::custom(format!(
                "catalog is {} bytes (max {})",
                content.len(),
                Self::MAX_FILE_SIZE
            ))));
        }
        let catalog: Catalog = toml::from_str(content)?;
        if catalog.is_empty() {
            return Err(CatalogError::Empty);
        }
        tracing::info!(
            categories = catalog.categories.len(),
            groups = catalog.group_caps.len(),
            "Loaded article catalog"
        );
        Ok(catalog)
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// True when no category carries any article.
    pub fn is_empty(&self) -> bool {
        self.categories.iter().all(|c| c.articles.is_empty())
    }

    /// Number of distinct normalized titles across all categories.
    pub fn distinct_title_count(&self) -> usize {
        let mut seen = HashSet::new();
        for category in &self.categories {
            for title in &category.articles {
                let key = normalize(title);
                if !key.is_empty() {
                    seen.insert(key);
                }
            }
        }
        seen.len()
    }
}
