//! Storage collaborator contract and the in-memory reference store.
//!
//! The engine never owns inventory rows; it queries them through the
//! [`InventoryStore`] trait. Substring matching and overlap scoring live
//! behind this seam (the production deployment pushes them into its
//! database), while strict numeric enforcement and the guard filters stay
//! engine-side in [`crate::search`].

use std::path::Path;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::token::QueryToken;

/// One inventory row. `name` is the canonical key for all exact updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub name: String,
    pub quantity: u32,
    pub location: String,
    /// ISO date (YYYY-MM-DD) of the last quantity change.
    pub last_updated: String,
}

/// Storage query interface consumed by the engine.
pub trait InventoryStore {
    /// Exact AND match: every token (or its variant) must appear as a
    /// substring of the item name.
    fn search_by_tokens(&self, tokens: &[QueryToken]) -> Vec<InventoryItem>;

    /// Overlap scoring: one point per token (or variant) present in the
    /// name; only items scoring above zero, highest first.
    fn ranked_search(&self, tokens: &[QueryToken]) -> Vec<(InventoryItem, u32)>;

    /// Apply a signed quantity delta to the item with this exact name
    /// (case-insensitive), clamping at zero.
    fn update_quantity(&self, name: &str, delta: i64) -> Result<InventoryItem, StoreError>;

    /// Insert or replace an item by name.
    fn insert(&self, item: InventoryItem);

    /// All item names, for semantic index construction.
    fn all_names(&self) -> Vec<String>;

    /// Persist a free-form user note.
    fn save_note(&self, key: &str, value: &str);
}

/// Column-name mapping for CSV import.
#[derive(Debug, Clone)]
pub struct CsvColumns {
    pub item: String,
    pub quantity: String,
    pub location: String,
}

impl Default for CsvColumns {
    fn default() -> Self {
        Self {
            item: "item_name".into(),
            quantity: "quantity".into(),
            location: "location".into(),
        }
    }
}

/// In-memory reference implementation of [`InventoryStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: RwLock<Vec<InventoryItem>>,
    notes: RwLock<Vec<(String, String)>>,
}

impl MemoryStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// A store seeded with the given items.
    pub fn with_items(items: Vec<InventoryItem>) -> Self {
        Self {
            items: RwLock::new(items),
            notes: RwLock::new(Vec::new()),
        }
    }

    /// Load a store from a CSV file with a header row.
    ///
    /// Unparsable quantities become 0 and missing locations "Unknown",
    /// matching how partially-filled inventory sheets arrive in practice.
    pub fn from_csv(path: &Path, columns: &CsvColumns) -> Result<Self, StoreError> {
        let content = std::fs::read_to_string(path).map_err(|e| StoreError::CsvLoad {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        let mut lines = content.lines().filter(|l| !l.trim().is_empty());
        let header = lines.next().ok_or_else(|| StoreError::CsvLoad {
            path: path.display().to_string(),
            message: "file has no header row".into(),
        })?;

        let headers: Vec<String> = header
            .split(',')
            .map(|h| h.trim().trim_matches('"').to_string())
            .collect();
        let find = |name: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(name));

        let item_idx = find(&columns.item).ok_or_else(|| StoreError::CsvColumn {
            column: columns.item.clone(),
        })?;
        let qty_idx = find(&columns.quantity);
        let loc_idx = find(&columns.location);

        let today = today();
        let mut items = Vec::new();
        for line in lines {
            let fields: Vec<&str> = line.split(',').map(|f| f.trim().trim_matches('"')).collect();
            let Some(name) = fields.get(item_idx).filter(|n| !n.is_empty()) else {
                continue;
            };
            let quantity = qty_idx
                .and_then(|i| fields.get(i))
                .and_then(|q| q.parse().ok())
                .unwrap_or(0);
            let location = loc_idx
                .and_then(|i| fields.get(i))
                .filter(|l| !l.is_empty())
                .unwrap_or(&"Unknown")
                .to_string();

            items.push(InventoryItem {
                name: name.to_string(),
                quantity,
                location,
                last_updated: today.clone(),
            });
        }

        tracing::info!(count = items.len(), path = %path.display(), "loaded inventory CSV");
        Ok(Self::with_items(items))
    }

    /// Look up one item by exact (case-insensitive) name.
    pub fn item(&self, name: &str) -> Option<InventoryItem> {
        self.items
            .read()
            .unwrap()
            .iter()
            .find(|i| i.name.eq_ignore_ascii_case(name))
            .cloned()
    }

    /// All saved notes, oldest first.
    pub fn notes(&self) -> Vec<(String, String)> {
        self.notes.read().unwrap().clone()
    }

    /// Number of items in the store.
    pub fn len(&self) -> usize {
        self.items.read().unwrap().len()
    }

    /// Whether the store holds no items.
    pub fn is_empty(&self) -> bool {
        self.items.read().unwrap().is_empty()
    }
}

impl InventoryStore for MemoryStore {
    fn search_by_tokens(&self, tokens: &[QueryToken]) -> Vec<InventoryItem> {
        if tokens.is_empty() {
            return Vec::new();
        }
        self.items
            .read()
            .unwrap()
            .iter()
            .filter(|item| {
                let name = item.name.to_lowercase();
                tokens.iter().all(|t| t.matches(&name))
            })
            .cloned()
            .collect()
    }

    fn ranked_search(&self, tokens: &[QueryToken]) -> Vec<(InventoryItem, u32)> {
        if tokens.is_empty() {
            return Vec::new();
        }
        let mut scored: Vec<(InventoryItem, u32)> = self
            .items
            .read()
            .unwrap()
            .iter()
            .filter_map(|item| {
                let name = item.name.to_lowercase();
                let score = tokens.iter().filter(|t| t.matches(&name)).count() as u32;
                (score > 0).then(|| (item.clone(), score))
            })
            .collect();
        scored.sort_by_key(|(_, score)| std::cmp::Reverse(*score));
        scored
    }

    fn update_quantity(&self, name: &str, delta: i64) -> Result<InventoryItem, StoreError> {
        let mut items = self.items.write().unwrap();
        let item = items
            .iter_mut()
            .find(|i| i.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| StoreError::ItemNotFound {
                name: name.to_string(),
            })?;

        item.quantity = (i64::from(item.quantity) + delta).max(0) as u32;
        item.last_updated = today();
        Ok(item.clone())
    }

    fn insert(&self, mut item: InventoryItem) {
        if item.last_updated.is_empty() {
            item.last_updated = today();
        }
        let mut items = self.items.write().unwrap();
        match items
            .iter_mut()
            .find(|i| i.name.eq_ignore_ascii_case(&item.name))
        {
            Some(existing) => *existing = item,
            None => items.push(item),
        }
    }

    fn all_names(&self) -> Vec<String> {
        self.items
            .read()
            .unwrap()
            .iter()
            .map(|i| i.name.clone())
            .collect()
    }

    fn save_note(&self, key: &str, value: &str) {
        let mut notes = self.notes.write().unwrap();
        match notes.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value.to_string(),
            None => notes.push((key.to_string(), value.to_string())),
        }
    }
}

fn today() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}
