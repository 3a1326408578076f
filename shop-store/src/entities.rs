//! Catalog and order entities owned by the CMS/admin layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::locale::Locale;

/// A short text pair, one value per supported locale.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalizedText {
    #[serde(default)]
    pub ar: String,
    #[serde(default)]
    pub en: String,
}

impl LocalizedText {
    pub fn new(ar: impl Into<String>, en: impl Into<String>) -> Self {
        Self {
            ar: ar.into(),
            en: en.into(),
        }
    }

    /// The value for `locale`, falling back to the other locale when empty.
    pub fn get(&self, locale: Locale) -> &str {
        let (primary, fallback) = match locale {
            Locale::Ar => (&self.ar, &self.en),
            Locale::En => (&self.en, &self.ar),
        };
        if primary.is_empty() { fallback } else { primary }
    }
}

/// Publication state of a catalog entity. Only `Published` entities are
/// eligible for indexing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishStatus {
    Draft,
    Published,
    Archived,
}

/// Which collection an indexed document was built from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Product,
    Article,
}

impl SourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::Product => "product",
            SourceKind::Article => "article",
        }
    }
}

/// A catalog product as the admin layer persists it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub sku: String,
    pub name: LocalizedText,
    pub description: LocalizedText,
    pub category: String,
    pub brand: String,
    /// Unit price in `currency`.
    pub price: f64,
    pub currency: String,
    pub in_stock: bool,
    pub stock_qty: u32,
    pub status: PublishStatus,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Eligibility predicate for indexing.
    pub fn is_indexable(&self) -> bool {
        self.status == PublishStatus::Published
    }
}

/// A knowledge-base article (policies, FAQs, guides).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KbArticle {
    pub id: String,
    pub title: LocalizedText,
    pub body: LocalizedText,
    pub tags: Vec<String>,
    pub status: PublishStatus,
    pub updated_at: DateTime<Utc>,
}

impl KbArticle {
    pub fn is_indexable(&self) -> bool {
        self.status == PublishStatus::Published
    }
}

/// Coarse price bucket used as a filterable document attribute.
pub fn price_bucket(price: f64) -> &'static str {
    if price < 100.0 {
        "budget"
    } else if price < 1_000.0 {
        "mid"
    } else {
        "premium"
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Shipped,
    Delivered,
    Cancelled,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: String,
    pub name: String,
    pub quantity: u32,
    pub unit_price: f64,
}

/// A past customer order, read-only from the assistant's point of view.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub customer_id: String,
    pub items: Vec<OrderItem>,
    pub total: f64,
    pub currency: String,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}
