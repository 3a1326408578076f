//! Structured post-filters applied after similarity scoring.
//!
//! Filters run on resolved products, not on documents: they are cheap, while
//! embeddings are not, so the pipeline scores first and filters the small
//! surviving superset.

use shop_store::Product;

#[derive(Clone, Debug, Default)]
pub struct SearchFilters {
    pub category: Option<String>,
    pub brand: Option<String>,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    pub in_stock_only: bool,
}

impl SearchFilters {
    /// True when no filter is set and post-filtering is a no-op.
    pub fn is_empty(&self) -> bool {
        self.category.is_none()
            && self.brand.is_none()
            && self.price_min.is_none()
            && self.price_max.is_none()
            && !self.in_stock_only
    }

    pub fn matches(&self, product: &Product) -> bool {
        if let Some(category) = &self.category
            && !product.category.eq_ignore_ascii_case(category)
        {
            return false;
        }
        if let Some(brand) = &self.brand
            && !product.brand.eq_ignore_ascii_case(brand)
        {
            return false;
        }
        if let Some(min) = self.price_min
            && product.price < min
        {
            return false;
        }
        if let Some(max) = self.price_max
            && product.price > max
        {
            return false;
        }
        if self.in_stock_only && !product.in_stock {
            return false;
        }
        true
    }
}
