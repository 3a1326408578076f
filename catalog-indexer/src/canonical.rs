//! Canonical embedding text and filter metadata for catalog entities.
//!
//! One compact, high-signal string per `(entity, locale)`; the same string is
//! stored on the document so results stay explainable and re-embedding is
//! possible without rebuilding from the entity.

use shop_store::{DocMetadata, KbArticle, Locale, Product, price_bucket};

/// Builds the canonical text embedded for a product in one locale.
pub fn product_text(product: &Product, locale: Locale) -> String {
    let mut parts: Vec<String> = vec![format!(
        "{} | {} | {}",
        product.name.get(locale),
        product.category,
        product.brand
    )];

    parts.push(format!("SKU: {}", product.sku));

    let description = product.description.get(locale);
    if !description.is_empty() {
        parts.push(description.to_string());
    }

    parts.join("\n")
}

pub fn product_metadata(product: &Product) -> DocMetadata {
    DocMetadata {
        category: Some(product.category.clone()),
        brand: Some(product.brand.clone()),
        price_bucket: Some(price_bucket(product.price).to_string()),
        in_stock: Some(product.in_stock),
        tags: Vec::new(),
    }
}

/// Builds the canonical text embedded for a knowledge-base article.
pub fn article_text(article: &KbArticle, locale: Locale) -> String {
    let mut parts: Vec<String> = vec![article.title.get(locale).to_string()];

    if !article.tags.is_empty() {
        parts.push(format!("Tags: {}", article.tags.join(", ")));
    }

    let body = article.body.get(locale);
    if !body.is_empty() {
        parts.push(body.to_string());
    }

    parts.join("\n")
}

pub fn article_metadata(article: &KbArticle) -> DocMetadata {
    DocMetadata {
        tags: article.tags.clone(),
        ..DocMetadata::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use shop_store::{LocalizedText, PublishStatus};

    #[test]
    fn product_text_uses_locale_and_keeps_sku() {
        let product = Product {
            id: "p1".into(),
            sku: "HDPE-P6006".into(),
            name: LocalizedText::new("بولي إيثيلين", "HDPE P6006"),
            description: LocalizedText::new("أنابيب", "Pipes resin"),
            category: "polymers".into(),
            brand: "SABIC".into(),
            price: 950.0,
            currency: "USD".into(),
            in_stock: true,
            stock_qty: 10,
            status: PublishStatus::Published,
            updated_at: Utc::now(),
        };

        let en = product_text(&product, Locale::En);
        assert!(en.starts_with("HDPE P6006 | polymers | SABIC"));
        assert!(en.contains("SKU: HDPE-P6006"));
        assert!(en.contains("Pipes resin"));

        let ar = product_text(&product, Locale::Ar);
        assert!(ar.contains("بولي إيثيلين"));
        assert!(ar.contains("أنابيب"));
    }
}
