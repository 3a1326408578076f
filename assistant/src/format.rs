//! Compact text rendering of function results.
//!
//! The model receives these strings verbatim as grounding for its final
//! answer, so they stay short, data-shaped and free of JSON.

use semantic_search::{KnowledgeMatch, SearchMatch};
use shop_store::{Locale, Order, Product};

pub fn product_list(matches: &[SearchMatch], query: &str, locale: Locale) -> String {
    if matches.is_empty() {
        return format!(
            "No products found for \"{query}\". Try different words or fewer filters."
        );
    }
    let mut out = String::new();
    for (i, m) in matches.iter().enumerate() {
        let p = &m.product;
        out.push_str(&format!(
            "{}. {} — {:.2} {} — {}\n",
            i + 1,
            p.name.get(locale),
            p.price,
            p.currency,
            availability(p)
        ));
    }
    out.trim_end().to_string()
}

pub fn knowledge_list(matches: &[KnowledgeMatch], query: &str, locale: Locale) -> String {
    if matches.is_empty() {
        return format!("No help articles found for \"{query}\".");
    }
    let mut out = String::new();
    for (i, m) in matches.iter().enumerate() {
        out.push_str(&format!(
            "{}. {}: {}\n",
            i + 1,
            m.article.title.get(locale),
            snippet(m.article.body.get(locale), 160)
        ));
    }
    out.trim_end().to_string()
}

pub fn comparison(products: &[Product], locale: Locale) -> String {
    if products.len() < 2 {
        return "Need at least two known products to compare.".to_string();
    }
    let mut out = String::new();
    for p in products {
        out.push_str(&format!(
            "{}: {:.2} {}, {}, brand {}, {}\n",
            p.name.get(locale),
            p.price,
            p.currency,
            p.category,
            p.brand,
            availability(p)
        ));
    }
    out.trim_end().to_string()
}

pub fn stock(product: &Product, locale: Locale) -> String {
    format!("{} is {}.", product.name.get(locale), availability(product))
}

pub fn quote(product: &Product, quantity: u32, locale: Locale) -> String {
    let total = product.price * f64::from(quantity);
    format!(
        "{} x {} = {:.2} {} ({:.2} {} per unit).",
        quantity,
        product.name.get(locale),
        total,
        product.currency,
        product.price,
        product.currency
    )
}

pub fn order_list(orders: &[Order]) -> String {
    if orders.is_empty() {
        return "No past orders on this account.".to_string();
    }
    let mut out = String::new();
    for (i, o) in orders.iter().enumerate() {
        let items: Vec<String> = o
            .items
            .iter()
            .map(|it| format!("{} x{}", it.name, it.quantity))
            .collect();
        out.push_str(&format!(
            "{}. Order {} ({:?}): {} — {:.2} {}\n",
            i + 1,
            o.id,
            o.status,
            items.join(", "),
            o.total,
            o.currency
        ));
    }
    out.trim_end().to_string()
}

fn availability(p: &Product) -> String {
    if p.in_stock {
        format!("in stock ({} available)", p.stock_qty)
    } else {
        "out of stock".to_string()
    }
}

fn snippet(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}…", cut.trim_end())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use shop_store::{LocalizedText, PublishStatus};

    use super::*;

    fn product(name: &str, price: f64, in_stock: bool) -> Product {
        Product {
            id: "p1".into(),
            sku: "SKU-1".into(),
            name: LocalizedText::new(name, name),
            description: LocalizedText::new("", ""),
            category: "polymers".into(),
            brand: "SABIC".into(),
            price,
            currency: "USD".into(),
            in_stock,
            stock_qty: if in_stock { 12 } else { 0 },
            status: PublishStatus::Published,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn product_lines_are_numbered_with_price_and_availability() {
        let matches = vec![
            SearchMatch {
                product: product("HDPE P6006", 950.0, true),
                similarity: 0.9,
                matched_text: String::new(),
            },
            SearchMatch {
                product: product("HDPE P4208", 920.0, false),
                similarity: 0.8,
                matched_text: String::new(),
            },
        ];
        let text = product_list(&matches, "hdpe", Locale::En);
        assert!(text.starts_with("1. HDPE P6006 — 950.00 USD — in stock (12 available)"));
        assert!(text.contains("2. HDPE P4208 — 920.00 USD — out of stock"));
        assert!(!text.contains('{'));
    }

    #[test]
    fn empty_results_name_the_query() {
        let text = product_list(&[], "zzz", Locale::En);
        assert!(text.contains("\"zzz\""));
        assert!(text.contains("No products"));
    }

    #[test]
    fn quote_multiplies_unit_price() {
        let text = quote(&product("Valve", 40.0, true), 25, Locale::En);
        assert!(text.contains("25 x Valve = 1000.00 USD"));
        assert!(text.contains("40.00 USD per unit"));
    }
}
