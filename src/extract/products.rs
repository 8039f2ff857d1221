use crate::extract::fields;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

/// A product record, as extracted and as stored after merging
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    #[serde(default, deserialize_with = "fields::opt_string", skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, deserialize_with = "fields::opt_string", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "fields::opt_string", skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "fields::opt_string", skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(default, deserialize_with = "fields::string_map", skip_serializing_if = "BTreeMap::is_empty")]
    pub specs: BTreeMap<String, String>,
    #[serde(default, deserialize_with = "fields::opt_string", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "fields::opt_string", skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, deserialize_with = "fields::opt_string", skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "fields::string_list", skip_serializing_if = "Vec::is_empty")]
    pub reviews: Vec<String>,
    #[serde(default, deserialize_with = "fields::opt_string", skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, deserialize_with = "fields::opt_string", skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
}

/// Composite identity used to drop duplicate products
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProductKey {
    NamePrice(String, String),
    NameUrl(String, String),
    NameOnly(String),
}

impl Product {
    /// Dedup key: `(name, price)`, else `(name, url)`, else the name alone
    ///
    /// Name and price compare lower-cased and trimmed. Products without a
    /// name have no key and are discarded by the merge.
    pub fn dedup_key(&self) -> Option<ProductKey> {
        let name = normalized(self.name.as_deref()).to_lowercase();
        if name.is_empty() {
            return None;
        }

        let price = normalized(self.price.as_deref()).to_lowercase();
        let url = normalized(self.url.as_deref());
        Some(if !price.is_empty() {
            ProductKey::NamePrice(name, price)
        } else if !url.is_empty() {
            ProductKey::NameUrl(name, url.to_string())
        } else {
            ProductKey::NameOnly(name)
        })
    }
}

fn normalized(value: Option<&str>) -> &str {
    value.map(str::trim).unwrap_or("")
}

/// Merges per-chunk product lists into one catalog
///
/// The first product seen under a key wins; later duplicates are dropped
/// whole. Kept products get the domain and a 1-based `product_id`.
pub fn merge_products(domain: &str, lists: &[Vec<Product>]) -> Vec<Product> {
    let mut seen = HashSet::new();
    let mut merged = Vec::new();

    for product in lists.iter().flatten() {
        let Some(key) = product.dedup_key() else {
            debug!(domain = %domain, "Dropping product without a name");
            continue;
        };
        if seen.insert(key) {
            merged.push(product.clone());
        }
    }

    for (index, product) in merged.iter_mut().enumerate() {
        product.domain = Some(domain.to_string());
        product.product_id = Some(format!("{}_product_{}", domain, index + 1));
    }
    merged
}

/// Reads the product list out of a model response
///
/// Accepts a bare array or an object with a `products` array. Entries that
/// are not objects are skipped; any other shape yields an empty list.
pub fn parse_products_response(value: Value) -> Vec<Product> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("products") {
            Some(Value::Array(items)) => items,
            _ => return Vec::new(),
        },
        _ => return Vec::new(),
    };

    items
        .into_iter()
        .filter(Value::is_object)
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect()
}
