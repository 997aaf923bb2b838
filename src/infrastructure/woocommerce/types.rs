//! WooCommerce REST payloads.
//!
//! Only the fields the sync reads are modelled. Every field defaults when
//! missing and string fields also accept numbers or `null`, since plugins
//! routinely reshape these documents.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// One page of a list endpoint plus the pagination headers.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// `X-WP-Total`
    pub total: u64,
    /// `X-WP-TotalPages`
    pub total_pages: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WooAddress {
    #[serde(deserialize_with = "lenient_string")]
    pub first_name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub last_name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub company: String,
    #[serde(deserialize_with = "lenient_string")]
    pub address_1: String,
    #[serde(deserialize_with = "lenient_string")]
    pub address_2: String,
    #[serde(deserialize_with = "lenient_string")]
    pub city: String,
    #[serde(deserialize_with = "lenient_string")]
    pub state: String,
    #[serde(deserialize_with = "lenient_string")]
    pub postcode: String,
    #[serde(deserialize_with = "lenient_string")]
    pub country: String,
    #[serde(deserialize_with = "lenient_string")]
    pub email: String,
    #[serde(deserialize_with = "lenient_string")]
    pub phone: String,
}

impl WooAddress {
    /// "first last", trimmed; empty when both are blank.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
            .trim()
            .to_string()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WooLineItem {
    pub id: i64,
    #[serde(deserialize_with = "lenient_string")]
    pub name: String,
    pub product_id: i64,
    pub variation_id: i64,
    pub quantity: i32,
    #[serde(deserialize_with = "lenient_opt_string")]
    pub sku: Option<String>,
    /// Line amount before discounts, decimal string.
    #[serde(deserialize_with = "lenient_string")]
    pub subtotal: String,
    /// Line amount after discounts, decimal string.
    #[serde(deserialize_with = "lenient_string")]
    pub total: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WooOrder {
    pub id: i64,
    #[serde(deserialize_with = "lenient_string")]
    pub number: String,
    #[serde(deserialize_with = "lenient_string")]
    pub status: String,
    #[serde(deserialize_with = "lenient_string")]
    pub currency: String,
    #[serde(deserialize_with = "lenient_opt_string")]
    pub date_created_gmt: Option<String>,
    #[serde(deserialize_with = "lenient_opt_string")]
    pub date_modified_gmt: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub discount_total: String,
    #[serde(deserialize_with = "lenient_string")]
    pub shipping_total: String,
    #[serde(deserialize_with = "lenient_string")]
    pub total: String,
    #[serde(deserialize_with = "lenient_string")]
    pub payment_method: String,
    pub billing: WooAddress,
    pub shipping: WooAddress,
    pub line_items: Vec<WooLineItem>,
}

impl WooOrder {
    /// Storefront modification time, falling back to creation time.
    pub fn modified_at(&self) -> Option<DateTime<Utc>> {
        self.date_modified_gmt
            .as_deref()
            .and_then(parse_gmt)
            .or_else(|| self.date_created_gmt.as_deref().and_then(parse_gmt))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WooDimensions {
    #[serde(deserialize_with = "lenient_string")]
    pub length: String,
    #[serde(deserialize_with = "lenient_string")]
    pub width: String,
    #[serde(deserialize_with = "lenient_string")]
    pub height: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WooProduct {
    pub id: i64,
    /// Set on variations; 0 for top-level products.
    pub parent_id: i64,
    #[serde(deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(deserialize_with = "lenient_opt_string")]
    pub sku: Option<String>,
    /// Kilograms as a decimal string.
    #[serde(deserialize_with = "lenient_string")]
    pub weight: String,
    pub dimensions: WooDimensions,
}

/// Body of `order.deleted` deliveries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct WooDeleted {
    pub id: i64,
}

/// Parse WooCommerce `*_gmt` timestamps.
///
/// They come without an offset (`2024-05-01T10:20:30`); RFC 3339 input is
/// accepted as well.
pub fn parse_gmt(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_opt_string(deserializer)?.unwrap_or_default())
}

fn lenient_opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) if s.is_empty() => None,
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}
