//! Storefront payloads → domain records.

use std::collections::HashMap;

use chrono::Utc;
use uuid::Uuid;

use super::status::map_inbound_status;
use crate::application::services::order_service::DEFAULT_ITEM_WEIGHT_GRAMS;
use crate::domain::{
    normalize_phone, Address, Order, OrderChannel, OrderItem, PaymentMode, WooCommerceProductMapping,
    WooCommerceStore, DEFAULT_COUNTRY, DEFAULT_CURRENCY,
};
use crate::infrastructure::woocommerce::{WooAddress, WooOrder, WooProduct};
use crate::shared::money::parse_minor_units;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MapError {
    #[error("invalid amount in {field}: {value:?}")]
    InvalidAmount { field: &'static str, value: String },

    #[error("order weight out of range at line item {line}")]
    WeightOutOfRange { line: i64 },
}

/// Product mappings of one store keyed by `(product_id, variation_id)`.
#[derive(Debug, Clone, Default)]
pub struct ProductLookup {
    by_key: HashMap<(i64, i64), WooCommerceProductMapping>,
}

impl ProductLookup {
    pub fn new(mappings: impl IntoIterator<Item = WooCommerceProductMapping>) -> Self {
        Self {
            by_key: mappings
                .into_iter()
                .map(|m| ((m.woo_product_id, m.woo_variation_id), m))
                .collect(),
        }
    }

    /// Unit weight, preferring the variation over its parent product.
    pub fn weight_for(&self, product_id: i64, variation_id: i64) -> Option<i32> {
        let variation = (variation_id != 0)
            .then(|| self.by_key.get(&(product_id, variation_id)))
            .flatten()
            .and_then(|m| m.weight_grams);
        variation.or_else(|| self.by_key.get(&(product_id, 0)).and_then(|m| m.weight_grams))
    }
}

fn amount(field: &'static str, raw: &str) -> Result<i64, MapError> {
    parse_minor_units(raw).map_err(|_| MapError::InvalidAmount {
        field,
        value: raw.to_string(),
    })
}

fn pick<'a>(primary: &'a str, fallback: &'a str) -> &'a str {
    if primary.trim().is_empty() {
        fallback.trim()
    } else {
        primary.trim()
    }
}

/// Shipping address with blank fields taken from billing.
fn shipping_address(shipping: &WooAddress, billing: &WooAddress) -> Address {
    let name = match shipping.full_name() {
        n if n.is_empty() => billing.full_name(),
        n => n,
    };
    let phone = pick(&shipping.phone, &billing.phone);
    let line2 = pick(&shipping.address_2, &billing.address_2);
    let country = pick(&shipping.country, &billing.country);

    Address {
        name,
        phone: phone.to_string(),
        line1: pick(&shipping.address_1, &billing.address_1).to_string(),
        line2: (!line2.is_empty()).then(|| line2.to_string()),
        city: pick(&shipping.city, &billing.city).to_string(),
        state: pick(&shipping.state, &billing.state).to_string(),
        pincode: pick(&shipping.postcode, &billing.postcode).to_string(),
        country: if country.is_empty() {
            DEFAULT_COUNTRY.to_string()
        } else {
            country.to_string()
        },
    }
    .normalize()
}

/// Build the order record for a storefront order.
///
/// The returned order carries a fresh id; on update the repository keeps
/// the stored id, company and creation time.
pub fn map_order(
    store: &WooCommerceStore,
    woo: &WooOrder,
    products: &ProductLookup,
) -> Result<Order, MapError> {
    let mut items = Vec::with_capacity(woo.line_items.len());
    let mut subtotal = 0i64;
    let mut weight_grams = 0i32;

    for line in &woo.line_items {
        let line_subtotal = amount("line_items.subtotal", &line.subtotal)?;
        let quantity = line.quantity.max(1);
        let unit_weight = products.weight_for(line.product_id, line.variation_id);

        subtotal = subtotal
            .checked_add(line_subtotal)
            .ok_or_else(|| MapError::InvalidAmount {
                field: "line_items.subtotal",
                value: line.subtotal.clone(),
            })?;
        weight_grams = quantity
            .checked_mul(unit_weight.unwrap_or(DEFAULT_ITEM_WEIGHT_GRAMS))
            .and_then(|w| weight_grams.checked_add(w))
            .ok_or(MapError::WeightOutOfRange { line: line.id })?;

        items.push(OrderItem {
            sku: line.sku.clone(),
            name: line.name.trim().to_string(),
            quantity,
            unit_price: line_subtotal / quantity as i64,
            weight_grams: unit_weight,
            external_product_id: Some(if line.variation_id != 0 {
                line.variation_id
            } else {
                line.product_id
            }),
        });
    }

    let shipping_address = shipping_address(&woo.shipping, &woo.billing);
    let customer_phone = normalize_phone(&shipping_address.phone)
        .unwrap_or_else(|| shipping_address.phone.clone());
    let email = woo.billing.email.trim().to_lowercase();

    let now = Utc::now();
    Ok(Order {
        id: Uuid::now_v7(),
        company_id: store.company_id,
        channel: OrderChannel::WooCommerce,
        store_id: Some(store.id),
        external_id: Some(woo.id),
        order_number: match woo.number.trim() {
            "" => woo.id.to_string(),
            n => n.to_string(),
        },
        status: map_inbound_status(&woo.status),
        payment_mode: if woo.payment_method.trim().eq_ignore_ascii_case("cod") {
            PaymentMode::Cod
        } else {
            PaymentMode::Prepaid
        },
        customer_name: shipping_address.name.clone(),
        customer_email: (!email.is_empty()).then_some(email),
        customer_phone,
        shipping_address,
        items,
        subtotal,
        discount: amount("discount_total", &woo.discount_total)?,
        shipping: amount("shipping_total", &woo.shipping_total)?,
        total: amount("total", &woo.total)?,
        currency: match woo.currency.trim() {
            "" => DEFAULT_CURRENCY.to_string(),
            c => c.to_uppercase(),
        },
        weight_grams,
        promo_code: None,
        external_updated_at: woo.modified_at(),
        created_at: now,
        updated_at: now,
    })
}

/// Kilogram string → grams; blank, zero or garbage is unknown.
fn kg_to_grams(raw: &str) -> Option<i32> {
    let kg: f64 = raw.trim().parse().ok()?;
    let grams = (kg * 1000.0).round();
    (grams >= 1.0 && grams <= i32::MAX as f64).then_some(grams as i32)
}

/// Centimetre string → whole centimetres, rounded up.
fn cm(raw: &str) -> Option<i32> {
    let value: f64 = raw.trim().parse().ok()?;
    let value = value.ceil();
    (value >= 1.0 && value <= i32::MAX as f64).then_some(value as i32)
}

/// Mapping row for a product or variation.
///
/// Variations are keyed under their parent product.
pub fn map_product(store_id: Uuid, product: &WooProduct) -> WooCommerceProductMapping {
    let (woo_product_id, woo_variation_id) = if product.parent_id != 0 {
        (product.parent_id, product.id)
    } else {
        (product.id, 0)
    };

    WooCommerceProductMapping {
        id: Uuid::now_v7(),
        store_id,
        woo_product_id,
        woo_variation_id,
        sku: product.sku.clone(),
        name: product.name.trim().to_string(),
        weight_grams: kg_to_grams(&product.weight),
        length_cm: cm(&product.dimensions.length),
        breadth_cm: cm(&product.dimensions.width),
        height_cm: cm(&product.dimensions.height),
        updated_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::OrderStatus;
    use crate::infrastructure::woocommerce::{WooDimensions, WooLineItem};
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn store() -> WooCommerceStore {
        let now = Utc::now();
        WooCommerceStore {
            id: Uuid::now_v7(),
            company_id: Uuid::now_v7(),
            name: "Chai Co".into(),
            store_url: "https://chai.example".into(),
            consumer_key: "ck_1".into(),
            consumer_secret: "cs_1".into(),
            webhook_secret: "s".into(),
            is_active: true,
            last_synced_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn mapping(store_id: Uuid, product: i64, variation: i64, grams: i32) -> WooCommerceProductMapping {
        WooCommerceProductMapping {
            id: Uuid::now_v7(),
            store_id,
            woo_product_id: product,
            woo_variation_id: variation,
            sku: None,
            name: "x".into(),
            weight_grams: Some(grams),
            length_cm: None,
            breadth_cm: None,
            height_cm: None,
            updated_at: Utc::now(),
        }
    }

    fn woo_order() -> WooOrder {
        WooOrder {
            id: 812,
            number: "".into(),
            status: "wc-processing".into(),
            currency: "inr".into(),
            date_created_gmt: Some("2026-02-01T08:00:00".into()),
            date_modified_gmt: Some("2026-02-02T09:30:00".into()),
            discount_total: "50.00".into(),
            shipping_total: "40".into(),
            total: "1190.00".into(),
            payment_method: "cod".into(),
            billing: WooAddress {
                first_name: "Asha".into(),
                last_name: "Rao".into(),
                address_1: "4 Lake View".into(),
                city: "Bengaluru".into(),
                state: "KA".into(),
                postcode: "560034".into(),
                country: "IN".into(),
                email: "Asha@Example.com".into(),
                phone: "+91 99000 11223".into(),
                ..Default::default()
            },
            shipping: WooAddress {
                address_1: "7 Hill Road".into(),
                city: "Mysuru".into(),
                postcode: "570001".into(),
                ..Default::default()
            },
            line_items: vec![
                WooLineItem {
                    id: 1,
                    name: "Masala Chai".into(),
                    product_id: 31,
                    variation_id: 44,
                    quantity: 2,
                    sku: Some("CHAI-250".into()),
                    subtotal: "800.00".into(),
                    total: "760.00".into(),
                },
                WooLineItem {
                    id: 2,
                    name: "Kettle".into(),
                    product_id: 90,
                    variation_id: 0,
                    quantity: 1,
                    sku: None,
                    subtotal: "400".into(),
                    total: "390".into(),
                },
            ],
        }
    }

    #[test]
    fn maps_order_with_billing_fallback() {
        let store = store();
        let lookup = ProductLookup::new(vec![
            mapping(store.id, 31, 0, 300),
            mapping(store.id, 31, 44, 250),
        ]);

        let order = map_order(&store, &woo_order(), &lookup).unwrap();

        assert_eq!(order.company_id, store.company_id);
        assert_eq!(order.external_id, Some(812));
        assert_eq!(order.order_number, "812");
        assert_eq!(order.status, OrderStatus::Processing);
        assert_eq!(order.payment_mode, PaymentMode::Cod);
        assert_eq!(order.currency, "INR");
        assert_eq!(order.subtotal, 120_000);
        assert_eq!(order.discount, 5_000);
        assert_eq!(order.shipping, 4_000);
        assert_eq!(order.total, 119_000);
        // variation mapping wins; kettle is unmapped
        assert_eq!(order.weight_grams, 2 * 250 + DEFAULT_ITEM_WEIGHT_GRAMS);
        assert_eq!(order.items[0].unit_price, 40_000);
        assert_eq!(order.items[0].external_product_id, Some(44));

        assert_eq!(order.customer_name, "Asha Rao");
        assert_eq!(order.customer_phone, "9900011223");
        assert_eq!(order.customer_email.as_deref(), Some("asha@example.com"));
        assert_eq!(order.shipping_address.line1, "7 Hill Road");
        assert_eq!(order.shipping_address.city, "Mysuru");
        assert_eq!(order.shipping_address.state, "KA");
        assert_eq!(
            order.external_updated_at,
            Some(Utc.with_ymd_and_hms(2026, 2, 2, 9, 30, 0).unwrap())
        );
    }

    #[test]
    fn bad_amount_is_an_error() {
        let mut woo = woo_order();
        woo.total = "1,190.00".into();
        let err = map_order(&store(), &woo, &ProductLookup::default()).unwrap_err();
        assert_eq!(
            err,
            MapError::InvalidAmount {
                field: "total",
                value: "1,190.00".into()
            }
        );
    }

    #[test]
    fn huge_quantity_is_rejected() {
        let mut woo = woo_order();
        woo.line_items.truncate(1);
        woo.line_items[0].product_id = 77;
        woo.line_items[0].variation_id = 0;
        woo.line_items[0].quantity = 5_000_000;

        let err = map_order(&store(), &woo, &ProductLookup::default()).unwrap_err();
        assert_eq!(err, MapError::WeightOutOfRange { line: 1 });
    }

    #[test]
    fn maps_variation_product() {
        let store_id = Uuid::now_v7();
        let product = WooProduct {
            id: 44,
            parent_id: 31,
            name: " Masala Chai 250g ".into(),
            sku: Some("CHAI-250".into()),
            weight: "0.275".into(),
            dimensions: WooDimensions {
                length: "10".into(),
                width: "7.2".into(),
                height: "".into(),
            },
        };

        let m = map_product(store_id, &product);
        assert_eq!((m.woo_product_id, m.woo_variation_id), (31, 44));
        assert_eq!(m.name, "Masala Chai 250g");
        assert_eq!(m.weight_grams, Some(275));
        assert_eq!(m.length_cm, Some(10));
        assert_eq!(m.breadth_cm, Some(8));
        assert_eq!(m.height_cm, None);
    }

    #[test]
    fn unusable_weights_are_unknown() {
        assert_eq!(kg_to_grams(""), None);
        assert_eq!(kg_to_grams("0"), None);
        assert_eq!(kg_to_grams("heavy"), None);
        assert_eq!(kg_to_grams("1.5"), Some(1500));
    }
}
