//! Storefront order status vocabulary.

use crate::domain::{OrderStatus, ShipmentStatus};

/// External status → internal status.
static INBOUND: &[(&str, OrderStatus)] = &[
    ("pending", OrderStatus::Pending),
    ("processing", OrderStatus::Processing),
    ("on-hold", OrderStatus::OnHold),
    ("completed", OrderStatus::Completed),
    ("cancelled", OrderStatus::Cancelled),
    ("refunded", OrderStatus::Refunded),
    ("failed", OrderStatus::Failed),
    ("checkout-draft", OrderStatus::Pending),
    ("trash", OrderStatus::Cancelled),
];

/// Map a WooCommerce order status onto [`OrderStatus`].
///
/// Input is trimmed, lower-cased and stripped of the `wc-` prefix used by
/// post statuses. Custom statuses from plugins fall back to `Pending`.
pub fn map_inbound_status(raw: &str) -> OrderStatus {
    let normalized = raw.trim().to_lowercase();
    let key = normalized.strip_prefix("wc-").unwrap_or(&normalized);

    match INBOUND.iter().find(|(name, _)| *name == key) {
        Some((_, status)) => *status,
        None => {
            tracing::debug!(status = %raw, "Unknown WooCommerce status, using pending");
            OrderStatus::Pending
        }
    }
}

/// Storefront status to report when a shipment reaches `status`.
pub fn map_outbound_status(status: ShipmentStatus) -> Option<&'static str> {
    match status {
        ShipmentStatus::Delivered => Some("completed"),
        ShipmentStatus::Cancelled => Some("cancelled"),
        _ => None,
    }
}
