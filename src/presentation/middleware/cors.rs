//! CORS Middleware Configuration
//!
//! Browser access is for the seller dashboard only. Storefront webhooks are
//! server-to-server and never go through a preflight.

use std::time::Duration;

use axum::http::{header, HeaderValue, Method};
use tower_http::cors::{Any, CorsLayer};

use crate::config::CorsSettings;

const ALLOWED_METHODS: [Method; 5] = [
    Method::GET,
    Method::POST,
    Method::PATCH,
    Method::DELETE,
    Method::OPTIONS,
];

/// Create CORS layer from settings
///
/// No configured origins means any origin, for local development.
pub fn create_cors_layer(settings: &CorsSettings) -> CorsLayer {
    let origins = parse_origins(&settings.allowed_origins);

    let layer = CorsLayer::new()
        .allow_methods(ALLOWED_METHODS)
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT]);

    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer
            .allow_origin(origins)
            .max_age(Duration::from_secs(3600))
    }
}

/// Origins that are valid header values; the rest are logged and dropped.
fn parse_origins(raw: &[String]) -> Vec<HeaderValue> {
    raw.iter()
        .map(|o| o.trim().trim_end_matches('/'))
        .filter(|o| !o.is_empty())
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_and_drops_blank_origins() {
        let origins = parse_origins(&[
            "https://app.parcelhub.in/".into(),
            "  ".into(),
            "http://localhost:3000".into(),
        ]);
        assert_eq!(
            origins,
            vec![
                HeaderValue::from_static("https://app.parcelhub.in"),
                HeaderValue::from_static("http://localhost:3000"),
            ]
        );
    }

    #[test]
    fn drops_unparseable_origin() {
        assert!(parse_origins(&["bad\norigin".into()]).is_empty());
    }
}
