//! Preload snapshot resolution: HTML extraction with an API fallback.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::acquisition::api_fallback::fetch_fallback;
use crate::acquisition::http_client::Transport;
use crate::acquisition::locator::{locate_in_html, PreloadSource};
use crate::acquisition::sanitizer::sanitize;
use crate::error::{MieruError, MieruResult};
use crate::types::{DashboardConfig, PageIdentity, PreloadPayload, Theme};

/// Keys that must be present in `config` before it is trusted.
pub const REQUIRED_CONFIG_FIELDS: [&str; 5] = ["slug", "title", "description", "icon", "theme"];

/// Characters of sanitized text quoted in parse errors.
const PARSE_PREVIEW_CHARS: usize = 100;

/// Resolves one status page into a [`PreloadPayload`].
///
/// Steps run in order and fail loudly:
///
/// 1. GET the HTML endpoint. Transport failure or non-2xx ends resolution.
/// 2. Locate the embedded payload.
/// 3. Payload found: sanitize and parse. A parse failure ends resolution.
/// 4. Nothing found: ask the status page API. Its failure ends resolution.
#[derive(Clone)]
pub struct PreloadResolver {
    transport: Arc<dyn Transport>,
    request_headers: Vec<(String, String)>,
}

impl PreloadResolver {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            request_headers: Vec::new(),
        }
    }

    /// Headers sent with both the HTML request and the API fallback.
    pub fn with_headers(mut self, headers: Vec<(String, String)>) -> Self {
        self.request_headers = headers;
        self
    }

    pub async fn resolve(&self, identity: &PageIdentity) -> MieruResult<PreloadPayload> {
        let endpoint = identity.html_endpoint.as_str();

        let resp = self
            .transport
            .get(endpoint, &self.request_headers)
            .await
            .map_err(|e| {
                MieruError::resolution_from(
                    "failed to get preload data, check network connection and server status",
                    endpoint,
                    e,
                )
            })?;

        if !resp.is_success() {
            return Err(MieruError::resolution(
                format!("failed to get HTML: HTTP {}", resp.status),
                endpoint,
            ));
        }

        // The parsed document is dropped here, before the next await.
        let extraction = locate_in_html(&resp.body);

        match extraction.payload {
            Some(raw) => {
                match extraction.source {
                    Some(PreloadSource::DataJson) => {
                        tracing::debug!("using preload data from data-json attribute")
                    }
                    Some(PreloadSource::Script) => {
                        tracing::debug!("using preload data from #preload-data script")
                    }
                    None => tracing::debug!("using preload data from legacy window assignment"),
                }
                parse_payload(&raw, endpoint)
            }
            None => {
                tracing::warn!(
                    page_id = %identity.page_id,
                    "preload script missing, attempting status page API fallback"
                );
                match fetch_fallback(
                    self.transport.as_ref(),
                    identity.base(),
                    &identity.page_id,
                    &self.request_headers,
                )
                .await
                {
                    Ok(fallback) => {
                        tracing::info!("using status page API fallback from {}", fallback.url);
                        Ok(fallback.data)
                    }
                    Err(e) => {
                        tracing::error!("status page API fallback failed: {e}");
                        Err(MieruError::resolution_from(
                            "preload script tag not found or empty and API fallback failed",
                            endpoint,
                            e,
                        ))
                    }
                }
            }
        }
    }
}

/// Sanitize and decode an embedded payload.
fn parse_payload(raw: &str, endpoint: &str) -> MieruResult<PreloadPayload> {
    let cleaned = sanitize(raw);

    let value: Value = serde_json::from_str(&cleaned).map_err(|e| {
        let preview: String = cleaned.chars().take(PARSE_PREVIEW_CHARS).collect();
        MieruError::resolution_from(
            format!("JSON parsing failed: {e}\nProcessed data: {preview}..."),
            endpoint,
            e,
        )
    })?;

    serde_json::from_value(value).map_err(|e| {
        MieruError::resolution_from(format!("failed to parse preload data: {e}"), endpoint, e)
    })
}

/// Check the required `config` keys and decode it with a normalized theme.
pub fn require_dashboard_config(payload: &PreloadPayload) -> MieruResult<DashboardConfig> {
    let raw = payload
        .config
        .as_ref()
        .ok_or_else(|| MieruError::missing_field("config"))?;

    for field in REQUIRED_CONFIG_FIELDS {
        if !raw.contains_key(field) {
            return Err(MieruError::missing_field(field));
        }
    }

    let theme = match raw.get("theme") {
        Some(Value::String(s)) => Theme::normalize(s),
        _ => return Err(MieruError::invalid_field("theme", "theme must be a string")),
    };

    let mut normalized: Map<String, Value> = raw.clone();
    normalized.insert("theme".to_string(), Value::String(theme.as_str().to_string()));

    serde_json::from_value(Value::Object(normalized))
        .map_err(|e| MieruError::invalid_field("config", e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    fn payload(config: Value) -> PreloadPayload {
        serde_json::from_value(json!({"config": config, "maintenanceList": []})).unwrap()
    }

    fn full_config(theme: Value) -> Value {
        json!({
            "slug": "main",
            "title": "Main",
            "description": null,
            "icon": "/upload/logo.png",
            "theme": theme,
            "published": true,
            "showTags": false,
            "customCSS": "body {}",
            "footerText": null,
            "showPoweredBy": true,
            "googleAnalyticsId": null,
            "showCertificateExpiry": false,
            "autoRefreshInterval": 300
        })
    }

    #[test]
    fn test_theme_normalized_to_known_values() {
        for (raw, expected) in [
            ("dark", Theme::Dark),
            ("light", Theme::Light),
            ("auto", Theme::System),
            ("", Theme::System),
            ("DARK", Theme::System),
        ] {
            let cfg = require_dashboard_config(&payload(full_config(json!(raw)))).unwrap();
            assert_eq!(cfg.theme, expected, "theme {raw:?}");
        }
    }

    #[test]
    fn test_config_fields_decoded() {
        let cfg = require_dashboard_config(&payload(full_config(json!("dark")))).unwrap();
        assert_eq!(cfg.slug, "main");
        assert_eq!(cfg.description, None);
        assert_eq!(cfg.custom_css, "body {}");
        assert_eq!(cfg.footer_text, "");
        assert!(!cfg.show_tags);
        assert_eq!(cfg.extra["autoRefreshInterval"], json!(300));
    }

    #[test]
    fn test_missing_config_and_fields() {
        let err = require_dashboard_config(&PreloadPayload::default()).unwrap_err();
        assert!(matches!(err, MieruError::Validation { ref field, .. } if field == "config"));

        for field in REQUIRED_CONFIG_FIELDS {
            let mut cfg = full_config(json!("dark"));
            cfg.as_object_mut().unwrap().remove(field);
            let err = require_dashboard_config(&payload(cfg)).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation);
            assert!(
                matches!(err, MieruError::Validation { field: ref f, .. } if f == field),
                "expected {field} to be named"
            );
        }
    }

    #[test]
    fn test_non_string_theme_rejected() {
        for theme in [json!(1), json!(null), json!({"mode": "dark"})] {
            let err = require_dashboard_config(&payload(full_config(theme))).unwrap_err();
            assert!(matches!(err, MieruError::Validation { ref field, .. } if field == "theme"));
        }
    }

    #[test]
    fn test_parse_error_carries_preview() {
        let raw = format!("{{\"a\": NaN, \"pad\": \"{}\"}}", "x".repeat(300));
        let err = parse_payload(&raw, "https://kuma/status/main").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("JSON parsing failed"));
        assert!(msg.contains("Processed data: {\"a\": NaN"));
        assert!(!msg.contains(&"x".repeat(200)));
        assert_eq!(err.endpoint(), Some("https://kuma/status/main"));
    }

    #[test]
    fn test_parse_repairs_near_json() {
        let out = parse_payload(
            "{config: {'slug': 'main',}, maintenanceList: [], incident: undefined,}",
            "https://kuma/status/main",
        )
        .unwrap();
        assert_eq!(out.config.unwrap()["slug"], "main");
        assert!(out.incident.is_none());
    }
}
