//! Status page JSON API, used when the HTML carries no preload payload.
//!
//! One request, no retries of its own. Every failure is loud: the caller
//! decides whether a failed fallback is fatal.

use super::http_client::Transport;
use super::validator::validate_preload_data;
use crate::error::{MieruError, MieruResult};
use crate::types::PreloadPayload;
use serde_json::Value;

/// Payload fetched from the API together with the URL that served it.
#[derive(Debug, Clone)]
pub struct ApiFallback {
    pub data: PreloadPayload,
    pub url: String,
}

/// Build `{base}/api/status-page/{page_id}`, stripping one trailing slash.
pub fn fallback_url(base_url: &str, page_id: &str) -> String {
    let base = base_url.strip_suffix('/').unwrap_or(base_url);
    format!("{base}/api/status-page/{page_id}")
}

/// Caller headers plus `Accept: application/json` when no accept header is set.
fn with_accept_header(headers: &[(String, String)]) -> Vec<(String, String)> {
    let mut out = headers.to_vec();
    if !out.iter().any(|(k, _)| k.eq_ignore_ascii_case("accept")) {
        out.push(("Accept".to_string(), "application/json".to_string()));
    }
    out
}

/// Fetch and validate the preload snapshot from the JSON API.
pub async fn fetch_fallback(
    transport: &dyn Transport,
    base_url: &str,
    page_id: &str,
    headers: &[(String, String)],
) -> MieruResult<ApiFallback> {
    if base_url.trim().is_empty() || page_id.trim().is_empty() {
        return Err(MieruError::configuration(
            "base URL and page id are required to fetch preload data from the API",
        ));
    }

    let url = fallback_url(base_url, page_id);
    let headers = with_accept_header(headers);

    let resp = transport.get(&url, &headers).await.map_err(|e| {
        MieruError::resolution_from("failed to request preload data from API", &url, e)
    })?;

    if !resp.is_success() {
        return Err(MieruError::resolution(
            format!("failed to fetch preload data from API: HTTP {}", resp.status),
            &url,
        ));
    }

    let value: Value = serde_json::from_str(&resp.body).map_err(|e| {
        let content_type = resp.header("content-type").unwrap_or("unknown");
        MieruError::resolution_from(
            format!("failed to parse preload data API response as JSON (content-type: {content_type})"),
            &url,
            e,
        )
    })?;

    if !validate_preload_data(&value) {
        return Err(MieruError::resolution(
            "preload data API response is missing required fields",
            &url,
        ));
    }

    let data: PreloadPayload = serde_json::from_value(value).map_err(|e| {
        MieruError::resolution_from("preload data API response has an unexpected shape", &url, e)
    })?;

    Ok(ApiFallback { data, url })
}
