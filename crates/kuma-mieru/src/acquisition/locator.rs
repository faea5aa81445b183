//! Locate the embedded preload payload inside a status page's HTML.
//!
//! Uptime Kuma newer than 1.18.4 ships the snapshot in `#preload-data`,
//! either as element text or as a `data-json` attribute. Older versions
//! assign it to `window.preloadData` inside an inline script; that path is
//! only tried when the marker element is missing entirely.

use regex::Regex;
use scraper::{Html, Selector};
use std::sync::OnceLock;

/// Id of the element that carries the preload payload.
pub const PRELOAD_MARKER_ID: &str = "preload-data";

/// Literal searched for by the legacy strategy.
pub const LEGACY_MARKER: &str = "window.preloadData";

/// Where a located payload came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreloadSource {
    /// Text content of the marker element.
    Script,
    /// `data-json` attribute of the marker element.
    DataJson,
}

impl PreloadSource {
    pub fn as_str(self) -> &'static str {
        match self {
            PreloadSource::Script => "script",
            PreloadSource::DataJson => "data-json",
        }
    }
}

/// Outcome of [`locate_payload`]. `source` is `None` for the legacy path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreloadExtraction {
    pub payload: Option<String>,
    pub source: Option<PreloadSource>,
}

impl PreloadExtraction {
    fn found(payload: String, source: Option<PreloadSource>) -> Self {
        Self {
            payload: Some(payload),
            source,
        }
    }

    fn absent() -> Self {
        Self::default()
    }

    pub fn is_absent(&self) -> bool {
        self.payload.is_none()
    }
}

fn marker_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse("#preload-data").expect("valid selector"))
}

fn script_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse("script").expect("valid selector"))
}

fn legacy_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)window\.preloadData\s*=\s*(\{.*?\});").expect("valid regex")
    })
}

/// Parse `html` and locate the payload.
pub fn locate_in_html(html: &str) -> PreloadExtraction {
    let document = Html::parse_document(html);
    locate_payload(&document)
}

/// Run the ordered strategies against a parsed document.
pub fn locate_payload(document: &Html) -> PreloadExtraction {
    match locate_marker(document) {
        Some(extraction) => extraction,
        None => locate_legacy(document),
    }
}

/// Strategies 1 and 2. `None` means the marker element does not exist.
fn locate_marker(document: &Html) -> Option<PreloadExtraction> {
    let element = document.select(marker_selector()).next()?;

    let text = element.text().collect::<String>();
    let text = text.trim();
    if !text.is_empty() {
        return Some(PreloadExtraction::found(
            text.to_string(),
            Some(PreloadSource::Script),
        ));
    }

    if let Some(data_json) = element.value().attr("data-json") {
        let trimmed = data_json.trim();
        if !trimmed.is_empty() && trimmed != "{}" && trimmed != "[]" {
            return Some(PreloadExtraction::found(
                trimmed.to_string(),
                Some(PreloadSource::DataJson),
            ));
        }
    }

    tracing::debug!("#{PRELOAD_MARKER_ID} present but carries no payload");
    Some(PreloadExtraction::absent())
}

/// Strategy 3: first inline script mentioning `window.preloadData`.
fn locate_legacy(document: &Html) -> PreloadExtraction {
    let script = document
        .select(script_selector())
        .map(|el| el.text().collect::<String>())
        .find(|text| text.contains(LEGACY_MARKER));

    let Some(script) = script else {
        return PreloadExtraction::absent();
    };

    match extract_legacy_literal(&script) {
        Some(literal) => {
            tracing::debug!("extracted preload data from {LEGACY_MARKER}");
            PreloadExtraction::found(literal, None)
        }
        None => {
            let preview: String = script.chars().take(200).collect();
            tracing::warn!("{LEGACY_MARKER} script found but not matched: {preview}");
            PreloadExtraction::absent()
        }
    }
}

/// Capture the object literal assigned to `window.preloadData`.
pub fn extract_legacy_literal(script: &str) -> Option<String> {
    legacy_pattern()
        .captures(script)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|s| !s.trim().is_empty())
}
