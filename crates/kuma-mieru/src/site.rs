//! Site metadata: feature overrides, icon candidates and icon URLs.

use crate::types::{SiteMeta, DEFAULT_ICON, DEFAULT_SITE_DESCRIPTION, DEFAULT_SITE_TITLE};
use serde_json::{Map, Value};

/// Operator overrides for site metadata.
///
/// `Some("")` is a deliberate override to an empty value, distinct from an
/// unset variable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureOverrides {
    pub title: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
}

impl FeatureOverrides {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            title: lookup("FEATURE_TITLE"),
            description: lookup("FEATURE_DESCRIPTION"),
            icon: lookup("FEATURE_ICON"),
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn has_any(&self) -> bool {
        self.title.is_some() || self.description.is_some() || self.icon.is_some()
    }
}

/// Title, description and icon as published by the status page itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteMeta {
    pub title: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
}

impl RemoteMeta {
    /// Read string fields from a raw dashboard `config` map. Non-strings are
    /// treated as absent.
    pub fn from_config(config: &Map<String, Value>) -> Self {
        let text = |key: &str| config.get(key).and_then(Value::as_str).map(str::to_string);
        Self {
            title: text("title"),
            description: text("description"),
            icon: text("icon"),
        }
    }
}

/// Ordered, de-duplicated icon list; the default icon is always included.
pub fn build_icon_candidates<'a>(sources: impl IntoIterator<Item = Option<&'a str>>) -> Vec<String> {
    let mut candidates: Vec<String> = Vec::new();

    for source in sources.into_iter().flatten() {
        let trimmed = source.trim();
        if trimmed.is_empty() || candidates.iter().any(|c| c == trimmed) {
            continue;
        }
        candidates.push(trimmed.to_string());
    }

    if !candidates.iter().any(|c| c == DEFAULT_ICON) {
        candidates.push(DEFAULT_ICON.to_string());
    }

    candidates
}

/// Merge overrides over remote values over defaults.
pub fn resolve_site_meta(overrides: &FeatureOverrides, remote: Option<&RemoteMeta>) -> SiteMeta {
    let title = match &overrides.title {
        Some(v) => v.clone(),
        None => remote
            .and_then(|r| r.title.clone())
            .unwrap_or_else(|| DEFAULT_SITE_TITLE.to_string()),
    };

    let description = match &overrides.description {
        Some(v) => v.clone(),
        None => remote
            .and_then(|r| r.description.clone())
            .unwrap_or_else(|| DEFAULT_SITE_DESCRIPTION.to_string()),
    };

    let icon_candidates = build_icon_candidates([
        overrides.icon.as_deref(),
        remote.and_then(|r| r.icon.as_deref()),
    ]);

    SiteMeta {
        title,
        description,
        icon: icon_candidates[0].clone(),
        icon_candidates,
    }
}

/// Make an icon path loadable from the dashboard.
///
/// Absolute `http(s)` URLs and the bundled default icon are kept; anything
/// else is served by the upstream instance and is joined onto `base_url`.
pub fn resolve_icon_url(base_url: &str, icon: Option<&str>) -> String {
    let Some(icon) = icon.filter(|i| !i.is_empty()) else {
        return DEFAULT_ICON.to_string();
    };

    if icon.starts_with("http://") || icon.starts_with("https://") || icon == DEFAULT_ICON {
        return icon.to_string();
    }

    let base = base_url.trim_end_matches('/');
    format!("{base}/{}", icon.trim_start_matches('/'))
}

/// Resolve every candidate, dropping duplicates. Never empty.
pub fn resolve_icon_candidates(base_url: &str, icons: &[String]) -> Vec<String> {
    let mut resolved: Vec<String> = Vec::new();
    for icon in icons {
        let url = resolve_icon_url(base_url, Some(icon));
        if !resolved.contains(&url) {
            resolved.push(url);
        }
    }
    if resolved.is_empty() {
        resolved.push(resolve_icon_url(base_url, None));
    }
    resolved
}

/// Copy of `meta` with icons resolved against `base_url`.
pub fn with_resolved_icons(meta: &SiteMeta, base_url: &str) -> SiteMeta {
    let icon_candidates = resolve_icon_candidates(base_url, &meta.icon_candidates);
    SiteMeta {
        title: if meta.title.is_empty() {
            DEFAULT_SITE_TITLE.to_string()
        } else {
            meta.title.clone()
        },
        description: if meta.description.is_empty() {
            DEFAULT_SITE_DESCRIPTION.to_string()
        } else {
            meta.description.clone()
        },
        icon: icon_candidates[0].clone(),
        icon_candidates,
    }
}
