//! Process settings: environment layered over the generated config file.
//!
//! | Variable | Default |
//! |---|---|
//! | `UPTIME_KUMA_BASE_URL` | from file, else required |
//! | `PAGE_ID` (comma or whitespace separated) | from file, else required |
//! | `FEATURE_EDIT_THIS_PAGE` | `false` |
//! | `FEATURE_SHOW_STAR_BUTTON` | `true` |
//! | `KUMA_MIERU_FETCH_TIMEOUT_MS` | `10000` |
//! | `KUMA_MIERU_FETCH_MAX_RETRIES` | `3` |
//! | `KUMA_MIERU_FETCH_RETRY_DELAY_MS` | `1000` |
//! | `KUMA_MIERU_CONFIG` | `config/generated-config.json` |

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::acquisition::http_client::TransportOptions;
use crate::error::{MieruError, MieruResult};
use crate::site::with_resolved_icons;
use crate::types::{Config, PageEntry, PageIdentity, SiteMeta};

pub const DEFAULT_CONFIG_PATH: &str = "config/generated-config.json";

/// On-disk shape written by `generate-config` and read at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedConfig {
    pub base_url: String,
    pub page_id: String,
    pub page_ids: Vec<String>,
    #[serde(default)]
    pub pages: Vec<PageEntry>,
    #[serde(default)]
    pub site_meta: SiteMeta,
    #[serde(default)]
    pub is_placeholder: bool,
    #[serde(default)]
    pub is_edit_this_page: bool,
    #[serde(default = "default_true")]
    pub is_show_star_button: bool,
}

fn default_true() -> bool {
    true
}

impl GeneratedConfig {
    pub fn load(path: &Path) -> MieruResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            MieruError::configuration(format!("failed to read {}: {e}", path.display()))
        })?;
        serde_json::from_str(&text).map_err(|e| {
            MieruError::configuration(format!("invalid config file {}: {e}", path.display()))
        })
    }
}

/// Validated settings, built once at startup and shared by `Arc`.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub base_url: Url,
    pub default_page_id: String,
    pub page_ids: Vec<String>,
    pub pages: Vec<PageEntry>,
    pub site_meta: SiteMeta,
    pub is_placeholder: bool,
    pub is_edit_this_page: bool,
    pub is_show_star_button: bool,
    pub transport: TransportOptions,
}

impl Settings {
    /// Minimal settings for one or more pages, default metadata.
    pub fn new(base_url: &str, page_ids: &[&str]) -> MieruResult<Self> {
        let page_ids = dedupe(page_ids.iter().map(|s| s.trim().to_string()));
        let base_url = parse_base_url(base_url)?;
        let default_page_id = first_page_id(&page_ids)?;
        let pages = page_ids
            .iter()
            .map(|id| PageEntry {
                id: id.clone(),
                site_meta: SiteMeta::default(),
            })
            .collect();
        Ok(Self {
            base_url,
            default_page_id,
            page_ids,
            pages,
            site_meta: SiteMeta::default(),
            is_placeholder: false,
            is_edit_this_page: false,
            is_show_star_button: true,
            transport: TransportOptions::default(),
        })
    }

    pub fn from_env() -> MieruResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build settings from a variable lookup. Values from the lookup win
    /// over the config file named by `KUMA_MIERU_CONFIG`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> MieruResult<Self> {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let config_path = var("KUMA_MIERU_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
        let file = if config_path.exists() {
            tracing::debug!("loading settings from {}", config_path.display());
            Some(GeneratedConfig::load(&config_path)?)
        } else {
            None
        };

        let env_base = var("UPTIME_KUMA_BASE_URL");
        let env_pages = var("PAGE_ID");
        if env_base.is_some() || env_pages.is_some() {
            tracing::info!("using runtime environment variables for configuration");
        }

        let raw_base = env_base
            .or_else(|| file.as_ref().map(|f| f.base_url.clone()))
            .ok_or_else(|| MieruError::configuration("UPTIME_KUMA_BASE_URL is required"))?;
        let base_url = parse_base_url(&raw_base)?;

        let page_ids = match (&env_pages, &file) {
            (Some(raw), _) => parse_page_ids(raw),
            (None, Some(f)) if !f.page_ids.is_empty() => dedupe(f.page_ids.iter().cloned()),
            (None, Some(f)) => parse_page_ids(&f.page_id),
            (None, None) => Vec::new(),
        };
        let default_page_id = first_page_id(&page_ids)?;

        let file_site_meta = file.as_ref().map(|f| f.site_meta.clone()).unwrap_or_default();
        let pages: Vec<PageEntry> = page_ids
            .iter()
            .map(|id| PageEntry {
                id: id.clone(),
                site_meta: file
                    .as_ref()
                    .and_then(|f| f.pages.iter().find(|p| &p.id == id))
                    .map(|p| p.site_meta.clone())
                    .unwrap_or_else(|| file_site_meta.clone()),
            })
            .collect();
        let site_meta = pages
            .iter()
            .find(|p| p.id == default_page_id)
            .map(|p| p.site_meta.clone())
            .unwrap_or(file_site_meta);

        let is_edit_this_page = var("FEATURE_EDIT_THIS_PAGE")
            .map(|v| parse_flag(&v))
            .or_else(|| file.as_ref().map(|f| f.is_edit_this_page))
            .unwrap_or(false);
        let is_show_star_button = var("FEATURE_SHOW_STAR_BUTTON")
            .map(|v| parse_flag(&v))
            .or_else(|| file.as_ref().map(|f| f.is_show_star_button))
            .unwrap_or(true);

        let defaults = TransportOptions::default();
        let transport = TransportOptions {
            timeout_ms: read_number(&var, "KUMA_MIERU_FETCH_TIMEOUT_MS", defaults.timeout_ms),
            max_retries: read_number(&var, "KUMA_MIERU_FETCH_MAX_RETRIES", defaults.max_retries),
            retry_delay_ms: read_number(
                &var,
                "KUMA_MIERU_FETCH_RETRY_DELAY_MS",
                defaults.retry_delay_ms,
            ),
        };

        Ok(Self {
            base_url,
            default_page_id,
            page_ids,
            pages,
            site_meta,
            is_placeholder: file.as_ref().is_some_and(|f| f.is_placeholder),
            is_edit_this_page,
            is_show_star_button,
            transport,
        })
    }

    pub fn is_known(&self, page_id: &str) -> bool {
        self.page_ids.iter().any(|id| id == page_id)
    }

    pub fn identity(&self, page_id: &str) -> MieruResult<PageIdentity> {
        PageIdentity::derive(&self.base_url, page_id).map_err(|e| {
            MieruError::configuration(format!("cannot derive endpoints for {page_id}: {e}"))
        })
    }

    /// Resolve the configuration of `page_id`, or of the default page.
    pub fn page_config(&self, page_id: Option<&str>) -> MieruResult<Config> {
        let page_id = match page_id {
            None => self.default_page_id.as_str(),
            Some(id) if self.is_known(id) => id,
            Some(id) => {
                return Err(MieruError::configuration(format!(
                    "invalid status page id: {id}"
                )))
            }
        };

        let site_meta = self
            .pages
            .iter()
            .find(|p| p.id == page_id)
            .map(|p| &p.site_meta)
            .unwrap_or(&self.site_meta);

        Ok(Config {
            identity: self.identity(page_id)?,
            default_page_id: self.default_page_id.clone(),
            page_ids: self.page_ids.clone(),
            pages: self.pages.clone(),
            site_meta: with_resolved_icons(site_meta, self.base_url.as_str()),
            is_placeholder: self.is_placeholder,
            is_edit_this_page: self.is_edit_this_page,
            is_show_star_button: self.is_show_star_button,
        })
    }
}

/// Split on commas and whitespace, drop empties, keep first occurrences.
pub fn parse_page_ids(raw: &str) -> Vec<String> {
    dedupe(
        raw.split(|c: char| c == ',' || c.is_whitespace())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
    )
}

fn dedupe(ids: impl Iterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for id in ids {
        if !id.is_empty() && !out.contains(&id) {
            out.push(id);
        }
    }
    out
}

fn first_page_id(page_ids: &[String]) -> MieruResult<String> {
    page_ids.first().cloned().ok_or_else(|| {
        MieruError::configuration("PAGE_ID must contain at least one status page identifier")
    })
}

fn parse_base_url(raw: &str) -> MieruResult<Url> {
    let url = Url::parse(raw.trim()).map_err(|e| {
        MieruError::configuration(format!("UPTIME_KUMA_BASE_URL must be a valid URL: {e}"))
    })?;
    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        return Err(MieruError::configuration(format!(
            "UPTIME_KUMA_BASE_URL must be an absolute http(s) URL: {raw}"
        )));
    }
    Ok(url)
}

fn parse_flag(raw: &str) -> bool {
    raw.eq_ignore_ascii_case("true")
}

fn read_number<T: std::str::FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    name: &str,
    default_value: T,
) -> T {
    var(name)
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default_value)
}
