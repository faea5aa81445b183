//! Data model for resolved status page snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use url::Url;

use crate::time::{serde_utc, serde_utc_opt};

/// Default icon path served by the dashboard itself.
pub const DEFAULT_ICON: &str = "/icon.svg";
pub const DEFAULT_SITE_TITLE: &str = "Kuma Mieru";
pub const DEFAULT_SITE_DESCRIPTION: &str = "A beautiful and modern uptime monitoring dashboard";

/// Identifier that upstream may send as a number or a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Ident {
    Num(i64),
    Text(String),
}

impl std::fmt::Display for Ident {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Ident::Num(n) => write!(f, "{n}"),
            Ident::Text(s) => f.write_str(s),
        }
    }
}

// ── Identity and static configuration ───────────────────────────────────────

/// Endpoints of one status page, derived from `(base_url, page_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageIdentity {
    pub page_id: String,
    pub base_url: Url,
    pub html_endpoint: Url,
    pub api_endpoint: Url,
}

impl PageIdentity {
    /// Derive the endpoints. `base_url` may carry a trailing slash.
    pub fn derive(base_url: &Url, page_id: &str) -> Result<Self, url::ParseError> {
        let base = base_url.as_str().trim_end_matches('/');
        Ok(Self {
            page_id: page_id.to_string(),
            base_url: base_url.clone(),
            html_endpoint: Url::parse(&format!("{base}/status/{page_id}"))?,
            api_endpoint: Url::parse(&format!("{base}/api/status-page/heartbeat/{page_id}"))?,
        })
    }

    /// Base URL without trailing slash.
    pub fn base(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }
}

/// Site metadata shown in the page head and tabs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteMeta {
    pub title: String,
    pub description: String,
    pub icon: String,
    /// Never empty; `icon_candidates[0] == icon`.
    pub icon_candidates: Vec<String>,
}

impl Default for SiteMeta {
    fn default() -> Self {
        Self {
            title: DEFAULT_SITE_TITLE.to_string(),
            description: DEFAULT_SITE_DESCRIPTION.to_string(),
            icon: DEFAULT_ICON.to_string(),
            icon_candidates: vec![DEFAULT_ICON.to_string()],
        }
    }
}

/// Static per-page entry from settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageEntry {
    pub id: String,
    pub site_meta: SiteMeta,
}

/// Per-page resolved configuration. Built once per resolution call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(flatten)]
    pub identity: PageIdentity,
    pub default_page_id: String,
    pub page_ids: Vec<String>,
    pub pages: Vec<PageEntry>,
    pub site_meta: SiteMeta,
    pub is_placeholder: bool,
    pub is_edit_this_page: bool,
    pub is_show_star_button: bool,
}

impl Config {
    pub fn page_id(&self) -> &str {
        &self.identity.page_id
    }
}

// ── Upstream payload ────────────────────────────────────────────────────────

/// Decoded preload snapshot. `config` stays raw until required-field checks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreloadPayload {
    #[serde(default)]
    pub config: Option<Map<String, Value>>,
    #[serde(default)]
    pub incident: Option<Incident>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub maintenance_list: Vec<Maintenance>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub public_group_list: Vec<PublicGroup>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A monitor group on the status page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicGroup {
    #[serde(default)]
    pub id: Option<Ident>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default)]
    pub weight: Option<i64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub monitor_list: Vec<MonitorSummary>,
}

/// A monitor as listed on the status page (no heartbeat data).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorSummary {
    pub id: Ident,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Active incident banner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Incident {
    #[serde(default)]
    pub id: Option<Ident>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
    #[serde(default)]
    pub style: Option<String>,
    #[serde(with = "serde_utc")]
    pub created_date: DateTime<Utc>,
    #[serde(default, with = "serde_utc_opt")]
    pub last_updated_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub pin: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Lifecycle state of a maintenance entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MaintenanceStatus {
    Scheduled,
    UnderMaintenance,
    Ended,
    Inactive,
    #[default]
    Unknown,
    /// Any other upstream value, kept verbatim.
    Other(String),
}

impl MaintenanceStatus {
    pub fn as_str(&self) -> &str {
        match self {
            MaintenanceStatus::Scheduled => "scheduled",
            MaintenanceStatus::UnderMaintenance => "under-maintenance",
            MaintenanceStatus::Ended => "ended",
            MaintenanceStatus::Inactive => "inactive",
            MaintenanceStatus::Unknown => "unknown",
            MaintenanceStatus::Other(s) => s,
        }
    }
}

impl From<String> for MaintenanceStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "scheduled" => MaintenanceStatus::Scheduled,
            "under-maintenance" => MaintenanceStatus::UnderMaintenance,
            "ended" => MaintenanceStatus::Ended,
            "inactive" => MaintenanceStatus::Inactive,
            "unknown" => MaintenanceStatus::Unknown,
            _ => MaintenanceStatus::Other(s),
        }
    }
}

impl From<MaintenanceStatus> for String {
    fn from(status: MaintenanceStatus) -> Self {
        match status {
            MaintenanceStatus::Other(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

/// A maintenance window, normalized to UTC. `start_date <= end_date`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawTimeSlot")]
pub struct TimeSlot {
    #[serde(with = "serde_utc")]
    pub start_date: DateTime<Utc>,
    #[serde(with = "serde_utc")]
    pub end_date: DateTime<Utc>,
}

impl TimeSlot {
    pub fn new(start_date: DateTime<Utc>, end_date: DateTime<Utc>) -> Result<Self, String> {
        if start_date > end_date {
            return Err(format!(
                "timeslot ends ({end_date}) before it starts ({start_date})"
            ));
        }
        Ok(Self {
            start_date,
            end_date,
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTimeSlot {
    #[serde(with = "serde_utc")]
    start_date: DateTime<Utc>,
    #[serde(with = "serde_utc")]
    end_date: DateTime<Utc>,
}

impl TryFrom<RawTimeSlot> for TimeSlot {
    type Error = String;

    fn try_from(raw: RawTimeSlot) -> Result<Self, Self::Error> {
        TimeSlot::new(raw.start_date, raw.end_date)
    }
}

/// Scheduled maintenance entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Maintenance {
    pub id: Ident,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: MaintenanceStatus,
    #[serde(default, deserialize_with = "null_as_default")]
    pub timeslot_list: Vec<TimeSlot>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ── Resolved snapshot ───────────────────────────────────────────────────────

/// Dashboard colour scheme after normalization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Dark,
    Light,
    #[default]
    System,
}

impl Theme {
    /// `"dark"` and `"light"` pass through, everything else is `System`.
    pub fn normalize(raw: &str) -> Self {
        match raw {
            "dark" => Theme::Dark,
            "light" => Theme::Light,
            _ => Theme::System,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
            Theme::System => "system",
        }
    }
}

/// Typed dashboard settings after required-field checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardConfig {
    #[serde(deserialize_with = "null_as_default")]
    pub slug: String,
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub theme: Theme,
    #[serde(default = "default_true", deserialize_with = "null_as_true")]
    pub published: bool,
    #[serde(default = "default_true", deserialize_with = "null_as_true")]
    pub show_tags: bool,
    #[serde(rename = "customCSS", default, deserialize_with = "null_as_default")]
    pub custom_css: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub footer_text: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub show_powered_by: bool,
    #[serde(default)]
    pub google_analytics_id: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub show_certificate_expiry: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            slug: String::new(),
            title: String::new(),
            description: Some(String::new()),
            icon: Some(DEFAULT_ICON.to_string()),
            theme: Theme::System,
            published: true,
            show_tags: true,
            custom_css: String::new(),
            footer_text: String::new(),
            show_powered_by: false,
            google_analytics_id: None,
            show_certificate_expiry: false,
            extra: Map::new(),
        }
    }
}

/// Fully resolved, request-ready snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalConfig {
    pub config: DashboardConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incident: Option<Incident>,
    pub maintenance_list: Vec<Maintenance>,
}

/// Result of a maintenance-only lookup.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceData {
    pub success: bool,
    pub maintenance_list: Vec<Maintenance>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Lightweight metadata for one page tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageTabMeta {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

// ── serde helpers ───────────────────────────────────────────────────────────

fn default_true() -> bool {
    true
}

fn null_as_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

fn null_as_true<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    Ok(Option::<bool>::deserialize(d)?.unwrap_or(true))
}
