//! Build and write `generated-config.json`.
//!
//! Site metadata for every configured page is fetched once through the
//! regular resolution chain, merged with `FEATURE_*` overrides and written
//! out so later starts do not depend on upstream availability.

use std::path::Path;

use anyhow::{Context, Result};

use crate::resolver::PreloadResolver;
use crate::settings::{GeneratedConfig, Settings};
use crate::site::{resolve_site_meta, FeatureOverrides, RemoteMeta};
use crate::types::{PageEntry, SiteMeta};

/// Resolve site metadata for one page. Never fails.
pub async fn fetch_site_meta(
    settings: &Settings,
    resolver: &PreloadResolver,
    overrides: &FeatureOverrides,
    page_id: &str,
) -> SiteMeta {
    let resolved = match settings.identity(page_id) {
        Ok(identity) => resolver.resolve(&identity).await,
        Err(e) => Err(e),
    };

    match resolved {
        Ok(payload) => {
            let remote = payload.config.as_ref().map(RemoteMeta::from_config);
            let meta = resolve_site_meta(overrides, remote.as_ref());
            if meta.icon_candidates.len() > 1 {
                tracing::info!(
                    "{page_id}: icon candidates {}",
                    meta.icon_candidates.join(" -> ")
                );
            }
            meta
        }
        Err(e) => {
            tracing::error!("failed to fetch site meta for page {page_id}: {e}");
            if overrides.has_any() {
                resolve_site_meta(overrides, None)
            } else {
                SiteMeta::default()
            }
        }
    }
}

/// Resolve every page, in configured order.
pub async fn generate_config(
    settings: &Settings,
    resolver: &PreloadResolver,
    overrides: &FeatureOverrides,
) -> GeneratedConfig {
    log_override("FEATURE_TITLE", overrides.title.as_deref());
    log_override("FEATURE_DESCRIPTION", overrides.description.as_deref());
    log_override("FEATURE_ICON", overrides.icon.as_deref());

    let mut pages = Vec::with_capacity(settings.page_ids.len());
    for id in &settings.page_ids {
        let site_meta = fetch_site_meta(settings, resolver, overrides, id).await;
        pages.push(PageEntry {
            id: id.clone(),
            site_meta,
        });
    }

    let site_meta = pages
        .iter()
        .find(|p| p.id == settings.default_page_id)
        .map(|p| p.site_meta.clone())
        .unwrap_or_default();

    GeneratedConfig {
        base_url: settings.base_url.to_string(),
        page_id: settings.default_page_id.clone(),
        page_ids: settings.page_ids.clone(),
        pages,
        site_meta,
        is_placeholder: false,
        is_edit_this_page: settings.is_edit_this_page,
        is_show_star_button: settings.is_show_star_button,
    }
}

/// Write `config` as pretty JSON, creating parent directories.
pub fn write_generated_config(config: &GeneratedConfig, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create config dir: {}", dir.display()))?;
    }

    let json = serde_json::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(path, json)
        .with_context(|| format!("failed to write config file: {}", path.display()))?;

    tracing::info!("configuration file generated: {}", path.display());
    Ok(())
}

fn log_override(name: &str, value: Option<&str>) {
    match value {
        None => tracing::debug!("{name}: not set"),
        Some("") => tracing::info!("{name}: (empty string)"),
        Some(v) => tracing::info!("{name}: {v}"),
    }
}
