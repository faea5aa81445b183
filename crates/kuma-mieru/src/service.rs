//! Per-page and global configuration built from settings and remote data.
//!
//! [`ConfigResolver`] is the entry point the HTTP layer talks to. Loud
//! failures from [`PreloadResolver`] are turned into log events and safe
//! defaults here; nothing above this layer sees a resolution error except
//! through [`MaintenanceData::error`].

use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::acquisition::http_client::Transport;
use crate::cache::{RequestScope, SharedPreload};
use crate::error::MieruResult;
use crate::maintenance::process_maintenance_list;
use crate::resolver::{require_dashboard_config, PreloadResolver};
use crate::settings::Settings;
use crate::types::{Config, GlobalConfig, MaintenanceData, PageTabMeta, SiteMeta};

/// Everything one dashboard render needs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderSnapshot {
    pub config: GlobalConfig,
    pub tabs: Vec<PageTabMeta>,
}

#[derive(Clone)]
pub struct ConfigResolver {
    settings: Arc<Settings>,
    resolver: PreloadResolver,
}

impl ConfigResolver {
    pub fn new(settings: Arc<Settings>, transport: Arc<dyn Transport>) -> Self {
        Self::with_resolver(settings, PreloadResolver::new(transport))
    }

    pub fn with_resolver(settings: Arc<Settings>, resolver: PreloadResolver) -> Self {
        Self { settings, resolver }
    }

    /// Static configuration of `page_id`, or of the default page.
    pub fn page_config(&self, page_id: Option<&str>) -> MieruResult<Config> {
        self.settings.page_config(page_id)
    }

    async fn preload(&self, scope: &RequestScope, config: &Config) -> SharedPreload {
        scope
            .preload
            .get_or_init(config.page_id(), || async {
                self.resolver
                    .resolve(&config.identity)
                    .await
                    .map(Arc::new)
                    .map_err(Arc::new)
            })
            .await
    }

    /// Global dashboard configuration. Never fails: every error is logged
    /// and answered with [`GlobalConfig::default`].
    pub async fn get_global_config(
        &self,
        scope: &RequestScope,
        page_id: Option<&str>,
    ) -> GlobalConfig {
        let config = match self.page_config(page_id) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!("failed to get configuration data: {e}");
                return GlobalConfig::default();
            }
        };

        scope
            .global_config
            .get_or_init(config.page_id(), || self.build_global_config(scope, &config))
            .await
    }

    async fn build_global_config(&self, scope: &RequestScope, config: &Config) -> GlobalConfig {
        let endpoint = config.identity.html_endpoint.as_str();

        let payload = match self.preload(scope, config).await {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(endpoint, "failed to get configuration data: {e}");
                return GlobalConfig::default();
            }
        };

        let dashboard = match require_dashboard_config(&payload) {
            Ok(dashboard) => dashboard,
            Err(e) => {
                tracing::error!(endpoint, "failed to get configuration data: {e}");
                return GlobalConfig::default();
            }
        };

        GlobalConfig {
            config: dashboard,
            incident: payload.incident.clone(),
            maintenance_list: process_maintenance_list(
                payload.maintenance_list.clone(),
                Utc::now(),
            ),
        }
    }

    /// Maintenance entries with derived status.
    ///
    /// An unknown page id is an error; resolution failures are reported in
    /// the returned value instead.
    pub async fn get_maintenance_data(
        &self,
        scope: &RequestScope,
        page_id: Option<&str>,
    ) -> MieruResult<MaintenanceData> {
        let config = self.page_config(page_id)?;

        match self.preload(scope, &config).await {
            Ok(payload) => Ok(MaintenanceData {
                success: true,
                maintenance_list: process_maintenance_list(
                    payload.maintenance_list.clone(),
                    Utc::now(),
                ),
                error: None,
            }),
            Err(e) => {
                tracing::error!(
                    endpoint = %format!("{}/maintenance", config.identity.api_endpoint),
                    "failed to get maintenance data: {e}"
                );
                Ok(MaintenanceData {
                    success: false,
                    maintenance_list: Vec::new(),
                    error: Some(e.to_string()),
                })
            }
        }
    }

    /// Tab metadata for every configured page, resolved concurrently.
    /// A page that fails to resolve gets its static metadata.
    pub async fn get_page_tabs_metadata(&self, scope: &RequestScope) -> Vec<PageTabMeta> {
        scope
            .page_tabs
            .get_or_init("*", || async {
                let mut ids: Vec<&str> = Vec::new();
                for id in &self.settings.page_ids {
                    if !ids.contains(&id.as_str()) {
                        ids.push(id);
                    }
                }

                join_all(ids.into_iter().map(|id| self.tab_meta(scope, id)))
                    .await
                    .into_iter()
                    .flatten()
                    .collect()
            })
            .await
    }

    async fn tab_meta(&self, scope: &RequestScope, page_id: &str) -> Option<PageTabMeta> {
        let config = self.page_config(Some(page_id)).ok()?;
        let fallback = self.static_meta(page_id);

        match self.preload(scope, &config).await {
            Ok(payload) => {
                let empty = Map::new();
                let remote = payload.config.as_ref().unwrap_or(&empty);
                Some(PageTabMeta {
                    id: page_id.to_string(),
                    title: remote_text(remote, "title")
                        .or_else(|| non_blank(&fallback.title))
                        .unwrap_or_else(|| page_id.to_string()),
                    description: remote_text(remote, "description")
                        .or_else(|| non_blank(&fallback.description)),
                    icon: remote_text(remote, "icon").or_else(|| Some(fallback.icon.clone())),
                })
            }
            Err(e) => {
                tracing::error!(page_id, "failed to resolve metadata for status page tab: {e}");
                Some(static_tab(page_id, fallback))
            }
        }
    }

    fn static_meta(&self, page_id: &str) -> &SiteMeta {
        self.settings
            .pages
            .iter()
            .find(|p| p.id == page_id)
            .map(|p| &p.site_meta)
            .unwrap_or(&self.settings.site_meta)
    }

    /// Resolve global config and tabs together inside a fresh scope.
    pub async fn render(&self, page_id: Option<&str>) -> RenderSnapshot {
        let scope = RequestScope::new();
        self.render_in(&scope, page_id).await
    }

    pub async fn render_in(&self, scope: &RequestScope, page_id: Option<&str>) -> RenderSnapshot {
        let (config, tabs) = tokio::join!(
            self.get_global_config(scope, page_id),
            self.get_page_tabs_metadata(scope)
        );
        RenderSnapshot { config, tabs }
    }
}

fn static_tab(page_id: &str, meta: &SiteMeta) -> PageTabMeta {
    PageTabMeta {
        id: page_id.to_string(),
        title: non_blank(&meta.title).unwrap_or_else(|| page_id.to_string()),
        description: non_blank(&meta.description),
        icon: Some(meta.icon.clone()),
    }
}

fn remote_text(config: &Map<String, Value>, key: &str) -> Option<String> {
    config.get(key).and_then(Value::as_str).and_then(non_blank)
}

fn non_blank(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
