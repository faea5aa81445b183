//! End-to-end resolution against a mocked Uptime Kuma instance.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use kuma_mieru::{
    ConfigResolver, ErrorKind, GlobalConfig, HttpClient, MaintenanceStatus, MieruError, PreloadResolver,
    RequestScope, Settings, Theme, Transport, TransportOptions,
};

// ─────────────────────── helpers ───────────────────────

fn transport() -> Arc<dyn Transport> {
    Arc::new(HttpClient::new(TransportOptions {
        timeout_ms: 2_000,
        max_retries: 0,
        retry_delay_ms: 1,
    }))
}

fn settings(server: &MockServer, ids: &[&str]) -> Arc<Settings> {
    Arc::new(Settings::new(&server.uri(), ids).unwrap())
}

fn payload(title: &str, theme: &str, maintenance: Value) -> Value {
    json!({
        "config": {
            "slug": "main",
            "title": title,
            "description": "All systems",
            "icon": "/upload/logo.png",
            "theme": theme,
            "published": true,
            "showTags": true,
            "customCSS": "",
            "footerText": "",
            "showPoweredBy": false,
            "googleAnalyticsId": null,
            "showCertificateExpiry": false
        },
        "incident": null,
        "maintenanceList": maintenance,
        "publicGroupList": [
            {"id": 1, "name": "Core", "weight": 1, "monitorList": [{"id": 10, "name": "API", "type": "http"}]}
        ]
    })
}

fn script_page(body: &str) -> String {
    format!(
        r#"<!DOCTYPE html><html><head><title>Status</title>
<script id="preload-data" type="application/json">{body}</script>
</head><body><div id="app"></div></body></html>"#
    )
}

fn empty_page() -> String {
    "<!DOCTYPE html><html><head><title>Status</title></head><body><div id=\"app\"></div></body></html>"
        .to_string()
}

async fn mount_html(server: &MockServer, page_id: &str, status: u16, body: String) {
    Mock::given(method("GET"))
        .and(path(format!("/status/{page_id}")))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .mount(server)
        .await;
}

fn naive(ts: chrono::DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S").to_string()
}

// ─────────────────────── extraction chain ───────────────────────

#[tokio::test]
async fn test_script_payload_is_resolved() {
    let server = MockServer::start().await;
    let body = payload("Main Status", "dark", json!([])).to_string();
    mount_html(&server, "main", 200, script_page(&body)).await;

    let settings = settings(&server, &["main"]);
    let resolver = PreloadResolver::new(transport());
    let data = resolver
        .resolve(&settings.identity("main").unwrap())
        .await
        .unwrap();

    assert_eq!(data.config.as_ref().unwrap()["title"], "Main Status");
    assert_eq!(data.public_group_list[0].monitor_list[0].name, "API");
}

#[tokio::test]
async fn test_data_json_attribute_is_resolved() {
    let server = MockServer::start().await;
    let attr = payload("From Attribute", "light", json!([]))
        .to_string()
        .replace('"', "&quot;");
    let html = format!(
        r#"<html><body><div id="preload-data" data-json="{attr}"></div></body></html>"#
    );
    mount_html(&server, "main", 200, html).await;

    let settings = settings(&server, &["main"]);
    let data = PreloadResolver::new(transport())
        .resolve(&settings.identity("main").unwrap())
        .await
        .unwrap();
    assert_eq!(data.config.unwrap()["title"], "From Attribute");
}

#[tokio::test]
async fn test_legacy_window_assignment_is_repaired_and_resolved() {
    let server = MockServer::start().await;
    let html = r#"<html><head><script>
        window.preloadData = {
            config: {slug: 'main', title: 'Legacy', description: '', icon: '/icon.svg', theme: 'auto',},
            // upstream comment
            incident: undefined,
            maintenanceList: [],
            publicGroupList: [],
        };
    </script></head><body></body></html>"#;
    mount_html(&server, "main", 200, html.to_string()).await;

    let settings = settings(&server, &["main"]);
    let data = PreloadResolver::new(transport())
        .resolve(&settings.identity("main").unwrap())
        .await
        .unwrap();
    assert_eq!(data.config.as_ref().unwrap()["title"], "Legacy");
    assert!(data.incident.is_none());
}

#[tokio::test]
async fn test_html_503_fails_without_api_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/status/main"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/status-page/main"))
        .respond_with(ResponseTemplate::new(200).set_body_json(payload("API", "dark", json!([]))))
        .expect(0)
        .mount(&server)
        .await;

    let settings = settings(&server, &["main"]);
    let err = PreloadResolver::new(transport())
        .resolve(&settings.identity("main").unwrap())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Resolution);
    assert!(err.to_string().contains("503"));
    assert_eq!(
        err.endpoint(),
        Some(format!("{}/status/main", server.uri()).as_str())
    );
}

#[tokio::test]
async fn test_unparseable_payload_fails_without_api_fallback() {
    let server = MockServer::start().await;
    mount_html(&server, "main", 200, script_page("{\"config\": NaN}")).await;
    Mock::given(method("GET"))
        .and(path("/api/status-page/main"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let settings = settings(&server, &["main"]);
    let err = PreloadResolver::new(transport())
        .resolve(&settings.identity("main").unwrap())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("JSON parsing failed"));
    assert!(err.to_string().contains("Processed data: {\"config\": NaN}"));
}

#[tokio::test]
async fn test_missing_payload_uses_api_fallback() {
    let server = MockServer::start().await;
    mount_html(&server, "main", 200, empty_page()).await;
    Mock::given(method("GET"))
        .and(path("/api/status-page/main"))
        .respond_with(ResponseTemplate::new(200).set_body_json(payload("From API", "dark", json!([]))))
        .expect(1)
        .mount(&server)
        .await;

    let settings = settings(&server, &["main"]);
    let data = PreloadResolver::new(transport())
        .resolve(&settings.identity("main").unwrap())
        .await
        .unwrap();
    assert_eq!(data.config.unwrap()["title"], "From API");
}

#[tokio::test]
async fn test_failed_api_fallback_is_in_cause_chain() {
    let server = MockServer::start().await;
    mount_html(&server, "main", 200, empty_page()).await;
    Mock::given(method("GET"))
        .and(path("/api/status-page/main"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let settings = settings(&server, &["main"]);
    let err = PreloadResolver::new(transport())
        .resolve(&settings.identity("main").unwrap())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Resolution);
    let chain = err.chain_messages();
    assert!(chain.len() >= 2, "chain: {chain:?}");
    assert!(chain.iter().skip(1).any(|m| m.contains("HTTP 500")), "chain: {chain:?}");
}

#[tokio::test]
async fn test_caller_accept_header_is_kept_for_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/status/main"))
        .and(header("accept", "text/html"))
        .respond_with(ResponseTemplate::new(200).set_body_string(empty_page()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/status-page/main"))
        .and(header("accept", "text/html"))
        .respond_with(ResponseTemplate::new(200).set_body_json(payload("From API", "dark", json!([]))))
        .expect(1)
        .mount(&server)
        .await;

    let settings = settings(&server, &["main"]);
    let data = PreloadResolver::new(transport())
        .with_headers(vec![("Accept".to_string(), "text/html".to_string())])
        .resolve(&settings.identity("main").unwrap())
        .await
        .unwrap();
    assert_eq!(data.config.unwrap()["title"], "From API");
}

// ─────────────────────── config resolver ───────────────────────

#[tokio::test]
async fn test_global_config_normalizes_theme() {
    for (raw, expected) in [("dark", Theme::Dark), ("light", Theme::Light), ("auto", Theme::System)] {
        let server = MockServer::start().await;
        let body = payload("Main Status", raw, json!([])).to_string();
        mount_html(&server, "main", 200, script_page(&body)).await;

        let service = ConfigResolver::new(settings(&server, &["main"]), transport());
        let global = service.get_global_config(&RequestScope::new(), None).await;
        assert_eq!(global.config.theme, expected, "theme {raw}");
        assert_eq!(global.config.title, "Main Status");
    }
}

#[tokio::test]
async fn test_api_fallback_theme_always_normalized() {
    let themes = ["", "DARK", "Light", "auto", "dark", "light", "system", "ダーク", " dark "];
    for raw in themes {
        let server = MockServer::start().await;
        mount_html(&server, "main", 200, empty_page()).await;
        Mock::given(method("GET"))
            .and(path("/api/status-page/main"))
            .respond_with(ResponseTemplate::new(200).set_body_json(payload("From API", raw, json!([]))))
            .expect(1)
            .mount(&server)
            .await;

        let service = ConfigResolver::new(settings(&server, &["main"]), transport());
        let global = service.get_global_config(&RequestScope::new(), None).await;
        assert_eq!(global.config.title, "From API", "theme {raw:?}");

        let expected = match raw {
            "dark" => Theme::Dark,
            "light" => Theme::Light,
            _ => Theme::System,
        };
        assert_eq!(global.config.theme, expected, "theme {raw:?}");

        let json = serde_json::to_value(&global).unwrap();
        let theme = json["config"]["theme"].as_str().unwrap();
        assert!(["dark", "light", "system"].contains(&theme), "theme {raw:?} -> {theme}");
    }
}

#[tokio::test]
async fn test_global_config_never_fails() {
    let server = MockServer::start().await;
    mount_html(&server, "main", 503, String::new()).await;

    let service = ConfigResolver::new(settings(&server, &["main"]), transport());
    let scope = RequestScope::new();

    let global = service.get_global_config(&scope, Some("main")).await;
    assert_eq!(global, GlobalConfig::default());
    assert_eq!(global.config.icon.as_deref(), Some("/icon.svg"));

    let unknown = service.get_global_config(&scope, Some("nope")).await;
    assert_eq!(unknown, GlobalConfig::default());

    let json = serde_json::to_value(&global).unwrap();
    assert_eq!(json["config"]["theme"], "system");
    assert_eq!(json["maintenanceList"], json!([]));
    assert!(json.get("incident").is_none());
}

#[tokio::test]
async fn test_global_config_missing_required_field_defaults() {
    let server = MockServer::start().await;
    let mut body = payload("Main Status", "dark", json!([]));
    body["config"].as_object_mut().unwrap().remove("icon");
    mount_html(&server, "main", 200, script_page(&body.to_string())).await;

    let service = ConfigResolver::new(settings(&server, &["main"]), transport());
    let global = service.get_global_config(&RequestScope::new(), None).await;
    assert_eq!(global, GlobalConfig::default());
}

#[tokio::test]
async fn test_maintenance_status_is_derived() {
    let server = MockServer::start().await;
    let now = Utc::now();
    let maintenance = json!([
        {
            "id": 1,
            "title": "Running",
            "status": "scheduled",
            "timeslotList": [{"startDate": naive(now - Duration::hours(1)), "endDate": naive(now + Duration::hours(1))}]
        },
        {
            "id": 2,
            "title": "Later",
            "status": "under-maintenance",
            "timeslotList": [{"startDate": naive(now + Duration::hours(1)), "endDate": naive(now + Duration::hours(2))}]
        },
        {
            "id": 3,
            "title": "Done",
            "status": "scheduled",
            "timeslotList": [{"startDate": naive(now - Duration::hours(2)), "endDate": naive(now - Duration::hours(1))}]
        },
        {"id": 4, "title": "Manual", "status": "inactive", "timeslotList": []}
    ]);
    let body = payload("Main Status", "dark", maintenance).to_string();
    mount_html(&server, "main", 200, script_page(&body)).await;

    let service = ConfigResolver::new(settings(&server, &["main"]), transport());
    let data = service
        .get_maintenance_data(&RequestScope::new(), None)
        .await
        .unwrap();

    assert!(data.success);
    let statuses: Vec<MaintenanceStatus> =
        data.maintenance_list.iter().map(|m| m.status.clone()).collect();
    assert_eq!(
        statuses,
        vec![
            MaintenanceStatus::UnderMaintenance,
            MaintenanceStatus::Scheduled,
            MaintenanceStatus::Ended,
            MaintenanceStatus::Inactive,
        ]
    );
}

#[tokio::test]
async fn test_maintenance_data_reports_failure() {
    let server = MockServer::start().await;
    mount_html(&server, "main", 502, String::new()).await;

    let service = ConfigResolver::new(settings(&server, &["main"]), transport());
    let scope = RequestScope::new();

    let data = service.get_maintenance_data(&scope, None).await.unwrap();
    assert!(!data.success);
    assert!(data.maintenance_list.is_empty());
    assert!(data.error.unwrap().contains("502"));

    let err = service
        .get_maintenance_data(&scope, Some("unknown"))
        .await
        .unwrap_err();
    assert!(matches!(err, MieruError::Configuration(_)));
}

#[tokio::test]
async fn test_incident_dates_are_utc() {
    let server = MockServer::start().await;
    let mut body = payload("Main Status", "dark", json!([]));
    body["incident"] = json!({
        "id": 5,
        "title": "Degraded",
        "content": "Investigating",
        "style": "warning",
        "createdDate": "2024-03-01 10:30:00",
        "lastUpdatedDate": "2024-03-01T12:00:00+02:00",
        "pin": true
    });
    mount_html(&server, "main", 200, script_page(&body.to_string())).await;

    let service = ConfigResolver::new(settings(&server, &["main"]), transport());
    let global = service.get_global_config(&RequestScope::new(), None).await;

    let json = serde_json::to_value(&global).unwrap();
    assert_eq!(json["incident"]["createdDate"], "2024-03-01T10:30:00.000Z");
    assert_eq!(json["incident"]["lastUpdatedDate"], "2024-03-01T10:00:00.000Z");
    assert_eq!(json["incident"]["style"], "warning");
}

#[tokio::test]
async fn test_tabs_degrade_per_page() {
    let server = MockServer::start().await;
    let body = payload("  Main Status  ", "dark", json!([])).to_string();
    mount_html(&server, "main", 200, script_page(&body)).await;
    mount_html(&server, "ops", 503, String::new()).await;

    let service = ConfigResolver::new(settings(&server, &["main", "ops", "main"]), transport());
    let tabs = service.get_page_tabs_metadata(&RequestScope::new()).await;

    assert_eq!(tabs.len(), 2);
    assert_eq!(tabs[0].id, "main");
    assert_eq!(tabs[0].title, "Main Status");
    assert_eq!(tabs[0].description.as_deref(), Some("All systems"));
    assert_eq!(tabs[0].icon.as_deref(), Some("/upload/logo.png"));

    assert_eq!(tabs[1].id, "ops");
    assert_eq!(tabs[1].title, "Kuma Mieru");
    assert_eq!(tabs[1].icon.as_deref(), Some("/icon.svg"));
}

#[tokio::test]
async fn test_render_fetches_each_page_once() {
    let server = MockServer::start().await;
    let body = payload("Main Status", "light", json!([])).to_string();
    Mock::given(method("GET"))
        .and(path("/status/main"))
        .respond_with(ResponseTemplate::new(200).set_body_string(script_page(&body)))
        .expect(1)
        .mount(&server)
        .await;

    let service = ConfigResolver::new(settings(&server, &["main"]), transport());
    let snapshot = service.render(None).await;

    assert_eq!(snapshot.config.config.theme, Theme::Light);
    assert_eq!(snapshot.tabs.len(), 1);
    assert_eq!(snapshot.tabs[0].title, "Main Status");
}

#[tokio::test]
async fn test_each_render_uses_a_fresh_scope() {
    let server = MockServer::start().await;
    let body = payload("Main Status", "dark", json!([])).to_string();
    Mock::given(method("GET"))
        .and(path("/status/main"))
        .respond_with(ResponseTemplate::new(200).set_body_string(script_page(&body)))
        .expect(2)
        .mount(&server)
        .await;

    let service = ConfigResolver::new(settings(&server, &["main"]), transport());
    service.render(None).await;
    service.render(None).await;
}
