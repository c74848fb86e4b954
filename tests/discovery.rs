//! Discovery tests against an in-process HTTP responder

mod common;

use promptpilot::cdp::TargetDiscovery;
use promptpilot::core::config::{BrowserConfig, PlatformConfig};
use promptpilot::PilotError;
use tokio_test::assert_err;

fn browser(port: u16) -> BrowserConfig {
    BrowserConfig {
        host: "127.0.0.1".to_string(),
        port,
        discovery_timeout_secs: 2,
        command_timeout_secs: 0,
    }
}

fn listing() -> String {
    serde_json::json!([
        {
            "id": "A1",
            "type": "service_worker",
            "title": "Service Worker",
            "url": "https://example.com/sw.js",
            "webSocketDebuggerUrl": "ws://127.0.0.1/devtools/page/A1"
        },
        {
            "id": "B2",
            "type": "page",
            "title": "Whisk",
            "url": "https://whisk.com/project/42",
            "webSocketDebuggerUrl": "ws://127.0.0.1/devtools/page/B2"
        }
    ])
    .to_string()
}

#[tokio::test]
async fn test_unreachable_endpoint() {
    let discovery = TargetDiscovery::new(&browser(common::dead_port())).unwrap();
    let err = assert_err!(discovery.list_targets().await);
    assert!(matches!(err, PilotError::DiscoveryUnavailable { .. }));
    assert!(err.is_fatal());
}

#[tokio::test]
async fn test_lists_targets() {
    let (port, seen) = common::http_responder(vec![(200, listing())]).await;
    let discovery = TargetDiscovery::new(&browser(port)).unwrap();

    let targets = discovery.list_targets().await.unwrap();
    assert_eq!(targets.len(), 2);
    assert_eq!(targets[1].title, "Whisk");
    assert!(seen.lock().unwrap()[0].starts_with("GET /json "));
}

#[tokio::test]
async fn test_resolve_prefers_platform_tab() {
    let (port, _) = common::http_responder(vec![(200, listing())]).await;
    let discovery = TargetDiscovery::new(&browser(port)).unwrap();

    let target = discovery
        .resolve(&PlatformConfig::default())
        .await
        .unwrap();
    assert_eq!(target.id, "B2");
}

#[tokio::test]
async fn test_create_falls_back_to_get() {
    let created = serde_json::json!({
        "id": "C3",
        "type": "page",
        "title": "",
        "url": "https://whisk.com",
        "webSocketDebuggerUrl": "ws://127.0.0.1/devtools/page/C3"
    })
    .to_string();
    let (port, seen) = common::http_responder(vec![
        (200, "[]".to_string()),
        (405, String::new()),
        (200, created),
    ])
    .await;
    let discovery = TargetDiscovery::new(&browser(port)).unwrap();

    let target = discovery
        .resolve(&PlatformConfig::default())
        .await
        .unwrap();
    assert_eq!(target.id, "C3");

    let requests = seen.lock().unwrap().clone();
    assert!(requests[1].starts_with("PUT /json/new?https://whisk.com"));
    assert!(requests[2].starts_with("GET /json/new?https://whisk.com"));
}

#[tokio::test]
async fn test_non_json_listing_is_unavailable() {
    let (port, _) = common::http_responder(vec![(200, "<html>".to_string())]).await;
    let discovery = TargetDiscovery::new(&browser(port)).unwrap();
    assert!(matches!(
        discovery.list_targets().await,
        Err(PilotError::DiscoveryUnavailable { .. })
    ));
}
