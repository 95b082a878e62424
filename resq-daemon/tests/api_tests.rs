use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use resq_broadcaster::{BroadcastHub, HubConfig, HubMessage};
use resq_daemon::{server, AppState, DaemonConfig};
use serde_json::{json, Value};
use tower::ServiceExt;

fn app() -> (Arc<BroadcastHub>, Router) {
    let config = DaemonConfig {
        hub: HubConfig {
            channels: vec![
                "risk_zones".to_string(),
                "vehicle_positions".to_string(),
                "disaster_overlays".to_string(),
                "flood_gauges".to_string(),
            ],
            ..HubConfig::default()
        },
        ..DaemonConfig::default()
    };
    let hub = Arc::new(BroadcastHub::new(config.hub.clone()).unwrap());
    let state = AppState::new(Arc::clone(&hub), Duration::from_secs(1));
    (hub, server::build_router(state, &config))
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn test_get_defaults_to_empty_list() {
    let (_hub, app) = app();
    for uri in ["/api/risk-zones", "/api/vehicles", "/api/disasters"] {
        let (status, body) = call(&app, "GET", uri, None).await;
        assert_eq!(status, StatusCode::OK, "{}", uri);
        assert_eq!(body, json!([]));
    }
}

#[tokio::test]
async fn test_post_updates_state_and_subscribers() {
    let (hub, app) = app();
    let mut sub = hub.subscribe().await;
    assert!(sub.recv().await.unwrap().is_snapshot());

    let zones = json!([{"id": "zone-1", "risk": "high", "lat": 19.07, "lng": 72.87}]);
    let (status, body) = call(&app, "POST", "/api/risk-zones", Some(zones.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "success"}));

    let (_, current) = call(&app, "GET", "/api/risk-zones", None).await;
    assert_eq!(current, zones);

    match sub.recv().await.unwrap() {
        HubMessage::Update { channel, value } => {
            assert_eq!(&*channel, "risk_zones");
            assert_eq!(*value, zones);
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn test_vehicle_and_disaster_routes_map_to_channels() {
    let (hub, app) = app();
    call(&app, "POST", "/api/vehicles", Some(json!([{"id": "veh0"}]))).await;
    call(&app, "POST", "/api/disasters", Some(json!([{"id": "flood1"}]))).await;

    assert_eq!(*hub.get("vehicle_positions").await.unwrap(), json!([{"id": "veh0"}]));
    assert_eq!(*hub.get("disaster_overlays").await.unwrap(), json!([{"id": "flood1"}]));
}

#[tokio::test]
async fn test_generic_channel_route() {
    let (hub, app) = app();
    let (status, _) = call(&app, "POST", "/api/channels/flood_gauges", Some(json!([{"level": 3.2}]))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(*hub.get("flood_gauges").await.unwrap(), json!([{"level": 3.2}]));

    let (status, body) = call(&app, "GET", "/api/channels/flood_gauges", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([{"level": 3.2}]));
}

#[tokio::test]
async fn test_unknown_channel_is_not_found() {
    let (_hub, app) = app();
    let (status, body) = call(&app, "POST", "/api/channels/weather", Some(json!([]))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], "error");

    let (status, _) = call(&app, "GET", "/api/channels/weather", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_bodies_are_rejected_without_publishing() {
    let (hub, app) = app();
    let mut sub = hub.subscribe().await;
    sub.recv().await.unwrap();

    let (status, _) = call(&app, "POST", "/api/risk-zones", Some(json!({"id": "A"}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = call(&app, "POST", "/api/risk-zones", Some(json!(["A"]))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let request = Request::builder()
        .method("POST")
        .uri("/api/risk-zones")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    assert!(sub.try_recv().is_none());
    assert_eq!(hub.stats().publishes, 0);
}

#[tokio::test]
async fn test_health_reports_hub_state() {
    let (hub, app) = app();
    let _sub = hub.subscribe().await;
    hub.publish("risk_zones", json!([])).await.unwrap();

    let (status, body) = call(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["hub"]["subscribers"], 1);
    assert_eq!(body["hub"]["publishes"], 1);
    assert_eq!(body["channels"].as_array().unwrap().len(), 4);
}
