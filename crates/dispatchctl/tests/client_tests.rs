//! HTTP client tests against an in-process axum service.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use dispatch_shared::{Coord, DispatchError, FacilityLookup, ResponderLookup};
use dispatchctl::api::DispatchApi;
use dispatchctl::config::{RouteParamStyle, ServiceConfig};
use dispatchctl::report::{self, ReportError, ReportRequest};
use dispatchctl::testing::{RecordingReporter, Timeline};
use dispatchctl::HttpDispatchClient;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

type Params = HashMap<String, String>;

#[derive(Clone, Default)]
struct Seen {
    requests: Arc<Mutex<Vec<(&'static str, Params)>>>,
}

impl Seen {
    fn record(&self, path: &'static str, params: Params) {
        self.requests.lock().unwrap().push((path, params));
    }

    fn params(&self, path: &str) -> Params {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .find(|(p, _)| *p == path)
            .map(|(_, q)| q.clone())
            .unwrap()
    }
}

async fn events(State(seen): State<Seen>) -> Json<Value> {
    seen.record("/get_event_data", Params::new());
    Json(json!([
        {"Latitude": 27.70, "Longitude": 85.30},
        {"latitude": "27.72", "longitude": "85.33", "kind": "fire"}
    ]))
}

async fn zone(State(seen): State<Seen>, Query(q): Query<Params>) -> Json<Value> {
    seen.record("/classify_zone", q);
    Json(json!({"zone_type": "high"}))
}

async fn ambulance(State(seen): State<Seen>, Query(q): Query<Params>) -> Json<Value> {
    seen.record("/get_ambulance_data", q);
    Json(json!({"ambulance_data": "[12, 85.31, 27.71]", "radius": 2}))
}

async fn route(State(seen): State<Seen>, Query(q): Query<Params>) -> Json<Value> {
    seen.record("/get_shortest_path", q);
    Json(json!({
        "shortestPathCoordinates": [[27.71, 85.31], [27.705, 85.305], [27.70, 85.30]],
        "distance": 1523.456
    }))
}

async fn hospital(State(seen): State<Seen>, Query(q): Query<Params>) -> Json<Value> {
    seen.record("/get_hospital_data", q);
    Json(json!(["Bir Hospital", 3, "general", 27.69, 85.29]))
}

async fn pdf(Json(body): Json<Value>) -> (StatusCode, Vec<u8>) {
    if body["patient_name"].as_str().unwrap_or_default().is_empty() {
        return (StatusCode::BAD_REQUEST, Vec::new());
    }
    (StatusCode::OK, b"%PDF-1.4 fake".to_vec())
}

async fn serve(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

async fn dispatch_service(seen: Seen) -> SocketAddr {
    let router = Router::new()
        .route("/get_event_data", get(events))
        .route("/classify_zone", get(zone))
        .route("/get_ambulance_data", get(ambulance))
        .route("/get_shortest_path", get(route))
        .route("/get_hospital_data", get(hospital))
        .route("/generate_pdf", post(pdf))
        .with_state(seen);
    serve(router).await
}

fn client(addr: SocketAddr, route_params: RouteParamStyle) -> HttpDispatchClient {
    HttpDispatchClient::new(&ServiceConfig {
        base_url: format!("http://{}/", addr),
        request_timeout_secs: 5,
        route_params,
    })
    .unwrap()
}

#[tokio::test]
async fn test_all_endpoints_normalized() {
    let seen = Seen::default();
    let addr = dispatch_service(seen.clone()).await;
    let client = client(addr, RouteParamStyle::StartEnd);
    let incident = Coord::new(27.70, 85.30);

    let incidents = client.fetch_incidents().await.unwrap();
    assert_eq!(incidents.len(), 2);
    assert_eq!(incidents[1].position, Coord::new(27.72, 85.33));
    assert_eq!(incidents[1].attributes.get("kind"), Some(&json!("fire")));

    let zone = client.classify_zone(incident).await.unwrap();
    assert_eq!(zone.label, "high");

    match client.nearest_responder(incident).await.unwrap() {
        ResponderLookup::Found {
            responder,
            radius_km,
        } => {
            assert_eq!(responder.id, "12");
            assert_eq!(responder.position, Coord::new(27.71, 85.31));
            assert_eq!(radius_km, Some(2.0));
        }
        other => panic!("expected ambulance, got {:?}", other),
    }

    let path = client
        .shortest_path(Coord::new(27.71, 85.31), incident)
        .await
        .unwrap();
    assert_eq!(path.len(), 3);
    assert_eq!(path.display_distance(), 1523.46);

    match client.nearest_facility(incident).await.unwrap() {
        FacilityLookup::Found(f) => {
            assert_eq!(f.name, "Bir Hospital");
            assert_eq!(f.position, Coord::new(27.69, 85.29));
        }
        other => panic!("expected hospital, got {:?}", other),
    }

    let q = seen.params("/get_ambulance_data");
    assert_eq!(q.get("event_latitude").map(String::as_str), Some("27.7"));
    assert_eq!(q.get("event_longitude").map(String::as_str), Some("85.3"));

    let q = seen.params("/get_shortest_path");
    assert_eq!(q.get("start_latitude").map(String::as_str), Some("27.71"));
    assert_eq!(q.get("end_longitude").map(String::as_str), Some("85.3"));
}

#[tokio::test]
async fn test_ambulance_event_route_params() {
    let seen = Seen::default();
    let addr = dispatch_service(seen.clone()).await;
    let client = client(addr, RouteParamStyle::AmbulanceEvent);

    client
        .shortest_path(Coord::new(27.71, 85.31), Coord::new(27.70, 85.30))
        .await
        .unwrap();

    let q = seen.params("/get_shortest_path");
    assert_eq!(q.get("ambulance_latitude").map(String::as_str), Some("27.71"));
    assert_eq!(q.get("event_latitude").map(String::as_str), Some("27.7"));
    assert!(!q.contains_key("start_latitude"));
}

#[tokio::test]
async fn test_error_status_is_rejection() {
    let router = Router::new().route(
        "/get_event_data",
        get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "database down") }),
    );
    let addr = serve(router).await;

    let err = client(addr, RouteParamStyle::StartEnd)
        .fetch_incidents()
        .await
        .unwrap_err();
    assert_eq!(
        err,
        DispatchError::ServiceRejection {
            status: 503,
            detail: "database down".to_string(),
        }
    );
}

#[tokio::test]
async fn test_bare_ambulance_record() {
    let router = Router::new().route(
        "/get_ambulance_data",
        get(|| async { Json(json!([3, 85.32, 27.72, "idle"])) }),
    );
    let addr = serve(router).await;

    let lookup = client(addr, RouteParamStyle::StartEnd)
        .nearest_responder(Coord::new(27.7, 85.3))
        .await
        .unwrap();
    match lookup {
        ResponderLookup::Found {
            responder,
            radius_km,
        } => {
            assert_eq!(responder.id, "3");
            assert_eq!(responder.position, Coord::new(27.72, 85.32));
            assert_eq!(radius_km, None);
        }
        other => panic!("expected ambulance, got {:?}", other),
    }
}

#[tokio::test]
async fn test_garbage_body_is_parse_failure() {
    let router = Router::new().route("/classify_zone", get(|| async { "<html>oops</html>" }));
    let addr = serve(router).await;

    let err = client(addr, RouteParamStyle::StartEnd)
        .classify_zone(Coord::new(27.7, 85.3))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "parse_failure");
}

#[tokio::test]
async fn test_null_path_is_routing_unavailable() {
    let router = Router::new().route(
        "/get_shortest_path",
        get(|| async { Json(json!({"shortestPathCoordinates": null, "distance": null})) }),
    );
    let addr = serve(router).await;

    let err = client(addr, RouteParamStyle::StartEnd)
        .shortest_path(Coord::new(27.71, 85.31), Coord::new(27.70, 85.30))
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::RoutingUnavailable(_)));
}

#[tokio::test]
async fn test_closed_port_is_network_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client(addr, RouteParamStyle::StartEnd)
        .fetch_incidents()
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::Network(_)));
}

#[tokio::test]
async fn test_report_written_to_disk() {
    let addr = dispatch_service(Seen::default()).await;
    let client = client(addr, RouteParamStyle::StartEnd);
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("patient_report.pdf");
    let timeline = Timeline::new();
    let reporter = RecordingReporter::new(timeline.clone());

    let request = ReportRequest::new("Sita", "unconscious").unwrap();
    let written = report::generate_report(&client, &reporter, &request, &out)
        .await
        .unwrap();

    assert_eq!(written, 13);
    assert_eq!(std::fs::read(&out).unwrap(), b"%PDF-1.4 fake");
    assert!(timeline.narratives().last().unwrap().starts_with("Report saved"));
}

#[tokio::test]
async fn test_report_rejection_is_narrated() {
    let router = Router::new().route(
        "/generate_pdf",
        post(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
    );
    let addr = serve(router).await;
    let client = client(addr, RouteParamStyle::StartEnd);
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("report.pdf");
    let timeline = Timeline::new();
    let reporter = RecordingReporter::new(timeline.clone());

    let request = ReportRequest::new("Sita", "stable").unwrap();
    let err = report::generate_report(&client, &reporter, &request, &out)
        .await
        .unwrap_err();

    assert!(matches!(err, ReportError::Rejected(500)));
    assert!(!out.exists());
    assert_eq!(
        timeline.narratives().last().map(String::as_str),
        Some("Error generating PDF. Please try again.")
    );
}
