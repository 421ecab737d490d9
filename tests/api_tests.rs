use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

mod common;

use common::{default_machine, test_router, trip_start, OWNER};

fn setup_test_app() -> Router {
    test_router(default_machine().machine)
}

fn post(uri: &str, owner: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(owner) = owner {
        builder = builder.header("x-user-id", owner);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, owner: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("x-user-id", owner)
        .body(Body::empty())
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

fn init_body(hours: i64) -> Value {
    let start = trip_start();
    let end = start + time::Duration::hours(hours);
    let format = time::format_description::well_known::Rfc3339;
    json!({
        "start_location": "Union Square",
        "start_time": start.format(&format).unwrap(),
        "end_time": end.format(&format).unwrap(),
        "mode": "walk",
        "stops": common::STOP_NAMES,
    })
}

async fn init_trip(app: &Router, hours: i64) -> String {
    let (status, json) = send(app, post("/trip/init", Some(OWNER), init_body(hours))).await;
    assert_eq!(status, StatusCode::OK, "init failed: {}", json);
    json["trip_id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_check_endpoint() {
    let app = setup_test_app();

    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let (status, json) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["service"], "dayplan");
}

#[tokio::test]
async fn test_missing_identity_is_unauthorized() {
    let app = setup_test_app();

    let (status, json) = send(&app, post("/trip/init", None, init_body(9))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"], "Unauthorized");
}

#[tokio::test]
async fn test_init_validation() {
    let app = setup_test_app();

    let mut body = init_body(9);
    body["stops"] = json!([]);
    let (status, json) = send(&app, post("/trip/init", Some(OWNER), body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["message"].is_string());

    let mut body = init_body(9);
    body["stops"] = json!(["Atlantis"]);
    let (status, _) = send(&app, post("/trip/init", Some(OWNER), body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_full_flow_over_http() {
    let app = setup_test_app();
    let (status, json) = send(&app, post("/trip/init", Some(OWNER), init_body(9))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["timezone"], "America/Los_Angeles");
    assert_eq!(json["window"]["start"], "2026-05-02T09:00:00-07:00");
    let trip_id = json["trip_id"].as_str().unwrap().to_string();
    let trip_ref = json!({ "trip_id": trip_id });

    let (status, json) = send(&app, post("/trip/classify", Some(OWNER), trip_ref.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["stage"], "classified");
    assert_eq!(json["classified_pois"].as_array().unwrap().len(), 3);

    let (status, json) = send(&app, post("/trip/eta", Some(OWNER), trip_ref.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["stage"], "eta_built");
    assert_eq!(json["fallback_cells"], 0);
    assert_eq!(json["incidents"], json!([]));

    let (status, json) = send(&app, post("/trip/plan", Some(OWNER), trip_ref.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["itinerary"]["visits"].as_array().unwrap().len(), 3);
    assert_eq!(json["itinerary"]["confidence"], "high");

    let save = json!({ "trip_id": trip_id, "title": "Saturday walk" });
    let (status, json) = send(&app, post("/trip/save", Some(OWNER), save)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["stage"], "saved");

    let (status, json) = send(&app, get(&format!("/trip/{}", trip_id), OWNER)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["title"], "Saturday walk");
    assert_eq!(json["owner_id"], OWNER);

    let (status, _) = send(&app, get(&format!("/trip/{}", trip_id), "mallory")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_out_of_order_stage_is_conflict() {
    let app = setup_test_app();
    let trip_id = init_trip(&app, 9).await;

    let (status, json) = send(
        &app,
        post("/trip/eta", Some(OWNER), json!({ "trip_id": trip_id })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"], "Conflict");

    let (status, json) = send(&app, get(&format!("/trip/{}/state", trip_id), OWNER)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["stage"], "draft");
}

#[tokio::test]
async fn test_foreign_trip_is_not_found() {
    let app = setup_test_app();
    let trip_id = init_trip(&app, 9).await;

    let (status, _) = send(
        &app,
        post("/trip/classify", Some("mallory"), json!({ "trip_id": trip_id })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_infeasible_plan_is_unprocessable() {
    let app = setup_test_app();
    let trip_id = init_trip(&app, 1).await;
    let trip_ref = json!({ "trip_id": trip_id });

    send(&app, post("/trip/classify", Some(OWNER), trip_ref.clone())).await;
    send(&app, post("/trip/eta", Some(OWNER), trip_ref.clone())).await;
    let (status, json) = send(&app, post("/trip/plan", Some(OWNER), trip_ref)).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(json["message"].as_str().unwrap().contains("Ferry Building"));
}

#[tokio::test]
async fn test_abandon_endpoint() {
    let app = setup_test_app();
    let trip_id = init_trip(&app, 9).await;

    let (status, json) = send(
        &app,
        post("/trip/abandon", Some(OWNER), json!({ "trip_id": trip_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["stage"], "abandoned");

    let (status, _) = send(
        &app,
        post("/trip/classify", Some(OWNER), json!({ "trip_id": trip_id })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}
