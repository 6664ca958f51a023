use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

use quick_pay::api::{self, AppState};
use quick_pay::orders::{Pricing, SeedEntry};
use quick_pay::store::{
    self, DiskSlipStore, LocalStore, Persistence, RecipientConfig, RecipientKind, StorageBackend,
};

const TOKEN: &str = "s3cret";

fn roster() -> Vec<SeedEntry> {
    [("Am", "Accounting", 6), ("Jaeng", "Operations", 3), ("Nub", "Operations", 1)]
        .into_iter()
        .map(|(name, dept, qty)| SeedEntry {
            customer_name: name.into(),
            department: dept.into(),
            quantity: qty,
        })
        .collect()
}

fn app_with(dir: &TempDir, backend: StorageBackend, token: Option<&str>) -> Router {
    let persistence = Persistence::new(
        store::open_backend(backend, dir.path()).unwrap(),
        LocalStore::new(dir.path()),
    );
    let slips_dir = dir.path().join("slips");
    let slips = DiskSlipStore::new(&slips_dir, "http://test");
    let recipient = RecipientConfig {
        number: "0812345678".into(),
        kind: RecipientKind::Phone,
    };
    let state = AppState::load(
        persistence,
        Box::new(slips),
        roster(),
        Pricing::default(),
        Some(recipient),
    )
    .with_admin_token(token.map(String::from))
    .with_qr_scale(2);
    api::router(Arc::new(state), slips_dir, 1024 * 1024)
}

fn app(dir: &TempDir) -> Router {
    app_with(dir, StorageBackend::Document, Some(TOKEN))
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn admin(method: Method, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("X-Admin-Token", TOKEN);
    match body {
        Some(v) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(v.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

fn upload(uri: &str, bytes: &'static [u8]) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .body(Body::from(bytes))
        .unwrap()
}

#[tokio::test]
async fn health_and_payment_code() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir);

    let (status, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let req = Request::post("/payment-code")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({"identifier": "081-234-5678", "amount": 100}).to_string(),
        ))
        .unwrap();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["payload"],
        "00020101021229370016A0000006770101110113006681234567853037645406100.005802TH6304F142"
    );
    assert_eq!(body["kind"], "mobile");
    assert_eq!(body["identifier"], "0812345678");

    let req = Request::post("/payment-code")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({"identifier": "1234567890"}).to_string()))
        .unwrap();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("invalid identifier"));
}

#[tokio::test]
async fn customer_views_orders_and_payment() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir);

    let (status, body) = send(&app, get("/orders?department=Operations")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["orders"].as_array().unwrap().len(), 2);
    assert_eq!(body["departments"][0]["name"], "All");
    assert_eq!(body["departments"][0]["unpaidCount"], 3);

    let (_, body) = send(&app, get("/orders?search=JAE")).await;
    assert_eq!(body["orders"][0]["customerName"], "Jaeng");

    let (status, body) = send(&app, get("/orders/0/payment")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["amount"], 200);
    assert_eq!(body["kind"], "mobile");
    assert!(body["payload"].as_str().unwrap().contains("5406200.00"));
    assert!(body["qr"].as_str().unwrap().starts_with("data:image/bmp;base64,"));

    let (status, _) = send(&app, get("/orders/9")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, get("/orders/9/payment")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn slip_upload_moves_order_to_verification() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir);

    let (status, body) = send(&app, upload("/orders/1/slip?filename=proof.png", b"\x89PNG")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "waiting_for_verification");
    let url = body["slipUrl"].as_str().unwrap().to_string();
    assert!(url.starts_with("http://test/slips/"));

    let name = url.rsplit('/').next().unwrap();
    let resp = app
        .clone()
        .oneshot(get(&format!("/slips/{name}")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let (status, _) = send(&app, upload("/orders/1/slip?filename=proof.png", b"")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = send(&app, upload("/orders/1/slip?filename=notes.txt", b"hi")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = send(&app, upload("/orders/7/slip?filename=a.png", b"x")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn admin_routes_require_token() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir);

    let (status, body) = send(&app, get("/admin/orders")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "admin token required");

    let (status, body) = send(&app, admin(Method::GET, "/admin/orders", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stats"]["totalOrders"], 3);
    assert_eq!(body["stats"]["totalRevenue"], 335);

    let open_dir = TempDir::new().unwrap();
    let open = app_with(&open_dir, StorageBackend::None, None);
    let (status, _) = send(&open, get("/admin/stats")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn admin_payment_lifecycle() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir);

    let (status, body) = send(&app, admin(Method::POST, "/admin/orders/0/paid", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "paid");

    // paid orders take no more slips
    let (status, _) = send(&app, upload("/orders/0/slip?filename=a.png", b"x")).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, body) = send(&app, admin(Method::POST, "/admin/orders/0/toggle", None)).await;
    assert_eq!(body["status"], "pending");

    let ids = json!({"ids": ["0", "1"]});
    let (status, body) = send(&app, admin(Method::POST, "/admin/batch/payment", Some(ids.clone()))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
    assert_eq!(body["payment"]["amount"], 300);

    let (status, _) = send(
        &app,
        admin(Method::POST, "/admin/batch/payment", Some(json!({"ids": ["0", "42"]}))),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(
        &app,
        admin(Method::POST, "/admin/batch/confirm", Some(json!({"ids": []}))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, admin(Method::POST, "/admin/batch/confirm", Some(ids))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["updated"], 2);
    assert_eq!(body["stats"]["paidOrders"], 2);
    assert_eq!(body["stats"]["paidRevenue"], 300);

    let (_, body) = send(&app, admin(Method::GET, "/admin/stats", None)).await;
    assert_eq!(body["departments"][0]["department"], "Accounting");
    assert_eq!(body["departments"][0]["quantity"], 6);

    let (status, body) = send(&app, admin(Method::POST, "/admin/reset", None)).await;
    assert_eq!(status, StatusCode::OK);
    let orders = body["orders"].as_array().unwrap();
    assert!(orders.iter().all(|o| o["status"] == "pending"));
}

#[tokio::test]
async fn recipient_can_be_changed() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir);

    let (_, body) = send(&app, admin(Method::GET, "/admin/recipient", None)).await;
    assert_eq!(body["number"], "0812345678");
    assert_eq!(body["type"], "phone");

    let bad = json!({"number": "1234567890", "type": "phone"});
    let (status, _) = send(&app, admin(Method::PUT, "/admin/recipient", Some(bad))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    // a national ID sent with the wrong label is stored as an id_card
    let mislabelled = json!({"number": " 1234567890123 ", "type": "phone"});
    let (status, body) =
        send(&app, admin(Method::PUT, "/admin/recipient", Some(mislabelled))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["recipient"]["type"], "id_card");
    assert_eq!(body["recipient"]["number"], "1234567890123");
    let (_, body) = send(&app, admin(Method::GET, "/admin/recipient", None)).await;
    assert_eq!(body["type"], "id_card");

    let good = json!({"number": "1234567890123", "type": "id_card"});
    let (status, body) = send(&app, admin(Method::PUT, "/admin/recipient", Some(good))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["kind"], "national_id");
    assert_eq!(
        body["sample"],
        "00020101021129370016A0000006770101110213123456789012353037645802TH630433FC"
    );

    let (_, body) = send(&app, get("/orders/2/payment")).await;
    assert_eq!(body["kind"], "national_id");
    assert_eq!(body["amount"], 35);
}

#[tokio::test]
async fn state_survives_restart_from_local_copy() {
    let dir = TempDir::new().unwrap();
    {
        let app = app_with(&dir, StorageBackend::None, None);
        let (status, _) = send(&app, admin(Method::POST, "/admin/orders/2/paid", None)).await;
        assert_eq!(status, StatusCode::OK);
        let cfg = json!({"number": "1234567890123", "type": "id_card"});
        let (status, _) = send(&app, admin(Method::PUT, "/admin/recipient", Some(cfg))).await;
        assert_eq!(status, StatusCode::OK);
    }
    let app = app_with(&dir, StorageBackend::None, None);
    let (_, body) = send(&app, get("/orders/2")).await;
    assert_eq!(body["status"], "paid");
    let (_, body) = send(&app, admin(Method::GET, "/admin/recipient", None)).await;
    assert_eq!(body["type"], "id_card");
}
