#![allow(dead_code)]

use axum::http::{header, HeaderName, HeaderValue};
use axum_test::multipart::{MultipartForm, Part};
use axum_test::{TestRequest, TestServer};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;

use cinema_server::auth::PasswordHasher;
use cinema_server::config::Config;
use cinema_server::payment::notification::signature;
use cinema_server::payment::MockPaymentGateway;
use cinema_server::routes::create_routes;
use cinema_server::state::AppState;
use cinema_server::storage::LocalFileStorage;
use cinema_server::store::{MemoryStore, Stores};

pub const SERVER_KEY: &str = "SB-Mid-server-test";
pub const SHOWING: &str = "2024-06-28 14:30";

pub struct TestApp {
    pub server: TestServer,
    pub uploads: TempDir,
}

pub fn spawn_app() -> TestApp {
    spawn_app_with_key(SERVER_KEY)
}

/// An empty `server_key` mirrors a deployment without gateway credentials.
pub fn spawn_app_with_key(server_key: &str) -> TestApp {
    let uploads = tempfile::tempdir().unwrap();

    let mut config = Config::default();
    config.secret_key = "integration-secret".into();
    config.upload_dir = uploads.path().to_path_buf();
    config.payment.server_key = server_key.into();

    let stores = Stores::shared(Arc::new(MemoryStore::new()));
    let files = Arc::new(LocalFileStorage::new(uploads.path(), &config.app_url));
    let state = AppState::new(
        config,
        stores,
        files,
        Arc::new(MockPaymentGateway::new()),
        PasswordHasher::with_cost(4),
    );

    TestApp {
        server: TestServer::new(create_routes(state)).unwrap(),
        uploads,
    }
}

pub fn png_part(name: &str) -> Part {
    Part::bytes(b"\x89PNG\r\n\x1a\n0000".to_vec())
        .file_name(format!("{name}.png"))
        .mime_type("image/png")
}

pub fn with_token(request: TestRequest, token: &str) -> TestRequest {
    request.add_header(
        header::AUTHORIZATION,
        HeaderValue::from_str(&format!("JWT {token}")).unwrap(),
    )
}

pub fn with_idempotency_key(request: TestRequest, key: &str) -> TestRequest {
    request.add_header(
        HeaderName::from_static("idempotency-key"),
        HeaderValue::from_str(key).unwrap(),
    )
}

impl TestApp {
    /// Registers then signs in, returning the token.
    pub async fn sign_up(&self, role: &str, email: &str) -> String {
        let form = MultipartForm::new()
            .add_text("name", "Andi Wijaya")
            .add_text("email", email)
            .add_text("password", "rahasia123")
            .add_text("role", role);
        let response = self.server.post("/api/auth/register").multipart(form).await;
        assert_eq!(response.status_code(), 200, "{}", response.text());

        let response = self
            .server
            .post("/api/auth/login")
            .json(&json!({ "email": email, "password": "rahasia123", "role": role }))
            .await;
        assert_eq!(response.status_code(), 200, "{}", response.text());
        response.json::<Value>()["data"]["token"]
            .as_str()
            .unwrap()
            .to_string()
    }

    /// Creates a genre, a theater and a movie screened there. Returns
    /// `(movie_id, theater_id, genre_id)`.
    pub async fn seed_catalog(&self, admin: &str) -> (String, String, String) {
        let genre = with_token(self.server.post("/api/admin/genres"), admin)
            .json(&json!({ "name": "Animation" }))
            .await
            .json::<Value>();
        let genre_id = genre["data"]["id"].as_str().unwrap().to_string();

        let theater = with_token(self.server.post("/api/admin/theaters"), admin)
            .json(&json!({ "name": "XXI Plaza Senayan", "city": "Jakarta" }))
            .await
            .json::<Value>();
        let theater_id = theater["data"]["id"].as_str().unwrap().to_string();

        let form = MultipartForm::new()
            .add_text("title", "Jumbo The Movie")
            .add_text("genre", genre_id.as_str())
            .add_text("theaters", theater_id.as_str())
            .add_text("available", "true")
            .add_text("price", "20000")
            .add_text("description", "A boy and his balloon friend")
            .add_part("thumbnail", png_part("jumbo"));
        let response = with_token(self.server.post("/api/admin/movies"), admin)
            .multipart(form)
            .await;
        assert_eq!(response.status_code(), 200, "{}", response.text());
        let movie_id = response.json::<Value>()["data"]["id"]
            .as_str()
            .unwrap()
            .to_string();

        (movie_id, theater_id, genre_id)
    }

    /// Opens a top-up and settles it with a signed gateway notification.
    pub async fn fund(&self, customer: &str, amount: i64) {
        let response = with_token(self.server.post("/api/customer/topup"), customer)
            .json(&json!({ "amount": amount }))
            .await;
        assert_eq!(response.status_code(), 200, "{}", response.text());
        let order_id = response.json::<Value>()["data"]["wallet_transaction_id"]
            .as_str()
            .unwrap()
            .to_string();

        let response = self
            .server
            .post("/api/payments/notification")
            .json(&notification(&order_id, amount, "settlement", SERVER_KEY))
            .await;
        assert_eq!(response.status_code(), 200, "{}", response.text());
    }

    pub async fn balance(&self, customer: &str) -> i64 {
        with_token(self.server.get("/api/customer/check-balance"), customer)
            .await
            .json::<Value>()["data"]["balance"]
            .as_i64()
            .unwrap()
    }
}

pub fn notification(order_id: &str, amount: i64, status: &str, server_key: &str) -> Value {
    let gross_amount = format!("{amount}.00");
    json!({
        "order_id": order_id,
        "status_code": "200",
        "gross_amount": gross_amount,
        "signature_key": signature(order_id, "200", &gross_amount, server_key),
        "transaction_status": status,
    })
}

pub fn booking(movie_id: &str, theater_id: &str, seats: &[&str], subtotal: i64, tax: i64, fee: i64) -> Value {
    json!({
        "movieId": movie_id,
        "theaterId": theater_id,
        "date": SHOWING,
        "seats": seats,
        "subtotal": subtotal,
        "tax": tax,
        "bookingFee": fee,
        "total": subtotal + tax + fee,
    })
}
