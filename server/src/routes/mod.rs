use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, with_security_headers};
use crate::handlers::{admin, auth, customer, health_check, payments};
use crate::state::AppState;

/// Multipart routes carry images; everything else stays at axum's default.
const UPLOAD_BODY_LIMIT: usize = 5 * 1024 * 1024;

fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(auth::login))
        .route("/register", post(auth::register))
        .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT))
}

fn customer_routes() -> Router<AppState> {
    Router::new()
        .route("/movies", get(customer::list_movies))
        .route("/movies/:id", get(customer::movie_detail))
        .route("/genres", get(customer::list_genres))
        .route("/check-seats/:movie_id", get(customer::check_seats))
        .route("/browse-movies/:genre_id", get(customer::browse_movies))
        .route("/ticket", post(customer::book_ticket))
        .route("/orders", get(customer::list_orders))
        .route("/orders/:id", get(customer::order_detail))
        .route("/check-balance", get(customer::check_balance))
        .route("/topup", post(customer::top_up))
        .route("/topup-history", get(customer::top_up_history))
}

fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/genres", get(admin::list_genres).post(admin::create_genre))
        .route("/theaters", get(admin::list_theaters).post(admin::create_theater))
        .route("/movies", get(admin::list_movies).post(admin::create_movie))
        .route(
            "/movies/:id",
            get(admin::movie_detail)
                .put(admin::update_movie)
                .delete(admin::delete_movie),
        )
        .route("/customers", get(admin::list_customers))
        .route("/wallet-transactions", get(admin::list_wallet_transactions))
        .route("/transactions", get(admin::list_transactions))
        .route("/relations/audit", get(admin::audit_relations))
        .route("/relations/repair", post(admin::repair_relations))
        .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT))
}

pub fn create_routes(state: AppState) -> Router {
    let uploads = ServeDir::new(&state.config.upload_dir);
    let cors = create_cors_layer(&state.config.cors_allowed_origins);
    let production = state.config.production;

    let api = Router::new()
        .nest("/auth", auth_routes())
        .nest("/customer", customer_routes())
        .nest("/admin", admin_routes())
        .route("/payments/notification", post(payments::notification));

    let router = Router::new()
        .route("/health", get(health_check))
        .nest("/api", api)
        .nest_service("/uploads", uploads)
        .with_state(state);

    with_security_headers(router, production)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::PasswordHasher;
    use crate::config::Config;
    use crate::payment::MockPaymentGateway;
    use crate::storage::LocalFileStorage;
    use crate::store::{MemoryStore, Stores};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app() -> Router {
        let config = Config::default();
        let files = Arc::new(LocalFileStorage::new(&config.upload_dir, &config.app_url));
        let state = AppState::new(
            config,
            Stores::shared(Arc::new(MemoryStore::new())),
            files,
            Arc::new(MockPaymentGateway::new()),
            PasswordHasher::with_cost(4),
        );
        create_routes(state)
    }

    #[tokio::test]
    async fn test_health_route() {
        let response = app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_bad_token_is_rejected_before_path_parsing() {
        let response = app()
            .oneshot(
                Request::delete("/api/admin/movies/not-a-uuid")
                    .header("authorization", "JWT whatever")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let response = app()
            .oneshot(Request::get("/api/nowhere").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
