//! API router assembly.
//! Mission: Compose the route tree with per-route gate stages
//!
//! Access policy is composed per router: catalog browsing and profile
//! upsert are public, ordering and reviews require authentication, and
//! catalog/account administration additionally requires the admin role.

use std::sync::Arc;

use axum::{
    middleware::from_fn_with_state,
    response::Json,
    routing::{delete, get, patch, post, put},
    Router,
};
use serde::Serialize;

use crate::{
    api::{orders, payments, payments::PaymentGateway, products, reviews, users},
    auth::{
        jwt::JwtHandler,
        middleware::{authenticate, require_admin, AuthGateState},
        user_store::UserStore,
    },
    store::shop::ShopStore,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub shop: Arc<ShopStore>,
    pub users: Arc<UserStore>,
    pub jwt: Arc<JwtHandler>,
    pub payments: Arc<PaymentGateway>,
}

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    let gate = AuthGateState {
        jwt: state.jwt.clone(),
        users: state.users.clone(),
    };

    let public = Router::new()
        .route("/health", get(health_check))
        .route("/api/products", get(products::list_products))
        .route("/api/reviews", get(reviews::list_reviews))
        .route("/api/users/:email", put(users::upsert_user));

    let authenticated = Router::new()
        .route(
            "/api/products/:id",
            get(products::get_product).patch(products::update_availability),
        )
        .route(
            "/api/orders",
            post(orders::place_order).get(orders::list_orders),
        )
        .route("/api/orders/:id", delete(orders::cancel_order))
        .route("/api/reviews", post(reviews::post_review))
        .route("/api/payments/intent", post(payments::create_payment_intent))
        .route("/api/users/me", get(users::current_user))
        .route("/api/users/:email/admin", get(users::admin_status))
        .route_layer(from_fn_with_state(gate.clone(), authenticate));

    let admin = Router::new()
        .route("/api/admin/products", post(products::create_product))
        .route("/api/admin/products/:id", delete(products::delete_product))
        .route("/api/admin/users", get(users::list_users))
        .route("/api/admin/users/:email/role", put(users::set_role))
        .route("/api/admin/orders/:id/status", patch(orders::update_status))
        .route_layer(from_fn_with_state(gate.clone(), require_admin))
        .route_layer(from_fn_with_state(gate, authenticate));

    Router::new()
        .merge(public)
        .merge(authenticated)
        .merge(admin)
        .with_state(state)
}

// ===== Health =====

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

/// Health check endpoint
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
