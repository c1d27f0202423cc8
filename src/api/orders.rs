//! Order handlers.
//!
//! Every route here runs behind the authenticate stage; orders are always
//! scoped to the token identity.

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;

use crate::api::{error::ApiError, routes::AppState};
use crate::auth::identity::Identity;
use crate::store::shop::{Order, OrderStatus};

#[derive(Debug, Deserialize)]
pub struct PlaceOrderRequest {
    pub product_id: String,
    pub quantity: i64,
}

/// Place an order for the token identity.
pub async fn place_order(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(payload): Json<PlaceOrderRequest>,
) -> Result<Json<Order>, ApiError> {
    let product = state
        .shop
        .get_product(&payload.product_id)?
        .ok_or_else(|| {
            ApiError::NotFound(format!("Product {} not found", payload.product_id))
        })?;

    if payload.quantity < product.min_order {
        return Err(ApiError::BadRequest(format!(
            "minimum order quantity is {}",
            product.min_order
        )));
    }
    if payload.quantity > product.available {
        return Err(ApiError::BadRequest(format!(
            "only {} units available",
            product.available
        )));
    }

    let order = state.shop.insert_order(
        &product.id,
        identity.as_str(),
        payload.quantity,
        product.price_cents,
    )?;

    state
        .shop
        .set_product_available(&product.id, product.available - payload.quantity)?;

    Ok(Json(order))
}

/// List the caller's orders. The caller-claimed identity (query `email`)
/// was already reconciled by the gate; the listing keys off the token
/// identity itself.
pub async fn list_orders(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Vec<Order>>, ApiError> {
    Ok(Json(state.shop.orders_for_email(identity.as_str())?))
}

/// Cancel one of the caller's orders. Ownership uses the same
/// identity-match rule as the gate.
pub async fn cancel_order(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let order = state
        .shop
        .get_order(&id)?
        .ok_or_else(|| ApiError::NotFound(format!("Order {} not found", id)))?;

    identity.ensure_matches(&order.email)?;

    state.shop.delete_order(&id)?;

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: String,
}

/// Update an order's status. Admin only.
pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<StatusUpdate>,
) -> Result<Json<Order>, ApiError> {
    let status = OrderStatus::from_str(&payload.status)
        .ok_or_else(|| ApiError::BadRequest(format!("unknown status '{}'", payload.status)))?;

    if !state.shop.set_order_status(&id, status)? {
        return Err(ApiError::NotFound(format!("Order {} not found", id)));
    }

    let order = state
        .shop
        .get_order(&id)?
        .ok_or_else(|| ApiError::NotFound(format!("Order {} not found", id)))?;

    Ok(Json(order))
}
