//! Product catalog handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::{error::ApiError, routes::AppState};
use crate::store::shop::{NewProduct, Product};

/// List the catalog. Public.
pub async fn list_products(
    State(state): State<AppState>,
) -> Result<Json<Vec<Product>>, ApiError> {
    Ok(Json(state.shop.list_products()?))
}

/// Get a single product. Requires authentication; the caller-claimed
/// identity (query `email`) is reconciled by the gate.
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Product>, ApiError> {
    state
        .shop
        .get_product(&id)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Product {} not found", id)))
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityUpdate {
    pub available: i64,
}

/// Update a product's available count.
pub async fn update_availability(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<AvailabilityUpdate>,
) -> Result<Json<Value>, ApiError> {
    if payload.available < 0 {
        return Err(ApiError::BadRequest(
            "available must not be negative".to_string(),
        ));
    }

    if !state.shop.set_product_available(&id, payload.available)? {
        return Err(ApiError::NotFound(format!("Product {} not found", id)));
    }

    Ok(Json(json!({ "updated": true, "available": payload.available })))
}

/// Add a product to the catalog. Admin only.
pub async fn create_product(
    State(state): State<AppState>,
    Json(payload): Json<NewProduct>,
) -> Result<Json<Product>, ApiError> {
    if payload.name.trim().is_empty() {
        return Err(ApiError::BadRequest("name cannot be empty".to_string()));
    }
    if payload.price_cents <= 0 {
        return Err(ApiError::BadRequest("price must be positive".to_string()));
    }
    if payload.available < 0 || payload.min_order < 1 {
        return Err(ApiError::BadRequest(
            "invalid availability or minimum order".to_string(),
        ));
    }

    Ok(Json(state.shop.insert_product(payload)?))
}

/// Remove a product from the catalog. Admin only.
pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if !state.shop.delete_product(&id)? {
        return Err(ApiError::NotFound(format!("Product {} not found", id)));
    }

    Ok(StatusCode::NO_CONTENT)
}
