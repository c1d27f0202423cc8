//! Review handlers.

use axum::{
    extract::{Extension, Query, State},
    response::Json,
};
use serde::Deserialize;

use crate::api::{error::ApiError, routes::AppState};
use crate::auth::identity::Identity;
use crate::store::shop::Review;

#[derive(Debug, Deserialize)]
pub struct ReviewQuery {
    /// Limit number of results
    pub limit: Option<i64>,
}

/// List recent reviews. Public.
pub async fn list_reviews(
    State(state): State<AppState>,
    Query(params): Query<ReviewQuery>,
) -> Result<Json<Vec<Review>>, ApiError> {
    let limit = params.limit.unwrap_or(50).clamp(1, 500);
    Ok(Json(state.shop.list_reviews(limit)?))
}

#[derive(Debug, Deserialize)]
pub struct NewReview {
    pub name: String,
    pub rating: i64,
    pub text: String,
}

/// Submit a review as the token identity.
pub async fn post_review(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(payload): Json<NewReview>,
) -> Result<Json<Review>, ApiError> {
    if !(1..=5).contains(&payload.rating) {
        return Err(ApiError::BadRequest(
            "rating must be between 1 and 5".to_string(),
        ));
    }
    if payload.text.trim().is_empty() {
        return Err(ApiError::BadRequest("review text cannot be empty".to_string()));
    }

    let review = state.shop.insert_review(
        identity.as_str(),
        payload.name.trim(),
        payload.rating,
        payload.text.trim(),
    )?;

    Ok(Json(review))
}
