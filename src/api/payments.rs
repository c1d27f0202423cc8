//! Payment intents.
//! Mission: Pass payment-intent creation through to the external gateway

use axum::{
    extract::{Extension, State},
    response::Json,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::{error::ApiError, routes::AppState};
use crate::auth::identity::Identity;
use crate::store::shop::Order;

/// Thin client for the external payment gateway (Stripe-compatible
/// payment-intents API). The core owns none of the protocol details.
pub struct PaymentGateway {
    http: reqwest::Client,
    base_url: String,
    secret_key: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: String,
    pub amount: i64,
    pub currency: String,
}

impl PaymentGateway {
    pub fn new(http: reqwest::Client, base_url: String, secret_key: String) -> Self {
        Self {
            http,
            base_url,
            secret_key,
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.secret_key.trim().is_empty()
    }

    /// Create a payment intent at the gateway and relay its response.
    pub async fn create_intent(&self, amount_cents: i64, currency: &str) -> Result<PaymentIntent> {
        let url = format!("{}/v1/payment_intents", self.base_url.trim_end_matches('/'));

        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.secret_key)
            .form(&[
                ("amount", amount_cents.to_string()),
                ("currency", currency.to_string()),
            ])
            .send()
            .await
            .context("Payment gateway unreachable")?;

        if !resp.status().is_success() {
            anyhow::bail!("Payment gateway returned {}", resp.status());
        }

        resp.json::<PaymentIntent>()
            .await
            .context("Malformed payment gateway response")
    }
}

/// Total charge for an order, in cents.
pub fn order_amount_cents(order: &Order) -> i64 {
    order.quantity * order.unit_price_cents
}

#[derive(Debug, Deserialize)]
pub struct CreateIntentRequest {
    pub order_id: String,
}

#[derive(Debug, Serialize)]
pub struct CreateIntentResponse {
    pub client_secret: String,
    pub amount: i64,
}

/// Create a payment intent for one of the caller's orders.
pub async fn create_payment_intent(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(payload): Json<CreateIntentRequest>,
) -> Result<Json<CreateIntentResponse>, ApiError> {
    if !state.payments.is_configured() {
        return Err(ApiError::Gateway(
            "Payment gateway not configured".to_string(),
        ));
    }

    let order = state
        .shop
        .get_order(&payload.order_id)?
        .ok_or_else(|| ApiError::NotFound(format!("Order {} not found", payload.order_id)))?;

    identity.ensure_matches(&order.email)?;

    let amount = order_amount_cents(&order);
    let intent = state
        .payments
        .create_intent(amount, "usd")
        .await
        .map_err(|e| ApiError::Gateway(e.to_string()))?;

    Ok(Json(CreateIntentResponse {
        client_secret: intent.client_secret,
        amount: intent.amount,
    }))
}
