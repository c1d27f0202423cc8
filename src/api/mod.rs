//! HTTP API
//! Mission: Route tree, handlers, and error responses

pub mod error;
pub mod orders;
pub mod payments;
pub mod products;
pub mod reviews;
pub mod routes;
pub mod users;

pub use error::ApiError;
pub use payments::PaymentGateway;
pub use routes::{create_router, AppState};
