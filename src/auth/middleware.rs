//! Access Gate Middleware
//! Mission: Gate protected routes behind token verification and RBAC

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use tracing::error;

use crate::auth::{
    identity::{self, AuthError, Identity},
    jwt::JwtHandler,
    models::UserRole,
    user_store::UserStore,
};

/// State shared by the gate stages.
#[derive(Clone)]
pub struct AuthGateState {
    pub jwt: Arc<JwtHandler>,
    pub users: Arc<UserStore>,
}

/// First gate stage: authenticate the request.
///
/// Runs the identity extractor against the Authorization header and the
/// optional `email` query parameter, then attaches the verified identity
/// to the request for later stages and handlers. Denials short-circuit
/// with the distinguishing reason before any handler runs.
pub async fn authenticate(
    State(state): State<AuthGateState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let claimed = claimed_email(req.uri().query());

    let identity = identity::extract(header, claimed.as_deref(), &state.jwt)?;
    req.extensions_mut().insert(identity);

    Ok(next.run(req).await)
}

/// Second gate stage: require the admin role.
///
/// Must be layered after `authenticate`. Resolves the identity's role from
/// the user store; a missing record or a non-admin role denies the request.
/// The resolved role is attached for handlers that want it.
pub async fn require_admin(
    State(state): State<AuthGateState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let identity = req
        .extensions()
        .get::<Identity>()
        .cloned()
        .ok_or(AuthError::MissingCredential)?;

    let role = state
        .users
        .resolve_role(identity.as_str())
        .map_err(|e| {
            error!("Role lookup failed for {}: {}", identity.as_str(), e);
            AuthError::StoreFailure
        })?
        .ok_or(AuthError::UnknownUser)?;

    if role != UserRole::Admin {
        return Err(AuthError::InsufficientRole);
    }

    req.extensions_mut().insert(role);
    Ok(next.run(req).await)
}

/// Caller-claimed identity, taken from the `email` query parameter.
fn claimed_email(query: Option<&str>) -> Option<String> {
    let query = query?;
    query
        .split('&')
        .find(|pair| pair.starts_with("email="))
        .and_then(|pair| pair.split_once('='))
        .map(|(_, raw)| match urlencoding::decode(raw) {
            Ok(decoded) => decoded.into_owned(),
            Err(_) => raw.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        extract::Extension,
        http::{Request as HttpRequest, StatusCode},
        middleware::from_fn_with_state,
        routing::get,
        Router,
    };
    use http_body_util::BodyExt;
    use serde_json::Map;
    use tempfile::NamedTempFile;
    use tower::ServiceExt;

    async fn whoami(Extension(identity): Extension<Identity>) -> String {
        identity.as_str().to_string()
    }

    async fn admin_only() -> &'static str {
        "ok"
    }

    /// Authenticate-only route plus an authenticate+admin route, composed
    /// the same way as the real router.
    fn gate_router(state: AuthGateState) -> Router {
        let authed = Router::new()
            .route("/whoami", get(whoami))
            .route_layer(from_fn_with_state(state.clone(), authenticate));

        let admin = Router::new()
            .route("/admin", get(admin_only))
            .route_layer(from_fn_with_state(state.clone(), require_admin))
            .route_layer(from_fn_with_state(state.clone(), authenticate));

        Router::new().merge(authed).merge(admin)
    }

    fn test_state() -> (AuthGateState, NamedTempFile) {
        let temp_file = NamedTempFile::new().unwrap();
        let users = UserStore::new(temp_file.path().to_str().unwrap()).unwrap();
        let state = AuthGateState {
            jwt: Arc::new(JwtHandler::new("test-secret-key-12345".to_string())),
            users: Arc::new(users),
        };
        (state, temp_file)
    }

    fn bearer(state: &AuthGateState, email: &str) -> String {
        let (token, _) = state.jwt.issue_token(email, &Map::new()).unwrap();
        format!("Bearer {}", token)
    }

    async fn send(router: Router, uri: &str, auth: Option<&str>) -> (StatusCode, String) {
        let mut builder = HttpRequest::builder().uri(uri);
        if let Some(auth) = auth {
            builder = builder.header(AUTHORIZATION, auth);
        }
        let response = router
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8_lossy(&body).to_string())
    }

    #[tokio::test]
    async fn test_missing_header_denied_unauthorized() {
        let (state, _temp) = test_state();
        let (status, _) = send(gate_router(state), "/whoami", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_malformed_header_denied_unauthorized() {
        let (state, _temp) = test_state();
        let (status, _) = send(gate_router(state), "/whoami", Some("just-a-token")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_valid_token_allowed_with_identity() {
        let (state, _temp) = test_state();
        let auth = bearer(&state, "a@x.com");

        let (status, body) = send(gate_router(state), "/whoami", Some(auth.as_str())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "a@x.com");
    }

    #[tokio::test]
    async fn test_matching_claimed_email_allowed() {
        let (state, _temp) = test_state();
        let auth = bearer(&state, "a@x.com");

        let (status, body) =
            send(gate_router(state), "/whoami?email=a%40x.com", Some(auth.as_str())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "a@x.com");
    }

    #[tokio::test]
    async fn test_mismatched_claimed_email_denied_forbidden() {
        let (state, _temp) = test_state();
        let auth = bearer(&state, "a@x.com");

        let (status, _) =
            send(gate_router(state), "/whoami?email=b%40x.com", Some(auth.as_str())).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_expired_or_foreign_token_denied_forbidden() {
        let (state, _temp) = test_state();
        let foreign = JwtHandler::new("some-other-secret".to_string());
        let (token, _) = foreign.issue_token("a@x.com", &Map::new()).unwrap();
        let auth = format!("Bearer {}", token);

        let (status, _) = send(gate_router(state), "/whoami", Some(auth.as_str())).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_admin_route_requires_a_user_record() {
        let (state, _temp) = test_state();
        let auth = bearer(&state, "ghost@x.com");

        let (status, _) = send(gate_router(state), "/admin", Some(auth.as_str())).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_admin_route_denies_default_role() {
        let (state, _temp) = test_state();
        // Record exists but was never granted a role.
        state.users.upsert_user("a@x.com", &Map::new()).unwrap();
        let auth = bearer(&state, "a@x.com");

        let (status, _) = send(gate_router(state), "/admin", Some(auth.as_str())).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_admin_route_allows_admin() {
        let (state, _temp) = test_state();
        state.users.upsert_user("boss@x.com", &Map::new()).unwrap();
        state
            .users
            .set_role("boss@x.com", UserRole::Admin)
            .unwrap();
        let auth = bearer(&state, "boss@x.com");

        let (status, body) = send(gate_router(state), "/admin", Some(auth.as_str())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");
    }

    #[tokio::test]
    async fn test_admin_route_still_authenticates_first() {
        let (state, _temp) = test_state();
        let (status, _) = send(gate_router(state), "/admin", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_claimed_email_parsing() {
        assert_eq!(claimed_email(None), None);
        assert_eq!(claimed_email(Some("limit=5")), None);
        assert_eq!(
            claimed_email(Some("email=a@x.com")),
            Some("a@x.com".to_string())
        );
        assert_eq!(
            claimed_email(Some("email=a%40x.com&limit=5")),
            Some("a@x.com".to_string())
        );
        assert_eq!(
            claimed_email(Some("limit=5&email=a%40x.com")),
            Some("a@x.com".to_string())
        );
    }
}
