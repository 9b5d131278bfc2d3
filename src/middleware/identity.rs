use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use tracing::debug;

use crate::app::AppState;
use crate::auth::{AuthError, Identity};
use crate::error::ApiError;

/// Per-request caller context, inserted by [`identity_middleware`].
///
/// Resolution failures are kept rather than rejected here; each route decides
/// whether it needs an identity at all.
#[derive(Clone, Debug)]
pub struct Caller {
    identity: Result<Identity, AuthError>,
    is_admin: bool,
}

impl Caller {
    pub fn new(identity: Result<Identity, AuthError>, admin_group: &str) -> Self {
        let is_admin = identity
            .as_ref()
            .map(|i| i.is_member_of(admin_group))
            .unwrap_or(false);
        Self { identity, is_admin }
    }

    pub fn identity(&self) -> Result<&Identity, ApiError> {
        self.identity.as_ref().map_err(|e| e.clone().into())
    }

    pub fn is_admin(&self) -> bool {
        self.is_admin
    }

    /// 401 without a verified identity, 403 for a caller outside the admin group.
    pub fn require_admin(&self) -> Result<&Identity, ApiError> {
        let identity = self.identity()?;
        if !self.is_admin {
            return Err(ApiError::forbidden("Access denied. Admin privileges required."));
        }
        Ok(identity)
    }

    /// Tenant the request acts on: an admin's explicit choice, else the caller's own tenant.
    pub fn resolve_tpa_id(&self, requested: Option<&str>) -> Result<String, ApiError> {
        let identity = self.identity()?;

        if self.is_admin {
            if let Some(tpa_id) = requested.map(str::trim).filter(|t| !t.is_empty()) {
                return Ok(tpa_id.to_string());
            }
        }

        identity
            .tpa_id
            .clone()
            .ok_or_else(|| AuthError::NoTenant.into())
    }
}

/// Extract the bearer credential from the Authorization header
pub fn bearer_token(headers: &HeaderMap) -> Result<String, AuthError> {
    let auth_header = headers.get("authorization").ok_or(AuthError::MissingToken)?;

    let auth_str = auth_header.to_str().map_err(|_| AuthError::MalformedHeader)?;

    match auth_str.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
        Some(_) => Err(AuthError::MissingToken),
        None => Err(AuthError::MalformedHeader),
    }
}

/// Resolve the caller once per request and store a [`Caller`] in the extensions
pub async fn identity_middleware(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let identity = match bearer_token(request.headers()) {
        Ok(token) => state.identity.introspect(&token).await,
        Err(e) => Err(e),
    };

    match &identity {
        Ok(identity) => debug!(
            "Caller {} (tpa {:?}, groups {:?})",
            identity.username, identity.tpa_id, identity.groups
        ),
        Err(e) => debug!("Caller identity not resolved: {}", e),
    }

    let caller = Caller::new(identity, &state.config.identity.admin_group);
    request.extensions_mut().insert(caller);

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn identity(tpa: Option<&str>, groups: &[&str]) -> Identity {
        Identity {
            user_id: "u1".into(),
            username: "u1".into(),
            tpa_id: tpa.map(str::to_string),
            employer_id: None,
            groups: groups.iter().map(|g| g.to_string()).collect(),
        }
    }

    #[test]
    fn non_admin_override_is_ignored() {
        let caller = Caller::new(Ok(identity(Some("own"), &[])), "ADMIN");
        assert_eq!(caller.resolve_tpa_id(Some("other")).unwrap(), "own");
        assert_eq!(caller.require_admin().unwrap_err().status_code(), 403);
    }

    #[test]
    fn admin_override_wins() {
        let caller = Caller::new(Ok(identity(None, &["ADMIN"])), "ADMIN");
        assert_eq!(caller.resolve_tpa_id(Some("t2")).unwrap(), "t2");
        assert_eq!(caller.resolve_tpa_id(None).unwrap_err().status_code(), 401);
    }

    #[test]
    fn unresolved_identity_is_unauthorized() {
        let caller = Caller::new(Err(AuthError::MissingToken), "ADMIN");
        assert!(!caller.is_admin());
        assert_eq!(caller.resolve_tpa_id(Some("t1")).unwrap_err().status_code(), 401);
    }

    #[test]
    fn bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), Err(AuthError::MissingToken));

        headers.insert("authorization", HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), Err(AuthError::MalformedHeader));

        headers.insert("authorization", HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers).unwrap(), "abc.def");
    }
}
