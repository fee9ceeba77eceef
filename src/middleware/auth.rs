use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

use crate::error::{AppError, AppResult};
use crate::policy::UserRole;
use crate::utils::jwt::{verify_token, Claims};
use crate::AppState;

/// Validates the bearer token and stores its claims in request extensions.
/// Staff and café-owner tokens must name the café they act for.
pub async fn auth_middleware(
    State(state): State<AppState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    mut request: Request,
    next: Next,
) -> AppResult<Response> {
    let claims = verify_token(auth.token(), &state.config.jwt_secret)?;
    if matches!(claims.role, UserRole::Staff | UserRole::CafeOwner) && claims.cafe_id.is_none() {
        return Err(AppError::Unauthorized(
            "Venue tokens must carry a café".to_string(),
        ));
    }
    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

fn require_role(request: &Request, allowed: &[UserRole], denied: &str) -> AppResult<()> {
    let claims = request
        .extensions()
        .get::<Claims>()
        .ok_or_else(|| AppError::Unauthorized("No authentication found".to_string()))?;
    if !allowed.contains(&claims.role) {
        return Err(AppError::Forbidden(denied.to_string()));
    }
    Ok(())
}

/// Door and floor routes: staff, café owners and admins.
pub async fn require_staff(request: Request, next: Next) -> AppResult<Response> {
    require_role(
        &request,
        &[UserRole::Staff, UserRole::CafeOwner, UserRole::Admin],
        "Staff access required",
    )?;
    Ok(next.run(request).await)
}

/// Venue configuration routes: café owners and admins.
pub async fn require_manager(request: Request, next: Next) -> AppResult<Response> {
    require_role(
        &request,
        &[UserRole::CafeOwner, UserRole::Admin],
        "Café owner access required",
    )?;
    Ok(next.run(request).await)
}
