//! HTTP Handlers
//!
//! Gates have already run when these are called; each handler only performs
//! its action.

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use platform::cookie::set_cookie_header;

use crate::application::access_gate::{RequestShape, SessionState};
use crate::application::{
    ChangePasswordInput, ChangePasswordUseCase, DisableIdentityUseCase, SignInInput,
    SignInUseCase, SignOutUseCase,
};
use crate::domain::repository::AuthRepository;
use crate::error::{AuthError, AuthResult};
use crate::presentation::dto::{
    ChangePasswordRequest, DisableMemberRequest, LoginRequest, LoginResponse,
    MemberStatusResponse, SessionStatusResponse,
};
use crate::presentation::payload::Payload;
use crate::presentation::request_context::{RequestContext, found};
use crate::presentation::state::AuthState;

fn cookie_value(cookie: &str) -> AuthResult<HeaderValue> {
    set_cookie_header(cookie).map_err(|e| AuthError::Internal(format!("invalid cookie: {}", e)))
}

fn with_cookie(mut response: Response, cookie: HeaderValue) -> Response {
    response.headers_mut().append(header::SET_COOKIE, cookie);
    response
}

// ============================================================================
// Login / Logout
// ============================================================================

/// POST /login
pub async fn login<R>(
    State(state): State<AuthState<R>>,
    ctx: RequestContext,
    Payload(req): Payload<LoginRequest>,
) -> AuthResult<Response>
where
    R: AuthRepository,
{
    let use_case = SignInUseCase::new(state.validator.clone(), state.authority.clone());

    let input = SignInInput {
        identifier: req.username,
        password: req.password,
        previous_token: ctx.token.clone(),
    };

    let output = match use_case.execute(input).await {
        Ok(output) => output,
        Err(err @ (AuthError::InvalidCredentials | AuthError::ValidationFailed(_)))
            if ctx.shape == RequestShape::Navigation =>
        {
            tracing::warn!(
                kind = err.kind().as_str(),
                reason = %err.reason(),
                route = %ctx.route,
                client_key = %ctx.client_key,
                "Sign-in failed"
            );
            return Ok(found(&format!("{}?failed=1", state.config.login_path)));
        }
        Err(err) => return Err(err),
    };

    let cookie = cookie_value(&state.authority.session_cookie(&output.issued))?;
    let response = match ctx.shape {
        RequestShape::Navigation => found(&state.config.member_home),
        RequestShape::Api => Json(LoginResponse {
            username: output.identity.user_name.to_string(),
            role: output.identity.role.clone(),
            expires_at: output.issued.session.expires_at,
        })
        .into_response(),
    };

    Ok(with_cookie(response, cookie))
}

/// GET /logout
pub async fn logout<R>(State(state): State<AuthState<R>>, ctx: RequestContext) -> AuthResult<Response>
where
    R: AuthRepository,
{
    let use_case = SignOutUseCase::new(state.authority.clone());
    use_case.execute(ctx.token.as_deref()).await?;

    let cookie = cookie_value(&state.authority.clear_cookie())?;
    let response = match ctx.shape {
        RequestShape::Navigation => found(&state.config.login_path),
        RequestShape::Api => StatusCode::NO_CONTENT.into_response(),
    };

    Ok(with_cookie(response, cookie))
}

// ============================================================================
// Password
// ============================================================================

/// POST /changepassword
pub async fn change_password<R>(
    State(state): State<AuthState<R>>,
    ctx: RequestContext,
    Payload(req): Payload<ChangePasswordRequest>,
) -> AuthResult<Response>
where
    R: AuthRepository,
{
    let identity = ctx.member()?;

    let use_case = ChangePasswordUseCase::new(
        state.repo.clone(),
        state.validator.clone(),
        state.authority.clone(),
    );

    let input = ChangePasswordInput {
        current_password: req.current_password,
        new_password: req.new_password,
    };

    let issued = use_case.execute(identity, input).await?;

    let cookie = cookie_value(&state.authority.session_cookie(&issued))?;
    let response = match ctx.shape {
        RequestShape::Navigation => found(&state.config.member_home),
        RequestShape::Api => StatusCode::NO_CONTENT.into_response(),
    };

    Ok(with_cookie(response, cookie))
}

// ============================================================================
// Members
// ============================================================================

/// POST /member/delete
pub async fn disable_member<R>(
    State(state): State<AuthState<R>>,
    ctx: RequestContext,
    Payload(req): Payload<DisableMemberRequest>,
) -> AuthResult<Json<MemberStatusResponse>>
where
    R: AuthRepository,
{
    let actor = ctx.member()?;

    let use_case = DisableIdentityUseCase::new(state.repo.clone(), state.authority.clone());
    let identity = use_case.execute(actor, &req.username).await?;

    Ok(Json(MemberStatusResponse {
        username: identity.user_name.to_string(),
        status: identity.status,
    }))
}

// ============================================================================
// Session
// ============================================================================

/// GET /session
pub async fn session_status(ctx: RequestContext) -> Json<SessionStatusResponse> {
    let response = match &ctx.session {
        SessionState::Member { identity, role, .. } => SessionStatusResponse {
            state: ctx.session.label(),
            username: Some(identity.user_name.to_string()),
            role: Some(role.name.clone()),
            scopes: role.scopes.iter().copied().collect(),
        },
        _ => SessionStatusResponse {
            state: ctx.session.label(),
            username: None,
            role: None,
            scopes: Vec::new(),
        },
    };

    Json(response)
}
