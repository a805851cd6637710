//! Auth Router

use std::sync::Arc;

use axum::Router;
use axum::middleware::{from_fn, from_fn_with_state};
use tower::ServiceBuilder;

use crate::application::access_gate::Gate;
use crate::domain::repository::AuthRepository;
use crate::domain::value_object::permission_scope::PermissionScope;
use crate::error::AuthResult;
use crate::presentation::failure::{handle_error, handle_validation_error, not_found};
use crate::presentation::handlers;
use crate::presentation::route_table::{RouteSpec, RouteTable};
use crate::presentation::state::AuthState;

/// Login attempts per client per window
pub const LOGIN_RATE_LIMIT: u32 = 20;

/// Routes the auth crate serves itself
pub fn auth_routes<R>() -> RouteTable<AuthState<R>>
where
    R: AuthRepository,
{
    RouteTable::new()
        .route(
            RouteSpec::post("/login", "login.submit", handlers::login::<R>)
                .limit(LOGIN_RATE_LIMIT)
                .gate(Gate::Guest),
        )
        .route(RouteSpec::get("/logout", "logout", handlers::logout::<R>))
        .route(
            RouteSpec::post("/changepassword", "password.change", handlers::change_password::<R>)
                .gate(Gate::Member),
        )
        .route(
            RouteSpec::post("/member/delete", "member.delete", handlers::disable_member::<R>)
                .gate(Gate::Scope(PermissionScope::MembersManage)),
        )
        .route(RouteSpec::get("/session", "session.status", handlers::session_status))
}

/// Assemble the full application router from `table`
///
/// Adds the not-found fallback and the failure stages around every route.
pub fn portal_router<R>(table: RouteTable<AuthState<R>>, state: AuthState<R>) -> AuthResult<Router>
where
    R: AuthRepository,
{
    let failure_stages = ServiceBuilder::new()
        .layer(from_fn_with_state(Arc::clone(&state.config), handle_error))
        .layer(from_fn(handle_validation_error));

    let router = table
        .into_router(&state)?
        .fallback(not_found)
        .layer(failure_stages)
        .with_state(state);

    Ok(router)
}
