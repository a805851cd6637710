//! Route Table
//!
//! Every route of the portal is declared once as a [`RouteSpec`]: method,
//! path, id, rate limit and gate. [`RouteTable::into_router`] turns the table
//! into an axum `Router`, wrapping each handler in its own route chain:
//!
//! `rate limiter -> access gate -> handler`

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::{ConnectInfo, Request, State};
use axum::handler::Handler;
use axum::http::{Method, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{MethodRouter, get, post};
use platform::client::resolve_client_key;
use platform::cookie::set_cookie_header;

use crate::application::access_gate::{Gate, GateOutcome, RequestShape, SessionState};
use crate::application::config::AuthConfig;
use crate::application::rate_limiter::RateLimiter;
use crate::domain::repository::AuthRepository;
use crate::error::{AuthError, AuthResult};
use crate::presentation::request_context::{RequestContext, RouteTag, found};
use crate::presentation::state::AuthState;

/// One registered route
pub struct RouteSpec<S> {
    pub method: Method,
    pub path: String,
    /// Unique id; keys rate limits and overrides
    pub id: String,
    /// Requests per window per client, `None` for unlimited
    pub rate_limit: Option<u32>,
    pub gate: Gate,
    handler: MethodRouter<S>,
}

impl<S> RouteSpec<S>
where
    S: Clone + Send + Sync + 'static,
{
    pub fn get<H, T>(path: impl Into<String>, id: impl Into<String>, handler: H) -> Self
    where
        H: Handler<T, S>,
        T: 'static,
    {
        Self::new(Method::GET, path, id, get(handler))
    }

    pub fn post<H, T>(path: impl Into<String>, id: impl Into<String>, handler: H) -> Self
    where
        H: Handler<T, S>,
        T: 'static,
    {
        Self::new(Method::POST, path, id, post(handler))
    }

    fn new(method: Method, path: impl Into<String>, id: impl Into<String>, handler: MethodRouter<S>) -> Self {
        Self {
            method,
            path: path.into(),
            id: id.into(),
            rate_limit: None,
            gate: Gate::Open,
            handler,
        }
    }

    pub fn limit(mut self, max_requests: u32) -> Self {
        self.rate_limit = Some(max_requests);
        self
    }

    pub fn gate(mut self, gate: Gate) -> Self {
        self.gate = gate;
        self
    }
}

/// Ordered set of routes
pub struct RouteTable<S> {
    routes: Vec<RouteSpec<S>>,
}

impl<S> Default for RouteTable<S> {
    fn default() -> Self {
        Self { routes: Vec::new() }
    }
}

impl<S> RouteTable<S>
where
    S: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, spec: RouteSpec<S>) -> Self {
        self.routes.push(spec);
        self
    }

    pub fn merge(mut self, other: RouteTable<S>) -> Self {
        self.routes.extend(other.routes);
        self
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RouteSpec<S>> {
        self.routes.iter()
    }

    /// Build the router; duplicate ids or method/path pairs are an error
    pub fn into_router<R>(self, auth: &AuthState<R>) -> AuthResult<Router<S>>
    where
        R: AuthRepository,
    {
        let mut ids = HashSet::new();
        let mut endpoints = HashSet::new();
        let mut router = Router::new();

        for spec in self.routes {
            if !ids.insert(spec.id.clone()) {
                return Err(AuthError::Internal(format!("duplicate route id `{}`", spec.id)));
            }
            if !endpoints.insert((spec.method.clone(), spec.path.clone())) {
                return Err(AuthError::Internal(format!(
                    "route `{} {}` registered twice",
                    spec.method, spec.path
                )));
            }

            let chain = RouteChain {
                route: Arc::from(spec.id.as_str()),
                limiter: spec
                    .rate_limit
                    .map(|max| auth.limiters.create(&spec.id, max)),
                gate: spec.gate,
                auth: auth.clone(),
            };
            tracing::debug!(
                route = %spec.id,
                method = %spec.method,
                path = %spec.path,
                rate_limit = ?chain.limiter.as_ref().map(RateLimiter::max_requests),
                gate = ?spec.gate,
                "Route registered"
            );

            let handler = spec
                .handler
                .route_layer(middleware::from_fn_with_state(chain, route_chain::<R>));
            router = router.route(&spec.path, handler);
        }

        Ok(router)
    }
}

/// Per-route limiter and gate, built once
struct RouteChain<R>
where
    R: AuthRepository,
{
    route: Arc<str>,
    limiter: Option<RateLimiter>,
    gate: Gate,
    auth: AuthState<R>,
}

impl<R> Clone for RouteChain<R>
where
    R: AuthRepository,
{
    fn clone(&self) -> Self {
        Self {
            route: Arc::clone(&self.route),
            limiter: self.limiter.clone(),
            gate: self.gate,
            auth: self.auth.clone(),
        }
    }
}

async fn route_chain<R>(State(chain): State<RouteChain<R>>, mut req: Request, next: Next) -> Response
where
    R: AuthRepository,
{
    let tag = RouteTag(Arc::clone(&chain.route));
    let config = &chain.auth.config;

    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());
    let client_key = resolve_client_key(req.headers(), peer, config.trust_proxy);
    let shape = RequestShape::of(req.headers());

    if let Some(limiter) = &chain.limiter {
        if let Err(err) = limiter.check(&client_key).await {
            return tagged(err.into_response(), tag);
        }
    }

    let mut token = chain.auth.authority.read_token(req.headers());
    let state = match chain.auth.gate.resolve(token.as_deref()).await {
        Ok(state) => state,
        Err(err) => return tagged(err.into_response(), tag),
    };

    // A session whose expiry slid forward gets its cookie again, whatever
    // the gate decides
    let mut set_cookie = match (state.renewed_session(), token.as_deref()) {
        (Some(renewed), Some(token)) => Some(chain.auth.authority.cookie_for(token, renewed)),
        _ => None,
    };

    let session = match chain.auth.gate.decide(chain.gate, state, shape) {
        GateOutcome::Admit(session) => session,
        GateOutcome::Redirect { location, state } => {
            tracing::info!(
                route = %chain.route,
                client_key = %client_key,
                session = state.label(),
                location = %location,
                "Request redirected by access gate"
            );
            let response = with_session_cookie(found(&location), set_cookie, config);
            return tagged(response, tag);
        }
        GateOutcome::Reject(err) => {
            let response = with_session_cookie(err.into_response(), set_cookie, config);
            return tagged(response, tag);
        }
    };

    // Visitors browsing guest pages get a guest session
    let session = match session {
        SessionState::Unauthenticated(rejection)
            if chain.gate == Gate::Guest
                && config.guest_sessions
                && req.method() == Method::GET =>
        {
            match chain.auth.guest_limiter.check(&client_key).await {
                Ok(_) => {
                    let issued = match chain.auth.authority.issue_guest().await {
                        Ok(issued) => issued,
                        Err(err) => return tagged(err.into_response(), tag),
                    };
                    set_cookie = Some(chain.auth.authority.session_cookie(&issued));
                    token = Some(issued.token);
                    SessionState::Guest {
                        session: issued.session,
                        renewed: false,
                    }
                }
                Err(AuthError::RateLimitExceeded { .. }) => {
                    tracing::debug!(
                        route = %chain.route,
                        client_key = %client_key,
                        "Guest session quota spent, serving without one"
                    );
                    SessionState::Unauthenticated(rejection)
                }
                Err(err) => return tagged(err.into_response(), tag),
            }
        }
        session => session,
    };

    req.extensions_mut().insert(RequestContext {
        route: Arc::clone(&chain.route),
        client_key,
        shape,
        session,
        token,
    });

    let response = next.run(req).await;
    tagged(with_session_cookie(response, set_cookie, config), tag)
}

/// Append `cookie` unless the handler already set or cleared the session
/// cookie itself
fn with_session_cookie(mut response: Response, cookie: Option<String>, config: &AuthConfig) -> Response {
    let Some(cookie) = cookie else {
        return response;
    };

    let prefix = format!("{}=", config.session_cookie_name);
    let handler_set = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .any(|v| v.as_bytes().starts_with(prefix.as_bytes()));
    if handler_set {
        return response;
    }

    match set_cookie_header(&cookie) {
        Ok(value) => {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
        Err(e) => tracing::warn!(error = %e, "Session cookie dropped"),
    }
    response
}

fn tagged(mut response: Response, tag: RouteTag) -> Response {
    response.extensions_mut().insert(tag);
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::memory::MemoryAuthRepository;

    type TestState = AuthState<MemoryAuthRepository>;

    async fn ok() -> &'static str {
        "ok"
    }

    fn state() -> TestState {
        AuthState::new(MemoryAuthRepository::new(), AuthConfig::development()).unwrap()
    }

    #[test]
    fn duplicate_route_id_rejected() {
        let table = RouteTable::<TestState>::new()
            .route(RouteSpec::get("/a", "page", ok))
            .route(RouteSpec::get("/b", "page", ok));
        assert!(table.into_router(&state()).is_err());
    }

    #[test]
    fn duplicate_endpoint_rejected() {
        let table = RouteTable::<TestState>::new()
            .route(RouteSpec::get("/a", "first", ok))
            .route(RouteSpec::get("/a", "second", ok));
        assert!(table.into_router(&state()).is_err());
    }

    #[test]
    fn same_path_different_methods() {
        let table = RouteTable::<TestState>::new()
            .route(RouteSpec::get("/login", "login.view", ok).gate(Gate::Guest))
            .route(RouteSpec::post("/login", "login.submit", ok).limit(20).gate(Gate::Guest));
        assert_eq!(table.len(), 2);
        assert!(table.into_router(&state()).is_ok());
    }
}
