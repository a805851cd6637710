//! Portal route table
//!
//! Every page and API endpoint of the portal with its rate limit and gate.
//! Page rendering and CRUD content live outside this service, so each route
//! answers with the admission it was granted.

use auth::application::access_gate::Gate;
use auth::domain::repository::AuthRepository;
use auth::models::permission_scope::PermissionScope::{
    AuditsView, MapsManage, MembersManage, RolesManage, SettingsManage, TanksManage,
};
use auth::presentation::RequestContext;
use auth::{AuthState, RouteSpec, RouteTable};
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Admission {
    pub route: String,
    pub session: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// Reports which route admitted which principal
pub async fn describe_route(ctx: RequestContext) -> Json<Admission> {
    Json(Admission {
        route: ctx.route.to_string(),
        session: ctx.session.label(),
        username: ctx.session.identity().map(|i| i.user_name.to_string()),
    })
}

/// Routes beyond the ones the auth crate serves
pub fn portal_routes<R>() -> RouteTable<AuthState<R>>
where
    R: AuthRepository,
{
    let scope = Gate::Scope;

    RouteTable::new()
        // Visitors
        .route(RouteSpec::get("/", "home", describe_route).gate(Gate::Guest))
        .route(RouteSpec::get("/login", "login.view", describe_route).gate(Gate::Guest))
        .route(RouteSpec::get("/register", "register.view", describe_route).gate(Gate::Guest))
        .route(
            RouteSpec::post("/register", "register.submit", describe_route)
                .limit(1)
                .gate(Gate::Guest),
        )
        .route(
            RouteSpec::get("/register/confirm/{id}", "register.confirm", describe_route)
                .gate(Gate::Guest),
        )
        // Game client
        .route(RouteSpec::post("/authenticate", "game.authenticate", describe_route).limit(600))
        .route(RouteSpec::post("/audit-game", "game.audit", describe_route).limit(600))
        .route(RouteSpec::post("/tanks", "tanks.code", describe_route).limit(6))
        .route(RouteSpec::post("/map/download", "map.download", describe_route).limit(30))
        .route(RouteSpec::post("/map/recordusage", "map.usage", describe_route).limit(30))
        // Tank submissions
        .route(RouteSpec::get("/tank/submit", "tank.submit.view", describe_route))
        .route(RouteSpec::post("/tank/submit", "tank.submit", describe_route).limit(20))
        .route(RouteSpec::get(
            "/tank/submitconfirm/{id}",
            "tank.submit.confirm",
            describe_route,
        ))
        // Tanks
        .route(RouteSpec::post("/tank/search", "tank.search", describe_route).gate(Gate::Member))
        .route(RouteSpec::get("/tank/list", "tank.list", describe_route).gate(Gate::Member))
        .route(RouteSpec::get("/tank/view/{id}", "tank.view", describe_route).gate(Gate::Member))
        .route(RouteSpec::get("/tank/edit/{id}", "tank.edit.view", describe_route).gate(scope(TanksManage)))
        .route(RouteSpec::post("/tank/edit", "tank.edit", describe_route).gate(scope(TanksManage)))
        .route(RouteSpec::get("/tank/delete/{id}", "tank.delete.view", describe_route).gate(scope(TanksManage)))
        .route(RouteSpec::post("/tank/delete", "tank.delete", describe_route).gate(scope(TanksManage)))
        // Members
        .route(RouteSpec::get("/changepassword", "password.view", describe_route).gate(Gate::Member))
        .route(RouteSpec::get("/profile", "profile", describe_route).gate(Gate::Member))
        .route(RouteSpec::post("/member/search", "member.search", describe_route).gate(Gate::Member))
        .route(RouteSpec::get("/member/list", "member.list", describe_route).gate(Gate::Member))
        .route(RouteSpec::get("/member/view/{id}", "member.view", describe_route).gate(Gate::Member))
        .route(RouteSpec::get("/member/edit/{id}", "member.edit.view", describe_route).gate(scope(MembersManage)))
        .route(RouteSpec::post("/member/edit", "member.edit", describe_route).gate(scope(MembersManage)))
        .route(RouteSpec::get("/member/delete/{id}", "member.delete.view", describe_route).gate(scope(MembersManage)))
        // Audits
        .route(RouteSpec::post("/server-audit/search", "server_audit.search", describe_route).gate(scope(AuditsView)))
        .route(RouteSpec::get("/server-audit", "server_audit.view", describe_route).gate(scope(AuditsView)))
        .route(RouteSpec::post("/game-audit/search", "game_audit.search", describe_route).gate(scope(AuditsView)))
        .route(RouteSpec::get("/game-audit", "game_audit.view", describe_route).gate(scope(AuditsView)))
        // Roles
        .route(RouteSpec::get("/role/new", "role.new.view", describe_route).gate(scope(RolesManage)))
        .route(RouteSpec::post("/role/new", "role.new", describe_route).gate(scope(RolesManage)))
        .route(RouteSpec::post("/role/search", "role.search", describe_route).gate(Gate::Member))
        .route(RouteSpec::get("/role/list", "role.list", describe_route).gate(Gate::Member))
        .route(RouteSpec::get("/role/view/{id}", "role.view", describe_route).gate(Gate::Member))
        .route(RouteSpec::get("/role/edit/{id}", "role.edit.view", describe_route).gate(scope(RolesManage)))
        .route(RouteSpec::post("/role/edit", "role.edit", describe_route).gate(scope(RolesManage)))
        .route(RouteSpec::get("/role/delete/{id}", "role.delete.view", describe_route).gate(scope(RolesManage)))
        .route(RouteSpec::post("/role/delete", "role.delete", describe_route).gate(scope(RolesManage)))
        // Settings
        .route(RouteSpec::get("/settings/view", "settings.view", describe_route).gate(Gate::Member))
        .route(RouteSpec::get("/settings/edit", "settings.edit.view", describe_route).gate(scope(SettingsManage)))
        .route(RouteSpec::post("/settings/edit", "settings.edit", describe_route).gate(scope(SettingsManage)))
        // Maps
        .route(RouteSpec::get("/map/create", "map.create.view", describe_route).gate(scope(MapsManage)))
        .route(RouteSpec::post("/map/create", "map.create", describe_route).gate(scope(MapsManage)))
        .route(RouteSpec::post("/map/search", "map.search", describe_route).gate(Gate::Member))
        .route(RouteSpec::get("/map/list", "map.list", describe_route).gate(Gate::Member))
        .route(RouteSpec::get("/map/view/{id}", "map.view", describe_route).gate(Gate::Member))
        .route(RouteSpec::get("/map/edit/{id}", "map.edit.view", describe_route).gate(scope(MapsManage)))
        .route(RouteSpec::post("/map/edit", "map.edit", describe_route).gate(scope(MapsManage)))
        .route(RouteSpec::get("/map/delete/{id}", "map.delete.view", describe_route).gate(scope(MapsManage)))
        .route(RouteSpec::post("/map/delete", "map.delete", describe_route).gate(scope(MapsManage)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed;
    use auth::{AuthConfig, MemoryAuthRepository, auth_routes, portal_router};
    use axum::Router;
    use axum::body::{Body, to_bytes};
    use axum::extract::ConnectInfo;
    use axum::http::{Method, Request, StatusCode, header};
    use platform::password::HashParams;
    use std::net::SocketAddr;
    use tower::ServiceExt;

    const PASSWORD: &str = "Tracks-and-Turrets-42";

    fn app() -> Router {
        let config = AuthConfig {
            password_hash: HashParams::light(),
            ..AuthConfig::development()
        };
        let seed: seed::Seed = serde_json::from_value(serde_json::json!({
            "identities": [
                { "username": "scout", "password": PASSWORD, "role": "member" },
                { "username": "mod", "password": PASSWORD, "role": "moderator" }
            ]
        }))
        .unwrap();
        let repo = seed::build(seed, &config).unwrap();
        let state = AuthState::new(repo, config).unwrap();

        portal_router(
            auth_routes::<MemoryAuthRepository>().merge(portal_routes()),
            state,
        )
        .unwrap()
    }

    fn request(method: Method, uri: &str, cookie: Option<&str>, body: Option<String>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = cookie {
            builder = builder.header(header::COOKIE, format!("portal_session={token}"));
        }
        let body = match body {
            Some(body) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(body)
            }
            None => Body::empty(),
        };
        let mut req = builder.body(body).unwrap();
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([10, 1, 0, 1], 50_000))));
        req
    }

    async fn sign_in(app: &Router, username: &str) -> String {
        let body = serde_json::json!({ "username": username, "password": PASSWORD }).to_string();
        let response = app
            .clone()
            .oneshot(request(Method::POST, "/login", None, Some(body)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        cookie
            .trim_start_matches("portal_session=")
            .split(';')
            .next()
            .unwrap()
            .to_string()
    }

    #[test]
    fn test_route_table_has_unique_routes() {
        let table = auth_routes::<MemoryAuthRepository>().merge(portal_routes());
        let ids: std::collections::HashSet<_> = table.iter().map(|r| r.id.clone()).collect();
        assert_eq!(ids.len(), table.len());
        let _ = app();
    }

    #[tokio::test]
    async fn test_scoped_pages_need_the_scope() {
        let app = app();
        let scout = sign_in(&app, "scout").await;
        let moderator = sign_in(&app, "mod").await;

        let response = app
            .clone()
            .oneshot(request(Method::GET, "/tank/edit/7", Some(&scout), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = app
            .clone()
            .oneshot(request(Method::GET, "/tank/edit/7", Some(&moderator), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["route"], "tank.edit.view");
        assert_eq!(body["username"], "mod");

        let response = app
            .clone()
            .oneshot(request(Method::GET, "/role/new", Some(&moderator), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_registration_allows_one_per_window() {
        let app = app();

        let first = app
            .clone()
            .oneshot(request(Method::POST, "/register", None, None))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let second = app
            .clone()
            .oneshot(request(Method::POST, "/register", None, None))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_game_endpoints_are_open() {
        let app = app();
        let response = app
            .clone()
            .oneshot(request(Method::POST, "/authenticate", None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
