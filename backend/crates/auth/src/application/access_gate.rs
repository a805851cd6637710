//! Access Gate
//!
//! Decides, per request, whether a route admits the caller. Never performs
//! the route's action itself.

use std::sync::Arc;

use axum::http::{HeaderMap, header};

use crate::application::config::AuthConfig;
use crate::application::session_authority::{Principal, SessionAuthority};
use crate::domain::entity::identity::Identity;
use crate::domain::entity::role::Role;
use crate::domain::entity::session::Session;
use crate::domain::repository::AuthRepository;
use crate::domain::value_object::permission_scope::PermissionScope;
use crate::error::{AuthError, AuthResult, SessionRejection};

/// Access requirement attached to a route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// Anyone; the session is resolved if present
    Open,
    /// Visitors only; members are sent to their home page
    Guest,
    /// Valid member session
    Member,
    /// Member whose role grants the scope
    Scope(PermissionScope),
}

/// How a rejected caller is answered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestShape {
    /// Browser page load; answered with redirects
    Navigation,
    /// Script or API client; answered with problem JSON
    Api,
}

impl RequestShape {
    pub fn of(headers: &HeaderMap) -> Self {
        let wants_html = headers
            .get_all(header::ACCEPT)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .any(|v| v.contains("text/html"));
        let is_xhr = headers
            .get("x-requested-with")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.eq_ignore_ascii_case("XMLHttpRequest"));

        if wants_html && !is_xhr {
            RequestShape::Navigation
        } else {
            RequestShape::Api
        }
    }
}

/// Resolved session of the caller
///
/// `renewed` marks a session whose expiry moved during this request.
#[derive(Debug, Clone)]
pub enum SessionState {
    Unauthenticated(SessionRejection),
    Guest {
        session: Session,
        renewed: bool,
    },
    Member {
        identity: Identity,
        role: Role,
        session: Session,
        renewed: bool,
    },
}

impl SessionState {
    pub fn is_member(&self) -> bool {
        matches!(self, SessionState::Member { .. })
    }

    pub fn identity(&self) -> Option<&Identity> {
        match self {
            SessionState::Member { identity, .. } => Some(identity),
            _ => None,
        }
    }

    /// The session, when its expiry moved and the cookie needs resending
    pub fn renewed_session(&self) -> Option<&Session> {
        match self {
            SessionState::Guest {
                session,
                renewed: true,
            }
            | SessionState::Member {
                session,
                renewed: true,
                ..
            } => Some(session),
            _ => None,
        }
    }

    /// Short label for logs and status responses
    pub fn label(&self) -> &'static str {
        match self {
            SessionState::Unauthenticated(_) => "unauthenticated",
            SessionState::Guest { .. } => "guest",
            SessionState::Member { .. } => "member",
        }
    }

    /// Why a non-member request is not authenticated
    fn rejection(&self) -> SessionRejection {
        match self {
            SessionState::Unauthenticated(rejection) => *rejection,
            _ => SessionRejection::GuestSession,
        }
    }
}

/// Result of running a gate
#[derive(Debug)]
pub enum GateOutcome {
    Admit(SessionState),
    Redirect {
        location: String,
        state: SessionState,
    },
    Reject(AuthError),
}

pub struct AccessGate<R>
where
    R: AuthRepository,
{
    authority: Arc<SessionAuthority<R>>,
    repo: Arc<R>,
    config: Arc<AuthConfig>,
}

impl<R> AccessGate<R>
where
    R: AuthRepository,
{
    pub fn new(authority: Arc<SessionAuthority<R>>, repo: Arc<R>, config: Arc<AuthConfig>) -> Self {
        Self {
            authority,
            repo,
            config,
        }
    }

    /// Resolve the caller's session; only storage faults are errors
    pub async fn resolve(&self, token: Option<&str>) -> AuthResult<SessionState> {
        let Some(token) = token else {
            return Ok(SessionState::Unauthenticated(SessionRejection::Missing));
        };

        match self.authority.validate(token).await {
            Ok(Principal::Guest { session, renewed }) => {
                Ok(SessionState::Guest { session, renewed })
            }
            Ok(Principal::Member {
                identity,
                session,
                renewed,
            }) => {
                let role = self.role_of(&identity).await?;
                Ok(SessionState::Member {
                    identity,
                    role,
                    session,
                    renewed,
                })
            }
            Err(AuthError::Unauthorized(rejection)) => {
                Ok(SessionState::Unauthenticated(rejection))
            }
            Err(e) => Err(e),
        }
    }

    /// Missing roles grant nothing
    async fn role_of(&self, identity: &Identity) -> AuthResult<Role> {
        match self.repo.find_role(&identity.role).await? {
            Some(role) => Ok(role),
            None => {
                tracing::warn!(
                    identity_id = %identity.identity_id,
                    role = %identity.role,
                    "Identity references an unknown role"
                );
                Ok(Role::empty(identity.role.clone()))
            }
        }
    }

    /// Run `gate` for a request carrying `token`
    pub async fn evaluate(&self, gate: Gate, token: Option<&str>, shape: RequestShape) -> GateOutcome {
        match self.resolve(token).await {
            Ok(state) => self.decide(gate, state, shape),
            Err(e) => GateOutcome::Reject(e),
        }
    }

    /// Apply `gate` to an already resolved session
    pub fn decide(&self, gate: Gate, state: SessionState, shape: RequestShape) -> GateOutcome {
        match gate {
            Gate::Open => GateOutcome::Admit(state),
            Gate::Guest if state.is_member() => GateOutcome::Redirect {
                location: self.config.member_home.clone(),
                state,
            },
            Gate::Guest => GateOutcome::Admit(state),
            Gate::Member | Gate::Scope(_) if !state.is_member() => match shape {
                RequestShape::Navigation => GateOutcome::Redirect {
                    location: self.config.login_path.clone(),
                    state,
                },
                RequestShape::Api => {
                    GateOutcome::Reject(AuthError::Unauthorized(state.rejection()))
                }
            },
            Gate::Member => GateOutcome::Admit(state),
            Gate::Scope(scope) => match &state {
                SessionState::Member { role, .. } if role.grants(scope) => {
                    GateOutcome::Admit(state)
                }
                _ => GateOutcome::Reject(AuthError::Forbidden(scope)),
            },
        }
    }
}
