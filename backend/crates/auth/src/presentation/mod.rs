//! Presentation Layer
//!
//! Route table, route chain, handlers, DTOs and failure stages.

pub mod dto;
pub mod failure;
pub mod handlers;
pub mod payload;
pub mod request_context;
pub mod route_table;
pub mod router;
pub mod state;

pub use payload::Payload;
pub use request_context::{RequestContext, found};
pub use route_table::{RouteSpec, RouteTable};
pub use router::{auth_routes, portal_router};
pub use state::AuthState;
