//! Value Object Module

pub mod identity_id;
pub mod identity_status;
pub mod permission_scope;
pub mod user_name;
