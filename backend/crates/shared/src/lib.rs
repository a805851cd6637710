//! Shared Kernel - Domain-crossing minimal core
//!
//! This crate contains the "smallest core" of portal vocabulary:
//! - Common error types, field-level validation errors and result aliases
//! - Typed identifiers shared by every crate
//!
//! Only things whose meaning is identical across all crates belong here.

pub mod error {
    pub mod app_error;
    pub mod conversions;
    pub mod kind;
}
pub mod id;
