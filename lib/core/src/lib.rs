//! Core domain types and utilities for keystone.
//!
//! This crate provides the identifier types and the error-handling alias
//! shared by the access, token and server crates.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{ParseIdError, PermissionResourceId, RoleId, RolePermissionResourceId, UserId};
