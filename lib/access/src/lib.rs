//! Request-scoped security context and authorization guards for keystone.
//!
//! This crate provides:
//! - The resolved caller (`Principal`) and its roles (`Role`, `RoleSet`)
//! - Role-permission-resource bindings and their field filters
//! - Tagged authentication state (`AuthenticationState`)
//! - The per-request `SecurityContext` with resolvers, evaluators and guards
//! - Request-scoped field visibility (`FieldVisibility`, `VisibilitySlot`)
//!
//! # Example
//!
//! ```
//! use keystone_access::{Principal, Role, RoleType, SecurityContext};
//! use keystone_core::{RoleId, UserId};
//!
//! let principal = Principal::new(UserId::new(42), "alice")
//!     .with_roles([Role::new(RoleId::new(5), "owner", RoleType::Root)]);
//! let ctx = SecurityContext::authenticated(principal);
//!
//! assert!(ctx.is_super_admin().unwrap());
//! assert!(ctx.assert_current_user(UserId::new(42)).is_ok());
//! assert!(ctx.assert_current_user(UserId::new(43)).is_err());
//! ```

pub mod auth;
pub mod context;
pub mod error;
pub mod permission;
pub mod principal;
pub mod role;
pub mod visibility;

pub use auth::{ANONYMOUS_AUTHORITY, ANONYMOUS_PRINCIPAL, AuthenticationEvent, AuthenticationState};
pub use context::SecurityContext;
pub use error::{AccessError, ForbiddenReason, UnauthorizedReason};
pub use permission::{PermissionResource, RolePermissionResource};
pub use principal::Principal;
pub use role::{Role, RoleSet, RoleType};
pub use visibility::{FieldVisibility, SlotGuard, SlotState, VisibilitySlot};
