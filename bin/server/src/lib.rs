//! keystone HTTP server.
//!
//! This crate exposes the authentication endpoints and the guarded
//! administrative routes over axum. Authorization decisions are made by
//! `keystone-access`; tokens and credentials are handled by
//! `keystone-token`. This crate only wires them to HTTP.

pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod error;
