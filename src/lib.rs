//! tokenmint — issuance of scoped, time-bounded access tokens for
//! service-account principals in a space/repository hierarchy.
//!
//! The pipeline is strictly forward: input validation → authorization gate →
//! token minter → response assembly. Collaborators (principal directory,
//! authorizer, token store, signer) are trait objects, bound to Postgres in
//! production and to mocks in the integration tests.

pub mod api;
pub mod authz;
pub mod cli;
pub mod config;
pub mod controller;
pub mod errors;
pub mod models;
pub mod store;
pub mod token;
pub mod validate;

use crate::controller::Controller;
use crate::token::jwt::HsSigner;

/// Shared application state passed to handlers.
pub struct AppState {
    pub controller: Controller,
    /// Session decoding at the transport boundary.
    pub sessions: std::sync::Arc<HsSigner>,
}
