//! Authorization module - route gate and policy table
//!
//! This module implements the request-time policy-enforcement point:
//! - Protected-route matching with a fixed public path set
//! - Rejection of non-canonical paths before any prefix check
//! - Session and profile resolution through the identity collaborators
//! - Role to allowed-path-prefix policy evaluation (deny by default)
//! - Fail-closed redirects for every collaborator failure

mod evaluator;
mod matcher;
mod middleware;
mod policy;
mod principal;

pub use evaluator::{Decision, Forward, ForwardedCredentials, Gatekeeper, RedirectReason, RedirectTo};
pub use matcher::{is_canonical_path, RouteMatcher, PUBLIC_PATHS};
pub use middleware::authorize_request;
pub use policy::{Access, PolicyTable};
pub use principal::{CurrentSession, Principal};

pub const LOGIN_PATH: &str = "/login";
pub const ONBOARDING_PATH: &str = "/onboarding";
/// Home used when a role has no allowed prefixes.
pub const DEFAULT_HOME: &str = "/dashboard/user";
