//! Role-based access control.
//!
//! - `roles`: role tags and role sets
//! - `decision`: the allow/deny decision and its error taxonomy
//! - `guard`: axum route guard and the current-user extractor

mod decision;
mod guard;
mod roles;

pub use decision::{authorize, decide, AccessError, Decision};
pub use guard::{require_roles, role_guard, CurrentUser, RequiredRoles};
pub use roles::{RoleSet, RoleTag, ValidRole};
