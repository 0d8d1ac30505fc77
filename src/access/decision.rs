//! Role-based access decision.
//!
//! Role checks are opt-in per operation: an operation that declares no
//! required roles is open to everyone, authenticated or not. Once roles are
//! declared, holding any single one of them is enough.

use thiserror::Error;

use super::roles::RoleSet;

/// Outcome of comparing required roles against held roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    /// Roles were declared but no principal reached the check.
    #[error("Principal not found in request")]
    MissingPrincipal,

    /// The principal holds none of the required roles.
    #[error("Principal does not have required role(s): {required}")]
    Forbidden { required: String },
}

/// Allow iff `required` is empty or shares at least one tag with `held`.
pub fn decide(required: &RoleSet, held: &RoleSet) -> Decision {
    if required.is_empty() || required.intersects(held) {
        Decision::Allow
    } else {
        Decision::Deny
    }
}

/// Full check used by request guards.
///
/// `held` is `None` when no principal is attached to the call. That only
/// matters when roles are actually required, and it is reported as
/// [`AccessError::MissingPrincipal`] rather than a denial.
pub fn authorize(required: &RoleSet, held: Option<&RoleSet>) -> Result<(), AccessError> {
    if required.is_empty() {
        return Ok(());
    }

    let held = held.ok_or(AccessError::MissingPrincipal)?;

    match decide(required, held) {
        Decision::Allow => Ok(()),
        Decision::Deny => Err(AccessError::Forbidden {
            required: required.to_strings().join(", "),
        }),
    }
}
