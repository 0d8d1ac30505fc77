//! Role tags and role sets.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Opaque role label used for coarse-grained access checks.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleTag(String);

impl RoleTag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoleTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoleTag {
    fn from(tag: &str) -> Self {
        Self::new(tag)
    }
}

impl From<String> for RoleTag {
    fn from(tag: String) -> Self {
        Self(tag)
    }
}

/// Roles the service itself knows about when declaring route requirements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidRole {
    Admin,
    SuperUser,
    User,
}

impl ValidRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidRole::Admin => "admin",
            ValidRole::SuperUser => "super-user",
            ValidRole::User => "user",
        }
    }
}

impl From<ValidRole> for RoleTag {
    fn from(role: ValidRole) -> Self {
        RoleTag::new(role.as_str())
    }
}

/// A set of role tags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleSet(BTreeSet<RoleTag>);

impl RoleSet {
    pub fn new() -> Self {
        Self(BTreeSet::new())
    }

    pub fn insert(&mut self, role: impl Into<RoleTag>) -> bool {
        self.0.insert(role.into())
    }

    pub fn contains(&self, role: &RoleTag) -> bool {
        self.0.contains(role)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when at least one tag is present in both sets.
    pub fn intersects(&self, other: &RoleSet) -> bool {
        // iterate the smaller side
        let (small, large) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        small.0.iter().any(|role| large.contains(role))
    }

    pub fn iter(&self) -> impl Iterator<Item = &RoleTag> {
        self.0.iter()
    }

    pub fn to_strings(&self) -> Vec<String> {
        self.0.iter().map(|r| r.as_str().to_string()).collect()
    }
}

impl<R: Into<RoleTag>> FromIterator<R> for RoleSet {
    fn from_iter<I: IntoIterator<Item = R>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl From<&[ValidRole]> for RoleSet {
    fn from(roles: &[ValidRole]) -> Self {
        roles.iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_role_tags() {
        assert_eq!(RoleTag::from(ValidRole::Admin).as_str(), "admin");
        assert_eq!(RoleTag::from(ValidRole::SuperUser).as_str(), "super-user");
        assert_eq!(RoleTag::from(ValidRole::User).as_str(), "user");
    }

    #[test]
    fn test_role_set_intersects() {
        let held: RoleSet = ["admin", "user"].into_iter().collect();
        let admin_only: RoleSet = ["admin"].into_iter().collect();
        let seller: RoleSet = ["seller"].into_iter().collect();

        assert!(held.intersects(&admin_only));
        assert!(admin_only.intersects(&held));
        assert!(!held.intersects(&seller));
        assert!(!held.intersects(&RoleSet::new()));
    }

    #[test]
    fn test_role_set_deduplicates() {
        let roles: RoleSet = ["user", "user", "admin"].into_iter().collect();
        assert_eq!(roles.len(), 2);
        assert_eq!(roles.to_strings(), vec!["admin", "user"]);
    }

    #[test]
    fn test_role_set_serializes_as_list() {
        let roles: RoleSet = [ValidRole::User].as_slice().into();
        let json = serde_json::to_string(&roles).unwrap();
        assert_eq!(json, r#"["user"]"#);
    }
}
