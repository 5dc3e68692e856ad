//! Identities and roles.
//!
//! There is no ambient "current user" anywhere in the core: every
//! coordinator and thread call takes the acting [`Identity`] explicitly.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// The three roles an identity can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// An end user who raises tickets.
    User,
    /// Staff who claim and resolve tickets.
    Staff,
    /// Staff with override capabilities (e.g. releasing another's ticket).
    Admin,
}

impl Role {
    const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Staff => "staff",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing a role from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseRoleError {
    pub got: String,
}

impl fmt::Display for ParseRoleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid role '{}': expected one of user, staff, admin",
            self.got
        )
    }
}

impl std::error::Error for ParseRoleError {}

impl FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Self::User),
            "staff" => Ok(Self::Staff),
            "admin" => Ok(Self::Admin),
            _ => Err(ParseRoleError { got: s.to_string() }),
        }
    }
}

/// An authenticated identity as handed over by the external identity
/// provider (`currentIdentity()` in the store contract).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Opaque identity id.
    pub id: String,
    /// Name shown in thread entries.
    pub display_name: String,
    pub role: Role,
}

impl Identity {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            role,
        }
    }

    /// Whether this identity may hold ticket assignments.
    #[must_use]
    pub const fn is_staff(&self) -> bool {
        matches!(self.role, Role::Staff | Role::Admin)
    }

    /// Whether this identity may override another staff member's hold.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self.role, Role::Admin)
    }
}

#[cfg(test)]
mod tests {
    use super::{Identity, Role};
    use std::str::FromStr;

    #[test]
    fn role_display_parse_roundtrips() {
        for role in [Role::User, Role::Staff, Role::Admin] {
            let rendered = role.to_string();
            assert_eq!(Role::from_str(&rendered).unwrap(), role);
        }
    }

    #[test]
    fn role_parse_rejects_unknown() {
        assert!(Role::from_str("manager").is_err());
        assert!(Role::from_str("").is_err());
    }

    #[test]
    fn role_parse_is_case_insensitive() {
        assert_eq!(Role::from_str(" Staff ").unwrap(), Role::Staff);
    }

    #[test]
    fn staff_and_admin_capabilities() {
        let user = Identity::new("u1", "Uma", Role::User);
        let staff = Identity::new("s1", "Sam", Role::Staff);
        let admin = Identity::new("a1", "Ada", Role::Admin);

        assert!(!user.is_staff());
        assert!(staff.is_staff());
        assert!(!staff.is_admin());
        assert!(admin.is_staff());
        assert!(admin.is_admin());
    }

    #[test]
    fn role_json_uses_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
        assert_eq!(
            serde_json::from_str::<Role>("\"staff\"").unwrap(),
            Role::Staff
        );
    }
}
