//! Small stable numeric identities bound to exported subtrees.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A 16-bit identity used by downstream consumers to reference an exported
/// artifact.
///
/// `0` means "unassigned". Values `1..=3` belong to the fixed
/// [`ReservedCategory`] bindings; everything from [`Identity::FIRST_DYNAMIC`]
/// upward is handed out by a monotonic counter.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct Identity(u16);

impl Identity {
    /// The "no identity assigned" value.
    pub const UNASSIGNED: Identity = Identity(0);

    /// Highest identity value owned by a reserved category.
    pub const LAST_RESERVED: Identity = Identity(3);

    /// First identity value the counter may hand out.
    pub const FIRST_DYNAMIC: Identity = Identity(4);

    /// Creates an `Identity` from its raw value.
    pub const fn new(raw: u16) -> Self {
        Self(raw)
    }

    /// Returns the raw `u16` value.
    pub const fn get(self) -> u16 {
        self.0
    }

    /// Returns `true` for the unassigned sentinel.
    pub fn is_unassigned(self) -> bool {
        self.0 == 0
    }

    /// Returns `true` if this value belongs to a reserved category.
    pub fn is_reserved(self) -> bool {
        (1..=Self::LAST_RESERVED.0).contains(&self.0)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error returned when an identity token is not a decimal `u16`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid identity token '{token}'")]
pub struct ParseIdentityError {
    /// The rejected token.
    pub token: String,
}

impl FromStr for Identity {
    type Err = ParseIdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u16>().map(Identity).map_err(|_| ParseIdentityError {
            token: s.to_string(),
        })
    }
}

/// Fixed semantic categories that always receive the same identity.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum ReservedCategory {
    /// The primary viewpoint (the user's head/camera).
    PrimaryViewpoint,
    /// The left-hand manipulator.
    LeftManipulator,
    /// The right-hand manipulator.
    RightManipulator,
}

impl ReservedCategory {
    /// All categories in identity order.
    pub const ALL: [ReservedCategory; 3] = [
        ReservedCategory::PrimaryViewpoint,
        ReservedCategory::LeftManipulator,
        ReservedCategory::RightManipulator,
    ];

    /// Returns the identity permanently bound to this category.
    pub fn identity(self) -> Identity {
        match self {
            ReservedCategory::PrimaryViewpoint => Identity(1),
            ReservedCategory::LeftManipulator => Identity(2),
            ReservedCategory::RightManipulator => Identity(3),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_range() {
        assert!(!Identity::UNASSIGNED.is_reserved());
        assert!(Identity::new(1).is_reserved());
        assert!(Identity::new(3).is_reserved());
        assert!(!Identity::FIRST_DYNAMIC.is_reserved());
        assert!(Identity::UNASSIGNED.is_unassigned());
    }

    #[test]
    fn categories_map_to_fixed_values() {
        let ids: Vec<u16> = ReservedCategory::ALL
            .iter()
            .map(|c| c.identity().get())
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert!(ReservedCategory::ALL.iter().all(|c| c.identity().is_reserved()));
    }

    #[test]
    fn parse_and_display() {
        let id: Identity = "65535".parse().unwrap();
        assert_eq!(id.get(), u16::MAX);
        assert_eq!(id.to_string(), "65535");
        assert!("65536".parse::<Identity>().is_err());
        assert!("-1".parse::<Identity>().is_err());
        assert!("x".parse::<Identity>().is_err());
    }

    #[test]
    fn serde_roundtrip() {
        let id = Identity::new(42);
        let json = serde_json::to_string(&id).unwrap();
        let back: Identity = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }
}
