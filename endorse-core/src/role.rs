//! Ledger roles and their trust classification.
//!
//! Roles form a closed set. What matters for endorsement is not a linear
//! trust scale but a split into two classes:
//!
//! | Role             | Ledger code | Class            |
//! |------------------|-------------|------------------|
//! | `TRUSTEE`        | `0`         | self-sufficient  |
//! | `STEWARD`        | `2`         | self-sufficient  |
//! | `ENDORSER`       | `101`       | self-sufficient  |
//! | `NETWORK_MONITOR`| `201`       | dependent        |
//! | `IDENTITY_OWNER` | none        | dependent        |
//!
//! A DID with no registered role is an identity owner.

use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A role assigned to a DID on the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Role {
    Trustee,
    Steward,
    Endorser,
    NetworkMonitor,
    #[default]
    IdentityOwner,
}

impl Role {
    /// All roles, most privileged first.
    pub const ALL: [Role; 5] = [
        Role::Trustee,
        Role::Steward,
        Role::Endorser,
        Role::NetworkMonitor,
        Role::IdentityOwner,
    ];

    /// Whether this role may submit an endorsable transaction without a
    /// separate endorser.
    pub fn is_self_sufficient(self) -> bool {
        match self {
            Role::Trustee | Role::Steward | Role::Endorser => true,
            Role::NetworkMonitor | Role::IdentityOwner => false,
        }
    }

    /// Canonical upper-case name used in diagnostics and configuration.
    pub fn name(self) -> &'static str {
        match self {
            Role::Trustee => "TRUSTEE",
            Role::Steward => "STEWARD",
            Role::Endorser => "ENDORSER",
            Role::NetworkMonitor => "NETWORK_MONITOR",
            Role::IdentityOwner => "IDENTITY_OWNER",
        }
    }

    /// Role code as stored in ledger NYM transactions.
    ///
    /// Identity owners carry no code.
    pub fn ledger_code(self) -> Option<&'static str> {
        match self {
            Role::Trustee => Some("0"),
            Role::Steward => Some("2"),
            Role::Endorser => Some("101"),
            Role::NetworkMonitor => Some("201"),
            Role::IdentityOwner => None,
        }
    }

    /// Resolve an optional registry role, treating absence as identity owner.
    pub fn or_default(role: Option<Role>) -> Role {
        role.unwrap_or_default()
    }
}

/// Classify an optional role; `None` is an unprivileged identity owner.
pub fn is_self_sufficient(role: Option<Role>) -> bool {
    Role::or_default(role).is_self_sufficient()
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Role {
    type Err = Error;

    /// Accepts canonical names (case-insensitive), ledger codes, and the
    /// legacy `TRUST_ANCHOR` alias for endorsers.
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let role = match trimmed.to_ascii_uppercase().as_str() {
            "TRUSTEE" | "0" => Role::Trustee,
            "STEWARD" | "2" => Role::Steward,
            "ENDORSER" | "TRUST_ANCHOR" | "101" => Role::Endorser,
            "NETWORK_MONITOR" | "201" => Role::NetworkMonitor,
            "IDENTITY_OWNER" | "" => Role::IdentityOwner,
            _ => return Err(Error::UnknownRole(trimmed.to_string())),
        };
        Ok(role)
    }
}

impl Serialize for Role {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
