//! Endorsement constraints.
//!
//! An [`AuthConstraint`] names the role an endorsing signer must hold and how
//! many distinct signers of that role are needed. Constraints are produced by
//! the policy layer per transaction type and shared by value.

use crate::error::{Error, Result};
use crate::role::Role;
use serde::{Deserialize, Serialize};
use std::fmt;

fn default_sig_count() -> u32 {
    1
}

/// A role + signature-count requirement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawConstraint")]
pub struct AuthConstraint {
    role: Role,
    sig_count: u32,
}

#[derive(Deserialize)]
struct RawConstraint {
    role: Role,
    #[serde(default = "default_sig_count")]
    sig_count: u32,
}

impl TryFrom<RawConstraint> for AuthConstraint {
    type Error = Error;

    fn try_from(raw: RawConstraint) -> Result<Self> {
        AuthConstraint::new(raw.role, raw.sig_count)
    }
}

impl AuthConstraint {
    /// Create a constraint. `sig_count` must be at least 1.
    pub fn new(role: Role, sig_count: u32) -> Result<Self> {
        if sig_count == 0 {
            return Err(Error::InvalidConstraint(format!(
                "sig_count for {} must be at least 1",
                role
            )));
        }
        Ok(Self { role, sig_count })
    }

    /// One `ENDORSER` signature.
    pub fn endorser() -> Self {
        Self {
            role: Role::Endorser,
            sig_count: 1,
        }
    }

    /// The role an endorsing signer must hold.
    pub fn role(&self) -> Role {
        self.role
    }

    pub fn sig_count(&self) -> u32 {
        self.sig_count
    }

    /// Roles accepted for the declared endorser.
    pub fn accepted_roles(&self) -> &[Role] {
        std::slice::from_ref(&self.role)
    }

    /// Whether a resolved registry role satisfies this constraint.
    pub fn is_satisfied_by_role(&self, role: Option<Role>) -> bool {
        self.accepted_roles().contains(&Role::or_default(role))
    }
}

impl Default for AuthConstraint {
    fn default() -> Self {
        Self::endorser()
    }
}

impl fmt::Display for AuthConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.sig_count == 1 {
            write!(f, "1 {} signature is required", self.role)
        } else {
            write!(f, "{} {} signatures are required", self.sig_count, self.role)
        }
    }
}
