//! Error types for endorsement authorization.
//!
//! Two families live here. [`Denial`] is an ordinary negative verdict of the
//! endorsement policy: it is returned, never thrown, and its `Display` output
//! is the diagnostic handed back to the submitter. [`Error`] covers malformed
//! input and configuration problems that prevent a decision from being made.

use crate::role::Role;
use crate::Did;
use thiserror::Error;

/// Result type alias for endorse-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Canonical error codes.
///
/// Code ranges:
/// - 1000-1099: Request structure errors
/// - 1100-1199: Role errors
/// - 1200-1299: Constraint errors
/// - 1300-1399: Endorsement policy denials
/// - 1400-1499: Serialization errors
/// - 1500-1599: Configuration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ErrorCode {
    // Request structure errors (1000-1099)
    InvalidRequest = 1000,
    InvalidIdentifier = 1001,
    MissingSignatures = 1002,

    // Role errors (1100-1199)
    UnknownRole = 1100,

    // Constraint errors (1200-1299)
    InvalidConstraint = 1200,

    // Endorsement policy denials (1300-1399)
    EndorserNotDeclared = 1300,
    EndorserRoleInvalid = 1301,
    EndorserNotSigner = 1302,
    InsufficientEndorsements = 1303,

    // Serialization errors (1400-1499)
    MalformedJson = 1400,
    MalformedYaml = 1401,
    SerializationFailed = 1402,

    // Configuration errors (1500-1599)
    ConfigurationInvalid = 1500,
    ConfigurationUnreadable = 1501,
}

impl ErrorCode {
    /// Get the numeric code value.
    pub fn code(self) -> u16 {
        self as u16
    }

    /// Get machine-readable name (kebab-case).
    pub fn name(self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid-request",
            Self::InvalidIdentifier => "invalid-identifier",
            Self::MissingSignatures => "missing-signatures",

            Self::UnknownRole => "unknown-role",

            Self::InvalidConstraint => "invalid-constraint",

            Self::EndorserNotDeclared => "endorser-not-declared",
            Self::EndorserRoleInvalid => "endorser-role-invalid",
            Self::EndorserNotSigner => "endorser-not-signer",
            Self::InsufficientEndorsements => "insufficient-endorsements",

            Self::MalformedJson => "malformed-json",
            Self::MalformedYaml => "malformed-yaml",
            Self::SerializationFailed => "serialization-failed",

            Self::ConfigurationInvalid => "configuration-invalid",
            Self::ConfigurationUnreadable => "configuration-unreadable",
        }
    }

    /// Get HTTP status code based on error category.
    pub fn http_status(self) -> u16 {
        match self.code() / 100 {
            10 => 400, // Request errors -> Bad Request
            11 => 400, // Role errors -> Bad Request
            12 => 400, // Constraint errors -> Bad Request
            13 => 403, // Policy denials -> Forbidden
            14 if self == Self::SerializationFailed => 500,
            14 => 400, // Malformed input -> Bad Request
            _ => 500,  // Configuration / unknown -> Internal Error
        }
    }

    /// Get human-readable description.
    pub fn description(self) -> &'static str {
        match self {
            Self::InvalidRequest => "Request structure is invalid",
            Self::InvalidIdentifier => "Ledger identifier is invalid",
            Self::MissingSignatures => "Request carries no signatures",

            Self::UnknownRole => "Role is not recognized",

            Self::InvalidConstraint => "Authorization constraint is invalid",

            Self::EndorserNotDeclared => "Endorsed transaction does not declare its endorser",
            Self::EndorserRoleInvalid => "Declared endorser does not hold an accepted role",
            Self::EndorserNotSigner => "Declared endorser did not sign the transaction",
            Self::InsufficientEndorsements => "Not enough signatures of the required role",

            Self::MalformedJson => "JSON document is malformed",
            Self::MalformedYaml => "YAML document is malformed",
            Self::SerializationFailed => "Value could not be serialized",

            Self::ConfigurationInvalid => "Configuration is invalid",
            Self::ConfigurationUnreadable => "Configuration could not be read",
        }
    }
}

/// A negative endorsement verdict.
///
/// The `Display` strings of the first three variants are matched on by
/// downstream tooling and must not change.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Denial {
    /// Endorsement is required but the request has no `endorser` field.
    #[error("'Endorser' field must be explicitly set for the endorsed transaction")]
    MissingEndorserDeclaration,

    /// The declared endorser resolves to a role the constraint does not accept.
    #[error("Endorser must have one of the following roles: {}", role_list(.allowed))]
    InvalidEndorserRole { role: Role, allowed: Vec<Role> },

    /// The declared endorser holds an accepted role but did not sign.
    #[error("Endorser must sign the transaction")]
    EndorserNotASigner { endorser: Did },

    /// Fewer distinct signers of the required role than the constraint asks for.
    #[error("Not enough {role} signatures: {required} required, {provided} provided")]
    InsufficientEndorsements {
        role: Role,
        required: u32,
        provided: u32,
    },
}

fn role_list(roles: &[Role]) -> String {
    roles
        .iter()
        .map(|r| r.name())
        .collect::<Vec<_>>()
        .join(", ")
}

impl Denial {
    /// Map this denial to a canonical error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::MissingEndorserDeclaration => ErrorCode::EndorserNotDeclared,
            Self::InvalidEndorserRole { .. } => ErrorCode::EndorserRoleInvalid,
            Self::EndorserNotASigner { .. } => ErrorCode::EndorserNotSigner,
            Self::InsufficientEndorsements { .. } => ErrorCode::InsufficientEndorsements,
        }
    }

    /// The diagnostic returned to the submitter.
    pub fn reason(&self) -> String {
        self.to_string()
    }
}

/// Errors that prevent an authorization decision from being made.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    // =========================================================================
    // Request Errors
    // =========================================================================
    /// Request structure violates an invariant.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Identifier is empty or otherwise unusable.
    #[error("invalid identifier: {0}")]
    InvalidDid(String),

    /// Request with neither signature form, or an empty signature map.
    #[error("request from '{0}' carries no signatures")]
    MissingSignatures(String),

    // =========================================================================
    // Role & Constraint Errors
    // =========================================================================
    /// Role name or ledger code not recognized.
    #[error("unknown role: '{0}'")]
    UnknownRole(String),

    /// Constraint parameters are out of range.
    #[error("invalid constraint: {0}")]
    InvalidConstraint(String),

    // =========================================================================
    // Policy
    // =========================================================================
    /// Endorsement policy denied the request.
    #[error("unauthorized: {0}")]
    Unauthorized(#[from] Denial),

    // =========================================================================
    // Serialization Errors
    // =========================================================================
    /// Serialization error.
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// Deserialization error.
    #[error("deserialization error: {0}")]
    DeserializationError(String),

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Configuration content is invalid.
    #[error("configuration error: {0}")]
    ConfigurationError(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        if e.is_data() || e.is_syntax() || e.is_eof() {
            Error::DeserializationError(e.to_string())
        } else {
            Error::SerializationError(e.to_string())
        }
    }
}

impl Error {
    /// Map this error to a canonical error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidRequest(_) => ErrorCode::InvalidRequest,
            Self::InvalidDid(_) => ErrorCode::InvalidIdentifier,
            Self::MissingSignatures(_) => ErrorCode::MissingSignatures,

            Self::UnknownRole(_) => ErrorCode::UnknownRole,
            Self::InvalidConstraint(_) => ErrorCode::InvalidConstraint,

            Self::Unauthorized(denial) => denial.code(),

            Self::SerializationError(_) => ErrorCode::SerializationFailed,
            Self::DeserializationError(_) => ErrorCode::MalformedJson,

            Self::ConfigurationError(_) => ErrorCode::ConfigurationInvalid,
        }
    }

    /// Get the machine-readable error name (kebab-case).
    pub fn name(&self) -> &'static str {
        self.code().name()
    }

    /// Get HTTP status code for this error.
    pub fn http_status(&self) -> u16 {
        self.code().http_status()
    }

    /// Get human-readable description.
    pub fn description(&self) -> &'static str {
        self.code().description()
    }
}
