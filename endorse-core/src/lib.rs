//! # endorse-core
//!
//! Endorsement-policy authorization for permissioned ledger write requests.
//!
//! Some ledger roles may submit a transaction on their own; others need a
//! co-signer of a privileged role, the *endorser*. This crate answers one
//! question: given a request and an [`AuthConstraint`], is the endorsement
//! requirement satisfied?
//!
//! ## Key Concepts
//!
//! - **Request**: an immutable, signed ledger write; its [`signers`](Request::signers) are derived from the signature map
//! - **Role**: a closed set of ledger roles, split into self-sufficient and dependent
//! - **AuthConstraint**: the role an endorser must hold and how many such signers are needed
//! - **RoleRegistry**: read access to DID → role bindings at a committed or uncommitted [`View`]
//! - **EndorserAuthorizer**: the decision procedure; denials are values carrying a stable reason
//!
//! ## Example
//!
//! ```rust,ignore
//! use endorse_core::{AuthConstraint, Did, EndorserAuthorizer, InMemoryRoleRegistry, Request, Role};
//!
//! let registry = InMemoryRoleRegistry::new();
//! registry.set_role(Did::new("endorser_did")?, Some(Role::Endorser), 1, true);
//!
//! let request = Request::builder(Did::new("author_did")?)
//!     .signed_by(Did::new("author_did")?, "sig1")
//!     .signed_by(Did::new("endorser_did")?, "sig2")
//!     .endorser(Did::new("endorser_did")?)
//!     .build()?;
//!
//! let authorizer = EndorserAuthorizer::new(&registry);
//! authorizer.authorize(&request, &AuthConstraint::endorser())?;
//! ```

pub mod audit;
pub mod authorizer;
pub mod config;
pub mod constraint;
pub mod error;
pub mod registry;
pub mod request;
pub mod role;

// Re-exports for convenience
pub use audit::{
    AuditEvent, AuditEventType, AuditLogger, MemoryLogger, NoOpLogger, StderrLogger, StdoutLogger,
};
pub use authorizer::EndorserAuthorizer;
pub use config::{ConfigError, EndorseConfig};
pub use constraint::AuthConstraint;
pub use error::{Denial, Error, ErrorCode, Result};
pub use registry::{InMemoryRoleRegistry, RegistrySnapshot, RoleBinding, RoleRegistry, View};
pub use request::{Did, Request, RequestBuilder, Signatures};
pub use role::{is_self_sufficient, Role};
