//! The endorsement decision procedure.
//!
//! Given one request and one [`AuthConstraint`], decide whether the request's
//! endorsement situation is acceptable:
//!
//! ```text
//!  endorser declared? ──no──▶ author sole signer? ──yes──▶ AUTHORIZED
//!         │                          │no
//!         │                          ▼
//!         │                 author self-sufficient? ──yes──▶ AUTHORIZED
//!         │                          │no
//!         │                          ▼
//!         │                 DENIED: endorser field must be set
//!         │yes
//!         ▼
//!  endorser role accepted? ──no──▶ DENIED: endorser role
//!         │yes
//!         ▼
//!  endorser signed?        ──no──▶ DENIED: endorser must sign
//!         │yes
//!         ▼
//!  enough signers of role? ──no──▶ DENIED: not enough signatures
//!         │yes
//!         ▼
//!     AUTHORIZED
//! ```
//!
//! A declared endorser is always validated, even when the author would not
//! need one. All role lookups in one call go through the same [`View`] of
//! one registry state, pinned with [`RoleRegistry::pin`] before the first
//! lookup.

use crate::audit::{AuditEvent, AuditLogger, NoOpLogger};
use crate::constraint::AuthConstraint;
use crate::error::Denial;
use crate::registry::{RoleRegistry, View};
use crate::request::{Did, Request};
use std::sync::Arc;
use tracing::{debug, trace};

/// Decides endorsement policy for ledger write requests.
///
/// Stateless apart from its configuration: the registry is only read, and
/// the authorizer can be shared across threads when the registry can. A
/// batch committed while a call is running is never half-observed.
///
/// # Example
///
/// ```rust,ignore
/// let registry = InMemoryRoleRegistry::new();
/// registry.set_role(endorser_did.clone(), Some(Role::Endorser), 1, true);
///
/// let authorizer = EndorserAuthorizer::new(&registry).with_view(View::Committed);
/// authorizer.authorize(&request, &AuthConstraint::endorser())?;
/// ```
#[derive(Debug, Clone)]
pub struct EndorserAuthorizer<R> {
    registry: R,
    view: View,
    audit: Arc<dyn AuditLogger>,
}

impl<R: RoleRegistry> EndorserAuthorizer<R> {
    /// Create an authorizer reading the uncommitted view, without auditing.
    pub fn new(registry: R) -> Self {
        Self {
            registry,
            view: View::default(),
            audit: Arc::new(NoOpLogger),
        }
    }

    /// Set the registry view used by [`authorize`](Self::authorize) (chainable).
    pub fn with_view(mut self, view: View) -> Self {
        self.view = view;
        self
    }

    /// Set the audit sink (chainable).
    pub fn with_audit_logger(mut self, logger: Arc<dyn AuditLogger>) -> Self {
        self.audit = logger;
        self
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    /// Check `request` against `constraint` using the configured view.
    pub fn authorize(&self, request: &Request, constraint: &AuthConstraint) -> Result<(), Denial> {
        self.authorize_in(request, constraint, self.view)
    }

    /// Check `request` against `constraint` using `view` for every lookup.
    pub fn authorize_in(
        &self,
        request: &Request,
        constraint: &AuthConstraint,
        view: View,
    ) -> Result<(), Denial> {
        let outcome = self.evaluate(request, constraint, view);

        match &outcome {
            Ok(()) => debug!(
                author = %request.identifier(),
                req_id = request.req_id(),
                %view,
                "endorsement authorized"
            ),
            Err(denial) => debug!(
                author = %request.identifier(),
                req_id = request.req_id(),
                %view,
                code = denial.code().code(),
                reason = %denial,
                "endorsement denied"
            ),
        }

        self.audit.log(AuditEvent::for_decision(
            request,
            constraint,
            view,
            outcome.as_ref().map(|_| ()),
        ));

        outcome
    }

    /// Pipeline form: `(true, "")` on success, `(false, reason)` on denial.
    pub fn authorize_reason(&self, request: &Request, constraint: &AuthConstraint) -> (bool, String) {
        match self.authorize(request, constraint) {
            Ok(()) => (true, String::new()),
            Err(denial) => (false, denial.reason()),
        }
    }

    fn evaluate(
        &self,
        request: &Request,
        constraint: &AuthConstraint,
        view: View,
    ) -> Result<(), Denial> {
        let endorser = request.endorser();

        if endorser.is_none() && request.is_self_signed() {
            trace!(author = %request.identifier(), "sole signer, no endorser declared");
            return Ok(());
        }

        // Every lookup below reads one frozen state.
        let pinned = self.registry.pin();
        let registry: &dyn RoleRegistry = match &pinned {
            Some(snapshot) => snapshot as &dyn RoleRegistry,
            None => &self.registry,
        };

        let Some(endorser) = endorser else {
            let author_role = registry.role_of(request.identifier(), view);
            trace!(
                author = %request.identifier(),
                role = %author_role,
                "resolved author role"
            );
            if author_role.is_self_sufficient() {
                return Ok(());
            }
            return Err(Denial::MissingEndorserDeclaration);
        };

        check_endorser(registry, request, endorser, constraint, view)
    }
}

fn check_endorser(
    registry: &dyn RoleRegistry,
    request: &Request,
    endorser: &Did,
    constraint: &AuthConstraint,
    view: View,
) -> Result<(), Denial> {
    let accepted = constraint.accepted_roles();

    let endorser_role = registry.role_of(endorser, view);
    trace!(%endorser, role = %endorser_role, "resolved endorser role");
    if !accepted.contains(&endorser_role) {
        return Err(Denial::InvalidEndorserRole {
            role: endorser_role,
            allowed: accepted.to_vec(),
        });
    }

    if !request.is_signed_by(endorser) {
        return Err(Denial::EndorserNotASigner {
            endorser: endorser.clone(),
        });
    }

    let required = constraint.sig_count();
    if required > 1 {
        // The endorser's role was accepted above.
        let provided = request
            .signers()
            .into_iter()
            .filter(|signer| {
                *signer == endorser || accepted.contains(&registry.role_of(signer, view))
            })
            .count() as u32;
        if provided < required {
            return Err(Denial::InsufficientEndorsements {
                role: constraint.role(),
                required,
                provided,
            });
        }
    }

    Ok(())
}
