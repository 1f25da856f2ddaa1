//! Endorsement behaviour matrix.
//!
//! Every combination of author role and signer layout that the ledger has
//! historically accepted or rejected, checked against the one-ENDORSER
//! constraint.

use endorse_core::{
    AuthConstraint, Denial, Did, EndorserAuthorizer, InMemoryRoleRegistry, Request,
    RequestBuilder, Role, View,
};

const NO_ENDORSER_DECLARED: &str =
    "'Endorser' field must be explicitly set for the endorsed transaction";
const WRONG_ENDORSER_ROLE: &str = "Endorser must have one of the following roles";
const ENDORSER_MUST_SIGN: &str = "Endorser must sign the transaction";

const ALL_ROLES: [Role; 5] = [
    Role::IdentityOwner,
    Role::NetworkMonitor,
    Role::Trustee,
    Role::Steward,
    Role::Endorser,
];
const DEPENDENT: [Role; 2] = [Role::IdentityOwner, Role::NetworkMonitor];
const SELF_SUFFICIENT: [Role; 3] = [Role::Trustee, Role::Steward, Role::Endorser];

fn did(s: &str) -> Did {
    Did::new(s).unwrap()
}

fn idr_by_role(role: Role) -> Did {
    did(match role {
        Role::Trustee => "trustee_did",
        Role::Steward => "steward_did",
        Role::Endorser => "endorser_did",
        Role::NetworkMonitor => "network_monitor_did",
        Role::IdentityOwner => "no_role_did",
    })
}

/// Identity owners author as a separate DID so they never collide with a
/// co-signing identity owner.
fn author_by_role(role: Role) -> Did {
    match role {
        Role::IdentityOwner => did("author_no_role"),
        other => idr_by_role(other),
    }
}

fn registry() -> InMemoryRoleRegistry {
    let registry = InMemoryRoleRegistry::new();
    registry.set_role(did("author_no_role"), None, 1, false);
    registry.set_role(did("trustee_did"), Some(Role::Trustee), 1, false);
    registry.set_role(did("steward_did"), Some(Role::Steward), 1, false);
    registry.set_role(did("endorser_did"), Some(Role::Endorser), 1, false);
    registry.set_role(did("no_role_did"), None, 1, false);
    registry.set_role(did("network_monitor_did"), Some(Role::NetworkMonitor), 1, false);
    registry.set_role(did("endorser_did2"), Some(Role::Endorser), 1, false);
    registry
}

fn authorize(req: &Request) -> Result<(), Denial> {
    let registry = registry();
    EndorserAuthorizer::new(&registry).authorize(req, &AuthConstraint::endorser())
}

fn reason(result: Result<(), Denial>) -> String {
    result.expect_err("expected a denial").reason()
}

fn multi_signed_by_endorser(author_role: Role, endorser_role: Role) -> RequestBuilder {
    let author = author_by_role(author_role);
    let endorser = idr_by_role(endorser_role);
    Request::builder(author.clone())
        .req_id(1)
        .operation(serde_json::json!({"type": "1", "dest": "target_did"}))
        .signed_by(endorser, "sig1")
        .signed_by(author, "sig2")
}

fn multi_signed_by_author_only(author_role: Role) -> RequestBuilder {
    let author = idr_by_role(author_role);
    Request::builder(author.clone())
        .req_id(1)
        .signed_by(author, "sig2")
}

fn multi_signed_by_non_author_only(author_role: Role, non_author_role: Role) -> RequestBuilder {
    Request::builder(idr_by_role(author_role))
        .req_id(1)
        .signed_by(idr_by_role(non_author_role), "sig")
}

fn signed_by_author_only(author_role: Role) -> RequestBuilder {
    Request::builder(idr_by_role(author_role))
        .req_id(1)
        .signature("sig2")
}

#[test]
fn dont_require_endorser_if_one_sig() {
    for author_role in ALL_ROLES {
        let req = signed_by_author_only(author_role).build().unwrap();
        assert!(authorize(&req).is_ok(), "{author_role} alone");
    }
}

#[test]
fn dont_require_endorser_if_one_multisig() {
    for author_role in ALL_ROLES {
        let req = multi_signed_by_author_only(author_role).build().unwrap();
        assert!(authorize(&req).is_ok(), "{author_role} alone");
    }
}

#[test]
fn require_endorser_if_signed_by_non_author() {
    for author_role in DEPENDENT {
        for non_author_role in ALL_ROLES {
            if author_role == non_author_role {
                continue;
            }
            let req = multi_signed_by_non_author_only(author_role, non_author_role)
                .build()
                .unwrap();
            assert_eq!(
                reason(authorize(&req)),
                NO_ENDORSER_DECLARED,
                "{author_role} signed by {non_author_role}"
            );
        }
    }
}

#[test]
fn dont_require_endorser_if_signed_by_non_author() {
    for author_role in SELF_SUFFICIENT {
        for non_author_role in ALL_ROLES {
            if author_role == non_author_role {
                continue;
            }
            let req = multi_signed_by_non_author_only(author_role, non_author_role)
                .build()
                .unwrap();
            assert!(
                authorize(&req).is_ok(),
                "{author_role} signed by {non_author_role}"
            );
        }
    }
}

#[test]
fn require_endorser_when_multi_sig() {
    for author_role in DEPENDENT {
        let req = multi_signed_by_endorser(author_role, Role::Endorser)
            .build()
            .unwrap();
        assert_eq!(reason(authorize(&req)), NO_ENDORSER_DECLARED);

        let req = multi_signed_by_endorser(author_role, Role::Endorser)
            .endorser(idr_by_role(Role::Endorser))
            .build()
            .unwrap();
        assert!(authorize(&req).is_ok(), "{author_role} with endorser");
    }
}

#[test]
fn dont_require_endorser_when_multi_sig() {
    for author_role in SELF_SUFFICIENT {
        let req = multi_signed_by_endorser(author_role, Role::Endorser)
            .build()
            .unwrap();
        assert!(authorize(&req).is_ok(), "{author_role} without endorser");

        let req = multi_signed_by_endorser(author_role, Role::Endorser)
            .endorser(idr_by_role(Role::Endorser))
            .build()
            .unwrap();
        assert!(authorize(&req).is_ok(), "{author_role} with endorser");
    }
}

#[test]
fn allowed_endorser_roles() {
    let req = multi_signed_by_endorser(Role::IdentityOwner, Role::Endorser)
        .endorser(idr_by_role(Role::Endorser))
        .build()
        .unwrap();
    assert!(authorize(&req).is_ok());
}

#[test]
fn not_allowed_endorser_roles() {
    for endorser_role in [
        Role::Trustee,
        Role::Steward,
        Role::IdentityOwner,
        Role::NetworkMonitor,
    ] {
        let req = multi_signed_by_endorser(Role::IdentityOwner, endorser_role)
            .endorser(idr_by_role(endorser_role))
            .build()
            .unwrap();
        let reason = reason(authorize(&req));
        assert!(reason.contains(WRONG_ENDORSER_ROLE), "{endorser_role}: {reason}");
        assert!(reason.ends_with("ENDORSER"));
    }
}

#[test]
fn endorser_role_checked_when_author_is_self_sufficient() {
    for author_role in SELF_SUFFICIENT {
        let req = multi_signed_by_endorser(author_role, Role::IdentityOwner)
            .endorser(idr_by_role(Role::IdentityOwner))
            .build()
            .unwrap();
        assert!(reason(authorize(&req)).contains(WRONG_ENDORSER_ROLE));
    }
}

#[test]
fn endorser_must_sign() {
    for author_role in [
        Role::IdentityOwner,
        Role::NetworkMonitor,
        Role::Trustee,
        Role::Steward,
    ] {
        let req = multi_signed_by_author_only(author_role)
            .endorser(idr_by_role(Role::Endorser))
            .build()
            .unwrap();
        assert_eq!(reason(authorize(&req)), ENDORSER_MUST_SIGN, "{author_role}");
    }
}

#[test]
fn endorser_is_author_and_1_sig() {
    let req = signed_by_author_only(Role::Endorser)
        .endorser(idr_by_role(Role::Endorser))
        .build()
        .unwrap();
    assert!(authorize(&req).is_ok());
}

#[test]
fn endorser_is_not_author_and_1_sig() {
    let req = signed_by_author_only(Role::Endorser)
        .endorser(did("endorser_did2"))
        .build()
        .unwrap();
    assert_eq!(reason(authorize(&req)), ENDORSER_MUST_SIGN);
}

#[test]
fn self_named_endorser_needs_required_role() {
    // An author who signs alone and names themselves as endorser passes only
    // when their own role matches the constraint.
    for author_role in ALL_ROLES {
        let author = author_by_role(author_role);
        let req = Request::builder(author.clone())
            .signature("sig")
            .endorser(author)
            .build()
            .unwrap();
        assert_eq!(
            authorize(&req).is_ok(),
            author_role == Role::Endorser,
            "{author_role}"
        );
    }
}

#[test]
fn unknown_author_is_identity_owner() {
    let req = Request::builder(did("never_registered"))
        .signed_by(did("never_registered"), "sig1")
        .signed_by(did("trustee_did"), "sig2")
        .build()
        .unwrap();
    assert_eq!(reason(authorize(&req)), NO_ENDORSER_DECLARED);
}

mod scenarios {
    use super::*;

    #[test]
    fn a_identity_owner_single_signature() {
        let req = Request::builder(did("author_no_role"))
            .signature("sig")
            .build()
            .unwrap();
        assert!(authorize(&req).is_ok());
    }

    #[test]
    fn b_identity_owner_cosigned_without_declaration() {
        let req = multi_signed_by_endorser(Role::IdentityOwner, Role::Endorser)
            .build()
            .unwrap();
        assert_eq!(authorize(&req), Err(Denial::MissingEndorserDeclaration));
    }

    #[test]
    fn c_identity_owner_cosigned_with_declaration() {
        let req = multi_signed_by_endorser(Role::IdentityOwner, Role::Endorser)
            .endorser(did("endorser_did"))
            .build()
            .unwrap();
        assert!(authorize(&req).is_ok());
    }

    #[test]
    fn d_trustee_cosigned_by_identity_owner() {
        let req = Request::builder(did("trustee_did"))
            .signed_by(did("trustee_did"), "sig1")
            .signed_by(did("no_role_did"), "sig2")
            .build()
            .unwrap();
        assert!(authorize(&req).is_ok());
    }

    #[test]
    fn e_steward_declared_as_endorser() {
        let req = multi_signed_by_endorser(Role::IdentityOwner, Role::Steward)
            .endorser(did("steward_did"))
            .build()
            .unwrap();
        assert_eq!(
            authorize(&req),
            Err(Denial::InvalidEndorserRole {
                role: Role::Steward,
                allowed: vec![Role::Endorser],
            })
        );
    }

    #[test]
    fn f_single_endorser_signature() {
        let own = Request::builder(did("endorser_did"))
            .signature("sig")
            .endorser(did("endorser_did"))
            .build()
            .unwrap();
        assert!(authorize(&own).is_ok());

        let other = Request::builder(did("endorser_did"))
            .signature("sig")
            .endorser(did("endorser_did2"))
            .build()
            .unwrap();
        assert_eq!(
            authorize(&other),
            Err(Denial::EndorserNotASigner {
                endorser: did("endorser_did2")
            })
        );
    }
}

#[test]
fn committed_view_ignores_pending_roles() {
    // Every binding above is uncommitted; in the committed view the
    // endorser is an identity owner.
    let registry = registry();
    let authorizer = EndorserAuthorizer::new(&registry).with_view(View::Committed);
    let req = multi_signed_by_endorser(Role::IdentityOwner, Role::Endorser)
        .endorser(did("endorser_did"))
        .build()
        .unwrap();

    let denial = authorizer
        .authorize(&req, &AuthConstraint::endorser())
        .unwrap_err();
    assert!(matches!(
        denial,
        Denial::InvalidEndorserRole {
            role: Role::IdentityOwner,
            ..
        }
    ));

    registry.commit_batch();
    assert!(authorizer
        .authorize(&req, &AuthConstraint::endorser())
        .is_ok());
}

#[test]
fn requests_from_ledger_json() {
    let json = r#"{
        "identifier": "author_no_role",
        "reqId": 1514215425836443,
        "operation": {"type": "1", "dest": "new_did", "verkey": "~Verkey"},
        "protocolVersion": 2,
        "signatures": {"author_no_role": "sig1", "endorser_did": "sig2"},
        "endorser": "endorser_did"
    }"#;
    let req = Request::from_json(json).unwrap();
    assert!(authorize(&req).is_ok());

    let legacy = r#"{"identifier": "no_role_did", "reqId": 2, "signature": "sig"}"#;
    assert!(authorize(&Request::from_json(legacy).unwrap()).is_ok());
}
