//! Audit logging for endorsement decisions.
//!
//! Every `authorize` call produces one [`AuditEvent`]. Where it goes is up to
//! the [`AuditLogger`] the authorizer was built with.

use crate::constraint::AuthConstraint;
use crate::error::Denial;
use crate::registry::View;
use crate::request::Request;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, PoisonError};

/// Outcome recorded by an audit event.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    /// The endorsement policy was satisfied.
    Authorized,
    /// The endorsement policy denied the request.
    Denied,
}

/// An audit record of one authorization decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event ID
    pub id: String,

    pub event_type: AuditEventType,

    pub timestamp: DateTime<Utc>,

    /// Digest of the signed request payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_digest: Option<String>,

    /// Author DID
    pub author: String,

    /// Declared endorser DID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endorser: Option<String>,

    /// DIDs that signed the request
    pub signers: Vec<String>,

    /// Constraint the request was checked against
    pub constraint: String,

    /// Registry view used for role lookups
    pub view: View,

    /// Denial reason (denied events only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Numeric denial code (denied events only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<u16>,
}

impl AuditEvent {
    /// Record the outcome of checking `request` against `constraint`.
    pub fn for_decision(
        request: &Request,
        constraint: &AuthConstraint,
        view: View,
        outcome: Result<(), &Denial>,
    ) -> Self {
        let (event_type, reason, code) = match outcome {
            Ok(()) => (AuditEventType::Authorized, None, None),
            Err(denial) => (
                AuditEventType::Denied,
                Some(denial.reason()),
                Some(denial.code().code()),
            ),
        };

        Self {
            id: format!("evt_{}", uuid::Uuid::now_v7().simple()),
            event_type,
            timestamp: Utc::now(),
            request_digest: request.digest().ok(),
            author: request.identifier().to_string(),
            endorser: request.endorser().map(|d| d.to_string()),
            signers: request.signers().iter().map(|d| d.to_string()).collect(),
            constraint: constraint.to_string(),
            view,
            reason,
            code,
        }
    }
}

/// Trait for audit loggers.
pub trait AuditLogger: Send + Sync + std::fmt::Debug {
    /// Log an audit event.
    fn log(&self, event: AuditEvent);
}

/// A logger that writes events to stdout as JSON lines.
#[derive(Debug, Default)]
pub struct StdoutLogger;

impl StdoutLogger {
    pub fn new() -> Self {
        Self
    }
}

impl AuditLogger for StdoutLogger {
    fn log(&self, event: AuditEvent) {
        if let Ok(json) = serde_json::to_string(&event) {
            println!("{}", json);
        } else {
            eprintln!("Failed to serialize audit event: {:?}", event);
        }
    }
}

/// A logger that writes events to stderr as JSON lines, leaving stdout to
/// the caller.
#[derive(Debug, Default)]
pub struct StderrLogger;

impl StderrLogger {
    pub fn new() -> Self {
        Self
    }
}

impl AuditLogger for StderrLogger {
    fn log(&self, event: AuditEvent) {
        match serde_json::to_string(&event) {
            Ok(json) => eprintln!("{}", json),
            Err(_) => eprintln!("Failed to serialize audit event: {:?}", event),
        }
    }
}

/// A logger that does nothing (for testing or when auditing is disabled).
#[derive(Debug, Default)]
pub struct NoOpLogger;

impl AuditLogger for NoOpLogger {
    fn log(&self, _event: AuditEvent) {}
}

/// A logger that keeps events in memory until drained.
#[derive(Debug, Default)]
pub struct MemoryLogger {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take all recorded events.
    pub fn drain_events(&self) -> Vec<AuditEvent> {
        std::mem::take(&mut *self.events.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn len(&self) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AuditLogger for MemoryLogger {
    fn log(&self, event: AuditEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}
