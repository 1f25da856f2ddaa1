//! Role registry: DID → role bindings, read at a chosen consistency level.
//!
//! The ledger applies write batches optimistically before consensus commits
//! them. Registry reads therefore take a [`View`]:
//!
//! ```text
//!              ┌──────────────────────┐
//!  Uncommitted │ pending batch overlay│──┐ falls through when absent
//!              └──────────────────────┘  ▼
//!  Committed   ┌──────────────────────────────────────┐
//!              │ committed bindings                   │
//!              └──────────────────────────────────────┘
//! ```
//!
//! The authorizer only reads. [`InMemoryRoleRegistry`] is the reference
//! implementation; durable engines implement [`RoleRegistry`] directly.

use crate::error::{Error, Result};
use crate::request::Did;
use crate::role::Role;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

/// Registry consistency level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    /// Only bindings committed by consensus.
    Committed,
    /// Committed bindings plus the in-flight batch.
    #[default]
    Uncommitted,
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            View::Committed => f.write_str("committed"),
            View::Uncommitted => f.write_str("uncommitted"),
        }
    }
}

impl FromStr for View {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "committed" => Ok(View::Committed),
            "uncommitted" => Ok(View::Uncommitted),
            other => Err(Error::ConfigurationError(format!(
                "unknown registry view '{}' (expected 'committed' or 'uncommitted')",
                other
            ))),
        }
    }
}

/// What the ledger knows about one DID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleBinding {
    /// Assigned role; `None` means identity owner.
    pub role: Option<Role>,
    /// Verification key material.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verkey: Option<String>,
    /// Ledger sequence number of the last write to this binding.
    pub seq_no: u64,
    /// Time of the last write.
    pub txn_time: DateTime<Utc>,
}

impl RoleBinding {
    /// A binding written now at `seq_no`.
    pub fn new(role: Option<Role>, seq_no: u64) -> Self {
        Self {
            role,
            verkey: None,
            seq_no,
            txn_time: Utc::now(),
        }
    }

    pub fn with_verkey(mut self, verkey: impl Into<String>) -> Self {
        self.verkey = Some(verkey.into());
        self
    }

    /// Effective role, defaulting to identity owner.
    pub fn effective_role(&self) -> Role {
        Role::or_default(self.role)
    }
}

/// Read contract of the identity-role store.
pub trait RoleRegistry: Send + Sync {
    /// Look up the binding for `did` in `view`.
    fn binding(&self, did: &Did, view: View) -> Option<RoleBinding>;

    /// Resolve the role of `did`; unbound DIDs are identity owners.
    fn role_of(&self, did: &Did, view: View) -> Role {
        self.binding(did, view)
            .map(|b| b.effective_role())
            .unwrap_or_default()
    }

    /// Freeze the current state for a sequence of lookups that must agree.
    ///
    /// Registries whose bindings can change between two reads return a
    /// snapshot; immutable ones return `None` and are read directly.
    fn pin(&self) -> Option<RegistrySnapshot> {
        None
    }
}

impl<R: RoleRegistry + ?Sized> RoleRegistry for &R {
    fn binding(&self, did: &Did, view: View) -> Option<RoleBinding> {
        (**self).binding(did, view)
    }

    fn pin(&self) -> Option<RegistrySnapshot> {
        (**self).pin()
    }
}

impl<R: RoleRegistry + ?Sized> RoleRegistry for Arc<R> {
    fn binding(&self, did: &Did, view: View) -> Option<RoleBinding> {
        (**self).binding(did, view)
    }

    fn pin(&self) -> Option<RegistrySnapshot> {
        (**self).pin()
    }
}

impl<R: RoleRegistry + ?Sized> RoleRegistry for Box<R> {
    fn binding(&self, did: &Did, view: View) -> Option<RoleBinding> {
        (**self).binding(did, view)
    }

    fn pin(&self) -> Option<RegistrySnapshot> {
        (**self).pin()
    }
}

type Bindings = Arc<HashMap<Did, RoleBinding>>;

#[derive(Debug, Default, Clone)]
struct RegistryState {
    committed: Bindings,
    pending: Bindings,
}

impl RegistryState {
    fn lookup(&self, did: &Did, view: View) -> Option<&RoleBinding> {
        match view {
            View::Committed => self.committed.get(did),
            View::Uncommitted => self.pending.get(did).or_else(|| self.committed.get(did)),
        }
    }

    fn len(&self, view: View) -> usize {
        match view {
            View::Committed => self.committed.len(),
            View::Uncommitted => {
                let shadowed = self
                    .pending
                    .keys()
                    .filter(|did| self.committed.contains_key(*did))
                    .count();
                self.committed.len() + self.pending.len() - shadowed
            }
        }
    }
}

/// In-memory role registry with a single pending batch.
///
/// Writers copy-on-write, so a [`RegistrySnapshot`] taken before a write
/// never observes it. Reads and writes may come from any thread.
#[derive(Debug, Default)]
pub struct InMemoryRoleRegistry {
    state: RwLock<RegistryState>,
}

impl InMemoryRoleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a binding.
    ///
    /// Committed writes land in committed state and are visible in both
    /// views unless a pending entry for the same DID shadows them.
    /// Uncommitted writes land in the pending batch only.
    pub fn set(&self, did: Did, binding: RoleBinding, committed: bool) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if committed {
            Arc::make_mut(&mut state.committed).insert(did, binding);
        } else {
            Arc::make_mut(&mut state.pending).insert(did, binding);
        }
    }

    /// Shorthand for binding `did` to `role` at `seq_no`.
    pub fn set_role(&self, did: Did, role: Option<Role>, seq_no: u64, committed: bool) {
        self.set(did, RoleBinding::new(role, seq_no), committed);
    }

    /// Fold the pending batch into committed state. Returns the number of
    /// bindings committed.
    pub fn commit_batch(&self) -> usize {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let pending = std::mem::take(&mut state.pending);
        let count = pending.len();
        let committed = Arc::make_mut(&mut state.committed);
        for (did, binding) in pending.iter() {
            committed.insert(did.clone(), binding.clone());
        }
        debug!(bindings = count, "committed registry batch");
        count
    }

    /// Discard the pending batch. Returns the number of bindings dropped.
    pub fn reject_batch(&self) -> usize {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let count = state.pending.len();
        state.pending = Bindings::default();
        debug!(bindings = count, "rejected registry batch");
        count
    }

    /// Pin the current state of both views.
    pub fn snapshot(&self) -> RegistrySnapshot {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        RegistrySnapshot {
            state: state.clone(),
        }
    }

    /// Number of DIDs with a binding visible in `view`.
    pub fn len(&self, view: View) -> usize {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len(view)
    }

    pub fn is_empty(&self, view: View) -> bool {
        self.len(view) == 0
    }
}

impl RoleRegistry for InMemoryRoleRegistry {
    fn binding(&self, did: &Did, view: View) -> Option<RoleBinding> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .lookup(did, view)
            .cloned()
    }

    fn pin(&self) -> Option<RegistrySnapshot> {
        Some(self.snapshot())
    }
}

/// Frozen copy of an [`InMemoryRoleRegistry`].
///
/// Cheap to take (two `Arc` clones). Every lookup against a snapshot sees
/// the same state regardless of concurrent batch writes.
#[derive(Debug, Clone)]
pub struct RegistrySnapshot {
    state: RegistryState,
}

impl RegistrySnapshot {
    pub fn len(&self, view: View) -> usize {
        self.state.len(view)
    }

    pub fn is_empty(&self, view: View) -> bool {
        self.len(view) == 0
    }
}

impl RoleRegistry for RegistrySnapshot {
    fn binding(&self, did: &Did, view: View) -> Option<RoleBinding> {
        self.state.lookup(did, view).cloned()
    }
}
