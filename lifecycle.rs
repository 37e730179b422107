/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The lifecycle state machine of a document host.
//!
//! The transition table is strict: every state change goes through
//! `HostTree::set_lifecycle_state`, which consults `can_transition_to`
//! and rejects (with a debug assertion) anything not in the table.

use serde::{Deserialize, Serialize};

/// The lifecycle state of a document host, from creation to destruction.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum LifecycleState {
    /// Created optimistically for an in-flight navigation whose final
    /// destination (and process) is not yet committed to.
    Speculative,
    /// The commit instruction has been sent to the renderer; we are
    /// waiting for the renderer's commit report.
    PendingCommit,
    /// The current document of its frame slot.
    Active,
    /// Fully loaded ahead of time, not yet shown to the user.
    Prerendering,
    /// Kept alive, frozen, for instant history traversal.
    InBackForwardCache,
    /// The renderer is running unload handlers for this document.
    RunningUnloadHandlers,
    /// Terminal. Destroyed once all children are gone and the detach has
    /// been acknowledged.
    ReadyToBeDeleted,
}

impl LifecycleState {
    /// The transition table. Anything not listed here is a bug in the
    /// caller.
    pub fn can_transition_to(self, new_state: LifecycleState) -> bool {
        use LifecycleState::*;
        matches!(
            (self, new_state),
            (Speculative, Active) |
                (Speculative, PendingCommit) |
                (PendingCommit, Prerendering) |
                (PendingCommit, Active) |
                (PendingCommit, ReadyToBeDeleted) |
                (Prerendering, Active) |
                (Prerendering, RunningUnloadHandlers) |
                (Prerendering, ReadyToBeDeleted) |
                (Active, InBackForwardCache) |
                (Active, RunningUnloadHandlers) |
                (Active, ReadyToBeDeleted) |
                (InBackForwardCache, Active) |
                (InBackForwardCache, ReadyToBeDeleted) |
                (RunningUnloadHandlers, ReadyToBeDeleted)
        )
    }

    /// Whether the host has started tearing down. Hosts in this range must
    /// not start new navigations, and their owned in-flight navigations
    /// have been discarded.
    pub fn is_pending_deletion(self) -> bool {
        matches!(
            self,
            LifecycleState::RunningUnloadHandlers | LifecycleState::ReadyToBeDeleted
        )
    }

    /// Whether a document has been committed into the host yet.
    pub fn has_committed_document(self) -> bool {
        !matches!(
            self,
            LifecycleState::Speculative | LifecycleState::PendingCommit
        )
    }

    /// The delegate-facing view of this state, or `None` for states that
    /// are never publicly observable.
    pub fn to_public(self) -> Option<PublicLifecycleState> {
        match self {
            LifecycleState::Speculative => None,
            LifecycleState::PendingCommit => Some(PublicLifecycleState::PendingCommit),
            LifecycleState::Active => Some(PublicLifecycleState::Active),
            LifecycleState::Prerendering => Some(PublicLifecycleState::Prerendering),
            LifecycleState::InBackForwardCache => Some(PublicLifecycleState::InBackForwardCache),
            LifecycleState::RunningUnloadHandlers | LifecycleState::ReadyToBeDeleted => {
                Some(PublicLifecycleState::PendingDeletion)
            },
        }
    }
}

/// The observable lifecycle state reported to the delegate. The two
/// teardown states collapse into `PendingDeletion`, and `Speculative`
/// hosts are invisible.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum PublicLifecycleState {
    PendingCommit,
    Active,
    Prerendering,
    InBackForwardCache,
    PendingDeletion,
}
