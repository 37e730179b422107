/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The browser-side host object for documents, and the protocol that
//! keeps it in sync with untrusted renderers.
//!
//! One [`DocumentHost`] exists per (potential) document in a frame slot;
//! the [`HostTree`] owns them all and drives every state change: the
//! lifecycle state machine, the pending-navigation registries, the
//! commit validation and application pipeline, and graceful teardown
//! with unload handlers and deadlines.
//!
//! Renderers are untrusted. Every commit report is re-validated against
//! browser-side state before anything mutates; a report a well-behaved
//! renderer could never produce terminates the reporting process.

#![deny(unsafe_code)]

mod commit_params;
mod document_host;
mod host_tree;
mod ids;
mod inherit;
mod lifecycle;
mod navigation;
mod origin;
mod policy;
mod registry;
mod timers;
mod traits;
mod unload;
mod validator;
mod verify;

pub use crate::commit_params::{DidCommitParams, PageState, SameDocumentParams};
pub use crate::document_host::{DocumentHost, HostInit, LoadingState, OutstandingBeforeUnload};
pub use crate::host_tree::{HostTree, HostTreeConfig};
pub use crate::ids::{
    DocumentHostId, DocumentToken, EmbeddingToken, FrameToken, NavigationId, ProcessId,
    SameDocumentNavigationToken, SiteInstanceId,
};
pub use crate::inherit::{
    AncestorRelation, IsolationInfo, StorageKey, calculate_http_status_code, calculate_method,
    calculate_post_id, calculate_referrer,
};
pub use crate::lifecycle::{LifecycleState, PublicLifecycleState};
pub use crate::navigation::{
    DiscardReason, ErrorInfo, NavigationRequest, NavigationState, PageActivation, TransitionType,
};
pub use crate::origin::ImmutableOrigin;
pub use crate::policy::{
    CrossOriginEmbedderPolicy, CrossOriginOpenerPolicy, DocumentIsolationPolicy, DocumentPolicy,
    PermissionsPolicy, PolicyContainer, Referrer, ReferrerPolicy, SandboxFlags,
};
pub use crate::registry::HostRegistry;
pub use crate::timers::{TimerEvent, TimerHandle, TimerScheduler};
pub use crate::traits::{
    CanCommitStatus, CommitAccessCheck, EmbedderPolicy, HostDelegate, ProcessLock, RendererProxy,
    SecurityPolicy,
};
pub use crate::validator::{
    BLOCKED_URL, KillReason, RENDERER_DEBUG_SCHEME, ValidationContext, ValidationOutcome,
    blocked_url, can_commit_origin_and_url, is_renderer_debug_url, validate_did_commit_params,
};
pub use crate::verify::{
    CommitMismatch, ExpectedCommit, PriorDocumentState, cross_check, expected_commit,
};
