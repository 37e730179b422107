/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Seams to the host tree's collaborators.
//!
//! Everything the core talks to sits behind one of these traits: the
//! site-isolation policy engine, the embedder, the delegate/observer
//! layer, and the renderer itself. The real implementations live
//! elsewhere; tests drive the core with mocks.

use std::time::Duration;

use url::Url;
use uuid::Uuid;

use crate::commit_params::DidCommitParams;
use crate::ids::{DocumentHostId, NavigationId, ProcessId};
use crate::lifecycle::PublicLifecycleState;
use crate::navigation::NavigationRequest;
use crate::origin::ImmutableOrigin;
use crate::policy::{PermissionsPolicy, SandboxFlags};
use crate::validator::KillReason;

/// What a renderer process is allowed to commit.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ProcessLock {
    /// The process may commit documents from any site.
    Unlocked,
    /// The process may only commit documents from the given schemeful
    /// site.
    LockedToSite(String),
    /// The process is reserved for error documents.
    ErrorPage,
}

impl ProcessLock {
    pub fn is_locked_to_site(&self) -> bool {
        matches!(*self, ProcessLock::LockedToSite(_))
    }
}

/// The outcome of asking the security-policy singleton whether a process
/// may commit an (origin, url) pair.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CanCommitStatus {
    CanCommitOriginAndUrl,
    CannotCommitUrl,
    CannotCommitOrigin,
}

/// The full tuple the security policy judges at commit time.
pub struct CommitAccessCheck<'a> {
    pub process: ProcessId,
    pub origin: &'a ImmutableOrigin,
    pub url: &'a Url,
    /// The storage partition the document would commit into.
    pub storage_partition: Option<String>,
    pub sandbox_flags: SandboxFlags,
    /// Partition nonce, for credentialless/fenced documents.
    pub partition_nonce: Option<Uuid>,
}

/// The process/site-isolation security-policy singleton.
pub trait SecurityPolicy {
    fn process_lock(&self, process: ProcessId) -> ProcessLock;

    fn can_commit_origin_and_url(&self, check: &CommitAccessCheck) -> CanCommitStatus;

    /// The global switch that turns off web security (testing only).
    fn is_web_security_disabled(&self) -> bool {
        false
    }

    /// Whether file-origin pages in this process may access arbitrary
    /// files (a per-profile preference).
    fn allows_universal_file_access(&self, _process: ProcessId) -> bool {
        false
    }

    fn can_read_file(&self, process: ProcessId, path: &str) -> bool;

    /// Rewrites URLs the process may not request to the blocked sentinel.
    fn filter_url(&self, process: ProcessId, url: &Url) -> Url;

    /// Records that the process has legitimately committed this URL.
    fn grant_commit_url(&mut self, process: ProcessId, url: &Url);

    /// Terminates the renderer process. Invoked at most once per dropped
    /// commit, with a reason code for crash triage.
    fn kill_renderer(&mut self, process: ProcessId, reason: KillReason);
}

/// Embedder-level navigation policy: may veto arbitrary URLs.
pub trait EmbedderPolicy {
    fn should_block_url(&self, _url: &Url) -> bool {
        false
    }
}

/// The navigation driver / observer layer above the host tree.
pub trait HostDelegate {
    /// Lifecycle change with old and new public-facing states. Never
    /// called for transitions into or out of `Speculative`.
    fn lifecycle_state_changed(
        &mut self,
        host: DocumentHostId,
        old_state: PublicLifecycleState,
        new_state: PublicLifecycleState,
    );

    /// A validated commit has been applied; the navigation object is
    /// handed over for session-history bookkeeping and final cleanup.
    fn did_navigate(
        &mut self,
        host: DocumentHostId,
        request: NavigationRequest,
        params: &DidCommitParams,
    );

    fn did_stop_loading(&mut self, host: DocumentHostId);

    /// The coalesced beforeunload round-trip finished, by renderer reply
    /// or by timeout.
    fn beforeunload_completed(&mut self, host: DocumentHostId, proceed: bool);

    fn host_destroyed(&mut self, host: DocumentHostId);

    /// The last host of `process` is gone. The embedder may keep the
    /// process warm for `suggested_grace` if it expects reuse.
    fn process_has_no_hosts(&mut self, process: ProcessId, suggested_grace: Duration);

    /// The main-frame origin implied by a session history entry, for
    /// cross-checking subframe history commits.
    fn main_frame_origin_for_entry(&self, _entry_id: u64) -> Option<ImmutableOrigin> {
        None
    }

    /// Whether the navigation controller has an uncommitted post-commit
    /// error entry for this host's frame tree.
    fn has_pending_post_commit_error_entry(&self, _host: DocumentHostId) -> bool {
        false
    }
}

/// Outbound instructions to the renderer. Payloads (response head/body,
/// loader factories, policy containers) are opaque to this crate and
/// travel out of band.
pub trait RendererProxy {
    fn begin_commit(&mut self, host: DocumentHostId, navigation: NavigationId);

    fn dispatch_beforeunload(&mut self, host: DocumentHostId);

    fn dispatch_unload(&mut self, host: DocumentHostId);

    /// Refreshes the replicated frame state cached by proxies in other
    /// processes after a cross-document commit.
    fn update_frame_replication(
        &mut self,
        host: DocumentHostId,
        sandbox_flags: SandboxFlags,
        permissions_policy: &PermissionsPolicy,
    );
}
