/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The per-document host entity.
//!
//! A `DocumentHost` represents one (potential) document loaded into one
//! frame slot. It exclusively owns its pending-navigation registries and
//! document-scoped committed state; all lifecycle transitions go through
//! the owning `HostTree`.

use std::time::Instant;

use http::Method;
use log::warn;
use rustc_hash::FxHashMap;
use url::Url;
use uuid::Uuid;

use crate::ids::{
    DocumentHostId, DocumentToken, EmbeddingToken, FrameToken, NavigationId, ProcessId,
    SameDocumentNavigationToken, SiteInstanceId,
};
use crate::inherit::{IsolationInfo, StorageKey};
use crate::lifecycle::LifecycleState;
use crate::navigation::{DiscardReason, NavigationRequest};
use crate::origin::ImmutableOrigin;
use crate::policy::{DocumentPolicy, PermissionsPolicy, PolicyContainer, Referrer};
use crate::timers::TimerHandle;

/// One coalesced beforeunload round-trip. Overlapping triggers (e.g. a
/// cross-site navigation racing a tab close) share the single in-flight
/// request; `proceed` aggregates as AND over all replies.
#[derive(Debug)]
pub struct OutstandingBeforeUnload {
    pub started: Instant,
    /// Renderer replies still outstanding.
    pub pending_replies: u32,
    pub proceed: bool,
    pub timer: Option<TimerHandle>,
}

/// Whether the host is loading, and how loudly the loading UI should say
/// so. Same-document navigations load quietly.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct LoadingState {
    pub quiet: bool,
}

/// Construction parameters for a document host.
pub struct HostInit {
    pub frame_token: FrameToken,
    pub process: ProcessId,
    pub site_instance: SiteInstanceId,
    pub parent: Option<DocumentHostId>,
    /// `Speculative` for provisional frames, `Prerendering` or `Active`
    /// for top-level creation.
    pub initial_state: LifecycleState,
    pub is_mhtml_document: bool,
    pub required_document_policy: DocumentPolicy,
    pub credentialless_nonce: Option<Uuid>,
    pub fenced_frame_nonce: Option<Uuid>,
    pub partitioned_popin_opener: Option<DocumentHostId>,
}

impl HostInit {
    pub fn new(process: ProcessId, initial_state: LifecycleState) -> HostInit {
        HostInit {
            frame_token: FrameToken::new(),
            process,
            site_instance: SiteInstanceId::new(),
            parent: None,
            initial_state,
            is_mhtml_document: false,
            required_document_policy: DocumentPolicy::default(),
            credentialless_nonce: None,
            fenced_frame_nonce: None,
            partitioned_popin_opener: None,
        }
    }
}

/// The host tree's view of one document in one frame slot.
pub struct DocumentHost {
    pub id: DocumentHostId,
    pub frame_token: FrameToken,
    pub process: ProcessId,
    pub site_instance: SiteInstanceId,
    pub(crate) lifecycle: LifecycleState,
    pub parent: Option<DocumentHostId>,
    pub children: Vec<DocumentHostId>,

    /// Regenerated each time a new document is created in this host;
    /// fixed across same-document navigations and page activations.
    pub document_token: DocumentToken,
    pub embedding_token: Option<EmbeddingToken>,

    // Document-scoped state, fully overwritten on each new-document
    // commit.
    pub last_committed_url: Url,
    pub last_committed_origin: ImmutableOrigin,
    pub origin_is_potentially_trustworthy: bool,
    /// The last committed URL that was not an error document. Error
    /// recovery re-attempts from here, not from the error URL.
    pub last_successful_url: Option<Url>,
    pub storage_key: StorageKey,
    pub isolation_info: IsolationInfo,
    pub policy_container: PolicyContainer,
    pub permissions_policy: PermissionsPolicy,
    pub last_http_method: Method,
    pub last_http_status_code: u16,
    pub last_post_id: Option<i64>,
    pub last_committed_referrer: Referrer,
    pub is_error_document: bool,
    pub has_committed_any_navigation: bool,

    // Sticky per-document flags, reported by the renderer after commit.
    pub has_unload_handler: bool,
    pub has_before_unload_handler: bool,
    /// A visible JS dialog is blocking beforeunload; suppresses the
    /// unresponsive-renderer timeout.
    pub modal_dialog_blocking_beforeunload: bool,

    pub is_mhtml_document: bool,
    pub required_document_policy: DocumentPolicy,
    pub credentialless_nonce: Option<Uuid>,
    pub fenced_frame_nonce: Option<Uuid>,
    /// Partitioned popins compute isolation relative to their opener, not
    /// their ancestor chain.
    pub partitioned_popin_opener: Option<DocumentHostId>,
    /// Set when a pending-commit-before-navigation-commit race forces the
    /// next commit to keep the current document token.
    pub reuse_document_token_for_next_commit: bool,

    // Pending-navigation registries. Normally 0 or 1 cross-document
    // entries; more are tolerated under navigation queuing.
    pub(crate) navigation_requests: FxHashMap<NavigationId, NavigationRequest>,
    pub(crate) same_document_navigations:
        FxHashMap<SameDocumentNavigationToken, NavigationRequest>,

    pub(crate) loading: Option<LoadingState>,
    pub(crate) beforeunload: Option<OutstandingBeforeUnload>,
    pub(crate) detach_acked: bool,
    pub(crate) unload_timer: Option<TimerHandle>,
}

impl DocumentHost {
    pub fn new(id: DocumentHostId, init: HostInit) -> DocumentHost {
        let origin = ImmutableOrigin::new_opaque();
        let isolation_info = IsolationInfo::for_top_level(origin.clone());
        let storage_key = StorageKey::compute(&origin, &isolation_info);
        DocumentHost {
            id,
            frame_token: init.frame_token,
            process: init.process,
            site_instance: init.site_instance,
            lifecycle: init.initial_state,
            parent: init.parent,
            children: Vec::new(),
            document_token: DocumentToken::new(),
            embedding_token: None,
            last_committed_url: Url::parse("about:blank")
                .expect("about:blank always parses"),
            last_committed_origin: origin,
            origin_is_potentially_trustworthy: false,
            last_successful_url: None,
            storage_key,
            isolation_info,
            policy_container: PolicyContainer::default(),
            permissions_policy: PermissionsPolicy::default(),
            last_http_method: Method::GET,
            last_http_status_code: 0,
            last_post_id: None,
            last_committed_referrer: Referrer::default(),
            is_error_document: false,
            has_committed_any_navigation: false,
            has_unload_handler: false,
            has_before_unload_handler: false,
            modal_dialog_blocking_beforeunload: false,
            is_mhtml_document: init.is_mhtml_document,
            required_document_policy: init.required_document_policy,
            credentialless_nonce: init.credentialless_nonce,
            fenced_frame_nonce: init.fenced_frame_nonce,
            partitioned_popin_opener: init.partitioned_popin_opener,
            reuse_document_token_for_next_commit: false,
            navigation_requests: FxHashMap::default(),
            same_document_navigations: FxHashMap::default(),
            loading: None,
            beforeunload: None,
            detach_acked: false,
            unload_timer: None,
        }
    }

    pub fn lifecycle_state(&self) -> LifecycleState {
        self.lifecycle
    }

    pub fn is_main_frame(&self) -> bool {
        self.parent.is_none()
    }

    pub fn is_pending_deletion(&self) -> bool {
        self.lifecycle.is_pending_deletion()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.is_some()
    }

    /// Takes ownership of an in-flight navigation, classifying it as
    /// same-document (token-keyed) or cross-document (identity-keyed).
    /// Marks the host as loading; same-document navigations load quietly.
    pub fn set_navigation_request(&mut self, request: NavigationRequest) {
        let quiet = request.is_same_document;
        self.loading = Some(LoadingState { quiet });
        match (request.is_same_document, request.same_document_token) {
            (true, Some(token)) => {
                if let Some(stale) = self.same_document_navigations.insert(token, request) {
                    warn!(
                        "Host {}: same-document navigation token {} reused; dropping stale request {}",
                        self.id, token, stale.id,
                    );
                }
            },
            _ => {
                if let Some(stale) = self.navigation_requests.insert(request.id, request) {
                    warn!(
                        "Host {}: navigation {} stored twice; dropping stale request",
                        self.id, stale.id,
                    );
                }
            },
        }
    }

    /// Tags every owned navigation with `reason` and drops them. The maps
    /// are swapped into locals before entries are destructed: destructor
    /// side effects may re-enter navigation creation on this host.
    pub fn reset_owned_navigation_requests(&mut self, reason: DiscardReason) {
        let mut cross_document = std::mem::take(&mut self.navigation_requests);
        let mut same_document = std::mem::take(&mut self.same_document_navigations);
        for request in cross_document.values_mut().chain(same_document.values_mut()) {
            request.mark_discarded(reason);
        }
    }

    /// The most recently started navigation whose commit instruction is
    /// in flight (sent, not yet acknowledged). Subsystems needing a
    /// config that must match the *about to be current* document ask
    /// this.
    pub fn find_latest_navigation_request_that_is_still_committing(
        &self,
    ) -> Option<&NavigationRequest> {
        self.navigation_requests
            .values()
            .chain(self.same_document_navigations.values())
            .filter(|request| request.is_still_committing())
            .max_by_key(|request| request.started)
    }

    /// Removes a single cross-document entry without a full reset, when a
    /// specific navigation is superseded.
    pub fn navigation_request_cancelled(&mut self, id: NavigationId, reason: DiscardReason) {
        match self.navigation_requests.remove(&id) {
            Some(mut request) => request.mark_discarded(reason),
            None => warn!("Host {}: cancelled navigation {} not found", self.id, id),
        }
    }

    pub(crate) fn take_navigation_request(&mut self, id: NavigationId) -> Option<NavigationRequest> {
        self.navigation_requests.remove(&id)
    }

    pub(crate) fn take_same_document_navigation(
        &mut self,
        token: SameDocumentNavigationToken,
    ) -> Option<NavigationRequest> {
        self.same_document_navigations.remove(&token)
    }

    /// A pending cross-document navigation, by identity.
    pub fn navigation_request(&self, id: NavigationId) -> Option<&NavigationRequest> {
        self.navigation_requests.get(&id)
    }

    pub fn pending_navigation_count(&self) -> usize {
        self.navigation_requests.len() + self.same_document_navigations.len()
    }

    pub(crate) fn add_child(&mut self, child: DocumentHostId) {
        self.children.push(child);
    }

    pub(crate) fn remove_child(&mut self, child: DocumentHostId) {
        match self.children.iter().position(|id| *id == child) {
            Some(index) => {
                self.children.remove(index);
            },
            None => warn!("Host {}: child {} already removed", self.id, child),
        }
    }
}
