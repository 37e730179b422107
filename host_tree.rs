/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The tree of document hosts and the commit protocol driven over it.
//!
//! The `HostTree` owns every live `DocumentHost`, keyed by id; parents
//! own children top-down through id lists, and every walk over mutable
//! relations snapshots ids first. All operations run on one sequence:
//! commit application and lifecycle transitions run to completion
//! synchronously, and renderer round-trips are a fire-request /
//! register-deadline / return affair (see `unload.rs`).

use std::time::{Duration, Instant};

use log::{debug, error, warn};
use rustc_hash::FxHashMap;
use url::Url;

use crate::commit_params::{DidCommitParams, SameDocumentParams};
use crate::document_host::{DocumentHost, HostInit, LoadingState};
use crate::ids::{DocumentHostId, DocumentToken, NavigationId, ProcessId, SiteInstanceId};
use crate::inherit::{
    AncestorRelation, IsolationInfo, StorageKey, calculate_http_status_code, calculate_method,
    calculate_post_id, calculate_referrer,
};
use crate::lifecycle::LifecycleState;
use crate::navigation::{DiscardReason, NavigationRequest, NavigationState};
use crate::origin::ImmutableOrigin;
use crate::policy::PermissionsPolicy;
use crate::registry::HostRegistry;
use crate::timers::TimerScheduler;
use crate::traits::{EmbedderPolicy, HostDelegate, RendererProxy, SecurityPolicy};
use crate::validator::{
    KillReason, ValidationContext, ValidationOutcome, validate_did_commit_params,
};
use crate::verify::{PriorDocumentState, cross_check, expected_commit, report_mismatches};

/// Tunables for renderer-cooperation deadlines.
pub struct HostTreeConfig {
    /// How long a beforeunload round-trip may stay unanswered before the
    /// decision is forced to "proceed".
    pub beforeunload_timeout: Duration,
    /// How long unload handlers may run before the detach is forced.
    pub unload_timeout: Duration,
    /// How long to suggest keeping a now-empty renderer process warm.
    pub process_shutdown_grace: Duration,
    /// Whether error documents are isolated into a dedicated process.
    pub error_page_isolation_enabled: bool,
}

impl Default for HostTreeConfig {
    fn default() -> HostTreeConfig {
        HostTreeConfig {
            beforeunload_timeout: Duration::from_secs(5),
            unload_timeout: Duration::from_millis(500),
            process_shutdown_grace: Duration::from_secs(5),
            error_page_isolation_enabled: false,
        }
    }
}

/// The owner of all document hosts and the single entry point for every
/// state transition over them.
pub struct HostTree {
    pub(crate) hosts: FxHashMap<DocumentHostId, DocumentHost>,
    registry: HostRegistry,
    pub(crate) security: Box<dyn SecurityPolicy>,
    pub(crate) embedder: Box<dyn EmbedderPolicy>,
    pub(crate) delegate: Box<dyn HostDelegate>,
    pub(crate) renderer: Box<dyn RendererProxy>,
    pub(crate) timers: TimerScheduler,
    active_document_counts: FxHashMap<SiteInstanceId, usize>,
    hosts_per_process: FxHashMap<ProcessId, usize>,
    pub(crate) config: HostTreeConfig,
}

impl HostTree {
    pub fn new(
        security: Box<dyn SecurityPolicy>,
        embedder: Box<dyn EmbedderPolicy>,
        delegate: Box<dyn HostDelegate>,
        renderer: Box<dyn RendererProxy>,
    ) -> HostTree {
        HostTree::with_config(security, embedder, delegate, renderer, HostTreeConfig::default())
    }

    pub fn with_config(
        security: Box<dyn SecurityPolicy>,
        embedder: Box<dyn EmbedderPolicy>,
        delegate: Box<dyn HostDelegate>,
        renderer: Box<dyn RendererProxy>,
        config: HostTreeConfig,
    ) -> HostTree {
        HostTree {
            hosts: FxHashMap::default(),
            registry: HostRegistry::new(),
            security,
            embedder,
            delegate,
            renderer,
            timers: TimerScheduler::new(),
            active_document_counts: FxHashMap::default(),
            hosts_per_process: FxHashMap::default(),
            config,
        }
    }

    pub fn host(&self, id: DocumentHostId) -> Option<&DocumentHost> {
        self.hosts.get(&id)
    }

    pub fn registry(&self) -> &HostRegistry {
        &self.registry
    }

    /// Live documents currently `Active` in a site instance, for process
    /// reuse decisions.
    pub fn active_document_count(&self, site_instance: SiteInstanceId) -> usize {
        self.active_document_counts
            .get(&site_instance)
            .copied()
            .unwrap_or(0)
    }

    pub fn host_count(&self) -> usize {
        self.hosts.len()
    }

    /// Creates a host and registers its frame token. Children may only be
    /// created under a host with a committed document.
    pub fn create_host(&mut self, init: HostInit) -> DocumentHostId {
        if let Some(parent) = init.parent {
            debug_assert!(
                self.hosts
                    .get(&parent)
                    .is_some_and(|parent| parent.lifecycle.has_committed_document()),
                "children are created only after the parent commits",
            );
        }
        let id = DocumentHostId::new();
        self.registry.insert(init.frame_token, id);
        let host = DocumentHost::new(id, init);
        if host.lifecycle == LifecycleState::Active {
            *self.active_document_counts.entry(host.site_instance).or_insert(0) += 1;
        }
        *self.hosts_per_process.entry(host.process).or_insert(0) += 1;
        if let Some(parent) = host.parent {
            if let Some(parent) = self.hosts.get_mut(&parent) {
                parent.add_child(id);
            }
        }
        debug!("Created document host {} in state {:?}", id, host.lifecycle);
        self.hosts.insert(id, host);
        id
    }

    /// Validates and applies a lifecycle transition. Illegal transitions
    /// are rejected (and assert in debug builds), never coerced.
    pub fn set_lifecycle_state(&mut self, id: DocumentHostId, new_state: LifecycleState) {
        let Some(host) = self.hosts.get_mut(&id) else {
            warn!("Lifecycle change for unknown host {id}. Ignoring.");
            return;
        };
        let old_state = host.lifecycle;
        if old_state == new_state {
            return;
        }
        if !old_state.can_transition_to(new_state) {
            debug_assert!(
                false,
                "illegal lifecycle transition {old_state:?} -> {new_state:?} for host {id}",
            );
            error!(
                "Rejecting illegal lifecycle transition {:?} -> {:?} for host {}",
                old_state, new_state, id,
            );
            return;
        }
        host.lifecycle = new_state;
        let site_instance = host.site_instance;
        let children = host.children.clone();
        debug!("Host {}: {:?} -> {:?}", id, old_state, new_state);

        if old_state == LifecycleState::Active {
            let count = self.active_document_counts.entry(site_instance).or_insert(0);
            *count = count.saturating_sub(1);
        }
        if new_state == LifecycleState::Active {
            *self.active_document_counts.entry(site_instance).or_insert(0) += 1;
        }

        // Documents in a subtree leave the cache / prerendering only
        // atomically with their outer document.
        if new_state == LifecycleState::Active &&
            matches!(
                old_state,
                LifecycleState::InBackForwardCache | LifecycleState::Prerendering
            )
        {
            for child in children {
                if self.hosts.contains_key(&child) {
                    self.set_lifecycle_state(child, LifecycleState::Active);
                }
            }
        }

        // Transitions into/out of Speculative are never publicly
        // observable; the two teardown states share one public state.
        if let (Some(old_public), Some(new_public)) = (old_state.to_public(), new_state.to_public())
        {
            if old_public != new_public {
                self.delegate.lifecycle_state_changed(id, old_public, new_public);
            }
        }

        if new_state == LifecycleState::ReadyToBeDeleted {
            self.maybe_delete(id);
        }
    }

    /// Freezes an active subtree into the back-forward cache, outer
    /// document first.
    pub fn enter_back_forward_cache(&mut self, id: DocumentHostId) {
        let Some(host) = self.hosts.get(&id) else {
            warn!("Back-forward cache entry for unknown host {id}. Ignoring.");
            return;
        };
        if host.lifecycle != LifecycleState::Active {
            warn!(
                "Host {} cannot enter the back-forward cache from {:?}",
                id, host.lifecycle,
            );
            return;
        }
        let children = host.children.clone();
        self.set_lifecycle_state(id, LifecycleState::InBackForwardCache);
        for child in children {
            if self.hosts.contains_key(&child) {
                self.enter_back_forward_cache(child);
            }
        }
    }

    /// Reactivates a cached or prerendering subtree without a commit
    /// (history traversal drives the session-history side separately).
    pub fn activate(&mut self, id: DocumentHostId) {
        self.set_lifecycle_state(id, LifecycleState::Active);
    }

    /// Hands an in-flight navigation to its host. Hosts that are pending
    /// deletion must not start navigations.
    pub fn set_navigation_request(&mut self, id: DocumentHostId, mut request: NavigationRequest) {
        let Some(host) = self.hosts.get_mut(&id) else {
            warn!("Navigation {} for unknown host {}. Dropping.", request.id, id);
            return;
        };
        if host.is_pending_deletion() {
            warn!(
                "Host {} is pending deletion; dropping navigation {}",
                id, request.id,
            );
            request.mark_discarded(DiscardReason::InternalCancellation);
            return;
        }
        host.set_navigation_request(request);
    }

    /// Discards every navigation the host owns. The caller picks the
    /// reason (crash vs. frame removal vs. internal cancellation);
    /// metrics downstream depend on it.
    pub fn reset_owned_navigation_requests(&mut self, id: DocumentHostId, reason: DiscardReason) {
        let Some(host) = self.hosts.get_mut(&id) else {
            warn!("Navigation reset for unknown host {id}. Ignoring.");
            return;
        };
        host.reset_owned_navigation_requests(reason);
        self.update_loading_state(id);
    }

    /// Removes one cross-document navigation that was superseded.
    pub fn navigation_request_cancelled(
        &mut self,
        id: DocumentHostId,
        navigation: NavigationId,
        reason: DiscardReason,
    ) {
        let Some(host) = self.hosts.get_mut(&id) else {
            warn!("Navigation cancel for unknown host {id}. Ignoring.");
            return;
        };
        host.navigation_request_cancelled(navigation, reason);
        self.update_loading_state(id);
    }

    /// Sends the commit instruction for an owned navigation. The loader
    /// layer has supplied its opaque payloads out of band by now.
    pub fn begin_commit(&mut self, id: DocumentHostId, navigation: NavigationId) {
        let Some(host) = self.hosts.get_mut(&id) else {
            warn!("begin_commit for unknown host {id}. Ignoring.");
            return;
        };
        if host.is_pending_deletion() {
            warn!("Host {id} is pending deletion; not committing navigation {navigation}");
            return;
        }
        let request = host
            .navigation_requests
            .get_mut(&navigation)
            .or_else(|| {
                host.same_document_navigations
                    .values_mut()
                    .find(|request| request.id == navigation)
            });
        let Some(request) = request else {
            warn!("begin_commit for unowned navigation {navigation} on host {id}");
            return;
        };
        request.state = NavigationState::ReadyToCommit;
        if host.lifecycle == LifecycleState::Speculative {
            self.set_lifecycle_state(id, LifecycleState::PendingCommit);
        }
        self.renderer.begin_commit(id, navigation);
    }

    /// Records that a navigation failed to load; the renderer will still
    /// report a commit, for the error document.
    pub fn failed_navigation(
        &mut self,
        id: DocumentHostId,
        navigation: NavigationId,
        error: crate::navigation::ErrorInfo,
    ) {
        let Some(host) = self.hosts.get_mut(&id) else {
            warn!("failed_navigation for unknown host {id}. Ignoring.");
            return;
        };
        let Some(request) = host.navigation_requests.get_mut(&navigation) else {
            warn!("failed_navigation for unowned navigation {navigation} on host {id}");
            return;
        };
        request.is_error_document = true;
        request.error = Some(error);
        request.response_status = None;
        // Error documents commit with an opaque origin derived from the
        // URL they failed to reach.
        let precursor = ImmutableOrigin::of_url(&request.url);
        request.origin_to_commit = Some(ImmutableOrigin::new_opaque_with_precursor(&precursor));
        request.origin_is_potentially_trustworthy = false;
    }

    /// The renderer reports a cross-document commit. Returns whether the
    /// commit was accepted and applied.
    pub fn did_commit_navigation(
        &mut self,
        id: DocumentHostId,
        navigation: NavigationId,
        params: DidCommitParams,
    ) -> bool {
        let Some(host) = self.hosts.get(&id) else {
            warn!("Commit reported for unknown host {id}. Dropping.");
            return false;
        };
        if host.is_pending_deletion() {
            warn!("Commit reported for host {id} pending deletion. Dropping.");
            return false;
        }
        let process = host.process;
        let request = match self
            .hosts
            .get_mut(&id)
            .and_then(|host| host.take_navigation_request(navigation))
        {
            Some(mut request) => {
                debug_assert!(!request.is_same_document);
                request.is_same_document = false;
                request
            },
            None => {
                let Some(host) = self.hosts.get(&id) else {
                    return false;
                };
                // The synchronous initial about:blank commit that
                // accompanies frame creation has no pending entry; any
                // other unmatched commit is a violation.
                if !host.has_committed_any_navigation && params.url.as_str() == "about:blank" {
                    Self::synthesize_initial_commit(&params)
                } else {
                    error!(
                        "Host {}: commit for unknown navigation {}; killing process {}",
                        id, navigation, process,
                    );
                    self.security
                        .kill_renderer(process, KillReason::NoMatchingNavigation);
                    return false;
                }
            },
        };
        self.commit_internal(id, request, params)
    }

    /// The renderer reports a same-document commit. Purely
    /// renderer-initiated navigations (fragment clicks, history API) have
    /// no pending entry and a record is synthesized for them.
    pub fn did_commit_same_document_navigation(
        &mut self,
        id: DocumentHostId,
        params: DidCommitParams,
        same_document: SameDocumentParams,
    ) -> bool {
        let Some(host) = self.hosts.get(&id) else {
            warn!("Same-document commit for unknown host {id}. Dropping.");
            return false;
        };
        if host.is_pending_deletion() {
            warn!("Same-document commit for host {id} pending deletion. Dropping.");
            return false;
        }
        let request = match same_document.navigation_token {
            Some(token) => {
                match self
                    .hosts
                    .get_mut(&id)
                    .and_then(|host| host.take_same_document_navigation(token))
                {
                    Some(request) => request,
                    None => {
                        // Stale token: the navigation was discarded while
                        // the report was in flight. Benign race.
                        warn!(
                            "Host {id}: same-document commit for unowned token {token}. Dropping.",
                        );
                        return false;
                    },
                }
            },
            None => {
                let Some(host) = self.hosts.get(&id) else {
                    return false;
                };
                Self::synthesize_same_document(host, &params, &same_document)
            },
        };
        self.commit_internal(id, request, params)
    }

    /// Shared commit path: validate, cross-check, apply, notify.
    fn commit_internal(
        &mut self,
        id: DocumentHostId,
        mut request: NavigationRequest,
        mut params: DidCommitParams,
    ) -> bool {
        let Some(host) = self.hosts.get(&id) else {
            return false;
        };
        let process = host.process;

        let outcome = {
            let main_frame_id = self.main_frame_of(id);
            let Some(host) = self.hosts.get(&id) else {
                return false;
            };
            let Some(main_frame) = self.hosts.get(&main_frame_id) else {
                return false;
            };
            let context = ValidationContext {
                process,
                process_lock: self.security.process_lock(process),
                lifecycle: host.lifecycle,
                is_main_frame: host.is_main_frame(),
                is_mhtml_document: main_frame.is_mhtml_document,
                main_frame_process: main_frame.process,
                current_url: &host.last_committed_url,
                current_origin: &host.last_committed_origin,
                main_frame_origin: main_frame.last_committed_origin.clone(),
                current_embedding_token: host.embedding_token,
                required_document_policy: &host.required_document_policy,
                sandbox_flags: request.policy_to_commit.sandbox_flags,
                storage_partition: host.storage_key.top_level_site.clone(),
                partition_nonce: host.credentialless_nonce.or(host.fenced_frame_nonce),
                error_page_isolation_enabled: self.config.error_page_isolation_enabled,
                has_pending_post_commit_error_entry: self
                    .delegate
                    .has_pending_post_commit_error_entry(id),
                main_frame_origin_for_entry: if params.nav_entry_id != 0 {
                    self.delegate.main_frame_origin_for_entry(params.nav_entry_id)
                } else {
                    None
                },
            };
            validate_did_commit_params(
                &context,
                &*self.security,
                &*self.embedder,
                &request,
                &mut params,
            )
        };

        match outcome {
            ValidationOutcome::Allow => {},
            ValidationOutcome::Block => {
                warn!("Host {id}: commit blocked; dropping without mutation");
                request.mark_discarded(DiscardReason::InternalCancellation);
                return false;
            },
            ValidationOutcome::Kill(reason) => {
                error!(
                    "Host {}: commit validation failed ({:?}); killing process {}",
                    id, reason, process,
                );
                request.mark_discarded(DiscardReason::InternalCancellation);
                self.security.kill_renderer(process, reason);
                return false;
            },
        }

        self.security.grant_commit_url(process, &params.url);

        // Recompute every derivable field from trusted state and compare
        // with the report. Catches derivation bugs, never aborts the
        // commit.
        let (prior_method, prior_post_id, prior_status, prior_referrer) = {
            let Some(host) = self.hosts.get(&id) else {
                return false;
            };
            (
                host.last_http_method.clone(),
                host.last_post_id,
                host.last_http_status_code,
                host.last_committed_referrer.clone(),
            )
        };
        let expected = expected_commit(
            &request,
            &PriorDocumentState {
                method: &prior_method,
                post_id: prior_post_id,
                status_code: prior_status,
                referrer: &prior_referrer,
            },
        );
        report_mismatches(id, process, &cross_check(&expected, &params));

        let is_same_document = request.is_same_document;
        let is_activation = request.is_page_activation();
        let new_document = !is_same_document && !is_activation;

        let isolation = self.compute_isolation_info(id, &params.origin);
        let parent_permissions = self
            .hosts
            .get(&id)
            .and_then(|host| host.parent)
            .and_then(|parent| self.hosts.get(&parent))
            .map(|parent| parent.permissions_policy.clone());
        let parent_prerendering = self
            .hosts
            .get(&id)
            .and_then(|host| host.parent)
            .and_then(|parent| self.hosts.get(&parent))
            .is_some_and(|parent| parent.lifecycle == LifecycleState::Prerendering);

        let method = calculate_method(&request, &prior_method);
        let post_id = calculate_post_id(&request, prior_post_id);
        let status_code = calculate_http_status_code(&request, prior_status);
        let referrer = calculate_referrer(&request, &prior_referrer);

        let mut beforeunload_timer = None;
        {
            let Some(host) = self.hosts.get_mut(&id) else {
                return false;
            };
            request.state = NavigationState::DidCommit;

            host.last_committed_url = params.url.clone();
            host.last_committed_origin = params.origin.clone();
            host.origin_is_potentially_trustworthy = request.origin_is_potentially_trustworthy;
            host.isolation_info = isolation;

            if new_document {
                // Fresh document token, unless a pending-commit race
                // already pinned one for this commit.
                if host.reuse_document_token_for_next_commit {
                    host.reuse_document_token_for_next_commit = false;
                } else {
                    host.document_token = DocumentToken::new();
                }
                host.has_unload_handler = false;
                host.has_before_unload_handler = false;
                host.modal_dialog_blocking_beforeunload = false;
                host.permissions_policy = PermissionsPolicy::for_new_document(
                    parent_permissions.as_ref(),
                    request.permissions_policy_header.clone(),
                );
                host.storage_key = StorageKey::compute(&params.origin, &host.isolation_info);
                host.policy_container = std::mem::take(&mut request.policy_to_commit);
                host.embedding_token = params.embedding_token;
                host.is_error_document = request.is_error_document;
            }

            host.last_http_method = method;
            host.last_post_id = post_id;
            host.last_http_status_code = status_code;
            host.last_committed_referrer = referrer;

            // The "last good URL" stays distinct from the displayed URL:
            // error recovery re-attempts from here.
            if !request.is_error_document {
                host.last_successful_url = Some(params.url.clone());
            }
            host.has_committed_any_navigation = true;

            // A successful commit resolves any outstanding beforeunload
            // race.
            if let Some(outstanding) = host.beforeunload.take() {
                beforeunload_timer = outstanding.timer;
            }
        }
        if let Some(timer) = beforeunload_timer {
            self.timers.cancel(timer);
        }

        let lifecycle = match self.hosts.get(&id) {
            Some(host) => host.lifecycle,
            None => return false,
        };
        match lifecycle {
            LifecycleState::PendingCommit => {
                let target = if parent_prerendering {
                    LifecycleState::Prerendering
                } else {
                    LifecycleState::Active
                };
                self.set_lifecycle_state(id, target);
            },
            LifecycleState::Prerendering | LifecycleState::InBackForwardCache if is_activation => {
                self.set_lifecycle_state(id, LifecycleState::Active);
            },
            _ => {},
        }

        self.update_loading_state(id);
        self.delegate.did_navigate(id, request, &params);

        if new_document {
            let replication = self.hosts.get(&id).map(|host| {
                (
                    host.policy_container.sandbox_flags,
                    host.permissions_policy.clone(),
                )
            });
            if let Some((sandbox_flags, permissions_policy)) = replication {
                self.renderer
                    .update_frame_replication(id, sandbox_flags, &permissions_policy);
            }
        }
        true
    }

    /// The renderer reports which teardown handlers the document
    /// registered. Sticky until the next document commits.
    pub fn set_unload_handlers(
        &mut self,
        id: DocumentHostId,
        has_before_unload_handler: bool,
        has_unload_handler: bool,
    ) {
        let Some(host) = self.hosts.get_mut(&id) else {
            warn!("Unload handler report for unknown host {id}. Ignoring.");
            return;
        };
        host.has_before_unload_handler = has_before_unload_handler;
        host.has_unload_handler = has_unload_handler;
    }

    /// A visible JS dialog is (or stops) blocking beforeunload; while
    /// set, the unresponsive-renderer timeout is suppressed.
    pub fn set_modal_dialog_blocking_beforeunload(&mut self, id: DocumentHostId, blocking: bool) {
        if let Some(host) = self.hosts.get_mut(&id) {
            host.modal_dialog_blocking_beforeunload = blocking;
        }
    }

    /// Forces the next commit to keep the current document token
    /// (pending-commit-before-navigation-commit race).
    pub fn force_document_token_reuse(&mut self, id: DocumentHostId) {
        if let Some(host) = self.hosts.get_mut(&id) {
            host.reuse_document_token_for_next_commit = true;
        }
    }

    pub(crate) fn main_frame_of(&self, id: DocumentHostId) -> DocumentHostId {
        let mut current = id;
        while let Some(parent) = self.hosts.get(&current).and_then(|host| host.parent) {
            current = parent;
        }
        current
    }

    /// Walks the ancestor chain accumulating the most restrictive
    /// relation and intersecting site-for-cookies candidates.
    /// Partitioned popins compute relative to their opener; explicit
    /// partition nonces (credentialless / fenced frames) take priority
    /// over anything derived from the walk.
    pub(crate) fn compute_isolation_info(
        &self,
        id: DocumentHostId,
        origin: &ImmutableOrigin,
    ) -> IsolationInfo {
        let Some(host) = self.hosts.get(&id) else {
            return IsolationInfo::for_top_level(origin.clone());
        };
        let mut nonce = host.credentialless_nonce.or(host.fenced_frame_nonce);

        if let Some(opener_id) = host.partitioned_popin_opener {
            if let Some(opener) = self.hosts.get(&opener_id) {
                let top_frame_origin = opener.isolation_info.top_frame_origin.clone();
                let relation = AncestorRelation::between(origin, &top_frame_origin)
                    .most_restrictive(opener.isolation_info.ancestor_relation);
                let site_for_cookies = if relation == AncestorRelation::CrossSite {
                    None
                } else {
                    opener.isolation_info.site_for_cookies.clone()
                };
                return IsolationInfo {
                    top_frame_origin,
                    frame_origin: origin.clone(),
                    site_for_cookies,
                    ancestor_relation: relation,
                    nonce,
                };
            }
            warn!("Host {}: popin opener {} is gone", id, opener_id);
        }

        let mut relation = AncestorRelation::SameOrigin;
        let mut site_for_cookies = origin.schemeful_site();
        let mut top_frame_origin = origin.clone();
        let mut cursor = host.parent;
        while let Some(ancestor_id) = cursor {
            let Some(ancestor) = self.hosts.get(&ancestor_id) else {
                warn!("Host {}: ancestor {} iterated after closure", id, ancestor_id);
                break;
            };
            let ancestor_origin = ancestor.last_committed_origin.clone();
            relation =
                relation.most_restrictive(AncestorRelation::between(origin, &ancestor_origin));
            site_for_cookies = match (site_for_cookies, ancestor_origin.schemeful_site()) {
                (Some(site), Some(ancestor_site)) if site == ancestor_site => Some(site),
                _ => None,
            };
            if nonce.is_none() {
                nonce = ancestor.credentialless_nonce.or(ancestor.fenced_frame_nonce);
            }
            top_frame_origin = ancestor_origin;
            cursor = ancestor.parent;
        }
        IsolationInfo {
            top_frame_origin,
            frame_origin: origin.clone(),
            site_for_cookies,
            ancestor_relation: relation,
            nonce,
        }
    }

    /// Clears the loading flag once no navigation is in flight and tells
    /// the delegate loading stopped.
    pub(crate) fn update_loading_state(&mut self, id: DocumentHostId) {
        let stopped = {
            let Some(host) = self.hosts.get_mut(&id) else {
                return;
            };
            if host.loading.is_some() && host.pending_navigation_count() == 0 {
                host.loading = None;
                true
            } else {
                false
            }
        };
        if stopped {
            self.delegate.did_stop_loading(id);
        }
    }

    pub fn loading_state(&self, id: DocumentHostId) -> Option<LoadingState> {
        self.hosts.get(&id).and_then(|host| host.loading)
    }

    fn synthesize_initial_commit(params: &DidCommitParams) -> NavigationRequest {
        let url = Url::parse("about:blank").expect("about:blank always parses");
        let mut request = NavigationRequest::new(NavigationId::new(), url);
        request.is_synthetic = true;
        request.state = NavigationState::ReadyToCommit;
        request.should_update_history = params.should_update_history;
        request
    }

    fn synthesize_same_document(
        host: &DocumentHost,
        params: &DidCommitParams,
        same_document: &SameDocumentParams,
    ) -> NavigationRequest {
        let mut request = NavigationRequest::new(NavigationId::new(), params.url.clone());
        request.is_same_document = true;
        request.is_synthetic = true;
        request.is_history_api = same_document.is_history_api;
        request.state = NavigationState::ReadyToCommit;
        request.origin_to_commit = Some(host.last_committed_origin.clone());
        request.origin_is_potentially_trustworthy = host.origin_is_potentially_trustworthy;
        request.method = host.last_http_method.clone();
        request.post_id = host.last_post_id;
        request.sanitized_referrer = host.last_committed_referrer.clone();
        request.transition = params.transition;
        request.should_update_history = params.should_update_history;
        request.history_list_was_cleared = false;
        request
    }

    pub(crate) fn note_host_removed_from_process(&mut self, process: ProcessId) {
        let remaining = {
            let count = self.hosts_per_process.entry(process).or_insert(0);
            *count = count.saturating_sub(1);
            *count
        };
        if remaining == 0 {
            self.hosts_per_process.remove(&process);
            let grace = self.config.process_shutdown_grace;
            self.delegate.process_has_no_hosts(process, grace);
        }
    }

    pub(crate) fn note_active_host_destroyed(&mut self, site_instance: SiteInstanceId) {
        let count = self.active_document_counts.entry(site_instance).or_insert(0);
        *count = count.saturating_sub(1);
    }

    pub(crate) fn now(&self) -> Instant {
        Instant::now()
    }
}
