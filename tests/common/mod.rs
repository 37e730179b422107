/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Shared mocks and builders for host-tree integration tests.

// Each test binary uses a different subset of these helpers.
#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use document_host::{
    CanCommitStatus, CommitAccessCheck, DidCommitParams, DocumentHostId, EmbedderPolicy,
    EmbeddingToken, HostDelegate, HostInit, HostTree, HostTreeConfig, ImmutableOrigin, KillReason,
    LifecycleState, NavigationId, NavigationRequest, ProcessId, ProcessLock, PublicLifecycleState,
    RendererProxy, SandboxFlags, SecurityPolicy, blocked_url,
};
use url::Url;

pub fn url(input: &str) -> Url {
    Url::parse(input).expect("test URL parses")
}

pub fn origin(input: &str) -> ImmutableOrigin {
    ImmutableOrigin::of_url(&url(input))
}

#[derive(Default)]
pub struct SecurityLog {
    pub kills: Vec<(ProcessId, KillReason)>,
    pub granted_urls: Vec<(ProcessId, Url)>,
}

/// A security policy with per-test deny lists. Everything not listed is
/// allowed.
pub struct TestSecurityPolicy {
    pub log: Rc<RefCell<SecurityLog>>,
    pub locks: HashMap<ProcessId, ProcessLock>,
    pub denied_origins: Vec<ImmutableOrigin>,
    pub denied_urls: Vec<Url>,
    pub filtered_urls: Vec<Url>,
    pub unreadable_files: Vec<String>,
    pub web_security_disabled: bool,
    pub universal_file_access: bool,
}

impl TestSecurityPolicy {
    pub fn new(log: Rc<RefCell<SecurityLog>>) -> TestSecurityPolicy {
        TestSecurityPolicy {
            log,
            locks: HashMap::new(),
            denied_origins: Vec::new(),
            denied_urls: Vec::new(),
            filtered_urls: Vec::new(),
            unreadable_files: Vec::new(),
            web_security_disabled: false,
            universal_file_access: false,
        }
    }
}

impl SecurityPolicy for TestSecurityPolicy {
    fn process_lock(&self, process: ProcessId) -> ProcessLock {
        self.locks
            .get(&process)
            .cloned()
            .unwrap_or(ProcessLock::Unlocked)
    }

    fn can_commit_origin_and_url(&self, check: &CommitAccessCheck) -> CanCommitStatus {
        if self.denied_urls.contains(check.url) {
            return CanCommitStatus::CannotCommitUrl;
        }
        if self.denied_origins.contains(check.origin) {
            return CanCommitStatus::CannotCommitOrigin;
        }
        CanCommitStatus::CanCommitOriginAndUrl
    }

    fn is_web_security_disabled(&self) -> bool {
        self.web_security_disabled
    }

    fn allows_universal_file_access(&self, _process: ProcessId) -> bool {
        self.universal_file_access
    }

    fn can_read_file(&self, _process: ProcessId, path: &str) -> bool {
        !self.unreadable_files.iter().any(|file| file == path)
    }

    fn filter_url(&self, _process: ProcessId, url: &Url) -> Url {
        if self.filtered_urls.contains(url) {
            blocked_url()
        } else {
            url.clone()
        }
    }

    fn grant_commit_url(&mut self, process: ProcessId, url: &Url) {
        self.log.borrow_mut().granted_urls.push((process, url.clone()));
    }

    fn kill_renderer(&mut self, process: ProcessId, reason: KillReason) {
        self.log.borrow_mut().kills.push((process, reason));
    }
}

pub struct TestEmbedderPolicy {
    pub blocked_urls: Vec<Url>,
}

impl EmbedderPolicy for TestEmbedderPolicy {
    fn should_block_url(&self, url: &Url) -> bool {
        self.blocked_urls.contains(url)
    }
}

#[derive(Default)]
pub struct DelegateLog {
    pub lifecycle_changes: Vec<(DocumentHostId, PublicLifecycleState, PublicLifecycleState)>,
    /// (host, committed url, is_same_document, is_synthetic)
    pub navigations: Vec<(DocumentHostId, Url, bool, bool)>,
    pub stopped_loading: Vec<DocumentHostId>,
    pub beforeunload_completions: Vec<(DocumentHostId, bool)>,
    pub destroyed: Vec<DocumentHostId>,
    pub empty_processes: Vec<(ProcessId, Duration)>,
    /// Hosts whose frame tree has an uncommitted post-commit error entry.
    pub pending_post_commit_error_entries: Vec<DocumentHostId>,
    /// Session history entry id to the main-frame origin it implies.
    pub entry_origins: HashMap<u64, ImmutableOrigin>,
}

pub struct TestDelegate {
    pub log: Rc<RefCell<DelegateLog>>,
}

impl HostDelegate for TestDelegate {
    fn lifecycle_state_changed(
        &mut self,
        host: DocumentHostId,
        old_state: PublicLifecycleState,
        new_state: PublicLifecycleState,
    ) {
        self.log
            .borrow_mut()
            .lifecycle_changes
            .push((host, old_state, new_state));
    }

    fn did_navigate(
        &mut self,
        host: DocumentHostId,
        request: NavigationRequest,
        params: &DidCommitParams,
    ) {
        self.log.borrow_mut().navigations.push((
            host,
            params.url.clone(),
            request.is_same_document,
            request.is_synthetic,
        ));
    }

    fn did_stop_loading(&mut self, host: DocumentHostId) {
        self.log.borrow_mut().stopped_loading.push(host);
    }

    fn beforeunload_completed(&mut self, host: DocumentHostId, proceed: bool) {
        self.log
            .borrow_mut()
            .beforeunload_completions
            .push((host, proceed));
    }

    fn host_destroyed(&mut self, host: DocumentHostId) {
        self.log.borrow_mut().destroyed.push(host);
    }

    fn process_has_no_hosts(&mut self, process: ProcessId, suggested_grace: Duration) {
        self.log
            .borrow_mut()
            .empty_processes
            .push((process, suggested_grace));
    }

    fn main_frame_origin_for_entry(&self, entry_id: u64) -> Option<ImmutableOrigin> {
        self.log.borrow().entry_origins.get(&entry_id).cloned()
    }

    fn has_pending_post_commit_error_entry(&self, host: DocumentHostId) -> bool {
        self.log
            .borrow()
            .pending_post_commit_error_entries
            .contains(&host)
    }
}

#[derive(Default)]
pub struct RendererLog {
    pub begin_commits: Vec<(DocumentHostId, NavigationId)>,
    pub beforeunload_dispatches: Vec<DocumentHostId>,
    pub unload_dispatches: Vec<DocumentHostId>,
    pub replications: Vec<(DocumentHostId, SandboxFlags)>,
}

pub struct TestRenderer {
    pub log: Rc<RefCell<RendererLog>>,
}

impl RendererProxy for TestRenderer {
    fn begin_commit(&mut self, host: DocumentHostId, navigation: NavigationId) {
        self.log.borrow_mut().begin_commits.push((host, navigation));
    }

    fn dispatch_beforeunload(&mut self, host: DocumentHostId) {
        self.log.borrow_mut().beforeunload_dispatches.push(host);
    }

    fn dispatch_unload(&mut self, host: DocumentHostId) {
        self.log.borrow_mut().unload_dispatches.push(host);
    }

    fn update_frame_replication(
        &mut self,
        host: DocumentHostId,
        sandbox_flags: SandboxFlags,
        _permissions_policy: &document_host::PermissionsPolicy,
    ) {
        self.log.borrow_mut().replications.push((host, sandbox_flags));
    }
}

/// A host tree wired to recording mocks, plus handles to their logs.
pub struct Harness {
    pub tree: HostTree,
    pub security: Rc<RefCell<SecurityLog>>,
    pub delegate: Rc<RefCell<DelegateLog>>,
    pub renderer: Rc<RefCell<RendererLog>>,
}

pub fn harness() -> Harness {
    let security_log = Rc::new(RefCell::new(SecurityLog::default()));
    harness_with_security(TestSecurityPolicy::new(security_log))
}

pub fn harness_with_security(security: TestSecurityPolicy) -> Harness {
    harness_with(security, TestEmbedderPolicy { blocked_urls: Vec::new() })
}

pub fn harness_with(security: TestSecurityPolicy, embedder: TestEmbedderPolicy) -> Harness {
    let security_log = security.log.clone();
    let delegate_log = Rc::new(RefCell::new(DelegateLog::default()));
    let renderer_log = Rc::new(RefCell::new(RendererLog::default()));
    let tree = HostTree::new(
        Box::new(security),
        Box::new(embedder),
        Box::new(TestDelegate { log: delegate_log.clone() }),
        Box::new(TestRenderer { log: renderer_log.clone() }),
    );
    Harness {
        tree,
        security: security_log,
        delegate: delegate_log,
        renderer: renderer_log,
    }
}

pub fn harness_with_config(security: TestSecurityPolicy, config: HostTreeConfig) -> Harness {
    let security_log = security.log.clone();
    let delegate_log = Rc::new(RefCell::new(DelegateLog::default()));
    let renderer_log = Rc::new(RefCell::new(RendererLog::default()));
    let tree = HostTree::with_config(
        Box::new(security),
        Box::new(TestEmbedderPolicy { blocked_urls: Vec::new() }),
        Box::new(TestDelegate { log: delegate_log.clone() }),
        Box::new(TestRenderer { log: renderer_log.clone() }),
        config,
    );
    Harness {
        tree,
        security: security_log,
        delegate: delegate_log,
        renderer: renderer_log,
    }
}

impl Harness {
    pub fn create_host(&mut self, state: LifecycleState) -> DocumentHostId {
        self.tree.create_host(HostInit::new(ProcessId::new(), state))
    }

    pub fn create_child(&mut self, parent: DocumentHostId) -> DocumentHostId {
        let parent_host = self.tree.host(parent).expect("parent exists");
        let mut init = HostInit::new(parent_host.process, LifecycleState::Active);
        init.parent = Some(parent);
        init.site_instance = parent_host.site_instance;
        self.tree.create_host(init)
    }

    /// Builds a navigation for `target`, registers it, sends the commit
    /// instruction, and returns the matching report for the renderer side.
    pub fn start_navigation(
        &mut self,
        host: DocumentHostId,
        target: &str,
    ) -> (NavigationId, DidCommitParams) {
        let navigation = NavigationId::new();
        let mut request = NavigationRequest::new(navigation, url(target));
        request.origin_to_commit = Some(origin(target));
        request.response_status = Some(200);
        let params = matching_commit(&request);
        self.tree.set_navigation_request(host, request);
        self.tree.begin_commit(host, navigation);
        (navigation, params)
    }

    /// Drives a full well-behaved cross-document navigation to `target`.
    pub fn commit_navigation(&mut self, host: DocumentHostId, target: &str) -> bool {
        let (navigation, params) = self.start_navigation(host, target);
        self.tree.did_commit_navigation(host, navigation, params)
    }
}

/// The commit report an honest renderer would produce for `request`.
pub fn matching_commit(request: &NavigationRequest) -> DidCommitParams {
    let commit_origin = request
        .origin_to_commit
        .clone()
        .unwrap_or_else(|| ImmutableOrigin::of_url(&request.url));
    let mut params = DidCommitParams::new(request.url.clone(), commit_origin);
    params.method = request.method.to_string();
    params.status_code = request.response_status.unwrap_or(0);
    params.post_id = request.post_id.unwrap_or(-1);
    params.transition = request.transition;
    params.did_create_new_entry = request.expects_new_entry;
    params.should_update_history = request.should_update_history;
    params.url_is_unreachable = request.is_error_document;
    if !request.is_same_document && !request.is_page_activation() {
        params.embedding_token = Some(EmbeddingToken::new());
    }
    params
}
