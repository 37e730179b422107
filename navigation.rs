/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! In-flight navigations, as owned by a document host once they reach
//! "ready to commit".
//!
//! A `NavigationRequest` carries the not-yet-applied parameters of a
//! navigation, computed from trusted browser-side state. At commit time
//! the renderer's report is validated against it, never the other way
//! around.

use std::time::Instant;

use http::Method;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::ids::{NavigationId, SameDocumentNavigationToken};
use crate::origin::ImmutableOrigin;
use crate::policy::{PolicyContainer, Referrer};

/// How far along the commit protocol a navigation is.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NavigationState {
    /// Created; the commit instruction has not been sent yet.
    Started,
    /// The commit instruction has been sent to the renderer, whose
    /// acknowledgement has not arrived.
    ReadyToCommit,
    /// The renderer has reported the commit.
    DidCommit,
}

/// Why an owned navigation was discarded before committing. Downstream
/// metrics depend on the caller picking the right one.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DiscardReason {
    /// The renderer process is gone (crashed or was killed).
    RenderProcessGone,
    /// The frame slot itself is being removed.
    WillRemoveFrame,
    /// Superseded or cancelled inside the browser process.
    InternalCancellation,
}

/// Whether a commit reuses an already-rendered document instance rather
/// than creating a new one.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum PageActivation {
    BackForwardCacheRestore,
    PrerenderActivation,
}

/// The user gesture/UI classification of a navigation.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub enum TransitionType {
    #[default]
    Link,
    Typed,
    AutoSubframe,
    ManualSubframe,
    Reload,
    FormSubmit,
    HistoryApi,
}

/// Error information recorded on a navigation that failed to load.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ErrorInfo {
    pub code: i32,
    pub description: String,
}

/// An in-flight navigation owned by a document host.
#[derive(Debug)]
pub struct NavigationRequest {
    pub id: NavigationId,
    /// When the navigation started. Used to find the most recent
    /// commit-in-flight navigation; entries are never reordered.
    pub started: Instant,
    pub url: Url,
    /// The origin the browser expects the new document to commit with,
    /// when it can be computed ahead of time.
    pub origin_to_commit: Option<ImmutableOrigin>,
    /// Whether the committed origin is potentially trustworthy. Carried
    /// from trusted sources, not re-derived from the URL.
    pub origin_is_potentially_trustworthy: bool,
    pub is_same_document: bool,
    pub same_document_token: Option<SameDocumentNavigationToken>,
    /// Same-document navigation triggered by a history API call.
    pub is_history_api: bool,
    pub activation: Option<PageActivation>,
    pub is_error_document: bool,
    pub error: Option<ErrorInfo>,
    pub method: Method,
    pub post_id: Option<i64>,
    /// The HTTP status of the navigation's response, if one was received.
    pub response_status: Option<u16>,
    pub served_from_page_cache: bool,
    /// The referrer computed when the navigation started, pre-redirect.
    pub referrer_at_start: Referrer,
    /// The referrer after following all redirects.
    pub sanitized_referrer: Referrer,
    pub policy_to_commit: PolicyContainer,
    /// Permissions-Policy features declared by the response.
    pub permissions_policy_header: Vec<String>,
    pub transition: TransitionType,
    /// Set for documents created through the raw-HTML-with-base-URL API;
    /// relaxes commit checks in unlocked processes.
    pub base_url_for_data_url: Option<Url>,
    pub state: NavigationState,
    pub discard_reason: Option<DiscardReason>,
    /// A record fabricated after the fact for renderer-initiated commits
    /// with no matching pending entry.
    pub is_synthetic: bool,
    pub is_overriding_user_agent: bool,
    pub should_update_history: bool,
    /// Whether committing is expected to create a new session history
    /// entry.
    pub expects_new_entry: bool,
    pub history_list_was_cleared: bool,
}

impl NavigationRequest {
    pub fn new(id: NavigationId, url: Url) -> NavigationRequest {
        NavigationRequest {
            id,
            started: Instant::now(),
            url,
            origin_to_commit: None,
            origin_is_potentially_trustworthy: false,
            is_same_document: false,
            same_document_token: None,
            is_history_api: false,
            activation: None,
            is_error_document: false,
            error: None,
            method: Method::GET,
            post_id: None,
            response_status: None,
            served_from_page_cache: false,
            referrer_at_start: Referrer::default(),
            sanitized_referrer: Referrer::default(),
            policy_to_commit: PolicyContainer::default(),
            permissions_policy_header: Vec::new(),
            transition: TransitionType::default(),
            base_url_for_data_url: None,
            state: NavigationState::Started,
            discard_reason: None,
            is_synthetic: false,
            is_overriding_user_agent: false,
            should_update_history: true,
            expects_new_entry: true,
            history_list_was_cleared: false,
        }
    }

    pub fn new_same_document(
        id: NavigationId,
        url: Url,
        token: SameDocumentNavigationToken,
    ) -> NavigationRequest {
        let mut request = NavigationRequest::new(id, url);
        request.is_same_document = true;
        request.same_document_token = Some(token);
        request
    }

    pub fn is_page_activation(&self) -> bool {
        self.activation.is_some()
    }

    /// Whether the commit instruction is in flight: sent to the renderer,
    /// not yet acknowledged.
    pub fn is_still_committing(&self) -> bool {
        self.state == NavigationState::ReadyToCommit
    }

    pub fn mark_discarded(&mut self, reason: DiscardReason) {
        if self.discard_reason.is_none() {
            self.discard_reason = Some(reason);
        }
    }
}
