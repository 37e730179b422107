/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The untrusted commit report, as received from a renderer.
//!
//! Nothing in these structs may be believed without independent
//! re-validation: every field derivable from browser-side state is
//! cross-checked, and security-relevant mismatches kill the reporting
//! process. The HTTP method travels as a string and is re-parsed on the
//! trusted side; a malformed method is itself a violation.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::ids::{EmbeddingToken, SameDocumentNavigationToken};
use crate::navigation::TransitionType;
use crate::origin::ImmutableOrigin;
use crate::policy::Referrer;

/// Serialized session-history state for one document, opaque to this
/// crate except for the files it references.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct PageState {
    /// Files referenced by the serialized state (e.g. form file inputs).
    /// Every one must be readable by the reporting process.
    pub referenced_files: Vec<String>,
    pub data: Vec<u8>,
}

/// Untrusted parameters reported by the renderer at commit time.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct DidCommitParams {
    pub url: Url,
    pub origin: ImmutableOrigin,
    pub referrer: Referrer,
    /// HTTP method as reported; parsed with `http::Method::from_bytes`
    /// browser-side.
    pub method: String,
    /// Raw status code; 0 means no network response was received.
    pub status_code: u16,
    /// Identifier of the POST request body, -1 if none.
    pub post_id: i64,
    pub transition: TransitionType,
    pub page_state: PageState,
    /// Must be present (and fresh) exactly for cross-document,
    /// non-activation commits.
    pub embedding_token: Option<EmbeddingToken>,
    /// The Document-Policy header the renderer claims the response had.
    pub document_policy_header: Option<String>,
    /// Target session history entry of a history navigation, 0 if none.
    pub nav_entry_id: u64,
    pub history_list_was_cleared: bool,
    pub did_create_new_entry: bool,
    pub should_update_history: bool,
    pub url_is_unreachable: bool,
    pub is_overriding_user_agent: bool,
}

impl DidCommitParams {
    /// A minimal commit report for `url`, for building the real thing
    /// field by field.
    pub fn new(url: Url, origin: ImmutableOrigin) -> DidCommitParams {
        DidCommitParams {
            url,
            origin,
            referrer: Referrer::default(),
            method: "GET".to_owned(),
            status_code: 0,
            post_id: -1,
            transition: TransitionType::default(),
            page_state: PageState::default(),
            embedding_token: None,
            document_policy_header: None,
            nav_entry_id: 0,
            history_list_was_cleared: false,
            did_create_new_entry: true,
            should_update_history: true,
            url_is_unreachable: false,
            is_overriding_user_agent: false,
        }
    }
}

/// Additional parameters accompanying a same-document commit report.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SameDocumentParams {
    /// The browser-minted token of the pending same-document navigation,
    /// if the browser started it. Absent for renderer-initiated
    /// navigations (fragment clicks, history API calls).
    pub navigation_token: Option<SameDocumentNavigationToken>,
    /// Whether the navigation was triggered by a history API call.
    pub is_history_api: bool,
}
