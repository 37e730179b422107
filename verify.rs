/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Post-hoc cross-checking of accepted commits.
//!
//! Independently recomputes every derivable commit field from trusted
//! state and compares against what the renderer reported. This is not
//! the security boundary, since the validator already ran; it exists to
//! catch latent bugs in the derivation logic itself. Mismatches are
//! logged with full context and fail debug builds, but never abort the
//! commit.

use http::Method;
use log::error;
use url::Url;

use crate::commit_params::DidCommitParams;
use crate::ids::{DocumentHostId, ProcessId};
use crate::inherit::{calculate_http_status_code, calculate_method, calculate_post_id};
use crate::navigation::{NavigationRequest, TransitionType};
use crate::origin::ImmutableOrigin;
use crate::policy::Referrer;

/// The prior document's values a same-document commit inherits from.
pub struct PriorDocumentState<'a> {
    pub method: &'a Method,
    pub post_id: Option<i64>,
    pub status_code: u16,
    pub referrer: &'a Referrer,
}

/// Every derivable commit field, recomputed from trusted state only.
/// `None` fields are not independently derivable for this commit (e.g.
/// the URL of a renderer-initiated same-document navigation).
pub struct ExpectedCommit {
    pub method: Method,
    pub url: Option<Url>,
    pub origin: Option<ImmutableOrigin>,
    pub post_id: Option<i64>,
    pub status_code: u16,
    pub url_is_unreachable: bool,
    pub is_overriding_user_agent: bool,
    pub should_update_history: bool,
    pub did_create_new_entry: Option<bool>,
    pub transition: Option<TransitionType>,
    pub history_list_was_cleared: bool,
}

pub fn expected_commit(
    request: &NavigationRequest,
    prior: &PriorDocumentState,
) -> ExpectedCommit {
    let derivable = !request.is_synthetic;
    ExpectedCommit {
        method: calculate_method(request, prior.method),
        url: derivable.then(|| request.url.clone()),
        origin: request.origin_to_commit.clone(),
        post_id: calculate_post_id(request, prior.post_id),
        status_code: calculate_http_status_code(request, prior.status_code),
        url_is_unreachable: request.is_error_document,
        is_overriding_user_agent: request.is_overriding_user_agent,
        should_update_history: request.should_update_history,
        did_create_new_entry: derivable.then_some(request.expects_new_entry),
        transition: derivable.then_some(request.transition),
        history_list_was_cleared: request.history_list_was_cleared,
    }
}

/// One field the renderer reported differently than the browser derived.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommitMismatch {
    pub field: &'static str,
    pub expected: String,
    pub got: String,
}

impl CommitMismatch {
    fn new(field: &'static str, expected: impl ToString, got: impl ToString) -> CommitMismatch {
        CommitMismatch {
            field,
            expected: expected.to_string(),
            got: got.to_string(),
        }
    }
}

/// Compares the recomputation with the renderer's report.
pub fn cross_check(expected: &ExpectedCommit, params: &DidCommitParams) -> Vec<CommitMismatch> {
    let mut mismatches = Vec::new();

    match Method::from_bytes(params.method.as_bytes()) {
        Ok(ref reported) if *reported == expected.method => {},
        // An unparseable method was already killed by the validator.
        Err(_) => {},
        Ok(reported) => {
            mismatches.push(CommitMismatch::new("method", &expected.method, reported));
        },
    }

    if let Some(ref url) = expected.url {
        if *url != params.url {
            mismatches.push(CommitMismatch::new("url", url, &params.url));
        }
    }

    if let Some(ref origin) = expected.origin {
        if *origin != params.origin {
            mismatches.push(CommitMismatch::new(
                "origin",
                origin.ascii_serialization(),
                params.origin.ascii_serialization(),
            ));
        }
    }

    let reported_post_id = (params.post_id >= 0).then_some(params.post_id);
    if reported_post_id != expected.post_id {
        mismatches.push(CommitMismatch::new(
            "post_id",
            format!("{:?}", expected.post_id),
            format!("{:?}", reported_post_id),
        ));
    }

    if params.status_code != expected.status_code {
        mismatches.push(CommitMismatch::new(
            "http_status_code",
            expected.status_code,
            params.status_code,
        ));
    }

    if params.url_is_unreachable != expected.url_is_unreachable {
        mismatches.push(CommitMismatch::new(
            "url_is_unreachable",
            expected.url_is_unreachable,
            params.url_is_unreachable,
        ));
    }

    if params.is_overriding_user_agent != expected.is_overriding_user_agent {
        mismatches.push(CommitMismatch::new(
            "is_overriding_user_agent",
            expected.is_overriding_user_agent,
            params.is_overriding_user_agent,
        ));
    }

    if params.should_update_history != expected.should_update_history {
        mismatches.push(CommitMismatch::new(
            "should_update_history",
            expected.should_update_history,
            params.should_update_history,
        ));
    }

    if let Some(did_create_new_entry) = expected.did_create_new_entry {
        if params.did_create_new_entry != did_create_new_entry {
            mismatches.push(CommitMismatch::new(
                "did_create_new_entry",
                did_create_new_entry,
                params.did_create_new_entry,
            ));
        }
    }

    if let Some(transition) = expected.transition {
        if params.transition != transition {
            mismatches.push(CommitMismatch::new(
                "transition",
                format!("{:?}", transition),
                format!("{:?}", params.transition),
            ));
        }
    }

    if params.history_list_was_cleared != expected.history_list_was_cleared {
        mismatches.push(CommitMismatch::new(
            "history_list_was_cleared",
            expected.history_list_was_cleared,
            params.history_list_was_cleared,
        ));
    }

    mismatches
}

/// Logs every mismatch with triage context. Diagnostic-only in release;
/// a hard failure in debug builds, where a mismatch means the derivation
/// logic itself is wrong.
pub fn report_mismatches(
    host: DocumentHostId,
    process: ProcessId,
    mismatches: &[CommitMismatch],
) {
    for mismatch in mismatches {
        error!(
            "Commit cross-check mismatch in host {} (process {}): {} expected {}, renderer reported {}",
            host, process, mismatch.field, mismatch.expected, mismatch.got,
        );
    }
    debug_assert!(
        mismatches.is_empty(),
        "commit cross-check mismatches: {mismatches:?}",
    );
}
