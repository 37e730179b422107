/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Inheritance rules for commit-time document state.
//!
//! Small pure functions shared by the commit applier and the post-hoc
//! cross-check, which re-derives every field independently. Same-document
//! navigations intentionally carry the prior document's method, POST id,
//! and status code forward; everything else is overwritten on commit.

use http::Method;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::navigation::NavigationRequest;
use crate::origin::ImmutableOrigin;
use crate::policy::Referrer;

/// The HTTP method the committed document should report.
///
/// A same-document navigation not triggered by the history API inherits
/// the prior document's method; a history-API navigation is always `GET`.
pub fn calculate_method(request: &NavigationRequest, prior_method: &Method) -> Method {
    if !request.is_same_document {
        return request.method.clone();
    }
    if request.is_history_api {
        return Method::GET;
    }
    prior_method.clone()
}

/// The POST id the committed document should report. Only meaningful for
/// `POST`; same-document navigations inherit the prior id.
pub fn calculate_post_id(request: &NavigationRequest, prior_post_id: Option<i64>) -> Option<i64> {
    if request.is_same_document {
        return prior_post_id;
    }
    if request.method == Method::POST {
        return request.post_id;
    }
    None
}

/// The HTTP status code the committed document should report. 0 means no
/// network response was ever received (synthetic initial documents).
pub fn calculate_http_status_code(request: &NavigationRequest, prior_status: u16) -> u16 {
    if request.is_same_document || request.is_page_activation() {
        return prior_status;
    }
    if request.served_from_page_cache {
        return 200;
    }
    request.response_status.unwrap_or(0)
}

/// The referrer the committed document should report.
///
/// Navigations that ended in a network error use the referrer computed at
/// the start of the navigation (error pages never see the server's
/// redirect chain); everything else uses the sanitized post-redirect
/// referrer, falling back to the existing document's referrer for
/// same-document and synthetic commits.
pub fn calculate_referrer(request: &NavigationRequest, prior_referrer: &Referrer) -> Referrer {
    if request.is_error_document {
        return request.referrer_at_start.clone();
    }
    if (request.is_same_document || request.is_synthetic) &&
        request.sanitized_referrer.url.is_none()
    {
        return prior_referrer.clone();
    }
    request.sanitized_referrer.clone()
}

/// How a frame relates to its ancestor chain, most restrictive wins.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Ord, PartialEq, PartialOrd, Serialize)]
pub enum AncestorRelation {
    SameOrigin,
    SameSite,
    CrossSite,
}

impl AncestorRelation {
    /// The relation between a frame origin and one ancestor origin.
    pub fn between(a: &ImmutableOrigin, b: &ImmutableOrigin) -> AncestorRelation {
        if a == b {
            return AncestorRelation::SameOrigin;
        }
        match (a.schemeful_site(), b.schemeful_site()) {
            (Some(site_a), Some(site_b)) if site_a == site_b => AncestorRelation::SameSite,
            _ => AncestorRelation::CrossSite,
        }
    }

    pub fn most_restrictive(self, other: AncestorRelation) -> AncestorRelation {
        self.max(other)
    }
}

/// The tuple used for cookie/storage/network partitioning decisions.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct IsolationInfo {
    pub top_frame_origin: ImmutableOrigin,
    pub frame_origin: ImmutableOrigin,
    /// The schemeful site cookies may be sent for, `None` once any
    /// ancestor is cross-site.
    pub site_for_cookies: Option<String>,
    pub ancestor_relation: AncestorRelation,
    /// Partition nonce for credentialless and fenced frames. Takes
    /// priority over anything derived from the ancestor walk.
    pub nonce: Option<Uuid>,
}

impl IsolationInfo {
    /// Isolation info for a top-level document.
    pub fn for_top_level(origin: ImmutableOrigin) -> IsolationInfo {
        IsolationInfo {
            site_for_cookies: origin.schemeful_site(),
            top_frame_origin: origin.clone(),
            frame_origin: origin,
            ancestor_relation: AncestorRelation::SameOrigin,
            nonce: None,
        }
    }
}

/// The key under which a document's storage is partitioned.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct StorageKey {
    pub origin: ImmutableOrigin,
    pub top_level_site: Option<String>,
    pub nonce: Option<Uuid>,
}

impl StorageKey {
    pub fn compute(origin: &ImmutableOrigin, isolation: &IsolationInfo) -> StorageKey {
        StorageKey {
            origin: origin.clone(),
            top_level_site: isolation.top_frame_origin.schemeful_site(),
            nonce: isolation.nonce,
        }
    }
}
