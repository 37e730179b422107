/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Commit-time validation of renderer-reported parameters.
//!
//! The renderer is untrusted: every commit report is re-validated here
//! against trusted browser-side state before any mutation happens. The
//! outcome is a value, not a side effect: the host tree invokes the
//! kill primitive exactly once per violation, so the decision stays
//! visible in the type signature all the way up.

use http::Method;
use url::Url;

use crate::commit_params::DidCommitParams;
use crate::ids::{EmbeddingToken, ProcessId};
use crate::lifecycle::LifecycleState;
use crate::navigation::NavigationRequest;
use crate::origin::ImmutableOrigin;
use crate::policy::{DocumentPolicy, SandboxFlags};
use crate::traits::{CanCommitStatus, CommitAccessCheck, EmbedderPolicy, ProcessLock, SecurityPolicy};

/// The scheme of URLs that trigger renderer debug behavior (crash, kill,
/// hang). These are swallowed long before commit in normal flow; a
/// renderer reporting one as a committed document is either compromised
/// or hit a browser bug, and the commit is dropped either way.
pub const RENDERER_DEBUG_SCHEME: &str = "renderer-debug";

/// The sentinel the URL filter rewrites disallowed URLs to.
pub const BLOCKED_URL: &str = "about:blank#blocked";

pub fn is_renderer_debug_url(url: &Url) -> bool {
    url.scheme() == RENDERER_DEBUG_SCHEME
}

pub fn blocked_url() -> Url {
    Url::parse(BLOCKED_URL).expect("the blocked sentinel always parses")
}

/// Reason codes passed to the kill primitive, for crash-diagnosis triage.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum KillReason {
    /// A non-error navigation tried to commit in the error-page process.
    NonErrorCommitInErrorProcess,
    /// An error document tried to commit outside the error-page process
    /// while error-page isolation is enabled.
    ErrorCommitOutsideErrorProcess,
    /// An error document committed with a non-opaque origin.
    ErrorDocumentOriginNotOpaque,
    /// An MHTML subframe committed in a different process than the main
    /// frame of its archive.
    MhtmlSubframeInWrongProcess,
    /// The process may not commit this URL.
    CannotCommitUrl,
    /// The process may not commit this origin.
    CannotCommitOrigin,
    /// The serialized page state references files the process cannot
    /// read.
    PageStateFileAccessViolation,
    /// A cross-document commit arrived without a new embedding token.
    MissingEmbeddingToken,
    /// An embedding token arrived where none may be (same-document), or
    /// an old token was replayed.
    UnexpectedEmbeddingToken,
    /// The reported document-policy header cannot satisfy the policy
    /// required by the frame owner.
    DocumentPolicyIncompatible,
    /// A same-document commit was claimed by a host that has never
    /// committed a document.
    SameDocumentCommitBeforeFirstCommit,
    /// A same-document commit was claimed while a post-commit error entry
    /// is pending.
    SameDocumentOnPostCommitErrorEntry,
    /// A subframe history commit would silently change the main frame's
    /// origin.
    SubframeHistoryCommitChangesMainFrameOrigin,
    /// The reported HTTP method does not parse.
    InvalidHttpMethod,
    /// A commit was reported for a navigation the browser knows nothing
    /// about, outside the recognized synthesis cases.
    NoMatchingNavigation,
}

/// The validator's verdict on one commit report.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ValidationOutcome {
    /// The commit is acceptable.
    Allow,
    /// The commit is dropped without killing the renderer (benign
    /// defense-in-depth rejections, e.g. renderer-debug URLs).
    Block,
    /// The commit is a security violation; the reporting process must
    /// die.
    Kill(KillReason),
}

/// Trusted browser-side state a commit is validated against, assembled by
/// the host tree for each report.
pub struct ValidationContext<'a> {
    pub process: ProcessId,
    pub process_lock: ProcessLock,
    pub lifecycle: LifecycleState,
    pub is_main_frame: bool,
    pub is_mhtml_document: bool,
    /// The process of the main frame of this host's frame tree.
    pub main_frame_process: ProcessId,
    pub current_url: &'a Url,
    pub current_origin: &'a ImmutableOrigin,
    pub main_frame_origin: ImmutableOrigin,
    pub current_embedding_token: Option<EmbeddingToken>,
    /// Policy required by frame-owner attributes.
    pub required_document_policy: &'a DocumentPolicy,
    pub sandbox_flags: SandboxFlags,
    pub storage_partition: Option<String>,
    pub partition_nonce: Option<uuid::Uuid>,
    pub error_page_isolation_enabled: bool,
    pub has_pending_post_commit_error_entry: bool,
    /// The main-frame origin implied by the report's target history
    /// entry, resolved from the navigation controller, if any.
    pub main_frame_origin_for_entry: Option<ImmutableOrigin>,
}

/// Whether `process` may commit a document with this (origin, url) pair.
///
/// Ordered checks, each may short-circuit. Run at ready-to-commit time
/// and re-run (unless exempted) inside `validate_did_commit_params`.
pub fn can_commit_origin_and_url(
    context: &ValidationContext,
    security: &dyn SecurityPolicy,
    embedder: &dyn EmbedderPolicy,
    is_same_document: bool,
    is_error_document: bool,
    origin: &ImmutableOrigin,
    url: &Url,
) -> ValidationOutcome {
    // Error documents commit with an opaque origin, in the error-page
    // process when error-page isolation is on, and skip the URL checks
    // below.
    if context.process_lock == ProcessLock::ErrorPage {
        if !is_error_document {
            return ValidationOutcome::Kill(KillReason::NonErrorCommitInErrorProcess);
        }
        if !origin.is_opaque() {
            return ValidationOutcome::Kill(KillReason::ErrorDocumentOriginNotOpaque);
        }
        return ValidationOutcome::Allow;
    }
    if is_error_document {
        if context.error_page_isolation_enabled {
            return ValidationOutcome::Kill(KillReason::ErrorCommitOutsideErrorProcess);
        }
        if !origin.is_opaque() {
            return ValidationOutcome::Kill(KillReason::ErrorDocumentOriginNotOpaque);
        }
        return ValidationOutcome::Allow;
    }

    // Renderer-debug URLs can never be committed as a document. These are
    // swallowed earlier in normal flow; no kill here.
    if is_renderer_debug_url(url) {
        return ValidationOutcome::Block;
    }

    // An MHTML subframe need not match the process lock as long as it
    // commits in the same process as the main frame of the archive.
    if context.is_mhtml_document && !context.is_main_frame {
        if context.process == context.main_frame_process {
            return ValidationOutcome::Allow;
        }
        return ValidationOutcome::Kill(KillReason::MhtmlSubframeInWrongProcess);
    }

    // A same-document navigation must not change origin.
    if is_same_document && origin != context.current_origin {
        return ValidationOutcome::Kill(KillReason::CannotCommitOrigin);
    }

    if embedder.should_block_url(url) {
        return ValidationOutcome::Kill(KillReason::CannotCommitUrl);
    }

    let check = CommitAccessCheck {
        process: context.process,
        origin,
        url,
        storage_partition: context.storage_partition.clone(),
        sandbox_flags: context.sandbox_flags,
        partition_nonce: context.partition_nonce,
    };
    match security.can_commit_origin_and_url(&check) {
        CanCommitStatus::CanCommitOriginAndUrl => {},
        CanCommitStatus::CannotCommitUrl => {
            return ValidationOutcome::Kill(KillReason::CannotCommitUrl);
        },
        CanCommitStatus::CannotCommitOrigin => {
            return ValidationOutcome::Kill(KillReason::CannotCommitOrigin);
        },
    }

    // An opaque origin is no better than its precursor.
    if let Some(precursor) = origin.precursor_url() {
        if is_renderer_debug_url(&precursor) {
            return ValidationOutcome::Block;
        }
        if embedder.should_block_url(&precursor) {
            return ValidationOutcome::Kill(KillReason::CannotCommitOrigin);
        }
    }

    ValidationOutcome::Allow
}

/// The superset check run on the full commit report. May rewrite
/// `params` (URL filtering); mutations are only kept when the outcome is
/// `Allow`, since the caller drops the commit otherwise.
pub fn validate_did_commit_params(
    context: &ValidationContext,
    security: &dyn SecurityPolicy,
    embedder: &dyn EmbedderPolicy,
    request: &NavigationRequest,
    params: &mut DidCommitParams,
) -> ValidationOutcome {
    let is_same_document = request.is_same_document;

    if Method::from_bytes(params.method.as_bytes()).is_err() {
        return ValidationOutcome::Kill(KillReason::InvalidHttpMethod);
    }

    // Re-run the origin/URL check unless a narrow exemption applies.
    // Every exemption requires the process to be unlocked; a locked
    // process always takes the normal checks.
    let exempted = !context.process_lock.is_locked_to_site() &&
        (security.is_web_security_disabled() ||
            (params.origin.scheme() == Some("file") &&
                security.allows_universal_file_access(context.process)) ||
            base_url_exemption_applies(request, &params.origin));
    if !exempted {
        match can_commit_origin_and_url(
            context,
            security,
            embedder,
            is_same_document,
            request.is_error_document,
            &params.origin,
            &params.url,
        ) {
            ValidationOutcome::Allow => {},
            other => return other,
        }
    }

    // Filter the committed URL through the process's URL filter. For
    // same-document navigations a blocked result is substituted with the
    // frame's current URL so session history is not corrupted with the
    // sentinel; cross-document filtering must not substitute this way
    // (it could leak cross-origin state).
    let filtered = security.filter_url(context.process, &params.url);
    if filtered != params.url {
        if is_same_document && filtered == blocked_url() {
            params.url = context.current_url.clone();
        } else {
            params.url = filtered;
        }
    }
    if let Some(referrer_url) = params.referrer.url.take() {
        let filtered = security.filter_url(context.process, &referrer_url);
        if filtered != blocked_url() {
            params.referrer.url = Some(filtered);
        }
    }

    for file in &params.page_state.referenced_files {
        if !security.can_read_file(context.process, file) {
            return ValidationOutcome::Kill(KillReason::PageStateFileAccessViolation);
        }
    }

    // Embedding-token presence rules: a cross-document, non-activation
    // commit must carry a fresh token; a same-document commit must not
    // carry one at all.
    if is_same_document {
        if params.embedding_token.is_some() {
            return ValidationOutcome::Kill(KillReason::UnexpectedEmbeddingToken);
        }
    } else if !request.is_page_activation() {
        match params.embedding_token {
            None => return ValidationOutcome::Kill(KillReason::MissingEmbeddingToken),
            Some(token) if Some(token) == context.current_embedding_token => {
                return ValidationOutcome::Kill(KillReason::UnexpectedEmbeddingToken);
            },
            Some(_) => {},
        }
    }

    let reported_policy = params
        .document_policy_header
        .as_deref()
        .map(DocumentPolicy::parse)
        .unwrap_or_default();
    if !reported_policy.is_compatible_with(context.required_document_policy) {
        return ValidationOutcome::Kill(KillReason::DocumentPolicyIncompatible);
    }

    // A same-document claim is only legal for a host that already has a
    // committed document.
    if is_same_document && !context.lifecycle.has_committed_document() {
        return ValidationOutcome::Kill(KillReason::SameDocumentCommitBeforeFirstCommit);
    }

    if is_same_document && context.has_pending_post_commit_error_entry {
        return ValidationOutcome::Kill(KillReason::SameDocumentOnPostCommitErrorEntry);
    }

    // A subframe-only commit must not imply a main-frame origin change
    // through its target history entry.
    if !context.is_main_frame && params.nav_entry_id != 0 {
        if let Some(ref entry_origin) = context.main_frame_origin_for_entry {
            if *entry_origin != context.main_frame_origin {
                return ValidationOutcome::Kill(
                    KillReason::SubframeHistoryCommitChangesMainFrameOrigin,
                );
            }
        }
    }

    ValidationOutcome::Allow
}

/// The raw-HTML-with-base-URL API commits either the base URL's origin or
/// an opaque origin; both are tolerated in unlocked processes.
fn base_url_exemption_applies(request: &NavigationRequest, origin: &ImmutableOrigin) -> bool {
    match request.base_url_for_data_url {
        Some(ref base_url) => {
            origin.is_opaque() || *origin == ImmutableOrigin::of_url(base_url)
        },
        None => false,
    }
}
