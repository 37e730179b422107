/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Security-policy state carried by a committed document.

use std::fmt::{self, Display, Formatter};

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use url::Url;

bitflags! {
    /// Web-platform capabilities disabled for a document, accumulated down
    /// the frame tree and via CSP sandbox directives.
    #[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
    pub struct SandboxFlags: u16 {
        const NAVIGATION = 0b0000_0001;
        const PLUGINS = 0b0000_0010;
        const ORIGIN = 0b0000_0100;
        const FORMS = 0b0000_1000;
        const SCRIPTS = 0b0001_0000;
        const POINTER_LOCK = 0b0010_0000;
        const POPUPS = 0b0100_0000;
        const TOP_LEVEL_NAVIGATION = 0b1000_0000;
        const MODALS = 0b1_0000_0000;
        const DOWNLOADS = 0b10_0000_0000;
    }
}

/// <https://w3c.github.io/webappsec-referrer-policy/#referrer-policy>
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub enum ReferrerPolicy {
    /// ""
    EmptyString,
    /// "no-referrer"
    NoReferrer,
    /// "no-referrer-when-downgrade"
    NoReferrerWhenDowngrade,
    /// "origin"
    Origin,
    /// "same-origin"
    SameOrigin,
    /// "origin-when-cross-origin"
    OriginWhenCrossOrigin,
    /// "unsafe-url"
    UnsafeUrl,
    /// "strict-origin"
    StrictOrigin,
    /// "strict-origin-when-cross-origin"
    #[default]
    StrictOriginWhenCrossOrigin,
}

impl Display for ReferrerPolicy {
    fn fmt(&self, formatter: &mut Formatter) -> fmt::Result {
        let string = match self {
            ReferrerPolicy::EmptyString => "",
            ReferrerPolicy::NoReferrer => "no-referrer",
            ReferrerPolicy::NoReferrerWhenDowngrade => "no-referrer-when-downgrade",
            ReferrerPolicy::Origin => "origin",
            ReferrerPolicy::SameOrigin => "same-origin",
            ReferrerPolicy::OriginWhenCrossOrigin => "origin-when-cross-origin",
            ReferrerPolicy::UnsafeUrl => "unsafe-url",
            ReferrerPolicy::StrictOrigin => "strict-origin",
            ReferrerPolicy::StrictOriginWhenCrossOrigin => "strict-origin-when-cross-origin",
        };
        write!(formatter, "{}", string)
    }
}

/// The referrer of a navigation or a committed document.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Referrer {
    pub url: Option<Url>,
    pub policy: ReferrerPolicy,
}

impl Referrer {
    pub fn new(url: Option<Url>, policy: ReferrerPolicy) -> Referrer {
        Referrer { url, policy }
    }
}

/// <https://html.spec.whatwg.org/multipage/#cross-origin-opener-policy-value>
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub enum CrossOriginOpenerPolicy {
    #[default]
    UnsafeNone,
    SameOriginAllowPopups,
    SameOrigin,
}

/// <https://html.spec.whatwg.org/multipage/#embedder-policy-value>
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub enum CrossOriginEmbedderPolicy {
    #[default]
    UnsafeNone,
    Credentialless,
    RequireCorp,
}

/// Document-isolation-policy value, the per-document variant of COEP.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub enum DocumentIsolationPolicy {
    #[default]
    None,
    IsolateAndRequireCorp,
    IsolateAndCredentialless,
}

/// <https://html.spec.whatwg.org/multipage/browsers.html#policy-containers>
///
/// CSP serializations are carried opaquely; this crate stores and moves
/// them but never evaluates them.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct PolicyContainer {
    pub sandbox_flags: SandboxFlags,
    pub csp_list: Vec<String>,
    pub referrer_policy: ReferrerPolicy,
    pub cross_origin_opener_policy: CrossOriginOpenerPolicy,
    pub cross_origin_embedder_policy: CrossOriginEmbedderPolicy,
    pub document_isolation_policy: DocumentIsolationPolicy,
}

/// A document-policy header, as a set of `directive=value` entries.
///
/// The reported policy is compatible with a required policy when it
/// contains every required entry.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct DocumentPolicy(pub Vec<(String, String)>);

impl DocumentPolicy {
    pub fn parse(header: &str) -> DocumentPolicy {
        let entries = header
            .split(',')
            .filter_map(|entry| {
                let entry = entry.trim();
                if entry.is_empty() {
                    return None;
                }
                match entry.split_once('=') {
                    Some((directive, value)) => {
                        Some((directive.trim().to_owned(), value.trim().to_owned()))
                    },
                    None => Some((entry.to_owned(), String::new())),
                }
            })
            .collect();
        DocumentPolicy(entries)
    }

    pub fn is_compatible_with(&self, required: &DocumentPolicy) -> bool {
        required.0.iter().all(|entry| self.0.contains(entry))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A snapshot of the permissions policy in force for a document. The
/// actual policy computation lives with the embedder; the host only needs
/// to overwrite the snapshot whenever a new document is created.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct PermissionsPolicy {
    /// Features declared by the response's Permissions-Policy header.
    pub declared: Vec<String>,
    /// Features inherited from the parent document's policy.
    pub inherited: Vec<String>,
}

impl PermissionsPolicy {
    /// The policy for a new document: the parent's effective features plus
    /// the response header's declarations.
    pub fn for_new_document(
        parent: Option<&PermissionsPolicy>,
        header_features: Vec<String>,
    ) -> PermissionsPolicy {
        let inherited = parent
            .map(|parent| {
                let mut features = parent.inherited.clone();
                features.extend(parent.declared.iter().cloned());
                features.sort();
                features.dedup();
                features
            })
            .unwrap_or_default();
        PermissionsPolicy {
            declared: header_features,
            inherited,
        }
    }
}
