/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Identifiers for document hosts and navigations.
//!
//! Small ids (`DocumentHostId`, `ProcessId`, ...) are process-local and
//! allocated from monotonic counters. Tokens (`FrameToken`,
//! `DocumentToken`, ...) are unguessable uuids that may be minted before
//! the object they name exists, and may cross the trust boundary.

use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! counter_id {
    ($(#[$attr:meta])* $name:ident, $counter:ident) => {
        static $counter: AtomicU32 = AtomicU32::new(1);

        $(#[$attr])*
        #[derive(
            Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
        )]
        pub struct $name(pub u32);

        impl $name {
            #[allow(clippy::new_without_default)]
            pub fn new() -> $name {
                $name($counter.fetch_add(1, Ordering::Relaxed))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "({})", self.0)
            }
        }
    };
}

macro_rules! token_id {
    ($(#[$attr:meta])* $name:ident) => {
        $(#[$attr])*
        #[derive(
            Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
        )]
        pub struct $name(Uuid);

        impl $name {
            #[allow(clippy::new_without_default)]
            pub fn new() -> $name {
                $name(Uuid::new_v4())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

counter_id!(
    /// The id of a document host. This is the key into the host tree's
    /// map of live hosts, and is never reused.
    DocumentHostId,
    NEXT_DOCUMENT_HOST_ID
);

counter_id!(
    /// The id of a renderer process. One process may host many documents.
    ProcessId,
    NEXT_PROCESS_ID
);

counter_id!(
    /// The id of a site instance. Hosts sharing a site instance share an
    /// active-document count used for process reuse decisions.
    SiteInstanceId,
    NEXT_SITE_INSTANCE_ID
);

static NEXT_NAVIGATION_ID: AtomicU64 = AtomicU64::new(1);

/// The identity of a cross-document navigation, minted by the navigation
/// driver when the navigation starts.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct NavigationId(pub u64);

impl NavigationId {
    #[allow(clippy::new_without_default)]
    pub fn new() -> NavigationId {
        NavigationId(NEXT_NAVIGATION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for NavigationId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({})", self.0)
    }
}

token_id!(
    /// A stable identifier for a frame slot. Persists across the slot's
    /// current document changing.
    FrameToken
);

token_id!(
    /// An identifier that changes every time a new document is created in
    /// a frame slot, and stays fixed across same-document navigations.
    DocumentToken
);

token_id!(
    /// A token tying an embedded document to its embedder. A new one must
    /// accompany every cross-document commit that creates a new document.
    EmbeddingToken
);

token_id!(
    /// The token keying a same-document navigation that the browser
    /// process knows about ahead of the renderer's commit report.
    SameDocumentNavigationToken
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_ids_are_unique() {
        let a = DocumentHostId::new();
        let b = DocumentHostId::new();
        assert_ne!(a, b);
        assert!(a < b);
    }

    #[test]
    fn tokens_are_unique() {
        assert_ne!(DocumentToken::new(), DocumentToken::new());
        assert_ne!(FrameToken::new(), FrameToken::new());
    }
}
