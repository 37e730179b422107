/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The frame-token → host registry.
//!
//! Frame tokens are minted before the host exists in some call chains, so
//! lookups by token go through this registry rather than the host tree's
//! own map. Lifetime rule: a host is inserted at construction and removed
//! at the *start* of destruction, before any observer notification, so no
//! observer can ever find a host that is mid-teardown through this path.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::ids::{DocumentHostId, FrameToken};

#[derive(Default)]
pub struct HostRegistry {
    map: RwLock<FxHashMap<FrameToken, DocumentHostId>>,
}

impl HostRegistry {
    pub fn new() -> HostRegistry {
        HostRegistry {
            map: RwLock::new(FxHashMap::default()),
        }
    }

    pub fn insert(&self, token: FrameToken, host: DocumentHostId) {
        let previous = self.map.write().insert(token, host);
        debug_assert!(
            previous.is_none(),
            "Frame token {token} registered twice (old host {previous:?}, new host {host})",
        );
    }

    pub fn remove(&self, token: &FrameToken) -> Option<DocumentHostId> {
        self.map.write().remove(token)
    }

    /// The live host currently occupying the frame slot, if any. Stale
    /// and foreign tokens resolve to `None`.
    pub fn get(&self, token: &FrameToken) -> Option<DocumentHostId> {
        self.map.read().get(token).copied()
    }

    pub fn len(&self) -> usize {
        self.map.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.read().is_empty()
    }
}
