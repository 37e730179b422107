/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The origin of a committed document.
//!
//! Unlike a plain `url::Origin`, an opaque origin here remembers the
//! tuple origin it was derived from (its precursor), because commit-time
//! validation must be able to re-check the precursor against the process
//! lock and the embedder's URL veto.

use serde::{Deserialize, Serialize};
use url::{Host, Origin, Url};
use uuid::Uuid;

/// The origin of a URL, as held by the trusted process.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum ImmutableOrigin {
    /// A globally unique identifier, with the tuple origin it was derived
    /// from, if any.
    Opaque(OpaqueOrigin),

    /// Consists of the URL's scheme, host and port.
    Tuple(String, Host, u16),
}

impl ImmutableOrigin {
    pub fn new(origin: Origin) -> ImmutableOrigin {
        match origin {
            Origin::Opaque(_) => ImmutableOrigin::new_opaque(),
            Origin::Tuple(scheme, host, port) => ImmutableOrigin::Tuple(scheme, host, port),
        }
    }

    /// The origin of a URL, with opaque origins minted fresh.
    pub fn of_url(url: &Url) -> ImmutableOrigin {
        ImmutableOrigin::new(url.origin())
    }

    /// Creates a new opaque origin that is only equal to itself.
    pub fn new_opaque() -> ImmutableOrigin {
        ImmutableOrigin::Opaque(OpaqueOrigin {
            id: Uuid::new_v4(),
            precursor: None,
        })
    }

    /// Creates a new opaque origin remembering the tuple origin it was
    /// derived from.
    pub fn new_opaque_with_precursor(precursor: &ImmutableOrigin) -> ImmutableOrigin {
        let precursor = match *precursor {
            ImmutableOrigin::Tuple(ref scheme, ref host, port) => {
                Some((scheme.clone(), host.clone(), port))
            },
            // An opaque precursor keeps its own precursor, if any.
            ImmutableOrigin::Opaque(ref opaque) => opaque.precursor.clone(),
        };
        ImmutableOrigin::Opaque(OpaqueOrigin {
            id: Uuid::new_v4(),
            precursor,
        })
    }

    pub fn is_opaque(&self) -> bool {
        matches!(*self, ImmutableOrigin::Opaque(..))
    }

    pub fn is_tuple(&self) -> bool {
        matches!(*self, ImmutableOrigin::Tuple(..))
    }

    pub fn scheme(&self) -> Option<&str> {
        match *self {
            ImmutableOrigin::Opaque(_) => None,
            ImmutableOrigin::Tuple(ref scheme, _, _) => Some(&**scheme),
        }
    }

    pub fn host(&self) -> Option<&Host> {
        match *self {
            ImmutableOrigin::Opaque(_) => None,
            ImmutableOrigin::Tuple(_, ref host, _) => Some(host),
        }
    }

    pub fn port(&self) -> Option<u16> {
        match *self {
            ImmutableOrigin::Opaque(_) => None,
            ImmutableOrigin::Tuple(_, _, port) => Some(port),
        }
    }

    pub fn same_origin(&self, other: &ImmutableOrigin) -> bool {
        self == other
    }

    /// The precursor tuple origin of an opaque origin, as a URL, for
    /// re-running URL-level checks against it. `None` for tuple origins
    /// and for opaque origins without a precursor.
    pub fn precursor_url(&self) -> Option<Url> {
        match *self {
            ImmutableOrigin::Tuple(..) => None,
            ImmutableOrigin::Opaque(ref opaque) => {
                let (ref scheme, ref host, port) = *opaque.precursor.as_ref()?;
                Url::parse(&format!("{}://{}:{}/", scheme, host, port)).ok()
            },
        }
    }

    /// The schemeful site of this origin, used for process locks and
    /// storage-key top-level sites. Opaque origins have no site.
    pub fn schemeful_site(&self) -> Option<String> {
        match *self {
            ImmutableOrigin::Opaque(_) => None,
            ImmutableOrigin::Tuple(ref scheme, ref host, _) => {
                Some(format!("{}://{}", scheme, host))
            },
        }
    }

    /// <https://html.spec.whatwg.org/multipage/#ascii-serialisation-of-an-origin>
    pub fn ascii_serialization(&self) -> String {
        match *self {
            ImmutableOrigin::Opaque(_) => "null".to_owned(),
            ImmutableOrigin::Tuple(ref scheme, ref host, port) => {
                format!("{}://{}:{}", scheme, host, port)
            },
        }
    }
}

/// Opaque identifier for origins of URLs without an authority, sandboxed
/// documents, and error documents.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct OpaqueOrigin {
    id: Uuid,
    precursor: Option<(String, Host, u16)>,
}
