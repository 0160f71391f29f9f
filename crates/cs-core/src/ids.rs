//! UUID newtypes for series, issues and scan runs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// UUIDv5 namespace that series keys are hashed into.
const SERIES_NAMESPACE: Uuid = Uuid::from_bytes([
    0x6c, 0x0a, 0x3e, 0x51, 0x92, 0x1d, 0x4f, 0x0b, 0xa7, 0x43, 0x5e, 0x21, 0xc8, 0x7d, 0x10, 0x9f,
]);

macro_rules! typed_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// A fresh random (v4) id.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0.hyphenated(), f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                s.trim().parse().map(Self)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }
    };
}

typed_id!(
    /// A series. Derived from the canonical series key, so the same series
    /// keeps its id across rescans and database rebuilds.
    SeriesId
);
typed_id!(
    /// An issue. Random, and kept when the issue's file is updated in place.
    IssueId
);
typed_id!(ScanRunId);

impl SeriesId {
    #[must_use]
    pub fn from_key(key: &str) -> Self {
        Self(Uuid::new_v5(&SERIES_NAMESPACE, key.as_bytes()))
    }
}
