//! Identifier newtypes.
//!
//! UUIDv7 under the hood: time-ordered, so freshly minted ids sort roughly
//! by creation time and id tie-breaks follow the clock. Each identifier is
//! its own type; handing a purchaser id where a stream id belongs is a
//! compile error rather than a data bug.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Mint a fresh, time-ordered identifier.
            ///
            /// Tests that need determinism should construct ids from fixed
            /// UUIDs instead.
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub const fn uuid(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<Uuid> for $name {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl From<$name> for Uuid {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl FromStr for $name {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::from_str(s).map(Self).map_err(|e| {
                    DomainError::invalid_id(format!(concat!(stringify!($name), ": {}"), e))
                })
            }
        }
    };
}

uuid_id! {
    /// Identity of one aggregate stream.
    AggregateId
}

uuid_id! {
    /// The opaque buyer identity the identity service hands us,
    /// pre-authenticated. Never parsed for meaning and never used for
    /// authorization decisions here.
    PurchaserId
}
